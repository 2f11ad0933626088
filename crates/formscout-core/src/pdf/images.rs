//! Decoding of image XObjects embedded in page resources.

use std::collections::HashSet;

use image::{DynamicImage, GrayImage, RgbImage};
use lopdf::{Dictionary, Document, Object, ObjectId, Stream};
use tracing::trace;

/// Form XObjects nested deeper than this are not searched.
const MAX_FORM_DEPTH: usize = 4;

/// Collect every decodable image reachable from a resources dictionary,
/// descending into form XObjects.
pub(crate) fn collect_xobject_images(
    doc: &Document,
    resources: &Dictionary,
    depth: usize,
    seen: &mut HashSet<ObjectId>,
    out: &mut Vec<DynamicImage>,
) {
    let Some(xobjects) = resources
        .get(b"XObject")
        .ok()
        .and_then(|o| doc.dereference(o).ok())
        .and_then(|(_, o)| o.as_dict().ok())
    else {
        return;
    };

    for (name, reference) in xobjects.iter() {
        let Ok((id, object)) = doc.dereference(reference) else {
            continue;
        };
        if let Some(id) = id {
            if !seen.insert(id) {
                continue;
            }
        }
        let Object::Stream(stream) = object else {
            continue;
        };

        let subtype = stream.dict.get(b"Subtype").ok().and_then(|o| o.as_name().ok());
        match subtype {
            Some(b"Image") => match decode_image(doc, stream) {
                Some(image) => out.push(image),
                None => trace!("Skipping undecodable image {}", String::from_utf8_lossy(name)),
            },
            Some(b"Form") if depth < MAX_FORM_DEPTH => {
                if let Some((_, nested)) = stream
                    .dict
                    .get(b"Resources")
                    .ok()
                    .and_then(|o| doc.dereference(o).ok())
                    .and_then(|(id, o)| o.as_dict().ok().map(|d| (id, d)))
                {
                    collect_xobject_images(doc, nested, depth + 1, seen, out);
                }
            }
            _ => {}
        }
    }
}

/// Decode an image XObject into pixels.
///
/// JPEG streams are handed to the image crate as-is; raw samples are
/// supported for 8-bit RGB and grayscale and 1-bit grayscale. Everything else
/// (JPEG 2000, JBIG2, CCITT, indexed and CMYK color) returns `None`.
pub(crate) fn decode_image(doc: &Document, stream: &Stream) -> Option<DynamicImage> {
    let dict = &stream.dict;

    let width = dict.get(b"Width").ok()?.as_i64().ok()? as u32;
    let height = dict.get(b"Height").ok()?.as_i64().ok()? as u32;
    if width == 0 || height == 0 {
        return None;
    }

    trace!("Found image object: {}x{}", width, height);

    if let Ok(filter) = dict.get(b"Filter") {
        let filter_name = match filter {
            Object::Name(name) => Some(name.as_slice()),
            Object::Array(arr) => arr.last().and_then(|o| o.as_name().ok()),
            _ => None,
        };

        match filter_name {
            Some(b"DCTDecode") => {
                trace!("Decoding JPEG image");
                return image::load_from_memory_with_format(&stream.content, image::ImageFormat::Jpeg)
                    .ok();
            }
            Some(b"JPXDecode") | Some(b"CCITTFaxDecode") | Some(b"JBIG2Decode") => {
                trace!("Unsupported image filter {:?}", filter_name.map(String::from_utf8_lossy));
                return None;
            }
            _ => {}
        }
    }

    let data = stream
        .decompressed_content()
        .unwrap_or_else(|_| stream.content.clone());

    let components = color_components(doc, dict.get(b"ColorSpace").ok())?;
    let bits = dict
        .get(b"BitsPerComponent")
        .ok()
        .and_then(|o| o.as_i64().ok())
        .unwrap_or(8);

    create_image_from_raw(&data, width, height, components, bits)
}

/// Number of color components of a device or ICC-based color space.
fn color_components(doc: &Document, color_space: Option<&Object>) -> Option<u32> {
    let Some(color_space) = color_space else {
        // Image masks and malformed images default to gray
        return Some(1);
    };
    let (_, color_space) = doc.dereference(color_space).ok()?;

    match color_space {
        Object::Name(name) => match name.as_slice() {
            b"DeviceRGB" | b"RGB" | b"CalRGB" => Some(3),
            b"DeviceGray" | b"G" | b"CalGray" => Some(1),
            _ => None,
        },
        Object::Array(parts) => {
            let family = parts.first()?.as_name().ok()?;
            match family {
                b"ICCBased" => {
                    let (_, profile) = doc.dereference(parts.get(1)?).ok()?;
                    let n = profile.as_stream().ok()?.dict.get(b"N").ok()?.as_i64().ok()?;
                    Some(n as u32).filter(|n| *n == 1 || *n == 3)
                }
                b"CalRGB" => Some(3),
                b"CalGray" => Some(1),
                _ => None,
            }
        }
        _ => None,
    }
}

fn create_image_from_raw(
    data: &[u8],
    width: u32,
    height: u32,
    components: u32,
    bits_per_component: i64,
) -> Option<DynamicImage> {
    let pixels = (width as usize).checked_mul(height as usize)?;

    match (components, bits_per_component) {
        (3, 8) => {
            let expected = pixels.checked_mul(3)?;
            let samples = data.get(..expected)?.to_vec();
            RgbImage::from_raw(width, height, samples).map(DynamicImage::ImageRgb8)
        }
        (1, 8) => {
            let samples = data.get(..pixels)?.to_vec();
            GrayImage::from_raw(width, height, samples).map(DynamicImage::ImageLuma8)
        }
        (1, 1) => {
            // Rows are padded to a whole byte
            let row_bytes = (width as usize).div_ceil(8);
            let packed = data.get(..row_bytes.checked_mul(height as usize)?)?;
            let mut samples = Vec::with_capacity(pixels);
            for row in packed.chunks_exact(row_bytes) {
                for x in 0..width as usize {
                    let bit = (row[x / 8] >> (7 - (x % 8))) & 1;
                    samples.push(if bit == 1 { 255 } else { 0 });
                }
            }
            GrayImage::from_raw(width, height, samples).map(DynamicImage::ImageLuma8)
        }
        _ => {
            trace!(
                "Could not decode image: {} components at {} bits, data_len={}",
                components,
                bits_per_component,
                data.len()
            );
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::super::document::tests::build_pdf;
    use super::super::{PageSource, PdfDocument};
    use super::*;
    use image::GenericImageView;
    use lopdf::dictionary;

    fn gray_image(doc: &mut Document, width: i64, height: i64, samples: Vec<u8>) -> ObjectId {
        doc.add_object(Stream::new(
            dictionary! {
                "Type" => "XObject",
                "Subtype" => "Image",
                "Width" => width,
                "Height" => height,
                "ColorSpace" => "DeviceGray",
                "BitsPerComponent" => 8,
            },
            samples,
        ))
    }

    #[test]
    fn test_raw_rgb_and_gray() {
        let rgb = create_image_from_raw(&[255, 0, 0, 0, 255, 0], 2, 1, 3, 8).unwrap();
        assert_eq!(rgb.dimensions(), (2, 1));

        let gray = create_image_from_raw(&[0, 128, 255, 64], 2, 2, 1, 8).unwrap();
        assert_eq!(gray.dimensions(), (2, 2));

        // Truncated samples are rejected
        assert!(create_image_from_raw(&[0, 1], 2, 2, 1, 8).is_none());
        assert!(create_image_from_raw(&[0; 16], 2, 2, 4, 8).is_none());
    }

    #[test]
    fn test_one_bit_rows_are_padded() {
        // 3 pixels wide: each row is one byte, only the top 3 bits are used
        let image = create_image_from_raw(&[0b1010_0000, 0b0100_0000], 3, 2, 1, 1).unwrap();
        let gray = image.to_luma8();
        assert_eq!(gray.get_pixel(0, 0)[0], 255);
        assert_eq!(gray.get_pixel(1, 0)[0], 0);
        assert_eq!(gray.get_pixel(2, 0)[0], 255);
        assert_eq!(gray.get_pixel(1, 1)[0], 255);
    }

    #[test]
    fn test_page_images_include_nested_forms() {
        let bytes = build_pdf(|doc, page, _| {
            let direct = gray_image(doc, 2, 2, vec![0, 64, 128, 255]);
            let nested = gray_image(doc, 1, 1, vec![200]);
            let form = doc.add_object(Stream::new(
                dictionary! {
                    "Type" => "XObject",
                    "Subtype" => "Form",
                    "BBox" => vec![0.into(), 0.into(), 10.into(), 10.into()],
                    "Resources" => dictionary! {
                        "XObject" => dictionary! { "Im2" => nested },
                    },
                },
                Vec::new(),
            ));
            page.set(
                "Resources",
                dictionary! {
                    "XObject" => dictionary! { "Im1" => direct, "Fm1" => form },
                },
            );
        });

        let document = PdfDocument::from_bytes(&bytes).unwrap();
        let images = document.page_images(0).unwrap();
        assert_eq!(images.len(), 2);
        let mut sizes: Vec<(u32, u32)> = images.iter().map(|i| i.dimensions()).collect();
        sizes.sort();
        assert_eq!(sizes, vec![(1, 1), (2, 2)]);
    }
}
