//! Optical character recognition over embedded page images.

#[cfg(feature = "native")]
mod pure_engine;
mod scanner;

#[cfg(feature = "native")]
pub use pure_engine::PureOcrEngine;
pub use scanner::{ImageTextScanner, ScanOutcome};

use image::DynamicImage;
use serde::{Deserialize, Serialize};

use crate::error::OcrError;

/// A recognition backend.
///
/// Engines are expensive to build, so callers construct one per process and
/// lend it to the pipeline by reference.
pub trait TextRecognizer {
    /// Recognize the text in a single image.
    fn recognize(&self, image: &DynamicImage) -> Result<String, OcrError>;
}

/// A recognized text region.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TextBox {
    /// Bounding box coordinates (x1, y1, x2, y2, x3, y3, x4, y4) for quadrilateral.
    pub bbox: [f32; 8],

    /// Recognized text content.
    pub text: String,

    /// Recognition confidence score (0.0 - 1.0).
    pub confidence: f32,
}

impl TextBox {
    /// Get the axis-aligned bounding rectangle.
    pub fn rect(&self) -> (f32, f32, f32, f32) {
        let xs = [self.bbox[0], self.bbox[2], self.bbox[4], self.bbox[6]];
        let ys = [self.bbox[1], self.bbox[3], self.bbox[5], self.bbox[7]];

        let min_x = xs.iter().cloned().fold(f32::INFINITY, f32::min);
        let max_x = xs.iter().cloned().fold(f32::NEG_INFINITY, f32::max);
        let min_y = ys.iter().cloned().fold(f32::INFINITY, f32::min);
        let max_y = ys.iter().cloned().fold(f32::NEG_INFINITY, f32::max);

        (min_x, min_y, max_x, max_y)
    }

    fn row(&self) -> i32 {
        let (_, min_y, _, _) = self.rect();
        // Group by approximate vertical position (within 20 pixels)
        (min_y / 20.0) as i32
    }
}

/// Arrange boxes in reading order and render them as text.
///
/// Boxes on the same row are joined with a space so that a label and the
/// blank next to it stay on one line; rows are separated by newlines.
pub fn boxes_to_text(boxes: &mut [TextBox]) -> String {
    boxes.sort_by(|a, b| {
        a.row().cmp(&b.row()).then_with(|| {
            let (ax, _, _, _) = a.rect();
            let (bx, _, _, _) = b.rect();
            ax.partial_cmp(&bx).unwrap_or(std::cmp::Ordering::Equal)
        })
    });

    let mut text = String::new();
    let mut current_row = None;

    for text_box in boxes.iter() {
        let content = text_box.text.trim();
        if content.is_empty() {
            continue;
        }
        match current_row {
            Some(row) if row == text_box.row() => text.push(' '),
            Some(_) => text.push('\n'),
            None => {}
        }
        current_row = Some(text_box.row());
        text.push_str(content);
    }

    text
}
