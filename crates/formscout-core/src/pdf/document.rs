//! Loaded PDF documents backed by lopdf and pdf-extract.

use std::collections::HashSet;
use std::panic::{self, AssertUnwindSafe};
use std::path::Path;

use image::DynamicImage;
use lopdf::{Dictionary, Document, Object, ObjectId};
use tracing::{debug, trace, warn};

use super::images::collect_xobject_images;
use super::{FormWidget, PageSource, Result};
use crate::error::PdfError;

/// Parent chains deeper than this are treated as malformed.
const MAX_PARENT_DEPTH: usize = 32;

/// Field flag marking a button as a push button.
pub(crate) const FLAG_PUSH_BUTTON: u32 = 1 << 16;

/// An immutable, fully loaded PDF document.
pub struct PdfDocument {
    document: Document,
    raw_data: Vec<u8>,
}

impl PdfDocument {
    /// Parse a document from an in-memory buffer.
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        let mut document = Document::load_mem(data).map_err(|e| PdfError::Parse(e.to_string()))?;

        // Handle PDFs with empty password encryption
        let raw_data = if document.is_encrypted() {
            if document.decrypt("").is_err() {
                return Err(PdfError::Encrypted);
            }
            debug!("Decrypted PDF with empty password");

            // pdf-extract works on bytes, so it needs the decrypted copy
            let mut decrypted = Vec::new();
            document
                .save_to(&mut decrypted)
                .map_err(|e| PdfError::Parse(format!("failed to save decrypted PDF: {}", e)))?;
            decrypted
        } else {
            data.to_vec()
        };

        let page_count = document.get_pages().len();
        if page_count == 0 {
            return Err(PdfError::NoPages);
        }

        debug!("Loaded PDF with {} pages", page_count);
        Ok(Self { document, raw_data })
    }

    /// Read and parse a document from disk.
    pub fn from_path(path: &Path) -> Result<Self> {
        let data = std::fs::read(path)
            .map_err(|e| PdfError::Parse(format!("{}: {}", path.display(), e)))?;
        Self::from_bytes(&data)
    }

    fn page_id(&self, index: u32) -> Result<ObjectId> {
        self.document
            .get_pages()
            .get(&(index + 1))
            .copied()
            .ok_or(PdfError::InvalidPage(index))
    }

    fn resolve<'a>(&'a self, object: &'a Object) -> Option<(Option<ObjectId>, &'a Object)> {
        self.document.dereference(object).ok()
    }

    fn resolve_dict<'a>(&'a self, object: &'a Object) -> Option<(Option<ObjectId>, &'a Dictionary)> {
        let (id, object) = self.resolve(object)?;
        object.as_dict().ok().map(|dict| (id, dict))
    }

    /// Look up a key on a field or the nearest ancestor that defines it.
    fn inherited<'a>(&'a self, dict: &'a Dictionary, key: &[u8]) -> Option<&'a Object> {
        let mut current = dict;
        for _ in 0..MAX_PARENT_DEPTH {
            if let Ok(value) = current.get(key) {
                return self.resolve(value).map(|(_, object)| object);
            }
            let parent = current.get(b"Parent").ok()?;
            current = self.resolve_dict(parent)?.1;
        }
        None
    }

    fn widget_from_dict(&self, dict: &Dictionary, page: Option<u32>) -> FormWidget {
        let name = self
            .inherited(dict, b"T")
            .and_then(|object| match object {
                Object::String(bytes, _) => Some(decode_text_string(bytes)),
                _ => None,
            })
            .unwrap_or_default();

        let field_type = self
            .inherited(dict, b"FT")
            .and_then(|object| object.as_name().ok())
            .map(|name| String::from_utf8_lossy(name).into_owned());

        let flags = self
            .inherited(dict, b"Ff")
            .and_then(|object| object.as_i64().ok())
            .unwrap_or(0) as u32;

        FormWidget {
            name,
            field_type,
            flags,
            page,
            date_format: self.has_date_format(dict),
        }
    }

    /// Whether the field's `/AA /F` format action calls an `AFDate_` formatter.
    fn has_date_format(&self, dict: &Dictionary) -> bool {
        let Some(actions) = self.inherited(dict, b"AA").and_then(|o| o.as_dict().ok()) else {
            return false;
        };
        let Some(format) = actions
            .get(b"F")
            .ok()
            .and_then(|o| self.resolve_dict(o))
            .map(|(_, dict)| dict)
        else {
            return false;
        };
        let script = match format.get(b"JS").ok().and_then(|o| self.resolve(o)) {
            Some((_, Object::String(bytes, _))) => decode_text_string(bytes),
            Some((_, Object::Stream(stream))) => {
                let content = stream
                    .decompressed_content()
                    .unwrap_or_else(|_| stream.content.clone());
                String::from_utf8_lossy(&content).into_owned()
            }
            _ => return false,
        };
        script.contains("AFDate_")
    }

    fn page_widgets(&self) -> Result<Vec<FormWidget>> {
        let mut widgets = Vec::new();

        for (number, page_id) in self.document.get_pages() {
            let page = self
                .document
                .get_dictionary(page_id)
                .map_err(|e| PdfError::Parse(e.to_string()))?;

            let Some(annots) = page
                .get(b"Annots")
                .ok()
                .and_then(|o| self.resolve(o))
                .and_then(|(_, o)| o.as_array().ok())
            else {
                continue;
            };

            for annot in annots {
                let Some((_, dict)) = self.resolve_dict(annot) else {
                    continue;
                };
                let is_widget = dict
                    .get(b"Subtype")
                    .ok()
                    .and_then(|o| o.as_name().ok())
                    .is_some_and(|name| name == b"Widget");
                if !is_widget {
                    continue;
                }

                let widget = self.widget_from_dict(dict, Some(number - 1));
                trace!("Widget on page {}: {:?}", number - 1, widget.name);
                widgets.push(widget);
            }
        }

        Ok(widgets)
    }

    fn acroform_fields(&self) -> Result<Vec<FormWidget>> {
        let mut widgets = Vec::new();

        let catalog = self
            .document
            .catalog()
            .map_err(|e| PdfError::Parse(e.to_string()))?;

        let Some(fields) = catalog
            .get(b"AcroForm")
            .ok()
            .and_then(|o| self.resolve_dict(o))
            .and_then(|(_, form)| form.get(b"Fields").ok())
            .and_then(|o| self.resolve(o))
            .and_then(|(_, o)| o.as_array().ok())
        else {
            return Ok(widgets);
        };

        let mut seen = HashSet::new();
        for field in fields {
            self.collect_terminal_fields(field, 0, &mut seen, &mut widgets);
        }

        Ok(widgets)
    }

    /// Recursively collect terminal fields, traversing `/Kids` arrays.
    fn collect_terminal_fields(
        &self,
        field: &Object,
        depth: usize,
        seen: &mut HashSet<ObjectId>,
        out: &mut Vec<FormWidget>,
    ) {
        if depth > MAX_PARENT_DEPTH {
            return;
        }
        let Some((id, dict)) = self.resolve_dict(field) else {
            return;
        };
        if let Some(id) = id {
            if !seen.insert(id) {
                return;
            }
        }

        // Kids without their own /T are widget annotations of this field
        let child_fields: Vec<&Object> = dict
            .get(b"Kids")
            .ok()
            .and_then(|o| self.resolve(o))
            .and_then(|(_, o)| o.as_array().ok())
            .map(|kids| {
                kids.iter()
                    .filter(|kid| {
                        self.resolve_dict(kid)
                            .is_some_and(|(_, kid)| kid.has(b"T"))
                    })
                    .collect()
            })
            .unwrap_or_default();

        if child_fields.is_empty() {
            out.push(self.widget_from_dict(dict, None));
        } else {
            for kid in child_fields {
                self.collect_terminal_fields(kid, depth + 1, seen, out);
            }
        }
    }

    fn page_resources(&self, page_id: ObjectId) -> Option<&Dictionary> {
        let mut current = self.document.get_dictionary(page_id).ok()?;
        for _ in 0..MAX_PARENT_DEPTH {
            if let Some((_, resources)) = current.get(b"Resources").ok().and_then(|o| self.resolve_dict(o)) {
                return Some(resources);
            }
            // Resources are inheritable through the page tree
            let parent = current.get(b"Parent").ok()?;
            current = self.resolve_dict(parent)?.1;
        }
        None
    }
}

impl PageSource for PdfDocument {
    fn page_count(&self) -> u32 {
        self.document.get_pages().len() as u32
    }

    fn form_widgets(&self) -> Result<Vec<FormWidget>> {
        let widgets = self.page_widgets()?;
        if !widgets.is_empty() {
            return Ok(widgets);
        }
        self.acroform_fields()
    }

    fn page_texts(&self) -> Result<Vec<String>> {
        // pdf-extract panics on some malformed fonts
        let extracted = panic::catch_unwind(AssertUnwindSafe(|| {
            pdf_extract::extract_text_from_mem_by_pages(&self.raw_data)
        }));

        match extracted {
            Ok(Ok(pages)) => return Ok(pages),
            Ok(Err(e)) => warn!("pdf-extract failed, falling back to lopdf: {}", e),
            Err(_) => warn!("pdf-extract panicked, falling back to lopdf"),
        }

        let pages = self.document.get_pages();
        let mut texts = Vec::with_capacity(pages.len());
        let mut failures = 0;

        for number in pages.keys() {
            match self.document.extract_text(&[*number]) {
                Ok(text) => texts.push(text),
                Err(e) => {
                    debug!("lopdf text extraction failed on page {}: {}", number, e);
                    failures += 1;
                    texts.push(String::new());
                }
            }
        }

        if failures == pages.len() {
            return Err(PdfError::TextExtraction(
                "no page text could be decoded".to_string(),
            ));
        }

        Ok(texts)
    }

    fn page_images(&self, index: u32) -> Result<Vec<DynamicImage>> {
        let page_id = self.page_id(index)?;

        let mut images = Vec::new();
        if let Some(resources) = self.page_resources(page_id) {
            let mut seen = HashSet::new();
            collect_xobject_images(&self.document, resources, 0, &mut seen, &mut images);
        }

        debug!("Extracted {} images from page {}", images.len(), index);
        Ok(images)
    }
}

/// Decode a PDF text string (UTF-16BE with BOM, UTF-8 with BOM, or
/// PDFDocEncoding approximated as Latin-1).
pub(crate) fn decode_text_string(bytes: &[u8]) -> String {
    if let Some(rest) = bytes.strip_prefix(&[0xFE, 0xFF]) {
        let units: Vec<u16> = rest
            .chunks_exact(2)
            .map(|pair| u16::from_be_bytes([pair[0], pair[1]]))
            .collect();
        return String::from_utf16_lossy(&units);
    }
    if let Some(rest) = bytes.strip_prefix(&[0xEF, 0xBB, 0xBF]) {
        return String::from_utf8_lossy(rest).into_owned();
    }
    bytes.iter().map(|&b| b as char).collect()
}
