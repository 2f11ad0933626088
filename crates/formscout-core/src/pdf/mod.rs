//! PDF processing module.

mod document;
mod fields;
mod images;
mod text;

pub use document::PdfDocument;
pub use fields::{read_structured_fields, FieldKind, StructuredFieldDescriptor, RESERVED_FIELD_NAMES};
pub use text::{content_length, extract_text};

use crate::error::PdfError;
use image::DynamicImage;

/// Result type for PDF operations.
pub type Result<T> = std::result::Result<T, PdfError>;

/// A natively declared interactive field as found in the document, before
/// any filtering or normalization.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FormWidget {
    /// Partial field name (`/T`), resolved through the parent chain.
    pub name: String,
    /// Field type (`Tx`, `Btn`, `Ch`, `Sig`), if declared.
    pub field_type: Option<String>,
    /// Field flags (`/Ff`).
    pub flags: u32,
    /// Page index (0-based) the widget sits on, if known.
    pub page: Option<u32>,
    /// The field's format action uses a date formatter.
    pub date_format: bool,
}

/// A paginated document the extraction pipeline can read from.
///
/// Pages are indexed `0..page_count()`.
pub trait PageSource {
    /// Number of pages in the document.
    fn page_count(&self) -> u32;

    /// Interactive fields declared by the document, in page order.
    fn form_widgets(&self) -> Result<Vec<FormWidget>>;

    /// Embedded text of every page, one entry per page.
    fn page_texts(&self) -> Result<Vec<String>>;

    /// Decodable raster images embedded in a page.
    fn page_images(&self, index: u32) -> Result<Vec<DynamicImage>>;
}
