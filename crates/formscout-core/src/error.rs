//! Error types for the formscout-core library.

use thiserror::Error;

/// Main error type for the formscout library.
#[derive(Error, Debug)]
pub enum FormscoutError {
    /// Document could not be opened or parsed.
    #[error("PDF error: {0}")]
    Pdf(#[from] PdfError),

    /// Text recognition error.
    #[error("OCR error: {0}")]
    Ocr(#[from] OcrError),

    /// Image processing error.
    #[error("image error: {0}")]
    Image(#[from] image::ImageError),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),
}

/// Errors raised while reading a document.
///
/// Every variant is a document format failure: the orchestrator recovers from
/// all of them by moving on to the next extraction stage.
#[derive(Error, Debug)]
pub enum PdfError {
    /// Failed to open/parse the PDF file.
    #[error("failed to parse PDF: {0}")]
    Parse(String),

    /// Failed to extract text from PDF.
    #[error("failed to extract text: {0}")]
    TextExtraction(String),

    /// Failed to extract images from PDF.
    #[error("failed to extract images: {0}")]
    ImageExtraction(String),

    /// The PDF is encrypted and cannot be processed.
    #[error("PDF is encrypted")]
    Encrypted,

    /// The PDF is empty or has no pages.
    #[error("PDF has no pages")]
    NoPages,

    /// Invalid page index requested.
    #[error("invalid page index: {0}")]
    InvalidPage(u32),
}

/// Errors related to text recognition.
#[derive(Error, Debug)]
pub enum OcrError {
    /// Failed to load recognition models.
    #[error("failed to load model: {0}")]
    ModelLoad(String),

    /// Recognition failed for a single image.
    #[error("text recognition failed: {0}")]
    Recognition(String),

    /// Invalid image format or dimensions.
    #[error("invalid image: {0}")]
    InvalidImage(String),
}

/// Result type for the formscout library.
pub type Result<T> = std::result::Result<T, FormscoutError>;
