//! Core library for form field detection.
//!
//! This crate provides:
//! - Structured form field reading from PDF form metadata
//! - Embedded text extraction and OCR over page images as fallbacks
//! - Heuristic classification of text lines into field labels
//! - The extraction cascade tying them together, plus the data a form
//!   renderer needs to collect values for the detected labels

pub mod classify;
pub mod error;
pub mod form;
pub mod models;
pub mod ocr;
pub mod pdf;
pub mod pipeline;
pub mod upload;

pub use classify::{FieldLabel, KeywordClassifier, LabelClassifier, PatternClassifier};
pub use error::{FormscoutError, Result};
pub use form::{FieldValue, FormPrompt, UserInputRecord, WidgetKind};
pub use models::config::FormscoutConfig;
pub use ocr::{ImageTextScanner, ScanOutcome, TextRecognizer};
#[cfg(feature = "native")]
pub use ocr::PureOcrEngine;
pub use pdf::{FieldKind, PageSource, PdfDocument, StructuredFieldDescriptor};
pub use pipeline::{Detection, DetectionStatus, FieldDetector, Stage, StageObserver};
pub use upload::StagedUpload;
