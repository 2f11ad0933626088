//! Extraction orchestrator: the structured → text → OCR fallback cascade.

mod detector;

pub use detector::FieldDetector;

use serde::{Deserialize, Serialize};

use crate::classify::FieldLabel;
use crate::pdf::StructuredFieldDescriptor;

/// A stage of the extraction cascade.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    StructuredFields,
    EmbeddedText,
    Ocr,
}

/// Instrumentation hook notified as the cascade runs.
pub trait StageObserver {
    /// Called once when a stage starts executing.
    fn on_stage(&self, stage: Stage);
}

/// Which stage produced the final labels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DetectionStatus {
    /// The document declares interactive fields.
    FormFields,
    /// Labels were classified from embedded text.
    EmbeddedText,
    /// Embedded text was too short; labels come from recognized image text.
    OcrFallback,
    /// Every stage ran without producing a label.
    NoFieldsFound,
    /// Every stage that ran failed to read the document.
    Unreadable,
}

impl DetectionStatus {
    /// User-facing description of the outcome.
    pub fn message(&self) -> &'static str {
        match self {
            DetectionStatus::FormFields => "Found interactive form fields",
            DetectionStatus::EmbeddedText => "Detected fields from the document text",
            DetectionStatus::OcrFallback => {
                "No usable embedded text; used OCR fallback to detect labels"
            }
            DetectionStatus::NoFieldsFound => "No fields found",
            DetectionStatus::Unreadable => "The document could not be read; no fields found",
        }
    }
}

/// A recovered failure recorded while running a stage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageFailure {
    pub stage: Stage,
    pub message: String,
}

/// Result of running the cascade on one document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Detection {
    /// Field labels in document reading order.
    pub labels: Vec<FieldLabel>,
    /// Structured descriptors, when the labels came from form metadata.
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub fields: Vec<StructuredFieldDescriptor>,
    /// Which stage produced the result.
    pub status: DetectionStatus,
    /// Recognition stopped early because its budget ran out.
    pub partial: bool,
    /// Stages that were executed, in order.
    pub stages: Vec<Stage>,
    /// Failures recovered along the way.
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub failures: Vec<StageFailure>,
}

impl Detection {
    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }
}
