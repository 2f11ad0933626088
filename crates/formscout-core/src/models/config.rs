//! Configuration structures for the field detection pipeline.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{FormscoutError, Result};

/// Main configuration for formscout.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FormscoutConfig {
    /// PDF processing configuration.
    pub pdf: PdfConfig,

    /// Text recognition configuration.
    pub ocr: OcrConfig,

    /// Label classification configuration.
    pub classifier: ClassifierConfig,
}

/// PDF processing configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PdfConfig {
    /// Minimum embedded text length (in characters) before OCR is skipped.
    pub min_text_length: usize,

    /// Insert `--- page N ---` markers between pages of extracted text.
    pub annotate_pages: bool,
}

impl Default for PdfConfig {
    fn default() -> Self {
        Self {
            min_text_length: 50,
            annotate_pages: false,
        }
    }
}

/// Text recognition configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OcrConfig {
    /// Directory containing model files.
    pub model_dir: PathBuf,

    /// Text detection model file name.
    pub detection_model: String,

    /// Text recognition model file name.
    pub recognition_model: String,

    /// Character dictionary file name.
    pub dictionary: String,

    /// Maximum number of images recognized per document.
    pub max_images: usize,

    /// Maximum image dimension (longer side) for processing.
    pub max_image_size: u32,

    /// Total recognition time budget per document, in milliseconds.
    pub time_budget_ms: u64,

    /// Insert `--- page N, image M ---` markers before recognized text.
    pub annotate_images: bool,

    /// Keep `[UNK]` tokens emitted by the recognizer.
    pub keep_unk: bool,
}

impl Default for OcrConfig {
    fn default() -> Self {
        Self {
            model_dir: PathBuf::from("models"),
            detection_model: "det.onnx".to_string(),
            recognition_model: "latin_rec.onnx".to_string(),
            dictionary: "latin_dict.txt".to_string(),
            max_images: 32,
            max_image_size: 2048,
            time_budget_ms: 120_000,
            annotate_images: false,
            keep_unk: false,
        }
    }
}

impl OcrConfig {
    /// Full paths of the detection model, recognition model and dictionary.
    pub fn model_paths(&self, model_dir: &Path) -> (PathBuf, PathBuf, PathBuf) {
        (
            model_dir.join(&self.detection_model),
            model_dir.join(&self.recognition_model),
            model_dir.join(&self.dictionary),
        )
    }
}

/// Which heuristic turns text lines into field labels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClassifierStrategy {
    /// Lines must carry a separator and a known domain keyword.
    #[default]
    Keyword,
    /// Any label-like text followed by a colon.
    Pattern,
}

/// Label classification configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassifierConfig {
    /// Active strategy.
    pub strategy: ClassifierStrategy,

    /// Settings for the keyword-anchored strategy.
    pub keyword: KeywordConfig,

    /// Settings for the pattern-anchored strategy.
    pub pattern: PatternConfig,

    /// Maximum number of labels kept (0 = unlimited).
    pub max_labels: usize,
}

/// Keyword-anchored classifier settings.
///
/// Keywords are matched case-insensitively, so every entry must be lowercase.
/// An allowed keyword may appear anywhere in the line ("surname" mentions
/// "name"). A banned keyword must start a word: "pages" is banned by "page",
/// "homepage" is not.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct KeywordConfig {
    /// Shortest line (in characters, after trimming) considered.
    pub min_line_length: usize,

    /// Longest line (in characters, after trimming) considered.
    pub max_line_length: usize,

    /// Shortest accepted label, in characters.
    pub min_label_length: usize,

    /// Longest accepted label, in characters.
    pub max_label_length: usize,

    /// Characters separating a label from its value. Dashes only count when
    /// they stand apart from the surrounding words ("CNIC - 123") or end the
    /// line, so "e-mail" is never split.
    pub separators: Vec<char>,

    /// A line must mention at least one of these.
    pub allowed_keywords: BTreeSet<String>,

    /// A line mentioning any of these is noise.
    pub banned_keywords: BTreeSet<String>,
}

const ALLOWED_KEYWORDS: &[&str] = &[
    "name",
    "dob",
    "date of birth",
    "birth",
    "address",
    "email",
    "e-mail",
    "phone",
    "mobile",
    "contact",
    "cnic",
    "national id",
    "id number",
    "passport",
    "gender",
    "nationality",
    "religion",
    "guardian",
    "father",
    "mother",
    "husband",
    "city",
    "country",
    "province",
    "district",
    "postal",
    "zip",
    "occupation",
    "qualification",
    "marital",
    "date",
];

const BANNED_KEYWORDS: &[&str] = &[
    "page",
    "section",
    "instruction",
    "signature",
    "note",
    "office use",
    "official use",
];

impl Default for KeywordConfig {
    fn default() -> Self {
        Self {
            min_line_length: 4,
            max_line_length: 60,
            min_label_length: 3,
            max_label_length: 40,
            separators: vec![':', '-', '–'],
            allowed_keywords: ALLOWED_KEYWORDS.iter().map(|k| k.to_string()).collect(),
            banned_keywords: BANNED_KEYWORDS.iter().map(|k| k.to_string()).collect(),
        }
    }
}

/// Pattern-anchored classifier settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PatternConfig {
    /// Shortest accepted label, in characters.
    pub min_label_length: usize,

    /// Longest accepted label, in characters.
    pub max_label_length: usize,

    /// Labels with more words than this are treated as prose.
    pub max_words: usize,
}

impl Default for PatternConfig {
    fn default() -> Self {
        Self {
            min_label_length: 3,
            max_label_length: 39,
            max_words: 6,
        }
    }
}

impl FormscoutConfig {
    /// Load configuration from a JSON file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        serde_json::from_str(&content)
            .map_err(|e| FormscoutError::Config(format!("{}: {}", path.display(), e)))
    }

    /// Save configuration to a JSON file.
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = serde_json::to_string_pretty(self)
            .map_err(|e| FormscoutError::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_json_keeps_defaults() {
        let json = r#"{ "pdf": { "min_text_length": 100 }, "classifier": { "strategy": "pattern" } }"#;
        let config: FormscoutConfig = serde_json::from_str(json).unwrap();

        assert_eq!(config.pdf.min_text_length, 100);
        assert!(!config.pdf.annotate_pages);
        assert_eq!(config.classifier.strategy, ClassifierStrategy::Pattern);
        assert_eq!(config.classifier.keyword.max_line_length, 60);
        assert_eq!(config.classifier.keyword.min_label_length, 3);
        assert_eq!(config.classifier.keyword.max_label_length, 40);
        assert_eq!(config.ocr.max_images, 32);
    }

    #[test]
    fn test_keywords_are_lowercase() {
        let config = KeywordConfig::default();
        for keyword in config.allowed_keywords.iter().chain(&config.banned_keywords) {
            assert_eq!(keyword, &keyword.to_lowercase());
        }
        assert!(config.banned_keywords.contains("page"));
        assert!(!config.banned_keywords.contains("instructions"));
        assert!(config.allowed_keywords.contains("cnic"));
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");

        let mut config = FormscoutConfig::default();
        config.ocr.time_budget_ms = 5_000;
        config.save(&path).unwrap();

        let loaded = FormscoutConfig::from_file(&path).unwrap();
        assert_eq!(loaded.ocr.time_budget_ms, 5_000);
        assert_eq!(loaded.classifier.keyword.separators, vec![':', '-', '–']);
    }
}
