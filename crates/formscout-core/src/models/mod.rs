//! Data models shared across the pipeline.

pub mod config;

pub use config::{
    ClassifierConfig, ClassifierStrategy, FormscoutConfig, KeywordConfig, OcrConfig, PatternConfig,
    PdfConfig,
};
