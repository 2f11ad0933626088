//! The field detector state machine.

use tracing::{debug, info, warn};

use super::{Detection, DetectionStatus, Stage, StageFailure, StageObserver};
use crate::classify::{classifier_from_config, FieldLabel, LabelClassifier};
use crate::models::config::FormscoutConfig;
use crate::ocr::{ImageTextScanner, TextRecognizer};
use crate::pdf::{content_length, extract_text, read_structured_fields, PageSource, PdfDocument};

/// Runs the extraction cascade:
/// structured fields → embedded text → OCR over images.
///
/// Each stage runs at most once per document and a stage only runs when the
/// previous one came up empty. The detector never fails: stage errors are
/// recorded in the returned [`Detection`].
pub struct FieldDetector<'a> {
    config: FormscoutConfig,
    classifier: Box<dyn LabelClassifier>,
    recognizer: Option<&'a dyn TextRecognizer>,
    observer: Option<&'a dyn StageObserver>,
}

/// Bookkeeping for one cascade run.
#[derive(Default)]
struct Run {
    stages: Vec<Stage>,
    failures: Vec<StageFailure>,
    unreadable_stages: usize,
    partial: bool,
}

impl Run {
    fn fail(&mut self, stage: Stage, message: String) {
        self.failures.push(StageFailure { stage, message });
    }

    fn finish(
        self,
        labels: Vec<FieldLabel>,
        fields: Vec<crate::pdf::StructuredFieldDescriptor>,
        produced_by: DetectionStatus,
    ) -> Detection {
        let status = if !labels.is_empty() {
            produced_by
        } else if !self.stages.is_empty() && self.unreadable_stages == self.stages.len() {
            DetectionStatus::Unreadable
        } else {
            DetectionStatus::NoFieldsFound
        };

        info!("Detection finished: {} labels ({:?})", labels.len(), status);

        Detection {
            labels,
            fields,
            status,
            partial: self.partial,
            stages: self.stages,
            failures: self.failures,
        }
    }
}

impl<'a> FieldDetector<'a> {
    /// Create a detector using the classifier selected by `config`.
    pub fn new(config: FormscoutConfig) -> Self {
        let classifier = classifier_from_config(&config.classifier);
        Self {
            config,
            classifier,
            recognizer: None,
            observer: None,
        }
    }

    /// Lend an OCR engine to the fallback stage. Without one, OCR is skipped.
    pub fn with_recognizer(mut self, recognizer: &'a dyn TextRecognizer) -> Self {
        self.recognizer = Some(recognizer);
        self
    }

    /// Attach an instrumentation hook.
    pub fn with_observer(mut self, observer: &'a dyn StageObserver) -> Self {
        self.observer = Some(observer);
        self
    }

    /// Replace the configured classifier.
    pub fn with_classifier(mut self, classifier: Box<dyn LabelClassifier>) -> Self {
        self.classifier = classifier;
        self
    }

    pub fn config(&self) -> &FormscoutConfig {
        &self.config
    }

    /// Parse a PDF buffer and run the cascade on it.
    ///
    /// A buffer that cannot be parsed fails the structured stage and leaves
    /// nothing for the later stages to read, so the result is `Unreadable`.
    pub fn detect_bytes(&self, data: &[u8]) -> Detection {
        match PdfDocument::from_bytes(data) {
            Ok(document) => self.detect(&document),
            Err(e) => {
                warn!("Could not open document: {}", e);
                let mut run = Run::default();
                self.enter(&mut run, Stage::StructuredFields);
                run.fail(Stage::StructuredFields, e.to_string());
                run.unreadable_stages += 1;
                run.finish(Vec::new(), Vec::new(), DetectionStatus::NoFieldsFound)
            }
        }
    }

    /// Run the cascade on a loaded document.
    pub fn detect(&self, source: &dyn PageSource) -> Detection {
        let mut run = Run::default();

        // Structured fields
        self.enter(&mut run, Stage::StructuredFields);
        match read_structured_fields(source) {
            Ok(fields) if !fields.is_empty() => {
                info!("Using {} structured form fields", fields.len());
                let labels = fields.iter().map(|f| f.label.clone()).collect();
                return run.finish(labels, fields, DetectionStatus::FormFields);
            }
            Ok(_) => debug!("No structured form fields"),
            Err(e) => {
                warn!("Structured field reader failed: {}", e);
                run.fail(Stage::StructuredFields, e.to_string());
                run.unreadable_stages += 1;
            }
        }

        // Embedded text
        self.enter(&mut run, Stage::EmbeddedText);
        let text = match extract_text(source, self.config.pdf.annotate_pages) {
            Ok(text) => text,
            Err(e) => {
                warn!("Text extraction failed: {}", e);
                run.fail(Stage::EmbeddedText, e.to_string());
                run.unreadable_stages += 1;
                String::new()
            }
        };

        let length = content_length(&text);
        if length >= self.config.pdf.min_text_length {
            let labels = self.classify(&text);
            return run.finish(labels, Vec::new(), DetectionStatus::EmbeddedText);
        }
        info!(
            "Embedded text too short ({} < {} chars), falling back to OCR",
            length, self.config.pdf.min_text_length
        );

        // OCR over embedded images
        let Some(recognizer) = self.recognizer else {
            warn!("No OCR engine available, skipping image text recognition");
            return run.finish(Vec::new(), Vec::new(), DetectionStatus::OcrFallback);
        };

        self.enter(&mut run, Stage::Ocr);
        let outcome = ImageTextScanner::new(recognizer, &self.config.ocr).scan(source);
        if outcome.images_processed == 0 && !outcome.errors.is_empty() {
            run.unreadable_stages += 1;
        }
        for error in outcome.errors {
            run.fail(Stage::Ocr, error);
        }
        run.partial = outcome.partial;

        let labels = self.classify(&outcome.text);
        run.finish(labels, Vec::new(), DetectionStatus::OcrFallback)
    }

    fn enter(&self, run: &mut Run, stage: Stage) {
        debug!("Entering stage {:?}", stage);
        if let Some(observer) = self.observer {
            observer.on_stage(stage);
        }
        run.stages.push(stage);
    }

    fn classify(&self, text: &str) -> Vec<FieldLabel> {
        let mut labels = self.classifier.classify(text);
        let max = self.config.classifier.max_labels;
        if max > 0 && labels.len() > max {
            debug!("Keeping first {} of {} labels", max, labels.len());
            labels.truncate(max);
        }
        debug!("{} classifier produced {} labels", self.classifier.name(), labels.len());
        labels
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{OcrError, PdfError};
    use crate::models::config::ClassifierStrategy;
    use crate::pdf::{FormWidget, Result as PdfResult};
    use image::DynamicImage;
    use pretty_assertions::assert_eq;
    use std::cell::{Cell, RefCell};

    const FORM_TEXT: &str = "\
Applicant details
Full Name: ____________________
Date of Birth: ____________________
Email: ____________________";

    /// In-memory document with call counters.
    #[derive(Default)]
    struct MemoryDocument {
        widgets: Vec<FormWidget>,
        widget_error: bool,
        pages: Vec<String>,
        text_error: bool,
        images: Vec<usize>,
        image_error: bool,
        text_calls: Cell<usize>,
    }

    impl PageSource for MemoryDocument {
        fn page_count(&self) -> u32 {
            self.pages.len().max(self.images.len()) as u32
        }

        fn form_widgets(&self) -> PdfResult<Vec<FormWidget>> {
            if self.widget_error {
                return Err(PdfError::Parse("broken catalog".to_string()));
            }
            Ok(self.widgets.clone())
        }

        fn page_texts(&self) -> PdfResult<Vec<String>> {
            self.text_calls.set(self.text_calls.get() + 1);
            if self.text_error {
                return Err(PdfError::TextExtraction("broken fonts".to_string()));
            }
            Ok(self.pages.clone())
        }

        fn page_images(&self, index: u32) -> PdfResult<Vec<DynamicImage>> {
            if self.image_error {
                return Err(PdfError::ImageExtraction("broken resources".to_string()));
            }
            let count = self.images.get(index as usize).copied().unwrap_or(0);
            Ok(vec![DynamicImage::new_luma8(4, 4); count])
        }
    }

    /// Recognizer returning the same text for every image.
    struct Scripted {
        text: &'static str,
        calls: Cell<usize>,
    }

    impl Scripted {
        fn new(text: &'static str) -> Self {
            Self {
                text,
                calls: Cell::new(0),
            }
        }
    }

    impl TextRecognizer for Scripted {
        fn recognize(&self, _image: &DynamicImage) -> Result<String, OcrError> {
            self.calls.set(self.calls.get() + 1);
            Ok(self.text.to_string())
        }
    }

    #[derive(Default)]
    struct Recorder(RefCell<Vec<Stage>>);

    impl StageObserver for Recorder {
        fn on_stage(&self, stage: Stage) {
            self.0.borrow_mut().push(stage);
        }
    }

    fn widget(name: &str) -> FormWidget {
        FormWidget {
            name: name.to_string(),
            field_type: Some("Tx".to_string()),
            page: Some(0),
            ..Default::default()
        }
    }

    fn labels(detection: &Detection) -> Vec<&str> {
        detection.labels.iter().map(|l| l.as_str()).collect()
    }

    #[test]
    fn test_structured_fields_short_circuit() {
        let document = MemoryDocument {
            widgets: vec![widget("name"), widget("submit"), widget("dob")],
            pages: vec![FORM_TEXT.to_string()],
            images: vec![2],
            ..Default::default()
        };
        let recognizer = Scripted::new("City: ____");
        let recorder = Recorder::default();

        let detection = FieldDetector::new(FormscoutConfig::default())
            .with_recognizer(&recognizer)
            .with_observer(&recorder)
            .detect(&document);

        assert_eq!(labels(&detection), vec!["Name", "Dob"]);
        assert_eq!(detection.status, DetectionStatus::FormFields);
        assert_eq!(detection.fields.len(), 2);
        assert_eq!(*recorder.0.borrow(), vec![Stage::StructuredFields]);
        assert_eq!(document.text_calls.get(), 0);
        assert_eq!(recognizer.calls.get(), 0);
    }

    #[test]
    fn test_sufficient_text_skips_ocr() {
        let document = MemoryDocument {
            pages: vec![FORM_TEXT.to_string()],
            images: vec![1],
            ..Default::default()
        };
        let recognizer = Scripted::new("City: ____");
        let recorder = Recorder::default();

        let detection = FieldDetector::new(FormscoutConfig::default())
            .with_recognizer(&recognizer)
            .with_observer(&recorder)
            .detect(&document);

        assert_eq!(labels(&detection), vec!["Full Name", "Date Of Birth", "Email"]);
        assert_eq!(detection.status, DetectionStatus::EmbeddedText);
        assert_eq!(
            *recorder.0.borrow(),
            vec![Stage::StructuredFields, Stage::EmbeddedText]
        );
        assert_eq!(recognizer.calls.get(), 0);
    }

    #[test]
    fn test_threshold_boundary() {
        let mut config = FormscoutConfig::default();
        config.pdf.min_text_length = 20;

        let at_threshold = "Name: 12345678901234";
        let below_threshold = "Name: 1234567890123";
        assert_eq!(at_threshold.chars().count(), 20);

        for (text, expect_ocr) in [(at_threshold, false), (below_threshold, true)] {
            let document = MemoryDocument {
                pages: vec![text.to_string()],
                images: vec![1],
                ..Default::default()
            };
            let recognizer = Scripted::new("City: ____");

            FieldDetector::new(config.clone())
                .with_recognizer(&recognizer)
                .detect(&document);

            assert_eq!(recognizer.calls.get() > 0, expect_ocr, "text {:?}", text);
        }
    }

    #[test]
    fn test_ocr_fallback() {
        let document = MemoryDocument {
            pages: vec!["Scanned".to_string(), String::new()],
            images: vec![1, 1],
            ..Default::default()
        };
        let recognizer = Scripted::new("Father Name: ____\nCity: ____");
        let recorder = Recorder::default();

        let detection = FieldDetector::new(FormscoutConfig::default())
            .with_recognizer(&recognizer)
            .with_observer(&recorder)
            .detect(&document);

        assert_eq!(labels(&detection), vec!["Father Name", "City"]);
        assert_eq!(detection.status, DetectionStatus::OcrFallback);
        assert_eq!(detection.status.message(), "No usable embedded text; used OCR fallback to detect labels");
        assert_eq!(recognizer.calls.get(), 2);
        assert_eq!(
            *recorder.0.borrow(),
            vec![Stage::StructuredFields, Stage::EmbeddedText, Stage::Ocr]
        );
    }

    #[test]
    fn test_empty_document() {
        let document = MemoryDocument {
            pages: vec![String::new()],
            ..Default::default()
        };
        let recognizer = Scripted::new("Name: ____");

        let detection = FieldDetector::new(FormscoutConfig::default())
            .with_recognizer(&recognizer)
            .detect(&document);

        assert!(detection.is_empty());
        assert_eq!(detection.status, DetectionStatus::NoFieldsFound);
        assert_eq!(detection.status.message(), "No fields found");
        assert!(detection.failures.is_empty());
        assert_eq!(recognizer.calls.get(), 0);
    }

    #[test]
    fn test_without_recognizer() {
        let document = MemoryDocument {
            pages: vec![String::new()],
            images: vec![3],
            ..Default::default()
        };

        let detection = FieldDetector::new(FormscoutConfig::default()).detect(&document);

        assert!(detection.is_empty());
        assert_eq!(detection.status, DetectionStatus::NoFieldsFound);
        assert_eq!(detection.stages, vec![Stage::StructuredFields, Stage::EmbeddedText]);
    }

    #[test]
    fn test_stage_errors_are_recovered() {
        let document = MemoryDocument {
            widget_error: true,
            pages: vec![FORM_TEXT.to_string()],
            ..Default::default()
        };

        let detection = FieldDetector::new(FormscoutConfig::default()).detect(&document);

        assert_eq!(detection.status, DetectionStatus::EmbeddedText);
        assert_eq!(detection.labels.len(), 3);
        assert_eq!(detection.failures.len(), 1);
        assert_eq!(detection.failures[0].stage, Stage::StructuredFields);
    }

    #[test]
    fn test_all_stages_unreadable() {
        let document = MemoryDocument {
            widget_error: true,
            text_error: true,
            image_error: true,
            images: vec![1],
            ..Default::default()
        };
        let recognizer = Scripted::new("Name: ____");

        let detection = FieldDetector::new(FormscoutConfig::default())
            .with_recognizer(&recognizer)
            .detect(&document);

        assert!(detection.is_empty());
        assert_eq!(detection.status, DetectionStatus::Unreadable);
        assert_eq!(detection.failures.len(), 3);
    }

    #[test]
    fn test_garbage_bytes() {
        let recorder = Recorder::default();
        let detection = FieldDetector::new(FormscoutConfig::default())
            .with_observer(&recorder)
            .detect_bytes(b"%PDF-not really");

        assert!(detection.is_empty());
        assert_eq!(detection.status, DetectionStatus::Unreadable);
        assert_eq!(*recorder.0.borrow(), vec![Stage::StructuredFields]);
    }

    #[test]
    fn test_partial_scan_is_reported() {
        let mut config = FormscoutConfig::default();
        config.ocr.max_images = 1;
        let document = MemoryDocument {
            pages: vec![String::new()],
            images: vec![3],
            ..Default::default()
        };
        let recognizer = Scripted::new("Email: ____");

        let detection = FieldDetector::new(config)
            .with_recognizer(&recognizer)
            .detect(&document);

        assert_eq!(labels(&detection), vec!["Email"]);
        assert!(detection.partial);
        assert_eq!(recognizer.calls.get(), 1);
    }

    #[test]
    fn test_duplicate_labels_collapse() {
        let mut config = FormscoutConfig::default();
        config.pdf.min_text_length = 5;
        let document = MemoryDocument {
            pages: vec!["Name: John".to_string(), "Name: Jane".to_string()],
            ..Default::default()
        };

        let detection = FieldDetector::new(config).detect(&document);
        assert_eq!(labels(&detection), vec!["Name"]);
    }

    #[test]
    fn test_pattern_strategy_and_label_cap() {
        let mut config = FormscoutConfig::default();
        config.pdf.min_text_length = 5;
        config.classifier.strategy = ClassifierStrategy::Pattern;
        config.classifier.max_labels = 2;
        let document = MemoryDocument {
            pages: vec!["Name: ____ Date: ____\nVehicle: ____".to_string()],
            ..Default::default()
        };

        let detection = FieldDetector::new(config).detect(&document);
        assert_eq!(labels(&detection), vec!["Name", "Date"]);
    }

    #[test]
    fn test_idempotent() {
        let document = MemoryDocument {
            pages: vec![String::new()],
            images: vec![2],
            ..Default::default()
        };
        let recognizer = Scripted::new("Gender: ____\nNationality: ____");
        let detector = FieldDetector::new(FormscoutConfig::default()).with_recognizer(&recognizer);

        let first = detector.detect(&document);
        let second = detector.detect(&document);
        assert_eq!(first, second);
    }

    #[test]
    fn test_detection_serializes() {
        let document = MemoryDocument {
            widgets: vec![widget("photo")],
            ..Default::default()
        };
        let detection = FieldDetector::new(FormscoutConfig::default()).detect(&document);

        let json = serde_json::to_value(&detection).unwrap();
        assert_eq!(json["labels"], serde_json::json!(["Photo"]));
        assert_eq!(json["status"], "form_fields");
        assert_eq!(json["fields"][0]["kind"], "image");
        assert!(json.get("failures").is_none());
    }
}
