//! Structured field reader: natively declared interactive form fields.

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::document::FLAG_PUSH_BUTTON;
use super::{FormWidget, PageSource, Result};
use crate::classify::FieldLabel;

/// Control names that never describe user input.
pub const RESERVED_FIELD_NAMES: &[&str] = &["submit", "reset"];

/// Input kind of a structured field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldKind {
    Text,
    Date,
    Image,
}

/// A field read from the document's own form metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StructuredFieldDescriptor {
    /// Normalized field name.
    pub label: FieldLabel,
    /// Input kind.
    pub kind: FieldKind,
    /// Page index (0-based), if the field is attached to a page.
    pub page: Option<u32>,
}

impl FieldKind {
    fn of(widget: &FormWidget, label: &FieldLabel) -> Self {
        let is_push_button =
            widget.field_type.as_deref() == Some("Btn") && widget.flags & FLAG_PUSH_BUTTON != 0;
        let lower = label.as_str().to_lowercase();

        // Acrobat image fields are push buttons with an icon
        if is_push_button || ["photo", "image", "file"].iter().any(|k| lower.contains(k)) {
            FieldKind::Image
        } else if widget.date_format || lower.contains("date") {
            FieldKind::Date
        } else {
            FieldKind::Text
        }
    }
}

/// Read the document's interactive fields.
///
/// Unnamed fields and the reserved `submit`/`reset` controls are skipped;
/// names are normalized and deduplicated, keeping the first occurrence.
pub fn read_structured_fields(source: &dyn PageSource) -> Result<Vec<StructuredFieldDescriptor>> {
    let widgets = source.form_widgets()?;
    let mut fields: Vec<StructuredFieldDescriptor> = Vec::new();

    for widget in &widgets {
        let trimmed = widget.name.trim();
        if trimmed.is_empty() || is_reserved(trimmed) {
            continue;
        }
        let Some(label) = FieldLabel::normalize(trimmed) else {
            continue;
        };
        if fields.iter().any(|f| f.label == label) {
            continue;
        }

        let kind = FieldKind::of(widget, &label);
        fields.push(StructuredFieldDescriptor {
            label,
            kind,
            page: widget.page,
        });
    }

    debug!(
        "Structured fields: {} widgets -> {} fields",
        widgets.len(),
        fields.len()
    );
    Ok(fields)
}

fn is_reserved(name: &str) -> bool {
    RESERVED_FIELD_NAMES
        .iter()
        .any(|reserved| name.eq_ignore_ascii_case(reserved))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::PdfError;
    use image::DynamicImage;
    use pretty_assertions::assert_eq;

    struct Widgets(Vec<FormWidget>);

    impl PageSource for Widgets {
        fn page_count(&self) -> u32 {
            1
        }

        fn form_widgets(&self) -> Result<Vec<FormWidget>> {
            Ok(self.0.clone())
        }

        fn page_texts(&self) -> Result<Vec<String>> {
            Err(PdfError::TextExtraction("not used".to_string()))
        }

        fn page_images(&self, _index: u32) -> Result<Vec<DynamicImage>> {
            Ok(Vec::new())
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

    fn labels(fields: &[StructuredFieldDescriptor]) -> Vec<&str> {
        fields.iter().map(|f| f.label.as_str()).collect()
    }

    #[test]
    fn test_normalizes_and_dedupes() {
        let source = Widgets(vec![
            widget("  full name "),
            widget("Full Name"),
            widget("email"),
            widget(""),
            widget("   "),
        ]);

        let fields = read_structured_fields(&source).unwrap();
        assert_eq!(labels(&fields), vec!["Full Name", "Email"]);
    }

    #[test]
    fn test_skips_reserved_controls() {
        let source = Widgets(vec![widget("SUBMIT"), widget("reset"), widget("city")]);
        let fields = read_structured_fields(&source).unwrap();
        assert_eq!(labels(&fields), vec!["City"]);
    }

    #[test]
    fn test_field_kinds() {
        let mut photo_button = widget("applicant");
        photo_button.field_type = Some("Btn".to_string());
        photo_button.flags = FLAG_PUSH_BUTTON;

        let mut formatted = widget("dob");
        formatted.date_format = true;

        let source = Widgets(vec![
            widget("issue date"),
            widget("passport photo"),
            photo_button,
            formatted,
            widget("name"),
        ]);

        let kinds: Vec<FieldKind> = read_structured_fields(&source)
            .unwrap()
            .into_iter()
            .map(|f| f.kind)
            .collect();
        assert_eq!(
            kinds,
            vec![
                FieldKind::Date,
                FieldKind::Image,
                FieldKind::Image,
                FieldKind::Date,
                FieldKind::Text
            ]
        );
    }

    #[test]
    fn test_reads_real_widgets() {
        use super::super::document::tests::{build_pdf, text_field};
        use super::super::PdfDocument;

        let bytes = build_pdf(|doc, page, _| {
            let first = text_field(doc, "father name");
            let second = text_field(doc, "submit");
            page.set("Annots", vec![first, second]);
        });
        let document = PdfDocument::from_bytes(&bytes).unwrap();

        let fields = read_structured_fields(&document).unwrap();
        assert_eq!(labels(&fields), vec!["Father Name"]);
        assert_eq!(fields[0].page, Some(0));
    }
}
