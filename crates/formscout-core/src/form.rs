//! Data exchanged with a form renderer.
//!
//! The renderer itself lives outside the core: it turns [`FormPrompt`]s into
//! interactive widgets and builds a [`UserInputRecord`] from what the user
//! submits.

use std::path::PathBuf;

use chrono::NaiveDate;
use serde::ser::{SerializeMap, Serializer};
use serde::Serialize;

use crate::classify::FieldLabel;
use crate::pdf::FieldKind;
use crate::pipeline::Detection;

/// Widget used to collect a value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum WidgetKind {
    Text,
    Date,
    File,
}

impl WidgetKind {
    /// Pick a widget from the label text (case-insensitive).
    pub fn for_label(label: &str) -> Self {
        let lower = label.to_lowercase();
        if lower.contains("date") {
            WidgetKind::Date
        } else if ["photo", "image", "file"].iter().any(|k| lower.contains(k)) {
            WidgetKind::File
        } else {
            WidgetKind::Text
        }
    }
}

impl From<FieldKind> for WidgetKind {
    fn from(kind: FieldKind) -> Self {
        match kind {
            FieldKind::Text => WidgetKind::Text,
            FieldKind::Date => WidgetKind::Date,
            FieldKind::Image => WidgetKind::File,
        }
    }
}

/// One input the renderer should ask for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FormPrompt {
    pub label: FieldLabel,
    pub kind: WidgetKind,
}

impl FormPrompt {
    /// Prompts for every detected label, in order.
    ///
    /// A structured descriptor's kind wins over the label heuristic.
    pub fn from_detection(detection: &Detection) -> Vec<FormPrompt> {
        detection
            .labels
            .iter()
            .map(|label| {
                let kind = detection
                    .fields
                    .iter()
                    .find(|field| &field.label == label)
                    .map(|field| WidgetKind::from(field.kind))
                    .unwrap_or_else(|| WidgetKind::for_label(label.as_str()));
                FormPrompt {
                    label: label.clone(),
                    kind,
                }
            })
            .collect()
    }
}

/// A submitted value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldValue {
    Text(String),
    Date(NaiveDate),
    File(PathBuf),
    Null,
}

impl Serialize for FieldValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            FieldValue::Text(text) => serializer.serialize_str(text),
            FieldValue::Date(date) => serializer.serialize_str(&date.format("%Y-%m-%d").to_string()),
            FieldValue::File(path) => serializer.serialize_str(&path.to_string_lossy()),
            FieldValue::Null => serializer.serialize_none(),
        }
    }
}

/// Label → value mapping collected by a renderer, in prompt order.
///
/// Serializes as a JSON object. Setting a label twice replaces the value in
/// place.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UserInputRecord {
    entries: Vec<(FieldLabel, FieldValue)>,
}

impl UserInputRecord {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, label: FieldLabel, value: FieldValue) {
        match self.entries.iter_mut().find(|(existing, _)| *existing == label) {
            Some((_, slot)) => *slot = value,
            None => self.entries.push((label, value)),
        }
    }

    pub fn get(&self, label: &str) -> Option<&FieldValue> {
        self.entries
            .iter()
            .find(|(existing, _)| existing.as_str() == label)
            .map(|(_, value)| value)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&FieldLabel, &FieldValue)> {
        self.entries.iter().map(|(label, value)| (label, value))
    }
}

impl Serialize for UserInputRecord {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (label, value) in &self.entries {
            map.serialize_entry(label.as_str(), value)?;
        }
        map.end()
    }
}
