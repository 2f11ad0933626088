//! Field classifier: turns raw text into an ordered set of field labels.

mod keyword;
mod pattern;
pub mod patterns;

pub use keyword::KeywordClassifier;
pub use pattern::PatternClassifier;

use std::collections::HashSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::models::config::{ClassifierConfig, ClassifierStrategy};
use patterns::WHITESPACE_RUN;

/// A normalized, non-empty prompt string such as `Date Of Birth`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FieldLabel(String);

impl FieldLabel {
    /// Normalize raw label text: trim whitespace and stray separator
    /// punctuation, collapse inner whitespace and title-case every word.
    ///
    /// Returns `None` when nothing is left.
    pub fn normalize(raw: &str) -> Option<Self> {
        let trimmed = raw.trim_matches(|c: char| {
            c.is_whitespace() || matches!(c, ':' | '：' | '-' | '–' | '_' | '.' | '*')
        });
        if trimmed.is_empty() {
            return None;
        }

        let collapsed = WHITESPACE_RUN.replace_all(trimmed, " ");
        let titled = collapsed
            .split(' ')
            .map(title_case_word)
            .collect::<Vec<_>>()
            .join(" ");

        Some(Self(titled))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Length in characters.
    pub fn len(&self) -> usize {
        self.0.chars().count()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for FieldLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for FieldLabel {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

fn title_case_word(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first
            .to_uppercase()
            .chain(chars.flat_map(char::to_lowercase))
            .collect(),
        None => String::new(),
    }
}

/// Trait for label classification strategies.
///
/// Implementations never fail: text that yields nothing produces an empty
/// list. Labels are unique and kept in first-occurrence order.
pub trait LabelClassifier {
    /// Short strategy name for logs.
    fn name(&self) -> &'static str;

    /// Classify a raw text blob into field labels.
    fn classify(&self, text: &str) -> Vec<FieldLabel>;
}

/// Build the classifier selected by configuration.
pub fn classifier_from_config(config: &ClassifierConfig) -> Box<dyn LabelClassifier> {
    match config.strategy {
        ClassifierStrategy::Keyword => Box::new(KeywordClassifier::new(config.keyword.clone())),
        ClassifierStrategy::Pattern => Box::new(PatternClassifier::new(config.pattern.clone())),
    }
}

/// Insertion-ordered label set; the first occurrence wins.
#[derive(Debug, Default)]
pub(crate) struct LabelSet {
    labels: Vec<FieldLabel>,
    seen: HashSet<String>,
}

impl LabelSet {
    pub(crate) fn insert(&mut self, label: FieldLabel) -> bool {
        if self.seen.insert(label.as_str().to_string()) {
            self.labels.push(label);
            true
        } else {
            false
        }
    }

    pub(crate) fn into_vec(self) -> Vec<FieldLabel> {
        self.labels
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_label() {
        let label = FieldLabel::normalize("  email address :").unwrap();
        assert_eq!(label.as_str(), "Email Address");

        assert_eq!(FieldLabel::normalize("DATE   of\tBIRTH").unwrap().as_str(), "Date Of Birth");
        assert_eq!(FieldLabel::normalize("*Full name__").unwrap().as_str(), "Full Name");
        assert_eq!(FieldLabel::normalize("e-mail").unwrap().as_str(), "E-mail");
        assert_eq!(FieldLabel::normalize("ádres").unwrap().as_str(), "Ádres");
    }

    #[test]
    fn test_normalize_empty() {
        assert!(FieldLabel::normalize("").is_none());
        assert!(FieldLabel::normalize("  :  ").is_none());
        assert!(FieldLabel::normalize("____").is_none());
    }

    #[test]
    fn test_label_set_keeps_first() {
        let mut set = LabelSet::default();
        assert!(set.insert(FieldLabel::normalize("name").unwrap()));
        assert!(set.insert(FieldLabel::normalize("city").unwrap()));
        assert!(!set.insert(FieldLabel::normalize("NAME").unwrap()));

        let labels: Vec<String> = set.into_vec().iter().map(|l| l.to_string()).collect();
        assert_eq!(labels, vec!["Name", "City"]);
    }

    #[test]
    fn test_classifier_from_config() {
        let mut config = ClassifierConfig::default();
        assert_eq!(classifier_from_config(&config).name(), "keyword");

        config.strategy = ClassifierStrategy::Pattern;
        assert_eq!(classifier_from_config(&config).name(), "pattern");
    }
}
