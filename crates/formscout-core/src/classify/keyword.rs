//! Keyword-anchored classifier.

use tracing::{debug, trace};

use super::{FieldLabel, LabelClassifier, LabelSet};
use crate::models::config::KeywordConfig;

/// Keeps lines that look like `label: value` and mention a known domain
/// keyword without mentioning a banned one.
pub struct KeywordClassifier {
    config: KeywordConfig,
}

impl KeywordClassifier {
    pub fn new(config: KeywordConfig) -> Self {
        Self { config }
    }

    /// Label candidate for a single line, if the line qualifies.
    fn label_for_line(&self, line: &str) -> Option<FieldLabel> {
        let line = line.trim();
        let length = line.chars().count();
        if length < self.config.min_line_length || length > self.config.max_line_length {
            return None;
        }

        let split_at = self.separator_position(line)?;

        let lower = line.to_lowercase();
        if let Some(banned) = self
            .config
            .banned_keywords
            .iter()
            .find(|k| starts_word(&lower, k))
        {
            trace!("Banned keyword {:?} in line: {:?}", banned, line);
            return None;
        }
        if !self.config.allowed_keywords.iter().any(|k| lower.contains(k.as_str())) {
            return None;
        }

        let label = FieldLabel::normalize(&line[..split_at])?;
        let label_length = label.len();
        if label_length < self.config.min_label_length
            || label_length > self.config.max_label_length
        {
            trace!("Label length {} out of bounds: {:?}", label_length, label.as_str());
            return None;
        }
        Some(label)
    }

    /// Byte offset of the earliest separator in the line.
    fn separator_position(&self, line: &str) -> Option<usize> {
        let mut chars = line.char_indices().peekable();
        let mut previous: Option<char> = None;

        while let Some((offset, c)) = chars.next() {
            let next = chars.peek().map(|(_, next)| *next);
            if self.config.separators.contains(&c) && is_separator(c, previous, next) {
                return Some(offset);
            }
            previous = Some(c);
        }
        None
    }
}

/// Dashes separate only when set apart by whitespace or trailing the line.
fn is_separator(c: char, previous: Option<char>, next: Option<char>) -> bool {
    if !matches!(c, '-' | '–') {
        return true;
    }
    match next {
        None => true,
        Some(next) => next.is_whitespace() && previous.is_some_and(char::is_whitespace),
    }
}

/// Whether `keyword` occurs in `text` at the start of a word.
fn starts_word(text: &str, keyword: &str) -> bool {
    text.match_indices(keyword).any(|(offset, _)| {
        text[..offset]
            .chars()
            .next_back()
            .is_none_or(|before| !before.is_alphanumeric())
    })
}

impl Default for KeywordClassifier {
    fn default() -> Self {
        Self::new(KeywordConfig::default())
    }
}

impl LabelClassifier for KeywordClassifier {
    fn name(&self) -> &'static str {
        "keyword"
    }

    fn classify(&self, text: &str) -> Vec<FieldLabel> {
        let mut labels = LabelSet::default();
        let mut lines = 0;

        for line in text.lines() {
            lines += 1;
            if let Some(label) = self.label_for_line(line) {
                labels.insert(label);
            }
        }

        let labels = labels.into_vec();
        debug!("Keyword classifier: {} lines -> {} labels", lines, labels.len());
        labels
    }
}
