//! Pattern-anchored classifier.

use tracing::debug;

use super::patterns::LABEL_BEFORE_COLON;
use super::{FieldLabel, LabelClassifier, LabelSet};
use crate::models::config::PatternConfig;

/// Accepts any label-like text followed by a colon, with no domain
/// vocabulary. Every match on a line is a candidate.
pub struct PatternClassifier {
    config: PatternConfig,
}

impl PatternClassifier {
    pub fn new(config: PatternConfig) -> Self {
        Self { config }
    }

    fn accepts(&self, label: &FieldLabel) -> bool {
        let length = label.len();
        length >= self.config.min_label_length
            && length <= self.config.max_label_length
            && label.as_str().split(' ').count() <= self.config.max_words
    }
}

impl Default for PatternClassifier {
    fn default() -> Self {
        Self::new(PatternConfig::default())
    }
}

impl LabelClassifier for PatternClassifier {
    fn name(&self) -> &'static str {
        "pattern"
    }

    fn classify(&self, text: &str) -> Vec<FieldLabel> {
        let mut labels = LabelSet::default();
        let mut matches = 0;

        for line in text.lines() {
            for caps in LABEL_BEFORE_COLON.captures_iter(line) {
                matches += 1;

                // "https://..." is not a label
                let end = caps.get(0).map_or(line.len(), |m| m.end());
                if line[end..].starts_with("//") {
                    continue;
                }

                let Some(label) = FieldLabel::normalize(&caps[1]) else {
                    continue;
                };
                if self.accepts(&label) {
                    labels.insert(label);
                }
            }
        }

        let labels = labels.into_vec();
        debug!("Pattern classifier: {} matches -> {} labels", matches, labels.len());
        labels
    }
}
