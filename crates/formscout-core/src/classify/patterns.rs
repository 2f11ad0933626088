//! Regex patterns shared by the label classifiers.

use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    // Label-like text (starts with a letter, no digits-only labels) directly
    // followed by a colon. Matched per line, so `\s` never crosses lines.
    pub static ref LABEL_BEFORE_COLON: Regex = Regex::new(
        r"(\p{L}[\p{L}\p{N} '’/&().#,\-]*?)\s*[:：]"
    ).unwrap();

    // Runs of whitespace inside a label
    pub static ref WHITESPACE_RUN: Regex = Regex::new(r"\s+").unwrap();
}
