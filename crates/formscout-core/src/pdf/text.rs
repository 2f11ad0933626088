//! Document text extractor: embedded page text joined into one blob.

use tracing::debug;

use super::{PageSource, Result};

const PAGE_MARKER_PREFIX: &str = "--- page ";

/// Concatenate the embedded text of every page.
///
/// Pages are separated by a blank line. With `annotate_pages`, each page is
/// preceded by a `--- page N ---` marker (1-based). Documents without
/// embedded text yield an empty string.
pub fn extract_text(source: &dyn PageSource, annotate_pages: bool) -> Result<String> {
    let pages = source.page_texts()?;
    let mut text = String::new();

    for (index, page_text) in pages.iter().enumerate() {
        let page_text = page_text.trim();
        if page_text.is_empty() && !annotate_pages {
            continue;
        }
        if !text.is_empty() {
            text.push_str("\n\n");
        }
        if annotate_pages {
            text.push_str(&format!("{}{} ---\n", PAGE_MARKER_PREFIX, index + 1));
        }
        text.push_str(page_text);
    }

    debug!(
        "Extracted {} chars of embedded text from {} pages",
        text.len(),
        pages.len()
    );
    Ok(text)
}

/// Number of content characters in extracted text, ignoring page markers and
/// surrounding whitespace.
pub fn content_length(text: &str) -> usize {
    text.lines()
        .map(str::trim)
        .filter(|line| !(line.starts_with(PAGE_MARKER_PREFIX) && line.ends_with("---")))
        .map(|line| line.chars().count())
        .sum()
}
