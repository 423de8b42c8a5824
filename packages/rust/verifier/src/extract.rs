//! Title, body text and snippet extraction from a loaded document.

use scraper::{Html, Selector};

/// Document title as a browser reports it: the first `<title>`, with
/// whitespace runs collapsed to single spaces. Empty when absent.
pub fn document_title(html: &str) -> String {
    let doc = Html::parse_document(html);
    let Ok(title_sel) = Selector::parse("title") else {
        return String::new();
    };
    doc.select(&title_sel)
        .next()
        .map(|el| {
            el.text()
                .collect::<String>()
                .split_whitespace()
                .collect::<Vec<_>>()
                .join(" ")
        })
        .unwrap_or_default()
}

/// Text content of the first element matching `selector`, or `None` when
/// nothing matches (or the selector is invalid).
///
/// Same as DOM `textContent`: every descendant text node in document order,
/// script and style bodies included.
pub fn text_content(html: &str, selector: &str) -> Option<String> {
    let doc = Html::parse_document(html);
    let sel = Selector::parse(selector).ok()?;
    doc.select(&sel).next().map(|el| el.text().collect())
}

/// Trim, turn every line break into a space, keep the first `max_chars` characters.
pub fn make_snippet(text: &str, max_chars: usize) -> String {
    text.trim()
        .chars()
        .map(|c| if c == '\n' || c == '\r' { ' ' } else { c })
        .take(max_chars)
        .collect()
}
