//! Plain-text fallback through pdf-extract.

use tracing::debug;

use crate::error::{Error, Result};
use crate::html::escape_text;

use super::PageContent;

/// Extract text and split it into pages on form feeds.
pub fn extract_pages(data: &[u8]) -> Result<Vec<PageContent>> {
    // pdf-extract panics on some malformed files.
    let text = std::panic::catch_unwind(|| pdf_extract::extract_text_from_mem(data))
        .map_err(|_| Error::InvalidPdf("text extraction panicked".into()))?
        .map_err(|e| Error::InvalidPdf(e.to_string()))?;
    let pages = split_pages(&text);
    debug!(pages = pages.len(), chars = text.len(), "extracted PDF text");
    Ok(pages)
}

fn split_pages(text: &str) -> Vec<PageContent> {
    let mut pages: Vec<&str> = text.split('\x0C').collect();
    // A trailing form feed closes the last page rather than opening a new one.
    if pages.len() > 1 && pages.last().is_some_and(|p| p.trim().is_empty()) {
        pages.pop();
    }

    pages
        .into_iter()
        .map(|page| {
            let page = page.trim_matches('\n');
            PageContent {
                html: format!(
                    "<div class=\"pdf-content\"><pre>{}</pre></div>",
                    escape_text(page)
                ),
                images: Vec::new(),
                chars: page.chars().filter(|c| !c.is_whitespace()).count(),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_on_form_feed() {
        let pages = split_pages("first page\n\x0Csecond <page>\n\x0C");
        assert_eq!(pages.len(), 2);
        assert_eq!(
            pages[0].html,
            "<div class=\"pdf-content\"><pre>first page</pre></div>"
        );
        assert!(pages[1].html.contains("second &lt;page&gt;"));
        assert_eq!(pages[0].chars, 9);
    }

    #[test]
    fn test_no_form_feed_is_one_page() {
        assert_eq!(split_pages("only text").len(), 1);
    }
}
