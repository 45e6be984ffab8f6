//! Plain-text, Markdown and HTML uploads.
//!
//! All three carry no chapter structure of their own: the decoded text is
//! returned as one unstructured unit for the segmenter.

use std::sync::Arc;

use tracing::debug;

use crate::book::{ContentKind, ContentUnit, Document, RendererKind};
use crate::config::Config;
use crate::encoding;
use crate::error::{Diagnostic, DiagnosticKind, Result};
use crate::extract::Extraction;
use crate::html::HtmlDocument;
use crate::markdown;
use crate::metadata::{NativeMetadata, TextStats};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextSubtype {
    Plain,
    Markdown,
    Html,
}

impl TextSubtype {
    fn renderer(self) -> RendererKind {
        match self {
            TextSubtype::Plain => RendererKind::Text,
            TextSubtype::Markdown => RendererKind::Markdown,
            TextSubtype::Html => RendererKind::Html,
        }
    }
}

#[derive(Debug, Clone)]
pub struct TextExtractor {
    config: Arc<Config>,
    subtype: TextSubtype,
}

impl TextExtractor {
    pub fn new(config: Arc<Config>, subtype: TextSubtype) -> Self {
        Self { config, subtype }
    }

    pub fn subtype(&self) -> TextSubtype {
        self.subtype
    }

    pub fn extract(&self, doc: &Document) -> Result<Extraction> {
        let decoded = encoding::detect(doc.data(), &self.config.encodings);
        let text = decoded.text.replace("\r\n", "\n").replace('\r', "\n");

        let (unit, source_title) = match self.subtype {
            TextSubtype::Plain => (ContentUnit::new(text.as_str(), ContentKind::PlainText), None),
            TextSubtype::Markdown => {
                let html = markdown::to_html(&text);
                let title = HtmlDocument::parse(&html).heading_title();
                (ContentUnit::new(html, ContentKind::Html), title)
            }
            TextSubtype::Html => {
                let mut page = HtmlDocument::parse(&text);
                let title = page.title();
                page.strip_non_content();
                let unit = ContentUnit::new(page.body_html(), ContentKind::Html)
                    .with_images(page.image_sources());
                (unit, title)
            }
        };

        let stats = TextStats {
            encoding: decoded.encoding.name().to_string(),
            file_size: doc.data().len(),
            character_count: text.chars().count(),
            line_count: text.lines().count(),
            source_title,
        };
        debug!(
            subtype = ?self.subtype,
            encoding = %stats.encoding,
            chars = stats.character_count,
            "decoded text upload"
        );

        let mut extraction = Extraction::unstructured(unit, self.subtype.renderer())
            .with_metadata(NativeMetadata::Text(stats));
        if decoded.exhausted {
            extraction = extraction.with_diagnostic(Diagnostic::new(
                DiagnosticKind::EncodingDetectionExhausted,
                format!(
                    "no candidate encoding matched {}; decoded as windows-1252",
                    doc.filename()
                ),
            ));
        }
        Ok(extraction)
    }
}
