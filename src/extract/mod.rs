//! Per-format extractor dispatch.
//!
//! The set of formats is closed, so dispatch is a plain enum rather than a
//! trait object. Every extractor holds configuration only and can be shared
//! across threads.

use std::sync::Arc;

use crate::book::{ContentUnit, Document, Format, RendererKind, TocEntry};
use crate::config::Config;
use crate::epub::EpubExtractor;
use crate::error::{Diagnostic, Result};
use crate::fb2::Fb2Extractor;
use crate::metadata::NativeMetadata;
use crate::mobi::MobiExtractor;
use crate::pdf::PdfExtractor;
use crate::text::{TextExtractor, TextSubtype};

/// Raw output of one extractor, before segmentation and numbering.
#[derive(Debug, Clone, PartialEq)]
pub struct Extraction {
    pub units: Vec<ContentUnit>,
    /// Units are already chapters; unstructured units go through the segmenter.
    pub structured: bool,
    pub metadata: NativeMetadata,
    pub toc: Vec<TocEntry>,
    pub renderer: RendererKind,
    pub diagnostics: Vec<Diagnostic>,
}

impl Extraction {
    pub fn structured(units: Vec<ContentUnit>, renderer: RendererKind) -> Self {
        Self {
            units,
            structured: true,
            metadata: NativeMetadata::Empty,
            toc: Vec::new(),
            renderer,
            diagnostics: Vec::new(),
        }
    }

    pub fn unstructured(unit: ContentUnit, renderer: RendererKind) -> Self {
        Self {
            structured: false,
            ..Self::structured(vec![unit], renderer)
        }
    }

    pub fn with_metadata(mut self, metadata: NativeMetadata) -> Self {
        self.metadata = metadata;
        self
    }

    pub fn with_toc(mut self, toc: Vec<TocEntry>) -> Self {
        self.toc = toc;
        self
    }

    pub fn with_diagnostic(mut self, diagnostic: Diagnostic) -> Self {
        self.diagnostics.push(diagnostic);
        self
    }
}

/// One extractor per format family.
#[derive(Debug, Clone)]
pub enum Extractor {
    Epub(EpubExtractor),
    Pdf(PdfExtractor),
    Mobi(MobiExtractor),
    Fb2(Fb2Extractor),
    Text(TextExtractor),
}

impl Extractor {
    pub fn extract(&self, doc: &Document) -> Result<Extraction> {
        match self {
            Extractor::Epub(e) => e.extract(doc),
            Extractor::Pdf(e) => e.extract(doc),
            Extractor::Mobi(e) => e.extract(doc),
            Extractor::Fb2(e) => e.extract(doc),
            Extractor::Text(e) => e.extract(doc),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Extractor::Epub(_) => "epub",
            Extractor::Pdf(_) => "pdf",
            Extractor::Mobi(_) => "mobi",
            Extractor::Fb2(_) => "fb2",
            Extractor::Text(_) => "text",
        }
    }
}

/// Maps declared format tags to extractors.
#[derive(Debug, Clone)]
pub struct Registry {
    config: Arc<Config>,
}

impl Registry {
    pub fn new(config: impl Into<Arc<Config>>) -> Self {
        Self {
            config: config.into(),
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Select the extractor for `tag`, failing with `UnsupportedFormat` for
    /// anything outside the closed set.
    pub fn resolve(&self, tag: &str) -> Result<Extractor> {
        let config = Arc::clone(&self.config);
        Ok(match Format::from_tag(tag)? {
            Format::Epub => Extractor::Epub(EpubExtractor::new(config)),
            Format::Pdf => Extractor::Pdf(PdfExtractor::new(config)),
            Format::Mobi | Format::Azw3 => Extractor::Mobi(MobiExtractor::new(config)),
            Format::Fb2 => Extractor::Fb2(Fb2Extractor::new()),
            Format::Txt => Extractor::Text(TextExtractor::new(config, TextSubtype::Plain)),
            Format::Markdown => Extractor::Text(TextExtractor::new(config, TextSubtype::Markdown)),
            Format::Html => Extractor::Text(TextExtractor::new(config, TextSubtype::Html)),
        })
    }

    pub fn supported_formats(&self) -> Vec<&'static str> {
        Format::tags().collect()
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::new(Config::default())
    }
}
