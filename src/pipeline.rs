//! Document normalization: extractor selection, segmentation, numbering.
//!
//! [`Pipeline::normalize`] never fails on bad content. Any extraction error is
//! absorbed into a single placeholder chapter that explains what went wrong,
//! and the book is flagged [`ProcessingStatus::NeedsAttention`]. The only
//! error returned is [`Error::UnsupportedFormat`](crate::Error::UnsupportedFormat).

use std::sync::{Arc, OnceLock};

use tracing::{info, info_span, warn};

use crate::book::{
    Chapter, ContentKind, ContentUnit, Document, NormalizedBook, ProcessingStatus, RendererKind,
    TocEntry,
};
use crate::config::Config;
use crate::error::{Diagnostic, DiagnosticKind, Result};
use crate::extract::{Extraction, Registry};
use crate::html::HtmlDocument;
use crate::metadata::{self, NativeMetadata};
use crate::segment::{SegmentInput, SegmenterChain, cap_content, truncate_chars};

/// Title of the chapter substituted for content that could not be extracted.
pub const PLACEHOLDER_TITLE: &str = "Content extraction notice";

/// Turns documents into [`NormalizedBook`]s.
///
/// Holds configuration only; one pipeline can serve many threads.
#[derive(Debug)]
pub struct Pipeline {
    registry: Registry,
    segmenter: SegmenterChain,
}

impl Pipeline {
    pub fn new(config: impl Into<Arc<Config>>) -> Self {
        let registry = Registry::new(config);
        let segmenter = SegmenterChain::from_config(registry.config());
        Self {
            registry,
            segmenter,
        }
    }

    /// Replace the segmentation cascade.
    pub fn with_segmenter(mut self, segmenter: SegmenterChain) -> Self {
        self.segmenter = segmenter;
        self
    }

    pub fn config(&self) -> &Config {
        self.registry.config()
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn normalize(&self, doc: &Document) -> Result<NormalizedBook> {
        let _span = info_span!(
            "normalize",
            format = doc.format_tag(),
            filename = doc.filename()
        )
        .entered();

        let extractor = self.registry.resolve(doc.format_tag())?;
        let extraction = match extractor.extract(doc) {
            Ok(extraction) if extraction.units.is_empty() => {
                warn!(extractor = extractor.name(), "extraction produced no content");
                return Ok(self.placeholder(
                    doc,
                    Diagnostic::new(
                        DiagnosticKind::ExtractionFailure,
                        "the document contained no readable content",
                    ),
                ));
            }
            Ok(extraction) => extraction,
            Err(err) => {
                warn!(extractor = extractor.name(), error = %err, "extraction failed");
                return Ok(self.placeholder(doc, Diagnostic::from(&err)));
            }
        };

        let book = self.assemble(doc, extraction);
        info!(
            chapters = book.chapters.len(),
            renderer = book.renderer.as_str(),
            diagnostics = book.diagnostics.len(),
            "document normalized"
        );
        Ok(book)
    }

    fn assemble(&self, doc: &Document, extraction: Extraction) -> NormalizedBook {
        let Extraction {
            units,
            structured,
            metadata: native,
            toc,
            renderer,
            diagnostics,
        } = extraction;

        let units = if structured {
            units
        } else {
            units
                .into_iter()
                .flat_map(|unit| self.segment_unit(unit))
                .collect()
        };
        let chapters = self.number(units);

        let mut metadata = metadata::unify(&native, doc.filename());
        metadata.chapter_count = chapters.len();
        let toc = self.finish_toc(toc, &chapters);

        NormalizedBook {
            chapters,
            metadata,
            toc,
            status: ProcessingStatus::Completed,
            renderer,
            diagnostics,
        }
    }

    /// Split one unstructured unit into chapter-sized units.
    fn segment_unit(&self, unit: ContentUnit) -> Vec<ContentUnit> {
        let segments = self
            .segmenter
            .segment(&SegmentInput::new(&unit.body, unit.kind));

        // A lone segment keeps the unit's own title over a generic "Part 1".
        if let [segment] = segments.as_slice() {
            let title = unit.title.or_else(|| segment.title.clone());
            let mut single = ContentUnit::new(segment.content.clone(), unit.kind)
                .with_images(unit.images);
            single.title = title;
            return vec![single];
        }

        let locate_images = unit.kind == ContentKind::Html && !unit.images.is_empty();
        segments
            .into_iter()
            .map(|segment| {
                let images = if locate_images {
                    HtmlDocument::parse(&segment.content).image_sources()
                } else {
                    Vec::new()
                };
                let mut part = ContentUnit::new(segment.content, unit.kind).with_images(images);
                part.title = segment.title;
                part
            })
            .collect()
    }

    /// Number units `1..=N`, bounding titles and capping content.
    fn number(&self, units: Vec<ContentUnit>) -> Vec<Chapter> {
        let config = self.config();
        units
            .into_iter()
            .enumerate()
            .map(|(i, unit)| {
                let number = i + 1;
                let title = match unit.title.as_deref().map(str::trim) {
                    Some(title) if !title.is_empty() => {
                        truncate_chars(title, config.max_title_chars).to_string()
                    }
                    _ => format!("Chapter {number}"),
                };
                let (content, truncated) = cap_content(
                    unit.body,
                    config.max_chapter_chars,
                    &config.truncation_marker,
                );
                if truncated {
                    warn!(chapter = number, "chapter content truncated");
                }
                Chapter {
                    number,
                    title,
                    word_count: content.chars().count(),
                    content,
                    kind: unit.kind,
                    truncated,
                    images: unit.images,
                }
            })
            .collect()
    }

    /// Keep the extractor's TOC when it has one, otherwise derive one entry
    /// per chapter. Chapter references outside `1..=N` are dropped.
    fn finish_toc(&self, toc: Vec<TocEntry>, chapters: &[Chapter]) -> Vec<TocEntry> {
        if toc.is_empty() {
            return chapters
                .iter()
                .map(|c| TocEntry::new(1, c.title.clone()).with_chapter(c.number))
                .collect();
        }

        let max_title = self.config().max_title_chars;
        toc.into_iter()
            .map(|mut entry| {
                entry.level = entry.level.max(1);
                entry.title = truncate_chars(entry.title.trim(), max_title).to_string();
                entry.target.chapter = entry
                    .target
                    .chapter
                    .filter(|n| (1..=chapters.len()).contains(n));
                entry
            })
            .collect()
    }

    fn placeholder(&self, doc: &Document, diagnostic: Diagnostic) -> NormalizedBook {
        let content = placeholder_text(doc.filename(), &diagnostic.message);
        let chapter = Chapter {
            number: 1,
            title: PLACEHOLDER_TITLE.to_string(),
            word_count: content.chars().count(),
            content,
            kind: ContentKind::PlainText,
            truncated: false,
            images: Vec::new(),
        };

        let mut metadata = metadata::unify(&NativeMetadata::Empty, doc.filename());
        metadata.chapter_count = 1;

        NormalizedBook {
            toc: vec![TocEntry::new(1, PLACEHOLDER_TITLE).with_chapter(1)],
            chapters: vec![chapter],
            metadata,
            status: ProcessingStatus::NeedsAttention,
            renderer: RendererKind::Placeholder,
            diagnostics: vec![diagnostic],
        }
    }
}

impl Default for Pipeline {
    fn default() -> Self {
        Self::new(Config::default())
    }
}

fn placeholder_text(filename: &str, reason: &str) -> String {
    format!(
        "The text of \"{filename}\" could not be extracted automatically.\n\n\
         Reason: {reason}\n\n\
         Possible causes:\n\
         1. The file format variant is not supported for automatic extraction\n\
         2. The content consists of images or scanned pages\n\
         3. The file is encrypted or damaged\n\n\
         You can try:\n\
         - Converting the file to plain text and uploading it again\n\
         - Contacting an administrator for help"
    )
}

/// Normalize `doc` with the default configuration.
pub fn normalize(doc: &Document) -> Result<NormalizedBook> {
    static DEFAULT: OnceLock<Pipeline> = OnceLock::new();
    DEFAULT.get_or_init(Pipeline::default).normalize(doc)
}
