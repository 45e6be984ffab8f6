//! Format-agnostic data model shared by every extractor.

use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;

use crate::error::{Diagnostic, Error, Result};

/// Supported source formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum Format {
    Epub,
    Pdf,
    Mobi,
    Azw3,
    Fb2,
    Txt,
    Markdown,
    Html,
}

impl Format {
    const TAGS: [(&'static str, Format); 10] = [
        ("epub", Format::Epub),
        ("pdf", Format::Pdf),
        ("mobi", Format::Mobi),
        ("azw3", Format::Azw3),
        ("fb2", Format::Fb2),
        ("txt", Format::Txt),
        ("markdown", Format::Markdown),
        ("md", Format::Markdown),
        ("html", Format::Html),
        ("htm", Format::Html),
    ];

    /// Resolve a declared format tag such as `"EPUB"`, `"md"` or `".htm"`.
    pub fn from_tag(tag: &str) -> Result<Self> {
        let normalized = tag.trim().trim_start_matches('.').to_ascii_lowercase();
        Self::TAGS
            .iter()
            .find(|(name, _)| *name == normalized)
            .map(|(_, format)| *format)
            .ok_or_else(|| Error::UnsupportedFormat(tag.trim().to_string()))
    }

    /// Every accepted tag, in a stable order.
    pub fn tags() -> impl Iterator<Item = &'static str> {
        Self::TAGS.iter().map(|(name, _)| *name)
    }

    /// Canonical tag for this format.
    pub fn as_str(&self) -> &'static str {
        match self {
            Format::Epub => "epub",
            Format::Pdf => "pdf",
            Format::Mobi => "mobi",
            Format::Azw3 => "azw3",
            Format::Fb2 => "fb2",
            Format::Txt => "txt",
            Format::Markdown => "markdown",
            Format::Html => "html",
        }
    }
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An uploaded file awaiting normalization.
#[derive(Debug, Clone)]
pub struct Document {
    data: Vec<u8>,
    format_tag: String,
    filename: String,
}

impl Document {
    pub fn new(data: Vec<u8>, format_tag: impl Into<String>, filename: impl Into<String>) -> Self {
        Self {
            data,
            format_tag: format_tag.into(),
            filename: filename.into(),
        }
    }

    /// Read a file from disk, taking the format tag from its extension.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let data = std::fs::read(path)?;
        let tag = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or_default()
            .to_string();
        let filename = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        Ok(Self::new(data, tag, filename))
    }

    /// Override the declared format tag.
    pub fn with_format_tag(mut self, tag: impl Into<String>) -> Self {
        self.format_tag = tag.into();
        self
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn format_tag(&self) -> &str {
        &self.format_tag
    }

    pub fn filename(&self) -> &str {
        &self.filename
    }
}

/// Markup carried by a body of content.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum ContentKind {
    Html,
    PlainText,
}

/// One ordered piece of extracted content, before numbering.
#[derive(Debug, Clone, PartialEq)]
pub struct ContentUnit {
    pub title: Option<String>,
    pub body: String,
    pub kind: ContentKind,
    pub images: Vec<String>,
    /// Where the unit came from (spine href, page range).
    pub source: Option<String>,
}

impl ContentUnit {
    pub fn new(body: impl Into<String>, kind: ContentKind) -> Self {
        Self {
            title: None,
            body: body.into(),
            kind,
            images: Vec::new(),
            source: None,
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn with_images(mut self, images: Vec<String>) -> Self {
        self.images = images;
        self
    }

    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }
}

/// A numbered chapter in the normalized output.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct Chapter {
    pub number: usize,
    pub title: String,
    pub content: String,
    pub kind: ContentKind,
    /// Length of `content` in characters.
    pub word_count: usize,
    pub truncated: bool,
    pub images: Vec<String>,
}

/// Where a TOC entry points.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct TocTarget {
    pub chapter: Option<usize>,
    pub page: Option<usize>,
    pub href: Option<String>,
}

/// A flat table of contents entry; nesting is expressed by `level`.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct TocEntry {
    pub level: u8,
    pub title: String,
    pub target: TocTarget,
}

impl TocEntry {
    pub fn new(level: u8, title: impl Into<String>) -> Self {
        Self {
            level,
            title: title.into(),
            target: TocTarget::default(),
        }
    }

    pub fn with_chapter(mut self, chapter: usize) -> Self {
        self.target.chapter = Some(chapter);
        self
    }

    pub fn with_page(mut self, page: usize) -> Self {
        self.target.page = Some(page);
        self
    }

    pub fn with_href(mut self, href: impl Into<String>) -> Self {
        self.target.href = Some(href.into());
        self
    }
}

/// Unified book metadata. Keys in `extra` use normalized names only.
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct Metadata {
    pub title: Option<String>,
    pub authors: Vec<String>,
    pub language: Option<String>,
    pub page_count: Option<usize>,
    pub chapter_count: usize,
    pub extra: BTreeMap<String, String>,
}

impl Metadata {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: Some(title.into()),
            ..Default::default()
        }
    }

    pub fn with_author(mut self, author: impl Into<String>) -> Self {
        self.authors.push(author.into());
        self
    }

    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.language = Some(language.into());
        self
    }

    pub fn with_extra(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.extra.insert(key.into(), value.into());
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum ProcessingStatus {
    Completed,
    NeedsAttention,
}

/// Which extraction path produced the chapters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum RendererKind {
    Epub,
    MobiToEpub,
    MobiDirect,
    PdfPdfium,
    PdfText,
    Fb2,
    Text,
    Markdown,
    Html,
    Placeholder,
}

impl RendererKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            RendererKind::Epub => "epub",
            RendererKind::MobiToEpub => "mobi_to_epub",
            RendererKind::MobiDirect => "mobi_direct",
            RendererKind::PdfPdfium => "pdf_pdfium",
            RendererKind::PdfText => "pdf_text",
            RendererKind::Fb2 => "fb2",
            RendererKind::Text => "text_txt",
            RendererKind::Markdown => "text_markdown",
            RendererKind::Html => "text_html",
            RendererKind::Placeholder => "placeholder",
        }
    }
}

/// The pipeline's output for one document.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct NormalizedBook {
    pub chapters: Vec<Chapter>,
    pub metadata: Metadata,
    pub toc: Vec<TocEntry>,
    pub status: ProcessingStatus,
    pub renderer: RendererKind,
    pub diagnostics: Vec<Diagnostic>,
}

impl NormalizedBook {
    pub fn needs_attention(&self) -> bool {
        self.status == ProcessingStatus::NeedsAttention
    }
}
