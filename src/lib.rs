//! # chapterize
//!
//! Turns uploaded books into a uniform list of numbered chapters.
//!
//! ## Features
//!
//! - EPUB 2/3, PDF, MOBI/AZW3, FB2, plain text, Markdown and HTML input
//! - Chapter detection for unstructured text (headings, chapter markers such
//!   as `第一章` or `Chapter 4`, blank-line breaks, paragraph packing)
//! - Encoding detection for plain text (UTF-8, GBK, Big5)
//! - Unified metadata and table of contents across formats
//! - Failures degrade to a placeholder chapter instead of an error
//!
//! ## Quick Start
//!
//! ```no_run
//! use chapterize::{Document, normalize};
//!
//! let doc = Document::open("novel.epub").unwrap();
//! let book = normalize(&doc).unwrap();
//! for chapter in &book.chapters {
//!     println!("{}. {} ({} chars)", chapter.number, chapter.title, chapter.word_count);
//! }
//! ```
//!
//! ## Configuration
//!
//! ```
//! use chapterize::{Config, Document, Pipeline};
//!
//! let pipeline = Pipeline::new(Config::default().with_max_chapter_chars(20_000));
//! let doc = Document::new(
//!     "Chapter 1\nIt begins.\nChapter 2\nIt ends.".as_bytes().to_vec(),
//!     "txt",
//!     "story.txt",
//! );
//! let book = pipeline.normalize(&doc).unwrap();
//! assert_eq!(book.chapters.len(), 2);
//! assert_eq!(book.metadata.title.as_deref(), Some("story"));
//! ```

pub mod book;
pub mod config;
pub mod encoding;
pub mod epub;
pub mod error;
pub mod extract;
pub mod fb2;
pub mod html;
pub mod markdown;
pub mod metadata;
pub mod mobi;
pub mod pdf;
pub mod pipeline;
pub mod segment;
pub mod text;
pub(crate) mod xml;

pub use book::{
    Chapter, ContentKind, Document, Format, Metadata, NormalizedBook, ProcessingStatus,
    RendererKind, TocEntry, TocTarget,
};
pub use config::{Config, ConverterConfig, PdfConfig};
pub use error::{Diagnostic, DiagnosticKind, Error, ErrorKind, Result};
pub use extract::Registry;
pub use pipeline::{Pipeline, normalize};
