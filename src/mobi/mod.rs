//! MOBI and AZW3 extraction.
//!
//! The preferred path hands the file to an external converter and reads the
//! resulting EPUB. When the converter is missing, fails, or times out, the
//! book is read in-process instead: text records are decompressed and the
//! markup is returned as one unstructured unit for the segmenter.

mod convert;
pub mod direct;
mod headers;
mod huffcdic;
mod palmdoc;
mod pdb;

use std::fs;
use std::sync::Arc;

use tracing::{info_span, warn};

use crate::book::{ContentKind, ContentUnit, Document, Format, RendererKind};
use crate::config::Config;
use crate::epub::EpubExtractor;
use crate::error::{Diagnostic, Result};
use crate::extract::Extraction;
use crate::metadata::NativeMetadata;

pub use direct::DirectBook;

#[derive(Debug, Clone)]
pub struct MobiExtractor {
    config: Arc<Config>,
}

impl MobiExtractor {
    pub fn new(config: Arc<Config>) -> Self {
        Self { config }
    }

    pub fn extract(&self, doc: &Document) -> Result<Extraction> {
        let _span = info_span!("mobi", tag = doc.format_tag()).entered();

        match self.convert(doc) {
            Ok(extraction) => Ok(extraction),
            Err(err) => {
                warn!(error = %err, "converter unavailable, reading MOBI directly");
                let book = direct::parse(doc.data())?;
                Ok(direct_extraction(book).with_diagnostic(Diagnostic::from(&err)))
            }
        }
    }

    /// Run the external converter and read its EPUB output.
    ///
    /// Any failure along this path, including an unreadable converted EPUB,
    /// sends the caller to the direct reader.
    fn convert(&self, doc: &Document) -> Result<Extraction> {
        let workdir = self.config.temp_dir("chapterize-mobi-")?;
        let input = workdir.path().join(input_file_name(doc)?);
        fs::write(&input, doc.data())?;

        let output = convert::convert_to_epub(&self.config.converter, &input)?;
        let epub = fs::read(&output)?;
        EpubExtractor::new(Arc::clone(&self.config)).extract_bytes(&epub, RendererKind::MobiToEpub)
    }
}

/// Name of the converter input; ebook-convert picks its reader by extension.
fn input_file_name(doc: &Document) -> Result<String> {
    Ok(format!("input.{}", Format::from_tag(doc.format_tag())?))
}

fn direct_extraction(book: DirectBook) -> Extraction {
    let unit = ContentUnit::new(book.body_html, ContentKind::Html)
        .with_title(book.title)
        .with_images(book.images);
    Extraction::unstructured(unit, RendererKind::MobiDirect)
        .with_metadata(NativeMetadata::DublinCore(book.dublin_core))
}
