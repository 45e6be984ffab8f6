//! PDF extraction.
//!
//! Structure (page count, Info dictionary, outline) always comes from lopdf.
//! Page content comes from Pdfium when the library can be bound at runtime,
//! otherwise from pdf-extract's plain-text output. Pages are then grouped
//! into chapters by the outline, or in fixed-size runs.

mod info;
mod pdfium;
mod text;

use std::sync::Arc;

use tracing::{debug, info_span, warn};

use crate::book::{ContentKind, ContentUnit, Document, RendererKind, TocEntry};
use crate::config::Config;
use crate::error::{Diagnostic, DiagnosticKind, Error, Result};
use crate::extract::Extraction;
use crate::metadata::NativeMetadata;

pub use info::{OutlineEntry, PdfInfo, decode_text_string, read_info};

/// Content of one page, already wrapped as HTML.
#[derive(Debug, Clone, PartialEq)]
pub struct PageContent {
    pub html: String,
    /// PNG `data:` URIs of rendered page bitmaps. `html` only refers to them
    /// through [`page_bitmap_tag`].
    pub images: Vec<String>,
    /// Non-whitespace text characters on the page.
    pub chars: usize,
}

impl PageContent {
    fn has_content(&self) -> bool {
        self.chars > 0 || !self.images.is_empty()
    }
}

/// Short `<img>` reference to the bitmap rendered for `page`.
///
/// The PNG itself stays in [`PageContent::images`], so page HTML holds text
/// and short references only.
pub fn page_bitmap_tag(page: usize) -> String {
    format!("<img src=\"page-{page}.png\" alt=\"Page {page}\" data-page=\"{page}\"/>")
}

#[derive(Debug, Clone)]
pub struct PdfExtractor {
    config: Arc<Config>,
}

impl PdfExtractor {
    pub fn new(config: Arc<Config>) -> Self {
        Self { config }
    }

    pub fn extract(&self, doc: &Document) -> Result<Extraction> {
        let _span = info_span!("pdf", filename = doc.filename()).entered();
        let info = read_info(doc.data())?;

        let (pages, renderer, diagnostic) = match pdfium::extract_pages(doc.data(), &self.config.pdf)
        {
            Ok(pages) if pages.iter().any(PageContent::has_content) => {
                (pages, RendererKind::PdfPdfium, None)
            }
            primary => {
                let reason = match primary {
                    Ok(_) => "Pdfium found no text on any page".to_string(),
                    Err(e) => e.to_string(),
                };
                warn!(%reason, "falling back to plain-text PDF extraction");
                let pages = text::extract_pages(doc.data())?;
                let diagnostic =
                    Diagnostic::new(DiagnosticKind::PrimaryBackendUnavailable, reason);
                (pages, RendererKind::PdfText, Some(diagnostic))
            }
        };

        if !pages.iter().any(PageContent::has_content) {
            return Err(Error::InvalidPdf("no extractable text".into()));
        }

        let (units, toc) = group_pages(
            pages,
            &info.outline,
            self.config.pdf.pages_per_chapter,
        );
        debug!(chapters = units.len(), toc = toc.len(), "grouped PDF pages");

        let mut extraction = Extraction::structured(units, renderer)
            .with_toc(toc)
            .with_metadata(NativeMetadata::PdfInfo {
                fields: info.fields,
                page_count: info.page_count,
            });
        if let Some(diagnostic) = diagnostic {
            extraction = extraction.with_diagnostic(diagnostic);
        }
        Ok(extraction)
    }
}

/// Group pages into chapters and build the outline TOC.
///
/// Top-level outline entries with in-range, increasing start pages become
/// chapter boundaries when there are at least two of them. Pages before the
/// first boundary join the first chapter.
pub fn group_pages(
    pages: Vec<PageContent>,
    outline: &[OutlineEntry],
    pages_per_chapter: usize,
) -> (Vec<ContentUnit>, Vec<TocEntry>) {
    let page_count = pages.len();
    let in_range = |page: usize| (1..=page_count).contains(&page);
    let top_level = outline.iter().map(|e| e.level).min().unwrap_or(1);

    let mut boundaries: Vec<(usize, &str)> = Vec::new();
    for entry in outline.iter().filter(|e| e.level == top_level && in_range(e.page)) {
        if boundaries.last().is_none_or(|&(start, _)| entry.page > start) {
            boundaries.push((entry.page, entry.title.as_str()));
        }
    }

    // (first page, last page, title), 1-based inclusive.
    let ranges: Vec<(usize, usize, String)> = if boundaries.len() >= 2 {
        boundaries
            .iter()
            .enumerate()
            .map(|(i, &(start, title))| {
                let first = if i == 0 { 1 } else { start };
                let last = boundaries
                    .get(i + 1)
                    .map_or(page_count, |&(next, _)| next - 1);
                (first, last, title.to_string())
            })
            .collect()
    } else {
        let per = pages_per_chapter.max(1);
        (0..page_count.div_ceil(per))
            .map(|i| {
                let first = i * per + 1;
                let last = ((i + 1) * per).min(page_count);
                let title = if first == last {
                    format!("Page {first}")
                } else {
                    format!("Pages {first}\u{2013}{last}")
                };
                (first, last, title)
            })
            .collect()
    };

    let chapter_of = |page: usize| {
        ranges
            .iter()
            .position(|&(first, last, _)| (first..=last).contains(&page))
            .map(|i| i + 1)
    };
    let toc = outline
        .iter()
        .filter(|e| in_range(e.page))
        .map(|e| {
            let level = (e.level + 1).saturating_sub(top_level).clamp(1, u8::MAX as usize) as u8;
            let entry = TocEntry::new(level, e.title.clone()).with_page(e.page);
            match chapter_of(e.page) {
                Some(chapter) => entry.with_chapter(chapter),
                None => entry,
            }
        })
        .collect();

    let mut pages = pages.into_iter();
    let units = ranges
        .into_iter()
        .map(|(first, last, title)| {
            let mut body = Vec::new();
            let mut images = Vec::new();
            for page in pages.by_ref().take(last + 1 - first) {
                body.push(page.html);
                images.extend(page.images);
            }
            ContentUnit::new(body.join("\n"), ContentKind::Html)
                .with_title(title)
                .with_images(images)
                .with_source(format!("pages {first}-{last}"))
        })
        .collect();

    (units, toc)
}


#[cfg(test)]
mod tests {
    use super::fixtures::{build_encrypted_pdf, build_pdf};
    use super::*;

    fn page(text: &str) -> PageContent {
        PageContent {
            html: format!("<p>{text}</p>"),
            images: Vec::new(),
            chars: text.len(),
        }
    }

    fn entry(level: usize, title: &str, page: usize) -> OutlineEntry {
        OutlineEntry {
            level,
            title: title.into(),
            page,
        }
    }

    #[test]
    fn test_group_by_fixed_runs() {
        let pages = (1..=5).map(|i| page(&format!("p{i}"))).collect();
        let (units, toc) = group_pages(pages, &[], 2);
        let titles: Vec<_> = units.iter().map(|u| u.title.clone().unwrap()).collect();
        assert_eq!(titles, ["Pages 1\u{2013}2", "Pages 3\u{2013}4", "Page 5"]);
        assert_eq!(units[1].body, "<p>p3</p>\n<p>p4</p>");
        assert!(toc.is_empty());
    }

    #[test]
    fn test_group_by_outline() {
        let pages = (1..=6).map(|i| page(&format!("p{i}"))).collect();
        let outline = [
            entry(1, "Part One", 2),
            entry(2, "Section", 3),
            entry(1, "Part Two", 5),
        ];
        let (units, toc) = group_pages(pages, &outline, 10);

        assert_eq!(units.len(), 2);
        assert_eq!(units[0].title.as_deref(), Some("Part One"));
        // Front matter on page 1 joins the first chapter.
        assert!(units[0].body.starts_with("<p>p1</p>"));
        assert!(units[0].body.ends_with("<p>p4</p>"));
        assert_eq!(units[1].body, "<p>p5</p>\n<p>p6</p>");

        assert_eq!(toc.len(), 3);
        assert_eq!(toc[1].level, 2);
        assert_eq!(toc[1].target.chapter, Some(1));
        assert_eq!(toc[2].target.chapter, Some(2));
        assert_eq!(toc[2].target.page, Some(5));
    }

    #[test]
    fn test_single_outline_entry_falls_back_to_runs() {
        let pages = (1..=3).map(|i| page(&format!("p{i}"))).collect();
        let outline = [entry(1, "Only", 1), entry(1, "Broken", 99)];
        let (units, toc) = group_pages(pages, &outline, 2);
        assert_eq!(units.len(), 2);
        assert_eq!(toc.len(), 1);
        assert_eq!(toc[0].target.chapter, Some(1));
    }

    #[test]
    fn test_read_info_from_generated_pdf() {
        let data = build_pdf("Generated", &["Hello", "World"]);
        let info = read_info(&data).unwrap();
        assert_eq!(info.page_count, 2);
        assert!(info.fields.contains(&("Title".into(), "Generated".into())));
        assert!(info.fields.contains(&("Author".into(), "Pdf Author".into())));
        assert!(info.outline.is_empty());
    }

    #[test]
    fn test_extract_generated_pdf() {
        let data = build_pdf("Generated", &["Hello", "World"]);
        let doc = Document::new(data, "pdf", "generated.pdf");
        let config = Config::default().with_pdf(
            crate::config::PdfConfig::default()
                .with_pages_per_chapter(1)
                .with_render_bitmaps(false),
        );

        let extraction = PdfExtractor::new(Arc::new(config)).extract(&doc).unwrap();
        assert!(extraction.structured);
        assert!(matches!(
            extraction.renderer,
            RendererKind::PdfPdfium | RendererKind::PdfText
        ));
        let text: String = extraction.units.iter().map(|u| u.body.as_str()).collect();
        assert!(text.contains("Hello"));
        assert!(text.contains("World"));
        match extraction.metadata {
            NativeMetadata::PdfInfo { page_count, .. } => assert_eq!(page_count, 2),
            other => panic!("unexpected metadata {other:?}"),
        }
    }

    #[test]
    fn test_encrypted_pdf_is_rejected() {
        let data = build_encrypted_pdf(&["Secret"]);
        assert!(matches!(read_info(&data), Err(Error::EncryptedPdf)));

        let doc = Document::new(data, "pdf", "locked.pdf");
        let err = PdfExtractor::new(Arc::default()).extract(&doc).unwrap_err();
        assert!(matches!(err, Error::EncryptedPdf));
    }

    #[test]
    fn test_garbage_is_invalid() {
        let doc = Document::new(b"not a pdf".to_vec(), "pdf", "x.pdf");
        let err = PdfExtractor::new(Arc::default()).extract(&doc).unwrap_err();
        assert!(matches!(err, Error::InvalidPdf(_)));
    }
}
