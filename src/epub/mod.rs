//! EPUB extraction.
//!
//! The archive is unpacked into a scoped temporary directory, the OPF package
//! is parsed, and every (X)HTML spine item becomes one chapter. The temp
//! directory is removed when extraction returns, whether it succeeded or not.

pub mod package;

use std::fs;
use std::io::Cursor;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use percent_encoding::percent_decode_str;
use tracing::{debug, warn};
use zip::ZipArchive;

use crate::book::{ContentKind, ContentUnit, Document, RendererKind, TocEntry};
use crate::config::Config;
use crate::encoding::{decode_text, xml_encoding_hint};
use crate::error::{Error, Result};
use crate::extract::Extraction;
use crate::html::HtmlDocument;
use crate::metadata::NativeMetadata;

pub use package::{ManifestItem, Package, parse_container_xml, parse_opf};

const CONTAINER_PATH: &str = "META-INF/container.xml";

#[derive(Debug, Clone)]
pub struct EpubExtractor {
    config: Arc<Config>,
}

impl EpubExtractor {
    pub fn new(config: Arc<Config>) -> Self {
        Self { config }
    }

    pub fn extract(&self, doc: &Document) -> Result<Extraction> {
        self.extract_bytes(doc.data(), RendererKind::Epub)
    }

    /// Extract EPUB bytes, tagging the result with `renderer`.
    pub(crate) fn extract_bytes(&self, data: &[u8], renderer: RendererKind) -> Result<Extraction> {
        let workdir = self.config.temp_dir("chapterize-epub-")?;
        let mut archive = ZipArchive::new(Cursor::new(data))?;
        // `extract` only writes entries whose names stay inside the target.
        archive.extract(workdir.path())?;
        debug!(
            entries = archive.len(),
            dir = %workdir.path().display(),
            "unpacked EPUB"
        );

        extract_unpacked(workdir.path(), renderer)
    }
}

fn extract_unpacked(root: &Path, renderer: RendererKind) -> Result<Extraction> {
    let container = fs::read(root.join(CONTAINER_PATH))
        .map_err(|e| Error::InvalidEpub(format!("missing {CONTAINER_PATH}: {e}")))?;
    let opf_path = parse_container_xml(&container)?;

    let opf_file = resolve_href(root, "", &opf_path)
        .ok_or_else(|| Error::InvalidEpub(format!("package path escapes archive: {opf_path}")))?;
    let opf_bytes = fs::read(&opf_file)
        .map_err(|e| Error::InvalidEpub(format!("missing package document {opf_path}: {e}")))?;
    let opf_text = decode_text(&opf_bytes, xml_encoding_hint(&opf_bytes).as_deref());
    let package = parse_opf(&opf_text)?;

    let opf_dir = opf_path.rsplit_once('/').map(|(dir, _)| dir).unwrap_or("");

    let mut units = Vec::new();
    let mut toc = Vec::new();
    for item in package.spine_items().filter(|item| item.is_html()) {
        let number = units.len() + 1;
        let unit = match resolve_href(root, opf_dir, &item.href).map(fs::read) {
            Some(Ok(bytes)) => chapter_unit(&bytes, number),
            Some(Err(e)) => {
                warn!(href = %item.href, error = %e, "spine item missing from archive");
                empty_unit(number)
            }
            None => {
                warn!(href = %item.href, "spine item path escapes archive");
                empty_unit(number)
            }
        }
        .with_source(item.href.clone());

        let title = unit.title.clone().unwrap_or_default();
        toc.push(
            TocEntry::new(1, title)
                .with_chapter(number)
                .with_href(item.href.clone()),
        );
        units.push(unit);
    }
    debug!(chapters = units.len(), "EPUB spine read");

    Ok(Extraction::structured(units, renderer)
        .with_metadata(NativeMetadata::DublinCore(package.dublin_core))
        .with_toc(toc))
}

/// Turn one spine document into a chapter unit.
fn chapter_unit(bytes: &[u8], number: usize) -> ContentUnit {
    let text = decode_text(bytes, xml_encoding_hint(bytes).as_deref());
    let mut doc = HtmlDocument::parse(&text);
    doc.strip_non_content();

    let title = doc
        .heading_title()
        .unwrap_or_else(|| format!("Chapter {number}"));
    ContentUnit::new(doc.body_html(), ContentKind::Html)
        .with_title(title)
        .with_images(doc.image_sources())
}

fn empty_unit(number: usize) -> ContentUnit {
    ContentUnit::new(String::new(), ContentKind::Html).with_title(format!("Chapter {number}"))
}

/// Resolve a percent-encoded `href` relative to `base_dir` inside `root`.
///
/// Fragments are dropped. Returns `None` if `..` segments climb out of `root`.
fn resolve_href(root: &Path, base_dir: &str, href: &str) -> Option<PathBuf> {
    let href = href.split('#').next().unwrap_or_default();
    let decoded = percent_decode_str(href).decode_utf8_lossy();

    let mut parts: Vec<&str> = Vec::new();
    for segment in base_dir.split('/').chain(decoded.split('/')) {
        match segment {
            "" | "." => {}
            ".." => {
                parts.pop()?;
            }
            s => parts.push(s),
        }
    }
    Some(parts.iter().fold(root.to_path_buf(), |path, part| path.join(part)))
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use zip::write::SimpleFileOptions;

    use super::*;

    fn build_epub(files: &[(&str, &str)]) -> Vec<u8> {
        let mut zip = zip::ZipWriter::new(Cursor::new(Vec::new()));
        let options = SimpleFileOptions::default();
        for (name, content) in files {
            zip.start_file(*name, options).unwrap();
            zip.write_all(content.as_bytes()).unwrap();
        }
        zip.finish().unwrap().into_inner()
    }

    const CONTAINER: &str = r#"<?xml version="1.0"?>
<container version="1.0" xmlns="urn:oasis:names:tc:opendocument:xmlns:container">
  <rootfiles><rootfile full-path="OEBPS/content.opf"/></rootfiles>
</container>"#;

    const OPF: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<package xmlns="http://www.idpf.org/2007/opf" version="2.0">
  <metadata xmlns:dc="http://purl.org/dc/elements/1.1/">
    <dc:title>Sample</dc:title>
    <dc:creator>Ann Author</dc:creator>
  </metadata>
  <manifest>
    <item id="a" href="text/one%20two.xhtml" media-type="application/xhtml+xml"/>
    <item id="b" href="text/missing.xhtml" media-type="application/xhtml+xml"/>
    <item id="c" href="text/three.xhtml" media-type="application/xhtml+xml"/>
    <item id="img" href="images/cover.png" media-type="image/png"/>
  </manifest>
  <spine><itemref idref="a"/><itemref idref="img"/><itemref idref="b"/><itemref idref="c"/></spine>
</package>"#;

    fn extractor(root: &Path) -> EpubExtractor {
        EpubExtractor::new(Arc::new(Config::default().with_temp_root(root)))
    }

    #[test]
    fn test_extracts_spine_in_order() {
        let tmp = tempfile::TempDir::new().unwrap();
        let epub = build_epub(&[
            ("mimetype", "application/epub+zip"),
            ("META-INF/container.xml", CONTAINER),
            ("OEBPS/content.opf", OPF),
            (
                "OEBPS/text/one two.xhtml",
                "<html><head><title>T</title><style>p{}</style></head><body><h2>First</h2><p>One</p><img src=\"../images/cover.png\"/></body></html>",
            ),
            (
                "OEBPS/text/three.xhtml",
                "<html><body><p>No heading here</p></body></html>",
            ),
        ]);

        let extraction = extractor(tmp.path())
            .extract_bytes(&epub, RendererKind::Epub)
            .unwrap();
        assert!(extraction.structured);
        assert_eq!(extraction.units.len(), 3);

        let first = &extraction.units[0];
        assert_eq!(first.title.as_deref(), Some("First"));
        assert!(first.body.contains("<p>One</p>"));
        assert!(!first.body.contains("style"));
        assert_eq!(first.images, vec!["../images/cover.png"]);

        assert_eq!(extraction.units[1].body, "");
        assert_eq!(extraction.units[1].title.as_deref(), Some("Chapter 2"));
        assert_eq!(extraction.units[2].title.as_deref(), Some("Chapter 3"));

        assert_eq!(extraction.toc.len(), 3);
        assert_eq!(extraction.toc[2].target.chapter, Some(3));
        assert_eq!(
            extraction.toc[0].target.href.as_deref(),
            Some("text/one%20two.xhtml")
        );
        match &extraction.metadata {
            NativeMetadata::DublinCore(pairs) => assert_eq!(pairs[0].1, "Sample"),
            other => panic!("unexpected metadata {other:?}"),
        }

        // The scoped workdir is gone.
        assert_eq!(fs::read_dir(tmp.path()).unwrap().count(), 0);
    }

    #[test]
    fn test_missing_container_is_invalid() {
        let tmp = tempfile::TempDir::new().unwrap();
        let epub = build_epub(&[("mimetype", "application/epub+zip")]);
        let err = extractor(tmp.path())
            .extract_bytes(&epub, RendererKind::Epub)
            .unwrap_err();
        assert!(matches!(err, Error::InvalidEpub(_)));
        assert_eq!(fs::read_dir(tmp.path()).unwrap().count(), 0);
    }

    #[test]
    fn test_non_zip_input() {
        let tmp = tempfile::TempDir::new().unwrap();
        let err = extractor(tmp.path())
            .extract_bytes(b"not a zip", RendererKind::Epub)
            .unwrap_err();
        assert!(matches!(err, Error::Zip(_)));
        assert_eq!(fs::read_dir(tmp.path()).unwrap().count(), 0);
    }

    #[test]
    fn test_resolve_href() {
        let root = Path::new("/r");
        assert_eq!(
            resolve_href(root, "OEBPS", "text/a%20b.xhtml#frag"),
            Some(PathBuf::from("/r/OEBPS/text/a b.xhtml"))
        );
        assert_eq!(
            resolve_href(root, "OEBPS/text", "../img.png"),
            Some(PathBuf::from("/r/OEBPS/img.png"))
        );
        assert_eq!(resolve_href(root, "", "../../etc/passwd"), None);
    }
}
