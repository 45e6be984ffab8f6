//! OCF container and OPF package parsing.

use std::collections::HashMap;

use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};

use crate::error::{Error, Result};
use crate::xml::{attr, local_name, resolve_entity, strip_bom};

/// The fifteen Dublin Core elements kept from `<metadata>`.
const DC_ELEMENTS: &[&[u8]] = &[
    b"title",
    b"creator",
    b"subject",
    b"description",
    b"publisher",
    b"contributor",
    b"date",
    b"type",
    b"format",
    b"identifier",
    b"source",
    b"language",
    b"relation",
    b"coverage",
    b"rights",
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManifestItem {
    pub href: String,
    pub media_type: String,
}

impl ManifestItem {
    /// Whether the item is a readable (X)HTML content document.
    pub fn is_html(&self) -> bool {
        matches!(
            self.media_type.as_str(),
            "application/xhtml+xml" | "text/html" | "application/xml+xhtml"
        ) || (self.media_type.is_empty()
            && [".xhtml", ".html", ".htm"]
                .iter()
                .any(|ext| self.href.to_ascii_lowercase().ends_with(ext)))
    }
}

/// An immutable view of an OPF package document.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Package {
    pub manifest: HashMap<String, ManifestItem>,
    /// Spine `idref`s in reading order.
    pub spine: Vec<String>,
    /// Every `dc:*` element as `(local name, text)`, in document order.
    pub dublin_core: Vec<(String, String)>,
}

impl Package {
    /// Manifest items referenced by the spine, skipping dangling idrefs.
    pub fn spine_items(&self) -> impl Iterator<Item = &ManifestItem> {
        self.spine.iter().filter_map(|id| self.manifest.get(id))
    }
}

/// Parse `META-INF/container.xml` and return the OPF path.
pub fn parse_container_xml(bytes: &[u8]) -> Result<String> {
    let content = String::from_utf8_lossy(strip_bom(bytes));
    let mut reader = Reader::from_str(&content);
    reader.config_mut().trim_text(true);

    loop {
        match reader.read_event()? {
            Event::Empty(e) | Event::Start(e) if local_name(e.name().as_ref()) == b"rootfile" => {
                if let Some(path) = attr(&e, b"full-path")
                    && !path.is_empty()
                {
                    return Ok(path);
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    Err(Error::InvalidEpub(
        "no rootfile found in container.xml".into(),
    ))
}

/// Parse an OPF package document.
pub fn parse_opf(content: &str) -> Result<Package> {
    // Text is trimmed per element instead; reader-level trimming would eat
    // the spaces around entity references.
    let mut reader = Reader::from_str(content);

    let mut package = Package::default();
    let mut saw_package = false;
    let mut in_metadata = false;
    let mut current: Option<String> = None;
    let mut buf_text = String::new();

    loop {
        match reader.read_event()? {
            Event::Start(e) => {
                let name = e.name();
                let local = local_name(name.as_ref());
                match local {
                    b"package" => saw_package = true,
                    b"metadata" => in_metadata = true,
                    b"item" => add_manifest_item(&mut package, &e),
                    b"itemref" => add_itemref(&mut package, &e),
                    _ if in_metadata && is_dublin_core(name.as_ref()) => {
                        current = Some(String::from_utf8_lossy(local).into_owned());
                        buf_text.clear();
                    }
                    _ => {}
                }
            }
            Event::Empty(e) => match local_name(e.name().as_ref()) {
                b"item" => add_manifest_item(&mut package, &e),
                b"itemref" => add_itemref(&mut package, &e),
                _ => {}
            },
            Event::Text(e) => {
                if current.is_some() {
                    buf_text.push_str(&String::from_utf8_lossy(e.as_ref()));
                }
            }
            Event::CData(e) => {
                if current.is_some() {
                    buf_text.push_str(&String::from_utf8_lossy(e.as_ref()));
                }
            }
            Event::GeneralRef(e) => {
                if current.is_some()
                    && let Some(resolved) = resolve_entity(&String::from_utf8_lossy(e.as_ref()))
                {
                    buf_text.push_str(&resolved);
                }
            }
            Event::End(e) => {
                let name = e.name();
                if local_name(name.as_ref()) == b"metadata" {
                    in_metadata = false;
                }
                if let Some(element) = current.take() {
                    let value = buf_text.trim();
                    if !value.is_empty() {
                        package.dublin_core.push((element, value.to_string()));
                    }
                    buf_text.clear();
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    if !saw_package {
        return Err(Error::InvalidEpub("OPF has no <package> root".into()));
    }
    Ok(package)
}

fn add_manifest_item(package: &mut Package, e: &BytesStart<'_>) {
    let Some(id) = attr(e, b"id").filter(|id| !id.is_empty()) else {
        return;
    };
    package.manifest.insert(
        id,
        ManifestItem {
            href: attr(e, b"href").unwrap_or_default(),
            media_type: attr(e, b"media-type").unwrap_or_default(),
        },
    );
}

fn add_itemref(package: &mut Package, e: &BytesStart<'_>) {
    if let Some(idref) = attr(e, b"idref") {
        package.spine.push(idref);
    }
}

/// `dc:title` or an unprefixed DC element name under the metadata block.
fn is_dublin_core(qname: &[u8]) -> bool {
    let local = local_name(qname);
    let prefixed_dc = qname.len() > local.len() && qname.starts_with(b"dc:");
    let unprefixed = qname.len() == local.len();
    (prefixed_dc || unprefixed) && DC_ELEMENTS.contains(&local)
}

#[cfg(test)]
mod tests {
    use super::*;

    const OPF: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<package xmlns="http://www.idpf.org/2007/opf" version="3.0" unique-identifier="uid">
  <metadata xmlns:dc="http://purl.org/dc/elements/1.1/">
    <dc:identifier id="uid">urn:uuid:1234</dc:identifier>
    <dc:title>Pride &amp; Prejudice</dc:title>
    <dc:creator>Jane Austen</dc:creator>
    <dc:language>en</dc:language>
    <dc:subject>Romance</dc:subject>
    <meta property="dcterms:modified">2024-01-01T00:00:00Z</meta>
  </metadata>
  <manifest>
    <item id="c1" href="text/chapter%201.xhtml" media-type="application/xhtml+xml"/>
    <item id="c2" href="text/ch2.xhtml" media-type="application/xhtml+xml"></item>
    <item id="css" href="style.css" media-type="text/css"/>
    <item id="nav" href="nav.xhtml" media-type="application/xhtml+xml" properties="nav"/>
  </manifest>
  <spine>
    <itemref idref="nav" linear="no"/>
    <itemref idref="c1"/>
    <itemref idref="missing"/>
    <itemref idref="c2"/>
  </spine>
</package>"#;

    #[test]
    fn test_parse_container() {
        let xml = br#"<?xml version="1.0"?>
<container version="1.0" xmlns="urn:oasis:names:tc:opendocument:xmlns:container">
  <rootfiles><rootfile full-path="OEBPS/content.opf" media-type="application/oebps-package+xml"/></rootfiles>
</container>"#;
        assert_eq!(parse_container_xml(xml).unwrap(), "OEBPS/content.opf");
    }

    #[test]
    fn test_container_without_rootfile() {
        let err = parse_container_xml(b"<container/>").unwrap_err();
        assert!(matches!(err, Error::InvalidEpub(_)));
    }

    #[test]
    fn test_parse_opf() {
        let package = parse_opf(OPF).unwrap();
        assert_eq!(package.spine, vec!["nav", "c1", "missing", "c2"]);
        assert_eq!(package.spine_items().count(), 3);
        assert!(package.manifest["c1"].is_html());
        assert!(!package.manifest["css"].is_html());
        assert_eq!(package.manifest["c1"].href, "text/chapter%201.xhtml");

        let names: Vec<_> = package.dublin_core.iter().map(|(k, _)| k.as_str()).collect();
        assert_eq!(names, vec!["identifier", "title", "creator", "language", "subject"]);
        assert_eq!(package.dublin_core[1].1, "Pride & Prejudice");
    }

    #[test]
    fn test_nav_document_is_an_ordinary_spine_item() {
        let package = parse_opf(OPF).unwrap();
        assert_eq!(
            package.manifest["nav"],
            ManifestItem {
                href: "nav.xhtml".into(),
                media_type: "application/xhtml+xml".into(),
            }
        );
        let hrefs: Vec<_> = package.spine_items().map(|item| item.href.as_str()).collect();
        assert_eq!(hrefs, ["nav.xhtml", "text/chapter%201.xhtml", "text/ch2.xhtml"]);
    }

    #[test]
    fn test_opf_without_package_root() {
        assert!(matches!(
            parse_opf("<html/>").unwrap_err(),
            Error::InvalidEpub(_)
        ));
    }
}
