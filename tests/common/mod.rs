//! In-memory fixture builders shared by the integration tests.

#![allow(dead_code)]

use std::io::{Cursor, Write};

use zip::write::SimpleFileOptions;

pub const CONTAINER_XML: &str = r#"<?xml version="1.0"?>
<container version="1.0" xmlns="urn:oasis:names:tc:opendocument:xmlns:container">
  <rootfiles><rootfile full-path="OEBPS/content.opf" media-type="application/oebps-package+xml"/></rootfiles>
</container>"#;

pub fn zip(files: &[(&str, &[u8])]) -> Vec<u8> {
    let mut zip = zip::ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default();
    for (name, content) in files {
        zip.start_file(*name, options).unwrap();
        zip.write_all(content).unwrap();
    }
    zip.finish().unwrap().into_inner()
}

/// EPUB with one spine item per `(heading, paragraph)` pair.
pub fn epub(title: &str, author: &str, chapters: &[(&str, &str)]) -> Vec<u8> {
    let mut manifest = String::new();
    let mut spine = String::new();
    let mut documents = Vec::new();
    for (i, (heading, paragraph)) in chapters.iter().enumerate() {
        let href = format!("text/ch{}.xhtml", i + 1);
        manifest.push_str(&format!(
            r#"<item id="ch{i}" href="{href}" media-type="application/xhtml+xml"/>"#
        ));
        spine.push_str(&format!(r#"<itemref idref="ch{i}"/>"#));
        documents.push((
            format!("OEBPS/{href}"),
            format!(
                r#"<?xml version="1.0" encoding="UTF-8"?>
<html xmlns="http://www.w3.org/1999/xhtml"><head><title>{heading}</title></head>
<body><h1>{heading}</h1><p>{paragraph}</p></body></html>"#
            ),
        ));
    }
    let opf = format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<package xmlns="http://www.idpf.org/2007/opf" version="3.0">
  <metadata xmlns:dc="http://purl.org/dc/elements/1.1/">
    <dc:title>{title}</dc:title>
    <dc:creator>{author}</dc:creator>
    <dc:language>en</dc:language>
  </metadata>
  <manifest>{manifest}</manifest>
  <spine>{spine}</spine>
</package>"#
    );

    let mut files: Vec<(&str, &[u8])> = vec![
        ("mimetype", b"application/epub+zip".as_slice()),
        ("META-INF/container.xml", CONTAINER_XML.as_bytes()),
        ("OEBPS/content.opf", opf.as_bytes()),
    ];
    for (name, body) in &documents {
        files.push((name.as_str(), body.as_bytes()));
    }
    zip(&files)
}

pub fn fb2(title: &str, sections: &[(&str, &str)]) -> Vec<u8> {
    let body: String = sections
        .iter()
        .map(|(heading, paragraph)| {
            format!("<section><title><p>{heading}</p></title><p>{paragraph}</p></section>")
        })
        .collect();
    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<FictionBook xmlns="http://www.gribuser.ru/xml/fictionbook/2.0">
  <description>
    <title-info>
      <genre>prose</genre>
      <author><first-name>Fb</first-name><last-name>Writer</last-name></author>
      <book-title>{title}</book-title>
      <lang>en</lang>
    </title-info>
  </description>
  <body>{body}</body>
</FictionBook>"#
    )
    .into_bytes()
}

/// Uncompressed UTF-8 MOBI with an EXTH author and title.
pub fn mobi(title: &str, author: &str, html: &str) -> Vec<u8> {
    let mut exth_records = Vec::new();
    for (kind, value) in [(100u32, author), (503u32, title)] {
        exth_records.extend_from_slice(&kind.to_be_bytes());
        exth_records.extend_from_slice(&((value.len() + 8) as u32).to_be_bytes());
        exth_records.extend_from_slice(value.as_bytes());
    }
    let mut exth = b"EXTH".to_vec();
    exth.extend_from_slice(&((exth_records.len() + 12) as u32).to_be_bytes());
    exth.extend_from_slice(&2u32.to_be_bytes());
    exth.extend_from_slice(&exth_records);

    let header_len = 0xE8u32;
    let mut record0 = vec![0u8; 16 + header_len as usize];
    record0[0..2].copy_from_slice(&1u16.to_be_bytes());
    record0[8..10].copy_from_slice(&1u16.to_be_bytes());
    record0[16..20].copy_from_slice(b"MOBI");
    record0[0x14..0x18].copy_from_slice(&header_len.to_be_bytes());
    record0[0x1C..0x20].copy_from_slice(&65001u32.to_be_bytes());
    record0[0x70..0x74].copy_from_slice(&u32::MAX.to_be_bytes());
    record0[0x80..0x84].copy_from_slice(&0x40u32.to_be_bytes());
    record0.extend_from_slice(&exth);

    let records = [record0, html.as_bytes().to_vec()];
    let mut out = vec![0u8; 78];
    out[..7].copy_from_slice(b"Fixture");
    out[60..68].copy_from_slice(b"BOOKMOBI");
    out[76..78].copy_from_slice(&(records.len() as u16).to_be_bytes());
    let mut offset = 78 + records.len() * 8;
    for (i, record) in records.iter().enumerate() {
        out.extend_from_slice(&(offset as u32).to_be_bytes());
        out.extend_from_slice(&((i as u32) * 2).to_be_bytes());
        offset += record.len();
    }
    for record in &records {
        out.extend_from_slice(record);
    }
    out
}

/// PDF with one Helvetica text line per page.
pub fn pdf(lines: &[&str]) -> Vec<u8> {
    use lopdf::content::{Content, Operation};
    use lopdf::{Document, Object, Stream, dictionary};

    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica",
    });
    let resources_id = doc.add_object(dictionary! {
        "Font" => dictionary! { "F1" => font_id },
    });

    let mut kids: Vec<Object> = Vec::new();
    for line in lines {
        let content = Content {
            operations: vec![
                Operation::new("BT", vec![]),
                Operation::new("Tf", vec!["F1".into(), 24.into()]),
                Operation::new("Td", vec![72.into(), 700.into()]),
                Operation::new("Tj", vec![Object::string_literal(*line)]),
                Operation::new("ET", vec![]),
            ],
        };
        let content_id = doc.add_object(Stream::new(dictionary! {}, content.encode().unwrap()));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
        });
        kids.push(page_id.into());
    }

    let count = kids.len() as i64;
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => count,
            "Resources" => resources_id,
            "MediaBox" => vec![0.into(), 0.into(), 595.into(), 842.into()],
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    let mut out = Vec::new();
    doc.save_to(&mut out).unwrap();
    out
}
