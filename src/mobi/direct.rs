//! Degraded in-process MOBI reader.
//!
//! Used when the external converter is unavailable. It only recovers the
//! text stream and EXTH metadata; the markup is handed to the segmenter as a
//! single unstructured unit.

use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::html::HtmlDocument;

use super::headers::{Compression, ExthHeader, MobiHeader, NULL_INDEX};
use super::huffcdic::HuffCdicReader;
use super::palmdoc;
use super::pdb::PalmDb;

/// Text and metadata recovered from a MOBI file.
#[derive(Debug, Clone, PartialEq)]
pub struct DirectBook {
    pub title: String,
    /// Body markup with `<html>`/`<head>` stripped.
    pub body_html: String,
    pub images: Vec<String>,
    pub dublin_core: Vec<(String, String)>,
}

pub fn parse(data: &[u8]) -> Result<DirectBook> {
    let pdb = PalmDb::parse(data)?;
    let record0 = pdb
        .record(0)
        .ok_or_else(|| Error::InvalidMobi("no records".into()))?;
    let header = MobiHeader::parse(record0)?;

    if header.encryption != 0 {
        return Err(Error::InvalidMobi("book is DRM-encrypted".into()));
    }

    let exth = header
        .exth_offset()
        .and_then(|offset| record0.get(offset..))
        .and_then(|block| match ExthHeader::parse(block, header.encoding) {
            Ok(exth) => Some(exth),
            Err(e) => {
                warn!(error = %e, "ignoring unreadable EXTH block");
                None
            }
        })
        .unwrap_or_default();

    let text = read_text(&pdb, &header)?;
    let markup = header.encoding.decode(&text);
    debug!(
        bytes = text.len(),
        compression = ?header.compression,
        "decoded MOBI text records"
    );

    let mut doc = HtmlDocument::parse(&markup);
    doc.strip_non_content();

    let title = exth
        .title
        .clone()
        .or_else(|| (!header.title.trim().is_empty()).then(|| header.title.trim().to_string()))
        .unwrap_or_else(|| pdb.name.replace('_', " "));

    let mut dublin_core = vec![("title".to_string(), title.clone())];
    dublin_core.extend(exth.dublin_core);

    Ok(DirectBook {
        title,
        body_html: doc.body_html(),
        images: doc.image_sources(),
        dublin_core,
    })
}

/// Concatenate and decompress the text records.
fn read_text(pdb: &PalmDb<'_>, header: &MobiHeader) -> Result<Vec<u8>> {
    let mut huff = match header.compression {
        Compression::Huffman => Some(load_huffcdic(pdb, header)?),
        Compression::Unknown(n) => {
            return Err(Error::InvalidMobi(format!("unknown compression type {n}")));
        }
        _ => None,
    };

    let mut text = Vec::new();
    for index in 1..=header.text_record_count as usize {
        let Some(record) = pdb.record(index) else {
            warn!(index, "text record missing");
            break;
        };
        let record = strip_trailing_entries(record, header.extra_data_flags);
        match (header.compression, huff.as_mut()) {
            (Compression::PalmDoc, _) => text.extend(palmdoc::decompress(record)),
            (Compression::Huffman, Some(reader)) => text.extend(reader.decompress(record)?),
            _ => text.extend_from_slice(record),
        }
    }

    if text.ends_with(b"#") {
        text.pop();
    }
    text.retain(|&b| b != 0);
    Ok(text)
}

fn load_huffcdic(pdb: &PalmDb<'_>, header: &MobiHeader) -> Result<HuffCdicReader> {
    if header.huff_record_index == NULL_INDEX || header.huff_record_count == 0 {
        return Err(Error::InvalidMobi(
            "Huffman compression without HUFF/CDIC records".into(),
        ));
    }
    let first = header.huff_record_index as usize;
    let count = header.huff_record_count as usize;

    let record = |i: usize| {
        pdb.record(i)
            .ok_or_else(|| Error::InvalidMobi(format!("HUFF/CDIC record {i} missing")))
    };
    let huff = record(first)?;
    let cdics = (first + 1..first + count)
        .map(record)
        .collect::<Result<Vec<_>>>()?;
    HuffCdicReader::new(huff, &cdics)
}

/// Drop the trailing entries announced by `extra_data_flags`.
///
/// Bits 1..15 each mark a backward-encoded variable-length entry; bit 0 marks
/// multibyte overlap bytes whose count is stored in the low two bits.
fn strip_trailing_entries(record: &[u8], flags: u16) -> &[u8] {
    let mut end = record.len();

    for bit in 1..16 {
        if flags & (1 << bit) == 0 || end == 0 {
            continue;
        }
        let mut size = 0usize;
        let mut shift = 0;
        for &byte in record[..end].iter().rev().take(4) {
            size |= ((byte & 0x7F) as usize) << shift;
            shift += 7;
            if byte & 0x80 != 0 {
                break;
            }
        }
        if size > 0 && size <= end {
            end -= size;
        }
    }

    if flags & 1 != 0 && end > 0 {
        let overlap = (record[end - 1] & 3) as usize + 1;
        if overlap <= end {
            end -= overlap;
        }
    }

    &record[..end]
}


#[cfg(test)]
mod tests {
    use super::fixtures::build_mobi;
    use super::*;

    #[test]
    fn test_parse_uncompressed_book() {
        let data = build_mobi(
            "Direct Title",
            "Some Author",
            &[
                "<html><head><title>x</title></head><body><h1>One</h1><p>First</p>",
                "<h1>Two</h1><p>Second</p></body></html>",
            ],
        );
        let book = parse(&data).unwrap();
        assert_eq!(book.title, "Direct Title");
        assert_eq!(book.body_html, "<h1>One</h1><p>First</p><h1>Two</h1><p>Second</p>");
        assert!(book.dublin_core.contains(&("creator".to_string(), "Some Author".to_string())));
        assert_eq!(book.dublin_core[0], ("title".to_string(), "Direct Title".to_string()));
    }

    #[test]
    fn test_encrypted_book_rejected() {
        let mut data = build_mobi("t", "a", &["<p>x</p>"]);
        // Record 0 starts right after the table of two entries.
        let record0 = 78 + 2 * 8;
        data[record0 + 12..record0 + 14].copy_from_slice(&2u16.to_be_bytes());
        assert!(matches!(parse(&data), Err(Error::InvalidMobi(_))));
    }

    #[test]
    fn test_strip_trailing_entries() {
        // Bit 1: one trailing entry whose size byte (0x83) says 3 bytes.
        assert_eq!(strip_trailing_entries(b"textab\x83", 0b10), b"text");
        // Bit 0: overlap count in the low two bits of the last byte.
        assert_eq!(strip_trailing_entries(b"text\xe2\x01", 0b1), b"text");
        assert_eq!(strip_trailing_entries(b"plain", 0), b"plain");
    }

    #[test]
    fn test_not_a_mobi() {
        assert!(parse(b"definitely not a palm database").is_err());
    }
}
