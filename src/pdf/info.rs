//! Document structure read with lopdf: page count, Info dictionary, outline.

use lopdf::{Dictionary, Object};
use memchr::memmem;
use tracing::debug;

use crate::error::{Error, Result};

const INFO_KEYS: [&str; 8] = [
    "Title",
    "Author",
    "Subject",
    "Keywords",
    "Creator",
    "Producer",
    "CreationDate",
    "ModDate",
];

/// One outline (bookmark) entry. `page` is 1-based.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutlineEntry {
    pub level: usize,
    pub title: String,
    pub page: usize,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct PdfInfo {
    pub page_count: usize,
    /// Info dictionary `(key, value)` pairs in a fixed key order.
    pub fields: Vec<(String, String)>,
    pub outline: Vec<OutlineEntry>,
}

/// Read page count, Info fields and outline.
///
/// lopdf opens files protected by an empty user password on its own; those
/// are read normally. Any other encrypted file is `EncryptedPdf`, whether
/// lopdf refuses to load it or loads it still encrypted.
pub fn read_info(data: &[u8]) -> Result<PdfInfo> {
    let doc = match lopdf::Document::load_mem(data) {
        Ok(doc) => doc,
        Err(e) if declares_encryption(data) => {
            debug!(error = %e, "encrypted PDF could not be opened");
            return Err(Error::EncryptedPdf);
        }
        Err(e) => return Err(Error::InvalidPdf(e.to_string())),
    };
    if doc.is_encrypted() {
        return Err(Error::EncryptedPdf);
    }

    let page_count = doc.get_pages().len();
    let fields: Vec<(String, String)> = info_dictionary(&doc)
        .map(|dict| {
            INFO_KEYS
                .iter()
                .filter_map(|&key| {
                    let value = string_value(&doc, dict.get(key.as_bytes()).ok()?)?;
                    let value = value.trim();
                    (!value.is_empty()).then(|| (key.to_string(), value.to_string()))
                })
                .collect()
        })
        .unwrap_or_default();

    let outline = match doc.get_toc() {
        Ok(toc) => toc
            .toc
            .into_iter()
            .filter(|entry| !entry.title.trim().is_empty())
            .map(|entry| OutlineEntry {
                level: entry.level,
                title: entry.title.trim().to_string(),
                page: entry.page,
            })
            .collect(),
        Err(e) => {
            debug!(error = %e, "no usable outline");
            Vec::new()
        }
    };

    debug!(
        pages = page_count,
        fields = fields.len(),
        outline = outline.len(),
        "read PDF structure"
    );
    Ok(PdfInfo {
        page_count,
        fields,
        outline,
    })
}

/// Whether a trailer names an `/Encrypt` dictionary.
fn declares_encryption(data: &[u8]) -> bool {
    memmem::find(data, b"/Encrypt").is_some()
}

fn info_dictionary(doc: &lopdf::Document) -> Option<&Dictionary> {
    match doc.trailer.get(b"Info").ok()? {
        Object::Reference(id) => doc.get_object(*id).ok()?.as_dict().ok(),
        Object::Dictionary(dict) => Some(dict),
        _ => None,
    }
}

fn string_value(doc: &lopdf::Document, object: &Object) -> Option<String> {
    match object {
        Object::String(bytes, _) => Some(decode_text_string(bytes)),
        Object::Reference(id) => string_value(doc, doc.get_object(*id).ok()?),
        _ => None,
    }
}

/// Decode a PDF text string: UTF-16BE when it starts with a BOM, otherwise
/// PDFDocEncoding, which agrees with Latin-1 for printable text.
pub fn decode_text_string(bytes: &[u8]) -> String {
    match bytes {
        [0xFE, 0xFF, rest @ ..] => {
            let units: Vec<u16> = rest
                .chunks_exact(2)
                .map(|pair| u16::from_be_bytes([pair[0], pair[1]]))
                .collect();
            String::from_utf16_lossy(&units)
        }
        [0xEF, 0xBB, 0xBF, rest @ ..] => String::from_utf8_lossy(rest).into_owned(),
        _ => bytes.iter().map(|&b| b as char).collect(),
    }
}
