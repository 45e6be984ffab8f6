//! Character encoding detection for byte sources.
//!
//! Plain-text uploads carry no encoding declaration, so the detector tries a
//! fixed cascade of candidates with strict decoding and takes the first one
//! that succeeds. Markup formats (XHTML, FB2) declare their encoding, which
//! [`decode_text`] honors as a hint.

use std::borrow::Cow;

use encoding_rs::Encoding;
use memchr::memmem;
use tracing::{debug, warn};

/// Result of running the detection cascade.
#[derive(Debug, Clone)]
pub struct Decoded {
    pub text: String,
    pub encoding: &'static Encoding,
    /// True when no candidate decoded cleanly and Windows-1252 was forced.
    pub exhausted: bool,
}

/// Decode `bytes` with the first encoding in `cascade` that accepts them.
///
/// A byte order mark short-circuits the cascade. If every candidate rejects
/// the input, Windows-1252 is used; it maps every byte, so decoding always
/// yields text.
pub fn detect(bytes: &[u8], cascade: &[&'static Encoding]) -> Decoded {
    if let Some((encoding, bom_len)) = Encoding::for_bom(bytes) {
        let (text, _) = encoding.decode_without_bom_handling(&bytes[bom_len..]);
        debug!(encoding = encoding.name(), "decoded using byte order mark");
        return Decoded {
            text: text.into_owned(),
            encoding,
            exhausted: false,
        };
    }

    for &encoding in cascade {
        if let Some(text) = encoding.decode_without_bom_handling_and_without_replacement(bytes) {
            debug!(encoding = encoding.name(), "encoding detected");
            return Decoded {
                text: text.into_owned(),
                encoding,
                exhausted: false,
            };
        }
    }

    warn!(
        candidates = cascade.len(),
        "no candidate encoding matched, falling back to windows-1252"
    );
    let (text, _) = encoding_rs::WINDOWS_1252.decode_without_bom_handling(bytes);
    Decoded {
        text: text.into_owned(),
        encoding: encoding_rs::WINDOWS_1252,
        exhausted: true,
    }
}

/// Decode markup bytes, handling various encodings.
///
/// 1. UTF-8 (BOM handled by encoding_rs)
/// 2. The hint encoding, usually from `<?xml encoding="..."?>`
/// 3. Windows-1252
pub fn decode_text<'a>(bytes: &'a [u8], hint_encoding: Option<&str>) -> Cow<'a, str> {
    let (result, _encoding, malformed) = encoding_rs::UTF_8.decode(bytes);

    if !malformed {
        return result;
    }

    if let Some(name) = hint_encoding
        && let Some(encoding) = Encoding::for_label(name.as_bytes())
    {
        let (result, _, _) = encoding.decode(bytes);
        return result;
    }

    let (result, _, _) = encoding_rs::WINDOWS_1252.decode(bytes);
    result
}

/// Read the `encoding` pseudo-attribute of an XML declaration.
pub fn xml_encoding_hint(bytes: &[u8]) -> Option<String> {
    let head = &bytes[..bytes.len().min(256)];
    let decl_start = memmem::find(head, b"<?xml")?;
    let decl_end = decl_start + memmem::find(&head[decl_start..], b"?>")?;
    let decl = &head[decl_start..decl_end];

    let attr = memmem::find(decl, b"encoding")?;
    let rest = &decl[attr + b"encoding".len()..];
    let quote_pos = rest.iter().position(|&b| b == b'"' || b == b'\'')?;
    let quote = rest[quote_pos];
    let value = &rest[quote_pos + 1..];
    let value_end = value.iter().position(|&b| b == quote)?;

    let label = std::str::from_utf8(&value[..value_end]).ok()?.trim();
    (!label.is_empty()).then(|| label.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn default_cascade() -> Vec<&'static Encoding> {
        vec![encoding_rs::UTF_8, encoding_rs::GBK, encoding_rs::BIG5]
    }

    #[test]
    fn test_utf8_wins_first() {
        let decoded = detect("第一章 开始".as_bytes(), &default_cascade());
        assert_eq!(decoded.encoding, encoding_rs::UTF_8);
        assert_eq!(decoded.text, "第一章 开始");
        assert!(!decoded.exhausted);
    }

    #[test]
    fn test_utf8_bom_stripped() {
        let mut bytes = vec![0xEF, 0xBB, 0xBF];
        bytes.extend_from_slice("hello".as_bytes());
        let decoded = detect(&bytes, &default_cascade());
        assert_eq!(decoded.text, "hello");
    }

    #[test]
    fn test_gbk_detected() {
        let (bytes, _, _) = encoding_rs::GBK.encode("第一章 开始\n这是中文内容。");
        let decoded = detect(&bytes, &default_cascade());
        assert_eq!(decoded.encoding, encoding_rs::GBK);
        assert_eq!(decoded.text, "第一章 开始\n这是中文内容。");
    }

    #[test]
    fn test_exhausted_falls_back_to_windows_1252() {
        // 0xFF is invalid in UTF-8, GBK and Big5 as a lead byte.
        let bytes = [b'a', 0xFF, b'b'];
        let decoded = detect(&bytes, &default_cascade());
        assert!(decoded.exhausted);
        assert_eq!(decoded.encoding, encoding_rs::WINDOWS_1252);
        assert_eq!(decoded.text, "a\u{FF}b");
    }

    #[test]
    fn test_cascade_order_is_respected() {
        let (bytes, _, _) = encoding_rs::BIG5.encode("繁體中文");
        let decoded = detect(&bytes, &[encoding_rs::UTF_8, encoding_rs::BIG5]);
        assert_eq!(decoded.encoding, encoding_rs::BIG5);
        assert_eq!(decoded.text, "繁體中文");
    }

    #[test]
    fn test_xml_encoding_hint() {
        let xml = br#"<?xml version="1.0" encoding="windows-1251"?><FictionBook/>"#;
        assert_eq!(xml_encoding_hint(xml).as_deref(), Some("windows-1251"));

        let single = b"<?xml version='1.0' encoding='UTF-8'?><a/>";
        assert_eq!(xml_encoding_hint(single).as_deref(), Some("UTF-8"));

        assert_eq!(xml_encoding_hint(b"<?xml version=\"1.0\"?><a/>"), None);
        assert_eq!(xml_encoding_hint(b"<html></html>"), None);
    }

    #[test]
    fn test_decode_text_uses_hint() {
        let (bytes, _, _) = encoding_rs::WINDOWS_1251.encode("Привет");
        assert_eq!(decode_text(&bytes, Some("windows-1251")), "Привет");
        assert_eq!(decode_text("plain".as_bytes(), None), "plain");
    }
}
