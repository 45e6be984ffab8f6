//! MOBI header (record 0) and EXTH metadata.

use crate::error::{Error, Result};

use super::pdb::{be_u16, be_u32};

pub const NULL_INDEX: u32 = 0xFFFF_FFFF;

/// Offset of the MOBI header inside record 0, after the PalmDOC header.
const MOBI_OFFSET: usize = 16;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Compression {
    None,
    PalmDoc,
    Huffman,
    Unknown(u16),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextEncoding {
    Cp1252,
    Utf8,
    Unknown(u32),
}

impl TextEncoding {
    pub fn decode(self, bytes: &[u8]) -> String {
        match self {
            TextEncoding::Utf8 => String::from_utf8_lossy(bytes).into_owned(),
            _ => encoding_rs::WINDOWS_1252
                .decode_without_bom_handling(bytes)
                .0
                .into_owned(),
        }
    }
}

/// Fields of record 0 needed to read the text.
#[derive(Debug, Clone)]
pub struct MobiHeader {
    pub compression: Compression,
    pub text_record_count: u16,
    pub encryption: u16,
    pub encoding: TextEncoding,
    pub title: String,
    pub exth_flags: u32,
    pub extra_data_flags: u16,
    pub huff_record_index: u32,
    pub huff_record_count: u32,
    /// Length of the MOBI header proper; zero for bare PalmDOC files.
    pub header_length: u32,
}

impl MobiHeader {
    pub fn parse(data: &[u8]) -> Result<Self> {
        if data.len() < MOBI_OFFSET {
            return Err(Error::InvalidMobi("record 0 too short".into()));
        }

        let compression = match be_u16(data, 0) {
            1 => Compression::None,
            2 => Compression::PalmDoc,
            0x4448 => Compression::Huffman, // "DH"
            n => Compression::Unknown(n),
        };
        let text_record_count = be_u16(data, 8);
        let encryption = be_u16(data, 12);

        let mut header = Self {
            compression,
            text_record_count,
            encryption,
            encoding: TextEncoding::Cp1252,
            title: String::new(),
            exth_flags: 0,
            extra_data_flags: 0,
            huff_record_index: NULL_INDEX,
            huff_record_count: 0,
            header_length: 0,
        };

        // Bare PalmDOC: no MOBI header follows.
        if data.len() < MOBI_OFFSET + 8 || &data[MOBI_OFFSET..MOBI_OFFSET + 4] != b"MOBI" {
            return Ok(header);
        }

        header.header_length = be_u32(data, 0x14);
        header.encoding = match be_u32(data, 0x1C) {
            1252 => TextEncoding::Cp1252,
            65001 => TextEncoding::Utf8,
            n => TextEncoding::Unknown(n),
        };

        if data.len() >= 0x5C {
            let offset = be_u32(data, 0x54) as usize;
            let len = be_u32(data, 0x58) as usize;
            if let Some(bytes) = data.get(offset..offset.saturating_add(len)) {
                header.title = header.encoding.decode(bytes);
            }
        }

        if data.len() >= 0x78 {
            header.huff_record_index = be_u32(data, 0x70);
            header.huff_record_count = be_u32(data, 0x74);
        }
        if data.len() >= 0x84 {
            header.exth_flags = be_u32(data, 0x80);
        }
        if data.len() >= 0xF4 && header.header_length >= 0xE4 {
            header.extra_data_flags = be_u16(data, 0xF2);
        }

        Ok(header)
    }

    pub fn has_exth(&self) -> bool {
        self.exth_flags & 0x40 != 0
    }

    /// Where the EXTH block starts inside record 0, if there is one.
    pub fn exth_offset(&self) -> Option<usize> {
        (self.has_exth() && self.header_length > 0)
            .then(|| MOBI_OFFSET + self.header_length as usize)
    }
}

/// EXTH records, reported as Dublin Core `(element, value)` pairs.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExthHeader {
    pub title: Option<String>,
    pub dublin_core: Vec<(String, String)>,
}

impl ExthHeader {
    pub fn parse(data: &[u8], encoding: TextEncoding) -> Result<Self> {
        if data.len() < 12 || &data[0..4] != b"EXTH" {
            return Err(Error::InvalidMobi("invalid EXTH header".into()));
        }

        let record_count = be_u32(data, 8);
        let mut exth = ExthHeader::default();
        let mut pos = 12;

        for _ in 0..record_count {
            if pos + 8 > data.len() {
                break;
            }
            let record_type = be_u32(data, pos);
            let record_len = be_u32(data, pos + 4) as usize;
            if record_len < 8 || pos + record_len > data.len() {
                break;
            }

            let value = encoding.decode(&data[pos + 8..pos + record_len]);
            let value = value.trim();
            let element = match record_type {
                100 => Some("creator"),
                101 => Some("publisher"),
                103 => Some("description"),
                104 => Some("identifier"),
                106 => Some("date"),
                109 => Some("rights"),
                112 => Some("source"),
                524 => Some("language"),
                105 => {
                    for subject in value.split(';').map(str::trim).filter(|s| !s.is_empty()) {
                        exth.dublin_core.push(("subject".into(), subject.into()));
                    }
                    None
                }
                503 => {
                    if !value.is_empty() {
                        exth.title = Some(value.to_string());
                    }
                    None
                }
                _ => None,
            };
            if let Some(element) = element
                && !value.is_empty()
            {
                exth.dublin_core.push((element.into(), value.into()));
            }

            pos += record_len;
        }

        Ok(exth)
    }
}
