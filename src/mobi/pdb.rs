//! PalmDB container: a 78-byte header followed by a record offset table.

use std::ops::Range;

use crate::error::{Error, Result};

const HEADER_LEN: usize = 78;
const ENTRY_LEN: usize = 8;

/// Record layout of a PalmDB file held in memory.
#[derive(Debug, Clone)]
pub struct PalmDb<'a> {
    data: &'a [u8],
    pub name: String,
    records: Vec<Range<usize>>,
}

impl<'a> PalmDb<'a> {
    pub fn parse(data: &'a [u8]) -> Result<Self> {
        if data.len() < HEADER_LEN {
            return Err(Error::InvalidMobi("file shorter than PalmDB header".into()));
        }

        let name_end = data[..32].iter().position(|&b| b == 0).unwrap_or(32);
        let name = String::from_utf8_lossy(&data[..name_end]).into_owned();

        let count = u16::from_be_bytes([data[76], data[77]]) as usize;
        let table_end = HEADER_LEN + count * ENTRY_LEN;
        if data.len() < table_end {
            return Err(Error::InvalidMobi("record table truncated".into()));
        }

        let offsets: Vec<usize> = (0..count)
            .map(|i| be_u32(data, HEADER_LEN + i * ENTRY_LEN) as usize)
            .collect();

        let mut records = Vec::with_capacity(count);
        for (i, &start) in offsets.iter().enumerate() {
            let end = offsets.get(i + 1).copied().unwrap_or(data.len());
            if start < table_end || start > end || end > data.len() {
                return Err(Error::InvalidMobi(format!("record {i} has a bad offset")));
            }
            records.push(start..end);
        }

        Ok(Self {
            data,
            name,
            records,
        })
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn record(&self, index: usize) -> Option<&'a [u8]> {
        self.records.get(index).map(|r| &self.data[r.clone()])
    }
}

pub(crate) fn be_u32(data: &[u8], pos: usize) -> u32 {
    data.get(pos..pos + 4)
        .map(|b| u32::from_be_bytes([b[0], b[1], b[2], b[3]]))
        .unwrap_or(0)
}

pub(crate) fn be_u16(data: &[u8], pos: usize) -> u16 {
    data.get(pos..pos + 2)
        .map(|b| u16::from_be_bytes([b[0], b[1]]))
        .unwrap_or(0)
}
