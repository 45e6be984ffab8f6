//! HUFF/CDIC decompression for MOBI text records.
//!
//! The HUFF record holds the code tables; each CDIC record contributes a
//! slice of the phrase dictionary. Dictionary entries may themselves be
//! compressed and are expanded on first use.

use crate::error::{Error, Result};

use super::pdb::{be_u16, be_u32};

enum Phrase {
    Packed(Vec<u8>),
    Expanded(Vec<u8>),
}

pub struct HuffCdicReader {
    /// Indexed by the top byte of a code: (code length, terminal, max code).
    dict1: Vec<(u8, bool, u32)>,
    /// Per code length 0..=32.
    mincode: Vec<u32>,
    maxcode: Vec<u32>,
    phrases: Vec<Phrase>,
}

impl HuffCdicReader {
    pub fn new(huff: &[u8], cdics: &[&[u8]]) -> Result<Self> {
        let mut reader = Self {
            dict1: Vec::with_capacity(256),
            mincode: Vec::with_capacity(33),
            maxcode: Vec::with_capacity(33),
            phrases: Vec::new(),
        };
        reader.load_huff(huff)?;
        for cdic in cdics {
            reader.load_cdic(cdic)?;
        }
        Ok(reader)
    }

    fn load_huff(&mut self, huff: &[u8]) -> Result<()> {
        if huff.len() < 24 || &huff[0..8] != b"HUFF\x00\x00\x00\x18" {
            return Err(Error::InvalidMobi("invalid HUFF header".into()));
        }
        let off1 = be_u32(huff, 8) as usize;
        let off2 = be_u32(huff, 12) as usize;
        if huff.len() < off1 + 256 * 4 || huff.len() < off2 + 32 * 8 {
            return Err(Error::InvalidMobi("HUFF tables truncated".into()));
        }

        for i in 0..256 {
            let v = be_u32(huff, off1 + i * 4);
            let codelen = (v & 0x1F) as u8;
            let term = v & 0x80 != 0;
            let maxcode = if codelen > 0 {
                ((v >> 8) + 1).wrapping_shl(32 - codelen as u32).wrapping_sub(1)
            } else {
                0
            };
            self.dict1.push((codelen, term, maxcode));
        }

        self.mincode.push(0);
        self.maxcode.push(0);
        for i in 0..32u32 {
            let pos = off2 + i as usize * 8;
            let codelen = i + 1;
            self.mincode
                .push(be_u32(huff, pos).wrapping_shl(32 - codelen));
            self.maxcode.push(
                be_u32(huff, pos + 4)
                    .wrapping_add(1)
                    .wrapping_shl(32 - codelen)
                    .wrapping_sub(1),
            );
        }
        Ok(())
    }

    fn load_cdic(&mut self, cdic: &[u8]) -> Result<()> {
        if cdic.len() < 16 || &cdic[0..8] != b"CDIC\x00\x00\x00\x10" {
            return Err(Error::InvalidMobi("invalid CDIC header".into()));
        }
        let phrases = be_u32(cdic, 8) as usize;
        let bits = be_u32(cdic, 12).min(31);
        let n = (1usize << bits).min(phrases.saturating_sub(self.phrases.len()));
        if cdic.len() < 16 + n * 2 {
            return Err(Error::InvalidMobi("CDIC offset table truncated".into()));
        }

        for i in 0..n {
            let off = 16 + be_u16(cdic, 16 + i * 2) as usize;
            if off + 2 > cdic.len() {
                return Err(Error::InvalidMobi("CDIC entry truncated".into()));
            }
            let blen = be_u16(cdic, off);
            let start = off + 2;
            let end = (start + (blen & 0x7FFF) as usize).min(cdic.len());
            let slice = cdic[start..end].to_vec();
            self.phrases.push(if blen & 0x8000 != 0 {
                Phrase::Expanded(slice)
            } else {
                Phrase::Packed(slice)
            });
        }
        Ok(())
    }

    pub fn decompress(&mut self, data: &[u8]) -> Result<Vec<u8>> {
        let mut out = Vec::new();
        self.unpack_into(data, &mut out, 0)?;
        Ok(out)
    }

    fn unpack_into(&mut self, data: &[u8], out: &mut Vec<u8>, depth: usize) -> Result<()> {
        if depth > 32 {
            return Err(Error::InvalidMobi("HUFF phrase nesting too deep".into()));
        }

        let mut bits_left = data.len() as i64 * 8;
        let mut padded = data.to_vec();
        padded.extend_from_slice(&[0u8; 8]);

        let mut pos = 0usize;
        let mut x = be_u64(&padded, pos);
        let mut n: i32 = 32;

        while bits_left > 0 {
            if n <= 0 {
                pos += 4;
                x = be_u64(&padded, pos);
                n += 32;
            }
            let code = ((x >> n) & 0xFFFF_FFFF) as u32;

            let (mut codelen, term, mut maxcode) = self.dict1[(code >> 24) as usize];
            if !term {
                while codelen < 32 && code < self.mincode[codelen as usize] {
                    codelen += 1;
                }
                maxcode = self.maxcode[codelen as usize];
            }

            n -= codelen as i32;
            bits_left -= codelen as i64;
            if bits_left < 0 || codelen == 0 {
                break;
            }

            let index = (maxcode.wrapping_sub(code) >> (32 - codelen as u32)) as usize;
            match self.phrases.get(index) {
                Some(Phrase::Expanded(bytes)) => out.extend_from_slice(bytes),
                Some(Phrase::Packed(bytes)) => {
                    let packed = bytes.clone();
                    let mut expanded = Vec::new();
                    self.unpack_into(&packed, &mut expanded, depth + 1)?;
                    out.extend_from_slice(&expanded);
                    self.phrases[index] = Phrase::Expanded(expanded);
                }
                None => {
                    return Err(Error::InvalidMobi(format!(
                        "phrase index {index} out of range ({})",
                        self.phrases.len()
                    )));
                }
            }
        }
        Ok(())
    }
}

fn be_u64(data: &[u8], pos: usize) -> u64 {
    data.get(pos..pos + 8)
        .and_then(|b| b.try_into().ok())
        .map(u64::from_be_bytes)
        .unwrap_or(0)
}
