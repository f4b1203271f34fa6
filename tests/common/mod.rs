//! Synthetic BGZF/BAM construction shared by the integration tests.

#![allow(dead_code)]

use flate2::write::DeflateEncoder;
use flate2::Compression;
use std::io::Write;

/// The 28-byte BGZF end-of-file marker.
pub const BGZF_EOF: [u8; 28] = [
    31, 139, 8, 4, 0, 0, 0, 0, 0, 255, 6, 0, 66, 67, 2, 0, 27, 0, 3, 0, 0, 0, 0, 0, 0, 0, 0, 0,
];

/// Compress `data` into one BGZF block.
pub fn bgzf_block(data: &[u8]) -> Vec<u8> {
    let mut deflate = DeflateEncoder::new(Vec::new(), Compression::fast());
    deflate.write_all(data).unwrap();
    let deflated = deflate.finish().unwrap();

    let bsize = (12 + 6 + deflated.len() + 8 - 1) as u16;
    let mut block = vec![31, 139, 8, 4, 0, 0, 0, 0, 0, 255, 6, 0, b'B', b'C', 2, 0];
    block.extend_from_slice(&bsize.to_le_bytes());
    block.extend_from_slice(&deflated);
    block.extend_from_slice(&crc32fast::hash(data).to_le_bytes());
    block.extend_from_slice(&(data.len() as u32).to_le_bytes());
    block
}

/// Split a logical stream into BGZF blocks of at most `payload` bytes.
///
/// The EOF marker is appended when `with_eof` is set.
pub fn bgzf_compress_with(data: &[u8], payload: usize, with_eof: bool) -> Vec<u8> {
    let mut out = Vec::new();
    for chunk in data.chunks(payload) {
        out.extend_from_slice(&bgzf_block(chunk));
    }
    if with_eof {
        out.extend_from_slice(&BGZF_EOF);
    }
    out
}

/// BGZF with 60 KiB blocks and an EOF marker.
pub fn bgzf_compress(data: &[u8]) -> Vec<u8> {
    bgzf_compress_with(data, 60 * 1024, true)
}

fn op_code(op: char) -> u32 {
    "MIDNSHP=X".find(op).unwrap() as u32
}

fn nibble(base: u8) -> u8 {
    b"=ACMGRSVTWYHKDBN".iter().position(|&b| b == base).unwrap() as u8
}

/// Encode a `Z` tag.
pub fn z_tag(key: &[u8; 2], value: &str) -> Vec<u8> {
    let mut data = key.to_vec();
    data.push(b'Z');
    data.extend_from_slice(value.as_bytes());
    data.push(0);
    data
}

/// One alignment record.
#[derive(Debug, Clone)]
pub struct Alignment {
    pub name: String,
    pub ref_id: i32,
    pub pos: i32,
    pub mapq: u8,
    pub flag: u16,
    pub cigar: String,
    pub seq: String,
    pub qual: Option<Vec<u8>>,
    pub tags: Vec<u8>,
}

impl Alignment {
    pub fn new(name: &str, ref_id: i32, pos: i32) -> Self {
        Self {
            name: name.to_string(),
            ref_id,
            pos,
            mapq: 60,
            flag: 0,
            cigar: String::new(),
            seq: String::new(),
            qual: None,
            tags: Vec::new(),
        }
    }

    pub fn unmapped(name: &str) -> Self {
        Self::new(name, -1, -1).flag(0x4)
    }

    pub fn mapq(mut self, mapq: u8) -> Self {
        self.mapq = mapq;
        self
    }

    pub fn flag(mut self, flag: u16) -> Self {
        self.flag = flag;
        self
    }

    pub fn cigar(mut self, cigar: &str) -> Self {
        self.cigar = cigar.to_string();
        self
    }

    pub fn seq(mut self, seq: &str) -> Self {
        self.seq = seq.to_string();
        self
    }

    pub fn qual(mut self, qual: &[u8]) -> Self {
        self.qual = Some(qual.to_vec());
        self
    }

    pub fn barcode(mut self, barcode: &str) -> Self {
        self.tags.extend_from_slice(&z_tag(b"CB", barcode));
        self
    }

    pub fn raw_tag(mut self, tag: &[u8]) -> Self {
        self.tags.extend_from_slice(tag);
        self
    }

    fn packed_cigar(&self) -> Vec<u32> {
        let mut ops = Vec::new();
        let mut len = 0u32;
        for c in self.cigar.chars() {
            match c.to_digit(10) {
                Some(d) => len = len * 10 + d,
                None => {
                    ops.push((len << 4) | op_code(c));
                    len = 0;
                }
            }
        }
        ops
    }

    /// Reference span implied by the CIGAR (M, D, N, =, X).
    pub fn reference_span(&self) -> i64 {
        self.packed_cigar()
            .iter()
            .filter(|&&op| matches!(op & 0xF, 0 | 2 | 3 | 7 | 8))
            .map(|&op| (op >> 4) as i64)
            .sum()
    }

    /// Serialized record including its length prefix.
    pub fn encode(&self) -> Vec<u8> {
        let cigar = self.packed_cigar();
        let seq = self.seq.as_bytes();

        let mut body = Vec::new();
        body.extend_from_slice(&self.ref_id.to_le_bytes());
        body.extend_from_slice(&self.pos.to_le_bytes());
        body.push(self.name.len() as u8 + 1);
        body.push(self.mapq);
        body.extend_from_slice(&0u16.to_le_bytes());
        body.extend_from_slice(&(cigar.len() as u16).to_le_bytes());
        body.extend_from_slice(&self.flag.to_le_bytes());
        body.extend_from_slice(&(seq.len() as i32).to_le_bytes());
        body.extend_from_slice(&(-1i32).to_le_bytes());
        body.extend_from_slice(&(-1i32).to_le_bytes());
        body.extend_from_slice(&0i32.to_le_bytes());
        body.extend_from_slice(self.name.as_bytes());
        body.push(0);
        for op in &cigar {
            body.extend_from_slice(&op.to_le_bytes());
        }
        for pair in seq.chunks(2) {
            let low = pair.get(1).map_or(0, |&b| nibble(b));
            body.push((nibble(pair[0]) << 4) | low);
        }
        match &self.qual {
            Some(qual) => body.extend_from_slice(qual),
            None => body.extend(std::iter::repeat(0xFF).take(seq.len())),
        }
        body.extend_from_slice(&self.tags);

        let mut data = (body.len() as i32).to_le_bytes().to_vec();
        data.extend_from_slice(&body);
        data
    }
}

/// A whole BAM file: header plus records.
#[derive(Debug, Clone)]
pub struct BamBuilder {
    pub text: String,
    pub references: Vec<(String, u32)>,
    pub reads: Vec<Alignment>,
}

impl BamBuilder {
    pub fn new(references: &[(&str, u32)]) -> Self {
        Self {
            text: "@HD\tVN:1.6\tSO:coordinate\n".to_string(),
            references: references
                .iter()
                .map(|(name, len)| (name.to_string(), *len))
                .collect(),
            reads: Vec::new(),
        }
    }

    pub fn read(mut self, read: Alignment) -> Self {
        self.reads.push(read);
        self
    }

    pub fn header_bytes(&self) -> Vec<u8> {
        let mut data = b"BAM\x01".to_vec();
        data.extend_from_slice(&(self.text.len() as i32).to_le_bytes());
        data.extend_from_slice(self.text.as_bytes());
        data.extend_from_slice(&(self.references.len() as i32).to_le_bytes());
        for (name, len) in &self.references {
            data.extend_from_slice(&(name.len() as i32 + 1).to_le_bytes());
            data.extend_from_slice(name.as_bytes());
            data.push(0);
            data.extend_from_slice(&len.to_le_bytes());
        }
        data
    }

    /// Uncompressed BAM stream.
    pub fn logical(&self) -> Vec<u8> {
        let mut data = self.header_bytes();
        for read in &self.reads {
            data.extend_from_slice(&read.encode());
        }
        data
    }

    /// BGZF-compressed BAM file.
    pub fn compressed(&self) -> Vec<u8> {
        bgzf_compress(&self.logical())
    }
}
