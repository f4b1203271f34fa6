//! Builders for synthetic BGZF streams and BAM records used by unit tests.

use flate2::write::DeflateEncoder;
use flate2::Compression;
use std::io::Write;

/// The 28-byte BGZF end-of-file marker.
pub(crate) const BGZF_EOF: [u8; 28] = [
    31, 139, 8, 4, 0, 0, 0, 0, 0, 255, // header
    6, 0, 66, 67, 2, 0, 27, 0, // extra field, BSIZE = 27
    3, 0, // empty deflate block
    0, 0, 0, 0, // CRC32
    0, 0, 0, 0, // ISIZE
];

/// Payload size per block when splitting a stream.
const BLOCK_PAYLOAD: usize = 60 * 1024;

/// Compress `data` into a single BGZF block.
pub(crate) fn bgzf_block(data: &[u8]) -> Vec<u8> {
    let mut deflate = DeflateEncoder::new(Vec::new(), Compression::default());
    deflate.write_all(data).unwrap();
    let deflated = deflate.finish().unwrap();

    let mut block = vec![31, 139, 8, 4, 0, 0, 0, 0, 0, 255];
    block.extend_from_slice(&6u16.to_le_bytes());
    block.extend_from_slice(&[b'B', b'C']);
    block.extend_from_slice(&2u16.to_le_bytes());
    let bsize_pos = block.len();
    block.extend_from_slice(&0u16.to_le_bytes());
    block.extend_from_slice(&deflated);
    block.extend_from_slice(&crc32fast::hash(data).to_le_bytes());
    block.extend_from_slice(&(data.len() as u32).to_le_bytes());

    let bsize = (block.len() - 1) as u16;
    block[bsize_pos..bsize_pos + 2].copy_from_slice(&bsize.to_le_bytes());
    block
}

/// Compress a logical stream into BGZF blocks followed by the EOF marker.
pub(crate) fn bgzf_compress(data: &[u8]) -> Vec<u8> {
    let mut out = Vec::new();
    for chunk in data.chunks(BLOCK_PAYLOAD) {
        out.extend_from_slice(&bgzf_block(chunk));
    }
    out.extend_from_slice(&BGZF_EOF);
    out
}

/// Serialized BAM header (magic, text, reference dictionary).
pub(crate) fn header_bytes(text: &str, references: &[(&str, u32)]) -> Vec<u8> {
    let mut data = b"BAM\x01".to_vec();
    data.extend_from_slice(&(text.len() as i32).to_le_bytes());
    data.extend_from_slice(text.as_bytes());
    data.extend_from_slice(&(references.len() as i32).to_le_bytes());
    for (name, length) in references {
        data.extend_from_slice(&(name.len() as i32 + 1).to_le_bytes());
        data.extend_from_slice(name.as_bytes());
        data.push(0);
        data.extend_from_slice(&length.to_le_bytes());
    }
    data
}

/// Encode a `Z` string tag.
pub(crate) fn string_tag(key: &[u8; 2], value: &str) -> Vec<u8> {
    let mut data = key.to_vec();
    data.push(b'Z');
    data.extend_from_slice(value.as_bytes());
    data.push(0);
    data
}

/// Encode an `i` integer tag.
pub(crate) fn int_tag(key: &[u8; 2], value: i32) -> Vec<u8> {
    let mut data = key.to_vec();
    data.push(b'i');
    data.extend_from_slice(&value.to_le_bytes());
    data
}

fn base_to_nibble(base: u8) -> u8 {
    b"=ACMGRSVTWYHKDBN"
        .iter()
        .position(|&b| b == base)
        .unwrap_or(15) as u8
}

fn op_code(op: char) -> u32 {
    "MIDNSHP=X".find(op).unwrap() as u32
}

/// Builder for one serialized BAM record (including its length prefix).
#[derive(Debug, Clone)]
pub(crate) struct RecordBuilder {
    pub ref_id: i32,
    pub pos: i32,
    pub mapq: u8,
    pub flag: u16,
    pub name: String,
    pub cigar: Vec<u32>,
    pub seq: Vec<u8>,
    pub qual: Option<Vec<u8>>,
    pub tags: Vec<u8>,
}

impl RecordBuilder {
    pub(crate) fn new(name: &str) -> Self {
        Self {
            ref_id: 0,
            pos: 0,
            mapq: 60,
            flag: 0,
            name: name.to_string(),
            cigar: Vec::new(),
            seq: Vec::new(),
            qual: None,
            tags: Vec::new(),
        }
    }

    pub(crate) fn reference(mut self, ref_id: i32, pos: i32) -> Self {
        self.ref_id = ref_id;
        self.pos = pos;
        self
    }

    pub(crate) fn mapq(mut self, mapq: u8) -> Self {
        self.mapq = mapq;
        self
    }

    pub(crate) fn flag(mut self, flag: u16) -> Self {
        self.flag = flag;
        self
    }

    /// Parse a SAM-style CIGAR string such as `10S90M`.
    pub(crate) fn cigar(mut self, text: &str) -> Self {
        self.cigar.clear();
        let mut len = 0u32;
        for c in text.chars() {
            if let Some(d) = c.to_digit(10) {
                len = len * 10 + d;
            } else {
                self.cigar.push((len << 4) | op_code(c));
                len = 0;
            }
        }
        self
    }

    pub(crate) fn raw_cigar(mut self, ops: &[u32]) -> Self {
        self.cigar = ops.to_vec();
        self
    }

    pub(crate) fn seq(mut self, bases: &str) -> Self {
        self.seq = bases.as_bytes().to_vec();
        self
    }

    pub(crate) fn qual(mut self, qual: &[u8]) -> Self {
        self.qual = Some(qual.to_vec());
        self
    }

    pub(crate) fn tag(mut self, encoded: &[u8]) -> Self {
        self.tags.extend_from_slice(encoded);
        self
    }

    /// Record bytes without the 4-byte length prefix.
    pub(crate) fn body(&self) -> Vec<u8> {
        let mut data = Vec::new();
        data.extend_from_slice(&self.ref_id.to_le_bytes());
        data.extend_from_slice(&self.pos.to_le_bytes());
        data.push(self.name.len() as u8 + 1);
        data.push(self.mapq);
        data.extend_from_slice(&4680u16.to_le_bytes()); // bin, unused by decoding
        data.extend_from_slice(&(self.cigar.len() as u16).to_le_bytes());
        data.extend_from_slice(&self.flag.to_le_bytes());
        data.extend_from_slice(&(self.seq.len() as i32).to_le_bytes());
        data.extend_from_slice(&(-1i32).to_le_bytes());
        data.extend_from_slice(&(-1i32).to_le_bytes());
        data.extend_from_slice(&0i32.to_le_bytes());
        data.extend_from_slice(self.name.as_bytes());
        data.push(0);
        for op in &self.cigar {
            data.extend_from_slice(&op.to_le_bytes());
        }
        for pair in self.seq.chunks(2) {
            let high = base_to_nibble(pair[0]);
            let low = pair.get(1).map_or(0, |&b| base_to_nibble(b));
            data.push((high << 4) | low);
        }
        match &self.qual {
            Some(qual) => data.extend_from_slice(qual),
            None => data.extend(std::iter::repeat(0xFF).take(self.seq.len())),
        }
        data.extend_from_slice(&self.tags);
        data
    }

    /// Record bytes including the length prefix.
    pub(crate) fn build(&self) -> Vec<u8> {
        let body = self.body();
        let mut data = (body.len() as i32).to_le_bytes().to_vec();
        data.extend_from_slice(&body);
        data
    }
}
