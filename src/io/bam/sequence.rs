//! 4-bit BAM sequence decoding.
//!
//! BAM stores sequences in 4-bit encoding (2 bases per byte), high nibble
//! first. Each nibble indexes the 16-symbol alphabet `=ACMGRSVTWYHKDBN`,
//! which covers the four bases, the IUPAC ambiguity codes and `N`.
//!
//! Byte `0x12` holds bases 1 (`A`) and 2 (`C`). For odd lengths the low
//! nibble of the last byte is padding.

/// BAM 4-bit to ASCII base lookup table.
const SEQ_LOOKUP: [u8; 16] = [
    b'=', b'A', b'C', b'M', // 0-3
    b'G', b'R', b'S', b'V', // 4-7
    b'T', b'W', b'Y', b'H', // 8-11
    b'K', b'D', b'B', b'N', // 12-15
];

/// Packed query sequence as stored in a record.
///
/// Holds `⌈len/2⌉` bytes; a zero-length sequence holds none.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PackedSequence {
    data: Vec<u8>,
    len: usize,
}

impl PackedSequence {
    /// Wrap packed bytes for `len` bases.
    ///
    /// Returns `None` if `data` is not exactly `⌈len/2⌉` bytes.
    pub fn new(data: Vec<u8>, len: usize) -> Option<Self> {
        (data.len() == len.div_ceil(2)).then_some(Self { data, len })
    }

    /// Number of bases.
    pub fn len(&self) -> usize {
        self.len
    }

    /// Whether the sequence is absent.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Packed bytes.
    pub fn as_packed(&self) -> &[u8] {
        &self.data
    }

    /// Base at `i` as ASCII.
    pub fn base(&self, i: usize) -> Option<u8> {
        if i >= self.len {
            return None;
        }
        let byte = self.data[i / 2];
        let nibble = if i % 2 == 0 { byte >> 4 } else { byte & 0x0F };
        Some(SEQ_LOOKUP[nibble as usize])
    }

    /// Decode all bases to ASCII.
    pub fn decode(&self) -> Vec<u8> {
        decode_sequence(&self.data, self.len)
    }

    /// Decode all bases into a `String`.
    pub fn to_text(&self) -> String {
        // SEQ_LOOKUP is pure ASCII
        self.decode().into_iter().map(char::from).collect()
    }
}

/// Decode a 4-bit encoded BAM sequence to ASCII.
///
/// Decodes at most `length` bases, and never more than `data` holds. A
/// `length` of zero reads nothing.
///
/// # Example
///
/// ```
/// use bamread::io::bam::sequence::decode_sequence;
///
/// let sequence = decode_sequence(&[0x12, 0x48], 4);
/// assert_eq!(sequence, b"ACGT");
/// ```
pub fn decode_sequence(data: &[u8], length: usize) -> Vec<u8> {
    let length = length.min(data.len() * 2);
    let mut sequence = Vec::with_capacity(length);

    for &byte in &data[..length / 2] {
        sequence.push(SEQ_LOOKUP[(byte >> 4) as usize]);
        sequence.push(SEQ_LOOKUP[(byte & 0x0F) as usize]);
    }
    if length % 2 == 1 {
        sequence.push(SEQ_LOOKUP[(data[length / 2] >> 4) as usize]);
    }

    sequence
}
