//! BAM record structure and parsing.
//!
//! A BAM record represents a single alignment (read mapped to reference).
//! Each record contains alignment information, sequence data, quality scores,
//! and optional tags.
//!
//! # Binary Format
//!
//! ```text
//! BAM Record (binary, little-endian):
//! - block_size (int32): Total record size in bytes (excluding this field)
//! - refID (int32): Reference sequence ID (-1 for unmapped)
//! - pos (int32): 0-based leftmost position (-1 for unmapped)
//! - l_read_name (uint8): Length of read name (includes null terminator)
//! - mapq (uint8): Mapping quality (255 = unavailable)
//! - bin (uint16): BAI index bin (for indexing)
//! - n_cigar_op (uint16): Number of CIGAR operations
//! - flag (uint16): Bitwise FLAGS
//! - l_seq (int32): Sequence length
//! - next_refID (int32): Reference ID of mate/next read
//! - next_pos (int32): Position of mate/next read
//! - tlen (int32): Template length
//! - read_name (char[l_read_name]): Null-terminated read name
//! - cigar (uint32[n_cigar_op]): CIGAR operations
//! - seq (uint8[(l_seq+1)/2]): 4-bit encoded sequence
//! - qual (char[l_seq]): Phred quality scores
//! - tags: Optional tags (variable length)
//! ```
//!
//! [`parse_record`] takes the bytes after `block_size`; every variable-length
//! field must fit inside them.

use super::cigar::{parse_cigar, Cigar, CigarKind, CigarOp};
use super::sequence::PackedSequence;
use super::tags::{parse_tags, TagValue, Tags};
use crate::error::{BamError, Result};
use crate::filter::flags;
use std::borrow::Cow;
use std::fmt;

/// Size of the fixed-width part of a record body.
pub const FIXED_FIELDS_SIZE: usize = 32;

/// Size of the `block_size` prefix that precedes each record body.
pub(crate) const BLOCK_SIZE_PREFIX: u64 = 4;

/// Alignment strand, from the reverse-complement flag bit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Strand {
    /// `+`
    Forward,
    /// `-`
    Reverse,
}

impl Strand {
    /// Strand implied by a flag word.
    pub fn from_flags(flag: u16) -> Self {
        if flag & flags::REVERSE != 0 {
            Strand::Reverse
        } else {
            Strand::Forward
        }
    }

    /// `+` or `-`.
    pub fn as_char(self) -> char {
        match self {
            Strand::Forward => '+',
            Strand::Reverse => '-',
        }
    }
}

impl fmt::Display for Strand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_char())
    }
}

/// Bounds-checked little-endian reader over one record body.
struct FieldCursor<'a> {
    data: &'a [u8],
    pos: usize,
    /// Logical stream offset of `data[0]`
    base: u64,
}

impl<'a> FieldCursor<'a> {
    fn offset(&self) -> u64 {
        self.base + self.pos as u64
    }

    fn take(&mut self, len: usize, field: &str) -> Result<&'a [u8]> {
        let remaining = self.data.len() - self.pos;
        if len > remaining {
            return Err(BamError::malformed(
                self.offset(),
                format!(
                    "{} needs {} bytes but only {} remain in the record",
                    field, len, remaining
                ),
            ));
        }
        let bytes = &self.data[self.pos..self.pos + len];
        self.pos += len;
        Ok(bytes)
    }

    fn u8(&mut self, field: &str) -> Result<u8> {
        Ok(self.take(1, field)?[0])
    }

    fn u16(&mut self, field: &str) -> Result<u16> {
        let b = self.take(2, field)?;
        Ok(u16::from_le_bytes([b[0], b[1]]))
    }

    fn i32(&mut self, field: &str) -> Result<i32> {
        let b = self.take(4, field)?;
        Ok(i32::from_le_bytes([b[0], b[1], b[2], b[3]]))
    }

    fn rest(&mut self) -> &'a [u8] {
        let bytes = &self.data[self.pos..];
        self.pos = self.data.len();
        bytes
    }
}

/// Validate a reference ID.
///
/// Only -1 (unmapped) and non-negative ids are valid.
fn parse_reference_id(ref_id: i32, offset: u64, field: &str) -> Result<Option<usize>> {
    match ref_id {
        -1 => Ok(None),
        n if n >= 0 => Ok(Some(n as usize)),
        invalid => Err(BamError::malformed(
            offset,
            format!("invalid {} reference id {}", field, invalid),
        )),
    }
}

/// BAM alignment record.
///
/// Represents a single read alignment with all associated information.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Record {
    /// Read name/query name
    pub name: String,

    /// Reference sequence ID (index into header.references)
    /// None if unmapped (refID = -1)
    pub reference_id: Option<usize>,

    /// 0-based leftmost mapping position (-1 if unavailable)
    pub position: i32,

    /// Mapping quality (255 = unavailable)
    pub mapq: u8,

    /// Bitwise FLAG field; bit names live in [`crate::filter::flags`]
    pub flags: u16,

    /// Mate/next segment reference ID
    pub mate_reference_id: Option<usize>,

    /// Mate/next segment position (-1 if unavailable)
    pub mate_position: i32,

    /// Template length (TLEN)
    pub template_length: i32,

    /// CIGAR operations
    pub cigar: Cigar,

    /// Packed query sequence
    pub sequence: PackedSequence,

    /// Raw Phred quality scores; empty when absent
    pub quality: Vec<u8>,

    /// Optional tags
    pub tags: Tags,
}

impl Record {
    /// Check if the read is unmapped.
    pub fn is_unmapped(&self) -> bool {
        self.flags & flags::UNMAPPED != 0
    }

    /// Check if the read is a reverse complement.
    pub fn is_reverse_complement(&self) -> bool {
        self.flags & flags::REVERSE != 0
    }

    /// Alignment strand.
    pub fn strand(&self) -> Strand {
        Strand::from_flags(self.flags)
    }

    /// Get sequence length.
    pub fn sequence_length(&self) -> usize {
        self.sequence.len()
    }

    /// Number of reference bases covered by the alignment.
    pub fn reference_span(&self) -> u64 {
        self.cigar.reference_span()
    }

    /// Exclusive 0-based end of the alignment on the reference.
    pub fn alignment_end(&self) -> i64 {
        self.position as i64 + self.reference_span() as i64
    }

    /// Read-coordinate bounds excluding leading and trailing clips.
    pub fn query_bounds(&self) -> (u64, u64) {
        self.cigar.query_bounds(self.sequence.len())
    }

    /// Text value of tag `key`.
    ///
    /// `Z`, `H` and `A` values are returned as text. Numeric and array
    /// values, and tags beyond an unrecognised type code, count as absent.
    pub fn tag_text(&self, key: &[u8; 2]) -> Result<Option<Cow<'_, str>>> {
        Ok(self.tags.get(key)?.and_then(|tag| tag.value().as_text()))
    }
}

/// Resolve an oversized CIGAR from the `CG:B,I` tag.
///
/// BAM format has a 16-bit field for n_cigar_op, limiting CIGAR to 65,535
/// operations. Long reads that exceed this store a placeholder `kSmN`
/// (k = sequence length) and the real CIGAR in a `CG:B,I` tag. Without a
/// usable tag the placeholder is returned unchanged.
fn resolve_oversized_cigar(cigar: Cigar, sequence_length: usize, tags: &Tags) -> Result<Cigar> {
    let placeholder = matches!(
        cigar.ops(),
        [clip, skip] if clip.kind() == CigarKind::SoftClip
            && clip.length() as usize == sequence_length
            && skip.kind() == CigarKind::Skip
    );
    if !placeholder {
        return Ok(cigar);
    }

    let Some(tag) = tags.get(b"CG")? else {
        return Ok(cigar);
    };
    let TagValue::Array(array) = tag.value() else {
        return Ok(cigar);
    };
    let Some(raw_ops) = array.to_u32_vec() else {
        return Ok(cigar);
    };

    let ops = raw_ops
        .into_iter()
        .map(|raw| {
            CigarOp::from_raw(raw).ok_or_else(|| {
                BamError::malformed(
                    tags.offset(),
                    format!("invalid CIGAR operation code {} in CG tag", raw & 0x0F),
                )
            })
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(Cigar::new(ops))
}

/// Parse a BAM record body.
///
/// `body` is the record without its `block_size` prefix; `offset` is the
/// logical stream offset of that prefix. Error offsets point at the field
/// that failed.
///
/// # Errors
///
/// [`BamError::MalformedRecord`] if:
/// - the body is shorter than the fixed fields
/// - a declared length (name, CIGAR, sequence) overruns the body
/// - the name is empty, unterminated, or not UTF-8
/// - a reference id is below -1 or the sequence length is negative
/// - a CIGAR op code is invalid, or a known-type tag overruns the body
pub fn parse_record(body: &[u8], offset: u64) -> Result<Record> {
    let base = offset + BLOCK_SIZE_PREFIX;
    if body.len() < FIXED_FIELDS_SIZE {
        return Err(BamError::malformed(
            base,
            format!(
                "record body is {} bytes, shorter than the {}-byte fixed part",
                body.len(),
                FIXED_FIELDS_SIZE
            ),
        ));
    }

    let mut cursor = FieldCursor {
        data: body,
        pos: 0,
        base,
    };

    let ref_id_at = cursor.offset();
    let ref_id = cursor.i32("reference id")?;
    let pos = cursor.i32("position")?;

    let name_len_at = cursor.offset();
    let l_read_name = cursor.u8("read name length")? as usize;
    let mapq = cursor.u8("mapping quality")?;
    let _bin = cursor.u16("bin")?;
    let n_cigar_op = cursor.u16("CIGAR operation count")? as usize;
    let flags = cursor.u16("flag")?;

    let l_seq_at = cursor.offset();
    let l_seq = cursor.i32("sequence length")?;
    let l_seq = usize::try_from(l_seq).map_err(|_| {
        BamError::malformed(l_seq_at, format!("negative sequence length {}", l_seq))
    })?;

    let mate_ref_id_at = cursor.offset();
    let next_ref_id = cursor.i32("mate reference id")?;
    let next_pos = cursor.i32("mate position")?;
    let tlen = cursor.i32("template length")?;

    // l_read_name >= 1 (minimum "*\0")
    if l_read_name == 0 {
        return Err(BamError::malformed(name_len_at, "read name length is zero"));
    }

    let name_at = cursor.offset();
    let name_bytes = cursor.take(l_read_name, "read name")?;
    let name = match name_bytes.split_last() {
        Some((0, name)) => std::str::from_utf8(name)
            .map_err(|e| {
                BamError::malformed(name_at, format!("invalid UTF-8 in read name: {}", e))
            })?
            .to_string(),
        _ => {
            return Err(BamError::malformed(
                name_at + l_read_name as u64 - 1,
                "read name not null-terminated",
            ))
        }
    };

    let cigar_at = cursor.offset();
    let cigar_bytes = cursor.take(n_cigar_op * 4, "CIGAR")?;
    let cigar = parse_cigar(cigar_bytes, cigar_at)?;

    // l_seq == 0 takes no bytes for either field
    let seq_at = cursor.offset();
    let seq_bytes = cursor.take(l_seq.div_ceil(2), "sequence")?;
    let sequence = PackedSequence::new(seq_bytes.to_vec(), l_seq)
        .ok_or_else(|| BamError::malformed(seq_at, "packed sequence size mismatch"))?;

    // 0xFF throughout marks absent qualities
    let quality_bytes = cursor.take(l_seq, "quality")?;
    let quality = if quality_bytes.iter().all(|&b| b == 0xFF) {
        Vec::new()
    } else {
        quality_bytes.to_vec()
    };

    let tags_at = cursor.offset();
    let tags = parse_tags(cursor.rest(), tags_at)?;

    let cigar = resolve_oversized_cigar(cigar, l_seq, &tags)?;

    Ok(Record {
        name,
        reference_id: parse_reference_id(ref_id, ref_id_at, "read")?,
        position: pos,
        mapq,
        flags,
        mate_reference_id: parse_reference_id(next_ref_id, mate_ref_id_at, "mate")?,
        mate_position: next_pos,
        template_length: tlen,
        cigar,
        sequence,
        quality,
        tags,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{int_tag, string_tag, RecordBuilder};

    fn cg_tag(ops: &[u32]) -> Vec<u8> {
        let mut data = b"CGBI".to_vec();
        data.extend_from_slice(&(ops.len() as u32).to_le_bytes());
        for op in ops {
            data.extend_from_slice(&op.to_le_bytes());
        }
        data
    }

    fn assert_malformed_at(result: Result<Record>, expected: u64) {
        match result {
            Err(BamError::MalformedRecord { offset, .. }) => assert_eq!(offset, expected),
            other => panic!("expected MalformedRecord at {expected}, got {other:?}"),
        }
    }

    #[test]
    fn test_parse_mapped_record() {
        let body = RecordBuilder::new("read1")
            .reference(1, 100)
            .mapq(37)
            .flag(0x10)
            .cigar("2S6M")
            .seq("ACGTACGT")
            .qual(&[30; 8])
            .tag(&string_tag(b"CB", "AAACCTG-1"))
            .body();

        let record = parse_record(&body, 0).unwrap();
        assert_eq!(record.name, "read1");
        assert_eq!(record.reference_id, Some(1));
        assert_eq!(record.position, 100);
        assert_eq!(record.mapq, 37);
        assert_eq!(record.flags, 0x10);
        assert_eq!(record.mate_reference_id, None);
        assert_eq!(record.mate_position, -1);
        assert_eq!(record.cigar.to_string(), "2S6M");
        assert_eq!(record.sequence.to_text(), "ACGTACGT");
        assert_eq!(record.quality, vec![30; 8]);
        assert_eq!(record.tag_text(b"CB").unwrap().as_deref(), Some("AAACCTG-1"));
    }

    #[test]
    fn test_derived_quantities() {
        let body = RecordBuilder::new("r")
            .reference(0, 1000)
            .flag(0x10)
            .cigar("3H2S10M5D4N3I2S")
            .seq(&"A".repeat(17))
            .body();
        let record = parse_record(&body, 0).unwrap();

        assert_eq!(record.reference_span(), 19);
        assert_eq!(record.alignment_end(), 1019);
        assert_eq!(record.strand(), Strand::Reverse);
        assert!(record.is_reverse_complement());
        assert_eq!(record.query_bounds(), (2, 15));
    }

    #[test]
    fn test_strand_mapping() {
        assert_eq!(Strand::from_flags(0).to_string(), "+");
        assert_eq!(Strand::from_flags(16).to_string(), "-");
        assert_eq!(Strand::from_flags(0x4 | 0x10).as_char(), '-');
    }

    #[test]
    fn test_unmapped_record() {
        let body = RecordBuilder::new("*")
            .reference(-1, -1)
            .flag(0x4)
            .seq("ACG")
            .body();
        let record = parse_record(&body, 0).unwrap();

        assert!(record.is_unmapped());
        assert_eq!(record.reference_id, None);
        assert_eq!(record.name, "*");
        assert_eq!(record.cigar.to_string(), "*");
        assert_eq!(record.alignment_end(), -1);
    }

    #[test]
    fn test_zero_length_sequence() {
        let body = RecordBuilder::new("empty").cigar("50M").body();
        let record = parse_record(&body, 0).unwrap();

        assert!(record.sequence.is_empty());
        assert_eq!(record.sequence.to_text(), "");
        assert!(record.quality.is_empty());
        // query length falls back to the CIGAR
        assert_eq!(record.query_bounds(), (0, 50));
    }

    #[test]
    fn test_absent_quality_is_empty() {
        let body = RecordBuilder::new("r").seq("ACGT").body();
        let record = parse_record(&body, 0).unwrap();
        assert!(record.quality.is_empty());
    }

    #[test]
    fn test_body_shorter_than_fixed_part() {
        assert_malformed_at(parse_record(&[0u8; 20], 100), 104);
    }

    #[test]
    fn test_zero_name_length() {
        let mut body = RecordBuilder::new("r").body();
        body[8] = 0;
        assert_malformed_at(parse_record(&body, 0), 12);
    }

    #[test]
    fn test_name_not_terminated() {
        let mut body = RecordBuilder::new("abc").body();
        body[32 + 3] = b'x';
        assert_malformed_at(parse_record(&body, 0), 4 + 32 + 3);
    }

    #[test]
    fn test_negative_sequence_length() {
        let mut body = RecordBuilder::new("r").body();
        body[16..20].copy_from_slice(&(-5i32).to_le_bytes());
        assert_malformed_at(parse_record(&body, 0), 20);
    }

    #[test]
    fn test_invalid_reference_id() {
        let body = RecordBuilder::new("r").reference(-2, 0).body();
        assert_malformed_at(parse_record(&body, 0), 4);
    }

    #[test]
    fn test_cigar_count_overruns_body() {
        let mut body = RecordBuilder::new("r1").cigar("10M").body();
        body[12..14].copy_from_slice(&1000u16.to_le_bytes());
        // CIGAR starts after the fixed part and "r1\0"
        assert_malformed_at(parse_record(&body, 0), 4 + 32 + 3);
    }

    #[test]
    fn test_sequence_length_overruns_body() {
        let mut body = RecordBuilder::new("r1").seq("ACGT").body();
        body[16..20].copy_from_slice(&i32::MAX.to_le_bytes());
        assert!(matches!(
            parse_record(&body, 0),
            Err(BamError::MalformedRecord { .. })
        ));
    }

    #[test]
    fn test_invalid_cigar_op() {
        let body = RecordBuilder::new("r1")
            .raw_cigar(&[10 << 4, (5 << 4) | 12])
            .body();
        assert_malformed_at(parse_record(&body, 0), 4 + 32 + 3 + 4);
    }

    #[test]
    fn test_overrunning_tag_is_malformed() {
        let body = RecordBuilder::new("r1").tag(b"NMi\x01\x00").body();
        assert!(matches!(
            parse_record(&body, 0),
            Err(BamError::MalformedRecord { .. })
        ));
    }

    #[test]
    fn test_unknown_tag_type_is_not_an_error() {
        let body = RecordBuilder::new("r1")
            .tag(&int_tag(b"NM", 2))
            .tag(b"XYq\x01\x02\x03")
            .tag(&string_tag(b"CB", "hidden"))
            .body();
        let record = parse_record(&body, 0).unwrap();
        // the barcode sits past the unknown type and is not reachable
        assert_eq!(record.tag_text(b"CB").unwrap(), None);
    }

    #[test]
    fn test_numeric_tag_has_no_text() {
        let body = RecordBuilder::new("r1").tag(&int_tag(b"CB", 7)).body();
        let record = parse_record(&body, 0).unwrap();
        assert_eq!(record.tag_text(b"CB").unwrap(), None);
    }

    #[test]
    fn test_oversized_cigar_from_cg_tag() {
        let body = RecordBuilder::new("long")
            .cigar("4S10N")
            .seq("ACGT")
            .tag(&cg_tag(&[4 << 4, (2 << 4) | 2]))
            .body();
        let record = parse_record(&body, 0).unwrap();

        assert_eq!(record.cigar.to_string(), "4M2D");
        assert_eq!(record.reference_span(), 6);
    }

    #[test]
    fn test_placeholder_without_cg_tag_is_kept() {
        let body = RecordBuilder::new("long").cigar("4S10N").seq("ACGT").body();
        let record = parse_record(&body, 0).unwrap();
        assert_eq!(record.cigar.to_string(), "4S10N");
    }

    #[test]
    fn test_cg_tag_ignored_without_placeholder() {
        let body = RecordBuilder::new("r")
            .cigar("4M")
            .seq("ACGT")
            .tag(&cg_tag(&[9 << 4]))
            .body();
        let record = parse_record(&body, 0).unwrap();
        assert_eq!(record.cigar.to_string(), "4M");
    }

    #[test]
    fn test_invalid_op_in_cg_tag() {
        let body = RecordBuilder::new("long")
            .cigar("4S10N")
            .seq("ACGT")
            .tag(&cg_tag(&[(4 << 4) | 13]))
            .body();
        assert!(matches!(
            parse_record(&body, 0),
            Err(BamError::MalformedRecord { .. })
        ));
    }
}
