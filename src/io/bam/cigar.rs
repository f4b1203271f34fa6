//! CIGAR (Compact Idiosyncratic Gapped Alignment Report) decoding.
//!
//! # BAM Format
//!
//! Each operation is one little-endian `u32`:
//!
//! ```text
//!  31                              4 3      0
//! ┌─────────────────────────────────┬────────┐
//! │        length (28 bits)         │ op (4) │
//! └─────────────────────────────────┴────────┘
//! ```
//!
//! Op codes 0-8 map to `MIDNSHP=X`; 9-15 are not defined by the format.

use crate::error::{BamError, Result};
use std::fmt;

/// Kind of a CIGAR operation (the low 4 bits).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CigarKind {
    /// Alignment match or mismatch (M)
    Match,
    /// Insertion to the reference (I)
    Insertion,
    /// Deletion from the reference (D)
    Deletion,
    /// Skipped reference region, e.g. an intron (N)
    Skip,
    /// Soft clip: bases present in the read but not aligned (S)
    SoftClip,
    /// Hard clip: bases absent from the stored read (H)
    HardClip,
    /// Silent deletion from a padded reference (P)
    Padding,
    /// Sequence match (=)
    SequenceMatch,
    /// Sequence mismatch (X)
    SequenceMismatch,
}

impl CigarKind {
    /// Map a 4-bit op code to its kind.
    pub fn from_code(code: u8) -> Option<Self> {
        Some(match code {
            0 => Self::Match,
            1 => Self::Insertion,
            2 => Self::Deletion,
            3 => Self::Skip,
            4 => Self::SoftClip,
            5 => Self::HardClip,
            6 => Self::Padding,
            7 => Self::SequenceMatch,
            8 => Self::SequenceMismatch,
            _ => return None,
        })
    }

    /// The 4-bit op code.
    pub fn code(self) -> u8 {
        match self {
            Self::Match => 0,
            Self::Insertion => 1,
            Self::Deletion => 2,
            Self::Skip => 3,
            Self::SoftClip => 4,
            Self::HardClip => 5,
            Self::Padding => 6,
            Self::SequenceMatch => 7,
            Self::SequenceMismatch => 8,
        }
    }

    /// SAM text character.
    pub fn as_char(self) -> char {
        b"MIDNSHP=X"[self.code() as usize] as char
    }

    /// Whether the operation advances along the reference.
    pub fn consumes_reference(self) -> bool {
        matches!(
            self,
            Self::Match
                | Self::Deletion
                | Self::Skip
                | Self::SequenceMatch
                | Self::SequenceMismatch
        )
    }

    /// Whether the operation advances along the stored read.
    pub fn consumes_query(self) -> bool {
        matches!(
            self,
            Self::Match
                | Self::Insertion
                | Self::SoftClip
                | Self::SequenceMatch
                | Self::SequenceMismatch
        )
    }

    /// Soft or hard clip.
    pub fn is_clip(self) -> bool {
        matches!(self, Self::SoftClip | Self::HardClip)
    }
}

/// One packed CIGAR operation: the BAM word plus its decoded kind.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct CigarOp {
    raw: u32,
    kind: CigarKind,
}

impl CigarOp {
    /// Largest length that fits in 28 bits.
    pub const MAX_LENGTH: u32 = (1 << 28) - 1;

    /// Build an operation from its kind and length (length is masked to 28 bits).
    pub fn new(kind: CigarKind, length: u32) -> Self {
        Self {
            raw: ((length & Self::MAX_LENGTH) << 4) | kind.code() as u32,
            kind,
        }
    }

    /// Validate a packed BAM value.
    pub fn from_raw(raw: u32) -> Option<Self> {
        CigarKind::from_code((raw & 0x0F) as u8).map(|kind| Self { raw, kind })
    }

    /// Packed BAM value.
    pub fn raw(self) -> u32 {
        self.raw
    }

    /// Operation kind (low 4 bits).
    pub fn kind(self) -> CigarKind {
        self.kind
    }

    /// Operation length (high 28 bits).
    pub fn length(self) -> u32 {
        self.raw >> 4
    }
}

impl fmt::Debug for CigarOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CigarOp({}{})", self.length(), self.kind().as_char())
    }
}

impl fmt::Display for CigarOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.length(), self.kind().as_char())
    }
}

/// Ordered CIGAR operations of one record.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Cigar(Vec<CigarOp>);

impl Cigar {
    /// Wrap a list of operations.
    pub fn new(ops: Vec<CigarOp>) -> Self {
        Self(ops)
    }

    /// Operations in order.
    pub fn ops(&self) -> &[CigarOp] {
        &self.0
    }

    /// Number of operations.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether there are no operations.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Sum of reference-consuming lengths (M, D, N, =, X).
    pub fn reference_span(&self) -> u64 {
        self.0
            .iter()
            .filter(|op| op.kind().consumes_reference())
            .map(|op| op.length() as u64)
            .sum()
    }

    /// Sum of query-consuming lengths (M, I, S, =, X).
    pub fn query_length(&self) -> u64 {
        self.0
            .iter()
            .filter(|op| op.kind().consumes_query())
            .map(|op| op.length() as u64)
            .sum()
    }

    /// Read-coordinate bounds of the aligned part of the query.
    ///
    /// Leading and trailing soft clips are excluded; hard clips are stepped
    /// over since their bases are not stored. `sequence_length` is the stored
    /// read length; when it is zero the query length implied by the CIGAR is
    /// used instead.
    pub fn query_bounds(&self, sequence_length: usize) -> (u64, u64) {
        let query_length = if sequence_length > 0 {
            sequence_length as u64
        } else {
            self.query_length()
        };

        let leading = self.0.iter().take_while(|op| op.kind().is_clip()).count();
        let start: u64 = self.0[..leading]
            .iter()
            .filter(|op| op.kind() == CigarKind::SoftClip)
            .map(|op| op.length() as u64)
            .sum();

        // Ops already counted as leading clips are not trailing clips
        let trailing: u64 = self.0[leading..]
            .iter()
            .rev()
            .take_while(|op| op.kind().is_clip())
            .filter(|op| op.kind() == CigarKind::SoftClip)
            .map(|op| op.length() as u64)
            .sum();
        let end = query_length.saturating_sub(trailing);

        (start.min(end), end)
    }
}

impl fmt::Display for Cigar {
    /// SAM text form; `*` when there are no operations.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            return f.write_str("*");
        }
        for op in &self.0 {
            write!(f, "{}", op)?;
        }
        Ok(())
    }
}

/// Decode packed CIGAR operations.
///
/// `data` must hold exactly 4 bytes per operation. `offset` is the logical
/// stream offset of `data`, used to locate an invalid op code.
///
/// # Example
///
/// ```
/// use bamread::io::bam::cigar::{parse_cigar, CigarKind};
///
/// // 100M = 100 << 4 | 0 = 0x640
/// let cigar = parse_cigar(&[0x40, 0x06, 0x00, 0x00], 0).unwrap();
/// assert_eq!(cigar.ops()[0].kind(), CigarKind::Match);
/// assert_eq!(cigar.ops()[0].length(), 100);
/// ```
pub fn parse_cigar(data: &[u8], offset: u64) -> Result<Cigar> {
    if data.len() % 4 != 0 {
        return Err(BamError::malformed(
            offset,
            format!("CIGAR data length {} is not a multiple of 4", data.len()),
        ));
    }

    let ops = data
        .chunks_exact(4)
        .enumerate()
        .map(|(i, chunk)| {
            let raw = u32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]);
            CigarOp::from_raw(raw).ok_or_else(|| {
                BamError::malformed(
                    offset + 4 * i as u64,
                    format!("invalid CIGAR operation code {}", raw & 0x0F),
                )
            })
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(Cigar::new(ops))
}
