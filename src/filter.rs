//! Record filtering on mapping quality and flag bits.
//!
//! A record is retained iff
//!
//! ```text
//! mapq >= min_mapq && (flag & required_flags) == required_flags && (flag & filter_flags) == 0
//! ```
//!
//! Evaluation is pure; retained records keep their stream order.

/// BAM flag bits.
pub mod flags {
    /// Read is paired in sequencing.
    pub const PAIRED: u16 = 0x1;
    /// Each segment properly aligned.
    pub const PROPER_PAIR: u16 = 0x2;
    /// Read is unmapped.
    pub const UNMAPPED: u16 = 0x4;
    /// Mate is unmapped.
    pub const MATE_UNMAPPED: u16 = 0x8;
    /// Read is reverse complemented.
    pub const REVERSE: u16 = 0x10;
    /// Mate is reverse complemented.
    pub const MATE_REVERSE: u16 = 0x20;
    /// First segment in template (R1).
    pub const FIRST_SEGMENT: u16 = 0x40;
    /// Last segment in template (R2).
    pub const LAST_SEGMENT: u16 = 0x80;
    /// Secondary alignment.
    pub const SECONDARY: u16 = 0x100;
    /// Not passing quality controls.
    pub const QC_FAIL: u16 = 0x200;
    /// PCR or optical duplicate.
    pub const DUPLICATE: u16 = 0x400;
    /// Supplementary alignment.
    pub const SUPPLEMENTARY: u16 = 0x800;
}

/// Default filter mask: unmapped, QC-fail and duplicate reads (1540).
///
/// Secondary alignments ([`flags::SECONDARY`], 0x100) are not in this mask
/// and pass the default filter. Add the bit to `filter_flags` to drop them.
pub const BASIC_FILTER_FLAGS: u16 = flags::UNMAPPED | flags::QC_FAIL | flags::DUPLICATE;

/// Filter parameters.
///
/// `Default` keeps every mapping quality, requires no flags, and drops
/// [`BASIC_FILTER_FLAGS`].
///
/// # Example
///
/// ```
/// use bamread::filter::{flags, FilterParams};
///
/// let params = FilterParams::new(30, 0, flags::UNMAPPED);
/// assert!(!params.accepts(20, 0));
/// assert!(!params.accepts(40, flags::UNMAPPED));
/// assert!(params.accepts(40, 0));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FilterParams {
    /// Inclusive lower bound on mapping quality
    pub min_mapq: u8,
    /// Bits that must all be set
    pub required_flags: u16,
    /// Bits of which none may be set
    pub filter_flags: u16,
}

impl FilterParams {
    /// Create filter parameters.
    pub fn new(min_mapq: u8, required_flags: u16, filter_flags: u16) -> Self {
        Self {
            min_mapq,
            required_flags,
            filter_flags,
        }
    }

    /// Parameters that retain every record.
    pub fn accept_all() -> Self {
        Self::new(0, 0, 0)
    }

    /// Whether a record with this mapping quality and flag word is retained.
    #[inline]
    pub fn accepts(&self, mapq: u8, flag: u16) -> bool {
        mapq >= self.min_mapq
            && flag & self.required_flags == self.required_flags
            && flag & self.filter_flags == 0
    }
}

impl Default for FilterParams {
    fn default() -> Self {
        Self::new(0, 0, BASIC_FILTER_FLAGS)
    }
}
