//! Columnar accumulation of retained records.
//!
//! Each retained record becomes one row across every column of the active
//! set. Rows are only added through [`Columns::append`], so all columns of a
//! set have the same length at every point.
//!
//! - [`SummaryColumns`]: Chromosome, Start, End, Strand, Flag, CB
//! - [`FullColumns`]: summary plus QueryStart, QueryEnd, QuerySequence, Name,
//!   Cigar, Quality
//!
//! Chromosome and CB hold dictionary codes; see [`dictionary`].

pub mod dictionary;
pub mod full;
pub mod summary;

pub use dictionary::{
    BarcodeDictionary, Dictionary, ReferenceDictionary, MISSING_BARCODE, NO_CATEGORY,
};
pub use full::{DetailParts, FullColumns};
pub use summary::{SummaryColumns, SummaryParts};

use crate::io::bam::Record;

/// A set of index-aligned columns that grows one record at a time.
pub trait Columns: Default {
    /// Column names in output order.
    const NAMES: &'static [&'static str];

    /// Append one row for `record`.
    fn append(&mut self, record: &Record, reference_code: i32, barcode_code: u32);

    /// Number of rows.
    fn len(&self) -> usize;

    /// Whether no row has been appended.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
