//! Summary columns: one row of position fields per retained record.

use super::Columns;
use crate::io::bam::{Record, Strand};

/// Owned summary column vectors, all of equal length.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SummaryParts {
    /// Reference code (`-1` for no reference)
    pub chromosome: Vec<i32>,
    /// 0-based leftmost position
    pub start: Vec<i64>,
    /// Exclusive end on the reference
    pub end: Vec<i64>,
    /// Alignment strand
    pub strand: Vec<Strand>,
    /// Flag word
    pub flag: Vec<u16>,
    /// Barcode code
    pub barcode: Vec<u32>,
}

/// Accumulator for the summary column set.
///
/// Columns only grow together through [`Columns::append`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SummaryColumns {
    parts: SummaryParts,
}

impl SummaryColumns {
    /// Create an empty column set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Reference codes.
    pub fn chromosome(&self) -> &[i32] {
        &self.parts.chromosome
    }

    /// Start positions.
    pub fn start(&self) -> &[i64] {
        &self.parts.start
    }

    /// End positions.
    pub fn end(&self) -> &[i64] {
        &self.parts.end
    }

    /// Strands.
    pub fn strand(&self) -> &[Strand] {
        &self.parts.strand
    }

    /// Flag words.
    pub fn flag(&self) -> &[u16] {
        &self.parts.flag
    }

    /// Barcode codes.
    pub fn barcode(&self) -> &[u32] {
        &self.parts.barcode
    }

    /// Consume, returning the column vectors.
    pub fn into_parts(self) -> SummaryParts {
        self.parts
    }
}

impl Columns for SummaryColumns {
    const NAMES: &'static [&'static str] = &["Chromosome", "Start", "End", "Strand", "Flag", "CB"];

    fn append(&mut self, record: &Record, reference_code: i32, barcode_code: u32) {
        let parts = &mut self.parts;
        parts.chromosome.push(reference_code);
        parts.start.push(record.position as i64);
        parts.end.push(record.alignment_end());
        parts.strand.push(record.strand());
        parts.flag.push(record.flags);
        parts.barcode.push(barcode_code);
    }

    fn len(&self) -> usize {
        self.parts.chromosome.len()
    }
}
