//! Full columns: summary fields plus query detail.

use super::summary::{SummaryColumns, SummaryParts};
use super::Columns;
use crate::io::bam::Record;

/// Owned detail column vectors.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DetailParts {
    /// Start of the aligned part of the read (after leading soft clips)
    pub query_start: Vec<u64>,
    /// End of the aligned part of the read (before trailing soft clips)
    pub query_end: Vec<u64>,
    /// Decoded bases; empty when the record stores no sequence
    pub query_sequence: Vec<String>,
    /// Read name
    pub name: Vec<String>,
    /// SAM-style CIGAR text, `*` when empty
    pub cigar: Vec<String>,
    /// Raw Phred qualities; empty when absent
    pub quality: Vec<Vec<u8>>,
}

/// Accumulator for the full column set.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FullColumns {
    summary: SummaryColumns,
    detail: DetailParts,
}

impl FullColumns {
    /// Create an empty column set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Summary columns.
    pub fn summary(&self) -> &SummaryColumns {
        &self.summary
    }

    /// Query start bounds.
    pub fn query_start(&self) -> &[u64] {
        &self.detail.query_start
    }

    /// Query end bounds.
    pub fn query_end(&self) -> &[u64] {
        &self.detail.query_end
    }

    /// Decoded sequences.
    pub fn query_sequence(&self) -> &[String] {
        &self.detail.query_sequence
    }

    /// Read names.
    pub fn name(&self) -> &[String] {
        &self.detail.name
    }

    /// Rendered CIGARs.
    pub fn cigar(&self) -> &[String] {
        &self.detail.cigar
    }

    /// Quality values.
    pub fn quality(&self) -> &[Vec<u8>] {
        &self.detail.quality
    }

    /// Consume, returning summary and detail vectors.
    pub fn into_parts(self) -> (SummaryParts, DetailParts) {
        (self.summary.into_parts(), self.detail)
    }
}

impl Columns for FullColumns {
    const NAMES: &'static [&'static str] = &[
        "Chromosome",
        "Start",
        "End",
        "Strand",
        "Flag",
        "QueryStart",
        "QueryEnd",
        "QuerySequence",
        "Name",
        "Cigar",
        "Quality",
        "CB",
    ];

    fn append(&mut self, record: &Record, reference_code: i32, barcode_code: u32) {
        self.summary.append(record, reference_code, barcode_code);

        let (query_start, query_end) = record.query_bounds();
        let detail = &mut self.detail;
        detail.query_start.push(query_start);
        detail.query_end.push(query_end);
        detail.query_sequence.push(record.sequence.to_text());
        detail.name.push(record.name.clone());
        detail.cigar.push(record.cigar.to_string());
        detail.quality.push(record.quality.clone());
    }

    fn len(&self) -> usize {
        self.summary.len()
    }
}
