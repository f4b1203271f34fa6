//! Decode sessions: BAM stream in, dictionary-encoded columns out.
//!
//! A session reads the header once, then streams records through the filter.
//! Each retained record is resolved against the reference and barcode
//! dictionaries and appended as one row. Both dictionaries are owned by the
//! session, so concurrent sessions share nothing.
//!
//! Any error ends the session; no partial columns are returned.
//!
//! # Example
//!
//! ```no_run
//! use bamread::filter::BASIC_FILTER_FLAGS;
//!
//! # fn main() -> bamread::Result<()> {
//! let file = std::fs::File::open("possorted_genome_bam.bam")?;
//! let decoded = bamread::decode_summary(file, 30, 0, BASIC_FILTER_FLAGS)?;
//!
//! let columns = &decoded.columns;
//! for i in 0..columns.chromosome().len().min(5) {
//!     let barcode = &decoded.barcode_names[columns.barcode()[i] as usize];
//!     println!("{} {} {}", columns.start()[i], columns.end()[i], barcode);
//! }
//! # Ok(())
//! # }
//! ```

use crate::columns::{BarcodeDictionary, Columns, FullColumns, ReferenceDictionary, SummaryColumns};
use crate::error::Result;
use crate::filter::FilterParams;
use crate::io::bam::BamReader;
use crate::io::bgzf::{BgzfReader, BlockDecompressor};
use crate::io::prefetch::PrefetchedBlocks;
use std::io::Read;

/// Default barcode tag (10x Genomics cell barcode).
pub const DEFAULT_BARCODE_TAG: [u8; 2] = *b"CB";

/// Record counts for one session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DecodeStats {
    /// Records decoded from the stream
    pub records_read: u64,
    /// Records that passed the filter
    pub records_retained: u64,
}

/// Result of a decode session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Decoded<C> {
    /// One row per retained record, in stream order
    pub columns: C,
    /// Reference names; index is the chromosome code
    pub reference_names: Vec<String>,
    /// Barcode values; index is the barcode code
    pub barcode_names: Vec<String>,
    /// Session counts
    pub stats: DecodeStats,
}

impl<C: Columns> Decoded<C> {
    /// Column names in output order.
    pub fn column_names(&self) -> &'static [&'static str] {
        C::NAMES
    }

    /// Number of rows.
    pub fn len(&self) -> usize {
        self.columns.len()
    }

    /// Whether no record was retained.
    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }
}

/// Decode configuration.
///
/// # Example
///
/// ```no_run
/// use bamread::{DecodeOptions, FilterParams};
///
/// # fn main() -> bamread::Result<()> {
/// let file = std::fs::File::open("sample.bam")?;
/// let decoded = DecodeOptions::new()
///     .with_filter(FilterParams::new(30, 0, 0x4))
///     .with_barcode_tag(*b"CR")
///     .with_prefetch(true)
///     .decode_full(file)?;
/// println!("{} rows", decoded.len());
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecodeOptions {
    filter: FilterParams,
    barcode_tag: [u8; 2],
    prefetch: bool,
    allow_missing_eof: bool,
}

impl Default for DecodeOptions {
    fn default() -> Self {
        Self {
            filter: FilterParams::default(),
            barcode_tag: DEFAULT_BARCODE_TAG,
            prefetch: false,
            allow_missing_eof: false,
        }
    }
}

impl DecodeOptions {
    /// Default options: basic filtering, `CB` barcodes, sequential decompression.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the record filter.
    pub fn with_filter(mut self, filter: FilterParams) -> Self {
        self.filter = filter;
        self
    }

    /// Set the tag read as the barcode.
    pub fn with_barcode_tag(mut self, tag: [u8; 2]) -> Self {
        self.barcode_tag = tag;
        self
    }

    /// Decompress one block ahead on a producer thread.
    pub fn with_prefetch(mut self, prefetch: bool) -> Self {
        self.prefetch = prefetch;
        self
    }

    /// Accept a file that ends on a block boundary without the BGZF
    /// end-of-file marker. Off by default: such a file may have lost
    /// trailing blocks, so it fails with `UnexpectedEnd`.
    pub fn with_allow_missing_eof(mut self, allow: bool) -> Self {
        self.allow_missing_eof = allow;
        self
    }

    /// Record filter.
    pub fn filter(&self) -> FilterParams {
        self.filter
    }

    /// Barcode tag.
    pub fn barcode_tag(&self) -> [u8; 2] {
        self.barcode_tag
    }

    /// Whether decompression is pipelined.
    pub fn prefetch(&self) -> bool {
        self.prefetch
    }

    /// Whether a missing end-of-file marker is tolerated.
    pub fn allow_missing_eof(&self) -> bool {
        self.allow_missing_eof
    }

    /// Decode a BGZF-compressed BAM stream into summary columns.
    pub fn decode_summary<R>(&self, source: R) -> Result<Decoded<SummaryColumns>>
    where
        R: Read + Send + 'static,
    {
        self.decode(source)
    }

    /// Decode a BGZF-compressed BAM stream into full columns.
    pub fn decode_full<R>(&self, source: R) -> Result<Decoded<FullColumns>>
    where
        R: Read + Send + 'static,
    {
        self.decode(source)
    }

    /// Decode a BGZF-compressed BAM stream into any column set.
    pub fn decode<C, R>(&self, source: R) -> Result<Decoded<C>>
    where
        C: Columns,
        R: Read + Send + 'static,
    {
        let blocks = BlockDecompressor::new(source).allow_missing_eof(self.allow_missing_eof);
        if self.prefetch {
            let blocks = PrefetchedBlocks::from_decompressor(blocks)?;
            self.decode_records(BamReader::new(BgzfReader::new(blocks))?)
        } else {
            self.decode_records(BamReader::new(BgzfReader::new(blocks))?)
        }
    }

    /// Run a session over an already opened reader.
    ///
    /// `bam` may be positioned anywhere after the header; decoding starts at
    /// its next record.
    pub fn decode_records<C, R>(&self, mut bam: BamReader<R>) -> Result<Decoded<C>>
    where
        C: Columns,
        R: Read,
    {
        let references = ReferenceDictionary::from_header(bam.header());
        let mut barcodes = BarcodeDictionary::new();
        let mut columns = C::default();
        let mut stats = DecodeStats::default();

        for record in bam.records() {
            let record = record?;
            stats.records_read += 1;

            if !self.filter.accepts(record.mapq, record.flags) {
                continue;
            }

            let reference_code = references.code_for(record.reference_id);
            let barcode = record.tag_text(&self.barcode_tag)?;
            let barcode_code = barcodes.code_for(barcode.as_deref());

            columns.append(&record, reference_code, barcode_code);
            stats.records_retained += 1;
        }

        log::info!(
            "Decoded {} records, retained {} ({} barcodes, {} references)",
            stats.records_read,
            stats.records_retained,
            barcodes.len(),
            references.names().len()
        );

        Ok(Decoded {
            columns,
            reference_names: references.into_names(),
            barcode_names: barcodes.into_names(),
            stats,
        })
    }
}

fn filter_options(min_quality: u8, required_flags: u16, filter_flags: u16) -> DecodeOptions {
    DecodeOptions::new().with_filter(FilterParams::new(min_quality, required_flags, filter_flags))
}

/// Decode a BGZF-compressed BAM stream into summary columns.
///
/// Records are retained iff `mapq >= min_quality`, all `required_flags` bits
/// are set and no `filter_flags` bit is set. Barcodes come from the `CB` tag.
///
/// # Errors
///
/// The first [`BamError`](crate::BamError) met anywhere in the stream.
pub fn decode_summary<R: Read>(
    source: R,
    min_quality: u8,
    required_flags: u16,
    filter_flags: u16,
) -> Result<Decoded<SummaryColumns>> {
    filter_options(min_quality, required_flags, filter_flags)
        .decode_records(BamReader::from_compressed(source)?)
}

/// Decode a BGZF-compressed BAM stream into full columns.
///
/// Same filtering and errors as [`decode_summary`].
pub fn decode_full<R: Read>(
    source: R,
    min_quality: u8,
    required_flags: u16,
    filter_flags: u16,
) -> Result<Decoded<FullColumns>> {
    filter_options(min_quality, required_flags, filter_flags)
        .decode_records(BamReader::from_compressed(source)?)
}
