//! bamread: streaming BAM decoding into filtered, dictionary-encoded columns
//!
//! # Overview
//!
//! bamread turns a BGZF-compressed BAM stream into index-aligned column
//! vectors of alignment attributes, optionally annotated with per-read cell
//! barcodes. Reference names and barcodes are dictionary-encoded: columns
//! hold small integer codes and the session returns the ordered name tables.
//!
//! ## Key Features
//!
//! - **Streaming**: one compressed block and one record resident at a time
//! - **Filtering**: minimum mapping quality, required and excluded flag bits
//! - **Two column sets**: summary (positions, strand, flag, barcode) or full
//!   (adds query bounds, sequence, name, CIGAR, quality)
//! - **Pipelined decompression**: optional producer thread one block ahead
//! - **Typed errors** with the byte offset where decoding failed
//!
//! ## Quick Start
//!
//! ```no_run
//! use bamread::filter::BASIC_FILTER_FLAGS;
//!
//! # fn main() -> bamread::Result<()> {
//! let file = std::fs::File::open("alignments.bam")?;
//! let decoded = bamread::decode_summary(file, 0, 0, BASIC_FILTER_FLAGS)?;
//!
//! println!("{} of {} records retained", decoded.stats.records_retained, decoded.stats.records_read);
//! println!("columns: {:?}", decoded.column_names());
//! # Ok(())
//! # }
//! ```
//!
//! ## Module Organization
//!
//! - [`io`]: BGZF block decompression and BAM header/record decoding
//! - [`filter`]: quality and flag predicates
//! - [`columns`]: dictionary encoders and column accumulators
//! - [`decode`]: decode sessions and entry points
//!
//! ## Logging
//!
//! Diagnostics go through the [`log`](https://docs.rs/log) facade. The
//! library never installs a logger.

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

pub mod columns;
pub mod decode;
pub mod error;
pub mod filter;
pub mod io;

#[cfg(test)]
mod testutil;

// Re-export commonly used types
pub use columns::{Columns, FullColumns, SummaryColumns};
pub use decode::{decode_full, decode_summary, DecodeOptions, DecodeStats, Decoded};
pub use error::{BamError, Result};
pub use filter::FilterParams;
pub use io::bam::{BamReader, Record, Strand};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
