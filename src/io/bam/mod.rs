//! Native BAM (Binary Alignment Map) decoding.
//!
//! This module turns the logical (decompressed) BAM stream into typed
//! records:
//! - Header parsing (magic bytes, SAM text, reference dictionary)
//! - Record parsing (all fixed fields, name, CIGAR, sequence, quality, tags)
//! - Packed value types for CIGAR operations and 4-bit sequences
//! - Lazy tag scanning (only the tags asked for are decoded)
//! - Streaming iterator interface, one record resident at a time
//!
//! The BGZF layer lives in [`crate::io::bgzf`]; [`BamReader::from_compressed`]
//! stacks the two.
//!
//! # Example
//!
//! ```no_run
//! use bamread::io::bam::BamReader;
//! use std::fs::File;
//!
//! # fn main() -> bamread::Result<()> {
//! let file = File::open("alignments.bam")?;
//! let mut bam = BamReader::from_compressed(file)?;
//!
//! println!("Header: {} references", bam.header().reference_count());
//!
//! // Stream records with constant memory
//! for record in bam.records() {
//!     let record = record?;
//!     if !record.is_unmapped() {
//!         println!("Read {} at {}{}", record.name, record.position, record.strand());
//!     }
//! }
//! # Ok(())
//! # }
//! ```

pub mod cigar;
pub mod header;
pub mod reader;
pub mod record;
pub mod sequence;
pub mod tags;

// Re-export main types for convenience
pub use cigar::{parse_cigar, Cigar, CigarKind, CigarOp};
pub use header::{read_header, Header, Reference};
pub use reader::{BamReader, Records};
pub use record::{parse_record, Record, Strand};
pub use sequence::{decode_sequence, PackedSequence};
pub use tags::{parse_tags, ArrayValue, Tag, TagValue, Tags};
