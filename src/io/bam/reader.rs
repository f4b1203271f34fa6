//! BAM streaming reader.
//!
//! Provides a streaming interface over the logical (decompressed) BAM stream
//! with constant memory: one record in flight at a time.
//!
//! # Design
//!
//! - Iterator-based interface (constant memory)
//! - Header read separately from records
//! - Records are not accumulated (streaming)
//! - Any [`Read`] over the logical stream works; [`BamReader::from_compressed`]
//!   and [`BamReader::from_compressed_prefetched`] put the BGZF layer in front
//!
//! # Usage
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
//! for result in bam.records() {
//!     let record = result?;
//!     println!("{} at {}", record.name, record.position);
//! }
//! # Ok(())
//! # }
//! ```

use super::header::{read_header_counted, Header};
use super::record::{parse_record, Record, BLOCK_SIZE_PREFIX, FIXED_FIELDS_SIZE};
use crate::error::{BamError, Result};
use crate::io::bgzf::{BgzfReader, BlockDecompressor};
use crate::io::prefetch::PrefetchedBlocks;
use crate::io::read_full;
use std::io::Read;

/// BAM reader with streaming interface.
///
/// The header is read once during construction, then records are streamed.
///
/// # Buffer Reuse
///
/// Maintains an internal buffer that's reused across record reads to avoid
/// repeated allocations. This buffer grows to accommodate the largest record
/// seen, then stays at that size for subsequent reads.
pub struct BamReader<R> {
    /// Logical stream
    reader: R,
    /// BAM header (read during construction)
    header: Header,
    /// Reusable buffer for record bodies
    buffer: Vec<u8>,
    /// Logical offset of the next record
    offset: u64,
}

impl<R: Read> BamReader<R> {
    /// Create a new BAM reader over a logical (already decompressed) stream.
    ///
    /// Reads and validates the BAM header immediately.
    ///
    /// # Errors
    ///
    /// Returns error if:
    /// - Invalid magic bytes ([`BamError::NotABamFile`])
    /// - Header is malformed or truncated ([`BamError::CorruptHeader`])
    /// - The block layer fails while reading the header
    pub fn new(mut reader: R) -> Result<Self> {
        let (header, offset) = read_header_counted(&mut reader)?;
        // Typical short-read record is a few hundred bytes
        let buffer = Vec::with_capacity(512);
        Ok(Self {
            reader,
            header,
            buffer,
            offset,
        })
    }

    /// Get a reference to the BAM header.
    pub fn header(&self) -> &Header {
        &self.header
    }

    /// Logical stream offset of the next record.
    pub fn offset(&self) -> u64 {
        self.offset
    }

    /// Consume the reader, returning the header.
    pub fn into_header(self) -> Header {
        self.header
    }

    /// Create an iterator over BAM records.
    ///
    /// The iterator ends after the first error.
    pub fn records(&mut self) -> Records<'_, R> {
        Records {
            reader: self,
            done: false,
        }
    }

    /// Read a single record.
    ///
    /// Returns `Ok(None)` when the stream ends cleanly on a record boundary.
    ///
    /// # Errors
    ///
    /// - [`BamError::UnexpectedEnd`] if the stream ends inside a record
    /// - [`BamError::MalformedRecord`] if the record's fields are inconsistent
    ///   with its declared size, or its reference id is outside the header's
    ///   reference table
    pub fn read_record(&mut self) -> Result<Option<Record>> {
        let record_offset = self.offset;

        let mut size_buf = [0u8; 4];
        let n = read_full(&mut self.reader, &mut size_buf)?;
        match n {
            0 => return Ok(None),
            4 => {}
            _ => {
                return Err(BamError::unexpected_end(
                    record_offset + n as u64,
                    format!("record length prefix ({} of 4 bytes)", n),
                ))
            }
        }

        let block_size = i32::from_le_bytes(size_buf);
        let block_size = usize::try_from(block_size)
            .ok()
            .filter(|&size| size >= FIXED_FIELDS_SIZE)
            .ok_or_else(|| {
                BamError::malformed(
                    record_offset,
                    format!(
                        "record length {} is smaller than the {}-byte fixed part",
                        block_size, FIXED_FIELDS_SIZE
                    ),
                )
            })?;

        // Reuse buffer; `take` keeps a corrupt length from driving the allocation
        self.buffer.clear();
        let got = (&mut self.reader)
            .take(block_size as u64)
            .read_to_end(&mut self.buffer)?;
        if got < block_size {
            return Err(BamError::unexpected_end(
                record_offset + BLOCK_SIZE_PREFIX + got as u64,
                format!("record body ({} of {} bytes)", got, block_size),
            ));
        }

        let record = parse_record(&self.buffer, record_offset)?;

        if let Some(id) = record.reference_id {
            if id >= self.header.reference_count() {
                return Err(BamError::malformed(
                    record_offset + BLOCK_SIZE_PREFIX,
                    format!(
                        "reference id {} out of range for {} references",
                        id,
                        self.header.reference_count()
                    ),
                ));
            }
        }

        self.offset = record_offset + BLOCK_SIZE_PREFIX + block_size as u64;
        Ok(Some(record))
    }
}

impl<R: Read> BamReader<BgzfReader<BlockDecompressor<R>>> {
    /// Open a BGZF-compressed BAM stream, decompressing one block at a time.
    ///
    /// # Example
    ///
    /// ```no_run
    /// use bamread::io::bam::BamReader;
    ///
    /// # fn main() -> bamread::Result<()> {
    /// let file = std::fs::File::open("alignments.bam")?;
    /// let bam = BamReader::from_compressed(file)?;
    /// println!("Opened BAM with {} references", bam.header().reference_count());
    /// # Ok(())
    /// # }
    /// ```
    pub fn from_compressed(inner: R) -> Result<Self> {
        Self::new(BgzfReader::from_reader(inner))
    }
}

impl BamReader<BgzfReader<PrefetchedBlocks>> {
    /// Open a BGZF-compressed BAM stream with block decompression running
    /// one block ahead on a producer thread.
    pub fn from_compressed_prefetched<R: Read + Send + 'static>(inner: R) -> Result<Self> {
        Self::new(BgzfReader::new(PrefetchedBlocks::spawn(inner)?))
    }
}

/// Iterator over BAM records.
///
/// Created by [`BamReader::records()`]. Streams records with constant memory.
pub struct Records<'a, R> {
    reader: &'a mut BamReader<R>,
    done: bool,
}

impl<R: Read> Iterator for Records<'_, R> {
    type Item = Result<Record>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        match self.reader.read_record() {
            Ok(Some(record)) => Some(Ok(record)),
            Ok(None) => {
                self.done = true;
                None
            }
            Err(e) => {
                self.done = true;
                Some(Err(e))
            }
        }
    }
}
