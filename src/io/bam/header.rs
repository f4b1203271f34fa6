//! BAM header parsing.
//!
//! The BAM header consists of:
//! 1. Magic bytes ("BAM\1")
//! 2. SAM header text (length-prefixed)
//! 3. Reference sequence dictionary
//!
//! # Format
//!
//! ```text
//! BAM Header:
//! - 4 bytes: Magic ("BAM\1")
//! - 4 bytes: SAM header text length (l_text, int32)
//! - l_text bytes: SAM header text
//! - 4 bytes: Number of reference sequences (n_ref, int32)
//! - For each reference:
//!   - 4 bytes: Reference name length (l_name, int32, includes null terminator)
//!   - l_name bytes: Reference name (null-terminated)
//!   - 4 bytes: Reference length (int32)
//! ```
//!
//! The text is kept verbatim and not parsed; reference ids are positions in
//! the binary dictionary.

use crate::error::{BamError, Result};
use crate::io::read_full;
use std::io::Read;

/// BAM magic bytes.
pub const BAM_MAGIC: &[u8; 4] = b"BAM\x01";

/// Reference sequence information.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reference {
    /// Reference sequence name (e.g., "chr1", "chrM")
    pub name: String,
    /// Reference sequence length in bases
    pub length: u32,
}

impl Reference {
    /// Create a new reference.
    pub fn new(name: String, length: u32) -> Self {
        Self { name, length }
    }
}

/// BAM file header.
///
/// The position of a reference in `references` is its reference id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Header {
    /// SAM header text (trailing NUL padding removed)
    pub text: String,
    /// Reference sequences (chromosomes/contigs)
    pub references: Vec<Reference>,
}

impl Header {
    /// Create a new header.
    pub fn new(text: String, references: Vec<Reference>) -> Self {
        Self { text, references }
    }

    /// Get reference by ID.
    pub fn reference(&self, id: usize) -> Option<&Reference> {
        self.references.get(id)
    }

    /// Get reference name by ID.
    pub fn reference_name(&self, id: usize) -> Option<&str> {
        self.reference(id).map(|r| r.name.as_str())
    }

    /// Get number of reference sequences.
    pub fn reference_count(&self) -> usize {
        self.references.len()
    }

    /// Reference names in id order.
    pub fn reference_names(&self) -> impl Iterator<Item = &str> + '_ {
        self.references.iter().map(|r| r.name.as_str())
    }
}

/// Reader wrapper that tracks the logical offset for error messages.
struct HeaderCursor<'r, R> {
    reader: &'r mut R,
    offset: u64,
}

impl<R: Read> HeaderCursor<'_, R> {
    fn read_exact(&mut self, buf: &mut [u8], field: &str) -> Result<()> {
        let n = read_full(self.reader, buf)?;
        if n < buf.len() {
            return Err(BamError::corrupt_header(
                self.offset + n as u64,
                format!("truncated {}: need {} bytes, got {}", field, buf.len(), n),
            ));
        }
        self.offset += n as u64;
        Ok(())
    }

    fn read_i32(&mut self, field: &str) -> Result<i32> {
        let mut buf = [0u8; 4];
        self.read_exact(&mut buf, field)?;
        Ok(i32::from_le_bytes(buf))
    }

    /// Read a length field that must be non-negative.
    fn read_len(&mut self, field: &str) -> Result<usize> {
        let at = self.offset;
        let value = self.read_i32(field)?;
        usize::try_from(value)
            .map_err(|_| BamError::corrupt_header(at, format!("negative {}: {}", field, value)))
    }

    /// Read `len` bytes without trusting `len` for the allocation size.
    fn read_vec(&mut self, len: usize, field: &str) -> Result<Vec<u8>> {
        let mut data = Vec::with_capacity(len.min(64 * 1024));
        let n = (&mut *self.reader).take(len as u64).read_to_end(&mut data)?;
        if n < len {
            return Err(BamError::corrupt_header(
                self.offset + n as u64,
                format!("truncated {}: need {} bytes, got {}", field, len, n),
            ));
        }
        self.offset += n as u64;
        Ok(data)
    }
}

/// Read and validate BAM magic bytes.
///
/// A short read is reported the same way as a wrong magic, since in both
/// cases the source is not a BAM stream.
pub fn read_magic<R: Read>(reader: &mut R) -> Result<()> {
    let mut magic = [0u8; 4];
    let n = read_full(reader, &mut magic)?;
    if n < magic.len() || &magic != BAM_MAGIC {
        return Err(BamError::NotABamFile {
            found: magic[..n].to_vec(),
        });
    }
    Ok(())
}

fn read_header_text<R: Read>(cursor: &mut HeaderCursor<'_, R>) -> Result<String> {
    let len = cursor.read_len("header text length")?;
    let bytes = cursor.read_vec(len, "header text")?;
    let text = String::from_utf8_lossy(&bytes);
    Ok(text.trim_end_matches('\0').to_string())
}

fn read_reference<R: Read>(cursor: &mut HeaderCursor<'_, R>) -> Result<Reference> {
    let at = cursor.offset;
    let name_len = cursor.read_len("reference name length")?;
    if name_len == 0 {
        return Err(BamError::corrupt_header(at, "reference name length is zero"));
    }

    let mut name_bytes = cursor.read_vec(name_len, "reference name")?;
    if name_bytes.last() != Some(&0) {
        return Err(BamError::corrupt_header(
            cursor.offset - 1,
            "reference name not null-terminated",
        ));
    }
    name_bytes.pop();

    let name = String::from_utf8(name_bytes).map_err(|e| {
        BamError::corrupt_header(at + 4, format!("invalid UTF-8 in reference name: {}", e))
    })?;

    let at = cursor.offset;
    let length = cursor.read_i32("reference length")?;
    let length = u32::try_from(length).map_err(|_| {
        BamError::corrupt_header(at, format!("negative length {} for reference {}", length, name))
    })?;

    Ok(Reference::new(name, length))
}

fn read_references<R: Read>(cursor: &mut HeaderCursor<'_, R>) -> Result<Vec<Reference>> {
    let count = cursor.read_len("reference count")?;
    let mut references = Vec::with_capacity(count.min(1 << 16));
    for _ in 0..count {
        references.push(read_reference(cursor)?);
    }
    Ok(references)
}

/// Read the complete BAM header, returning it with the number of logical
/// bytes consumed.
pub(crate) fn read_header_counted<R: Read>(reader: &mut R) -> Result<(Header, u64)> {
    read_magic(reader)?;
    let mut cursor = HeaderCursor {
        reader,
        offset: BAM_MAGIC.len() as u64,
    };
    let text = read_header_text(&mut cursor)?;
    let references = read_references(&mut cursor)?;

    log::debug!(
        "Parsed BAM header: {} bytes of text, {} references",
        text.len(),
        references.len()
    );

    Ok((Header::new(text, references), cursor.offset))
}

/// Read complete BAM header.
///
/// # Errors
///
/// - [`BamError::NotABamFile`] if the magic bytes are absent
/// - [`BamError::CorruptHeader`] on any short read or invalid field
///
/// # Example
///
/// ```
/// use bamread::io::bam::header::read_header;
///
/// let mut data = b"BAM\x01".to_vec();
/// data.extend_from_slice(&0i32.to_le_bytes()); // no text
/// data.extend_from_slice(&1i32.to_le_bytes()); // one reference
/// data.extend_from_slice(&5i32.to_le_bytes());
/// data.extend_from_slice(b"chr1\0");
/// data.extend_from_slice(&1000i32.to_le_bytes());
///
/// let header = read_header(&mut data.as_slice()).unwrap();
/// assert_eq!(header.reference_name(0), Some("chr1"));
/// ```
pub fn read_header<R: Read>(reader: &mut R) -> Result<Header> {
    read_header_counted(reader).map(|(header, _)| header)
}
