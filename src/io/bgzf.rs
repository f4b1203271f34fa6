//! BGZF block decompression.
//!
//! A BAM file is a series of BGZF blocks. Each block is a complete gzip
//! member whose extra field carries the total block size, so blocks can be
//! framed without inflating them. Concatenating the inflated payloads gives
//! the logical BAM byte stream.
//!
//! # Block Structure
//!
//! ```text
//! - Bytes 0-1:   gzip magic (31, 139)
//! - Byte  2:     CM = 8 (deflate)
//! - Byte  3:     FLG, FEXTRA (0x04) must be set
//! - Bytes 4-9:   MTIME, XFL, OS
//! - Bytes 10-11: XLEN (extra field length)
//! - XLEN bytes:  subfields; SI1='B', SI2='C', SLEN=2, BSIZE (u16) = block size - 1
//! - ...:         raw deflate data
//! - 4 bytes:     CRC32 of the inflated payload
//! - 4 bytes:     ISIZE, inflated payload length
//! ```
//!
//! The end-of-file marker is a block with an empty payload (28 bytes total).
//!
//! # Streaming
//!
//! [`BlockDecompressor`] reads and inflates one block at a time, so at most
//! one compressed and one inflated block are resident. [`BgzfReader`] turns
//! any [`BlockSource`] into a `BufRead` over the logical stream.

use crate::error::{BamError, Result};
use crate::io::read_full;
use flate2::read::DeflateDecoder;
use std::io::{self, BufRead, Read};

/// Fixed gzip header bytes preceding the extra field (through XLEN).
const GZIP_FIXED_HEADER_SIZE: usize = 12;

/// CRC32 + ISIZE.
const BGZF_FOOTER_SIZE: usize = 8;

/// Upper bound on an inflated BGZF payload.
pub const MAX_BLOCK_SIZE: usize = 64 * 1024;

/// One inflated BGZF block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Block {
    /// Offset of the block's first byte in the compressed file
    compressed_offset: u64,
    /// Inflated payload
    data: Vec<u8>,
}

impl Block {
    /// Create a block from its compressed offset and inflated payload.
    pub fn new(compressed_offset: u64, data: Vec<u8>) -> Self {
        Self {
            compressed_offset,
            data,
        }
    }

    /// Offset of this block in the compressed file.
    pub fn compressed_offset(&self) -> u64 {
        self.compressed_offset
    }

    /// Inflated payload.
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Take ownership of the inflated payload.
    pub fn into_data(self) -> Vec<u8> {
        self.data
    }

    /// Payload length in bytes.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Whether the payload is empty.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

/// A source of inflated blocks, delivered strictly in file order.
///
/// Returns `Ok(None)` once the stream has cleanly ended. After an error or
/// `Ok(None)` the source must not be polled again.
pub trait BlockSource {
    /// Produce the next non-empty inflated block.
    fn next_block(&mut self) -> Result<Option<Block>>;
}

impl<S: BlockSource + ?Sized> BlockSource for Box<S> {
    fn next_block(&mut self) -> Result<Option<Block>> {
        (**self).next_block()
    }
}

/// Sequential BGZF block reader and inflater.
///
/// Empty blocks (including the end-of-file marker) are consumed silently.
/// The sequence ends when the source is exhausted right after an empty block.
/// Running out of bytes anywhere else, including on a block boundary with no
/// end-of-file marker, is [`BamError::UnexpectedEnd`] unless
/// [`allow_missing_eof`](Self::allow_missing_eof) is set. A source with no
/// bytes at all yields no blocks.
pub struct BlockDecompressor<R> {
    inner: R,
    /// Compressed bytes consumed so far
    offset: u64,
    /// Reusable buffer for the extra field and the compressed payload
    compressed: Vec<u8>,
    /// Whether the most recent block was empty (EOF marker)
    last_was_empty: bool,
    /// End cleanly on a block boundary even without an end-of-file marker
    allow_missing_eof: bool,
    done: bool,
}

impl<R: Read> BlockDecompressor<R> {
    /// Wrap a compressed byte source positioned at file start.
    pub fn new(inner: R) -> Self {
        Self {
            inner,
            offset: 0,
            compressed: Vec::with_capacity(MAX_BLOCK_SIZE),
            last_was_empty: false,
            allow_missing_eof: false,
            done: false,
        }
    }

    /// Accept a stream that ends on a block boundary without the
    /// end-of-file marker, logging a warning instead of failing.
    pub fn allow_missing_eof(mut self, allow: bool) -> Self {
        self.allow_missing_eof = allow;
        self
    }

    /// Compressed bytes consumed so far.
    pub fn compressed_offset(&self) -> u64 {
        self.offset
    }

    /// Read exactly `len` bytes into the scratch buffer, or fail with
    /// `UnexpectedEnd` at the offset where the data ran out.
    fn read_scratch(&mut self, len: usize, context: &str) -> Result<()> {
        self.compressed.resize(len, 0);
        let n = read_full(&mut self.inner, &mut self.compressed)?;
        if n < len {
            return Err(BamError::unexpected_end(self.offset + n as u64, context));
        }
        self.offset += len as u64;
        Ok(())
    }

    /// Read and inflate one block, empty or not.
    fn read_block(&mut self) -> Result<Option<Block>> {
        let start = self.offset;

        let mut fixed = [0u8; GZIP_FIXED_HEADER_SIZE];
        let n = read_full(&mut self.inner, &mut fixed)?;
        if n == 0 {
            return Ok(None);
        }
        if n < GZIP_FIXED_HEADER_SIZE {
            return Err(BamError::unexpected_end(
                start + n as u64,
                "BGZF block header",
            ));
        }
        self.offset += GZIP_FIXED_HEADER_SIZE as u64;

        if fixed[0] != 31 || fixed[1] != 139 {
            return Err(BamError::corrupt_stream(
                start,
                format!(
                    "invalid gzip magic: expected [31, 139], got [{}, {}]",
                    fixed[0], fixed[1]
                ),
            ));
        }
        if fixed[2] != 8 {
            return Err(BamError::corrupt_stream(
                start,
                format!("unsupported compression method {}", fixed[2]),
            ));
        }
        if fixed[3] & 0x04 == 0 {
            return Err(BamError::corrupt_stream(
                start,
                "gzip member has no extra field (not BGZF)",
            ));
        }

        let xlen = u16::from_le_bytes([fixed[10], fixed[11]]) as usize;
        self.read_scratch(xlen, "BGZF extra field")?;
        let bsize = find_bsize(&self.compressed).ok_or_else(|| {
            BamError::corrupt_stream(start, "missing BC subfield (not BGZF)")
        })?;

        let block_size = bsize as usize + 1;
        let already_read = GZIP_FIXED_HEADER_SIZE + xlen;
        if block_size < already_read + BGZF_FOOTER_SIZE {
            return Err(BamError::corrupt_stream(
                start,
                format!(
                    "declared block size {} is smaller than its header and footer ({})",
                    block_size,
                    already_read + BGZF_FOOTER_SIZE
                ),
            ));
        }

        self.read_scratch(block_size - already_read, "BGZF block body")?;

        let footer_at = self.compressed.len() - BGZF_FOOTER_SIZE;
        let footer = &self.compressed[footer_at..];
        let expected_crc = u32::from_le_bytes([footer[0], footer[1], footer[2], footer[3]]);
        let expected_len =
            u32::from_le_bytes([footer[4], footer[5], footer[6], footer[7]]) as usize;

        let data = inflate(&self.compressed[..footer_at], expected_len, start)?;

        let crc = crc32fast::hash(&data);
        if crc != expected_crc {
            return Err(BamError::corrupt_stream(
                start,
                format!(
                    "CRC32 mismatch: declared {:#010x}, computed {:#010x}",
                    expected_crc, crc
                ),
            ));
        }

        Ok(Some(Block::new(start, data)))
    }
}

/// Locate the BSIZE value among the gzip extra subfields.
fn find_bsize(extra: &[u8]) -> Option<u16> {
    let mut pos = 0;
    while pos + 4 <= extra.len() {
        let si1 = extra[pos];
        let si2 = extra[pos + 1];
        let slen = u16::from_le_bytes([extra[pos + 2], extra[pos + 3]]) as usize;

        if si1 == b'B' && si2 == b'C' && slen == 2 {
            if pos + 6 > extra.len() {
                return None;
            }
            return Some(u16::from_le_bytes([extra[pos + 4], extra[pos + 5]]));
        }

        pos += 4 + slen;
    }
    None
}

/// Inflate a raw deflate payload and check it against the declared size.
fn inflate(compressed: &[u8], expected_len: usize, block_offset: u64) -> Result<Vec<u8>> {
    if expected_len > MAX_BLOCK_SIZE {
        return Err(BamError::corrupt_stream(
            block_offset,
            format!(
                "declared uncompressed size {} exceeds BGZF maximum {}",
                expected_len, MAX_BLOCK_SIZE
            ),
        ));
    }

    let mut data = Vec::with_capacity(expected_len);
    // One byte past the maximum is enough to detect an oversized payload.
    let mut decoder = DeflateDecoder::new(compressed).take(MAX_BLOCK_SIZE as u64 + 1);
    decoder.read_to_end(&mut data).map_err(|e| {
        BamError::corrupt_stream(block_offset, format!("deflate error: {}", e))
    })?;

    if data.len() != expected_len {
        return Err(BamError::corrupt_stream(
            block_offset,
            format!(
                "size mismatch: declared {} bytes, inflated {}",
                expected_len,
                data.len()
            ),
        ));
    }

    Ok(data)
}

impl<R: Read> BlockSource for BlockDecompressor<R> {
    fn next_block(&mut self) -> Result<Option<Block>> {
        while !self.done {
            match self.read_block()? {
                Some(block) if block.is_empty() => {
                    if self.last_was_empty {
                        log::debug!(
                            "Skipping repeated empty BGZF block at offset {}",
                            block.compressed_offset()
                        );
                    }
                    self.last_was_empty = true;
                }
                Some(block) => {
                    if self.last_was_empty {
                        log::debug!(
                            "Empty BGZF block followed by data at offset {} (concatenated stream)",
                            block.compressed_offset()
                        );
                    }
                    self.last_was_empty = false;
                    return Ok(Some(block));
                }
                None => {
                    self.done = true;
                    if self.offset > 0 && !self.last_was_empty {
                        if !self.allow_missing_eof {
                            return Err(BamError::unexpected_end(
                                self.offset,
                                "BGZF end-of-file marker",
                            ));
                        }
                        log::warn!(
                            "BGZF stream ended at offset {} without an end-of-file marker",
                            self.offset
                        );
                    }
                }
            }
        }
        Ok(None)
    }
}

impl<R: Read> Iterator for BlockDecompressor<R> {
    type Item = Result<Block>;

    fn next(&mut self) -> Option<Self::Item> {
        match self.next_block() {
            Ok(Some(block)) => Some(Ok(block)),
            Ok(None) => None,
            Err(e) => {
                self.done = true;
                Some(Err(e))
            }
        }
    }
}

/// `BufRead` over the logical (inflated) stream of a [`BlockSource`].
///
/// Typed errors from the block layer travel inside `io::Error` and are
/// recovered by `BamError::from`.
pub struct BgzfReader<S> {
    source: S,
    current: Vec<u8>,
    pos: usize,
    /// Logical bytes consumed so far
    position: u64,
    finished: bool,
}

impl<R: Read> BgzfReader<BlockDecompressor<R>> {
    /// Read BGZF from a compressed byte source, one block at a time.
    pub fn from_reader(inner: R) -> Self {
        Self::new(BlockDecompressor::new(inner))
    }
}

impl<S: BlockSource> BgzfReader<S> {
    /// Wrap a block source.
    pub fn new(source: S) -> Self {
        Self {
            source,
            current: Vec::new(),
            pos: 0,
            position: 0,
            finished: false,
        }
    }

    /// Logical stream offset of the next unread byte.
    pub fn position(&self) -> u64 {
        self.position
    }

    /// Consume the reader, returning the block source.
    pub fn into_inner(self) -> S {
        self.source
    }
}

impl<S: BlockSource> BufRead for BgzfReader<S> {
    fn fill_buf(&mut self) -> io::Result<&[u8]> {
        while self.pos >= self.current.len() && !self.finished {
            match self.source.next_block()? {
                Some(block) => {
                    self.current = block.into_data();
                    self.pos = 0;
                }
                None => self.finished = true,
            }
        }
        Ok(&self.current[self.pos.min(self.current.len())..])
    }

    fn consume(&mut self, amt: usize) {
        let amt = amt.min(self.current.len().saturating_sub(self.pos));
        self.pos += amt;
        self.position += amt as u64;
    }
}

impl<S: BlockSource> Read for BgzfReader<S> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let available = self.fill_buf()?;
        let to_copy = available.len().min(buf.len());
        buf[..to_copy].copy_from_slice(&available[..to_copy]);
        self.consume(to_copy);
        Ok(to_copy)
    }
}
