//! I/O module: BGZF block stream and BAM binary decoding
//!
//! The compressed input is consumed strictly forward, one block at a time,
//! so memory stays bounded by one block plus one record regardless of file
//! size.

pub mod bam;
pub mod bgzf;
pub mod prefetch;

pub use bgzf::{BgzfReader, Block, BlockDecompressor, BlockSource};
pub use prefetch::PrefetchedBlocks;

use std::io::{self, Read};

/// Read until `buf` is full or the source is exhausted.
///
/// Returns the number of bytes read. Unlike `read_exact`, a short count is
/// reported rather than turned into an error, so callers can tell a clean
/// end (zero bytes) from a truncation (some bytes).
pub(crate) fn read_full<R: Read + ?Sized>(reader: &mut R, buf: &mut [u8]) -> io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
            Err(e) => return Err(e),
        }
    }
    Ok(filled)
}
