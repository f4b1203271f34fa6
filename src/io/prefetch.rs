//! Background block decompression with one block of look-ahead.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────┐    ┌────────────────────┐    ┌──────────────────┐
//! │  BlockDecompressor   │───>│ bounded channel(1) │───>│  record decoder  │
//! │  (background thread) │    │                    │    │  (caller thread) │
//! └──────────────────────┘    └────────────────────┘    └──────────────────┘
//! ```
//!
//! The producer is the only sender, so blocks arrive in file order. Once one
//! inflated block is waiting in the channel the producer blocks on `send`
//! until the consumer takes it. An error ends production and is delivered in
//! order after every block that preceded it.

use crate::error::{BamError, Result};
use crate::io::bgzf::{Block, BlockDecompressor, BlockSource};
use crossbeam_channel::{bounded, Receiver};
use std::io::{self, Read};
use std::thread::{self, JoinHandle};

/// Inflated blocks buffered ahead of the consumer.
pub const PREFETCH_DEPTH: usize = 1;

/// [`BlockSource`] that inflates blocks on a background thread.
pub struct PrefetchedBlocks {
    /// Option so the channel can be closed before joining
    receiver: Option<Receiver<Result<Block>>>,
    handle: Option<JoinHandle<()>>,
}

impl PrefetchedBlocks {
    /// Start decompressing `inner` on a background thread.
    pub fn spawn<R: Read + Send + 'static>(inner: R) -> Result<Self> {
        Self::from_decompressor(BlockDecompressor::new(inner))
    }

    /// Move a configured decompressor onto a background thread.
    pub fn from_decompressor<R: Read + Send + 'static>(
        mut decompressor: BlockDecompressor<R>,
    ) -> Result<Self> {
        let (tx, rx) = bounded(PREFETCH_DEPTH);

        let handle = thread::Builder::new()
            .name("bgzf-prefetch".to_string())
            .spawn(move || loop {
                match decompressor.next_block() {
                    Ok(Some(block)) => {
                        if tx.send(Ok(block)).is_err() {
                            // Consumer went away
                            break;
                        }
                    }
                    Ok(None) => break,
                    Err(e) => {
                        let _ = tx.send(Err(e));
                        break;
                    }
                }
            })?;

        Ok(Self {
            receiver: Some(rx),
            handle: Some(handle),
        })
    }

    /// Close the channel and wait for the producer.
    fn shutdown(&mut self) -> Result<()> {
        drop(self.receiver.take());
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                return Err(BamError::Io(io::Error::new(
                    io::ErrorKind::Other,
                    "BGZF prefetch thread panicked",
                )));
            }
        }
        Ok(())
    }
}

impl BlockSource for PrefetchedBlocks {
    fn next_block(&mut self) -> Result<Option<Block>> {
        let Some(receiver) = self.receiver.as_ref() else {
            return Ok(None);
        };

        match receiver.recv() {
            Ok(Ok(block)) => Ok(Some(block)),
            Ok(Err(e)) => {
                self.shutdown()?;
                Err(e)
            }
            // Sender dropped: the producer finished cleanly or panicked
            Err(_) => {
                self.shutdown()?;
                Ok(None)
            }
        }
    }
}

impl Drop for PrefetchedBlocks {
    fn drop(&mut self) {
        // Closing the receiver unblocks a producer waiting on a full channel.
        let _ = self.shutdown();
    }
}
