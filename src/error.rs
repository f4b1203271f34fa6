//! Error types for bamread

use std::io;
use thiserror::Error;

/// Result type alias for bamread operations
pub type Result<T> = std::result::Result<T, BamError>;

/// Errors that terminate a decode call.
///
/// Every structural failure is terminal: a damaged block or record shifts
/// every later offset in the stream, so no partial result is returned.
#[derive(Debug, Error)]
pub enum BamError {
    /// I/O error from the underlying byte source
    #[error("I/O error: {0}")]
    Io(io::Error),

    /// The logical stream does not start with the BAM magic bytes
    #[error("Not a BAM file: expected magic [BAM\\x01], found {found:?}")]
    NotABamFile {
        /// The bytes found where the magic was expected
        found: Vec<u8>,
    },

    /// Short or inconsistent header
    #[error("Corrupt BAM header at offset {offset}: {message}")]
    CorruptHeader {
        /// Logical stream offset where the problem was detected
        offset: u64,
        /// Description of the problem
        message: String,
    },

    /// A compressed block failed to decompress or did not match its declared size
    #[error("Corrupt BGZF stream at compressed offset {offset}: {message}")]
    CorruptStream {
        /// Compressed file offset of the offending block
        offset: u64,
        /// Description of the problem
        message: String,
    },

    /// The stream ended in the middle of a block or record
    #[error("Unexpected end of stream at offset {offset} while reading {context}")]
    UnexpectedEnd {
        /// Offset where more data was expected
        offset: u64,
        /// What was being read
        context: String,
    },

    /// A record's internal field lengths are inconsistent with its declared length
    #[error("Malformed record at offset {offset}: {message}")]
    MalformedRecord {
        /// Logical stream offset of the offending field
        offset: u64,
        /// Description of the problem
        message: String,
    },
}

impl BamError {
    pub(crate) fn corrupt_header(offset: u64, message: impl Into<String>) -> Self {
        Self::CorruptHeader {
            offset,
            message: message.into(),
        }
    }

    pub(crate) fn corrupt_stream(offset: u64, message: impl Into<String>) -> Self {
        Self::CorruptStream {
            offset,
            message: message.into(),
        }
    }

    pub(crate) fn unexpected_end(offset: u64, context: impl Into<String>) -> Self {
        Self::UnexpectedEnd {
            offset,
            context: context.into(),
        }
    }

    pub(crate) fn malformed(offset: u64, message: impl Into<String>) -> Self {
        Self::MalformedRecord {
            offset,
            message: message.into(),
        }
    }

    /// Short name of the error kind, stable across messages.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Self::Io(_) => "Io",
            Self::NotABamFile { .. } => "NotABamFile",
            Self::CorruptHeader { .. } => "CorruptHeader",
            Self::CorruptStream { .. } => "CorruptStream",
            Self::UnexpectedEnd { .. } => "UnexpectedEnd",
            Self::MalformedRecord { .. } => "MalformedRecord",
        }
    }
}

/// Unwraps a `BamError` that travelled through an `io::Error` (for example
/// out of [`BgzfReader`](crate::io::BgzfReader)'s `Read` impl).
impl From<io::Error> for BamError {
    fn from(e: io::Error) -> Self {
        if !e.get_ref().is_some_and(|inner| inner.is::<BamError>()) {
            return Self::Io(e);
        }
        let kind = e.kind();
        match e.into_inner().map(|inner| inner.downcast::<BamError>()) {
            Some(Ok(bam)) => *bam,
            Some(Err(inner)) => Self::Io(io::Error::new(kind, inner)),
            None => Self::Io(kind.into()),
        }
    }
}

impl From<BamError> for io::Error {
    fn from(e: BamError) -> Self {
        match e {
            BamError::Io(io_err) => io_err,
            other @ BamError::UnexpectedEnd { .. } => {
                io::Error::new(io::ErrorKind::UnexpectedEof, other)
            }
            other => io::Error::new(io::ErrorKind::InvalidData, other),
        }
    }
}
