use std::io;

use remora_pool::PoolError;
use thiserror::Error;

use crate::stream::CompressionMode;

/// Errors produced by zlib framing operations.
#[derive(Debug, Error)]
pub enum ZlibError {
    #[error("I/O error: {0}")]
    Io(#[source] io::Error),

    #[error("{operation} is not supported on a {mode} stream")]
    WrongMode {
        operation: &'static str,
        mode: CompressionMode,
    },

    #[error("zlib stream is closed")]
    Closed,

    #[error("zlib header truncated: expected 2 bytes, got {0}")]
    TruncatedHeader(usize),

    #[error("invalid zlib header {cmf:#04x} {flg:#04x}: {reason}")]
    InvalidHeader {
        cmf: u8,
        flg: u8,
        reason: &'static str,
    },

    #[error("deflate payload ended before the final block")]
    TruncatedPayload,

    #[error("zlib trailer truncated: expected 4 bytes, got {0}")]
    TruncatedTrailer(usize),

    #[error("adler-32 mismatch: stored {stored:#010x}, computed {computed:#010x}")]
    ChecksumMismatch { stored: u32, computed: u32 },

    #[error("compression failed: {0}")]
    Compress(String),

    #[error("decompression failed: {0}")]
    Decompress(String),

    #[error("invalid zlib configuration: {0}")]
    Config(String),

    #[error("scratch buffer unavailable: {0}")]
    Pool(#[from] PoolError),
}

impl ZlibError {
    /// The `io::ErrorKind` this error surfaces as through `Read`/`Write`.
    pub fn kind(&self) -> io::ErrorKind {
        match self {
            Self::Io(e) => e.kind(),
            Self::WrongMode { .. } | Self::Config(_) => io::ErrorKind::InvalidInput,
            Self::Closed => io::ErrorKind::NotConnected,
            Self::TruncatedHeader(_) | Self::TruncatedPayload | Self::TruncatedTrailer(_) => {
                io::ErrorKind::UnexpectedEof
            }
            Self::InvalidHeader { .. } | Self::ChecksumMismatch { .. } | Self::Decompress(_) => {
                io::ErrorKind::InvalidData
            }
            Self::Compress(_) | Self::Pool(_) => io::ErrorKind::Other,
        }
    }

    /// Recover the zlib error carried by an `io::Error` from `Read`/`Write`.
    pub fn from_io(err: &io::Error) -> Option<&ZlibError> {
        err.get_ref()?.downcast_ref::<ZlibError>()
    }

    /// Returns `true` for misuse of the stream (wrong mode or already closed).
    pub fn is_usage(&self) -> bool {
        matches!(self, Self::WrongMode { .. } | Self::Closed)
    }

    /// Returns `true` if the compressed input is malformed or truncated.
    pub fn is_corrupt(&self) -> bool {
        matches!(
            self,
            Self::TruncatedHeader(_)
                | Self::InvalidHeader { .. }
                | Self::TruncatedPayload
                | Self::TruncatedTrailer(_)
                | Self::ChecksumMismatch { .. }
                | Self::Decompress(_)
        )
    }
}

impl From<io::Error> for ZlibError {
    fn from(err: io::Error) -> Self {
        let carries_zlib = err
            .get_ref()
            .map_or(false, |inner| inner.is::<ZlibError>());
        if !carries_zlib {
            return Self::Io(err);
        }
        match err.into_inner().map(|inner| inner.downcast::<ZlibError>()) {
            Some(Ok(inner)) => *inner,
            _ => Self::Io(io::Error::other("zlib error lost while unwrapping")),
        }
    }
}

impl From<ZlibError> for io::Error {
    fn from(err: ZlibError) -> Self {
        match err {
            ZlibError::Io(e) => e,
            other => io::Error::new(other.kind(), other),
        }
    }
}

pub type ZlibResult<T> = Result<T, ZlibError>;
