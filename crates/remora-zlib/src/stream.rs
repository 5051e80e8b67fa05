use std::fmt;
use std::io::{self, Read, Write};

use remora_pool::BufferPool;
use serde::{Deserialize, Serialize};

use crate::config::{ChecksumOrder, ZlibConfig};
use crate::decoder::ZlibDecoder;
use crate::encoder::ZlibEncoder;
use crate::error::{ZlibError, ZlibResult};

/// Direction a [`ZlibStream`] moves bytes in.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompressionMode {
    Compress,
    Decompress,
}

impl fmt::Display for CompressionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Compress => write!(f, "compress"),
            Self::Decompress => write!(f, "decompress"),
        }
    }
}

/// A zlib stream over a duplex inner stream, bound to one mode at creation.
///
/// Reading a compress-mode stream or writing a decompress-mode stream fails
/// with [`ZlibError::WrongMode`]. Use [`ZlibEncoder`] or [`ZlibDecoder`]
/// directly when the inner stream only goes one way.
#[derive(Debug)]
pub enum ZlibStream<S: Read + Write> {
    Compress(ZlibEncoder<S>),
    Decompress(ZlibDecoder<S>),
}

impl<S: Read + Write> ZlibStream<S> {
    /// Open a stream in `mode`. Compress mode writes the header immediately.
    pub fn new(inner: S, mode: CompressionMode, config: ZlibConfig) -> ZlibResult<Self> {
        Self::open(inner, mode, config, None)
    }

    pub fn compress(inner: S) -> ZlibResult<Self> {
        Self::new(inner, CompressionMode::Compress, ZlibConfig::default())
    }

    pub fn decompress(inner: S) -> ZlibResult<Self> {
        Self::new(inner, CompressionMode::Decompress, ZlibConfig::default())
    }

    fn open(
        inner: S,
        mode: CompressionMode,
        config: ZlibConfig,
        pool: Option<&BufferPool>,
    ) -> ZlibResult<Self> {
        match mode {
            CompressionMode::Compress => ZlibEncoder::open(inner, config, pool).map(Self::Compress),
            CompressionMode::Decompress => {
                ZlibDecoder::open(inner, config, pool).map(Self::Decompress)
            }
        }
    }

    pub fn mode(&self) -> CompressionMode {
        match self {
            Self::Compress(_) => CompressionMode::Compress,
            Self::Decompress(_) => CompressionMode::Decompress,
        }
    }

    /// Tear the stream down. Compress mode finishes the deflate payload and
    /// writes the trailer first. Only the first call has any effect.
    pub fn close(&mut self) -> ZlibResult<()> {
        match self {
            Self::Compress(encoder) => encoder.close(),
            Self::Decompress(decoder) => {
                decoder.close();
                Ok(())
            }
        }
    }

    /// Close the stream and return the inner stream if `leave_open` is set.
    pub fn finish(self) -> ZlibResult<Option<S>> {
        match self {
            Self::Compress(encoder) => encoder.finish(),
            Self::Decompress(decoder) => Ok(decoder.finish()),
        }
    }

    /// Running Adler-32 of the uncompressed bytes written or read so far.
    pub fn checksum(&self) -> u32 {
        match self {
            Self::Compress(encoder) => encoder.checksum(),
            Self::Decompress(decoder) => decoder.checksum(),
        }
    }

    pub fn is_closed(&self) -> bool {
        match self {
            Self::Compress(encoder) => encoder.is_closed(),
            Self::Decompress(decoder) => decoder.is_closed(),
        }
    }

    pub fn get_ref(&self) -> Option<&S> {
        match self {
            Self::Compress(encoder) => encoder.get_ref(),
            Self::Decompress(decoder) => decoder.get_ref(),
        }
    }

    pub fn config(&self) -> &ZlibConfig {
        match self {
            Self::Compress(encoder) => encoder.config(),
            Self::Decompress(decoder) => decoder.config(),
        }
    }
}

fn wrong_mode(operation: &'static str, mode: CompressionMode) -> io::Error {
    ZlibError::WrongMode { operation, mode }.into()
}

impl<S: Read + Write> Read for ZlibStream<S> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self {
            Self::Decompress(decoder) => decoder.read(buf),
            Self::Compress(_) => Err(wrong_mode("read", CompressionMode::Compress)),
        }
    }
}

impl<S: Read + Write> Write for ZlibStream<S> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self {
            Self::Compress(encoder) => encoder.write(buf),
            Self::Decompress(_) => Err(wrong_mode("write", CompressionMode::Decompress)),
        }
    }

    /// Decompress mode holds no pending output, so flushing it is a no-op.
    fn flush(&mut self) -> io::Result<()> {
        match self {
            Self::Compress(encoder) => encoder.flush(),
            Self::Decompress(_) => Ok(()),
        }
    }
}

/// Builder for encoders, decoders and duplex streams sharing one
/// configuration and, optionally, one scratch buffer pool.
///
/// ```ignore
/// let pool = BufferPool::default();
/// let builder = ZlibStreamBuilder::new().level(9).buffer_pool(&pool);
/// let mut encoder = builder.encoder(Vec::new())?;
/// ```
#[derive(Clone, Debug, Default)]
pub struct ZlibStreamBuilder {
    config: ZlibConfig,
    pool: Option<BufferPool>,
}

impl ZlibStreamBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the whole configuration.
    pub fn config(mut self, config: ZlibConfig) -> Self {
        self.config = config;
        self
    }

    pub fn level(mut self, level: u32) -> Self {
        self.config.level = level;
        self
    }

    pub fn leave_open(mut self, leave_open: bool) -> Self {
        self.config.leave_open = leave_open;
        self
    }

    pub fn checksum_order(mut self, order: ChecksumOrder) -> Self {
        self.config.checksum_order = order;
        self
    }

    /// Lease scratch buffers from `pool` instead of allocating them.
    pub fn buffer_pool(mut self, pool: &BufferPool) -> Self {
        self.pool = Some(pool.clone());
        self
    }

    pub fn encoder<W: Write>(&self, inner: W) -> ZlibResult<ZlibEncoder<W>> {
        ZlibEncoder::open(inner, self.config.clone(), self.pool.as_ref())
    }

    pub fn decoder<R: Read>(&self, inner: R) -> ZlibResult<ZlibDecoder<R>> {
        ZlibDecoder::open(inner, self.config.clone(), self.pool.as_ref())
    }

    pub fn open<S: Read + Write>(&self, inner: S, mode: CompressionMode) -> ZlibResult<ZlibStream<S>> {
        ZlibStream::open(inner, mode, self.config.clone(), self.pool.as_ref())
    }

    pub fn get_config(&self) -> &ZlibConfig {
        &self.config
    }
}
