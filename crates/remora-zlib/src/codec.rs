//! Raw deflate engines driven through caller-supplied buffers.
//!
//! Both engines run flate2 without its own zlib framing; header and trailer
//! bytes are handled by the encoder and decoder in this crate.

use std::io::Write;

use flate2::{Compress, Compression, Decompress, FlushCompress, FlushDecompress, Status};
use remora_pool::{BufferPool, Lease};

use crate::error::{ZlibError, ZlibResult};

/// Streaming raw-deflate compressor.
pub struct RawDeflater {
    engine: Compress,
}

impl RawDeflater {
    pub fn new(level: Compression) -> Self {
        Self {
            engine: Compress::new(level, false),
        }
    }

    /// Compress all of `input`, pushing produced bytes to `sink` via `scratch`.
    pub fn write_to<W: Write>(
        &mut self,
        input: &[u8],
        scratch: &mut [u8],
        sink: &mut W,
    ) -> ZlibResult<()> {
        let mut consumed = 0;
        while consumed < input.len() {
            let (read, written, _) = self.step(&input[consumed..], scratch, FlushCompress::None)?;
            sink.write_all(&scratch[..written])?;
            if read == 0 && written == 0 {
                return Err(ZlibError::Compress("deflate engine made no progress".into()));
            }
            consumed += read;
        }
        Ok(())
    }

    /// Emit everything compressed so far on a byte boundary.
    pub fn sync_to<W: Write>(&mut self, scratch: &mut [u8], sink: &mut W) -> ZlibResult<()> {
        let (_, written, _) = self.step(&[], scratch, FlushCompress::Sync)?;
        sink.write_all(&scratch[..written])?;
        loop {
            let (_, written, _) = self.step(&[], scratch, FlushCompress::None)?;
            if written == 0 {
                return Ok(());
            }
            sink.write_all(&scratch[..written])?;
        }
    }

    /// Terminate the deflate stream, pushing the final blocks to `sink`.
    pub fn finish_to<W: Write>(&mut self, scratch: &mut [u8], sink: &mut W) -> ZlibResult<()> {
        loop {
            let (_, written, done) = self.step(&[], scratch, FlushCompress::Finish)?;
            sink.write_all(&scratch[..written])?;
            if done {
                return Ok(());
            }
            if written == 0 {
                return Err(ZlibError::Compress("deflate engine stalled while finishing".into()));
            }
        }
    }

    pub fn total_in(&self) -> u64 {
        self.engine.total_in()
    }

    pub fn total_out(&self) -> u64 {
        self.engine.total_out()
    }

    fn step(
        &mut self,
        input: &[u8],
        output: &mut [u8],
        flush: FlushCompress,
    ) -> ZlibResult<(usize, usize, bool)> {
        let before_in = self.engine.total_in();
        let before_out = self.engine.total_out();
        let status = self
            .engine
            .compress(input, output, flush)
            .map_err(|e| ZlibError::Compress(e.to_string()))?;
        let read = (self.engine.total_in() - before_in) as usize;
        let written = (self.engine.total_out() - before_out) as usize;
        Ok((read, written, matches!(status, Status::StreamEnd)))
    }
}

/// Progress made by one [`RawInflater::inflate`] call.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct InflateStep {
    pub consumed: usize,
    pub produced: usize,
    /// The final deflate block has been decoded.
    pub done: bool,
}

/// Streaming raw-deflate decompressor.
pub struct RawInflater {
    engine: Decompress,
}

impl RawInflater {
    pub fn new() -> Self {
        Self {
            engine: Decompress::new(false),
        }
    }

    /// Decode as much of `input` into `output` as fits.
    ///
    /// A step that neither consumes nor produces means the engine needs more
    /// input than `input` holds.
    pub fn inflate(&mut self, input: &[u8], output: &mut [u8]) -> ZlibResult<InflateStep> {
        let before_in = self.engine.total_in();
        let before_out = self.engine.total_out();
        let status = self
            .engine
            .decompress(input, output, FlushDecompress::None)
            .map_err(|e| ZlibError::Decompress(e.to_string()))?;
        Ok(InflateStep {
            consumed: (self.engine.total_in() - before_in) as usize,
            produced: (self.engine.total_out() - before_out) as usize,
            done: matches!(status, Status::StreamEnd),
        })
    }

    pub fn total_in(&self) -> u64 {
        self.engine.total_in()
    }

    pub fn total_out(&self) -> u64 {
        self.engine.total_out()
    }
}

impl Default for RawInflater {
    fn default() -> Self {
        Self::new()
    }
}

/// I/O buffer owned by an encoder or decoder, optionally borrowed from a pool.
pub(crate) enum Scratch {
    Owned(Vec<u8>),
    Pooled(Lease<Vec<u8>>),
}

impl Scratch {
    pub(crate) fn acquire(size: usize, pool: Option<&BufferPool>) -> ZlibResult<Self> {
        match pool {
            Some(pool) => Ok(Self::Pooled(pool.lease()?)),
            None => Ok(Self::Owned(vec![0u8; size])),
        }
    }

    pub(crate) fn as_slice(&self) -> &[u8] {
        match self {
            Self::Owned(buf) => buf.as_slice(),
            Self::Pooled(lease) => lease.as_slice(),
        }
    }

    pub(crate) fn as_mut_slice(&mut self) -> &mut [u8] {
        match self {
            Self::Owned(buf) => buf.as_mut_slice(),
            Self::Pooled(lease) => lease.as_mut_slice(),
        }
    }

    pub(crate) fn is_pooled(&self) -> bool {
        matches!(self, Self::Pooled(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Read;

    #[test]
    fn raw_deflate_is_readable_by_flate2() {
        let input = b"raw deflate, no framing, no framing, no framing".repeat(20);
        let mut deflater = RawDeflater::new(Compression::default());
        let mut scratch = vec![0u8; 64];
        let mut out = Vec::new();
        deflater.write_to(&input, &mut scratch, &mut out).unwrap();
        deflater.finish_to(&mut scratch, &mut out).unwrap();
        assert_eq!(deflater.total_in(), input.len() as u64);
        assert_eq!(deflater.total_out(), out.len() as u64);

        let mut decoded = Vec::new();
        flate2::read::DeflateDecoder::new(&out[..])
            .read_to_end(&mut decoded)
            .unwrap();
        assert_eq!(decoded, input);
    }

    #[test]
    fn sync_flush_makes_prefix_decodable() {
        let mut deflater = RawDeflater::new(Compression::fast());
        let mut scratch = vec![0u8; 32];
        let mut out = Vec::new();
        deflater.write_to(b"flushed prefix", &mut scratch, &mut out).unwrap();
        deflater.sync_to(&mut scratch, &mut out).unwrap();

        let mut inflater = RawInflater::new();
        let mut decoded = vec![0u8; 64];
        let step = inflater.inflate(&out, &mut decoded).unwrap();
        assert_eq!(&decoded[..step.produced], b"flushed prefix");
        assert!(!step.done);
    }

    #[test]
    fn inflate_reports_stream_end() {
        let mut encoder =
            flate2::write::DeflateEncoder::new(Vec::new(), flate2::Compression::default());
        encoder.write_all(b"end of stream").unwrap();
        let compressed = encoder.finish().unwrap();

        let mut inflater = RawInflater::new();
        let mut out = vec![0u8; 64];
        let step = inflater.inflate(&compressed, &mut out).unwrap();
        assert!(step.done);
        assert_eq!(step.consumed, compressed.len());
        assert_eq!(&out[..step.produced], b"end of stream");
    }

    #[test]
    fn inflate_rejects_garbage() {
        let mut inflater = RawInflater::new();
        let mut out = vec![0u8; 64];
        let err = inflater.inflate(&[0xff; 16], &mut out).unwrap_err();
        assert!(matches!(err, ZlibError::Decompress(_)));
    }

    #[test]
    fn pooled_scratch_uses_pool_buffer_size() {
        let pool = BufferPool::new(remora_pool::BufferPoolConfig::new(1, 1, 128)).unwrap();
        let scratch = Scratch::acquire(16, Some(&pool)).unwrap();
        assert!(scratch.is_pooled());
        assert_eq!(scratch.as_slice().len(), 128);
        drop(scratch);
        assert_eq!(pool.len().unwrap(), 1);

        let owned = Scratch::acquire(16, None).unwrap();
        assert!(!owned.is_pooled());
        assert_eq!(owned.as_slice().len(), 16);
    }
}
