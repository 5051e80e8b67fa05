use std::io::{self, Read};

use remora_pool::BufferPool;
use tracing::debug;

use crate::adler32::Adler32;
use crate::codec::{RawInflater, Scratch};
use crate::config::ZlibConfig;
use crate::error::{ZlibError, ZlibResult};
use crate::header::ZlibHeader;

/// Decompress-mode zlib stream.
///
/// The first read consumes exactly two header bytes straight from the inner
/// stream, however the inner stream splits them. Premature end of input is
/// reported as [`ZlibError::TruncatedHeader`]; the header is validated unless
/// `verify_header` is off, in which case any two bytes are discarded.
///
/// Compressed input is pulled through a scratch buffer, so the decoder may
/// read past the end of the zlib stream. When the final deflate block has
/// been decoded the 4-byte trailer is compared with the Adler-32 of the
/// produced bytes unless `verify_checksum` is off.
pub struct ZlibDecoder<R> {
    inner: Option<R>,
    retained: Option<R>,
    inflater: RawInflater,
    checksum: Adler32,
    scratch: Scratch,
    /// Unconsumed input is `scratch[pos..filled]`.
    pos: usize,
    filled: usize,
    /// Set once the header has been read and accepted.
    header: Option<ZlibHeader>,
    /// Raw header bytes and how many of them arrived. Kept so that a rejected
    /// header is rejected again on every later read.
    raw_header: Option<([u8; 2], usize)>,
    inner_eof: bool,
    finished: bool,
    config: ZlibConfig,
}

impl<R: Read> ZlibDecoder<R> {
    pub fn new(inner: R, config: ZlibConfig) -> ZlibResult<Self> {
        Self::open(inner, config, None)
    }

    /// Create a decoder whose scratch buffer is leased from `pool`.
    pub fn with_buffer_pool(inner: R, config: ZlibConfig, pool: &BufferPool) -> ZlibResult<Self> {
        Self::open(inner, config, Some(pool))
    }

    pub(crate) fn open(inner: R, config: ZlibConfig, pool: Option<&BufferPool>) -> ZlibResult<Self> {
        config.validate()?;
        let scratch = Scratch::acquire(config.buffer_size, pool)?;
        debug!(pooled = scratch.is_pooled(), "zlib decoder opened");
        Ok(Self {
            inner: Some(inner),
            retained: None,
            inflater: RawInflater::new(),
            checksum: Adler32::new(),
            scratch,
            pos: 0,
            filled: 0,
            header: None,
            raw_header: None,
            inner_eof: false,
            finished: false,
            config,
        })
    }

    /// Decompress into `out`, returning the number of bytes produced.
    ///
    /// Returns `Ok(0)` once the stream has ended.
    pub fn read_bytes(&mut self, out: &mut [u8]) -> ZlibResult<usize> {
        if self.inner.is_none() {
            return Err(ZlibError::Closed);
        }
        if self.header.is_none() {
            self.header = Some(self.consume_header()?);
        }
        if self.finished || out.is_empty() {
            return Ok(0);
        }

        loop {
            if self.pos == self.filled && !self.inner_eof {
                self.fill()?;
            }

            let input = &self.scratch.as_slice()[self.pos..self.filled];
            let step = self.inflater.inflate(input, out)?;
            self.pos += step.consumed;
            self.checksum.update(&out[..step.produced]);

            if step.done {
                self.finished = true;
                debug!(
                    total_in = self.inflater.total_in(),
                    total_out = self.inflater.total_out(),
                    "deflate payload complete"
                );
                self.check_trailer()?;
                return Ok(step.produced);
            }
            if step.produced > 0 {
                return Ok(step.produced);
            }
            if step.consumed == 0 {
                if self.inner_eof {
                    return Err(ZlibError::TruncatedPayload);
                }
                if self.pos < self.filled {
                    return Err(ZlibError::Decompress(
                        "inflate engine made no progress".into(),
                    ));
                }
            }
        }
    }

    /// Release the inner stream. Further reads fail with [`ZlibError::Closed`].
    pub fn close(&mut self) {
        if let Some(inner) = self.inner.take() {
            debug!(finished = self.finished, "zlib decoder closed");
            if self.config.leave_open {
                self.retained = Some(inner);
            }
        }
    }

    /// Close the decoder and return the inner stream if `leave_open` is set.
    pub fn finish(mut self) -> Option<R> {
        self.close();
        self.retained.take()
    }

    /// Header read from the input, once the first read has happened.
    pub fn header(&self) -> Option<ZlibHeader> {
        self.header
    }

    /// Adler-32 of every byte produced so far.
    pub fn checksum(&self) -> u32 {
        self.checksum.checksum()
    }

    /// Returns `true` once the final deflate block has been decoded.
    pub fn is_finished(&self) -> bool {
        self.finished
    }

    pub fn is_closed(&self) -> bool {
        self.inner.is_none()
    }

    pub fn total_out(&self) -> u64 {
        self.inflater.total_out()
    }

    pub fn get_ref(&self) -> Option<&R> {
        self.inner.as_ref().or(self.retained.as_ref())
    }

    pub fn config(&self) -> &ZlibConfig {
        &self.config
    }

    /// Read the two header bytes on first use, then check them. The bytes are
    /// read from the inner stream at most once.
    fn consume_header(&mut self) -> ZlibResult<ZlibHeader> {
        let (bytes, got) = match self.raw_header {
            Some(raw) => raw,
            None => {
                let inner = self.inner.as_mut().ok_or(ZlibError::Closed)?;
                let mut bytes = [0u8; 2];
                let got = read_full(inner, &mut bytes)?;
                self.raw_header = Some((bytes, got));
                (bytes, got)
            }
        };
        if got < bytes.len() {
            return Err(ZlibError::TruncatedHeader(got));
        }
        let header = ZlibHeader::from_bytes(bytes);
        if self.config.verify_header {
            header.validate()?;
        }
        debug!(cmf = header.cmf, flg = header.flg, "zlib header consumed");
        Ok(header)
    }

    fn fill(&mut self) -> ZlibResult<()> {
        let inner = self.inner.as_mut().ok_or(ZlibError::Closed)?;
        let n = read_retrying(inner, self.scratch.as_mut_slice())?;
        self.pos = 0;
        self.filled = n;
        if n == 0 {
            self.inner_eof = true;
        }
        Ok(())
    }

    fn check_trailer(&mut self) -> ZlibResult<()> {
        if !self.config.verify_checksum {
            return Ok(());
        }

        let mut trailer = [0u8; 4];
        let buffered = (self.filled - self.pos).min(trailer.len());
        trailer[..buffered].copy_from_slice(&self.scratch.as_slice()[self.pos..self.pos + buffered]);
        self.pos += buffered;

        let mut got = buffered;
        if got < trailer.len() && !self.inner_eof {
            let inner = self.inner.as_mut().ok_or(ZlibError::Closed)?;
            got += read_full(inner, &mut trailer[got..])?;
        }
        if got < trailer.len() {
            return Err(ZlibError::TruncatedTrailer(got));
        }

        let stored = self.config.checksum_order.decode(trailer);
        let computed = self.checksum.checksum();
        if stored != computed {
            return Err(ZlibError::ChecksumMismatch { stored, computed });
        }
        Ok(())
    }
}

impl<R: Read> Read for ZlibDecoder<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.read_bytes(buf).map_err(Into::into)
    }
}

impl<R> std::fmt::Debug for ZlibDecoder<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ZlibDecoder")
            .field("header", &self.header)
            .field("checksum", &format_args!("{:#010x}", self.checksum.checksum()))
            .field("finished", &self.finished)
            .field("closed", &self.inner.is_none())
            .finish()
    }
}

/// Single read, retried on `Interrupted`.
fn read_retrying<R: Read>(reader: &mut R, buf: &mut [u8]) -> io::Result<usize> {
    loop {
        match reader.read(buf) {
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            other => return other,
        }
    }
}

/// Read until `buf` is full or the reader is exhausted. Returns bytes read.
fn read_full<R: Read>(reader: &mut R, buf: &mut [u8]) -> io::Result<usize> {
    let mut got = 0;
    while got < buf.len() {
        match read_retrying(reader, &mut buf[got..])? {
            0 => break,
            n => got += n,
        }
    }
    Ok(got)
}
