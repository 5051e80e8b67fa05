use std::io::{self, Write};

use remora_pool::BufferPool;
use tracing::{debug, warn};

use crate::adler32::Adler32;
use crate::codec::{RawDeflater, Scratch};
use crate::config::ZlibConfig;
use crate::error::{ZlibError, ZlibResult};
use crate::header::ZLIB_HEADER;

/// Compress-mode zlib stream.
///
/// Output layout:
/// ```text
/// [0x58][0x85][...deflate payload...][adler-32, 4 bytes]
/// ```
///
/// The header is written when the encoder is created. The trailer is written
/// by [`close`](Self::close) after the deflate stream has been terminated,
/// exactly once; later calls are no-ops. Dropping an encoder that was never
/// closed closes it and logs any failure.
pub struct ZlibEncoder<W: Write> {
    inner: Option<W>,
    retained: Option<W>,
    deflater: RawDeflater,
    checksum: Adler32,
    scratch: Scratch,
    config: ZlibConfig,
}

impl<W: Write> ZlibEncoder<W> {
    /// Create an encoder with its own scratch buffer and write the header.
    pub fn new(inner: W, config: ZlibConfig) -> ZlibResult<Self> {
        Self::open(inner, config, None)
    }

    /// Create an encoder whose scratch buffer is leased from `pool`.
    pub fn with_buffer_pool(inner: W, config: ZlibConfig, pool: &BufferPool) -> ZlibResult<Self> {
        Self::open(inner, config, Some(pool))
    }

    pub(crate) fn open(
        mut inner: W,
        config: ZlibConfig,
        pool: Option<&BufferPool>,
    ) -> ZlibResult<Self> {
        config.validate()?;
        let scratch = Scratch::acquire(config.buffer_size, pool)?;
        inner.write_all(&ZLIB_HEADER)?;
        debug!(
            level = config.level,
            pooled = scratch.is_pooled(),
            "zlib encoder opened"
        );
        Ok(Self {
            inner: Some(inner),
            retained: None,
            deflater: RawDeflater::new(config.compression()),
            checksum: Adler32::new(),
            scratch,
            config,
        })
    }

    /// Compress `data` and fold it into the running checksum.
    pub fn write_bytes(&mut self, data: &[u8]) -> ZlibResult<()> {
        let inner = self.inner.as_mut().ok_or(ZlibError::Closed)?;
        self.deflater
            .write_to(data, self.scratch.as_mut_slice(), inner)?;
        self.checksum.update(data);
        Ok(())
    }

    /// Push everything compressed so far to the inner stream.
    pub fn flush_bytes(&mut self) -> ZlibResult<()> {
        let inner = self.inner.as_mut().ok_or(ZlibError::Closed)?;
        self.deflater
            .sync_to(self.scratch.as_mut_slice(), &mut *inner)?;
        inner.flush()?;
        Ok(())
    }

    /// Terminate the stream and write the checksum trailer.
    ///
    /// The inner stream is dropped afterwards unless `leave_open` is set, in
    /// which case [`finish`](Self::finish) hands it back.
    pub fn close(&mut self) -> ZlibResult<()> {
        let Some(mut inner) = self.inner.take() else {
            return Ok(());
        };
        self.deflater
            .finish_to(self.scratch.as_mut_slice(), &mut inner)?;
        let checksum = self.checksum.checksum();
        inner.write_all(&self.config.checksum_order.encode(checksum))?;
        inner.flush()?;
        debug!(
            checksum,
            total_in = self.deflater.total_in(),
            total_out = self.deflater.total_out(),
            "zlib encoder closed"
        );
        if self.config.leave_open {
            self.retained = Some(inner);
        }
        Ok(())
    }

    /// Close the encoder and return the inner stream if `leave_open` is set.
    pub fn finish(mut self) -> ZlibResult<Option<W>> {
        self.close()?;
        Ok(self.retained.take())
    }

    /// Adler-32 of every byte written so far.
    pub fn checksum(&self) -> u32 {
        self.checksum.checksum()
    }

    /// Uncompressed bytes accepted so far.
    pub fn total_in(&self) -> u64 {
        self.deflater.total_in()
    }

    /// Compressed payload bytes produced so far, excluding header and trailer.
    pub fn total_out(&self) -> u64 {
        self.deflater.total_out()
    }

    pub fn is_closed(&self) -> bool {
        self.inner.is_none()
    }

    pub fn get_ref(&self) -> Option<&W> {
        self.inner.as_ref().or(self.retained.as_ref())
    }

    pub fn get_mut(&mut self) -> Option<&mut W> {
        self.inner.as_mut().or(self.retained.as_mut())
    }

    pub fn config(&self) -> &ZlibConfig {
        &self.config
    }
}

impl<W: Write> Write for ZlibEncoder<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.write_bytes(buf)?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.flush_bytes().map_err(Into::into)
    }
}

impl<W: Write> Drop for ZlibEncoder<W> {
    fn drop(&mut self) {
        if self.inner.is_some() {
            if let Err(e) = self.close() {
                warn!(error = %e, "failed to close zlib encoder on drop");
            }
        }
    }
}

impl<W: Write> std::fmt::Debug for ZlibEncoder<W> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ZlibEncoder")
            .field("checksum", &format_args!("{:#010x}", self.checksum()))
            .field("total_in", &self.total_in())
            .field("closed", &self.is_closed())
            .finish()
    }
}
