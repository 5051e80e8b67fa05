use std::sync::Arc;

use crate::config::BufferPoolConfig;
use crate::error::PoolResult;
use crate::lease::Lease;
use crate::pool::{ObjectPool, PoolStats};

/// Pool of fixed-size, zero-initialized byte buffers.
///
/// Cloning is cheap and shares the underlying pool. Buffers are restored to
/// `buffer_size` bytes on check-in; their contents are not cleared.
#[derive(Clone, Debug)]
pub struct BufferPool {
    pool: Arc<ObjectPool<Vec<u8>>>,
    buffer_size: usize,
}

impl BufferPool {
    pub fn new(config: BufferPoolConfig) -> PoolResult<Self> {
        config.validate()?;
        Ok(Self::build(config))
    }

    fn build(config: BufferPoolConfig) -> Self {
        let buffer_size = config.buffer_size;
        let pool = ObjectPool::build(
            config.pool_config(),
            Box::new(move || vec![0u8; buffer_size]),
        )
        .with_reset(move |buf: &mut Vec<u8>| buf.resize(buffer_size, 0));
        Self {
            pool: Arc::new(pool),
            buffer_size,
        }
    }

    pub fn check_out(&self) -> PoolResult<Vec<u8>> {
        self.pool.check_out()
    }

    pub fn check_in(&self, buf: Vec<u8>) -> PoolResult<()> {
        self.pool.check_in(buf)
    }

    /// Check out a buffer that returns itself on drop.
    pub fn lease(&self) -> PoolResult<Lease<Vec<u8>>> {
        self.pool.lease()
    }

    pub fn len(&self) -> PoolResult<usize> {
        self.pool.len()
    }

    pub fn is_empty(&self) -> PoolResult<bool> {
        self.pool.is_empty()
    }

    pub fn growth(&self) -> PoolResult<usize> {
        self.pool.growth()
    }

    /// Length of every buffer handed out by this pool.
    pub fn buffer_size(&self) -> usize {
        self.buffer_size
    }

    pub fn stats(&self) -> PoolStats {
        self.pool.stats()
    }

    pub fn is_disposed(&self) -> bool {
        self.pool.is_disposed()
    }

    /// Dispose the shared pool. Affects every clone.
    pub fn shutdown(&self) {
        self.pool.shutdown();
    }

    /// The generic pool backing this buffer pool.
    pub fn object_pool(&self) -> &Arc<ObjectPool<Vec<u8>>> {
        &self.pool
    }
}

impl Default for BufferPool {
    /// Capacity 10, growth 10, 4096-byte buffers.
    fn default() -> Self {
        Self::build(BufferPoolConfig::default())
    }
}
