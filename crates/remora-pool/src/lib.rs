//! Reusable-object pools for the Remora remoting toolkit.
//!
//! # Architecture
//!
//! - **ObjectPool**: lazily growing queue of reusable objects behind a
//!   reader/writer lock, with a factory closure and an optional release hook
//! - **Lease**: RAII guard that checks an object back in on drop
//! - **BufferPool**: `ObjectPool<Vec<u8>>` producing fixed-size buffers
//!
//! Pools grow in fixed batches whenever a check-out finds them empty and are
//! torn down exactly once, releasing every pooled object.

pub mod buffer;
pub mod config;
pub mod error;
pub mod lease;
pub mod pool;

pub use buffer::BufferPool;
pub use config::{BufferPoolConfig, PoolConfig};
pub use error::{PoolError, PoolResult};
pub use lease::Lease;
pub use pool::{ObjectPool, PoolStats, ReleaseError};
