use thiserror::Error;

/// Errors produced by pool operations.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum PoolError {
    #[error("object pool has been disposed")]
    Disposed,

    #[error("invalid check-in: pool has never been populated")]
    InvalidCheckIn,

    #[error("invalid pool configuration: {0}")]
    InvalidConfig(String),

    #[error("config parse error: {0}")]
    Config(String),
}

impl PoolError {
    /// Returns `true` if the error comes from using a torn-down pool.
    pub fn is_disposed(&self) -> bool {
        matches!(self, Self::Disposed)
    }
}

pub type PoolResult<T> = Result<T, PoolError>;
