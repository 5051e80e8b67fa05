use serde::{Deserialize, Serialize};

use crate::error::{PoolError, PoolResult};

/// Configuration for an [`ObjectPool`](crate::ObjectPool).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PoolConfig {
    /// Initial queue capacity reserved on first growth.
    pub capacity: usize,
    /// Number of objects manufactured each time the pool runs dry.
    pub growth: usize,
    /// Release spare queue storage before every growth.
    pub reclaim_on_growth: bool,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            capacity: 10,
            growth: 10,
            reclaim_on_growth: true,
        }
    }
}

impl PoolConfig {
    /// Create a configuration with the given capacity and growth.
    pub fn new(capacity: usize, growth: usize) -> Self {
        Self {
            capacity,
            growth,
            ..Default::default()
        }
    }

    /// Set whether spare queue storage is released before growth.
    pub fn with_reclaim_on_growth(mut self, reclaim: bool) -> Self {
        self.reclaim_on_growth = reclaim;
        self
    }

    /// Parse a configuration from TOML. Missing keys take their defaults.
    pub fn from_toml_str(s: &str) -> PoolResult<Self> {
        let config: Self = toml::from_str(s).map_err(|e| PoolError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Check that the configuration can drive a pool.
    pub fn validate(&self) -> PoolResult<()> {
        if self.growth == 0 {
            return Err(PoolError::InvalidConfig("growth must be at least 1".into()));
        }
        Ok(())
    }
}

/// Configuration for a [`BufferPool`](crate::BufferPool).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BufferPoolConfig {
    pub capacity: usize,
    pub growth: usize,
    /// Length in bytes of every manufactured buffer.
    pub buffer_size: usize,
    pub reclaim_on_growth: bool,
}

impl Default for BufferPoolConfig {
    fn default() -> Self {
        Self {
            capacity: 10,
            growth: 10,
            buffer_size: 4096,
            reclaim_on_growth: true,
        }
    }
}

impl BufferPoolConfig {
    /// Create a configuration with the given capacity, growth, and buffer size.
    pub fn new(capacity: usize, growth: usize, buffer_size: usize) -> Self {
        Self {
            capacity,
            growth,
            buffer_size,
            ..Default::default()
        }
    }

    /// Parse a configuration from TOML. Missing keys take their defaults.
    pub fn from_toml_str(s: &str) -> PoolResult<Self> {
        let config: Self = toml::from_str(s).map_err(|e| PoolError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> PoolResult<()> {
        if self.buffer_size == 0 {
            return Err(PoolError::InvalidConfig(
                "buffer_size must be at least 1".into(),
            ));
        }
        self.pool_config().validate()
    }

    /// The generic pool settings carried by this configuration.
    pub fn pool_config(&self) -> PoolConfig {
        PoolConfig {
            capacity: self.capacity,
            growth: self.growth,
            reclaim_on_growth: self.reclaim_on_growth,
        }
    }
}
