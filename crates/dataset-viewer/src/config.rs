//! Configuration for the dataset viewer.

use serde::{Deserialize, Serialize};

/// Tunables of a [`crate::ViewerModel`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ViewerConfig {
    /// Edge length of a cached block, applied to both axes.
    ///
    /// Trades the number of fetches against over-fetching for small
    /// viewports.
    pub block_size: u64,

    /// Maximum number of materialized blocks kept in the LRU.
    pub max_cached_blocks: usize,

    /// Capacity of the change and notification broadcast channels.
    pub event_capacity: usize,

    /// Rank every data payload is padded to by the service.
    pub min_ndim: usize,
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            block_size: 100,
            max_cached_blocks: 256,
            event_capacity: 1024,
            min_ndim: 2,
        }
    }
}

impl ViewerConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(val) = std::env::var("HDF_BLOCK_SIZE") {
            if let Ok(size) = val.parse() {
                config.block_size = size;
            }
        }

        if let Ok(val) = std::env::var("HDF_MAX_CACHED_BLOCKS") {
            if let Ok(count) = val.parse() {
                config.max_cached_blocks = count;
            }
        }

        if let Ok(val) = std::env::var("HDF_EVENT_CAPACITY") {
            if let Ok(capacity) = val.parse() {
                config.event_capacity = capacity;
            }
        }

        config
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), String> {
        if self.block_size == 0 {
            return Err("block_size must be > 0".to_string());
        }

        if self.max_cached_blocks == 0 {
            return Err("max_cached_blocks must be > 0".to_string());
        }

        if self.event_capacity == 0 {
            return Err("event_capacity must be > 0".to_string());
        }

        Ok(())
    }

    /// Block coordinates of a cell.
    pub fn block_of(&self, row: u64, col: u64) -> (u64, u64) {
        (row / self.block_size, col / self.block_size)
    }
}
