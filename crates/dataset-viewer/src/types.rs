//! Shared value types of the viewer's grid contract.

use serde::{Deserialize, Serialize};

/// A single displayed cell: a number, a string (complex values, labels) or
/// whatever JSON scalar the service sent.
pub type CellValue = serde_json::Value;

/// Row regions of the grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RowRegion {
    Body,
    ColumnHeader,
}

/// Column regions of the grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ColumnRegion {
    Body,
    RowHeader,
}

/// Cell regions of the grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CellRegion {
    Body,
    RowHeader,
    ColumnHeader,
    CornerHeader,
}

/// Lifecycle of a viewer model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ModelState {
    Uninitialized,
    Loading,
    Ready,
    Disposed,
}

/// Statistics about the block cache.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    /// Block requests issued.
    pub fetches: u64,
    pub evictions: u64,
    /// Materialized blocks currently held.
    pub entries: usize,
    /// Blocks requested but not yet materialized.
    pub pending: usize,
}

impl CacheStats {
    /// Calculate the cache hit rate (0.0 - 1.0).
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}
