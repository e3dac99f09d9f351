//! LRU cache of materialized blocks plus the set of in-flight requests.

use std::collections::HashSet;
use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicU64, Ordering};

use lru::LruCache;
use serde_json::Value;

use crate::complex::convert_values_to_string;
use crate::types::{CacheStats, CellValue};

/// Cache key for blocks: (row_block, col_block).
pub type BlockKey = (u64, u64);

/// A fetched rectangle of cell values, row-major.
#[derive(Debug, Clone, PartialEq)]
pub struct Block {
    rows: Vec<Vec<CellValue>>,
}

impl Block {
    pub fn new(rows: Vec<Vec<CellValue>>) -> Self {
        Self { rows }
    }

    /// Build a block from a `data` payload.
    ///
    /// Complex pairs are converted to strings first, then the result is
    /// normalized to two dimensions: a scalar becomes a 1x1 block and a flat
    /// array a single row.
    pub fn from_payload(payload: Value, is_complex: bool) -> Self {
        let payload = if is_complex {
            convert_values_to_string(&payload)
        } else {
            payload
        };

        let rows = match payload {
            Value::Array(items) if items.iter().all(Value::is_array) && !items.is_empty() => items
                .into_iter()
                .map(|row| match row {
                    Value::Array(cells) => cells,
                    other => vec![other],
                })
                .collect(),
            Value::Array(items) => vec![items],
            scalar => vec![vec![scalar]],
        };

        Self { rows }
    }

    pub fn get(&self, row: u64, col: u64) -> Option<&CellValue> {
        self.rows.get(row as usize)?.get(col as usize)
    }

    pub fn n_rows(&self) -> usize {
        self.rows.len()
    }

    pub fn n_cols(&self) -> usize {
        self.rows.first().map_or(0, Vec::len)
    }
}

/// Result of looking a cell up in the cache.
#[derive(Debug, Clone, PartialEq)]
pub enum Lookup {
    /// The block is materialized. `None` if the payload was shorter than
    /// the block region.
    Ready(Option<CellValue>),
    /// The block has been requested and not yet delivered.
    Pending,
    /// Nobody asked for the block yet.
    Absent,
}

/// Block cache with pending markers.
///
/// Materialized blocks live in an LRU bounded by block count. Pending
/// markers are kept apart and never evicted, so a block is requested at
/// most once until it is delivered or the cache is cleared.
pub struct BlockCache {
    blocks: LruCache<BlockKey, Block>,
    pending: HashSet<BlockKey>,
    hits: AtomicU64,
    misses: AtomicU64,
    fetches: AtomicU64,
    evictions: AtomicU64,
}

impl BlockCache {
    /// Create a cache holding at most `max_blocks` materialized blocks.
    pub fn new(max_blocks: usize) -> Self {
        let capacity = NonZeroUsize::new(max_blocks).unwrap_or(NonZeroUsize::MIN);

        Self {
            blocks: LruCache::new(capacity),
            pending: HashSet::new(),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            fetches: AtomicU64::new(0),
            evictions: AtomicU64::new(0),
        }
    }

    /// Look up the cell at `(row, col)` inside block `key`.
    pub fn lookup(&mut self, key: &BlockKey, row: u64, col: u64) -> Lookup {
        if let Some(block) = self.blocks.get(key) {
            self.hits.fetch_add(1, Ordering::Relaxed);
            return Lookup::Ready(block.get(row, col).cloned());
        }

        self.misses.fetch_add(1, Ordering::Relaxed);
        if self.pending.contains(key) {
            Lookup::Pending
        } else {
            Lookup::Absent
        }
    }

    /// Mark a block as requested. Returns `false` if it is already pending
    /// or materialized.
    pub fn mark_pending(&mut self, key: BlockKey) -> bool {
        if self.blocks.contains(&key) || !self.pending.insert(key) {
            return false;
        }
        self.fetches.fetch_add(1, Ordering::Relaxed);
        true
    }

    /// Store a delivered block. Returns `false`, dropping the block, if it
    /// was not pending.
    pub fn fulfill(&mut self, key: BlockKey, block: Block) -> bool {
        if !self.pending.remove(&key) {
            return false;
        }

        if let Some((evicted, _)) = self.blocks.push(key, block) {
            if evicted != key {
                self.evictions.fetch_add(1, Ordering::Relaxed);
            }
        }
        true
    }

    pub fn is_pending(&self, key: &BlockKey) -> bool {
        self.pending.contains(key)
    }

    /// Check if a block is materialized without updating LRU order.
    pub fn contains(&self, key: &BlockKey) -> bool {
        self.blocks.contains(key)
    }

    /// Get cache statistics.
    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            fetches: self.fetches.load(Ordering::Relaxed),
            evictions: self.evictions.load(Ordering::Relaxed),
            entries: self.blocks.len(),
            pending: self.pending.len(),
        }
    }

    /// Forget every block and every pending marker.
    pub fn clear(&mut self) {
        self.blocks.clear();
        self.pending.clear();
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty() && self.pending.is_empty()
    }
}
