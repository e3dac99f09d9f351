//! Block cache backing the grid's cell lookups.

mod block_cache;
mod region;

pub use block_cache::{Block, BlockCache, BlockKey, Lookup};
pub use region::BlockRegion;
