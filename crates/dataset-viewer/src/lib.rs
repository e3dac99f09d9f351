//! Lazily paginated 2D view over remote HDF5 datasets.
//!
//! An HDF5 dataset of any rank is narrowed by a NumPy-style index
//! expression to at most two visible axes and presented as a grid. Cells are
//! fetched from the dataset service in fixed-size blocks, only when asked
//! for, and cached until the view changes.
//!
//! # Architecture
//!
//! ```text
//! grid widget
//!      │
//!      ▼
//! ViewerModel::data(region, row, col)
//!      │
//!      ├─► headers: label.start + index * label.step
//!      │
//!      └─► body: BlockCache lookup of (row / BLOCK, col / BLOCK)
//!                │
//!                ├─► materialized: return the cell
//!                │
//!                ├─► pending: return None
//!                │
//!                └─► absent: mark pending, spawn get_data(ixstr, subixstr)
//!                          │
//!                          ▼
//!                     store block (if still the same generation)
//!                          │
//!                          ▼
//!                     CellsChanged { row, column, row_span, column_span }
//! ```
//!
//! Changing the index expression goes through [`ViewerModel::refresh`],
//! which fetches metadata for the new view, derives its [`DisplayShape`],
//! clears the cache and emits `RowsRemoved`, `ColumnsRemoved`,
//! `RowsInserted`, `ColumnsInserted`, `ModelReset` and `Refreshed`.
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use dataset_viewer::{MetaSource, ViewerConfig, ViewerModel};
//! use hdf_client::{ClientConfig, HttpHdfClient};
//!
//! let service = Arc::new(HttpHdfClient::new(ClientConfig::from_env())?);
//! let model = ViewerModel::new(service, "data/run1.h5", "/temperature", ViewerConfig::default())?;
//! model.init(MetaSource::Service).await?;
//!
//! let mut changes = model.subscribe_changes();
//! assert!(model.get_cell(0, 150).is_none()); // block (0, 1) now pending
//! let _ = changes.recv().await?;              // CellsChanged for 0:100, 100:200
//! let value = model.get_cell(0, 150);
//! ```

pub mod cache;
pub mod complex;
pub mod config;
pub mod error;
pub mod events;
pub mod model;
pub mod shape;
pub mod types;

// Re-export commonly used types at crate root
pub use cache::{Block, BlockCache, BlockKey, BlockRegion};
pub use complex::convert_values_to_string;
pub use config::ViewerConfig;
pub use error::{Result, ViewerError};
pub use events::{ChangedArgs, ErrorReport, Notification};
pub use model::{default_ixstr, MetaSource, ViewerModel};
pub use shape::{derive_display_shape, DisplayShape};
pub use types::{CacheStats, CellRegion, CellValue, ColumnRegion, ModelState, RowRegion};
