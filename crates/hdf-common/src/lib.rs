//! Common types shared by the HDF5 grid crates.

pub mod error;
pub mod meta;
pub mod slice;

pub use error::{CommonError, CommonResult, HdfErrorPayload};
pub use meta::{AttributeMeta, ContentsEntry, DatasetMeta, EntityKind, EntityMeta, GroupMeta};
pub use slice::{parse_axis, parse_slices, slice, IndexSlice};
