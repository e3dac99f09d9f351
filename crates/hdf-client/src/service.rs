//! The HDF5 dataset service contract.

use std::collections::BTreeMap;

use async_trait::async_trait;
use hdf_common::{ContentsEntry, EntityMeta};

use crate::error::Result;

/// Read-only access to HDF5 files hosted by a remote service.
///
/// Every call addresses an object by `fpath` (file path relative to the
/// server root) and `uri` (path of the object inside the file). Dataset
/// calls may narrow the view with an index expression `ixstr`; data calls
/// may narrow it further with `subixstr`, which is interpreted against the
/// visible axes left by `ixstr`. `min_ndim` pads the result with leading
/// unit axes up to that rank.
#[async_trait]
pub trait HdfService: Send + Sync {
    /// List the children of a group, or describe a single dataset.
    async fn get_contents(&self, fpath: &str, uri: &str) -> Result<Vec<ContentsEntry>>;

    /// Metadata of the object at `uri`, after applying `ixstr`.
    async fn get_meta(
        &self,
        fpath: &str,
        uri: &str,
        ixstr: Option<&str>,
        min_ndim: Option<usize>,
    ) -> Result<EntityMeta>;

    /// Cell values of a dataset view as nested JSON arrays.
    async fn get_data(
        &self,
        fpath: &str,
        uri: &str,
        ixstr: Option<&str>,
        subixstr: Option<&str>,
        min_ndim: Option<usize>,
    ) -> Result<serde_json::Value>;

    /// Attribute values of the object at `uri`, optionally restricted to
    /// `attr_keys`.
    async fn get_attrs(
        &self,
        fpath: &str,
        uri: &str,
        attr_keys: Option<&[String]>,
    ) -> Result<BTreeMap<String, serde_json::Value>>;

    /// A short h5py code snippet that opens the object at `uri`.
    async fn get_snippet(&self, fpath: &str, uri: &str) -> Result<String>;
}
