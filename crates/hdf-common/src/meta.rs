//! Metadata describing HDF5 groups, datasets and links.
//!
//! These mirror the JSON documents returned by the HDF5 service's `meta` and
//! `contents` endpoints. Dataset metadata is always relative to an index
//! expression: `shape`, `ndim`, `size` and `labels` describe the view left
//! after the expression is applied.

use serde::{Deserialize, Deserializer, Serialize};

use crate::error::{CommonError, CommonResult};
use crate::slice::{slice, IndexSlice};

/// Treat an explicit JSON `null` like a missing field.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Name, dtype and shape of one attribute.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttributeMeta {
    pub name: String,
    pub dtype: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub shape: Vec<u64>,
}

/// Metadata of a dataset, as seen through an index expression.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct DatasetMeta {
    #[serde(default)]
    pub name: String,
    /// NumPy dtype string, e.g. `<f8` or `<c16`.
    #[serde(default)]
    pub dtype: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub shape: Vec<u64>,
    #[serde(default)]
    pub ndim: usize,
    #[serde(default)]
    pub size: u64,
    /// One label slice per visible axis.
    #[serde(default, deserialize_with = "null_as_default")]
    pub labels: Vec<IndexSlice>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub attributes: Vec<AttributeMeta>,
}

impl DatasetMeta {
    /// Metadata of a dataset with nothing to show.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Whether the dtype is a complex type.
    pub fn is_complex(&self) -> bool {
        self.dtype.contains('c')
    }

    /// Keep only the trailing two axes, recomputing `ndim` and `size`.
    ///
    /// Used for the initial view of a high-rank dataset, where the default
    /// index expression pins every leading axis to 0.
    pub fn trailing_2d(&self) -> Self {
        if self.shape.len() <= 2 {
            return self.clone();
        }

        let shape = self.shape[self.shape.len() - 2..].to_vec();
        let labels = if self.labels.len() >= 2 {
            self.labels[self.labels.len() - 2..].to_vec()
        } else {
            shape.iter().map(|extent| slice(0, *extent as i64)).collect()
        };

        Self {
            size: shape.iter().product(),
            ndim: shape.len(),
            shape,
            labels,
            ..self.clone()
        }
    }

    /// The label slice of `axis`, falling back to `0..extent` when the
    /// service did not send labels.
    pub fn label(&self, axis: usize) -> IndexSlice {
        self.labels.get(axis).copied().unwrap_or_else(|| {
            let extent = self.shape.get(axis).copied().unwrap_or(0);
            slice(0, extent as i64)
        })
    }
}

/// Metadata of a group.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct GroupMeta {
    #[serde(default)]
    pub name: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub attributes: Vec<AttributeMeta>,
    #[serde(default, rename = "childrenCount")]
    pub children_count: Option<u64>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub children: Vec<EntityMeta>,
}

/// Metadata of any object addressable by uri.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum EntityMeta {
    #[serde(rename = "dataset")]
    Dataset(DatasetMeta),
    #[serde(rename = "group")]
    Group(GroupMeta),
    #[serde(rename = "softLink")]
    SoftLink {
        name: String,
        #[serde(rename = "targetUri")]
        target_uri: String,
    },
    #[serde(rename = "externalLink")]
    ExternalLink {
        name: String,
        #[serde(rename = "targetFile")]
        target_file: String,
        #[serde(rename = "targetUri")]
        target_uri: String,
    },
}

impl EntityMeta {
    pub fn kind(&self) -> EntityKind {
        match self {
            EntityMeta::Dataset(_) => EntityKind::Dataset,
            EntityMeta::Group(_) => EntityKind::Group,
            EntityMeta::SoftLink { .. } => EntityKind::SoftLink,
            EntityMeta::ExternalLink { .. } => EntityKind::ExternalLink,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            EntityMeta::Dataset(meta) => &meta.name,
            EntityMeta::Group(meta) => &meta.name,
            EntityMeta::SoftLink { name, .. } | EntityMeta::ExternalLink { name, .. } => name,
        }
    }

    /// Unwrap dataset metadata, or report what was found instead.
    pub fn into_dataset(self, uri: &str) -> CommonResult<DatasetMeta> {
        match self {
            EntityMeta::Dataset(meta) => Ok(meta),
            other => Err(CommonError::UnexpectedEntity {
                uri: uri.to_string(),
                expected: EntityKind::Dataset.as_str(),
                found: other.kind().as_str(),
            }),
        }
    }
}

/// Kind of an HDF5 object as reported by the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EntityKind {
    #[serde(rename = "dataset")]
    Dataset,
    #[serde(rename = "group")]
    Group,
    #[serde(rename = "softLink")]
    SoftLink,
    #[serde(rename = "externalLink")]
    ExternalLink,
}

impl EntityKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityKind::Dataset => "dataset",
            EntityKind::Group => "group",
            EntityKind::SoftLink => "softLink",
            EntityKind::ExternalLink => "externalLink",
        }
    }
}

impl std::fmt::Display for EntityKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One entry of a `contents` listing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentsEntry {
    pub name: String,
    pub uri: String,
    #[serde(rename = "type")]
    pub kind: EntityKind,
    /// Full metadata, present when a single dataset was requested.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<DatasetMeta>,
}
