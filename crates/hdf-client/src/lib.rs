//! Client for the remote HDF5 dataset service.
//!
//! The service exposes five read-only endpoints, each addressed by an on-disk
//! file path plus an in-file uri:
//!
//! ```text
//! GET {base}/hdf/contents/{fpath}?uri=/group
//! GET {base}/hdf/meta/{fpath}?uri=/dset&ixstr=0,:,:&min_ndim=2
//! GET {base}/hdf/data/{fpath}?uri=/dset&ixstr=0,:,:&subixstr=0:100,0:100&min_ndim=2
//! GET {base}/hdf/attrs/{fpath}?uri=/dset&attr_keys=units
//! GET {base}/hdf/snippet/{fpath}?uri=/dset
//! ```
//!
//! [`HdfService`] is the contract the viewer depends on; [`HttpHdfClient`]
//! implements it over `reqwest`.

pub mod config;
pub mod error;
pub mod http;
pub mod service;

pub use config::ClientConfig;
pub use error::{Result, ServiceError};
pub use http::HttpHdfClient;
pub use service::HdfService;
