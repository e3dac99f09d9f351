//! Error types for the dataset viewer.

use hdf_client::ServiceError;
use thiserror::Error;

/// Errors returned by [`crate::ViewerModel`] operations.
///
/// Domain and response errors from the service are normally absorbed by the
/// model (reported as a notification, view collapsed to empty) and only
/// surface here when they are not reportable.
#[derive(Error, Debug)]
pub enum ViewerError {
    /// An unexpected failure of the dataset service.
    #[error(transparent)]
    Service(#[from] ServiceError),

    /// The requested view cannot be displayed as a 2D grid.
    #[error("invalid view: {0}")]
    Validation(String),

    /// The model was disposed before the operation finished.
    #[error("viewer model has been disposed")]
    Disposed,

    /// The operation needs metadata that has not been loaded yet.
    #[error("viewer model is not initialized")]
    NotInitialized,

    /// Invalid configuration.
    #[error("configuration error: {0}")]
    Config(String),
}

/// Result type for viewer operations.
pub type Result<T> = std::result::Result<T, ViewerError>;
