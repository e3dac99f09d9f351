//! Shared test utilities for the hdf5-grid workspace.
//!
//! This crate provides common testing infrastructure including:
//! - An in-memory [`MockHdfService`] with call accounting, gated responses
//!   and fault injection
//! - NumPy-style selection for synthetic datasets
//! - Value generators and a standard sample file layout
//!
//! # Usage
//!
//! Add to your crate's `Cargo.toml`:
//!
//! ```toml
//! [dev-dependencies]
//! test-utils = { path = "../test-utils" }
//! ```
//!
//! Then import in your tests:
//!
//! ```ignore
//! use test_utils::{fixtures, Endpoint, MockHdfService};
//!
//! let service = Arc::new(fixtures::sample_service());
//! let gate = service.hold(Endpoint::Data, ":, :");
//! // ... trigger a fetch, assert on pending state ...
//! gate.release();
//! ```

pub mod fixtures;
pub mod generators;
pub mod mock;
pub mod selection;

// Re-export commonly used items at the crate root
pub use fixtures::{sample_service, uris, SAMPLE_FPATH};
pub use generators::*;
pub use mock::{Endpoint, Gate, MockCall, MockDataset, MockFailure, MockHdfService};

/// Receive the next item from a broadcast receiver, failing the test if
/// nothing arrives within five seconds.
///
/// # Usage
///
/// ```ignore
/// use test_utils::recv_within;
///
/// let change = recv_within!(changes);
/// ```
#[macro_export]
macro_rules! recv_within {
    ($rx:expr) => {{
        match ::tokio::time::timeout(::std::time::Duration::from_secs(5), $rx.recv()).await {
            Ok(Ok(item)) => item,
            Ok(Err(err)) => panic!("channel closed or lagged: {:?}", err),
            Err(_) => panic!("timed out waiting for {}", stringify!($rx)),
        }
    }};
}
