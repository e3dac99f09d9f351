//! Change records and user notifications emitted by the viewer model.

use hdf_client::ServiceError;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

/// A change to the grid, for the widget to repaint.
///
/// `CellsChanged` covers exactly one fetched block so only that rectangle
/// needs repainting; `ModelReset` invalidates everything.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChangedArgs {
    RowsInserted { index: u64, span: u64 },
    RowsRemoved { index: u64, span: u64 },
    ColumnsInserted { index: u64, span: u64 },
    ColumnsRemoved { index: u64, span: u64 },
    CellsChanged {
        row: u64,
        column: u64,
        row_span: u64,
        column_span: u64,
    },
    ModelReset,
}

/// Something the user should be told about.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Notification {
    /// The view was (re)built for this index expression. Also re-sent with
    /// the old expression when a change is rejected, so an input control can
    /// snap back.
    Refreshed { ixstr: String },
    /// The requested index expression cannot be displayed.
    ValidationFailed { message: String },
    /// The service reported an error and the view collapsed to empty.
    Error(ErrorReport),
}

/// Diagnostic details of a service error.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ErrorReport {
    pub message: String,
    pub status: Option<u16>,
    pub debug_vars: serde_json::Map<String, serde_json::Value>,
    pub traceback: String,
}

impl From<&ServiceError> for ErrorReport {
    fn from(err: &ServiceError) -> Self {
        match err {
            ServiceError::Hdf(payload) => Self {
                message: payload.message.clone(),
                status: None,
                debug_vars: payload.debug_vars.clone(),
                traceback: payload.traceback.clone(),
            },
            ServiceError::Response {
                status,
                message,
                traceback,
            } => Self {
                message: message.clone(),
                status: Some(*status),
                debug_vars: Default::default(),
                traceback: traceback.clone(),
            },
            other => Self {
                message: other.to_string(),
                ..Self::default()
            },
        }
    }
}

/// Broadcast senders for both event streams.
pub(crate) struct EventHub {
    changes: broadcast::Sender<ChangedArgs>,
    notifications: broadcast::Sender<Notification>,
}

impl EventHub {
    pub(crate) fn new(capacity: usize) -> Self {
        let (changes, _) = broadcast::channel(capacity.max(1));
        let (notifications, _) = broadcast::channel(capacity.max(1));
        Self {
            changes,
            notifications,
        }
    }

    // Sending fails only when nobody is subscribed.
    pub(crate) fn changed(&self, args: ChangedArgs) {
        let _ = self.changes.send(args);
    }

    pub(crate) fn notify(&self, notification: Notification) {
        let _ = self.notifications.send(notification);
    }

    pub(crate) fn subscribe_changes(&self) -> broadcast::Receiver<ChangedArgs> {
        self.changes.subscribe()
    }

    pub(crate) fn subscribe_notifications(&self) -> broadcast::Receiver<Notification> {
        self.notifications.subscribe()
    }
}
