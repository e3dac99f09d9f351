//! Subcommand implementations.
//!
//! Each command takes the service as a trait object so the same code runs
//! against the HTTP client and the in-memory mock used by the tests.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use dataset_viewer::{
    BlockKey, CellRegion, ChangedArgs, ColumnRegion, MetaSource, Notification, RowRegion,
    ViewerConfig, ViewerModel,
};
use hdf_client::HdfService;
use tokio::sync::broadcast::{self, error::RecvError};
use tracing::{debug, info, warn};

use crate::render::{self, format_cell, Window};

/// Which part of a dataset `show` prints.
#[derive(Debug, Clone)]
pub struct ShowOptions {
    pub ixstr: Option<String>,
    pub row: u64,
    pub col: u64,
    pub rows: u64,
    pub cols: u64,
    /// How long to wait for the window's blocks.
    pub timeout: Duration,
}

impl Default for ShowOptions {
    fn default() -> Self {
        Self {
            ixstr: None,
            row: 0,
            col: 0,
            rows: 20,
            cols: 10,
            timeout: Duration::from_secs(30),
        }
    }
}

pub async fn ls(service: &dyn HdfService, fpath: &str, uri: &str) -> Result<String> {
    let entries = service
        .get_contents(fpath, uri)
        .await
        .with_context(|| format!("Failed to list {uri} in {fpath}"))?;
    info!(fpath, uri, count = entries.len(), "Listed contents");
    Ok(render::contents_table(&entries))
}

pub async fn attrs(service: &dyn HdfService, fpath: &str, uri: &str) -> Result<String> {
    let attrs = service
        .get_attrs(fpath, uri, None)
        .await
        .with_context(|| format!("Failed to read attributes of {uri} in {fpath}"))?;
    info!(fpath, uri, count = attrs.len(), "Read attributes");
    Ok(render::attrs_table(&attrs))
}

/// h5py code that opens the object, as served by the dataset service.
pub async fn snippet(service: &dyn HdfService, fpath: &str, uri: &str) -> Result<String> {
    let snippet = service
        .get_snippet(fpath, uri)
        .await
        .with_context(|| format!("Failed to get a snippet for {uri} in {fpath}"))?;
    info!(fpath, uri, "Fetched snippet");
    Ok(snippet)
}

/// Open a viewer on `uri`, load the requested window and collect it.
pub async fn show(
    service: Arc<dyn HdfService>,
    fpath: &str,
    uri: &str,
    config: ViewerConfig,
    opts: &ShowOptions,
) -> Result<Window> {
    let model = ViewerModel::new(service, fpath, uri, config)?;
    let mut notifications = model.subscribe_notifications();

    model.init(MetaSource::Service).await?;
    if let Some(ixstr) = &opts.ixstr {
        let result = model.refresh(ixstr).await;
        log_notifications(&mut notifications);
        result?;
    }

    let mut changes = model.subscribe_changes();
    let outstanding = touch_window(&model, opts);
    debug!(blocks = outstanding.len(), "Waiting for blocks");
    wait_for_blocks(&model, &mut changes, outstanding, opts.timeout).await;
    log_notifications(&mut notifications);

    let window = collect_window(&model, opts);
    model.dispose();
    Ok(window)
}

fn window_bounds(model: &ViewerModel, opts: &ShowOptions) -> (u64, u64, u64, u64) {
    let n_rows = model.row_count(RowRegion::Body);
    let n_cols = model.column_count(ColumnRegion::Body);
    let row_end = opts.row.saturating_add(opts.rows).min(n_rows);
    let col_end = opts.col.saturating_add(opts.cols).min(n_cols);
    (opts.row.min(row_end), row_end, opts.col.min(col_end), col_end)
}

/// Request every cell of the window, returning the blocks still in flight.
fn touch_window(model: &ViewerModel, opts: &ShowOptions) -> HashSet<BlockKey> {
    let (row_start, row_end, col_start, col_end) = window_bounds(model, opts);
    let mut outstanding = HashSet::new();

    for row in row_start..row_end {
        for col in col_start..col_end {
            if model.get_cell(row, col).is_none() {
                outstanding.insert(model.config().block_of(row, col));
            }
        }
    }
    outstanding
}

async fn wait_for_blocks(
    model: &ViewerModel,
    changes: &mut broadcast::Receiver<ChangedArgs>,
    mut outstanding: HashSet<BlockKey>,
    timeout: Duration,
) {
    let waiting = tokio::time::timeout(timeout, async {
        while !outstanding.is_empty() {
            match changes.recv().await {
                Ok(ChangedArgs::CellsChanged { row, column, .. }) => {
                    outstanding.remove(&model.config().block_of(row, column));
                }
                // The view collapsed; nothing more will arrive for it.
                Ok(ChangedArgs::ModelReset) => break,
                Ok(_) => {}
                Err(RecvError::Lagged(skipped)) => {
                    warn!(skipped, "Missed change events");
                }
                Err(RecvError::Closed) => break,
            }
        }
    })
    .await;

    if waiting.is_err() {
        warn!(?timeout, "Timed out waiting for dataset blocks");
    }
}

fn collect_window(model: &ViewerModel, opts: &ShowOptions) -> Window {
    let (row_start, row_end, col_start, col_end) = window_bounds(model, opts);
    let has_col_headers = model.row_count(RowRegion::ColumnHeader) > 0;
    let has_row_headers = model.column_count(ColumnRegion::RowHeader) > 0;

    let col_labels = if has_col_headers {
        (col_start..col_end)
            .map(|col| format_cell(model.data(CellRegion::ColumnHeader, 0, col).as_ref()))
            .collect()
    } else {
        Vec::new()
    };

    let rows = (row_start..row_end)
        .map(|row| {
            let label = has_row_headers
                .then(|| format_cell(model.data(CellRegion::RowHeader, row, 0).as_ref()));
            let cells = (col_start..col_end)
                .map(|col| format_cell(model.data(CellRegion::Body, row, col).as_ref()))
                .collect();
            (label, cells)
        })
        .collect();

    Window { col_labels, rows }
}

fn log_notifications(notifications: &mut broadcast::Receiver<Notification>) {
    while let Ok(note) = notifications.try_recv() {
        match note {
            Notification::Refreshed { ixstr } => debug!(%ixstr, "View refreshed"),
            Notification::ValidationFailed { message } => warn!(%message, "Invalid selection"),
            Notification::Error(report) => warn!(
                message = %report.message,
                status = ?report.status,
                "Dataset service error"
            ),
        }
    }
}
