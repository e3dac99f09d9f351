//! The dataset viewer model.
//!
//! A [`ViewerModel`] presents one HDF5 dataset, seen through an index
//! expression, as a 2D grid. Cell lookups are served from the block cache;
//! a miss marks the block pending, spawns a `data` request and returns
//! `None` until a `CellsChanged` event announces the block.
//!
//! Two counters keep late results out of newer state:
//!
//! - `refresh_seq` is bumped by every [`ViewerModel::refresh`]; a metadata
//!   response is applied only if no newer refresh started meanwhile.
//! - `generation` is bumped whenever the displayed view is rebuilt; a block
//!   response is stored only if it was requested under the current
//!   generation.

use std::future::Future;
use std::sync::Arc;

use futures::future::BoxFuture;
use hdf_client::{HdfService, ServiceError};
use hdf_common::{DatasetMeta, EntityMeta};
use parking_lot::Mutex;
use serde_json::Value;
use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, instrument, warn};

use crate::cache::{Block, BlockCache, BlockKey, BlockRegion, Lookup};
use crate::config::ViewerConfig;
use crate::error::{Result, ViewerError};
use crate::events::{ChangedArgs, ErrorReport, EventHub, Notification};
use crate::shape::{derive_display_shape, DisplayShape};
use crate::types::{CacheStats, CellRegion, CellValue, ColumnRegion, ModelState, RowRegion};

/// Where [`ViewerModel::init`] gets the dataset's full metadata from.
pub enum MetaSource {
    /// Metadata the caller already has, e.g. from a contents listing.
    Provided(DatasetMeta),
    /// Ask the service for the metadata of `(fpath, uri)`.
    Service,
    /// Any other asynchronous source.
    Deferred(BoxFuture<'static, hdf_client::Result<DatasetMeta>>),
}

impl MetaSource {
    pub fn deferred<F>(future: F) -> Self
    where
        F: Future<Output = hdf_client::Result<DatasetMeta>> + Send + 'static,
    {
        Self::Deferred(Box::pin(future))
    }
}

impl std::fmt::Debug for MetaSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Provided(meta) => f.debug_tuple("Provided").field(&meta.name).finish(),
            Self::Service => write!(f, "Service"),
            Self::Deferred(_) => write!(f, "Deferred"),
        }
    }
}

/// The index expression a dataset opens with: every leading axis pinned to
/// 0 and the trailing two shown whole.
pub fn default_ixstr(ndim: usize) -> String {
    match ndim {
        0 => String::new(),
        1 => ":".to_string(),
        n => {
            let mut axes = vec!["0"; n - 2];
            axes.extend([":", ":"]);
            axes.join(", ")
        }
    }
}

fn rank(meta: &DatasetMeta) -> usize {
    meta.ndim.max(meta.shape.len())
}

struct ViewState {
    state: ModelState,
    ixstr: String,
    /// Metadata of the whole dataset.
    meta: DatasetMeta,
    /// Metadata of the view selected by `ixstr`.
    meta_ix: DatasetMeta,
    display: DisplayShape,
    blocks: BlockCache,
    generation: u64,
    refresh_seq: u64,
    /// Generation in which an error was last reported.
    reported: Option<u64>,
}

struct Inner {
    service: Arc<dyn HdfService>,
    fpath: String,
    uri: String,
    config: ViewerConfig,
    view: Mutex<ViewState>,
    events: EventHub,
    ready: watch::Sender<bool>,
}

/// A block request, captured when the block was marked pending.
#[derive(Debug)]
struct BlockRequest {
    key: BlockKey,
    region: BlockRegion,
    generation: u64,
    ixstr: String,
    subixstr: String,
    is_complex: bool,
}

/// Lazily paginated grid over one dataset.
///
/// Cloning is cheap; all clones share the same state. Methods that spawn
/// requests ([`get_cell`](Self::get_cell), [`data`](Self::data),
/// [`set_ixstr`](Self::set_ixstr)) must be called from within a tokio
/// runtime.
#[derive(Clone)]
pub struct ViewerModel {
    inner: Arc<Inner>,
}

impl ViewerModel {
    pub fn new(
        service: Arc<dyn HdfService>,
        fpath: impl Into<String>,
        uri: impl Into<String>,
        config: ViewerConfig,
    ) -> Result<Self> {
        config.validate().map_err(ViewerError::Config)?;

        let view = ViewState {
            state: ModelState::Uninitialized,
            ixstr: String::new(),
            meta: DatasetMeta::empty(),
            meta_ix: DatasetMeta::empty(),
            display: DisplayShape::empty(),
            blocks: BlockCache::new(config.max_cached_blocks),
            generation: 0,
            refresh_seq: 0,
            reported: None,
        };
        let (ready, _) = watch::channel(false);

        Ok(Self {
            inner: Arc::new(Inner {
                service,
                fpath: fpath.into(),
                uri: uri.into(),
                events: EventHub::new(config.event_capacity),
                config,
                view: Mutex::new(view),
                ready,
            }),
        })
    }

    /// Load the dataset's metadata and build the initial view.
    ///
    /// A reportable service error or a non-dataset object leaves the model
    /// ready with an empty grid. Unexpected errors are returned. Re-running
    /// `init` on a ready model is superseded by any refresh started while its
    /// metadata is in flight.
    #[instrument(skip(self), fields(fpath = %self.inner.fpath, uri = %self.inner.uri))]
    pub async fn init(&self, source: MetaSource) -> Result<()> {
        let seq = {
            let mut view = self.inner.view.lock();
            if view.state == ModelState::Disposed {
                return Err(ViewerError::Disposed);
            }
            view.refresh_seq += 1;
            view.state = ModelState::Loading;
            view.refresh_seq
        };

        let entity = match source {
            MetaSource::Provided(meta) => Ok(EntityMeta::Dataset(meta)),
            MetaSource::Service => {
                self.inner
                    .service
                    .get_meta(&self.inner.fpath, &self.inner.uri, None, None)
                    .await
            }
            MetaSource::Deferred(future) => future.await.map(EntityMeta::Dataset),
        };

        let mut view = self.inner.view.lock();
        if view.state == ModelState::Disposed {
            return Err(ViewerError::Disposed);
        }
        if view.refresh_seq != seq {
            debug!(seq, latest = view.refresh_seq, "Dropping superseded initial metadata");
            return Ok(());
        }

        let meta = match entity {
            Ok(EntityMeta::Dataset(meta)) => meta,
            Ok(other) => {
                let message = format!("{} is a {}, not a dataset", self.inner.uri, other.kind());
                warn!(%message, "Cannot display object");
                self.inner
                    .events
                    .notify(Notification::ValidationFailed { message });
                DatasetMeta::empty()
            }
            Err(err) if err.is_reportable() => {
                warn!(error = %err, "Metadata request failed, showing an empty grid");
                self.report(&mut view, &err);
                DatasetMeta::empty()
            }
            Err(err) => {
                view.state = ModelState::Uninitialized;
                return Err(err.into());
            }
        };

        view.ixstr = default_ixstr(rank(&meta));
        view.meta_ix = meta.trailing_2d();
        view.meta = meta;
        self.apply_refresh(&mut view);
        info!(
            ixstr = %view.ixstr,
            n_rows = view.display.n_rows,
            n_cols = view.display.n_cols,
            "Viewer initialized"
        );
        drop(view);

        self.inner.ready.send_replace(true);
        Ok(())
    }

    /// Wait until the first [`init`](Self::init) has finished.
    pub async fn ready(&self) -> Result<()> {
        let mut rx = self.inner.ready.subscribe();
        rx.wait_for(|ready| *ready)
            .await
            .map_err(|_| ViewerError::Disposed)?;

        if self.state() == ModelState::Disposed {
            return Err(ViewerError::Disposed);
        }
        Ok(())
    }

    /// Switch the view to a new index expression.
    ///
    /// An expression that leaves more than two axes, or an object that is not
    /// a dataset, is rejected with [`ViewerError::Validation`]: the current
    /// view stays and `Refreshed` is re-sent with the current expression. A
    /// reportable service error collapses the view to empty. If another
    /// refresh starts before this one's metadata arrives, this one's result
    /// is discarded. Fails with [`ViewerError::NotInitialized`] until the
    /// first [`init`](Self::init) has finished.
    #[instrument(skip(self), fields(fpath = %self.inner.fpath, uri = %self.inner.uri))]
    pub async fn refresh(&self, ixstr: &str) -> Result<()> {
        let seq = {
            let mut view = self.inner.view.lock();
            match view.state {
                ModelState::Disposed => return Err(ViewerError::Disposed),
                ModelState::Uninitialized => return Err(ViewerError::NotInitialized),
                _ if !*self.inner.ready.borrow() => return Err(ViewerError::NotInitialized),
                _ => {}
            }
            view.refresh_seq += 1;
            view.state = ModelState::Loading;
            view.refresh_seq
        };

        let result = self
            .inner
            .service
            .get_meta(&self.inner.fpath, &self.inner.uri, Some(ixstr), None)
            .await;

        let mut view = self.inner.view.lock();
        if view.state == ModelState::Disposed {
            return Err(ViewerError::Disposed);
        }
        if view.refresh_seq != seq {
            debug!(seq, latest = view.refresh_seq, "Dropping superseded metadata");
            return Ok(());
        }

        match result {
            Ok(EntityMeta::Dataset(meta)) if rank(&meta) <= 2 => {
                view.ixstr = ixstr.to_string();
                view.meta_ix = meta;
                self.apply_refresh(&mut view);
                Ok(())
            }
            Ok(entity) => {
                let message = match &entity {
                    EntityMeta::Dataset(meta) => format!(
                        "index expression \"{}\" leaves {} dimensions, at most 2 can be displayed",
                        ixstr,
                        rank(meta)
                    ),
                    other => format!("{} is a {}, not a dataset", self.inner.uri, other.kind()),
                };
                warn!(%message, "Rejecting index expression");

                view.state = ModelState::Ready;
                self.inner.events.notify(Notification::ValidationFailed {
                    message: message.clone(),
                });
                self.inner.events.notify(Notification::Refreshed {
                    ixstr: view.ixstr.clone(),
                });
                Err(ViewerError::Validation(message))
            }
            Err(err) if err.is_reportable() => {
                warn!(error = %err, "Metadata request failed, collapsing view");
                self.report(&mut view, &err);
                view.ixstr = ixstr.to_string();
                view.meta_ix = DatasetMeta::empty();
                self.apply_refresh(&mut view);
                Ok(())
            }
            Err(err) => {
                view.state = ModelState::Ready;
                Err(err.into())
            }
        }
    }

    /// Settable-property form of [`refresh`](Self::refresh): runs it in the
    /// background and logs failures.
    pub fn set_ixstr(&self, ixstr: impl Into<String>) -> JoinHandle<()> {
        let model = self.clone();
        let ixstr = ixstr.into();

        tokio::spawn(async move {
            match model.refresh(&ixstr).await {
                Ok(()) => {}
                Err(ViewerError::Validation(message)) => {
                    debug!(ixstr = %ixstr, %message, "Index expression rejected")
                }
                Err(err) => error!(ixstr = %ixstr, error = %err, "Refresh failed"),
            }
        })
    }

    /// Rebuild the displayed grid from `meta_ix`.
    fn apply_refresh(&self, view: &mut ViewState) {
        let old_rows = view.display.n_rows;
        let old_cols = view.display.n_cols;

        view.display = derive_display_shape(&view.meta_ix);
        view.blocks.clear();
        view.generation += 1;
        view.state = ModelState::Ready;

        let new_rows = view.display.n_rows;
        let new_cols = view.display.n_cols;
        let events = &self.inner.events;
        events.changed(ChangedArgs::RowsRemoved { index: 0, span: old_rows });
        events.changed(ChangedArgs::ColumnsRemoved { index: 0, span: old_cols });
        events.changed(ChangedArgs::RowsInserted { index: 0, span: new_rows });
        events.changed(ChangedArgs::ColumnsInserted { index: 0, span: new_cols });
        events.changed(ChangedArgs::ModelReset);
        events.notify(Notification::Refreshed {
            ixstr: view.ixstr.clone(),
        });

        debug!(
            ixstr = %view.ixstr,
            n_rows = new_rows,
            n_cols = new_cols,
            generation = view.generation,
            "View rebuilt"
        );
    }

    /// Notify the user of a service error, once per generation.
    fn report(&self, view: &mut ViewState, err: &ServiceError) {
        if view.reported == Some(view.generation) {
            debug!(error = %err, "Error already reported for this view");
            return;
        }
        view.reported = Some(view.generation);
        self.inner
            .events
            .notify(Notification::Error(ErrorReport::from(err)));
    }

    /// Value of a body cell, or `None` if it is outside the grid or its block
    /// has not arrived yet. A miss on an absent block starts its fetch.
    pub fn get_cell(&self, row: u64, col: u64) -> Option<CellValue> {
        let mut view = self.inner.view.lock();
        if matches!(view.state, ModelState::Uninitialized | ModelState::Disposed)
            || !view.display.contains(row, col)
        {
            return None;
        }

        let block_size = self.inner.config.block_size;
        let key = self.inner.config.block_of(row, col);

        match view.blocks.lookup(&key, row % block_size, col % block_size) {
            Lookup::Ready(value) => value,
            Lookup::Pending => None,
            Lookup::Absent => {
                let Ok(runtime) = tokio::runtime::Handle::try_current() else {
                    warn!(row, col, "No tokio runtime, cannot fetch block");
                    return None;
                };

                if let Some(request) = self.begin_fetch(&mut view, key) {
                    let model = self.clone();
                    runtime.spawn(async move {
                        let key = request.key;
                        if let Err(err) = model.complete_fetch(request).await {
                            error!(
                                row_block = key.0,
                                col_block = key.1,
                                error = %err,
                                "Block request failed"
                            );
                        }
                    });
                }
                None
            }
        }
    }

    /// Fetch one block and wait for it.
    ///
    /// Returns `Ok(false)` without a request if the block lies outside the
    /// grid or is already pending or cached.
    #[instrument(skip(self), fields(fpath = %self.inner.fpath, uri = %self.inner.uri))]
    pub async fn fetch_block(&self, row_block: u64, col_block: u64) -> Result<bool> {
        let request = {
            let mut view = self.inner.view.lock();
            match view.state {
                ModelState::Disposed => return Err(ViewerError::Disposed),
                ModelState::Uninitialized => return Err(ViewerError::NotInitialized),
                _ => {}
            }

            let block_size = self.inner.config.block_size;
            let first_row = row_block.saturating_mul(block_size);
            let first_col = col_block.saturating_mul(block_size);
            if !view.display.contains(first_row, first_col) {
                return Ok(false);
            }

            match self.begin_fetch(&mut view, (row_block, col_block)) {
                Some(request) => request,
                None => return Ok(false),
            }
        };

        self.complete_fetch(request).await?;
        Ok(true)
    }

    fn begin_fetch(&self, view: &mut ViewState, key: BlockKey) -> Option<BlockRequest> {
        if !view.blocks.mark_pending(key) {
            return None;
        }

        let region = BlockRegion::for_block(key, self.inner.config.block_size, &view.display);
        Some(BlockRequest {
            key,
            subixstr: region.sub_index(view.display.has_sub_axis),
            region,
            generation: view.generation,
            ixstr: view.ixstr.clone(),
            is_complex: view.meta.is_complex() || view.meta_ix.is_complex(),
        })
    }

    async fn complete_fetch(&self, request: BlockRequest) -> Result<()> {
        let (row_block, col_block) = request.key;
        debug!(row_block, col_block, subixstr = %request.subixstr, "Fetching block");

        let result = self
            .inner
            .service
            .get_data(
                &self.inner.fpath,
                &self.inner.uri,
                Some(&request.ixstr),
                Some(&request.subixstr),
                Some(self.inner.config.min_ndim),
            )
            .await;

        let mut view = self.inner.view.lock();
        if view.state == ModelState::Disposed || view.generation != request.generation {
            debug!(
                row_block,
                col_block,
                generation = request.generation,
                current = view.generation,
                "Dropping stale block"
            );
            return Ok(());
        }

        match result {
            Ok(payload) => {
                let block = Block::from_payload(payload, request.is_complex);
                if view.blocks.fulfill(request.key, block) {
                    self.inner.events.changed(ChangedArgs::CellsChanged {
                        row: request.region.rows.start as u64,
                        column: request.region.cols.start as u64,
                        row_span: request.region.row_span(),
                        column_span: request.region.col_span(),
                    });
                }
                Ok(())
            }
            Err(err) if err.is_reportable() => {
                warn!(row_block, col_block, error = %err, "Block request failed, collapsing view");
                self.report(&mut view, &err);
                view.meta_ix = DatasetMeta::empty();
                self.apply_refresh(&mut view);
                Ok(())
            }
            Err(err) => Err(err.into()),
        }
    }

    /// Cell lookup for every region of the grid.
    ///
    /// Headers show `label.start + index * label.step`; the corner is an
    /// empty string.
    pub fn data(&self, region: CellRegion, row: u64, col: u64) -> Option<CellValue> {
        match region {
            CellRegion::Body => self.get_cell(row, col),
            CellRegion::RowHeader => {
                let view = self.inner.view.lock();
                (row < view.display.n_rows)
                    .then(|| Value::String(view.display.row_label.label(row).to_string()))
            }
            CellRegion::ColumnHeader => {
                let view = self.inner.view.lock();
                (col < view.display.n_cols)
                    .then(|| Value::String(view.display.col_label.label(col).to_string()))
            }
            CellRegion::CornerHeader => Some(Value::String(String::new())),
        }
    }

    pub fn row_count(&self, region: RowRegion) -> u64 {
        let view = self.inner.view.lock();
        match region {
            RowRegion::Body => view.display.n_rows,
            RowRegion::ColumnHeader => view.display.n_col_headers,
        }
    }

    pub fn column_count(&self, region: ColumnRegion) -> u64 {
        let view = self.inner.view.lock();
        match region {
            ColumnRegion::Body => view.display.n_cols,
            ColumnRegion::RowHeader => view.display.n_row_headers,
        }
    }

    /// Stop serving the dataset. Late responses are dropped.
    pub fn dispose(&self) {
        {
            let mut view = self.inner.view.lock();
            if view.state == ModelState::Disposed {
                return;
            }
            view.state = ModelState::Disposed;
            view.blocks.clear();
            view.generation += 1;
        }
        self.inner.ready.send_replace(true);
        info!(fpath = %self.inner.fpath, uri = %self.inner.uri, "Viewer disposed");
    }

    pub fn subscribe_changes(&self) -> broadcast::Receiver<ChangedArgs> {
        self.inner.events.subscribe_changes()
    }

    pub fn subscribe_notifications(&self) -> broadcast::Receiver<Notification> {
        self.inner.events.subscribe_notifications()
    }

    pub fn state(&self) -> ModelState {
        self.inner.view.lock().state
    }

    pub fn ixstr(&self) -> String {
        self.inner.view.lock().ixstr.clone()
    }

    /// Metadata of the whole dataset.
    pub fn meta(&self) -> DatasetMeta {
        self.inner.view.lock().meta.clone()
    }

    /// Metadata of the current view.
    pub fn meta_ix(&self) -> DatasetMeta {
        self.inner.view.lock().meta_ix.clone()
    }

    pub fn display_shape(&self) -> DisplayShape {
        self.inner.view.lock().display.clone()
    }

    pub fn generation(&self) -> u64 {
        self.inner.view.lock().generation
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.inner.view.lock().blocks.stats()
    }

    pub fn config(&self) -> &ViewerConfig {
        &self.inner.config
    }

    pub fn fpath(&self) -> &str {
        &self.inner.fpath
    }

    pub fn uri(&self) -> &str {
        &self.inner.uri
    }
}
