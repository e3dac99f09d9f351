//! Integration tests: ViewerModel against the in-memory dataset service.
//!
//! Cell values follow the positional pattern of the sample datasets, so the
//! expected value of `[row, col]` in the 2-D grid is `row * 1000 + col`.

use std::sync::Arc;
use std::time::Duration;

use dataset_viewer::{
    CellRegion, ChangedArgs, ColumnRegion, MetaSource, ModelState, Notification, RowRegion,
    ViewerConfig, ViewerError, ViewerModel,
};
use hdf_client::ServiceError;
use serde_json::json;
use test_utils::{
    fixtures, recv_within, sample_service, uris, Endpoint, MockFailure, MockHdfService,
    SAMPLE_FPATH,
};
use tokio::sync::broadcast;

async fn open(service: &Arc<MockHdfService>, uri: &str) -> ViewerModel {
    open_with(service, uri, ViewerConfig::default()).await
}

async fn open_with(service: &Arc<MockHdfService>, uri: &str, config: ViewerConfig) -> ViewerModel {
    let model = ViewerModel::new(service.clone(), SAMPLE_FPATH, uri, config).unwrap();
    model.init(MetaSource::Service).await.unwrap();
    model
}

/// Skip structural changes until the next `CellsChanged`.
async fn next_cells_changed(rx: &mut broadcast::Receiver<ChangedArgs>) -> ChangedArgs {
    loop {
        let change = recv_within!(rx);
        if matches!(change, ChangedArgs::CellsChanged { .. }) {
            return change;
        }
    }
}

fn drain<T: Clone>(rx: &mut broadcast::Receiver<T>) -> Vec<T> {
    let mut items = Vec::new();
    while let Ok(item) = rx.try_recv() {
        items.push(item);
    }
    items
}

// ============================================================================
// Block cache
// ============================================================================

#[tokio::test]
async fn test_block_is_fetched_once() {
    let service = Arc::new(sample_service());
    let model = open(&service, uris::GRID).await;
    let mut changes = model.subscribe_changes();

    assert_eq!(model.get_cell(12, 50), None);
    assert_eq!(model.get_cell(13, 51), None);

    assert_eq!(
        next_cells_changed(&mut changes).await,
        ChangedArgs::CellsChanged {
            row: 0,
            column: 0,
            row_span: 100,
            column_span: 100,
        }
    );

    assert_eq!(model.get_cell(12, 50), Some(json!(12050)));
    assert_eq!(model.get_cell(99, 99), Some(json!(99099)));
    assert_eq!(model.get_cell(0, 0), Some(json!(0)));

    let calls = service.calls(Endpoint::Data);
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].ixstr.as_deref(), Some(":, :"));
    assert_eq!(calls[0].subixstr.as_deref(), Some("0:100, 0:100"));
    assert_eq!(calls[0].min_ndim, Some(2));

    let stats = model.cache_stats();
    assert_eq!(stats.fetches, 1);
    assert_eq!(stats.entries, 1);
    assert_eq!(stats.pending, 0);
}

#[tokio::test]
async fn test_edge_block_is_clamped() {
    let service = Arc::new(sample_service());
    let model = open(&service, uris::GRID).await;

    assert!(model.fetch_block(2, 1).await.unwrap());
    assert!(!model.fetch_block(2, 1).await.unwrap());

    let calls = service.calls(Endpoint::Data);
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].subixstr.as_deref(), Some("200:250, 100:120"));
    assert_eq!(model.get_cell(249, 119), Some(json!(249119)));
}

#[tokio::test]
async fn test_cells_outside_the_grid_never_fetch() {
    let service = Arc::new(sample_service());
    let model = open(&service, uris::GRID).await;

    assert_eq!(model.get_cell(250, 0), None);
    assert_eq!(model.get_cell(0, 120), None);
    assert!(!model.fetch_block(3, 0).await.unwrap());

    tokio::time::sleep(Duration::from_millis(20)).await;
    assert_eq!(service.call_count(Endpoint::Data), 0);
}

#[tokio::test]
async fn test_evicted_block_is_fetched_again() {
    let service = Arc::new(sample_service());
    let config = ViewerConfig {
        max_cached_blocks: 1,
        ..ViewerConfig::default()
    };
    let model = open_with(&service, uris::GRID, config).await;

    model.fetch_block(0, 0).await.unwrap();
    model.fetch_block(1, 0).await.unwrap();
    assert_eq!(model.cache_stats().evictions, 1);

    assert!(model.fetch_block(0, 0).await.unwrap());
    assert_eq!(service.call_count(Endpoint::Data), 3);
    assert_eq!(model.get_cell(5, 5), Some(json!(5005)));
}

// ============================================================================
// Scenarios by rank
// ============================================================================

#[tokio::test]
async fn test_scalar_dataset() {
    let service = Arc::new(sample_service());
    let model = open(&service, uris::SCALAR).await;
    let mut changes = model.subscribe_changes();

    assert_eq!(model.ixstr(), "");
    assert_eq!(model.row_count(RowRegion::Body), 1);
    assert_eq!(model.column_count(ColumnRegion::Body), 1);
    assert_eq!(model.row_count(RowRegion::ColumnHeader), 0);
    assert_eq!(model.column_count(ColumnRegion::RowHeader), 0);

    assert_eq!(model.get_cell(0, 0), None);
    assert_eq!(
        next_cells_changed(&mut changes).await,
        ChangedArgs::CellsChanged {
            row: 0,
            column: 0,
            row_span: 1,
            column_span: 1,
        }
    );

    let calls = service.calls(Endpoint::Data);
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].subixstr.as_deref(), Some(""));
    assert_eq!(model.get_cell(0, 0), Some(json!(42.5)));
}

#[tokio::test]
async fn test_one_dimensional_dataset() {
    let service = Arc::new(sample_service());
    let model = open(&service, uris::LINE).await;
    let mut changes = model.subscribe_changes();

    assert_eq!(model.ixstr(), ":");
    assert_eq!(model.row_count(RowRegion::Body), 1);
    assert_eq!(model.column_count(ColumnRegion::Body), 500);
    assert_eq!(model.column_count(ColumnRegion::RowHeader), 1);
    assert_eq!(model.row_count(RowRegion::ColumnHeader), 0);

    assert_eq!(model.get_cell(0, 150), None);
    assert_eq!(model.get_cell(0, 199), None);
    assert_eq!(
        next_cells_changed(&mut changes).await,
        ChangedArgs::CellsChanged {
            row: 0,
            column: 100,
            row_span: 1,
            column_span: 100,
        }
    );

    let calls = service.calls(Endpoint::Data);
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].subixstr.as_deref(), Some("100:200"));

    assert_eq!(model.get_cell(0, 150), Some(json!(150)));
    assert_eq!(model.data(CellRegion::ColumnHeader, 0, 150), Some(json!("150")));
    assert_eq!(model.data(CellRegion::RowHeader, 0, 0), Some(json!("0")));
}

#[tokio::test]
async fn test_high_rank_dataset_opens_on_trailing_axes() {
    let service = Arc::new(sample_service());
    let model = open(&service, uris::CUBE).await;

    assert_eq!(model.ixstr(), "0, :, :");
    assert_eq!(model.meta().ndim, 3);
    assert_eq!(model.row_count(RowRegion::Body), 40);
    assert_eq!(model.column_count(ColumnRegion::Body), 50);

    model.fetch_block(0, 0).await.unwrap();
    assert_eq!(model.get_cell(2, 3), Some(json!(2003)));
}

#[tokio::test]
async fn test_complex_values_are_formatted() {
    let service = Arc::new(sample_service());
    let model = open(&service, uris::COMPLEX).await;

    model.fetch_block(0, 0).await.unwrap();
    assert_eq!(model.get_cell(0, 0), Some(json!("0+0i")));
    assert_eq!(model.get_cell(0, 1), Some(json!("1-1i")));
    assert_eq!(model.get_cell(1, 0), Some(json!("1000-1000i")));
}

#[tokio::test]
async fn test_empty_dataset() {
    let service = Arc::new(sample_service());
    let model = open(&service, uris::EMPTY).await;

    assert_eq!(model.row_count(RowRegion::Body), 0);
    assert_eq!(model.column_count(ColumnRegion::Body), 0);
    assert_eq!(model.get_cell(0, 0), None);
}

// ============================================================================
// Refresh
// ============================================================================

#[tokio::test]
async fn test_refresh_emits_changes_in_order() {
    let service = Arc::new(sample_service());
    let model = open(&service, uris::GRID).await;
    let mut changes = model.subscribe_changes();
    let mut notifications = model.subscribe_notifications();

    model.refresh("5:15, 0:20").await.unwrap();

    assert_eq!(
        drain(&mut changes),
        vec![
            ChangedArgs::RowsRemoved { index: 0, span: 250 },
            ChangedArgs::ColumnsRemoved { index: 0, span: 120 },
            ChangedArgs::RowsInserted { index: 0, span: 10 },
            ChangedArgs::ColumnsInserted { index: 0, span: 20 },
            ChangedArgs::ModelReset,
        ]
    );
    assert_eq!(
        drain(&mut notifications),
        vec![Notification::Refreshed {
            ixstr: "5:15, 0:20".to_string()
        }]
    );

    assert_eq!(model.ixstr(), "5:15, 0:20");
    assert_eq!(model.data(CellRegion::RowHeader, 0, 0), Some(json!("5")));

    model.fetch_block(0, 0).await.unwrap();
    assert_eq!(model.get_cell(0, 3), Some(json!(5003)));
}

#[tokio::test]
async fn test_rank_three_refresh_is_rejected_once() {
    let service = Arc::new(sample_service());
    let model = open(&service, uris::CUBE).await;
    model.refresh("1, :, :").await.unwrap();
    model.fetch_block(0, 0).await.unwrap();
    let generation = model.generation();

    let mut changes = model.subscribe_changes();
    let mut notifications = model.subscribe_notifications();

    let err = model.refresh(":, :, :").await.unwrap_err();
    assert!(matches!(err, ViewerError::Validation(_)));

    let seen = drain(&mut notifications);
    let failures = seen
        .iter()
        .filter(|n| matches!(n, Notification::ValidationFailed { .. }))
        .count();
    assert_eq!(failures, 1);
    assert_eq!(
        seen.last(),
        Some(&Notification::Refreshed {
            ixstr: "1, :, :".to_string()
        })
    );
    assert!(drain(&mut changes).is_empty());

    assert_eq!(model.ixstr(), "1, :, :");
    assert_eq!(model.generation(), generation);
    assert_eq!(model.row_count(RowRegion::Body), 40);
    assert_eq!(model.get_cell(2, 3), Some(json!(1_002_003)));
}

#[tokio::test]
async fn test_superseded_refresh_is_discarded() {
    let service = Arc::new(sample_service());
    let model = open(&service, uris::CUBE).await;

    let gate = service.hold(Endpoint::Meta, "1, :, :");
    let slow = {
        let model = model.clone();
        tokio::spawn(async move { model.refresh("1, :, :").await })
    };
    service.wait_for_calls(Endpoint::Meta, 2).await;

    model.refresh("2, 0:10, :").await.unwrap();
    gate.release();
    slow.await.unwrap().unwrap();

    assert_eq!(model.ixstr(), "2, 0:10, :");
    assert_eq!(model.row_count(RowRegion::Body), 10);
}

#[tokio::test]
async fn test_late_block_from_previous_view_is_dropped() {
    let service = Arc::new(sample_service());
    let model = open(&service, uris::CUBE).await;

    let gate = service.hold(Endpoint::Data, "0, :, :");
    let stale = {
        let model = model.clone();
        tokio::spawn(async move { model.fetch_block(0, 0).await })
    };
    service.wait_for_calls(Endpoint::Data, 1).await;

    model.refresh("1, :, :").await.unwrap();
    gate.release();
    assert!(stale.await.unwrap().unwrap());

    let stats = model.cache_stats();
    assert_eq!(stats.entries, 0);
    assert_eq!(stats.pending, 0);

    let mut changes = model.subscribe_changes();
    assert_eq!(model.get_cell(1, 1), None);
    next_cells_changed(&mut changes).await;
    assert_eq!(model.get_cell(1, 1), Some(json!(1_001_001)));

    let calls = service.calls(Endpoint::Data);
    assert_eq!(calls.len(), 2);
    assert_eq!(calls[1].ixstr.as_deref(), Some("1, :, :"));
}

#[tokio::test]
async fn test_set_ixstr_refreshes_in_background() {
    let service = Arc::new(sample_service());
    let model = open(&service, uris::CUBE).await;

    model.set_ixstr("1, 0:5, 0:5").await.unwrap();
    assert_eq!(model.row_count(RowRegion::Body), 5);
    assert_eq!(model.column_count(ColumnRegion::Body), 5);

    // Rejections are logged, not propagated.
    model.set_ixstr(":, :, :").await.unwrap();
    assert_eq!(model.ixstr(), "1, 0:5, 0:5");
}

// ============================================================================
// Errors
// ============================================================================

#[tokio::test]
async fn test_metadata_error_collapses_view() {
    let service = Arc::new(sample_service());
    let model = open(&service, uris::GRID).await;
    let mut notifications = model.subscribe_notifications();

    service.fail(Endpoint::Meta, MockFailure::Response(500, "boom".to_string()));
    model.refresh("0:10, :").await.unwrap();

    assert_eq!(model.state(), ModelState::Ready);
    assert_eq!(model.ixstr(), "0:10, :");
    assert_eq!(model.row_count(RowRegion::Body), 0);

    let seen = drain(&mut notifications);
    match &seen[0] {
        Notification::Error(report) => {
            assert_eq!(report.status, Some(500));
            assert_eq!(report.message, "boom");
        }
        other => panic!("expected an error report, got {:?}", other),
    }

    service.clear_failures();
    model.refresh(":, :").await.unwrap();
    assert_eq!(model.row_count(RowRegion::Body), 250);
}

#[tokio::test]
async fn test_block_error_collapses_view_and_reports_once() {
    let service = Arc::new(sample_service());
    let model = open(&service, uris::GRID).await;
    let mut changes = model.subscribe_changes();
    let mut notifications = model.subscribe_notifications();

    service.fail(Endpoint::Data, MockFailure::Hdf("bad selection".to_string()));
    assert_eq!(model.get_cell(0, 0), None);
    assert_eq!(model.get_cell(150, 0), None);

    loop {
        if recv_within!(changes) == ChangedArgs::ModelReset {
            break;
        }
    }
    tokio::time::sleep(Duration::from_millis(20)).await;

    assert_eq!(model.row_count(RowRegion::Body), 0);
    assert_eq!(model.column_count(ColumnRegion::Body), 0);

    let errors: Vec<_> = drain(&mut notifications)
        .into_iter()
        .filter(|n| matches!(n, Notification::Error(_)))
        .collect();
    assert_eq!(errors.len(), 1);
    match &errors[0] {
        Notification::Error(report) => assert_eq!(report.message, "bad selection"),
        _ => unreachable!(),
    }
}

#[tokio::test]
async fn test_unexpected_metadata_error_is_propagated() {
    let service = Arc::new(sample_service());
    let model = open(&service, uris::GRID).await;
    let mut notifications = model.subscribe_notifications();

    service.fail(Endpoint::Meta, MockFailure::Decode);
    let err = model.refresh("0:10, :").await.unwrap_err();
    assert!(matches!(err, ViewerError::Service(ServiceError::Decode(_))));

    assert_eq!(model.state(), ModelState::Ready);
    assert_eq!(model.ixstr(), ":, :");
    assert_eq!(model.row_count(RowRegion::Body), 250);
    assert!(drain(&mut notifications).is_empty());
}

#[tokio::test]
async fn test_unexpected_block_error_leaves_block_pending() {
    let service = Arc::new(sample_service());
    let model = open(&service, uris::GRID).await;

    service.fail(Endpoint::Data, MockFailure::Decode);
    let err = model.fetch_block(0, 0).await.unwrap_err();
    assert!(matches!(err, ViewerError::Service(_)));

    assert_eq!(model.cache_stats().pending, 1);
    assert_eq!(model.get_cell(0, 0), None);
    tokio::time::sleep(Duration::from_millis(20)).await;
    assert_eq!(service.call_count(Endpoint::Data), 1);
}

// ============================================================================
// Lifecycle
// ============================================================================

#[tokio::test]
async fn test_init_from_deferred_source() {
    let service = Arc::new(sample_service());
    let model = ViewerModel::new(service.clone(), SAMPLE_FPATH, uris::LINE, ViewerConfig::default())
        .unwrap();

    let meta = fixtures::line_dataset().meta(None).unwrap();
    let waiter = {
        let model = model.clone();
        tokio::spawn(async move { model.ready().await })
    };

    model
        .init(MetaSource::deferred(async move { Ok(meta) }))
        .await
        .unwrap();
    waiter.await.unwrap().unwrap();

    assert_eq!(model.column_count(ColumnRegion::Body), 500);
    assert_eq!(service.call_count(Endpoint::Meta), 0);
}

#[tokio::test]
async fn test_refresh_waits_for_first_init() {
    let service = Arc::new(sample_service());
    let model = ViewerModel::new(service.clone(), SAMPLE_FPATH, uris::CUBE, ViewerConfig::default())
        .unwrap();

    let gate = service.hold(Endpoint::Meta, "");
    let init = {
        let model = model.clone();
        tokio::spawn(async move { model.init(MetaSource::Service).await })
    };
    service.wait_for_calls(Endpoint::Meta, 1).await;

    assert!(matches!(
        model.refresh("2, 0:10, :").await,
        Err(ViewerError::NotInitialized)
    ));

    gate.release();
    init.await.unwrap().unwrap();
    assert_eq!(model.ixstr(), "0, :, :");
    assert_eq!(model.row_count(RowRegion::Body), 40);

    model.refresh("2, 0:10, :").await.unwrap();
    assert_eq!(model.row_count(RowRegion::Body), 10);
}

#[tokio::test]
async fn test_reinit_is_superseded_by_refresh() {
    let service = Arc::new(sample_service());
    let model = open(&service, uris::CUBE).await;

    let gate = service.hold(Endpoint::Meta, "");
    let reinit = {
        let model = model.clone();
        tokio::spawn(async move { model.init(MetaSource::Service).await })
    };
    service.wait_for_calls(Endpoint::Meta, 2).await;

    model.refresh("2, 0:10, :").await.unwrap();
    gate.release();
    reinit.await.unwrap().unwrap();

    assert_eq!(model.ixstr(), "2, 0:10, :");
    assert_eq!(model.row_count(RowRegion::Body), 10);
}

#[tokio::test]
async fn test_default_view_uses_shape_rank_when_ndim_is_missing() {
    let service = Arc::new(sample_service());
    let model = ViewerModel::new(service.clone(), SAMPLE_FPATH, uris::CUBE, ViewerConfig::default())
        .unwrap();

    let mut meta = fixtures::cube_dataset().meta(None).unwrap();
    meta.ndim = 0;
    model.init(MetaSource::Provided(meta)).await.unwrap();

    assert_eq!(model.ixstr(), "0, :, :");
    assert_eq!(model.row_count(RowRegion::Body), 40);
    assert_eq!(model.column_count(ColumnRegion::Body), 50);
}

#[tokio::test]
async fn test_init_on_group_shows_empty_grid() {
    let service = Arc::new(sample_service());
    let model = ViewerModel::new(service.clone(), SAMPLE_FPATH, uris::NESTED, ViewerConfig::default())
        .unwrap();
    let mut notifications = model.subscribe_notifications();

    model.init(MetaSource::Service).await.unwrap();

    assert_eq!(model.state(), ModelState::Ready);
    assert_eq!(model.row_count(RowRegion::Body), 0);
    assert!(matches!(
        drain(&mut notifications).first(),
        Some(Notification::ValidationFailed { .. })
    ));
}

#[tokio::test]
async fn test_dispose_drops_late_block() {
    let service = Arc::new(sample_service());
    let model = open(&service, uris::GRID).await;

    let gate = service.hold(Endpoint::Data, ":, :");
    assert_eq!(model.get_cell(0, 0), None);
    service.wait_for_calls(Endpoint::Data, 1).await;

    model.dispose();
    gate.release();
    tokio::time::sleep(Duration::from_millis(20)).await;

    assert_eq!(model.state(), ModelState::Disposed);
    assert_eq!(model.cache_stats().entries, 0);
    assert!(matches!(model.refresh(":, :").await, Err(ViewerError::Disposed)));
}
