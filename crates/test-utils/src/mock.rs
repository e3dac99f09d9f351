//! In-memory implementation of the HDF5 dataset service.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use hdf_client::{HdfService, Result, ServiceError};
use hdf_common::{ContentsEntry, DatasetMeta, EntityKind, EntityMeta, GroupMeta, HdfErrorPayload};
use parking_lot::Mutex;
use serde_json::Value;
use tokio::sync::Notify;

use crate::selection::{materialize, narrow, select, visible_shape};

type ValueFn = Arc<dyn Fn(&[u64]) -> Value + Send + Sync>;

/// A dataset whose values are computed from their index.
#[derive(Clone)]
pub struct MockDataset {
    pub name: String,
    pub dtype: String,
    pub shape: Vec<u64>,
    values: ValueFn,
}

impl MockDataset {
    pub fn new(
        name: impl Into<String>,
        dtype: impl Into<String>,
        shape: Vec<u64>,
        values: impl Fn(&[u64]) -> Value + Send + Sync + 'static,
    ) -> Self {
        Self {
            name: name.into(),
            dtype: dtype.into(),
            shape,
            values: Arc::new(values),
        }
    }

    /// Metadata of the view selected by `ixstr`.
    pub fn meta(&self, ixstr: Option<&str>) -> std::result::Result<DatasetMeta, String> {
        let axes = select(&self.shape, ixstr.unwrap_or(""))?;
        let shape = visible_shape(&axes);
        let size = if self.shape.contains(&0) {
            0
        } else {
            shape.iter().product()
        };

        Ok(DatasetMeta {
            name: self.name.clone(),
            dtype: self.dtype.clone(),
            ndim: shape.len(),
            size,
            labels: axes.iter().filter_map(|axis| axis.label()).collect(),
            shape,
            attributes: Vec::new(),
        })
    }

    /// Values of the view selected by `ixstr` and narrowed by `subixstr`,
    /// padded with leading unit axes up to `min_ndim`.
    pub fn data(
        &self,
        ixstr: Option<&str>,
        subixstr: Option<&str>,
        min_ndim: Option<usize>,
    ) -> std::result::Result<Value, String> {
        let view = select(&self.shape, ixstr.unwrap_or(""))?;
        let axes = narrow(&view, subixstr.unwrap_or(""))?;

        let mut value = materialize(&axes, self.values.as_ref());
        for _ in visible_shape(&axes).len()..min_ndim.unwrap_or(0) {
            value = Value::Array(vec![value]);
        }
        Ok(value)
    }
}

/// Service endpoints, for call accounting and fault injection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Endpoint {
    Contents,
    Meta,
    Data,
    Attrs,
    Snippet,
}

/// One recorded service call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MockCall {
    pub endpoint: Endpoint,
    pub uri: String,
    pub ixstr: Option<String>,
    pub subixstr: Option<String>,
    pub min_ndim: Option<usize>,
}

/// An error the mock should answer with.
#[derive(Debug, Clone)]
pub enum MockFailure {
    /// A domain error with a diagnostic payload.
    Hdf(String),
    /// A non-200 response without a domain payload.
    Response(u16, String),
    /// A 200 response whose body does not decode.
    Decode,
}

impl MockFailure {
    fn to_error(&self) -> ServiceError {
        match self {
            MockFailure::Hdf(message) => hdf_error(message),
            MockFailure::Response(status, body) => ServiceError::from_response(*status, body.clone()),
            MockFailure::Decode => match serde_json::from_str::<Value>("{not json") {
                Err(err) => ServiceError::Decode(err),
                Ok(_) => ServiceError::InvalidRequest("undecodable body decoded".to_string()),
            },
        }
    }
}

fn hdf_error(message: &str) -> ServiceError {
    ServiceError::Hdf(HdfErrorPayload {
        message: message.to_string(),
        debug_vars: Default::default(),
        traceback: String::new(),
    })
}

/// Holds back one call until released.
///
/// Releasing before the call arrives lets it through immediately.
#[derive(Clone, Default)]
pub struct Gate {
    notify: Arc<Notify>,
}

impl Gate {
    pub fn release(&self) {
        self.notify.notify_one();
    }
}

/// In-memory [`HdfService`] with call accounting, gated responses and
/// fault injection.
#[derive(Default)]
pub struct MockHdfService {
    datasets: Mutex<HashMap<String, MockDataset>>,
    groups: Mutex<HashMap<String, Vec<String>>>,
    attrs: Mutex<HashMap<String, BTreeMap<String, Value>>>,
    failures: Mutex<HashMap<Endpoint, MockFailure>>,
    gates: Mutex<HashMap<(Endpoint, String), Gate>>,
    calls: Mutex<Vec<MockCall>>,
}

impl MockHdfService {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_dataset(self, uri: impl Into<String>, dataset: MockDataset) -> Self {
        self.add_dataset(uri, dataset);
        self
    }

    pub fn with_group(self, uri: impl Into<String>, children: &[&str]) -> Self {
        self.groups
            .lock()
            .insert(uri.into(), children.iter().map(|c| c.to_string()).collect());
        self
    }

    pub fn with_attrs(self, uri: impl Into<String>, attrs: BTreeMap<String, Value>) -> Self {
        self.attrs.lock().insert(uri.into(), attrs);
        self
    }

    pub fn add_dataset(&self, uri: impl Into<String>, dataset: MockDataset) {
        self.datasets.lock().insert(uri.into(), dataset);
    }

    /// Answer every call to `endpoint` with `failure` until cleared.
    pub fn fail(&self, endpoint: Endpoint, failure: MockFailure) {
        self.failures.lock().insert(endpoint, failure);
    }

    pub fn clear_failures(&self) {
        self.failures.lock().clear();
    }

    /// Hold the next call to `endpoint` whose `ixstr` equals `ixstr` until
    /// the returned gate is released.
    pub fn hold(&self, endpoint: Endpoint, ixstr: &str) -> Gate {
        let gate = Gate::default();
        self.gates
            .lock()
            .insert((endpoint, ixstr.to_string()), gate.clone());
        gate
    }

    pub fn calls(&self, endpoint: Endpoint) -> Vec<MockCall> {
        self.calls
            .lock()
            .iter()
            .filter(|call| call.endpoint == endpoint)
            .cloned()
            .collect()
    }

    pub fn call_count(&self, endpoint: Endpoint) -> usize {
        self.calls
            .lock()
            .iter()
            .filter(|call| call.endpoint == endpoint)
            .count()
    }

    /// Wait until at least `count` calls to `endpoint` were made.
    ///
    /// Panics after five seconds.
    pub async fn wait_for_calls(&self, endpoint: Endpoint, count: usize) {
        let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
        while self.call_count(endpoint) < count {
            if tokio::time::Instant::now() > deadline {
                panic!(
                    "timed out waiting for {} {:?} calls, saw {}",
                    count,
                    endpoint,
                    self.call_count(endpoint)
                );
            }
            tokio::time::sleep(Duration::from_millis(2)).await;
        }
    }

    /// Record the call, wait at its gate if one is set, then return the
    /// injected failure if any.
    async fn enter(&self, call: MockCall) -> Result<()> {
        let gate_key = (call.endpoint, call.ixstr.clone().unwrap_or_default());
        let endpoint = call.endpoint;
        self.calls.lock().push(call);

        let gate = self.gates.lock().remove(&gate_key);
        if let Some(gate) = gate {
            gate.notify.notified().await;
        }

        let failure = self.failures.lock().get(&endpoint).cloned();
        match failure {
            Some(failure) => Err(failure.to_error()),
            None => Ok(()),
        }
    }

    fn dataset(&self, uri: &str) -> Option<MockDataset> {
        self.datasets.lock().get(uri).cloned()
    }

    fn kind_of(&self, uri: &str) -> Option<EntityKind> {
        if self.datasets.lock().contains_key(uri) {
            Some(EntityKind::Dataset)
        } else if self.groups.lock().contains_key(uri) {
            Some(EntityKind::Group)
        } else {
            None
        }
    }
}

fn not_found(uri: &str) -> ServiceError {
    hdf_error(&format!("no object at uri {}", uri))
}

fn base_name(uri: &str) -> String {
    uri.rsplit('/').next().unwrap_or_default().to_string()
}

#[async_trait]
impl HdfService for MockHdfService {
    async fn get_contents(&self, _fpath: &str, uri: &str) -> Result<Vec<ContentsEntry>> {
        self.enter(MockCall {
            endpoint: Endpoint::Contents,
            uri: uri.to_string(),
            ixstr: None,
            subixstr: None,
            min_ndim: None,
        })
        .await?;

        if let Some(dataset) = self.dataset(uri) {
            return Ok(vec![ContentsEntry {
                name: dataset.name.clone(),
                uri: uri.to_string(),
                kind: EntityKind::Dataset,
                content: Some(dataset.meta(None).map_err(|e| hdf_error(&e))?),
            }]);
        }

        let children = self.groups.lock().get(uri).cloned().ok_or_else(|| not_found(uri))?;
        Ok(children
            .iter()
            .filter_map(|child| {
                self.kind_of(child).map(|kind| ContentsEntry {
                    name: base_name(child),
                    uri: child.clone(),
                    kind,
                    content: None,
                })
            })
            .collect())
    }

    async fn get_meta(
        &self,
        _fpath: &str,
        uri: &str,
        ixstr: Option<&str>,
        min_ndim: Option<usize>,
    ) -> Result<EntityMeta> {
        self.enter(MockCall {
            endpoint: Endpoint::Meta,
            uri: uri.to_string(),
            ixstr: ixstr.map(String::from),
            subixstr: None,
            min_ndim,
        })
        .await?;

        if let Some(dataset) = self.dataset(uri) {
            return dataset
                .meta(ixstr)
                .map(EntityMeta::Dataset)
                .map_err(|e| hdf_error(&e));
        }

        let children = self.groups.lock().get(uri).cloned().ok_or_else(|| not_found(uri))?;
        Ok(EntityMeta::Group(GroupMeta {
            name: base_name(uri),
            attributes: Vec::new(),
            children_count: Some(children.len() as u64),
            children: Vec::new(),
        }))
    }

    async fn get_data(
        &self,
        _fpath: &str,
        uri: &str,
        ixstr: Option<&str>,
        subixstr: Option<&str>,
        min_ndim: Option<usize>,
    ) -> Result<Value> {
        self.enter(MockCall {
            endpoint: Endpoint::Data,
            uri: uri.to_string(),
            ixstr: ixstr.map(String::from),
            subixstr: subixstr.map(String::from),
            min_ndim,
        })
        .await?;

        let dataset = self.dataset(uri).ok_or_else(|| not_found(uri))?;
        dataset
            .data(ixstr, subixstr, min_ndim)
            .map_err(|e| hdf_error(&e))
    }

    async fn get_attrs(
        &self,
        _fpath: &str,
        uri: &str,
        attr_keys: Option<&[String]>,
    ) -> Result<BTreeMap<String, Value>> {
        self.enter(MockCall {
            endpoint: Endpoint::Attrs,
            uri: uri.to_string(),
            ixstr: None,
            subixstr: None,
            min_ndim: None,
        })
        .await?;

        if self.kind_of(uri).is_none() {
            return Err(not_found(uri));
        }

        let attrs = self.attrs.lock().get(uri).cloned().unwrap_or_default();
        Ok(match attr_keys {
            Some(keys) => attrs
                .into_iter()
                .filter(|(name, _)| keys.contains(name))
                .collect(),
            None => attrs,
        })
    }

    async fn get_snippet(&self, fpath: &str, uri: &str) -> Result<String> {
        self.enter(MockCall {
            endpoint: Endpoint::Snippet,
            uri: uri.to_string(),
            ixstr: None,
            subixstr: None,
            min_ndim: None,
        })
        .await?;

        if self.kind_of(uri).is_none() {
            return Err(not_found(uri));
        }

        Ok(format!("with h5py.File('{fpath}', 'r') as f:\n    data = f['{uri}']"))
    }
}
