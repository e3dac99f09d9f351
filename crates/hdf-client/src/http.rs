//! `reqwest` implementation of [`HdfService`].

use std::collections::BTreeMap;

use async_trait::async_trait;
use hdf_common::{ContentsEntry, EntityMeta};
use reqwest::{header, Client, StatusCode, Url};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::{debug, instrument};

use crate::config::ClientConfig;
use crate::error::{Result, ServiceError};
use crate::service::HdfService;

/// A group listing or a single dataset entry.
#[derive(Deserialize)]
#[serde(untagged)]
enum ContentsResponse {
    Listing(Vec<ContentsEntry>),
    Entry(ContentsEntry),
}

/// HTTP client for the HDF5 service.
pub struct HttpHdfClient {
    client: Client,
    base_url: Url,
    token: Option<String>,
}

impl HttpHdfClient {
    /// Build a client from an explicit configuration.
    pub fn new(config: ClientConfig) -> Result<Self> {
        config.validate().map_err(ServiceError::InvalidRequest)?;

        let base_url = Url::parse(&config.base_url)
            .map_err(|e| ServiceError::InvalidRequest(format!("{}: {}", config.base_url, e)))?;

        let client = Client::builder()
            .timeout(config.request_timeout())
            .connect_timeout(config.connect_timeout())
            .pool_max_idle_per_host(4)
            .tcp_nodelay(true)
            .build()?;

        Ok(Self {
            client,
            base_url,
            token: config.token,
        })
    }

    /// Build `{base}/hdf/{endpoint}/{fpath}` with each path segment escaped.
    fn endpoint_url(&self, endpoint: &str, fpath: &str) -> Result<Url> {
        if fpath.trim_matches('/').is_empty() {
            return Err(ServiceError::InvalidRequest(
                "fpath should not be empty".to_string(),
            ));
        }

        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| {
                ServiceError::InvalidRequest(format!("cannot use {} as a base URL", self.base_url))
            })?
            .pop_if_empty()
            .push("hdf")
            .push(endpoint)
            .extend(fpath.split('/').filter(|segment| !segment.is_empty()));
        Ok(url)
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        fpath: &str,
        query: &[(&str, String)],
    ) -> Result<T> {
        let url = self.endpoint_url(endpoint, fpath)?;

        let mut request = self.client.get(url).query(query);
        if let Some(token) = &self.token {
            request = request.header(header::AUTHORIZATION, format!("token {}", token));
        }

        let response = request.send().await?;
        let status = response.status();
        let body = response.text().await?;

        if status != StatusCode::OK {
            debug!(status = status.as_u16(), endpoint, "HDF5 service returned an error");
            return Err(ServiceError::from_response(status.as_u16(), body));
        }

        Ok(serde_json::from_str(&body)?)
    }
}

/// Query pairs for the parameters that are set.
fn query_params(
    uri: &str,
    ixstr: Option<&str>,
    subixstr: Option<&str>,
    min_ndim: Option<usize>,
) -> Vec<(&'static str, String)> {
    let mut query = vec![("uri", uri.to_string())];
    if let Some(ixstr) = ixstr {
        query.push(("ixstr", ixstr.to_string()));
    }
    if let Some(subixstr) = subixstr {
        query.push(("subixstr", subixstr.to_string()));
    }
    if let Some(min_ndim) = min_ndim {
        query.push(("min_ndim", min_ndim.to_string()));
    }
    query
}

#[async_trait]
impl HdfService for HttpHdfClient {
    #[instrument(skip(self))]
    async fn get_contents(&self, fpath: &str, uri: &str) -> Result<Vec<ContentsEntry>> {
        let query = query_params(uri, None, None, None);
        let contents: ContentsResponse = self.get_json("contents", fpath, &query).await?;

        Ok(match contents {
            ContentsResponse::Listing(entries) => entries,
            ContentsResponse::Entry(entry) => vec![entry],
        })
    }

    #[instrument(skip(self))]
    async fn get_meta(
        &self,
        fpath: &str,
        uri: &str,
        ixstr: Option<&str>,
        min_ndim: Option<usize>,
    ) -> Result<EntityMeta> {
        let query = query_params(uri, ixstr, None, min_ndim);
        self.get_json("meta", fpath, &query).await
    }

    #[instrument(skip(self))]
    async fn get_data(
        &self,
        fpath: &str,
        uri: &str,
        ixstr: Option<&str>,
        subixstr: Option<&str>,
        min_ndim: Option<usize>,
    ) -> Result<serde_json::Value> {
        let query = query_params(uri, ixstr, subixstr, min_ndim);
        self.get_json("data", fpath, &query).await
    }

    #[instrument(skip(self))]
    async fn get_attrs(
        &self,
        fpath: &str,
        uri: &str,
        attr_keys: Option<&[String]>,
    ) -> Result<BTreeMap<String, serde_json::Value>> {
        let mut query = query_params(uri, None, None, None);
        for key in attr_keys.unwrap_or_default() {
            query.push(("attr_keys", key.clone()));
        }
        self.get_json("attrs", fpath, &query).await
    }

    #[instrument(skip(self))]
    async fn get_snippet(&self, fpath: &str, uri: &str) -> Result<String> {
        let query = query_params(uri, None, None, None);
        self.get_json("snippet", fpath, &query).await
    }
}
