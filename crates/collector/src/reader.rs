//! Client side of the device access channel.

use std::future::Future;
use std::time::Duration;

use reqwest::{Client, Url};
use serde::de::DeserializeOwned;
use shopfloor_core::channel::{
    decode_reading, machine_namespace, vars, BrowseResponse, DecodeError, ErrorResponse,
    NamespacesResponse,
};
use shopfloor_core::{now_ms, Snapshot};
use thiserror::Error;
use tracing::debug;

use crate::endpoint::Endpoint;

/// Why one endpoint produced no snapshot this cycle.
#[derive(Debug, Error)]
pub enum CollectError {
    #[error("transport: {0}")]
    Http(#[from] reqwest::Error),
    #[error("{url} returned {status}: {message}")]
    Status {
        url: String,
        status: u16,
        message: String,
    },
    #[error("endpoint URL {0} cannot carry a path")]
    Path(String),
    #[error("namespace {0} is not registered")]
    NamespaceNotFound(String),
    #[error("object {object} does not declare {variable}")]
    MissingVariable {
        object: String,
        variable: &'static str,
    },
    #[error(transparent)]
    Decode(#[from] DecodeError),
    #[error("no answer within {0:?}")]
    Timeout(Duration),
}

/// Reads one complete snapshot from a machine's endpoint.
pub trait DeviceReader: Send + Sync {
    fn read_snapshot(
        &self,
        endpoint: &Endpoint,
    ) -> impl Future<Output = Result<Snapshot, CollectError>> + Send;
}

/// [`DeviceReader`] over the HTTP/JSON channel served by the simulator.
#[derive(Debug, Clone, Default)]
pub struct HttpDeviceReader {
    client: Client,
}

impl HttpDeviceReader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_client(client: Client) -> Self {
        Self { client }
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        base: &Url,
        segments: &[&str],
    ) -> Result<T, CollectError> {
        let url = channel_url(base, segments)?;
        let resp = self.client.get(url.clone()).send().await?;

        let status = resp.status();
        if !status.is_success() {
            let message = resp
                .json::<ErrorResponse>()
                .await
                .map(|body| body.error)
                .unwrap_or_default();
            return Err(CollectError::Status {
                url: url.to_string(),
                status: status.as_u16(),
                message,
            });
        }
        Ok(resp.json().await?)
    }

    async fn collect(&self, endpoint: &Endpoint) -> Result<Snapshot, CollectError> {
        let base = endpoint.url();
        let object = endpoint.machine_id();

        let namespace = machine_namespace(object);
        let listed: NamespacesResponse = self.get_json(base, &["v1", "namespaces"]).await?;
        let ns = listed
            .index_of(&namespace)
            .ok_or(CollectError::NamespaceNotFound(namespace))?;

        // one request, so every value comes from the same publish
        let browsed: BrowseResponse = self
            .get_json(base, &["v1", "objects", &ns.to_string(), object])
            .await?;
        if let Some(variable) = vars::ALL
            .into_iter()
            .find(|name| !browsed.values.contains_key(*name))
        {
            return Err(CollectError::MissingVariable {
                object: object.to_string(),
                variable,
            });
        }

        let reading = decode_reading(object, &browsed.values)?;
        debug!(machine = object, status = %reading.status, "read snapshot");
        Ok(Snapshot::new(reading, now_ms()))
    }
}

/// Append path segments to the endpoint base, percent-encoding each one.
fn channel_url(base: &Url, segments: &[&str]) -> Result<Url, CollectError> {
    let mut url = base.clone();
    url.path_segments_mut()
        .map_err(|_| CollectError::Path(base.to_string()))?
        .pop_if_empty()
        .extend(segments);
    Ok(url)
}

impl DeviceReader for HttpDeviceReader {
    fn read_snapshot(
        &self,
        endpoint: &Endpoint,
    ) -> impl Future<Output = Result<Snapshot, CollectError>> + Send {
        self.collect(endpoint)
    }
}
