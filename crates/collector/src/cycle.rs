use std::time::Duration;

use futures::future::join_all;
use shopfloor_core::Snapshot;
use tracing::warn;

use crate::endpoint::Endpoint;
use crate::reader::{CollectError, DeviceReader};

/// Snapshots gathered by one cycle. Failed endpoints contribute nothing to
/// `snapshots`.
#[derive(Debug, Default)]
pub struct CycleBatch {
    pub snapshots: Vec<Snapshot>,
    /// Machine ids whose endpoint failed.
    pub failed: Vec<String>,
}

/// One concurrent read per endpoint, joined before returning.
pub struct CollectorCycle<R> {
    endpoints: Vec<Endpoint>,
    reader: R,
    read_timeout: Duration,
}

impl<R: DeviceReader> CollectorCycle<R> {
    pub fn new(endpoints: Vec<Endpoint>, reader: R, read_timeout: Duration) -> Self {
        Self {
            endpoints,
            reader,
            read_timeout,
        }
    }

    pub fn endpoints(&self) -> &[Endpoint] {
        &self.endpoints
    }

    /// Read every endpoint. A failing or slow endpoint never fails the
    /// batch; reads that outlive `read_timeout` count as failed.
    pub async fn collect(&self) -> CycleBatch {
        let reads = self.endpoints.iter().map(|endpoint| async move {
            let result =
                match tokio::time::timeout(self.read_timeout, self.reader.read_snapshot(endpoint))
                    .await
                {
                    Ok(result) => result,
                    Err(_) => Err(CollectError::Timeout(self.read_timeout)),
                };
            (endpoint, result)
        });

        let mut batch = CycleBatch::default();
        for (endpoint, result) in join_all(reads).await {
            match result {
                Ok(snapshot) => batch.snapshots.push(snapshot),
                Err(err) => {
                    warn!(endpoint = %endpoint, error = %err, "endpoint skipped this cycle");
                    batch.failed.push(endpoint.machine_id().to_string());
                }
            }
        }
        batch
    }
}
