use std::sync::Arc;

use async_trait::async_trait;
use tokio::time::sleep;

use crate::admin::{AdminExecutor, Invocation};
use crate::cluster::snapshot::{ClusterSnapshot, StatsPayload};
use crate::config::StatsConfig;
use crate::converge::{deadline_after, expired};
use crate::error::{OrchestratorError, Result, WaitStage};

/// Status and body of a stats GET.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatsResponse {
    pub status: u16,
    pub body: Vec<u8>,
}

impl StatsResponse {
    pub fn new(status: u16, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// The request never produced an HTTP status (refused, reset, timed out).
#[derive(Debug, thiserror::Error)]
#[error("{0}")]
pub struct TransportError(pub String);

/// HTTP GET capability used to read cluster statistics.
#[async_trait]
pub trait StatsSource: Send + Sync {
    async fn get(&self, url: &str) -> std::result::Result<StatsResponse, TransportError>;
}

#[async_trait]
impl<T: StatsSource + ?Sized> StatsSource for Arc<T> {
    async fn get(&self, url: &str) -> std::result::Result<StatsResponse, TransportError> {
        (**self).get(url).await
    }
}

/// `reqwest` backed stats source.
#[derive(Debug, Clone)]
pub struct HttpStatsClient {
    client: reqwest::Client,
}

impl HttpStatsClient {
    pub fn new(config: &StatsConfig) -> Result<Self> {
        if !config.validate_certs {
            tracing::warn!("TLS certificate validation disabled for the stats endpoint");
        }
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .danger_accept_invalid_certs(!config.validate_certs)
            .build()
            .map_err(|e| OrchestratorError::Http(e.to_string()))?;
        Ok(Self { client })
    }
}

#[async_trait]
impl StatsSource for HttpStatsClient {
    async fn get(&self, url: &str) -> std::result::Result<StatsResponse, TransportError> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| TransportError(e.to_string()))?;
        let status = response.status().as_u16();
        let body = response
            .bytes()
            .await
            .map_err(|e| TransportError(e.to_string()))?;
        Ok(StatsResponse::new(status, body.to_vec()))
    }
}

/// Poll the stats endpoint until it answers with a success status.
///
/// Non-success statuses and transport failures are retried every
/// `retry_interval`; the deadline is checked before each attempt.
pub async fn fetch_stats<S>(source: &S, config: &StatsConfig) -> Result<Vec<u8>>
where
    S: StatsSource + ?Sized,
{
    let url = config.stats_url();
    let deadline = deadline_after(config.deadline);
    let mut attempt: u32 = 0;

    loop {
        if expired(deadline) {
            tracing::error!(url = %url, attempts = attempt, "Stats endpoint never became available");
            return Err(OrchestratorError::Timeout(WaitStage::Stats));
        }
        attempt += 1;

        match source.get(&url).await {
            Ok(response) if response.is_success() => {
                tracing::debug!(url = %url, attempt, "Fetched cluster stats");
                return Ok(response.body);
            }
            Ok(response) => {
                tracing::warn!(url = %url, attempt, status = response.status, "Stats endpoint not ready");
            }
            Err(e) => {
                tracing::warn!(url = %url, attempt, error = %e, "Stats request failed");
            }
        }

        sleep(config.retry_interval).await;
    }
}

/// Capture the cluster snapshot: stats over HTTP, then the installed version.
pub async fn fetch_snapshot<S, E>(
    source: &S,
    admin: &E,
    config: &StatsConfig,
) -> Result<ClusterSnapshot>
where
    S: StatsSource + ?Sized,
    E: AdminExecutor + ?Sized,
{
    let body = fetch_stats(source, config).await?;
    let payload = StatsPayload::decode(&body)?;

    let version = admin.run(&Invocation::version()).await?;
    if !version.success() {
        tracing::warn!(exit_code = ?version.exit_code, "`riak version` exited non-zero");
    }

    let snapshot = ClusterSnapshot::from_payload(payload, version.output.trim());
    tracing::info!(
        node_name = %snapshot.node_name,
        ring_members = snapshot.ring_members.len(),
        ring_size = snapshot.ring_creation_size,
        version = %snapshot.software_version,
        "Captured cluster snapshot"
    );
    Ok(snapshot)
}
