use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use tracing::{debug, warn};

use crate::config::SourceApiConfig;
use crate::error::PipelineError;

/// Upstream user API.
#[async_trait]
pub trait UserApi: Send + Sync {
    /// Lightweight readiness check. `Ok` means the endpoint answered with a
    /// success status; mutates nothing.
    async fn probe(&self) -> Result<(), PipelineError>;

    /// One GET returning the decoded JSON body.
    async fn fetch(&self) -> Result<serde_json::Value, PipelineError>;
}

/// Reqwest-backed implementation hitting the configured endpoint.
pub struct HttpUserApi {
    client: Client,
    url: String,
}

impl HttpUserApi {
    pub fn new(config: &SourceApiConfig) -> anyhow::Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()?;
        Ok(Self {
            client,
            url: config.url.clone(),
        })
    }
}

#[async_trait]
impl UserApi for HttpUserApi {
    async fn probe(&self) -> Result<(), PipelineError> {
        let response = self.client.get(&self.url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(PipelineError::Connectivity(format!(
                "probe got status {}",
                status.as_u16()
            )));
        }
        Ok(())
    }

    async fn fetch(&self) -> Result<serde_json::Value, PipelineError> {
        let response = self.client.get(&self.url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(PipelineError::Connectivity(format!(
                "source api returned status {}",
                status.as_u16()
            )));
        }
        let body = response.text().await?;
        serde_json::from_str(&body)
            .map_err(|e| PipelineError::MalformedResponse(format!("invalid JSON body: {e}")))
    }
}

/// Poll the API until it answers or the wait budget runs out.
///
/// Always probes at least once; never fetches anything.
pub async fn wait_until_available(
    api: &dyn UserApi,
    interval: Duration,
    max_wait: Duration,
) -> Result<(), PipelineError> {
    let deadline = tokio::time::Instant::now() + max_wait;
    let mut attempt: u32 = 0;
    loop {
        attempt += 1;
        match api.probe().await {
            Ok(()) => {
                debug!(attempt, "source api is available");
                return Ok(());
            }
            Err(e) => warn!(attempt, error = %e, "source api not available yet"),
        }
        if tokio::time::Instant::now() + interval > deadline {
            return Err(PipelineError::Timeout(format!(
                "source api still unavailable after {attempt} probe(s) within {}s",
                max_wait.as_secs()
            )));
        }
        tokio::time::sleep(interval).await;
    }
}
