//! Push mode: POST the full snapshot to a Pushgateway after every line.
//!
//! Every push is awaited before the next line is read, so throughput is
//! bounded by gateway latency. `push.timeout_ms` caps each request.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;

use pmprom_core::error::{PmPromError, Result};

use super::Publisher;
use crate::config::PushSection;
use crate::obs::FrameMetrics;
use crate::ops::TEXT_FORMAT;

pub struct PushPublisher {
    client: reqwest::Client,
    url: String,
    metrics: Arc<FrameMetrics>,
    pushes: u64,
}

impl PushPublisher {
    pub fn new(cfg: &PushSection, metrics: Arc<FrameMetrics>) -> Result<Self> {
        let endpoint = cfg
            .endpoint
            .as_deref()
            .ok_or_else(|| PmPromError::Config("push.endpoint is required in push mode".into()))?;

        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(cfg.timeout_ms))
            .build()
            .map_err(|e| PmPromError::Internal(format!("http client: {e}")))?;

        Ok(Self {
            client,
            url: push_url(endpoint, &cfg.job, &cfg.instance)?,
            metrics,
            pushes: 0,
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Number of successful pushes so far.
    pub fn pushes(&self) -> u64 {
        self.pushes
    }

    async fn push(&mut self) -> Result<()> {
        let body = self.metrics.render();
        let resp = self
            .client
            .post(&self.url)
            .header(CONTENT_TYPE, TEXT_FORMAT)
            .body(body)
            .send()
            .await
            .map_err(|e| PmPromError::Publish(format!("push to {} failed: {e}", self.url)))?;

        let status = resp.status();
        if !status.is_success() {
            return Err(PmPromError::Publish(format!(
                "pushgateway returned status {} for {}",
                status.as_u16(),
                self.url
            )));
        }

        self.pushes += 1;
        Ok(())
    }
}

/// `<endpoint>/metrics/job/<job>/instance/<instance>`, with `job` and
/// `instance` percent-encoded as single path segments.
pub fn push_url(endpoint: &str, job: &str, instance: &str) -> Result<String> {
    let mut url = reqwest::Url::parse(endpoint)
        .map_err(|e| PmPromError::Config(format!("push.endpoint {endpoint:?}: {e}")))?;
    url.path_segments_mut()
        .map_err(|_| PmPromError::Config(format!("push.endpoint {endpoint:?} cannot take a path")))?
        .pop_if_empty()
        .extend(["metrics", "job", job, "instance", instance]);
    Ok(url.into())
}

#[async_trait]
impl Publisher for PushPublisher {
    async fn start(&mut self) -> Result<()> {
        tracing::info!(url = %self.url, "pushing snapshots after every line");
        Ok(())
    }

    async fn after_line(&mut self) -> Result<()> {
        self.push().await
    }

    async fn stop(&mut self) -> Result<()> {
        tracing::info!(pushes = self.pushes, "push mode finished");
        Ok(())
    }
}
