//! Pull mode: an axum server rendering the registry on every scrape.

use std::net::SocketAddr;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use pmprom_core::error::{PmPromError, Result};

use super::Publisher;
use crate::obs::FrameMetrics;
use crate::router::build_router;

pub struct ScrapePublisher {
    listen: SocketAddr,
    path: String,
    metrics: Arc<FrameMetrics>,
    shutdown: CancellationToken,
    task: Option<JoinHandle<std::io::Result<()>>>,
    local_addr: Option<SocketAddr>,
}

impl ScrapePublisher {
    pub fn new(listen: SocketAddr, path: impl Into<String>, metrics: Arc<FrameMetrics>) -> Self {
        Self {
            listen,
            path: path.into(),
            metrics,
            shutdown: CancellationToken::new(),
            task: None,
            local_addr: None,
        }
    }

    /// Bound address once started (resolves port 0).
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.local_addr
    }
}

#[async_trait]
impl Publisher for ScrapePublisher {
    async fn start(&mut self) -> Result<()> {
        if self.task.is_some() {
            return Err(PmPromError::Internal("scrape endpoint already started".into()));
        }

        let listener = tokio::net::TcpListener::bind(self.listen)
            .await
            .map_err(|e| PmPromError::Publish(format!("bind {} failed: {e}", self.listen)))?;
        let addr = listener.local_addr()?;

        let app = build_router(Arc::clone(&self.metrics), &self.path);
        let shutdown = self.shutdown.clone();
        self.task = Some(tokio::spawn(async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(shutdown.cancelled_owned())
                .await
        }));
        self.local_addr = Some(addr);

        tracing::info!(%addr, path = %self.path, "scrape endpoint listening");
        Ok(())
    }

    async fn stop(&mut self) -> Result<()> {
        self.shutdown.cancel();
        let Some(task) = self.task.take() else {
            return Ok(());
        };

        match task.await {
            Ok(Ok(())) => {
                tracing::info!("scrape endpoint stopped");
                Ok(())
            }
            Ok(Err(e)) => Err(PmPromError::Publish(format!("scrape server failed: {e}"))),
            Err(e) => Err(PmPromError::Internal(format!("scrape server task: {e}"))),
        }
    }
}
