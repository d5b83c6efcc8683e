//! Application wiring: config -> registry, router, publisher, runner.
//!
//! Startup errors are returned, not panicked on, so the binary can report
//! them and exit non-zero.

use std::sync::Arc;

use tokio::io::AsyncBufRead;
use tokio_util::sync::CancellationToken;

use pmprom_core::error::Result;

use crate::config::{ExporterConfig, Mode};
use crate::ingest::{RunReport, StreamRunner, UpdateRouter};
use crate::obs::FrameMetrics;
use crate::publish::{Publisher, PushPublisher, ScrapePublisher};

pub struct App {
    metrics: Arc<FrameMetrics>,
    runner: StreamRunner,
    publisher: Box<dyn Publisher>,
}

impl App {
    /// Build every component from a validated config.
    pub fn new(cfg: &ExporterConfig) -> Result<Self> {
        cfg.validate()?;

        let schema = cfg.label_schema()?;
        let metrics = Arc::new(FrameMetrics::new(&cfg.metrics_profile(), &schema));

        let publisher: Box<dyn Publisher> = match cfg.mode {
            Mode::Pull => Box::new(ScrapePublisher::new(
                cfg.scrape.listen_addr()?,
                cfg.scrape.path.clone(),
                Arc::clone(&metrics),
            )),
            Mode::Push => Box::new(PushPublisher::new(&cfg.push, Arc::clone(&metrics))?),
        };

        tracing::debug!(mode = ?cfg.mode, labels = ?schema.names(), "exporter wired");

        let router = UpdateRouter::new(Arc::clone(&metrics), schema);
        Ok(Self {
            metrics,
            runner: StreamRunner::new(router),
            publisher,
        })
    }

    pub fn metrics(&self) -> Arc<FrameMetrics> {
        Arc::clone(&self.metrics)
    }

    pub async fn run<R>(&mut self, input: R, cancel: &CancellationToken) -> Result<RunReport>
    where
        R: AsyncBufRead + Unpin + Send,
    {
        self.runner.run(input, self.publisher.as_mut(), cancel).await
    }
}
