//! Shared helpers for exporter integration tests.

#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
#![allow(clippy::panic)]
#![allow(dead_code)]

use std::collections::BTreeMap;
use std::fmt;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;
use tracing::field::{Field, Visit};
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::layer::{Context, Layer};

use pmprom_core::error::{PmPromError, Result};
use pmprom_core::LabelSchema;
use pmprom_exporter::ingest::{StreamRunner, UpdateRouter};
use pmprom_exporter::obs::{FrameMetrics, MetricsProfile};
use pmprom_exporter::publish::Publisher;

pub const HEADER: &str = "Application,ProcessID,SwapChainAddress,Runtime,SyncInterval,PresentFlags,AllowsTearing,PresentMode,Dropped,TimeInSeconds,MsBetweenPresents,MsBetweenDisplayChange,MsInPresentAPI,MsUntilRenderComplete,MsUntilDisplayed";

/// One well-formed frame line.
pub fn frame(app: &str, pid: &str, dropped: f64, secs: f64, ms: [f64; 5]) -> String {
    format!(
        "{app},{pid},0x0000021B,DXGI,0,0,1,Composed: Flip,{dropped},{secs},{},{},{},{},{}",
        ms[0], ms[1], ms[2], ms[3], ms[4]
    )
}

pub fn capture(lines: &[String]) -> String {
    let mut s = String::from(HEADER);
    for l in lines {
        s.push('\n');
        s.push_str(l);
    }
    s.push('\n');
    s
}

pub fn pull_metrics() -> Arc<FrameMetrics> {
    Arc::new(FrameMetrics::new(&MetricsProfile::default(), &LabelSchema::default()))
}

pub fn runner(metrics: &Arc<FrameMetrics>) -> StreamRunner {
    StreamRunner::new(UpdateRouter::new(Arc::clone(metrics), LabelSchema::default()))
}

/// Publisher that records lifecycle calls and can trigger cancellation.
#[derive(Default)]
pub struct RecordingPublisher {
    pub started: u32,
    pub after_lines: u32,
    pub stopped: u32,
    pub cancel_after: Option<(u32, CancellationToken)>,
    pub fail_after_line: bool,
}

#[async_trait]
impl Publisher for RecordingPublisher {
    async fn start(&mut self) -> Result<()> {
        self.started += 1;
        Ok(())
    }

    async fn after_line(&mut self) -> Result<()> {
        self.after_lines += 1;
        if self.fail_after_line {
            return Err(PmPromError::Publish("gateway unreachable".into()));
        }
        if let Some((n, token)) = &self.cancel_after {
            if self.after_lines >= *n {
                token.cancel();
            }
        }
        Ok(())
    }

    async fn stop(&mut self) -> Result<()> {
        self.stopped += 1;
        Ok(())
    }
}

/// One tracing event as seen by [`CapturedEvents`].
#[derive(Debug, Clone)]
pub struct CapturedEvent {
    pub level: Level,
    pub fields: BTreeMap<String, String>,
}

impl CapturedEvent {
    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields.get(name).map(String::as_str)
    }
}

/// Layer that records every event it sees.
#[derive(Clone, Default)]
pub struct CapturedEvents {
    events: Arc<Mutex<Vec<CapturedEvent>>>,
}

impl CapturedEvents {
    /// Installs the layer for the current thread until the guard drops.
    pub fn install(&self) -> tracing::subscriber::DefaultGuard {
        use tracing_subscriber::layer::SubscriberExt;
        tracing::subscriber::set_default(tracing_subscriber::registry().with(self.clone()))
    }

    pub fn events(&self) -> Vec<CapturedEvent> {
        self.events.lock().unwrap().clone()
    }
}

struct FieldVisitor<'a>(&'a mut BTreeMap<String, String>);

impl Visit for FieldVisitor<'_> {
    fn record_str(&mut self, field: &Field, value: &str) {
        self.0.insert(field.name().to_string(), value.to_string());
    }

    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        self.0.insert(field.name().to_string(), format!("{value:?}"));
    }
}

impl<S: Subscriber> Layer<S> for CapturedEvents {
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let mut fields = BTreeMap::new();
        event.record(&mut FieldVisitor(&mut fields));
        self.events.lock().unwrap().push(CapturedEvent {
            level: *event.metadata().level(),
            fields,
        });
    }
}
