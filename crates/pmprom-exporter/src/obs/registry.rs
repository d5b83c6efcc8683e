//! The fixed frame-metrics registry.
//!
//! One explicitly constructed object owning every instrument; handed to the
//! stream runner and the publishers instead of living in a global.

use std::sync::atomic::{AtomicBool, Ordering};

use pmprom_core::{LabelKey, LabelSchema};

use super::metrics::{CounterVec, Desc, GaugeVec, HistogramVec};

/// Frame-time bucket bounds in milliseconds (frame-rate thresholds: 60 and 30 fps among them).
pub const FRAMETIME_BUCKETS_MS: [f64; 16] = [
    1.0,
    5.0,
    7.0,
    10.0,
    12.5,
    15.0,
    1000.0 / 60.0,
    20.0,
    25.0,
    1000.0 / 30.0,
    40.0,
    50.0,
    75.0,
    100.0,
    200.0,
    1000.0,
];

/// Default metric name prefix for the scrape endpoint.
pub const DEFAULT_PREFIX: &str = "presentmon_";

/// How the instruments are shaped for the chosen publishing mode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MetricsProfile {
    /// Scrape endpoint: prefixed names, timings as histograms.
    Pull { prefix: String },
    /// Push gateway: bare names, timings as last-value gauges.
    Push,
}

impl Default for MetricsProfile {
    fn default() -> Self {
        MetricsProfile::Pull {
            prefix: DEFAULT_PREFIX.to_string(),
        }
    }
}

/// A frame-timing measurement, either bucketed or last-value.
pub enum TimingSeries {
    Histogram(HistogramVec),
    Gauge(GaugeVec),
}

impl TimingSeries {
    fn new(profile: &MetricsProfile, desc: Desc) -> Self {
        match profile {
            MetricsProfile::Pull { .. } => {
                TimingSeries::Histogram(HistogramVec::new(desc, &FRAMETIME_BUCKETS_MS))
            }
            MetricsProfile::Push => TimingSeries::Gauge(GaugeVec::new(desc)),
        }
    }

    /// Observe (histogram) or set (gauge) one value for `key`.
    pub fn record(&self, key: &LabelKey, v: f64) {
        match self {
            TimingSeries::Histogram(h) => h.with_label_values(key).observe(v),
            TimingSeries::Gauge(g) => g.with_label_values(key).set(v),
        }
    }

    pub fn desc(&self) -> &Desc {
        match self {
            TimingSeries::Histogram(h) => h.desc(),
            TimingSeries::Gauge(g) => g.desc(),
        }
    }

    pub fn as_histogram(&self) -> Option<&HistogramVec> {
        match self {
            TimingSeries::Histogram(h) => Some(h),
            TimingSeries::Gauge(_) => None,
        }
    }

    pub fn as_gauge(&self) -> Option<&GaugeVec> {
        match self {
            TimingSeries::Gauge(g) => Some(g),
            TimingSeries::Histogram(_) => None,
        }
    }

    fn render(&self, out: &mut String) {
        match self {
            TimingSeries::Histogram(h) => h.render(out),
            TimingSeries::Gauge(g) => g.render(out),
        }
    }
}

pub struct FrameMetrics {
    pub frames: CounterVec,
    pub dropped: CounterVec,
    pub time_in_seconds: GaugeVec,
    pub present_between: TimingSeries,
    pub display_between: TimingSeries,
    pub present_api_time: TimingSeries,
    pub render_time: TimingSeries,
    pub display_delay: TimingSeries,
    draining: AtomicBool,
}

impl FrameMetrics {
    /// Build every instrument up front. Child series appear lazily per label key.
    pub fn new(profile: &MetricsProfile, schema: &LabelSchema) -> Self {
        let prefix = match profile {
            MetricsProfile::Pull { prefix } => prefix.as_str(),
            MetricsProfile::Push => "",
        };
        let labels = schema.names();
        let desc = |name: &str, help: &'static str| {
            Desc::new(format!("{prefix}{name}"), help, labels.clone())
        };

        Self {
            frames: CounterVec::new(desc("frames_count", "Frame counter (experimental)")),
            dropped: CounterVec::new(desc("frames_dropped", "Number of dropped frames")),
            time_in_seconds: GaugeVec::new(desc("raw_TimeInSeconds", "TimeInSeconds")),
            present_between: TimingSeries::new(
                profile,
                desc("frametimes_present_between_ms", "MsBetweenPresents"),
            ),
            display_between: TimingSeries::new(
                profile,
                desc("frametimes_display_between_ms", "MsBetweenDisplayChange"),
            ),
            present_api_time: TimingSeries::new(
                profile,
                desc("frametimes_present_API_time_ms", "MsInPresentAPI"),
            ),
            render_time: TimingSeries::new(
                profile,
                desc("frametimes_render_time_ms", "MsUntilRenderComplete"),
            ),
            display_delay: TimingSeries::new(
                profile,
                desc("frametimes_display_delay_ms", "MsUntilDisplayed"),
            ),
            draining: AtomicBool::new(false),
        }
    }

    /// The five timing series, in input column order.
    pub fn timings(&self) -> [&TimingSeries; 5] {
        [
            &self.present_between,
            &self.display_between,
            &self.present_api_time,
            &self.render_time,
            &self.display_delay,
        ]
    }

    /// Mark draining state.
    pub fn set_draining(&self) {
        self.draining.store(true, Ordering::Relaxed);
    }

    /// Return whether draining is active.
    pub fn is_draining(&self) -> bool {
        self.draining.load(Ordering::Relaxed)
    }

    /// Render all instruments in Prometheus text exposition format.
    pub fn render(&self) -> String {
        let mut out = String::new();
        self.frames.render(&mut out);
        self.dropped.render(&mut out);
        self.time_in_seconds.render(&mut out);
        for t in self.timings() {
            t.render(&mut out);
        }
        out
    }
}
