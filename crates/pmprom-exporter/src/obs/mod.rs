//! In-process metrics.
//!
//! Instruments are stored as atomics (histograms behind a per-series lock)
//! and rendered to Prometheus text format by the publishers.

pub mod metrics;
pub mod registry;

pub use registry::{FrameMetrics, MetricsProfile, TimingSeries, FRAMETIME_BUCKETS_MS};
