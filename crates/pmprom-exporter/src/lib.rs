//! pmprom exporter library entry.
//!
//! This crate turns a stream of frame-presentation telemetry lines into
//! labeled Prometheus metrics: the instrument registry, the update router,
//! the stream runner, and the scrape/push publishers. It is consumed by the
//! binary (`main.rs`) and by integration tests.

pub mod app;
pub mod config;
pub mod ingest;
pub mod obs;
pub mod ops;
pub mod publish;
pub mod router;
