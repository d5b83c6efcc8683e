//! Axum router wiring for the scrape endpoint.

use std::sync::Arc;

use axum::{routing::get, Router};

use crate::{obs::FrameMetrics, ops};

pub fn build_router(metrics: Arc<FrameMetrics>, metrics_path: &str) -> Router {
    Router::new()
        .route(metrics_path, get(ops::metrics))
        .route("/healthz", get(ops::healthz))
        .route("/readyz", get(ops::readyz))
        .with_state(metrics)
}
