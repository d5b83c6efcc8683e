//! Ingestion: routing parsed records into the registry and driving the
//! line-consumption loop.

pub mod router;
pub mod runner;

pub use router::UpdateRouter;
pub use runner::{RunReport, RunnerState, StreamRunner};
