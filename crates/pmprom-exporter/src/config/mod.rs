//! Exporter config loader (strict parsing).

pub mod schema;

use std::fs;
use std::path::Path;

use pmprom_core::error::{PmPromError, Result};

pub use schema::{ExporterConfig, MetricsSection, Mode, PushSection, ScrapeSection};

pub fn load_from_file(path: &Path) -> Result<ExporterConfig> {
    let s = fs::read_to_string(path).map_err(|e| {
        PmPromError::Config(format!("read config failed ({}): {e}", path.display()))
    })?;
    load_from_str(&s)
}

pub fn load_from_str(s: &str) -> Result<ExporterConfig> {
    let cfg: ExporterConfig = serde_yaml::from_str(s)
        .map_err(|e| PmPromError::Config(format!("invalid yaml: {e}")))?;
    cfg.validate()?;
    Ok(cfg)
}
