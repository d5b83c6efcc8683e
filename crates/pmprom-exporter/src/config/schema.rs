use std::net::SocketAddr;

use serde::Deserialize;

use pmprom_core::error::{PmPromError, Result};
use pmprom_core::{LabelField, LabelSchema};

use crate::obs::MetricsProfile;

/// Publishing mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    /// Serve a scrape endpoint.
    #[default]
    Pull,
    /// Push a snapshot to a gateway after every line.
    Push,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ExporterConfig {
    pub version: u32,

    #[serde(default)]
    pub mode: Mode,

    #[serde(default = "default_labels")]
    pub labels: Vec<LabelField>,

    #[serde(default)]
    pub scrape: ScrapeSection,

    #[serde(default)]
    pub metrics: MetricsSection,

    #[serde(default)]
    pub push: PushSection,
}

impl Default for ExporterConfig {
    fn default() -> Self {
        Self {
            version: 1,
            mode: Mode::default(),
            labels: default_labels(),
            scrape: ScrapeSection::default(),
            metrics: MetricsSection::default(),
            push: PushSection::default(),
        }
    }
}

impl ExporterConfig {
    pub fn validate(&self) -> Result<()> {
        if self.version != 1 {
            return Err(PmPromError::Config(format!(
                "unsupported config version: {}",
                self.version
            )));
        }

        self.label_schema()?;
        self.scrape.validate()?;
        if self.mode == Mode::Push {
            self.push.validate()?;
        }

        Ok(())
    }

    pub fn label_schema(&self) -> Result<LabelSchema> {
        LabelSchema::new(self.labels.clone())
    }

    pub fn metrics_profile(&self) -> MetricsProfile {
        match self.mode {
            Mode::Pull => MetricsProfile::Pull {
                prefix: self.metrics.prefix.clone(),
            },
            Mode::Push => MetricsProfile::Push,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ScrapeSection {
    #[serde(default = "default_listen")]
    pub listen: String,

    #[serde(default = "default_path")]
    pub path: String,
}

impl Default for ScrapeSection {
    fn default() -> Self {
        Self {
            listen: default_listen(),
            path: default_path(),
        }
    }
}

impl ScrapeSection {
    pub fn validate(&self) -> Result<()> {
        self.listen_addr()?;
        if !self.path.starts_with('/') {
            return Err(PmPromError::Config("scrape.path must start with '/'".into()));
        }
        if !self.path.chars().all(is_path_char) {
            return Err(PmPromError::Config(format!(
                "scrape.path may only contain [A-Za-z0-9_./-]: {}",
                self.path
            )));
        }
        if self.path == "/healthz" || self.path == "/readyz" {
            return Err(PmPromError::Config(format!(
                "scrape.path {} collides with a built-in route",
                self.path
            )));
        }
        Ok(())
    }

    pub fn listen_addr(&self) -> Result<SocketAddr> {
        self.listen.parse().map_err(|_| {
            PmPromError::Config(format!(
                "scrape.listen must be a valid SocketAddr: {}",
                self.listen
            ))
        })
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MetricsSection {
    #[serde(default = "default_prefix")]
    pub prefix: String,
}

impl Default for MetricsSection {
    fn default() -> Self {
        Self {
            prefix: default_prefix(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PushSection {
    #[serde(default)]
    pub endpoint: Option<String>,

    #[serde(default = "default_job")]
    pub job: String,

    #[serde(default = "default_instance")]
    pub instance: String,

    #[serde(default = "default_push_timeout_ms")]
    pub timeout_ms: u64,
}

impl Default for PushSection {
    fn default() -> Self {
        Self {
            endpoint: None,
            job: default_job(),
            instance: default_instance(),
            timeout_ms: default_push_timeout_ms(),
        }
    }
}

impl PushSection {
    pub fn validate(&self) -> Result<()> {
        let endpoint = self.endpoint.as_deref().unwrap_or_default();
        if !(endpoint.starts_with("http://") || endpoint.starts_with("https://")) {
            return Err(PmPromError::Config(
                "push.endpoint must be an http(s) URL in push mode".into(),
            ));
        }
        for (name, v) in [("push.job", &self.job), ("push.instance", &self.instance)] {
            if v.is_empty() || v.contains('/') {
                return Err(PmPromError::Config(format!(
                    "{name} must be non-empty and must not contain '/'"
                )));
            }
        }
        if !(100..=60000).contains(&self.timeout_ms) {
            return Err(PmPromError::Config(
                "push.timeout_ms must be between 100 and 60000".into(),
            ));
        }
        Ok(())
    }
}

fn default_labels() -> Vec<LabelField> {
    LabelSchema::default().fields().to_vec()
}
fn default_listen() -> String {
    "0.0.0.0:9091".into()
}
fn default_path() -> String {
    "/metrics".into()
}
fn default_prefix() -> String {
    crate::obs::registry::DEFAULT_PREFIX.into()
}
fn default_job() -> String {
    "presentmon".into()
}
fn default_push_timeout_ms() -> u64 {
    5000
}

/// Local host identifier used as the push `instance` label.
fn default_instance() -> String {
    hostname::get()
        .ok()
        .and_then(|h| h.into_string().ok())
        .filter(|h| !h.trim().is_empty())
        .unwrap_or_else(|| "localhost".into())
}

/// Characters accepted in the scrape path; anything else could be read as
/// route syntax (`:param`, `*wildcard`, `{param}`).
fn is_path_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '/' | '-')
}
