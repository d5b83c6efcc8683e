//! pmprom-exporter
//!
//! Reads frame telemetry lines from a file or stdin and republishes them as
//! Prometheus metrics, either on a scrape endpoint or by pushing to a gateway.

use std::path::PathBuf;

use clap::Parser;
use tokio::io::{AsyncBufRead, BufReader};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use pmprom_core::error::{PmPromError, Result};
use pmprom_exporter::{app::App, config, config::ExporterConfig, config::Mode};

#[derive(Debug, Parser)]
#[command(name = "pmprom-exporter", version, about = "Frame telemetry to Prometheus metrics")]
struct Cli {
    /// Capture file to read. Reads stdin when omitted.
    input: Option<PathBuf>,

    /// YAML config file.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Override the publishing mode from the config.
    #[arg(long, value_enum)]
    mode: Option<Mode>,

    /// Override push.endpoint from the config.
    #[arg(long)]
    push_endpoint: Option<String>,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let code = match run(Cli::parse()).await {
        Ok(()) => 0,
        Err(e) => {
            tracing::error!(code = e.code().as_str(), error = %e, "exporter failed");
            1
        }
    };

    // A blocked stdin read cannot be interrupted; don't wait for it on the way out.
    std::process::exit(code);
}

async fn run(cli: Cli) -> Result<()> {
    let mut cfg = match &cli.config {
        Some(path) => config::load_from_file(path)?,
        None => ExporterConfig::default(),
    };
    if let Some(mode) = cli.mode {
        cfg.mode = mode;
    }
    if let Some(endpoint) = cli.push_endpoint {
        cfg.push.endpoint = Some(endpoint);
    }

    let mut app = App::new(&cfg)?;

    let input: Box<dyn AsyncBufRead + Unpin + Send> = match &cli.input {
        Some(path) => {
            let file = tokio::fs::File::open(path)
                .await
                .map_err(|e| PmPromError::Io(format!("open {}: {e}", path.display())))?;
            Box::new(BufReader::new(file))
        }
        None => Box::new(BufReader::new(tokio::io::stdin())),
    };

    let cancel = CancellationToken::new();
    tokio::spawn(shutdown_signal(cancel.clone()));

    tracing::info!("running, press Ctrl+C to exit");
    let report = app.run(input, &cancel).await?;
    if report.cancelled {
        tracing::info!("cancelled");
    }
    Ok(())
}

async fn shutdown_signal(cancel: CancellationToken) {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!(error = %e, "failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::warn!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    tracing::info!("signal received, finishing current line");
    cancel.cancel();
}
