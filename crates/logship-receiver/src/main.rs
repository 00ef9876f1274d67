//! logship-receiver - in-memory log ingest service

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::{Parser, ValueEnum};
use logship_platform::Server;
use logship_receiver::{HttpListener, ReceiverConfig, Repository};
use tracing::{error, info};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

#[derive(Parser)]
#[command(name = "logship-receiver")]
#[command(about = "Stores shipped log entries and serves time-range queries")]
#[command(version)]
struct Cli {
    /// Address for the HTTP listener
    #[arg(long, env = "LOGSHIP_RECEIVER_ADDR", default_value = "0.0.0.0:8080")]
    addr: SocketAddr,

    /// Grace period for shutdown, in milliseconds
    #[arg(long, env = "LOGSHIP_SHUTDOWN_TIMEOUT_MS", default_value_t = 1000)]
    shutdown_timeout_ms: u64,

    /// Log output format
    #[arg(long, env = "LOGSHIP_LOG_FORMAT", value_enum, default_value_t = LogFormat::Json)]
    log_format: LogFormat,
}

#[derive(Clone, Copy, ValueEnum)]
enum LogFormat {
    Json,
    Text,
}

impl Cli {
    fn config(&self) -> ReceiverConfig {
        ReceiverConfig::new(self.addr)
            .with_shutdown_timeout(Duration::from_millis(self.shutdown_timeout_ms))
    }
}

const DEFAULT_LOG_FILTER: &str = "logship_receiver=info,logship_platform=info";

/// Builds the log filter from `RUST_LOG`, or the crate defaults when unset.
fn log_filter(rust_log: Option<&str>) -> anyhow::Result<EnvFilter> {
    Ok(EnvFilter::try_new(rust_log.unwrap_or(DEFAULT_LOG_FILTER))?)
}

fn init_tracing(format: LogFormat) -> anyhow::Result<()> {
    let rust_log = std::env::var(EnvFilter::DEFAULT_ENV).ok();
    let filter = log_filter(rust_log.as_deref())?;

    match format {
        LogFormat::Json => tracing_subscriber::registry()
            .with(fmt::layer().json())
            .with(filter)
            .init(),
        LogFormat::Text => tracing_subscriber::registry()
            .with(fmt::layer())
            .with(filter)
            .init(),
    }
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.log_format)?;

    let config = cli.config();
    config.validate()?;

    let repo = Arc::new(Repository::new());
    let listener = HttpListener::bind(config.bind_addr, repo)
        .await
        .with_context(|| format!("failed to bind {}", config.bind_addr))?;
    info!(addr = %listener.local_addr(), "starting logship-receiver");

    let server = Server::new(listener).with_shutdown_timeout(config.shutdown_timeout);
    if let Err(e) = server.serve().await {
        error!(error = %e, "fatal error occurred");
        return Err(e.into());
    }

    info!("logship-receiver stopped");
    Ok(())
}
