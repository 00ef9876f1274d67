//! logship-shipper - tails log files and forwards entries to a receiver

use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, ValueEnum};
use logship_platform::{ErrorPolicy, Server};
use logship_shipper::{Pipeline, ShipperConfig};
use tracing::{error, info};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

#[derive(Parser)]
#[command(name = "logship-shipper")]
#[command(about = "Tails log files and forwards entries to a logship receiver")]
#[command(version)]
struct Cli {
    /// Directories to watch for log files, comma separated
    #[arg(long, env = "LOGSHIP_WATCH_DIRS", value_delimiter = ',', default_value = "./testdata")]
    watch_dirs: Vec<PathBuf>,

    /// Base address of the receiver
    #[arg(long, env = "LOGSHIP_INGEST_ADDR", default_value = "http://localhost:8080")]
    receiver_addr: String,

    /// Interval between directory scans, in milliseconds
    #[arg(long, env = "LOGSHIP_POLL_INTERVAL_MS", default_value_t = 1000)]
    poll_interval_ms: u64,

    /// Timeout for a single ingest request, in milliseconds
    #[arg(long, env = "LOGSHIP_REQUEST_TIMEOUT_MS", default_value_t = 10_000)]
    request_timeout_ms: u64,

    /// Stop shipping at the first line that cannot be forwarded
    #[arg(long, env = "LOGSHIP_FAIL_FAST")]
    fail_fast: bool,

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
    fn config(&self) -> ShipperConfig {
        let policy = if self.fail_fast {
            ErrorPolicy::FailFast
        } else {
            ErrorPolicy::FailSoft
        };
        ShipperConfig::new(self.watch_dirs.clone(), self.receiver_addr.clone())
            .with_poll_interval(Duration::from_millis(self.poll_interval_ms))
            .with_request_timeout(Duration::from_millis(self.request_timeout_ms))
            .with_error_policy(policy)
    }
}

const DEFAULT_LOG_FILTER: &str = "logship_shipper=info,logship_platform=info";

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
    info!(receiver = %config.receiver_addr, "starting logship-shipper");

    let pipeline = Pipeline::connect(&config)?;
    let forwarded = pipeline.forwarder_stats();
    let server = Server::new(pipeline).with_shutdown_timeout(config.shutdown_timeout);

    if let Err(e) = server.serve().await {
        error!(error = %e, "error occurred");
        return Err(e.into());
    }

    info!(
        forwarded = forwarded.forwarded(),
        decode_failures = forwarded.decode_failures(),
        transport_failures = forwarded.transport_failures(),
        "logship-shipper stopped"
    );
    Ok(())
}
