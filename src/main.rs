use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use common::config::Configuration;
use tokio::signal;
use tokio::sync::oneshot;

#[derive(Parser)]
#[command(name = "metricsink")]
#[command(about = "Prometheus remote-write adapter for CloudWatch and Cassandra")]
#[command(version)]
struct Cli {
    #[arg(long, help = "Configuration file path")]
    config: Option<PathBuf>,

    #[arg(long, help = "Override the HTTP listen address")]
    listen: Option<SocketAddr>,

    #[arg(short, long, help = "Enable verbose logging")]
    verbose: bool,

    #[arg(short, long, help = "Enable quiet mode (minimal output)")]
    quiet: bool,
}

fn init_logging(cli: &Cli) {
    let level = if cli.quiet {
        "warn"
    } else if cli.verbose {
        "debug"
    } else {
        "info"
    };

    // SAFETY: Setting RUST_LOG environment variable is safe for logging configuration
    unsafe {
        std::env::set_var("RUST_LOG", level);
    }
    tracing_subscriber::fmt::init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(&cli);

    let config = match &cli.config {
        Some(path) => {
            log::info!("Loading configuration from: {}", path.display());
            Configuration::load_from_path(path).context("Failed to load configuration")?
        }
        None => Configuration::load().context("Failed to load configuration")?,
    };

    log::info!("Starting metricsink with {:?} backend", config.backend);

    let backend = writer::for_backend(&config)
        .await
        .context("Failed to construct backend writer")?;

    let addr = match cli.listen {
        Some(addr) => addr,
        None => config
            .http
            .listen
            .parse()
            .context("Invalid listen address")?,
    };

    let state = acceptor::RemoteWriteState { writer: backend };
    let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
    let server = tokio::spawn(acceptor::serve_http(addr, state, shutdown_rx));

    signal::ctrl_c()
        .await
        .context("Failed to listen for ctrl+c signal")?;
    log::info!("Shutdown signal received");

    let _ = shutdown_tx.send(());
    server.await.context("Server task failed")??;

    Ok(())
}
