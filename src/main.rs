//! rrsocks - Round-Robin SOCKS5 Relay
//!
//! This is the main entry point for the rrsocks application.

use anyhow::{Context, Result};
use clap::Parser;
use rrsocks::config::load_config;
use rrsocks::supervisor::Supervisor;
use std::path::PathBuf;
use tracing::{error, info, Level};
use tracing_subscriber::FmtSubscriber;

/// rrsocks - Round-robin SOCKS5 relay for proxy engine backends
#[derive(Parser, Debug)]
#[command(name = "rrsocks")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to configuration file
    #[arg(short, long)]
    config: PathBuf,

    /// Engine document to scan, overrides `relay.document`
    #[arg(short, long)]
    document: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "info")]
    log_level: String,

    /// Enable JSON logging format
    #[arg(long)]
    json_log: bool,
}

/// What the signal loop was woken by
enum Signal {
    Shutdown,
    Reload,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Setup logging
    setup_logging(&args.log_level, args.json_log)?;

    // Load configuration
    let config = load_config(&args.config)?;
    let document = args
        .document
        .or_else(|| config.relay.document.clone())
        .context("No engine document given, set relay.document or pass --document")?;

    info!("rrsocks v{}", rrsocks::VERSION);
    info!("Configuration loaded from: {:?}", args.config);
    info!("Engine document: {:?}", document);

    let supervisor = Supervisor::new(config.relay)?;
    info!("Session policy: {:?}", supervisor.config().session_policy);
    let groups = supervisor.start_from_config(&document).await?;
    for group in &groups {
        info!("Serving group {}", group);
    }

    loop {
        match wait_for_signal().await? {
            Signal::Shutdown => break,
            Signal::Reload => {
                info!("Reloading groups from {:?}", document);
                match supervisor.start_from_config(&document).await {
                    Ok(groups) => info!("Reload complete, {} group(s) active", groups.len()),
                    Err(e) => error!("Reload failed, no groups active: {}", e),
                }
            }
        }
    }

    supervisor.stop_all().await;
    info!("rrsocks stopped");
    Ok(())
}

/// Wait for Ctrl+C, SIGTERM or SIGHUP
#[cfg(unix)]
async fn wait_for_signal() -> Result<Signal> {
    use tokio::signal::unix::{signal, SignalKind};

    let mut sigterm =
        signal(SignalKind::terminate()).context("Failed to setup SIGTERM handler")?;
    let mut sighup = signal(SignalKind::hangup()).context("Failed to setup SIGHUP handler")?;

    tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            info!("Received Ctrl+C, shutting down...");
            Ok(Signal::Shutdown)
        }
        _ = sigterm.recv() => {
            info!("Received SIGTERM, shutting down...");
            Ok(Signal::Shutdown)
        }
        _ = sighup.recv() => {
            info!("Received SIGHUP");
            Ok(Signal::Reload)
        }
    }
}

/// Wait for Ctrl+C
#[cfg(not(unix))]
async fn wait_for_signal() -> Result<Signal> {
    tokio::signal::ctrl_c().await?;
    info!("Received Ctrl+C, shutting down...");
    Ok(Signal::Shutdown)
}

/// Setup logging based on configuration
fn setup_logging(level: &str, json: bool) -> Result<()> {
    let level = match level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" | "warning" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    if json {
        let subscriber = FmtSubscriber::builder()
            .with_max_level(level)
            .json()
            .finish();
        tracing::subscriber::set_global_default(subscriber)?;
    } else {
        let subscriber = FmtSubscriber::builder()
            .with_max_level(level)
            .with_target(true)
            .with_thread_ids(false)
            .with_thread_names(false)
            .finish();
        tracing::subscriber::set_global_default(subscriber)?;
    }

    Ok(())
}
