//! Modbus RTU polling daemon for multi-phase grid power meters.
//!
//! Polls each configured meter on its own serial link and prints one JSON
//! reading snapshot per poll cycle to stdout.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use meterd::config::DaemonConfig;
use meterd::engine::{QueryEngine, RetryPolicy};
use meterd::producer::Registry;
use meterd::transport::RtuTransport;
use meterd_common::{Format, LoggingConfig, encode};

/// Polls Modbus RTU power meters and prints reading snapshots.
#[derive(Parser, Debug)]
#[command(name = "meterd")]
#[command(about = "Polls Modbus RTU power meters and prints readings")]
#[command(version)]
struct Args {
    /// Path to configuration file (JSON5 format)
    #[arg(short, long, default_value = "meterd.json5")]
    config: PathBuf,

    /// Override log level (trace, debug, info, warn, error).
    #[arg(long)]
    log_level: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Load configuration
    let config = DaemonConfig::load_from_file(&args.config)
        .with_context(|| format!("Failed to load config from {:?}", args.config))?;

    // Initialize logging
    let log_config = LoggingConfig {
        level: args
            .log_level
            .clone()
            .unwrap_or_else(|| config.logging.level.clone()),
        format: config.logging.format,
    };
    meterd_common::init_tracing(&log_config)
        .map_err(|e| anyhow::anyhow!("Failed to init tracing: {}", e))?;

    info!("Starting meterd");
    info!("Loaded configuration from {:?}", args.config);

    // Producer registry, populated before any engine starts
    let registry = Registry::with_defaults().context("Failed to populate producer registry")?;

    let (tx, mut rx) = mpsc::channel(16);
    let shutdown = CancellationToken::new();

    // One engine task per serial link
    let mut engines = Vec::new();

    for meter in &config.meters {
        let constructor = registry.lookup(&meter.device_type).with_context(|| {
            format!(
                "Meter '{}': unknown device type '{}' (known: {:?})",
                meter.name,
                meter.device_type,
                registry.types()
            )
        })?;
        let producer = constructor();

        info!(
            meter = %meter.name,
            device = %producer.description(),
            port = %meter.serial.device,
            interval_secs = meter.poll_interval_secs,
            "Starting poller"
        );

        let transport = RtuTransport::new(
            meter.serial.clone(),
            meter.bus_address,
            Duration::from_millis(meter.timeout_ms),
        );

        let engine = QueryEngine::new(meter.name.as_str(), transport, producer, tx.clone())
            .with_poll_interval(Duration::from_secs(meter.poll_interval_secs))
            .with_retry(RetryPolicy {
                max_attempts: meter.retries,
                ..RetryPolicy::default()
            })
            .with_shutdown(shutdown.clone());

        let name = meter.name.clone();
        engines.push(tokio::spawn(async move {
            if let Err(e) = engine.run().await {
                error!(meter = %name, error = %e, "Query engine failed");
            }
        }));
    }
    drop(tx);

    info!(meters = config.meters.len(), "meterd running. Press Ctrl+C to stop.");

    // Presentation plumbing: one JSON line per reading on stdout.
    let printer = tokio::spawn(async move {
        while let Some(reading) = rx.recv().await {
            match encode(&reading, Format::Json) {
                Ok(payload) => println!("{}", String::from_utf8_lossy(&payload)),
                Err(e) => error!(error = %e, "Failed to encode reading"),
            }
        }
    });

    // Wait for shutdown signal
    tokio::signal::ctrl_c().await?;
    info!("Received shutdown signal");

    shutdown.cancel();
    for engine in engines {
        let _ = engine.await;
    }
    let _ = printer.await;

    info!("meterd stopped");
    Ok(())
}
