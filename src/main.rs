//! # ECU Node
//!
//! Energy monitoring node firmware: fixed-rate voltage/current sampling
//! into a lock-free ring buffer, periodic flushing to an append-only
//! binary log, and chunked, retry-capable upload to a collector service.

use anyhow::Result;
use std::sync::Arc;
use std::time::Instant;
use tokio::time::{interval, Duration};
use tracing::{info, warn};
use tracing_subscriber;

mod codec;
mod config;
mod error;
mod link;
mod ring;
mod sample;
mod sampler;
mod storage;
mod uplink;

use config::Config;
use link::{LinkManager, NetworkManagerWifi};
use ring::SampleRing;
use sampler::IioAdc;
use storage::PersistentLog;
use uplink::{HttpCollector, Uplink};

/// Configuration file used when no path is given on the command line
const DEFAULT_CONFIG_PATH: &str = "config/default.toml";

/// Main entry point for the ECU node
///
/// Initializes the pipeline and runs the scheduler loop that drives the
/// flush/upload cadence while the sampling thread runs asynchronously.
///
/// # Control Flow
///
/// 1. **Initialization**
///    - Set up logging with tracing subscriber
///    - Load and validate configuration
///    - Create the ring buffer and truncate the persistent log
///    - Spawn the sampling thread at the configured tick rate
///
/// 2. **Scheduler Loop**
///    - Run one upload cycle per period: flush the ring to the log, then
///      (when the link is up) deliver the log to the collector in chunks
///    - Recoverable link/transport failures are logged and retried on the
///      next cycle
///    - Handle Ctrl+C for graceful shutdown
///
/// 3. **Graceful Shutdown**
///    - Stop and join the sampling thread
///    - Log delivery and data-loss totals
///
/// # Errors
///
/// Returns error if configuration cannot be loaded or the pipeline cannot
/// be constructed. Runtime link and transport failures never terminate the
/// loop.
#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    info!("ECU node v{} starting...", env!("CARGO_PKG_VERSION"));

    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| DEFAULT_CONFIG_PATH.to_string());
    let config = Config::load(&config_path)?;
    info!("Loaded configuration from {}", config_path);

    let serial = config.device_serial();
    let calibration = config.calibration.to_calibration();
    let epoch = Instant::now();

    // Acquisition side: ring buffer plus the sampling thread (the sole
    // producer), running at the tick rate from startup to shutdown
    let ring = Arc::new(SampleRing::with_capacity(config.sampling.buffer_capacity));
    let adc = IioAdc::new(
        &config.sampling.voltage_channel,
        &config.sampling.current_channel,
    );
    let sampler_handle = sampler::spawn(
        adc,
        Arc::clone(&ring),
        config.sampling.tick_hz,
        config.sampling.decimation,
        epoch,
    )?;

    // Delivery side: staging log, link state machine, collector client
    let log = PersistentLog::create(&config.storage.log_path)?;
    info!("Persistent log at {}", log.path().display());

    let wifi = NetworkManagerWifi::new(config.network.interface.clone());
    let link = LinkManager::new(Box::new(wifi), &config.network);
    let collector = HttpCollector::new(config.network.collector_port)?;

    let mut uplink = Uplink::new(
        Arc::clone(&ring),
        log,
        link,
        Box::new(collector),
        serial.clone(),
        calibration,
        &config.network,
        epoch,
    );

    let mut cycle_interval = interval(Duration::from_millis(config.network.upload_period_ms));

    info!(
        "Node \"{}\" sampling at {}Hz (decimation {}), upload period {}ms",
        serial,
        config.sampling.tick_hz,
        config.sampling.decimation,
        config.network.upload_period_ms
    );
    info!("Press Ctrl+C to exit");

    // Scheduler loop
    loop {
        tokio::select! {
            _ = cycle_interval.tick() => {
                if let Err(e) = uplink.run_cycle().await {
                    // Transient by taxonomy: the log is intact and the next
                    // cycle retries
                    warn!("Upload cycle failed: {}", e);
                }
            }

            // Handle Ctrl+C for graceful shutdown
            _ = tokio::signal::ctrl_c() => {
                info!("Received Ctrl+C, shutting down...");
                break;
            }
        }
    }

    sampler_handle.stop();
    info!(
        "Shutdown complete: {} chunk(s) delivered, {} sample(s) lost to buffer overflow",
        uplink.chunks_sent_total(),
        uplink.samples_lost_total()
    );

    Ok(())
}
