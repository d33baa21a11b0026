//! # Uplink Module
//!
//! Drains the pipeline toward the collector: ring buffer to persistent
//! log, persistent log to the collector in bounded chunks, with the log
//! cleared only after every chunk was accepted.
//!
//! Delivery is at-least-once by design. A transport failure aborts the
//! remaining chunks and leaves the whole log intact (chunks already
//! accepted by the collector are not retracted), so the next cycle resends
//! from the top of the file. Deduplication is the collector's concern.

pub mod http;

pub use http::HttpCollector;

use std::net::Ipv4Addr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use tracing::{debug, info, warn};

use crate::codec::{Calibration, WireSample};
use crate::config::NetworkConfig;
use crate::error::Result;
use crate::link::LinkManager;
use crate::ring::SampleRing;
use crate::storage::PersistentLog;

/// RPC client boundary toward the collector service
///
/// Both calls resolve to "send bytes, get success/failure"; HTTP semantics
/// live entirely in the implementation.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Collector: Send {
    /// Best-effort device registration
    ///
    /// Identifies the node by serial and monotonic uptime. Failure is
    /// reported but never aborts an upload.
    async fn register(&self, addr: Ipv4Addr, serial: &str, uptime_ms: u64) -> Result<()>;

    /// Deliver one chunk of samples to the bulk-ingestion endpoint
    async fn send_batch(
        &self,
        addr: Ipv4Addr,
        serial: &str,
        batch: &[WireSample],
    ) -> Result<()>;
}

/// The periodic upload cycle
///
/// Owns the consumer side of the ring, the persistent log, the link state
/// machine, and the collector client. Driven by the scheduler loop; one
/// call to [`run_cycle`](Self::run_cycle) per period.
pub struct Uplink {
    ring: Arc<SampleRing>,
    log: PersistentLog,
    link: LinkManager,
    collector: Box<dyn Collector>,
    serial: String,
    calibration: Calibration,
    chunk_records: usize,
    chunk_delay: Duration,
    epoch: Instant,
    chunks_sent_total: u64,
}

impl Uplink {
    /// Wire up the upload cycle
    ///
    /// # Arguments
    ///
    /// * `ring` - Shared ring buffer (this is the only consumer)
    /// * `log` - Persistent staging log
    /// * `link` - Link state machine gating delivery
    /// * `collector` - RPC client toward the collector
    /// * `serial` - Device serial identifier
    /// * `calibration` - Raw-to-physical conversion constants
    /// * `config` - Network section (chunking and pacing parameters)
    /// * `epoch` - Timestamp origin for registration uptime
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        ring: Arc<SampleRing>,
        log: PersistentLog,
        link: LinkManager,
        collector: Box<dyn Collector>,
        serial: String,
        calibration: Calibration,
        config: &NetworkConfig,
        epoch: Instant,
    ) -> Self {
        Self {
            ring,
            log,
            link,
            collector,
            serial,
            calibration,
            chunk_records: config.chunk_records,
            chunk_delay: Duration::from_millis(config.chunk_delay_ms),
            epoch,
            chunks_sent_total: 0,
        }
    }

    /// Total chunks delivered since startup
    pub fn chunks_sent_total(&self) -> u64 {
        self.chunks_sent_total
    }

    /// Samples lost to ring overwrite since startup
    pub fn samples_lost_total(&self) -> u64 {
        self.ring.overflow_count()
    }

    /// Run one upload cycle
    ///
    /// 1. Drain the ring and append to the persistent log (always, so no
    ///    sample is lost to the log even while offline.
    /// 2. If the link is not up, attempt one connect cycle and return
    ///    without sending; delivery resumes on a later cycle.
    /// 3. Register with the collector (best-effort).
    /// 4. Send the log chunk by chunk, pacing with a small delay between
    ///    chunks.
    /// 5. Clear the log only after every chunk was accepted.
    ///
    /// # Errors
    ///
    /// Returns error on storage failures and on transport failures partway
    /// through a send. In the transport case the log is left intact and the
    /// next cycle retries from the beginning of the file.
    pub async fn run_cycle(&mut self) -> Result<()> {
        let drained = self.ring.drain_all();
        if !drained.is_empty() {
            self.log.append(&drained)?;
            debug!("Flushed {} sample(s) to the log", drained.len());
        }

        if !self.link.check_link().await {
            // One connect cycle per period while offline; sampling and
            // flushing above are never blocked on this.
            if let Err(e) = self.link.connect().await {
                warn!("Connect attempt failed: {}", e);
            }
            return Ok(());
        }

        let Some(addr) = self.link.collector_addr() else {
            return Ok(());
        };

        if self.log.is_empty()? {
            debug!("Nothing staged, skipping upload");
            return Ok(());
        }

        let uptime_ms = self.epoch.elapsed().as_millis() as u64;
        if let Err(e) = self.collector.register(addr, &self.serial, uptime_ms).await {
            warn!("Registration failed (continuing with upload): {}", e);
        }

        let mut chunks_sent = 0u64;
        for chunk in self.log.read_chunks(self.chunk_records, self.calibration)? {
            let chunk = chunk?;
            let batch: Vec<WireSample> = chunk.iter().map(|d| d.to_wire()).collect();

            // A transport error aborts the rest of this cycle; the log
            // stays intact and the next cycle retries from the top.
            self.collector.send_batch(addr, &self.serial, &batch).await?;
            chunks_sent += 1;

            // Pace chunk requests to bound the burst rate
            tokio::time::sleep(self.chunk_delay).await;
        }

        self.log.clear()?;
        self.chunks_sent_total += chunks_sent;
        info!("Sent {} chunk(s), log cleared", chunks_sent);
        Ok(())
    }
}
