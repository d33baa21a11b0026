//! # Sampling Module
//!
//! The acquisition side of the pipeline: a dedicated thread ticks at a
//! fixed rate, reads the two ADC channels, and feeds a decimating
//! accumulator that emits one averaged sample into the ring buffer every
//! N ticks.
//!
//! The sampling thread is the producer half of the ring's SPSC contract
//! and is preemptive with respect to the cooperative scheduler loop: it
//! keeps running during uploads, link outages, and everything else. Its
//! per-tick work is bounded and small: two channel reads, a timestamp,
//! and integer accumulation. No storage I/O, no network I/O, no
//! allocation, no blocking, no error signalling: a misbehaving ADC simply
//! propagates garbage codes.

pub mod decimator;
pub mod iio;

pub use decimator::Decimator;
pub use iio::IioAdc;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use tracing::{debug, info, warn};

use crate::ring::SampleRing;

/// Trait for reading the two analog channels
///
/// Implementations must be cheap and non-blocking: this is called on every
/// tick of the sampling thread. Hardware faults are not signalled; a
/// failed read returns whatever garbage the implementation chooses and the
/// sample propagates as-is.
pub trait AdcReader: Send {
    /// Read the raw code from the voltage channel
    fn read_voltage_raw(&mut self) -> u16;

    /// Read the raw code from the current channel
    fn read_current_raw(&mut self) -> u16;
}

/// Handle to a running sampling thread
///
/// Dropping the handle without calling [`stop`](Self::stop) leaves the
/// thread running for the process lifetime, which is the normal mode for
/// the node; `stop` exists for graceful shutdown and tests.
pub struct SamplerHandle {
    stop: Arc<AtomicBool>,
    thread: Option<JoinHandle<()>>,
}

impl SamplerHandle {
    /// Signal the sampling thread to stop and wait for it to exit
    pub fn stop(mut self) {
        self.stop.store(true, Ordering::Relaxed);
        if let Some(thread) = self.thread.take() {
            if thread.join().is_err() {
                warn!("Sampling thread panicked before shutdown");
            }
        }
    }
}

/// Spawn the sampling thread
///
/// The thread ticks on absolute deadlines at `tick_hz`: each tick reads
/// both channels, stamps them with milliseconds elapsed since `epoch`, and
/// feeds the decimator; every `decimation` ticks one averaged sample lands
/// in the ring.
///
/// # Arguments
///
/// * `adc` - Channel reader, moved onto the thread
/// * `ring` - Shared ring buffer (this thread is the only producer)
/// * `tick_hz` - Tick rate in Hz (e.g. 100)
/// * `decimation` - Ticks averaged per emitted sample (e.g. 4)
/// * `epoch` - Timestamp origin, shared with the rest of the node
///
/// # Errors
///
/// Returns error if the OS refuses to spawn the thread.
///
/// # Panics
///
/// Panics if `tick_hz` or `decimation` is zero. Configuration validation
/// rejects both before this is called.
pub fn spawn<A: AdcReader + 'static>(
    mut adc: A,
    ring: Arc<SampleRing>,
    tick_hz: u32,
    decimation: u32,
    epoch: Instant,
) -> crate::error::Result<SamplerHandle> {
    assert!(tick_hz > 0, "tick rate must be non-zero");

    let stop = Arc::new(AtomicBool::new(false));
    let stop_flag = Arc::clone(&stop);

    let period = Duration::from_nanos(1_000_000_000 / tick_hz as u64);
    let mut decimator = Decimator::new(decimation);

    let thread = std::thread::Builder::new()
        .name("sampler".to_string())
        .spawn(move || {
            info!(
                "Sampling thread started: {}Hz ticks, decimation {}",
                tick_hz, decimation
            );

            let mut next_tick = Instant::now() + period;
            while !stop_flag.load(Ordering::Relaxed) {
                let now = Instant::now();
                if next_tick > now {
                    std::thread::sleep(next_tick - now);
                }
                next_tick += period;

                // Raw reads happen at the tick boundary to avoid jitter;
                // everything after is integer arithmetic.
                let raw_v = adc.read_voltage_raw();
                let raw_c = adc.read_current_raw();
                let t_ms = epoch.elapsed().as_millis() as u32;

                if let Some(sample) = decimator.feed(t_ms, raw_v, raw_c) {
                    ring.push(sample);
                }
            }

            debug!("Sampling thread stopped");
        })?;

    Ok(SamplerHandle {
        stop,
        thread: Some(thread),
    })
}

#[cfg(test)]
pub mod mocks {
    use super::*;

    /// Mock ADC returning fixed codes on both channels
    pub struct ConstantAdc {
        pub voltage: u16,
        pub current: u16,
    }

    impl AdcReader for ConstantAdc {
        fn read_voltage_raw(&mut self) -> u16 {
            self.voltage
        }

        fn read_current_raw(&mut self) -> u16 {
            self.current
        }
    }
}
