//! # Sample Ring Buffer
//!
//! Fixed-capacity, lock-free, single-producer/single-consumer ring buffer
//! shared between the sampling thread and the upload cycle.
//!
//! The producer never blocks: if the consumer falls behind, the oldest
//! unread samples are silently overwritten. This is documented
//! data-loss-under-overload behavior, not an error; the alternative
//! (blocking or allocating in the sampling path) would break the sampler's
//! bounded-time contract. Lost samples are counted so operators can observe
//! sustained backpressure without changing the drop semantics.
//!
//! ## Concurrency contract
//!
//! Exactly one producer and exactly one consumer. Each slot is a single
//! `AtomicU64` holding a packed [`Sample`], and the write cursor is stored
//! with `Release` ordering after the slot, so the consumer (which loads the
//! cursor with `Acquire`) can never observe a cursor advance before the
//! corresponding sample is fully visible. No locks are taken on either path.

use std::sync::atomic::{AtomicU64, Ordering};

use crate::sample::Sample;

/// Lock-free SPSC ring buffer of decimated samples
///
/// Created once at startup and shared (via `Arc`) for the process lifetime;
/// never resized.
pub struct SampleRing {
    /// Slot storage; each slot is one packed sample
    slots: Box<[AtomicU64]>,
    /// Capacity mask (capacity is a power of two)
    mask: u64,
    /// Free-running count of pushed samples; owned by the producer
    write_cursor: AtomicU64,
    /// Free-running count of drained samples; owned by the consumer
    read_cursor: AtomicU64,
    /// Count of samples lost to overwrite-on-full
    overflow: AtomicU64,
}

impl SampleRing {
    /// Create a ring with the given capacity
    ///
    /// # Arguments
    ///
    /// * `capacity` - Number of slots; must be a power of two (cheap index
    ///   masking instead of modulo)
    ///
    /// # Panics
    ///
    /// Panics if `capacity` is zero or not a power of two. Configuration
    /// validation rejects such values before construction.
    pub fn with_capacity(capacity: usize) -> Self {
        assert!(
            capacity.is_power_of_two(),
            "ring capacity must be a power of two, got {}",
            capacity
        );

        let slots = (0..capacity).map(|_| AtomicU64::new(0)).collect();

        Self {
            slots,
            mask: (capacity - 1) as u64,
            write_cursor: AtomicU64::new(0),
            read_cursor: AtomicU64::new(0),
            overflow: AtomicU64::new(0),
        }
    }

    /// Number of slots in the ring
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Push one sample; producer side only
    ///
    /// Never blocks and never fails. If the ring is full the oldest unread
    /// sample is overwritten; the loss is accounted for at the next drain.
    pub fn push(&self, sample: Sample) {
        let w = self.write_cursor.load(Ordering::Relaxed);
        self.slots[(w & self.mask) as usize].store(sample.pack(), Ordering::Relaxed);
        // Release pairs with the Acquire in drain_all: the slot store above
        // is visible before the cursor advance is.
        self.write_cursor.store(w + 1, Ordering::Release);
    }

    /// Drain every sample written up to the moment of the call; consumer
    /// side only
    ///
    /// Non-blocking snapshot drain: takes the producer's cursor once and
    /// returns everything up to it, in insertion order, without waiting for
    /// new data. If the producer has lapped the consumer, only the most
    /// recent `capacity` samples are returned and the rest are counted as
    /// overflow.
    ///
    /// If the producer laps the consumer *during* the drain, an overwritten
    /// slot yields the newer sample in the older one's position, which is still a
    /// complete, valid sample, consistent with the lossy contract.
    ///
    /// # Returns
    ///
    /// * `Vec<Sample>` - At most `capacity` samples, oldest first
    pub fn drain_all(&self) -> Vec<Sample> {
        let w = self.write_cursor.load(Ordering::Acquire);
        let mut r = self.read_cursor.load(Ordering::Relaxed);

        let capacity = self.capacity() as u64;
        if w - r > capacity {
            let lost = w - r - capacity;
            self.overflow.fetch_add(lost, Ordering::Relaxed);
            r = w - capacity;
        }

        let mut drained = Vec::with_capacity((w - r) as usize);
        while r != w {
            let word = self.slots[(r & self.mask) as usize].load(Ordering::Relaxed);
            drained.push(Sample::unpack(word));
            r += 1;
        }

        self.read_cursor.store(w, Ordering::Release);
        drained
    }

    /// Total number of samples lost to overwrite-on-full so far
    pub fn overflow_count(&self) -> u64 {
        self.overflow.load(Ordering::Relaxed)
    }
}

impl std::fmt::Debug for SampleRing {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SampleRing")
            .field("capacity", &self.capacity())
            .field("overflow", &self.overflow_count())
            .finish_non_exhaustive()
    }
}
