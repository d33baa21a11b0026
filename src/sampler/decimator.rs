//! # Decimating Accumulator
//!
//! Averages N consecutive raw readings into one reported sample, reducing
//! the 100Hz tick rate to the buffered sample rate while preserving the
//! signal trend.

use crate::sample::Sample;

/// Accumulates raw readings and emits one averaged sample every
/// `factor` ticks
///
/// Averages are integer-truncated, matching the on-wire precision of the
/// raw codes. The timestamp is averaged over the same window, so it lands
/// mid-window; monotonic and device-relative, which is all the log format
/// requires.
#[derive(Debug)]
pub struct Decimator {
    factor: u32,
    ticks: u32,
    sum_t: u64,
    // 64-bit sums: full-scale codes cannot overflow at any factor
    sum_v: u64,
    sum_c: u64,
}

impl Decimator {
    /// Create a decimator with the given factor
    ///
    /// # Panics
    ///
    /// Panics if `factor` is zero. Configuration validation rejects a zero
    /// decimation factor before this is called.
    pub fn new(factor: u32) -> Self {
        assert!(factor > 0, "decimation factor must be non-zero");
        Self {
            factor,
            ticks: 0,
            sum_t: 0,
            sum_v: 0,
            sum_c: 0,
        }
    }

    /// Feed one raw reading; returns an averaged sample every `factor` calls
    ///
    /// # Arguments
    ///
    /// * `timestamp_ms` - Monotonic milliseconds at the tick boundary
    /// * `raw_voltage` - Raw voltage-channel code
    /// * `raw_current` - Raw current-channel code
    pub fn feed(&mut self, timestamp_ms: u32, raw_voltage: u16, raw_current: u16) -> Option<Sample> {
        self.sum_t += timestamp_ms as u64;
        self.sum_v += raw_voltage as u64;
        self.sum_c += raw_current as u64;
        self.ticks += 1;

        if self.ticks < self.factor {
            return None;
        }

        let sample = Sample::new(
            (self.sum_t / self.factor as u64) as u32,
            (self.sum_v / self.factor as u64) as u16,
            (self.sum_c / self.factor as u64) as u16,
        );

        self.ticks = 0;
        self.sum_t = 0;
        self.sum_v = 0;
        self.sum_c = 0;

        Some(sample)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_emits_every_nth_tick() {
        let mut decimator = Decimator::new(4);

        assert!(decimator.feed(0, 100, 200).is_none());
        assert!(decimator.feed(10, 100, 200).is_none());
        assert!(decimator.feed(20, 100, 200).is_none());
        assert!(decimator.feed(30, 100, 200).is_some());
    }

    #[test]
    fn test_averages_are_integer_truncated() {
        let mut decimator = Decimator::new(4);

        decimator.feed(0, 1, 0);
        decimator.feed(1, 1, 1);
        decimator.feed(2, 1, 1);
        let sample = decimator.feed(3, 2, 1).expect("fourth tick emits");

        // sums: t=6, v=5, c=3 -> truncated over 4: t=1, v=1, c=0
        assert_eq!(sample.timestamp_ms, 1);
        assert_eq!(sample.raw_voltage, 1);
        assert_eq!(sample.raw_current, 0);
    }

    #[test]
    fn test_state_resets_between_windows() {
        let mut decimator = Decimator::new(2);

        assert!(decimator.feed(0, 1000, 2000).is_none());
        let first = decimator.feed(10, 1000, 2000).expect("second tick emits");
        assert_eq!(first.raw_voltage, 1000);

        // A fresh window must not carry the previous sums
        decimator.feed(20, 0, 0);
        let second = decimator.feed(30, 0, 0).expect("second window emits");
        assert_eq!(second.raw_voltage, 0);
        assert_eq!(second.raw_current, 0);
        assert_eq!(second.timestamp_ms, 25);
    }

    #[test]
    fn test_full_scale_sums_do_not_overflow() {
        let mut decimator = Decimator::new(8);

        let mut emitted = None;
        for tick in 0..8 {
            emitted = decimator.feed(tick * 10, u16::MAX, u16::MAX);
        }

        let sample = emitted.expect("eighth tick emits");
        assert_eq!(sample.raw_voltage, u16::MAX);
        assert_eq!(sample.raw_current, u16::MAX);
    }

    #[test]
    fn test_large_factor_full_scale_does_not_overflow() {
        // A factor past 65537 pushes full-scale sums beyond u32 range
        let factor = 70_000;
        let mut decimator = Decimator::new(factor);

        let mut emitted = None;
        for _ in 0..factor {
            emitted = decimator.feed(10, u16::MAX, u16::MAX);
        }

        let sample = emitted.expect("final tick emits");
        assert_eq!(sample.raw_voltage, u16::MAX);
        assert_eq!(sample.raw_current, u16::MAX);
        assert_eq!(sample.timestamp_ms, 10);
    }

    #[test]
    fn test_factor_one_passes_samples_through() {
        let mut decimator = Decimator::new(1);

        let sample = decimator.feed(42, 7, 9).expect("every tick emits");
        assert_eq!(sample, Sample::new(42, 7, 9));
    }

    #[test]
    #[should_panic(expected = "non-zero")]
    fn test_zero_factor_panics() {
        Decimator::new(0);
    }
}
