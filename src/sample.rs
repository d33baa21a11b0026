//! # Sample Type
//!
//! One decimated reading produced by the sampler: a device-relative
//! monotonic timestamp plus the two raw ADC codes.
//!
//! A `Sample` packs exactly into one `u64`, which is what makes the ring
//! buffer's lock-free slot discipline possible: a slot is a single
//! `AtomicU64`, so a reader can never observe a half-written sample.

/// One decimated reading.
///
/// Produced only by the sampler; immutable once written into the ring
/// buffer. The timestamp is milliseconds since process start (wraps after
/// ~49.7 days, far beyond any single log's lifetime).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Sample {
    /// Monotonic, device-relative timestamp in milliseconds
    pub timestamp_ms: u32,
    /// Raw ADC code from the voltage channel
    pub raw_voltage: u16,
    /// Raw ADC code from the current channel
    pub raw_current: u16,
}

impl Sample {
    /// Create a new sample
    pub fn new(timestamp_ms: u32, raw_voltage: u16, raw_current: u16) -> Self {
        Self {
            timestamp_ms,
            raw_voltage,
            raw_current,
        }
    }

    /// Pack into a single word: `[timestamp:32][voltage:16][current:16]`
    ///
    /// # Returns
    ///
    /// * `u64` - Packed representation, suitable for an atomic ring slot
    pub fn pack(&self) -> u64 {
        ((self.timestamp_ms as u64) << 32)
            | ((self.raw_voltage as u64) << 16)
            | (self.raw_current as u64)
    }

    /// Unpack from the single-word representation produced by [`pack`](Self::pack)
    pub fn unpack(word: u64) -> Self {
        Self {
            timestamp_ms: (word >> 32) as u32,
            raw_voltage: (word >> 16) as u16,
            raw_current: word as u16,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pack_unpack_roundtrip() {
        let sample = Sample::new(123_456, 1000, 2000);
        let word = sample.pack();
        assert_eq!(Sample::unpack(word), sample);
    }

    #[test]
    fn test_pack_unpack_extremes() {
        let zero = Sample::new(0, 0, 0);
        assert_eq!(Sample::unpack(zero.pack()), zero);

        let max = Sample::new(u32::MAX, u16::MAX, u16::MAX);
        assert_eq!(Sample::unpack(max.pack()), max);
    }

    #[test]
    fn test_pack_fields_do_not_overlap() {
        // Each field set in isolation must only affect its own bits
        let t_only = Sample::new(u32::MAX, 0, 0).pack();
        let v_only = Sample::new(0, u16::MAX, 0).pack();
        let c_only = Sample::new(0, 0, u16::MAX).pack();

        assert_eq!(t_only & v_only, 0);
        assert_eq!(t_only & c_only, 0);
        assert_eq!(v_only & c_only, 0);
        assert_eq!(t_only | v_only | c_only, u64::MAX);
    }
}
