//! # Binary Log Codec
//!
//! Encodes and decodes the fixed-width 6-byte record format shared by the
//! on-storage persistent log and the collector wire payload.
//!
//! Record layout (little-endian):
//!
//! ```text
//! Byte 0-1: timestamp in centiseconds (u16, wraps at 655.35s)
//! Byte 2-3: raw voltage ADC code     (u16)
//! Byte 4-5: raw current ADC code     (u16)
//! ```
//!
//! The centisecond timestamp wraps after ~10.9 minutes; records are flushed
//! and uploaded far more frequently than that, so the wrap is accepted in
//! exchange for the 2-byte field.

use serde::Serialize;

use crate::sample::Sample;

/// Size of one encoded log record in bytes
pub const RECORD_SIZE: usize = 6;

/// Hardware calibration constants for converting raw ADC codes to
/// physical units
///
/// These describe the analog front end, not the data: the ADC reference
/// voltage, the full-scale code, and the voltage-divider gain on the
/// voltage channel. They come from configuration and never change at
/// runtime.
#[derive(Debug, Clone, Copy)]
pub struct Calibration {
    /// ADC reference voltage in volts
    pub v_ref: f32,
    /// ADC full-scale code
    pub adc_max: u16,
    /// Voltage-divider/sensor scale factor on the voltage channel
    pub voltage_gain: f32,
}

impl Default for Calibration {
    fn default() -> Self {
        Self {
            v_ref: 3.3,
            adc_max: u16::MAX,
            voltage_gain: 3.7,
        }
    }
}

/// A decoded record in physical units
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DecodedSample {
    /// Seconds since the record epoch (centisecond resolution)
    pub time_s: f32,
    /// Bus voltage in volts
    pub voltage_v: f32,
    /// Load current in amps
    pub current_a: f32,
}

impl DecodedSample {
    /// Convert to the collector's wire representation
    pub fn to_wire(&self) -> WireSample {
        WireSample {
            v: format!("{:.2}", self.voltage_v),
            c: format!("{:.2}", self.current_a),
            t: format!("{:.2}", self.time_s),
        }
    }
}

/// One record of the collector's bulk-ingestion payload
///
/// Fields are fixed-precision strings (two decimals) so the payload size
/// stays predictable regardless of the underlying float values.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct WireSample {
    /// Voltage in volts, two decimals
    pub v: String,
    /// Current in amps, two decimals
    pub c: String,
    /// Time in seconds, two decimals
    pub t: String,
}

/// Encode a sample into one 6-byte log record
///
/// The millisecond timestamp is converted to centiseconds with
/// round-to-nearest (`(ms + 5) / 10`) and truncated into u16 (wrapping).
///
/// # Arguments
///
/// * `sample` - Decimated sample to encode
///
/// # Returns
///
/// * `[u8; RECORD_SIZE]` - Little-endian record bytes
pub fn encode_record(sample: &Sample) -> [u8; RECORD_SIZE] {
    let t_cs = ((sample.timestamp_ms as u64 + 5) / 10) as u16;

    let mut record = [0u8; RECORD_SIZE];
    record[0..2].copy_from_slice(&t_cs.to_le_bytes());
    record[2..4].copy_from_slice(&sample.raw_voltage.to_le_bytes());
    record[4..6].copy_from_slice(&sample.raw_current.to_le_bytes());
    record
}

/// Decode one 6-byte log record into physical units
///
/// Conversion follows the analog front end: both channels scale as
/// `code * v_ref / adc_max`, with the voltage channel additionally
/// multiplied by the divider gain.
///
/// # Arguments
///
/// * `record` - Little-endian record bytes
/// * `calibration` - Hardware calibration constants
pub fn decode_record(record: &[u8; RECORD_SIZE], calibration: &Calibration) -> DecodedSample {
    let t_cs = u16::from_le_bytes([record[0], record[1]]);
    let raw_v = u16::from_le_bytes([record[2], record[3]]);
    let raw_c = u16::from_le_bytes([record[4], record[5]]);

    let scale = calibration.v_ref / calibration.adc_max as f32;

    DecodedSample {
        time_s: t_cs as f32 / 100.0,
        voltage_v: raw_v as f32 * scale * calibration.voltage_gain,
        current_a: raw_c as f32 * scale,
    }
}
