//! # Linux IIO ADC Reader
//!
//! Production [`AdcReader`](super::AdcReader) backed by the Linux
//! industrial I/O subsystem: each channel is a sysfs attribute file
//! (e.g. `/sys/bus/iio/devices/iio:device0/in_voltage0_raw`) holding the
//! current raw code as decimal text.

use std::path::{Path, PathBuf};

use super::AdcReader;

/// ADC reader over two IIO sysfs raw-value attributes
///
/// Reads are plain sysfs file reads, the Linux equivalent of the register
/// read the sampling contract allows at the tick boundary. Failures are
/// not signalled: an unreadable or unparsable attribute yields code 0,
/// which propagates like any other garbage reading.
#[derive(Debug)]
pub struct IioAdc {
    voltage_path: PathBuf,
    current_path: PathBuf,
}

impl IioAdc {
    /// Create a reader over the two channel attribute paths
    ///
    /// # Arguments
    ///
    /// * `voltage_path` - sysfs attribute for the voltage channel
    /// * `current_path` - sysfs attribute for the current channel
    pub fn new<P: AsRef<Path>, Q: AsRef<Path>>(voltage_path: P, current_path: Q) -> Self {
        Self {
            voltage_path: voltage_path.as_ref().to_path_buf(),
            current_path: current_path.as_ref().to_path_buf(),
        }
    }

    fn read_raw(path: &Path) -> u16 {
        match std::fs::read_to_string(path) {
            Ok(text) => text.trim().parse::<u32>().map_or(0, |code| {
                code.min(u16::MAX as u32) as u16
            }),
            Err(_) => 0,
        }
    }
}

impl AdcReader for IioAdc {
    fn read_voltage_raw(&mut self) -> u16 {
        Self::read_raw(&self.voltage_path)
    }

    fn read_current_raw(&mut self) -> u16 {
        Self::read_raw(&self.current_path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_reads_decimal_attribute_values() {
        let dir = tempdir().unwrap();
        let v_path = dir.path().join("in_voltage0_raw");
        let c_path = dir.path().join("in_voltage1_raw");

        std::fs::write(&v_path, "1000\n").unwrap();
        std::fs::write(&c_path, "2000\n").unwrap();

        let mut adc = IioAdc::new(&v_path, &c_path);
        assert_eq!(adc.read_voltage_raw(), 1000);
        assert_eq!(adc.read_current_raw(), 2000);
    }

    #[test]
    fn test_missing_attribute_reads_as_zero() {
        let dir = tempdir().unwrap();
        let mut adc = IioAdc::new(
            dir.path().join("missing_v"),
            dir.path().join("missing_c"),
        );

        assert_eq!(adc.read_voltage_raw(), 0);
        assert_eq!(adc.read_current_raw(), 0);
    }

    #[test]
    fn test_garbage_attribute_reads_as_zero() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("in_voltage0_raw");
        std::fs::write(&path, "not-a-number\n").unwrap();

        let mut adc = IioAdc::new(&path, &path);
        assert_eq!(adc.read_voltage_raw(), 0);
    }

    #[test]
    fn test_oversized_code_clamps_to_u16() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("in_voltage0_raw");
        std::fs::write(&path, "70000\n").unwrap();

        let mut adc = IioAdc::new(&path, &path);
        assert_eq!(adc.read_voltage_raw(), u16::MAX);
    }
}
