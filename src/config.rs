//! # Configuration Module
//!
//! Handles loading and validating node configuration from TOML files.

use serde::de::Error;
use serde::Deserialize;
use std::fs;
use std::path::Path;

use crate::codec::Calibration;
use crate::error::Result;

/// Main configuration structure
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub device: DeviceConfig,
    pub sampling: SamplingConfig,
    pub calibration: CalibrationConfig,
    pub storage: StorageConfig,
    pub network: NetworkConfig,
}

/// Device identity configuration
#[derive(Debug, Deserialize, Clone)]
pub struct DeviceConfig {
    /// Serial identifier sent to the collector; empty means "derive from
    /// the machine id"
    #[serde(default)]
    pub serial: String,
}

/// Acquisition configuration
#[derive(Debug, Deserialize, Clone)]
pub struct SamplingConfig {
    #[serde(default = "default_tick_hz")]
    pub tick_hz: u32,

    #[serde(default = "default_decimation")]
    pub decimation: u32,

    #[serde(default = "default_buffer_capacity")]
    pub buffer_capacity: usize,

    #[serde(default = "default_voltage_channel")]
    pub voltage_channel: String,

    #[serde(default = "default_current_channel")]
    pub current_channel: String,
}

/// Analog front-end calibration constants
#[derive(Debug, Deserialize, Clone)]
pub struct CalibrationConfig {
    #[serde(default = "default_v_ref")]
    pub v_ref: f32,

    #[serde(default = "default_adc_max")]
    pub adc_max: u16,

    #[serde(default = "default_voltage_gain")]
    pub voltage_gain: f32,
}

impl CalibrationConfig {
    /// Convert to the codec's calibration value
    pub fn to_calibration(&self) -> Calibration {
        Calibration {
            v_ref: self.v_ref,
            adc_max: self.adc_max,
            voltage_gain: self.voltage_gain,
        }
    }
}

/// Persistent log configuration
#[derive(Debug, Deserialize, Clone)]
pub struct StorageConfig {
    #[serde(default = "default_log_path")]
    pub log_path: String,
}

/// Wireless link and collector configuration
#[derive(Debug, Deserialize, Clone)]
pub struct NetworkConfig {
    #[serde(default)]
    pub ssid: String,

    #[serde(default)]
    pub password: String,

    #[serde(default = "default_interface")]
    pub interface: String,

    #[serde(default = "default_placeholder_octet")]
    pub placeholder_octet: u8,

    #[serde(default = "default_collector_port")]
    pub collector_port: u16,

    #[serde(default = "default_connect_poll_ms")]
    pub connect_poll_ms: u64,

    #[serde(default = "default_connect_attempts")]
    pub connect_attempts: u32,

    #[serde(default = "default_upload_period_ms")]
    pub upload_period_ms: u64,

    #[serde(default = "default_chunk_records")]
    pub chunk_records: usize,

    #[serde(default = "default_chunk_delay_ms")]
    pub chunk_delay_ms: u64,
}

// Default value functions
fn default_tick_hz() -> u32 { 100 }
fn default_decimation() -> u32 { 4 }
fn default_buffer_capacity() -> usize { 1024 }
fn default_voltage_channel() -> String {
    "/sys/bus/iio/devices/iio:device0/in_voltage0_raw".to_string()
}
fn default_current_channel() -> String {
    "/sys/bus/iio/devices/iio:device0/in_voltage1_raw".to_string()
}

fn default_v_ref() -> f32 { 3.3 }
fn default_adc_max() -> u16 { u16::MAX }
fn default_voltage_gain() -> f32 { 3.7 }

fn default_log_path() -> String { "recorded_data.bin".to_string() }

fn default_interface() -> String { "wlan0".to_string() }
fn default_placeholder_octet() -> u8 { 77 }
fn default_collector_port() -> u16 { 8080 }
fn default_connect_poll_ms() -> u64 { 500 }
fn default_connect_attempts() -> u32 { 6 }
fn default_upload_period_ms() -> u64 { 2000 }
fn default_chunk_records() -> usize { 40 }
fn default_chunk_delay_ms() -> u64 { 200 }

impl Config {
    /// Load configuration from a TOML file
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the configuration file
    ///
    /// # Returns
    ///
    /// * `Result<Config>` - Loaded and validated configuration
    ///
    /// # Errors
    ///
    /// Returns error if:
    /// - File cannot be read
    /// - TOML parsing fails
    /// - Validation fails
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration values
    ///
    /// # Errors
    ///
    /// Returns error if any configuration value is out of valid range
    fn validate(&self) -> Result<()> {
        if self.sampling.tick_hz == 0 {
            return Err(config_error("sampling tick_hz must be non-zero"));
        }
        if self.sampling.decimation == 0 {
            return Err(config_error("sampling decimation must be non-zero"));
        }
        if !self.sampling.buffer_capacity.is_power_of_two() {
            return Err(config_error("sampling buffer_capacity must be a power of two"));
        }
        if self.calibration.adc_max == 0 {
            return Err(config_error("calibration adc_max must be non-zero"));
        }
        if self.storage.log_path.is_empty() {
            return Err(config_error("storage log_path cannot be empty"));
        }
        if self.network.ssid.is_empty() {
            return Err(config_error("network ssid cannot be empty"));
        }
        if self.network.connect_attempts == 0 {
            return Err(config_error("network connect_attempts must be non-zero"));
        }
        if self.network.chunk_records == 0 {
            return Err(config_error("network chunk_records must be non-zero"));
        }
        // Zero periods would panic in the timers built from them
        if self.network.connect_poll_ms == 0 {
            return Err(config_error("network connect_poll_ms must be non-zero"));
        }
        if self.network.upload_period_ms == 0 {
            return Err(config_error("network upload_period_ms must be non-zero"));
        }

        Ok(())
    }

    /// Resolve the device serial identifier
    ///
    /// Uses the configured serial if set; otherwise derives a pseudo-unique
    /// one from the machine id, falling back to a fixed placeholder when no
    /// machine id is available.
    pub fn device_serial(&self) -> String {
        if !self.device.serial.is_empty() {
            return self.device.serial.clone();
        }

        match fs::read_to_string("/etc/machine-id") {
            Ok(id) if !id.trim().is_empty() => id.trim().to_string(),
            _ => "ecu-node-unknown".to_string(),
        }
    }
}

fn config_error(message: &str) -> crate::error::EcuNodeError {
    crate::error::EcuNodeError::Config(toml::de::Error::custom(message))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const MINIMAL_CONFIG: &str = r#"
[device]

[sampling]

[calibration]

[storage]

[network]
ssid = "test-net"
password = "secret"
"#;

    fn load_from_str(contents: &str) -> Result<Config> {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        Config::load(file.path())
    }

    #[test]
    fn test_minimal_config_gets_defaults() {
        let config = load_from_str(MINIMAL_CONFIG).unwrap();

        assert_eq!(config.sampling.tick_hz, 100);
        assert_eq!(config.sampling.decimation, 4);
        assert_eq!(config.sampling.buffer_capacity, 1024);
        assert_eq!(config.calibration.v_ref, 3.3);
        assert_eq!(config.calibration.adc_max, u16::MAX);
        assert_eq!(config.calibration.voltage_gain, 3.7);
        assert_eq!(config.storage.log_path, "recorded_data.bin");
        assert_eq!(config.network.placeholder_octet, 77);
        assert_eq!(config.network.collector_port, 8080);
        assert_eq!(config.network.connect_poll_ms, 500);
        assert_eq!(config.network.connect_attempts, 6);
        assert_eq!(config.network.chunk_records, 40);
        assert_eq!(config.network.chunk_delay_ms, 200);
    }

    #[test]
    fn test_explicit_values_override_defaults() {
        let config = load_from_str(
            r#"
[device]
serial = "bench-unit-3"

[sampling]
tick_hz = 200
decimation = 8
buffer_capacity = 2048

[calibration]
v_ref = 5.0
adc_max = 4095
voltage_gain = 11.0

[storage]
log_path = "/var/lib/ecu-node/staging.bin"

[network]
ssid = "lab"
password = "hunter2"
collector_port = 9090
chunk_records = 10
"#,
        )
        .unwrap();

        assert_eq!(config.device.serial, "bench-unit-3");
        assert_eq!(config.device_serial(), "bench-unit-3");
        assert_eq!(config.sampling.tick_hz, 200);
        assert_eq!(config.sampling.decimation, 8);
        assert_eq!(config.calibration.adc_max, 4095);
        assert_eq!(config.network.collector_port, 9090);
        assert_eq!(config.network.chunk_records, 10);
    }

    #[test]
    fn test_empty_ssid_is_rejected() {
        let result = load_from_str(
            r#"
[device]
[sampling]
[calibration]
[storage]
[network]
password = "secret"
"#,
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_non_power_of_two_capacity_is_rejected() {
        let result = load_from_str(
            r#"
[device]
[sampling]
buffer_capacity = 1000
[calibration]
[storage]
[network]
ssid = "net"
"#,
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_zero_decimation_is_rejected() {
        let result = load_from_str(
            r#"
[device]
[sampling]
decimation = 0
[calibration]
[storage]
[network]
ssid = "net"
"#,
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_zero_upload_period_is_rejected() {
        let result = load_from_str(
            r#"
[device]
[sampling]
[calibration]
[storage]
[network]
ssid = "net"
upload_period_ms = 0
"#,
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_zero_connect_poll_is_rejected() {
        let result = load_from_str(
            r#"
[device]
[sampling]
[calibration]
[storage]
[network]
ssid = "net"
connect_poll_ms = 0
"#,
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_zero_chunk_records_is_rejected() {
        let result = load_from_str(
            r#"
[device]
[sampling]
[calibration]
[storage]
[network]
ssid = "net"
chunk_records = 0
"#,
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_missing_file_is_an_io_error() {
        let result = Config::load("/nonexistent/path/config.toml");
        assert!(matches!(
            result,
            Err(crate::error::EcuNodeError::Io(_))
        ));
    }

    #[test]
    fn test_calibration_conversion() {
        let config = load_from_str(MINIMAL_CONFIG).unwrap();
        let calibration = config.calibration.to_calibration();

        assert_eq!(calibration.v_ref, 3.3);
        assert_eq!(calibration.adc_max, u16::MAX);
        assert_eq!(calibration.voltage_gain, 3.7);
    }
}
