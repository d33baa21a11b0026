//! # Error Types
//!
//! Custom error types for the ECU node using `thiserror`.

use thiserror::Error;

/// Main error type for the ECU node
#[derive(Debug, Error)]
pub enum EcuNodeError {
    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(#[from] toml::de::Error),

    /// I/O errors (persistent log, sysfs ADC paths)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Wireless link errors (association timeout, missing address info)
    #[error("Link error: {0}")]
    Link(String),

    /// Collector transport errors (registration or bulk upload failed)
    #[error("Transport error: {0}")]
    Transport(String),
}

/// Result type alias for the ECU node
pub type Result<T> = std::result::Result<T, EcuNodeError>;
