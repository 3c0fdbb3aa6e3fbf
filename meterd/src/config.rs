//! Daemon configuration.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;
use thiserror::Error;

use meterd_common::LoggingConfig;

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to parse config: {0}")]
    Parse(#[from] json5::Error),
    #[error("Validation error: {0}")]
    Validation(String),
}

/// Complete daemon configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DaemonConfig {
    /// Meters to poll
    pub meters: Vec<MeterConfig>,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Configuration for a single metered serial link.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MeterConfig {
    /// Meter name (used in published readings and logs)
    pub name: String,

    /// Device family identifier used for registry lookup (e.g. "sdm")
    pub device_type: String,

    /// Serial link settings
    pub serial: SerialConfig,

    /// Modbus bus/slave address (1-247)
    #[serde(default = "default_bus_address")]
    pub bus_address: u8,

    /// Poll interval in seconds
    #[serde(default = "default_poll_interval")]
    pub poll_interval_secs: u64,

    /// Per-request timeout in milliseconds
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    /// Read attempts per register before the poll cycle is abandoned
    #[serde(default = "default_retries")]
    pub retries: u32,
}

fn default_bus_address() -> u8 {
    1
}

fn default_poll_interval() -> u64 {
    10
}

fn default_timeout_ms() -> u64 {
    1000
}

fn default_retries() -> u32 {
    3
}

/// Serial port settings for one RTU link.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SerialConfig {
    /// Serial port path (e.g., "/dev/ttyUSB0" or "COM1")
    pub device: String,

    /// Baud rate (default: 9600)
    #[serde(default = "default_baud_rate")]
    pub baud_rate: u32,

    /// Data bits (default: 8)
    #[serde(default = "default_data_bits")]
    pub data_bits: u8,

    /// Parity: "none", "even", or "odd" (default: "none")
    #[serde(default = "default_parity")]
    pub parity: String,

    /// Stop bits: 1 or 2 (default: 1)
    #[serde(default = "default_stop_bits")]
    pub stop_bits: u8,
}

fn default_baud_rate() -> u32 {
    9600
}

fn default_data_bits() -> u8 {
    8
}

fn default_parity() -> String {
    "none".to_string()
}

fn default_stop_bits() -> u8 {
    1
}

impl DaemonConfig {
    /// Load configuration from a JSON5 file.
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let config: DaemonConfig = json5::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.meters.is_empty() {
            return Err(ConfigError::Validation(
                "At least one meter must be configured".to_string(),
            ));
        }

        let mut names = HashSet::new();
        let mut devices = HashSet::new();

        for meter in &self.meters {
            if meter.name.is_empty() {
                return Err(ConfigError::Validation(
                    "Meter name cannot be empty".to_string(),
                ));
            }

            if !names.insert(meter.name.as_str()) {
                return Err(ConfigError::Validation(format!(
                    "Duplicate meter name '{}'",
                    meter.name
                )));
            }

            if meter.bus_address == 0 || meter.bus_address > 247 {
                return Err(ConfigError::Validation(format!(
                    "Meter '{}': bus_address must be 1-247",
                    meter.name
                )));
            }

            if meter.poll_interval_secs == 0 {
                return Err(ConfigError::Validation(format!(
                    "Meter '{}': poll_interval_secs must be at least 1",
                    meter.name
                )));
            }

            if meter.retries == 0 {
                return Err(ConfigError::Validation(format!(
                    "Meter '{}': retries must be at least 1",
                    meter.name
                )));
            }

            // One engine owns one half-duplex link; concurrent polling of a
            // shared port would corrupt RTU framing.
            if !devices.insert(meter.serial.device.as_str()) {
                return Err(ConfigError::Validation(format!(
                    "Meter '{}': serial device '{}' is already in use by another meter",
                    meter.name, meter.serial.device
                )));
            }

            match meter.serial.parity.to_lowercase().as_str() {
                "none" | "even" | "odd" => {}
                other => {
                    return Err(ConfigError::Validation(format!(
                        "Meter '{}': invalid parity '{}' (use none, even, or odd)",
                        meter.name, other
                    )));
                }
            }
        }

        Ok(())
    }
}
