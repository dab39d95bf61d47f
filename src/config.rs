//! # Configuration Management
//!
//! Centralized configuration for packet sockets and logging.
//!
//! ## Configuration Sources
//! - TOML files via `from_file()`
//! - Direct instantiation with defaults
//! - Environment-specific overrides via `from_env()`
//!
//! ## Security Considerations
//! - `max_packet_data_size` bounds the memory a single peer can make a connection
//!   buffer before the packet is rejected
//! - Working buffer reclamation keeps idle connections from pinning large buffers

use crate::core::packet::{DEFAULT_MAX_PACKET_DATA_SIZE, HEADER_SIZE};
use crate::error::{constants, ProtocolError, Result};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::Read;
use std::path::Path;
use tracing::Level;

/// Default number of bytes reserved per socket read
pub const DEFAULT_WORKING_BUFFER_SIZE: usize = 16 * 1024;

/// Default number of consecutive oversized checks tolerated before shrinking the buffer
pub const DEFAULT_WORKING_BUFFER_SENSITIVITY: usize = 100;

/// Upper bound on the per-read reservation
pub const MAX_WORKING_BUFFER_SIZE: usize = 64 * 1024 * 1024;

/// Top-level configuration
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct IoConfig {
    /// Packet socket configuration
    #[serde(default)]
    pub socket: PacketSocketOptions,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl IoConfig {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut file = File::open(path)
            .map_err(|e| ProtocolError::ConfigError(format!("Failed to open config file: {e}")))?;

        let mut contents = String::new();
        file.read_to_string(&mut contents)
            .map_err(|e| ProtocolError::ConfigError(format!("Failed to read config file: {e}")))?;

        Self::from_toml(&contents)
    }

    /// Load configuration from TOML string
    pub fn from_toml(content: &str) -> Result<Self> {
        toml::from_str::<Self>(content)
            .map_err(|e| ProtocolError::ConfigError(format!("Failed to parse TOML: {e}")))
    }

    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();

        if let Some(val) = env_parse::<usize>("PACKET_IO_WORKING_BUFFER_SIZE")? {
            config.socket.working_buffer_size = val;
        }

        if let Some(val) = env_parse::<usize>("PACKET_IO_WORKING_BUFFER_SENSITIVITY")? {
            config.socket.working_buffer_sensitivity = val;
        }

        if let Some(val) = env_parse::<usize>("PACKET_IO_MAX_PACKET_DATA_SIZE")? {
            config.socket.max_packet_data_size = val;
        }

        if let Ok(level) = std::env::var("PACKET_IO_LOG_LEVEL") {
            config.logging.log_level = level.parse::<Level>().map_err(|_| {
                ProtocolError::ConfigError(format!("Invalid PACKET_IO_LOG_LEVEL: {level}"))
            })?;
        }

        Ok(config)
    }

    /// Apply overrides to the default configuration
    pub fn default_with_overrides<F>(mutator: F) -> Self
    where
        F: FnOnce(&mut Self),
    {
        let mut config = Self::default();
        mutator(&mut config);
        config
    }

    /// Generate example configuration file content
    pub fn example_config() -> String {
        toml::to_string_pretty(&Self::default())
            .unwrap_or_else(|_| String::from("# Failed to generate example config"))
    }

    /// Save configuration to a file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| ProtocolError::ConfigError(format!("Failed to serialize config: {e}")))?;

        std::fs::write(path, content)
            .map_err(|e| ProtocolError::ConfigError(format!("Failed to write config file: {e}")))?;

        Ok(())
    }

    /// Validate the configuration for common issues and misconfigurations
    ///
    /// Returns a list of validation errors. Empty list means configuration is valid.
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();
        errors.extend(self.socket.validate());
        errors.extend(self.logging.validate());
        errors
    }

    /// Validate and return Result - convenience method
    pub fn validate_strict(&self) -> Result<()> {
        let errors = self.validate();
        if errors.is_empty() {
            Ok(())
        } else {
            Err(ProtocolError::ConfigError(format!(
                "{}:\n  - {}",
                constants::ERR_INVALID_CONFIG,
                errors.join("\n  - ")
            )))
        }
    }
}

fn env_parse<T: std::str::FromStr>(name: &str) -> Result<Option<T>> {
    match std::env::var(name) {
        Ok(raw) => raw
            .parse::<T>()
            .map(Some)
            .map_err(|_| ProtocolError::ConfigError(format!("Invalid {name}: {raw}"))),
        Err(_) => Ok(None),
    }
}

/// Packet socket configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct PacketSocketOptions {
    /// Number of bytes reserved at the buffer tail for each socket read
    pub working_buffer_size: usize,

    /// Consecutive oversized checks before the buffer is shrunk (0 disables)
    pub working_buffer_sensitivity: usize,

    /// Maximum packet payload size in bytes
    pub max_packet_data_size: usize,
}

impl Default for PacketSocketOptions {
    fn default() -> Self {
        Self {
            working_buffer_size: DEFAULT_WORKING_BUFFER_SIZE,
            working_buffer_sensitivity: DEFAULT_WORKING_BUFFER_SENSITIVITY,
            max_packet_data_size: DEFAULT_MAX_PACKET_DATA_SIZE,
        }
    }
}

impl PacketSocketOptions {
    /// Validate socket configuration
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();

        if self.working_buffer_size == 0 {
            errors.push("Working buffer size must be greater than 0".to_string());
        } else if self.working_buffer_size > MAX_WORKING_BUFFER_SIZE {
            errors.push(format!(
                "Working buffer size too large: {} bytes (maximum: {} bytes)",
                self.working_buffer_size, MAX_WORKING_BUFFER_SIZE
            ));
        }

        let max_representable = u32::MAX as usize - HEADER_SIZE;
        if self.max_packet_data_size == 0 {
            errors.push("Max packet data size must be greater than 0".to_string());
        } else if self.max_packet_data_size > max_representable {
            errors.push(format!(
                "Max packet data size too large: {} bytes (maximum: {} bytes)",
                self.max_packet_data_size, max_representable
            ));
        }

        errors
    }
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Application name for logs
    pub app_name: String,

    /// Log level
    #[serde(with = "log_level_serde")]
    pub log_level: Level,

    /// Whether to log to console
    pub log_to_console: bool,

    /// Whether to log to file
    pub log_to_file: bool,

    /// Path to log file (if log_to_file is true)
    pub log_file_path: Option<String>,

    /// Whether to use JSON formatting for logs
    pub json_format: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            app_name: String::from("packet-io"),
            log_level: Level::INFO,
            log_to_console: true,
            log_to_file: false,
            log_file_path: None,
            json_format: false,
        }
    }
}

impl LoggingConfig {
    /// Validate logging configuration
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();

        if self.app_name.is_empty() {
            errors.push("Application name cannot be empty".to_string());
        } else if self.app_name.len() > 64 {
            errors.push(format!(
                "Application name too long: {} characters (maximum: 64)",
                self.app_name.len()
            ));
        }

        if self.log_to_file {
            if let Some(ref path) = self.log_file_path {
                if let Some(parent) = std::path::Path::new(path).parent() {
                    if !parent.as_os_str().is_empty() && !parent.exists() {
                        errors.push(format!(
                            "Log file directory does not exist: {}",
                            parent.display()
                        ));
                    }
                }
            } else {
                errors.push("log_file_path must be specified when log_to_file is true".to_string());
            }
        }

        if !self.log_to_console && !self.log_to_file {
            errors
                .push("At least one logging output (console or file) must be enabled".to_string());
        }

        errors
    }
}

/// Helper module for tracing::Level serialization/deserialization
mod log_level_serde {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::str::FromStr;
    use tracing::Level;

    pub fn serialize<S>(level: &Level, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let level_str = match *level {
            Level::TRACE => "trace",
            Level::DEBUG => "debug",
            Level::INFO => "info",
            Level::WARN => "warn",
            Level::ERROR => "error",
        };
        level_str.serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Level, D::Error>
    where
        D: Deserializer<'de>,
    {
        let level_str = String::deserialize(deserializer)?;
        Level::from_str(&level_str)
            .map_err(|_| serde::de::Error::custom(format!("Invalid log level: {level_str}")))
    }
}
