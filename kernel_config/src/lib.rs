//! # Kernel Config
//!
//! Limits and audit settings for a handle kernel instance.
//!
//! ## Philosophy
//!
//! - **Limits are finite and explicit**: every table, queue and buffer has a cap
//! - **Defaults are usable**: an empty JSON object is a valid configuration
//! - **Validation is separate from loading**: a parsed config is checked once,
//!   before a kernel is built from it
//!
//! ## Example
//!
//! ```
//! use kernel_config::KernelConfig;
//!
//! let config = KernelConfig::from_json_str(r#"{ "limits": { "max_handles": 64 } }"#).unwrap();
//! assert_eq!(config.limits.max_handles, 64);
//! assert_eq!(config.limits.max_message_num_handles, 10_000);
//! ```

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;

const MIB: u64 = 1024 * 1024;

/// Capacity limits enforced by the kernel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct KernelLimits {
    /// Maximum live handles per handle table
    pub max_handles: usize,
    /// Maximum payload size of one message
    pub max_message_num_bytes: usize,
    /// Maximum handles attached to one message
    pub max_message_num_handles: usize,
    /// Maximum messages queued on one endpoint
    pub max_queued_messages: usize,
    /// Capacity used when a data pipe is created with capacity zero
    pub default_data_pipe_capacity_num_bytes: u32,
    /// Largest data pipe capacity that may be requested
    pub max_data_pipe_capacity_num_bytes: u32,
    /// Largest shared buffer that may be created
    pub max_shared_buffer_num_bytes: u64,
}

impl KernelLimits {
    pub fn with_max_handles(mut self, max_handles: usize) -> Self {
        self.max_handles = max_handles;
        self
    }

    pub fn with_max_message_num_bytes(mut self, num_bytes: usize) -> Self {
        self.max_message_num_bytes = num_bytes;
        self
    }

    pub fn with_max_message_num_handles(mut self, num_handles: usize) -> Self {
        self.max_message_num_handles = num_handles;
        self
    }

    pub fn with_max_queued_messages(mut self, max_queued: usize) -> Self {
        self.max_queued_messages = max_queued;
        self
    }

    pub fn with_default_data_pipe_capacity(mut self, num_bytes: u32) -> Self {
        self.default_data_pipe_capacity_num_bytes = num_bytes;
        self
    }

    pub fn with_max_data_pipe_capacity(mut self, num_bytes: u32) -> Self {
        self.max_data_pipe_capacity_num_bytes = num_bytes;
        self
    }

    pub fn with_max_shared_buffer_num_bytes(mut self, num_bytes: u64) -> Self {
        self.max_shared_buffer_num_bytes = num_bytes;
        self
    }
}

impl Default for KernelLimits {
    fn default() -> Self {
        Self {
            max_handles: 1_000_000,
            max_message_num_bytes: (4 * MIB) as usize,
            max_message_num_handles: 10_000,
            max_queued_messages: 1_000_000,
            default_data_pipe_capacity_num_bytes: MIB as u32,
            max_data_pipe_capacity_num_bytes: (256 * MIB) as u32,
            max_shared_buffer_num_bytes: 1024 * MIB,
        }
    }
}

/// Handle audit trail settings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AuditConfig {
    /// Record handle lifecycle events
    pub enabled: bool,
    /// Events kept before the oldest are dropped
    pub capacity: usize,
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            capacity: 4096,
        }
    }
}

/// Complete kernel configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct KernelConfig {
    pub limits: KernelLimits,
    pub audit: AuditConfig,
}

impl KernelConfig {
    /// Parses a configuration from JSON; missing fields take defaults
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Loads and validates a configuration file
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let config = Self::from_json_str(&text)?;
        config.validate()?;
        Ok(config)
    }

    /// Serializes the configuration as pretty JSON
    pub fn to_json_string(&self) -> Result<String, ConfigError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Checks that every limit is usable
    pub fn validate(&self) -> Result<(), ConfigError> {
        let limits = &self.limits;
        let nonzero = [
            ("max_handles", limits.max_handles as u64),
            ("max_message_num_bytes", limits.max_message_num_bytes as u64),
            ("max_queued_messages", limits.max_queued_messages as u64),
            (
                "default_data_pipe_capacity_num_bytes",
                limits.default_data_pipe_capacity_num_bytes as u64,
            ),
            (
                "max_data_pipe_capacity_num_bytes",
                limits.max_data_pipe_capacity_num_bytes as u64,
            ),
            (
                "max_shared_buffer_num_bytes",
                limits.max_shared_buffer_num_bytes,
            ),
        ];
        if let Some((field, _)) = nonzero.iter().find(|(_, value)| *value == 0) {
            return Err(ConfigError::ZeroLimit { field: *field });
        }
        if limits.default_data_pipe_capacity_num_bytes > limits.max_data_pipe_capacity_num_bytes {
            return Err(ConfigError::DefaultExceedsMax {
                default: limits.default_data_pipe_capacity_num_bytes,
                max: limits.max_data_pipe_capacity_num_bytes,
            });
        }
        if self.audit.enabled && self.audit.capacity == 0 {
            return Err(ConfigError::ZeroLimit {
                field: "audit.capacity",
            });
        }
        Ok(())
    }
}

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Malformed config: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Limit must be non-zero: {field}")]
    ZeroLimit { field: &'static str },

    #[error("Default data pipe capacity {default} exceeds maximum {max}")]
    DefaultExceedsMax { default: u32, max: u32 },
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_limits() {
        let config = KernelConfig::default();
        assert_eq!(config.limits.max_handles, 1_000_000);
        assert_eq!(config.limits.max_message_num_bytes, 4 * 1024 * 1024);
        assert_eq!(config.limits.max_message_num_handles, 10_000);
        assert_eq!(config.limits.default_data_pipe_capacity_num_bytes, 1024 * 1024);
        assert_eq!(
            config.limits.max_data_pipe_capacity_num_bytes,
            256 * 1024 * 1024
        );
        assert_eq!(config.limits.max_shared_buffer_num_bytes, 1 << 30);
        assert!(config.audit.enabled);
        assert_eq!(config.audit.capacity, 4096);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_empty_json_is_default() {
        let config = KernelConfig::from_json_str("{}").unwrap();
        assert_eq!(config, KernelConfig::default());
    }

    #[test]
    fn test_partial_json() {
        let config =
            KernelConfig::from_json_str(r#"{ "audit": { "enabled": false } }"#).unwrap();
        assert!(!config.audit.enabled);
        assert_eq!(config.audit.capacity, 4096);
        assert_eq!(config.limits, KernelLimits::default());
    }

    #[test]
    fn test_malformed_json() {
        let err = KernelConfig::from_json_str("{ limits: ").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn test_builder() {
        let limits = KernelLimits::default()
            .with_max_handles(8)
            .with_max_queued_messages(2)
            .with_default_data_pipe_capacity(16)
            .with_max_data_pipe_capacity(64);
        assert_eq!(limits.max_handles, 8);
        assert_eq!(limits.max_queued_messages, 2);
        assert_eq!(limits.default_data_pipe_capacity_num_bytes, 16);
    }

    #[test]
    fn test_validate_zero_limit() {
        let config = KernelConfig {
            limits: KernelLimits::default().with_max_handles(0),
            ..KernelConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::ZeroLimit {
                field: "max_handles"
            })
        ));
    }

    #[test]
    fn test_validate_default_exceeds_max() {
        let config = KernelConfig {
            limits: KernelLimits::default()
                .with_default_data_pipe_capacity(128)
                .with_max_data_pipe_capacity(64),
            ..KernelConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::DefaultExceedsMax { default: 128, max: 64 })
        ));
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{ "limits": {{ "max_queued_messages": 3 }} }}"#).unwrap();
        let config = KernelConfig::load(file.path()).unwrap();
        assert_eq!(config.limits.max_queued_messages, 3);
    }

    #[test]
    fn test_load_rejects_invalid_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{ "audit": {{ "capacity": 0 }} }}"#).unwrap();
        assert!(matches!(
            KernelConfig::load(file.path()),
            Err(ConfigError::ZeroLimit { .. })
        ));
    }

    #[test]
    fn test_load_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = KernelConfig::load(dir.path().join("absent.json")).unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }

    #[test]
    fn test_json_round_trip() {
        let config = KernelConfig {
            limits: KernelLimits::default().with_max_message_num_handles(7),
            ..KernelConfig::default()
        };
        let json = config.to_json_string().unwrap();
        assert_eq!(KernelConfig::from_json_str(&json).unwrap(), config);
    }
}
