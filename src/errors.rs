use thiserror::Error;

use crate::sensors::DriverState;

/// Failures reported by the platform motion-sampling facility
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum HardwareError {
    #[error("motion facility call '{operation}' failed with status {code:#010x}")]
    Status { operation: &'static str, code: i32 },

    #[error("motion device disconnected")]
    Disconnected,
}

/// Errors surfaced by the sensor driver lifecycle and lookup operations
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DriverError {
    #[error("motion sampling hardware unavailable")]
    HardwareUnavailable(#[source] Option<HardwareError>),

    #[error("sensor index {index} out of range (driver reports {count} sensors)")]
    IndexOutOfRange { index: usize, count: usize },

    #[error("failed to allocate sensor runtime state")]
    AllocationFailed,

    #[error("driver is {actual:?}, operation requires {expected:?}")]
    InvalidState {
        expected: DriverState,
        actual: DriverState,
    },
}

/// Configuration-related errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to load configuration from '{path}': {source}")]
    LoadError {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid configuration format: {0}")]
    FormatError(#[from] toml::de::Error),

    #[error("Invalid configuration value for '{field}': {reason}")]
    InvalidValue { field: String, reason: String },
}

/// Registry and initialization errors
#[derive(Error, Debug)]
pub enum RegistryError {
    #[error("No sensor driver could be initialized")]
    NoDrivers,

    #[error("Sensor driver error: {0}")]
    Driver(#[from] DriverError),
}

/// Result type aliases for convenience
pub type HardwareResult<T> = Result<T, HardwareError>;
pub type DriverResult<T> = Result<T, DriverError>;
pub type ConfigResult<T> = Result<T, ConfigError>;
pub type RegistryResult<T> = Result<T, RegistryError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hardware_error_display_includes_operation() {
        let err = HardwareError::Status {
            operation: "get_sensor_state",
            code: -2141061119,
        };
        let text = err.to_string();
        assert!(text.contains("get_sensor_state"));
    }

    #[test]
    fn test_index_error_display() {
        let err = DriverError::IndexOutOfRange { index: 5, count: 2 };
        assert_eq!(
            err.to_string(),
            "sensor index 5 out of range (driver reports 2 sensors)"
        );
    }

    #[test]
    fn test_hardware_unavailable_keeps_source() {
        use std::error::Error as _;

        let err = DriverError::HardwareUnavailable(Some(HardwareError::Disconnected));
        assert!(err.source().is_some());
        assert!(DriverError::HardwareUnavailable(None).source().is_none());
    }
}
