pub mod motion;
pub mod timestamp;

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::errors::{DriverResult, HardwareError};

pub use self::motion::{MotionSensorDriver, SensorRuntimeState};

/// Process-unique sensor instance identifier
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(transparent)]
pub struct SensorId(pub u64);

impl fmt::Display for SensorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "sensor#{}", self.0)
    }
}

/// Logical sensor kinds exposed by motion hardware
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum SensorType {
    Accelerometer,
    Gyroscope,
}

impl SensorType {
    /// Human-readable device name
    pub fn name(self) -> &'static str {
        match self {
            SensorType::Accelerometer => "Accelerometer",
            SensorType::Gyroscope => "Gyro",
        }
    }

    /// Platform-specific type code
    pub fn non_portable_type(self) -> i32 {
        match self {
            SensorType::Accelerometer => 1,
            SensorType::Gyroscope => 2,
        }
    }
}

/// Immutable table entry describing one logical sensor
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SensorDescriptor {
    pub sensor_type: SensorType,
    pub instance_id: SensorId,
}

/// Opaque reference to an open sensor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SensorHandle {
    pub(crate) slot: u32,
    pub(crate) generation: u32,
}

/// Driver lifecycle states
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DriverState {
    Uninitialized,
    Ready,
    ShuttingDown,
}

/// Sticky record of sampling failures seen while polling
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct DeviceHealth {
    /// Failed polls since the last successful one
    pub consecutive_failures: u32,
    pub total_failures: u64,
    pub last_error: Option<HardwareError>,
}

impl DeviceHealth {
    pub(crate) fn record_failure(&mut self, error: HardwareError) {
        self.consecutive_failures = self.consecutive_failures.saturating_add(1);
        self.total_failures += 1;
        self.last_error = Some(error);
    }

    pub(crate) fn record_success(&mut self) {
        self.consecutive_failures = 0;
    }

    /// A disconnect or `threshold` failed polls in a row
    pub fn is_degraded(&self, threshold: u32) -> bool {
        let disconnected = self.consecutive_failures > 0
            && matches!(self.last_error, Some(HardwareError::Disconnected));
        disconnected || self.consecutive_failures >= threshold.max(1)
    }
}

/// Registration surface of a sensor driver with the sensor subsystem
///
/// Indices run from `0` to `sensor_count() - 1` and are only meaningful
/// while the driver is initialized.
pub trait SensorDriver: Send {
    /// Driver name used in logs
    fn name(&self) -> &str;

    fn init(&mut self) -> DriverResult<()>;
    fn sensor_count(&self) -> usize;
    /// Rescan for hotplugged sensors
    fn detect_changes(&mut self);
    fn device_name(&self, index: usize) -> DriverResult<&'static str>;
    fn device_type(&self, index: usize) -> DriverResult<SensorType>;
    fn non_portable_type(&self, index: usize) -> DriverResult<i32>;
    fn instance_id(&self, index: usize) -> DriverResult<SensorId>;

    fn open(&mut self, index: usize) -> DriverResult<SensorHandle>;
    /// Poll the hardware and emit events for new samples
    fn update(&mut self, handle: SensorHandle);
    fn close(&mut self, handle: SensorHandle);
    fn quit(&mut self);

    fn health(&self) -> Option<&DeviceHealth> {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sensor_type_names() {
        assert_eq!(SensorType::Accelerometer.name(), "Accelerometer");
        assert_eq!(SensorType::Gyroscope.name(), "Gyro");
        assert_ne!(
            SensorType::Accelerometer.non_portable_type(),
            SensorType::Gyroscope.non_portable_type()
        );
    }

    #[test]
    fn test_health_degrades_after_threshold() {
        let mut health = DeviceHealth::default();
        let err = HardwareError::Status {
            operation: "read_sensor_state",
            code: -1,
        };

        health.record_failure(err);
        health.record_failure(err);
        assert!(!health.is_degraded(3));
        health.record_failure(err);
        assert!(health.is_degraded(3));
        assert_eq!(health.total_failures, 3);

        health.record_success();
        assert!(!health.is_degraded(3));
        // Total and last error are sticky
        assert_eq!(health.total_failures, 3);
        assert_eq!(health.last_error, Some(err));
    }

    #[test]
    fn test_disconnect_degrades_immediately() {
        let mut health = DeviceHealth::default();
        health.record_failure(HardwareError::Disconnected);
        assert!(health.is_degraded(100));
    }
}
