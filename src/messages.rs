use serde::{Deserialize, Serialize};

use crate::sensors::{SensorId, SensorType};

/// One sensor reading handed to the sensor subsystem
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct SensorEvent {
    /// Instance identifier of the reporting sensor
    pub sensor_id: SensorId,
    pub sensor_type: SensorType,
    /// Wall-clock time of the poll that produced this event (ns)
    pub timestamp_ns: u64,
    /// Device clock reconstructed from the hardware tick (ns)
    pub sensor_timestamp_ns: u64,
    /// Axis values, m/s² for accelerometers and rad/s for gyroscopes
    pub data: [f32; 3],
}

impl SensorEvent {
    /// Serialize to JSON for logging
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}
