//! Hardware Abstraction Layer for the motion-sampling facility
//!
//! `MotionFacility` mirrors the platform calls one-to-one and reports raw
//! status codes. `SamplingAdapter` wraps a facility and turns those calls
//! into the three operations the sensor driver needs, with typed errors.

#[cfg(any(test, feature = "mock"))]
pub mod mock;
#[cfg(feature = "simulated")]
pub mod simulated;

use crate::errors::{HardwareError, HardwareResult};

/// Maximum number of motion states the facility returns per read
pub const MAX_NUM_STATES: usize = 64;

/// One motion state snapshot as delivered by the facility
#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub struct RawMotionSample {
    /// Hardware sample counter, increases with every new snapshot
    pub counter: u32,
    /// Hardware tick in microseconds, wraps at `u32::MAX`
    pub timestamp: u32,
    /// Acceleration (g)
    pub accelerometer: [f32; 3],
    /// Angular rate (rad/s)
    pub gyro: [f32; 3],
}

/// Raw platform motion API
///
/// Status-returning methods follow the platform convention: `0` is success,
/// anything else is a failure code.
pub trait MotionFacility {
    fn reset(&mut self) -> i32;
    fn start_sampling(&mut self) -> i32;
    fn stop_sampling(&mut self) -> i32;
    fn set_angle_threshold(&mut self, angle: f32) -> i32;
    fn set_deadband(&mut self, enabled: bool) -> i32;
    fn set_tilt_correction(&mut self, enabled: bool) -> i32;

    /// Fill `states` with the most recent snapshots, oldest first.
    ///
    /// Returns the status code and the number of entries written.
    fn read_sensor_state(&mut self, states: &mut [RawMotionSample]) -> (i32, usize);

    /// Whether the device is still attached. Facilities that cannot tell
    /// report `true`.
    fn is_connected(&self) -> bool {
        true
    }
}

fn check(operation: &'static str, code: i32) -> HardwareResult<()> {
    if code == 0 {
        Ok(())
    } else {
        Err(HardwareError::Status { operation, code })
    }
}

/// Normalized access to a shared motion-sampling session
pub struct SamplingAdapter<F> {
    facility: F,
}

impl<F: MotionFacility> SamplingAdapter<F> {
    pub fn new(facility: F) -> Self {
        Self { facility }
    }

    /// Reset the facility and start continuous, unfiltered sampling.
    ///
    /// Must be called once per driver lifetime. If configuration fails once
    /// sampling has started, sampling is stopped again before the error is
    /// returned.
    pub fn initialize_sampling(&mut self) -> HardwareResult<()> {
        check("reset", self.facility.reset())?;
        check("start_sampling", self.facility.start_sampling())?;
        if let Err(e) = self.configure_raw_sampling() {
            self.stop_sampling();
            return Err(e);
        }
        Ok(())
    }

    // Raw state: no angle threshold, deadband or tilt correction
    fn configure_raw_sampling(&mut self) -> HardwareResult<()> {
        check("set_angle_threshold", self.facility.set_angle_threshold(0.0))?;
        check("set_deadband", self.facility.set_deadband(false))?;
        check("set_tilt_correction", self.facility.set_tilt_correction(false))
    }

    /// Read the currently available snapshots into `buffer`.
    ///
    /// At most `min(buffer.len(), MAX_NUM_STATES)` entries are filled.
    pub fn poll_samples(&mut self, buffer: &mut [RawMotionSample]) -> HardwareResult<usize> {
        if !self.facility.is_connected() {
            return Err(HardwareError::Disconnected);
        }

        let limit = buffer.len().min(MAX_NUM_STATES);
        let window = &mut buffer[..limit];
        window.fill(RawMotionSample::default());

        let (status, count) = self.facility.read_sensor_state(window);
        check("read_sensor_state", status)?;
        Ok(count.min(limit))
    }

    /// Disable continuous sampling. Failures are ignored, there is nothing
    /// left to recover at teardown.
    pub fn stop_sampling(&mut self) {
        let _ = self.facility.stop_sampling();
    }

    pub fn facility(&self) -> &F {
        &self.facility
    }

    pub fn facility_mut(&mut self) -> &mut F {
        &mut self.facility
    }
}

#[cfg(test)]
mod tests {
    use super::mock::{FacilityCall, MockMotion};
    use super::*;

    fn sample(counter: u32, timestamp: u32) -> RawMotionSample {
        RawMotionSample {
            counter,
            timestamp,
            ..Default::default()
        }
    }

    #[test]
    fn test_initialize_sampling_disables_filtering() {
        let mut adapter = SamplingAdapter::new(MockMotion::new());
        adapter.initialize_sampling().unwrap();

        assert_eq!(
            adapter.facility().calls(),
            vec![
                FacilityCall::Reset,
                FacilityCall::StartSampling,
                FacilityCall::SetAngleThreshold(0.0),
                FacilityCall::SetDeadband(false),
                FacilityCall::SetTiltCorrection(false),
            ]
        );
    }

    #[test]
    fn test_initialize_sampling_reports_failing_call() {
        let mut mock = MockMotion::new();
        mock.fail_operation(FacilityCall::StartSampling, -1);
        let mut adapter = SamplingAdapter::new(mock);

        let err = adapter.initialize_sampling().unwrap_err();
        assert_eq!(
            err,
            HardwareError::Status {
                operation: "start_sampling",
                code: -1
            }
        );
        // Nothing after the failing call is attempted
        assert_eq!(adapter.facility().calls().len(), 2);
    }

    #[test]
    fn test_configuration_failure_stops_sampling() {
        let mut mock = MockMotion::new();
        mock.fail_operation(FacilityCall::SetDeadband(false), -7);
        let mut adapter = SamplingAdapter::new(mock);

        let err = adapter.initialize_sampling().unwrap_err();
        assert_eq!(
            err,
            HardwareError::Status {
                operation: "set_deadband",
                code: -7
            }
        );
        assert_eq!(
            adapter.facility().calls(),
            vec![
                FacilityCall::Reset,
                FacilityCall::StartSampling,
                FacilityCall::SetAngleThreshold(0.0),
                FacilityCall::SetDeadband(false),
                FacilityCall::StopSampling,
            ]
        );
    }

    #[test]
    fn test_poll_samples_returns_count() {
        let mut mock = MockMotion::new();
        mock.push_samples(vec![sample(1, 100), sample(2, 200)]);
        let mut adapter = SamplingAdapter::new(mock);

        let mut buffer = [RawMotionSample::default(); MAX_NUM_STATES];
        let count = adapter.poll_samples(&mut buffer).unwrap();
        assert_eq!(count, 2);
        assert_eq!(buffer[0].counter, 1);
        assert_eq!(buffer[1].timestamp, 200);
        assert_eq!(buffer[2], RawMotionSample::default());
    }

    #[test]
    fn test_poll_samples_is_bounded_by_buffer() {
        let mut mock = MockMotion::new();
        mock.push_samples((1..=10).map(|i| sample(i, i * 10)).collect());
        let mut adapter = SamplingAdapter::new(mock);

        let mut buffer = [RawMotionSample::default(); 4];
        assert_eq!(adapter.poll_samples(&mut buffer).unwrap(), 4);
        assert_eq!(buffer[3].counter, 4);
    }

    #[test]
    fn test_poll_samples_maps_status_and_disconnect() {
        let mut mock = MockMotion::new();
        mock.push_failure(0x8080_0001u32 as i32);
        let mut adapter = SamplingAdapter::new(mock);
        let mut buffer = [RawMotionSample::default(); MAX_NUM_STATES];

        assert!(matches!(
            adapter.poll_samples(&mut buffer),
            Err(HardwareError::Status {
                operation: "read_sensor_state",
                ..
            })
        ));

        adapter.facility_mut().set_connected(false);
        assert_eq!(
            adapter.poll_samples(&mut buffer),
            Err(HardwareError::Disconnected)
        );
    }

    #[test]
    fn test_stop_sampling_reaches_facility() {
        let mut adapter = SamplingAdapter::new(MockMotion::new());
        adapter.stop_sampling();
        assert_eq!(adapter.facility().calls(), vec![FacilityCall::StopSampling]);
    }
}
