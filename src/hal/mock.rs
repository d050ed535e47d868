//! Mock motion facility for testing
//!
//! Records every facility call and replays scripted state reads, so the
//! driver can be exercised without motion hardware.

use std::collections::VecDeque;
use std::mem::{discriminant, Discriminant};

use super::{MotionFacility, RawMotionSample};

/// Facility call log entry
#[derive(Debug, Clone, PartialEq)]
pub enum FacilityCall {
    Reset,
    StartSampling,
    StopSampling,
    SetAngleThreshold(f32),
    SetDeadband(bool),
    SetTiltCorrection(bool),
    ReadSensorState { capacity: usize },
}

#[derive(Debug, Clone)]
enum ScriptedRead {
    Samples(Vec<RawMotionSample>),
    Failure(i32),
}

/// Scripted motion facility
///
/// Each `read_sensor_state` consumes one scripted response. Once the script
/// is exhausted, reads succeed with zero samples.
#[derive(Debug, Default)]
pub struct MockMotion {
    calls: Vec<FacilityCall>,
    reads: VecDeque<ScriptedRead>,
    failures: Vec<(Discriminant<FacilityCall>, i32)>,
    connected: bool,
}

impl MockMotion {
    pub fn new() -> Self {
        Self {
            connected: true,
            ..Default::default()
        }
    }

    /// Get call log (for test verification)
    pub fn calls(&self) -> Vec<FacilityCall> {
        self.calls.clone()
    }

    pub fn clear_calls(&mut self) {
        self.calls.clear();
    }

    /// Queue a successful read returning `samples`
    pub fn push_samples(&mut self, samples: Vec<RawMotionSample>) {
        self.reads.push_back(ScriptedRead::Samples(samples));
    }

    /// Queue a read that fails with `status`
    pub fn push_failure(&mut self, status: i32) {
        self.reads.push_back(ScriptedRead::Failure(status));
    }

    /// Make every call of the same kind as `call` report `status`.
    ///
    /// Arguments carried by `call` are ignored.
    pub fn fail_operation(&mut self, call: FacilityCall, status: i32) {
        let kind = discriminant(&call);
        self.failures.retain(|(k, _)| *k != kind);
        self.failures.push((kind, status));
    }

    fn record(&mut self, call: FacilityCall) -> i32 {
        let kind = discriminant(&call);
        self.calls.push(call);
        self.failures
            .iter()
            .find(|(k, _)| *k == kind)
            .map_or(0, |(_, status)| *status)
    }

    pub fn set_connected(&mut self, connected: bool) {
        self.connected = connected;
    }

    /// Number of scripted reads not yet consumed
    pub fn pending_reads(&self) -> usize {
        self.reads.len()
    }
}

impl MotionFacility for MockMotion {
    fn reset(&mut self) -> i32 {
        self.record(FacilityCall::Reset)
    }

    fn start_sampling(&mut self) -> i32 {
        self.record(FacilityCall::StartSampling)
    }

    fn stop_sampling(&mut self) -> i32 {
        self.record(FacilityCall::StopSampling)
    }

    fn set_angle_threshold(&mut self, angle: f32) -> i32 {
        self.record(FacilityCall::SetAngleThreshold(angle))
    }

    fn set_deadband(&mut self, enabled: bool) -> i32 {
        self.record(FacilityCall::SetDeadband(enabled))
    }

    fn set_tilt_correction(&mut self, enabled: bool) -> i32 {
        self.record(FacilityCall::SetTiltCorrection(enabled))
    }

    fn read_sensor_state(&mut self, states: &mut [RawMotionSample]) -> (i32, usize) {
        let status = self.record(FacilityCall::ReadSensorState {
            capacity: states.len(),
        });
        if status != 0 {
            return (status, 0);
        }

        match self.reads.pop_front() {
            Some(ScriptedRead::Samples(samples)) => {
                let count = samples.len().min(states.len());
                states[..count].copy_from_slice(&samples[..count]);
                (0, count)
            }
            Some(ScriptedRead::Failure(status)) => (status, 0),
            None => (0, 0),
        }
    }

    fn is_connected(&self) -> bool {
        self.connected
    }
}
