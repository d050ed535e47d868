use std::sync::Arc;

use tracing::{debug, trace};

use super::timestamp::SensorClock;
use super::{
    DeviceHealth, DriverState, SensorDescriptor, SensorDriver, SensorHandle, SensorId, SensorType,
};
use crate::errors::{DriverError, DriverResult};
use crate::hal::{MotionFacility, RawMotionSample, SamplingAdapter, MAX_NUM_STATES};
use crate::messages::SensorEvent;
use crate::subsystem::{EventSink, InstanceIdSource, TimeSource};

/// g to m/s²
pub const STANDARD_GRAVITY: f32 = 9.80665;

const SENSOR_TYPES: [SensorType; 2] = [SensorType::Accelerometer, SensorType::Gyroscope];

/// Per-open-sensor polling state
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SensorRuntimeState {
    counter: u32,
    clock: SensorClock,
}

impl SensorRuntimeState {
    /// Last hardware sample counter turned into an event
    pub fn counter(&self) -> u32 {
        self.counter
    }

    /// Last raw hardware tick seen
    pub fn last_tick(&self) -> u32 {
        self.clock.last_tick()
    }

    /// Device clock in nanoseconds
    pub fn timestamp_ns(&self) -> u64 {
        self.clock.timestamp_ns()
    }
}

#[derive(Debug)]
struct OpenSensor {
    descriptor: SensorDescriptor,
    state: SensorRuntimeState,
}

#[derive(Debug, Default)]
struct Slot {
    generation: u32,
    sensor: Option<OpenSensor>,
}

/// Accelerometer and gyroscope driver over a shared motion-sampling session
pub struct MotionSensorDriver<F> {
    adapter: SamplingAdapter<F>,
    ids: Arc<dyn InstanceIdSource>,
    clock: Arc<dyn TimeSource>,
    sink: Arc<dyn EventSink>,
    state: DriverState,
    sensors: Vec<SensorDescriptor>,
    slots: Vec<Slot>,
    free: Vec<u32>,
    health: DeviceHealth,
}

impl<F: MotionFacility> MotionSensorDriver<F> {
    pub fn new(
        facility: F,
        ids: Arc<dyn InstanceIdSource>,
        clock: Arc<dyn TimeSource>,
        sink: Arc<dyn EventSink>,
    ) -> Self {
        Self {
            adapter: SamplingAdapter::new(facility),
            ids,
            clock,
            sink,
            state: DriverState::Uninitialized,
            sensors: Vec::new(),
            slots: Vec::new(),
            free: Vec::new(),
            health: DeviceHealth::default(),
        }
    }

    pub fn state(&self) -> DriverState {
        self.state
    }

    pub fn descriptors(&self) -> &[SensorDescriptor] {
        &self.sensors
    }

    /// Polling state of an open sensor, `None` once closed
    pub fn runtime_state(&self, handle: SensorHandle) -> Option<&SensorRuntimeState> {
        self.lookup(handle).map(|open| &open.state)
    }

    pub fn open_count(&self) -> usize {
        self.slots.iter().filter(|slot| slot.sensor.is_some()).count()
    }

    pub fn facility(&self) -> &F {
        self.adapter.facility()
    }

    pub fn facility_mut(&mut self) -> &mut F {
        self.adapter.facility_mut()
    }

    fn descriptor(&self, index: usize) -> DriverResult<&SensorDescriptor> {
        self.sensors.get(index).ok_or(DriverError::IndexOutOfRange {
            index,
            count: self.sensors.len(),
        })
    }

    fn lookup(&self, handle: SensorHandle) -> Option<&OpenSensor> {
        self.slots
            .get(handle.slot as usize)
            .filter(|slot| slot.generation == handle.generation)
            .and_then(|slot| slot.sensor.as_ref())
    }

    fn allocate_slot(&mut self) -> DriverResult<u32> {
        if let Some(slot) = self.free.pop() {
            return Ok(slot);
        }
        let slot = u32::try_from(self.slots.len()).map_err(|_| DriverError::AllocationFailed)?;
        self.slots
            .try_reserve(1)
            .map_err(|_| DriverError::AllocationFailed)?;
        self.free
            .try_reserve(self.slots.len() + 1)
            .map_err(|_| DriverError::AllocationFailed)?;
        self.slots.push(Slot::default());
        Ok(slot)
    }

    fn release_slot(&mut self, index: usize) -> Option<OpenSensor> {
        let slot = self.slots.get_mut(index)?;
        let sensor = slot.sensor.take()?;
        slot.generation = slot.generation.wrapping_add(1);
        self.free.push(index as u32);
        Some(sensor)
    }
}

impl<F: MotionFacility + Send> SensorDriver for MotionSensorDriver<F> {
    fn name(&self) -> &str {
        "motion"
    }

    fn init(&mut self) -> DriverResult<()> {
        if self.state != DriverState::Uninitialized {
            return Err(DriverError::InvalidState {
                expected: DriverState::Uninitialized,
                actual: self.state,
            });
        }

        self.adapter
            .initialize_sampling()
            .map_err(|e| DriverError::HardwareUnavailable(Some(e)))?;

        let mut sensors = Vec::new();
        if sensors.try_reserve_exact(SENSOR_TYPES.len()).is_err() {
            self.adapter.stop_sampling();
            return Err(DriverError::HardwareUnavailable(None));
        }
        for sensor_type in SENSOR_TYPES {
            sensors.push(SensorDescriptor {
                sensor_type,
                instance_id: self.ids.next_id(),
            });
        }

        for descriptor in &sensors {
            debug!(
                "[motion] registered {} as {}",
                descriptor.sensor_type.name(),
                descriptor.instance_id
            );
        }
        self.sensors = sensors;
        self.health = DeviceHealth::default();
        self.state = DriverState::Ready;
        Ok(())
    }

    fn sensor_count(&self) -> usize {
        self.sensors.len()
    }

    fn detect_changes(&mut self) {
        // Fixed sensor set, nothing is ever hotplugged
    }

    fn device_name(&self, index: usize) -> DriverResult<&'static str> {
        Ok(self.descriptor(index)?.sensor_type.name())
    }

    fn device_type(&self, index: usize) -> DriverResult<SensorType> {
        Ok(self.descriptor(index)?.sensor_type)
    }

    fn non_portable_type(&self, index: usize) -> DriverResult<i32> {
        Ok(self.descriptor(index)?.sensor_type.non_portable_type())
    }

    fn instance_id(&self, index: usize) -> DriverResult<SensorId> {
        Ok(self.descriptor(index)?.instance_id)
    }

    fn open(&mut self, index: usize) -> DriverResult<SensorHandle> {
        let descriptor = *self.descriptor(index)?;
        let slot = self.allocate_slot()?;

        let entry = &mut self.slots[slot as usize];
        entry.sensor = Some(OpenSensor {
            descriptor,
            state: SensorRuntimeState::default(),
        });
        trace!("[motion] opened {} in slot {}", descriptor.instance_id, slot);

        Ok(SensorHandle {
            slot,
            generation: entry.generation,
        })
    }

    fn update(&mut self, handle: SensorHandle) {
        let Some(open) = self
            .slots
            .get_mut(handle.slot as usize)
            .filter(|slot| slot.generation == handle.generation)
            .and_then(|slot| slot.sensor.as_mut())
        else {
            trace!("[motion] update on stale handle {:?}", handle);
            return;
        };

        let timestamp_ns = self.clock.now_ns();
        let mut states = [RawMotionSample::default(); MAX_NUM_STATES];
        let count = match self.adapter.poll_samples(&mut states) {
            Ok(count) => {
                self.health.record_success();
                count
            }
            Err(e) => {
                // Nothing new this frame
                trace!("[motion] poll failed: {}", e);
                self.health.record_failure(e);
                return;
            }
        };

        for sample in &states[..count] {
            if sample.counter <= open.state.counter {
                continue;
            }

            let sensor_timestamp_ns = open.state.clock.advance(sample.timestamp);
            open.state.counter = sample.counter;

            let data = match open.descriptor.sensor_type {
                SensorType::Accelerometer => sample.accelerometer.map(|v| v * STANDARD_GRAVITY),
                SensorType::Gyroscope => sample.gyro,
            };

            self.sink.send(SensorEvent {
                sensor_id: open.descriptor.instance_id,
                sensor_type: open.descriptor.sensor_type,
                timestamp_ns,
                sensor_timestamp_ns,
                data,
            });
        }
    }

    fn close(&mut self, handle: SensorHandle) {
        if self.lookup(handle).is_none() {
            return;
        }
        if let Some(sensor) = self.release_slot(handle.slot as usize) {
            trace!("[motion] closed {}", sensor.descriptor.instance_id);
        }
    }

    fn quit(&mut self) {
        if self.state != DriverState::Ready {
            debug!("[motion] quit while {:?}, nothing to stop", self.state);
            return;
        }
        self.state = DriverState::ShuttingDown;

        let still_open: Vec<usize> = self
            .slots
            .iter()
            .enumerate()
            .filter(|(_, slot)| slot.sensor.is_some())
            .map(|(index, _)| index)
            .collect();
        if !still_open.is_empty() {
            debug!("[motion] releasing {} sensor(s) left open", still_open.len());
        }
        for index in still_open {
            self.release_slot(index);
        }

        self.adapter.stop_sampling();
        self.sensors.clear();
        self.state = DriverState::Uninitialized;
        debug!("[motion] sampling stopped");
    }

    fn health(&self) -> Option<&DeviceHealth> {
        Some(&self.health)
    }
}
