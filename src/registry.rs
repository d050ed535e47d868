use tracing::{info, warn};

use crate::errors::{DriverError, RegistryError, RegistryResult};
use crate::sensors::{DeviceHealth, SensorDriver, SensorHandle, SensorId, SensorType};

/// One sensor as seen across all registered drivers
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SensorInfo {
    pub index: usize,
    pub driver: String,
    pub name: &'static str,
    pub sensor_type: SensorType,
    pub instance_id: SensorId,
}

/// An open sensor together with the driver that owns it
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OpenedSensor {
    driver: usize,
    handle: SensorHandle,
    pub instance_id: SensorId,
    pub sensor_type: SensorType,
}

impl OpenedSensor {
    /// Position of the owning driver in the registry
    pub fn driver_index(&self) -> usize {
        self.driver
    }
}

/// Driver table of the sensor subsystem
///
/// Sensors are addressed by a global index: the sensors of the first
/// initialized driver come first, then those of the next, and so on.
#[derive(Default)]
pub struct DriverRegistry {
    drivers: Vec<Box<dyn SensorDriver>>,
    ready: Vec<bool>,
}

impl DriverRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, driver: Box<dyn SensorDriver>) {
        self.drivers.push(driver);
        self.ready.push(false);
    }

    /// Initialize every registered driver.
    ///
    /// Drivers that fail to come up are kept out of enumeration. Returns the
    /// number of sensors available afterwards.
    pub fn init_all(&mut self) -> RegistryResult<usize> {
        info!("[registry] initializing {} driver(s)...", self.drivers.len());
        for (driver, ready) in self.drivers.iter_mut().zip(self.ready.iter_mut()) {
            if *ready {
                continue;
            }
            match driver.init() {
                Ok(()) => {
                    info!(
                        "[registry] driver '{}' ready with {} sensor(s)",
                        driver.name(),
                        driver.sensor_count()
                    );
                    *ready = true;
                }
                Err(e) => warn!("[registry] driver '{}' unavailable: {}", driver.name(), e),
            }
        }

        if !self.ready.iter().any(|ready| *ready) {
            return Err(RegistryError::NoDrivers);
        }
        Ok(self.sensor_count())
    }

    fn active(&self) -> impl Iterator<Item = (usize, &dyn SensorDriver)> + '_ {
        self.drivers
            .iter()
            .enumerate()
            .filter(|(i, _)| self.ready[*i])
            .map(|(i, driver)| (i, driver.as_ref()))
    }

    pub fn sensor_count(&self) -> usize {
        self.active().map(|(_, driver)| driver.sensor_count()).sum()
    }

    /// Poll every driver for hotplugged sensors
    pub fn detect_changes(&mut self) {
        for (driver, ready) in self.drivers.iter_mut().zip(&self.ready) {
            if *ready {
                driver.detect_changes();
            }
        }
    }

    fn locate(&self, index: usize) -> RegistryResult<(usize, usize)> {
        let mut base = 0;
        for (driver_index, driver) in self.active() {
            let count = driver.sensor_count();
            if index < base + count {
                return Ok((driver_index, index - base));
            }
            base += count;
        }
        Err(DriverError::IndexOutOfRange { index, count: base }.into())
    }

    pub fn sensor_info(&self, index: usize) -> RegistryResult<SensorInfo> {
        let (driver_index, local) = self.locate(index)?;
        let driver = &self.drivers[driver_index];
        Ok(SensorInfo {
            index,
            driver: driver.name().to_string(),
            name: driver.device_name(local)?,
            sensor_type: driver.device_type(local)?,
            instance_id: driver.instance_id(local)?,
        })
    }

    pub fn sensors(&self) -> RegistryResult<Vec<SensorInfo>> {
        (0..self.sensor_count())
            .map(|index| self.sensor_info(index))
            .collect()
    }

    pub fn open(&mut self, index: usize) -> RegistryResult<OpenedSensor> {
        let (driver_index, local) = self.locate(index)?;
        let driver = &mut self.drivers[driver_index];
        let handle = driver.open(local)?;
        Ok(OpenedSensor {
            driver: driver_index,
            handle,
            instance_id: driver.instance_id(local)?,
            sensor_type: driver.device_type(local)?,
        })
    }

    pub fn update(&mut self, sensor: &OpenedSensor) {
        if let Some(driver) = self.drivers.get_mut(sensor.driver) {
            driver.update(sensor.handle);
        }
    }

    pub fn close(&mut self, sensor: &OpenedSensor) {
        if let Some(driver) = self.drivers.get_mut(sensor.driver) {
            driver.close(sensor.handle);
        }
    }

    /// Health record of the driver owning `sensor`
    pub fn health(&self, sensor: &OpenedSensor) -> Option<&DeviceHealth> {
        self.drivers.get(sensor.driver)?.health()
    }

    /// Shut down every initialized driver
    pub fn quit_all(&mut self) {
        for (driver, ready) in self.drivers.iter_mut().zip(self.ready.iter_mut()) {
            if *ready {
                driver.quit();
                *ready = false;
                info!("[registry] driver '{}' shut down", driver.name());
            }
        }
    }
}
