// Public modules
pub mod config;
pub mod errors;
pub mod event_monitor;
pub mod hal;
pub mod messages;
pub mod registry;
pub mod scheduler;
pub mod sensors;
pub mod subsystem;

// Re-export commonly used types
pub use config::{load_motion_config, MotionConfig};
pub use errors::{DriverError, DriverResult, HardwareError};
pub use messages::SensorEvent;
pub use registry::DriverRegistry;
pub use scheduler::Scheduler;
pub use sensors::{MotionSensorDriver, SensorDriver, SensorType};

use tracing_subscriber::EnvFilter;

/// Initialize tracing with default configuration
pub fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into()))
        .init();
}

#[cfg(feature = "simulated")]
pub use hub::run_motion_hub;

#[cfg(feature = "simulated")]
mod hub {
    use std::sync::Arc;
    use std::time::Duration;

    use tracing::info;

    use crate::config::load_motion_config;
    use crate::event_monitor::monitor_events;
    use crate::hal::simulated::SimulatedMotion;
    use crate::registry::{DriverRegistry, OpenedSensor};
    use crate::scheduler::Scheduler;
    use crate::sensors::MotionSensorDriver;
    use crate::subsystem::{BroadcastSink, MonotonicClock, ObjectIdGenerator};

    /// Run the simulated motion driver with the configuration in `config_path`
    pub async fn run_motion_hub(config_path: &str) -> Result<(), Box<dyn std::error::Error>> {
        info!("[MotionHub] starting up...");

        let motion_config_path = format!("{}/motion.toml", config_path);
        let config = load_motion_config(&motion_config_path)?;
        info!(
            "[config] polling at {} Hz, simulator at {} Hz",
            config.poll.frequency_hz, config.simulator.sample_rate_hz
        );

        let sink = BroadcastSink::new(4096);
        let facility = SimulatedMotion::new(
            config.simulator.sample_rate_hz,
            config.simulator.tick_origin,
        )
        .with_failure_every(config.simulator.fail_every);

        let mut registry = DriverRegistry::new();
        registry.register(Box::new(MotionSensorDriver::new(
            facility,
            Arc::new(ObjectIdGenerator::new()),
            Arc::new(MonotonicClock::new()),
            Arc::new(sink.clone()),
        )));

        let count = registry.init_all()?;
        for sensor in registry.sensors()? {
            info!(
                "[registry] sensor {}: {} ({:?}) id={} driver={}",
                sensor.index, sensor.name, sensor.sensor_type, sensor.instance_id, sensor.driver
            );
        }

        let opened = (0..count)
            .map(|index| registry.open(index))
            .collect::<Result<Vec<OpenedSensor>, _>>()?;

        let monitor = tokio::spawn(monitor_events(
            sink.subscribe(),
            Duration::from_secs(config.poll.summary_interval_secs),
        ));

        let run_for = config.poll.run_for_secs.map(Duration::from_secs);
        let shutdown = async move {
            match run_for {
                Some(duration) => tokio::time::sleep(duration).await,
                None => {
                    let _ = tokio::signal::ctrl_c().await;
                }
            }
        };

        let summary = Scheduler::from_config(&config)
            .run(&mut registry, &opened, shutdown)
            .await;

        for sensor in &opened {
            registry.close(sensor);
        }
        registry.quit_all();

        // Dropping every sender ends the monitor
        drop(registry);
        drop(sink);
        let totals = monitor.await?;

        info!(
            "[main] stopped after {} frame(s), {} event(s) delivered",
            summary.frames,
            totals.values().sum::<u64>()
        );
        Ok(())
    }
}
