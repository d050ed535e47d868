use std::collections::HashSet;
use std::future::Future;
use std::time::Duration;

use tokio::time::{interval, MissedTickBehavior};
use tracing::{info, warn};

use crate::config::MotionConfig;
use crate::registry::{DriverRegistry, OpenedSensor};

/// Outcome of a poll loop run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollSummary {
    pub frames: u64,
    /// Number of drivers still degraded when the loop stopped
    pub degraded_drivers: usize,
}

/// Frame loop driving `update` on every open sensor
///
/// All driver calls happen from the task running [`Scheduler::run`], one
/// sensor after another.
#[derive(Debug, Clone)]
pub struct Scheduler {
    frame_period: Duration,
    degraded_after: u32,
    max_frames: Option<u64>,
}

impl Scheduler {
    pub fn new(frame_period: Duration, degraded_after: u32) -> Self {
        Self {
            frame_period,
            degraded_after,
            max_frames: None,
        }
    }

    pub fn from_config(config: &MotionConfig) -> Self {
        Self::new(config.poll.frame_period(), config.health.degraded_after)
    }

    /// Stop on its own after `frames` frames
    pub fn with_max_frames(mut self, frames: u64) -> Self {
        self.max_frames = Some(frames);
        self
    }

    /// Poll until `shutdown` resolves or the frame limit is reached
    pub async fn run<S>(
        &self,
        registry: &mut DriverRegistry,
        sensors: &[OpenedSensor],
        shutdown: S,
    ) -> PollSummary
    where
        S: Future<Output = ()>,
    {
        let mut ticker = interval(self.frame_period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        tokio::pin!(shutdown);

        let mut degraded = HashSet::new();
        let mut frames = 0u64;

        info!(
            "[scheduler] polling {} sensor(s) every {:?}",
            sensors.len(),
            self.frame_period
        );

        loop {
            tokio::select! {
                biased;
                _ = &mut shutdown => {
                    info!("[scheduler] shutdown requested after {} frame(s)", frames);
                    break;
                }
                _ = ticker.tick() => {
                    for sensor in sensors {
                        registry.update(sensor);
                    }
                    frames += 1;
                    self.check_health(registry, sensors, &mut degraded);

                    if self.max_frames.is_some_and(|max| frames >= max) {
                        break;
                    }
                }
            }
        }

        PollSummary {
            frames,
            degraded_drivers: degraded.len(),
        }
    }

    fn check_health(
        &self,
        registry: &DriverRegistry,
        sensors: &[OpenedSensor],
        degraded: &mut HashSet<usize>,
    ) {
        for sensor in sensors {
            let Some(health) = registry.health(sensor) else {
                continue;
            };
            let driver = sensor.driver_index();

            if health.is_degraded(self.degraded_after) {
                if degraded.insert(driver) {
                    match &health.last_error {
                        Some(e) => warn!(
                            "[scheduler] motion device degraded after {} failed poll(s): {}",
                            health.consecutive_failures, e
                        ),
                        None => warn!(
                            "[scheduler] motion device degraded after {} failed poll(s)",
                            health.consecutive_failures
                        ),
                    }
                }
            } else if health.consecutive_failures == 0 && degraded.remove(&driver) {
                info!(
                    "[scheduler] motion device recovered ({} failed poll(s) so far)",
                    health.total_failures
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::hal::mock::MockMotion;
    use crate::hal::RawMotionSample;
    use crate::sensors::MotionSensorDriver;
    use crate::subsystem::testing::{ManualClock, RecordingSink};
    use crate::subsystem::ObjectIdGenerator;

    fn registry_with(facility: MockMotion, sink: &RecordingSink) -> DriverRegistry {
        let mut registry = DriverRegistry::new();
        registry.register(Box::new(MotionSensorDriver::new(
            facility,
            Arc::new(ObjectIdGenerator::new()),
            Arc::new(ManualClock::default()),
            Arc::new(sink.clone()),
        )));
        registry.init_all().unwrap();
        registry
    }

    fn tick(counter: u32) -> RawMotionSample {
        RawMotionSample {
            counter,
            timestamp: counter * 1_000,
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_runs_bounded_frames() {
        let sink = RecordingSink::default();
        let mut facility = MockMotion::new();
        facility.push_samples(vec![tick(1), tick(2)]);
        facility.push_samples(vec![tick(2), tick(3)]);
        facility.push_samples(vec![tick(3), tick(4)]);
        let mut registry = registry_with(facility, &sink);
        let accel = registry.open(0).unwrap();

        let summary = Scheduler::new(Duration::from_millis(1), 5)
            .with_max_frames(3)
            .run(&mut registry, &[accel], std::future::pending())
            .await;

        assert_eq!(summary.frames, 3);
        assert_eq!(summary.degraded_drivers, 0);
        assert_eq!(sink.len(), 4);
    }

    #[tokio::test]
    async fn test_shutdown_stops_before_polling() {
        let sink = RecordingSink::default();
        let mut registry = registry_with(MockMotion::new(), &sink);
        let gyro = registry.open(1).unwrap();

        let summary = Scheduler::new(Duration::from_millis(1), 5)
            .run(&mut registry, &[gyro], std::future::ready(()))
            .await;

        assert_eq!(summary.frames, 0);
    }

    #[tokio::test]
    async fn test_reports_degraded_driver() {
        let sink = RecordingSink::default();
        let mut facility = MockMotion::new();
        for _ in 0..4 {
            facility.push_failure(-1);
        }
        let mut registry = registry_with(facility, &sink);
        let accel = registry.open(0).unwrap();
        let gyro = registry.open(1).unwrap();

        let summary = Scheduler::new(Duration::from_millis(1), 3)
            .with_max_frames(2)
            .run(&mut registry, &[accel, gyro], std::future::pending())
            .await;

        // Two sensors share one device, so one degraded driver
        assert_eq!(summary.degraded_drivers, 1);
        assert_eq!(sink.len(), 0);
    }
}
