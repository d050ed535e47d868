//! Services the sensor driver consumes from the surrounding sensor subsystem
//!
//! The driver never reaches for process-wide state directly: identifiers,
//! time and event delivery are all injected through these traits.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

use tokio::sync::broadcast;

use crate::messages::SensorEvent;
use crate::sensors::SensorId;

/// Generator of process-unique sensor instance identifiers
pub trait InstanceIdSource: Send + Sync {
    fn next_id(&self) -> SensorId;
}

/// Monotonic wall-clock source in nanoseconds
pub trait TimeSource: Send + Sync {
    fn now_ns(&self) -> u64;
}

/// Consumer of sensor events
pub trait EventSink: Send + Sync {
    fn send(&self, event: SensorEvent);
}

/// Sequential, non-zero object identifiers
#[derive(Debug)]
pub struct ObjectIdGenerator {
    next: AtomicU64,
}

impl ObjectIdGenerator {
    pub fn new() -> Self {
        Self {
            next: AtomicU64::new(1),
        }
    }
}

impl Default for ObjectIdGenerator {
    fn default() -> Self {
        Self::new()
    }
}

impl InstanceIdSource for ObjectIdGenerator {
    fn next_id(&self) -> SensorId {
        SensorId(self.next.fetch_add(1, Ordering::Relaxed))
    }
}

/// Nanoseconds since the clock was created
#[derive(Debug, Clone, Copy)]
pub struct MonotonicClock {
    origin: Instant,
}

impl MonotonicClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self::new()
    }
}

impl TimeSource for MonotonicClock {
    fn now_ns(&self) -> u64 {
        self.origin.elapsed().as_nanos() as u64
    }
}

/// Fans events out to any number of subscribers
#[derive(Clone)]
pub struct BroadcastSink {
    tx: broadcast::Sender<SensorEvent>,
}

impl BroadcastSink {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SensorEvent> {
        self.tx.subscribe()
    }
}

impl EventSink for BroadcastSink {
    fn send(&self, event: SensorEvent) {
        // No active subscribers is fine
        let _ = self.tx.send(event);
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use crate::sensors::SensorType;

    #[test]
    fn test_object_ids_are_unique_and_non_zero() {
        let ids = ObjectIdGenerator::new();
        let a = ids.next_id();
        let b = ids.next_id();
        assert_ne!(a, b);
        assert_ne!(a, SensorId(0));
    }

    #[test]
    fn test_monotonic_clock_does_not_go_backwards() {
        let clock = MonotonicClock::new();
        let first = clock.now_ns();
        let second = clock.now_ns();
        assert!(second >= first);
    }

    #[test]
    fn test_broadcast_sink_delivers_to_subscribers() {
        let sink = BroadcastSink::new(8);
        // Sending without subscribers must not panic
        sink.send(SensorEvent {
            sensor_id: SensorId(1),
            sensor_type: SensorType::Gyroscope,
            timestamp_ns: 0,
            sensor_timestamp_ns: 0,
            data: [0.0; 3],
        });

        let mut rx = sink.subscribe();
        sink.send(SensorEvent {
            sensor_id: SensorId(2),
            sensor_type: SensorType::Gyroscope,
            timestamp_ns: 5,
            sensor_timestamp_ns: 10,
            data: [0.1, 0.2, 0.3],
        });

        let received = rx.try_recv().unwrap();
        assert_eq!(received.sensor_id, SensorId(2));
        assert_eq!(received.data, [0.1, 0.2, 0.3]);
    }
}
