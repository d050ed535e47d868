use std::collections::BTreeMap;
use std::time::Duration;

use tokio::sync::broadcast;
use tokio_stream::wrappers::errors::BroadcastStreamRecvError;
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::StreamExt;
use tracing::{debug, info, warn};

use crate::messages::SensorEvent;
use crate::sensors::SensorId;

/// Events received per sensor
pub type EventTotals = BTreeMap<SensorId, u64>;

/// Log every event and print per-sensor rates until the sink closes
pub async fn monitor_events(
    rx: broadcast::Receiver<SensorEvent>,
    summary_interval: Duration,
) -> EventTotals {
    let mut stream = BroadcastStream::new(rx);
    let mut ticker = tokio::time::interval(summary_interval);
    // First tick completes immediately
    ticker.tick().await;

    let mut totals = EventTotals::new();
    let mut window = EventTotals::new();

    loop {
        tokio::select! {
            item = stream.next() => match item {
                Some(Ok(event)) => {
                    match event.to_json() {
                        Ok(json) => debug!("[events] {}", json),
                        Err(e) => warn!("[events] failed to serialize event: {}", e),
                    }
                    *totals.entry(event.sensor_id).or_default() += 1;
                    *window.entry(event.sensor_id).or_default() += 1;
                }
                Some(Err(BroadcastStreamRecvError::Lagged(missed))) => {
                    warn!("[events] consumer lagged, {} event(s) dropped", missed);
                }
                None => break,
            },
            _ = ticker.tick() => {
                let secs = summary_interval.as_secs_f32();
                for (sensor, count) in &window {
                    info!("[events] {}: {:.1} events/s", sensor, *count as f32 / secs);
                }
                window.clear();
            }
        }
    }

    info!("[events] sink closed");
    totals
}
