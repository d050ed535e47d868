//! Device clock reconstruction from the 32-bit hardware tick

/// Microsecond ticks elapsed between two hardware timestamps.
///
/// Tolerates a single wrap of the 32-bit tick between `last` and `tick`.
pub fn tick_delta(last: u32, tick: u32) -> u32 {
    if last > tick {
        (u32::MAX - last) + tick + 1
    } else {
        tick - last
    }
}

/// Running nanosecond clock fed with raw hardware ticks
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SensorClock {
    last_tick: u32,
    timestamp_ns: u64,
}

impl SensorClock {
    /// Advance to `tick` and return the new device time in nanoseconds
    pub fn advance(&mut self, tick: u32) -> u64 {
        let delta = tick_delta(self.last_tick, tick);
        self.timestamp_ns += u64::from(delta) * 1_000;
        self.last_tick = tick;
        self.timestamp_ns
    }

    pub fn last_tick(&self) -> u32 {
        self.last_tick
    }

    pub fn timestamp_ns(&self) -> u64 {
        self.timestamp_ns
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_delta_without_wrap() {
        assert_eq!(tick_delta(100, 350), 250);
        assert_eq!(tick_delta(42, 42), 0);
    }

    #[test]
    fn test_delta_across_wrap() {
        assert_eq!(tick_delta(0xFFFF_FFF0, 0x0000_0010), 0x20);
        assert_eq!(tick_delta(u32::MAX, 0), 1);
    }

    #[test]
    fn test_clock_first_tick_counts_from_zero() {
        let mut clock = SensorClock::default();
        assert_eq!(clock.advance(1_500), 1_500_000);
        assert_eq!(clock.last_tick(), 1_500);
    }

    #[test]
    fn test_clock_is_monotonic_across_wrap() {
        let mut clock = SensorClock::default();
        let ticks = [
            u32::MAX - 3_000,
            u32::MAX - 1_000,
            u32::MAX,
            999,
            5_000,
            5_000,
        ];

        let mut previous = 0;
        for tick in ticks {
            let now = clock.advance(tick);
            assert!(now >= previous, "clock went backwards at tick {tick}");
            previous = now;
        }

        // From MAX - 3000 to 5000 through the wrap is 8001 us
        let start = (u32::MAX - 3_000) as u64 * 1_000;
        assert_eq!(clock.timestamp_ns(), start + 8_001 * 1_000);
    }
}
