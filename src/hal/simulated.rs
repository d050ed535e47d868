//! Simulated motion facility for hosts without motion hardware
//!
//! Behaves like the platform facility: once sampling is started it produces
//! snapshots at a fixed rate into a ring of the last `MAX_NUM_STATES`
//! states, and every read returns the whole ring. Consecutive reads
//! therefore overlap, and consumers must deduplicate on the counter.

use std::collections::VecDeque;
use std::f32::consts::TAU;
use std::time::Instant;

use tracing::trace;

use super::{MotionFacility, RawMotionSample, MAX_NUM_STATES};

/// Status returned by reads while sampling is stopped
pub const NOT_SAMPLING_STATUS: i32 = 0x8080_0002u32 as i32;
/// Status returned by injected read failures
pub const INJECTED_FAILURE_STATUS: i32 = 0x8080_0001u32 as i32;

pub struct SimulatedMotion {
    sample_period_us: u32,
    realtime: bool,
    started: Option<Instant>,
    generated: u64,
    counter: u32,
    tick: u32,
    ring: VecDeque<RawMotionSample>,
    fail_every: Option<u32>,
    reads: u64,
}

impl SimulatedMotion {
    /// Simulation paced by the host clock
    pub fn new(sample_rate_hz: u32, tick_origin: u32) -> Self {
        Self::build(sample_rate_hz, tick_origin, true)
    }

    /// Simulation that only advances through [`SimulatedMotion::step`]
    pub fn manual(sample_rate_hz: u32, tick_origin: u32) -> Self {
        Self::build(sample_rate_hz, tick_origin, false)
    }

    fn build(sample_rate_hz: u32, tick_origin: u32, realtime: bool) -> Self {
        let sample_period_us = 1_000_000 / sample_rate_hz.max(1);
        Self {
            sample_period_us: sample_period_us.max(1),
            realtime,
            started: None,
            generated: 0,
            counter: 0,
            tick: tick_origin,
            ring: VecDeque::with_capacity(MAX_NUM_STATES),
            fail_every: None,
            reads: 0,
        }
    }

    /// Fail every `n`-th read with [`INJECTED_FAILURE_STATUS`]
    pub fn with_failure_every(mut self, n: Option<u32>) -> Self {
        self.fail_every = n.filter(|n| *n > 0);
        self
    }

    pub fn is_sampling(&self) -> bool {
        self.started.is_some()
    }

    /// Produce `count` snapshots immediately
    pub fn step(&mut self, count: u64) {
        for _ in 0..count {
            self.generate_one();
        }
    }

    fn generate_one(&mut self) {
        self.generated += 1;
        self.counter = self.counter.wrapping_add(1);
        self.tick = self.tick.wrapping_add(self.sample_period_us);

        let t = (self.generated as f64 * self.sample_period_us as f64 / 1e6) as f32;
        let sample = RawMotionSample {
            counter: self.counter,
            timestamp: self.tick,
            // Device lying flat with a slow wobble
            accelerometer: [0.02 * (TAU * 0.5 * t).sin(), 0.02 * (TAU * 0.5 * t).cos(), -1.0],
            gyro: [0.1 * (TAU * 0.25 * t).sin(), 0.0, 0.05 * (TAU * 0.25 * t).cos()],
        };

        if self.ring.len() == MAX_NUM_STATES {
            self.ring.pop_front();
        }
        self.ring.push_back(sample);
    }

    fn catch_up(&mut self) {
        let Some(started) = self.started else {
            return;
        };
        let due = started.elapsed().as_micros() as u64 / self.sample_period_us as u64;
        let missing = due.saturating_sub(self.generated);
        if missing > MAX_NUM_STATES as u64 {
            // Older snapshots would fall out of the ring anyway
            let skipped = missing - MAX_NUM_STATES as u64;
            self.generated += skipped;
            self.counter = self.counter.wrapping_add(skipped as u32);
            self.tick = self
                .tick
                .wrapping_add((skipped as u32).wrapping_mul(self.sample_period_us));
            self.step(MAX_NUM_STATES as u64);
        } else {
            self.step(missing);
        }
    }
}

impl MotionFacility for SimulatedMotion {
    fn reset(&mut self) -> i32 {
        self.ring.clear();
        self.reads = 0;
        0
    }

    fn start_sampling(&mut self) -> i32 {
        if self.started.is_none() {
            self.started = Some(Instant::now());
            self.generated = 0;
        }
        0
    }

    fn stop_sampling(&mut self) -> i32 {
        self.started = None;
        0
    }

    fn set_angle_threshold(&mut self, _angle: f32) -> i32 {
        0
    }

    fn set_deadband(&mut self, _enabled: bool) -> i32 {
        0
    }

    fn set_tilt_correction(&mut self, _enabled: bool) -> i32 {
        0
    }

    fn read_sensor_state(&mut self, states: &mut [RawMotionSample]) -> (i32, usize) {
        if !self.is_sampling() {
            return (NOT_SAMPLING_STATUS, 0);
        }
        if self.realtime {
            self.catch_up();
        }

        self.reads += 1;
        if let Some(n) = self.fail_every {
            if self.reads % n as u64 == 0 {
                trace!("[simulator] injecting read failure on read {}", self.reads);
                return (INJECTED_FAILURE_STATUS, 0);
            }
        }

        let count = self.ring.len().min(states.len());
        let skip = self.ring.len() - count;
        for (slot, sample) in states.iter_mut().zip(self.ring.iter().skip(skip)) {
            *slot = *sample;
        }
        (0, count)
    }
}
