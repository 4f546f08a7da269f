//! Time utilities for the client simulation

use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

/// Get current Unix timestamp in milliseconds
pub fn unix_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or(Duration::ZERO)
        .as_millis() as u64
}

/// Maximum frame delta fed to the prediction step (seconds).
/// Caps the jump after a stall or tab-switch so physics never teleports.
pub const MAX_FRAME_DT: f32 = 0.05;

/// Target frame interval for the client loop
pub const FRAME_INTERVAL_MS: u64 = 16;

/// Interval between outbound input packets
pub const INPUT_SEND_INTERVAL_MS: u64 = 50;

/// Interval between outbound latency pings
pub const PING_INTERVAL_MS: u64 = 2_000;

/// Clamp a raw frame delta into the range the simulation accepts
pub fn clamp_frame_dt(raw: f32) -> f32 {
    raw.clamp(0.0, MAX_FRAME_DT)
}

/// A simple timer for measuring durations
#[derive(Debug, Clone)]
pub struct Timer {
    start: Instant,
}

impl Timer {
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
        }
    }

    pub fn elapsed_ms(&self) -> u64 {
        self.start.elapsed().as_millis() as u64
    }

    pub fn elapsed_secs(&self) -> f32 {
        self.start.elapsed().as_secs_f32()
    }

    pub fn reset(&mut self) {
        self.start = Instant::now();
    }
}

impl Default for Timer {
    fn default() -> Self {
        Self::new()
    }
}
