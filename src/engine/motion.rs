/// Motion status hysteresis
use std::time::Duration;
use tokio::time::Instant;

use crate::config::MotionConfig;

/// Result of one filter evaluation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MotionReading {
    /// Debounced status to report
    pub status: bool,
    /// Instantaneous bit as last seen
    pub last: bool,
    /// Time since the last instantaneous transition, only while `last != status`
    pub last_for: Option<Duration>,
}

/// Debounces the instantaneous motion bit with separate on and off delays
#[derive(Debug, Clone)]
pub struct MotionFilter {
    last: bool,
    status: bool,
    last_since: Instant,
}

impl MotionFilter {
    pub fn new(now: Instant) -> Self {
        Self {
            last: false,
            status: false,
            last_since: now,
        }
    }

    pub fn status(&self) -> bool {
        self.status
    }

    pub fn last(&self) -> bool {
        self.last
    }

    pub fn evaluate(&mut self, motion: bool, now: Instant, config: &MotionConfig) -> MotionReading {
        if motion != self.last {
            self.last = motion;
            self.last_since = now;
        }

        let stable_for = now.saturating_duration_since(self.last_since);
        if motion != self.status {
            let delay = if motion {
                config.on_delay
            } else {
                config.off_delay
            };
            if stable_for >= delay {
                self.status = motion;
            }
        }

        MotionReading {
            status: self.status,
            last: self.last,
            last_for: (self.last != self.status).then_some(stable_for),
        }
    }
}
