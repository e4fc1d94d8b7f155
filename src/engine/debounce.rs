//! Per-device publish rate limiting.
//!
//! A leaky-bucket state machine: the first reading after a quiet period is
//! published at the next scheduling opportunity, anything arriving afterwards
//! is coalesced into one publish per cooldown window, and a window without new
//! data returns the device to rest.

/// Which timer, if any, is outstanding for a device
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// No timer scheduled
    Resting,
    /// Zero-delay timer scheduled after fresh data arrived at rest
    Armed,
    /// `min_period` timer scheduled after a publish
    Cooldown,
}

/// What the owner must do when a device's timer fires
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FireAction {
    /// Publish the aggregated state now, then schedule a `min_period` timer
    Publish,
    /// Nothing new since the last publish; the device went back to rest
    Rest,
    /// No timer was outstanding, the fire is stray
    Ignore,
}

#[derive(Debug, Clone)]
pub struct Debounce {
    phase: Phase,
    pending: bool,
}

impl Default for Debounce {
    fn default() -> Self {
        Self::new()
    }
}

impl Debounce {
    pub fn new() -> Self {
        Self {
            phase: Phase::Resting,
            pending: false,
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn is_pending(&self) -> bool {
        self.pending
    }

    /// Record fresh data. Returns true when an immediate timer must be scheduled.
    pub fn on_merge(&mut self) -> bool {
        self.pending = true;
        if self.phase == Phase::Resting {
            self.phase = Phase::Armed;
            true
        } else {
            false
        }
    }

    pub fn on_timer(&mut self) -> FireAction {
        match (self.phase, self.pending) {
            (Phase::Resting, _) => FireAction::Ignore,
            (_, false) => {
                self.phase = Phase::Resting;
                FireAction::Rest
            }
            (_, true) => {
                self.pending = false;
                self.phase = Phase::Cooldown;
                FireAction::Publish
            }
        }
    }

    /// The timer requested by the last transition could not be scheduled.
    ///
    /// Pending data is kept; the next merge re-arms from rest.
    pub fn schedule_failed(&mut self) {
        self.phase = Phase::Resting;
    }

    /// Arm a resting device that still holds unpublished data.
    /// Returns true when an immediate timer must be scheduled.
    pub fn rearm(&mut self) -> bool {
        if self.phase == Phase::Resting && self.pending {
            self.phase = Phase::Armed;
            true
        } else {
            false
        }
    }
}
