//! Reading aggregation and publish debouncing for all devices.
//!
//! [`Engine`] is the single writer of every device state: readings and timer
//! fires are both delivered to it sequentially, and it calls out to a
//! [`TimerService`] and a [`StatusSink`] without ever being re-entered.

pub mod debounce;
pub mod motion;

use log::{debug, error, warn};
use std::time::Duration;
use tokio::time::Instant;

use crate::config::{BridgeConfig, FlagsPolicy};
use crate::device::{resolve_key, DeviceId, MergeOutcome, NewDevice, Registry};
use crate::error::{RegistryError, ScheduleError};
use crate::models::{MacAddress, RawReading};
use crate::publish::{capabilities, status_report, StatusSink};
use debounce::{FireAction, Phase};

/// Delivers a `timer_fired` event for a device after a delay
///
/// A zero delay means "at the next scheduling opportunity". Implementations
/// must not call back into the engine synchronously.
pub trait TimerService {
    fn schedule(&mut self, device: DeviceId, delay: Duration) -> Result<(), ScheduleError>;
}

/// What happened to one observed reading
#[derive(Debug)]
pub enum Observed {
    Merged { device: DeviceId, armed: bool },
    RelayDuplicate { device: DeviceId },
    Dropped(RegistryError),
}

/// What happened on one timer fire
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fired {
    Published,
    WentIdle,
    Ignored,
}

pub struct Engine<S, T> {
    config: BridgeConfig,
    registry: Registry,
    sink: S,
    timers: T,
}

impl<S: StatusSink, T: TimerService> Engine<S, T> {
    /// Build the engine and register the preconfigured devices
    ///
    /// A preconfigured device that fails to register is logged and skipped.
    pub fn new(config: BridgeConfig, sink: S, timers: T, now: Instant) -> Self {
        let mut engine = Self {
            registry: Registry::new(config.max_devices),
            config,
            sink,
            timers,
        };

        let devices = engine.config.devices.clone();
        for entry in devices {
            let key = resolve_key(&entry.mac, entry.nickname.as_deref(), &engine.config.names);
            let new = NewDevice {
                key,
                mac: entry.mac,
                motion: entry.motion.then_some(now),
            };
            if let Err(e) = engine.create(new) {
                error!("Failed to add configured device {}: {}", entry.mac, e);
            }
        }

        engine
    }

    pub fn config(&self) -> &BridgeConfig {
        &self.config
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn into_sink(self) -> S {
        self.sink
    }

    pub fn timers(&self) -> &T {
        &self.timers
    }

    pub fn timers_mut(&mut self) -> &mut T {
        &mut self.timers
    }

    /// True when no device has a timer outstanding
    pub fn is_quiescent(&self) -> bool {
        self.registry
            .iter()
            .all(|d| d.debounce().phase() == Phase::Resting)
    }

    /// Arm every resting device that still holds unpublished data
    ///
    /// Covers devices whose publish timer could not be scheduled earlier.
    /// Returns how many were armed.
    pub fn rearm_pending(&mut self) -> usize {
        let mut armed = 0;
        for device in self.registry.iter_mut() {
            if !device.debounce.rearm() {
                continue;
            }
            match self.timers.schedule(device.id(), Duration::ZERO) {
                Ok(()) => armed += 1,
                Err(e) => {
                    warn!("{}: failed to arm publish timer: {}", device.key(), e);
                    device.debounce.schedule_failed();
                }
            }
        }
        armed
    }

    fn create(&mut self, new: NewDevice) -> Result<DeviceId, RegistryError> {
        let caps = capabilities(&self.config.status, new.motion.is_some());
        let sink = &mut self.sink;
        self.registry
            .get_or_create(new, |state| sink.register_device(state.key(), state.id(), &caps))
    }

    fn resolve(
        &mut self,
        mac: &MacAddress,
        nickname: Option<&str>,
    ) -> Result<DeviceId, RegistryError> {
        if let Some(id) = self.registry.lookup_by_address(mac) {
            return Ok(id);
        }
        let key = resolve_key(mac, nickname, &self.config.names);
        self.create(NewDevice {
            key,
            mac: *mac,
            motion: None,
        })
    }

    /// Merge one reading and arm the device's publish timer if it was resting
    pub fn reading_observed(&mut self, reading: &RawReading, now: Instant) -> Observed {
        let id = match self.resolve(&reading.mac, reading.name.as_deref()) {
            Ok(id) => id,
            Err(e) => {
                warn!("Dropping reading from {}: {}", reading.mac, e);
                return Observed::Dropped(e);
            }
        };
        let Some(device) = self.registry.device_mut(id) else {
            return Observed::Dropped(RegistryError::UnknownHandle(id));
        };

        match device.merge(reading, &self.config.status, self.config.flags_policy) {
            MergeOutcome::RelayDuplicate => {
                debug!(
                    "{}: relayed duplicate cnt={} via {}",
                    device.key(),
                    reading.cnt,
                    reading.transmitter()
                );
                Observed::RelayDuplicate { device: id }
            }
            MergeOutcome::Merged { arm } => {
                debug!(
                    "{}: merged cnt={} rssi={:?} relayed={}",
                    device.key(),
                    reading.cnt,
                    reading.rssi,
                    device.relayed()
                );
                device.evaluate_motion(now, &self.config.motion);

                let mut armed = false;
                if arm {
                    match self.timers.schedule(id, Duration::ZERO) {
                        Ok(()) => armed = true,
                        Err(e) => {
                            warn!("{}: failed to arm publish timer: {}", device.key(), e);
                            device.debounce.schedule_failed();
                        }
                    }
                }
                Observed::Merged { device: id, armed }
            }
        }
    }

    /// Publish pending data or let the device go idle
    pub fn timer_fired(&mut self, id: DeviceId, now: Instant) -> Fired {
        let Some(device) = self.registry.device_mut(id) else {
            warn!("Timer fired for unknown device {}", id);
            return Fired::Ignored;
        };

        match device.debounce.on_timer() {
            FireAction::Ignore => {
                debug!("{}: stray timer while resting", device.key());
                Fired::Ignored
            }
            FireAction::Rest => {
                debug!("{}: idle", device.key());
                Fired::WentIdle
            }
            FireAction::Publish => {
                let motion = device.evaluate_motion(now, &self.config.motion);
                let report = status_report(device, &self.config.status, motion);
                if let Err(e) = self.sink.publish(device.key(), id, &report) {
                    warn!("{}: publish failed: {}", device.key(), e);
                }
                if self.config.flags_policy == FlagsPolicy::Accumulate {
                    device.clear_flags();
                }
                if let Err(e) = self.timers.schedule(id, self.config.min_period) {
                    warn!("{}: failed to schedule cooldown: {}", device.key(), e);
                    device.debounce.schedule_failed();
                }
                Fired::Published
            }
        }
    }
}
