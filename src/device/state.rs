use tokio::time::Instant;

use crate::config::MotionConfig;
use crate::device::registry::DeviceId;
use crate::engine::debounce::Debounce;
use crate::engine::motion::{MotionFilter, MotionReading};
use crate::models::MacAddress;

/// Bit of the flags byte carrying the instantaneous motion indicator
pub const FLAG_MOTION: u8 = 0x01;

/// Aggregated, last-known-good view of one sensor
///
/// Every measurement starts out unknown and only ever changes to a newer
/// valid value; see [`DeviceState::merge`](crate::device::merge).
#[derive(Debug, Clone)]
pub struct DeviceState {
    pub(crate) id: DeviceId,
    pub(crate) key: String,
    pub(crate) mac: MacAddress,
    pub(crate) battery_pct: Option<u8>,
    pub(crate) battery_mv: Option<u16>,
    pub(crate) humidity_cpct: Option<u16>,
    pub(crate) temperature_cc: Option<i16>,
    pub(crate) flags: Option<u8>,
    pub(crate) counter: Option<u8>,
    pub(crate) rssi: Option<i16>,
    pub(crate) relayed: bool,
    pub(crate) debounce: Debounce,
    pub(crate) motion: Option<MotionFilter>,
}

impl DeviceState {
    pub(crate) fn new(id: DeviceId, key: String, mac: MacAddress, motion: Option<Instant>) -> Self {
        Self {
            id,
            key,
            mac,
            battery_pct: None,
            battery_mv: None,
            humidity_cpct: None,
            temperature_cc: None,
            flags: None,
            counter: None,
            rssi: None,
            relayed: false,
            debounce: Debounce::new(),
            motion: motion.map(MotionFilter::new),
        }
    }

    pub fn id(&self) -> DeviceId {
        self.id
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn mac(&self) -> MacAddress {
        self.mac
    }

    pub fn battery_pct(&self) -> Option<u8> {
        self.battery_pct
    }

    pub fn battery_mv(&self) -> Option<u16> {
        self.battery_mv
    }

    pub fn humidity_cpct(&self) -> Option<u16> {
        self.humidity_cpct
    }

    pub fn temperature_cc(&self) -> Option<i16> {
        self.temperature_cc
    }

    pub fn flags(&self) -> Option<u8> {
        self.flags
    }

    pub fn counter(&self) -> Option<u8> {
        self.counter
    }

    pub fn rssi(&self) -> Option<i16> {
        self.rssi
    }

    pub fn relayed(&self) -> bool {
        self.relayed
    }

    pub fn debounce(&self) -> &Debounce {
        &self.debounce
    }

    pub fn has_motion(&self) -> bool {
        self.motion.is_some()
    }

    /// Current debounced motion status, `None` for devices without motion
    pub fn motion_status(&self) -> Option<bool> {
        self.motion.as_ref().map(MotionFilter::status)
    }

    /// Instantaneous motion bit of the aggregated flags; unknown flags mean no motion
    pub fn motion_bit(&self) -> bool {
        self.flags.is_some_and(|flags| flags & FLAG_MOTION != 0)
    }

    /// Run the motion filter against the current flags
    pub fn evaluate_motion(
        &mut self,
        now: Instant,
        config: &MotionConfig,
    ) -> Option<MotionReading> {
        let bit = self.motion_bit();
        self.motion
            .as_mut()
            .map(|filter| filter.evaluate(bit, now, config))
    }

    /// Drop flags accumulated since the last publish
    pub(crate) fn clear_flags(&mut self) {
        self.flags = None;
    }
}
