/// Applying one reading to a device's aggregated state
use crate::config::{FlagsPolicy, StatusConfig};
use crate::device::state::DeviceState;
use crate::models::RawReading;

const BATTERY_PCT_MAX: u8 = 100;
const HUMIDITY_CPCT_MAX: u16 = 10_000;
const TEMPERATURE_CC_RANGE: std::ops::RangeInclusive<i16> = -4_000..=12_500;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeOutcome {
    /// The reading was folded into the aggregated state and is pending publish;
    /// `arm` is set when the device was resting and needs an immediate timer
    Merged { arm: bool },
    /// Same broadcast already pending, seen again through a relay; nothing changed
    RelayDuplicate,
}

fn valid_battery_pct(value: Option<u8>) -> Option<u8> {
    value.filter(|v| *v <= BATTERY_PCT_MAX)
}

fn valid_humidity(value: Option<u16>) -> Option<u16> {
    value.filter(|v| *v <= HUMIDITY_CPCT_MAX)
}

fn valid_temperature(value: Option<i16>) -> Option<i16> {
    value.filter(|v| TEMPERATURE_CC_RANGE.contains(v))
}

/// Overwrite `slot` only when the class is enabled and the reading carries a value
fn sticky<T>(slot: &mut Option<T>, enabled: bool, value: Option<T>) {
    if let (true, Some(value)) = (enabled, value) {
        *slot = Some(value);
    }
}

impl DeviceState {
    /// Merge `reading` under the "keep last known good" policy
    ///
    /// A reading that repeats the pending counter and arrived through a relay
    /// is the same broadcast counted twice and leaves the state untouched.
    /// Otherwise marks the state pending; scheduling the timer requested by
    /// `arm` is the caller's job.
    pub fn merge(
        &mut self,
        reading: &RawReading,
        status: &StatusConfig,
        policy: FlagsPolicy,
    ) -> MergeOutcome {
        let relayed = reading.is_relayed();
        if self.debounce.is_pending() && self.counter == Some(reading.cnt) && relayed {
            return MergeOutcome::RelayDuplicate;
        }

        self.relayed = relayed;
        if reading.rssi.is_some() {
            self.rssi = reading.rssi;
        }

        sticky(&mut self.battery_mv, status.voltage, reading.batt_mv);
        sticky(
            &mut self.battery_pct,
            status.battery,
            valid_battery_pct(reading.batt_pct),
        );
        sticky(
            &mut self.humidity_cpct,
            status.humidity,
            valid_humidity(reading.humi_cpct),
        );
        sticky(
            &mut self.temperature_cc,
            status.temperature,
            valid_temperature(reading.temp_cc),
        );

        if let Some(flags) = reading.flags {
            self.flags = match (policy, self.flags) {
                (FlagsPolicy::Accumulate, Some(current)) => Some(current | flags),
                _ => Some(flags),
            };
        }

        self.counter = Some(reading.cnt);

        MergeOutcome::Merged {
            arm: self.debounce.on_merge(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::registry::DeviceId;
    use crate::engine::debounce::FireAction;
    use crate::models::MacAddress;

    const SENSOR: MacAddress = MacAddress([0xA4, 0xC1, 0x38, 0x11, 0x22, 0x33]);
    const RELAY: MacAddress = MacAddress([0x24, 0x0A, 0xC4, 0x00, 0x00, 0x01]);

    fn device() -> DeviceState {
        DeviceState::new(DeviceId::from_index(0), "atc_112233".into(), SENSOR, None)
    }

    fn reading(cnt: u8) -> RawReading {
        RawReading {
            mac: SENSOR,
            cnt,
            ..Default::default()
        }
    }

    #[test]
    fn test_starts_unknown() {
        let state = device();
        assert_eq!(state.temperature_cc(), None);
        assert_eq!(state.humidity_cpct(), None);
        assert_eq!(state.battery_pct(), None);
        assert_eq!(state.battery_mv(), None);
        assert_eq!(state.flags(), None);
        assert_eq!(state.counter(), None);
        assert_eq!(state.rssi(), None);
        assert!(!state.debounce().is_pending());
    }

    #[test]
    fn test_missing_temperature_keeps_last_known() {
        let mut state = device();
        let status = StatusConfig::default();

        let mut first = reading(1);
        first.temp_cc = Some(2100);
        first.humi_cpct = Some(4500);
        state.merge(&first, &status, FlagsPolicy::Accumulate);

        let mut second = reading(2);
        second.humi_cpct = Some(4600);
        state.merge(&second, &status, FlagsPolicy::Accumulate);

        assert_eq!(state.temperature_cc(), Some(2100));
        assert_eq!(state.humidity_cpct(), Some(4600));
        assert_eq!(state.counter(), Some(2));
    }

    #[test]
    fn test_out_of_range_values_are_not_merged() {
        let mut state = device();
        let status = StatusConfig::default();

        let mut good = reading(1);
        good.batt_pct = Some(80);
        good.humi_cpct = Some(5000);
        good.temp_cc = Some(-1500);
        state.merge(&good, &status, FlagsPolicy::Accumulate);

        let mut bad = reading(2);
        bad.batt_pct = Some(101);
        bad.humi_cpct = Some(10_001);
        bad.temp_cc = Some(i16::MIN);
        state.merge(&bad, &status, FlagsPolicy::Accumulate);

        assert_eq!(state.battery_pct(), Some(80));
        assert_eq!(state.humidity_cpct(), Some(5000));
        assert_eq!(state.temperature_cc(), Some(-1500));
    }

    #[test]
    fn test_disabled_classes_are_ignored() {
        let mut state = device();
        let status = StatusConfig {
            battery: false,
            voltage: false,
            ..Default::default()
        };
        let mut r = reading(1);
        r.batt_pct = Some(50);
        r.batt_mv = Some(2900);
        r.temp_cc = Some(2000);
        state.merge(&r, &status, FlagsPolicy::Accumulate);

        assert_eq!(state.battery_pct(), None);
        assert_eq!(state.battery_mv(), None);
        assert_eq!(state.temperature_cc(), Some(2000));
    }

    #[test]
    fn test_relay_duplicate_is_discarded() {
        let mut state = device();
        let status = StatusConfig::default();

        let mut direct = reading(10);
        direct.temp_cc = Some(2100);
        direct.rssi = Some(-60);
        assert_eq!(
            state.merge(&direct, &status, FlagsPolicy::Accumulate),
            MergeOutcome::Merged { arm: true }
        );

        let mut relayed = reading(10);
        relayed.addr = Some(RELAY);
        relayed.temp_cc = Some(2500);
        relayed.rssi = Some(-90);
        assert_eq!(
            state.merge(&relayed, &status, FlagsPolicy::Accumulate),
            MergeOutcome::RelayDuplicate
        );

        assert_eq!(state.temperature_cc(), Some(2100));
        assert_eq!(state.rssi(), Some(-60));
        assert!(!state.relayed());
    }

    #[test]
    fn test_repeated_counter_direct_is_merged() {
        let mut state = device();
        let status = StatusConfig::default();
        state.merge(&reading(10), &status, FlagsPolicy::Accumulate);
        assert_eq!(
            state.merge(&reading(10), &status, FlagsPolicy::Accumulate),
            MergeOutcome::Merged { arm: false }
        );
    }

    #[test]
    fn test_relayed_reading_without_pending_is_merged() {
        let mut state = device();
        let status = StatusConfig::default();
        state.merge(&reading(10), &status, FlagsPolicy::Accumulate);
        assert_eq!(state.debounce.on_timer(), FireAction::Publish);

        let mut relayed = reading(10);
        relayed.addr = Some(RELAY);
        relayed.rssi = Some(-88);
        assert_eq!(
            state.merge(&relayed, &status, FlagsPolicy::Accumulate),
            MergeOutcome::Merged { arm: false }
        );
        assert!(state.relayed());
        assert_eq!(state.rssi(), Some(-88));
    }

    #[test]
    fn test_flags_accumulate() {
        let mut state = device();
        let status = StatusConfig::default();

        let mut r = reading(1);
        r.flags = Some(0b0001);
        state.merge(&r, &status, FlagsPolicy::Accumulate);
        let mut r = reading(2);
        r.flags = Some(0b0100);
        state.merge(&r, &status, FlagsPolicy::Accumulate);
        state.merge(&reading(3), &status, FlagsPolicy::Accumulate);

        assert_eq!(state.flags(), Some(0b0101));
    }

    #[test]
    fn test_flags_overwrite() {
        let mut state = device();
        let status = StatusConfig::default();

        let mut r = reading(1);
        r.flags = Some(0b0001);
        state.merge(&r, &status, FlagsPolicy::Overwrite);
        let mut r = reading(2);
        r.flags = Some(0b0100);
        state.merge(&r, &status, FlagsPolicy::Overwrite);
        state.merge(&reading(3), &status, FlagsPolicy::Overwrite);

        assert_eq!(state.flags(), Some(0b0100));
    }
}
