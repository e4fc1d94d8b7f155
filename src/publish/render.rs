/// Rendering aggregated device state into status objects
use crate::config::StatusConfig;
use crate::device::DeviceState;
use crate::engine::motion::MotionReading;
use crate::models::{Capabilities, MotionAttributes, OnOff, StatusReport};

/// Measurement classes a device exposes, as declared on registration
pub fn capabilities(status: &StatusConfig, motion: bool) -> Capabilities {
    Capabilities {
        battery: status.battery,
        voltage: status.voltage,
        humidity: status.humidity,
        temperature: status.temperature,
        motion,
    }
}

/// Build the status object for `device`, leaving out everything unknown
///
/// `motion` is the filter evaluation taken at publish time and is only
/// rendered for motion-capable devices.
pub fn status_report(
    device: &DeviceState,
    status: &StatusConfig,
    motion: Option<MotionReading>,
) -> StatusReport {
    StatusReport {
        battery: device.battery_pct().filter(|_| status.battery),
        voltage: device.battery_mv().filter(|_| status.voltage),
        humidity: device
            .humidity_cpct()
            .filter(|_| status.humidity)
            .map(|v| f64::from(v) / 100.0),
        temperature: device
            .temperature_cc()
            .filter(|_| status.temperature)
            .map(|v| f64::from(v) / 100.0),
        rssi: device.rssi(),
        relayed: device.relayed().then_some(OnOff::On),
        flags: device.flags().filter(|_| status.flags),
        counter: device.counter().filter(|_| status.counter),
        motion: motion.map(|m| OnOff::from(m.status)),
        mtn: motion.map(|m| MotionAttributes {
            last: OnOff::from(m.last),
            last_for: m.last_for.map(|d| d.as_secs()),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::FlagsPolicy;
    use crate::device::DeviceId;
    use crate::models::{MacAddress, RawReading};
    use std::time::Duration;

    const SENSOR: MacAddress = MacAddress([0xA4, 0xC1, 0x38, 0x11, 0x22, 0x33]);

    fn merged(status: &StatusConfig, reading: RawReading) -> DeviceState {
        let mut device =
            DeviceState::new(DeviceId::from_index(0), "atc_112233".into(), SENSOR, None);
        device.merge(&reading, status, FlagsPolicy::Accumulate);
        device
    }

    #[test]
    fn test_fresh_device_renders_empty() {
        let device = DeviceState::new(DeviceId::from_index(0), "atc_112233".into(), SENSOR, None);
        let report = status_report(&device, &StatusConfig::default(), None);
        assert_eq!(serde_json::to_string(&report).unwrap(), "{}");
    }

    #[test]
    fn test_full_status() {
        let status = StatusConfig {
            flags: true,
            counter: true,
            ..Default::default()
        };
        let device = merged(
            &status,
            RawReading {
                mac: SENSOR,
                batt_pct: Some(87),
                batt_mv: Some(2950),
                humi_cpct: Some(4512),
                temp_cc: Some(2134),
                flags: Some(1),
                cnt: 17,
                rssi: Some(-71),
                addr: Some(MacAddress([1, 2, 3, 4, 5, 6])),
                ..Default::default()
            },
        );

        let json = serde_json::to_value(status_report(&device, &status, None)).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "battery": 87,
                "voltage": 2950,
                "humidity": 45.12,
                "temperature": 21.34,
                "rssi": -71,
                "relayed": "ON",
                "flags": 1,
                "counter": 17,
            })
        );
    }

    #[test]
    fn test_flags_and_counter_hidden_by_default() {
        let status = StatusConfig::default();
        let device = merged(
            &status,
            RawReading {
                mac: SENSOR,
                flags: Some(1),
                cnt: 3,
                ..Default::default()
            },
        );
        let report = status_report(&device, &status, None);
        assert_eq!(report.flags, None);
        assert_eq!(report.counter, None);
        assert_eq!(report.relayed, None);
    }

    #[test]
    fn test_motion_attributes() {
        let status = StatusConfig::default();
        let device = DeviceState::new(DeviceId::from_index(0), "atc_112233".into(), SENSOR, None);
        let reading = MotionReading {
            status: false,
            last: true,
            last_for: Some(Duration::from_millis(3_900)),
        };
        let json = serde_json::to_value(status_report(&device, &status, Some(reading))).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"motion": "OFF", "mtn": {"last": "ON", "last_for": 3}})
        );
    }
}
