use log::debug;
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::AddressError;

/// 6-byte hardware address of a sensor or relay
///
/// Parses `A4:C1:38:11:22:33`, `a4-c1-38-11-22-33` and `A4C138112233`;
/// always displays as uppercase colon-separated hex.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct MacAddress(pub [u8; 6]);

impl MacAddress {
    pub fn octets(&self) -> &[u8; 6] {
        &self.0
    }
}

impl FromStr for MacAddress {
    type Err = AddressError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let hex: String = s
            .trim()
            .chars()
            .filter(|c| *c != ':' && *c != '-')
            .collect();
        if hex.len() != 12 || !hex.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(AddressError(s.to_string()));
        }

        let mut octets = [0u8; 6];
        for (i, octet) in octets.iter_mut().enumerate() {
            *octet = u8::from_str_radix(&hex[i * 2..i * 2 + 2], 16)
                .map_err(|_| AddressError(s.to_string()))?;
        }
        Ok(MacAddress(octets))
    }
}

impl TryFrom<String> for MacAddress {
    type Error = AddressError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<MacAddress> for String {
    fn from(mac: MacAddress) -> Self {
        mac.to_string()
    }
}

impl fmt::Display for MacAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [a, b, c, d, e, g] = self.0;
        write!(
            f,
            "{:02X}:{:02X}:{:02X}:{:02X}:{:02X}:{:02X}",
            a, b, c, d, e, g
        )
    }
}

/// One decoded sensor broadcast as delivered by the radio layer
///
/// Every measurement is optional: a missing or out-of-range value means
/// "not present in this reading" and never overwrites a known value.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct RawReading {
    /// Hardware identity of the sensor itself
    pub mac: MacAddress,
    /// Nickname advertised by the sensor, if any
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub batt_pct: Option<u8>,
    #[serde(default, deserialize_with = "lenient")]
    pub batt_mv: Option<u16>,
    /// Relative humidity in hundredths of a percent
    #[serde(default, deserialize_with = "lenient")]
    pub humi_cpct: Option<u16>,
    /// Temperature in hundredths of a degree Celsius
    #[serde(default, deserialize_with = "lenient")]
    pub temp_cc: Option<i16>,
    #[serde(default, deserialize_with = "lenient")]
    pub flags: Option<u8>,
    /// Sequence counter, wraps at 256
    pub cnt: u8,
    #[serde(default, deserialize_with = "lenient")]
    pub rssi: Option<i16>,
    /// Address that actually transmitted this observation (defaults to `mac`)
    #[serde(default)]
    pub addr: Option<MacAddress>,
}

/// Integer field that reads as absent when it does not fit the target width
fn lenient<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: TryFrom<i64>,
{
    let Some(value) = Option::<i64>::deserialize(deserializer)? else {
        return Ok(None);
    };
    match T::try_from(value) {
        Ok(value) => Ok(Some(value)),
        Err(_) => {
            debug!("Ignoring out-of-range field value {}", value);
            Ok(None)
        }
    }
}

impl RawReading {
    pub fn transmitter(&self) -> MacAddress {
        self.addr.unwrap_or(self.mac)
    }

    /// True when the observation came through a relay rather than directly
    pub fn is_relayed(&self) -> bool {
        self.transmitter() != self.mac
    }
}

/// ON/OFF state as rendered in status objects
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum OnOff {
    On,
    Off,
}

impl From<bool> for OnOff {
    fn from(value: bool) -> Self {
        if value {
            OnOff::On
        } else {
            OnOff::Off
        }
    }
}

/// Measurement classes a device exposes to the status receiver
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Capabilities {
    pub battery: bool,
    pub voltage: bool,
    pub humidity: bool,
    pub temperature: bool,
    pub motion: bool,
}

/// Diagnostic attributes of the motion filter
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct MotionAttributes {
    /// Last instantaneous motion bit
    pub last: OnOff,
    /// Seconds the instantaneous bit has disagreed with the reported status
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_for: Option<u64>,
}

/// Status object handed to the publish step; unknown values are omitted
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct StatusReport {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub battery: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub voltage: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub humidity: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rssi: Option<i16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub relayed: Option<OnOff>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub flags: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub counter: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub motion: Option<OnOff>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mtn: Option<MotionAttributes>,
}
