use log::{debug, info};
use std::collections::HashMap;
use std::env;
use std::str::FromStr;
use std::time::Duration;

use crate::error::ConfigError;
use crate::models::MacAddress;

/// Which measurement classes get merged and which diagnostics get published
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusConfig {
    pub battery: bool,
    pub voltage: bool,
    pub humidity: bool,
    pub temperature: bool,
    pub flags: bool,
    pub counter: bool,
}

impl Default for StatusConfig {
    fn default() -> Self {
        Self {
            battery: true,
            voltage: true,
            humidity: true,
            temperature: true,
            flags: false,
            counter: false,
        }
    }
}

/// Naming policy for device keys
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NamesConfig {
    pub prefix: String,
    pub use_nickname: bool,
    pub prefix_nickname: bool,
    /// Render all 6 address bytes instead of the trailing 3
    pub full_mac: bool,
}

impl Default for NamesConfig {
    fn default() -> Self {
        Self {
            prefix: "atc_".to_string(),
            use_nickname: true,
            prefix_nickname: true,
            full_mac: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MotionConfig {
    pub on_delay: Duration,
    pub off_delay: Duration,
}

impl Default for MotionConfig {
    fn default() -> Self {
        Self {
            on_delay: Duration::ZERO,
            off_delay: Duration::from_secs(60),
        }
    }
}

/// How an incoming flags byte is combined with the aggregated one
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum FlagsPolicy {
    /// OR together every flag seen since the last publish, clear on publish
    #[default]
    Accumulate,
    /// Keep the most recent valid flags byte
    Overwrite,
}

impl FromStr for FlagsPolicy {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "accumulate" | "or" => Ok(FlagsPolicy::Accumulate),
            "overwrite" | "last" => Ok(FlagsPolicy::Overwrite),
            _ => Err(()),
        }
    }
}

/// A device declared up front, before any of its readings arrive
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceEntry {
    pub mac: MacAddress,
    pub nickname: Option<String>,
    pub motion: bool,
}

impl FromStr for DeviceEntry {
    type Err = ConfigError;

    /// Parses `MAC[=nickname][:motion]`
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let entry = s.trim();
        let invalid = |reason: &str| ConfigError::InvalidDevice {
            entry: entry.to_string(),
            reason: reason.to_string(),
        };

        let (rest, motion) = match entry.strip_suffix(":motion") {
            Some(rest) => (rest, true),
            None => (entry, false),
        };
        let (mac, nickname) = match rest.split_once('=') {
            Some((mac, nickname)) => (mac, Some(nickname.trim())),
            None => (rest, None),
        };
        let mac = mac.parse::<MacAddress>().map_err(|e| invalid(&e.to_string()))?;
        let nickname = nickname.filter(|n| !n.is_empty()).map(str::to_string);

        Ok(DeviceEntry {
            mac,
            nickname,
            motion,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BridgeConfig {
    pub enable: bool,
    pub status: StatusConfig,
    pub names: NamesConfig,
    pub min_period: Duration,
    pub motion: MotionConfig,
    pub flags_policy: FlagsPolicy,
    pub max_devices: usize,
    pub devices: Vec<DeviceEntry>,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            enable: true,
            status: StatusConfig::default(),
            names: NamesConfig::default(),
            min_period: Duration::from_secs(60),
            motion: MotionConfig::default(),
            flags_policy: FlagsPolicy::default(),
            max_devices: 64,
            devices: Vec::new(),
        }
    }
}

impl BridgeConfig {
    /// Load configuration from the process environment and an optional `.env`
    pub fn new() -> Result<Self, ConfigError> {
        dotenv::dotenv().ok();
        Self::from_vars(env::vars())
    }

    /// Build configuration from `ATC_*` key/value pairs, defaulting anything absent
    pub fn from_vars<I>(vars: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let vars: HashMap<String, String> = vars
            .into_iter()
            .filter(|(key, _)| key.starts_with("ATC_"))
            .collect();
        let mut config = Self::default();

        let flag = |key: &str, current: bool| match vars.get(key) {
            Some(value) => parse_bool(key, value),
            None => Ok(current),
        };
        let secs = |key: &str, current: Duration| match vars.get(key) {
            Some(value) => value
                .trim()
                .parse::<u64>()
                .map(Duration::from_secs)
                .map_err(|_| invalid(key, value)),
            None => Ok(current),
        };

        config.enable = flag("ATC_ENABLE", config.enable)?;

        config.status.battery = flag("ATC_STATUS_BATTERY", config.status.battery)?;
        config.status.voltage = flag("ATC_STATUS_VOLTAGE", config.status.voltage)?;
        config.status.humidity = flag("ATC_STATUS_HUMIDITY", config.status.humidity)?;
        config.status.temperature = flag("ATC_STATUS_TEMPERATURE", config.status.temperature)?;
        config.status.flags = flag("ATC_STATUS_FLAGS", config.status.flags)?;
        config.status.counter = flag("ATC_STATUS_COUNTER", config.status.counter)?;

        if let Some(prefix) = vars.get("ATC_NAMES_PREFIX") {
            config.names.prefix = prefix.trim().to_string();
        }
        config.names.use_nickname = flag("ATC_NAMES_USE_NICKNAME", config.names.use_nickname)?;
        config.names.prefix_nickname =
            flag("ATC_NAMES_PREFIX_NICKNAME", config.names.prefix_nickname)?;
        config.names.full_mac = flag("ATC_NAMES_FULL_MAC", config.names.full_mac)?;

        config.min_period = secs("ATC_MIN_PERIOD_SECS", config.min_period)?;
        if config.min_period.is_zero() {
            return Err(ConfigError::Zero("ATC_MIN_PERIOD_SECS"));
        }
        config.motion.on_delay = secs("ATC_MOTION_ON_DELAY_SECS", config.motion.on_delay)?;
        config.motion.off_delay = secs("ATC_MOTION_OFF_DELAY_SECS", config.motion.off_delay)?;

        if let Some(value) = vars.get("ATC_FLAGS_POLICY") {
            config.flags_policy = value.parse().map_err(|_| invalid("ATC_FLAGS_POLICY", value))?;
        }

        if let Some(value) = vars.get("ATC_MAX_DEVICES") {
            config.max_devices = value
                .trim()
                .parse()
                .map_err(|_| invalid("ATC_MAX_DEVICES", value))?;
            if config.max_devices == 0 {
                return Err(ConfigError::Zero("ATC_MAX_DEVICES"));
            }
        }

        if let Some(devices) = vars.get("ATC_DEVICES") {
            for entry in devices.split(',').map(str::trim).filter(|e| !e.is_empty()) {
                let device: DeviceEntry = entry.parse()?;
                debug!(
                    "Configured device {} (nickname: {:?}, motion: {})",
                    device.mac, device.nickname, device.motion
                );
                config.devices.push(device);
            }
        }

        info!(
            "Configuration: min period {}s, flags policy {:?}, {} preconfigured devices",
            config.min_period.as_secs(),
            config.flags_policy,
            config.devices.len()
        );

        Ok(config)
    }
}

fn invalid(key: &str, value: &str) -> ConfigError {
    ConfigError::InvalidValue {
        key: key.to_string(),
        value: value.to_string(),
    }
}

fn parse_bool(key: &str, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(invalid(key, value)),
    }
}
