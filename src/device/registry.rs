use log::info;
use std::collections::HashMap;
use std::fmt;
use tokio::time::Instant;

use crate::device::state::DeviceState;
use crate::error::{RegistryError, SinkError};
use crate::models::MacAddress;

/// Stable handle for a registered device
///
/// Handed to timers and status receivers instead of references into the
/// registry; never reused for the registry's lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DeviceId(usize);

impl DeviceId {
    pub fn from_index(index: usize) -> Self {
        DeviceId(index)
    }

    pub fn index(&self) -> usize {
        self.0
    }
}

impl fmt::Display for DeviceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// What is known about a device at the moment it is first created
#[derive(Debug, Clone)]
pub struct NewDevice {
    pub key: String,
    pub mac: MacAddress,
    /// Creation instant for the motion filter, `None` when motion is disabled
    pub motion: Option<Instant>,
}

/// Owner of every aggregated device state, indexed by key and by address
#[derive(Debug)]
pub struct Registry {
    devices: Vec<DeviceState>,
    by_key: HashMap<String, DeviceId>,
    by_mac: HashMap<MacAddress, DeviceId>,
    capacity: usize,
}

impl Registry {
    pub fn new(capacity: usize) -> Self {
        Self {
            devices: Vec::new(),
            by_key: HashMap::new(),
            by_mac: HashMap::new(),
            capacity,
        }
    }

    pub fn len(&self) -> usize {
        self.devices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.devices.is_empty()
    }

    pub fn get(&self, key: &str) -> Option<&DeviceState> {
        self.by_key.get(key).and_then(|id| self.device(*id))
    }

    pub fn device(&self, id: DeviceId) -> Option<&DeviceState> {
        self.devices.get(id.0)
    }

    pub fn device_mut(&mut self, id: DeviceId) -> Option<&mut DeviceState> {
        self.devices.get_mut(id.0)
    }

    pub fn lookup_by_address(&self, mac: &MacAddress) -> Option<DeviceId> {
        self.by_mac.get(mac).copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = &DeviceState> {
        self.devices.iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut DeviceState> {
        self.devices.iter_mut()
    }

    /// Return the device registered under `new.key`, or create it
    ///
    /// `register` is called exactly once for a freshly built state, before it
    /// becomes visible; if it fails nothing is kept. A key already owned by a
    /// different address is a name collision and is rejected.
    pub fn get_or_create<F>(
        &mut self,
        new: NewDevice,
        register: F,
    ) -> Result<DeviceId, RegistryError>
    where
        F: FnOnce(&DeviceState) -> Result<(), SinkError>,
    {
        if let Some(&id) = self.by_key.get(&new.key) {
            let existing = self.devices[id.0].mac;
            if existing != new.mac {
                return Err(RegistryError::NameCollision {
                    key: new.key,
                    existing,
                    rejected: new.mac,
                });
            }
            return Ok(id);
        }

        if self.devices.len() >= self.capacity {
            return Err(RegistryError::Full(self.capacity));
        }

        let id = DeviceId(self.devices.len());
        let state = DeviceState::new(id, new.key, new.mac, new.motion);
        register(&state).map_err(|source| RegistryError::Registration {
            key: state.key.clone(),
            source,
        })?;

        info!("Added device {} ({}) as {}", state.key, state.mac, id);
        self.by_key.insert(state.key.clone(), id);
        self.by_mac.insert(state.mac, id);
        self.devices.push(state);
        Ok(id)
    }
}
