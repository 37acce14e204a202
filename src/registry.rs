// Copyright 2019 Petar Dambovaliev. All rights reserved.
// This software may be modified and distributed under the terms
// of the BSD license. See the LICENSE file for details.

//! Thread-safe, name-keyed container of the devices currently attached
//! to this server, used by sessions to publish themselves and by the
//! operator interface to enumerate and inspect them.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, RwLock};

use crate::device::{Device, DeviceType};

pub const ALREADY_REGISTERED: &str = "a device with that name is already registered";

#[derive(Debug, Clone, Eq, PartialEq)]
pub struct DeviceSnapshot {
    pub name: String,
    pub ip: Option<String>,
    pub is_guest: bool,
    pub device_type: DeviceType,
    pub proto_version: u8,
}

pub struct DeviceRegistry {
    devices: RwLock<HashMap<String, Arc<Mutex<Device>>>>,
}

impl DeviceRegistry {
    pub fn new() -> DeviceRegistry {
        DeviceRegistry { devices: RwLock::new(HashMap::new()) }
    }

    /// Add `device` under its name. Fails if a device with that name is
    /// already registered; callers must remove the stale entry first
    /// (e.g. on a reconnect that supersedes a dead session).
    pub fn add(&self, device: Device) -> Result<(), &'static str> {
        let mut devices = self.devices.write().unwrap();
        if devices.contains_key(&device.name) {
            return Err(ALREADY_REGISTERED);
        }
        devices.insert(device.name.clone(), Arc::new(Mutex::new(device)));
        Ok(())
    }

    pub fn remove(&self, name: &str) {
        self.devices.write().unwrap().remove(name);
    }

    pub fn find(&self, name: &str) -> Option<Arc<Mutex<Device>>> {
        self.devices.read().unwrap().get(name).cloned()
    }

    pub fn for_each(&self, mut f: impl FnMut(&Arc<Mutex<Device>>)) {
        let devices = self.devices.read().unwrap();
        for device in devices.values() {
            f(device);
        }
    }

    /// Names matching `prefix`, for CLI tab completion.
    pub fn complete(&self, prefix: &str) -> Vec<String> {
        let devices = self.devices.read().unwrap();
        let mut names: Vec<String> =
            devices.keys().filter(|n| n.starts_with(prefix)).cloned().collect();
        names.sort();
        names
    }

    /// A consistent-enough point-in-time view of every registered device,
    /// for the operator interface (§4.6): name, remote address, guest
    /// flag, type, negotiated protocol version.
    pub fn snapshot_all(&self) -> Vec<DeviceSnapshot> {
        let devices = self.devices.read().unwrap();
        let mut out: Vec<DeviceSnapshot> = devices
            .values()
            .map(|d| {
                let d = d.lock().unwrap();
                DeviceSnapshot {
                    name: d.name.clone(),
                    ip: d.ip.map(|ip| ip.to_string()),
                    is_guest: d.is_guest,
                    device_type: d.device_type,
                    proto_version: d.proto_version,
                }
            })
            .collect();
        out.sort_by(|a, b| a.name.cmp(&b.name));
        out
    }

    pub fn len(&self) -> usize {
        self.devices.read().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for DeviceRegistry {
    fn default() -> Self {
        DeviceRegistry::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DeviceConfig;
    use crate::device::DeviceType;

    fn dummy(name: &str) -> Device {
        Device::new(name, DeviceType::Cipc30016, &DeviceConfig::default())
    }

    #[test]
    fn add_then_find_round_trips() {
        let r = DeviceRegistry::new();
        r.add(dummy("SEP001122334455")).unwrap();
        assert!(r.find("SEP001122334455").is_some());
        assert!(r.find("nope").is_none());
    }

    #[test]
    fn duplicate_add_is_rejected() {
        let r = DeviceRegistry::new();
        r.add(dummy("SEP001122334455")).unwrap();
        assert_eq!(r.add(dummy("SEP001122334455")), Err(ALREADY_REGISTERED));
    }

    #[test]
    fn remove_then_add_again_succeeds() {
        let r = DeviceRegistry::new();
        r.add(dummy("SEP001122334455")).unwrap();
        r.remove("SEP001122334455");
        assert!(r.add(dummy("SEP001122334455")).is_ok());
    }

    #[test]
    fn complete_filters_by_prefix_and_sorts() {
        let r = DeviceRegistry::new();
        r.add(dummy("SEPB")).unwrap();
        r.add(dummy("SEPA")).unwrap();
        r.add(dummy("other")).unwrap();
        assert_eq!(r.complete("SEP"), vec!["SEPA".to_string(), "SEPB".to_string()]);
    }
}
