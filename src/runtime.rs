// Copyright 2019 Petar Dambovaliev. All rights reserved.
// This software may be modified and distributed under the terms
// of the BSD license. See the LICENSE file for details.

//! The state every session and the operator interface needs, bundled
//! into one value passed by reference. No global statics: a process
//! embedding this driver can run more than one `Runtime` side by side
//! (e.g. in tests) without them stepping on each other.

use std::sync::{Arc, Mutex};

use crate::config::{Config, ConfigSlot};
use crate::host::ChannelTechnology;
use crate::registry::DeviceRegistry;
use crate::stats::Stats;

/// Scope of the `debug` trace-logging toggle (§4.9/§6.3): off, everyone,
/// or narrowed to one peer address or device name.
#[derive(Debug, Clone, Eq, PartialEq)]
pub enum DebugToggle {
    Off,
    All,
    ByIp(String),
    ByDevice(String),
}

impl Default for DebugToggle {
    fn default() -> DebugToggle {
        DebugToggle::Off
    }
}

pub struct Runtime {
    pub config: ConfigSlot,
    pub registry: DeviceRegistry,
    pub stats: Stats,
    pub host: Option<Arc<dyn ChannelTechnology>>,
    debug: Mutex<DebugToggle>,
}

impl Runtime {
    pub fn new(initial_config: Config) -> Runtime {
        Runtime {
            config: ConfigSlot::new(initial_config),
            registry: DeviceRegistry::new(),
            stats: Stats::new(),
            host: None,
            debug: Mutex::new(DebugToggle::Off),
        }
    }

    pub fn with_host(initial_config: Config, host: Arc<dyn ChannelTechnology>) -> Runtime {
        let mut rt = Runtime::new(initial_config);
        rt.host = Some(host);
        rt
    }

    pub fn debug_enabled(&self) -> bool {
        !matches!(*self.debug.lock().unwrap(), DebugToggle::Off)
    }

    pub fn debug_toggle(&self) -> DebugToggle {
        self.debug.lock().unwrap().clone()
    }

    pub fn set_debug_toggle(&self, toggle: DebugToggle) {
        *self.debug.lock().unwrap() = toggle;
    }

    pub fn set_debug(&self, enabled: bool) {
        self.set_debug_toggle(if enabled { DebugToggle::All } else { DebugToggle::Off });
    }

    /// Whether trace logging should fire for this device/peer, given the
    /// current toggle scope.
    pub fn debug_enabled_for(&self, device_name: &str, remote_ip: Option<&str>) -> bool {
        match &*self.debug.lock().unwrap() {
            DebugToggle::Off => false,
            DebugToggle::All => true,
            DebugToggle::ByDevice(name) => name == device_name,
            DebugToggle::ByIp(ip) => remote_ip == Some(ip.as_str()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RawConfig;

    #[test]
    fn debug_flag_defaults_off() {
        let cfg = Config::build(&RawConfig::default()).unwrap();
        let rt = Runtime::new(cfg);
        assert!(!rt.debug_enabled());
        rt.set_debug(true);
        assert!(rt.debug_enabled());
    }

    #[test]
    fn debug_by_device_only_matches_named_device() {
        let cfg = Config::build(&RawConfig::default()).unwrap();
        let rt = Runtime::new(cfg);
        rt.set_debug_toggle(DebugToggle::ByDevice("SEP001122334455".to_string()));
        assert!(rt.debug_enabled_for("SEP001122334455", None));
        assert!(!rt.debug_enabled_for("SEPOTHER", None));
    }

    #[test]
    fn debug_by_ip_only_matches_named_peer() {
        let cfg = Config::build(&RawConfig::default()).unwrap();
        let rt = Runtime::new(cfg);
        rt.set_debug_toggle(DebugToggle::ByIp("10.0.0.5".to_string()));
        assert!(rt.debug_enabled_for("anything", Some("10.0.0.5")));
        assert!(!rt.debug_enabled_for("anything", Some("10.0.0.6")));
    }
}
