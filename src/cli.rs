// Copyright 2019 Petar Dambovaliev. All rights reserved.
// This software may be modified and distributed under the terms
// of the BSD license. See the LICENSE file for details.

//! Operator-facing queries and commands, expressed as plain functions
//! over a `Runtime` rather than tied to any particular CLI framework.

use crate::device::RegistrationState;
use crate::runtime::{DebugToggle, Runtime};
use crate::session::SessionCommand;
use crate::stats::StatsSnapshot;

pub const RESET_TYPE_RESTART: u32 = 1;
pub const RESET_TYPE_RESET: u32 = 2;

#[derive(Debug, Clone, Eq, PartialEq)]
pub enum CliOutcome {
    DeviceList(Vec<DeviceSummary>),
    DeviceNotFound,
    DeviceDetail(DeviceSummary),
    Stats(StatsSnapshotView),
    DebugSet(String),
    ResetSent(usize),
    ConfigSummary(ConfigSummaryView),
    Version(String),
}

#[derive(Debug, Clone, Eq, PartialEq)]
pub struct DeviceSummary {
    pub name: String,
    pub registered: bool,
    pub proto_version: u8,
    pub line_count: usize,
}

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct StatsSnapshotView {
    pub sessions_accepted: u64,
    pub sessions_closed: u64,
    pub registrations_rejected: u64,
    pub malformed_frames: u64,
    pub panics: u64,
}

impl From<StatsSnapshot> for StatsSnapshotView {
    fn from(s: StatsSnapshot) -> StatsSnapshotView {
        StatsSnapshotView {
            sessions_accepted: s.sessions_accepted,
            sessions_closed: s.sessions_closed,
            registrations_rejected: s.registrations_rejected,
            malformed_frames: s.malformed_frames,
            panics: s.panics,
        }
    }
}

#[derive(Debug, Clone, Eq, PartialEq)]
pub struct ConfigSummaryView {
    pub authtimeout: u32,
    pub guest_enabled: bool,
    pub max_guests: u32,
    pub bindaddr: String,
    pub port: u16,
    pub device_names: Vec<String>,
}

/// What the operator asked `sccp set debug` to do (§6.3).
#[derive(Debug, Clone, Eq, PartialEq)]
pub enum DebugArg {
    On,
    Off,
    Ip(String),
    Device(String),
}

pub fn list_devices(runtime: &Runtime) -> CliOutcome {
    let mut summaries = Vec::new();
    runtime.registry.for_each(|device| {
        let device = device.lock().unwrap();
        summaries.push(DeviceSummary {
            name: device.name.clone(),
            registered: device.state == RegistrationState::Registered,
            proto_version: device.proto_version,
            line_count: device.lines.len(),
        });
    });
    summaries.sort_by(|a, b| a.name.cmp(&b.name));
    CliOutcome::DeviceList(summaries)
}

pub fn show_device(runtime: &Runtime, name: &str) -> CliOutcome {
    match runtime.registry.find(name) {
        Some(device) => {
            let device = device.lock().unwrap();
            CliOutcome::DeviceDetail(DeviceSummary {
                name: device.name.clone(),
                registered: device.state == RegistrationState::Registered,
                proto_version: device.proto_version,
                line_count: device.lines.len(),
            })
        }
        None => CliOutcome::DeviceNotFound,
    }
}

pub fn show_stats(runtime: &Runtime) -> CliOutcome {
    CliOutcome::Stats(runtime.stats.snapshot().into())
}

pub fn show_config(runtime: &Runtime) -> CliOutcome {
    let config = runtime.config.current();
    let mut device_names: Vec<String> = config.devices.keys().cloned().collect();
    device_names.sort();
    CliOutcome::ConfigSummary(ConfigSummaryView {
        authtimeout: config.general.authtimeout,
        guest_enabled: config.general.guest,
        max_guests: config.general.max_guests,
        bindaddr: config.general.bindaddr.clone(),
        port: config.general.port,
        device_names,
    })
}

pub fn show_version(_runtime: &Runtime) -> CliOutcome {
    CliOutcome::Version(env!("CARGO_PKG_VERSION").to_string())
}

pub fn set_debug(runtime: &Runtime, arg: DebugArg) -> CliOutcome {
    let (toggle, label) = match arg {
        DebugArg::On => (DebugToggle::All, "on".to_string()),
        DebugArg::Off => (DebugToggle::Off, "off".to_string()),
        DebugArg::Ip(ip) => (DebugToggle::ByIp(ip.clone()), format!("ip {}", ip)),
        DebugArg::Device(name) => (DebugToggle::ByDevice(name.clone()), format!("device {}", name)),
    };
    runtime.set_debug_toggle(toggle);
    CliOutcome::DebugSet(label)
}

/// Send `sccp reset <device> [restart]` to one device's live session.
/// Returns `DeviceNotFound` if the device isn't registered right now.
pub fn reset_device(runtime: &Runtime, name: &str, restart: bool) -> CliOutcome {
    match runtime.registry.find(name) {
        Some(device) => {
            let commands = device.lock().unwrap().commands.clone();
            match commands {
                Some(q) => {
                    let reset_type = if restart { RESET_TYPE_RESTART } else { RESET_TYPE_RESET };
                    let _ = q.put(SessionCommand::Reset(reset_type));
                    CliOutcome::ResetSent(1)
                }
                None => CliOutcome::DeviceNotFound,
            }
        }
        None => CliOutcome::DeviceNotFound,
    }
}

/// Send `sccp reset all [restart]` to every currently registered device.
pub fn reset_all(runtime: &Runtime, restart: bool) -> CliOutcome {
    let reset_type = if restart { RESET_TYPE_RESTART } else { RESET_TYPE_RESET };
    let mut sent = 0usize;
    runtime.registry.for_each(|device| {
        let commands = device.lock().unwrap().commands.clone();
        if let Some(q) = commands {
            if q.put(SessionCommand::Reset(reset_type)).is_ok() {
                sent += 1;
            }
        }
    });
    CliOutcome::ResetSent(sent)
}

pub fn complete_device_name(runtime: &Runtime, prefix: &str) -> Vec<String> {
    runtime.registry.complete(prefix)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Config, RawConfig};

    fn empty_runtime() -> Runtime {
        let cfg = Config::build(&RawConfig::default()).unwrap();
        Runtime::new(cfg)
    }

    #[test]
    fn show_device_reports_not_found_for_unknown_name() {
        let rt = empty_runtime();
        assert_eq!(show_device(&rt, "nope"), CliOutcome::DeviceNotFound);
    }

    #[test]
    fn list_devices_is_empty_on_fresh_runtime() {
        let rt = empty_runtime();
        assert_eq!(list_devices(&rt), CliOutcome::DeviceList(vec![]));
    }

    #[test]
    fn set_debug_on_flips_runtime_flag() {
        let rt = empty_runtime();
        assert_eq!(set_debug(&rt, DebugArg::On), CliOutcome::DebugSet("on".to_string()));
        assert!(rt.debug_enabled());
    }

    #[test]
    fn set_debug_by_device_is_scoped() {
        let rt = empty_runtime();
        set_debug(&rt, DebugArg::Device("SEP001122334455".to_string()));
        assert!(rt.debug_enabled_for("SEP001122334455", None));
        assert!(!rt.debug_enabled_for("SEPOTHER", None));
    }

    #[test]
    fn reset_unregistered_device_reports_not_found() {
        let rt = empty_runtime();
        assert_eq!(reset_device(&rt, "SEPNONE", false), CliOutcome::DeviceNotFound);
    }

    #[test]
    fn reset_all_on_empty_registry_sends_nothing() {
        let rt = empty_runtime();
        assert_eq!(reset_all(&rt, false), CliOutcome::ResetSent(0));
    }

    #[test]
    fn show_config_reports_general_settings() {
        let rt = empty_runtime();
        match show_config(&rt) {
            CliOutcome::ConfigSummary(v) => assert_eq!(v.port, 2000),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn show_version_reports_the_crate_version() {
        let rt = empty_runtime();
        assert_eq!(show_version(&rt), CliOutcome::Version(env!("CARGO_PKG_VERSION").to_string()));
    }
}
