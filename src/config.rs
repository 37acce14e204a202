// Copyright 2019 Petar Dambovaliev. All rights reserved.
// This software may be modified and distributed under the terms
// of the BSD license. See the LICENSE file for details.

//! Configuration snapshots: an immutable, `Arc`-shared view of every
//! device/line/speeddial definition, built once per (re)load and
//! published atomically. A build failure leaves the previous snapshot
//! live instead of tearing down the running server.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, RwLock};

use crate::device::{Line, button::SpeedDial};
use crate::error::{Error, Result};

pub const GUEST_DEVICE_NAME: &str = "guest";
const DEFAULT_KEEPALIVE: u32 = 30;

#[derive(Debug, Clone)]
pub struct RawLine {
    pub name: String,
    pub instance: u32,
    pub cid_num: String,
    pub cid_name: String,
}

#[derive(Debug, Clone)]
pub struct RawSpeedDial {
    pub name: String,
    pub label: String,
    pub extension: String,
    pub blf: bool,
}

/// A device as it appears in the raw config text, before its line and
/// speeddial names are resolved against the rest of the config.
#[derive(Debug, Clone)]
pub struct RawDevice {
    pub name: String,
    pub line_names: Vec<String>,
    pub speeddial_names: Vec<String>,
    pub autoanswer: bool,
    /// Keepalive interval in seconds the device should be told to use,
    /// and the interval the session's watchdog is armed against (at 2x).
    /// Zero falls back to `DEFAULT_KEEPALIVE`.
    pub keepalive: u32,
    pub voicemail: Option<String>,
}

impl Default for RawDevice {
    fn default() -> RawDevice {
        RawDevice {
            name: String::new(),
            line_names: Vec::new(),
            speeddial_names: Vec::new(),
            autoanswer: false,
            keepalive: 0,
            voicemail: None,
        }
    }
}

/// The `general` record: settings that apply to the server as a whole
/// rather than to one device.
#[derive(Debug, Clone)]
pub struct GeneralConfig {
    pub authtimeout: u32,
    pub guest: bool,
    pub max_guests: u32,
    pub tos: u32,
    pub bindaddr: String,
    pub port: u16,
    pub dateformat: String,
}

impl Default for GeneralConfig {
    fn default() -> GeneralConfig {
        GeneralConfig {
            authtimeout: 10,
            guest: false,
            max_guests: 1,
            tos: 0,
            bindaddr: "0.0.0.0".to_string(),
            port: 2000,
            dateformat: "M/D/Y".to_string(),
        }
    }
}

/// A device's fully resolved configuration: every line and speeddial it
/// references, by value, ready to seed a `Device`.
#[derive(Debug, Clone)]
pub struct DeviceConfig {
    pub name: String,
    pub lines: Vec<Line>,
    pub speeddials: Vec<SpeedDial>,
    pub autoanswer: bool,
    pub keepalive: u32,
    pub voicemail: Option<String>,
}

impl Default for DeviceConfig {
    fn default() -> DeviceConfig {
        DeviceConfig {
            name: String::new(),
            lines: Vec::new(),
            speeddials: Vec::new(),
            autoanswer: false,
            keepalive: DEFAULT_KEEPALIVE,
            voicemail: None,
        }
    }
}

/// The full resolved configuration, shared read-only across every
/// session thread via `Arc`.
pub struct Config {
    pub general: GeneralConfig,
    pub devices: HashMap<String, DeviceConfig>,
    pub guest_device: Option<DeviceConfig>,
}

/// Raw, unresolved input to a build: lines and speeddials by name, plus
/// the devices that reference them.
pub struct RawConfig {
    pub lines: Vec<RawLine>,
    pub speeddials: Vec<RawSpeedDial>,
    pub devices: Vec<RawDevice>,
    pub guest_device: Option<RawDevice>,
    pub general: GeneralConfig,
}

/// Resolve `names` against `lines`, marking each resolved name `bound` so
/// a later device can't also claim it. Unknown names and names already
/// bound by a previous device both fail the whole build: every line a
/// device names must exist and belong to exactly one device.
fn resolve_lines(
    names: &[String],
    lines: &HashMap<String, RawLine>,
    bound: &mut HashSet<String>,
    device_name: &str,
) -> Result<Vec<Line>> {
    let mut out = Vec::new();
    for name in names {
        let raw = lines.get(name).ok_or_else(|| {
            Error::Config(format!("device {} references unknown line {}", device_name, name))
        })?;
        if !bound.insert(name.clone()) {
            return Err(Error::Config(format!(
                "line {} is claimed by more than one device (device {} is the second)",
                name, device_name
            )));
        }
        out.push(Line::new(raw.instance, &raw.name, &raw.cid_num, &raw.cid_name));
    }
    Ok(out)
}

/// Resolve the speeddial names a device references, skipping (and
/// logging) any name that doesn't match a configured speeddial instead
/// of failing the whole device. Building into a fresh `Vec` of only the
/// names that actually resolved is what keeps a bad reference from
/// leaving a half-built, dangling entry behind.
fn resolve_speeddials(names: &[String], speeddials: &HashMap<String, RawSpeedDial>, device_name: &str) -> Vec<SpeedDial> {
    let mut out = Vec::new();
    for (i, name) in names.iter().enumerate() {
        match speeddials.get(name) {
            Some(sd) => out.push(SpeedDial {
                instance: (i + 1) as u32,
                index: (i + 1) as u32,
                label: sd.label.clone(),
                extension: sd.extension.clone(),
                blf: sd.blf,
            }),
            None => log::warn!("invalid device {}: unknown speeddial {}", device_name, name),
        }
    }
    out
}

fn build_device(
    raw: &RawDevice,
    lines: &HashMap<String, RawLine>,
    speeddials: &HashMap<String, RawSpeedDial>,
    bound: &mut HashSet<String>,
) -> Result<DeviceConfig> {
    let resolved_lines = resolve_lines(&raw.line_names, lines, bound, &raw.name)?;
    if resolved_lines.is_empty() {
        return Err(Error::Config(format!(
            "device {} has no default line; a registered device must have one",
            raw.name
        )));
    }
    Ok(DeviceConfig {
        name: raw.name.clone(),
        lines: resolved_lines,
        speeddials: resolve_speeddials(&raw.speeddial_names, speeddials, &raw.name),
        autoanswer: raw.autoanswer,
        keepalive: if raw.keepalive == 0 { DEFAULT_KEEPALIVE } else { raw.keepalive },
        voicemail: raw.voicemail.clone(),
    })
}

impl Config {
    pub fn build(raw: &RawConfig) -> Result<Config> {
        let lines: HashMap<String, RawLine> = raw.lines.iter().map(|l| (l.name.clone(), l.clone())).collect();
        let speeddials: HashMap<String, RawSpeedDial> =
            raw.speeddials.iter().map(|s| (s.name.clone(), s.clone())).collect();

        let mut bound: HashSet<String> = HashSet::new();

        // The guest slot (if enabled) resolves first so its lines are
        // removed from the pool before regular devices compete for them.
        let guest_device = match &raw.guest_device {
            Some(g) if raw.general.guest => Some(build_device(g, &lines, &speeddials, &mut bound)?),
            _ => None,
        };

        let mut devices = HashMap::new();
        for raw_dev in &raw.devices {
            devices.insert(raw_dev.name.clone(), build_device(raw_dev, &lines, &speeddials, &mut bound)?);
        }

        if let Some(unclaimed) = lines.keys().find(|name| !bound.contains(*name)) {
            return Err(Error::Config(format!("line {} is not claimed by any device", unclaimed)));
        }

        Ok(Config { general: raw.general.clone(), devices, guest_device })
    }

    pub fn device(&self, name: &str) -> Option<&DeviceConfig> {
        self.devices.get(name).or(self.guest_device.as_ref())
    }
}

impl Default for RawConfig {
    fn default() -> RawConfig {
        RawConfig {
            lines: Vec::new(),
            speeddials: Vec::new(),
            devices: Vec::new(),
            guest_device: None,
            general: GeneralConfig::default(),
        }
    }
}

/// Holds the currently live `Config` and swaps it on reload. A failed
/// build (via `try_reload`) never replaces the current snapshot.
pub struct ConfigSlot {
    current: RwLock<Arc<Config>>,
}

impl ConfigSlot {
    pub fn new(initial: Config) -> ConfigSlot {
        ConfigSlot { current: RwLock::new(Arc::new(initial)) }
    }

    pub fn current(&self) -> Arc<Config> {
        self.current.read().unwrap().clone()
    }

    /// Build `raw` and, only on success, publish it as the new snapshot.
    /// On failure the previous snapshot remains live and the error is
    /// returned for the caller (typically the reload command handler) to
    /// report.
    pub fn try_reload(&self, raw: &RawConfig) -> Result<()> {
        let built = Config::build(raw)?;
        *self.current.write().unwrap() = Arc::new(built);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_raw() -> RawConfig {
        RawConfig {
            lines: vec![
                RawLine { name: "200".into(), instance: 1, cid_num: "200".into(), cid_name: "Alice".into() },
                RawLine { name: "201".into(), instance: 1, cid_num: "201".into(), cid_name: "Guest".into() },
            ],
            speeddials: vec![RawSpeedDial { name: "sd1".into(), label: "Bob".into(), extension: "201".into(), blf: true }],
            devices: vec![RawDevice {
                name: "SEP001122334455".into(),
                line_names: vec!["200".into()],
                speeddial_names: vec!["sd1".into(), "nonexistent".into()],
                ..RawDevice::default()
            }],
            guest_device: Some(RawDevice {
                name: GUEST_DEVICE_NAME.into(),
                line_names: vec!["201".into()],
                ..RawDevice::default()
            }),
            general: GeneralConfig { guest: true, ..GeneralConfig::default() },
        }
    }

    #[test]
    fn unresolved_speeddial_is_skipped_not_leaked_as_a_dangling_entry() {
        let cfg = Config::build(&sample_raw()).unwrap();
        let dev = cfg.device("SEP001122334455").unwrap();
        assert_eq!(dev.speeddials.len(), 1);
        assert_eq!(dev.speeddials[0].extension, "201");
    }

    #[test]
    fn device_with_no_lines_fails_to_build() {
        let mut raw = sample_raw();
        raw.devices[0].line_names.clear();
        match Config::build(&raw) {
            Err(Error::Config(_)) => {}
            other => panic!("expected Config error, got {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn unknown_line_name_fails_the_whole_build() {
        let mut raw = sample_raw();
        raw.devices[0].line_names.push("ghost".into());
        match Config::build(&raw) {
            Err(Error::Config(_)) => {}
            other => panic!("expected Config error, got {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn double_claimed_line_fails_the_whole_build() {
        let mut raw = sample_raw();
        raw.guest_device.as_mut().unwrap().line_names = vec!["200".into()];
        match Config::build(&raw) {
            Err(Error::Config(_)) => {}
            other => panic!("expected Config error, got {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn unclaimed_line_fails_the_whole_build() {
        let mut raw = sample_raw();
        raw.lines.push(RawLine { name: "999".into(), instance: 9, cid_num: "999".into(), cid_name: "Nobody".into() });
        match Config::build(&raw) {
            Err(Error::Config(_)) => {}
            other => panic!("expected Config error, got {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn failed_reload_keeps_previous_snapshot_live() {
        let slot = ConfigSlot::new(Config::build(&sample_raw()).unwrap());
        let mut bad = sample_raw();
        bad.devices[0].line_names.clear();
        assert!(slot.try_reload(&bad).is_err());
        assert!(slot.current().device("SEP001122334455").is_some());
    }

    #[test]
    fn unknown_device_falls_back_to_guest() {
        let cfg = Config::build(&sample_raw()).unwrap();
        let dev = cfg.device("SEPFFFFFFFFFFFF").unwrap();
        assert_eq!(dev.name, GUEST_DEVICE_NAME);
    }

    #[test]
    fn guest_slot_absent_when_general_guest_is_off() {
        let mut raw = sample_raw();
        raw.general.guest = false;
        // The guest device's line is no longer claimed by the guest slot,
        // and nothing else claims it, so the build must now reject it.
        match Config::build(&raw) {
            Err(Error::Config(_)) => {}
            other => panic!("expected Config error, got {:?}", other.map(|_| ())),
        }
    }
}
