// Copyright 2019 Petar Dambovaliev. All rights reserved.
// This software may be modified and distributed under the terms
// of the BSD license. See the LICENSE file for details.

//! Device state: lines, subchannels, speed dials, and the call state
//! machine that drives softkey sets and call info on the wire.

pub mod button;
pub mod line;
pub mod softkey;
pub mod subchannel;

pub use button::{ButtonDefinition, ButtonKind};
pub use line::{CallForwardStatus, Line};
pub use softkey::SoftKeySet;
pub use subchannel::{CallDirection, CallState, Subchannel};

use std::net::{Ipv4Addr, SocketAddrV4};
use std::sync::Arc;

use crate::config::DeviceConfig;
use crate::queue::CommandQueue;
use crate::session::SessionCommand;
use crate::wire::messages::Capability;
use crate::wire::MessageBuilder;

/// Model of a Cisco-family phone. Codes match the models xivo-libsccp
/// shipped templates for; anything else is rejected at registration.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum DeviceType {
    Cipc30016,
    Se7905,
    Se7906,
    Se7911,
    Se7912,
    Se7920,
    Se7921,
    Se7931,
    Se7937,
    Se7940,
    Se7941,
    Se7941Ge,
    Se7942,
    Se7960,
    Se7961,
    Se7962,
    Se7970,
}

impl DeviceType {
    pub fn from_code(code: u32) -> Option<DeviceType> {
        Some(match code {
            7 => DeviceType::Se7960,
            8 => DeviceType::Se7940,
            115 => DeviceType::Se7941,
            307 => DeviceType::Se7911,
            309 => DeviceType::Se7941Ge,
            348 => DeviceType::Se7931,
            365 => DeviceType::Se7921,
            369 => DeviceType::Se7906,
            404 => DeviceType::Se7962,
            431 => DeviceType::Se7937,
            434 => DeviceType::Se7942,
            20000 => DeviceType::Se7905,
            30002 => DeviceType::Se7920,
            30006 => DeviceType::Se7970,
            30007 => DeviceType::Se7912,
            30016 => DeviceType::Cipc30016,
            30018 => DeviceType::Se7961,
            _ => return None,
        })
    }

    /// Number of physical buttons available for line/speeddial assignment.
    /// Grounded on `device_get_button_count` in `src/sccp_device.c`.
    pub fn button_count(&self) -> usize {
        match self {
            DeviceType::Se7905 | DeviceType::Se7906 | DeviceType::Se7911 | DeviceType::Se7912 => 1,
            DeviceType::Se7931 => 24,
            DeviceType::Se7937 => 1,
            DeviceType::Se7940 | DeviceType::Se7941 | DeviceType::Se7941Ge | DeviceType::Se7942 => 2,
            DeviceType::Se7920
            | DeviceType::Se7921
            | DeviceType::Se7960
            | DeviceType::Se7961
            | DeviceType::Se7962 => 6,
            DeviceType::Se7970 | DeviceType::Cipc30016 => 8,
        }
    }
}

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum RegistrationState {
    Unregistered,
    Registered,
}

/// A registered device: its lines, speed dials, and the active call
/// bookkeeping needed to answer softkey events in context.
pub struct Device {
    pub name: String,
    pub device_type: DeviceType,
    pub proto_version: u8,
    pub state: RegistrationState,
    pub ip: Option<Ipv4Addr>,
    pub remote: Option<SocketAddrV4>,
    pub lines: Vec<Line>,
    pub default_line_instance: u32,
    pub speeddials: Vec<button::SpeedDial>,
    pub autoanswer: bool,
    pub is_guest: bool,
    pub keepalive: u32,
    pub voicemail: Option<String>,
    pub capabilities: Vec<Capability>,
    /// Digits collected so far for an off-hook dial in progress, per line
    /// instance currently off-hook.
    pub dial_buffer: String,
    pub dialing_line_instance: Option<u32>,
    /// Digits collected for a call-forward-all destination while a line
    /// is in `CallForwardStatus::InputExten`.
    pub fwd_buffer: String,
    pub fwd_line_instance: Option<u32>,
    /// Handle the owning session registers itself under, so the operator
    /// interface can route a `reset` command to this specific connection.
    pub commands: Option<Arc<CommandQueue<SessionCommand>>>,
}

impl Device {
    pub fn new(name: &str, device_type: DeviceType, cfg: &DeviceConfig) -> Device {
        Device {
            name: name.to_string(),
            device_type,
            proto_version: 0,
            state: RegistrationState::Unregistered,
            ip: None,
            remote: None,
            lines: cfg.lines.clone(),
            default_line_instance: cfg.lines.first().map(|l| l.instance).unwrap_or(1),
            speeddials: cfg.speeddials.clone(),
            autoanswer: cfg.autoanswer,
            is_guest: false,
            keepalive: cfg.keepalive,
            voicemail: cfg.voicemail.clone(),
            capabilities: Vec::new(),
            dial_buffer: String::new(),
            dialing_line_instance: None,
            fwd_buffer: String::new(),
            fwd_line_instance: None,
            commands: None,
        }
    }

    pub fn builder(&self) -> MessageBuilder {
        MessageBuilder::new(self.proto_version)
    }

    pub fn line(&self, instance: u32) -> Option<&Line> {
        self.lines.iter().find(|l| l.instance == instance)
    }

    pub fn line_mut(&mut self, instance: u32) -> Option<&mut Line> {
        self.lines.iter_mut().find(|l| l.instance == instance)
    }

    pub fn default_line(&self) -> Option<&Line> {
        self.line(self.default_line_instance)
    }

    /// Finds which line currently holds the subchannel with `call_id`,
    /// if any. Call ids are only unique per line, so this always needs a
    /// `line_instance` hint from the triggering message in practice; this
    /// helper is for the rare case (e.g. transfer completion) where only
    /// the id is in hand.
    pub fn line_for_subchannel(&self, call_id: u32) -> Option<u32> {
        self.lines.iter().find(|l| l.subchannel(call_id).is_some()).map(|l| l.instance)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn device_type_from_code_rejects_unknown() {
        assert!(DeviceType::from_code(1).is_none());
        assert_eq!(DeviceType::from_code(30016), Some(DeviceType::Cipc30016));
    }

    #[test]
    fn button_count_matches_original_table() {
        assert_eq!(DeviceType::Se7931.button_count(), 24);
        assert_eq!(DeviceType::Se7911.button_count(), 1);
        assert_eq!(DeviceType::Se7960.button_count(), 6);
        assert_eq!(DeviceType::Cipc30016.button_count(), 8);
    }

    #[test]
    fn line_allocates_monotonic_call_ids() {
        let cfg = DeviceConfig::default();
        let mut d = Device::new("SEP001122334455", DeviceType::Cipc30016, &cfg);
        d.lines.push(Line::new(1, "200", "200", "Alice"));
        let line = d.line_mut(1).unwrap();
        assert_eq!(line.new_subchannel(CallDirection::Outgoing), 1);
        assert_eq!(line.new_subchannel(CallDirection::Outgoing), 2);
    }
}
