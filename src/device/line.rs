// Copyright 2019 Petar Dambovaliev. All rights reserved.
// This software may be modified and distributed under the terms
// of the BSD license. See the LICENSE file for details.

//! A configured extension/directory number bound to a device button.

use super::subchannel::{CallDirection, Subchannel};

/// `enum sccp_call_forward_status` in `src/sccp_device.h`.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum CallForwardStatus {
    Inactive,
    InputExten,
    Active,
}

impl CallForwardStatus {
    pub fn wire_code(&self) -> u32 {
        match self {
            CallForwardStatus::Inactive => 1,
            CallForwardStatus::InputExten => 2,
            CallForwardStatus::Active => 3,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Line {
    pub name: String,
    pub cid_num: String,
    pub cid_name: String,
    pub instance: u32,
    pub dnd: bool,
    pub callfwd: CallForwardStatus,
    pub callfwd_exten: String,
    pub subchannels: Vec<Subchannel>,
    pub active_subchannel_id: Option<u32>,
    next_call_id: u32,
}

impl Line {
    pub fn new(instance: u32, name: &str, cid_num: &str, cid_name: &str) -> Line {
        Line {
            name: name.to_string(),
            cid_num: cid_num.to_string(),
            cid_name: cid_name.to_string(),
            instance,
            dnd: false,
            callfwd: CallForwardStatus::Inactive,
            callfwd_exten: String::new(),
            subchannels: Vec::new(),
            active_subchannel_id: None,
            next_call_id: 1,
        }
    }

    pub fn subchannel(&self, id: u32) -> Option<&Subchannel> {
        self.subchannels.iter().find(|s| s.id == id)
    }

    pub fn subchannel_mut(&mut self, id: u32) -> Option<&mut Subchannel> {
        self.subchannels.iter_mut().find(|s| s.id == id)
    }

    pub fn active_subchannel(&self) -> Option<&Subchannel> {
        self.active_subchannel_id.and_then(|id| self.subchannel(id))
    }

    pub fn active_subchannel_mut(&mut self) -> Option<&mut Subchannel> {
        match self.active_subchannel_id {
            Some(id) => self.subchannel_mut(id),
            None => None,
        }
    }

    pub fn select_subchannel(&mut self, id: u32) {
        self.active_subchannel_id = Some(id);
    }

    /// Allocate a new subchannel (call-id counter is monotonic per line)
    /// and make it the active one.
    pub fn new_subchannel(&mut self, direction: CallDirection) -> u32 {
        let id = self.next_call_id;
        self.next_call_id += 1;
        self.subchannels.push(Subchannel::new(id, direction));
        self.active_subchannel_id = Some(id);
        id
    }

    pub fn remove_subchannel(&mut self, id: u32) -> Option<Subchannel> {
        let pos = self.subchannels.iter().position(|s| s.id == id)?;
        let removed = self.subchannels.remove(pos);
        if self.active_subchannel_id == Some(id) {
            self.active_subchannel_id = self.subchannels.first().map(|s| s.id);
        }
        Some(removed)
    }

    /// Next ringing subchannel, for call-waiting presentation. Grounded on
    /// `line_get_next_ringin_subchan`: picks the first one still in `RingIn`.
    pub fn next_ringin_subchannel(&self) -> Option<&Subchannel> {
        self.subchannels.iter().find(|s| s.state == super::subchannel::CallState::RingIn)
    }
}
