// Copyright 2019 Petar Dambovaliev. All rights reserved.
// This software may be modified and distributed under the terms
// of the BSD license. See the LICENSE file for details.

//! A single RTP-bearing leg of a call on a line. A line can hold more
//! than one subchannel at a time (call waiting, attended transfer).

/// `SCCP_OFFHOOK`..`SCCP_PROGRESS` in `src/sccp_device.h`'s `enum sccp_state`.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum CallState {
    Offhook,
    Onhook,
    RingOut,
    RingIn,
    Connected,
    Busy,
    Congestion,
    Hold,
    CallWait,
    Transfer,
    Progress,
}

impl CallState {
    /// The wire value carried in a `CALL_STATE_MESSAGE`'s `callState` field.
    pub fn wire_code(&self) -> u32 {
        match self {
            CallState::Offhook => 1,
            CallState::Onhook => 2,
            CallState::RingOut => 3,
            CallState::RingIn => 4,
            CallState::Connected => 5,
            CallState::Busy => 6,
            CallState::Congestion => 7,
            CallState::Hold => 8,
            CallState::CallWait => 9,
            CallState::Transfer => 10,
            CallState::Progress => 12,
        }
    }
}

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum CallDirection {
    Outgoing,
    Incoming,
}

#[derive(Debug, Clone)]
pub struct Subchannel {
    pub id: u32,
    pub state: CallState,
    pub direction: CallDirection,
    pub on_hold: bool,
    /// The other leg of an attended transfer, if any. Symmetric: when `a`
    /// points at `b`, `b` points back at `a`.
    pub related: Option<u32>,
    pub remote_number: String,
    pub remote_name: String,
    /// Channel handle the host gave us for this leg, once one exists.
    pub channel_id: Option<u64>,
    /// Set once an `OPEN_RECEIVE_CHANNEL` has been sent and cleared once
    /// its matching ack arrives; `START_MEDIA_TRANSMISSION` must never be
    /// sent while this is false, and at most one request may be
    /// outstanding at a time.
    pub open_receive_pending: bool,
}

impl Subchannel {
    pub fn new(id: u32, direction: CallDirection) -> Subchannel {
        Subchannel {
            id,
            state: CallState::Offhook,
            direction,
            on_hold: false,
            related: None,
            remote_number: String::new(),
            remote_name: String::new(),
            channel_id: None,
            open_receive_pending: false,
        }
    }

    pub fn set_hold(&mut self, on_hold: bool) {
        self.on_hold = on_hold;
        self.state = if on_hold { CallState::Hold } else { CallState::Connected };
    }
}
