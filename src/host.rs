// Copyright 2019 Petar Dambovaliev. All rights reserved.
// This software may be modified and distributed under the terms
// of the BSD license. See the LICENSE file for details.

//! The seam between this driver and a host telephony engine (the role
//! Asterisk's channel technology interface plays for the original
//! implementation). The driver calls out through this trait; it never
//! assumes a concrete PBX is linked in.

use std::net::SocketAddrV4;

use crate::error::Result;

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum ControlFrame {
    Ringing,
    Answer,
    Busy,
    Congestion,
    Hold,
    Unhold,
}

#[derive(Debug, Clone)]
pub struct MediaFrame {
    pub payload: Vec<u8>,
}

/// Codec negotiated for a call's RTP stream.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct Codec {
    pub payload_type: u32,
    pub packet_size: u32,
}

/// Everything the device/call state machine needs from a host PBX.
/// A host implements this once; the driver never reaches past it into
/// host internals.
pub trait ChannelTechnology: Send + Sync {
    /// Request a new channel for an outgoing call placed by `device_name`
    /// dialing `extension`.
    fn requester(&self, device_name: &str, extension: &str) -> Result<u64>;

    /// Whether `extension` exists in the dialplan context this device uses.
    fn exists_extension(&self, device_name: &str, extension: &str) -> bool;

    /// Whether more digits could complete a valid extension (for enbloc
    /// dialing feedback before the user finishes keying it in).
    fn matchmore_extension(&self, device_name: &str, partial_extension: &str) -> bool;

    /// Hand the call on `channel_id` to the PBX dialplan.
    fn pbx_start(&self, channel_id: u64) -> Result<()>;

    /// BLF/hint devicestate for `extension`, used to drive speed dial lamps.
    fn devicestate(&self, extension: &str) -> u32;

    fn call(&self, channel_id: u64, remote: SocketAddrV4, codec: Codec) -> Result<()>;
    fn hangup(&self, channel_id: u64) -> Result<()>;
    fn answer(&self, channel_id: u64) -> Result<()>;

    fn read(&self, channel_id: u64) -> Result<Option<MediaFrame>>;
    fn write(&self, channel_id: u64, frame: MediaFrame) -> Result<()>;
    fn indicate(&self, channel_id: u64, frame: ControlFrame) -> Result<()>;

    /// Called after a masquerade/attended-transfer fixup reassigns which
    /// physical channel backs this call.
    fn fixup(&self, old_channel_id: u64, new_channel_id: u64) -> Result<()>;

    fn send_digit_end(&self, channel_id: u64, digit: char) -> Result<()>;

    /// Local RTP endpoint the host wants the device to send media to.
    fn rtp_glue(&self, channel_id: u64) -> Result<SocketAddrV4>;

    fn queue_frame(&self, channel_id: u64, frame: MediaFrame) -> Result<()>;
    fn queue_hangup(&self, channel_id: u64) -> Result<()>;
    fn queue_control(&self, channel_id: u64, frame: ControlFrame) -> Result<()>;

    /// Subscribe to MWI (message waiting indicator) state changes for a
    /// voicemail box, invoking `on_change` with the new message count.
    fn mwi_subscribe(&self, voicemail_box: &str, on_change: Box<dyn Fn(u32) + Send>) -> Result<()>;
}
