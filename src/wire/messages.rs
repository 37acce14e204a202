//! Concrete message bodies and the id catalog that ties them to the
//! 12-byte header. Anything this driver doesn't need to interpret
//! decodes into `Message::Unknown` and is logged, not rejected.

use super::buf::{Reader, Writer};
use super::strings::Charset;
use crate::error::Error;

pub const KEEP_ALIVE_MESSAGE: u32 = 0x0000;
pub const REGISTER_MESSAGE: u32 = 0x0001;
pub const IP_PORT_MESSAGE: u32 = 0x0002;
pub const KEYPAD_BUTTON_MESSAGE: u32 = 0x0003;
pub const ENBLOC_CALL_MESSAGE: u32 = 0x0004;
pub const STIMULUS_MESSAGE: u32 = 0x0005;
pub const OFFHOOK_MESSAGE: u32 = 0x0006;
pub const ONHOOK_MESSAGE: u32 = 0x0007;
pub const FORWARD_STATUS_REQ_MESSAGE: u32 = 0x0009;
pub const CAPABILITIES_RES_MESSAGE: u32 = 0x0010;
pub const SPEEDDIAL_STAT_REQ_MESSAGE: u32 = 0x000A;
pub const LINE_STATUS_REQ_MESSAGE: u32 = 0x000B;
pub const CONFIG_STATUS_REQ_MESSAGE: u32 = 0x000C;
pub const TIME_DATE_REQ_MESSAGE: u32 = 0x000D;
pub const BUTTON_TEMPLATE_REQ_MESSAGE: u32 = 0x000E;
pub const ALARM_MESSAGE: u32 = 0x0020;
pub const OPEN_RECEIVE_CHANNEL_ACK_MESSAGE: u32 = 0x0022;
pub const SOFTKEY_SET_REQ_MESSAGE: u32 = 0x0025;
pub const SOFTKEY_EVENT_MESSAGE: u32 = 0x0026;
pub const SOFTKEY_TEMPLATE_REQ_MESSAGE: u32 = 0x0028;
pub const REGISTER_AVAILABLE_LINES_MESSAGE: u32 = 0x002D;
pub const FEATURE_STATUS_REQ_MESSAGE: u32 = 0x0034;
pub const REGISTER_ACK_MESSAGE: u32 = 0x0081;
pub const START_TONE_MESSAGE: u32 = 0x0082;
pub const STOP_TONE_MESSAGE: u32 = 0x0083;
pub const SET_RINGER_MESSAGE: u32 = 0x0085;
pub const SET_LAMP_MESSAGE: u32 = 0x0086;
pub const SET_SPEAKER_MESSAGE: u32 = 0x0088;
pub const START_MEDIA_TRANSMISSION_MESSAGE: u32 = 0x008A;
pub const STOP_MEDIA_TRANSMISSION_MESSAGE: u32 = 0x008B;
pub const CALL_INFO_MESSAGE: u32 = 0x008F;
pub const FORWARD_STATUS_RES_MESSAGE: u32 = 0x0090;
pub const SPEEDDIAL_STAT_RES_MESSAGE: u32 = 0x0091;
pub const LINE_STATUS_RES_MESSAGE: u32 = 0x0092;
pub const CONFIG_STATUS_RES_MESSAGE: u32 = 0x0093;
pub const DATE_TIME_RES_MESSAGE: u32 = 0x0094;
pub const BUTTON_TEMPLATE_RES_MESSAGE: u32 = 0x0097;
pub const CAPABILITIES_REQ_MESSAGE: u32 = 0x009B;
pub const REGISTER_REJ_MESSAGE: u32 = 0x009D;
pub const RESET_MESSAGE: u32 = 0x009F;
pub const KEEP_ALIVE_ACK_MESSAGE: u32 = 0x0100;
pub const OPEN_RECEIVE_CHANNEL_MESSAGE: u32 = 0x0105;
pub const CLOSE_RECEIVE_CHANNEL_MESSAGE: u32 = 0x0106;
pub const SOFTKEY_TEMPLATE_RES_MESSAGE: u32 = 0x0108;
pub const SOFTKEY_SET_RES_MESSAGE: u32 = 0x0109;
pub const SELECT_SOFT_KEYS_MESSAGE: u32 = 0x0110;
pub const CALL_STATE_MESSAGE: u32 = 0x0111;
pub const DISPLAY_NOTIFY_MESSAGE: u32 = 0x0114;
pub const CLEAR_NOTIFY_MESSAGE: u32 = 0x0115;
pub const ACTIVATE_CALL_PLANE_MESSAGE: u32 = 0x0116;
pub const DIALED_NUMBER_MESSAGE: u32 = 0x011D;
pub const FEATURE_STAT_MESSAGE: u32 = 0x0146;

const BUTTON_TEMPLATE_SLOTS: usize = 42;
const SOFTKEY_TEMPLATE_SLOTS: usize = 32;
const SOFTKEY_SET_SLOTS: usize = 16;
const CAPABILITY_SLOTS: usize = 18;

#[derive(Debug, Clone, Eq, PartialEq)]
pub struct Register {
    pub name: String,
    pub user_id: u32,
    pub line_instance: u32,
    pub ip: u32,
    pub device_type: u32,
    pub max_streams: u32,
    pub active_streams: u32,
    pub proto_version: u8,
}

impl Register {
    fn decode(b: &[u8]) -> Result<Register, Error> {
        let mut r = Reader::new(b);
        let name = r.fixed_str(16, Charset::Latin1)?;
        Ok(Register {
            name,
            user_id: r.u32()?,
            line_instance: r.u32()?,
            ip: r.u32()?,
            device_type: r.u32()?,
            max_streams: r.u32()?,
            active_streams: r.u32()?,
            proto_version: r.u8()?,
        })
    }
}

#[derive(Debug, Clone, Eq, PartialEq)]
pub struct RegisterAck {
    pub keepalive: u32,
    pub date_template: String,
    pub secondary_keepalive: u32,
    pub proto_version: u8,
}

impl RegisterAck {
    fn encode(&self) -> Vec<u8> {
        let mut w = Writer::new();
        w.u32(self.keepalive)
            .fixed_str(6, &self.date_template, Charset::Latin1)
            .zeros(2)
            .u32(self.secondary_keepalive)
            .u8(self.proto_version)
            .zeros(3);
        w.into_vec()
    }
}

#[derive(Debug, Clone, Eq, PartialEq)]
pub struct RegisterRej {
    pub reason: String,
}

impl RegisterRej {
    fn encode(&self) -> Vec<u8> {
        let mut w = Writer::new();
        w.fixed_str(33, &self.reason, Charset::Latin1);
        w.into_vec()
    }
}

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub struct IpPort {
    pub station_ip_port: u32,
}

impl IpPort {
    fn decode(b: &[u8]) -> Result<IpPort, Error> {
        let mut r = Reader::new(b);
        Ok(IpPort { station_ip_port: r.u32()? })
    }
}

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub struct Capability {
    pub codec: u32,
    pub frames: u32,
}

#[derive(Debug, Clone, Eq, PartialEq)]
pub struct CapabilitiesRes {
    pub caps: Vec<Capability>,
}

impl CapabilitiesRes {
    fn decode(b: &[u8]) -> Result<CapabilitiesRes, Error> {
        let mut r = Reader::new(b);
        let count = r.u32()? as usize;
        let mut caps = Vec::new();
        for _ in 0..CAPABILITY_SLOTS {
            let codec = r.u32()?;
            let frames = r.u32()?;
            r.skip(8)?;
            caps.push(Capability { codec, frames });
        }
        caps.truncate(count.min(CAPABILITY_SLOTS));
        Ok(CapabilitiesRes { caps })
    }
}

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub struct ButtonDefinition {
    pub line_instance: u8,
    pub button_definition: u8,
}

#[derive(Debug, Clone, Eq, PartialEq)]
pub struct ButtonTemplateRes {
    pub buttons: Vec<ButtonDefinition>,
}

impl ButtonTemplateRes {
    fn encode(&self) -> Vec<u8> {
        let mut w = Writer::new();
        w.u32(0).u32(self.buttons.len() as u32).u32(self.buttons.len() as u32);
        for i in 0..BUTTON_TEMPLATE_SLOTS {
            match self.buttons.get(i) {
                Some(b) => { w.u8(b.line_instance).u8(b.button_definition); }
                None => { w.u8(0).u8(0); }
            }
        }
        w.into_vec()
    }
}

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub struct LineStatusReq {
    pub line_instance: u32,
}

impl LineStatusReq {
    fn decode(b: &[u8]) -> Result<LineStatusReq, Error> {
        let mut r = Reader::new(b);
        Ok(LineStatusReq { line_instance: r.u32()? })
    }
}

#[derive(Debug, Clone, Eq, PartialEq)]
pub struct LineStatusRes {
    pub line_number: u32,
    pub dir_number: String,
    pub display_name: String,
    pub display_alias: String,
}

impl LineStatusRes {
    fn encode(&self, charset: Charset) -> Vec<u8> {
        let mut w = Writer::new();
        w.u32(self.line_number)
            .fixed_str(24, &self.dir_number, charset)
            .fixed_str(40, &self.display_name, charset)
            .fixed_str(44, &self.display_alias, charset);
        w.into_vec()
    }
}

#[derive(Debug, Clone, Eq, PartialEq)]
pub struct ConfigStatusRes {
    pub device_name: String,
    pub station_user_id: u32,
    pub station_instance: u32,
    pub user_name: String,
    pub server_name: String,
    pub number_lines: u32,
    pub number_speed_dials: u32,
}

impl ConfigStatusRes {
    fn encode(&self) -> Vec<u8> {
        let mut w = Writer::new();
        w.fixed_str(16, &self.device_name, Charset::Latin1)
            .u32(self.station_user_id)
            .u32(self.station_instance)
            .fixed_str(40, &self.user_name, Charset::Latin1)
            .fixed_str(40, &self.server_name, Charset::Latin1)
            .u32(self.number_lines)
            .u32(self.number_speed_dials);
        w.into_vec()
    }
}

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub struct TimeDateRes {
    pub year: u32,
    pub month: u32,
    pub day_of_week: u32,
    pub day: u32,
    pub hour: u32,
    pub minute: u32,
    pub seconds: u32,
    pub milliseconds: u32,
    pub system_time: u32,
}

impl TimeDateRes {
    fn encode(&self) -> Vec<u8> {
        let mut w = Writer::new();
        w.u32(self.year)
            .u32(self.month)
            .u32(self.day_of_week)
            .u32(self.day)
            .u32(self.hour)
            .u32(self.minute)
            .u32(self.seconds)
            .u32(self.milliseconds)
            .u32(self.system_time);
        w.into_vec()
    }
}

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub struct SpeedDialStatReq {
    pub instance: u32,
}

impl SpeedDialStatReq {
    fn decode(b: &[u8]) -> Result<SpeedDialStatReq, Error> {
        let mut r = Reader::new(b);
        Ok(SpeedDialStatReq { instance: r.u32()? })
    }
}

#[derive(Debug, Clone, Eq, PartialEq)]
pub struct SpeedDialStatRes {
    pub instance: u32,
    pub extension: String,
    pub label: String,
}

impl SpeedDialStatRes {
    fn encode(&self) -> Vec<u8> {
        let mut w = Writer::new();
        w.u32(self.instance)
            .fixed_str(24, &self.extension, Charset::Latin1)
            .fixed_str(40, &self.label, Charset::Latin1);
        w.into_vec()
    }
}

#[derive(Debug, Clone, Eq, PartialEq)]
pub struct SoftKeyTemplateDefinition {
    pub label: String,
    pub event: u32,
}

#[derive(Debug, Clone, Eq, PartialEq)]
pub struct SoftKeyTemplateRes {
    pub keys: Vec<SoftKeyTemplateDefinition>,
}

impl SoftKeyTemplateRes {
    fn encode(&self) -> Vec<u8> {
        let mut w = Writer::new();
        w.u32(0).u32(self.keys.len() as u32).u32(self.keys.len() as u32);
        for i in 0..SOFTKEY_TEMPLATE_SLOTS {
            match self.keys.get(i) {
                Some(k) => { w.fixed_str(16, &k.label, Charset::Latin1).u32(k.event); }
                None => { w.zeros(16).u32(0); }
            }
        }
        w.into_vec()
    }
}

#[derive(Debug, Clone, Eq, PartialEq)]
pub struct SoftKeySetDefinition {
    pub template_index: [u8; 16],
    pub info_index: [u16; 16],
}

#[derive(Debug, Clone, Eq, PartialEq)]
pub struct SoftKeySetRes {
    pub sets: Vec<SoftKeySetDefinition>,
}

impl SoftKeySetRes {
    fn encode(&self) -> Vec<u8> {
        let mut w = Writer::new();
        w.u32(0).u32(self.sets.len() as u32).u32(self.sets.len() as u32);
        for i in 0..SOFTKEY_SET_SLOTS {
            match self.sets.get(i) {
                Some(s) => {
                    for &idx in &s.template_index { w.u8(idx); }
                    for &idx in &s.info_index { w.u16(idx); }
                }
                None => { w.zeros(16 + 16 * 2); }
            }
        }
        w.u32(0);
        w.into_vec()
    }
}

#[derive(Debug, Clone, Eq, PartialEq)]
pub struct ForwardStatusReq {
    pub line_instance: u32,
}

impl ForwardStatusReq {
    fn decode(b: &[u8]) -> Result<ForwardStatusReq, Error> {
        let mut r = Reader::new(b);
        Ok(ForwardStatusReq { line_instance: r.u32()? })
    }
}

#[derive(Debug, Clone, Eq, PartialEq)]
pub struct ForwardStatusRes {
    pub status: u32,
    pub line_instance: u32,
    pub cfwd_all_status: u32,
    pub cfwd_all_number: String,
    pub cfwd_busy_status: u32,
    pub cfwd_busy_number: String,
    pub cfwd_noanswer_status: u32,
    pub cfwd_noanswer_number: String,
}

impl ForwardStatusRes {
    fn encode(&self) -> Vec<u8> {
        let mut w = Writer::new();
        w.u32(self.status)
            .u32(self.line_instance)
            .u32(self.cfwd_all_status)
            .fixed_str(24, &self.cfwd_all_number, Charset::Latin1)
            .u32(self.cfwd_busy_status)
            .fixed_str(24, &self.cfwd_busy_number, Charset::Latin1)
            .u32(self.cfwd_noanswer_status)
            .fixed_str(24, &self.cfwd_noanswer_number, Charset::Latin1);
        w.into_vec()
    }
}

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub struct FeatureStatusReq {
    pub instance: u32,
}

impl FeatureStatusReq {
    fn decode(b: &[u8]) -> Result<FeatureStatusReq, Error> {
        let mut r = Reader::new(b);
        let instance = r.u32()?;
        r.skip(4)?;
        Ok(FeatureStatusReq { instance })
    }
}

#[derive(Debug, Clone, Eq, PartialEq)]
pub struct FeatureStat {
    pub instance: u32,
    pub feature_type: u32,
    pub status: u32,
    pub label: String,
}

impl FeatureStat {
    fn encode(&self) -> Vec<u8> {
        let mut w = Writer::new();
        w.u32(self.instance)
            .u32(self.feature_type)
            .u32(self.status)
            .fixed_str(40, &self.label, Charset::Latin1);
        w.into_vec()
    }
}

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub struct Offhook {
    pub line_instance: u32,
    pub call_instance: u32,
}

impl Offhook {
    fn decode(b: &[u8]) -> Result<Offhook, Error> {
        let mut r = Reader::new(b);
        Ok(Offhook { line_instance: r.u32()?, call_instance: r.u32()? })
    }
}

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub struct Onhook {
    pub line_instance: u32,
    pub call_instance: u32,
}

impl Onhook {
    fn decode(b: &[u8]) -> Result<Onhook, Error> {
        let mut r = Reader::new(b);
        Ok(Onhook { line_instance: r.u32()?, call_instance: r.u32()? })
    }
}

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub struct KeypadButton {
    pub button: u32,
    pub line_instance: u32,
    pub call_instance: u32,
}

impl KeypadButton {
    fn decode(b: &[u8]) -> Result<KeypadButton, Error> {
        let mut r = Reader::new(b);
        Ok(KeypadButton {
            button: r.u32()?,
            line_instance: r.u32()?,
            call_instance: r.u32()?,
        })
    }
}

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub struct Stimulus {
    pub stimulus: u32,
    pub line_instance: u32,
}

impl Stimulus {
    fn decode(b: &[u8]) -> Result<Stimulus, Error> {
        let mut r = Reader::new(b);
        Ok(Stimulus { stimulus: r.u32()?, line_instance: r.u32()? })
    }
}

#[derive(Debug, Clone, Eq, PartialEq)]
pub struct EnblocCall {
    pub extension: String,
}

impl EnblocCall {
    fn decode(b: &[u8]) -> Result<EnblocCall, Error> {
        let mut r = Reader::new(b);
        Ok(EnblocCall { extension: r.fixed_str(24, Charset::Latin1)? })
    }
}

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub struct SetLamp {
    pub stimulus: u32,
    pub line_instance: u32,
    pub state: u32,
}

impl SetLamp {
    fn encode(&self) -> Vec<u8> {
        let mut w = Writer::new();
        w.u32(self.stimulus).u32(self.line_instance).u32(self.state);
        w.into_vec()
    }
}

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub struct StartTone {
    pub tone: u32,
    pub line_instance: u32,
    pub call_instance: u32,
}

impl StartTone {
    fn encode(&self) -> Vec<u8> {
        let mut w = Writer::new();
        w.u32(self.tone).u32(0).u32(self.line_instance).u32(self.call_instance);
        w.into_vec()
    }
}

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub struct StopTone {
    pub line_instance: u32,
    pub call_instance: u32,
}

impl StopTone {
    fn encode(&self) -> Vec<u8> {
        let mut w = Writer::new();
        w.u32(self.line_instance).u32(self.call_instance);
        w.into_vec()
    }
}

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub struct SetRinger {
    pub mode: u32,
}

impl SetRinger {
    fn encode(&self) -> Vec<u8> {
        let mut w = Writer::new();
        w.u32(self.mode).u32(0).u32(0).zeros(8);
        w.into_vec()
    }
}

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub struct SetSpeaker {
    pub mode: u32,
}

impl SetSpeaker {
    fn encode(&self) -> Vec<u8> {
        let mut w = Writer::new();
        w.u32(self.mode);
        w.into_vec()
    }
}

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub struct ActivateCallPlane {
    pub line_instance: u32,
}

impl ActivateCallPlane {
    fn encode(&self) -> Vec<u8> {
        let mut w = Writer::new();
        w.u32(self.line_instance);
        w.into_vec()
    }
}

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub struct CallState {
    pub call_state: u32,
    pub line_instance: u32,
    pub call_reference: u32,
    pub visibility: u32,
    pub priority: u32,
}

impl CallState {
    fn encode(&self) -> Vec<u8> {
        let mut w = Writer::new();
        w.u32(self.call_state)
            .u32(self.line_instance)
            .u32(self.call_reference)
            .u32(self.visibility)
            .u32(self.priority)
            .u32(0);
        w.into_vec()
    }
}

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub struct SelectSoftKeys {
    pub line_instance: u32,
    pub call_instance: u32,
    pub softkey_set_index: u32,
}

impl SelectSoftKeys {
    fn encode(&self) -> Vec<u8> {
        let mut w = Writer::new();
        w.u32(self.line_instance)
            .u32(self.call_instance)
            .u32(self.softkey_set_index)
            .u32(0xFFFF_FFFF);
        w.into_vec()
    }
}

#[derive(Debug, Clone, Eq, PartialEq)]
pub struct CallInfo {
    pub calling_party_name: String,
    pub calling_party: String,
    pub called_party_name: String,
    pub called_party: String,
    pub line_instance: u32,
    pub call_instance: u32,
    pub call_type: u32,
}

impl CallInfo {
    fn encode(&self, charset: Charset) -> Vec<u8> {
        let mut w = Writer::new();
        w.fixed_str(40, &self.calling_party_name, charset)
            .fixed_str(24, &self.calling_party, charset)
            .fixed_str(40, &self.called_party_name, charset)
            .fixed_str(24, &self.called_party, charset)
            .u32(self.line_instance)
            .u32(self.call_instance)
            .u32(self.call_type)
            .zeros(40 + 24)
            .zeros(40 + 24)
            .u32(0)
            .u32(0)
            .zeros(24 + 24 + 24 + 24)
            .zeros(12);
        w.into_vec()
    }
}

#[derive(Debug, Clone, Eq, PartialEq)]
pub struct DialedNumber {
    pub called_party: String,
    pub line_instance: u32,
    pub call_instance: u32,
}

impl DialedNumber {
    fn encode(&self) -> Vec<u8> {
        let mut w = Writer::new();
        w.fixed_str(24, &self.called_party, Charset::Latin1)
            .u32(self.line_instance)
            .u32(self.call_instance);
        w.into_vec()
    }
}

#[derive(Debug, Clone, Eq, PartialEq)]
pub struct DisplayNotify {
    pub timeout: u32,
    pub text: String,
}

impl DisplayNotify {
    fn encode(&self) -> Vec<u8> {
        let mut w = Writer::new();
        w.u32(self.timeout).fixed_str(100, &self.text, Charset::Latin1);
        w.into_vec()
    }
}

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub struct OpenReceiveChannel {
    pub conference_id: u32,
    pub party_id: u32,
    pub packets: u32,
    pub capability: u32,
    pub echo: u32,
    pub bitrate: u32,
}

impl OpenReceiveChannel {
    fn encode(&self) -> Vec<u8> {
        let mut w = Writer::new();
        w.u32(self.conference_id)
            .u32(self.party_id)
            .u32(self.packets)
            .u32(self.capability)
            .u32(self.echo)
            .u32(self.bitrate)
            .u32(self.conference_id)
            .zeros(4 * 14)
            .u32(0)
            .u32(0)
            .u32(0)
            .u32(0)
            .zeros(16)
            .u32(0);
        w.into_vec()
    }
}

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub struct OpenReceiveChannelAck {
    pub status: u32,
    pub ip_addr: u32,
    pub port: u32,
    pub pass_thru_id: u32,
}

impl OpenReceiveChannelAck {
    fn decode(b: &[u8]) -> Result<OpenReceiveChannelAck, Error> {
        let mut r = Reader::new(b);
        Ok(OpenReceiveChannelAck {
            status: r.u32()?,
            ip_addr: r.u32()?,
            port: r.u32()?,
            pass_thru_id: r.u32()?,
        })
    }
}

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub struct CloseReceiveChannel {
    pub conference_id: u32,
    pub party_id: u32,
}

impl CloseReceiveChannel {
    fn encode(&self) -> Vec<u8> {
        let mut w = Writer::new();
        w.u32(self.conference_id).u32(self.party_id).u32(self.conference_id);
        w.into_vec()
    }
}

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub struct StartMediaTransmission {
    pub conference_id: u32,
    pub pass_thru_party_id: u32,
    pub remote_ip: u32,
    pub remote_port: u32,
    pub packet_size: u32,
    pub payload_type: u32,
}

impl StartMediaTransmission {
    fn encode(&self) -> Vec<u8> {
        let mut w = Writer::new();
        w.u32(self.conference_id)
            .u32(self.pass_thru_party_id)
            .u32(self.remote_ip)
            .u32(self.remote_port)
            .u32(self.packet_size)
            .u32(self.payload_type)
            .u32(0)
            .u32(0)
            .u16(0)
            .zeros(2)
            .u32(0)
            .u32(self.conference_id)
            .zeros(4 * 14)
            .u32(0)
            .u32(0)
            .u32(0)
            .u32(0);
        w.into_vec()
    }
}

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub struct StopMediaTransmission {
    pub conference_id: u32,
    pub party_id: u32,
}

impl StopMediaTransmission {
    fn encode(&self) -> Vec<u8> {
        let mut w = Writer::new();
        w.u32(self.conference_id).u32(self.party_id).u32(self.conference_id).u32(0);
        w.into_vec()
    }
}

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub struct SoftKeyEvent {
    pub event: u32,
    pub line_instance: u32,
    pub call_instance: u32,
}

impl SoftKeyEvent {
    fn decode(b: &[u8]) -> Result<SoftKeyEvent, Error> {
        let mut r = Reader::new(b);
        Ok(SoftKeyEvent {
            event: r.u32()?,
            line_instance: r.u32()?,
            call_instance: r.u32()?,
        })
    }
}

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub struct Reset {
    pub reset_type: u32,
}

impl Reset {
    fn encode(&self) -> Vec<u8> {
        let mut w = Writer::new();
        w.u32(self.reset_type);
        w.into_vec()
    }
}

#[derive(Debug, Clone, Eq, PartialEq)]
pub struct Alarm {
    pub severity: u32,
    pub display_message: String,
    pub param1: u32,
    pub param2: u32,
}

impl Alarm {
    fn decode(b: &[u8]) -> Result<Alarm, Error> {
        let mut r = Reader::new(b);
        Ok(Alarm {
            severity: r.u32()?,
            display_message: r.fixed_str(80, Charset::Latin1)?,
            param1: r.u32()?,
            param2: r.u32()?,
        })
    }
}

/// A decoded frame body. Variants the driver doesn't act on (and anything
/// with an id this build doesn't recognize) land in `Unknown` so a session
/// can log and keep reading instead of tearing down the connection.
#[derive(Debug, Clone, PartialEq)]
pub enum Message {
    KeepAlive,
    KeepAliveAck,
    Register(Register),
    RegisterAck(RegisterAck),
    RegisterRej(RegisterRej),
    IpPort(IpPort),
    KeypadButton(KeypadButton),
    EnblocCall(EnblocCall),
    Stimulus(Stimulus),
    Offhook(Offhook),
    Onhook(Onhook),
    ForwardStatusReq(ForwardStatusReq),
    ForwardStatusRes(ForwardStatusRes),
    CapabilitiesReq,
    CapabilitiesRes(CapabilitiesRes),
    SpeedDialStatReq(SpeedDialStatReq),
    SpeedDialStatRes(SpeedDialStatRes),
    LineStatusReq(LineStatusReq),
    LineStatusRes(LineStatusRes),
    ConfigStatusReq,
    ConfigStatusRes(ConfigStatusRes),
    TimeDateReq,
    TimeDateRes(TimeDateRes),
    ButtonTemplateReq,
    ButtonTemplateRes(ButtonTemplateRes),
    Alarm(Alarm),
    OpenReceiveChannel(OpenReceiveChannel),
    OpenReceiveChannelAck(OpenReceiveChannelAck),
    CloseReceiveChannel(CloseReceiveChannel),
    SoftKeySetReq,
    SoftKeySetRes(SoftKeySetRes),
    SoftKeyEvent(SoftKeyEvent),
    SoftKeyTemplateReq,
    SoftKeyTemplateRes(SoftKeyTemplateRes),
    RegisterAvailableLines,
    FeatureStatusReq(FeatureStatusReq),
    FeatureStat(FeatureStat),
    SetLamp(SetLamp),
    StartTone(StartTone),
    StopTone(StopTone),
    SetRinger(SetRinger),
    SetSpeaker(SetSpeaker),
    StartMediaTransmission(StartMediaTransmission),
    StopMediaTransmission(StopMediaTransmission),
    CallInfo(CallInfo),
    DialedNumber(DialedNumber),
    DisplayNotify(DisplayNotify),
    ClearNotify,
    ActivateCallPlane(ActivateCallPlane),
    SelectSoftKeys(SelectSoftKeys),
    CallState(CallState),
    Reset(Reset),
    Unknown { id: u32, body: Vec<u8> },
}

impl Message {
    pub fn id(&self) -> u32 {
        match self {
            Message::KeepAlive => KEEP_ALIVE_MESSAGE,
            Message::KeepAliveAck => KEEP_ALIVE_ACK_MESSAGE,
            Message::Register(_) => REGISTER_MESSAGE,
            Message::RegisterAck(_) => REGISTER_ACK_MESSAGE,
            Message::RegisterRej(_) => REGISTER_REJ_MESSAGE,
            Message::IpPort(_) => IP_PORT_MESSAGE,
            Message::KeypadButton(_) => KEYPAD_BUTTON_MESSAGE,
            Message::EnblocCall(_) => ENBLOC_CALL_MESSAGE,
            Message::Stimulus(_) => STIMULUS_MESSAGE,
            Message::Offhook(_) => OFFHOOK_MESSAGE,
            Message::Onhook(_) => ONHOOK_MESSAGE,
            Message::ForwardStatusReq(_) => FORWARD_STATUS_REQ_MESSAGE,
            Message::ForwardStatusRes(_) => FORWARD_STATUS_RES_MESSAGE,
            Message::CapabilitiesReq => CAPABILITIES_REQ_MESSAGE,
            Message::CapabilitiesRes(_) => CAPABILITIES_RES_MESSAGE,
            Message::SpeedDialStatReq(_) => SPEEDDIAL_STAT_REQ_MESSAGE,
            Message::SpeedDialStatRes(_) => SPEEDDIAL_STAT_RES_MESSAGE,
            Message::LineStatusReq(_) => LINE_STATUS_REQ_MESSAGE,
            Message::LineStatusRes(_) => LINE_STATUS_RES_MESSAGE,
            Message::ConfigStatusReq => CONFIG_STATUS_REQ_MESSAGE,
            Message::ConfigStatusRes(_) => CONFIG_STATUS_RES_MESSAGE,
            Message::TimeDateReq => TIME_DATE_REQ_MESSAGE,
            Message::TimeDateRes(_) => DATE_TIME_RES_MESSAGE,
            Message::ButtonTemplateReq => BUTTON_TEMPLATE_REQ_MESSAGE,
            Message::ButtonTemplateRes(_) => BUTTON_TEMPLATE_RES_MESSAGE,
            Message::Alarm(_) => ALARM_MESSAGE,
            Message::OpenReceiveChannel(_) => OPEN_RECEIVE_CHANNEL_MESSAGE,
            Message::OpenReceiveChannelAck(_) => OPEN_RECEIVE_CHANNEL_ACK_MESSAGE,
            Message::CloseReceiveChannel(_) => CLOSE_RECEIVE_CHANNEL_MESSAGE,
            Message::SoftKeySetReq => SOFTKEY_SET_REQ_MESSAGE,
            Message::SoftKeySetRes(_) => SOFTKEY_SET_RES_MESSAGE,
            Message::SoftKeyEvent(_) => SOFTKEY_EVENT_MESSAGE,
            Message::SoftKeyTemplateReq => SOFTKEY_TEMPLATE_REQ_MESSAGE,
            Message::SoftKeyTemplateRes(_) => SOFTKEY_TEMPLATE_RES_MESSAGE,
            Message::RegisterAvailableLines => REGISTER_AVAILABLE_LINES_MESSAGE,
            Message::FeatureStatusReq(_) => FEATURE_STATUS_REQ_MESSAGE,
            Message::FeatureStat(_) => FEATURE_STAT_MESSAGE,
            Message::SetLamp(_) => SET_LAMP_MESSAGE,
            Message::StartTone(_) => START_TONE_MESSAGE,
            Message::StopTone(_) => STOP_TONE_MESSAGE,
            Message::SetRinger(_) => SET_RINGER_MESSAGE,
            Message::SetSpeaker(_) => SET_SPEAKER_MESSAGE,
            Message::StartMediaTransmission(_) => START_MEDIA_TRANSMISSION_MESSAGE,
            Message::StopMediaTransmission(_) => STOP_MEDIA_TRANSMISSION_MESSAGE,
            Message::CallInfo(_) => CALL_INFO_MESSAGE,
            Message::DialedNumber(_) => DIALED_NUMBER_MESSAGE,
            Message::DisplayNotify(_) => DISPLAY_NOTIFY_MESSAGE,
            Message::ClearNotify => CLEAR_NOTIFY_MESSAGE,
            Message::ActivateCallPlane(_) => ACTIVATE_CALL_PLANE_MESSAGE,
            Message::SelectSoftKeys(_) => SELECT_SOFT_KEYS_MESSAGE,
            Message::CallState(_) => CALL_STATE_MESSAGE,
            Message::Reset(_) => RESET_MESSAGE,
            Message::Unknown { id, .. } => *id,
        }
    }

    /// Decode a message body. `id` comes from the frame header; `charset`
    /// gates string fields the device sends back to us (currently none —
    /// every inbound string field this driver reads is ASCII extension
    /// digits or a device name, safe under either charset).
    pub fn decode(id: u32, body: &[u8]) -> Result<Message, Error> {
        Ok(match id {
            KEEP_ALIVE_MESSAGE => Message::KeepAlive,
            KEEP_ALIVE_ACK_MESSAGE => Message::KeepAliveAck,
            REGISTER_MESSAGE => Message::Register(Register::decode(body)?),
            IP_PORT_MESSAGE => Message::IpPort(IpPort::decode(body)?),
            KEYPAD_BUTTON_MESSAGE => Message::KeypadButton(KeypadButton::decode(body)?),
            ENBLOC_CALL_MESSAGE => Message::EnblocCall(EnblocCall::decode(body)?),
            STIMULUS_MESSAGE => Message::Stimulus(Stimulus::decode(body)?),
            OFFHOOK_MESSAGE => Message::Offhook(Offhook::decode(body)?),
            ONHOOK_MESSAGE => Message::Onhook(Onhook::decode(body)?),
            FORWARD_STATUS_REQ_MESSAGE => Message::ForwardStatusReq(ForwardStatusReq::decode(body)?),
            CAPABILITIES_REQ_MESSAGE => Message::CapabilitiesReq,
            CAPABILITIES_RES_MESSAGE => Message::CapabilitiesRes(CapabilitiesRes::decode(body)?),
            SPEEDDIAL_STAT_REQ_MESSAGE => Message::SpeedDialStatReq(SpeedDialStatReq::decode(body)?),
            LINE_STATUS_REQ_MESSAGE => Message::LineStatusReq(LineStatusReq::decode(body)?),
            CONFIG_STATUS_REQ_MESSAGE => Message::ConfigStatusReq,
            TIME_DATE_REQ_MESSAGE => Message::TimeDateReq,
            BUTTON_TEMPLATE_REQ_MESSAGE => Message::ButtonTemplateReq,
            ALARM_MESSAGE => Message::Alarm(Alarm::decode(body)?),
            OPEN_RECEIVE_CHANNEL_ACK_MESSAGE => {
                Message::OpenReceiveChannelAck(OpenReceiveChannelAck::decode(body)?)
            }
            SOFTKEY_SET_REQ_MESSAGE => Message::SoftKeySetReq,
            SOFTKEY_EVENT_MESSAGE => Message::SoftKeyEvent(SoftKeyEvent::decode(body)?),
            SOFTKEY_TEMPLATE_REQ_MESSAGE => Message::SoftKeyTemplateReq,
            REGISTER_AVAILABLE_LINES_MESSAGE => Message::RegisterAvailableLines,
            FEATURE_STATUS_REQ_MESSAGE => Message::FeatureStatusReq(FeatureStatusReq::decode(body)?),
            CLEAR_NOTIFY_MESSAGE => Message::ClearNotify,
            _ => Message::Unknown { id, body: body.to_vec() },
        })
    }

    /// Encode a message body the driver sends to the device. Panics are
    /// not possible here: every outbound variant has a fixed-shape encoder.
    pub fn encode(&self, charset: Charset) -> Vec<u8> {
        match self {
            Message::KeepAlive | Message::KeepAliveAck => Vec::new(),
            Message::RegisterAck(m) => m.encode(),
            Message::RegisterRej(m) => m.encode(),
            Message::ButtonTemplateRes(m) => m.encode(),
            Message::LineStatusRes(m) => m.encode(charset),
            Message::ConfigStatusRes(m) => m.encode(),
            Message::TimeDateRes(m) => m.encode(),
            Message::SpeedDialStatRes(m) => m.encode(),
            Message::SoftKeyTemplateRes(m) => m.encode(),
            Message::SoftKeySetRes(m) => m.encode(),
            Message::ForwardStatusRes(m) => m.encode(),
            Message::FeatureStat(m) => m.encode(),
            Message::SetLamp(m) => m.encode(),
            Message::StartTone(m) => m.encode(),
            Message::StopTone(m) => m.encode(),
            Message::SetRinger(m) => m.encode(),
            Message::SetSpeaker(m) => m.encode(),
            Message::ActivateCallPlane(m) => m.encode(),
            Message::CallState(m) => m.encode(),
            Message::SelectSoftKeys(m) => m.encode(),
            Message::CallInfo(m) => m.encode(charset),
            Message::DialedNumber(m) => m.encode(),
            Message::DisplayNotify(m) => m.encode(),
            Message::OpenReceiveChannel(m) => m.encode(),
            Message::CloseReceiveChannel(m) => m.encode(),
            Message::StartMediaTransmission(m) => m.encode(),
            Message::StopMediaTransmission(m) => m.encode(),
            Message::Reset(m) => m.encode(),
            Message::ClearNotify
            | Message::CapabilitiesReq
            | Message::ConfigStatusReq
            | Message::TimeDateReq
            | Message::ButtonTemplateReq
            | Message::SoftKeySetReq
            | Message::SoftKeyTemplateReq
            | Message::RegisterAvailableLines => Vec::new(),
            Message::Unknown { body, .. } => body.clone(),
            other => panic!("message variant {:?} is inbound-only and has no encoder", other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_register() {
        let mut w = Writer::new();
        w.fixed_str(16, "SEP001122334455", Charset::Latin1)
            .u32(1)
            .u32(0)
            .u32(0x0100A8C0)
            .u32(30016)
            .u32(5)
            .u32(0)
            .u8(17);
        let body = w.into_vec();
        let msg = Message::decode(REGISTER_MESSAGE, &body).unwrap();
        match msg {
            Message::Register(r) => {
                assert_eq!(r.name, "SEP001122334455");
                assert_eq!(r.proto_version, 17);
                assert_eq!(r.device_type, 30016);
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn unknown_id_round_trips_opaque_body() {
        let body = vec![1, 2, 3, 4];
        let msg = Message::decode(0xBEEF, &body).unwrap();
        assert_eq!(msg.id(), 0xBEEF);
        assert_eq!(msg.encode(Charset::Latin1), body);
    }

    #[test]
    fn register_ack_encodes_fixed_layout() {
        let ack = RegisterAck {
            keepalive: 30,
            date_template: "M/D/Y".to_string(),
            secondary_keepalive: 30,
            proto_version: 11,
        };
        let body = Message::RegisterAck(ack).encode(Charset::Latin1);
        assert_eq!(body.len(), 4 + 6 + 2 + 4 + 1 + 3);
    }

    #[test]
    fn truncated_body_is_malformed_not_a_panic() {
        let err = Message::decode(OFFHOOK_MESSAGE, &[0u8; 2]).unwrap_err();
        match err {
            Error::Malformed(_) => {}
            other => panic!("expected Malformed, got {:?}", other),
        }
    }
}
