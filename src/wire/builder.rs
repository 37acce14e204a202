//! Builds outbound messages against a device's negotiated protocol
//! version, so call sites never juggle charset selection themselves.

use super::messages::{
    ActivateCallPlane, ButtonDefinition, ButtonTemplateRes, CallInfo, CallState, CloseReceiveChannel,
    ConfigStatusRes, DialedNumber, DisplayNotify, FeatureStat, ForwardStatusRes, LineStatusRes,
    Message, OpenReceiveChannel, Reset, RegisterAck, RegisterRej, SelectSoftKeys, SetLamp, SetRinger,
    SetSpeaker, SoftKeySetDefinition, SoftKeySetRes, SoftKeyTemplateDefinition, SoftKeyTemplateRes,
    SpeedDialStatRes, StartMediaTransmission, StartTone, StopMediaTransmission, StopTone, TimeDateRes,
};
use super::strings::Charset;

pub struct MessageBuilder {
    charset: Charset,
    proto_version: u8,
}

impl MessageBuilder {
    pub fn new(proto_version: u8) -> MessageBuilder {
        MessageBuilder {
            charset: Charset::for_proto_version(proto_version as u16),
            proto_version,
        }
    }

    pub fn charset(&self) -> Charset {
        self.charset
    }

    pub fn register_ack(&self, keepalive: u32, date_template: &str) -> Message {
        Message::RegisterAck(RegisterAck {
            keepalive,
            date_template: date_template.to_string(),
            secondary_keepalive: keepalive,
            proto_version: self.proto_version,
        })
    }

    pub fn register_rej(&self, reason: &str) -> Message {
        Message::RegisterRej(RegisterRej { reason: reason.to_string() })
    }

    pub fn line_status_res(&self, line_number: u32, dir_number: &str, display_name: &str) -> Message {
        Message::LineStatusRes(LineStatusRes {
            line_number,
            dir_number: dir_number.to_string(),
            display_name: display_name.to_string(),
            display_alias: display_name.to_string(),
        })
    }

    pub fn call_info(
        &self,
        line_instance: u32,
        call_instance: u32,
        call_type: u32,
        calling_name: &str,
        calling_number: &str,
        called_name: &str,
        called_number: &str,
    ) -> Message {
        Message::CallInfo(CallInfo {
            calling_party_name: calling_name.to_string(),
            calling_party: calling_number.to_string(),
            called_party_name: called_name.to_string(),
            called_party: called_number.to_string(),
            line_instance,
            call_instance,
            call_type,
        })
    }

    pub fn dialed_number(&self, line_instance: u32, call_instance: u32, digits: &str) -> Message {
        Message::DialedNumber(DialedNumber {
            called_party: digits.to_string(),
            line_instance,
            call_instance,
        })
    }

    pub fn call_state(&self, line_instance: u32, call_reference: u32, call_state: u32, visibility: u32) -> Message {
        Message::CallState(CallState {
            call_state,
            line_instance,
            call_reference,
            visibility,
            priority: 0,
        })
    }

    pub fn select_softkeys(&self, line_instance: u32, call_instance: u32, softkey_set_index: u32) -> Message {
        Message::SelectSoftKeys(SelectSoftKeys { line_instance, call_instance, softkey_set_index })
    }

    pub fn activate_call_plane(&self, line_instance: u32) -> Message {
        Message::ActivateCallPlane(ActivateCallPlane { line_instance })
    }

    pub fn set_lamp(&self, stimulus: u32, line_instance: u32, state: u32) -> Message {
        Message::SetLamp(SetLamp { stimulus, line_instance, state })
    }

    pub fn start_tone(&self, tone: u32, line_instance: u32, call_instance: u32) -> Message {
        Message::StartTone(StartTone { tone, line_instance, call_instance })
    }

    pub fn stop_tone(&self, line_instance: u32, call_instance: u32) -> Message {
        Message::StopTone(StopTone { line_instance, call_instance })
    }

    pub fn set_ringer(&self, mode: u32) -> Message {
        Message::SetRinger(SetRinger { mode })
    }

    pub fn set_speaker(&self, mode: u32) -> Message {
        Message::SetSpeaker(SetSpeaker { mode })
    }

    pub fn display_notify(&self, timeout: u32, text: &str) -> Message {
        Message::DisplayNotify(DisplayNotify { timeout, text: text.to_string() })
    }

    pub fn button_template_res(&self, buttons: Vec<ButtonDefinition>) -> Message {
        Message::ButtonTemplateRes(ButtonTemplateRes { buttons })
    }

    pub fn config_status_res(
        &self,
        device_name: &str,
        station_user_id: u32,
        station_instance: u32,
        number_lines: u32,
        number_speed_dials: u32,
    ) -> Message {
        Message::ConfigStatusRes(ConfigStatusRes {
            device_name: device_name.to_string(),
            station_user_id,
            station_instance,
            user_name: String::new(),
            server_name: "sccp-driver".to_string(),
            number_lines,
            number_speed_dials,
        })
    }

    pub fn time_date_res(&self, t: TimeDateRes) -> Message {
        Message::TimeDateRes(t)
    }

    pub fn speeddial_stat_res(&self, instance: u32, extension: &str, label: &str) -> Message {
        Message::SpeedDialStatRes(SpeedDialStatRes {
            instance,
            extension: extension.to_string(),
            label: label.to_string(),
        })
    }

    pub fn softkey_template_res(&self, keys: Vec<SoftKeyTemplateDefinition>) -> Message {
        Message::SoftKeyTemplateRes(SoftKeyTemplateRes { keys })
    }

    pub fn softkey_set_res(&self, sets: Vec<SoftKeySetDefinition>) -> Message {
        Message::SoftKeySetRes(SoftKeySetRes { sets })
    }

    pub fn feature_stat(&self, instance: u32, feature_type: u32, status: u32, label: &str) -> Message {
        Message::FeatureStat(FeatureStat { instance, feature_type, status, label: label.to_string() })
    }

    pub fn open_receive_channel(
        &self,
        conference_id: u32,
        party_id: u32,
        packets: u32,
        capability: u32,
    ) -> Message {
        Message::OpenReceiveChannel(OpenReceiveChannel {
            conference_id,
            party_id,
            packets,
            capability,
            echo: 0,
            bitrate: 0,
        })
    }

    pub fn close_receive_channel(&self, conference_id: u32, party_id: u32) -> Message {
        Message::CloseReceiveChannel(CloseReceiveChannel { conference_id, party_id })
    }

    pub fn start_media_transmission(
        &self,
        conference_id: u32,
        pass_thru_party_id: u32,
        remote_ip: u32,
        remote_port: u32,
        payload_type: u32,
    ) -> Message {
        Message::StartMediaTransmission(StartMediaTransmission {
            conference_id,
            pass_thru_party_id,
            remote_ip,
            remote_port,
            packet_size: 20,
            payload_type,
        })
    }

    pub fn stop_media_transmission(&self, conference_id: u32, party_id: u32) -> Message {
        Message::StopMediaTransmission(StopMediaTransmission { conference_id, party_id })
    }

    pub fn reset(&self, reset_type: u32) -> Message {
        Message::Reset(Reset { reset_type })
    }

    pub fn forward_status_res(&self, line_instance: u32, cfwd_all: Option<&str>) -> Message {
        let (status, number) = match cfwd_all {
            Some(n) => (1, n.to_string()),
            None => (0, String::new()),
        };
        Message::ForwardStatusRes(ForwardStatusRes {
            status: 0,
            line_instance,
            cfwd_all_status: status,
            cfwd_all_number: number,
            cfwd_busy_status: 0,
            cfwd_busy_number: String::new(),
            cfwd_noanswer_status: 0,
            cfwd_noanswer_number: String::new(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn picks_utf8_charset_for_modern_protocol() {
        let b = MessageBuilder::new(17);
        assert_eq!(b.charset(), Charset::Utf8);
    }

    #[test]
    fn picks_latin1_charset_for_legacy_protocol() {
        let b = MessageBuilder::new(3);
        assert_eq!(b.charset(), Charset::Latin1);
    }

    #[test]
    fn register_ack_carries_requested_protocol_version() {
        let b = MessageBuilder::new(11);
        match b.register_ack(30, "M/D/Y") {
            Message::RegisterAck(ack) => assert_eq!(ack.proto_version, 11),
            other => panic!("unexpected {:?}", other),
        }
    }
}
