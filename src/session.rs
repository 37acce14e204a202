// Copyright 2019 Petar Dambovaliev. All rights reserved.
// This software may be modified and distributed under the terms
// of the BSD license. See the LICENSE file for details.

//! The per-connection session loop: reads frames off the socket,
//! dispatches them to the device state machine, and wakes on whichever
//! comes first among socket readability, a queued command, or a task
//! runner deadline (the auth timer or the keepalive watchdog).
//!
//! `dispatch` and its handlers implement the registration subprotocol
//! and the device/call state machine: offhook/dial, ring/answer, hold
//! and resume, attended transfer, and call-forward-all. Each handler
//! locks the device just long enough to compute the next wire messages,
//! then sends them with the lock released.

use std::io::Write;
use std::net::{Ipv4Addr, SocketAddrV4, TcpStream};
use std::os::unix::io::{AsRawFd, RawFd};
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

use crate::deserializer::{Deserializer, ReadOutcome};
use crate::device::button::{self, ButtonKind};
use crate::device::softkey::{self, SoftKeySet};
use crate::device::{
    CallDirection, CallForwardStatus, CallState, Device, DeviceType, RegistrationState,
};
use crate::error::{Error, Result, TimeoutKind};
use crate::host::Codec;
use crate::queue::CommandQueue;
use crate::runtime::Runtime;
use crate::task::TaskRunner;
use crate::wire::messages::{
    self, CapabilitiesRes, EnblocCall, FeatureStatusReq, ForwardStatusReq, KeypadButton, LineStatusReq,
    Message, OpenReceiveChannelAck, Register, RegisterRej, SoftKeyEvent, SoftKeySetDefinition,
    SoftKeyTemplateDefinition, SpeedDialStatReq, Stimulus, TimeDateRes,
};
use crate::wire::{encode_frame, Charset, MessageBuilder};

pub const AUTH_TIMEOUT: Duration = Duration::from_secs(10);
pub const SEND_TIMEOUT: Duration = Duration::from_secs(10);

const TASK_AUTH: u32 = 1;
const TASK_KEEPALIVE: u32 = 2;

// Skinny protocol tone/ringer/speaker/codec constants. No chrono-style
// crate ships these as named values anywhere in this driver's stack, so
// they're plain numeric constants, same as the rest of the wire layer.
const TONE_DIAL: u32 = 0x21;
const TONE_ALERT: u32 = 0x24;
const RINGER_OFF: u32 = 1;
const RINGER_INSIDE: u32 = 2;
const SPEAKER_ON: u32 = 1;
const SPEAKER_OFF: u32 = 2;
const CAPABILITY_G711U: u32 = 4;

#[derive(Debug, Clone, Eq, PartialEq)]
pub enum SessionCommand {
    Stop,
    Reload,
    /// Operator-issued `sccp reset` (§6.3): tells the device to reset or
    /// restart, then tears this session down.
    Reset(u32),
    /// A host-originated inbound call ringing in on one of this device's
    /// lines. Nothing in this driver's `ChannelTechnology` seam calls
    /// this on its own; a host integration is expected to look the
    /// device up in the registry and `put` this once it wants a line to
    /// start ringing.
    IncomingCall { line_instance: u32, remote_number: String, remote_name: String, channel_id: u64 },
}

/// What the outer loop (the one actually calling `poll`) should do next.
pub enum Step {
    Continue,
    Stop,
}

/// Drives one device connection to completion. Generic over the stream
/// type so tests can swap in an in-memory pipe instead of a real socket.
pub struct Session<S> {
    stream: S,
    deserializer: Deserializer<DupReader>,
    commands: Arc<CommandQueue<SessionCommand>>,
    tasks: TaskRunner,
    charset: Charset,
    registered: bool,
    device_name: Option<String>,
    remote_ip: Option<String>,
}

/// A cheap clone-able reader used only so the deserializer can own a
/// read handle distinct from the writer half used for sends.
struct DupReader(RawFd);

impl std::io::Read for DupReader {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        let n = unsafe { libc::read(self.0, buf.as_mut_ptr() as *mut _, buf.len()) };
        if n < 0 {
            return Err(std::io::Error::last_os_error());
        }
        Ok(n as usize)
    }
}

impl Session<TcpStream> {
    pub fn new(stream: TcpStream, commands: Arc<CommandQueue<SessionCommand>>) -> std::io::Result<Session<TcpStream>> {
        stream.set_nodelay(true)?;
        let fd = stream.as_raw_fd();
        let remote_ip = stream.peer_addr().ok().map(|a| a.ip().to_string());
        Ok(Session {
            stream,
            deserializer: Deserializer::new(DupReader(fd)),
            commands,
            tasks: TaskRunner::new(),
            charset: Charset::Latin1,
            registered: false,
            device_name: None,
            remote_ip,
        })
    }

    fn fd(&self) -> RawFd {
        self.stream.as_raw_fd()
    }

    pub fn send(&mut self, msg: &Message) -> Result<()> {
        let frame = encode_frame(msg, self.charset);
        self.stream.write_all(&frame)?;
        Ok(())
    }

    fn send_all(&mut self, msgs: Vec<Message>) -> Result<()> {
        for msg in &msgs {
            self.send(msg)?;
        }
        Ok(())
    }

    /// Run until the connection closes, the command queue requests a
    /// stop, or an unrecoverable error occurs. Always returns, per the
    /// contract the original session loop is documented with.
    pub fn run(&mut self, runtime: &Runtime) {
        self.tasks.add((TASK_AUTH, 0), AUTH_TIMEOUT);
        loop {
            match self.tick(runtime) {
                Ok(Step::Continue) => continue,
                Ok(Step::Stop) => break,
                Err(e) => {
                    log::warn!("session for {:?} terminating: {}", self.device_name, e);
                    if matches!(e, Error::Panic(_)) {
                        runtime.stats.incr_panics();
                    }
                    break;
                }
            }
        }
        if let Some(name) = &self.device_name {
            runtime.registry.remove(name);
        }
        self.commands.close();
    }

    fn tick(&mut self, runtime: &Runtime) -> Result<Step> {
        let timeout_ms = self.tasks.next_deadline().map(|d| d.as_millis() as i32).unwrap_or(-1);

        let mut fds = [
            libc::pollfd { fd: self.fd(), events: libc::POLLIN, revents: 0 },
            libc::pollfd { fd: self.commands.wake_fd(), events: libc::POLLIN, revents: 0 },
        ];
        let rc = unsafe { libc::poll(fds.as_mut_ptr(), fds.len() as libc::nfds_t, timeout_ms) };
        if rc < 0 {
            return Err(Error::TransportError(std::io::Error::last_os_error()));
        }

        if fds[1].revents & libc::POLLIN != 0 {
            for cmd in self.commands.get_all() {
                match cmd {
                    SessionCommand::Stop => return Ok(Step::Stop),
                    SessionCommand::Reload => self.handle_reload(runtime)?,
                    SessionCommand::Reset(reset_type) => {
                        self.send(&Message::Reset(messages::Reset { reset_type }))?;
                        return Ok(Step::Stop);
                    }
                    SessionCommand::IncomingCall { line_instance, remote_number, remote_name, channel_id } => {
                        self.handle_incoming_call(runtime, line_instance, remote_number, remote_name, channel_id)?
                    }
                }
            }
        }

        if fds[0].revents & libc::POLLIN != 0 {
            match self.deserializer.read()? {
                ReadOutcome::Eof => return Ok(Step::Stop),
                ReadOutcome::Full => {
                    return Err(Error::Malformed("inbound buffer full without a complete frame".to_string()))
                }
                ReadOutcome::Progress => {}
            }
            while let Some(msg) = self.deserializer.pop()? {
                self.dispatch(runtime, msg)?;
            }
        }

        for fired in self.tasks.due() {
            match fired {
                (TASK_AUTH, _) => {
                    if !self.registered {
                        return Err(Error::Timeout(TimeoutKind::Auth));
                    }
                }
                (TASK_KEEPALIVE, _) => return Err(Error::Timeout(TimeoutKind::Keepalive)),
                _ => {}
            }
        }

        Ok(Step::Continue)
    }

    fn handle_reload(&mut self, _runtime: &Runtime) -> Result<()> {
        log::info!("session for {:?} reloading configuration", self.device_name);
        Ok(())
    }

    /// Lock this session's registered device, run `f` against it, and
    /// return its result. `None` means either this session hasn't
    /// registered yet or the registry entry is gone (e.g. reset just
    /// tore it down from under us).
    fn with_device<R>(&self, runtime: &Runtime, f: impl FnOnce(&mut Device) -> R) -> Option<R> {
        let name = self.device_name.as_ref()?;
        let device = runtime.registry.find(name)?;
        let mut device = device.lock().unwrap();
        Some(f(&mut device))
    }

    fn dispatch(&mut self, runtime: &Runtime, msg: Message) -> Result<()> {
        if let Some(name) = &self.device_name {
            if runtime.debug_enabled_for(name, self.remote_ip.as_deref()) {
                log::trace!("{}: <- {:?}", name, msg);
            }
        }
        match msg {
            Message::Register(reg) => self.handle_register(runtime, reg),
            Message::KeepAlive => {
                self.send(&Message::KeepAliveAck)?;
                Ok(())
            }
            Message::IpPort(m) => self.handle_ip_port(runtime, m),
            Message::CapabilitiesRes(m) => self.handle_capabilities_res(runtime, m),
            Message::ButtonTemplateReq => self.handle_button_template_req(runtime),
            Message::LineStatusReq(m) => self.handle_line_status_req(runtime, m),
            Message::ConfigStatusReq => self.handle_config_status_req(runtime),
            Message::TimeDateReq => self.handle_time_date_req(runtime),
            Message::SpeedDialStatReq(m) => self.handle_speeddial_stat_req(runtime, m),
            Message::SoftKeyTemplateReq => self.handle_softkey_template_req(runtime),
            Message::SoftKeySetReq => self.handle_softkey_set_req(runtime),
            Message::ForwardStatusReq(m) => self.handle_forward_status_req(runtime, m),
            Message::FeatureStatusReq(m) => self.handle_feature_status_req(runtime, m),
            Message::RegisterAvailableLines => {
                log::debug!("{:?}: register available lines", self.device_name);
                Ok(())
            }
            Message::Offhook(m) => self.handle_offhook(runtime, m.line_instance),
            Message::Onhook(m) => self.handle_onhook(runtime, m.line_instance),
            Message::KeypadButton(m) => self.handle_keypad_button(runtime, m),
            Message::EnblocCall(m) => self.handle_enbloc_call(runtime, m),
            Message::Stimulus(m) => self.handle_stimulus(runtime, m),
            Message::SoftKeyEvent(m) => self.handle_softkey_event(runtime, m),
            Message::OpenReceiveChannelAck(m) => self.handle_open_receive_channel_ack(runtime, m),
            Message::Alarm(a) => {
                log::warn!("{:?}: device alarm: {}", self.device_name, a.display_message.trim());
                Ok(())
            }
            Message::ClearNotify => Ok(()),
            Message::Unknown { id, .. } => {
                log::debug!("unhandled message id {:#06x}, ignoring", id);
                Ok(())
            }
            other => {
                log::debug!("message {:?} not acted on by this driver", other.id());
                Ok(())
            }
        }
    }

    fn handle_register(&mut self, runtime: &Runtime, reg: Register) -> Result<()> {
        self.charset = Charset::for_proto_version(reg.proto_version as u16);
        let config = runtime.config.current();

        let is_guest = !config.devices.contains_key(&reg.name);
        let device_cfg = match config.device(&reg.name) {
            Some(c) => c.clone(),
            None => {
                runtime.stats.registrations_rejected.fetch_add(1, Ordering::Relaxed);
                self.send(&Message::RegisterRej(RegisterRej { reason: "unknown device".to_string() }))?;
                return Ok(());
            }
        };

        let device_type = match DeviceType::from_code(reg.device_type) {
            Some(t) => t,
            None => {
                self.send(&Message::RegisterRej(RegisterRej { reason: "unsupported device type".to_string() }))?;
                return Ok(());
            }
        };

        let mut device = Device::new(&reg.name, device_type, &device_cfg);
        device.proto_version = reg.proto_version;
        device.state = RegistrationState::Registered;
        device.is_guest = is_guest;
        device.ip = Some(Ipv4Addr::from(reg.ip.to_le_bytes()));
        device.commands = Some(self.commands.clone());

        if let Err(reason) = runtime.registry.add(device) {
            self.send(&Message::RegisterRej(RegisterRej { reason: reason.to_string() }))?;
            return Ok(());
        }

        self.registered = true;
        self.device_name = Some(reg.name.clone());
        self.tasks.remove((TASK_AUTH, 0));
        self.tasks.add((TASK_KEEPALIVE, 0), Duration::from_secs((device_cfg.keepalive * 2) as u64));

        let builder = MessageBuilder::new(reg.proto_version);
        self.send(&builder.register_ack(device_cfg.keepalive, &config.general.dateformat))?;
        self.send(&Message::CapabilitiesReq)
    }

    fn handle_ip_port(&mut self, runtime: &Runtime, m: messages::IpPort) -> Result<()> {
        self.with_device(runtime, |d| {
            if let Some(ip) = d.ip {
                d.remote = Some(SocketAddrV4::new(ip, m.station_ip_port as u16));
            }
        });
        Ok(())
    }

    fn handle_capabilities_res(&mut self, runtime: &Runtime, m: CapabilitiesRes) -> Result<()> {
        self.with_device(runtime, move |d| d.capabilities = m.caps);
        Ok(())
    }

    fn handle_button_template_req(&mut self, runtime: &Runtime) -> Result<()> {
        let out = self.with_device(runtime, |d| {
            let slots = d.device_type.button_count();
            let buttons = button::build_template(d.lines.len(), d.speeddials.len(), slots);
            let wire_buttons: Vec<messages::ButtonDefinition> = buttons
                .iter()
                .map(|b| messages::ButtonDefinition { line_instance: b.line_instance, button_definition: b.kind.stimulus_code() })
                .collect();
            d.builder().button_template_res(wire_buttons)
        });
        if let Some(msg) = out {
            self.send(&msg)?;
        }
        Ok(())
    }

    fn handle_line_status_req(&mut self, runtime: &Runtime, req: LineStatusReq) -> Result<()> {
        let out = self
            .with_device(runtime, |d| {
                let builder = d.builder();
                d.line(req.line_instance).map(|l| builder.line_status_res(l.instance, &l.cid_num, &l.cid_name))
            })
            .flatten();
        if let Some(msg) = out {
            self.send(&msg)?;
        }
        Ok(())
    }

    fn handle_config_status_req(&mut self, runtime: &Runtime) -> Result<()> {
        let out = self.with_device(runtime, |d| {
            let builder = d.builder();
            builder.config_status_res(&d.name, 0, 0, d.lines.len() as u32, d.speeddials.len() as u32)
        });
        if let Some(msg) = out {
            self.send(&msg)?;
        }
        Ok(())
    }

    fn handle_time_date_req(&mut self, runtime: &Runtime) -> Result<()> {
        let now = std::time::SystemTime::now().duration_since(std::time::UNIX_EPOCH).unwrap_or_default();
        let secs = now.as_secs();
        let (year, month, day, weekday) = civil_from_unix(secs as i64);
        let t = TimeDateRes {
            year,
            month,
            day_of_week: weekday,
            day,
            hour: ((secs / 3600) % 24) as u32,
            minute: ((secs / 60) % 60) as u32,
            seconds: (secs % 60) as u32,
            milliseconds: 0,
            system_time: secs as u32,
        };
        let out = self.with_device(runtime, move |d| d.builder().time_date_res(t));
        if let Some(msg) = out {
            self.send(&msg)?;
        }
        Ok(())
    }

    fn handle_speeddial_stat_req(&mut self, runtime: &Runtime, req: SpeedDialStatReq) -> Result<()> {
        let out = self
            .with_device(runtime, |d| {
                let builder = d.builder();
                d.speeddials
                    .iter()
                    .find(|s| s.instance == req.instance)
                    .map(|s| builder.speeddial_stat_res(s.instance, &s.extension, &s.label))
            })
            .flatten();
        if let Some(msg) = out {
            self.send(&msg)?;
        }
        Ok(())
    }

    fn handle_softkey_template_req(&mut self, runtime: &Runtime) -> Result<()> {
        let keys: Vec<SoftKeyTemplateDefinition> = softkey::TEMPLATE
            .iter()
            .map(|&(event, label)| SoftKeyTemplateDefinition { label: label.to_string(), event: event as u32 })
            .collect();
        let out = self.with_device(runtime, move |d| d.builder().softkey_template_res(keys));
        if let Some(msg) = out {
            self.send(&msg)?;
        }
        Ok(())
    }

    fn handle_softkey_set_req(&mut self, runtime: &Runtime) -> Result<()> {
        let sets: Vec<SoftKeySetDefinition> = SoftKeySet::ALL
            .iter()
            .map(|set| SoftKeySetDefinition { template_index: softkey::template_indices(set.default_keys()), info_index: [0u16; 16] })
            .collect();
        let out = self.with_device(runtime, move |d| d.builder().softkey_set_res(sets));
        if let Some(msg) = out {
            self.send(&msg)?;
        }
        Ok(())
    }

    fn handle_forward_status_req(&mut self, runtime: &Runtime, req: ForwardStatusReq) -> Result<()> {
        let out = self.with_device(runtime, |d| {
            let builder = d.builder();
            let cfwd = d.line(req.line_instance).and_then(|l| {
                if l.callfwd == CallForwardStatus::Active {
                    Some(l.callfwd_exten.clone())
                } else {
                    None
                }
            });
            builder.forward_status_res(req.line_instance, cfwd.as_deref())
        });
        if let Some(msg) = out {
            self.send(&msg)?;
        }
        Ok(())
    }

    fn handle_feature_status_req(&mut self, runtime: &Runtime, req: FeatureStatusReq) -> Result<()> {
        let out = self.with_device(runtime, |d| d.builder().feature_stat(req.instance, 0, 0, ""));
        if let Some(msg) = out {
            self.send(&msg)?;
        }
        Ok(())
    }

    fn handle_offhook(&mut self, runtime: &Runtime, line_instance: u32) -> Result<()> {
        let plan = self
            .with_device(runtime, |d| {
                let ringing = {
                    let line = d.line_mut(line_instance)?;
                    line.next_ringin_subchannel().map(|s| (s.id, s.channel_id))
                };
                match ringing {
                    Some((call_id, channel_id)) => {
                        let msgs = connect_subchannel(d, line_instance, call_id);
                        Some((msgs, channel_id))
                    }
                    None => {
                        let line = d.line_mut(line_instance)?;
                        let call_id = line.new_subchannel(CallDirection::Outgoing);
                        d.dialing_line_instance = Some(line_instance);
                        d.dial_buffer.clear();
                        let builder = d.builder();
                        let msgs = vec![
                            builder.call_state(line_instance, call_id, CallState::Offhook.wire_code(), 2),
                            builder.start_tone(TONE_DIAL, line_instance, call_id),
                            builder.select_softkeys(line_instance, call_id, SoftKeySet::OffHook.index()),
                            builder.activate_call_plane(line_instance),
                            builder.set_speaker(SPEAKER_ON),
                        ];
                        Some((msgs, None))
                    }
                }
            })
            .flatten();

        if let Some((msgs, channel_id)) = plan {
            self.send_all(msgs)?;
            if let (Some(host), Some(cid)) = (&runtime.host, channel_id) {
                let _ = host.answer(cid);
            }
        }
        Ok(())
    }

    fn handle_onhook(&mut self, runtime: &Runtime, line_instance: u32) -> Result<()> {
        let fwd_active = self.with_device(runtime, |d| d.fwd_line_instance == Some(line_instance)).unwrap_or(false);
        if fwd_active {
            return self.finish_call_forward(runtime, line_instance);
        }

        let plan = self
            .with_device(runtime, |d| {
                let builder = d.builder();
                let line = d.line_mut(line_instance)?;
                let call_id = line.active_subchannel().map(|s| s.id)?;
                let channel_id = line.subchannel(call_id).and_then(|s| s.channel_id);
                line.remove_subchannel(call_id);
                if d.dialing_line_instance == Some(line_instance) {
                    d.dialing_line_instance = None;
                    d.dial_buffer.clear();
                }
                let msgs = vec![
                    builder.call_state(line_instance, call_id, CallState::Onhook.wire_code(), 2),
                    builder.select_softkeys(line_instance, 0, SoftKeySet::OnHook.index()),
                    builder.stop_tone(line_instance, call_id),
                    builder.set_speaker(SPEAKER_OFF),
                    builder.close_receive_channel(call_id, call_id),
                    builder.stop_media_transmission(call_id, call_id),
                ];
                Some((msgs, channel_id))
            })
            .flatten();

        if let Some((msgs, channel_id)) = plan {
            self.send_all(msgs)?;
            if let (Some(host), Some(cid)) = (&runtime.host, channel_id) {
                let _ = host.hangup(cid);
            }
        }
        Ok(())
    }

    fn handle_keypad_button(&mut self, runtime: &Runtime, m: KeypadButton) -> Result<()> {
        let digit = digit_char(m.button);
        let fwd_active = self.with_device(runtime, |d| d.fwd_line_instance == Some(m.line_instance)).unwrap_or(false);
        if fwd_active {
            self.with_device(runtime, |d| d.fwd_buffer.push(digit));
            return Ok(());
        }
        let dialing = self.with_device(runtime, |d| d.dialing_line_instance == Some(m.line_instance)).unwrap_or(false);
        if dialing {
            self.collect_dial_digit(runtime, m.line_instance, digit)
        } else {
            Ok(())
        }
    }

    fn collect_dial_digit(&mut self, runtime: &Runtime, line_instance: u32, digit: char) -> Result<()> {
        let device_name = match &self.device_name {
            Some(n) => n.clone(),
            None => return Ok(()),
        };

        let result = self
            .with_device(runtime, |d| {
                let builder = d.builder();
                let line = d.line_mut(line_instance)?;
                let call_id = line.active_subchannel().map(|s| s.id)?;
                d.dial_buffer.push(digit);
                let digits = d.dial_buffer.clone();
                let msgs = vec![builder.stop_tone(line_instance, call_id), builder.dialed_number(line_instance, call_id, &digits)];
                Some((call_id, digits, msgs))
            })
            .flatten();

        let (call_id, digits, msgs) = match result {
            Some(v) => v,
            None => return Ok(()),
        };
        self.send_all(msgs)?;

        let exists = runtime.host.as_ref().map(|h| h.exists_extension(&device_name, &digits)).unwrap_or(false);
        let matchmore = runtime.host.as_ref().map(|h| h.matchmore_extension(&device_name, &digits)).unwrap_or(false);
        if exists && !matchmore {
            self.place_call(runtime, &device_name, line_instance, call_id, &digits)?;
        }
        Ok(())
    }

    fn handle_enbloc_call(&mut self, runtime: &Runtime, m: EnblocCall) -> Result<()> {
        let device_name = match &self.device_name {
            Some(n) => n.clone(),
            None => return Ok(()),
        };
        let digits = m.extension.trim_end_matches('\0').trim().to_string();
        if digits.is_empty() {
            return Ok(());
        }
        let line_instance = match self.with_device(runtime, |d| d.default_line_instance) {
            Some(l) => l,
            None => return Ok(()),
        };
        let call_id = self
            .with_device(runtime, |d| {
                let digits = digits.clone();
                let line = d.line_mut(line_instance)?;
                let id = line.new_subchannel(CallDirection::Outgoing);
                if let Some(sub) = line.subchannel_mut(id) {
                    sub.remote_number = digits.clone();
                }
                d.dialing_line_instance = Some(line_instance);
                d.dial_buffer = digits;
                Some(id)
            })
            .flatten();
        let call_id = match call_id {
            Some(id) => id,
            None => return Ok(()),
        };
        self.place_call(runtime, &device_name, line_instance, call_id, &digits)
    }

    /// Hand a fully-dialed extension to the host: request a channel, send
    /// ringback, start the dialplan, and (since this trait has no
    /// asynchronous far-end-answer callback into the driver) connect the
    /// call once the dialplan accepts it.
    fn place_call(&mut self, runtime: &Runtime, device_name: &str, line_instance: u32, call_id: u32, digits: &str) -> Result<()> {
        let host = match &runtime.host {
            Some(h) => h.clone(),
            None => return Ok(()),
        };
        let channel_id = match host.requester(device_name, digits) {
            Ok(id) => id,
            Err(_) => return Ok(()),
        };

        let digits = digits.to_string();
        let msgs = self.with_device(runtime, |d| {
            if let Some(line) = d.line_mut(line_instance) {
                if let Some(sub) = line.subchannel_mut(call_id) {
                    sub.channel_id = Some(channel_id);
                    sub.remote_number = digits;
                    sub.state = CallState::RingOut;
                }
            }
            let builder = d.builder();
            vec![
                builder.call_state(line_instance, call_id, CallState::RingOut.wire_code(), 2),
                builder.select_softkeys(line_instance, call_id, SoftKeySet::ConnInTransfer.index()),
                builder.start_tone(TONE_ALERT, line_instance, call_id),
            ]
        });
        if let Some(msgs) = msgs {
            self.send_all(msgs)?;
        }

        if host.pbx_start(channel_id).is_ok() {
            let connect_msgs = self.with_device(runtime, |d| connect_subchannel(d, line_instance, call_id));
            if let Some(msgs) = connect_msgs {
                self.send_all(msgs)?;
            }
            let _ = host.answer(channel_id);
        }
        Ok(())
    }

    fn handle_stimulus(&mut self, runtime: &Runtime, m: Stimulus) -> Result<()> {
        let stimulus = m.stimulus as u8;
        if stimulus == ButtonKind::SpeedDial.stimulus_code() {
            self.handle_speeddial_stimulus(runtime, m.line_instance)
        } else if stimulus == ButtonKind::Hold.stimulus_code() {
            self.toggle_hold(runtime, m.line_instance)
        } else if stimulus == ButtonKind::ForwardAll.stimulus_code() {
            self.begin_call_forward(runtime, m.line_instance)
        } else {
            Ok(())
        }
    }

    fn handle_speeddial_stimulus(&mut self, runtime: &Runtime, instance: u32) -> Result<()> {
        let device_name = match &self.device_name {
            Some(n) => n.clone(),
            None => return Ok(()),
        };
        let extension = self
            .with_device(runtime, |d| d.speeddials.iter().find(|s| s.instance == instance).map(|s| s.extension.clone()))
            .flatten();
        let extension = match extension {
            Some(e) => e,
            None => return Ok(()),
        };
        let line_instance = match self.with_device(runtime, |d| d.default_line_instance) {
            Some(l) => l,
            None => return Ok(()),
        };
        let call_id = self
            .with_device(runtime, |d| {
                let extension = extension.clone();
                let line = d.line_mut(line_instance)?;
                let id = line.new_subchannel(CallDirection::Outgoing);
                d.dialing_line_instance = Some(line_instance);
                d.dial_buffer = extension;
                Some(id)
            })
            .flatten();
        let call_id = match call_id {
            Some(id) => id,
            None => return Ok(()),
        };
        self.place_call(runtime, &device_name, line_instance, call_id, &extension)
    }

    fn toggle_hold(&mut self, runtime: &Runtime, line_instance: u32) -> Result<()> {
        let plan = self
            .with_device(runtime, |d| {
                let builder = d.builder();
                let line = d.line_mut(line_instance)?;
                let call_id = line.active_subchannel().map(|s| s.id)?;
                let sub = line.subchannel_mut(call_id)?;
                let going_on_hold = !sub.on_hold;
                sub.set_hold(going_on_hold);
                let state_code = sub.state.wire_code();
                let set = if going_on_hold { SoftKeySet::OnHold } else { SoftKeySet::Connected };
                let mut msgs = vec![
                    builder.call_state(line_instance, call_id, state_code, 2),
                    builder.select_softkeys(line_instance, call_id, set.index()),
                ];
                if going_on_hold {
                    msgs.push(builder.close_receive_channel(call_id, call_id));
                }
                Some((msgs, going_on_hold, call_id))
            })
            .flatten();

        if let Some((msgs, going_on_hold, call_id)) = plan {
            self.send_all(msgs)?;
            if !going_on_hold {
                let resume_msg = self.with_device(runtime, |d| {
                    if let Some(line) = d.line_mut(line_instance) {
                        if let Some(sub) = line.subchannel_mut(call_id) {
                            sub.open_receive_pending = true;
                        }
                    }
                    d.builder().open_receive_channel(call_id, call_id, 20, CAPABILITY_G711U)
                });
                if let Some(msg) = resume_msg {
                    self.send(&msg)?;
                }
            }
        }
        Ok(())
    }

    fn begin_call_forward(&mut self, runtime: &Runtime, line_instance: u32) -> Result<()> {
        let msgs = self.with_device(runtime, |d| {
            if let Some(line) = d.line_mut(line_instance) {
                line.callfwd = CallForwardStatus::InputExten;
            }
            d.fwd_line_instance = Some(line_instance);
            d.fwd_buffer.clear();
            let builder = d.builder();
            vec![
                builder.select_softkeys(line_instance, 0, SoftKeySet::CallForward.index()),
                builder.display_notify(10, "Enter forward-to number"),
            ]
        });
        if let Some(msgs) = msgs {
            self.send_all(msgs)?;
        }
        Ok(())
    }

    fn finish_call_forward(&mut self, runtime: &Runtime, line_instance: u32) -> Result<()> {
        let plan = self.with_device(runtime, |d| {
            let dest = d.fwd_buffer.clone();
            d.fwd_line_instance = None;
            d.fwd_buffer.clear();
            let builder = d.builder();
            if let Some(line) = d.line_mut(line_instance) {
                if dest.is_empty() {
                    line.callfwd = CallForwardStatus::Inactive;
                    line.callfwd_exten.clear();
                } else {
                    line.callfwd = CallForwardStatus::Active;
                    line.callfwd_exten = dest.clone();
                }
            }
            let cfwd_all = if dest.is_empty() { None } else { Some(dest.as_str()) };
            vec![
                builder.forward_status_res(line_instance, cfwd_all),
                builder.select_softkeys(line_instance, 0, SoftKeySet::OnHook.index()),
            ]
        });
        if let Some(msgs) = plan {
            self.send_all(msgs)?;
        }
        Ok(())
    }

    /// Attended transfer: the first `Transfer` press holds the active
    /// call and opens a new leg to dial the transfer target; the second
    /// press (once that second leg exists) joins the two legs.
    fn begin_transfer(&mut self, runtime: &Runtime, line_instance: u32) -> Result<()> {
        let state = self
            .with_device(runtime, |d| {
                let line = d.line_mut(line_instance)?;
                let active_id = line.active_subchannel().map(|s| s.id)?;
                let other_waiting = line.subchannels.iter().any(|s| s.id != active_id);
                Some((active_id, other_waiting))
            })
            .flatten();
        let (active_id, other_waiting) = match state {
            Some(v) => v,
            None => return Ok(()),
        };

        let msgs = if other_waiting {
            self.with_device(runtime, |d| {
                let builder = d.builder();
                let line = d.line_mut(line_instance)?;
                let other_id = line.subchannels.iter().find(|s| s.id != active_id).map(|s| s.id)?;
                if let Some(s) = line.subchannel_mut(active_id) {
                    s.related = Some(other_id);
                }
                if let Some(s) = line.subchannel_mut(other_id) {
                    s.related = Some(active_id);
                }
                line.remove_subchannel(active_id);
                line.remove_subchannel(other_id);
                Some(vec![
                    builder.call_state(line_instance, active_id, CallState::Onhook.wire_code(), 2),
                    builder.select_softkeys(line_instance, 0, SoftKeySet::OnHook.index()),
                ])
            })
        } else {
            self.with_device(runtime, |d| {
                let line = d.line_mut(line_instance)?;
                if let Some(s) = line.subchannel_mut(active_id) {
                    s.set_hold(true);
                }
                let new_id = line.new_subchannel(CallDirection::Outgoing);
                d.dialing_line_instance = Some(line_instance);
                d.dial_buffer.clear();
                let builder = d.builder();
                Some(vec![
                    builder.call_state(line_instance, active_id, CallState::Hold.wire_code(), 2),
                    builder.call_state(line_instance, new_id, CallState::Offhook.wire_code(), 2),
                    builder.select_softkeys(line_instance, new_id, SoftKeySet::ConnInTransfer.index()),
                    builder.start_tone(TONE_DIAL, line_instance, new_id),
                ])
            })
        }
        .flatten();

        if let Some(msgs) = msgs {
            self.send_all(msgs)?;
        }
        Ok(())
    }

    fn handle_softkey_event(&mut self, runtime: &Runtime, m: SoftKeyEvent) -> Result<()> {
        match m.event {
            0x03 | 0x0A => self.toggle_hold(runtime, m.line_instance),
            0x09 => self.handle_onhook(runtime, m.line_instance),
            0x0B => self.handle_offhook(runtime, m.line_instance),
            0x05 => self.begin_call_forward(runtime, m.line_instance),
            0x04 => self.begin_transfer(runtime, m.line_instance),
            _ => Ok(()),
        }
    }

    fn handle_open_receive_channel_ack(&mut self, runtime: &Runtime, m: OpenReceiveChannelAck) -> Result<()> {
        let call_id = m.pass_thru_id;
        let plan = self
            .with_device(runtime, |d| {
                let line_instance = d.line_for_subchannel(call_id)?;
                let channel_id = d.line(line_instance).and_then(|l| l.subchannel(call_id)).and_then(|s| s.channel_id);
                let pending = d
                    .line_mut(line_instance)
                    .and_then(|l| l.subchannel_mut(call_id))
                    .map(|s| {
                        let was_pending = s.open_receive_pending;
                        s.open_receive_pending = false;
                        was_pending
                    })
                    .unwrap_or(false);
                if !pending {
                    return None;
                }
                Some(channel_id)
            })
            .flatten();
        let channel_id = match plan {
            Some(c) => c,
            None => return Ok(()),
        };

        let device_ip = Ipv4Addr::from(m.ip_addr.to_le_bytes());
        let remote = match (&runtime.host, channel_id) {
            (Some(host), Some(cid)) => {
                let remote = host.rtp_glue(cid).unwrap_or_else(|_| SocketAddrV4::new(device_ip, m.port as u16));
                let _ = host.call(cid, remote, Codec { payload_type: CAPABILITY_G711U, packet_size: 20 });
                remote
            }
            _ => SocketAddrV4::new(device_ip, m.port as u16),
        };

        let remote_ip = u32::from_le_bytes(remote.ip().octets());
        let remote_port = remote.port() as u32;
        let msg = self.with_device(runtime, move |d| {
            d.builder().start_media_transmission(call_id, call_id, remote_ip, remote_port, CAPABILITY_G711U)
        });
        if let Some(msg) = msg {
            self.send(&msg)?;
        }
        Ok(())
    }

    fn handle_incoming_call(
        &mut self,
        runtime: &Runtime,
        line_instance: u32,
        remote_number: String,
        remote_name: String,
        channel_id: u64,
    ) -> Result<()> {
        let plan = self
            .with_device(runtime, |d| {
                let device_name = d.name.clone();
                let builder = d.builder();
                let line = d.line_mut(line_instance)?;
                let call_id = line.new_subchannel(CallDirection::Incoming);
                let cid_num = line.cid_num.clone();
                if let Some(sub) = line.subchannel_mut(call_id) {
                    sub.state = CallState::RingIn;
                    sub.remote_number = remote_number.clone();
                    sub.remote_name = remote_name.clone();
                    sub.channel_id = Some(channel_id);
                }
                Some(vec![
                    builder.call_info(line_instance, call_id, 2, &remote_name, &remote_number, &device_name, &cid_num),
                    builder.call_state(line_instance, call_id, CallState::RingIn.wire_code(), 2),
                    builder.select_softkeys(line_instance, call_id, SoftKeySet::RingIn.index()),
                    builder.set_ringer(RINGER_INSIDE),
                ])
            })
            .flatten();
        if let Some(msgs) = plan {
            self.send_all(msgs)?;
        }
        Ok(())
    }
}

/// Transition a subchannel into `Connected` and (re-)negotiate its RTP
/// receive channel, guarding against sending a second
/// `OPEN_RECEIVE_CHANNEL` while one is already outstanding.
fn connect_subchannel(d: &mut Device, line_instance: u32, call_id: u32) -> Vec<Message> {
    let builder = d.builder();
    let mut msgs = Vec::new();

    let already_pending = if let Some(line) = d.line_mut(line_instance) {
        if let Some(sub) = line.subchannel_mut(call_id) {
            sub.state = CallState::Connected;
            let pending = sub.open_receive_pending;
            if !pending {
                sub.open_receive_pending = true;
            }
            line.select_subchannel(call_id);
            pending
        } else {
            true
        }
    } else {
        true
    };

    msgs.push(builder.call_state(line_instance, call_id, CallState::Connected.wire_code(), 2));
    msgs.push(builder.select_softkeys(line_instance, call_id, SoftKeySet::Connected.index()));
    msgs.push(builder.set_ringer(RINGER_OFF));
    msgs.push(builder.set_speaker(SPEAKER_ON));
    msgs.push(builder.activate_call_plane(line_instance));
    if !already_pending {
        msgs.push(builder.open_receive_channel(call_id, call_id, 20, CAPABILITY_G711U));
    }
    msgs
}

/// Skinny keypad button codes: 0-9, then `*` (14) and `#` (15).
fn digit_char(button: u32) -> char {
    match button {
        0..=9 => (b'0' + button as u8) as char,
        14 => '*',
        15 => '#',
        _ => '?',
    }
}

/// Civil (year/month/day) date and 1=Sunday..7=Saturday weekday for a
/// Unix timestamp, via Howard Hinnant's `civil_from_days` algorithm.
/// No date/time crate appears anywhere in this driver's dependency
/// stack, so this is a small self-contained routine rather than a new
/// external dependency for one field of one response message.
fn civil_from_unix(unix_secs: i64) -> (u32, u32, u32, u32) {
    let days = unix_secs.div_euclid(86_400);
    let z = days + 719_468;
    let era = z.div_euclid(146_097);
    let doe = z - era * 146_097;
    let yoe = (doe - doe / 1460 + doe / 36524 - doe / 146096) / 365;
    let y = yoe + era * 400;
    let doy = doe - (365 * yoe + yoe / 4 - yoe / 100);
    let mp = (5 * doy + 2) / 153;
    let day = (doy - (153 * mp + 2) / 5 + 1) as u32;
    let month = (if mp < 10 { mp + 3 } else { mp - 9 }) as u32;
    let year = (if month <= 2 { y + 1 } else { y }) as u32;
    let weekday = (((days % 7 + 7) % 7 + 4) % 7 + 1) as u32;
    (year, month, day, weekday)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn auth_and_keepalive_tasks_use_distinct_ids() {
        assert_ne!(TASK_AUTH, TASK_KEEPALIVE);
    }

    #[test]
    fn digit_char_maps_star_and_pound() {
        assert_eq!(digit_char(3), '3');
        assert_eq!(digit_char(14), '*');
        assert_eq!(digit_char(15), '#');
    }

    #[test]
    fn civil_from_unix_epoch_is_jan_1_1970_thursday() {
        let (year, month, day, weekday) = civil_from_unix(0);
        assert_eq!((year, month, day), (1970, 1, 1));
        assert_eq!(weekday, 5); // 1=Sunday..7=Saturday, so 5 is Thursday.
    }

    #[test]
    fn civil_from_unix_handles_a_later_known_date() {
        // 2024-03-01T00:00:00Z, a leap-year edge.
        let (year, month, day, _) = civil_from_unix(1_709_251_200);
        assert_eq!((year, month, day), (2024, 3, 1));
    }
}
