//! Amplifier -- the poll/command engine for one Devialet Expert.
//!
//! This module ties the protocol codec ([`devimote_protocol`]) to a
//! [`DatagramTransport`]. It owns everything that outlives a single packet:
//! the last status snapshot, the accumulated channel list, the command
//! sequence counter, and the power-on grace timer.
//!
//! All mutating operations take `&mut self`. To drive one amplifier from
//! several tasks, wrap it in a `tokio::sync::Mutex`.

use std::net::SocketAddr;
use std::time::Duration;

use tokio::sync::broadcast;
use tokio::time::Instant;
use tracing::{debug, trace, warn};

use devimote_core::error::{Error, Result};
use devimote_core::events::AmpEvent;
use devimote_core::helpers::register_to_db;
use devimote_core::transport::DatagramTransport;
use devimote_core::types::{ChannelList, DeviceStatus, PowerState};
use devimote_protocol::commands::{Command, SequenceCounter, encode_command};
use devimote_protocol::status::{STATUS_PACKET_LEN, decode_status};

/// A remote-controlled amplifier.
///
/// Constructed via [`AmplifierBuilder`](crate::builder::AmplifierBuilder).
///
/// Commands are only transmitted once a poll has seen a status reply; before
/// that, or after a poll times out, they are dropped and the `send_*`
/// methods return `Ok(false)`.
pub struct Amplifier {
    transport: Box<dyn DatagramTransport>,
    status: DeviceStatus,
    last_trusted: Option<DeviceStatus>,
    channels: ChannelList,
    sequence: SequenceCounter,
    command_port: u16,
    receive_timeout: Duration,
    repeat_count: usize,
    boot_grace: Duration,
    booting_until: Option<Instant>,
    event_tx: broadcast::Sender<AmpEvent>,
}

impl Amplifier {
    /// Create a new `Amplifier` from its constituent parts.
    ///
    /// Called by [`AmplifierBuilder`](crate::builder::AmplifierBuilder);
    /// callers should use the builder API instead.
    pub(crate) fn new(
        transport: Box<dyn DatagramTransport>,
        command_port: u16,
        receive_timeout: Duration,
        repeat_count: usize,
        boot_grace: Duration,
        event_capacity: usize,
    ) -> Self {
        let (event_tx, _) = broadcast::channel(event_capacity);
        Amplifier {
            transport,
            status: DeviceStatus::default(),
            last_trusted: None,
            channels: ChannelList::new(),
            sequence: SequenceCounter::new(),
            command_port,
            receive_timeout,
            repeat_count,
            boot_grace,
            booting_until: None,
            event_tx,
        }
    }

    /// Wait for one status datagram and return the updated snapshot.
    ///
    /// A receive timeout is not an error: the returned snapshot has
    /// `connected == false` and otherwise repeats the previous values. A
    /// checksum failure is reported through `checksum_ok`.
    ///
    /// # Errors
    ///
    /// [`Error::MalformedPayload`] when the reply cannot be decoded (the
    /// cached status is left untouched), or [`Error::Io`] on socket failure.
    pub async fn poll(&mut self) -> Result<DeviceStatus> {
        let mut buf = [0u8; STATUS_PACKET_LEN];
        let received = self
            .transport
            .recv_from(&mut buf, self.receive_timeout)
            .await;

        match received {
            Ok((n, from)) => {
                let decoded = decode_status(&buf[..n], from.ip()).map_err(|e| {
                    warn!(sender = %from, error = %e, "Discarding undecodable status packet");
                    e
                })?;
                self.accept(decoded);
            }
            Err(Error::Timeout) => {
                if self.status.connected {
                    debug!("Amplifier stopped answering");
                    self.emit(AmpEvent::Disconnected);
                }
                self.status.connected = false;
            }
            Err(e) => return Err(e),
        }

        Ok(self.status.clone())
    }

    /// Fold a freshly decoded snapshot into the engine state.
    fn accept(&mut self, mut fresh: DeviceStatus) {
        if !self.status.connected {
            debug!(
                device = %fresh.device_name,
                address = ?fresh.source_address,
                "Amplifier answering"
            );
            self.emit(AmpEvent::Connected);
        }

        if fresh.checksum_ok {
            self.channels.merge(&fresh.channel_list);
        } else {
            warn!(address = ?fresh.source_address, "Status packet failed checksum");
            self.emit(AmpEvent::ChecksumMismatch);
        }
        fresh.channel_list = self.channels.clone();

        if fresh.checksum_ok {
            if let Some(previous) = &self.last_trusted {
                for event in diff(previous, &fresh) {
                    self.emit(event);
                }
            }
            if fresh.powered {
                self.booting_until = None;
            }
            self.last_trusted = Some(fresh.clone());
        }

        trace!(
            powered = fresh.powered,
            muted = fresh.muted,
            channel = fresh.active_channel,
            volume = fresh.volume_register,
            checksum_ok = fresh.checksum_ok,
            "Status decoded"
        );
        self.status = fresh;
    }

    fn emit(&self, event: AmpEvent) {
        // No subscribers is fine.
        let _ = self.event_tx.send(event);
    }

    /// The most recent snapshot, without waiting for a new packet.
    pub fn status(&self) -> &DeviceStatus {
        &self.status
    }

    /// Every enabled channel seen since the engine was created.
    pub fn channels(&self) -> &ChannelList {
        &self.channels
    }

    /// Sequence value the next command datagram will carry.
    pub fn next_sequence(&self) -> u8 {
        self.sequence.peek()
    }

    /// Subscribe to state change events.
    pub fn subscribe(&self) -> broadcast::Receiver<AmpEvent> {
        self.event_tx.subscribe()
    }

    /// Power state including the engine's own power-on grace period.
    ///
    /// Only packets that passed their checksum count.
    pub fn power_state(&self) -> PowerState {
        if self.last_trusted.as_ref().is_some_and(|s| s.powered) {
            PowerState::On
        } else if self
            .booting_until
            .is_some_and(|deadline| Instant::now() < deadline)
        {
            PowerState::Booting
        } else {
            PowerState::Standby
        }
    }

    /// Last snapshot whose checksum verified; toggles and no-op checks use it.
    fn trusted(&self) -> Option<&DeviceStatus> {
        self.last_trusted.as_ref()
    }

    /// Where commands go: the last status sender, on the command port.
    fn destination(&self) -> Option<SocketAddr> {
        if !self.status.connected {
            return None;
        }
        self.status
            .source_address
            .map(|ip| SocketAddr::new(ip, self.command_port))
    }

    /// Transmit `command` `repeat_count` times, one sequence value each.
    ///
    /// Returns `Ok(false)` without sending anything when no amplifier is
    /// currently known.
    pub async fn send_command(&mut self, command: Command) -> Result<bool> {
        command.validate()?;

        let Some(dest) = self.destination() else {
            debug!(command = command.name(), "Not connected, dropping command");
            return Ok(false);
        };

        let first = self.sequence.peek();
        for _ in 0..self.repeat_count {
            let packet = encode_command(&command, self.sequence.advance());
            self.transport.send_to(&packet, dest).await?;
        }

        debug!(
            command = command.name(),
            destination = %dest,
            first_sequence = first,
            copies = self.repeat_count,
            "Command sent"
        );
        Ok(true)
    }

    /// Request the opposite of the last reported power state.
    ///
    /// Dropped while the amplifier is still booting from an earlier
    /// power-on request, and before any status has passed its checksum.
    pub async fn send_toggle_power(&mut self) -> Result<bool> {
        if self.power_state() == PowerState::Booting {
            debug!("Amplifier booting, ignoring power toggle");
            return Ok(false);
        }
        let Some(on) = self.trusted().map(|s| !s.powered) else {
            debug!("No verified status yet, ignoring power toggle");
            return Ok(false);
        };
        let sent = self.send_command(Command::Power(on)).await?;
        if sent && on {
            self.booting_until = Some(Instant::now() + self.boot_grace);
        }
        Ok(sent)
    }

    /// Request the opposite of the last reported mute state.
    pub async fn send_toggle_mute(&mut self) -> Result<bool> {
        let Some(muted) = self.trusted().map(|s| !s.muted) else {
            debug!("No verified status yet, ignoring mute toggle");
            return Ok(false);
        };
        self.send_command(Command::Mute(muted)).await
    }

    /// Set the volume in dB. Values above -10 dB are sent as -10 dB.
    pub async fn send_set_volume(&mut self, db: f64) -> Result<bool> {
        self.send_command(Command::Volume(db)).await
    }

    /// Select the input channel in slot `channel_index`.
    pub async fn send_set_output(&mut self, channel_index: u8) -> Result<bool> {
        self.send_command(Command::Output(channel_index)).await
    }

    /// Set the volume from a raw volume byte, as a slider would report it.
    ///
    /// Does nothing when `raw` equals the volume last reported.
    pub async fn send_set_volume_register(&mut self, raw: u8) -> Result<bool> {
        if self.trusted().is_some_and(|s| s.volume_register == raw) {
            return Ok(false);
        }
        self.send_set_volume(register_to_db(raw)).await
    }

    /// Select an input by channel name.
    ///
    /// Does nothing when the channel is already active.
    ///
    /// # Errors
    ///
    /// [`Error::NoMatchingChannel`] when no known channel has that name.
    pub async fn send_select_channel(&mut self, name: &str) -> Result<bool> {
        let index = self
            .channels
            .index_of(name)
            .ok_or_else(|| Error::NoMatchingChannel(name.to_string()))?;
        if self.trusted().is_some_and(|s| s.active_channel == index) {
            return Ok(false);
        }
        self.send_set_output(index).await
    }
}

/// Events describing how `next` differs from `previous`.
fn diff(previous: &DeviceStatus, next: &DeviceStatus) -> Vec<AmpEvent> {
    let mut events = Vec::new();
    if previous.powered != next.powered {
        events.push(AmpEvent::PowerChanged { on: next.powered });
    }
    if previous.muted != next.muted {
        events.push(AmpEvent::MuteChanged { muted: next.muted });
    }
    if previous.volume_register != next.volume_register {
        events.push(AmpEvent::VolumeChanged {
            register: next.volume_register,
        });
    }
    if previous.active_channel != next.active_channel {
        events.push(AmpEvent::ChannelChanged {
            index: next.active_channel,
        });
    }
    events
}
