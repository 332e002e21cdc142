//! Core types used throughout devimote.
//!
//! [`DeviceStatus`] is the decoded snapshot of one status packet. It is a
//! plain value: every successful poll produces a fresh one. The only state
//! that outlives a poll is the [`ChannelList`], which the engine merges
//! forward so that it never shrinks.

use std::collections::BTreeMap;
use std::fmt;
use std::net::IpAddr;

use crate::helpers::format_volume_db;

/// Number of input channel slots described in a status packet.
pub const CHANNEL_SLOTS: u8 = 15;

/// Known input channels of the amplifier, keyed by slot index (0-14).
///
/// Entries are only ever added or renamed. A channel that later reports
/// itself disabled keeps its entry.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChannelList(BTreeMap<u8, String>);

impl ChannelList {
    /// Create an empty channel list.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a channel name for `index`, replacing any previous name.
    pub fn insert(&mut self, index: u8, name: impl Into<String>) {
        debug_assert!(index < CHANNEL_SLOTS);
        self.0.insert(index, name.into());
    }

    /// Fold the channels seen in `other` into this list.
    ///
    /// Names from `other` win for slots present in both; slots only present
    /// here are kept.
    pub fn merge(&mut self, other: &ChannelList) {
        for (index, name) in &other.0 {
            self.0.insert(*index, name.clone());
        }
    }

    /// Look up the name of the channel in slot `index`.
    pub fn name(&self, index: u8) -> Option<&str> {
        self.0.get(&index).map(String::as_str)
    }

    /// Find the slot index of the first channel named exactly `name`.
    pub fn index_of(&self, name: &str) -> Option<u8> {
        self.0
            .iter()
            .find(|(_, n)| n.as_str() == name)
            .map(|(index, _)| *index)
    }

    /// Iterate over `(index, name)` pairs in slot order.
    pub fn iter(&self) -> impl Iterator<Item = (u8, &str)> {
        self.0.iter().map(|(index, name)| (*index, name.as_str()))
    }

    /// Number of channels known.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether no channel has been seen yet.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<(u8, String)> for ChannelList {
    fn from_iter<I: IntoIterator<Item = (u8, String)>>(iter: I) -> Self {
        ChannelList(iter.into_iter().collect())
    }
}

/// Decoded amplifier state from the most recent poll.
///
/// When `checksum_ok` is `false` the remaining fields were still decoded
/// from the packet but must not drive any decision; they may be shown.
/// When `connected` is `false` the fields are whatever the last reply said.
#[derive(Debug, Clone, PartialEq)]
pub struct DeviceStatus {
    /// Whether the last poll received a reply before its timeout.
    pub connected: bool,
    /// Device name as configured on the amplifier.
    pub device_name: String,
    /// Address of the last status sender; `None` until the first reply.
    pub source_address: Option<IpAddr>,
    /// All enabled channels seen so far.
    pub channel_list: ChannelList,
    /// Amplifier is powered on (not in standby).
    pub powered: bool,
    /// Output is muted.
    pub muted: bool,
    /// Currently selected input slot (0-15).
    pub active_channel: u8,
    /// Raw volume byte, see [`register_to_db`](crate::helpers::register_to_db).
    pub volume_register: u8,
    /// Whether the trailing CRC matched the packet contents.
    pub checksum_ok: bool,
}

impl Default for DeviceStatus {
    fn default() -> Self {
        DeviceStatus {
            connected: false,
            device_name: "Unknown".to_string(),
            source_address: None,
            channel_list: ChannelList::new(),
            powered: false,
            muted: false,
            active_channel: 0,
            volume_register: 0,
            checksum_ok: false,
        }
    }
}

impl DeviceStatus {
    /// Name of the active channel, if that slot has ever been reported enabled.
    pub fn active_channel_name(&self) -> Option<&str> {
        self.channel_list.name(self.active_channel)
    }

    /// Whether this snapshot came from a reply whose checksum verified.
    pub fn is_trusted(&self) -> bool {
        self.connected && self.checksum_ok
    }

    /// One-line human readable summary.
    ///
    /// Returns `None` while disconnected and `"[CRC ERROR]"` for a reply
    /// that failed its integrity check.
    ///
    /// ```text
    /// [ON ] Expert 220 (192.168.1.40), volume: -22.5dB Phono [M]
    /// ```
    pub fn report(&self) -> Option<String> {
        if !self.connected {
            return None;
        }
        if !self.checksum_ok {
            return Some("[CRC ERROR]".to_string());
        }
        let address = self
            .source_address
            .map(|ip| ip.to_string())
            .unwrap_or_else(|| "?".to_string());
        let mut line = format!(
            "[{}] {} ({}), volume: {} {}",
            if self.powered { "ON " } else { "OFF" },
            self.device_name,
            address,
            format_volume_db(self.volume_register),
            self.active_channel_name().unwrap_or("?"),
        );
        if self.muted {
            line.push_str(" [M]");
        }
        Some(line)
    }
}

/// Power state as seen by a front end.
///
/// `Booting` is not reported by the amplifier. The engine enters it after
/// requesting power-on and leaves it once a poll reports the amplifier
/// powered, or after the configured grace period.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PowerState {
    /// Amplifier is in standby.
    Standby,
    /// Power-on was requested and the amplifier is still starting up.
    Booting,
    /// Amplifier is on.
    On,
}

impl fmt::Display for PowerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PowerState::Standby => write!(f, "STANDBY"),
            PowerState::Booting => write!(f, "BOOTING"),
            PowerState::On => write!(f, "ON"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn connected_status() -> DeviceStatus {
        let mut channels = ChannelList::new();
        channels.insert(0, "Phono");
        channels.insert(3, "Optical 1");
        DeviceStatus {
            connected: true,
            device_name: "Expert 220".to_string(),
            source_address: Some("192.168.1.40".parse().unwrap()),
            channel_list: channels,
            powered: true,
            muted: false,
            active_channel: 0,
            volume_register: 150,
            checksum_ok: true,
        }
    }

    #[test]
    fn device_status_default() {
        let status = DeviceStatus::default();
        assert!(!status.connected);
        assert!(!status.checksum_ok);
        assert_eq!(status.device_name, "Unknown");
        assert!(status.source_address.is_none());
        assert!(status.channel_list.is_empty());
        assert!(!status.is_trusted());
    }

    #[test]
    fn channel_list_merge_never_removes() {
        let mut known = ChannelList::new();
        known.insert(0, "Phono");
        known.insert(2, "Line 1");

        let mut seen = ChannelList::new();
        seen.insert(2, "Line A");
        seen.insert(5, "UPnP");

        known.merge(&seen);
        assert_eq!(known.len(), 3);
        assert_eq!(known.name(0), Some("Phono"));
        assert_eq!(known.name(2), Some("Line A"));
        assert_eq!(known.name(5), Some("UPnP"));

        known.merge(&ChannelList::new());
        assert_eq!(known.len(), 3);
    }

    #[test]
    fn channel_list_index_of() {
        let status = connected_status();
        assert_eq!(status.channel_list.index_of("Optical 1"), Some(3));
        assert_eq!(status.channel_list.index_of("Optical"), None);
    }

    #[test]
    fn channel_list_iterates_in_slot_order() {
        let list: ChannelList = vec![(7, "B".to_string()), (1, "A".to_string())]
            .into_iter()
            .collect();
        let order: Vec<u8> = list.iter().map(|(i, _)| i).collect();
        assert_eq!(order, vec![1, 7]);
    }

    #[test]
    fn active_channel_name_missing_slot() {
        let mut status = connected_status();
        status.active_channel = 9;
        assert_eq!(status.active_channel_name(), None);
    }

    #[test]
    fn report_connected() {
        let status = connected_status();
        assert_eq!(
            status.report().unwrap(),
            "[ON ] Expert 220 (192.168.1.40), volume: -22.5dB Phono"
        );
    }

    #[test]
    fn report_muted_standby() {
        let mut status = connected_status();
        status.powered = false;
        status.muted = true;
        status.active_channel = 3;
        assert_eq!(
            status.report().unwrap(),
            "[OFF] Expert 220 (192.168.1.40), volume: -22.5dB Optical 1 [M]"
        );
    }

    #[test]
    fn report_whole_decibels_keep_decimal() {
        let mut status = connected_status();
        status.volume_register = 175;
        assert_eq!(
            status.report().unwrap(),
            "[ON ] Expert 220 (192.168.1.40), volume: -10.0dB Phono"
        );
    }

    #[test]
    fn report_checksum_error() {
        let mut status = connected_status();
        status.checksum_ok = false;
        assert_eq!(status.report().unwrap(), "[CRC ERROR]");
    }

    #[test]
    fn report_disconnected() {
        let mut status = connected_status();
        status.connected = false;
        assert!(status.report().is_none());
    }

    #[test]
    fn power_state_display() {
        assert_eq!(PowerState::Standby.to_string(), "STANDBY");
        assert_eq!(PowerState::Booting.to_string(), "BOOTING");
        assert_eq!(PowerState::On.to_string(), "ON");
    }
}
