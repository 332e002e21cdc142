//! Status packet decoder.
//!
//! The amplifier broadcasts a fixed-layout status datagram of (at least)
//! 512 bytes. Fields sit at fixed offsets; the last two bytes carry a
//! big-endian CRC-16 over everything before them.
//!
//! # Layout
//!
//! ```text
//! 19..50            device name, UTF-8, NUL padded
//! 52 + 17*i         channel i enabled flag, ASCII '0' / '1'   (i = 0..15)
//! 53 + 17*i .. +16  channel i name, UTF-8, NUL padded
//! 307               bit 0x80: powered
//! 308               bit 0x02: muted, bits 0x3C: active channel
//! 310               raw volume byte
//! len-2 .. len      CRC-16/CCITT-FALSE of bytes 0..len-2, big-endian
//! ```
//!
//! All decoding in this module is pure -- no I/O is performed.

use std::net::IpAddr;

use devimote_core::{CHANNEL_SLOTS, ChannelList, DeviceStatus, Error, Result};

use crate::crc::checksum16;

/// Minimum size of a status datagram, and the receive buffer size.
pub const STATUS_PACKET_LEN: usize = 512;

const DEVICE_NAME_OFFSET: usize = 19;
const DEVICE_NAME_LEN: usize = 31;

const CHANNEL_TABLE_OFFSET: usize = 52;
const CHANNEL_STRIDE: usize = 17;
const CHANNEL_NAME_LEN: usize = 16;

const POWER_OFFSET: usize = 307;
const POWER_MASK: u8 = 0x80;

const MUTE_CHANNEL_OFFSET: usize = 308;
const MUTE_MASK: u8 = 0x02;
const CHANNEL_MASK: u8 = 0x3C;
const CHANNEL_SHIFT: u32 = 2;

const VOLUME_OFFSET: usize = 310;

/// Decode a status datagram received from `sender`.
///
/// The returned snapshot is always `connected`. A CRC mismatch is reported
/// through `checksum_ok` and does not stop decoding. The channel list only
/// holds the channels this packet marks enabled; accumulating them across
/// polls is the caller's job.
///
/// # Errors
///
/// [`Error::MalformedPayload`] when the datagram is shorter than
/// [`STATUS_PACKET_LEN`], when a text field is not valid UTF-8, or when a
/// channel flag is not an ASCII digit.
pub fn decode_status(datagram: &[u8], sender: IpAddr) -> Result<DeviceStatus> {
    if datagram.len() < STATUS_PACKET_LEN {
        return Err(Error::MalformedPayload(format!(
            "status packet is {} bytes, expected at least {}",
            datagram.len(),
            STATUS_PACKET_LEN
        )));
    }

    let device_name = decode_text(
        &datagram[DEVICE_NAME_OFFSET..DEVICE_NAME_OFFSET + DEVICE_NAME_LEN],
        "device name",
    )?;

    let mut channel_list = ChannelList::new();
    for index in 0..CHANNEL_SLOTS {
        let flag_offset = CHANNEL_TABLE_OFFSET + CHANNEL_STRIDE * usize::from(index);
        if channel_enabled(datagram[flag_offset], index)? {
            let name_offset = flag_offset + 1;
            let name = decode_text(
                &datagram[name_offset..name_offset + CHANNEL_NAME_LEN],
                "channel name",
            )?;
            channel_list.insert(index, name);
        }
    }

    let mute_channel = datagram[MUTE_CHANNEL_OFFSET];
    let (body, trailer) = datagram.split_at(datagram.len() - 2);
    let expected = u16::from_be_bytes([trailer[0], trailer[1]]);

    Ok(DeviceStatus {
        connected: true,
        device_name,
        source_address: Some(sender),
        channel_list,
        powered: datagram[POWER_OFFSET] & POWER_MASK != 0,
        muted: mute_channel & MUTE_MASK != 0,
        active_channel: (mute_channel & CHANNEL_MASK) >> CHANNEL_SHIFT,
        volume_register: datagram[VOLUME_OFFSET],
        checksum_ok: checksum16(body) == expected,
    })
}

/// Build a status datagram describing `status`.
///
/// Every channel in `status.channel_list` is marked enabled. The result is
/// [`STATUS_PACKET_LEN`] bytes with a valid trailing checksum. Used by
/// simulators and tests; the amplifier is the only real producer.
///
/// # Errors
///
/// [`Error::InvalidParameter`] when a name does not fit its field, or a
/// channel index or active channel is out of range.
pub fn encode_status(status: &DeviceStatus) -> Result<Vec<u8>> {
    let mut packet = vec![0u8; STATUS_PACKET_LEN];

    write_text(
        &mut packet[DEVICE_NAME_OFFSET..DEVICE_NAME_OFFSET + DEVICE_NAME_LEN],
        &status.device_name,
    )?;

    for index in 0..CHANNEL_SLOTS {
        let flag_offset = CHANNEL_TABLE_OFFSET + CHANNEL_STRIDE * usize::from(index);
        packet[flag_offset] = b'0';
    }
    for (index, name) in status.channel_list.iter() {
        if index >= CHANNEL_SLOTS {
            return Err(Error::InvalidParameter(format!(
                "channel index {index} out of range 0-{}",
                CHANNEL_SLOTS - 1
            )));
        }
        let flag_offset = CHANNEL_TABLE_OFFSET + CHANNEL_STRIDE * usize::from(index);
        packet[flag_offset] = b'1';
        write_text(
            &mut packet[flag_offset + 1..flag_offset + 1 + CHANNEL_NAME_LEN],
            name,
        )?;
    }

    if status.active_channel > CHANNEL_MASK >> CHANNEL_SHIFT {
        return Err(Error::InvalidParameter(format!(
            "active channel {} does not fit in 4 bits",
            status.active_channel
        )));
    }
    if status.powered {
        packet[POWER_OFFSET] |= POWER_MASK;
    }
    if status.muted {
        packet[MUTE_CHANNEL_OFFSET] |= MUTE_MASK;
    }
    packet[MUTE_CHANNEL_OFFSET] |= status.active_channel << CHANNEL_SHIFT;
    packet[VOLUME_OFFSET] = status.volume_register;

    seal(&mut packet);
    Ok(packet)
}

/// Rewrite the trailing checksum of a status datagram in place.
///
/// Slices too short to hold a checksum are left untouched.
pub fn seal(packet: &mut [u8]) {
    let Some(split) = packet.len().checked_sub(2) else {
        return;
    };
    let crc = checksum16(&packet[..split]);
    packet[split..].copy_from_slice(&crc.to_be_bytes());
}

fn channel_enabled(flag: u8, index: u8) -> Result<bool> {
    if flag.is_ascii_digit() {
        Ok(flag != b'0')
    } else {
        Err(Error::MalformedPayload(format!(
            "channel {index} flag byte 0x{flag:02X} is not an ASCII digit"
        )))
    }
}

fn decode_text(field: &[u8], what: &str) -> Result<String> {
    let text = std::str::from_utf8(field)
        .map_err(|e| Error::MalformedPayload(format!("{what} is not valid UTF-8: {e}")))?;
    Ok(text.trim_end_matches('\0').to_string())
}

fn write_text(field: &mut [u8], text: &str) -> Result<()> {
    let bytes = text.as_bytes();
    if bytes.len() > field.len() {
        return Err(Error::InvalidParameter(format!(
            "{text:?} is longer than {} bytes",
            field.len()
        )));
    }
    field[..bytes.len()].copy_from_slice(bytes);
    Ok(())
}
