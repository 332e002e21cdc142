//! Command packet encoder.
//!
//! Every command is a 142-byte datagram sent to UDP port 45455. Only the
//! first 14 bytes carry information; the rest is zero.
//!
//! # Layout
//!
//! ```text
//! 0..2    magic 0x44 0x72
//! 3       sequence counter
//! 5       sequence counter >> 1
//! 6       opcode argument (requested on/off state, or 0)
//! 7       opcode
//! 8..10   payload, big-endian
//! 12..14  CRC-16/CCITT-FALSE of bytes 0..12, big-endian
//! ```
//!
//! A logical command goes out several times in a row, each copy with the
//! next sequence value. [`encode_command`] builds one copy; the engine owns
//! the counter and the repeat loop.

use bytes::{BufMut, BytesMut};
use devimote_core::{CHANNEL_SLOTS, Error, Result};

use crate::crc::checksum16;
use crate::volume::{VOLUME_CEILING_DB, db_to_register};

/// Size of every command datagram.
pub const COMMAND_PACKET_LEN: usize = 142;

/// Number of bytes covered by the command checksum.
pub const CHECKSUMMED_LEN: usize = 12;

/// Leading magic bytes of every command datagram.
pub const MAGIC: [u8; 2] = [0x44, 0x72];

/// Copies of each logical command sent by default.
pub const DEFAULT_REPEAT: usize = 4;

const OP_POWER: u8 = 0x01;
const OP_VOLUME: u8 = 0x04;
const OP_OUTPUT: u8 = 0x05;
const OP_MUTE: u8 = 0x07;

const OUTPUT_BASE: u16 = 0x4000;
const OUTPUT_SHIFT: u32 = 5;
/// Outputs above this index use a narrower low payload byte.
const OUTPUT_NARROW_ABOVE: u8 = 7;

/// A request to change amplifier state.
///
/// Power and mute carry the *requested* state, not a toggle bit; the
/// caller derives it from the last status it saw.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Command {
    /// Switch the amplifier on (`true`) or to standby (`false`).
    Power(bool),
    /// Mute (`true`) or unmute (`false`) the output.
    Mute(bool),
    /// Set the volume in dB. Clamped to
    /// [`VOLUME_CEILING_DB`](crate::volume::VOLUME_CEILING_DB).
    Volume(f64),
    /// Select the input channel in slot `0..15`.
    Output(u8),
}

impl Command {
    /// Validate the command's arguments.
    pub fn validate(&self) -> Result<()> {
        match *self {
            Command::Output(index) if index >= CHANNEL_SLOTS => Err(Error::InvalidParameter(
                format!("output index {index} out of range 0-{}", CHANNEL_SLOTS - 1),
            )),
            _ => Ok(()),
        }
    }

    /// Bytes 6 and 7: argument and opcode.
    pub fn opcode(&self) -> [u8; 2] {
        match *self {
            Command::Power(on) => [u8::from(on), OP_POWER],
            Command::Mute(muted) => [u8::from(muted), OP_MUTE],
            Command::Volume(_) => [0x00, OP_VOLUME],
            Command::Output(_) => [0x00, OP_OUTPUT],
        }
    }

    /// Bytes 8 and 9.
    pub fn payload(&self) -> [u8; 2] {
        match *self {
            Command::Power(_) | Command::Mute(_) => [0x00, 0x00],
            Command::Volume(db) => db_to_register(capped_volume(db)).to_be_bytes(),
            Command::Output(index) => {
                let value = OUTPUT_BASE | (u16::from(index) << OUTPUT_SHIFT);
                let [hi, lo] = value.to_be_bytes();
                if index > OUTPUT_NARROW_ABOVE {
                    [hi, lo >> 1]
                } else {
                    [hi, lo]
                }
            }
        }
    }

    /// Short name for logs.
    pub fn name(&self) -> &'static str {
        match self {
            Command::Power(_) => "power",
            Command::Mute(_) => "mute",
            Command::Volume(_) => "volume",
            Command::Output(_) => "output",
        }
    }
}

/// Apply the volume ceiling. NaN becomes the ceiling.
fn capped_volume(db: f64) -> f64 {
    db.min(VOLUME_CEILING_DB)
}

/// Per-engine wrapping sequence counter stamped into command packets.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SequenceCounter(u8);

impl SequenceCounter {
    /// A counter starting at 0.
    pub fn new() -> Self {
        Self::default()
    }

    /// A counter starting at `value`.
    pub fn starting_at(value: u8) -> Self {
        SequenceCounter(value)
    }

    /// The value the next packet will carry.
    pub fn peek(&self) -> u8 {
        self.0
    }

    /// Return the current value and move to the next, wrapping after 255.
    pub fn advance(&mut self) -> u8 {
        let value = self.0;
        self.0 = self.0.wrapping_add(1);
        value
    }
}

/// Encode one copy of `command` carrying sequence value `sequence`.
///
/// # Example
///
/// ```
/// use devimote_protocol::commands::{Command, encode_command, COMMAND_PACKET_LEN};
///
/// let packet = encode_command(&Command::Mute(true), 5);
/// assert_eq!(packet.len(), COMMAND_PACKET_LEN);
/// assert_eq!(&packet[..8], &[0x44, 0x72, 0x00, 0x05, 0x00, 0x02, 0x01, 0x07]);
/// ```
pub fn encode_command(command: &Command, sequence: u8) -> Vec<u8> {
    let mut buf = BytesMut::with_capacity(COMMAND_PACKET_LEN);
    buf.put_slice(&MAGIC);
    buf.put_u8(0x00);
    buf.put_u8(sequence);
    buf.put_u8(0x00);
    buf.put_u8(sequence >> 1);
    buf.put_slice(&command.opcode());
    buf.put_slice(&command.payload());
    buf.put_bytes(0x00, CHECKSUMMED_LEN - buf.len());
    let crc = checksum16(&buf);
    buf.put_u16(crc);
    buf.put_bytes(0x00, COMMAND_PACKET_LEN - buf.len());
    buf.to_vec()
}

/// Check that `packet` is a well-formed command datagram with a valid CRC.
pub fn verify_command(packet: &[u8]) -> bool {
    packet.len() == COMMAND_PACKET_LEN
        && packet[..2] == MAGIC
        && checksum16(&packet[..CHECKSUMMED_LEN])
            == u16::from_be_bytes([packet[CHECKSUMMED_LEN], packet[CHECKSUMMED_LEN + 1]])
        && packet[CHECKSUMMED_LEN + 2..].iter().all(|&b| b == 0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn power_on_layout() {
        let packet = encode_command(&Command::Power(true), 0);
        assert_eq!(packet.len(), COMMAND_PACKET_LEN);
        assert_eq!(&packet[..10], &[0x44, 0x72, 0, 0, 0, 0, 0x01, 0x01, 0, 0]);
        assert!(verify_command(&packet));
    }

    #[test]
    fn power_off_layout() {
        let packet = encode_command(&Command::Power(false), 0);
        assert_eq!(packet[6], 0x00);
        assert_eq!(packet[7], 0x01);
    }

    #[test]
    fn mute_layout() {
        let packet = encode_command(&Command::Mute(true), 0);
        assert_eq!(&packet[6..10], &[0x01, 0x07, 0x00, 0x00]);
        let packet = encode_command(&Command::Mute(false), 0);
        assert_eq!(&packet[6..10], &[0x00, 0x07, 0x00, 0x00]);
    }

    #[test]
    fn volume_layout() {
        let packet = encode_command(&Command::Volume(-22.5), 0);
        assert_eq!(&packet[6..10], &[0x00, 0x04, 0xC1, 0xB4]);
    }

    #[test]
    fn volume_is_clamped_in_packet() {
        let ceiling = db_to_register(VOLUME_CEILING_DB).to_be_bytes();
        assert_eq!(ceiling, [0xC1, 0x20]);
        for db in [3.0, 0.0, -9.5, f64::NAN] {
            assert_eq!(Command::Volume(db).payload(), ceiling, "at {db} dB");
        }
    }

    #[test]
    fn volume_below_ceiling_passes_through() {
        assert_eq!(Command::Volume(-10.5).payload(), [0xC1, 0x28]);
        assert_eq!(Command::Volume(-30.0).payload(), [0xC1, 0xF0]);
    }

    #[test]
    fn output_low_indices() {
        assert_eq!(Command::Output(0).payload(), [0x40, 0x00]);
        assert_eq!(Command::Output(1).payload(), [0x40, 0x20]);
        assert_eq!(Command::Output(7).payload(), [0x40, 0xE0]);
    }

    #[test]
    fn output_above_seven_shifts_low_byte() {
        // 0x4000 | 8 << 5 = 0x4100; 0x4000 | 9 << 5 = 0x4120 -> low 0x10.
        assert_eq!(Command::Output(8).payload(), [0x41, 0x00]);
        assert_eq!(Command::Output(9).payload(), [0x41, 0x10]);
        assert_eq!(Command::Output(14).payload(), [0x41, 0x60]);

        let seven = encode_command(&Command::Output(7), 0);
        let eight = encode_command(&Command::Output(8), 0);
        assert_eq!(&seven[6..8], &[0x00, 0x05]);
        assert_ne!(seven[9] >> 1, eight[9]);
        assert!(verify_command(&eight));
    }

    #[test]
    fn output_range_validation() {
        assert!(Command::Output(14).validate().is_ok());
        assert!(matches!(
            Command::Output(15).validate(),
            Err(Error::InvalidParameter(_))
        ));
        assert!(Command::Volume(-30.0).validate().is_ok());
    }

    #[test]
    fn sequence_bytes() {
        let packet = encode_command(&Command::Power(true), 0x2B);
        assert_eq!(packet[3], 0x2B);
        assert_eq!(packet[5], 0x15);
        assert_eq!(packet[2], 0);
        assert_eq!(packet[4], 0);
    }

    #[test]
    fn checksum_covers_first_twelve_bytes() {
        let packet = encode_command(&Command::Volume(-40.0), 17);
        let crc = checksum16(&packet[..12]);
        assert_eq!(&packet[12..14], &crc.to_be_bytes());
        assert!(packet[14..].iter().all(|&b| b == 0));
    }

    #[test]
    fn checksum_changes_with_sequence() {
        let a = encode_command(&Command::Mute(true), 0);
        let b = encode_command(&Command::Mute(true), 1);
        assert_ne!(&a[12..14], &b[12..14]);
        assert!(verify_command(&a));
        assert!(verify_command(&b));
    }

    #[test]
    fn verify_rejects_corruption() {
        let mut packet = encode_command(&Command::Output(3), 9);
        packet[8] ^= 0x01;
        assert!(!verify_command(&packet));
        assert!(!verify_command(&packet[..100]));
    }

    #[test]
    fn sequence_counter_wraps() {
        let mut counter = SequenceCounter::starting_at(254);
        assert_eq!(counter.advance(), 254);
        assert_eq!(counter.advance(), 255);
        assert_eq!(counter.advance(), 0);
        assert_eq!(counter.peek(), 1);
    }

    #[test]
    fn sequence_counter_starts_at_zero() {
        let mut counter = SequenceCounter::new();
        assert_eq!(counter.advance(), 0);
        assert_eq!(counter.advance(), 1);
    }

    #[test]
    fn command_names() {
        assert_eq!(Command::Power(true).name(), "power");
        assert_eq!(Command::Output(2).name(), "output");
    }
}
