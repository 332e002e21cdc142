//! Devialet Expert UDP protocol codec for devimote.
//!
//! This crate implements the binary formats spoken by the amplifier's
//! remote-control interface. It provides:
//!
//! - **Checksum** ([`crc`]) -- CRC-16/CCITT-FALSE shared by both directions.
//! - **Status decoder** ([`status`]) -- parse the 512-byte status broadcast
//!   into a [`DeviceStatus`](devimote_core::DeviceStatus).
//! - **Command encoder** ([`commands`]) -- build 142-byte power, mute,
//!   volume and output packets with sequence and checksum stamped in.
//! - **Volume codec** ([`volume`]) -- dB to attenuation register.
//!
//! All encoding/decoding in this crate is pure. Sockets live in
//! `devimote-transport`; the poll/send logic lives in `devimote`.

pub mod commands;
pub mod crc;
pub mod status;
pub mod volume;

pub use commands::{
    COMMAND_PACKET_LEN, Command, DEFAULT_REPEAT, SequenceCounter, encode_command, verify_command,
};
pub use crc::checksum16;
pub use status::{STATUS_PACKET_LEN, decode_status, encode_status};
pub use volume::{VOLUME_CEILING_DB, db_to_register};
