//! # devimote -- Remote Control for Devialet Expert Amplifiers
//!
//! `devimote` is an asynchronous Rust library for controlling Devialet
//! Expert amplifiers over their UDP remote-control protocol. The amplifier
//! broadcasts a 512-byte status packet on port 45454 and accepts 142-byte
//! command packets on port 45455.
//!
//! ## Quick Start
//!
//! ```no_run
//! use devimote::AmplifierBuilder;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let mut amp = AmplifierBuilder::new().build().await?;
//!
//!     let status = amp.poll().await?;
//!     if let Some(line) = status.report() {
//!         println!("{line}");
//!     }
//!
//!     amp.send_set_volume(-30.0).await?;
//!     amp.send_select_channel("Phono").await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! | Crate                   | Purpose                                         |
//! |-------------------------|-------------------------------------------------|
//! | `devimote-core`         | Types, errors, events, the transport trait      |
//! | `devimote-protocol`     | CRC, status decoder, command encoder, volume codec |
//! | `devimote-transport`    | UDP socket implementation                       |
//! | `devimote-test-harness` | Scripted mock transport for tests               |
//! | **`devimote`**          | This facade crate -- engine and re-exports      |
//!
//! ## Connection model
//!
//! There is no handshake. An amplifier counts as connected while polls keep
//! receiving status packets; commands go to whichever address sent the last
//! one. Commands issued while disconnected are dropped and the `send_*`
//! method returns `Ok(false)`.
//!
//! Every command is sent [`DEFAULT_REPEAT`] times with consecutive sequence
//! values. There is no acknowledgement; the next status packet shows
//! whether the change took effect.
//!
//! ## Events
//!
//! [`Amplifier::subscribe`] returns a broadcast receiver of [`AmpEvent`]s
//! describing connection changes and state differences between trusted
//! status packets.

pub mod amplifier;
pub mod builder;

pub use devimote_core::*;

pub use devimote_protocol::{
    COMMAND_PACKET_LEN, Command, DEFAULT_REPEAT, STATUS_PACKET_LEN, SequenceCounter,
    VOLUME_CEILING_DB, checksum16, db_to_register, decode_status,
    encode_command, encode_status, verify_command,
};

pub use devimote_transport::UdpTransport;

pub use amplifier::Amplifier;
pub use builder::{AmplifierBuilder, COMMAND_PORT, STATUS_PORT};
