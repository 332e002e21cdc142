//! devimote-core: Core types, errors, and transport traits for devimote.
//!
//! This crate defines the pieces shared by the protocol codec, the UDP
//! transport, and the control engine, without pulling in any sockets.
//!
//! # Key types
//!
//! - [`DeviceStatus`] -- decoded snapshot of one status packet
//! - [`ChannelList`] -- accumulated input channel names
//! - [`DatagramTransport`] -- send/receive seam used by the engine
//! - [`AmpEvent`] -- state change notifications
//! - [`Error`] / [`Result`] -- error handling

pub mod error;
pub mod events;
pub mod helpers;
pub mod transport;
pub mod types;

pub use error::{Error, Result};
pub use events::AmpEvent;
pub use helpers::{ZERO_DB_REGISTER, format_volume_db, register_to_db};
pub use transport::DatagramTransport;
pub use types::*;
