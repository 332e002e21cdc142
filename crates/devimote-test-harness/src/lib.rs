//! devimote-test-harness: Test utilities and mock transports for devimote.
//!
//! This crate provides [`MockDatagramTransport`] for deterministic testing
//! of the control engine without an amplifier on the network.

pub mod mock_udp;

pub use mock_udp::{MockDatagramTransport, SentDatagram};
