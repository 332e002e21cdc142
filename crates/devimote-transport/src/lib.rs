//! Transport implementations for devimote.
//!
//! This crate provides [`UdpTransport`], the socket-backed implementation of
//! the [`DatagramTransport`](devimote_core::DatagramTransport) trait from
//! `devimote-core`.

pub mod udp;

pub use udp::UdpTransport;
