//! Datagram transport trait for amplifier communication.
//!
//! The [`DatagramTransport`] trait abstracts over the UDP socket the engine
//! uses to receive status broadcasts and send command packets. The real
//! implementation lives in `devimote-transport`; tests substitute the
//! recording mock from `devimote-test-harness` so that every transmitted
//! command packet can be inspected byte for byte.

use async_trait::async_trait;
use std::net::SocketAddr;
use std::time::Duration;

use crate::error::Result;

/// Asynchronous datagram transport to an amplifier.
///
/// Each call to [`send_to`](DatagramTransport::send_to) is exactly one
/// datagram on the wire. There is no acknowledgement at this layer.
#[async_trait]
pub trait DatagramTransport: Send + Sync {
    /// Send one datagram to `addr`.
    async fn send_to(&mut self, data: &[u8], addr: SocketAddr) -> Result<()>;

    /// Receive one datagram into `buf`, returning its length and sender.
    ///
    /// Returns [`Error::Timeout`](crate::error::Error::Timeout) if nothing
    /// arrives within `timeout`.
    async fn recv_from(
        &mut self,
        buf: &mut [u8],
        timeout: Duration,
    ) -> Result<(usize, SocketAddr)>;
}
