//! UDP socket carrying both directions of the amplifier protocol.
//!
//! The amplifier broadcasts status to port 45454 and reads commands on port
//! 45455. One socket bound to the status port is enough: commands leave from
//! it and the amplifier does not reply to their source.
//!
//! # Example
//!
//! ```no_run
//! use devimote_transport::UdpTransport;
//! use std::net::Ipv4Addr;
//! use std::time::Duration;
//!
//! # async fn example() -> devimote_core::Result<()> {
//! let socket = UdpTransport::bind((Ipv4Addr::UNSPECIFIED, 45454)).await?;
//!
//! let mut status = [0u8; 512];
//! let (len, amp) = socket.recv_from(&mut status, Duration::from_secs(2)).await?;
//! println!("{len}-byte status from {amp}");
//! # Ok(())
//! # }
//! ```

use std::net::SocketAddr;
use std::time::Duration;

use async_trait::async_trait;
use tokio::net::{ToSocketAddrs, UdpSocket};
use tracing::{debug, error, trace};

use devimote_core::error::{Error, Result};
use devimote_core::transport::DatagramTransport;

/// [`DatagramTransport`] over a bound [`tokio::net::UdpSocket`].
#[derive(Debug)]
pub struct UdpTransport {
    socket: UdpSocket,
    local: SocketAddr,
}

impl UdpTransport {
    /// Bind the status socket.
    ///
    /// Accepts anything tokio can resolve: a `SocketAddr`, an
    /// `(IpAddr, u16)` tuple, or a `"host:port"` string. Port 0 lets the OS
    /// choose, which is what tests want.
    pub async fn bind<A: ToSocketAddrs>(addr: A) -> Result<Self> {
        let socket = UdpSocket::bind(addr).await.map_err(|e| {
            error!(error = %e, "Cannot bind status socket");
            Error::Io(e)
        })?;
        let local = socket.local_addr()?;
        debug!(%local, "Status socket bound");
        Ok(UdpTransport { socket, local })
    }

    /// Address the socket is listening on.
    pub fn local_addr(&self) -> SocketAddr {
        self.local
    }

    /// Send one datagram to `to`.
    ///
    /// UDP gives no delivery guarantee; `Ok` only means the kernel took it.
    pub async fn send_to(&self, datagram: &[u8], to: SocketAddr) -> Result<()> {
        match self.socket.send_to(datagram, to).await {
            Ok(_) => {
                trace!(%to, len = datagram.len(), "Datagram out");
                Ok(())
            }
            Err(e) => {
                error!(%to, error = %e, "Datagram send failed");
                Err(Error::Io(e))
            }
        }
    }

    /// Wait up to `wait` for one datagram and return its length and sender.
    ///
    /// A datagram larger than `buf` is cut to fit.
    ///
    /// # Errors
    ///
    /// [`Error::Timeout`] when nothing arrives in time, [`Error::Io`] when
    /// the socket reports a failure.
    pub async fn recv_from(&self, buf: &mut [u8], wait: Duration) -> Result<(usize, SocketAddr)> {
        let Ok(received) = tokio::time::timeout(wait, self.socket.recv_from(buf)).await else {
            trace!(local = %self.local, wait_ms = wait.as_millis(), "Nothing received");
            return Err(Error::Timeout);
        };
        let (len, from) = received.map_err(|e| {
            error!(local = %self.local, error = %e, "Datagram receive failed");
            Error::Io(e)
        })?;
        trace!(%from, len, "Datagram in");
        Ok((len, from))
    }
}

#[async_trait]
impl DatagramTransport for UdpTransport {
    async fn send_to(&mut self, data: &[u8], addr: SocketAddr) -> Result<()> {
        UdpTransport::send_to(self, data, addr).await
    }

    async fn recv_from(
        &mut self,
        buf: &mut [u8],
        timeout: Duration,
    ) -> Result<(usize, SocketAddr)> {
        UdpTransport::recv_from(self, buf, timeout).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::{IpAddr, Ipv4Addr};

    async fn loopback() -> UdpTransport {
        UdpTransport::bind((Ipv4Addr::LOCALHOST, 0)).await.unwrap()
    }

    #[tokio::test]
    async fn bind_assigns_port() {
        let socket = loopback().await;
        let local = socket.local_addr();
        assert_eq!(local.ip(), IpAddr::V4(Ipv4Addr::LOCALHOST));
        assert_ne!(local.port(), 0);
    }

    #[tokio::test]
    async fn bind_accepts_host_port_string() {
        let socket = UdpTransport::bind("127.0.0.1:0").await.unwrap();
        assert!(socket.local_addr().ip().is_loopback());
    }

    #[tokio::test]
    async fn bind_without_port_is_io_error() {
        let result = UdpTransport::bind("not-an-address").await;
        assert!(matches!(result, Err(Error::Io(_))));
    }

    #[tokio::test]
    async fn status_arrives_with_sender() {
        let amp = loopback().await;
        let engine = loopback().await;

        let status = [0x5Au8; 512];
        amp.send_to(&status, engine.local_addr()).await.unwrap();

        let mut buf = [0u8; 512];
        let (len, from) = engine
            .recv_from(&mut buf, Duration::from_secs(2))
            .await
            .unwrap();
        assert_eq!(len, 512);
        assert_eq!(buf, status);
        assert_eq!(from, amp.local_addr());
    }

    #[tokio::test]
    async fn quiet_socket_times_out() {
        let engine = loopback().await;
        let mut buf = [0u8; 512];
        let result = engine.recv_from(&mut buf, Duration::from_millis(50)).await;
        assert!(matches!(result, Err(Error::Timeout)), "got {result:?}");
    }

    #[tokio::test]
    async fn short_buffer_keeps_prefix() {
        let amp = loopback().await;
        let engine = loopback().await;

        let long: Vec<u8> = (0..600u16).map(|i| i as u8).collect();
        amp.send_to(&long, engine.local_addr()).await.unwrap();

        let mut buf = [0u8; 512];
        // Linux truncates silently; other platforms may report an error.
        if let Ok((len, _)) = engine.recv_from(&mut buf, Duration::from_secs(2)).await {
            assert_eq!(len, 512);
            assert_eq!(&buf[..], &long[..512]);
        }
    }

    #[tokio::test]
    async fn usable_as_trait_object() {
        let mut engine: Box<dyn DatagramTransport> = Box::new(loopback().await);
        let amp = loopback().await;

        let command = [0x44u8, 0x72, 0x00, 0x01, 0x00, 0x00, 0x01, 0x07];
        engine.send_to(&command, amp.local_addr()).await.unwrap();

        let mut buf = [0u8; 142];
        let (len, _) = amp.recv_from(&mut buf, Duration::from_secs(2)).await.unwrap();
        assert_eq!(&buf[..len], &command);
    }
}
