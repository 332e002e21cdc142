//! AmplifierBuilder -- fluent builder for constructing [`Amplifier`] instances.
//!
//! Separates configuration from construction so that callers can set ports,
//! timeouts and the repeat policy before the status socket is bound.
//!
//! # Example
//!
//! ```no_run
//! use devimote::AmplifierBuilder;
//! use std::time::Duration;
//!
//! # async fn example() -> devimote::Result<()> {
//! let mut amp = AmplifierBuilder::new()
//!     .receive_timeout(Duration::from_secs(1))
//!     .build()
//!     .await?;
//! let status = amp.poll().await?;
//! # Ok(())
//! # }
//! ```

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::time::Duration;

use devimote_core::error::{Error, Result};
use devimote_core::transport::DatagramTransport;
use devimote_protocol::commands::DEFAULT_REPEAT;

use crate::amplifier::Amplifier;

/// UDP port the amplifier broadcasts status to.
pub const STATUS_PORT: u16 = 45454;

/// UDP port the amplifier accepts commands on.
pub const COMMAND_PORT: u16 = 45455;

/// How long a poll waits for a status datagram.
pub const DEFAULT_RECEIVE_TIMEOUT: Duration = Duration::from_secs(2);

/// How long the amplifier takes to come out of standby.
pub const DEFAULT_BOOT_GRACE: Duration = Duration::from_secs(20);

const DEFAULT_EVENT_CAPACITY: usize = 16;

/// Fluent builder for [`Amplifier`].
///
/// Every setting has a default matching the amplifier's fixed protocol, so
/// the simplest usage is:
///
/// ```ignore
/// let amp = AmplifierBuilder::new().build().await?;
/// ```
#[derive(Debug, Clone)]
pub struct AmplifierBuilder {
    bind_address: IpAddr,
    status_port: u16,
    command_port: u16,
    receive_timeout: Duration,
    repeat_count: usize,
    boot_grace: Duration,
    event_capacity: usize,
}

impl AmplifierBuilder {
    /// Create a builder with the default settings:
    /// - bind_address: 0.0.0.0
    /// - status_port: 45454
    /// - command_port: 45455
    /// - receive_timeout: 2s
    /// - repeat_count: 4
    /// - boot_grace: 20s
    pub fn new() -> Self {
        AmplifierBuilder {
            bind_address: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            status_port: STATUS_PORT,
            command_port: COMMAND_PORT,
            receive_timeout: DEFAULT_RECEIVE_TIMEOUT,
            repeat_count: DEFAULT_REPEAT,
            boot_grace: DEFAULT_BOOT_GRACE,
            event_capacity: DEFAULT_EVENT_CAPACITY,
        }
    }

    /// Local interface to listen for status broadcasts on.
    pub fn bind_address(mut self, addr: IpAddr) -> Self {
        self.bind_address = addr;
        self
    }

    /// Local UDP port to receive status on (default: 45454).
    pub fn status_port(mut self, port: u16) -> Self {
        self.status_port = port;
        self
    }

    /// Amplifier UDP port to send commands to (default: 45455).
    pub fn command_port(mut self, port: u16) -> Self {
        self.command_port = port;
        self
    }

    /// How long each poll waits for a status datagram (default: 2s).
    pub fn receive_timeout(mut self, timeout: Duration) -> Self {
        self.receive_timeout = timeout;
        self
    }

    /// Copies of each command datagram to send (default: 4).
    pub fn repeat_count(mut self, n: usize) -> Self {
        self.repeat_count = n;
        self
    }

    /// How long after a power-on request further power toggles are ignored
    /// (default: 20s). `Duration::ZERO` disables the grace period.
    pub fn boot_grace(mut self, grace: Duration) -> Self {
        self.boot_grace = grace;
        self
    }

    /// Capacity of the event broadcast channel (default: 16).
    pub fn event_capacity(mut self, capacity: usize) -> Self {
        self.event_capacity = capacity;
        self
    }

    /// Bind the status socket and build an [`Amplifier`].
    pub async fn build(self) -> Result<Amplifier> {
        self.validate()?;
        let local = SocketAddr::new(self.bind_address, self.status_port);
        let transport = devimote_transport::UdpTransport::bind(local).await?;
        self.build_with_transport(Box::new(transport))
    }

    /// Build an [`Amplifier`] with a caller-provided transport.
    ///
    /// This is the entry point for testing (pass a `MockDatagramTransport`
    /// from `devimote-test-harness`) and for callers that manage the socket
    /// themselves.
    pub fn build_with_transport(self, transport: Box<dyn DatagramTransport>) -> Result<Amplifier> {
        self.validate()?;
        tracing::debug!(
            command_port = self.command_port,
            timeout_ms = self.receive_timeout.as_millis(),
            repeat = self.repeat_count,
            "Amplifier engine ready"
        );
        Ok(Amplifier::new(
            transport,
            self.command_port,
            self.receive_timeout,
            self.repeat_count,
            self.boot_grace,
            self.event_capacity,
        ))
    }

    fn validate(&self) -> Result<()> {
        if self.repeat_count == 0 {
            return Err(Error::InvalidParameter(
                "repeat_count must be at least 1".into(),
            ));
        }
        if self.receive_timeout.is_zero() {
            return Err(Error::InvalidParameter(
                "receive_timeout must be non-zero".into(),
            ));
        }
        if self.event_capacity == 0 {
            return Err(Error::InvalidParameter(
                "event_capacity must be at least 1".into(),
            ));
        }
        Ok(())
    }
}

impl Default for AmplifierBuilder {
    fn default() -> Self {
        Self::new()
    }
}
