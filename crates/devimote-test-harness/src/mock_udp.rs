//! Mock datagram transport for deterministic testing of the engine.
//!
//! [`MockDatagramTransport`] implements [`DatagramTransport`] with a
//! scripted queue of inbound events (status datagrams, timeouts, socket
//! errors) and a log of every datagram sent. Clones share state, so a test
//! keeps one clone for inspection and moves the other into the engine.
//!
//! # Example
//!
//! ```
//! use devimote_core::DeviceStatus;
//! use devimote_test_harness::MockDatagramTransport;
//!
//! let mock = MockDatagramTransport::new();
//! let status = DeviceStatus {
//!     device_name: "Expert 220".into(),
//!     ..DeviceStatus::default()
//! };
//! mock.push_status(&status, "192.168.1.40:45454".parse().unwrap());
//! mock.push_timeout();
//! assert_eq!(mock.pending_inbound(), 2);
//! ```

use async_trait::async_trait;
use std::collections::VecDeque;
use std::io;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use devimote_core::error::{Error, Result};
use devimote_core::transport::DatagramTransport;
use devimote_core::types::DeviceStatus;
use devimote_protocol::status::encode_status;

/// One datagram recorded by [`MockDatagramTransport::send_to`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentDatagram {
    /// The bytes that were sent.
    pub data: Vec<u8>,
    /// The destination address.
    pub to: SocketAddr,
}

/// A scripted result for the next `recv_from()` call.
#[derive(Debug)]
enum Inbound {
    Datagram { data: Vec<u8>, from: SocketAddr },
    Timeout,
    Failure(io::ErrorKind),
}

#[derive(Debug, Default)]
struct MockState {
    inbound: VecDeque<Inbound>,
    sent: Vec<SentDatagram>,
    send_failure: Option<io::ErrorKind>,
}

/// A recording [`DatagramTransport`] for tests.
///
/// When the inbound queue is empty, `recv_from()` behaves like a quiet
/// network and returns [`Error::Timeout`].
#[derive(Debug, Clone, Default)]
pub struct MockDatagramTransport {
    state: Arc<Mutex<MockState>>,
}

impl MockDatagramTransport {
    /// Create a mock with nothing queued.
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, MockState> {
        // A panicking test thread poisons the lock; the data is still usable.
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Queue a raw datagram from `from`.
    pub fn push_datagram(&self, data: &[u8], from: SocketAddr) {
        self.state().inbound.push_back(Inbound::Datagram {
            data: data.to_vec(),
            from,
        });
    }

    /// Queue a well-formed status packet describing `status`, sent from `from`.
    ///
    /// # Panics
    ///
    /// Panics if `status` cannot be encoded (name too long, channel out of
    /// range). That is a bug in the test, not in the code under test.
    pub fn push_status(&self, status: &DeviceStatus, from: SocketAddr) {
        let packet = match encode_status(status) {
            Ok(packet) => packet,
            Err(e) => panic!("cannot encode test status: {e}"),
        };
        self.push_datagram(&packet, from);
    }

    /// Queue a receive timeout.
    pub fn push_timeout(&self) {
        self.state().inbound.push_back(Inbound::Timeout);
    }

    /// Queue a socket error of the given kind.
    pub fn push_recv_error(&self, kind: io::ErrorKind) {
        self.state().inbound.push_back(Inbound::Failure(kind));
    }

    /// Make the next `send_to()` fail with `kind`. The failed datagram is
    /// not recorded.
    pub fn fail_next_send(&self, kind: io::ErrorKind) {
        self.state().send_failure = Some(kind);
    }

    /// Number of inbound events not yet consumed.
    pub fn pending_inbound(&self) -> usize {
        self.state().inbound.len()
    }

    /// Every datagram sent so far, oldest first.
    pub fn sent(&self) -> Vec<SentDatagram> {
        self.state().sent.clone()
    }

    /// Number of datagrams sent so far.
    pub fn sent_count(&self) -> usize {
        self.state().sent.len()
    }

    /// Forget the sent log.
    pub fn clear_sent(&self) {
        self.state().sent.clear();
    }
}

#[async_trait]
impl DatagramTransport for MockDatagramTransport {
    async fn send_to(&mut self, data: &[u8], addr: SocketAddr) -> Result<()> {
        let mut state = self.state();
        if let Some(kind) = state.send_failure.take() {
            return Err(Error::Io(io::Error::new(kind, "mock send failure")));
        }
        state.sent.push(SentDatagram {
            data: data.to_vec(),
            to: addr,
        });
        Ok(())
    }

    async fn recv_from(
        &mut self,
        buf: &mut [u8],
        _timeout: Duration,
    ) -> Result<(usize, SocketAddr)> {
        let next = self.state().inbound.pop_front();
        match next {
            Some(Inbound::Datagram { data, from }) => {
                // Standard UDP behaviour: excess bytes are discarded.
                let n = data.len().min(buf.len());
                buf[..n].copy_from_slice(&data[..n]);
                Ok((n, from))
            }
            Some(Inbound::Failure(kind)) => {
                Err(Error::Io(io::Error::new(kind, "mock receive failure")))
            }
            Some(Inbound::Timeout) | None => Err(Error::Timeout),
        }
    }
}
