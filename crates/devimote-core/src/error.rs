//! Error types for devimote.
//!
//! All fallible operations across the workspace return [`Result<T>`], which
//! uses [`Error`] as the error type. Socket failures, malformed status
//! packets, and caller mistakes are all captured here.

/// The error type for all devimote operations.
///
/// Note that a receive timeout and a checksum mismatch are *not* surfaced
/// from a poll: the engine folds them into the returned
/// [`DeviceStatus`](crate::types::DeviceStatus) (`connected` and
/// `checksum_ok` respectively). [`Error::Timeout`] only escapes from the raw
/// transport layer.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The status datagram could not be interpreted.
    ///
    /// Raised for short datagrams and for name or channel fields that are
    /// not valid UTF-8. Usually a firmware/protocol version mismatch.
    #[error("malformed payload: {0}")]
    MalformedPayload(String),

    /// Timed out waiting for a status datagram.
    #[error("timeout waiting for status")]
    Timeout,

    /// An invalid parameter was passed to an engine operation.
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    /// An output was requested by name, but no known channel carries it.
    #[error("no channel named {0:?}")]
    NoMatchingChannel(String),

    /// An underlying I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// A convenience `Result` alias using [`Error`] as the error type.
pub type Result<T> = std::result::Result<T, Error>;
