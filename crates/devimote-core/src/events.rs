//! Asynchronous amplifier event types.
//!
//! Events are emitted by the engine through a `tokio::sync::broadcast`
//! channel when a poll observes a change. Front ends subscribe to these to
//! refresh only what changed.

/// An event emitted by the engine when amplifier state changes.
///
/// Delivered on a best-effort basis through a bounded broadcast channel;
/// slow consumers may miss events.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AmpEvent {
    /// A status reply arrived after a period without one.
    Connected,

    /// A poll timed out after the amplifier had been answering.
    Disconnected,

    /// Power state changed.
    PowerChanged {
        /// `true` if the amplifier is now on.
        on: bool,
    },

    /// Mute state changed.
    MuteChanged {
        /// `true` if the output is now muted.
        muted: bool,
    },

    /// The raw volume byte changed.
    VolumeChanged {
        /// New raw volume byte.
        register: u8,
    },

    /// A different input channel was selected.
    ChannelChanged {
        /// New active slot index.
        index: u8,
    },

    /// A status packet failed its CRC check.
    ChecksumMismatch,
}
