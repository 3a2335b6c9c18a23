//! Transport-level error taxonomy.

use thiserror::Error;
use wow_wire::WireError;

/// Errors raised by [`crate::Transport`]. None of these include `ErrClose`:
/// an orderly close is signaled through [`crate::FrameEvent::Closed`], never
/// as an error, so callers can't accidentally propagate it with `?`.
#[derive(Debug, Error)]
pub enum TransportError {
    /// The frame header or message body was malformed.
    #[error(transparent)]
    Wire(#[from] WireError),

    /// A data frame's declared size exceeded the transport's configured
    /// maximum.
    #[error("frame of {size} bytes exceeds the {max}-byte limit")]
    FrameTooLarge {
        /// The declared (or attempted) size.
        size: u32,
        /// The configured maximum.
        max: u32,
    },

    /// A keep-alive `Ping` was not answered with a `Pong` as the very next
    /// frame.
    #[error("expected a Pong keep-alive reply, got something else")]
    ExpectedPong,
}
