//! Server-side session error taxonomy.

use thiserror::Error;

/// Errors that can terminate a server session.
#[derive(Debug, Error)]
pub enum ServerError {
    /// Framing/transport failure (malformed header, oversized frame, I/O).
    #[error(transparent)]
    Transport(#[from] wow_transport::TransportError),

    /// The connection manager has already begun shutting down.
    #[error(transparent)]
    Core(#[from] wow_core::CoreError),

    /// A `WoWRequest` arrived before the client completed its handshake.
    #[error("client requested the quote before completing the handshake")]
    UnverifiedClient,

    /// A frame arrived with a type-id not valid at this point in the
    /// session.
    #[error("unexpected message type at this point in the session")]
    UnexpectedMessage,

    /// The session was forcefully stopped by the connection manager during
    /// shutdown.
    #[error("session stopped by the connection manager")]
    Stopped,
}
