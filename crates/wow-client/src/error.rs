//! Client-side session error taxonomy.

use thiserror::Error;

/// Errors that can terminate a client session.
#[derive(Debug, Error)]
pub enum ClientError {
    /// Framing/transport failure (malformed header, oversized frame, I/O).
    #[error(transparent)]
    Transport(#[from] wow_transport::TransportError),

    /// Minting the proof of work failed or was cancelled.
    #[error(transparent)]
    Hashcash(#[from] wow_hashcash::HashcashError),

    /// A frame arrived with a type-id not valid at this point in the
    /// session.
    #[error("unexpected message type at this point in the session")]
    UnexpectedMessage,

    /// The server closed the connection before completing the handshake.
    #[error("server closed the connection before sending a word of wisdom")]
    ServerClosed,
}
