//! Frame-oriented transport: ping/pong liveness and half-close layered atop
//! any `AsyncRead + AsyncWrite` byte stream.

#![cfg_attr(test, allow(clippy::unwrap_used, clippy::expect_used, clippy::panic))]

mod error;
mod transport;

pub use error::TransportError;
pub use transport::{DEFAULT_MAX_FRAME_SIZE, FrameEvent, Transport};
