//! TLV frame header codec and the four-message wire schema for the
//! word-of-wisdom protocol.
//!
//! This crate is pure codec: it knows how to read/write a [`header::FrameHeader`]
//! off a stream and how to encode/decode the [`messages::Message`] variants
//! that travel inside `Data` frames. It has no opinion on ping/pong handling,
//! half-close, or session state — see `wow-transport` and the session state
//! machines in `wow-server`/`wow-client` for that.

#![cfg_attr(test, allow(clippy::unwrap_used, clippy::expect_used, clippy::panic))]

mod error;
mod header;
mod messages;

pub use error::WireError;
pub use header::{FrameHeader, OpCode, read_frame_header, write_frame_header};
pub use messages::{ClientHandshake, Message, ServerHandshake, TypeId, WoWRequest, WoWResponse};
