//! Frame-oriented transport atop a byte stream.
//!
//! Owns a single bidirectional stream exclusively (no cross-session sharing).
//! Control frames (`Ping`/`Pong`/`Close`) are handled transparently inside
//! [`Transport::read_frame`] so callers only ever see data frames or the
//! [`FrameEvent::Closed`] sentinel.

use bytes::Bytes;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use wow_wire::{FrameHeader, OpCode, TypeId, read_frame_header, write_frame_header};

use crate::error::TransportError;

/// Default per-frame payload size limit (§4.2).
pub const DEFAULT_MAX_FRAME_SIZE: u32 = 65536;

/// Outcome of [`Transport::read_frame`]: either a decoded data frame or the
/// orderly-close sentinel. `Closed` is deliberately not a `TransportError`
/// variant — see the open-question resolution in `DESIGN.md`.
#[derive(Debug)]
pub enum FrameEvent {
    /// A `Data` frame's type-id and raw (still-encoded) payload.
    Data {
        /// The payload's message type.
        type_id: TypeId,
        /// The encoded message body.
        payload: Bytes,
    },
    /// The peer sent `Close`.
    Closed,
}

/// A frame-oriented reader/writer over a single `AsyncRead + AsyncWrite`
/// stream, generalized over the stream type so the same implementation
/// serves both the server (accepted `TcpStream`) and the client (connected
/// `TcpStream`), and so tests can drive it over an in-memory duplex pipe.
pub struct Transport<S> {
    stream: S,
    max_frame_size: u32,
}

impl<S> Transport<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    /// Wraps `stream` with the default max frame size.
    pub fn new(stream: S) -> Self {
        Self::with_max_frame_size(stream, DEFAULT_MAX_FRAME_SIZE)
    }

    /// Wraps `stream`, rejecting data frames larger than `max_frame_size`.
    pub fn with_max_frame_size(stream: S, max_frame_size: u32) -> Self {
        Self { stream, max_frame_size }
    }

    /// Reads one frame, replying to `Ping` and swallowing `Pong`
    /// transparently. Returns the next data frame or [`FrameEvent::Closed`].
    pub async fn read_frame(&mut self) -> Result<FrameEvent, TransportError> {
        loop {
            let header = read_frame_header(&mut self.stream).await?;
            match header.opcode() {
                OpCode::Ping => {
                    write_frame_header(&mut self.stream, &FrameHeader::control(OpCode::Pong)).await?;
                    self.stream.flush().await.map_err(|error| TransportError::Wire(wow_wire::WireError::Io(error)))?;
                },
                OpCode::Pong => {},
                OpCode::Close => return Ok(FrameEvent::Closed),
                OpCode::Data => {
                    if header.payload_size() > self.max_frame_size {
                        return Err(TransportError::FrameTooLarge {
                            size: header.payload_size(),
                            max: self.max_frame_size,
                        });
                    }
                    let mut payload = vec![0u8; header.payload_size() as usize];
                    self.stream.read_exact(&mut payload).await.map_err(|error| TransportError::Wire(wow_wire::WireError::Io(error)))?;
                    let type_id = TypeId::from_u16(header.payload_type())?;
                    return Ok(FrameEvent::Data { type_id, payload: Bytes::from(payload) });
                },
            }
        }
    }

    /// Writes one data frame. `payload` may be empty (§4.2's `size==0` case:
    /// only the header is written).
    ///
    /// Translated from the original's size-then-callback `NextWriter` shape:
    /// since every message here is fully buffered up front, the declared
    /// size always matches what's written, so `ThresholdExceeded`/
    /// `UncompletedWrite` cannot occur and have no counterpart here.
    pub async fn write_frame(&mut self, type_id: TypeId, payload: &[u8]) -> Result<(), TransportError> {
        let size = u32::try_from(payload.len())
            .map_err(|_| TransportError::FrameTooLarge { size: u32::MAX, max: self.max_frame_size })?;
        if size > self.max_frame_size {
            return Err(TransportError::FrameTooLarge { size, max: self.max_frame_size });
        }

        let header = FrameHeader::data(size, type_id.to_u16());
        write_frame_header(&mut self.stream, &header).await?;
        if size > 0 {
            self.stream
                .write_all(payload)
                .await
                .map_err(|error| TransportError::Wire(wow_wire::WireError::Io(error)))?;
        }
        self.stream.flush().await.map_err(|error| TransportError::Wire(wow_wire::WireError::Io(error)))?;
        Ok(())
    }

    /// Writes a `Ping` and flushes.
    pub async fn ping(&mut self) -> Result<(), TransportError> {
        write_frame_header(&mut self.stream, &FrameHeader::control(OpCode::Ping)).await?;
        self.stream.flush().await.map_err(|error| TransportError::Wire(wow_wire::WireError::Io(error)))?;
        Ok(())
    }

    /// Reads exactly one frame header and requires it to be a `Pong`,
    /// erroring on anything else (a data frame, a close, or a malformed
    /// header). Unlike [`Self::read_frame`], which swallows `Pong`
    /// transparently for callers with no reason to care about keep-alive
    /// traffic, this is for a caller that just sent `Ping` and needs to
    /// observe the reply itself, surfacing a misbehaving peer as a
    /// protocol error instead of silently discarding it.
    pub async fn expect_pong(&mut self) -> Result<(), TransportError> {
        let header = read_frame_header(&mut self.stream).await?;
        if header.opcode() == OpCode::Pong {
            Ok(())
        } else {
            Err(TransportError::ExpectedPong)
        }
    }

    /// Initiates half-close: writes `Close`, flushes, then waits for the
    /// peer's reply frame. Always succeeds — per §4.2, `ErrClose` signals
    /// the half-closed state unconditionally, it is never propagated as an
    /// error to the caller.
    pub async fn close(&mut self) -> Result<(), TransportError> {
        write_frame_header(&mut self.stream, &FrameHeader::control(OpCode::Close)).await?;
        self.stream.flush().await.map_err(|error| TransportError::Wire(wow_wire::WireError::Io(error)))?;

        match self.read_frame().await {
            Ok(FrameEvent::Closed) => {},
            Ok(FrameEvent::Data { .. }) => {
                tracing::warn!("peer sent data instead of close during half-close");
            },
            Err(error) => {
                tracing::debug!(%error, "error awaiting peer close, proceeding anyway");
            },
        }
        Ok(())
    }

    /// Returns the underlying stream, consuming the transport.
    pub fn into_inner(self) -> S {
        self.stream
    }
}

#[cfg(test)]
mod tests {
    use tokio::io::duplex;
    use wow_wire::Message;

    use super::*;

    #[tokio::test]
    async fn write_then_read_data_frame() {
        let (a, b) = duplex(256);
        let mut server = Transport::new(a);
        let mut client = Transport::new(b);

        let msg = Message::WoWRequest(wow_wire::WoWRequest);
        server.write_frame(msg.type_id(), &msg.encode()).await.unwrap();

        match client.read_frame().await.unwrap() {
            FrameEvent::Data { type_id, payload } => {
                assert_eq!(type_id, TypeId::WoWRequest);
                assert!(payload.is_empty());
            },
            FrameEvent::Closed => panic!("expected data frame"),
        }
    }

    #[tokio::test]
    async fn ping_is_answered_with_pong_transparently() {
        let (a, b) = duplex(256);
        let mut pinger = Transport::new(a);
        let mut ponger = Transport::new(b);

        pinger.ping().await.unwrap();

        // Ponger's read_frame should reply with Pong and then need another
        // frame to return anything to its caller; drive it concurrently
        // with a frame from the pinger side so read_frame can return.
        let writer = tokio::spawn(async move {
            let msg = Message::WoWRequest(wow_wire::WoWRequest);
            pinger.write_frame(msg.type_id(), &msg.encode()).await.unwrap();
            pinger
        });

        let event = ponger.read_frame().await.unwrap();
        assert!(matches!(event, FrameEvent::Data { type_id: TypeId::WoWRequest, .. }));

        let mut pinger = writer.await.unwrap();
        // The Pong the ponger sent back should be swallowed transparently,
        // and the data frame the ponger writes next should arrive clean.
        let msg = Message::WoWRequest(wow_wire::WoWRequest);
        // Confirm the pong didn't corrupt framing by sending one more frame
        // in each direction.
        pinger.write_frame(msg.type_id(), &msg.encode()).await.unwrap();
        let event = ponger.read_frame().await.unwrap();
        assert!(matches!(event, FrameEvent::Data { .. }));
    }

    #[tokio::test]
    async fn expect_pong_accepts_a_pong_reply() {
        let (a, b) = duplex(256);
        let mut pinger = Transport::new(a);
        let mut ponger = Transport::new(b);

        pinger.ping().await.unwrap();
        // The ponger's own read_frame loop is what transparently answers the
        // Ping with a Pong; it then blocks waiting for a further frame that
        // never arrives, which is fine, the task is dropped with the test.
        tokio::spawn(async move {
            let _ = ponger.read_frame().await;
        });

        pinger.expect_pong().await.unwrap();
    }

    #[tokio::test]
    async fn expect_pong_rejects_a_data_frame() {
        let (a, b) = duplex(256);
        let mut sender = Transport::new(a);
        let mut receiver = Transport::new(b);

        let msg = Message::WoWRequest(wow_wire::WoWRequest);
        sender.write_frame(msg.type_id(), &msg.encode()).await.unwrap();

        let result = receiver.expect_pong().await;
        assert!(matches!(result, Err(TransportError::ExpectedPong)));
    }

    #[tokio::test]
    async fn close_handshake_resolves_to_closed_sentinel() {
        let (a, b) = duplex(256);
        let mut initiator = Transport::new(a);
        let mut responder = Transport::new(b);

        let responder_task = tokio::spawn(async move {
            let event = responder.read_frame().await.unwrap();
            assert!(matches!(event, FrameEvent::Closed));
            responder.close().await.unwrap();
        });

        initiator.close().await.unwrap();
        responder_task.await.unwrap();
    }

    #[tokio::test]
    async fn oversized_frame_is_rejected() {
        let (a, b) = duplex(256);
        let mut writer = Transport::with_max_frame_size(a, 4);
        let mut reader = Transport::with_max_frame_size(b, 4);

        tokio::spawn(async move {
            let header = FrameHeader::data(5, TypeId::WoWRequest.to_u16());
            write_frame_header(&mut writer.into_inner(), &header).await.unwrap();
        });

        let result = reader.read_frame().await;
        assert!(matches!(result, Err(TransportError::FrameTooLarge { size: 5, max: 4 })));
    }

    #[tokio::test]
    async fn zero_length_payload_writes_header_only() {
        let (a, b) = duplex(256);
        let mut writer = Transport::new(a);
        let mut reader = Transport::new(b);

        writer.write_frame(TypeId::WoWRequest, &[]).await.unwrap();
        let event = reader.read_frame().await.unwrap();
        assert!(matches!(event, FrameEvent::Data { payload, .. } if payload.is_empty()));
    }
}
