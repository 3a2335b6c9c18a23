//! Client-side state machine: receive the challenge, mint a proof of work in
//! the background while keeping the connection alive, then redeem it for a
//! quote.

use std::time::Duration;

use tokio::io::{AsyncRead, AsyncWrite};
use tokio_util::sync::CancellationToken;
use wow_transport::{FrameEvent, Transport};
use wow_wire::{Message, TypeId};

use crate::error::ClientError;

/// Cadence of the `Ping` frames sent while a mint is in flight.
pub const KEEP_ALIVE_INTERVAL: Duration = Duration::from_secs(10);

/// Runs one client session to completion: handshake, mint, redeem. Returns
/// the word of wisdom on success.
///
/// # Errors
///
/// Returns [`ClientError`] on any protocol violation, transport failure, or
/// mint failure.
pub async fn run_client_session<S>(stream: S, workers: u32) -> Result<String, ClientError>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let mut transport = Transport::new(stream);

    let (challenge, complexity) = match transport.read_frame().await? {
        FrameEvent::Data { type_id: TypeId::ServerHandshake, payload } => {
            let decoded = Message::decode(TypeId::ServerHandshake, &payload).map_err(wow_transport::TransportError::Wire)?;
            let Message::ServerHandshake(handshake) = decoded else {
                unreachable!("decode(ServerHandshake) always yields ServerHandshake");
            };
            (handshake.challenge, handshake.complexity)
        },
        FrameEvent::Data { .. } => return Err(ClientError::UnexpectedMessage),
        FrameEvent::Closed => return Err(ClientError::ServerClosed),
    };

    let nonce = mint_with_keepalive(&mut transport, &challenge, complexity, workers).await?;

    let handshake = Message::ClientHandshake(wow_wire::ClientHandshake { nonce: nonce.to_vec() });
    transport.write_frame(handshake.type_id(), &handshake.encode()).await?;

    let request = Message::WoWRequest(wow_wire::WoWRequest);
    transport.write_frame(request.type_id(), &request.encode()).await?;

    let quote = loop {
        match transport.read_frame().await? {
            FrameEvent::Data { type_id: TypeId::WoWResponse, payload } => {
                let decoded = Message::decode(TypeId::WoWResponse, &payload).map_err(wow_transport::TransportError::Wire)?;
                let Message::WoWResponse(response) = decoded else {
                    unreachable!("decode(WoWResponse) always yields WoWResponse");
                };
                break response.wow;
            },
            FrameEvent::Data { .. } => continue,
            FrameEvent::Closed => return Err(ClientError::ServerClosed),
        }
    };

    transport.close().await?;
    Ok(quote)
}

/// Mints a nonce in the background, sending a `Ping` every
/// [`KEEP_ALIVE_INTERVAL`] while the mint is still running so the connection
/// doesn't sit idle during a long, high-complexity search.
async fn mint_with_keepalive<S>(
    transport: &mut Transport<S>,
    challenge: &[u8],
    complexity: u32,
    workers: u32,
) -> Result<[u8; 8], ClientError>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    mint_with_keepalive_interval(transport, challenge, complexity, workers, KEEP_ALIVE_INTERVAL).await
}

/// The guts of [`mint_with_keepalive`], with the tick cadence broken out so
/// tests can drive it on a short interval instead of waiting on the real
/// 10-second cadence.
///
/// Each tick sends a `Ping` and then requires the very next frame to be the
/// matching `Pong`; anything else (a stray data frame, a close, a malformed
/// header) is a protocol error and aborts the mint.
async fn mint_with_keepalive_interval<S>(
    transport: &mut Transport<S>,
    challenge: &[u8],
    complexity: u32,
    workers: u32,
    interval: Duration,
) -> Result<[u8; 8], ClientError>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let cancel = CancellationToken::new();
    let mint_future = wow_hashcash::mint(challenge, complexity, workers, cancel.clone());
    tokio::pin!(mint_future);

    let mut ticker = tokio::time::interval(interval);
    ticker.tick().await;

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                if let Err(error) = transport.ping().await {
                    cancel.cancel();
                    return Err(error.into());
                }
                if let Err(error) = transport.expect_pong().await {
                    cancel.cancel();
                    return Err(error.into());
                }
            },
            result = &mut mint_future => {
                return Ok(result?);
            },
        }
    }
}
