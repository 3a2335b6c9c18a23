//! Server-side per-connection state machine (register → handshake →
//! verify/reply loop → teardown).

use std::net::IpAddr;
use std::time::Duration;

use tokio::net::TcpStream;
use tokio_util::sync::CancellationToken;
use wow_core::{Challenge, ConnectionManager, Limiter, QuoteSource, Stopper};
use wow_transport::{FrameEvent, Transport};
use wow_wire::{Message, TypeId};

use crate::error::ServerError;

/// Default per-I/O read/write deadline, re-armed on every operation.
pub const DEFAULT_READ_DEADLINE: Duration = Duration::from_secs(15);

/// What the session accomplished before terminating, for the per-connection
/// teardown summary log line.
#[derive(Debug, Default, Clone, Copy)]
pub struct SessionOutcome {
    /// Whether the client ever produced a valid PoW nonce.
    pub verified: bool,
    /// Whether a quote was actually sent.
    pub wow_sent: bool,
    /// Whether the session was torn down as a "bad actor" (RST via
    /// linger-0) rather than an orderly close.
    pub dropped: bool,
}

struct TokenStopper(CancellationToken);

impl Stopper for TokenStopper {
    fn stop(&self) {
        self.0.cancel();
    }
}

/// Runs one accepted connection to completion.
///
/// # Errors
///
/// Returns [`ServerError`] for protocol violations and transport failures
/// that are not one of the two designed-for "drop" paths (manager closed,
/// rate limit rejected) — those are folded into `SessionOutcome::dropped`
/// instead of a propagated error, matching the "mark drop, exit" steps of
/// the server session.
pub async fn run_server_session(
    stream: TcpStream,
    peer_ip: IpAddr,
    manager: &ConnectionManager,
    limiter: &Limiter,
    quotes: &QuoteSource,
    complexity: u32,
    read_deadline: Duration,
) -> Result<SessionOutcome, ServerError> {
    let cancel = CancellationToken::new();
    let session_id = match manager.track(Box::new(TokenStopper(cancel.clone()))) {
        Ok(id) => id,
        Err(_manager_closed) => {
            drop_connection(stream);
            return Ok(SessionOutcome { dropped: true, ..SessionOutcome::default() });
        },
    };

    let outcome = run_inner(stream, peer_ip, limiter, quotes, complexity, read_deadline, &cancel).await;

    manager.untrack(session_id);

    let (outcome, unverified) = match outcome {
        Ok(outcome) => {
            let unverified = !outcome.verified;
            (Ok(outcome), unverified)
        },
        Err(error) => (Err(error), true),
    };
    if unverified {
        limiter.spend(peer_ip);
    }
    outcome
}

#[allow(unused_assignments)]
async fn run_inner(
    stream: TcpStream,
    peer_ip: IpAddr,
    limiter: &Limiter,
    quotes: &QuoteSource,
    complexity: u32,
    read_deadline: Duration,
    cancel: &CancellationToken,
) -> Result<SessionOutcome, ServerError> {
    if !limiter.try_reserve(peer_ip) {
        drop_connection(stream);
        return Ok(SessionOutcome { dropped: true, ..SessionOutcome::default() });
    }

    let mut transport = Transport::new(stream);
    let challenge = Challenge::generate();

    let handshake = Message::ServerHandshake(wow_wire::ServerHandshake {
        challenge: challenge.as_bytes().to_vec(),
        complexity,
    });
    if send(&mut transport, &handshake, read_deadline, cancel).await.is_err() {
        drop_tcp(transport);
        return Ok(SessionOutcome { dropped: true, ..SessionOutcome::default() });
    }

    let mut outcome = SessionOutcome::default();
    loop {
        let event = match recv(&mut transport, read_deadline, cancel).await {
            Ok(event) => event,
            Err(error) => {
                outcome.dropped = true;
                drop_tcp(transport);
                return Err(error);
            },
        };

        match event {
            FrameEvent::Closed => break,
            FrameEvent::Data { type_id: TypeId::ClientHandshake, payload } => {
                let decoded = Message::decode(TypeId::ClientHandshake, &payload)
                    .map_err(wow_transport::TransportError::Wire);
                let handshake = match decoded {
                    Ok(Message::ClientHandshake(handshake)) => handshake,
                    Ok(_) => unreachable!("decode(ClientHandshake) always yields ClientHandshake"),
                    Err(error) => {
                        outcome.dropped = true;
                        drop_tcp(transport);
                        return Err(error.into());
                    },
                };
                if handshake.nonce.len() != 8 {
                    outcome.dropped = true;
                    drop_tcp(transport);
                    return Err(ServerError::UnexpectedMessage);
                }
                let mut nonce = [0u8; 8];
                nonce.copy_from_slice(&handshake.nonce);
                if let Err(error) = wow_core::pow::verify(&challenge, &nonce, complexity) {
                    outcome.dropped = true;
                    drop_tcp(transport);
                    return Err(ServerError::Core(error));
                }
                outcome.verified = true;
            },
            FrameEvent::Data { type_id: TypeId::WoWRequest, .. } => {
                if !outcome.verified {
                    outcome.dropped = true;
                    drop_tcp(transport);
                    return Err(ServerError::UnverifiedClient);
                }
                let quote = quotes.next();
                let response = Message::WoWResponse(wow_wire::WoWResponse { wow: quote.to_owned() });
                if send(&mut transport, &response, read_deadline, cancel).await.is_err() {
                    outcome.dropped = true;
                    drop_tcp(transport);
                    return Ok(outcome);
                }
                outcome.wow_sent = true;
                break;
            },
            FrameEvent::Data { .. } => {
                outcome.dropped = true;
                drop_tcp(transport);
                return Err(ServerError::UnexpectedMessage);
            },
        }
    }

    let _ = transport.close().await;
    Ok(outcome)
}

async fn send(
    transport: &mut Transport<TcpStream>,
    message: &Message,
    deadline: Duration,
    cancel: &CancellationToken,
) -> Result<(), ServerError> {
    let encoded = message.encode();
    tokio::select! {
        () = cancel.cancelled() => Err(ServerError::Stopped),
        result = tokio::time::timeout(deadline, transport.write_frame(message.type_id(), &encoded)) => {
            result.map_err(|_elapsed| timeout_error())??;
            Ok(())
        }
    }
}

fn timeout_error() -> wow_transport::TransportError {
    wow_transport::TransportError::Wire(wow_wire::WireError::Io(std::io::ErrorKind::TimedOut.into()))
}

async fn recv(
    transport: &mut Transport<TcpStream>,
    deadline: Duration,
    cancel: &CancellationToken,
) -> Result<FrameEvent, ServerError> {
    tokio::select! {
        () = cancel.cancelled() => Err(ServerError::Stopped),
        result = tokio::time::timeout(deadline, transport.read_frame()) => {
            let event = result.map_err(|_elapsed| timeout_error())??;
            Ok(event)
        }
    }
}

/// Drops a raw (not-yet-wrapped) connection with linger-0 so the kernel
/// sends RST instead of FIN.
#[allow(deprecated)]
fn drop_connection(stream: TcpStream) {
    if let Err(error) = stream.set_linger(Some(Duration::ZERO)) {
        tracing::debug!(%error, "failed to set linger(0) on dropped connection");
    }
}

fn drop_tcp(transport: Transport<TcpStream>) {
    drop_connection(transport.into_inner());
}

#[cfg(test)]
mod tests {
    use tokio::net::{TcpListener, TcpStream};
    use wow_hashcash::mint;

    use super::*;

    async fn loopback_pair() -> (TcpStream, TcpStream) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let accept = tokio::spawn(async move { listener.accept().await.unwrap().0 });
        let client = TcpStream::connect(addr).await.unwrap();
        (accept.await.unwrap(), client)
    }

    #[tokio::test]
    async fn unverified_wow_request_is_dropped_without_a_response() {
        let (server_stream, client_stream) = loopback_pair().await;
        let manager = ConnectionManager::new();
        let limiter = Limiter::default();
        let quotes = QuoteSource::default();

        let server = tokio::spawn(async move {
            run_server_session(server_stream, "127.0.0.1".parse().unwrap(), &manager, &limiter, &quotes, 0, Duration::from_secs(5)).await
        });

        let mut client = Transport::new(client_stream);
        match client.read_frame().await.unwrap() {
            FrameEvent::Data { type_id: TypeId::ServerHandshake, .. } => {},
            other => panic!("expected ServerHandshake, got {other:?}"),
        }
        let request = Message::WoWRequest(wow_wire::WoWRequest);
        client.write_frame(request.type_id(), &request.encode()).await.unwrap();

        let outcome = tokio::time::timeout(Duration::from_secs(2), server).await.unwrap().unwrap();
        assert!(matches!(outcome, Err(ServerError::UnverifiedClient)));
    }

    #[tokio::test]
    async fn golden_path_verifies_and_sends_a_quote() {
        let (server_stream, client_stream) = loopback_pair().await;
        let manager = ConnectionManager::new();
        let limiter = Limiter::default();
        let quotes = QuoteSource::default();

        let server = tokio::spawn(async move {
            run_server_session(server_stream, "127.0.0.1".parse().unwrap(), &manager, &limiter, &quotes, 0, Duration::from_secs(5)).await
        });

        let mut client = Transport::new(client_stream);
        let challenge = match client.read_frame().await.unwrap() {
            FrameEvent::Data { type_id: TypeId::ServerHandshake, payload } => {
                let Message::ServerHandshake(handshake) =
                    Message::decode(TypeId::ServerHandshake, &payload).unwrap()
                else {
                    panic!("wrong variant");
                };
                handshake
            },
            other => panic!("expected ServerHandshake, got {other:?}"),
        };

        let cancel = CancellationToken::new();
        let mut challenge_bytes = [0u8; 24];
        challenge_bytes.copy_from_slice(&challenge.challenge);
        let nonce = mint(&challenge_bytes, challenge.complexity, 1, cancel).await.unwrap();

        let handshake = Message::ClientHandshake(wow_wire::ClientHandshake { nonce: nonce.to_vec() });
        client.write_frame(handshake.type_id(), &handshake.encode()).await.unwrap();
        let request = Message::WoWRequest(wow_wire::WoWRequest);
        client.write_frame(request.type_id(), &request.encode()).await.unwrap();

        match client.read_frame().await.unwrap() {
            FrameEvent::Data { type_id: TypeId::WoWResponse, .. } => {},
            other => panic!("expected WoWResponse, got {other:?}"),
        }
        assert!(matches!(client.read_frame().await.unwrap(), FrameEvent::Closed));

        let outcome = tokio::time::timeout(Duration::from_secs(2), server).await.unwrap().unwrap().unwrap();
        assert!(outcome.verified);
        assert!(outcome.wow_sent);
        assert!(!outcome.dropped);
    }
}
