//! Word-of-wisdom protocol server: binds a TCP listener and dispatches each
//! accepted connection to [`session::run_server_session`].

#![cfg_attr(test, allow(clippy::unwrap_used, clippy::expect_used, clippy::panic))]

mod error;
mod session;

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

pub use error::ServerError;
pub use session::{DEFAULT_READ_DEADLINE, SessionOutcome, run_server_session};
use tokio::net::TcpListener;
use wow_core::{ConnectionManager, Limiter, QuoteSource, Sampler, complexer};

/// Grace period the graceful shutdown protocol waits for in-flight sessions
/// to finish before forcing them closed.
pub const DEFAULT_SHUTDOWN_GRACE_PERIOD: Duration = Duration::from_secs(30);

/// Server configuration, populated from CLI args or test setup.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address to bind the listener to.
    pub bind: String,
    /// Per-connection read/write deadline.
    pub read_deadline: Duration,
    /// Grace period for graceful shutdown.
    pub shutdown_grace_period: Duration,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: ":9999".to_owned(),
            read_deadline: DEFAULT_READ_DEADLINE,
            shutdown_grace_period: DEFAULT_SHUTDOWN_GRACE_PERIOD,
        }
    }
}

/// A bound, running word-of-wisdom server.
pub struct Server {
    listener: TcpListener,
    manager: Arc<ConnectionManager>,
    limiter: Arc<Limiter>,
    quotes: Arc<QuoteSource>,
    sampler: Arc<Sampler>,
    sampler_cancel: tokio_util::sync::CancellationToken,
    config: ServerConfig,
}

impl Server {
    /// Binds the listener and spawns the CPU sampler's background ticker.
    ///
    /// # Errors
    ///
    /// Returns [`ServerError::Transport`] if the bind address is invalid or
    /// already in use.
    pub async fn bind(config: ServerConfig) -> Result<Self, ServerError> {
        let bind_addr = normalize_bind_address(&config.bind);
        let listener = TcpListener::bind(&bind_addr)
            .await
            .map_err(|error| ServerError::Transport(wow_transport::TransportError::Wire(wow_wire::WireError::Io(error))))?;

        let num_cpus = std::thread::available_parallelism().map_or(1, std::num::NonZeroUsize::get);
        let (sampler, sampler_cancel) = Sampler::spawn(wow_core::sampler::DEFAULT_PERIOD, num_cpus);

        Ok(Self {
            listener,
            manager: Arc::new(ConnectionManager::new()),
            limiter: Arc::new(Limiter::default()),
            quotes: Arc::new(QuoteSource::default()),
            sampler,
            sampler_cancel,
            config,
        })
    }

    /// The address the listener is actually bound to (useful when `:0` was
    /// requested for an ephemeral port).
    ///
    /// # Errors
    ///
    /// Returns [`ServerError::Transport`] if the OS cannot report the local
    /// address.
    pub fn local_addr(&self) -> Result<SocketAddr, ServerError> {
        self.listener
            .local_addr()
            .map_err(|error| ServerError::Transport(wow_transport::TransportError::Wire(wow_wire::WireError::Io(error))))
    }

    /// Accepts connections until `shutdown_signal` resolves, then runs the
    /// graceful shutdown protocol: stop accepting, wait up to the
    /// configured grace period for in-flight sessions, then force-stop any
    /// stragglers.
    pub async fn run(self, shutdown_signal: impl std::future::Future<Output = ()>) -> Result<(), ServerError> {
        tokio::pin!(shutdown_signal);
        loop {
            tokio::select! {
                () = &mut shutdown_signal => {
                    tracing::info!("shutdown signal received; no longer accepting connections");
                    break;
                },
                accepted = self.listener.accept() => {
                    match accepted {
                        Ok((stream, addr)) => self.spawn_session(stream, addr),
                        Err(error) => tracing::warn!(%error, "accept failed"),
                    }
                },
            }
        }

        self.manager.graceful_shutdown(self.config.shutdown_grace_period).await;
        self.sampler_cancel.cancel();
        Ok(())
    }

    fn spawn_session(&self, stream: tokio::net::TcpStream, addr: SocketAddr) {
        let manager = Arc::clone(&self.manager);
        let limiter = Arc::clone(&self.limiter);
        let quotes = Arc::clone(&self.quotes);
        let sampler = Arc::clone(&self.sampler);
        let read_deadline = self.config.read_deadline;

        tokio::spawn(async move {
            let started = std::time::Instant::now();
            let complexity = complexer::complexity(sampler.fraction());
            let result =
                run_server_session(stream, addr.ip(), &manager, &limiter, &quotes, complexity, read_deadline).await;

            match result {
                Ok(outcome) => {
                    tracing::info!(
                        verified = outcome.verified,
                        wow_sent = outcome.wow_sent,
                        dropped = outcome.dropped,
                        duration = ?started.elapsed(),
                        peer = %addr,
                        "connection closed"
                    );
                },
                Err(error) => {
                    tracing::info!(
                        %error,
                        duration = ?started.elapsed(),
                        peer = %addr,
                        "connection closed with error"
                    );
                },
            }
        });
    }
}

/// Accepts the bare `:port` shorthand from §6's CLI spec by prefixing an
/// unspecified host.
fn normalize_bind_address(bind: &str) -> String {
    if let Some(stripped) = bind.strip_prefix(':') {
        format!("0.0.0.0:{stripped}")
    } else {
        bind.to_owned()
    }
}
