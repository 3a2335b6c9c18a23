//! Word-of-wisdom server binary.
//!
//! # Usage
//!
//! ```bash
//! wow-server --bind :9999
//! wow-server --bind 0.0.0.0:9999 --dev
//! ```

use clap::Parser;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};
use wow_server::{Server, ServerConfig};

/// Word-of-wisdom protocol server
#[derive(Parser, Debug)]
#[command(name = "wow-server")]
#[command(about = "PoW-gated word-of-wisdom quote server")]
#[command(version)]
struct Args {
    /// Address to bind to (bare `:port` binds all interfaces)
    #[arg(short, long, default_value = ":9999")]
    bind: String,

    /// Enable verbose development logging
    #[arg(long)]
    dev: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let default_level = if args.dev { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::registry().with(fmt::layer()).with(filter).init();

    let config = ServerConfig { bind: args.bind, ..ServerConfig::default() };
    let server = Server::bind(config).await?;

    tracing::info!(addr = %server.local_addr()?, "server listening");

    server.run(shutdown_signal()).await?;

    tracing::info!("server shut down cleanly");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c().await.expect("failed to install SIGINT handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }
}
