//! Word-of-wisdom client binary.
//!
//! # Usage
//!
//! ```bash
//! wow-client --addr localhost:9999
//! ```

use clap::Parser;
use tokio::net::TcpStream;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};
use wow_client::run_client_session;

/// Word-of-wisdom protocol client
#[derive(Parser, Debug)]
#[command(name = "wow-client")]
#[command(about = "Mints a proof of work and fetches a word of wisdom")]
#[command(version)]
struct Args {
    /// Server address to connect to
    #[arg(short, long, default_value = "localhost:9999")]
    addr: String,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry().with(fmt::layer()).with(filter).init();

    let workers = std::thread::available_parallelism().map_or(1, std::num::NonZeroUsize::get);
    let workers = u32::try_from(workers).unwrap_or(u32::MAX);

    tracing::info!(addr = %args.addr, "connecting");
    let stream = TcpStream::connect(&args.addr).await?;

    let quote = run_client_session(stream, workers).await?;
    println!("{quote}");

    Ok(())
}
