//! Wireroom server binary.
//!
//! # Usage
//!
//! ```bash
//! # Serve on port 7474 until stdin closes
//! wireroom-server --port 7474
//!
//! # Typical supervised use: closing the pipe shuts the server down
//! tail -f /dev/null | wireroom-server --port 7474
//! ```
//!
//! The process's standard input is the shutdown control channel: the
//! server runs until whoever spawned it closes the other end (or until
//! end-of-file on an interactive terminal).

use clap::Parser;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};
use wireroom_server::{DriverConfig, Server, ServerRuntimeConfig};

/// Wireroom broadcast chat server
#[derive(Parser, Debug)]
#[command(name = "wireroom-server")]
#[command(about = "Wireroom broadcast chat server")]
#[command(version)]
struct Args {
    /// TCP port to listen on
    #[arg(short, long)]
    port: u16,

    /// Address to bind
    #[arg(long, default_value = "0.0.0.0")]
    bind: String,

    /// Maximum concurrent clients
    #[arg(long, default_value = "10000")]
    max_clients: usize,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();

    let config = ServerRuntimeConfig {
        bind_address: format!("{}:{}", args.bind, args.port),
        driver: DriverConfig { max_clients: args.max_clients },
    };

    let server = Server::bind(config).await?;
    tracing::info!("server listening on {}", server.local_addr()?);

    server.run(tokio::io::stdin()).await?;

    Ok(())
}
