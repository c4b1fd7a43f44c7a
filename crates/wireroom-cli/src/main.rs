//! Wireroom command-line client.
//!
//! # Usage
//!
//! ```bash
//! # Join a chat server interactively
//! wireroom chat --port 7474
//!
//! # Deliver one message and exit
//! wireroom send --port 7474 hello over there
//! ```
//!
//! Chat content goes to stdout; diagnostics go to stderr through the
//! tracing subscriber. Peer disconnects end a chat session cleanly.

use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Wireroom chat client
#[derive(Parser, Debug)]
#[command(name = "wireroom")]
#[command(about = "Wireroom chat client")]
#[command(version)]
struct Args {
    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "warn")]
    log_level: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Join a chat server interactively
    Chat {
        /// Server hostname or address
        #[arg(long, default_value = "127.0.0.1")]
        host: String,

        /// Server port
        #[arg(short, long)]
        port: u16,
    },

    /// Send a single message and exit
    Send {
        /// Server hostname or address
        #[arg(long, default_value = "127.0.0.1")]
        host: String,

        /// Server port
        #[arg(short, long)]
        port: u16,

        /// Message words, joined with single spaces
        #[arg(required = true)]
        words: Vec<String>,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();

    let result = match args.command {
        Command::Chat { host, port } => {
            // Every SessionEnd variant is a clean exit; only transport
            // faults fail the process.
            wireroom_client::run_chat(&host, port, tokio::io::stdin()).await.map(|_end| ())
        }
        Command::Send { host, port, words } => {
            wireroom_client::send_once(&host, port, &words).await
        }
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            tracing::error!("{err}");
            ExitCode::FAILURE
        }
    }
}
