mod server;
mod tools;

use anyhow::Result;
use clap::Parser;
use tokio::io::BufReader;
use tracing_subscriber::EnvFilter;

use crate::server::StubServer;

/// A small stdio tool system for exercising quill end to end
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Name reported in the initialize handshake
    #[arg(long, default_value = "stub-system")]
    name: String,

    /// Return tools/list in pages of this many tools
    #[arg(long)]
    page_size: Option<usize>,
}

#[tokio::main]
async fn main() -> Result<()> {
    // stdout carries the protocol, so logs go to stderr
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .init();

    let args = Args::parse();
    tracing::info!(name = %args.name, "stub system started");

    StubServer::new(args.name, args.page_size)
        .run(BufReader::new(tokio::io::stdin()), tokio::io::stdout())
        .await?;

    tracing::info!("stdin closed, exiting");
    Ok(())
}
