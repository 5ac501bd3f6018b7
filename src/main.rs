//! API proxy binary.
//!
//! ```text
//!   Client ──▶ /api/*  ──▶ route table ──▶ forwarder ──▶ backend origin
//!          ◀── relay (status, content-type, body) ◀──────────┘
//! ```

use std::path::PathBuf;

use clap::Parser;

use api_proxy::lifecycle::startup;

#[derive(Parser)]
#[command(name = "api-proxy")]
#[command(about = "Reverse proxy in front of the QC backend API", long_about = None)]
struct Cli {
    /// Path to a TOML configuration file.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override listener.bind_address.
    #[arg(short, long)]
    bind: Option<String>,

    /// Override backend.origin.
    #[arg(short, long)]
    origin: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let mut config = startup::resolve_config(cli.config.as_deref())?;
    if let Some(bind) = cli.bind {
        config.listener.bind_address = bind;
    }
    if let Some(origin) = cli.origin {
        config.backend.origin = origin;
    }
    let config = startup::revalidate(config)?;

    startup::run(config).await?;
    Ok(())
}
