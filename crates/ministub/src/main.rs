//! ministub - CLI entry point

use anyhow::Result;
use clap::Parser;
use ministub::server::serve_metrics;
use ministub::Definition;
use std::path::PathBuf;
use tokio::net::TcpListener;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(
    name = "ministub",
    about = "Declarative HTTP stub server with weighted responses and chained requests",
    version
)]
struct Args {
    /// Path to the definition file
    #[arg(default_value = "./ministub.yml", env = "MINISTUB_DEFINITION")]
    definition: PathBuf,

    /// Port to serve stubbed endpoints on
    #[arg(short, long, default_value_t = 8080, env = "MINISTUB_PORT")]
    port: u16,

    /// Address to bind
    #[arg(short, long, default_value = "0.0.0.0", env = "MINISTUB_BIND")]
    bind: String,

    /// Log level (trace, debug, info, warn, error); RUST_LOG takes precedence
    #[arg(short = 'L', long, default_value = "info")]
    log_level: String,

    /// Validate the definition and exit
    #[arg(long)]
    validate: bool,

    /// Expose Prometheus metrics at /metrics on this port
    #[arg(long, value_name = "PORT")]
    metrics_port: Option<u16>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&args.log_level))?;
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();

    let definition = Definition::from_file(&args.definition)?;
    info!(
        path = ?args.definition,
        endpoints = definition.endpoints.len(),
        services = definition.services.len(),
        "Definition loaded"
    );

    if args.validate {
        println!(
            "Definition is valid ({} endpoints defined)",
            definition.endpoints.len()
        );
        return Ok(());
    }

    if let Some(metrics_port) = args.metrics_port {
        let listener = TcpListener::bind((args.bind.as_str(), metrics_port)).await?;
        tokio::spawn(async move {
            if let Err(e) = serve_metrics(listener).await {
                error!("Metrics listener failed: {:#}", e);
            }
        });
    }

    ministub::start(&args.bind, args.port, definition).await?;
    info!("ministub stopped");
    Ok(())
}
