//! forkrun agent - Main entry point
//!
//! Spawned by the orchestrator with the port to connect back to. Once the
//! channel exists the process always exits with status 0; whatever went
//! wrong has been reported over the channel or to stderr by then.

mod cli;

use anyhow::Context;
use clap::Parser;
use forkrun_core::{FrameworkRegistry, TestDriver, WireChannel};
use tokio::net::TcpStream;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let args = cli::Args::parse();
    let config = args.resolve_config()?;

    // Initialize logging (stdout stays untouched)
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.log_level)),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .init();

    let address = config.address();
    info!("Connecting to orchestrator at {}", address);
    let stream = tokio::time::timeout(config.connect_timeout(), TcpStream::connect(&address))
        .await
        .with_context(|| format!("Timed out connecting to {}", address))?
        .with_context(|| format!("Failed to connect to {}", address))?;

    let driver =
        TestDriver::new(FrameworkRegistry::with_builtins()).with_diagnostics(config.diagnostics);
    let outcome = driver.run(WireChannel::from_tcp(stream)).await;
    info!("Agent finished: {}", outcome);

    // Framework code may have left blocking work behind; don't wait for it
    std::process::exit(0)
}
