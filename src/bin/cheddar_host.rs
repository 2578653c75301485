//! Reference host process speaking the cheddar JSON-lines protocol.
//!
//! Reads `CommandEnvelope` lines from stdin and writes `ResponseEnvelope` and
//! `EventEnvelope` lines to stdout. It accepts every operation and talks to no
//! AI backend, which makes it useful for driving the front-end end to end.
//!
//! All tracing output goes to stderr so that stdout stays a clean protocol
//! channel.

use cheddar::host::channel::NoopHostHandler;
use cheddar::host::stdio::run_stdio_host;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    tracing::info!("cheddar-host starting");

    run_stdio_host(NoopHostHandler).await.map_err(|e| {
        tracing::error!(error = %e, "cheddar-host exited with error");
        anyhow::anyhow!("cheddar-host failed: {e}")
    })?;

    tracing::info!("cheddar-host shut down cleanly");
    Ok(())
}
