//! name-queue: FIFO of names waiting for face verification

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{error, info};

use voice_session::lifecycle::ShutdownSignal;
use voice_session::logging;
use voice_session::queue::{create_router, NameQueue};

#[derive(Debug, Parser)]
#[command(name = "name-queue", version, about = "In-memory name queue service")]
struct Args {
    /// Address to bind
    #[arg(long, env = "QUEUE_BIND", default_value = "0.0.0.0")]
    bind: String,

    /// Port to listen on
    #[arg(long, env = "QUEUE_PORT", default_value_t = 8081)]
    port: u16,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    logging::init();

    let app = create_router(Arc::new(NameQueue::new()));

    let addr = format!("{}:{}", args.bind, args.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    info!(%addr, "name queue listening");

    let shutdown = ShutdownSignal::new();
    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            if let Err(e) = shutdown.wait().await {
                error!(error = %e, "failed to register signal handlers");
            }
        })
        .await
        .context("name queue server failed")?;

    info!("name queue stopped");
    Ok(())
}
