//! voice-session: push-to-talk voice assistant
//!
//! Startup sequence:
//! - Wait for a name on the queue and verify that person's face
//! - Open the conversation transcript
//! - Listen for SPACE (record/stop) and Q (quit)
//! - On exit, optionally upload the transcript

use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::sync::{broadcast, mpsc};
use tracing::{error, info, warn};

use voice_session::config::Config;
use voice_session::events::SessionEvent;
use voice_session::identity::verify_identity;
use voice_session::input::{create_listener, dispatch, stop_listener, KeyBindings};
use voice_session::lifecycle::ShutdownSignal;
use voice_session::logging;
use voice_session::session::SessionMachine;
use voice_session::transcript::FileTranscript;
use voice_session::RemoteClient;

#[tokio::main]
async fn main() -> ExitCode {
    let config = Config::load();
    logging::init();

    info!(version = env!("CARGO_PKG_VERSION"), "voice-session starting");

    match run(config).await {
        Ok(()) => {
            info!("voice-session stopped");
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!(error = ?e, "a critical error occurred");
            ExitCode::FAILURE
        }
    }
}

async fn run(config: Config) -> Result<()> {
    config.validate()?;

    let shutdown = ShutdownSignal::new();
    let client = RemoteClient::new();

    let identity = if config.skip_verification {
        info!(user = %config.user_name, "skipping identity verification");
        config.user_name.clone()
    } else {
        let endpoints = config.identity_endpoints();
        tokio::select! {
            identity = verify_identity(&client, &endpoints, config.poll_interval()) => identity,
            result = shutdown.wait() => {
                result.context("failed to register signal handlers")?;
                info!("shutdown requested before identity was verified");
                return Ok(());
            }
        }
    };

    let transcript = FileTranscript::open(&config.transcript_path)
        .context("failed to open conversation transcript")?;
    info!(path = %transcript.path().display(), "transcript opened");

    let (event_tx, _event_rx) = broadcast::channel::<SessionEvent>(64);
    let machine = Arc::new(SessionMachine::new(
        identity,
        config.endpoints(),
        client.clone(),
        transcript,
        event_tx,
    ));

    // Log session events as they happen
    let mut events = machine.subscribe();
    let event_log = tokio::spawn(async move {
        loop {
            match events.recv().await {
                Ok(event) => info!(%event, "session event"),
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    warn!(skipped = n, "session event receiver lagged");
                }
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
    });

    let bindings = KeyBindings::default();
    let (input_tx, input_rx) = mpsc::channel(32);
    let listener = create_listener(config.input, input_tx, bindings)?;
    listener.start().context("failed to start key listener")?;
    info!(identity = %machine.identity(), "{}", bindings.help());

    tokio::select! {
        outcome = dispatch(Arc::clone(&machine), input_rx) => {
            info!(?outcome, "dispatcher exited");
        }
        result = shutdown.wait() => {
            result.context("failed to register signal handlers")?;
            info!("shutdown signal received");
        }
    }

    info!("shutting down...");
    stop_listener(listener).await;

    // A cycle in flight runs to completion so its turns reach the transcript
    if machine.is_in_flight() {
        info!("waiting for the current answer to finish");
        machine.wait_settled().await;
    }
    event_log.abort();

    if let Some(vlm_url) = config.vlm_url() {
        let path = machine.transcript().path();
        if let Err(e) = client.send_transcript_file(vlm_url, path).await {
            error!(error = %e, "failed to upload transcript");
        }
    }

    Ok(())
}
