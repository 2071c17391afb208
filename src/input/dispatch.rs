//! Routes key events to the session machine

use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{debug, info};

use super::keys::InputEvent;
use crate::client::Services;
use crate::session::SessionMachine;
use crate::transcript::TranscriptSink;

/// Why dispatching stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// The user pressed the quit key
    Quit,
    /// Every key listener went away
    InputClosed,
}

/// Feed key events to the machine until the user quits
///
/// Each toggle claims the session before its task is spawned, then runs on
/// that task so a slow remote call never stalls the input stream. Toggles
/// that arrive while another is in flight are dropped. A quit returns at
/// once; use [`SessionMachine::wait_settled`] to let the last cycle finish.
pub async fn dispatch<S, T>(
    machine: Arc<SessionMachine<S, T>>,
    mut input_rx: mpsc::Receiver<InputEvent>,
) -> DispatchOutcome
where
    S: Services + 'static,
    T: TranscriptSink + 'static,
{
    while let Some(event) = input_rx.recv().await {
        match event {
            InputEvent::Toggle => {
                debug!(state = %machine.state(), "toggle requested");
                if let Some(claim) = machine.claim_toggle() {
                    let machine = Arc::clone(&machine);
                    tokio::spawn(async move { machine.run_toggle(claim).await });
                }
            }
            InputEvent::Quit => {
                info!("session ended by user");
                return DispatchOutcome::Quit;
            }
        }
    }

    info!("input stream closed");
    DispatchOutcome::InputClosed
}
