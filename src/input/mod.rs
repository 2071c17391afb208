//! Input module for push-to-talk key events
//!
//! Key listeners turn physical key presses into [`InputEvent`]s on a
//! channel; [`dispatch`] feeds them to the session machine.

mod dispatch;
#[cfg(target_os = "macos")]
mod global;
mod keys;
mod terminal;

use tokio::sync::mpsc;
use tracing::warn;

pub use dispatch::{dispatch, DispatchOutcome};
#[cfg(target_os = "macos")]
pub use global::GlobalListener;
pub use keys::{InputEvent, KeyBindings};
pub use terminal::TerminalListener;

/// A source of key events running on its own thread
pub trait KeyListener: Send + Sync {
    fn start(&self) -> Result<(), ListenerError>;
    fn stop(&self);
    fn is_running(&self) -> bool;
}

/// Errors that can occur in a key listener
#[derive(Debug, thiserror::Error)]
pub enum ListenerError {
    #[error("key listener is already running")]
    AlreadyRunning,

    #[error("failed to configure terminal: {0}")]
    Terminal(#[source] std::io::Error),

    #[error("failed to create event tap - check Accessibility permissions")]
    EventTapCreation,

    #[error("failed to spawn listener thread: {0}")]
    ThreadSpawn(String),

    #[error("{0} key listener is not supported on this platform")]
    Unsupported(InputBackend),
}

/// Where key presses are read from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum InputBackend {
    /// The controlling terminal (raw mode)
    #[default]
    Terminal,
    /// System-wide key tap (macOS)
    Global,
}

impl std::fmt::Display for InputBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            InputBackend::Terminal => write!(f, "terminal"),
            InputBackend::Global => write!(f, "global"),
        }
    }
}

/// Build the listener for a backend
pub fn create_listener(
    backend: InputBackend,
    event_tx: mpsc::Sender<InputEvent>,
    bindings: KeyBindings,
) -> Result<Box<dyn KeyListener>, ListenerError> {
    match backend {
        InputBackend::Terminal => Ok(Box::new(TerminalListener::new(event_tx, bindings))),
        #[cfg(target_os = "macos")]
        InputBackend::Global => Ok(Box::new(GlobalListener::new(event_tx))),
        #[cfg(not(target_os = "macos"))]
        InputBackend::Global => Err(ListenerError::Unsupported(backend)),
    }
}

/// Stop a listener without holding up the async runtime
///
/// `stop` may join the listener thread, which waits out one terminal poll.
pub async fn stop_listener(listener: Box<dyn KeyListener>) {
    if let Err(e) = tokio::task::spawn_blocking(move || listener.stop()).await {
        warn!(error = %e, "key listener did not stop cleanly");
    }
}
