//! Terminal key listener using crossterm
//!
//! Puts the terminal in raw mode and reads key presses on a dedicated
//! thread, so a single key press is delivered without waiting for Enter.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossterm::event::{self, Event};
use crossterm::terminal;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use super::keys::{InputEvent, KeyBindings};
use super::{KeyListener, ListenerError};

/// How long a poll waits before re-checking the running flag
const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Reads key presses from the controlling terminal
pub struct TerminalListener {
    event_tx: mpsc::Sender<InputEvent>,
    bindings: KeyBindings,
    running: Arc<AtomicBool>,
    handle: Mutex<Option<JoinHandle<()>>>,
}

impl TerminalListener {
    /// Create a new terminal listener
    pub fn new(event_tx: mpsc::Sender<InputEvent>, bindings: KeyBindings) -> Self {
        Self {
            event_tx,
            bindings,
            running: Arc::new(AtomicBool::new(false)),
            handle: Mutex::new(None),
        }
    }
}

impl KeyListener for TerminalListener {
    /// Enable raw mode and spawn the reader thread
    fn start(&self) -> Result<(), ListenerError> {
        if self.running.swap(true, Ordering::SeqCst) {
            return Err(ListenerError::AlreadyRunning);
        }

        if let Err(e) = terminal::enable_raw_mode() {
            self.running.store(false, Ordering::SeqCst);
            return Err(ListenerError::Terminal(e));
        }

        let event_tx = self.event_tx.clone();
        let bindings = self.bindings;
        let running = Arc::clone(&self.running);

        let spawned = thread::Builder::new()
            .name("key-listener".to_string())
            .spawn(move || {
                info!("key listener thread started");
                read_keys(&event_tx, bindings, &running);

                running.store(false, Ordering::SeqCst);
                if let Err(e) = terminal::disable_raw_mode() {
                    warn!(error = %e, "failed to restore terminal mode");
                }
                info!("key listener thread stopped");
            });

        match spawned {
            Ok(handle) => {
                if let Ok(mut slot) = self.handle.lock() {
                    *slot = Some(handle);
                }
                Ok(())
            }
            Err(e) => {
                self.running.store(false, Ordering::SeqCst);
                let _ = terminal::disable_raw_mode();
                Err(ListenerError::ThreadSpawn(e.to_string()))
            }
        }
    }

    /// Stop the listener and wait for the terminal to be restored
    fn stop(&self) {
        self.running.store(false, Ordering::SeqCst);

        let handle = self.handle.lock().ok().and_then(|mut slot| slot.take());
        if let Some(handle) = handle {
            if handle.join().is_err() {
                warn!("key listener thread panicked");
            }
        }
    }

    fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }
}

fn read_keys(event_tx: &mpsc::Sender<InputEvent>, bindings: KeyBindings, running: &AtomicBool) {
    while running.load(Ordering::SeqCst) {
        match event::poll(POLL_INTERVAL) {
            Ok(false) => continue,
            Ok(true) => {}
            Err(e) => {
                error!(error = %e, "failed to poll terminal events");
                break;
            }
        }

        let key = match event::read() {
            Ok(Event::Key(key)) => key,
            Ok(_) => continue,
            Err(e) => {
                error!(error = %e, "failed to read terminal event");
                break;
            }
        };

        let Some(input) = bindings.map_key(&key) else {
            continue;
        };
        debug!(?input, "key pressed");

        // Not in an async context here
        if event_tx.blocking_send(input).is_err() {
            warn!("failed to send key event - channel closed?");
            break;
        }

        if input == InputEvent::Quit {
            break;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_listener_creation() {
        let (tx, _rx) = mpsc::channel(32);
        let listener = TerminalListener::new(tx, KeyBindings::default());
        assert!(!listener.is_running());
    }

    #[test]
    fn test_stop_before_start() {
        let (tx, _rx) = mpsc::channel(32);
        let listener = TerminalListener::new(tx, KeyBindings::default());
        listener.stop();
        assert!(!listener.is_running());
    }
}
