//! Global key listener using macOS CGEventTap
//!
//! Monitors system-wide key-down events so the session can be driven while
//! another window has focus. Runs on a dedicated thread with its own
//! CFRunLoop.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;

use core_foundation::runloop::{kCFRunLoopCommonModes, kCFRunLoopDefaultMode, CFRunLoop};
use core_graphics::event::{
    CGEvent, CGEventTap, CGEventTapLocation, CGEventTapOptions, CGEventTapPlacement,
    CGEventType, EventField,
};
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use super::keys::InputEvent;
use super::{KeyListener, ListenerError};

/// Virtual keycodes (ANSI layout)
const KEYCODE_SPACE: i64 = 49;
const KEYCODE_Q: i64 = 12;

fn map_keycode(keycode: i64) -> Option<InputEvent> {
    match keycode {
        KEYCODE_SPACE => Some(InputEvent::Toggle),
        KEYCODE_Q => Some(InputEvent::Quit),
        _ => None,
    }
}

/// System-wide listener for the toggle and quit keys
pub struct GlobalListener {
    event_tx: mpsc::Sender<InputEvent>,
    running: Arc<AtomicBool>,
}

impl GlobalListener {
    /// Create a new global listener
    pub fn new(event_tx: mpsc::Sender<InputEvent>) -> Self {
        Self {
            event_tx,
            running: Arc::new(AtomicBool::new(false)),
        }
    }
}

impl KeyListener for GlobalListener {
    /// Spawn a thread that runs a CFRunLoop receiving CGEventTap callbacks
    fn start(&self) -> Result<(), ListenerError> {
        if self.running.swap(true, Ordering::SeqCst) {
            return Err(ListenerError::AlreadyRunning);
        }

        let event_tx = self.event_tx.clone();
        let running = Arc::clone(&self.running);

        thread::Builder::new()
            .name("global-key-listener".to_string())
            .spawn(move || {
                info!("global key listener thread started");

                if let Err(e) = run_event_loop(event_tx, running.clone()) {
                    error!(?e, "global key listener error");
                }

                running.store(false, Ordering::SeqCst);
                info!("global key listener thread stopped");
            })
            .map_err(|e| ListenerError::ThreadSpawn(e.to_string()))?;

        Ok(())
    }

    fn stop(&self) {
        self.running.store(false, Ordering::SeqCst);
    }

    fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }
}

/// Run the CFRunLoop with the event tap
fn run_event_loop(
    event_tx: mpsc::Sender<InputEvent>,
    running: Arc<AtomicBool>,
) -> Result<(), ListenerError> {
    let (callback_tx, callback_rx) = std::sync::mpsc::channel::<i64>();

    // CGEventTap callback - must be fast and non-blocking
    let callback = move |_proxy: core_graphics::event::CGEventTapProxy,
                         event_type: CGEventType,
                         event: &CGEvent|
                         -> Option<CGEvent> {
        match event_type {
            CGEventType::KeyDown => {
                let repeat = event.get_integer_value_field(EventField::KEYBOARD_EVENT_AUTOREPEAT);
                if repeat == 0 {
                    let keycode =
                        event.get_integer_value_field(EventField::KEYBOARD_EVENT_KEYCODE);
                    let _ = callback_tx.send(keycode);
                }
            }
            CGEventType::TapDisabledByTimeout | CGEventType::TapDisabledByUserInput => {
                warn!("event tap disabled, will re-enable");
            }
            _ => {}
        }
        Some(event.clone())
    };

    let tap = CGEventTap::new(
        CGEventTapLocation::Session,
        CGEventTapPlacement::HeadInsertEventTap,
        CGEventTapOptions::ListenOnly,
        vec![CGEventType::KeyDown],
        callback,
    )
    .map_err(|_| {
        error!("failed to create event tap - is Accessibility permission granted?");
        ListenerError::EventTapCreation
    })?;

    tap.enable();

    let run_loop_source = tap
        .mach_port
        .create_runloop_source(0)
        .map_err(|_| ListenerError::EventTapCreation)?;
    let run_loop = CFRunLoop::get_current();

    unsafe {
        run_loop.add_source(&run_loop_source, kCFRunLoopCommonModes);
    }

    info!("event tap created and enabled");

    while running.load(Ordering::SeqCst) {
        unsafe {
            CFRunLoop::run_in_mode(
                kCFRunLoopDefaultMode,
                std::time::Duration::from_millis(100),
                true,
            );
        }

        while let Ok(keycode) = callback_rx.try_recv() {
            let Some(input) = map_keycode(keycode) else {
                continue;
            };
            debug!(keycode, ?input, "key pressed");

            if event_tx.blocking_send(input).is_err() {
                warn!("failed to send key event - channel closed?");
                return Ok(());
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keycode_mapping() {
        assert_eq!(map_keycode(KEYCODE_SPACE), Some(InputEvent::Toggle));
        assert_eq!(map_keycode(KEYCODE_Q), Some(InputEvent::Quit));
        assert_eq!(map_keycode(0), None);
    }

    #[test]
    fn test_listener_creation() {
        let (tx, _rx) = mpsc::channel(32);
        let listener = GlobalListener::new(tx);
        assert!(!listener.is_running());
    }
}
