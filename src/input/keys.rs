//! Key bindings for the push-to-talk session
//!
//! Maps physical key presses to the two session events: toggle recording
//! and quit.

use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyModifiers};

/// Events sent from a key listener to the dispatcher
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputEvent {
    /// Start or stop recording
    Toggle,
    /// End the session
    Quit,
}

/// Which keys trigger which event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyBindings {
    /// Toggle key (space by default)
    pub toggle: char,
    /// Quit key (q by default, case-insensitive)
    pub quit: char,
}

impl Default for KeyBindings {
    fn default() -> Self {
        Self {
            toggle: ' ',
            quit: 'q',
        }
    }
}

impl KeyBindings {
    /// Map a typed character
    pub fn map_char(&self, c: char) -> Option<InputEvent> {
        if c == self.toggle {
            Some(InputEvent::Toggle)
        } else if c.eq_ignore_ascii_case(&self.quit) {
            Some(InputEvent::Quit)
        } else {
            None
        }
    }

    /// Map a terminal key event; Ctrl-C and Esc always quit
    pub fn map_key(&self, key: &KeyEvent) -> Option<InputEvent> {
        if key.kind != KeyEventKind::Press {
            return None;
        }

        match key.code {
            KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                Some(InputEvent::Quit)
            }
            KeyCode::Esc => Some(InputEvent::Quit),
            KeyCode::Char(c) => self.map_char(c),
            _ => None,
        }
    }

    /// One-line help for the console
    pub fn help(&self) -> String {
        let toggle = match self.toggle {
            ' ' => "SPACE".to_string(),
            c => c.to_uppercase().to_string(),
        };
        format!(
            "Press {} to record or {} to quit.",
            toggle,
            self.quit.to_uppercase()
        )
    }
}
