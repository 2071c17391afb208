//! Conversation transcript
//!
//! An append-only, timestamped record of what was said, kept apart from
//! diagnostic logging. One line per turn.

use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use chrono::{DateTime, Local};

/// Marker recorded when the language model returns nothing
pub const NO_ANSWER_MARKER: &str = "<No answer received>";

/// Who said it
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Speaker {
    User,
    Assistant,
}

impl std::fmt::Display for Speaker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Speaker::User => write!(f, "User"),
            Speaker::Assistant => write!(f, "Assistant"),
        }
    }
}

/// A single utterance in the conversation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversationTurn {
    pub speaker: Speaker,
    pub text: String,
    pub timestamp: DateTime<Local>,
}

impl ConversationTurn {
    pub fn new(speaker: Speaker, text: impl Into<String>) -> Self {
        Self {
            speaker,
            text: text.into(),
            timestamp: Local::now(),
        }
    }

    pub fn user(text: impl Into<String>) -> Self {
        Self::new(Speaker::User, text)
    }

    pub fn assistant(text: impl Into<String>) -> Self {
        Self::new(Speaker::Assistant, text)
    }

    /// Render as a single transcript line (without trailing newline)
    pub fn to_line(&self) -> String {
        let text = self.text.split_whitespace().collect::<Vec<_>>().join(" ");
        format!(
            "{} - {}: {}",
            self.timestamp.format("%Y-%m-%d %H:%M:%S,%3f"),
            self.speaker,
            text
        )
    }
}

#[derive(Debug, thiserror::Error)]
pub enum TranscriptError {
    #[error("failed to open transcript {}: {source}", path.display())]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to write transcript: {0}")]
    Write(#[from] std::io::Error),

    #[error("transcript lock poisoned")]
    Poisoned,
}

/// Destination for conversation turns
pub trait TranscriptSink: Send + Sync {
    fn append(&self, turn: &ConversationTurn) -> Result<(), TranscriptError>;
}

/// Appends turns to a log file
pub struct FileTranscript {
    path: PathBuf,
    file: Mutex<File>,
}

impl FileTranscript {
    /// Open (or create) the transcript file in append mode
    pub fn open(path: &Path) -> Result<Self, TranscriptError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|source| TranscriptError::Open {
                path: path.to_owned(),
                source,
            })?;
        }

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .map_err(|source| TranscriptError::Open {
                path: path.to_owned(),
                source,
            })?;

        Ok(Self {
            path: path.to_owned(),
            file: Mutex::new(file),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl TranscriptSink for FileTranscript {
    fn append(&self, turn: &ConversationTurn) -> Result<(), TranscriptError> {
        let mut file = self.file.lock().map_err(|_| TranscriptError::Poisoned)?;
        writeln!(file, "{}", turn.to_line())?;
        file.flush()?;
        Ok(())
    }
}

/// Keeps turns in memory
#[derive(Debug, Default)]
pub struct MemoryTranscript {
    turns: Mutex<Vec<ConversationTurn>>,
}

impl MemoryTranscript {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of every recorded turn
    pub fn turns(&self) -> Vec<ConversationTurn> {
        self.turns
            .lock()
            .map(|turns| turns.clone())
            .unwrap_or_default()
    }
}

impl TranscriptSink for MemoryTranscript {
    fn append(&self, turn: &ConversationTurn) -> Result<(), TranscriptError> {
        self.turns
            .lock()
            .map_err(|_| TranscriptError::Poisoned)?
            .push(turn.clone());
        Ok(())
    }
}
