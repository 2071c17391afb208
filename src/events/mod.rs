//! Events module for session transitions
//!
//! Provides structured event types for the push-to-talk cycle:
//! recording, transcription, answer, speech and failures.

use serde::{Deserialize, Serialize};

/// Stage of the cycle at which a failure happened
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    StartRecording,
    StopRecording,
    LanguageModel,
    Speech,
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Stage::StartRecording => write!(f, "start_recording"),
            Stage::StopRecording => write!(f, "stop_recording"),
            Stage::LanguageModel => write!(f, "language_model"),
            Stage::Speech => write!(f, "speech"),
        }
    }
}

/// Events emitted by the session machine during transitions
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SessionEvent {
    /// Transcription service acknowledged the start of a recording
    RecordingStarted,

    /// Recording stopped, transcription requested
    RecordingStopped {
        /// Duration in milliseconds that recording was active
        duration_ms: u64,
    },

    /// Transcription came back with text
    TranscriptionReceived { chars: usize },

    /// Language model produced a non-empty answer
    AnswerReceived { chars: usize },

    /// Speech synthesis returned
    SpeechFinished { acknowledged: bool },

    /// A stage failed; the machine is back in Idle
    CycleFailed { stage: Stage, reason: String },

    /// The machine returned to Idle after a recording
    CycleCompleted {
        /// Duration in milliseconds from stop to Idle
        duration_ms: u64,
    },
}

impl std::fmt::Display for SessionEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SessionEvent::RecordingStarted => write!(f, "RECORDING_STARTED"),
            SessionEvent::RecordingStopped { duration_ms } => {
                write!(f, "RECORDING_STOPPED ({}ms)", duration_ms)
            }
            SessionEvent::TranscriptionReceived { chars } => {
                write!(f, "TRANSCRIPTION_RECEIVED ({} chars)", chars)
            }
            SessionEvent::AnswerReceived { chars } => {
                write!(f, "ANSWER_RECEIVED ({} chars)", chars)
            }
            SessionEvent::SpeechFinished { acknowledged } => {
                write!(f, "SPEECH_FINISHED (acknowledged={})", acknowledged)
            }
            SessionEvent::CycleFailed { stage, reason } => {
                write!(f, "CYCLE_FAILED at {}: {}", stage, reason)
            }
            SessionEvent::CycleCompleted { duration_ms } => {
                write!(f, "CYCLE_COMPLETED ({}ms)", duration_ms)
            }
        }
    }
}
