//! Session state machine
//!
//! Provides the push-to-talk state machine with four states:
//! - Idle: waiting for the user to press the toggle key
//! - Recording: the transcription service is capturing audio
//! - Processing: transcribing and asking the language model
//! - Speaking: the answer is being synthesized

mod machine;

pub use machine::{SessionMachine, State, ToggleClaim};

/// Service URLs used during the conversation loop
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoints {
    pub whisper_url: String,
    pub llm_url: String,
    pub tts_url: String,
}
