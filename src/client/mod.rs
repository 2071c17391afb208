//! Remote service client
//!
//! Typed HTTP calls to the external services a session depends on:
//! - Name queue (who is standing at the terminal)
//! - Face verification
//! - Transcription (start/stop recording)
//! - Language model
//! - Speech synthesis
//! - Transcript upload
//!
//! Every call maps transport errors and non-2xx statuses into
//! [`ClientError`]. No call retries; retry policy belongs to callers.

mod error;
pub mod protocol;
mod remote;

use async_trait::async_trait;

pub use error::{ClientError, Result};
pub use remote::{ClientTimeouts, RemoteClient};

/// Outcome of a lookup where absence is an expected answer, not a failure
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Lookup<T> {
    Found(T),
    NotFound,
}

/// The remote operations the identity loop and session machine depend on
#[async_trait]
pub trait Services: Send + Sync {
    /// Pop the next name from the queue; `None` when empty or unreachable
    async fn fetch_queued_name(&self, queue_url: &str) -> Option<String>;

    /// Ask the face-verification service whether `name` is in front of the camera
    async fn verify_face(&self, verify_url: &str, name: &str) -> Result<Lookup<String>>;

    /// Start recording; `true` when the service acknowledged
    async fn start_recording(&self, whisper_url: &str) -> Result<bool>;

    /// Stop recording and return the trimmed transcription
    async fn stop_recording(&self, whisper_url: &str) -> Result<String>;

    /// Ask the language model; returns the trimmed answer
    async fn query_language_model(&self, llm_url: &str, question: &str) -> Result<String>;

    /// Speak `text` aloud; `true` when the service acknowledged
    async fn speak(&self, tts_url: &str, text: &str) -> Result<bool>;
}
