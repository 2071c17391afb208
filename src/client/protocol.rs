//! Wire formats of the remote services
//!
//! Missing fields decode to `None` so that `{}` bodies are valid answers.

use serde::{Deserialize, Serialize};

/// Status string the face-verification service uses for a match
pub const VERIFIED: &str = "Verified";

/// Language tag sent with every question
pub const QUESTION_LANGUAGE: &str = "en";

/// `GET /dequeue` body: `{}` when the queue is empty, `{"name": ...}` otherwise
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DequeueResponse {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

/// `POST /enqueue/{name}` body
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnqueueResponse {
    pub status: String,
    pub name: String,
}

/// `GET /verify_face/{name}` body
#[derive(Debug, Clone, Default, Deserialize)]
pub struct VerifyResponse {
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub person: Option<String>,
}

/// `POST /stop` body of the transcription service
#[derive(Debug, Clone, Default, Deserialize)]
pub struct StopResponse {
    #[serde(default)]
    pub transcription: Option<String>,
}

/// Language-model request
#[derive(Debug, Clone, Serialize)]
pub struct QuestionRequest<'a> {
    pub question: &'a str,
    pub language: &'a str,
}

/// Language-model response
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AnswerResponse {
    #[serde(default)]
    pub answer: Option<String>,
}

/// Speech-synthesis request
#[derive(Debug, Clone, Serialize)]
pub struct SpeakRequest<'a> {
    pub text: &'a str,
}
