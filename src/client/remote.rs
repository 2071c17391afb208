//! reqwest-backed implementation of [`Services`]

use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::{Client, RequestBuilder, Response, StatusCode, Url};
use serde::de::DeserializeOwned;
use tracing::{debug, info};

use super::error::{ClientError, Result};
use super::protocol::{
    AnswerResponse, DequeueResponse, QuestionRequest, SpeakRequest, StopResponse,
    VerifyResponse, QUESTION_LANGUAGE, VERIFIED,
};
use super::{Lookup, Services};

const QUEUE_POLL_TIMEOUT_SECS: u64 = 5;
const FACE_VERIFICATION_TIMEOUT_SECS: u64 = 60;
const REQUEST_TIMEOUT_SECS: u64 = 30;

const TRANSCRIPT_MIME: &str = "text/plain";

/// Per-operation request timeouts
#[derive(Debug, Clone, Copy)]
pub struct ClientTimeouts {
    /// Name-queue poll
    pub queue_poll: Duration,
    /// Face verification (the service may wait for a face to appear)
    pub face_verification: Duration,
    /// Every other call
    pub request: Duration,
}

impl Default for ClientTimeouts {
    fn default() -> Self {
        Self {
            queue_poll: Duration::from_secs(QUEUE_POLL_TIMEOUT_SECS),
            face_verification: Duration::from_secs(FACE_VERIFICATION_TIMEOUT_SECS),
            request: Duration::from_secs(REQUEST_TIMEOUT_SECS),
        }
    }
}

/// HTTP client for all remote services
#[derive(Debug, Clone)]
pub struct RemoteClient {
    http: Client,
    timeouts: ClientTimeouts,
}

impl RemoteClient {
    pub fn new() -> Self {
        Self::with_timeouts(ClientTimeouts::default())
    }

    pub fn with_timeouts(timeouts: ClientTimeouts) -> Self {
        Self {
            http: Client::new(),
            timeouts,
        }
    }

    /// Upload a transcript file as a multipart attachment named `file`
    pub async fn send_transcript_file(&self, vlm_url: &str, path: &Path) -> Result<()> {
        if vlm_url.trim().is_empty() {
            return Err(ClientError::Configuration("VLM"));
        }

        let contents = match tokio::fs::read(path).await {
            Ok(contents) if !contents.is_empty() => contents,
            Ok(_) => return Err(ClientError::MissingFile(path.to_owned())),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(ClientError::MissingFile(path.to_owned()))
            }
            Err(source) => {
                return Err(ClientError::Io {
                    path: path.to_owned(),
                    source,
                })
            }
        };

        let bytes = contents.len();
        let part = attachment(path, contents, TRANSCRIPT_MIME)?;

        let request = self.http.post(vlm_url).multipart(Form::new().part("file", part));
        self.send(vlm_url, request, self.timeouts.request).await?;

        info!(path = %path.display(), bytes, "transcript uploaded");
        Ok(())
    }

    /// Send a request, classifying transport errors and non-2xx statuses
    async fn send(
        &self,
        url: &str,
        request: RequestBuilder,
        timeout: Duration,
    ) -> Result<Response> {
        let response = request
            .timeout(timeout)
            .send()
            .await
            .map_err(|source| ClientError::Transport {
                url: url.to_string(),
                source,
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(ClientError::Status {
                url: url.to_string(),
                status,
            });
        }

        Ok(response)
    }
}

impl Default for RemoteClient {
    fn default() -> Self {
        Self::new()
    }
}

async fn decode<T: DeserializeOwned>(url: &str, response: Response) -> Result<T> {
    response
        .json::<T>()
        .await
        .map_err(|source| ClientError::Malformed {
            url: url.to_string(),
            source,
        })
}

fn endpoint(base: &str, path: &str) -> String {
    format!("{}/{}", base.trim_end_matches('/'), path.trim_start_matches('/'))
}

/// Multipart file part named after the file's base name
fn attachment(path: &Path, contents: Vec<u8>, mime: &str) -> Result<Part> {
    let file_name = path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("transcript.log")
        .to_string();
    Part::bytes(contents)
        .file_name(file_name)
        .mime_str(mime)
        .map_err(|source| ClientError::Attachment {
            path: path.to_owned(),
            source,
        })
}

/// Join path segments onto a base URL, percent-encoding each one
fn segment_endpoint(base: &str, segments: &[&str]) -> String {
    let Ok(mut url) = Url::parse(base) else {
        return endpoint(base, &segments.join("/"));
    };
    if let Ok(mut path) = url.path_segments_mut() {
        path.pop_if_empty().extend(segments);
    }
    url.to_string()
}

fn trimmed(text: Option<String>) -> String {
    text.map(|t| t.trim().to_string()).unwrap_or_default()
}

#[async_trait]
impl Services for RemoteClient {
    async fn fetch_queued_name(&self, queue_url: &str) -> Option<String> {
        let url = endpoint(queue_url, "dequeue");
        let result = async {
            let response = self
                .send(&url, self.http.get(&url), self.timeouts.queue_poll)
                .await?;
            decode::<DequeueResponse>(&url, response).await
        }
        .await;

        match result {
            Ok(body) => body.name.filter(|name| !name.is_empty()),
            Err(e) => {
                debug!(error = %e, "name queue poll failed");
                None
            }
        }
    }

    async fn verify_face(&self, verify_url: &str, name: &str) -> Result<Lookup<String>> {
        let url = segment_endpoint(verify_url, &["verify_face", name]);
        let response = match self
            .send(&url, self.http.get(&url), self.timeouts.face_verification)
            .await
        {
            Ok(response) => response,
            Err(e) if e.status() == Some(StatusCode::NOT_FOUND) => {
                debug!(%name, "no face match");
                return Ok(Lookup::NotFound);
            }
            Err(e) => return Err(e),
        };

        let body: VerifyResponse = decode(&url, response).await?;
        match (body.status.as_deref(), body.person) {
            (Some(VERIFIED), Some(person)) if !person.is_empty() => Ok(Lookup::Found(person)),
            (status, _) => {
                debug!(%name, ?status, "face not verified");
                Ok(Lookup::NotFound)
            }
        }
    }

    async fn start_recording(&self, whisper_url: &str) -> Result<bool> {
        let url = endpoint(whisper_url, "start");
        let response = self
            .send(&url, self.http.post(&url), self.timeouts.request)
            .await?;
        Ok(response.status() == StatusCode::OK)
    }

    async fn stop_recording(&self, whisper_url: &str) -> Result<String> {
        let url = endpoint(whisper_url, "stop");
        let response = self
            .send(&url, self.http.post(&url), self.timeouts.request)
            .await?;
        let body: StopResponse = decode(&url, response).await?;
        Ok(trimmed(body.transcription))
    }

    async fn query_language_model(&self, llm_url: &str, question: &str) -> Result<String> {
        let payload = QuestionRequest {
            question,
            language: QUESTION_LANGUAGE,
        };
        let response = self
            .send(
                llm_url,
                self.http.post(llm_url).json(&payload),
                self.timeouts.request,
            )
            .await?;
        let body: AnswerResponse = decode(llm_url, response).await?;
        Ok(trimmed(body.answer))
    }

    async fn speak(&self, tts_url: &str, text: &str) -> Result<bool> {
        let response = self
            .send(
                tts_url,
                self.http.post(tts_url).json(&SpeakRequest { text }),
                self.timeouts.request,
            )
            .await?;
        Ok(response.status() == StatusCode::OK)
    }
}
