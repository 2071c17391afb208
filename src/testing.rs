//! Scripted in-process services shared by unit tests

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use reqwest::StatusCode;
use tokio::sync::Notify;

use crate::client::{ClientError, Lookup, Result, Services};
use crate::session::Endpoints;

pub fn call_failure(stage: &str) -> ClientError {
    ClientError::Status {
        url: format!("http://services/{stage}"),
        status: StatusCode::INTERNAL_SERVER_ERROR,
    }
}

pub fn test_endpoints() -> Endpoints {
    Endpoints {
        whisper_url: "http://whisper".to_string(),
        llm_url: "http://llm".to_string(),
        tts_url: "http://tts".to_string(),
    }
}

/// Conversation services answering from scripts
///
/// An exhausted script answers with a benign default: start and speak
/// acknowledge, stop and the language model return empty text.
#[derive(Default)]
pub struct FakeServices {
    start: Mutex<VecDeque<Result<bool>>>,
    stop: Mutex<VecDeque<Result<String>>>,
    answer: Mutex<VecDeque<Result<String>>>,
    speak: Mutex<VecDeque<Result<bool>>>,
    calls: Mutex<Vec<&'static str>>,
    stop_gate: Option<Arc<Notify>>,
    speak_gate: Option<Arc<Notify>>,
}

impl FakeServices {
    pub fn start(self, result: Result<bool>) -> Self {
        self.start.lock().unwrap().push_back(result);
        self
    }

    pub fn stop(self, result: Result<&str>) -> Self {
        self.stop.lock().unwrap().push_back(result.map(str::to_string));
        self
    }

    pub fn answer(self, result: Result<&str>) -> Self {
        self.answer.lock().unwrap().push_back(result.map(str::to_string));
        self
    }

    pub fn speak(self, result: Result<bool>) -> Self {
        self.speak.lock().unwrap().push_back(result);
        self
    }

    /// Hold `stop_recording` until `gate` is notified
    pub fn gate_stop(mut self, gate: &Arc<Notify>) -> Self {
        self.stop_gate = Some(Arc::clone(gate));
        self
    }

    /// Hold `speak` until `gate` is notified
    pub fn gate_speak(mut self, gate: &Arc<Notify>) -> Self {
        self.speak_gate = Some(Arc::clone(gate));
        self
    }

    /// Names of the calls made so far, in order
    pub fn calls(&self) -> Vec<&'static str> {
        self.calls.lock().unwrap().clone()
    }

    fn called(&self, name: &'static str) {
        self.calls.lock().unwrap().push(name);
    }
}

#[async_trait]
impl Services for FakeServices {
    async fn fetch_queued_name(&self, _queue_url: &str) -> Option<String> {
        None
    }

    async fn verify_face(&self, _verify_url: &str, _name: &str) -> Result<Lookup<String>> {
        Ok(Lookup::NotFound)
    }

    async fn start_recording(&self, _whisper_url: &str) -> Result<bool> {
        self.called("start");
        self.start.lock().unwrap().pop_front().unwrap_or(Ok(true))
    }

    async fn stop_recording(&self, _whisper_url: &str) -> Result<String> {
        self.called("stop");
        if let Some(gate) = &self.stop_gate {
            gate.notified().await;
        }
        self.stop.lock().unwrap().pop_front().unwrap_or(Ok(String::new()))
    }

    async fn query_language_model(&self, _llm_url: &str, _question: &str) -> Result<String> {
        self.called("llm");
        self.answer.lock().unwrap().pop_front().unwrap_or(Ok(String::new()))
    }

    async fn speak(&self, _tts_url: &str, _text: &str) -> Result<bool> {
        self.called("speak");
        if let Some(gate) = &self.speak_gate {
            gate.notified().await;
        }
        self.speak.lock().unwrap().pop_front().unwrap_or(Ok(true))
    }
}
