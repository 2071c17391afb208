//! Configuration loading and management
//!
//! Every option can come from a command-line flag or from the environment
//! (including a `.env` file in the working directory).

use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;

use crate::identity::IdentityEndpoints;
use crate::input::InputBackend;
use crate::session::Endpoints;

/// Session daemon configuration
#[derive(Debug, Clone, Parser)]
#[command(name = "voice-session", version, about = "Push-to-talk voice assistant session")]
pub struct Config {
    /// Base URL of the name-queue service
    #[arg(long, env = "RFID_URL", default_value = "")]
    pub queue_url: String,

    /// Base URL of the face-verification service
    #[arg(long, env = "FACE_VERIFICATION_URL", default_value = "")]
    pub face_verification_url: String,

    /// Base URL of the transcription service
    #[arg(long, env = "WHISPER_API_URL", default_value = "")]
    pub whisper_url: String,

    /// URL of the language-model service
    #[arg(long, env = "LLM_API_URL", default_value = "")]
    pub llm_url: String,

    /// URL of the speech-synthesis service
    #[arg(long, env = "TTS_API_URL", default_value = "")]
    pub tts_url: String,

    /// Where to upload the transcript when the session ends
    #[arg(long, env = "VLM_URL")]
    pub vlm_url: Option<String>,

    /// Conversation transcript file
    #[arg(long, env = "TRANSCRIPT_LOG_FILE", default_value = "transcript.log")]
    pub transcript_path: PathBuf,

    /// User name when identity verification is skipped
    #[arg(long, env = "USER", default_value = "guest")]
    pub user_name: String,

    /// Skip the name queue and face verification
    #[arg(short = 's', long)]
    pub skip_verification: bool,

    /// Delay between identity polls, in milliseconds
    #[arg(long, env = "POLL_INTERVAL_MS", default_value_t = 1000)]
    pub poll_interval_ms: u64,

    /// Where key presses are read from
    #[arg(long, env = "INPUT_BACKEND", value_enum, default_value_t = InputBackend::Terminal)]
    pub input: InputBackend,
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("missing {name} URL (set --{flag} or {env})")]
    MissingUrl {
        name: &'static str,
        flag: &'static str,
        env: &'static str,
    },
}

impl Config {
    /// Load configuration from `.env`, the environment and the command line
    pub fn load() -> Self {
        // The .env file is optional
        let _ = dotenvy::dotenv();
        Self::parse()
    }

    /// Check that every URL the session needs is present
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut required = vec![
            (&self.whisper_url, "transcription", "whisper-url", "WHISPER_API_URL"),
            (&self.llm_url, "language model", "llm-url", "LLM_API_URL"),
            (&self.tts_url, "speech synthesis", "tts-url", "TTS_API_URL"),
        ];
        if !self.skip_verification {
            required.push((&self.queue_url, "name queue", "queue-url", "RFID_URL"));
            required.push((
                &self.face_verification_url,
                "face verification",
                "face-verification-url",
                "FACE_VERIFICATION_URL",
            ));
        }

        for (value, name, flag, env) in required {
            if value.trim().is_empty() {
                return Err(ConfigError::MissingUrl { name, flag, env });
            }
        }

        Ok(())
    }

    pub fn endpoints(&self) -> Endpoints {
        Endpoints {
            whisper_url: self.whisper_url.clone(),
            llm_url: self.llm_url.clone(),
            tts_url: self.tts_url.clone(),
        }
    }

    pub fn identity_endpoints(&self) -> IdentityEndpoints {
        IdentityEndpoints {
            queue_url: self.queue_url.clone(),
            face_verification_url: self.face_verification_url.clone(),
        }
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    /// Transcript upload target, if configured
    pub fn vlm_url(&self) -> Option<&str> {
        self.vlm_url.as_deref().filter(|url| !url.trim().is_empty())
    }
}
