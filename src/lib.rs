//! voice-session: push-to-talk voice assistant session daemon
//!
//! Provides:
//! - Identity verification through a name queue and a face-verification service
//! - An explicit state machine driving record → transcribe → answer → speak
//! - Key listeners mapping SPACE/Q to toggle/quit
//! - An append-only conversation transcript
//! - The name-queue HTTP service used during identity verification

pub mod client;
pub mod config;
pub mod events;
pub mod identity;
pub mod input;
pub mod lifecycle;
pub mod logging;
pub mod queue;
pub mod session;
pub mod transcript;

#[cfg(test)]
mod testing;

pub use client::{ClientError, Lookup, RemoteClient, Services};
pub use config::Config;
pub use events::SessionEvent;
pub use identity::verify_identity;
pub use session::{Endpoints, SessionMachine, State};
pub use transcript::{ConversationTurn, FileTranscript, MemoryTranscript, Speaker, TranscriptSink};
