//! Error taxonomy for remote service calls

use std::path::PathBuf;

use reqwest::StatusCode;

/// Errors returned by the remote service client
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// Connection refused, timeout, or any other transport failure
    #[error("request to {url} failed: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    /// The service answered with a non-2xx status
    #[error("request to {url} returned {status}")]
    Status { url: String, status: StatusCode },

    /// The body could not be decoded as the expected JSON document
    #[error("malformed response from {url}: {source}")]
    Malformed {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    /// A required service URL was not configured
    #[error("{0} URL must be provided")]
    Configuration(&'static str),

    /// An expected local file is absent or empty
    #[error("file is missing or empty: {}", .0.display())]
    MissingFile(PathBuf),

    /// The upload body for a local file could not be built
    #[error("failed to prepare upload of {}: {source}", path.display())]
    Attachment {
        path: PathBuf,
        #[source]
        source: reqwest::Error,
    },

    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl ClientError {
    /// True for transport, status and decoding failures
    pub fn is_call_failure(&self) -> bool {
        matches!(
            self,
            ClientError::Transport { .. } | ClientError::Status { .. } | ClientError::Malformed { .. }
        )
    }

    /// HTTP status carried by a `Status` failure
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            ClientError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, ClientError>;
