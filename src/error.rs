use reqwest::StatusCode;
use std::path::PathBuf;

/// Failures of a call against the remote task API.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// No session token was available for an authenticated call.
    #[error("Unauthorized: No JWT Token found.")]
    MissingSession,

    /// The server answered with a non-success status.
    #[error("request failed with status {status}")]
    Status {
        status: StatusCode,
        /// `message` field of the error body, when the server sent one.
        message: Option<String>,
    },

    /// The request never got an answer (connection, TLS, body read).
    #[error(transparent)]
    Transport(#[from] reqwest::Error),

    #[error("unexpected response body: {0}")]
    Decode(#[from] serde_json::Error),
}

impl ApiError {
    pub fn is_transport(&self) -> bool {
        matches!(self, ApiError::Transport(_))
    }

    pub fn server_message(&self) -> Option<&str> {
        match self {
            ApiError::Status { message, .. } => message.as_deref(),
            _ => None,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("failed to access session file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed session file: {0}")]
    Format(#[from] serde_json::Error),
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("could not determine a config directory; pass --session-file")]
    NoConfigDir,
}
