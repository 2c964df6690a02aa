//! Relay error type
//!
//! Every failure a relay mode can hit. The dispatcher turns these into
//! `{"error": message}` bodies with the status from [`RelayError::status`].

use hyper::StatusCode;

#[derive(Debug, thiserror::Error)]
pub enum RelayError {
    /// DNS, connect, TLS or body read failure on an outbound call
    #[error("{0}")]
    Transport(#[from] reqwest::Error),

    #[error("{context} failed: {}", .status.as_u16())]
    UpstreamStatus {
        context: &'static str,
        status: StatusCode,
    },

    /// Upstream answered, but not in the expected shape
    #[error("malformed upstream response: {0}")]
    Malformed(String),

    /// Inbound body misses a field the configuration requires
    #[error("{0}")]
    InvalidRequest(String),
}

impl RelayError {
    pub const fn status(&self) -> StatusCode {
        match self {
            Self::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            Self::Transport(_) | Self::UpstreamStatus { .. } | Self::Malformed(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl From<serde_json::Error> for RelayError {
    fn from(e: serde_json::Error) -> Self {
        Self::Malformed(e.to_string())
    }
}
