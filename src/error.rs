// src/error.rs
use reqwest::StatusCode;
use thiserror::Error;

use crate::validation::ValidationError;

pub type Result<T, E = ClientError> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum ClientError {
    /// Login was rejected, or the token response did not parse.
    #[error("authentication failed ({status}): {body}")]
    Auth { status: StatusCode, body: String },

    #[error("core-networks API returned {status}")]
    Remote { status: StatusCode },

    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("operation cancelled")]
    Cancelled,

    #[error("record {name:?} in zone {zone} has non-numeric TTL {value:?}")]
    InvalidTtl {
        zone: String,
        name: String,
        value: String,
    },

    #[error("malformed response body: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid zone name: {0}")]
    InvalidZone(#[from] ValidationError),
}

impl ClientError {
    /// Connection, timeout and cancellation failures. These abort a batch
    /// instead of being skipped per record.
    pub fn is_transport(&self) -> bool {
        matches!(self, ClientError::Transport(_) | ClientError::Cancelled)
    }

    pub fn is_format(&self) -> bool {
        matches!(self, ClientError::InvalidTtl { .. } | ClientError::Json(_))
    }

    pub fn status(&self) -> Option<StatusCode> {
        match self {
            ClientError::Auth { status, .. } | ClientError::Remote { status } => Some(*status),
            _ => None,
        }
    }
}
