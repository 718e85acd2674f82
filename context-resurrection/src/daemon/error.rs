//! Client-observable failures of a daemon call.

use super::protocol::{DaemonErrorCode, ErrorDisposition};
use std::time::Duration;
use thiserror::Error;

/// Message shown in place of a generic error when versions disagree
pub const UPDATE_PROMPT_MESSAGE: &str =
    "Right Now needs an update to talk to the running session daemon. Please update the app.";

#[derive(Debug, Error)]
pub enum CrError {
    /// The daemon answered with an `error` response
    #[error("{code}: {message}")]
    Daemon {
        code: DaemonErrorCode,
        message: String,
    },

    /// No response was produced: socket missing, connect refused, or closed early
    #[error("daemon unavailable: {0}")]
    DaemonUnavailable(String),

    /// No response within the bounded wait; the effect on the daemon is unknown
    #[error("daemon did not respond within {0:?}")]
    Timeout(Duration),

    /// The daemon replied with something this client cannot accept
    #[error("protocol violation: {0}")]
    Protocol(String),

    #[error("failed to encode request: {0}")]
    Encode(#[from] serde_json::Error),
}

impl CrError {
    /// Error taxonomy code for this failure
    pub fn code(&self) -> DaemonErrorCode {
        match self {
            CrError::Daemon { code, .. } => *code,
            CrError::DaemonUnavailable(_) => DaemonErrorCode::DaemonUnavailable,
            CrError::Timeout(_) => DaemonErrorCode::Timeout,
            CrError::Protocol(_) => DaemonErrorCode::Internal,
            CrError::Encode(_) => DaemonErrorCode::InvalidRequest,
        }
    }

    pub fn disposition(&self) -> ErrorDisposition {
        self.code().disposition()
    }

    pub fn is_version_mismatch(&self) -> bool {
        self.code() == DaemonErrorCode::VersionMismatch
    }

    /// Text suitable for the user. Version mismatches get the update prompt,
    /// never the raw daemon message.
    pub fn user_message(&self) -> String {
        match self.disposition() {
            ErrorDisposition::UpdatePrompt => UPDATE_PROMPT_MESSAGE.to_string(),
            _ => self.to_string(),
        }
    }

    /// Log this error at the level its disposition calls for
    pub fn report(&self, operation: &str) {
        match self.disposition() {
            ErrorDisposition::Silent => {
                tracing::debug!(operation, code = %self.code(), "{}", self)
            }
            ErrorDisposition::Logged => {
                tracing::warn!(operation, code = %self.code(), "{}", self)
            }
            ErrorDisposition::Loud => {
                tracing::error!(operation, code = %self.code(), "client bug: {}", self)
            }
            ErrorDisposition::UpdatePrompt => {
                tracing::error!(operation, code = %self.code(), "version mismatch: {}", self)
            }
        }
    }
}
