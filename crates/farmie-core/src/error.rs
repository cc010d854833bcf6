//! Error taxonomy shared by the weather aggregator and the recommendation workflow.
//!
//! Every lower-level failure (transport, HTTP status, payload shape, local
//! preconditions) is re-surfaced as a [`FarmieError`]. The UI only needs the
//! coarse [`ErrorKind`] plus a display-safe [`FarmieError::user_message`];
//! raw upstream text stays in the error for logging.

use thiserror::Error;

/// Coarse failure category the UI branches on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// No response: connectivity failure or timeout.
    Transport,
    /// Non-success status from one of the backend endpoints.
    Upstream,
    /// Payload missing expected fields, or weather series of unequal length.
    MalformedResponse,
    /// Missing or expired session token.
    Unauthenticated,
    /// Local precondition violated; nothing was sent.
    MissingContext,
    /// Weather statistics requested over zero samples.
    EmptySeries,
    /// Captured image could not be read for upload.
    ImageUnreadable,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FarmieError {
    #[error("Connection failed: {0}")]
    Transport(String),

    #[error("Request timed out")]
    Timeout,

    #[error("Server error: {status} - {message}")]
    Upstream { status: u16, message: String },

    #[error("Malformed response: {0}")]
    MalformedResponse(String),

    #[error("Not authenticated")]
    Unauthenticated,

    #[error("Missing context: {0}")]
    MissingContext(&'static str),

    #[error("No samples to aggregate")]
    EmptySeries,

    #[error("Image unreadable: {0}")]
    ImageUnreadable(String),
}

impl FarmieError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            FarmieError::Transport(_) | FarmieError::Timeout => ErrorKind::Transport,
            FarmieError::Upstream { .. } => ErrorKind::Upstream,
            FarmieError::MalformedResponse(_) => ErrorKind::MalformedResponse,
            FarmieError::Unauthenticated => ErrorKind::Unauthenticated,
            FarmieError::MissingContext(_) => ErrorKind::MissingContext,
            FarmieError::EmptySeries => ErrorKind::EmptySeries,
            FarmieError::ImageUnreadable(_) => ErrorKind::ImageUnreadable,
        }
    }

    /// Returns a user-friendly message suitable for display in the UI.
    ///
    /// Upstream error text is never included; it is only logged.
    pub fn user_message(&self) -> &'static str {
        match self {
            FarmieError::Transport(_) => "Could not reach the server. Check your connection.",
            FarmieError::Timeout => "The request timed out. Please try again.",
            FarmieError::Upstream { status, .. } if *status >= 500 => {
                "The server is experiencing issues. Please try again later."
            }
            FarmieError::Upstream { .. } => "The request failed. Please try again.",
            FarmieError::MalformedResponse(_) => "Invalid data received from the server.",
            FarmieError::Unauthenticated => "Your session has expired. Please log in again.",
            FarmieError::MissingContext(_) => "Some information is missing for this action.",
            FarmieError::EmptySeries => "No data available for this location.",
            FarmieError::ImageUnreadable(_) => "The selected image could not be read.",
        }
    }

    /// Whether the UI should send the user back to the login screen.
    pub fn should_reauthenticate(&self) -> bool {
        matches!(self, FarmieError::Unauthenticated)
    }

    /// Whether offering a manual retry makes sense.
    pub fn is_retryable(&self) -> bool {
        matches!(self.kind(), ErrorKind::Transport | ErrorKind::Upstream)
    }
}

/// Extension trait for converting reqwest errors to our error types.
pub trait ReqwestErrorExt {
    fn into_farmie_error(self) -> FarmieError;
}

impl ReqwestErrorExt for reqwest::Error {
    fn into_farmie_error(self) -> FarmieError {
        if self.is_timeout() {
            FarmieError::Timeout
        } else if self.is_decode() {
            FarmieError::MalformedResponse(self.to_string())
        } else if let Some(status) = self.status() {
            FarmieError::Upstream {
                status: status.as_u16(),
                message: self.to_string(),
            }
        } else {
            FarmieError::Transport(self.to_string())
        }
    }
}
