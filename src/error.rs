// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Application error types shared by the repository, auth client and dashboard.

/// Application error type.
///
/// Repository calls fail with `Transport`, `Query` or `Unauthorized`; the
/// dashboard adds `Validation`, `NotFound` and `InvalidState` for user actions
/// it refuses before contacting the backend.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Backend unreachable: {0}")]
    Transport(String),

    #[error("Query rejected (HTTP {status}): {message}")]
    Query { status: u16, message: String },

    #[error("Invalid input: {0}")]
    Validation(String),

    #[error("Not authorized: {0}")]
    Unauthorized(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Action not allowed: {0}")]
    InvalidState(String),

    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    /// Message shown when an offer cannot be completed because it has no link.
    pub const MISSING_LINK: &'static str = "This offer does not have a valid link.";

    /// Whether the failure happened before the backend produced a response.
    pub fn is_transport(&self) -> bool {
        matches!(self, AppError::Transport(_))
    }

    /// Whether the backend rejected our credentials or token.
    pub fn is_unauthorized(&self) -> bool {
        match self {
            AppError::Unauthorized(_) => true,
            AppError::Query { status, .. } => *status == 401,
            _ => false,
        }
    }

    /// Map a non-success response into `Query` or `Unauthorized`.
    pub(crate) fn from_status(status: reqwest::StatusCode, body: String) -> Self {
        let message = extract_message(&body).unwrap_or(body);
        if status == reqwest::StatusCode::UNAUTHORIZED {
            return AppError::Unauthorized(message);
        }
        AppError::Query {
            status: status.as_u16(),
            message,
        }
    }
}

impl From<reqwest::Error> for AppError {
    fn from(err: reqwest::Error) -> Self {
        AppError::Transport(err.to_string())
    }
}

/// Pull a human-readable message out of a backend error body.
///
/// The REST layer answers `{"message": ...}`, the auth layer uses
/// `error_description` or `msg`.
fn extract_message(body: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(body).ok()?;
    ["message", "error_description", "msg", "error"]
        .iter()
        .find_map(|key| value.get(*key).and_then(|v| v.as_str()))
        .map(str::to_string)
}

/// Result type alias
pub type Result<T> = std::result::Result<T, AppError>;
