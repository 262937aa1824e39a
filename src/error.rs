// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Error types shared by the session manager and its collaborators.

/// Application error type.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Not authenticated")]
    NotAuthenticated,

    #[error("Identity provider error: {0}")]
    Provider(String),

    #[error("Local storage error: {0}")]
    Storage(String),

    #[error("Remote store error: {0}")]
    Remote(String),

    #[error("Card cache corrupt: {0}")]
    CacheCorrupt(String),

    #[error("Invalid path segment: {0}")]
    InvalidPath(String),

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    /// Message used when the remote store cannot be reached at all.
    pub const REMOTE_UNREACHABLE: &'static str = "Remote store unreachable";

    /// Message used when the user dismisses the provider's login flow.
    pub const PROVIDER_CANCELLED: &'static str = "Login cancelled by user";

    pub fn is_not_authenticated(&self) -> bool {
        matches!(self, AppError::NotAuthenticated)
    }

    /// Whether repeating the same call later could succeed.
    ///
    /// Network-level failures are retryable; bad input, missing sessions and
    /// corrupt caches are not.
    pub fn is_retryable(&self) -> bool {
        match self {
            AppError::Remote(msg) => {
                msg.contains(Self::REMOTE_UNREACHABLE)
                    || msg.to_lowercase().contains("timed out")
                    || msg.to_lowercase().contains("unavailable")
            }
            AppError::Provider(msg) => {
                !msg.contains(Self::PROVIDER_CANCELLED)
                    && (msg.to_lowercase().contains("network")
                        || msg.to_lowercase().contains("timed out"))
            }
            _ => false,
        }
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(err: validator::ValidationErrors) -> Self {
        AppError::Validation(err.to_string())
    }
}

/// Result type alias used across the crate.
pub type Result<T> = std::result::Result<T, AppError>;
