//! Unified application error model and mapping helpers.
//! This module provides the common error enum surfaced by the HTTP frontend
//! and the service layer, along with the mapping to HTTP status codes.
//!
//! Version conflicts inside the append protocol are deliberately absent here:
//! they are a `storage::StoreError` concern, consumed by the retry loop and
//! never shown to a caller. `Conflict` below is the post-exhaustion outcome.

use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AppError {
    /// Credential bundle is structurally unusable (missing key id or secret).
    MalformedCredentials { message: String },
    /// The identity service rejected the credentials, or could not be asked.
    /// The two cases are intentionally indistinguishable to callers.
    InvalidCredentials { message: String },
    /// No session, or the presented session token is unknown or expired.
    Unauthenticated { message: String },
    /// Group membership resolved successfully but does not permit the action,
    /// or the decision was malformed and we fail closed.
    Forbidden { message: String },
    /// The append retry budget was exhausted under sustained contention.
    Conflict { message: String },
    /// The object store failed for a reason other than "document absent".
    StorageUnavailable { message: String },
    /// The authorization decision service could not be reached.
    AuthzUnavailable { message: String },
    Internal { message: String },
}

impl AppError {
    pub fn code_str(&self) -> &'static str {
        match self {
            AppError::MalformedCredentials { .. } => "malformed_credentials",
            AppError::InvalidCredentials { .. } => "invalid_credentials",
            AppError::Unauthenticated { .. } => "unauthenticated",
            AppError::Forbidden { .. } => "forbidden",
            AppError::Conflict { .. } => "conflict",
            AppError::StorageUnavailable { .. } => "storage_unavailable",
            AppError::AuthzUnavailable { .. } => "authz_unavailable",
            AppError::Internal { .. } => "internal",
        }
    }

    pub fn message(&self) -> &str {
        match self {
            AppError::MalformedCredentials { message }
            | AppError::InvalidCredentials { message }
            | AppError::Unauthenticated { message }
            | AppError::Forbidden { message }
            | AppError::Conflict { message }
            | AppError::StorageUnavailable { message }
            | AppError::AuthzUnavailable { message }
            | AppError::Internal { message } => message.as_str(),
        }
    }

    pub fn malformed_credentials<S: Into<String>>(msg: S) -> Self { AppError::MalformedCredentials { message: msg.into() } }
    pub fn invalid_credentials<S: Into<String>>(msg: S) -> Self { AppError::InvalidCredentials { message: msg.into() } }
    pub fn unauthenticated<S: Into<String>>(msg: S) -> Self { AppError::Unauthenticated { message: msg.into() } }
    pub fn forbidden<S: Into<String>>(msg: S) -> Self { AppError::Forbidden { message: msg.into() } }
    pub fn conflict<S: Into<String>>(msg: S) -> Self { AppError::Conflict { message: msg.into() } }
    pub fn storage_unavailable<S: Into<String>>(msg: S) -> Self { AppError::StorageUnavailable { message: msg.into() } }
    pub fn authz_unavailable<S: Into<String>>(msg: S) -> Self { AppError::AuthzUnavailable { message: msg.into() } }
    pub fn internal<S: Into<String>>(msg: S) -> Self { AppError::Internal { message: msg.into() } }

    /// Map to HTTP status code.
    pub fn http_status(&self) -> u16 {
        match self {
            AppError::MalformedCredentials { .. } => 400,
            AppError::InvalidCredentials { .. } => 401,
            AppError::Unauthenticated { .. } => 401,
            AppError::Forbidden { .. } => 403,
            AppError::Conflict { .. } => 409,
            AppError::StorageUnavailable { .. } => 503,
            AppError::AuthzUnavailable { .. } => 503,
            AppError::Internal { .. } => 500,
        }
    }
}

impl Display for AppError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.code_str(), self.message())
    }
}

impl std::error::Error for AppError {}

pub type AppResult<T> = Result<T, AppError>;

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        AppError::Internal { message: err.to_string() }
    }
}
