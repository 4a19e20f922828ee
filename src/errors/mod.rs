//! Error handling module for the versioning core.
//!
//! Provides centralized error types with stable error codes and an
//! HTTP-status-equivalent mapping for the calling API layer. The core
//! itself has no notion of HTTP; the numbers are what handlers translate
//! these failures into.

use serde::{Deserialize, Serialize};

/// Error codes as constants to avoid stringly-typed errors.
#[allow(dead_code)]
pub mod codes {
    pub const NOT_FOUND: &str = "NOT_FOUND";
    pub const FORBIDDEN: &str = "FORBIDDEN";
    pub const LOCKED: &str = "LOCKED";
    pub const CONFLICT: &str = "CONFLICT";
    pub const VALIDATION_ERROR: &str = "VALIDATION_ERROR";
    pub const DATABASE_ERROR: &str = "DATABASE_ERROR";
    pub const INTERNAL_ERROR: &str = "INTERNAL_ERROR";
}

/// Application error type.
#[derive(Debug)]
pub enum AppError {
    /// Resource or version not found, or a version id that does not belong
    /// to the claimed resource/tenant
    NotFound(String),
    /// Lock release attempted by someone other than the lock owner
    Forbidden(String),
    /// Mutation or restore attempted while the resource is locked
    Locked(String),
    /// Version-number collision between concurrent writers; retried
    /// internally before surfacing
    Conflict {
        message: String,
        current_version: i64,
    },
    /// Validation error
    Validation(String),
    /// Database error
    Database(String),
    /// Internal error
    Internal(String),
}

impl AppError {
    /// Equivalent HTTP status code for this error.
    pub fn status_code(&self) -> u16 {
        match self {
            AppError::NotFound(_) => 404,
            AppError::Forbidden(_) => 403,
            AppError::Locked(_) => 423,
            AppError::Conflict { .. } => 409,
            AppError::Validation(_) => 400,
            AppError::Database(_) => 500,
            AppError::Internal(_) => 500,
        }
    }

    /// Get the error code for this error.
    pub fn error_code(&self) -> &'static str {
        match self {
            AppError::NotFound(_) => codes::NOT_FOUND,
            AppError::Forbidden(_) => codes::FORBIDDEN,
            AppError::Locked(_) => codes::LOCKED,
            AppError::Conflict { .. } => codes::CONFLICT,
            AppError::Validation(_) => codes::VALIDATION_ERROR,
            AppError::Database(_) => codes::DATABASE_ERROR,
            AppError::Internal(_) => codes::INTERNAL_ERROR,
        }
    }

    /// Get the error message.
    pub fn message(&self) -> String {
        match self {
            AppError::NotFound(msg) => msg.clone(),
            AppError::Forbidden(msg) => msg.clone(),
            AppError::Locked(msg) => msg.clone(),
            AppError::Conflict { message, .. } => message.clone(),
            AppError::Validation(msg) => msg.clone(),
            AppError::Database(msg) => msg.clone(),
            AppError::Internal(msg) => msg.clone(),
        }
    }
}

impl std::fmt::Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.error_code(), self.message())
    }
}

impl std::error::Error for AppError {}

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        tracing::error!("Database error: {:?}", err);
        AppError::Database(format!("Database error: {}", err))
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        tracing::error!("JSON error: {:?}", err);
        AppError::Internal(format!("JSON error: {}", err))
    }
}

/// Error details in the response envelope built by the API layer.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorDetails {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl ErrorDetails {
    pub fn new(error: &AppError) -> Self {
        let details = match error {
            AppError::Conflict {
                current_version, ..
            } => Some(serde_json::json!({ "currentVersion": current_version })),
            _ => None,
        };

        Self {
            code: error.error_code().to_string(),
            message: error.message(),
            details,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        assert_eq!(AppError::NotFound("x".into()).status_code(), 404);
        assert_eq!(AppError::Forbidden("x".into()).status_code(), 403);
        assert_eq!(AppError::Locked("x".into()).status_code(), 423);
        assert_eq!(
            AppError::Conflict {
                message: "x".into(),
                current_version: 3
            }
            .status_code(),
            409
        );
    }

    #[test]
    fn test_conflict_details_carry_current_version() {
        let err = AppError::Conflict {
            message: "collision".into(),
            current_version: 7,
        };
        let details = ErrorDetails::new(&err);
        assert_eq!(details.code, codes::CONFLICT);
        assert_eq!(details.details.unwrap()["currentVersion"], 7);
    }
}
