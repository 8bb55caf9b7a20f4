//! Error types for foodgram.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// Application result type.
pub type AppResult<T> = Result<T, AppError>;

/// Application error type.
#[derive(Debug, Error)]
pub enum AppError {
    // === Client Errors ===
    /// A resource does not exist.
    #[error("Not found: {0}")]
    NotFound(String),

    /// No user with the given id.
    #[error("User not found: {0}")]
    UserNotFound(String),

    /// No recipe with the given id.
    #[error("Recipe not found: {0}")]
    RecipeNotFound(String),

    /// Missing or unknown credentials.
    #[error("Unauthorized")]
    Unauthorized,

    /// Authenticated, but not allowed to touch this resource.
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// Malformed request.
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Payload failed validation without a single field to blame.
    #[error("Validation error: {0}")]
    Validation(String),

    /// A single request field failed validation.
    #[error("{field}: {message}")]
    InvalidField {
        /// Name of the offending field.
        field: String,
        /// What is wrong with it.
        message: String,
    },

    /// The resource already exists (duplicate membership, subscription, user).
    #[error("Conflict: {0}")]
    Conflict(String),

    /// A relation that was asked to be removed does not exist.
    #[error("{0}")]
    NotInList(String),

    // === Server Errors ===
    /// Query or connection failure.
    #[error("Database error: {0}")]
    Database(String),

    /// Image storage failure.
    #[error("Storage error: {0}")]
    Storage(String),

    /// Configuration could not be loaded.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Anything else.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Shorthand for a field-scoped validation error.
    pub fn field(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidField {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Returns the HTTP status code for this error.
    #[must_use]
    pub const fn status_code(&self) -> StatusCode {
        match self {
            // 4xx Client Errors
            Self::NotFound(_) | Self::UserNotFound(_) | Self::RecipeNotFound(_) => {
                StatusCode::NOT_FOUND
            }
            Self::Unauthorized => StatusCode::UNAUTHORIZED,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::BadRequest(_)
            | Self::Validation(_)
            | Self::InvalidField { .. }
            | Self::Conflict(_)
            | Self::NotInList(_) => StatusCode::BAD_REQUEST,

            // 5xx Server Errors
            Self::Database(_) | Self::Storage(_) | Self::Config(_) | Self::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Returns the error code for API responses.
    #[must_use]
    pub const fn error_code(&self) -> &'static str {
        match self {
            Self::NotFound(_) => "NOT_FOUND",
            Self::UserNotFound(_) => "USER_NOT_FOUND",
            Self::RecipeNotFound(_) => "RECIPE_NOT_FOUND",
            Self::Unauthorized => "UNAUTHORIZED",
            Self::Forbidden(_) => "FORBIDDEN",
            Self::BadRequest(_) => "BAD_REQUEST",
            Self::Validation(_) | Self::InvalidField { .. } => "VALIDATION_ERROR",
            Self::Conflict(_) => "CONFLICT",
            Self::NotInList(_) => "NOT_IN_LIST",
            Self::Database(_) => "DATABASE_ERROR",
            Self::Storage(_) => "STORAGE_ERROR",
            Self::Config(_) => "CONFIG_ERROR",
            Self::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// Returns whether this error should be logged at error level.
    #[must_use]
    pub fn is_server_error(&self) -> bool {
        self.status_code().is_server_error()
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let code = self.error_code();

        if self.is_server_error() {
            tracing::error!(error = %self, code = code, "Server error occurred");
        } else {
            tracing::debug!(error = %self, code = code, "Client error occurred");
        }

        let body = match &self {
            Self::InvalidField { field, message } => json!({
                "error": {
                    "code": code,
                    "field": field,
                    "message": message,
                }
            }),
            _ => json!({
                "error": {
                    "code": code,
                    "message": self.to_string(),
                }
            }),
        };

        (status, Json(body)).into_response()
    }
}

// === From implementations ===

impl From<validator::ValidationErrors> for AppError {
    fn from(err: validator::ValidationErrors) -> Self {
        // Report the first offending field so clients can highlight it.
        let first = err
            .field_errors()
            .into_iter()
            .min_by_key(|(field, _)| *field)
            .map(|(field, errors)| {
                let message = errors
                    .iter()
                    .filter_map(|e| e.message.as_ref().map(ToString::to_string))
                    .next()
                    .unwrap_or_else(|| format!("invalid value for {field}"));
                (field.to_string(), message)
            });

        match first {
            Some((field, message)) => Self::InvalidField { field, message },
            None => Self::Validation(err.to_string()),
        }
    }
}

impl From<config::ConfigError> for AppError {
    fn from(err: config::ConfigError) -> Self {
        Self::Config(err.to_string())
    }
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        Self::Internal(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_conflicts_and_missing_relations_are_bad_requests() {
        assert_eq!(
            AppError::Conflict("dup".to_string()).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            AppError::NotInList("absent".to_string()).status_code(),
            StatusCode::BAD_REQUEST
        );
    }

    #[test]
    fn test_missing_root_entity_is_not_found() {
        assert_eq!(
            AppError::RecipeNotFound("r1".to_string()).status_code(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            AppError::UserNotFound("u1".to_string()).status_code(),
            StatusCode::NOT_FOUND
        );
    }

    #[test]
    fn test_field_error_display() {
        let err = AppError::field("ingredients", "duplicate ingredient i1");
        assert_eq!(err.to_string(), "ingredients: duplicate ingredient i1");
        assert_eq!(err.error_code(), "VALIDATION_ERROR");
    }

    #[test]
    fn test_server_errors() {
        assert!(AppError::Database("boom".to_string()).is_server_error());
        assert!(!AppError::Unauthorized.is_server_error());
        assert_eq!(
            AppError::Forbidden("no".to_string()).status_code(),
            StatusCode::FORBIDDEN
        );
    }
}
