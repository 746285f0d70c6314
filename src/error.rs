/// Application Error Handling
///
/// A closed error taxonomy shared by every route and middleware:
/// 1. Domain-specific error types (validation, authentication, configuration)
/// 2. One unified `AppError` that handlers return with `?`
/// 3. HTTP response mapping with structured logging
///
/// Verification paths (password, access token, refresh token, cookies)
/// never produce these errors: an invalid credential is an expected outcome
/// and is reported as `false`/`None` by the `auth` module.

use actix_web::{error::ResponseError, http::StatusCode, HttpResponse};

use crate::store::StoreError;

// ============================================================================
// DOMAIN-SPECIFIC ERROR TYPES
// ============================================================================

/// Validation errors for request input
#[derive(Debug, Clone, thiserror::Error)]
pub enum ValidationError {
    #[error("{0} is required")]
    EmptyField(String),
    #[error("{0} must be at most {1} characters")]
    TooLong(String, usize),
    #[error("{0}")]
    InvalidFormat(String),
    #[error("Invalid request body: {0}")]
    InvalidBody(String),
}

/// Authentication and authorization errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AuthError {
    /// Unknown email and wrong password share this variant on purpose
    #[error("Invalid email or password")]
    InvalidCredentials,
    #[error("No refresh token")]
    MissingToken,
    #[error("Invalid refresh token")]
    TokenInvalid,
    #[error("Authentication required")]
    Unauthenticated,
    #[error("Administrator access required")]
    Forbidden,
}

/// Configuration errors, fatal at startup
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required config: {0}")]
    MissingRequired(String),
    #[error("Invalid duration format: \"{0}\". Expected <number><unit> where unit is m, h or d")]
    InvalidDuration(String),
    #[error("Config load error: {0}")]
    Load(#[from] config::ConfigError),
}

// ============================================================================
// UNIFIED APPLICATION ERROR TYPE
// ============================================================================

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Auth(#[from] AuthError),
    #[error("{0}")]
    NotFound(String),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<actix_web::error::BlockingError> for AppError {
    fn from(err: actix_web::error::BlockingError) -> Self {
        AppError::Internal(format!("Blocking task failed: {}", err))
    }
}

// ============================================================================
// HTTP RESPONSE MAPPING
// ============================================================================

/// JSON body returned for every failed request
#[derive(Debug, serde::Serialize)]
pub struct ErrorResponse {
    /// Human-readable message, safe to show to the client
    pub error: String,
    /// Machine-readable error code
    pub code: &'static str,
    /// Unique id correlating the response with the server log line
    pub error_id: String,
    pub status: u16,
    pub timestamp: String,
}

impl ErrorResponse {
    pub fn new(error: String, code: &'static str, error_id: String, status: StatusCode) -> Self {
        Self {
            error,
            code,
            error_id,
            status: status.as_u16(),
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }
}

impl AppError {
    /// Status code, machine code and client-facing message
    fn parts(&self) -> (StatusCode, &'static str, String) {
        match self {
            AppError::Validation(e) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", e.to_string()),
            AppError::Auth(e) => match e {
                AuthError::InvalidCredentials => {
                    (StatusCode::UNAUTHORIZED, "INVALID_CREDENTIALS", e.to_string())
                }
                AuthError::MissingToken => (StatusCode::UNAUTHORIZED, "MISSING_TOKEN", e.to_string()),
                AuthError::TokenInvalid => (StatusCode::UNAUTHORIZED, "TOKEN_INVALID", e.to_string()),
                AuthError::Unauthenticated => (StatusCode::UNAUTHORIZED, "UNAUTHORIZED", e.to_string()),
                AuthError::Forbidden => (StatusCode::FORBIDDEN, "FORBIDDEN", e.to_string()),
            },
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, "NOT_FOUND", msg.clone()),
            AppError::Store(e) => match e {
                StoreError::Conflict(msg) => (StatusCode::CONFLICT, "DUPLICATE_ENTRY", msg.clone()),
                StoreError::Unavailable(_) => (
                    StatusCode::SERVICE_UNAVAILABLE,
                    "SERVICE_UNAVAILABLE",
                    "Storage service temporarily unavailable".to_string(),
                ),
                _ => (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "STORE_ERROR",
                    "Storage error occurred".to_string(),
                ),
            },
            AppError::Config(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "CONFIG_ERROR",
                "Server configuration error".to_string(),
            ),
            AppError::Internal(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "INTERNAL_ERROR",
                "Internal server error".to_string(),
            ),
        }
    }

    fn log(&self, error_id: &str) {
        match self {
            AppError::Validation(e) => {
                tracing::warn!(error_id = error_id, error = %e, "Validation error");
            }
            AppError::Auth(AuthError::InvalidCredentials) => {
                tracing::warn!(error_id = error_id, "Invalid credentials attempt");
            }
            AppError::Auth(e) => {
                tracing::warn!(error_id = error_id, error = %e, "Authentication error");
            }
            AppError::NotFound(msg) => {
                tracing::info!(error_id = error_id, error = %msg, "Resource not found");
            }
            AppError::Store(StoreError::Conflict(msg)) => {
                tracing::warn!(error_id = error_id, error = %msg, "Duplicate entry attempt");
            }
            AppError::Store(e) => {
                tracing::error!(error_id = error_id, error = %e, "Store error");
            }
            AppError::Config(e) => {
                tracing::error!(error_id = error_id, error = %e, "Configuration error");
            }
            AppError::Internal(msg) => {
                tracing::error!(error_id = error_id, error = %msg, "Internal error");
            }
        }
    }
}

impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        self.parts().0
    }

    fn error_response(&self) -> HttpResponse {
        let error_id = uuid::Uuid::new_v4().to_string();
        self.log(&error_id);

        let (status, code, message) = self.parts();
        HttpResponse::build(status).json(ErrorResponse::new(message, code, error_id, status))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_error_display() {
        let err = ValidationError::EmptyField("password".to_string());
        assert_eq!(err.to_string(), "password is required");
    }

    #[test]
    fn test_invalid_credentials_message_is_generic() {
        let err = AppError::from(AuthError::InvalidCredentials);
        let (status, code, message) = err.parts();

        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(code, "INVALID_CREDENTIALS");
        assert_eq!(message, "Invalid email or password");
    }

    #[test]
    fn test_status_codes() {
        assert_eq!(AppError::from(AuthError::Unauthenticated).status_code(), StatusCode::UNAUTHORIZED);
        assert_eq!(AppError::from(AuthError::Forbidden).status_code(), StatusCode::FORBIDDEN);
        assert_eq!(AppError::NotFound("User not found".into()).status_code(), StatusCode::NOT_FOUND);
        assert_eq!(
            AppError::from(StoreError::Conflict("taken".into())).status_code(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            AppError::from(StoreError::Unavailable("pool".into())).status_code(),
            StatusCode::SERVICE_UNAVAILABLE
        );
        assert_eq!(AppError::Internal("boom".into()).status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_store_details_do_not_leak() {
        let err = AppError::from(StoreError::Backend("relation \"users\" does not exist".into()));
        let (_, _, message) = err.parts();
        assert_eq!(message, "Storage error occurred");
    }

    #[test]
    fn test_error_response_creation() {
        let response = ErrorResponse::new(
            "Test error".to_string(),
            "TEST_ERROR",
            "test-123".to_string(),
            StatusCode::BAD_REQUEST,
        );

        assert_eq!(response.error_id, "test-123");
        assert_eq!(response.code, "TEST_ERROR");
        assert_eq!(response.status, 400);
    }
}
