use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    // Database errors
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    // Validation errors
    #[error("Validation error: {0}")]
    Validation(String),

    // Authentication errors
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    // Gateway notification errors
    #[error("Invalid signature: {0}")]
    InvalidSignature(String),

    #[error("Missing order reference")]
    MissingOrderReference,

    #[error("Amount mismatch for order {order_id}: expected {expected}, received {received}")]
    AmountMismatch {
        order_id: String,
        expected: String,
        received: String,
    },

    #[error("Notification rejected by gateway: {0}")]
    GatewayValidation(String),

    // HTTP errors
    #[error("HTTP client error: {0}")]
    HttpClient(#[from] reqwest::Error),

    // Not found
    #[error("Resource not found: {0}")]
    NotFound(String),

    // Rate limiting
    #[error("Rate limit exceeded")]
    RateLimitExceeded,

    // Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    // Internal errors
    #[error("Internal server error: {0}")]
    Internal(String),
}

impl AppError {
    /// Client-side errors are never worth a gateway retry.
    pub fn is_retryable(&self) -> bool {
        self.status_code().is_server_error()
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::Validation(_)
            | AppError::InvalidSignature(_)
            | AppError::MissingOrderReference
            | AppError::AmountMismatch { .. }
            | AppError::GatewayValidation(_) => StatusCode::BAD_REQUEST,
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::RateLimitExceeded => StatusCode::TOO_MANY_REQUESTS,
            AppError::HttpClient(_) => StatusCode::BAD_GATEWAY,
            AppError::Database(_) | AppError::Config(_) | AppError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

#[derive(Serialize)]
pub struct ErrorResponse {
    pub success: bool,
    pub error: ErrorDetail,
}

#[derive(Serialize)]
pub struct ErrorDetail {
    pub code: String,
    pub message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        let (code, message) = match &self {
            AppError::Database(e) => {
                tracing::error!("Database error: {:?}", e);
                ("DATABASE_ERROR", "An internal database error occurred".to_string())
            }
            AppError::Validation(msg) => ("VALIDATION_ERROR", msg.clone()),
            AppError::Unauthorized(msg) => ("UNAUTHORIZED", msg.clone()),
            AppError::Forbidden(msg) => ("FORBIDDEN", msg.clone()),
            AppError::InvalidSignature(msg) => ("INVALID_SIGNATURE", msg.clone()),
            AppError::MissingOrderReference => (
                "MISSING_ORDER_REFERENCE",
                "Notification does not identify an order".to_string(),
            ),
            AppError::AmountMismatch { .. } => {
                ("AMOUNT_MISMATCH", "Amount does not match the order".to_string())
            }
            AppError::GatewayValidation(msg) => ("GATEWAY_VALIDATION_FAILED", msg.clone()),
            AppError::HttpClient(e) => {
                tracing::error!("HTTP client error: {:?}", e);
                (
                    "EXTERNAL_SERVICE_ERROR",
                    "Failed to communicate with external service".to_string(),
                )
            }
            AppError::NotFound(msg) => ("NOT_FOUND", msg.clone()),
            AppError::RateLimitExceeded => (
                "RATE_LIMIT_EXCEEDED",
                "Too many requests, please try again later".to_string(),
            ),
            AppError::Config(msg) => {
                tracing::error!("Configuration error: {}", msg);
                ("CONFIG_ERROR", "Server configuration error".to_string())
            }
            AppError::Internal(msg) => {
                tracing::error!("Internal error: {}", msg);
                ("INTERNAL_ERROR", "An internal error occurred".to_string())
            }
        };

        let body = Json(ErrorResponse {
            success: false,
            error: ErrorDetail {
                code: code.to_string(),
                message,
            },
        });

        (status, body).into_response()
    }
}

pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_server_side_failures_are_retryable() {
        assert!(!AppError::InvalidSignature("bad".into()).is_retryable());
        assert!(!AppError::MissingOrderReference.is_retryable());
        assert!(!AppError::Forbidden("ip".into()).is_retryable());
        assert!(!AppError::NotFound("order".into()).is_retryable());
        assert!(AppError::Internal("store down".into()).is_retryable());
        assert!(AppError::Database(sqlx::Error::PoolTimedOut).is_retryable());
    }

    #[test]
    fn test_status_codes() {
        assert_eq!(
            AppError::Forbidden("ip".into()).status_code(),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            AppError::MissingOrderReference.status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            AppError::Config("missing".into()).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
