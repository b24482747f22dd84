use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),
    #[error("Bad request: {0}")]
    Validation(String),
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Internal error: {0}")]
    Internal(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_message) = match self {
            AppError::Config(_) => (StatusCode::INTERNAL_SERVER_ERROR, "Configuration error"),
            AppError::Validation(_) => (StatusCode::BAD_REQUEST, "Bad request"),
            AppError::NotFound(_) => (StatusCode::NOT_FOUND, "Not found"),
            AppError::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error"),
        };

        let body = Json(json!({
            "error": error_message,
            "message": self.to_string()
        }));

        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_app_error_display() {
        let validation_err = AppError::Validation("missing password".to_string());
        assert_eq!(
            validation_err.to_string(),
            "Bad request: missing password"
        );

        let not_found_err = AppError::NotFound("no record for key 7".to_string());
        assert_eq!(not_found_err.to_string(), "Not found: no record for key 7");

        let internal_err = AppError::Internal("test message".to_string());
        assert_eq!(internal_err.to_string(), "Internal error: test message");
    }

    #[test]
    fn test_app_error_into_response() {
        let validation_err = AppError::Validation("missing password".to_string());
        let response = validation_err.into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let not_found_err = AppError::NotFound("no record".to_string());
        let response = not_found_err.into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let internal_err = AppError::Internal("test".to_string());
        let response = internal_err.into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
