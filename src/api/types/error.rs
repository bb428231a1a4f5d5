//! OpenAI-compatible error types

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};

use crate::domain::{DomainError, ProviderFailure};

/// Error types matching OpenAI API
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApiErrorType {
    InvalidRequestError,
    ServerError,
    ServiceUnavailableError,
}

impl std::fmt::Display for ApiErrorType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidRequestError => write!(f, "invalid_request_error"),
            Self::ServerError => write!(f, "server_error"),
            Self::ServiceUnavailableError => write!(f, "service_unavailable_error"),
        }
    }
}

/// OpenAI-compatible error response
#[derive(Debug, Clone, Serialize)]
pub struct ApiErrorResponse {
    pub error: ApiErrorDetail,
}

#[derive(Debug, Clone, Serialize)]
pub struct ApiErrorDetail {
    pub message: String,
    #[serde(rename = "type")]
    pub error_type: ApiErrorType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    /// Per-provider outcomes when the whole chain failed
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub failures: Vec<ProviderFailure>,
}

/// API error with status code
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub response: ApiErrorResponse,
}

impl ApiError {
    pub fn new(status: StatusCode, error_type: ApiErrorType, message: impl Into<String>) -> Self {
        Self {
            status,
            response: ApiErrorResponse {
                error: ApiErrorDetail {
                    message: message.into(),
                    error_type,
                    code: None,
                    failures: Vec::new(),
                },
            },
        }
    }

    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.response.error.code = Some(code.into());
        self
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, ApiErrorType::InvalidRequestError, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, ApiErrorType::ServerError, message)
    }

    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::new(
            StatusCode::SERVICE_UNAVAILABLE,
            ApiErrorType::ServiceUnavailableError,
            message,
        )
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(self.response)).into_response()
    }
}

impl From<DomainError> for ApiError {
    fn from(err: DomainError) -> Self {
        let message = err.to_string();

        match err {
            DomainError::Validation { .. } => Self::bad_request(message),
            DomainError::Serialization { .. } => {
                Self::bad_request(message).with_code("invalid_payload")
            }
            DomainError::AllProvidersFailed { failures } => {
                let mut api_error =
                    Self::unavailable(message).with_code("all_providers_failed");
                api_error.response.error.failures = failures;
                api_error
            }
            DomainError::Configuration { .. } | DomainError::Internal { .. } => {
                Self::internal(message)
            }
        }
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}: {}",
            self.response.error.error_type, self.response.error.message
        )
    }
}

impl std::error::Error for ApiError {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ProviderError;

    #[test]
    fn test_validation_maps_to_400() {
        let api_err: ApiError = DomainError::validation("messages must not be empty").into();

        assert_eq!(api_err.status, StatusCode::BAD_REQUEST);
        assert_eq!(api_err.response.error.error_type, ApiErrorType::InvalidRequestError);
    }

    #[test]
    fn test_all_providers_failed_maps_to_503_with_failures() {
        let failures = vec![ProviderFailure::new("Groq", 3, &ProviderError::transient("503"))];
        let api_err: ApiError = DomainError::all_providers_failed(failures).into();

        assert_eq!(api_err.status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(api_err.response.error.code.as_deref(), Some("all_providers_failed"));

        let json = serde_json::to_value(&api_err.response).unwrap();
        assert_eq!(json["error"]["failures"][0]["provider"], "Groq");
        assert_eq!(json["error"]["failures"][0]["attempts"], 3);
    }

    #[test]
    fn test_other_errors_map_to_500() {
        let api_err: ApiError = DomainError::internal("Failed to acquire read lock: poisoned").into();
        assert_eq!(api_err.status, StatusCode::INTERNAL_SERVER_ERROR);

        let json = serde_json::to_string(&api_err.response).unwrap();
        assert!(json.contains("server_error"));
        assert!(!json.contains("failures"));
    }
}
