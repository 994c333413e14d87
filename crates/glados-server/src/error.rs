use axum::{
    Json,
    extract::rejection::{FormRejection, JsonRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use glados_engine::EngineError;
use serde::Serialize;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, ServerError>;

/// HTTP facade errors with appropriate status codes
#[derive(Debug, Error)]
pub enum ServerError {
    #[error(transparent)]
    Engine(#[from] EngineError),

    /// Malformed query string or body
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// No stored audio file with this name
    #[error("Audio file '{0}' not found")]
    NotFound(String),

    /// Failure outside the engine; details are logged, never returned
    #[error("Internal server error")]
    Internal(String),
}

impl ServerError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Engine(err) => match err {
                EngineError::Input(_) => StatusCode::BAD_REQUEST,
                EngineError::Timeout(_) => StatusCode::GATEWAY_TIMEOUT,
                EngineError::NotStarted | EngineError::BackendLoad(_) => StatusCode::SERVICE_UNAVAILABLE,
                EngineError::Inference(_) | EngineError::Storage(_) | EngineError::AlreadyStarted => {
                    StatusCode::INTERNAL_SERVER_ERROR
                }
            },
            Self::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn error_type(&self) -> &'static str {
        match self {
            Self::Engine(EngineError::Input(_)) | Self::InvalidRequest(_) => "invalid_request_error",
            Self::Engine(EngineError::Timeout(_)) => "timeout_error",
            Self::Engine(EngineError::NotStarted | EngineError::BackendLoad(_)) => "unavailable_error",
            Self::NotFound(_) => "not_found_error",
            Self::Engine(_) | Self::Internal(_) => "internal_error",
        }
    }

    /// Message that is safe to expose to API consumers
    pub fn client_message(&self) -> String {
        if self.status_code() == StatusCode::INTERNAL_SERVER_ERROR {
            "Internal server error".to_string()
        } else {
            self.to_string()
        }
    }
}

impl From<QueryRejection> for ServerError {
    fn from(rejection: QueryRejection) -> Self {
        Self::InvalidRequest(rejection.body_text())
    }
}

impl From<JsonRejection> for ServerError {
    fn from(rejection: JsonRejection) -> Self {
        Self::InvalidRequest(rejection.body_text())
    }
}

impl From<FormRejection> for ServerError {
    fn from(rejection: FormRejection) -> Self {
        Self::InvalidRequest(rejection.body_text())
    }
}

#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: ErrorDetails,
}

#[derive(Debug, Serialize)]
struct ErrorDetails {
    message: String,
    r#type: String,
    code: u16,
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        if status.is_server_error() {
            tracing::error!(error = %self, detail = ?self, "request failed");
        } else {
            tracing::debug!(error = %self, "request rejected");
        }

        let error_response = ErrorResponse {
            error: ErrorDetails {
                message: self.client_message(),
                r#type: self.error_type().to_string(),
                code: status.as_u16(),
            },
        };

        (status, Json(error_response)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    async fn body(err: ServerError) -> (StatusCode, serde_json::Value) {
        let response = err.into_response();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn input_error_is_bad_request() {
        let (status, json) = body(EngineError::Input("text must not be empty".to_string()).into()).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        insta::assert_snapshot!(serde_json::to_string(&json).unwrap(), @r#"{"error":{"code":400,"message":"Invalid input: text must not be empty","type":"invalid_request_error"}}"#);
    }

    #[tokio::test]
    async fn internal_details_are_hidden() {
        let (status, json) = body(EngineError::Storage("disk full at /srv/audio".to_string()).into()).await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(json["error"]["message"], "Internal server error");
        assert_eq!(json["error"]["type"], "internal_error");
    }

    #[test]
    fn engine_status_codes() {
        let status = |err: EngineError| ServerError::from(err).status_code();

        assert_eq!(status(EngineError::Timeout(Duration::from_secs(1))), StatusCode::GATEWAY_TIMEOUT);
        assert_eq!(status(EngineError::NotStarted), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(status(EngineError::BackendLoad("x".into())), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(status(EngineError::Inference("x".into())), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn not_found() {
        let err = ServerError::NotFound("a.wav".to_string());
        assert_eq!(err.status_code(), StatusCode::NOT_FOUND);
        assert_eq!(err.error_type(), "not_found_error");
        assert_eq!(err.client_message(), "Audio file 'a.wav' not found");
    }
}
