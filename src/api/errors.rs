//! API error responses
//!
//! Every failure renders as `{ "error": <message>, "request_id": <id> }`.

use super::middleware::RequestId;
use crate::errors::ControlError;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub request_id: String,
}

#[derive(Debug)]
pub struct ApiError {
    pub kind: ApiErrorKind,
    pub request_id: String,
}

#[derive(Debug)]
pub enum ApiErrorKind {
    /// Body could not be parsed
    BadRequest(String),
    /// Coordinator or chain failure, message forwarded verbatim
    Internal(String),
}

impl ApiError {
    pub fn bad_request(request_id: &RequestId, message: String) -> Self {
        Self {
            kind: ApiErrorKind::BadRequest(message),
            request_id: request_id.0.clone(),
        }
    }

    pub fn internal(request_id: &RequestId, message: String) -> Self {
        Self {
            kind: ApiErrorKind::Internal(message),
            request_id: request_id.0.clone(),
        }
    }

    pub fn from_control(request_id: &RequestId, error: ControlError) -> Self {
        Self::internal(request_id, error.to_string())
    }

    pub fn status(&self) -> StatusCode {
        match self.kind {
            ApiErrorKind::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiErrorKind::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn message(&self) -> &str {
        match &self.kind {
            ApiErrorKind::BadRequest(msg) | ApiErrorKind::Internal(msg) => msg,
        }
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            ApiErrorKind::BadRequest(msg) => write!(f, "[{}] Bad Request: {}", self.request_id, msg),
            ApiErrorKind::Internal(msg) => write!(f, "[{}] Internal Error: {}", self.request_id, msg),
        }
    }
}

impl std::error::Error for ApiError {}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::warn!("{}", self);
        }

        let body = Json(ErrorResponse {
            error: self.message().to_string(),
            request_id: self.request_id.clone(),
        });

        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_control_errors_forward_message() {
        let request_id = RequestId("req-1".to_string());
        let error = ApiError::from_control(&request_id, ControlError::RoundInProgress(4));

        assert_eq!(error.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(error.message(), ControlError::RoundInProgress(4).to_string());
        assert_eq!(error.request_id, "req-1");
    }

    #[test]
    fn test_bad_request_status() {
        let error = ApiError::bad_request(&RequestId("r".to_string()), "nope".to_string());
        assert_eq!(error.status(), StatusCode::BAD_REQUEST);
    }
}
