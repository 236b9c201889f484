//! Error responses.
//!
//! # Responsibilities
//! - Map service errors to HTTP status codes
//! - Encode every failure as `{"error": "<message>"}`
//!
//! # Status mapping
//! - `RetriesExhausted` → 429 Too Many Requests
//! - `Canceled` → 503 Service Unavailable
//! - malformed request body → 400 Bad Request
//! - everything else → 500 Internal Server Error

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};

use crate::endpoint::CallError;

/// JSON body of an error response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
}

/// Failure of a handler, rendered as a JSON error response.
#[derive(Debug)]
pub enum ApiError {
    Call(CallError),
    BadRequest(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Call(CallError::RetriesExhausted { .. }) => StatusCode::TOO_MANY_REQUESTS,
            ApiError::Call(CallError::Canceled) => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::Call(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
        }
    }
}

impl From<CallError> for ApiError {
    fn from(e: CallError) -> Self {
        ApiError::Call(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let error = match self {
            ApiError::Call(e) => e.to_string(),
            ApiError::BadRequest(message) => message,
        };
        (status, Json(ErrorBody { error })).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        let exhausted = CallError::RetriesExhausted {
            attempts: 2,
            last: Box::new(CallError::downstream("http://a:1", "connection refused")),
        };
        assert_eq!(ApiError::from(exhausted).status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(ApiError::from(CallError::Canceled).status(), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(
            ApiError::from(CallError::downstream("http://a:1", "boom")).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(ApiError::BadRequest("eof".into()).status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_response_status() {
        let response = ApiError::from(CallError::Canceled).into_response();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    }
}
