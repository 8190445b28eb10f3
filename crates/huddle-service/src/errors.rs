//! Huddle service error types.
//!
//! All errors map to HTTP status codes via the `IntoResponse` impl.
//! Storage and gateway failures return generic messages to clients; the
//! underlying detail is logged server-side.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

/// Huddle service error type.
///
/// Maps to HTTP status codes:
/// - NotFound: 404 Not Found
/// - Storage, Internal: 500 Internal Server Error
/// - Gateway: 502 Bad Gateway
/// - Timeout: 504 Gateway Timeout (request-level deadline)
/// - BadRequest: 400 Bad Request
#[derive(Debug, Error)]
pub enum HuddleError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Gateway error: {0}")]
    Gateway(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Request timed out")]
    Timeout,

    #[error("Internal server error")]
    Internal,
}

impl HuddleError {
    /// Returns the HTTP status code for this error.
    pub fn status_code(&self) -> u16 {
        match self {
            HuddleError::NotFound(_) => 404,
            HuddleError::Storage(_) | HuddleError::Internal => 500,
            HuddleError::Gateway(_) => 502,
            HuddleError::BadRequest(_) => 400,
            HuddleError::Timeout => 504,
        }
    }

    /// Bounded label for metrics.
    pub fn error_type(&self) -> &'static str {
        match self {
            HuddleError::NotFound(_) => "not_found",
            HuddleError::Storage(_) => "storage",
            HuddleError::Gateway(_) => "gateway",
            HuddleError::BadRequest(_) => "bad_request",
            HuddleError::Internal => "internal",
            HuddleError::Timeout => "timeout",
        }
    }
}

#[derive(Serialize)]
struct ErrorResponse {
    error: ErrorDetail,
}

#[derive(Serialize)]
struct ErrorDetail {
    code: String,
    message: String,
}

impl IntoResponse for HuddleError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            HuddleError::NotFound(resource) => {
                (StatusCode::NOT_FOUND, "NOT_FOUND", resource.clone())
            }
            HuddleError::Storage(err) => {
                tracing::error!(target: "huddle.storage", error = %err, "Storage operation failed");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "STORAGE_ERROR",
                    "An internal storage error occurred".to_string(),
                )
            }
            HuddleError::Gateway(err) => {
                tracing::warn!(target: "huddle.gateway", error = %err, "Upstream media server request failed");
                (
                    StatusCode::BAD_GATEWAY,
                    "BAD_GATEWAY",
                    "Upstream media server is unavailable".to_string(),
                )
            }
            HuddleError::BadRequest(reason) => {
                (StatusCode::BAD_REQUEST, "BAD_REQUEST", reason.clone())
            }
            HuddleError::Timeout => {
                tracing::warn!(target: "huddle.timeout", "Request exceeded the request timeout");
                (
                    StatusCode::GATEWAY_TIMEOUT,
                    "GATEWAY_TIMEOUT",
                    "The request did not complete in time".to_string(),
                )
            }
            HuddleError::Internal => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "INTERNAL_ERROR",
                "An internal error occurred".to_string(),
            ),
        };

        let error_response = ErrorResponse {
            error: ErrorDetail {
                code: code.to_string(),
                message,
            },
        };

        (status, Json(error_response)).into_response()
    }
}

/// Convert sqlx errors to HuddleError
impl From<sqlx::Error> for HuddleError {
    fn from(err: sqlx::Error) -> Self {
        HuddleError::Storage(err.to_string())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use axum::body::Body;
    use http_body_util::BodyExt;

    async fn read_body_json(body: Body) -> serde_json::Value {
        let bytes = body.collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[test]
    fn test_display() {
        assert_eq!(
            HuddleError::NotFound("room 7".to_string()).to_string(),
            "Not found: room 7"
        );
        assert_eq!(
            HuddleError::Storage("connection reset".to_string()).to_string(),
            "Storage error: connection reset"
        );
        assert_eq!(
            HuddleError::Gateway("connect refused".to_string()).to_string(),
            "Gateway error: connect refused"
        );
        assert_eq!(
            HuddleError::BadRequest("missing uuid".to_string()).to_string(),
            "Bad request: missing uuid"
        );
        assert_eq!(HuddleError::Internal.to_string(), "Internal server error");
    }

    #[test]
    fn test_status_codes() {
        assert_eq!(HuddleError::NotFound("x".to_string()).status_code(), 404);
        assert_eq!(HuddleError::Storage("x".to_string()).status_code(), 500);
        assert_eq!(HuddleError::Gateway("x".to_string()).status_code(), 502);
        assert_eq!(HuddleError::BadRequest("x".to_string()).status_code(), 400);
        assert_eq!(HuddleError::Internal.status_code(), 500);
        assert_eq!(HuddleError::Timeout.status_code(), 504);
    }

    #[test]
    fn test_sqlx_error_maps_to_storage() {
        let error: HuddleError = sqlx::Error::PoolTimedOut.into();
        assert!(matches!(error, HuddleError::Storage(_)));
    }

    #[tokio::test]
    async fn test_into_response_not_found() {
        let response = HuddleError::NotFound("Room not found".to_string()).into_response();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let body_json = read_body_json(response.into_body()).await;
        assert_eq!(body_json["error"]["code"], "NOT_FOUND");
        assert_eq!(body_json["error"]["message"], "Room not found");
    }

    #[tokio::test]
    async fn test_into_response_storage_hides_detail() {
        let response =
            HuddleError::Storage("password authentication failed".to_string()).into_response();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let body_json = read_body_json(response.into_body()).await;
        assert_eq!(body_json["error"]["code"], "STORAGE_ERROR");
        assert_eq!(
            body_json["error"]["message"],
            "An internal storage error occurred"
        );
    }

    #[tokio::test]
    async fn test_into_response_gateway_is_bad_gateway() {
        let response =
            HuddleError::Gateway("tcp connect error: 10.0.0.9:7777".to_string()).into_response();

        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);

        let body_json = read_body_json(response.into_body()).await;
        assert_eq!(body_json["error"]["code"], "BAD_GATEWAY");
        assert!(!body_json["error"]["message"]
            .as_str()
            .unwrap()
            .contains("10.0.0.9"));
    }

    #[tokio::test]
    async fn test_into_response_bad_request() {
        let response = HuddleError::BadRequest("Invalid room id".to_string()).into_response();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let body_json = read_body_json(response.into_body()).await;
        assert_eq!(body_json["error"]["code"], "BAD_REQUEST");
        assert_eq!(body_json["error"]["message"], "Invalid room id");
    }

    #[tokio::test]
    async fn test_into_response_timeout_is_server_error() {
        let response = HuddleError::Timeout.into_response();

        assert_eq!(response.status(), StatusCode::GATEWAY_TIMEOUT);

        let body_json = read_body_json(response.into_body()).await;
        assert_eq!(body_json["error"]["code"], "GATEWAY_TIMEOUT");
    }
}
