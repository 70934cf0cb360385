//! Request pipeline for `POST /api/process`
//!
//! received -> validated -> enriched -> dispatched -> translated -> responded.
//! Validation and dispatch can exit early; nothing is retried.

use axum::extract::rejection::BytesRejection;
use axum::extract::State;
use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use bytes::Bytes;
use chrono::{Local, SecondsFormat};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::backend::BackendError;
use crate::grpc::backend_proto::{EnhancedRequest, ProcessedResponse};
use crate::router::AppState;

/// Header naming the environment that served the call
pub const ENVIRONMENT_HEADER: &str = "x-environment";

/// Largest request body the gateway reads, matching tonic's default 4 MiB
/// message cap
pub const MAX_BODY_BYTES: usize = 4 * 1024 * 1024;

/// Inbound request body
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct UserRequest {
    pub user_id: String,
    pub query: String,
}

/// Outbound response body
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserResponse {
    pub result: String,
    pub success: bool,
    pub request_id: String,
}

/// Errors that end a request before a successful response
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Only POST method is allowed")]
    MethodNotAllowed,

    #[error("Invalid request body")]
    InvalidBody(#[source] serde_json::Error),

    #[error("Invalid request body")]
    UnreadableBody(#[source] BytesRejection),

    #[error("Error processing request: {0}")]
    Backend(#[from] BackendError),

    #[error("Error encoding response")]
    Encode(#[source] serde_json::Error),
}

impl ApiError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
            ApiError::InvalidBody(_) | ApiError::UnreadableBody(_) => StatusCode::BAD_REQUEST,
            ApiError::Backend(_) | ApiError::Encode(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let mut response = (status, self.to_string()).into_response();
        if matches!(self, ApiError::MethodNotAllowed) {
            response
                .headers_mut()
                .insert(header::ALLOW, HeaderValue::from_static("POST"));
        }
        response
    }
}

/// Build the envelope sent to the backend.
///
/// The request id is always generated here, never taken from the caller.
pub fn enrich(user_request: UserRequest, gateway_version: &str) -> EnhancedRequest {
    EnhancedRequest {
        user_id: user_request.user_id,
        query: user_request.query,
        timestamp: Local::now().to_rfc3339_opts(SecondsFormat::Secs, true),
        request_id: Uuid::new_v4().to_string(),
        gateway_version: gateway_version.to_string(),
    }
}

/// Turn the backend result into the caller's response.
///
/// `request_id` is the gateway's own id for the call, whatever the backend
/// reports about itself.
pub fn translate(response: ProcessedResponse, request_id: String) -> UserResponse {
    UserResponse {
        result: response.result,
        success: response.success,
        request_id,
    }
}

/// Handler for `POST /api/process`
pub async fn process(
    State(state): State<AppState>,
    body: Result<Bytes, BytesRejection>,
) -> Result<Response, ApiError> {
    let environment = state.environment;

    let body = body.map_err(|e| {
        tracing::info!("[{}] Rejected request with unreadable body: {}", environment, e);
        ApiError::UnreadableBody(e)
    })?;

    let user_request: UserRequest = serde_json::from_slice(&body).map_err(|e| {
        tracing::info!("[{}] Rejected request with invalid body: {}", environment, e);
        ApiError::InvalidBody(e)
    })?;

    tracing::info!(
        "[{}] Gateway received request: user={} query={:?}",
        environment,
        user_request.user_id,
        user_request.query
    );

    let enhanced = enrich(user_request, &state.gateway_version);
    let request_id = enhanced.request_id.clone();

    tracing::info!(
        "[{}] Sending request {} to backend (deadline {:?})",
        environment,
        request_id,
        state.backend_timeout
    );
    let processed = state
        .backend
        .process_request(enhanced, state.backend_timeout)
        .await
        .map_err(|e| {
            tracing::error!("[{}] Error calling backend for {}: {}", environment, request_id, e);
            ApiError::Backend(e)
        })?;

    tracing::info!(
        "[{}] Backend {} answered request {}",
        environment,
        processed.backend_instance_id,
        request_id
    );

    let user_response = translate(processed, request_id);
    let body = serde_json::to_vec(&user_response).map_err(|e| {
        tracing::error!(
            "[{}] Error encoding response for {}: {}",
            environment,
            user_response.request_id,
            e
        );
        ApiError::Encode(e)
    })?;

    tracing::info!(
        "[{}] Sent response for request {}",
        environment,
        user_response.request_id
    );

    Ok((
        StatusCode::OK,
        [
            (
                header::HeaderName::from_static(ENVIRONMENT_HEADER),
                HeaderValue::from_static(environment.as_str()),
            ),
            (
                header::CONTENT_TYPE,
                HeaderValue::from_static("application/json"),
            ),
        ],
        body,
    )
        .into_response())
}

/// Fallback for every method other than POST on `/api/process`
pub async fn method_not_allowed(State(state): State<AppState>) -> ApiError {
    tracing::info!("[{}] Rejected request with wrong method", state.environment);
    ApiError::MethodNotAllowed
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn user_request() -> UserRequest {
        UserRequest {
            user_id: "u1".to_string(),
            query: "hello".to_string(),
        }
    }

    #[test]
    fn test_enrich_copies_user_fields() {
        let enhanced = enrich(user_request(), "v1.0.0");

        assert_eq!(enhanced.user_id, "u1");
        assert_eq!(enhanced.query, "hello");
        assert_eq!(enhanced.gateway_version, "v1.0.0");
        assert!(chrono::DateTime::parse_from_rfc3339(&enhanced.timestamp).is_ok());
    }

    #[test]
    fn test_request_ids_are_unique_uuids() {
        let mut seen = HashSet::new();
        for _ in 0..1000 {
            let enhanced = enrich(user_request(), "v1.0.0");
            let parsed = Uuid::parse_str(&enhanced.request_id).unwrap();
            assert_eq!(parsed.get_version_num(), 4);
            assert_eq!(parsed.hyphenated().to_string(), enhanced.request_id);
            assert!(seen.insert(enhanced.request_id), "duplicate request id");
        }
    }

    #[test]
    fn test_translate_keeps_gateway_request_id() {
        let processed = ProcessedResponse {
            result: "Mock response for query: hello".to_string(),
            success: true,
            processing_time: "2024-01-15T09:00:00.123456789Z".to_string(),
            backend_instance_id: "backend-7".to_string(),
        };

        let response = translate(processed, "gateway-id".to_string());
        assert_eq!(
            response,
            UserResponse {
                result: "Mock response for query: hello".to_string(),
                success: true,
                request_id: "gateway-id".to_string(),
            }
        );
    }

    #[test]
    fn test_user_request_decoding() {
        let full: UserRequest =
            serde_json::from_str(r#"{"user_id":"u1","query":"hello","extra":1}"#).unwrap();
        assert_eq!(full, user_request());

        let partial: UserRequest = serde_json::from_str(r#"{"query":"q"}"#).unwrap();
        assert_eq!(partial.user_id, "");
        assert_eq!(partial.query, "q");

        assert!(serde_json::from_slice::<UserRequest>(b"not json").is_err());
        assert!(serde_json::from_str::<UserRequest>(r#"{"user_id":5}"#).is_err());
    }

    #[test]
    fn test_error_status_codes() {
        let bad_json = serde_json::from_str::<UserRequest>("{").unwrap_err();
        assert_eq!(ApiError::MethodNotAllowed.status_code(), StatusCode::METHOD_NOT_ALLOWED);
        assert_eq!(ApiError::InvalidBody(bad_json).status_code(), StatusCode::BAD_REQUEST);

        let backend = ApiError::from(BackendError::DeadlineExceeded(std::time::Duration::from_secs(10)));
        assert_eq!(backend.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(backend.to_string().starts_with("Error processing request: "));
    }
}
