//! Events API endpoint.
//!
//! Receives `url_verification` handshakes and `event_callback` envelopes.
//! This endpoint is unauthenticated, like Slack's own request URL.

use apisim_core::{EventEnvelope, EventOutcome, SimError};
use axum::body::Bytes;
use axum::extract::State;
use axum::http::header::CONTENT_TYPE;
use axum::http::HeaderMap;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{error, info};
use utoipa::ToSchema;

use crate::api::error::{ApiError, ApiResult, ErrorResponse};
use crate::state::SharedState;

/// Answer to a `url_verification` request.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ChallengeResponse {
    /// The challenge from the request.
    #[schema(example = "3eZbrw1aBm2rZgRNFdxV2595E9CY3gmdALWMmHkvFXO7tYXAYM8P")]
    pub challenge: String,
}

/// Acknowledgement of an envelope.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct EventAck {
    /// Always `true`.
    pub ok: bool,
}

fn is_json(headers: &HeaderMap) -> bool {
    headers
        .get(CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .is_some_and(|value| value.to_ascii_lowercase().contains("application/json"))
}

fn parse_envelope(body: &[u8]) -> ApiResult<EventEnvelope> {
    let value: Value = serde_json::from_slice(body)
        .map_err(|err| ApiError::invalid_request(format!("Invalid JSON body: {err}")))?;
    match &value {
        Value::Object(map) if !map.is_empty() => {}
        _ => return Err(ApiError::invalid_request("JSON body required")),
    }
    serde_json::from_value(value)
        .map_err(|err| ApiError::invalid_request(format!("Malformed event envelope: {err}")))
}

/// Handle an Events API request.
#[utoipa::path(
    post,
    path = "/api/events",
    tag = "events",
    operation_id = "handleEvent",
    summary = "Receive an Events API envelope",
    description = "Answers `url_verification` with its challenge. Records `event_callback` \
        envelopes and applies message, membership and reaction events to the workspace. \
        Repeated `event_id`s are acknowledged without being applied again. Other envelope \
        types are acknowledged and ignored.",
    request_body = EventEnvelope,
    responses(
        (status = 200, description = "Envelope acknowledged; `url_verification` requests \
            receive a `ChallengeResponse` instead", body = EventAck),
        (status = 400, description = "Invalid body, missing challenge or unknown team/app", body = ErrorResponse),
        (status = 415, description = "Body is not JSON", body = ErrorResponse),
        (status = 500, description = "Event could not be processed", body = ErrorResponse)
    )
)]
pub async fn handle_events(
    State(state): State<SharedState>,
    headers: HeaderMap,
    body: Bytes,
) -> ApiResult<Response> {
    if !is_json(&headers) {
        return Err(ApiError::UnsupportedMediaType {
            error_code: "invalid_request".to_string(),
            message: "Content-Type must be application/json".to_string(),
        });
    }
    if body.iter().all(u8::is_ascii_whitespace) {
        return Err(ApiError::invalid_request("JSON body required"));
    }
    let envelope = parse_envelope(&body)?;

    match state.store().handle_event(&envelope, state.clock()) {
        Ok(EventOutcome::Challenge(challenge)) => {
            info!("Responding to URL verification challenge");
            Ok(Json(ChallengeResponse { challenge }).into_response())
        }
        Ok(_) => Ok(Json(EventAck { ok: true }).into_response()),
        Err(err @ (SimError::MissingChallenge | SimError::InvalidEvent(_))) => Err(err.into()),
        Err(err) => {
            error!(error = %err, event_type = ?envelope.inner_type(), "Error processing event");
            Err(ApiError::InternalError {
                error_code: "processing_error".to_string(),
                message: err.to_string(),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_content_type_detection() {
        let mut headers = HeaderMap::new();
        assert!(!is_json(&headers));
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("Application/JSON; charset=utf-8"));
        assert!(is_json(&headers));
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("text/plain"));
        assert!(!is_json(&headers));
    }

    #[test]
    fn test_parse_envelope_rejects_empty_objects() {
        assert_eq!(parse_envelope(b"{}").unwrap_err().error_code(), "invalid_request");
        assert_eq!(parse_envelope(b"[1]").unwrap_err().error_code(), "invalid_request");
        assert_eq!(parse_envelope(b"{oops").unwrap_err().error_code(), "invalid_request");

        let envelope = parse_envelope(br#"{"type":"url_verification","challenge":"abc"}"#).unwrap();
        assert_eq!(envelope.challenge.as_deref(), Some("abc"));
    }
}
