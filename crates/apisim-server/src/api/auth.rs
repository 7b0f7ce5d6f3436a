//! Bearer token check for Web API methods.

use axum::extract::FromRequestParts;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;

use crate::api::error::ApiError;
use crate::state::SharedState;

const BEARER_PREFIX: &str = "Bearer ";

/// Proof that the request carried an acceptable bearer token.
///
/// Any token of at least `auth.min_token_length` characters is accepted.
/// Place this extractor before argument extractors so that authentication
/// failures win over argument errors.
#[derive(Debug, Clone)]
pub struct Authenticated {
    /// The presented token.
    pub token: String,
}

impl FromRequestParts<SharedState> for Authenticated {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &SharedState,
    ) -> Result<Self, Self::Rejection> {
        let token = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.strip_prefix(BEARER_PREFIX))
            .ok_or_else(|| ApiError::unauthorized("missing_auth", "Authentication required"))?;

        if token.chars().count() < state.config().auth.min_token_length {
            return Err(ApiError::unauthorized("invalid_auth", "Invalid token"));
        }

        Ok(Self {
            token: token.to_string(),
        })
    }
}
