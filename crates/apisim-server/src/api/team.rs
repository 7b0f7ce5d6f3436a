//! `team.info` and `auth.test`.

use apisim_core::SimError;
use axum::extract::State;
use axum::Json;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::api::auth::Authenticated;
use crate::api::error::{ApiResult, ErrorResponse};
use crate::api::views::TeamView;
use crate::state::SharedState;

const FALLBACK_TEAM_NAME: &str = "Test Team";
const FALLBACK_TEAM_ID: &str = "T12345678";
const FALLBACK_USER_NAME: &str = "testuser";
const FALLBACK_USER_ID: &str = "U12345678";

/// Response of `team.info`.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct TeamInfoResponse {
    /// Always `true`.
    pub ok: bool,
    /// The workspace's first team.
    pub team: TeamView,
}

/// Response of `auth.test`.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[schema(example = json!({
    "ok": true,
    "url": "https://myteam.slack.com/",
    "team": "Acme Inc",
    "user": "alice.smith",
    "team_id": "T1H9RESGL",
    "user_id": "U061F7AUR",
    "bot_id": null,
    "is_enterprise_install": false
}))]
pub struct AuthTestResponse {
    /// Always `true`.
    pub ok: bool,
    /// Workspace URL.
    pub url: String,
    /// Team name.
    pub team: String,
    /// User handle.
    pub user: String,
    /// Team id.
    pub team_id: String,
    /// User id.
    pub user_id: String,
    /// Always `null`.
    pub bot_id: Option<String>,
    /// Always `false`.
    pub is_enterprise_install: bool,
}

/// Get the workspace team.
#[utoipa::path(
    method(get, post),
    path = "/api/team.info",
    tag = "team",
    operation_id = "teamInfo",
    summary = "Get team details",
    responses(
        (status = 200, description = "The team", body = TeamInfoResponse),
        (status = 401, description = "Missing or invalid token", body = ErrorResponse),
        (status = 404, description = "No team exists", body = ErrorResponse)
    ),
    security(("bearer" = []))
)]
pub async fn team_info(
    _auth: Authenticated,
    State(state): State<SharedState>,
) -> ApiResult<Json<TeamInfoResponse>> {
    let team = state.store().first_team()?.ok_or(SimError::TeamNotFound)?;
    Ok(Json(TeamInfoResponse {
        ok: true,
        team: TeamView::new(&team),
    }))
}

/// Check authentication.
#[utoipa::path(
    method(get, post),
    path = "/api/auth.test",
    tag = "team",
    operation_id = "authTest",
    summary = "Check the bearer token",
    description = "Reports the workspace's first team and user, with fixed fallbacks when \
        the workspace is empty.",
    responses(
        (status = 200, description = "Token accepted", body = AuthTestResponse),
        (status = 401, description = "Missing or invalid token", body = ErrorResponse)
    ),
    security(("bearer" = []))
)]
pub async fn auth_test(
    _auth: Authenticated,
    State(state): State<SharedState>,
) -> ApiResult<Json<AuthTestResponse>> {
    let store = state.store();
    let team = store.first_team()?;
    let user = store.first_user()?;

    Ok(Json(AuthTestResponse {
        ok: true,
        url: state.config().simulation.workspace_url.clone(),
        team: team
            .as_ref()
            .map_or_else(|| FALLBACK_TEAM_NAME.to_string(), |t| t.name.clone()),
        user: user
            .as_ref()
            .map_or_else(|| FALLBACK_USER_NAME.to_string(), |u| u.name.clone()),
        team_id: team.map_or_else(|| FALLBACK_TEAM_ID.to_string(), |t| t.id),
        user_id: user.map_or_else(|| FALLBACK_USER_ID.to_string(), |u| u.id),
        bot_id: None,
        is_enterprise_install: false,
    }))
}
