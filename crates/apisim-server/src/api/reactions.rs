//! `reactions.*` Web API methods.

use apisim_core::SimError;
use axum::extract::State;
use axum::Json;
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::api::acting_user;
use crate::api::args::{opt_string, SlackArgs};
use crate::api::auth::Authenticated;
use crate::api::error::{ApiError, ApiResult, ErrorResponse};
use crate::state::SharedState;

/// Arguments of `reactions.add` and `reactions.remove`.
#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ReactionArgs {
    /// Emoji name, with or without colons.
    #[serde(default, deserialize_with = "opt_string")]
    #[param(example = "thumbsup")]
    pub name: Option<String>,
    /// Channel id.
    #[serde(default, deserialize_with = "opt_string")]
    pub channel: Option<String>,
    /// Timestamp of the message.
    #[serde(default, deserialize_with = "opt_string")]
    pub timestamp: Option<String>,
    /// Reacting user; defaults to the bot user.
    #[serde(default, deserialize_with = "opt_string")]
    pub user: Option<String>,
}

/// Bare `{"ok": true}` acknowledgement.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct OkResponse {
    /// Always `true`.
    pub ok: bool,
}

struct Target {
    name: String,
    channel: String,
    timestamp: String,
    user: String,
}

fn resolve(state: &SharedState, args: ReactionArgs) -> ApiResult<Target> {
    let (Some(name), Some(channel), Some(timestamp)) = (args.name, args.channel, args.timestamp) else {
        return Err(ApiError::missing_parameter(
            "Name, channel, and timestamp parameters required",
        ));
    };
    let Some(found) = state.store().channel(&channel)? else {
        return Err(SimError::MessageNotFound {
            channel,
            ts: timestamp,
        }
        .into());
    };
    let user = acting_user(state, &found.team_id, args.user)?;
    Ok(Target {
        name,
        channel,
        timestamp,
        user,
    })
}

/// Add a reaction.
#[utoipa::path(
    method(get, post),
    path = "/api/reactions.add",
    tag = "reactions",
    operation_id = "reactionsAdd",
    summary = "Add a reaction to a message",
    params(ReactionArgs),
    responses(
        (status = 200, description = "Reaction added", body = OkResponse),
        (status = 400, description = "Missing argument or already reacted", body = ErrorResponse),
        (status = 401, description = "Missing or invalid token", body = ErrorResponse),
        (status = 404, description = "Message or user not found", body = ErrorResponse)
    ),
    security(("bearer" = []))
)]
pub async fn add(
    _auth: Authenticated,
    State(state): State<SharedState>,
    SlackArgs(args): SlackArgs<ReactionArgs>,
) -> ApiResult<Json<OkResponse>> {
    let target = resolve(&state, args)?;
    state
        .store()
        .add_reaction(&target.channel, &target.timestamp, &target.user, &target.name)?;
    Ok(Json(OkResponse { ok: true }))
}

/// Remove a reaction.
#[utoipa::path(
    method(get, post),
    path = "/api/reactions.remove",
    tag = "reactions",
    operation_id = "reactionsRemove",
    summary = "Remove a reaction from a message",
    params(ReactionArgs),
    responses(
        (status = 200, description = "Reaction removed", body = OkResponse),
        (status = 400, description = "Missing argument", body = ErrorResponse),
        (status = 401, description = "Missing or invalid token", body = ErrorResponse),
        (status = 404, description = "Message or reaction not found", body = ErrorResponse)
    ),
    security(("bearer" = []))
)]
pub async fn remove(
    _auth: Authenticated,
    State(state): State<SharedState>,
    SlackArgs(args): SlackArgs<ReactionArgs>,
) -> ApiResult<Json<OkResponse>> {
    let target = resolve(&state, args)?;
    state
        .store()
        .remove_reaction(&target.channel, &target.timestamp, &target.user, &target.name)?;
    Ok(Json(OkResponse { ok: true }))
}
