//! `chat.*` Web API methods: post, edit and delete messages.

use apisim_core::{NewMessage, SimError};
use axum::extract::State;
use axum::Json;
use serde::{Deserialize, Serialize};
use tracing::info;
use utoipa::{IntoParams, ToSchema};

use crate::api::acting_user;
use crate::api::args::{opt_string, SlackArgs};
use crate::api::auth::Authenticated;
use crate::api::error::{ApiError, ApiResult, ErrorResponse};
use crate::api::views::MessageView;
use crate::state::SharedState;

// ============================================================================
// Request/Response Types
// ============================================================================

/// Arguments of `chat.postMessage`.
#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct PostMessageArgs {
    /// Channel id.
    #[serde(default, deserialize_with = "opt_string")]
    #[param(example = "C0PNCRP9N")]
    pub channel: Option<String>,
    /// Message body.
    #[serde(default, deserialize_with = "opt_string")]
    pub text: Option<String>,
    /// Author; defaults to the bot user.
    #[serde(default, deserialize_with = "opt_string")]
    pub user: Option<String>,
    /// Parent timestamp to reply in a thread.
    #[serde(default, deserialize_with = "opt_string")]
    pub thread_ts: Option<String>,
}

/// Response of `chat.postMessage`.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[schema(example = json!({
    "ok": true,
    "channel": "C0PNCRP9N",
    "ts": "1700000000.000100",
    "message": {"type": "message", "subtype": null, "user": "USLACKBOT", "text": "Hello", "ts": "1700000000.000100"}
}))]
pub struct PostMessageResponse {
    /// Always `true`.
    pub ok: bool,
    /// Channel posted to.
    pub channel: String,
    /// Timestamp of the new message.
    pub ts: String,
    /// The stored message.
    pub message: MessageView,
}

/// Arguments of `chat.update`.
#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct UpdateMessageArgs {
    /// Channel id.
    #[serde(default, deserialize_with = "opt_string")]
    pub channel: Option<String>,
    /// Timestamp of the message.
    #[serde(default, deserialize_with = "opt_string")]
    pub ts: Option<String>,
    /// New body.
    #[serde(default, deserialize_with = "opt_string")]
    pub text: Option<String>,
}

/// Response of `chat.update`.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct UpdateMessageResponse {
    /// Always `true`.
    pub ok: bool,
    /// Channel of the message.
    pub channel: String,
    /// Timestamp of the message.
    pub ts: String,
    /// New body.
    pub text: String,
}

/// Arguments of `chat.delete`.
#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct DeleteMessageArgs {
    /// Channel id.
    #[serde(default, deserialize_with = "opt_string")]
    pub channel: Option<String>,
    /// Timestamp of the message.
    #[serde(default, deserialize_with = "opt_string")]
    pub ts: Option<String>,
}

/// Response of `chat.delete`.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct DeleteMessageResponse {
    /// Always `true`.
    pub ok: bool,
    /// Channel of the deleted message.
    pub channel: String,
    /// Timestamp of the deleted message.
    pub ts: String,
}

const MISSING_CHANNEL_AND_TS: &str = "Channel and ts parameters required";

// ============================================================================
// Handlers
// ============================================================================

/// Post a message.
#[utoipa::path(
    method(get, post),
    path = "/api/chat.postMessage",
    tag = "chat",
    operation_id = "chatPostMessage",
    summary = "Post a message",
    description = "Posts a message stamped with a fresh, strictly increasing timestamp. \
        With `thread_ts` naming an existing message the post becomes a thread reply and the \
        parent's reply count grows. Without `user` the bot user posts.",
    params(PostMessageArgs),
    responses(
        (status = 200, description = "Posted message", body = PostMessageResponse),
        (status = 400, description = "Channel argument missing", body = ErrorResponse),
        (status = 401, description = "Missing or invalid token", body = ErrorResponse),
        (status = 404, description = "Channel or user not found", body = ErrorResponse)
    ),
    security(("bearer" = []))
)]
pub async fn post_message(
    _auth: Authenticated,
    State(state): State<SharedState>,
    SlackArgs(args): SlackArgs<PostMessageArgs>,
) -> ApiResult<Json<PostMessageResponse>> {
    let channel_id = args
        .channel
        .ok_or_else(|| ApiError::bad_request("channel_not_found", "Channel parameter required"))?;
    let store = state.store();
    let channel = store
        .channel(&channel_id)?
        .ok_or_else(|| SimError::ChannelNotFound(channel_id.clone()))?;
    let user_id = acting_user(&state, &channel.team_id, args.user)?;

    let mut new = NewMessage::new(&channel_id, user_id, Some(args.text.unwrap_or_default()));
    if let Some(thread_ts) = args.thread_ts {
        new = new.in_thread(thread_ts);
    }
    let message = store.post_message(&new, &state.clock().next())?;
    info!(channel = %channel_id, ts = %message.ts, thread_ts = ?message.thread_ts, "Posted message");

    Ok(Json(PostMessageResponse {
        ok: true,
        channel: channel_id,
        ts: message.ts.clone(),
        message: MessageView::new(&message),
    }))
}

/// Edit a message.
#[utoipa::path(
    method(get, post),
    path = "/api/chat.update",
    tag = "chat",
    operation_id = "chatUpdate",
    summary = "Edit a message",
    params(UpdateMessageArgs),
    responses(
        (status = 200, description = "Updated message", body = UpdateMessageResponse),
        (status = 400, description = "Channel or ts missing", body = ErrorResponse),
        (status = 401, description = "Missing or invalid token", body = ErrorResponse),
        (status = 404, description = "Message not found", body = ErrorResponse)
    ),
    security(("bearer" = []))
)]
pub async fn update(
    _auth: Authenticated,
    State(state): State<SharedState>,
    SlackArgs(args): SlackArgs<UpdateMessageArgs>,
) -> ApiResult<Json<UpdateMessageResponse>> {
    let (Some(channel_id), Some(ts)) = (args.channel, args.ts) else {
        return Err(ApiError::missing_parameter(MISSING_CHANNEL_AND_TS));
    };
    let text = args.text.unwrap_or_default();
    let message = state
        .store()
        .update_message_text(&channel_id, &ts, Some(&text))?;

    Ok(Json(UpdateMessageResponse {
        ok: true,
        channel: channel_id,
        ts: message.ts,
        text,
    }))
}

/// Delete a message.
#[utoipa::path(
    method(get, post),
    path = "/api/chat.delete",
    tag = "chat",
    operation_id = "chatDelete",
    summary = "Delete a message",
    description = "Deletes a message and its reactions. Deleting a thread reply lowers the \
        parent's reply count.",
    params(DeleteMessageArgs),
    responses(
        (status = 200, description = "Deleted", body = DeleteMessageResponse),
        (status = 400, description = "Channel or ts missing", body = ErrorResponse),
        (status = 401, description = "Missing or invalid token", body = ErrorResponse),
        (status = 404, description = "Message not found", body = ErrorResponse)
    ),
    security(("bearer" = []))
)]
pub async fn delete(
    _auth: Authenticated,
    State(state): State<SharedState>,
    SlackArgs(args): SlackArgs<DeleteMessageArgs>,
) -> ApiResult<Json<DeleteMessageResponse>> {
    let (Some(channel_id), Some(ts)) = (args.channel, args.ts) else {
        return Err(ApiError::missing_parameter(MISSING_CHANNEL_AND_TS));
    };
    let message = state.store().delete_message(&channel_id, &ts)?;
    info!(channel = %channel_id, ts = %message.ts, "Deleted message");

    Ok(Json(DeleteMessageResponse {
        ok: true,
        channel: channel_id,
        ts: message.ts,
    }))
}
