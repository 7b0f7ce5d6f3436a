//! `conversations.*` Web API methods.
//!
//! Channels, DMs and group DMs: listing, lookup, history, threads, creation
//! and membership.

use apisim_core::{ChannelFilter, HistoryQuery, Message, SimError};
use axum::extract::State;
use axum::Json;
use serde::{Deserialize, Serialize};
use tracing::info;
use utoipa::{IntoParams, ToSchema};

use crate::api::args::{flag, opt_string, opt_string_keep_empty, opt_u64, SlackArgs};
use crate::api::auth::Authenticated;
use crate::api::error::{ApiError, ApiResult, ErrorResponse};
use crate::api::views::{ChannelView, MessageView, ResponseMetadata};
use crate::api::acting_user;
use crate::state::SharedState;

// ============================================================================
// Request/Response Types
// ============================================================================

/// Arguments of `conversations.list`.
#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ListConversationsArgs {
    /// Comma-separated `public_channel`, `private_channel`, `mpim`, `im`.
    /// An empty value lists every channel.
    #[serde(default, deserialize_with = "opt_string_keep_empty")]
    #[param(example = "public_channel,private_channel")]
    pub types: Option<String>,
    /// Page size.
    #[serde(default, deserialize_with = "opt_u64")]
    pub limit: Option<u64>,
    /// Cursor from `response_metadata.next_cursor`.
    #[serde(default, deserialize_with = "opt_string")]
    pub cursor: Option<String>,
    /// Accepted for compatibility; no channel is ever archived.
    #[serde(default, deserialize_with = "flag")]
    pub exclude_archived: bool,
}

/// Response of `conversations.list`.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ListConversationsResponse {
    /// Always `true`.
    pub ok: bool,
    /// Conversations ordered by id.
    pub channels: Vec<ChannelView>,
    /// Pagination cursor.
    pub response_metadata: ResponseMetadata,
}

/// Arguments of `conversations.info`.
#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ConversationInfoArgs {
    /// Channel id.
    #[serde(default, deserialize_with = "opt_string")]
    #[param(example = "C0PNCRP9N")]
    pub channel: Option<String>,
    /// Add `locale` to the channel.
    #[serde(default, deserialize_with = "flag")]
    pub include_locale: bool,
}

/// Response carrying one conversation.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ConversationResponse {
    /// Always `true`.
    pub ok: bool,
    /// The conversation.
    pub channel: ChannelView,
}

/// Arguments of `conversations.history`.
#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct HistoryArgs {
    /// Channel id.
    #[serde(default, deserialize_with = "opt_string")]
    pub channel: Option<String>,
    /// Only messages after this timestamp.
    #[serde(default, deserialize_with = "opt_string")]
    #[param(example = "1700000000.000000")]
    pub oldest: Option<String>,
    /// Only messages before this timestamp.
    #[serde(default, deserialize_with = "opt_string")]
    pub latest: Option<String>,
    /// Include messages exactly at `oldest`/`latest`.
    #[serde(default, deserialize_with = "flag")]
    pub inclusive: bool,
    /// Page size.
    #[serde(default, deserialize_with = "opt_u64")]
    pub limit: Option<u64>,
    /// Cursor from `response_metadata.next_cursor`.
    #[serde(default, deserialize_with = "opt_string")]
    pub cursor: Option<String>,
}

/// Response of `conversations.history`.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct HistoryResponse {
    /// Always `true`.
    pub ok: bool,
    /// Top-level messages, newest first.
    pub messages: Vec<MessageView>,
    /// Whether another page exists.
    pub has_more: bool,
    /// Always 0.
    pub pin_count: u32,
    /// Pagination cursor.
    pub response_metadata: ResponseMetadata,
}

/// Arguments of `conversations.replies`.
#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct RepliesArgs {
    /// Channel id.
    #[serde(default, deserialize_with = "opt_string")]
    pub channel: Option<String>,
    /// Thread parent timestamp.
    #[serde(default, deserialize_with = "opt_string")]
    pub ts: Option<String>,
    /// Page size.
    #[serde(default, deserialize_with = "opt_u64")]
    pub limit: Option<u64>,
    /// Cursor from `response_metadata.next_cursor`.
    #[serde(default, deserialize_with = "opt_string")]
    pub cursor: Option<String>,
}

/// Response of `conversations.replies`.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct RepliesResponse {
    /// Always `true`.
    pub ok: bool,
    /// Parent followed by replies, oldest first.
    pub messages: Vec<MessageView>,
    /// Whether another page exists.
    pub has_more: bool,
    /// Pagination cursor.
    pub response_metadata: ResponseMetadata,
}

/// Arguments of `conversations.create`.
#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct CreateConversationArgs {
    /// Channel name.
    #[serde(default, deserialize_with = "opt_string")]
    #[param(example = "project-x")]
    pub name: Option<String>,
    /// Create a private channel.
    #[serde(default, deserialize_with = "flag")]
    pub is_private: bool,
    /// Creator; defaults to the bot user.
    #[serde(default, deserialize_with = "opt_string")]
    pub user: Option<String>,
}

/// Arguments of `conversations.members`.
#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct MembersArgs {
    /// Channel id.
    #[serde(default, deserialize_with = "opt_string")]
    pub channel: Option<String>,
    /// Page size.
    #[serde(default, deserialize_with = "opt_u64")]
    pub limit: Option<u64>,
    /// Cursor from `response_metadata.next_cursor`.
    #[serde(default, deserialize_with = "opt_string")]
    pub cursor: Option<String>,
}

/// Response of `conversations.members`.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct MembersResponse {
    /// Always `true`.
    pub ok: bool,
    /// Member user ids.
    pub members: Vec<String>,
    /// Pagination cursor.
    pub response_metadata: ResponseMetadata,
}

/// Arguments of `conversations.join` and `conversations.leave`.
#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct MembershipArgs {
    /// Channel id.
    #[serde(default, deserialize_with = "opt_string")]
    pub channel: Option<String>,
    /// Joining or leaving user; defaults to the bot user.
    #[serde(default, deserialize_with = "opt_string")]
    pub user: Option<String>,
}

/// Response of `conversations.join`.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct JoinResponse {
    /// Always `true`.
    pub ok: bool,
    /// The joined conversation.
    pub channel: ChannelView,
    /// `already_in_channel` when the user was a member before.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,
}

/// Response of `conversations.leave`.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct LeaveResponse {
    /// Always `true`.
    pub ok: bool,
    /// Set when the user was not a member.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub not_in_channel: bool,
}

fn require_channel_arg(channel: Option<String>) -> ApiResult<String> {
    channel.ok_or_else(|| ApiError::bad_request("channel_not_found", "Channel parameter required"))
}

fn validate_bound(value: Option<String>, error_code: &str) -> ApiResult<Option<String>> {
    value
        .map(|ts| {
            apisim_core::normalize_ts(&ts)
                .ok_or_else(|| ApiError::bad_request(error_code, format!("Invalid timestamp '{ts}'")))
        })
        .transpose()
}

/// Message objects with thread metadata and reactions.
fn full_message_views(state: &SharedState, messages: Vec<Message>) -> ApiResult<Vec<MessageView>> {
    Ok(state
        .store()
        .message_details(messages)?
        .into_iter()
        .map(|details| {
            let view = MessageView::new(&details.message);
            let view = match details.thread {
                Some(summary) => view.with_thread(summary),
                None => view,
            };
            view.with_reactions(details.reactions)
        })
        .collect())
}

// ============================================================================
// Handlers
// ============================================================================

/// List conversations.
#[utoipa::path(
    method(get, post),
    path = "/api/conversations.list",
    tag = "conversations",
    operation_id = "conversationsList",
    summary = "List conversations",
    description = "Lists channels ordered by id. `types` filters by conversation type; \
        without it all four types are returned, and an empty value disables the filter.",
    params(ListConversationsArgs),
    responses(
        (status = 200, description = "Conversations", body = ListConversationsResponse),
        (status = 400, description = "Invalid arguments", body = ErrorResponse),
        (status = 401, description = "Missing or invalid token", body = ErrorResponse)
    ),
    security(("bearer" = []))
)]
pub async fn list(
    _auth: Authenticated,
    State(state): State<SharedState>,
    SlackArgs(args): SlackArgs<ListConversationsArgs>,
) -> ApiResult<Json<ListConversationsResponse>> {
    let filter = ChannelFilter::from_types_param(args.types.as_deref());
    let page = state.page(args.cursor.as_deref(), args.limit);
    let last_read = state.clock().now();
    let channels = state
        .store()
        .list_channels(&filter, &page)?
        .map(|channel| ChannelView::new(&channel, last_read.clone()));

    Ok(Json(ListConversationsResponse {
        ok: true,
        response_metadata: ResponseMetadata::from_page(&channels),
        channels: channels.items,
    }))
}

/// Get a conversation.
#[utoipa::path(
    method(get, post),
    path = "/api/conversations.info",
    tag = "conversations",
    operation_id = "conversationsInfo",
    summary = "Get conversation details",
    description = "Returns a channel with its member count and newest top-level message.",
    params(ConversationInfoArgs),
    responses(
        (status = 200, description = "The conversation", body = ConversationResponse),
        (status = 400, description = "Channel argument missing", body = ErrorResponse),
        (status = 401, description = "Missing or invalid token", body = ErrorResponse),
        (status = 404, description = "Channel not found", body = ErrorResponse)
    ),
    security(("bearer" = []))
)]
pub async fn info(
    _auth: Authenticated,
    State(state): State<SharedState>,
    SlackArgs(args): SlackArgs<ConversationInfoArgs>,
) -> ApiResult<Json<ConversationResponse>> {
    let channel_id = require_channel_arg(args.channel)?;
    let store = state.store();
    let channel = store
        .channel(&channel_id)?
        .ok_or_else(|| SimError::ChannelNotFound(channel_id.clone()))?;

    let latest = store.latest_message(&channel_id)?.map(|m| MessageView::new(&m));
    let view = ChannelView::new(&channel, state.clock().now())
        .with_num_members(store.member_count(&channel_id)?)
        .with_latest(latest)
        .with_locale(args.include_locale);

    Ok(Json(ConversationResponse { ok: true, channel: view }))
}

/// Read channel history.
#[utoipa::path(
    method(get, post),
    path = "/api/conversations.history",
    tag = "conversations",
    operation_id = "conversationsHistory",
    summary = "Fetch channel history",
    description = "Returns top-level messages newest first, with thread metadata and \
        grouped reactions. Thread replies are served by `conversations.replies`.",
    params(HistoryArgs),
    responses(
        (status = 200, description = "Messages", body = HistoryResponse),
        (status = 400, description = "Channel missing or invalid timestamp bound", body = ErrorResponse),
        (status = 401, description = "Missing or invalid token", body = ErrorResponse),
        (status = 404, description = "Channel not found", body = ErrorResponse)
    ),
    security(("bearer" = []))
)]
pub async fn history(
    _auth: Authenticated,
    State(state): State<SharedState>,
    SlackArgs(args): SlackArgs<HistoryArgs>,
) -> ApiResult<Json<HistoryResponse>> {
    let channel_id = require_channel_arg(args.channel)?;
    let oldest = validate_bound(args.oldest, "invalid_ts_oldest")?;
    let latest = validate_bound(args.latest, "invalid_ts_latest")?;

    let query = HistoryQuery::new(channel_id, state.page(args.cursor.as_deref(), args.limit))
        .between(oldest, latest, args.inclusive);
    let page = state.store().history(&query)?;
    let response_metadata = ResponseMetadata::from_page(&page);

    Ok(Json(HistoryResponse {
        ok: true,
        has_more: page.has_more,
        messages: full_message_views(&state, page.items)?,
        pin_count: 0,
        response_metadata,
    }))
}

/// Read a thread.
#[utoipa::path(
    method(get, post),
    path = "/api/conversations.replies",
    tag = "conversations",
    operation_id = "conversationsReplies",
    summary = "Fetch a thread",
    description = "Returns the thread parent followed by its replies, oldest first.",
    params(RepliesArgs),
    responses(
        (status = 200, description = "Thread messages", body = RepliesResponse),
        (status = 400, description = "Channel or ts missing", body = ErrorResponse),
        (status = 401, description = "Missing or invalid token", body = ErrorResponse),
        (status = 404, description = "Thread not found", body = ErrorResponse)
    ),
    security(("bearer" = []))
)]
pub async fn replies(
    _auth: Authenticated,
    State(state): State<SharedState>,
    SlackArgs(args): SlackArgs<RepliesArgs>,
) -> ApiResult<Json<RepliesResponse>> {
    let (Some(channel_id), Some(ts)) = (args.channel, args.ts) else {
        return Err(ApiError::missing_parameter("Channel and ts parameters required"));
    };
    let page = state
        .store()
        .replies(&channel_id, &ts, &state.page(args.cursor.as_deref(), args.limit))?;
    let response_metadata = ResponseMetadata::from_page(&page);

    Ok(Json(RepliesResponse {
        ok: true,
        has_more: page.has_more,
        messages: full_message_views(&state, page.items)?,
        response_metadata,
    }))
}

/// Create a channel.
#[utoipa::path(
    method(get, post),
    path = "/api/conversations.create",
    tag = "conversations",
    operation_id = "conversationsCreate",
    summary = "Create a channel",
    description = "Creates a public or private channel in the first team. Names are \
        lower-cased and must be 1-80 characters of letters, digits, `-` and `_`.",
    params(CreateConversationArgs),
    responses(
        (status = 200, description = "Created channel", body = ConversationResponse),
        (status = 400, description = "Invalid or taken name", body = ErrorResponse),
        (status = 401, description = "Missing or invalid token", body = ErrorResponse),
        (status = 404, description = "No team or creator", body = ErrorResponse)
    ),
    security(("bearer" = []))
)]
pub async fn create(
    _auth: Authenticated,
    State(state): State<SharedState>,
    SlackArgs(args): SlackArgs<CreateConversationArgs>,
) -> ApiResult<Json<ConversationResponse>> {
    let name = args
        .name
        .ok_or_else(|| ApiError::bad_request("invalid_name", "Name parameter required"))?;
    let store = state.store();
    let team = store.first_team()?.ok_or(SimError::TeamNotFound)?;
    let creator = acting_user(&state, &team.id, args.user)?;

    let channel = store.create_channel(&team.id, &name, args.is_private, Some(&creator))?;
    let view = ChannelView::new(&channel, state.clock().now())
        .with_num_members(store.member_count(&channel.id)?);

    Ok(Json(ConversationResponse { ok: true, channel: view }))
}

/// List channel members.
#[utoipa::path(
    method(get, post),
    path = "/api/conversations.members",
    tag = "conversations",
    operation_id = "conversationsMembers",
    summary = "List channel members",
    params(MembersArgs),
    responses(
        (status = 200, description = "Member ids", body = MembersResponse),
        (status = 400, description = "Channel argument missing", body = ErrorResponse),
        (status = 401, description = "Missing or invalid token", body = ErrorResponse),
        (status = 404, description = "Channel not found", body = ErrorResponse)
    ),
    security(("bearer" = []))
)]
pub async fn members(
    _auth: Authenticated,
    State(state): State<SharedState>,
    SlackArgs(args): SlackArgs<MembersArgs>,
) -> ApiResult<Json<MembersResponse>> {
    let channel_id = require_channel_arg(args.channel)?;
    let page = state
        .store()
        .list_members(&channel_id, &state.page(args.cursor.as_deref(), args.limit))?;

    Ok(Json(MembersResponse {
        ok: true,
        response_metadata: ResponseMetadata::from_page(&page),
        members: page.items,
    }))
}

/// Join a channel.
#[utoipa::path(
    method(get, post),
    path = "/api/conversations.join",
    tag = "conversations",
    operation_id = "conversationsJoin",
    summary = "Join a channel",
    params(MembershipArgs),
    responses(
        (status = 200, description = "Joined channel", body = JoinResponse),
        (status = 400, description = "Channel argument missing", body = ErrorResponse),
        (status = 401, description = "Missing or invalid token", body = ErrorResponse),
        (status = 404, description = "Channel or user not found", body = ErrorResponse)
    ),
    security(("bearer" = []))
)]
pub async fn join(
    _auth: Authenticated,
    State(state): State<SharedState>,
    SlackArgs(args): SlackArgs<MembershipArgs>,
) -> ApiResult<Json<JoinResponse>> {
    let channel_id = require_channel_arg(args.channel)?;
    let store = state.store();
    let channel = store
        .channel(&channel_id)?
        .ok_or_else(|| SimError::ChannelNotFound(channel_id.clone()))?;
    let user_id = acting_user(&state, &channel.team_id, args.user)?;

    let added = store.add_member(&channel_id, &user_id)?;
    if added {
        info!(channel = %channel_id, user = %user_id, "User joined channel");
    }
    let view = ChannelView::new(&channel, state.clock().now())
        .with_num_members(store.member_count(&channel_id)?);

    Ok(Json(JoinResponse {
        ok: true,
        channel: view,
        warning: (!added).then(|| "already_in_channel".to_string()),
    }))
}

/// Leave a channel.
#[utoipa::path(
    method(get, post),
    path = "/api/conversations.leave",
    tag = "conversations",
    operation_id = "conversationsLeave",
    summary = "Leave a channel",
    params(MembershipArgs),
    responses(
        (status = 200, description = "Left channel", body = LeaveResponse),
        (status = 400, description = "Channel argument missing", body = ErrorResponse),
        (status = 401, description = "Missing or invalid token", body = ErrorResponse),
        (status = 404, description = "Channel not found", body = ErrorResponse)
    ),
    security(("bearer" = []))
)]
pub async fn leave(
    _auth: Authenticated,
    State(state): State<SharedState>,
    SlackArgs(args): SlackArgs<MembershipArgs>,
) -> ApiResult<Json<LeaveResponse>> {
    let channel_id = require_channel_arg(args.channel)?;
    let store = state.store();
    let channel = store
        .channel(&channel_id)?
        .ok_or_else(|| SimError::ChannelNotFound(channel_id.clone()))?;
    let user_id = acting_user(&state, &channel.team_id, args.user)?;

    let removed = store.remove_member(&channel_id, &user_id)?;
    if removed {
        info!(channel = %channel_id, user = %user_id, "User left channel");
    }
    Ok(Json(LeaveResponse {
        ok: true,
        not_in_channel: !removed,
    }))
}
