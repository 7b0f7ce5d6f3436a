//! `users.*` Web API methods.

use apisim_core::SimError;
use axum::extract::State;
use axum::Json;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::api::args::{flag, opt_string, opt_u64, SlackArgs};
use crate::api::auth::Authenticated;
use crate::api::error::{ApiError, ApiResult, ErrorResponse};
use crate::api::views::{ResponseMetadata, UserView};
use crate::state::SharedState;

/// Arguments of `users.list`.
#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ListUsersArgs {
    /// Page size.
    #[serde(default, deserialize_with = "opt_u64")]
    pub limit: Option<u64>,
    /// Cursor from `response_metadata.next_cursor`.
    #[serde(default, deserialize_with = "opt_string")]
    pub cursor: Option<String>,
    /// Add `locale` to every user.
    #[serde(default, deserialize_with = "flag")]
    pub include_locale: bool,
}

/// Response of `users.list`.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ListUsersResponse {
    /// Always `true`.
    pub ok: bool,
    /// Users ordered by id.
    pub members: Vec<UserView>,
    /// Response time (epoch seconds).
    pub cache_ts: i64,
    /// Pagination cursor.
    pub response_metadata: ResponseMetadata,
}

/// Arguments of `users.info`.
#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct UserInfoArgs {
    /// User id.
    #[serde(default, deserialize_with = "opt_string")]
    #[param(example = "U061F7AUR")]
    pub user: Option<String>,
    /// Add `locale` to the user.
    #[serde(default, deserialize_with = "flag")]
    pub include_locale: bool,
}

/// Response of `users.info`.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct UserInfoResponse {
    /// Always `true`.
    pub ok: bool,
    /// The user.
    pub user: UserView,
}

/// List users.
#[utoipa::path(
    method(get, post),
    path = "/api/users.list",
    tag = "users",
    operation_id = "usersList",
    summary = "List workspace users",
    params(ListUsersArgs),
    responses(
        (status = 200, description = "Users", body = ListUsersResponse),
        (status = 400, description = "Invalid arguments", body = ErrorResponse),
        (status = 401, description = "Missing or invalid token", body = ErrorResponse)
    ),
    security(("bearer" = []))
)]
pub async fn list(
    _auth: Authenticated,
    State(state): State<SharedState>,
    SlackArgs(args): SlackArgs<ListUsersArgs>,
) -> ApiResult<Json<ListUsersResponse>> {
    let page = state
        .store()
        .list_users(&state.page(args.cursor.as_deref(), args.limit))?
        .map(|user| UserView::new(&user, args.include_locale));

    Ok(Json(ListUsersResponse {
        ok: true,
        response_metadata: ResponseMetadata::from_page(&page),
        members: page.items,
        cache_ts: Utc::now().timestamp(),
    }))
}

/// Get a user.
#[utoipa::path(
    method(get, post),
    path = "/api/users.info",
    tag = "users",
    operation_id = "usersInfo",
    summary = "Get user details",
    params(UserInfoArgs),
    responses(
        (status = 200, description = "The user", body = UserInfoResponse),
        (status = 400, description = "User argument missing", body = ErrorResponse),
        (status = 401, description = "Missing or invalid token", body = ErrorResponse),
        (status = 404, description = "User not found", body = ErrorResponse)
    ),
    security(("bearer" = []))
)]
pub async fn info(
    _auth: Authenticated,
    State(state): State<SharedState>,
    SlackArgs(args): SlackArgs<UserInfoArgs>,
) -> ApiResult<Json<UserInfoResponse>> {
    let user_id = args
        .user
        .ok_or_else(|| ApiError::bad_request("user_not_found", "User parameter required"))?;
    let user = state
        .store()
        .user(&user_id)?
        .ok_or(SimError::UserNotFound(user_id))?;

    Ok(Json(UserInfoResponse {
        ok: true,
        user: UserView::new(&user, args.include_locale),
    }))
}
