//! HTTP API routes and handlers.
//!
//! This module contains all HTTP endpoint implementations organized by domain:
//! - `conversations` - Channel listing, history, threads and membership
//! - `chat` - Posting, editing and deleting messages
//! - `reactions` - Emoji reactions
//! - `users` / `team` - Directory lookups and `auth.test`
//! - `events` - Events API request URL
//! - `health` - Service health checks
//! - `openapi` - OpenAPI specification generation
//!
//! Shared plumbing lives in `args` (argument merging), `auth` (bearer token
//! check), `error` (Slack-style error bodies) and `views` (response objects).

use axum::extract::{Request, State};
use axum::http::Method;
use axum::middleware::{self, Next};
use axum::response::Response;
use axum::routing::{get, post, MethodRouter};
use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::state::SharedState;

pub mod args;
pub mod auth;
pub mod chat;
pub mod conversations;
pub mod error;
pub mod events;
pub mod health;
pub mod openapi;
pub mod reactions;
pub mod team;
pub mod users;
pub mod views;

pub use error::{ApiError, ApiResult, ErrorResponse};
pub use openapi::get_openapi_json;

/// Web API methods as `(name, handler)` pairs, mounted at `/api/<name>`.
fn web_api_methods() -> Vec<(&'static str, MethodRouter<SharedState>)> {
    vec![
        ("conversations.list", get(conversations::list).post(conversations::list)),
        ("conversations.info", get(conversations::info).post(conversations::info)),
        ("conversations.history", get(conversations::history).post(conversations::history)),
        ("conversations.replies", get(conversations::replies).post(conversations::replies)),
        ("conversations.create", get(conversations::create).post(conversations::create)),
        ("conversations.members", get(conversations::members).post(conversations::members)),
        ("conversations.join", get(conversations::join).post(conversations::join)),
        ("conversations.leave", get(conversations::leave).post(conversations::leave)),
        ("chat.postMessage", get(chat::post_message).post(chat::post_message)),
        ("chat.update", get(chat::update).post(chat::update)),
        ("chat.delete", get(chat::delete).post(chat::delete)),
        ("reactions.add", get(reactions::add).post(reactions::add)),
        ("reactions.remove", get(reactions::remove).post(reactions::remove)),
        ("users.list", get(users::list).post(users::list)),
        ("users.info", get(users::info).post(users::info)),
        ("team.info", get(team::team_info).post(team::team_info)),
        ("auth.test", get(team::auth_test).post(team::auth_test)),
    ]
}

/// Names of the Web API methods, in routing order.
#[must_use]
pub fn web_api_method_names() -> Vec<&'static str> {
    web_api_methods().into_iter().map(|(name, _)| name).collect()
}

/// Creates the combined API router with all endpoints.
///
/// # Route Structure
///
/// ```text
/// /health                   - Health check
/// /api
/// ├── /test                 - Connectivity banner
/// ├── /events               - Events API (no auth)
/// ├── /openapi.json         - OpenAPI specification
/// └── /<method>             - Web API methods, e.g. /api/chat.postMessage
/// ```
pub fn create_router(state: SharedState) -> Router {
    let api = web_api_methods()
        .into_iter()
        .fold(Router::new(), |router, (name, handler)| {
            router.route(&format!("/{name}"), handler)
        })
        .route("/test", get(health::api_test))
        .route("/events", post(events::handle_events))
        .route("/openapi.json", get(openapi::get_openapi_spec));

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health::health_check))
        .nest("/api", api)
        .fallback(route_not_found)
        .method_not_allowed_fallback(method_not_allowed)
        .layer(middleware::from_fn_with_state(state.clone(), count_requests))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

/// User a Web API call acts as: the requested one, or the configured bot
/// user, which is provisioned in `team_id` on first use.
pub(crate) fn acting_user(
    state: &SharedState,
    team_id: &str,
    requested: Option<String>,
) -> ApiResult<String> {
    if let Some(user) = requested {
        return Ok(user);
    }
    let bot_id = &state.config().simulation.bot_user_id;
    Ok(state.store().ensure_bot_user(bot_id, team_id)?.id)
}

async fn count_requests(State(state): State<SharedState>, request: Request, next: Next) -> Response {
    let n = state.record_request();
    info!("Request #{n}: {} {}", request.method(), request.uri().path());
    next.run(request).await
}

async fn route_not_found() -> ApiError {
    ApiError::route_not_found()
}

async fn method_not_allowed() -> ApiError {
    ApiError::MethodNotAllowed
}
