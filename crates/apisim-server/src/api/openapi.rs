//! OpenAPI specification generation for the apisim API.
//!
//! The document describes the simulated Slack Web API and Events API exactly
//! as this server implements them. It is served at `/api/openapi.json` and
//! written to disk by the `gen-openapi` binary.

use apisim_core::{EventEnvelope, ReactionSummary};
use axum::Json;
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};

use super::chat::{DeleteMessageResponse, PostMessageResponse, UpdateMessageResponse};
use super::conversations::{
    ConversationResponse, HistoryResponse, JoinResponse, LeaveResponse, ListConversationsResponse,
    MembersResponse, RepliesResponse,
};
use super::error::ErrorResponse;
use super::events::{ChallengeResponse, EventAck};
use super::health::{ApiTestResponse, HealthResponse};
use super::reactions::OkResponse;
use super::team::{AuthTestResponse, TeamInfoResponse};
use super::users::{ListUsersResponse, UserInfoResponse};
use super::views::{
    ChannelView, MessageView, ProfileView, ResponseMetadata, TeamIconView, TeamView, TopicView,
    UserView,
};

/// Serve the OpenAPI specification as JSON.
pub async fn get_openapi_spec() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}

/// Returns the OpenAPI specification as a pretty-printed string.
///
/// # Errors
///
/// Returns an error if the document cannot be serialized.
pub fn get_openapi_json() -> Result<String, serde_json::Error> {
    ApiDoc::openapi().to_pretty_json()
}

/// Registers the bearer token scheme referenced by the Web API methods.
struct BearerAuth;

impl Modify for BearerAuth {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .description(Some("Any token of at least `auth.min_token_length` characters"))
                    .build(),
            ),
        );
    }
}

/// Main OpenAPI document structure for apisim.
#[derive(OpenApi)]
#[openapi(
    info(
        title = "apisim API",
        version = "0.1.0",
        description = r#"
# apisim API

A stateful simulator of the Slack Web API and Events API, backed by SQLite.

## Conventions

- Web API methods live under `/api/<method>` and accept GET and POST.
- Arguments may be sent as query parameters, a JSON body or a form body; query parameters win.
- Every Web API method requires `Authorization: Bearer <token>`.
- Responses are `{"ok": true, ...}` or `{"ok": false, "error": "<code>"}`.
- List methods page with `cursor` and `limit`; the next cursor is in `response_metadata.next_cursor`.
"#,
        license(name = "MIT", url = "https://opensource.org/licenses/MIT")
    ),
    servers(
        (url = "/", description = "Local apisim server")
    ),
    modifiers(&BearerAuth),
    tags(
        (name = "system", description = "Health checks and connectivity"),
        (name = "events", description = "Events API request URL"),
        (name = "conversations", description = "Channels, DMs, history and threads"),
        (name = "chat", description = "Posting, editing and deleting messages"),
        (name = "reactions", description = "Emoji reactions on messages"),
        (name = "users", description = "Workspace members"),
        (name = "team", description = "Workspace and token information")
    ),
    paths(
        super::health::health_check,
        super::health::api_test,
        super::events::handle_events,
        super::conversations::list,
        super::conversations::info,
        super::conversations::history,
        super::conversations::replies,
        super::conversations::create,
        super::conversations::members,
        super::conversations::join,
        super::conversations::leave,
        super::chat::post_message,
        super::chat::update,
        super::chat::delete,
        super::reactions::add,
        super::reactions::remove,
        super::users::list,
        super::users::info,
        super::team::team_info,
        super::team::auth_test,
    ),
    components(
        schemas(
            ErrorResponse,
            HealthResponse,
            ApiTestResponse,
            EventEnvelope,
            ChallengeResponse,
            EventAck,
            ResponseMetadata,
            TopicView,
            ChannelView,
            MessageView,
            ReactionSummary,
            ProfileView,
            UserView,
            TeamIconView,
            TeamView,
            ListConversationsResponse,
            ConversationResponse,
            HistoryResponse,
            RepliesResponse,
            MembersResponse,
            JoinResponse,
            LeaveResponse,
            PostMessageResponse,
            UpdateMessageResponse,
            DeleteMessageResponse,
            OkResponse,
            ListUsersResponse,
            UserInfoResponse,
            TeamInfoResponse,
            AuthTestResponse,
        )
    )
)]
pub struct ApiDoc;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_openapi_spec_generation() {
        let spec = ApiDoc::openapi();
        assert_eq!(spec.info.title, "apisim API");
        assert!(spec.paths.paths.contains_key("/api/chat.postMessage"));
        assert!(spec.paths.paths.contains_key("/health"));
    }

    #[test]
    fn test_openapi_json_serialization() {
        let json = get_openapi_json().unwrap();
        assert!(json.contains("\"openapi\":"));
        assert!(json.contains("\"apisim API\""));
        assert!(json.contains("\"bearer\""));
    }
}
