//! Web API methods served over HTTP.

mod common;

use apisim_core::{Channel, ChannelType, NewMessage};
use axum::http::header::{ACCESS_CONTROL_ALLOW_ORIGIN, ORIGIN};
use axum::http::{HeaderValue, StatusCode};
use serde_json::{json, Value};

use common::{fixture, TOKEN};

// ============================================================================
// Authentication and routing
// ============================================================================

#[tokio::test]
async fn test_missing_token_is_rejected() {
    let f = fixture();
    let response = f.server.get("/api/users.list").await;

    assert_eq!(response.status_code(), StatusCode::UNAUTHORIZED);
    let body: Value = response.json();
    assert_eq!(body["ok"], false);
    assert_eq!(body["error"], "missing_auth");
}

#[tokio::test]
async fn test_short_token_is_rejected() {
    let f = fixture();
    let response = f
        .server
        .get("/api/users.list")
        .authorization_bearer("xoxb")
        .await;

    assert_eq!(response.status_code(), StatusCode::UNAUTHORIZED);
    assert_eq!(response.json::<Value>()["error"], "invalid_auth");
}

#[tokio::test]
async fn test_auth_is_checked_before_arguments() {
    let f = fixture();
    let response = f.server.get("/api/conversations.info").await;
    assert_eq!(response.json::<Value>()["error"], "missing_auth");
}

#[tokio::test]
async fn test_unknown_route_and_wrong_method() {
    let f = fixture();

    let response = f.server.get("/api/nope.nothing").await;
    assert_eq!(response.status_code(), StatusCode::NOT_FOUND);
    assert_eq!(response.json::<Value>()["error"], "not_found");

    let response = f.server.delete("/api/chat.postMessage").await;
    assert_eq!(response.status_code(), StatusCode::METHOD_NOT_ALLOWED);
    assert_eq!(response.json::<Value>()["error"], "method_not_allowed");
}

#[tokio::test]
async fn test_health_and_banner() {
    let f = fixture();

    let response = f.server.get("/health").await;
    assert_eq!(response.status_code(), StatusCode::OK);
    let body: Value = response.json();
    assert_eq!(body["status"], "healthy");
    assert!(body["requests_served"].as_u64().unwrap() >= 1);

    let response = f.server.get("/api/test").await;
    let body: Value = response.json();
    assert_eq!(body["ok"], true);
    assert_eq!(body["version"], env!("CARGO_PKG_VERSION"));
}

#[tokio::test]
async fn test_requests_are_counted() {
    let f = fixture();
    f.server.get("/api/test").await;
    f.server.get("/api/nope").await;
    assert_eq!(f.state.requests_served(), 2);
}

#[tokio::test]
async fn test_openapi_document_is_served() {
    let f = fixture();
    let body: Value = f.server.get("/api/openapi.json").await.json();
    assert!(body["paths"]["/api/conversations.history"].is_object());
    assert!(body["components"]["securitySchemes"]["bearer"].is_object());
}

// ============================================================================
// Argument handling
// ============================================================================

#[tokio::test]
async fn test_arguments_from_query_json_and_form() {
    let f = fixture();

    let from_query: Value = f
        .server
        .get("/api/conversations.info")
        .authorization_bearer(TOKEN)
        .add_query_param("channel", "C1")
        .await
        .json();
    assert_eq!(from_query["channel"]["id"], "C1");

    let from_json: Value = f
        .server
        .post("/api/conversations.info")
        .authorization_bearer(TOKEN)
        .json(&json!({"channel": "C1"}))
        .await
        .json();
    assert_eq!(from_json["channel"]["id"], "C1");

    let from_form: Value = f
        .server
        .post("/api/conversations.info")
        .authorization_bearer(TOKEN)
        .form(&[("channel", "G1")])
        .await
        .json();
    assert_eq!(from_form["channel"]["id"], "G1");
}

#[tokio::test]
async fn test_query_wins_over_body() {
    let f = fixture();
    let body: Value = f
        .server
        .post("/api/conversations.info")
        .authorization_bearer(TOKEN)
        .add_query_param("channel", "G1")
        .json(&json!({"channel": "C1"}))
        .await
        .json();
    assert_eq!(body["channel"]["id"], "G1");
}

#[tokio::test]
async fn test_non_numeric_limit_is_invalid_arguments() {
    let f = fixture();
    let response = f
        .server
        .get("/api/users.list")
        .authorization_bearer(TOKEN)
        .add_query_param("limit", "lots")
        .await;
    assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
    assert_eq!(response.json::<Value>()["error"], "invalid_arguments");
}

// ============================================================================
// conversations.*
// ============================================================================

#[tokio::test]
async fn test_conversations_list_filters_and_pages() {
    let f = fixture();

    let body: Value = f
        .server
        .get("/api/conversations.list")
        .authorization_bearer(TOKEN)
        .await
        .json();
    assert_eq!(body["ok"], true);
    assert_eq!(body["channels"].as_array().unwrap().len(), 2);

    let body: Value = f
        .server
        .get("/api/conversations.list")
        .authorization_bearer(TOKEN)
        .add_query_param("types", "public_channel")
        .await
        .json();
    assert_eq!(body["channels"].as_array().unwrap().len(), 1);
    assert_eq!(body["channels"][0]["name"], "general");

    let body: Value = f
        .server
        .get("/api/conversations.list")
        .authorization_bearer(TOKEN)
        .add_query_param("types", "public_channel,private_channel")
        .add_query_param("limit", "1")
        .await
        .json();
    assert_eq!(body["channels"].as_array().unwrap().len(), 1);
    let cursor = body["response_metadata"]["next_cursor"].as_str().unwrap().to_string();
    assert!(!cursor.is_empty());

    let body: Value = f
        .server
        .get("/api/conversations.list")
        .authorization_bearer(TOKEN)
        .add_query_param("types", "public_channel,private_channel")
        .add_query_param("limit", "1")
        .add_query_param("cursor", cursor)
        .await
        .json();
    assert_eq!(body["channels"].as_array().unwrap().len(), 1);
    assert_eq!(body["response_metadata"]["next_cursor"], "");
}

#[tokio::test]
async fn test_conversations_info_errors_and_member_count() {
    let f = fixture();

    let response = f
        .server
        .get("/api/conversations.info")
        .authorization_bearer(TOKEN)
        .await;
    assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
    assert_eq!(response.json::<Value>()["error"], "channel_not_found");

    let response = f
        .server
        .get("/api/conversations.info")
        .authorization_bearer(TOKEN)
        .add_query_param("channel", "C404")
        .await;
    assert_eq!(response.status_code(), StatusCode::NOT_FOUND);

    let body: Value = f
        .server
        .get("/api/conversations.info")
        .authorization_bearer(TOKEN)
        .add_query_param("channel", "C1")
        .add_query_param("include_locale", "true")
        .await
        .json();
    assert_eq!(body["channel"]["num_members"], 1);
    assert_eq!(body["channel"]["topic"]["value"], "Company-wide");
    assert!(body["channel"]["locale"].is_string());
}

#[tokio::test]
async fn test_history_threads_and_reactions() {
    let f = fixture();

    let parent: Value = f
        .server
        .post("/api/chat.postMessage")
        .authorization_bearer(TOKEN)
        .json(&json!({"channel": "C1", "user": "U1", "text": "Hello"}))
        .await
        .json();
    let parent_ts = parent["ts"].as_str().unwrap().to_string();

    f.server
        .post("/api/chat.postMessage")
        .authorization_bearer(TOKEN)
        .json(&json!({"channel": "C1", "user": "U2", "text": "Hi!", "thread_ts": parent_ts}))
        .await;
    f.server
        .post("/api/reactions.add")
        .authorization_bearer(TOKEN)
        .json(&json!({"channel": "C1", "timestamp": parent_ts, "name": ":thumbsup:", "user": "U2"}))
        .await;

    let history: Value = f
        .server
        .get("/api/conversations.history")
        .authorization_bearer(TOKEN)
        .add_query_param("channel", "C1")
        .await
        .json();
    let messages = history["messages"].as_array().unwrap();
    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0]["reply_count"], 1);
    assert_eq!(messages[0]["reply_users"], json!(["U2"]));
    assert_eq!(messages[0]["reactions"][0]["name"], "thumbsup");
    assert_eq!(messages[0]["reactions"][0]["count"], 1);
    assert_eq!(history["has_more"], false);
    assert_eq!(history["pin_count"], 0);

    let replies: Value = f
        .server
        .get("/api/conversations.replies")
        .authorization_bearer(TOKEN)
        .add_query_param("channel", "C1")
        .add_query_param("ts", &parent_ts)
        .await
        .json();
    let thread = replies["messages"].as_array().unwrap();
    assert_eq!(thread.len(), 2);
    assert_eq!(thread[0]["ts"], parent_ts.as_str());
    assert_eq!(thread[1]["text"], "Hi!");
}

#[tokio::test]
async fn test_history_validation() {
    let f = fixture();

    let response = f
        .server
        .get("/api/conversations.history")
        .authorization_bearer(TOKEN)
        .add_query_param("channel", "C404")
        .await;
    assert_eq!(response.status_code(), StatusCode::NOT_FOUND);
    assert_eq!(response.json::<Value>()["error"], "channel_not_found");

    let response = f
        .server
        .get("/api/conversations.history")
        .authorization_bearer(TOKEN)
        .add_query_param("channel", "C1")
        .add_query_param("oldest", "yesterday")
        .await;
    assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
    assert_eq!(response.json::<Value>()["error"], "invalid_ts_oldest");

    let response = f
        .server
        .get("/api/conversations.history")
        .authorization_bearer(TOKEN)
        .add_query_param("channel", "C1")
        .add_query_param("latest", "soon")
        .await;
    assert_eq!(response.json::<Value>()["error"], "invalid_ts_latest");
}

#[tokio::test]
async fn test_history_pages_newest_first() {
    let f = fixture();
    for text in ["one", "two", "three"] {
        f.server
            .post("/api/chat.postMessage")
            .authorization_bearer(TOKEN)
            .json(&json!({"channel": "C1", "user": "U1", "text": text}))
            .await;
    }

    let first: Value = f
        .server
        .get("/api/conversations.history")
        .authorization_bearer(TOKEN)
        .add_query_param("channel", "C1")
        .add_query_param("limit", "2")
        .await
        .json();
    assert_eq!(first["messages"][0]["text"], "three");
    assert_eq!(first["messages"][1]["text"], "two");
    assert_eq!(first["has_more"], true);

    let cursor = first["response_metadata"]["next_cursor"].as_str().unwrap().to_string();
    let second: Value = f
        .server
        .get("/api/conversations.history")
        .authorization_bearer(TOKEN)
        .add_query_param("channel", "C1")
        .add_query_param("limit", "2")
        .add_query_param("cursor", cursor)
        .await
        .json();
    assert_eq!(second["messages"].as_array().unwrap().len(), 1);
    assert_eq!(second["messages"][0]["text"], "one");
    assert_eq!(second["has_more"], false);
}

#[tokio::test]
async fn test_empty_types_lists_every_channel() {
    let f = fixture();
    f.state
        .store()
        .insert_channel(&Channel::new("H1", None, ChannelType::AppHome, "T1"))
        .unwrap();

    let body: Value = f
        .server
        .get("/api/conversations.list")
        .authorization_bearer(TOKEN)
        .add_query_param("types", "")
        .await
        .json();
    let ids: Vec<&str> = body["channels"]
        .as_array()
        .unwrap()
        .iter()
        .filter_map(|channel| channel["id"].as_str())
        .collect();
    assert_eq!(ids, ["C1", "G1", "H1"]);

    let body: Value = f
        .server
        .get("/api/conversations.list")
        .authorization_bearer(TOKEN)
        .await
        .json();
    assert_eq!(body["channels"].as_array().unwrap().len(), 2);
}

async fn history_texts(f: &common::Fixture, params: &[(&str, &str)]) -> Vec<String> {
    let mut request = f
        .server
        .get("/api/conversations.history")
        .authorization_bearer(TOKEN)
        .add_query_param("channel", "C1");
    for &(key, value) in params {
        request = request.add_query_param(key, value);
    }
    let body: Value = request.await.json();
    body["messages"]
        .as_array()
        .unwrap()
        .iter()
        .filter_map(|message| message["text"].as_str().map(str::to_string))
        .collect()
}

#[tokio::test]
async fn test_history_inclusive_bounds() {
    let f = fixture();
    for (text, ts) in [("one", "1700000001"), ("two", "1700000002"), ("three", "1700000003")] {
        f.state
            .store()
            .post_message(&NewMessage::new("C1", "U1", Some(text.into())), ts)
            .unwrap();
    }
    let bounds = [("oldest", "1700000001"), ("latest", "1700000003")];

    assert_eq!(history_texts(&f, &bounds).await, ["two"]);

    let inclusive = [bounds[0], bounds[1], ("inclusive", "1")];
    assert_eq!(history_texts(&f, &inclusive).await, ["three", "two", "one"]);
}

#[tokio::test]
async fn test_history_rejects_out_of_range_bound_and_bad_cursor() {
    let f = fixture();
    f.state
        .store()
        .post_message(&NewMessage::new("C1", "U1", Some("now".into())), "1700000000.000000")
        .unwrap();

    let response = f
        .server
        .get("/api/conversations.history")
        .authorization_bearer(TOKEN)
        .add_query_param("channel", "C1")
        .add_query_param("oldest", "10000000000")
        .await;
    assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
    assert_eq!(response.json::<Value>()["error"], "invalid_ts_oldest");

    let response = f
        .server
        .get("/api/conversations.history")
        .authorization_bearer(TOKEN)
        .add_query_param("channel", "C1")
        .add_query_param("cursor", "not-a-cursor")
        .await;
    assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
    assert_eq!(response.json::<Value>()["error"], "invalid_arguments");
}

#[tokio::test]
async fn test_cors_allows_any_origin() {
    let f = fixture();
    let response = f
        .server
        .get("/api/test")
        .add_header(ORIGIN, HeaderValue::from_static("https://client.example"))
        .await;
    assert_eq!(response.status_code(), StatusCode::OK);
    assert_eq!(response.header(ACCESS_CONTROL_ALLOW_ORIGIN), "*");
}

#[tokio::test]
async fn test_create_join_leave_members() {
    let f = fixture();

    let created: Value = f
        .server
        .post("/api/conversations.create")
        .authorization_bearer(TOKEN)
        .json(&json!({"name": "Random", "is_private": false}))
        .await
        .json();
    assert_eq!(created["ok"], true);
    assert_eq!(created["channel"]["name"], "random");
    let channel = created["channel"]["id"].as_str().unwrap().to_string();

    let taken = f
        .server
        .post("/api/conversations.create")
        .authorization_bearer(TOKEN)
        .json(&json!({"name": "random"}))
        .await;
    assert_eq!(taken.status_code(), StatusCode::BAD_REQUEST);
    assert_eq!(taken.json::<Value>()["error"], "name_taken");

    let invalid = f
        .server
        .post("/api/conversations.create")
        .authorization_bearer(TOKEN)
        .json(&json!({"name": "no spaces allowed"}))
        .await;
    assert_eq!(invalid.json::<Value>()["error"], "invalid_name");

    let joined: Value = f
        .server
        .post("/api/conversations.join")
        .authorization_bearer(TOKEN)
        .json(&json!({"channel": channel, "user": "U2"}))
        .await
        .json();
    assert_eq!(joined["ok"], true);
    assert!(joined.get("warning").is_none());

    let again: Value = f
        .server
        .post("/api/conversations.join")
        .authorization_bearer(TOKEN)
        .json(&json!({"channel": channel, "user": "U2"}))
        .await
        .json();
    assert_eq!(again["warning"], "already_in_channel");

    let members: Value = f
        .server
        .get("/api/conversations.members")
        .authorization_bearer(TOKEN)
        .add_query_param("channel", &channel)
        .await
        .json();
    let ids: Vec<&str> = members["members"]
        .as_array()
        .unwrap()
        .iter()
        .filter_map(Value::as_str)
        .collect();
    assert!(ids.contains(&"U2"));
    assert!(ids.contains(&"USLACKBOT"));

    let left: Value = f
        .server
        .post("/api/conversations.leave")
        .authorization_bearer(TOKEN)
        .json(&json!({"channel": channel, "user": "U2"}))
        .await
        .json();
    assert_eq!(left, json!({"ok": true}));

    let not_in: Value = f
        .server
        .post("/api/conversations.leave")
        .authorization_bearer(TOKEN)
        .json(&json!({"channel": channel, "user": "U2"}))
        .await
        .json();
    assert_eq!(not_in["not_in_channel"], true);
}

// ============================================================================
// chat.* and reactions.*
// ============================================================================

#[tokio::test]
async fn test_post_defaults_to_bot_user() {
    let f = fixture();
    let body: Value = f
        .server
        .post("/api/chat.postMessage")
        .authorization_bearer(TOKEN)
        .form(&[("channel", "C1"), ("text", "beep")])
        .await
        .json();
    assert_eq!(body["ok"], true);
    assert_eq!(body["message"]["user"], "USLACKBOT");
    assert!(f.state.store().user("USLACKBOT").unwrap().is_some());
}

#[tokio::test]
async fn test_form_encoded_thread_reply() {
    let f = fixture();
    let parent: Value = f
        .server
        .post("/api/chat.postMessage")
        .authorization_bearer(TOKEN)
        .form(&[("channel", "C1"), ("user", "U1"), ("text", "question")])
        .await
        .json();
    let parent_ts = parent["ts"].as_str().unwrap().to_string();

    let reply: Value = f
        .server
        .post("/api/chat.postMessage")
        .authorization_bearer(TOKEN)
        .form(&[
            ("channel", "C1"),
            ("user", "U2"),
            ("text", "answer"),
            ("thread_ts", parent_ts.as_str()),
        ])
        .await
        .json();
    assert_eq!(reply["ok"], true);
    assert_eq!(reply["message"]["user"], "U2");
    assert_eq!(reply["message"]["thread_ts"], parent_ts.as_str());
}

#[tokio::test]
async fn test_deleting_thread_parent_removes_replies() {
    let f = fixture();
    let parent: Value = f
        .server
        .post("/api/chat.postMessage")
        .authorization_bearer(TOKEN)
        .json(&json!({"channel": "C1", "user": "U1", "text": "root"}))
        .await
        .json();
    let parent_ts = parent["ts"].as_str().unwrap().to_string();
    f.server
        .post("/api/chat.postMessage")
        .authorization_bearer(TOKEN)
        .json(&json!({"channel": "C1", "user": "U2", "text": "reply", "thread_ts": parent_ts}))
        .await;

    f.server
        .post("/api/chat.delete")
        .authorization_bearer(TOKEN)
        .json(&json!({"channel": "C1", "ts": parent_ts}))
        .await;

    assert_eq!(f.state.store().counts().unwrap().messages, 0);
    let replies = f
        .server
        .get("/api/conversations.replies")
        .authorization_bearer(TOKEN)
        .add_query_param("channel", "C1")
        .add_query_param("ts", &parent_ts)
        .await;
    assert_eq!(replies.json::<Value>()["error"], "thread_not_found");
}

#[tokio::test]
async fn test_post_to_unknown_channel() {
    let f = fixture();
    let response = f
        .server
        .post("/api/chat.postMessage")
        .authorization_bearer(TOKEN)
        .json(&json!({"channel": "C404", "text": "hello?"}))
        .await;
    assert_eq!(response.status_code(), StatusCode::NOT_FOUND);
    assert_eq!(response.json::<Value>()["error"], "channel_not_found");
}

#[tokio::test]
async fn test_update_and_delete() {
    let f = fixture();
    let posted: Value = f
        .server
        .post("/api/chat.postMessage")
        .authorization_bearer(TOKEN)
        .json(&json!({"channel": "C1", "user": "U1", "text": "tpyo"}))
        .await
        .json();
    let ts = posted["ts"].as_str().unwrap().to_string();

    let updated: Value = f
        .server
        .post("/api/chat.update")
        .authorization_bearer(TOKEN)
        .json(&json!({"channel": "C1", "ts": ts, "text": "typo"}))
        .await
        .json();
    assert_eq!(updated["text"], "typo");

    let missing = f
        .server
        .post("/api/chat.update")
        .authorization_bearer(TOKEN)
        .json(&json!({"channel": "C1"}))
        .await;
    assert_eq!(missing.status_code(), StatusCode::BAD_REQUEST);
    assert_eq!(missing.json::<Value>()["error"], "missing_parameter");

    let deleted: Value = f
        .server
        .post("/api/chat.delete")
        .authorization_bearer(TOKEN)
        .json(&json!({"channel": "C1", "ts": ts}))
        .await
        .json();
    assert_eq!(deleted["ts"], ts.as_str());

    let gone = f
        .server
        .post("/api/chat.delete")
        .authorization_bearer(TOKEN)
        .json(&json!({"channel": "C1", "ts": ts}))
        .await;
    assert_eq!(gone.status_code(), StatusCode::NOT_FOUND);
    assert_eq!(gone.json::<Value>()["error"], "message_not_found");
}

#[tokio::test]
async fn test_reaction_errors() {
    let f = fixture();
    let posted: Value = f
        .server
        .post("/api/chat.postMessage")
        .authorization_bearer(TOKEN)
        .json(&json!({"channel": "C1", "user": "U1", "text": "react to me"}))
        .await
        .json();
    let ts = posted["ts"].as_str().unwrap().to_string();
    let args = json!({"channel": "C1", "timestamp": ts, "name": "tada", "user": "U1"});

    let missing = f
        .server
        .post("/api/reactions.add")
        .authorization_bearer(TOKEN)
        .json(&json!({"channel": "C1"}))
        .await;
    assert_eq!(missing.json::<Value>()["error"], "missing_parameter");

    let added = f
        .server
        .post("/api/reactions.add")
        .authorization_bearer(TOKEN)
        .json(&args)
        .await;
    assert_eq!(added.json::<Value>(), json!({"ok": true}));

    let twice = f
        .server
        .post("/api/reactions.add")
        .authorization_bearer(TOKEN)
        .json(&args)
        .await;
    assert_eq!(twice.status_code(), StatusCode::BAD_REQUEST);
    assert_eq!(twice.json::<Value>()["error"], "already_reacted");

    f.server
        .post("/api/reactions.remove")
        .authorization_bearer(TOKEN)
        .json(&args)
        .await;
    let none = f
        .server
        .post("/api/reactions.remove")
        .authorization_bearer(TOKEN)
        .json(&args)
        .await;
    assert_eq!(none.status_code(), StatusCode::NOT_FOUND);
    assert_eq!(none.json::<Value>()["error"], "no_reaction");

    let unknown = f
        .server
        .post("/api/reactions.add")
        .authorization_bearer(TOKEN)
        .json(&json!({"channel": "C1", "timestamp": "1.000001", "name": "tada"}))
        .await;
    assert_eq!(unknown.status_code(), StatusCode::NOT_FOUND);
    assert_eq!(unknown.json::<Value>()["error"], "message_not_found");
}

// ============================================================================
// users.*, team.info, auth.test
// ============================================================================

#[tokio::test]
async fn test_users_list_and_info() {
    let f = fixture();

    let list: Value = f
        .server
        .get("/api/users.list")
        .authorization_bearer(TOKEN)
        .await
        .json();
    assert_eq!(list["members"].as_array().unwrap().len(), 2);
    assert!(list["cache_ts"].as_i64().unwrap() > 0);

    let info: Value = f
        .server
        .get("/api/users.info")
        .authorization_bearer(TOKEN)
        .add_query_param("user", "U1")
        .await
        .json();
    assert_eq!(info["user"]["real_name"], "Alice Smith");

    let missing = f
        .server
        .get("/api/users.info")
        .authorization_bearer(TOKEN)
        .await;
    assert_eq!(missing.status_code(), StatusCode::BAD_REQUEST);
    assert_eq!(missing.json::<Value>()["error"], "user_not_found");

    let unknown = f
        .server
        .get("/api/users.info")
        .authorization_bearer(TOKEN)
        .add_query_param("user", "U404")
        .await;
    assert_eq!(unknown.status_code(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_team_info_and_auth_test() {
    let f = fixture();

    let team: Value = f
        .server
        .get("/api/team.info")
        .authorization_bearer(TOKEN)
        .await
        .json();
    assert_eq!(team["team"]["id"], "T1");
    assert_eq!(team["team"]["name"], "Acme Inc");

    let auth: Value = f
        .server
        .post("/api/auth.test")
        .authorization_bearer(TOKEN)
        .await
        .json();
    assert_eq!(auth["ok"], true);
    assert_eq!(auth["team_id"], "T1");
    assert_eq!(auth["user_id"], "U1");
    assert_eq!(auth["url"], "https://myteam.slack.com/");
}
