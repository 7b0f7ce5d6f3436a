//! Prompts handed to the coding agent and the generated README.

use serde_json::Value;

use crate::analysis::Analysis;
use crate::error::Result;

/// Prompt for the `data/` layer: models, database setup and sample data.
///
/// # Errors
///
/// Returns an error if the entities cannot be serialized.
pub fn database_schema_prompt(analysis: &Analysis) -> Result<String> {
    let entities = serde_json::to_string_pretty(&analysis.entities)?;
    let relationships = serde_json::to_string_pretty(&analysis.relationships)?;

    Ok(format!(
        "Create the SQLite persistence layer for a simulator of this API.

Entities:
{entities}

Relationships between entities:
{relationships}

Put everything under data/:
- one model per entity, using the given table names
- primary keys, foreign keys and indexes for the relationships above
- created_at and updated_at timestamps on every table
- database setup and connection handling, storing the database in data/database.db
- functions that fill an empty database with realistic sample data

Messaging APIs should support channel membership, messages owned by channels and users,
reactions owned by messages and users, and threads of replies to a parent message.
List any third-party dependencies in the project's dependency manifest."
    ))
}

/// Prompt for the HTTP server implementing every endpoint.
///
/// # Errors
///
/// Returns an error if the endpoints cannot be serialized.
pub fn api_server_prompt(analysis: &Analysis) -> Result<String> {
    let api_info = serde_json::to_string_pretty(&analysis.api_info)?;
    let endpoints = serde_json::to_string_pretty(&analysis.endpoints)?;
    let base_url = if analysis.base_url.is_empty() {
        "/".to_string()
    } else {
        analysis.base_url.clone()
    };

    Ok(format!(
        "Create an HTTP server under server/ that implements every endpoint below with state
persisted through the data/ layer.

API info:
{api_info}

Base URL of the real service: {base_url}

Endpoints:
{endpoints}

Each endpoint validates its input against the documented parameters and request body,
performs the matching database operation, and answers with the documented response shape.
Simulate bearer token authentication, generate realistic ids and timestamps, return proper
error codes, allow cross-origin requests, log every operation, and paginate list endpoints
with a cursor. The server must initialize the database on startup."
    ))
}

/// Prompt for the endpoint and scenario test suites.
#[must_use]
pub fn test_suite_prompt(analysis: &Analysis) -> String {
    let operations = analysis
        .endpoints
        .iter()
        .map(|e| format!("- {} {} ({})", e.method, e.path, e.operation_id))
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        "Create a test suite for the simulator of {title}.

Operations to cover:
{operations}

Write endpoint tests (success paths, error cases, authentication, persistence across
requests, relationships between entities) and scenario tests (complete workflows,
multiple users interacting, threaded conversations, reactions). Every test starts from a
clean database.",
        title = analysis.title(),
    )
}

/// README for the generated project.
#[must_use]
pub fn readme(analysis: &Analysis, spec_file: &str) -> String {
    let title = analysis.title();
    let version = analysis
        .api_info
        .get("version")
        .and_then(Value::as_str)
        .map(|v| format!(" (version {v})"))
        .unwrap_or_default();

    format!(
        "# {title} Simulation

{description}

A stateful simulation of the {title}{version}. All state lives in SQLite at
`data/database.db`, so it survives restarts.

## Layout

- `data/` - models, database setup and sample data
- `server/` - HTTP server implementing {endpoints} endpoints
- `api/` - API helpers

The server listens on http://localhost:5000 by default.

## Testing

Run the endpoint and scenario suites with the project's test runner.

Generated from OpenAPI spec: `{spec_file}`
",
        description = analysis.description(),
        endpoints = analysis.endpoints.len(),
    )
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn analysis() -> Analysis {
        Analysis::from_spec(&json!({
            "info": {"title": "Slack Web API", "version": "1.2", "description": "Chat for teams"},
            "paths": {"/chat.postMessage": {"post": {"operationId": "chat_postMessage"}}},
            "components": {"schemas": {"ChannelMembership": {"type": "object"}}}
        }))
    }

    #[test]
    fn test_schema_prompt_embeds_entities() {
        let prompt = database_schema_prompt(&analysis()).unwrap();
        assert!(prompt.contains("\"table_name\": \"channel_memberships\""));
        assert!(prompt.contains("data/database.db"));
    }

    #[test]
    fn test_server_prompt_embeds_endpoints() {
        let prompt = api_server_prompt(&analysis()).unwrap();
        assert!(prompt.contains("\"operation_id\": \"chat_postMessage\""));
        assert!(prompt.contains("\"title\": \"Slack Web API\""));
        assert!(prompt.contains("Base URL of the real service: /"));
    }

    #[test]
    fn test_suite_prompt_lists_operations() {
        let prompt = test_suite_prompt(&analysis());
        assert!(prompt.contains("- POST /chat.postMessage (chat_postMessage)"));
    }

    #[test]
    fn test_readme() {
        let readme = readme(&analysis(), "slack.yaml");
        assert!(readme.starts_with("# Slack Web API Simulation\n\nChat for teams\n"));
        assert!(readme.contains("Slack Web API (version 1.2)"));
        assert!(readme.contains("implementing 1 endpoints"));
        assert!(readme.contains("`slack.yaml`"));
    }
}
