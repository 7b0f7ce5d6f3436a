//! OpenAPI document loading and analysis.
//!
//! The analysis is a flat summary of the document handed to the agent: API
//! info, the base URL, one [`Entity`] per object schema, one [`Endpoint`] per
//! operation, and the [`Relationship`]s implied by `$ref`s between entities.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::debug;

use crate::error::{GenError, Result};
use crate::naming::table_name;

const HTTP_METHODS: [&str; 5] = ["get", "post", "put", "patch", "delete"];
const SCHEMA_REF_PREFIX: &str = "#/components/schemas/";

/// An object schema from `components.schemas`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entity {
    /// Schema name.
    pub name: String,
    /// Raw `properties` object.
    pub properties: Map<String, Value>,
    /// Required property names.
    pub required: Vec<String>,
    /// Table the entity is stored in.
    pub table_name: String,
}

/// One operation under `paths`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Endpoint {
    /// Path template, e.g. `/chat.postMessage`.
    pub path: String,
    /// Upper-case HTTP method.
    pub method: String,
    /// Operation summary, empty when absent.
    pub summary: String,
    /// `operationId`, or `{method}_{path}` with `/` replaced by `_`.
    pub operation_id: String,
    /// Raw `requestBody`.
    pub request_body: Option<Value>,
    /// Raw `responses` object.
    pub responses: Value,
    /// Raw `parameters` list.
    pub parameters: Vec<Value>,
}

/// How one entity refers to another.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RelationshipKind {
    /// A property holding a single `$ref`.
    Reference,
    /// An array property whose items are a `$ref`.
    Collection,
}

/// A property of one entity pointing at another entity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Relationship {
    /// Entity owning the property.
    pub from: String,
    /// Property name.
    pub property: String,
    /// Referenced entity.
    pub to: String,
    /// Single reference or collection.
    pub kind: RelationshipKind,
}

/// Summary of an OpenAPI document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Analysis {
    /// The document's `info` object.
    pub api_info: Value,
    /// `servers[0].url`, or empty.
    pub base_url: String,
    /// Object schemas.
    pub entities: Vec<Entity>,
    /// Operations in document order.
    pub endpoints: Vec<Endpoint>,
    /// Entity-to-entity references.
    pub relationships: Vec<Relationship>,
}

/// Read a YAML (`.yaml`/`.yml`) or JSON OpenAPI document.
///
/// # Errors
///
/// Returns [`GenError::SpecNotFound`] when the file does not exist, or a read
/// or parse error.
pub fn load_spec(path: &Path) -> Result<Value> {
    if !path.exists() {
        return Err(GenError::SpecNotFound(path.to_path_buf()));
    }
    let text = fs::read_to_string(path).map_err(|source| GenError::Read {
        path: path.to_path_buf(),
        source,
    })?;

    let is_yaml = path
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("yaml") || ext.eq_ignore_ascii_case("yml"));

    let spec = if is_yaml {
        yaml_to_json(serde_yaml::from_str(&text)?)
    } else {
        serde_json::from_str(&text)?
    };

    if !spec.is_object() {
        return Err(GenError::InvalidSpec("top level must be an object".into()));
    }
    Ok(spec)
}

/// Convert YAML to JSON. Non-string mapping keys (such as `200:` response
/// codes) become strings.
fn yaml_to_json(value: serde_yaml::Value) -> Value {
    use serde_yaml::Value as Yaml;

    match value {
        Yaml::Null => Value::Null,
        Yaml::Bool(b) => Value::Bool(b),
        Yaml::Number(n) => {
            if let Some(i) = n.as_i64() {
                Value::from(i)
            } else if let Some(u) = n.as_u64() {
                Value::from(u)
            } else {
                n.as_f64()
                    .and_then(serde_json::Number::from_f64)
                    .map_or(Value::Null, Value::Number)
            }
        }
        Yaml::String(s) => Value::String(s),
        Yaml::Sequence(items) => Value::Array(items.into_iter().map(yaml_to_json).collect()),
        Yaml::Mapping(mapping) => Value::Object(
            mapping
                .into_iter()
                .map(|(key, value)| (yaml_key(key), yaml_to_json(value)))
                .collect(),
        ),
        Yaml::Tagged(tagged) => yaml_to_json(tagged.value),
    }
}

fn yaml_key(key: serde_yaml::Value) -> String {
    match key {
        serde_yaml::Value::String(s) => s,
        serde_yaml::Value::Null => "null".to_string(),
        other => match yaml_to_json(other) {
            Value::String(s) => s,
            json => json.to_string(),
        },
    }
}

impl Analysis {
    /// Analyze a parsed OpenAPI document.
    #[must_use]
    pub fn from_spec(spec: &Value) -> Self {
        let entities = extract_entities(spec);
        let relationships = extract_relationships(&entities);
        let analysis = Self {
            api_info: spec.get("info").cloned().unwrap_or_else(|| Value::Object(Map::new())),
            base_url: spec
                .pointer("/servers/0/url")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string(),
            entities,
            endpoints: extract_endpoints(spec),
            relationships,
        };
        debug!(
            entities = analysis.entities.len(),
            endpoints = analysis.endpoints.len(),
            relationships = analysis.relationships.len(),
            "Analyzed OpenAPI document"
        );
        analysis
    }

    /// Load and analyze a document in one step.
    ///
    /// # Errors
    ///
    /// See [`load_spec`].
    pub fn from_path(path: &Path) -> Result<Self> {
        Ok(Self::from_spec(&load_spec(path)?))
    }

    /// `info.title`, or `"API Simulation"`.
    #[must_use]
    pub fn title(&self) -> &str {
        self.api_info
            .get("title")
            .and_then(Value::as_str)
            .unwrap_or("API Simulation")
    }

    /// `info.description`, or `"Generated API simulation"`.
    #[must_use]
    pub fn description(&self) -> &str {
        self.api_info
            .get("description")
            .and_then(Value::as_str)
            .unwrap_or("Generated API simulation")
    }
}

fn extract_entities(spec: &Value) -> Vec<Entity> {
    let Some(schemas) = spec.pointer("/components/schemas").and_then(Value::as_object) else {
        return Vec::new();
    };

    schemas
        .iter()
        .filter(|(_, schema)| {
            schema.get("type").and_then(Value::as_str) == Some("object")
                || schema.get("properties").is_some()
        })
        .map(|(name, schema)| Entity {
            name: name.clone(),
            properties: schema
                .get("properties")
                .and_then(Value::as_object)
                .cloned()
                .unwrap_or_default(),
            required: schema
                .get("required")
                .and_then(Value::as_array)
                .map(|names| {
                    names
                        .iter()
                        .filter_map(Value::as_str)
                        .map(str::to_string)
                        .collect()
                })
                .unwrap_or_default(),
            table_name: table_name(name),
        })
        .collect()
}

fn extract_endpoints(spec: &Value) -> Vec<Endpoint> {
    let Some(paths) = spec.get("paths").and_then(Value::as_object) else {
        return Vec::new();
    };

    let mut endpoints = Vec::new();
    for (path, item) in paths {
        let Some(operations) = item.as_object() else {
            continue;
        };
        for (method, operation) in operations {
            if !HTTP_METHODS.contains(&method.to_lowercase().as_str()) {
                continue;
            }
            endpoints.push(Endpoint {
                path: path.clone(),
                method: method.to_uppercase(),
                summary: operation
                    .get("summary")
                    .and_then(Value::as_str)
                    .unwrap_or_default()
                    .to_string(),
                operation_id: operation
                    .get("operationId")
                    .and_then(Value::as_str)
                    .map_or_else(|| format!("{method}_{path}").replace('/', "_"), str::to_string),
                request_body: operation.get("requestBody").cloned(),
                responses: operation
                    .get("responses")
                    .cloned()
                    .unwrap_or_else(|| Value::Object(Map::new())),
                parameters: operation
                    .get("parameters")
                    .and_then(Value::as_array)
                    .cloned()
                    .unwrap_or_default(),
            });
        }
    }
    endpoints
}

/// Entity named by a `#/components/schemas/<Name>` reference.
fn referenced_schema(value: &Value) -> Option<&str> {
    value.get("$ref")?.as_str()?.strip_prefix(SCHEMA_REF_PREFIX)
}

fn extract_relationships(entities: &[Entity]) -> Vec<Relationship> {
    let is_entity = |name: &str| entities.iter().any(|e| e.name == name);

    let mut relationships = Vec::new();
    for entity in entities {
        for (property, schema) in &entity.properties {
            let target = referenced_schema(schema)
                .map(|to| (to, RelationshipKind::Reference))
                .or_else(|| {
                    schema
                        .get("items")
                        .and_then(referenced_schema)
                        .map(|to| (to, RelationshipKind::Collection))
                });
            if let Some((to, kind)) = target.filter(|(to, _)| is_entity(to)) {
                relationships.push(Relationship {
                    from: entity.name.clone(),
                    property: property.clone(),
                    to: to.to_string(),
                    kind,
                });
            }
        }
    }
    relationships
}
