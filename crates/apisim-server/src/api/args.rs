//! Web API argument extraction.
//!
//! Slack clients send method arguments as query parameters, as a JSON body or
//! as a form body. [`SlackArgs`] merges all of them into one object (query
//! parameters win) and deserializes the result. Because query and form values
//! are always strings, argument structs use the lenient helpers in this module
//! for numbers and flags.

use axum::body::Bytes;
use axum::extract::{FromRequest, Query, Request};
use axum::http::header::CONTENT_TYPE;
use axum::Form;
use serde::de::{DeserializeOwned, Error as _};
use serde::{Deserialize, Deserializer};
use serde_json::{Map, Value};

use crate::api::error::ApiError;

/// Merged and deserialized Web API arguments.
#[derive(Debug, Clone)]
pub struct SlackArgs<T>(pub T);

impl<S, T> FromRequest<S> for SlackArgs<T>
where
    S: Send + Sync,
    T: DeserializeOwned,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Query(query) = Query::<Vec<(String, String)>>::try_from_uri(req.uri())
            .map_err(|rejection| ApiError::invalid_request(rejection.body_text()))?;
        let content_type = req
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .unwrap_or_default()
            .to_ascii_lowercase();

        let mut args = if content_type.starts_with("application/json") {
            json_body(req, state).await?
        } else if content_type.starts_with("application/x-www-form-urlencoded") {
            let Form(pairs) = Form::<Vec<(String, String)>>::from_request(req, state)
                .await
                .map_err(|rejection| ApiError::invalid_request(rejection.body_text()))?;
            strings_to_map(pairs)
        } else {
            Map::new()
        };
        args.extend(strings_to_map(query));

        serde_json::from_value(Value::Object(args))
            .map(SlackArgs)
            .map_err(|err| ApiError::bad_request("invalid_arguments", err.to_string()))
    }
}

async fn json_body<S: Send + Sync>(req: Request, state: &S) -> Result<Map<String, Value>, ApiError> {
    let bytes = Bytes::from_request(req, state)
        .await
        .map_err(|rejection| ApiError::invalid_request(rejection.body_text()))?;
    if bytes.iter().all(u8::is_ascii_whitespace) {
        return Ok(Map::new());
    }
    match serde_json::from_slice::<Value>(&bytes) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(_) => Err(ApiError::invalid_request("JSON body must be an object")),
        Err(err) => Err(ApiError::invalid_request(format!("Invalid JSON body: {err}"))),
    }
}

fn strings_to_map(pairs: Vec<(String, String)>) -> Map<String, Value> {
    pairs
        .into_iter()
        .map(|(key, value)| (key, Value::String(value)))
        .collect()
}

// ============================================================================
// Lenient field deserializers
// ============================================================================

#[derive(Deserialize)]
#[serde(untagged)]
enum Scalar {
    Bool(bool),
    Int(u64),
    Float(f64),
    Str(String),
}

/// Optional unsigned integer given as a number or a numeric string.
///
/// # Errors
///
/// Fails for anything that is not a non-negative integer.
pub fn opt_u64<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<u64>, D::Error> {
    match Option::<Scalar>::deserialize(deserializer)? {
        None => Ok(None),
        Some(Scalar::Int(n)) => Ok(Some(n)),
        Some(Scalar::Str(s)) if s.trim().is_empty() => Ok(None),
        Some(Scalar::Str(s)) => s
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| D::Error::custom(format!("expected an integer, got '{s}'"))),
        Some(Scalar::Bool(_) | Scalar::Float(_)) => Err(D::Error::custom("expected an integer")),
    }
}

/// Boolean flag: `true`, `1` and `yes` (any case) are true; absent is false.
///
/// # Errors
///
/// Never fails for scalar input.
pub fn flag<'de, D: Deserializer<'de>>(deserializer: D) -> Result<bool, D::Error> {
    Ok(match Option::<Scalar>::deserialize(deserializer)? {
        None => false,
        Some(Scalar::Bool(b)) => b,
        Some(Scalar::Int(n)) => n != 0,
        Some(Scalar::Float(f)) => f != 0.0,
        Some(Scalar::Str(s)) => matches!(s.trim().to_ascii_lowercase().as_str(), "true" | "1" | "yes"),
    })
}

/// Optional string; numbers are stringified and empty strings are absent.
///
/// # Errors
///
/// Never fails for scalar input.
pub fn opt_string<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<String>, D::Error> {
    Ok(match Option::<Scalar>::deserialize(deserializer)? {
        None => None,
        Some(Scalar::Str(s)) if s.is_empty() => None,
        Some(Scalar::Str(s)) => Some(s),
        Some(Scalar::Int(n)) => Some(n.to_string()),
        Some(Scalar::Float(f)) => Some(f.to_string()),
        Some(Scalar::Bool(b)) => Some(b.to_string()),
    })
}

/// Optional string that keeps empty values, for arguments where `""` means
/// something different from absence.
///
/// # Errors
///
/// Never fails for scalar input.
pub fn opt_string_keep_empty<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Option<String>, D::Error> {
    Ok(match Option::<Scalar>::deserialize(deserializer)? {
        None => None,
        Some(Scalar::Str(s)) => Some(s),
        Some(Scalar::Int(n)) => Some(n.to_string()),
        Some(Scalar::Float(f)) => Some(f.to_string()),
        Some(Scalar::Bool(b)) => Some(b.to_string()),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[derive(Debug, Deserialize)]
    struct Probe {
        #[serde(default, deserialize_with = "opt_string")]
        channel: Option<String>,
        #[serde(default, deserialize_with = "opt_u64")]
        limit: Option<u64>,
        #[serde(default, deserialize_with = "flag")]
        inclusive: bool,
    }

    #[test]
    fn test_lenient_values_from_strings() {
        let probe: Probe =
            serde_json::from_value(json!({"channel": "C1", "limit": "20", "inclusive": "TRUE"})).unwrap();
        assert_eq!(probe.channel.as_deref(), Some("C1"));
        assert_eq!(probe.limit, Some(20));
        assert!(probe.inclusive);
    }

    #[test]
    fn test_lenient_values_from_json_types() {
        let probe: Probe = serde_json::from_value(json!({"channel": 42, "limit": 5, "inclusive": 1})).unwrap();
        assert_eq!(probe.channel.as_deref(), Some("42"));
        assert_eq!(probe.limit, Some(5));
        assert!(probe.inclusive);
    }

    #[test]
    fn test_missing_and_empty_values() {
        let probe: Probe = serde_json::from_value(json!({"channel": "", "limit": ""})).unwrap();
        assert!(probe.channel.is_none());
        assert!(probe.limit.is_none());
        assert!(!probe.inclusive);
    }

    #[test]
    fn test_empty_string_kept_when_meaningful() {
        #[derive(Debug, Deserialize)]
        struct Types {
            #[serde(default, deserialize_with = "opt_string_keep_empty")]
            types: Option<String>,
        }

        let empty: Types = serde_json::from_value(json!({"types": ""})).unwrap();
        assert_eq!(empty.types.as_deref(), Some(""));
        let absent: Types = serde_json::from_value(json!({})).unwrap();
        assert!(absent.types.is_none());
    }

    #[test]
    fn test_non_numeric_limit_is_rejected() {
        let err = serde_json::from_value::<Probe>(json!({"limit": "lots"})).unwrap_err();
        assert!(err.to_string().contains("expected an integer"));
    }
}
