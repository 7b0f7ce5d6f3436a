//! Table names derived from schema names.

use once_cell::sync::Lazy;
use regex::Regex;

static WORD_START: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(.)([A-Z][a-z]+)").expect("valid word start regex"));
static LOWER_UPPER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"([a-z0-9])([A-Z])").expect("valid case boundary regex"));

/// `CamelCase` to `snake_case`, keeping acronyms together (`HTTPRequest` is
/// `http_request`).
#[must_use]
pub fn snake_case(name: &str) -> String {
    let spaced = WORD_START.replace_all(name, "${1}_${2}");
    LOWER_UPPER.replace_all(&spaced, "${1}_${2}").to_lowercase()
}

/// Naive English plural used for table names.
///
/// Words already ending in `s` are left alone.
#[must_use]
pub fn pluralize(word: &str) -> String {
    if word.ends_with('s') {
        word.to_string()
    } else if let Some(stem) = word.strip_suffix('y') {
        format!("{stem}ies")
    } else if word.ends_with(['x', 'z']) || word.ends_with("ch") || word.ends_with("sh") {
        format!("{word}es")
    } else {
        format!("{word}s")
    }
}

/// Database table name for a schema, e.g. `ChannelMembership` is
/// `channel_memberships`.
#[must_use]
pub fn table_name(schema_name: &str) -> String {
    pluralize(&snake_case(schema_name))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snake_case() {
        assert_eq!(snake_case("User"), "user");
        assert_eq!(snake_case("ChannelMembership"), "channel_membership");
        assert_eq!(snake_case("HTTPResponse"), "http_response");
        assert_eq!(snake_case("OAuth2Token"), "o_auth2_token");
        assert_eq!(snake_case("already_snake"), "already_snake");
    }

    #[test]
    fn test_table_names() {
        assert_eq!(table_name("User"), "users");
        assert_eq!(table_name("ChannelMembership"), "channel_memberships");
        assert_eq!(table_name("Reply"), "replies");
        assert_eq!(table_name("Status"), "status");
        assert_eq!(table_name("Box"), "boxes");
        assert_eq!(table_name("Search"), "searches");
        assert_eq!(table_name("Wish"), "wishes");
        assert_eq!(table_name("Quiz"), "quizes");
    }
}
