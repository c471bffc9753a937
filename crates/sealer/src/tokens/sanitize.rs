//! [`TokenSanitizer`]: removes denylisted fields from a token bundle.

use serde_json::{Map, Value};
use tracing::debug;

/// Fields stripped by default: one-time OAuth values that must never be persisted.
pub const DEFAULT_DENYLIST: &[&str] = &["code", "code_verifier", "state"];

/// Segments of a dot-notation field path.
#[derive(Debug, Clone, PartialEq, Eq)]
enum PathSegment {
    /// Navigate into an object property by name.
    Key(String),
    /// Expand into every element of a JSON array.
    ArrayItem,
}

/// Parse a dot-notation path into a list of [`PathSegment`]s.
///
/// Array fields use the `[]` suffix before the dot separator, e.g.
/// `"accounts[].code"` → `[Key("accounts"), ArrayItem, Key("code")]`.
fn parse_path(path: &str) -> Vec<PathSegment> {
    let mut segments = Vec::new();
    for part in path.split('.') {
        if let Some(key) = part.strip_suffix("[]") {
            segments.push(PathSegment::Key(key.to_owned()));
            segments.push(PathSegment::ArrayItem);
        } else {
            segments.push(PathSegment::Key(part.to_owned()));
        }
    }
    segments
}

/// Remove the field at the end of `segments` from `value`. Returns how many
/// fields were removed.
fn remove_at_path(value: &mut Value, segments: &[PathSegment]) -> usize {
    match segments {
        [] => 0,
        [PathSegment::Key(key)] => match value {
            Value::Object(map) => usize::from(map.remove(key).is_some()),
            _ => 0,
        },
        [PathSegment::Key(key), rest @ ..] => match value {
            Value::Object(map) => map
                .get_mut(key)
                .map_or(0, |child| remove_at_path(child, rest)),
            _ => 0,
        },
        [PathSegment::ArrayItem, rest @ ..] => match value {
            Value::Array(items) => items
                .iter_mut()
                .map(|item| remove_at_path(item, rest))
                .sum(),
            _ => 0,
        },
    }
}

/// A denylist of field paths that are removed before a bundle is encrypted.
///
/// Paths are dot-notation (`authorization.code`); `[]` after a name expands
/// into every array element (`accounts[].code`). A path that does not match
/// anything is a no-op.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenSanitizer {
    paths: Vec<Vec<PathSegment>>,
}

impl TokenSanitizer {
    /// Sanitizer with a custom denylist. Blank paths are ignored.
    pub fn new<I, S>(paths: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let paths = paths
            .into_iter()
            .filter(|p| !p.as_ref().trim().is_empty())
            .map(|p| parse_path(p.as_ref().trim()))
            .collect();
        Self { paths }
    }

    /// Extend the denylist with one more path.
    pub fn with_path(mut self, path: &str) -> Self {
        if !path.trim().is_empty() {
            self.paths.push(parse_path(path.trim()));
        }
        self
    }

    /// Strip every denylisted field from `bundle`. Returns the number removed.
    pub fn sanitize(&self, bundle: &mut Map<String, Value>) -> usize {
        // Walk the map as a Value so nested and array paths share one traversal.
        let mut root = Value::Object(std::mem::take(bundle));
        let removed = self
            .paths
            .iter()
            .map(|segments| remove_at_path(&mut root, segments))
            .sum();
        if let Value::Object(map) = root {
            *bundle = map;
        }
        if removed > 0 {
            debug!(removed, "stripped denylisted token fields");
        }
        removed
    }
}

impl Default for TokenSanitizer {
    fn default() -> Self {
        Self::new(DEFAULT_DENYLIST)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn object(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            other => panic!("expected object, got {other}"),
        }
    }

    #[test]
    fn parse_path_flat() {
        assert_eq!(parse_path("code"), vec![PathSegment::Key("code".into())]);
    }

    #[test]
    fn parse_path_nested() {
        assert_eq!(parse_path("authorization.grant.code").len(), 3);
    }

    #[test]
    fn parse_path_array() {
        let segs = parse_path("accounts[].code");
        assert_eq!(segs.len(), 3);
        assert_eq!(segs[1], PathSegment::ArrayItem);
    }

    #[test]
    fn default_strips_one_time_fields() {
        let mut bundle = object(json!({
            "access_token": "a",
            "refresh_token": "r",
            "code": "one-time",
            "code_verifier": "pkce",
            "state": "xyz",
        }));
        assert_eq!(TokenSanitizer::default().sanitize(&mut bundle), 3);
        assert_eq!(bundle.len(), 2);
        assert!(bundle.contains_key("access_token"));
        assert!(bundle.contains_key("refresh_token"));
    }

    #[test]
    fn nested_and_array_paths() {
        let sanitizer = TokenSanitizer::new(["authorization.code", "accounts[].code"]);
        let mut bundle = object(json!({
            "authorization": {"code": "x", "scope": "mail"},
            "accounts": [{"code": "a", "id": 1}, {"id": 2}, "not-an-object"],
            "code": "top-level stays with this denylist",
        }));
        assert_eq!(sanitizer.sanitize(&mut bundle), 2);
        assert_eq!(bundle["authorization"], json!({"scope": "mail"}));
        assert_eq!(bundle["accounts"][0], json!({"id": 1}));
        assert!(bundle.contains_key("code"));
    }

    #[test]
    fn missing_field_is_noop() {
        let mut bundle = object(json!({"access_token": "a"}));
        assert_eq!(TokenSanitizer::default().sanitize(&mut bundle), 0);
        assert_eq!(bundle["access_token"], "a");
    }

    #[test]
    fn with_path_extends_denylist_and_ignores_blanks() {
        let sanitizer = TokenSanitizer::default().with_path("id_token").with_path("  ");
        let mut bundle = object(json!({"id_token": "jwt", "access_token": "a"}));
        assert_eq!(sanitizer.sanitize(&mut bundle), 1);
        assert!(!bundle.contains_key("id_token"));
    }
}
