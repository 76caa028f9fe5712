//! Template resolution — substitute `{{ path.to.value }}` placeholders
//! against an execution context.
//!
//! `path` is a dot-separated sequence of keys; segments may contain hyphens
//! (node ids are UUID-free identifiers chosen by the workflow author and
//! routinely contain `-`). The first segment is either the literal
//! `trigger` or a node id; subsequent segments index into that node's
//! recorded output.
//!
//! Resolution never fails: a missing path resolves to the empty string.
//! This is deliberate — conditional expressions downstream depend on
//! missing values being falsy rather than on propagating an error.

use serde_json::Value;

/// Matches the first `{{ ... }}` occurrence in `s`, returning
/// `(full_match_byte_range, trimmed_inner_path)`.
fn find_placeholder(s: &str) -> Option<(std::ops::Range<usize>, &str)> {
    let start = s.find("{{")?;
    let rel_end = s[start + 2..].find("}}")?;
    let end = start + 2 + rel_end + 2;
    let inner = s[start + 2..start + 2 + rel_end].trim();
    Some((start..end, inner))
}

/// Walk `ctx` following `path` (dot-separated). Returns `None` the moment a
/// segment is missing or the current value isn't an indexable container.
fn lookup<'a>(ctx: &'a Value, path: &str) -> Option<&'a Value> {
    let mut current = ctx;
    for segment in path.split('.') {
        match current {
            Value::Object(map) => current = map.get(segment)?,
            Value::Array(arr) => {
                let idx: usize = segment.parse().ok()?;
                current = arr.get(idx)?;
            }
            _ => return None,
        }
    }
    Some(current)
}

/// Stringify a resolved value for substitution into a string template.
fn stringify(v: &Value) -> String {
    match v {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::Object(_) | Value::Array(_) => v.to_string(),
    }
}

/// Resolve a single dot-path directly, preserving the resolved value's
/// JSON type instead of stringifying it. Used by the transform node's
/// "jsonpath" mode (a bare path with no `{{…}}` markers and no other
/// literal text). Missing paths resolve to `Value::Null`.
pub fn resolve_path(path: &str, ctx: &Value) -> Value {
    lookup(ctx, path.trim()).cloned().unwrap_or(Value::Null)
}

/// True if `s` looks like a bare dot-path (an identifier, possibly
/// hyphenated, joined by dots) with no template braces and no other
/// literal text — the "jsonpath" mode of the transform node.
pub fn is_bare_path(s: &str) -> bool {
    let s = s.trim();
    !s.is_empty()
        && !s.contains("{{")
        && s.split('.').all(|seg| {
            !seg.is_empty() && seg.chars().all(|c| c.is_alphanumeric() || c == '_' || c == '-')
        })
}

/// Resolve every `{{ path }}` occurrence in `s` against `ctx`.
///
/// Once `s` contains no more `{{…}}` markers this is idempotent:
/// `resolve_str(&resolve_str(s, ctx), ctx) == resolve_str(s, ctx)`.
pub fn resolve_str(s: &str, ctx: &Value) -> String {
    let mut out = String::with_capacity(s.len());
    let mut rest = s;

    while let Some((range, path)) = find_placeholder(rest) {
        out.push_str(&rest[..range.start]);
        match lookup(ctx, path) {
            Some(value) => out.push_str(&stringify(value)),
            None => {} // empty string substitution
        }
        rest = &rest[range.end..];
    }
    out.push_str(rest);
    out
}

/// Recursively walk a JSON structure, resolving templates in every string,
/// leaving numbers/booleans/null unchanged, and recursing into arrays and
/// object values.
pub fn resolve_value(v: &Value, ctx: &Value) -> Value {
    match v {
        Value::String(s) => Value::String(resolve_str(s, ctx)),
        Value::Array(items) => Value::Array(items.iter().map(|i| resolve_value(i, ctx)).collect()),
        Value::Object(map) => Value::Object(
            map.iter()
                .map(|(k, val)| (k.clone(), resolve_value(val, ctx)))
                .collect(),
        ),
        other => other.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn ctx() -> Value {
        json!({
            "trigger": { "x": 42, "name": "ada" },
            "node-a": { "result": true, "nested": { "v": "deep" } },
        })
    }

    #[test]
    fn substitutes_number() {
        assert_eq!(resolve_str("val={{trigger.x}}", &ctx()), "val=42");
    }

    #[test]
    fn substitutes_string_verbatim() {
        assert_eq!(resolve_str("hi {{trigger.name}}", &ctx()), "hi ada");
    }

    #[test]
    fn trims_whitespace_inside_braces() {
        assert_eq!(resolve_str("{{  trigger.x  }}", &ctx()), "42");
    }

    #[test]
    fn missing_path_is_empty_string() {
        assert_eq!(resolve_str("[{{trigger.missing}}]", &ctx()), "[]");
    }

    #[test]
    fn indexing_through_null_is_empty_string() {
        assert_eq!(resolve_str("[{{trigger.x.deeper}}]", &ctx()), "[]");
    }

    #[test]
    fn hyphenated_node_id_segment() {
        assert_eq!(resolve_str("{{node-a.nested.v}}", &ctx()), "deep");
    }

    #[test]
    fn object_value_serialises_as_json() {
        let out = resolve_str("{{node-a.nested}}", &ctx());
        assert_eq!(out, r#"{"v":"deep"}"#);
    }

    #[test]
    fn resolve_value_recurses_into_arrays_and_objects() {
        let template = json!({ "greeting": "hi {{trigger.name}}", "items": ["{{trigger.x}}", 7, null] });
        let resolved = resolve_value(&template, &ctx());
        assert_eq!(resolved["greeting"], json!("hi ada"));
        assert_eq!(resolved["items"][0], json!("42"));
        assert_eq!(resolved["items"][1], json!(7));
        assert_eq!(resolved["items"][2], json!(null));
    }

    #[test]
    fn bare_path_detection() {
        assert!(is_bare_path("trigger.x"));
        assert!(is_bare_path("node-a.nested.v"));
        assert!(!is_bare_path("{{trigger.x}}"));
        assert!(!is_bare_path("prefix {{trigger.x}} suffix"));
        assert!(!is_bare_path("trigger.x == 1"));
    }

    #[test]
    fn resolve_path_preserves_type() {
        assert_eq!(resolve_path("trigger.x", &ctx()), json!(42));
        assert_eq!(resolve_path("node-a.result", &ctx()), json!(true));
        assert_eq!(resolve_path("trigger.missing", &ctx()), Value::Null);
    }

    #[test]
    fn fixed_point_once_literal() {
        let once = resolve_str("val={{trigger.x}}", &ctx());
        assert_eq!(resolve_str(&once, &ctx()), once);
    }
}
