//! Structural path queries over data values
//!
//! Paths are dot-separated segments evaluated against an ordered list of
//! context values. Every segment maps the current match set to a new one:
//!
//! | Segment | Objects | Arrays |
//! |---|---|---|
//! | `name` | value of key `name` | element at index `name` if numeric |
//! | `#` | nothing | every element |
//! | `*` | every value | every element |
//! | `@` | every key | every index |
//!
//! ```
//! use asttpl::query::{PathQuery, QueryEvaluator};
//! use serde_json::json;
//!
//! let context = [json!({ "items": [{ "name": "a" }, { "name": "b" }] })];
//! let names = PathQuery.query("items.#.name", &context);
//! assert_eq!(names, vec![json!("a"), json!("b")]);
//! ```

use serde_json::Value;

/// Evaluates a path against context values, producing an ordered match list
pub trait QueryEvaluator {
    /// All matches, in order
    fn query(&self, path: &str, context: &[Value]) -> Vec<Value>;

    /// First match only
    fn first(&self, path: &str, context: &[Value]) -> Option<Value> {
        self.query(path, context).into_iter().next()
    }
}

/// Default dot-path evaluator
#[derive(Debug, Clone, Copy, Default)]
pub struct PathQuery;

impl QueryEvaluator for PathQuery {
    fn query(&self, path: &str, context: &[Value]) -> Vec<Value> {
        let mut matches: Vec<&Value> = context.iter().collect();
        let mut keys: Vec<Value> = Vec::new();

        for segment in path.split('.').filter(|s| !s.is_empty()) {
            // Keys are produced values, not borrowed from the context
            if !keys.is_empty() {
                return Vec::new();
            }
            if segment == "@" {
                keys = matches.iter().flat_map(|value| select_keys(value)).collect();
                matches.clear();
                continue;
            }
            matches = matches
                .into_iter()
                .flat_map(|value| select(value, segment))
                .collect();
        }

        if keys.is_empty() {
            matches.into_iter().cloned().collect()
        } else {
            keys
        }
    }
}

fn select<'v>(value: &'v Value, segment: &str) -> Vec<&'v Value> {
    match (segment, value) {
        ("#", Value::Array(items)) | ("*", Value::Array(items)) => items.iter().collect(),
        ("*", Value::Object(map)) => map.values().collect(),
        ("#", _) | ("*", _) => Vec::new(),
        (key, Value::Object(map)) => map.get(key).into_iter().collect(),
        (index, Value::Array(items)) => index
            .parse::<usize>()
            .ok()
            .and_then(|i| items.get(i))
            .into_iter()
            .collect(),
        _ => Vec::new(),
    }
}

fn select_keys(value: &Value) -> Vec<Value> {
    match value {
        Value::Object(map) => map.keys().map(|k| Value::String(k.clone())).collect(),
        Value::Array(items) => (0..items.len()).map(Value::from).collect(),
        _ => Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_plain_key() {
        let context = [json!({ "testProp": "testValue" })];
        assert_eq!(PathQuery.query("testProp", &context), vec![json!("testValue")]);
    }

    #[test]
    fn test_nested_path() {
        let context = [json!({ "a": { "b": { "c": 1 } } })];
        assert_eq!(PathQuery.first("a.b.c", &context), Some(json!(1)));
    }

    #[test]
    fn test_missing_key_yields_nothing() {
        let context = [json!({ "a": 1 })];
        assert!(PathQuery.query("b", &context).is_empty());
        assert!(PathQuery.query("a.b", &context).is_empty());
        assert_eq!(PathQuery.first("b", &[]), None);
    }

    #[test]
    fn test_hash_selects_array_elements() {
        let context = [json!({ "items": [1, 2, 3] })];
        assert_eq!(
            PathQuery.query("items.#", &context),
            vec![json!(1), json!(2), json!(3)]
        );
    }

    #[test]
    fn test_wildcard_selects_object_values() {
        let context = [json!({ "map": { "x": 1, "y": 2 } })];
        assert_eq!(PathQuery.query("map.*", &context), vec![json!(1), json!(2)]);
        assert!(PathQuery.query("map.#", &context).is_empty());
    }

    #[test]
    fn test_at_selects_keys() {
        let context = [json!({ "map": { "x": 1, "y": 2 }, "list": ["a", "b"] })];
        assert_eq!(PathQuery.query("map.@", &context), vec![json!("x"), json!("y")]);
        assert_eq!(PathQuery.query("list.@", &context), vec![json!(0), json!(1)]);
    }

    #[test]
    fn test_numeric_index() {
        let context = [json!({ "list": ["a", "b"] })];
        assert_eq!(PathQuery.first("list.1", &context), Some(json!("b")));
        assert_eq!(PathQuery.first("list.5", &context), None);
    }

    #[test]
    fn test_matches_concatenated_outer_first() {
        let context = [json!({ "name": "outer" }), json!({ "name": "inner" })];
        assert_eq!(
            PathQuery.query("name", &context),
            vec![json!("outer"), json!("inner")]
        );
    }

    #[test]
    fn test_empty_path_returns_context() {
        let context = [json!(1), json!(2)];
        assert_eq!(PathQuery.query("", &context), vec![json!(1), json!(2)]);
    }
}
