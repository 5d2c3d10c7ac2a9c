//! Filter registry and pipeline

use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use heck::{ToKebabCase, ToLowerCamelCase, ToSnakeCase, ToUpperCamelCase};
use serde_json::Value;
use thiserror::Error;

use super::{BoxError, TemplateError};

/// A filter: one value in, one value out
pub type FilterFn = Rc<dyn Fn(Value) -> Result<Value, BoxError>>;

/// Errors raised by the built-in filters
#[derive(Debug, Error)]
pub enum BuiltinFilterError {
    #[error("expected a string, found {found}")]
    ExpectedString { found: &'static str },

    #[error("expected an array, found {found}")]
    ExpectedArray { found: &'static str },
}

/// Named filters available to directives
#[derive(Clone, Default)]
pub struct FilterRegistry {
    filters: HashMap<String, FilterFn>,
}

impl fmt::Debug for FilterRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FilterRegistry")
            .field("filters", &self.names())
            .finish()
    }
}

impl FilterRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry preloaded with the built-in filter library
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry.register_builtins();
        registry
    }

    /// Register a filter, replacing any filter of the same name
    pub fn register<F>(&mut self, name: impl Into<String>, filter: F)
    where
        F: Fn(Value) -> Result<Value, BoxError> + 'static,
    {
        self.filters.insert(name.into(), Rc::new(filter));
    }

    pub fn get(&self, name: &str) -> Option<&FilterFn> {
        self.filters.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.filters.contains_key(name)
    }

    /// Registered names, sorted
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.filters.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Add every filter of `other`, overriding existing names
    pub fn extend(&mut self, other: FilterRegistry) {
        self.filters.extend(other.filters);
    }

    /// Fold `value` through the named filters, left to right
    pub fn apply(&self, names: &[String], value: Value) -> Result<Value, TemplateError> {
        names.iter().try_fold(value, |value, name| {
            let filter = self
                .filters
                .get(name)
                .ok_or_else(|| TemplateError::BadFilter { name: name.clone() })?;
            tracing::trace!(filter = %name, "applying filter");
            filter(value).map_err(|source| TemplateError::FilterFailed {
                name: name.clone(),
                source,
            })
        })
    }

    fn register_builtins(&mut self) {
        self.register("upper", string_filter(|s| s.to_uppercase()));
        self.register("lower", string_filter(|s| s.to_lowercase()));
        self.register("firstToUpper", string_filter(|s| map_first(s, char::to_uppercase)));
        self.register("firstToLower", string_filter(|s| map_first(s, char::to_lowercase)));
        self.register("camelCase", string_filter(|s| s.to_lower_camel_case()));
        self.register("pascalCase", string_filter(|s| s.to_upper_camel_case()));
        self.register("snakeCase", string_filter(|s| s.to_snake_case()));
        self.register("kebabCase", string_filter(|s| s.to_kebab_case()));
        self.register("trim", string_filter(|s| s.trim().to_string()));
        self.register("json", |value: Value| {
            Ok(Value::String(serde_json::to_string(&value)?))
        });
        self.register("reverse", |value: Value| {
            let mut items = expect_array(value)?;
            items.reverse();
            Ok(Value::Array(items))
        });
        self.register("first", |value: Value| {
            Ok(expect_array(value)?.into_iter().next().unwrap_or(Value::Null))
        });
        self.register("last", |value: Value| {
            Ok(expect_array(value)?.pop().unwrap_or(Value::Null))
        });
    }
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

fn string_filter(
    f: impl Fn(&str) -> String + 'static,
) -> impl Fn(Value) -> Result<Value, BoxError> + 'static {
    move |value| match value {
        Value::String(s) => Ok(Value::String(f(&s))),
        other => Err(BuiltinFilterError::ExpectedString {
            found: type_name(&other),
        }
        .into()),
    }
}

fn expect_array(value: Value) -> Result<Vec<Value>, BoxError> {
    match value {
        Value::Array(items) => Ok(items),
        other => Err(BuiltinFilterError::ExpectedArray {
            found: type_name(&other),
        }
        .into()),
    }
}

fn map_first<I>(s: &str, f: impl Fn(char) -> I) -> String
where
    I: Iterator<Item = char>,
{
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => f(first).chain(chars).collect(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn names(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_filters_apply_left_to_right() {
        let mut registry = FilterRegistry::new();
        registry.register("firstToUpper", |v: Value| {
            let s = v.as_str().unwrap_or_default();
            Ok(json!(map_first(s, char::to_uppercase)))
        });
        registry.register("prefix", |v: Value| {
            Ok(json!(format!("hey{}", v.as_str().unwrap_or_default())))
        });

        let result = registry
            .apply(&names(&["firstToUpper", "prefix"]), json!("testValue"))
            .expect("Should filter");
        assert_eq!(result, json!("heyTestValue"));
    }

    #[test]
    fn test_empty_chain_is_identity() {
        let registry = FilterRegistry::new();
        assert_eq!(registry.apply(&[], json!(42)).ok(), Some(json!(42)));
    }

    #[test]
    fn test_unknown_filter() {
        let registry = FilterRegistry::new();
        let err = registry
            .apply(&names(&["missing"]), json!("x"))
            .expect_err("Should fail");
        assert_eq!(err.code(), "E_BAD_FILTER");
    }

    #[test]
    fn test_failing_filter_is_wrapped() {
        let mut registry = FilterRegistry::new();
        registry.register("boom", |_: Value| Err("kaboom".into()));
        match registry.apply(&names(&["boom"]), json!(null)) {
            Err(TemplateError::FilterFailed { name, source }) => {
                assert_eq!(name, "boom");
                assert_eq!(source.to_string(), "kaboom");
            }
            other => panic!("Expected filter failure, got {:?}", other),
        }
    }

    #[test]
    fn test_builtin_case_filters() {
        let registry = FilterRegistry::with_builtins();
        let apply = |name: &str, value: &str| {
            registry
                .apply(&names(&[name]), json!(value))
                .expect("Should filter")
        };
        assert_eq!(apply("upper", "abc"), json!("ABC"));
        assert_eq!(apply("firstToUpper", "testValue"), json!("TestValue"));
        assert_eq!(apply("firstToLower", "TestValue"), json!("testValue"));
        assert_eq!(apply("camelCase", "get-user by_id"), json!("getUserById"));
        assert_eq!(apply("pascalCase", "getUserById"), json!("GetUserById"));
        assert_eq!(apply("snakeCase", "getUserById"), json!("get_user_by_id"));
        assert_eq!(apply("kebabCase", "Get User"), json!("get-user"));
        assert_eq!(apply("snakeCase", "HTTPRequest"), json!("http_request"));
        assert_eq!(apply("pascalCase", "operation_id"), json!("OperationId"));
        assert_eq!(apply("trim", "  x "), json!("x"));
    }

    #[test]
    fn test_builtin_string_filter_rejects_numbers() {
        let registry = FilterRegistry::with_builtins();
        let err = registry
            .apply(&names(&["upper"]), json!(1))
            .expect_err("Should fail");
        assert_eq!(err.code(), "E_FILTER_FAIL");
        assert!(err.to_string().contains("expected a string"));
    }

    #[test]
    fn test_builtin_list_filters() {
        let registry = FilterRegistry::with_builtins();
        assert_eq!(
            registry.apply(&names(&["reverse"]), json!([1, 2, 3])).ok(),
            Some(json!([3, 2, 1]))
        );
        assert_eq!(
            registry.apply(&names(&["first"]), json!([1, 2])).ok(),
            Some(json!(1))
        );
        assert_eq!(
            registry.apply(&names(&["last"]), json!([1, 2])).ok(),
            Some(json!(2))
        );
        assert_eq!(
            registry.apply(&names(&["json"]), json!({ "a": [1] })).ok(),
            Some(json!("{\"a\":[1]}"))
        );
    }

    #[test]
    fn test_names_sorted() {
        let registry = FilterRegistry::with_builtins();
        let listed = registry.names();
        assert!(listed.windows(2).all(|w| w[0] <= w[1]));
        assert!(registry.contains("kebabCase"));
    }
}
