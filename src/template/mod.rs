//! Directive expansion over parsed templates
//!
//! Directives are identifier names made of marker characters, so a template
//! is ordinary parseable source. The expander walks the tree once and
//! resolves every directive against a stack of data values.
//!
//! # Example
//!
//! ```text
//! // Template
//! const API = { 𐅙repeat𐅙endpoints𐅞𐅅𐅙operationId };
//!
//! // With endpoints [{ operationId: "getAlbums" }, { operationId: "putArticle" }]
//! const API = {
//!   getAlbums,
//!   putArticle
//! };
//! ```

mod context;
mod directive;
mod error;
mod filters;
mod handle;
mod repeat;
mod transform;
mod visitor;

use std::fmt;
use std::rc::Rc;

use serde_json::Value;

use crate::parser::Program;
use crate::query::{PathQuery, QueryEvaluator};

pub use context::{ContextStack, Scope};
pub use directive::{
    encode_path, translate_path, Directive, Repetition, ENCODED_AT, ENCODED_HASH,
    ENCODED_WILDCARD, FILTER_SEPARATOR, MARK, PATH_SEPARATOR,
};
pub use error::{BoxError, TemplateError};
pub use filters::{BuiltinFilterError, FilterFn, FilterRegistry};
pub use handle::{Field, Flow, Node, NodeHandle, NodeKind, Parent, Slot};
pub use transform::{TransformFn, TransformRegistry};

/// Filters, transformations and query evaluator used by an expansion
#[derive(Clone)]
pub struct TemplateConfig {
    pub filters: FilterRegistry,
    pub transformations: TransformRegistry,
    pub query: Rc<dyn QueryEvaluator>,
}

impl Default for TemplateConfig {
    fn default() -> Self {
        Self {
            filters: FilterRegistry::default(),
            transformations: TransformRegistry::default(),
            query: Rc::new(PathQuery),
        }
    }
}

impl fmt::Debug for TemplateConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TemplateConfig")
            .field("filters", &self.filters)
            .field("transformations", &self.transformations)
            .finish_non_exhaustive()
    }
}

impl TemplateConfig {
    /// Configuration with no filters and no transformations
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_filter<F>(mut self, name: impl Into<String>, filter: F) -> Self
    where
        F: Fn(Value) -> Result<Value, BoxError> + 'static,
    {
        self.filters.register(name, filter);
        self
    }

    /// Add every filter of a registry, overriding names already present
    pub fn with_filters(mut self, filters: FilterRegistry) -> Self {
        self.filters.extend(filters);
        self
    }

    pub fn with_transformation<F>(mut self, name: impl Into<String>, transform: F) -> Self
    where
        F: Fn(&mut NodeHandle, &[Value]) -> Result<Flow, BoxError> + 'static,
    {
        self.transformations.register(name, transform);
        self
    }

    /// Replace the path evaluator
    pub fn with_query(mut self, query: impl QueryEvaluator + 'static) -> Self {
        self.query = Rc::new(query);
        self
    }
}

/// Expand every directive in `program`, in place.
///
/// The stack is left as it was given, even when expansion fails. On error the
/// program is left partially rewritten and should be discarded.
pub fn expand(
    program: &mut Program,
    stack: &mut ContextStack,
    config: &TemplateConfig,
) -> Result<(), TemplateError> {
    let mut walker = visitor::Walker::new(stack, config);
    walker.walk_program(program)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse;
    use crate::printer::{print, PrinterConfig};
    use serde_json::json;

    #[test]
    fn test_expand_leaves_plain_source_alone() {
        let source = "const a = b.c(1, 'x');";
        let mut program = parse(source).expect("Should parse");
        let expected = program.clone();
        expand(&mut program, &mut ContextStack::new(), &TemplateConfig::default())
            .expect("Should expand");
        assert_eq!(program, expected);
    }

    #[test]
    fn test_stack_unchanged_after_failure() {
        let mut program =
            parse("const a = { 𐅙repeat𐅙list𐅞𐅅: 𐅙variable𐅙missing };").expect("Should parse");
        let mut stack = ContextStack::from(vec![json!({ "list": ["x"] })]);
        let err = expand(&mut program, &mut stack, &TemplateConfig::default())
            .expect_err("Should fail");
        assert_eq!(err.code(), "E_NO_NAME");
        assert_eq!(stack.len(), 1);
    }

    #[test]
    fn test_custom_query_evaluator() {
        struct Constant;
        impl QueryEvaluator for Constant {
            fn query(&self, _: &str, _: &[Value]) -> Vec<Value> {
                vec![json!("fixed")]
            }
        }

        let config = TemplateConfig::new().with_query(Constant);
        let mut program = parse("let 𐅙variable𐅙anything;").expect("Should parse");
        expand(&mut program, &mut ContextStack::new(), &config).expect("Should expand");
        assert_eq!(print(&program, &PrinterConfig::default()), "let fixed;");
    }

    #[test]
    fn test_debug_lists_registered_names() {
        let config = TemplateConfig::new()
            .with_filters(FilterRegistry::with_builtins())
            .with_transformation("noop", |_: &mut NodeHandle, _: &[Value]| Ok(Flow::Continue));
        let debug = format!("{:?}", config);
        assert!(debug.contains("noop"));
        assert!(debug.contains("upper"));
    }
}
