//! asttpl - source templates that are themselves valid source
//!
//! This library parses a JavaScript template, expands the directives encoded
//! in its identifier names against a stack of JSON values and prints the
//! result back as source.
//!
//! # Example
//!
//! ```rust
//! use asttpl::compile;
//! use serde_json::json;
//!
//! let source = compile(
//!     "const 𐅙variable𐅙name = 𐅙literal𐅙value;",
//!     vec![json!({ "name": "answer", "value": 42 })],
//! )
//! .unwrap();
//! assert_eq!(source, "const answer = 42;");
//! ```

pub mod error;
pub mod options;
pub mod parser;
pub mod printer;
pub mod query;
pub mod template;

pub use error::ParseError;
pub use options::{Options, OptionsError};
pub use parser::{parse, Program};
pub use printer::{print, PrinterConfig, Quote};
pub use query::{PathQuery, QueryEvaluator};
pub use template::{
    expand, ContextStack, Directive, FilterRegistry, Flow, NodeHandle, TemplateConfig,
    TemplateError, TransformRegistry,
};

use serde_json::Value;
use thiserror::Error;
use tracing::Dispatch;

use template::BoxError;

/// Errors that can occur during the compile pipeline
#[derive(Debug, Error)]
pub enum CompileError {
    /// Error during parsing
    #[error("parse errors: {}", format_parse_errors(.0))]
    Parse(Vec<ParseError>),

    /// Error during directive expansion
    #[error("template error: {0}")]
    Template(#[from] TemplateError),
}

impl From<Vec<ParseError>> for CompileError {
    fn from(errors: Vec<ParseError>) -> Self {
        CompileError::Parse(errors)
    }
}

impl CompileError {
    /// Stable error code
    pub fn code(&self) -> &'static str {
        match self {
            CompileError::Parse(_) => "E_PARSE",
            CompileError::Template(err) => err.code(),
        }
    }
}

fn format_parse_errors(errors: &[ParseError]) -> String {
    errors
        .iter()
        .map(|e| e.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}

/// Configuration for the complete compile pipeline
#[derive(Debug, Clone, Default)]
pub struct CompileConfig {
    /// Filters, transformations and query evaluator
    pub template: TemplateConfig,
    /// Output formatting
    pub printer: PrinterConfig,
    /// Subscriber receiving the expansion's tracing events
    pub trace: Option<Dispatch>,
}

impl CompileConfig {
    /// Create a new configuration with defaults
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a filter
    pub fn with_filter<F>(mut self, name: impl Into<String>, filter: F) -> Self
    where
        F: Fn(Value) -> Result<Value, BoxError> + 'static,
    {
        self.template = self.template.with_filter(name, filter);
        self
    }

    /// Register every filter of a registry
    pub fn with_filters(mut self, filters: FilterRegistry) -> Self {
        self.template = self.template.with_filters(filters);
        self
    }

    /// Register a transformation
    pub fn with_transformation<F>(mut self, name: impl Into<String>, transform: F) -> Self
    where
        F: Fn(&mut NodeHandle, &[Value]) -> Result<Flow, BoxError> + 'static,
    {
        self.template = self.template.with_transformation(name, transform);
        self
    }

    /// Set the printer configuration
    pub fn with_printer(mut self, printer: PrinterConfig) -> Self {
        self.printer = printer;
        self
    }

    /// Set the path evaluator
    pub fn with_query(mut self, query: impl QueryEvaluator + 'static) -> Self {
        self.template = self.template.with_query(query);
        self
    }

    /// Send tracing events to `dispatch` while compiling
    pub fn with_trace(mut self, dispatch: Dispatch) -> Self {
        self.trace = Some(dispatch);
        self
    }
}

/// Compile a template against context values with default configuration
///
/// `values` become the initial context stack, outermost first.
pub fn compile(template: &str, values: Vec<Value>) -> Result<String, CompileError> {
    let mut stack = ContextStack::from(values);
    compile_with_config(template, &mut stack, &CompileConfig::default())
}

/// Compile a template with custom configuration
///
/// # Example
///
/// ```rust
/// use asttpl::{compile_with_config, CompileConfig, ContextStack, FilterRegistry};
/// use serde_json::json;
///
/// let config = CompileConfig::new().with_filters(FilterRegistry::with_builtins());
/// let mut stack = ContextStack::from(vec![json!({ "name": "user" })]);
///
/// let source = compile_with_config("function 𐅙variable𐅙name𐅂pascalCase() {}", &mut stack, &config).unwrap();
/// assert_eq!(source, "function User() {}");
/// ```
pub fn compile_with_config(
    template: &str,
    stack: &mut ContextStack,
    config: &CompileConfig,
) -> Result<String, CompileError> {
    let mut run = || -> Result<String, CompileError> {
        let mut program = parse(template)?;
        expand(&mut program, stack, &config.template)?;
        Ok(print(&program, &config.printer))
    };

    match &config.trace {
        Some(dispatch) => tracing::dispatcher::with_default(dispatch, run),
        None => run(),
    }
}
