//! Errors raised while expanding directives

use thiserror::Error;

use super::handle::{Field, NodeKind, Slot};

/// Error type returned by caller-supplied filters and transformations
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Errors that abort a template expansion
#[derive(Debug, Error)]
pub enum TemplateError {
    /// A name resolved to nothing usable
    #[error("no name found for `{path}` in `{directive}`")]
    NoName { directive: String, path: String },

    /// Literal directive in a position that cannot hold a literal
    #[error("literal `{directive}` cannot be the {field} of a {kind}")]
    BadLiteral {
        directive: String,
        kind: NodeKind,
        field: Field,
    },

    /// Transformation name not registered
    #[error("unknown transformation: {name}")]
    BadTransformation { name: String },

    /// Filter name not registered
    #[error("unknown filter: {name}")]
    BadFilter { name: String },

    /// Registered filter returned an error
    #[error("filter {name} failed: {source}")]
    FilterFailed {
        name: String,
        #[source]
        source: BoxError,
    },

    /// Registered transformation returned an error
    #[error("transformation {name} failed: {source}")]
    TransformFailed {
        name: String,
        #[source]
        source: BoxError,
    },

    /// Replacement node does not fit the position it was put in
    #[error("{replacement} cannot be placed in a {slot} position")]
    InvalidReplacement {
        replacement: &'static str,
        slot: Slot,
    },

    /// Value cannot be spelled as an identifier
    #[error("{value} cannot be used as an identifier name")]
    BadName { value: String },
}

impl TemplateError {
    /// Stable error code
    pub fn code(&self) -> &'static str {
        match self {
            TemplateError::NoName { .. } => "E_NO_NAME",
            TemplateError::BadLiteral { .. } => "E_BAD_LITERAL",
            TemplateError::BadTransformation { .. } => "E_BAD_TRANSFORMATION",
            TemplateError::BadFilter { .. } => "E_BAD_FILTER",
            TemplateError::FilterFailed { .. } => "E_FILTER_FAIL",
            TemplateError::TransformFailed { .. } => "E_TRANSFORM_FAIL",
            TemplateError::InvalidReplacement { .. } => "E_BAD_REPLACEMENT",
            TemplateError::BadName { .. } => "E_BAD_NAME",
        }
    }
}
