//! Transformation registry
//!
//! A transformation receives the handle of the identifier carrying the
//! directive and the resolved values: the query matches for the directive's
//! path, or the whole context stack when no path was given. It may rename,
//! replace or prune the node, and returns whether the walk continues into
//! whatever now sits at that position.

use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use serde_json::Value;

use super::handle::{Flow, NodeHandle};
use super::{BoxError, TemplateError};

pub type TransformFn = Rc<dyn Fn(&mut NodeHandle, &[Value]) -> Result<Flow, BoxError>>;

/// Named transformations available to directives
#[derive(Clone, Default)]
pub struct TransformRegistry {
    transforms: HashMap<String, TransformFn>,
}

impl fmt::Debug for TransformRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<&String> = self.transforms.keys().collect();
        names.sort_unstable();
        f.debug_struct("TransformRegistry")
            .field("transforms", &names)
            .finish()
    }
}

impl TransformRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a transformation, replacing any of the same name
    pub fn register<F>(&mut self, name: impl Into<String>, transform: F)
    where
        F: Fn(&mut NodeHandle, &[Value]) -> Result<Flow, BoxError> + 'static,
    {
        self.transforms.insert(name.into(), Rc::new(transform));
    }

    pub fn get(&self, name: &str) -> Option<&TransformFn> {
        self.transforms.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.transforms.contains_key(name)
    }

    /// Run the named transformation on a handle
    pub fn invoke(
        &self,
        name: &str,
        handle: &mut NodeHandle,
        values: &[Value],
    ) -> Result<Flow, TemplateError> {
        let transform = self
            .transforms
            .get(name)
            .ok_or_else(|| TemplateError::BadTransformation {
                name: name.to_string(),
            })?;
        transform(handle, values).map_err(|source| TemplateError::TransformFailed {
            name: name.to_string(),
            source,
        })
    }
}
