//! Context stack for nested loop scopes

use std::ops::{Deref, DerefMut};

use serde_json::Value;

/// Data values visible to directives, outermost first
///
/// Values are only added through [`ContextStack::enter`], whose guard removes
/// the value again when dropped, so the stack always returns to its previous
/// length, error paths included.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ContextStack {
    values: Vec<Value>,
}

impl ContextStack {
    /// Create an empty stack
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Every value, outermost first
    pub fn values(&self) -> &[Value] {
        &self.values
    }

    /// Innermost value
    pub fn last(&self) -> Option<&Value> {
        self.values.last()
    }

    /// Push a scope value for the lifetime of the returned guard
    pub fn enter(&mut self, value: Value) -> Scope<'_> {
        self.values.push(value);
        Scope { stack: self }
    }

    pub fn into_values(self) -> Vec<Value> {
        self.values
    }
}

impl From<Vec<Value>> for ContextStack {
    fn from(values: Vec<Value>) -> Self {
        Self { values }
    }
}

impl FromIterator<Value> for ContextStack {
    fn from_iter<T: IntoIterator<Item = Value>>(iter: T) -> Self {
        Self {
            values: iter.into_iter().collect(),
        }
    }
}

/// Guard for one pushed scope value
pub struct Scope<'s> {
    stack: &'s mut ContextStack,
}

impl Deref for Scope<'_> {
    type Target = ContextStack;

    fn deref(&self) -> &ContextStack {
        self.stack
    }
}

impl DerefMut for Scope<'_> {
    fn deref_mut(&mut self) -> &mut ContextStack {
        self.stack
    }
}

impl Drop for Scope<'_> {
    fn drop(&mut self) {
        self.stack.values.pop();
    }
}
