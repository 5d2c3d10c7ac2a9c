//! Loop expansion
//!
//! A loop directive sits in the name of an entry of a list: an object literal
//! property, an object pattern property or a function declaration in a
//! statement list. The entry is cloned once per item, each clone is renamed
//! and walked with its item pushed on the context stack. Entries without a
//! loop are walked afterwards, in the enclosing scope.

use serde_json::Value;
use tracing::debug;

use crate::parser::ast::{Expr, Ident, ObjectMember, Pat, PatMember, PropKey, Stmt};

use super::directive::{Directive, Repetition};
use super::visitor::{is_truthy, value_to_name, Fate, Walker};
use super::TemplateError;

/// List entry that may carry a loop directive in its name
pub(crate) trait Repeatable: Clone {
    /// The name a loop directive would sit in
    fn loop_name(&self) -> Option<&Ident>;

    /// Give a clone its generated name
    fn rename(&mut self, name: &str);

    fn walk(&mut self, walker: &mut Walker<'_>) -> Result<Fate, TemplateError>;
}

impl Repeatable for ObjectMember {
    fn loop_name(&self) -> Option<&Ident> {
        match self {
            ObjectMember::Prop(prop) => match &prop.key {
                PropKey::Ident(name) => Some(name),
                _ => None,
            },
            ObjectMember::Spread(_) => None,
        }
    }

    fn rename(&mut self, name: &str) {
        if let ObjectMember::Prop(prop) = self {
            if let PropKey::Ident(key) = &mut prop.key {
                if prop.shorthand {
                    if let Expr::Ident(value) = &mut prop.value {
                        value.name = name.to_string();
                    }
                }
                key.name = name.to_string();
            }
        }
    }

    fn walk(&mut self, walker: &mut Walker<'_>) -> Result<Fate, TemplateError> {
        walker.walk_object_member(self)
    }
}

impl Repeatable for PatMember {
    fn loop_name(&self) -> Option<&Ident> {
        match self {
            PatMember::Prop(prop) => match &prop.key {
                PropKey::Ident(name) => Some(name),
                _ => None,
            },
            PatMember::Rest(_) => None,
        }
    }

    fn rename(&mut self, name: &str) {
        if let PatMember::Prop(prop) = self {
            if let PropKey::Ident(key) = &mut prop.key {
                if prop.shorthand {
                    // `{ key }` or `{ key = fallback }`
                    let binding = match &mut prop.value {
                        Pat::Assign { left, .. } => left.as_mut(),
                        other => other,
                    };
                    if let Pat::Ident(value) = binding {
                        value.name = name.to_string();
                    }
                }
                key.name = name.to_string();
            }
        }
    }

    fn walk(&mut self, walker: &mut Walker<'_>) -> Result<Fate, TemplateError> {
        walker.walk_pat_member(self)
    }
}

impl Repeatable for Stmt {
    fn loop_name(&self) -> Option<&Ident> {
        match self {
            Stmt::Function(function) => function.id.as_ref(),
            _ => None,
        }
    }

    fn rename(&mut self, name: &str) {
        if let Stmt::Function(function) = self {
            if let Some(id) = &mut function.id {
                id.name = name.to_string();
            }
        }
    }

    fn walk(&mut self, walker: &mut Walker<'_>) -> Result<Fate, TemplateError> {
        walker.walk_stmt(self)
    }
}

/// Expand the loop entries of a list, then walk the remaining entries
pub(crate) fn walk_entries<T: Repeatable>(
    walker: &mut Walker<'_>,
    entries: &mut Vec<T>,
) -> Result<(), TemplateError> {
    let mut expanded = Vec::with_capacity(entries.len());
    for entry in std::mem::take(entries) {
        let repetition = entry
            .loop_name()
            .and_then(|name| match Directive::decode(&name.name) {
                Some(Directive::Loop(repetition)) => Some((name.clone(), repetition)),
                _ => None,
            });
        match repetition {
            Some((name, repetition)) => {
                let clones = expand(walker, &entry, &name, &repetition)?;
                expanded.extend(clones.into_iter().map(|clone| (clone, true)));
            }
            None => expanded.push((entry, false)),
        }
    }

    // Generated entries were already walked in their item's scope
    for (mut entry, generated) in expanded {
        if generated || entry.walk(walker)? == Fate::Keep {
            entries.push(entry);
        }
    }
    Ok(())
}

fn expand<T: Repeatable>(
    walker: &mut Walker<'_>,
    template: &T,
    name: &Ident,
    repetition: &Repetition,
) -> Result<Vec<T>, TemplateError> {
    let config = walker.config();
    let matches = walker.query(&repetition.items_path);
    debug!(
        directive = %name,
        span = ?name.span,
        matches = matches.len(),
        "expanding loop"
    );

    let items = match config
        .filters
        .apply(&repetition.items_filters, Value::Array(matches))?
    {
        Value::Array(items) => items,
        Value::Null => Vec::new(),
        item => vec![item],
    };

    let mut clones = Vec::with_capacity(items.len());
    for item in items {
        let raw_name = match &repetition.item_name_path {
            Some(path) => config.query.first(path, std::slice::from_ref(&item)),
            None => Some(item.clone()),
        };
        let raw_name = raw_name
            .filter(is_truthy)
            .ok_or_else(|| TemplateError::NoName {
                directive: name.name.clone(),
                path: repetition
                    .item_name_path
                    .clone()
                    .unwrap_or_else(|| repetition.items_path.clone()),
            })?;
        let entry_name = value_to_name(
            &config
                .filters
                .apply(&repetition.item_name_filters, raw_name)?,
        )?;

        let mut clone = template.clone();
        clone.rename(&entry_name);
        if walker.with_item(item, |nested| clone.walk(nested))? == Fate::Keep {
            clones.push(clone);
        }
    }

    Ok(clones)
}
