//! Directive codec
//!
//! Directives are written inside identifier names using code points from the
//! Aegean numbers block. They are letter-numbers, so the host parser accepts
//! them as identifier characters, and nobody types them by accident.
//!
//! | Directive | Encoded form |
//! |---|---|
//! | Variable | `𐅙variable𐅙` path (`𐅂` filter)* |
//! | Literal | `𐅙literal𐅙` path (`𐅂` filter)* |
//! | Transform | `𐅙transform𐅙` name (`𐅙` path)? |
//! | Loop | `𐅙repeat𐅙` items path (`𐅂` filter)* `𐅙` name path? (`𐅂` filter)* |
//!
//! Inside paths `𐅞` stands for `.`, `𐅅` for `#`, `𐅆` for `*` and `𐅄` for `@`.

use std::fmt;

/// Marker opening every directive and separating loop / transform parts
pub const MARK: char = '\u{10159}';
pub const FILTER_SEPARATOR: char = '\u{10142}';
pub const PATH_SEPARATOR: char = '\u{1015E}';
pub const ENCODED_HASH: char = '\u{10145}';
pub const ENCODED_WILDCARD: char = '\u{10146}';
pub const ENCODED_AT: char = '\u{10144}';

const VARIABLE_PREFIX: &str = "\u{10159}variable\u{10159}";
const LITERAL_PREFIX: &str = "\u{10159}literal\u{10159}";
const TRANSFORM_PREFIX: &str = "\u{10159}transform\u{10159}";
const LOOP_PREFIX: &str = "\u{10159}repeat\u{10159}";

/// A decoded directive
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Directive {
    /// Rename the identifier to the resolved value
    Variable { path: String, filters: Vec<String> },
    /// Replace the identifier with a literal of the resolved value
    Literal { path: String, filters: Vec<String> },
    /// Hand the node to a registered transformation
    Transform { name: String, path: Option<String> },
    /// Repeat the enclosing entry once per item
    Loop(Repetition),
}

/// Loop directive parts
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Repetition {
    pub items_path: String,
    pub items_filters: Vec<String>,
    /// Path resolved against each item; `None` names entries after the item itself
    pub item_name_path: Option<String>,
    pub item_name_filters: Vec<String>,
}

impl Directive {
    /// Decode an identifier name. Ordinary names decode to `None`.
    pub fn decode(raw: &str) -> Option<Directive> {
        if let Some(rest) = raw.strip_prefix(VARIABLE_PREFIX) {
            let (path, filters) = split_filters(rest);
            return Some(Directive::Variable { path, filters });
        }
        if let Some(rest) = raw.strip_prefix(LITERAL_PREFIX) {
            let (path, filters) = split_filters(rest);
            return Some(Directive::Literal { path, filters });
        }
        if let Some(rest) = raw.strip_prefix(TRANSFORM_PREFIX) {
            let mut parts = rest.split(MARK);
            let name = parts.next().unwrap_or_default().to_string();
            let path = parts
                .next()
                .filter(|p| !p.is_empty())
                .map(translate_path);
            return Some(Directive::Transform { name, path });
        }
        if let Some(rest) = raw.strip_prefix(LOOP_PREFIX) {
            let mut parts = rest.split(MARK);
            let (items_path, items_filters) = split_filters(parts.next().unwrap_or_default());
            let (item_name_path, item_name_filters) =
                split_filters(parts.next().unwrap_or_default());
            return Some(Directive::Loop(Repetition {
                items_path,
                items_filters,
                item_name_path: Some(item_name_path).filter(|p| !p.is_empty()),
                item_name_filters,
            }));
        }
        None
    }

    /// Identifier name carrying this directive
    pub fn encode(&self) -> String {
        match self {
            Directive::Variable { path, filters } => {
                format!("{}{}", VARIABLE_PREFIX, join_filters(path, filters))
            }
            Directive::Literal { path, filters } => {
                format!("{}{}", LITERAL_PREFIX, join_filters(path, filters))
            }
            Directive::Transform { name, path } => match path {
                Some(path) => format!("{}{}{}{}", TRANSFORM_PREFIX, name, MARK, encode_path(path)),
                None => format!("{}{}", TRANSFORM_PREFIX, name),
            },
            Directive::Loop(repetition) => format!(
                "{}{}{}{}",
                LOOP_PREFIX,
                join_filters(&repetition.items_path, &repetition.items_filters),
                MARK,
                join_filters(
                    repetition.item_name_path.as_deref().unwrap_or_default(),
                    &repetition.item_name_filters
                )
            ),
        }
    }

    /// Short name of the directive kind, for diagnostics
    pub fn kind(&self) -> &'static str {
        match self {
            Directive::Variable { .. } => "variable",
            Directive::Literal { .. } => "literal",
            Directive::Transform { .. } => "transform",
            Directive::Loop(_) => "repeat",
        }
    }
}

impl fmt::Display for Directive {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.encode())
    }
}

/// `path𐅂f1𐅂f2` into the decoded path and the filter names, in order
fn split_filters(encoded: &str) -> (String, Vec<String>) {
    let mut parts = encoded.split(FILTER_SEPARATOR);
    let path = translate_path(parts.next().unwrap_or_default());
    (path, parts.map(str::to_string).collect())
}

fn join_filters(path: &str, filters: &[String]) -> String {
    let mut out = encode_path(path);
    for filter in filters {
        out.push(FILTER_SEPARATOR);
        out.push_str(filter);
    }
    out
}

/// Replace path escapes with the query syntax they stand for
pub fn translate_path(encoded: &str) -> String {
    encoded
        .chars()
        .map(|c| match c {
            PATH_SEPARATOR => '.',
            ENCODED_WILDCARD => '*',
            ENCODED_HASH => '#',
            ENCODED_AT => '@',
            c => c,
        })
        .collect()
}

/// Inverse of [`translate_path`]
pub fn encode_path(path: &str) -> String {
    path.chars()
        .map(|c| match c {
            '.' => PATH_SEPARATOR,
            '*' => ENCODED_WILDCARD,
            '#' => ENCODED_HASH,
            '@' => ENCODED_AT,
            c => c,
        })
        .collect()
}
