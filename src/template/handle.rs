//! Node handles given to rewrite handlers and transformations

use std::fmt;

use crate::parser::ast::{
    CatchClause, Declarator, Expr, Ident, ImportSpecifier, ObjectMember, Pat, PatMember, Stmt,
    SwitchCase,
};

use super::TemplateError;

/// A tree node as seen from its position
///
/// Directives only ever sit in expressions, patterns and names. The other
/// variants show up as the parent of a handle's position.
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    Expr(Expr),
    Pat(Pat),
    Ident(Ident),
    Stmt(Stmt),
    Declarator(Declarator),
    ObjectMember(ObjectMember),
    PatMember(PatMember),
    ImportSpecifier(ImportSpecifier),
    SwitchCase(SwitchCase),
    CatchClause(CatchClause),
}

impl Node {
    /// Node type name, for diagnostics
    pub fn type_name(&self) -> &'static str {
        match self {
            Node::Ident(_) | Node::Expr(Expr::Ident(_)) | Node::Pat(Pat::Ident(_)) => "identifier",
            Node::Expr(Expr::Lit(_)) => "literal",
            Node::Expr(Expr::Array(_)) => "array expression",
            Node::Expr(Expr::Object(_)) => "object expression",
            Node::Expr(Expr::Function(_)) => "function expression",
            Node::Expr(Expr::Arrow(_)) => "arrow function",
            Node::Expr(_) => "expression",
            Node::Pat(Pat::Object(_)) => "object pattern",
            Node::Pat(Pat::Array(_)) => "array pattern",
            Node::Pat(_) => "pattern",
            Node::Stmt(_) => "statement",
            Node::Declarator(_) => "variable declarator",
            Node::ObjectMember(_) => "object member",
            Node::PatMember(_) => "pattern member",
            Node::ImportSpecifier(_) => "import specifier",
            Node::SwitchCase(_) => "switch case",
            Node::CatchClause(_) => "catch clause",
        }
    }

    /// The identifier, whatever position it sits in
    pub fn as_ident(&self) -> Option<&Ident> {
        match self {
            Node::Ident(id) | Node::Expr(Expr::Ident(id)) | Node::Pat(Pat::Ident(id)) => Some(id),
            _ => None,
        }
    }

    fn as_ident_mut(&mut self) -> Option<&mut Ident> {
        match self {
            Node::Ident(id) | Node::Expr(Expr::Ident(id)) | Node::Pat(Pat::Ident(id)) => Some(id),
            _ => None,
        }
    }

    pub(crate) fn into_expr(self) -> Result<Expr, TemplateError> {
        match self {
            Node::Expr(expr) => Ok(expr),
            Node::Ident(id) | Node::Pat(Pat::Ident(id)) => Ok(Expr::Ident(id)),
            other => Err(invalid(&other, Slot::Expression)),
        }
    }

    pub(crate) fn into_pat(self) -> Result<Pat, TemplateError> {
        match self {
            Node::Pat(pat) => Ok(pat),
            Node::Ident(id) | Node::Expr(Expr::Ident(id)) => Ok(Pat::Ident(id)),
            other => Err(invalid(&other, Slot::Binding)),
        }
    }

    pub(crate) fn into_ident(self) -> Result<Ident, TemplateError> {
        match self {
            Node::Ident(id) | Node::Expr(Expr::Ident(id)) | Node::Pat(Pat::Ident(id)) => Ok(id),
            other => Err(invalid(&other, Slot::Name)),
        }
    }
}

fn invalid(node: &Node, slot: Slot) -> TemplateError {
    TemplateError::InvalidReplacement {
        replacement: node.type_name(),
        slot,
    }
}

impl From<Expr> for Node {
    fn from(expr: Expr) -> Self {
        Node::Expr(expr)
    }
}

impl From<Pat> for Node {
    fn from(pat: Pat) -> Self {
        Node::Pat(pat)
    }
}

impl From<Ident> for Node {
    fn from(ident: Ident) -> Self {
        Node::Ident(ident)
    }
}

/// What a position can hold
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Slot {
    /// Any expression
    Expression,
    /// A binding pattern (declarator ids, parameters, pattern entries)
    Binding,
    /// A bare name (declaration names, property keys, member properties, labels)
    Name,
}

impl fmt::Display for Slot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Slot::Expression => "expression",
            Slot::Binding => "binding",
            Slot::Name => "name",
        })
    }
}

/// Type of the node holding a position
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    Program,
    Block,
    ExpressionStatement,
    VariableDeclarator,
    FunctionDeclaration,
    FunctionExpression,
    ArrowFunction,
    ReturnStatement,
    IfStatement,
    WhileStatement,
    DoWhileStatement,
    ForStatement,
    ForInStatement,
    ForOfStatement,
    BreakStatement,
    ContinueStatement,
    SwitchStatement,
    SwitchCase,
    CatchClause,
    ThrowStatement,
    LabeledStatement,
    ImportSpecifier,
    ExportDefault,
    ArrayExpression,
    Property,
    SpreadElement,
    MemberExpression,
    CallExpression,
    NewExpression,
    UnaryExpression,
    UpdateExpression,
    BinaryExpression,
    AssignmentExpression,
    ConditionalExpression,
    SequenceExpression,
    ArrayPattern,
    AssignmentPattern,
    RestElement,
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Field of the parent node holding a position
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    Body,
    Expression,
    Id,
    Init,
    Params,
    Argument,
    Test,
    Update,
    Consequent,
    Alternate,
    Label,
    Local,
    Imported,
    Declaration,
    Elements,
    Key,
    Value,
    Object,
    Property,
    Callee,
    Arguments,
    Left,
    Right,
    Discriminant,
    Param,
    Expressions,
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = format!("{:?}", self);
        f.write_str(&name.to_lowercase())
    }
}

/// Where a handle's node sits: parent type and field
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Parent {
    pub kind: NodeKind,
    pub field: Field,
}

impl Parent {
    pub fn new(kind: NodeKind, field: Field) -> Self {
        Self { kind, field }
    }
}

/// Whether the walk continues into the node now at a handle's position
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Flow {
    #[default]
    Continue,
    StopRecursion,
}

/// Capability handed to rewrite handlers and transformations for one position
///
/// The handle owns a copy of the node; the walker writes it back into the
/// tree once the handler returns. The parent node, when present, is a
/// read-only copy taken before any of its children were rewritten.
#[derive(Debug, Clone)]
pub struct NodeHandle {
    node: Node,
    parent: Parent,
    parent_node: Option<Node>,
    slot: Slot,
    pruned: bool,
}

impl NodeHandle {
    pub fn new(node: impl Into<Node>, parent: Parent, slot: Slot) -> Self {
        Self {
            node: node.into(),
            parent,
            parent_node: None,
            slot,
            pruned: false,
        }
    }

    pub fn with_parent_node(mut self, parent_node: Option<Node>) -> Self {
        self.parent_node = parent_node;
        self
    }

    /// Current node
    pub fn node(&self) -> &Node {
        &self.node
    }

    pub fn node_mut(&mut self) -> &mut Node {
        &mut self.node
    }

    /// Current node when it is an identifier
    pub fn ident(&self) -> Option<&Ident> {
        self.node.as_ident()
    }

    pub fn ident_mut(&mut self) -> Option<&mut Ident> {
        self.node.as_ident_mut()
    }

    /// Put a new node at this position
    pub fn replace(&mut self, node: impl Into<Node>) {
        self.node = node.into();
        self.pruned = false;
    }

    /// Remove the node from its parent; the walker does not descend into it
    pub fn prune(&mut self) {
        self.pruned = true;
    }

    pub fn is_pruned(&self) -> bool {
        self.pruned
    }

    pub fn parent(&self) -> Parent {
        self.parent
    }

    /// The node holding this position, as it was when the walk reached it
    pub fn parent_node(&self) -> Option<&Node> {
        self.parent_node.as_ref()
    }

    pub fn slot(&self) -> Slot {
        self.slot
    }

    pub(crate) fn into_node(self) -> Node {
        self.node
    }
}
