//! Tree walk and rewrite handlers
//!
//! The walk is depth-first and pre-order. Identifiers are decoded where they
//! sit; variable, literal and transform directives are rewritten through a
//! [`NodeHandle`] and the result is written back into the tree. Containers
//! holding loop entries (statement lists, object literals, object patterns)
//! are expanded by [`repeat::walk_entries`] before their entries are walked.

use serde_json::Value;
use tracing::debug;

use crate::parser::ast::*;

use super::context::ContextStack;
use super::directive::{Directive, MARK};
use super::handle::{Field, Flow, Node, NodeHandle, NodeKind, Parent, Slot};
use super::repeat;
use super::{TemplateConfig, TemplateError};

/// Whether a walked node stays in the tree
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Fate {
    Keep,
    /// Remove from the enclosing list, or prune the parent when the field is required
    Prune,
}

type WalkResult = Result<Fate, TemplateError>;

pub(crate) struct Walker<'w> {
    stack: &'w mut ContextStack,
    config: &'w TemplateConfig,
    /// Copy of the node whose children are being walked, when one of them is a directive
    parent_node: Option<Node>,
}

impl<'w> Walker<'w> {
    pub(crate) fn new(stack: &'w mut ContextStack, config: &'w TemplateConfig) -> Self {
        Self {
            stack,
            config,
            parent_node: None,
        }
    }

    pub(crate) fn config(&self) -> &'w TemplateConfig {
        self.config
    }

    /// Every match of `path` against the whole stack
    pub(crate) fn query(&self, path: &str) -> Vec<Value> {
        self.config.query.query(path, self.stack.values())
    }

    /// First match of `path`; the empty path reads the innermost value
    fn resolve(&self, path: &str) -> Option<Value> {
        if path.is_empty() {
            return self.stack.last().cloned();
        }
        self.config.query.first(path, self.stack.values())
    }

    /// Run `f` with `item` pushed as the innermost scope value
    pub(crate) fn with_item<R>(&mut self, item: Value, f: impl FnOnce(&mut Walker<'_>) -> R) -> R {
        let config = self.config;
        let mut scope = self.stack.enter(item);
        let mut nested = Walker {
            stack: &mut *scope,
            config,
            parent_node: None,
        };
        f(&mut nested)
    }

    /// Walk the children of a node with `snapshot` as their parent node
    fn under<R>(&mut self, snapshot: Option<Node>, f: impl FnOnce(&mut Self) -> R) -> R {
        let saved = std::mem::replace(&mut self.parent_node, snapshot);
        let result = f(self);
        self.parent_node = saved;
        result
    }

    pub(crate) fn walk_program(&mut self, program: &mut Program) -> Result<(), TemplateError> {
        self.walk_statements(&mut program.body)
    }

    fn walk_statements(&mut self, body: &mut Vec<Stmt>) -> Result<(), TemplateError> {
        repeat::walk_entries(self, body)
    }

    /// Walk every item, dropping the pruned ones
    fn retain_walked<T>(
        &mut self,
        items: &mut Vec<T>,
        mut walk: impl FnMut(&mut Self, &mut T) -> WalkResult,
    ) -> Result<(), TemplateError> {
        let mut kept = Vec::with_capacity(items.len());
        for mut item in std::mem::take(items) {
            if walk(self, &mut item)? == Fate::Keep {
                kept.push(item);
            }
        }
        *items = kept;
        Ok(())
    }

    fn walk_optional_expr(
        &mut self,
        expr: &mut Option<Expr>,
        parent: Parent,
    ) -> Result<(), TemplateError> {
        if let Some(inner) = expr {
            if self.walk_expr(inner, parent)? == Fate::Prune {
                *expr = None;
            }
        }
        Ok(())
    }

    pub(crate) fn walk_stmt(&mut self, stmt: &mut Stmt) -> WalkResult {
        let snapshot = stmt_holds_directive(stmt).then(|| Node::Stmt(stmt.clone()));
        self.under(snapshot, |walker| walker.walk_stmt_children(stmt))
    }

    fn walk_stmt_children(&mut self, stmt: &mut Stmt) -> WalkResult {
        match stmt {
            Stmt::Expr(expr) => self.walk_expr(
                expr,
                Parent::new(NodeKind::ExpressionStatement, Field::Expression),
            ),
            Stmt::Var(decl) => {
                self.retain_walked(&mut decl.declarations, Self::walk_declarator)?;
                if decl.declarations.is_empty() {
                    Ok(Fate::Prune)
                } else {
                    Ok(Fate::Keep)
                }
            }
            Stmt::Function(function) => self.walk_function(function, NodeKind::FunctionDeclaration),
            Stmt::Return(argument) => {
                self.walk_optional_expr(
                    argument,
                    Parent::new(NodeKind::ReturnStatement, Field::Argument),
                )?;
                Ok(Fate::Keep)
            }
            Stmt::If {
                test,
                consequent,
                alternate,
            } => {
                if self.walk_expr(test, Parent::new(NodeKind::IfStatement, Field::Test))?
                    == Fate::Prune
                    || self.walk_stmt(consequent)? == Fate::Prune
                {
                    return Ok(Fate::Prune);
                }
                if let Some(branch) = alternate {
                    if self.walk_stmt(branch)? == Fate::Prune {
                        *alternate = None;
                    }
                }
                Ok(Fate::Keep)
            }
            Stmt::While { test, body } => {
                if self.walk_expr(test, Parent::new(NodeKind::WhileStatement, Field::Test))?
                    == Fate::Prune
                {
                    return Ok(Fate::Prune);
                }
                self.walk_stmt(body)
            }
            Stmt::DoWhile { body, test } => {
                if self.walk_stmt(body)? == Fate::Prune {
                    return Ok(Fate::Prune);
                }
                self.walk_expr(test, Parent::new(NodeKind::DoWhileStatement, Field::Test))
            }
            Stmt::For {
                init,
                test,
                update,
                body,
            } => {
                let parent = |field| Parent::new(NodeKind::ForStatement, field);
                if let Some(head) = init {
                    let pruned = match head {
                        ForHead::Var(decl) => {
                            self.retain_walked(&mut decl.declarations, Self::walk_declarator)?;
                            decl.declarations.is_empty()
                        }
                        ForHead::Expr(expr) => self.walk_expr(expr, parent(Field::Init))? == Fate::Prune,
                    };
                    if pruned {
                        *init = None;
                    }
                }
                self.walk_optional_expr(test, parent(Field::Test))?;
                self.walk_optional_expr(update, parent(Field::Update))?;
                self.walk_stmt(body)
            }
            Stmt::ForEach {
                kind,
                left,
                right,
                body,
            } => {
                let kind = match kind {
                    ForEachKind::In => NodeKind::ForInStatement,
                    ForEachKind::Of => NodeKind::ForOfStatement,
                };
                // The loop needs its binding and its iterated value
                let left_fate = match left {
                    ForHead::Var(decl) => {
                        self.retain_walked(&mut decl.declarations, Self::walk_declarator)?;
                        if decl.declarations.is_empty() {
                            Fate::Prune
                        } else {
                            Fate::Keep
                        }
                    }
                    ForHead::Expr(expr) => self.walk_expr(expr, Parent::new(kind, Field::Left))?,
                };
                if left_fate == Fate::Prune
                    || self.walk_expr(right, Parent::new(kind, Field::Right))? == Fate::Prune
                {
                    return Ok(Fate::Prune);
                }
                self.walk_stmt(body)
            }
            Stmt::Break(label) => {
                self.walk_optional_label(label, NodeKind::BreakStatement)?;
                Ok(Fate::Keep)
            }
            Stmt::Continue(label) => {
                self.walk_optional_label(label, NodeKind::ContinueStatement)?;
                Ok(Fate::Keep)
            }
            Stmt::Switch {
                discriminant,
                cases,
            } => {
                if self.walk_expr(
                    discriminant,
                    Parent::new(NodeKind::SwitchStatement, Field::Discriminant),
                )? == Fate::Prune
                {
                    return Ok(Fate::Prune);
                }
                self.retain_walked(cases, Self::walk_switch_case)?;
                Ok(Fate::Keep)
            }
            Stmt::Try {
                block,
                handler,
                finalizer,
            } => {
                self.walk_statements(block)?;
                if let Some(clause) = handler {
                    self.walk_catch_clause(clause)?;
                }
                if let Some(body) = finalizer {
                    self.walk_statements(body)?;
                }
                Ok(Fate::Keep)
            }
            Stmt::Throw(argument) => self.walk_expr(
                argument,
                Parent::new(NodeKind::ThrowStatement, Field::Argument),
            ),
            Stmt::Block(body) => {
                self.walk_statements(body)?;
                Ok(Fate::Keep)
            }
            Stmt::Labeled { label, body } => {
                if self.walk_name(label, Parent::new(NodeKind::LabeledStatement, Field::Label))?
                    == Fate::Prune
                {
                    return Ok(Fate::Prune);
                }
                self.walk_stmt(body)
            }
            Stmt::Import(decl) => {
                self.retain_walked(&mut decl.specifiers, Self::walk_import_specifier)?;
                Ok(Fate::Keep)
            }
            Stmt::Export(Export::Default(expr)) => self.walk_expr(
                expr,
                Parent::new(NodeKind::ExportDefault, Field::Declaration),
            ),
            Stmt::Export(Export::Decl(decl)) => self.walk_stmt(decl),
            Stmt::Empty => Ok(Fate::Keep),
        }
    }

    fn walk_optional_label(
        &mut self,
        label: &mut Option<Ident>,
        kind: NodeKind,
    ) -> Result<(), TemplateError> {
        if let Some(name) = label {
            if self.walk_name(name, Parent::new(kind, Field::Label))? == Fate::Prune {
                *label = None;
            }
        }
        Ok(())
    }

    /// A case without its test would turn into `default`, so it goes as a whole
    fn walk_switch_case(&mut self, case: &mut SwitchCase) -> WalkResult {
        let snapshot = marked(case.test.as_ref().and_then(expr_ident))
            .then(|| Node::SwitchCase(case.clone()));
        self.under(snapshot, |walker| -> WalkResult {
            if let Some(test) = &mut case.test {
                if walker.walk_expr(test, Parent::new(NodeKind::SwitchCase, Field::Test))?
                    == Fate::Prune
                {
                    return Ok(Fate::Prune);
                }
            }
            walker.walk_statements(&mut case.consequent)?;
            Ok(Fate::Keep)
        })
    }

    fn walk_catch_clause(&mut self, clause: &mut CatchClause) -> Result<(), TemplateError> {
        let snapshot = marked(clause.param.as_ref().and_then(pat_ident))
            .then(|| Node::CatchClause(clause.clone()));
        self.under(snapshot, |walker| -> Result<(), TemplateError> {
            if let Some(param) = &mut clause.param {
                if walker.walk_pat(param, Parent::new(NodeKind::CatchClause, Field::Param))?
                    == Fate::Prune
                {
                    clause.param = None;
                }
            }
            walker.walk_statements(&mut clause.body)
        })
    }

    fn walk_declarator(&mut self, declarator: &mut Declarator) -> WalkResult {
        let snapshot = (marked(pat_ident(&declarator.id))
            || marked(declarator.init.as_ref().and_then(expr_ident)))
        .then(|| Node::Declarator(declarator.clone()));
        self.under(snapshot, |walker| walker.walk_declarator_children(declarator))
    }

    fn walk_declarator_children(&mut self, declarator: &mut Declarator) -> WalkResult {
        if self.walk_pat(
            &mut declarator.id,
            Parent::new(NodeKind::VariableDeclarator, Field::Id),
        )? == Fate::Prune
        {
            return Ok(Fate::Prune);
        }
        self.walk_optional_expr(
            &mut declarator.init,
            Parent::new(NodeKind::VariableDeclarator, Field::Init),
        )?;
        Ok(Fate::Keep)
    }

    fn walk_import_specifier(&mut self, specifier: &mut ImportSpecifier) -> WalkResult {
        let holds = match &*specifier {
            ImportSpecifier::Default(name) | ImportSpecifier::Namespace(name) => marked(Some(name)),
            ImportSpecifier::Named { imported, local } => {
                marked(Some(imported)) || marked(Some(local))
            }
        };
        let snapshot = holds.then(|| Node::ImportSpecifier(specifier.clone()));
        self.under(snapshot, |walker| walker.walk_import_specifier_children(specifier))
    }

    fn walk_import_specifier_children(&mut self, specifier: &mut ImportSpecifier) -> WalkResult {
        let local = Parent::new(NodeKind::ImportSpecifier, Field::Local);
        match specifier {
            ImportSpecifier::Default(name) | ImportSpecifier::Namespace(name) => {
                self.walk_name(name, local)
            }
            ImportSpecifier::Named { imported, local: name } => {
                if self.walk_name(
                    imported,
                    Parent::new(NodeKind::ImportSpecifier, Field::Imported),
                )? == Fate::Prune
                {
                    return Ok(Fate::Prune);
                }
                self.walk_name(name, local)
            }
        }
    }

    fn walk_function(&mut self, function: &mut Function, kind: NodeKind) -> WalkResult {
        if let Some(id) = &mut function.id {
            if self.walk_name(id, Parent::new(kind, Field::Id))? == Fate::Prune {
                // Declarations need their name, expressions do not
                if kind == NodeKind::FunctionDeclaration {
                    return Ok(Fate::Prune);
                }
                function.id = None;
            }
        }
        self.retain_walked(&mut function.params, |walker, param| {
            walker.walk_pat(param, Parent::new(kind, Field::Params))
        })?;
        self.walk_statements(&mut function.body)?;
        Ok(Fate::Keep)
    }

    pub(crate) fn walk_object_member(&mut self, member: &mut ObjectMember) -> WalkResult {
        let holds = match &*member {
            ObjectMember::Prop(prop) => {
                marked(prop_key_ident(&prop.key)) || marked(expr_ident(&prop.value))
            }
            ObjectMember::Spread(argument) => marked(expr_ident(argument)),
        };
        let snapshot = holds.then(|| Node::ObjectMember(member.clone()));
        self.under(snapshot, |walker| walker.walk_object_member_children(member))
    }

    fn walk_object_member_children(&mut self, member: &mut ObjectMember) -> WalkResult {
        match member {
            ObjectMember::Prop(prop) => {
                if self.walk_prop_key(&mut prop.key)? == Fate::Prune {
                    return Ok(Fate::Prune);
                }
                self.walk_expr(
                    &mut prop.value,
                    Parent::new(NodeKind::Property, Field::Value),
                )
            }
            ObjectMember::Spread(argument) => self.walk_expr(
                argument,
                Parent::new(NodeKind::SpreadElement, Field::Argument),
            ),
        }
    }

    pub(crate) fn walk_pat_member(&mut self, member: &mut PatMember) -> WalkResult {
        let holds = match &*member {
            PatMember::Prop(prop) => marked(prop_key_ident(&prop.key)) || marked(pat_ident(&prop.value)),
            PatMember::Rest(argument) => marked(pat_ident(argument)),
        };
        let snapshot = holds.then(|| Node::PatMember(member.clone()));
        self.under(snapshot, |walker| walker.walk_pat_member_children(member))
    }

    fn walk_pat_member_children(&mut self, member: &mut PatMember) -> WalkResult {
        match member {
            PatMember::Prop(prop) => {
                if self.walk_prop_key(&mut prop.key)? == Fate::Prune {
                    return Ok(Fate::Prune);
                }
                self.walk_pat(
                    &mut prop.value,
                    Parent::new(NodeKind::Property, Field::Value),
                )
            }
            PatMember::Rest(argument) => self.walk_pat(
                argument,
                Parent::new(NodeKind::RestElement, Field::Argument),
            ),
        }
    }

    fn walk_prop_key(&mut self, key: &mut PropKey) -> WalkResult {
        let parent = Parent::new(NodeKind::Property, Field::Key);
        match key {
            PropKey::Ident(name) => self.walk_name(name, parent),
            PropKey::Computed(expr) => self.walk_expr(expr, parent),
            PropKey::Str(_) | PropKey::Num(_) => Ok(Fate::Keep),
        }
    }

    fn walk_required_pair(
        &mut self,
        (left, left_parent): (&mut Expr, Parent),
        (right, right_parent): (&mut Expr, Parent),
    ) -> WalkResult {
        if self.walk_expr(left, left_parent)? == Fate::Prune {
            return Ok(Fate::Prune);
        }
        self.walk_expr(right, right_parent)
    }

    fn walk_call(
        &mut self,
        callee: &mut Expr,
        arguments: &mut Vec<Expr>,
        kind: NodeKind,
    ) -> WalkResult {
        if self.walk_expr(callee, Parent::new(kind, Field::Callee))? == Fate::Prune {
            return Ok(Fate::Prune);
        }
        self.retain_walked(arguments, |walker, argument| {
            walker.walk_expr(argument, Parent::new(kind, Field::Arguments))
        })?;
        Ok(Fate::Keep)
    }

    pub(crate) fn walk_expr(&mut self, expr: &mut Expr, parent: Parent) -> WalkResult {
        let directive = match &*expr {
            Expr::Ident(ident) => Directive::decode(&ident.name),
            _ => None,
        };
        if let Some(directive) = directive {
            let Some((handle, flow)) =
                self.dispatch(Node::Expr(expr.clone()), &directive, parent, Slot::Expression)?
            else {
                return Ok(Fate::Keep);
            };
            if handle.is_pruned() {
                return Ok(Fate::Prune);
            }
            *expr = handle.into_node().into_expr()?;
            // Renamed identifiers are final; anything else may hold more directives
            if flow == Flow::Continue && !matches!(expr, Expr::Ident(_)) {
                return self.walk_expr(expr, parent);
            }
            return Ok(Fate::Keep);
        }

        let snapshot = expr_holds_directive(expr).then(|| Node::Expr(expr.clone()));
        self.under(snapshot, |walker| walker.walk_expr_children(expr))
    }

    fn walk_expr_children(&mut self, expr: &mut Expr) -> WalkResult {
        match expr {
            Expr::Ident(_) | Expr::Lit(_) | Expr::This => Ok(Fate::Keep),
            Expr::Array(elements) => {
                self.retain_walked(elements, |walker, element| {
                    walker.walk_expr(
                        element,
                        Parent::new(NodeKind::ArrayExpression, Field::Elements),
                    )
                })?;
                Ok(Fate::Keep)
            }
            Expr::Object(members) => {
                repeat::walk_entries(self, members)?;
                Ok(Fate::Keep)
            }
            Expr::Function(function) => self.walk_function(function, NodeKind::FunctionExpression),
            Expr::Arrow(arrow) => {
                self.retain_walked(&mut arrow.params, |walker, param| {
                    walker.walk_pat(param, Parent::new(NodeKind::ArrowFunction, Field::Params))
                })?;
                match &mut arrow.body {
                    ArrowBody::Expr(body) => {
                        self.walk_expr(body, Parent::new(NodeKind::ArrowFunction, Field::Body))
                    }
                    ArrowBody::Block(body) => {
                        self.walk_statements(body)?;
                        Ok(Fate::Keep)
                    }
                }
            }
            Expr::Member { object, property } => {
                if self.walk_expr(
                    object,
                    Parent::new(NodeKind::MemberExpression, Field::Object),
                )? == Fate::Prune
                {
                    return Ok(Fate::Prune);
                }
                let parent = Parent::new(NodeKind::MemberExpression, Field::Property);
                match property {
                    MemberProp::Ident(name) => self.walk_name(name, parent),
                    MemberProp::Computed(index) => self.walk_expr(index, parent),
                }
            }
            Expr::Call { callee, arguments } => {
                self.walk_call(callee, arguments, NodeKind::CallExpression)
            }
            Expr::New { callee, arguments } => {
                self.walk_call(callee, arguments, NodeKind::NewExpression)
            }
            Expr::Unary { argument, .. } => self.walk_expr(
                argument,
                Parent::new(NodeKind::UnaryExpression, Field::Argument),
            ),
            Expr::Update { argument, .. } => self.walk_expr(
                argument,
                Parent::new(NodeKind::UpdateExpression, Field::Argument),
            ),
            Expr::Binary { left, right, .. } => self.walk_required_pair(
                (left.as_mut(), Parent::new(NodeKind::BinaryExpression, Field::Left)),
                (right.as_mut(), Parent::new(NodeKind::BinaryExpression, Field::Right)),
            ),
            Expr::Assign { target, value, .. } => self.walk_required_pair(
                (target.as_mut(), Parent::new(NodeKind::AssignmentExpression, Field::Left)),
                (value.as_mut(), Parent::new(NodeKind::AssignmentExpression, Field::Right)),
            ),
            Expr::Conditional {
                test,
                consequent,
                alternate,
            } => {
                let parent = |field| Parent::new(NodeKind::ConditionalExpression, field);
                if self.walk_expr(test, parent(Field::Test))? == Fate::Prune {
                    return Ok(Fate::Prune);
                }
                self.walk_required_pair(
                    (consequent.as_mut(), parent(Field::Consequent)),
                    (alternate.as_mut(), parent(Field::Alternate)),
                )
            }
            Expr::Spread(argument) => self.walk_expr(
                argument,
                Parent::new(NodeKind::SpreadElement, Field::Argument),
            ),
            Expr::Sequence(expressions) => {
                self.retain_walked(expressions, |walker, item| {
                    walker.walk_expr(
                        item,
                        Parent::new(NodeKind::SequenceExpression, Field::Expressions),
                    )
                })?;
                if expressions.is_empty() {
                    Ok(Fate::Prune)
                } else {
                    Ok(Fate::Keep)
                }
            }
        }
    }

    fn walk_pat(&mut self, pat: &mut Pat, parent: Parent) -> WalkResult {
        let directive = match &*pat {
            Pat::Ident(ident) => Directive::decode(&ident.name),
            _ => None,
        };
        if let Some(directive) = directive {
            let Some((handle, flow)) =
                self.dispatch(Node::Pat(pat.clone()), &directive, parent, Slot::Binding)?
            else {
                return Ok(Fate::Keep);
            };
            if handle.is_pruned() {
                return Ok(Fate::Prune);
            }
            *pat = handle.into_node().into_pat()?;
            if flow == Flow::Continue && !matches!(pat, Pat::Ident(_)) {
                return self.walk_pat(pat, parent);
            }
            return Ok(Fate::Keep);
        }

        let snapshot = pat_holds_directive(pat).then(|| Node::Pat(pat.clone()));
        self.under(snapshot, |walker| walker.walk_pat_children(pat))
    }

    fn walk_pat_children(&mut self, pat: &mut Pat) -> WalkResult {
        match pat {
            Pat::Ident(_) => Ok(Fate::Keep),
            Pat::Object(members) => {
                repeat::walk_entries(self, members)?;
                Ok(Fate::Keep)
            }
            Pat::Array(elements) => {
                self.retain_walked(elements, |walker, element| {
                    walker.walk_pat(
                        element,
                        Parent::new(NodeKind::ArrayPattern, Field::Elements),
                    )
                })?;
                Ok(Fate::Keep)
            }
            Pat::Assign { left, right } => {
                if self.walk_pat(left, Parent::new(NodeKind::AssignmentPattern, Field::Left))?
                    == Fate::Prune
                {
                    return Ok(Fate::Prune);
                }
                if self.walk_expr(right, Parent::new(NodeKind::AssignmentPattern, Field::Right))?
                    == Fate::Prune
                {
                    // Without its default the pattern is just the binding
                    let bare = std::mem::replace(left.as_mut(), Pat::Array(Vec::new()));
                    *pat = bare;
                }
                Ok(Fate::Keep)
            }
            Pat::Rest(argument) => self.walk_pat(
                argument,
                Parent::new(NodeKind::RestElement, Field::Argument),
            ),
        }
    }

    /// Identifier in a name position (declaration names, keys, member properties, labels)
    fn walk_name(&mut self, ident: &mut Ident, parent: Parent) -> WalkResult {
        let Some(directive) = Directive::decode(&ident.name) else {
            return Ok(Fate::Keep);
        };
        let Some((handle, _)) =
            self.dispatch(Node::Ident(ident.clone()), &directive, parent, Slot::Name)?
        else {
            return Ok(Fate::Keep);
        };
        if handle.is_pruned() {
            return Ok(Fate::Prune);
        }
        *ident = handle.into_node().into_ident()?;
        Ok(Fate::Keep)
    }

    /// Run the handler for an identifier directive.
    ///
    /// Loop directives only expand at entry positions, so they are left alone here.
    fn dispatch(
        &mut self,
        node: Node,
        directive: &Directive,
        parent: Parent,
        slot: Slot,
    ) -> Result<Option<(NodeHandle, Flow)>, TemplateError> {
        if let Directive::Loop(_) = directive {
            return Ok(None);
        }

        let (raw, span) = match node.as_ident() {
            Some(ident) => (ident.name.clone(), ident.span.clone()),
            None => (directive.encode(), None),
        };
        debug!(
            directive = %raw,
            kind = directive.kind(),
            span = ?span,
            parent = %parent.kind,
            "found directive"
        );

        let mut handle =
            NodeHandle::new(node, parent, slot).with_parent_node(self.parent_node.clone());
        let flow = match directive {
            Directive::Variable { path, filters } => {
                self.rename(&mut handle, &raw, path, filters)?
            }
            Directive::Literal { path, filters } => {
                self.literal(&mut handle, &raw, path, filters)?
            }
            Directive::Transform { name, path } => {
                self.transform(&mut handle, name, path.as_deref())?
            }
            Directive::Loop(_) => Flow::Continue,
        };

        Ok(Some((handle, flow)))
    }

    /// Variable directive: rename the identifier
    fn rename(
        &mut self,
        handle: &mut NodeHandle,
        raw: &str,
        path: &str,
        filters: &[String],
    ) -> Result<Flow, TemplateError> {
        let value = self
            .resolve(path)
            .filter(is_truthy)
            .ok_or_else(|| TemplateError::NoName {
                directive: raw.to_string(),
                path: path.to_string(),
            })?;
        let name = value_to_name(&self.config.filters.apply(filters, value)?)?;

        if let Some(ident) = handle.ident_mut() {
            ident.name = name;
        }
        Ok(Flow::Continue)
    }

    /// Literal directive: replace the identifier with a literal of the value
    fn literal(
        &mut self,
        handle: &mut NodeHandle,
        raw: &str,
        path: &str,
        filters: &[String],
    ) -> Result<Flow, TemplateError> {
        let value = self.resolve(path).unwrap_or(Value::Null);
        let value = self.config.filters.apply(filters, value)?;

        // Names, keys, member properties and bindings cannot hold literals
        if handle.slot() != Slot::Expression {
            let parent = handle.parent();
            return Err(TemplateError::BadLiteral {
                directive: raw.to_string(),
                kind: parent.kind,
                field: parent.field,
            });
        }

        if is_truthy(&value) {
            handle.replace(value_to_expr(&value));
        } else {
            handle.replace(Expr::undefined_sentinel());
        }
        Ok(Flow::Continue)
    }

    /// Transform directive: hand the node to the registered transformation
    fn transform(
        &mut self,
        handle: &mut NodeHandle,
        name: &str,
        path: Option<&str>,
    ) -> Result<Flow, TemplateError> {
        let values = match path {
            Some(path) => self.query(path),
            None => self.stack.values().to_vec(),
        };
        self.config.transformations.invoke(name, handle, &values)
    }
}

fn marked(ident: Option<&Ident>) -> bool {
    ident.map_or(false, |ident| ident.name.contains(MARK))
}

fn expr_ident(expr: &Expr) -> Option<&Ident> {
    match expr {
        Expr::Ident(ident) => Some(ident),
        _ => None,
    }
}

fn pat_ident(pat: &Pat) -> Option<&Ident> {
    match pat {
        Pat::Ident(ident) => Some(ident),
        _ => None,
    }
}

fn prop_key_ident(key: &PropKey) -> Option<&Ident> {
    match key {
        PropKey::Ident(ident) => Some(ident),
        PropKey::Computed(expr) => expr_ident(expr),
        PropKey::Str(_) | PropKey::Num(_) => None,
    }
}

fn function_holds_directive(function: &Function) -> bool {
    marked(function.id.as_ref()) || function.params.iter().any(|p| marked(pat_ident(p)))
}

// Whether a node has a directive among its direct children. Only those
// nodes are copied for their children's handles.

fn stmt_holds_directive(stmt: &Stmt) -> bool {
    match stmt {
        Stmt::Expr(expr) | Stmt::Throw(expr) | Stmt::Export(Export::Default(expr)) => {
            marked(expr_ident(expr))
        }
        Stmt::Return(argument) => marked(argument.as_ref().and_then(expr_ident)),
        Stmt::If { test, .. } | Stmt::While { test, .. } | Stmt::DoWhile { test, .. } => {
            marked(expr_ident(test))
        }
        Stmt::Function(function) => function_holds_directive(function),
        Stmt::For {
            init, test, update, ..
        } => {
            let init = match init {
                Some(ForHead::Expr(expr)) => Some(expr),
                _ => None,
            };
            [init, test.as_ref(), update.as_ref()]
                .into_iter()
                .any(|part| marked(part.and_then(expr_ident)))
        }
        Stmt::ForEach { left, right, .. } => {
            matches!(left, ForHead::Expr(expr) if marked(expr_ident(expr)))
                || marked(expr_ident(right))
        }
        Stmt::Break(label) | Stmt::Continue(label) => marked(label.as_ref()),
        Stmt::Labeled { label, .. } => marked(Some(label)),
        Stmt::Switch { discriminant, .. } => marked(expr_ident(discriminant)),
        Stmt::Var(_)
        | Stmt::Try { .. }
        | Stmt::Block(_)
        | Stmt::Import(_)
        | Stmt::Export(Export::Decl(_))
        | Stmt::Empty => false,
    }
}

fn expr_holds_directive(expr: &Expr) -> bool {
    let any = |items: &[Expr]| items.iter().any(|item| marked(expr_ident(item)));
    match expr {
        Expr::Ident(_) | Expr::Lit(_) | Expr::This | Expr::Object(_) => false,
        Expr::Array(items) | Expr::Sequence(items) => any(items),
        Expr::Function(function) => function_holds_directive(function),
        Expr::Arrow(arrow) => {
            arrow.params.iter().any(|p| marked(pat_ident(p)))
                || matches!(&arrow.body, ArrowBody::Expr(body) if marked(expr_ident(body)))
        }
        Expr::Member { object, property } => {
            marked(expr_ident(object))
                || match property {
                    MemberProp::Ident(name) => marked(Some(name)),
                    MemberProp::Computed(index) => marked(expr_ident(index)),
                }
        }
        Expr::Call { callee, arguments } | Expr::New { callee, arguments } => {
            marked(expr_ident(callee)) || any(arguments)
        }
        Expr::Unary { argument, .. } | Expr::Update { argument, .. } | Expr::Spread(argument) => {
            marked(expr_ident(argument))
        }
        Expr::Binary { left, right, .. } => marked(expr_ident(left)) || marked(expr_ident(right)),
        Expr::Assign { target, value, .. } => {
            marked(expr_ident(target)) || marked(expr_ident(value))
        }
        Expr::Conditional {
            test,
            consequent,
            alternate,
        } => [test, consequent, alternate]
            .into_iter()
            .any(|part| marked(expr_ident(part))),
    }
}

fn pat_holds_directive(pat: &Pat) -> bool {
    match pat {
        Pat::Ident(_) | Pat::Object(_) => false,
        Pat::Array(elements) => elements.iter().any(|e| marked(pat_ident(e))),
        Pat::Assign { left, right } => marked(pat_ident(left)) || marked(expr_ident(right)),
        Pat::Rest(argument) => marked(pat_ident(argument)),
    }
}

/// JavaScript truthiness
pub(crate) fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map_or(false, |f| f != 0.0 && !f.is_nan()),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

/// Identifier spelling of a scalar value
pub(crate) fn value_to_name(value: &Value) -> Result<String, TemplateError> {
    match value {
        Value::String(s) => Ok(s.clone()),
        Value::Number(n) => Ok(n.to_string()),
        Value::Bool(b) => Ok(b.to_string()),
        other => Err(TemplateError::BadName {
            value: other.to_string(),
        }),
    }
}

/// Literal expression for a data value
pub(crate) fn value_to_expr(value: &Value) -> Expr {
    match value {
        Value::Null => Expr::Lit(Lit::Null),
        Value::Bool(b) => Expr::Lit(Lit::Bool(*b)),
        Value::Number(n) => Expr::number(n.as_f64().unwrap_or_default()),
        Value::String(s) => Expr::string(s.as_str()),
        Value::Array(items) => Expr::Array(items.iter().map(value_to_expr).collect()),
        Value::Object(map) => Expr::Object(
            map.iter()
                .map(|(key, value)| {
                    ObjectMember::Prop(Prop {
                        key: property_key(key),
                        value: value_to_expr(value),
                        shorthand: false,
                        method: false,
                    })
                })
                .collect(),
        ),
    }
}

fn property_key(key: &str) -> PropKey {
    let mut chars = key.chars();
    let is_identifier = chars
        .next()
        .map_or(false, |c| c.is_alphabetic() || c == '_' || c == '$')
        && chars.all(|c| c.is_alphanumeric() || c == '_' || c == '$');
    if is_identifier {
        PropKey::Ident(Ident::new(key))
    } else {
        PropKey::Str(key.to_string())
    }
}
