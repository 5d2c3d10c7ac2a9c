//! Pretty printing of syntax trees

use crate::parser::ast::*;

use super::PrinterConfig;

// Binding power of printed expressions, higher binds tighter
const PREC_SEQUENCE: u8 = 0;
const PREC_ASSIGN: u8 = 1;
const PREC_CONDITIONAL: u8 = 2;
const PREC_EXPONENT: u8 = 13;
const PREC_UNARY: u8 = 14;
const PREC_UPDATE: u8 = 15;
const PREC_POSTFIX: u8 = 16;
const PREC_PRIMARY: u8 = 17;

/// Print a program with the given configuration
pub fn print(program: &Program, config: &PrinterConfig) -> String {
    SourcePrinter::new(config).program(program)
}

/// Builds source text for one tree.
///
/// Every printing method returns text whose first line is unindented and
/// whose following lines are indented absolutely for the given depth, so
/// callers only indent the first line.
pub struct SourcePrinter<'c> {
    config: &'c PrinterConfig,
}

impl<'c> SourcePrinter<'c> {
    pub fn new(config: &'c PrinterConfig) -> Self {
        Self { config }
    }

    fn indent(&self, depth: usize) -> String {
        " ".repeat(self.config.tab_width * depth)
    }

    pub fn program(&self, program: &Program) -> String {
        self.statements(&program.body, 0)
    }

    /// Statements one per line; multi-line statements get a blank line around them
    fn statements(&self, body: &[Stmt], depth: usize) -> String {
        let indent = self.indent(depth);
        let mut out = String::new();
        let mut previous_multiline: Option<bool> = None;

        for stmt in body {
            let text = self.stmt(stmt, depth);
            let multiline = text.contains('\n');
            match previous_multiline {
                Some(prev) if prev || multiline => out.push_str("\n\n"),
                Some(_) => out.push('\n'),
                None => {}
            }
            out.push_str(&indent);
            out.push_str(&text);
            previous_multiline = Some(multiline);
        }

        out
    }

    fn block(&self, body: &[Stmt], depth: usize) -> String {
        if body.is_empty() {
            return "{}".to_string();
        }
        format!(
            "{{\n{}\n{}}}",
            self.statements(body, depth + 1),
            self.indent(depth)
        )
    }

    fn stmt(&self, stmt: &Stmt, depth: usize) -> String {
        match stmt {
            Stmt::Expr(expr) => {
                let text = self.expr(expr, depth);
                // A leading `{` or `function` would re-parse as a statement
                if text.starts_with('{')
                    || text.starts_with("function ")
                    || text.starts_with("function(")
                {
                    format!("({});", text)
                } else {
                    format!("{};", text)
                }
            }
            Stmt::Var(decl) => format!("{};", self.var_decl(decl, depth)),
            Stmt::Function(function) => self.function(function, depth),
            Stmt::Return(None) => "return;".to_string(),
            Stmt::Return(Some(argument)) => {
                format!("return {};", self.expr_at(argument, PREC_SEQUENCE, depth))
            }
            Stmt::If {
                test,
                consequent,
                alternate,
            } => {
                let mut out = format!(
                    "if ({}){}",
                    self.expr(test, depth),
                    self.body_stmt(consequent, depth)
                );
                if let Some(alternate) = alternate {
                    if matches!(**consequent, Stmt::Block(_)) {
                        out.push_str(" else");
                    } else {
                        out.push('\n');
                        out.push_str(&self.indent(depth));
                        out.push_str("else");
                    }
                    match **alternate {
                        Stmt::If { .. } => {
                            out.push(' ');
                            out.push_str(&self.stmt(alternate, depth));
                        }
                        _ => out.push_str(&self.body_stmt(alternate, depth)),
                    }
                }
                out
            }
            Stmt::While { test, body } => {
                format!(
                    "while ({}){}",
                    self.expr(test, depth),
                    self.body_stmt(body, depth)
                )
            }
            Stmt::DoWhile { body, test } => {
                let test = self.expr(test, depth);
                match body.as_ref() {
                    Stmt::Block(block) => {
                        format!("do {} while ({});", self.block(block, depth), test)
                    }
                    other => format!(
                        "do{}\n{}while ({});",
                        self.body_stmt(other, depth),
                        self.indent(depth),
                        test
                    ),
                }
            }
            Stmt::For {
                init,
                test,
                update,
                body,
            } => {
                let mut head = match init {
                    Some(init) => self.for_head(init, depth),
                    None => String::new(),
                };
                for part in [test, update] {
                    head.push(';');
                    if let Some(part) = part {
                        head.push(' ');
                        head.push_str(&self.expr(part, depth));
                    }
                }
                format!("for ({}){}", head, self.body_stmt(body, depth))
            }
            Stmt::ForEach {
                kind,
                left,
                right,
                body,
            } => format!(
                "for ({} {} {}){}",
                self.for_head(left, depth),
                kind.as_str(),
                self.expr_at(right, PREC_ASSIGN, depth),
                self.body_stmt(body, depth)
            ),
            Stmt::Break(None) => "break;".to_string(),
            Stmt::Break(Some(label)) => format!("break {};", label),
            Stmt::Continue(None) => "continue;".to_string(),
            Stmt::Continue(Some(label)) => format!("continue {};", label),
            Stmt::Switch {
                discriminant,
                cases,
            } => {
                let discriminant = self.expr(discriminant, depth);
                if cases.is_empty() {
                    return format!("switch ({}) {{}}", discriminant);
                }
                let inner = self.indent(depth + 1);
                let cases = cases
                    .iter()
                    .map(|case| {
                        let mut out = match &case.test {
                            Some(test) => format!("{}case {}:", inner, self.expr(test, depth + 1)),
                            None => format!("{}default:", inner),
                        };
                        if !case.consequent.is_empty() {
                            out.push('\n');
                            out.push_str(&self.statements(&case.consequent, depth + 2));
                        }
                        out
                    })
                    .collect::<Vec<_>>()
                    .join("\n");
                format!(
                    "switch ({}) {{\n{}\n{}}}",
                    discriminant,
                    cases,
                    self.indent(depth)
                )
            }
            Stmt::Try {
                block,
                handler,
                finalizer,
            } => {
                let mut out = format!("try {}", self.block(block, depth));
                if let Some(handler) = handler {
                    out.push_str(" catch ");
                    if let Some(param) = &handler.param {
                        out.push_str(&format!("({}) ", self.pat(param, depth)));
                    }
                    out.push_str(&self.block(&handler.body, depth));
                }
                if let Some(finalizer) = finalizer {
                    out.push_str(" finally ");
                    out.push_str(&self.block(finalizer, depth));
                }
                out
            }
            Stmt::Throw(argument) => {
                format!("throw {};", self.expr_at(argument, PREC_SEQUENCE, depth))
            }
            Stmt::Block(body) => self.block(body, depth),
            Stmt::Labeled { label, body } => {
                format!("{}: {}", label, self.stmt(body, depth))
            }
            Stmt::Import(decl) => self.import(decl),
            Stmt::Export(Export::Default(expr)) => {
                format!("export default {};", self.expr_at(expr, PREC_ASSIGN, depth))
            }
            Stmt::Export(Export::Decl(decl)) => format!("export {}", self.stmt(decl, depth)),
            Stmt::Empty => ";".to_string(),
        }
    }

    fn for_head(&self, head: &ForHead, depth: usize) -> String {
        match head {
            ForHead::Var(decl) => self.var_decl(decl, depth),
            ForHead::Expr(expr) => self.expr(expr, depth),
        }
    }

    /// Body of `if` and loops: blocks stay on the same line, other statements move to the next
    fn body_stmt(&self, stmt: &Stmt, depth: usize) -> String {
        match stmt {
            Stmt::Block(body) => format!(" {}", self.block(body, depth)),
            other => format!(
                "\n{}{}",
                self.indent(depth + 1),
                self.stmt(other, depth + 1)
            ),
        }
    }

    fn var_decl(&self, decl: &VarDecl, depth: usize) -> String {
        let declarations = decl
            .declarations
            .iter()
            .map(|d| match &d.init {
                Some(init) => format!(
                    "{} = {}",
                    self.pat(&d.id, depth),
                    self.expr_at(init, PREC_ASSIGN, depth)
                ),
                None => self.pat(&d.id, depth),
            })
            .collect::<Vec<_>>()
            .join(", ");
        format!("{} {}", decl.kind.as_str(), declarations)
    }

    fn function(&self, function: &Function, depth: usize) -> String {
        let name = match &function.id {
            Some(id) => format!(" {}", id),
            None => String::new(),
        };
        format!(
            "function{}{} {}",
            name,
            self.params(&function.params, depth),
            self.block(&function.body, depth)
        )
    }

    /// Parameter list; one parameter per line when any of them spans several lines
    fn params(&self, params: &[Pat], depth: usize) -> String {
        let printed: Vec<String> = params.iter().map(|p| self.pat(p, depth + 1)).collect();
        if printed.iter().any(|p| p.contains('\n')) {
            let inner = self.indent(depth + 1);
            let lines = printed
                .iter()
                .map(|p| format!("{}{}", inner, p))
                .collect::<Vec<_>>()
                .join(",\n");
            format!("(\n{}\n{})", lines, self.indent(depth))
        } else {
            format!("({})", printed.join(", "))
        }
    }

    fn import(&self, decl: &ImportDecl) -> String {
        let source = self.string(&decl.source);
        if decl.specifiers.is_empty() {
            return format!("import {};", source);
        }

        let mut parts = Vec::new();
        let mut named = Vec::new();
        for specifier in &decl.specifiers {
            match specifier {
                ImportSpecifier::Default(local) => parts.push(local.to_string()),
                ImportSpecifier::Namespace(local) => parts.push(format!("* as {}", local)),
                ImportSpecifier::Named { imported, local } if imported == local => {
                    named.push(local.to_string())
                }
                ImportSpecifier::Named { imported, local } => {
                    named.push(format!("{} as {}", imported, local))
                }
            }
        }
        if !named.is_empty() {
            parts.push(format!("{{ {} }}", named.join(", ")));
        }

        format!("import {} from {};", parts.join(", "), source)
    }

    fn pat(&self, pat: &Pat, depth: usize) -> String {
        match pat {
            Pat::Ident(id) => id.to_string(),
            Pat::Object(members) => {
                let printed = members
                    .iter()
                    .map(|member| match member {
                        PatMember::Prop(prop) => self.pat_prop(prop, depth + 1),
                        PatMember::Rest(rest) => format!("...{}", self.pat(rest, depth + 1)),
                    })
                    .collect::<Vec<_>>();
                self.multiline_members(printed, depth)
            }
            Pat::Array(elements) => format!(
                "[{}]",
                elements
                    .iter()
                    .map(|e| self.pat(e, depth))
                    .collect::<Vec<_>>()
                    .join(", ")
            ),
            Pat::Assign { left, right } => format!(
                "{} = {}",
                self.pat(left, depth),
                self.expr_at(right, PREC_ASSIGN, depth)
            ),
            Pat::Rest(argument) => format!("...{}", self.pat(argument, depth)),
        }
    }

    fn pat_prop(&self, prop: &PatProp, depth: usize) -> String {
        if prop.shorthand {
            match (&prop.key, &prop.value) {
                (PropKey::Ident(key), Pat::Ident(value)) if key == value => {
                    return key.to_string();
                }
                (PropKey::Ident(key), Pat::Assign { left, right }) => {
                    if let Pat::Ident(value) = left.as_ref() {
                        if key == value {
                            return format!(
                                "{} = {}",
                                key,
                                self.expr_at(right, PREC_ASSIGN, depth)
                            );
                        }
                    }
                }
                _ => {}
            }
        }
        format!(
            "{}: {}",
            self.prop_key(&prop.key, depth),
            self.pat(&prop.value, depth)
        )
    }

    /// Object literal and object pattern body: `{}` or one member per line
    fn multiline_members(&self, printed: Vec<String>, depth: usize) -> String {
        if printed.is_empty() {
            return "{}".to_string();
        }
        let inner = self.indent(depth + 1);
        let lines = printed
            .iter()
            .map(|m| format!("{}{}", inner, m))
            .collect::<Vec<_>>()
            .join(",\n");
        format!("{{\n{}\n{}}}", lines, self.indent(depth))
    }

    fn prop_key(&self, key: &PropKey, depth: usize) -> String {
        match key {
            PropKey::Ident(id) => id.to_string(),
            PropKey::Str(s) => self.string(s),
            PropKey::Num(n) => number(*n),
            PropKey::Computed(expr) => format!("[{}]", self.expr_at(expr, PREC_ASSIGN, depth)),
        }
    }

    fn prop(&self, prop: &Prop, depth: usize) -> String {
        if prop.method {
            if let Expr::Function(function) = &prop.value {
                return format!(
                    "{}{} {}",
                    self.prop_key(&prop.key, depth),
                    self.params(&function.params, depth),
                    self.block(&function.body, depth)
                );
            }
        }
        if prop.shorthand {
            if let (PropKey::Ident(key), Expr::Ident(value)) = (&prop.key, &prop.value) {
                if key == value {
                    return key.to_string();
                }
            }
        }
        format!(
            "{}: {}",
            self.prop_key(&prop.key, depth),
            self.expr_at(&prop.value, PREC_ASSIGN, depth)
        )
    }

    pub fn expr(&self, expr: &Expr, depth: usize) -> String {
        match expr {
            Expr::Ident(id) => id.to_string(),
            Expr::Lit(lit) => self.lit(lit),
            Expr::This => "this".to_string(),
            Expr::Array(elements) => format!("[{}]", self.list(elements, depth)),
            Expr::Object(members) => {
                let printed = members
                    .iter()
                    .map(|member| match member {
                        ObjectMember::Prop(prop) => self.prop(prop, depth + 1),
                        ObjectMember::Spread(argument) => {
                            format!("...{}", self.expr_at(argument, PREC_ASSIGN, depth + 1))
                        }
                    })
                    .collect::<Vec<_>>();
                self.multiline_members(printed, depth)
            }
            Expr::Function(function) => self.function(function, depth),
            Expr::Arrow(arrow) => {
                let params = match arrow.params.as_slice() {
                    [Pat::Ident(id)] => id.to_string(),
                    params => self.params(params, depth),
                };
                let body = match &arrow.body {
                    ArrowBody::Block(body) => self.block(body, depth),
                    ArrowBody::Expr(body) => {
                        let text = self.expr_at(body, PREC_ASSIGN, depth);
                        if text.starts_with('{') {
                            format!("({})", text)
                        } else {
                            text
                        }
                    }
                };
                format!("{} => {}", params, body)
            }
            Expr::Member { object, property } => {
                let is_number = matches!(**object, Expr::Lit(Lit::Num(_)));
                let object = self.expr_at(object, PREC_POSTFIX, depth);
                match property {
                    // `1.x` would read as a malformed number
                    MemberProp::Ident(name) if is_number && object.bytes().all(|b| b.is_ascii_digit()) => {
                        format!("({}).{}", object, name)
                    }
                    MemberProp::Ident(name) => format!("{}.{}", object, name),
                    MemberProp::Computed(index) => {
                        format!("{}[{}]", object, self.expr_at(index, PREC_ASSIGN, depth))
                    }
                }
            }
            Expr::Call { callee, arguments } => format!(
                "{}({})",
                self.expr_at(callee, PREC_POSTFIX, depth),
                self.list(arguments, depth)
            ),
            Expr::New { callee, arguments } => {
                // `new a()()` would call the result; keep calls inside the callee wrapped
                let callee_text = if matches!(**callee, Expr::Call { .. }) {
                    format!("({})", self.expr(callee, depth))
                } else {
                    self.expr_at(callee, PREC_POSTFIX, depth)
                };
                format!("new {}({})", callee_text, self.list(arguments, depth))
            }
            Expr::Unary { op, argument } => {
                let argument = self.expr_at(argument, PREC_UNARY, depth);
                if op.is_keyword() {
                    format!("{} {}", op.as_str(), argument)
                } else if matches!(
                    (op, argument.chars().next()),
                    (UnaryOp::Minus, Some('-')) | (UnaryOp::Plus, Some('+'))
                ) {
                    format!("{} {}", op.as_str(), argument)
                } else {
                    format!("{}{}", op.as_str(), argument)
                }
            }
            Expr::Update {
                op,
                prefix: true,
                argument,
            } => format!("{}{}", op.as_str(), self.expr_at(argument, PREC_POSTFIX, depth)),
            Expr::Update { op, argument, .. } => {
                format!("{}{}", self.expr_at(argument, PREC_POSTFIX, depth), op.as_str())
            }
            Expr::Binary { op, left, right } => {
                // `**` groups to the right and takes no unary left operand
                let (left_min, right_min) = match op {
                    BinaryOp::Exp => (PREC_UPDATE, PREC_EXPONENT),
                    _ => (op.precedence(), op.precedence() + 1),
                };
                format!(
                    "{} {} {}",
                    self.operand(left, *op, left_min, depth),
                    op.as_str(),
                    self.operand(right, *op, right_min, depth)
                )
            }
            Expr::Assign { op, target, value } => format!(
                "{} {} {}",
                self.expr_at(target, PREC_CONDITIONAL + 1, depth),
                op.as_str(),
                self.expr_at(value, PREC_ASSIGN, depth)
            ),
            Expr::Conditional {
                test,
                consequent,
                alternate,
            } => format!(
                "{} ? {} : {}",
                self.expr_at(test, PREC_CONDITIONAL + 1, depth),
                self.expr_at(consequent, PREC_ASSIGN, depth),
                self.expr_at(alternate, PREC_ASSIGN, depth)
            ),
            Expr::Spread(argument) => {
                format!("...{}", self.expr_at(argument, PREC_ASSIGN, depth))
            }
            Expr::Sequence(expressions) => expressions
                .iter()
                .map(|e| self.expr_at(e, PREC_ASSIGN, depth))
                .collect::<Vec<_>>()
                .join(", "),
        }
    }

    /// Operand of a binary operator; `??` mixed with `&&` or `||` always gets parentheses
    fn operand(&self, operand: &Expr, parent: BinaryOp, min: u8, depth: usize) -> String {
        match operand {
            Expr::Binary { op, .. } if op.mixes_with(parent) => {
                format!("({})", self.expr(operand, depth))
            }
            _ => self.expr_at(operand, min, depth),
        }
    }

    /// Print an expression, parenthesized when it binds looser than `min`
    fn expr_at(&self, expr: &Expr, min: u8, depth: usize) -> String {
        let text = self.expr(expr, depth);
        if precedence(expr) < min {
            format!("({})", text)
        } else {
            text
        }
    }

    fn list(&self, items: &[Expr], depth: usize) -> String {
        items
            .iter()
            .map(|item| self.expr_at(item, PREC_ASSIGN, depth))
            .collect::<Vec<_>>()
            .join(", ")
    }

    fn lit(&self, lit: &Lit) -> String {
        match lit {
            Lit::Str(s) => self.string(s),
            Lit::Num(n) => number(*n),
            Lit::Bool(b) => b.to_string(),
            Lit::Null => "null".to_string(),
        }
    }

    fn string(&self, value: &str) -> String {
        let quote = self.config.quote.as_char();
        let mut out = String::with_capacity(value.len() + 2);
        out.push(quote);
        for c in value.chars() {
            match c {
                '\\' => out.push_str("\\\\"),
                '\n' => out.push_str("\\n"),
                '\r' => out.push_str("\\r"),
                '\t' => out.push_str("\\t"),
                c if c == quote => {
                    out.push('\\');
                    out.push(c);
                }
                c if c.is_control() => out.push_str(&format!("\\u{:04x}", c as u32)),
                c => out.push(c),
            }
        }
        out.push(quote);
        out
    }
}

fn precedence(expr: &Expr) -> u8 {
    match expr {
        Expr::Sequence(_) => PREC_SEQUENCE,
        Expr::Assign { .. } | Expr::Arrow(_) | Expr::Spread(_) => PREC_ASSIGN,
        Expr::Conditional { .. } => PREC_CONDITIONAL,
        Expr::Binary { op, .. } => op.precedence(),
        Expr::Unary { .. } | Expr::Update { prefix: true, .. } => PREC_UNARY,
        Expr::Update { .. } => PREC_UPDATE,
        Expr::Lit(Lit::Num(n)) if n.is_sign_negative() && *n != 0.0 => PREC_UNARY,
        Expr::Member { .. } | Expr::Call { .. } | Expr::New { .. } => PREC_POSTFIX,
        _ => PREC_PRIMARY,
    }
}

/// Number text the way JavaScript's `Number#toString` writes it
fn number(value: f64) -> String {
    if value.is_nan() {
        "NaN".to_string()
    } else if value.is_infinite() {
        if value > 0.0 { "Infinity" } else { "-Infinity" }.to_string()
    } else if value == 0.0 {
        "0".to_string()
    } else if value.abs() >= 1e21 || value.abs() < 1e-6 {
        // Shortest digits, with an explicit sign on positive exponents: 1.5e+300
        let text = format!("{:e}", value);
        match text.split_once('e') {
            Some((mantissa, exponent)) if !exponent.starts_with('-') => {
                format!("{}e+{}", mantissa, exponent)
            }
            _ => text,
        }
    } else {
        format!("{}", value)
    }
}
