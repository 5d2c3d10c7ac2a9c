//! Syntax tree for the template host language
//!
//! The tree mirrors the ESTree shapes the directives are written against
//! (identifiers, declarators, properties, member expressions, ...) but only
//! covers the JavaScript subset the parser accepts.

/// Byte range in source text
pub type Span = std::ops::Range<usize>;

/// Identifier-shaped name. Directives live in these.
///
/// The span is informational only: two identifiers compare equal when their
/// names do.
#[derive(Debug, Clone)]
pub struct Ident {
    pub name: String,
    pub span: Option<Span>,
}

impl Ident {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            span: None,
        }
    }

    pub fn spanned(name: impl Into<String>, span: Span) -> Self {
        Self {
            name: name.into(),
            span: Some(span),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.name
    }
}

impl PartialEq for Ident {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
    }
}

impl std::fmt::Display for Ident {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name)
    }
}

/// Root node - a complete template source
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Program {
    pub body: Vec<Stmt>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Stmt {
    Expr(Expr),
    Var(VarDecl),
    Function(Function),
    Return(Option<Expr>),
    If {
        test: Expr,
        consequent: Box<Stmt>,
        alternate: Option<Box<Stmt>>,
    },
    While {
        test: Expr,
        body: Box<Stmt>,
    },
    DoWhile {
        body: Box<Stmt>,
        test: Expr,
    },
    /// `for (init; test; update) body`
    For {
        init: Option<ForHead>,
        test: Option<Expr>,
        update: Option<Expr>,
        body: Box<Stmt>,
    },
    /// `for (left in right) body` and `for (left of right) body`
    ForEach {
        kind: ForEachKind,
        left: ForHead,
        right: Expr,
        body: Box<Stmt>,
    },
    Break(Option<Ident>),
    Continue(Option<Ident>),
    Switch {
        discriminant: Expr,
        cases: Vec<SwitchCase>,
    },
    Try {
        block: Vec<Stmt>,
        handler: Option<CatchClause>,
        finalizer: Option<Vec<Stmt>>,
    },
    Throw(Expr),
    Block(Vec<Stmt>),
    Labeled {
        label: Ident,
        body: Box<Stmt>,
    },
    Import(ImportDecl),
    Export(Export),
    Empty,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VarKind {
    Var,
    Let,
    Const,
}

impl VarKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            VarKind::Var => "var",
            VarKind::Let => "let",
            VarKind::Const => "const",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct VarDecl {
    pub kind: VarKind,
    pub declarations: Vec<Declarator>,
}

/// Declaration or target opening a `for` statement
#[derive(Debug, Clone, PartialEq)]
pub enum ForHead {
    Var(VarDecl),
    Expr(Expr),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ForEachKind {
    In,
    Of,
}

impl ForEachKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ForEachKind::In => "in",
            ForEachKind::Of => "of",
        }
    }
}

/// `case test:` or `default:` (no test) with its statements
#[derive(Debug, Clone, PartialEq)]
pub struct SwitchCase {
    pub test: Option<Expr>,
    pub consequent: Vec<Stmt>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CatchClause {
    pub param: Option<Pat>,
    pub body: Vec<Stmt>,
}

/// `id = init` inside a variable declaration
#[derive(Debug, Clone, PartialEq)]
pub struct Declarator {
    pub id: Pat,
    pub init: Option<Expr>,
}

/// Function declaration or expression. Declarations always carry an id.
#[derive(Debug, Clone, PartialEq)]
pub struct Function {
    pub id: Option<Ident>,
    pub params: Vec<Pat>,
    pub body: Vec<Stmt>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Arrow {
    pub params: Vec<Pat>,
    pub body: ArrowBody,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ArrowBody {
    Expr(Box<Expr>),
    Block(Vec<Stmt>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct ImportDecl {
    pub specifiers: Vec<ImportSpecifier>,
    pub source: String,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ImportSpecifier {
    /// `import local from '...'`
    Default(Ident),
    /// `import * as local from '...'`
    Namespace(Ident),
    /// `import { imported as local } from '...'`
    Named { imported: Ident, local: Ident },
}

#[derive(Debug, Clone, PartialEq)]
pub enum Export {
    Default(Expr),
    Decl(Box<Stmt>),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Ident(Ident),
    Lit(Lit),
    This,
    Array(Vec<Expr>),
    Object(Vec<ObjectMember>),
    Function(Box<Function>),
    Arrow(Box<Arrow>),
    Member {
        object: Box<Expr>,
        property: MemberProp,
    },
    Call {
        callee: Box<Expr>,
        arguments: Vec<Expr>,
    },
    New {
        callee: Box<Expr>,
        arguments: Vec<Expr>,
    },
    Unary {
        op: UnaryOp,
        argument: Box<Expr>,
    },
    /// `++a`, `a--`
    Update {
        op: UpdateOp,
        prefix: bool,
        argument: Box<Expr>,
    },
    Binary {
        op: BinaryOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    Assign {
        op: AssignOp,
        target: Box<Expr>,
        value: Box<Expr>,
    },
    Conditional {
        test: Box<Expr>,
        consequent: Box<Expr>,
        alternate: Box<Expr>,
    },
    /// `...argument` in array literals and call arguments
    Spread(Box<Expr>),
    /// `a, b, c`
    Sequence(Vec<Expr>),
}

impl Expr {
    pub fn ident(name: impl Into<String>) -> Self {
        Expr::Ident(Ident::new(name))
    }

    pub fn string(value: impl Into<String>) -> Self {
        Expr::Lit(Lit::Str(value.into()))
    }

    pub fn number(value: f64) -> Self {
        Expr::Lit(Lit::Num(value))
    }

    pub fn member(object: Expr, property: impl Into<String>) -> Self {
        Expr::Member {
            object: Box::new(object),
            property: MemberProp::Ident(Ident::new(property)),
        }
    }

    pub fn call(callee: Expr, arguments: Vec<Expr>) -> Self {
        Expr::Call {
            callee: Box::new(callee),
            arguments,
        }
    }

    /// `{}.undef`: evaluates to `undefined` without naming the `undefined` global
    pub fn undefined_sentinel() -> Self {
        Expr::member(Expr::Object(Vec::new()), "undef")
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum MemberProp {
    Ident(Ident),
    Computed(Box<Expr>),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Lit {
    Str(String),
    Num(f64),
    Bool(bool),
    Null,
}

#[derive(Debug, Clone, PartialEq)]
pub enum PropKey {
    Ident(Ident),
    Str(String),
    Num(f64),
    Computed(Box<Expr>),
}

/// Object literal entry
#[derive(Debug, Clone, PartialEq)]
pub struct Prop {
    pub key: PropKey,
    pub value: Expr,
    pub shorthand: bool,
    /// `key(params) { ... }`; the value is then a function expression
    pub method: bool,
}

impl Prop {
    pub fn new(key: impl Into<String>, value: Expr) -> Self {
        Self {
            key: PropKey::Ident(Ident::new(key)),
            value,
            shorthand: false,
            method: false,
        }
    }

    /// `{ name }`
    pub fn shorthand(name: impl Into<String>) -> Self {
        let ident = Ident::new(name);
        Self {
            key: PropKey::Ident(ident.clone()),
            value: Expr::Ident(ident),
            shorthand: true,
            method: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ObjectMember {
    Prop(Prop),
    Spread(Expr),
}

/// Binding pattern
#[derive(Debug, Clone, PartialEq)]
pub enum Pat {
    Ident(Ident),
    Object(Vec<PatMember>),
    Array(Vec<Pat>),
    /// `left = right` default value
    Assign { left: Box<Pat>, right: Expr },
    Rest(Box<Pat>),
}

/// Object pattern entry
#[derive(Debug, Clone, PartialEq)]
pub struct PatProp {
    pub key: PropKey,
    pub value: Pat,
    pub shorthand: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub enum PatMember {
    Prop(PatProp),
    Rest(Pat),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Not,
    Minus,
    Plus,
    Typeof,
    Void,
    Delete,
    BitNot,
}

impl UnaryOp {
    pub fn as_str(&self) -> &'static str {
        match self {
            UnaryOp::Not => "!",
            UnaryOp::Minus => "-",
            UnaryOp::Plus => "+",
            UnaryOp::Typeof => "typeof",
            UnaryOp::Void => "void",
            UnaryOp::Delete => "delete",
            UnaryOp::BitNot => "~",
        }
    }

    /// Word operators need a space before their operand
    pub fn is_keyword(&self) -> bool {
        matches!(self, UnaryOp::Typeof | UnaryOp::Void | UnaryOp::Delete)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateOp {
    Increment,
    Decrement,
}

impl UpdateOp {
    pub fn as_str(&self) -> &'static str {
        match self {
            UpdateOp::Increment => "++",
            UpdateOp::Decrement => "--",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Rem,
    Exp,
    Shl,
    Shr,
    UShr,
    Lt,
    Gt,
    Le,
    Ge,
    In,
    Instanceof,
    StrictEq,
    StrictNe,
    Eq,
    Ne,
    BitAnd,
    BitXor,
    BitOr,
    And,
    Or,
    Nullish,
}

impl BinaryOp {
    pub fn as_str(&self) -> &'static str {
        match self {
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
            BinaryOp::Rem => "%",
            BinaryOp::Exp => "**",
            BinaryOp::Shl => "<<",
            BinaryOp::Shr => ">>",
            BinaryOp::UShr => ">>>",
            BinaryOp::Lt => "<",
            BinaryOp::Gt => ">",
            BinaryOp::Le => "<=",
            BinaryOp::Ge => ">=",
            BinaryOp::In => "in",
            BinaryOp::Instanceof => "instanceof",
            BinaryOp::StrictEq => "===",
            BinaryOp::StrictNe => "!==",
            BinaryOp::Eq => "==",
            BinaryOp::Ne => "!=",
            BinaryOp::BitAnd => "&",
            BinaryOp::BitXor => "^",
            BinaryOp::BitOr => "|",
            BinaryOp::And => "&&",
            BinaryOp::Or => "||",
            BinaryOp::Nullish => "??",
        }
    }

    /// Binding power, higher binds tighter
    pub fn precedence(&self) -> u8 {
        match self {
            BinaryOp::Or | BinaryOp::Nullish => 3,
            BinaryOp::And => 4,
            BinaryOp::BitOr => 5,
            BinaryOp::BitXor => 6,
            BinaryOp::BitAnd => 7,
            BinaryOp::StrictEq | BinaryOp::StrictNe | BinaryOp::Eq | BinaryOp::Ne => 8,
            BinaryOp::Lt
            | BinaryOp::Gt
            | BinaryOp::Le
            | BinaryOp::Ge
            | BinaryOp::In
            | BinaryOp::Instanceof => 9,
            BinaryOp::Shl | BinaryOp::Shr | BinaryOp::UShr => 10,
            BinaryOp::Add | BinaryOp::Sub => 11,
            BinaryOp::Mul | BinaryOp::Div | BinaryOp::Rem => 12,
            BinaryOp::Exp => 13,
        }
    }

    /// `??` cannot share an operand with `&&` or `||` without parentheses
    pub fn mixes_with(&self, other: BinaryOp) -> bool {
        let nullish = |op: BinaryOp| op == BinaryOp::Nullish;
        let logical = |op: BinaryOp| matches!(op, BinaryOp::And | BinaryOp::Or);
        (nullish(*self) && logical(other)) || (logical(*self) && nullish(other))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssignOp {
    Assign,
    AddAssign,
    SubAssign,
    MulAssign,
    DivAssign,
    RemAssign,
    ExpAssign,
    ShlAssign,
    ShrAssign,
    UShrAssign,
    BitAndAssign,
    BitOrAssign,
    BitXorAssign,
    AndAssign,
    OrAssign,
    NullishAssign,
}

impl AssignOp {
    pub fn as_str(&self) -> &'static str {
        match self {
            AssignOp::Assign => "=",
            AssignOp::AddAssign => "+=",
            AssignOp::SubAssign => "-=",
            AssignOp::MulAssign => "*=",
            AssignOp::DivAssign => "/=",
            AssignOp::RemAssign => "%=",
            AssignOp::ExpAssign => "**=",
            AssignOp::ShlAssign => "<<=",
            AssignOp::ShrAssign => ">>=",
            AssignOp::UShrAssign => ">>>=",
            AssignOp::BitAndAssign => "&=",
            AssignOp::BitOrAssign => "|=",
            AssignOp::BitXorAssign => "^=",
            AssignOp::AndAssign => "&&=",
            AssignOp::OrAssign => "||=",
            AssignOp::NullishAssign => "??=",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ident_equality_ignores_span() {
        assert_eq!(Ident::spanned("a", 3..4), Ident::new("a"));
        assert_ne!(Ident::new("a"), Ident::new("b"));
    }

    #[test]
    fn test_shorthand_prop() {
        let prop = Prop::shorthand("name");
        assert!(prop.shorthand);
        assert_eq!(prop.value, Expr::ident("name"));
    }

    #[test]
    fn test_undefined_sentinel_shape() {
        match Expr::undefined_sentinel() {
            Expr::Member { object, property } => {
                assert_eq!(*object, Expr::Object(vec![]));
                assert_eq!(property, MemberProp::Ident(Ident::new("undef")));
            }
            other => panic!("Expected member expression, got {:?}", other),
        }
    }

    #[test]
    fn test_operator_precedence_order() {
        assert!(BinaryOp::Mul.precedence() > BinaryOp::Add.precedence());
        assert!(BinaryOp::Add.precedence() > BinaryOp::Lt.precedence());
        assert!(BinaryOp::StrictEq.precedence() > BinaryOp::And.precedence());
        assert!(BinaryOp::And.precedence() > BinaryOp::Or.precedence());
        assert!(BinaryOp::Exp.precedence() > BinaryOp::Mul.precedence());
        assert!(BinaryOp::Shl.precedence() > BinaryOp::Lt.precedence());
        assert!(BinaryOp::BitAnd.precedence() > BinaryOp::BitOr.precedence());
        assert!(BinaryOp::StrictEq.precedence() > BinaryOp::BitAnd.precedence());
    }

    #[test]
    fn test_nullish_mixing() {
        assert!(BinaryOp::Nullish.mixes_with(BinaryOp::Or));
        assert!(BinaryOp::And.mixes_with(BinaryOp::Nullish));
        assert!(!BinaryOp::Or.mixes_with(BinaryOp::And));
        assert!(!BinaryOp::Nullish.mixes_with(BinaryOp::Nullish));
    }
}
