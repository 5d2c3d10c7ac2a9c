//! Parser implementation using chumsky

use chumsky::input::{Stream, ValueInput};
use chumsky::prelude::*;
use chumsky::Boxed;

use crate::parser::ast::*;
use crate::parser::lexer::{lex, Lexed, LineStarts, Token};

type ParserError<'a> = extra::Err<Rich<'a, Token>>;

/// Member access / call suffix collected while parsing a postfix chain
#[derive(Debug, Clone)]
enum Postfix {
    Property(Ident),
    Index(Expr),
    Call(Vec<Expr>),
}

fn apply_postfix(base: Expr, suffixes: Vec<Postfix>) -> Expr {
    suffixes.into_iter().fold(base, |expr, suffix| match suffix {
        Postfix::Property(name) => Expr::Member {
            object: Box::new(expr),
            property: MemberProp::Ident(name),
        },
        Postfix::Index(index) => Expr::Member {
            object: Box::new(expr),
            property: MemberProp::Computed(Box::new(index)),
        },
        Postfix::Call(arguments) => Expr::Call {
            callee: Box::new(expr),
            arguments,
        },
    })
}

/// Operator in front of an operand
#[derive(Debug, Clone, Copy)]
enum Prefix {
    Unary(UnaryOp),
    Update(UpdateOp),
}

fn binary(op: BinaryOp, left: Expr, right: Expr) -> Expr {
    Expr::Binary {
        op,
        left: Box::new(left),
        right: Box::new(right),
    }
}

fn sequence(mut expressions: Vec<Expr>) -> Expr {
    if expressions.len() == 1 {
        if let Some(single) = expressions.pop() {
            return single;
        }
    }
    Expr::Sequence(expressions)
}

fn with_default(pattern: Pat, default: Option<Expr>) -> Pat {
    match default {
        Some(right) => Pat::Assign {
            left: Box::new(pattern),
            right,
        },
        None => pattern,
    }
}

/// Parse template source into a syntax tree
pub fn parse(input: &str) -> Result<Program, Vec<crate::ParseError>> {
    let len = input.len();
    let Lexed {
        tokens,
        line_starts,
    } = lex(input)?;

    // Turn the token list into a stream that chumsky can use
    let token_stream = Stream::from_iter(tokens.into_iter().map(|(tok, span)| (tok, span.into())))
        // Split (Token, SimpleSpan) into token and span parts
        .map((len..len).into(), |(t, s): (_, _)| (t, s));

    program_parser(line_starts)
        .parse(token_stream)
        .into_result()
        .map_err(|errs| errs.into_iter().map(|e| e.into()).collect())
}

/// Helper to extract span range from chumsky's MapExtra
fn span_range(e: &impl chumsky::span::Span<Offset = usize>) -> std::ops::Range<usize> {
    e.start()..e.end()
}

fn identifier<'a, I>() -> impl Parser<'a, I, Ident, ParserError<'a>> + Clone
where
    I: ValueInput<'a, Token = Token, Span = SimpleSpan>,
{
    select! {
        Token::Ident(name) => name,
    }
    .map_with(|name, e| Ident::spanned(name, span_range(&e.span())))
}

/// Identifier or reserved word, for property keys and member properties
fn property_name<'a, I>() -> impl Parser<'a, I, Ident, ParserError<'a>> + Clone
where
    I: ValueInput<'a, Token = Token, Span = SimpleSpan>,
{
    let keyword = any().try_map(|tok: Token, span: SimpleSpan| match tok.keyword() {
        Some(word) => Ok(Ident::spanned(word, span_range(&span))),
        None => Err(Rich::custom(span, "expected a property name")),
    });

    choice((identifier(), keyword))
}

/// Words such as `from`, `as` and `of` that are only keywords in one position
fn contextual<'a, I>(word: &str) -> impl Parser<'a, I, (), ParserError<'a>> + Clone
where
    I: ValueInput<'a, Token = Token, Span = SimpleSpan>,
{
    just(Token::Ident(word.to_string())).ignored()
}

/// Succeeds without consuming when the next token starts a new line
fn line_break<'a, I>(lines: LineStarts) -> impl Parser<'a, I, (), ParserError<'a>> + Clone
where
    I: ValueInput<'a, Token = Token, Span = SimpleSpan>,
{
    any()
        .try_map(move |_: Token, span: SimpleSpan| {
            if lines.contains(span.start) {
                Ok(())
            } else {
                Err(Rich::custom(span, "expected ';' or a line break"))
            }
        })
        .rewind()
}

/// Succeeds without consuming when the next token is on the current line
fn same_line<'a, I>(lines: LineStarts) -> impl Parser<'a, I, (), ParserError<'a>> + Clone
where
    I: ValueInput<'a, Token = Token, Span = SimpleSpan>,
{
    any()
        .try_map(move |_: Token, span: SimpleSpan| {
            if lines.contains(span.start) {
                Err(Rich::custom(span, "no line break allowed here"))
            } else {
                Ok(())
            }
        })
        .rewind()
}

/// End of a statement: `;`, or an inserted semicolon before a line break, `}` or the end
fn terminator<'a, I>(lines: LineStarts) -> impl Parser<'a, I, (), ParserError<'a>> + Clone
where
    I: ValueInput<'a, Token = Token, Span = SimpleSpan>,
{
    choice((
        just(Token::Semicolon).ignored(),
        just(Token::BraceClose).ignored().rewind(),
        end(),
        line_break(lines),
    ))
}

fn prop_key_parser<'a, I>(
    expr: Boxed<'a, 'a, I, Expr, ParserError<'a>>,
) -> Boxed<'a, 'a, I, PropKey, ParserError<'a>>
where
    I: ValueInput<'a, Token = Token, Span = SimpleSpan>,
{
    choice((
        property_name().map(PropKey::Ident),
        select! {
            Token::String(s) => PropKey::Str(s),
            Token::Number(n) => PropKey::Num(n),
        },
        expr.delimited_by(just(Token::BracketOpen), just(Token::BracketClose))
            .map(|e| PropKey::Computed(Box::new(e))),
    ))
    .boxed()
}

/// Binding patterns: `name`, `{ a, b: c, d = 1, ...rest }`, `[a, , b]`
fn pattern_parser<'a, I>(
    expr: Boxed<'a, 'a, I, Expr, ParserError<'a>>,
) -> Boxed<'a, 'a, I, Pat, ParserError<'a>>
where
    I: ValueInput<'a, Token = Token, Span = SimpleSpan>,
{
    recursive(|pattern| {
        let default_value = just(Token::Equals).ignore_then(expr.clone()).or_not();

        let element = pattern
            .clone()
            .then(default_value.clone())
            .map(|(pat, default)| with_default(pat, default));

        let rest = just(Token::Ellipsis)
            .ignore_then(pattern.clone())
            .map(|p| Pat::Rest(Box::new(p)));

        let keyed = prop_key_parser(expr.clone())
            .then_ignore(just(Token::Colon))
            .then(element.clone())
            .map(|(key, value)| {
                PatMember::Prop(PatProp {
                    key,
                    value,
                    shorthand: false,
                })
            });

        let shorthand = identifier()
            .then(default_value)
            .map(|(id, default)| {
                PatMember::Prop(PatProp {
                    key: PropKey::Ident(id.clone()),
                    value: with_default(Pat::Ident(id), default),
                    shorthand: true,
                })
            });

        let member = choice((
            just(Token::Ellipsis)
                .ignore_then(pattern.clone())
                .map(PatMember::Rest),
            keyed,
            shorthand,
        ));

        let object = member
            .separated_by(just(Token::Comma))
            .allow_trailing()
            .collect::<Vec<_>>()
            .delimited_by(just(Token::BraceOpen), just(Token::BraceClose))
            .map(Pat::Object);

        let array = choice((rest, element))
            .separated_by(just(Token::Comma))
            .allow_trailing()
            .collect::<Vec<_>>()
            .delimited_by(just(Token::BracketOpen), just(Token::BracketClose))
            .map(Pat::Array);

        choice((identifier().map(Pat::Ident), object, array))
    })
    .boxed()
}

/// Parenthesized parameter list with defaults and rest parameter
fn params_parser<'a, I>(
    pattern: Boxed<'a, 'a, I, Pat, ParserError<'a>>,
    expr: Boxed<'a, 'a, I, Expr, ParserError<'a>>,
) -> Boxed<'a, 'a, I, Vec<Pat>, ParserError<'a>>
where
    I: ValueInput<'a, Token = Token, Span = SimpleSpan>,
{
    let param = pattern
        .clone()
        .then(just(Token::Equals).ignore_then(expr).or_not())
        .map(|(pat, default)| with_default(pat, default));

    let rest = just(Token::Ellipsis)
        .ignore_then(pattern)
        .map(|p| Pat::Rest(Box::new(p)));

    choice((rest, param))
        .separated_by(just(Token::Comma))
        .allow_trailing()
        .collect::<Vec<_>>()
        .delimited_by(just(Token::ParenOpen), just(Token::ParenClose))
        .boxed()
}

/// One left-associative binary precedence level
fn binary_level<'a, I>(
    operand: Boxed<'a, 'a, I, Expr, ParserError<'a>>,
    operator: impl Parser<'a, I, BinaryOp, ParserError<'a>> + Clone + 'a,
) -> Boxed<'a, 'a, I, Expr, ParserError<'a>>
where
    I: ValueInput<'a, Token = Token, Span = SimpleSpan>,
{
    operand
        .clone()
        .then(operator.then(operand).repeated().collect::<Vec<_>>())
        .map(|(first, rest)| {
            rest.into_iter().fold(first, |left, (op, right)| Expr::Binary {
                op,
                left: Box::new(left),
                right: Box::new(right),
            })
        })
        .boxed()
}

fn expression_parser<'a, I>(
    stmt: Boxed<'a, 'a, I, Stmt, ParserError<'a>>,
    lines: LineStarts,
) -> Boxed<'a, 'a, I, Expr, ParserError<'a>>
where
    I: ValueInput<'a, Token = Token, Span = SimpleSpan>,
{
    recursive(|expr| {
        let expr = expr.boxed();
        let pattern = pattern_parser(expr.clone());
        let params = params_parser(pattern, expr.clone());
        let ident = identifier();

        let block = stmt
            .clone()
            .repeated()
            .collect::<Vec<_>>()
            .delimited_by(just(Token::BraceOpen), just(Token::BraceClose));

        let literal = select! {
            Token::String(s) => Lit::Str(s),
            Token::Number(n) => Lit::Num(n),
            Token::True => Lit::Bool(true),
            Token::False => Lit::Bool(false),
            Token::Null => Lit::Null,
        }
        .map(Expr::Lit);

        // `...expr` is only legal inside array literals and argument lists
        let spreadable = just(Token::Ellipsis)
            .ignore_then(expr.clone())
            .map(|e| Expr::Spread(Box::new(e)))
            .or(expr.clone());

        let arguments = spreadable
            .clone()
            .separated_by(just(Token::Comma))
            .allow_trailing()
            .collect::<Vec<_>>()
            .delimited_by(just(Token::ParenOpen), just(Token::ParenClose));

        let array = spreadable
            .separated_by(just(Token::Comma))
            .allow_trailing()
            .collect::<Vec<_>>()
            .delimited_by(just(Token::BracketOpen), just(Token::BracketClose))
            .map(Expr::Array);

        let prop_key = prop_key_parser(expr.clone());

        let object_member = choice((
            just(Token::Ellipsis)
                .ignore_then(expr.clone())
                .map(ObjectMember::Spread),
            // Method shorthand: key(params) { body }
            prop_key
                .clone()
                .then(params.clone())
                .then(block.clone())
                .map(|((key, params), body)| {
                    ObjectMember::Prop(Prop {
                        key,
                        value: Expr::Function(Box::new(Function {
                            id: None,
                            params,
                            body,
                        })),
                        shorthand: false,
                        method: true,
                    })
                }),
            prop_key
                .then_ignore(just(Token::Colon))
                .then(expr.clone())
                .map(|(key, value)| {
                    ObjectMember::Prop(Prop {
                        key,
                        value,
                        shorthand: false,
                        method: false,
                    })
                }),
            ident.clone().map(|id| {
                ObjectMember::Prop(Prop {
                    key: PropKey::Ident(id.clone()),
                    value: Expr::Ident(id),
                    shorthand: true,
                    method: false,
                })
            }),
        ));

        let object = object_member
            .separated_by(just(Token::Comma))
            .allow_trailing()
            .collect::<Vec<_>>()
            .delimited_by(just(Token::BraceOpen), just(Token::BraceClose))
            .map(Expr::Object);

        let function = just(Token::Function)
            .ignore_then(ident.clone().or_not())
            .then(params.clone())
            .then(block.clone())
            .map(|((id, params), body)| Expr::Function(Box::new(Function { id, params, body })));

        let arrow = choice((ident.clone().map(|id| vec![Pat::Ident(id)]), params))
            .then_ignore(just(Token::FatArrow))
            .then(choice((
                block.map(ArrowBody::Block),
                expr.clone().map(|e| ArrowBody::Expr(Box::new(e))),
            )))
            .map(|(params, body)| Expr::Arrow(Box::new(Arrow { params, body })));

        let parenthesized = expr
            .clone()
            .separated_by(just(Token::Comma))
            .at_least(1)
            .collect::<Vec<_>>()
            .map(sequence)
            .delimited_by(just(Token::ParenOpen), just(Token::ParenClose));

        let primary = choice((
            literal,
            just(Token::This).to(Expr::This),
            ident.map(Expr::Ident),
            array,
            object,
            function,
            parenthesized,
        ))
        .boxed();

        let member_suffix = choice((
            just(Token::Dot)
                .ignore_then(property_name())
                .map(Postfix::Property),
            expr.clone()
                .delimited_by(just(Token::BracketOpen), just(Token::BracketClose))
                .map(Postfix::Index),
        ));

        // new Callee.member(args); the argument list is optional
        let new_expr = just(Token::New)
            .ignore_then(
                primary
                    .clone()
                    .then(member_suffix.clone().repeated().collect::<Vec<_>>())
                    .map(|(base, suffixes)| apply_postfix(base, suffixes)),
            )
            .then(arguments.clone().or_not())
            .map(|(callee, args)| Expr::New {
                callee: Box::new(callee),
                arguments: args.unwrap_or_default(),
            });

        let update_op = select! {
            Token::PlusPlus => UpdateOp::Increment,
            Token::MinusMinus => UpdateOp::Decrement,
        };

        // `a\n++b` is `a; ++b`: a postfix operator must stay on the operand's line
        let postfix = choice((new_expr, primary))
            .then(
                choice((member_suffix, arguments.map(Postfix::Call)))
                    .repeated()
                    .collect::<Vec<_>>(),
            )
            .map(|(base, suffixes)| apply_postfix(base, suffixes))
            .then(same_line(lines).ignore_then(update_op.clone()).or_not())
            .map(|(argument, update)| match update {
                Some(op) => Expr::Update {
                    op,
                    prefix: false,
                    argument: Box::new(argument),
                },
                None => argument,
            });

        let prefix_op = choice((
            select! {
                Token::Bang => UnaryOp::Not,
                Token::Minus => UnaryOp::Minus,
                Token::Plus => UnaryOp::Plus,
                Token::Tilde => UnaryOp::BitNot,
                Token::Typeof => UnaryOp::Typeof,
                Token::Void => UnaryOp::Void,
                Token::Delete => UnaryOp::Delete,
            }
            .map(Prefix::Unary),
            update_op.map(Prefix::Update),
        ));

        let unary = prefix_op
            .repeated()
            .collect::<Vec<_>>()
            .then(postfix)
            .map(|(ops, argument)| {
                ops.into_iter().rev().fold(argument, |argument, op| match op {
                    Prefix::Unary(op) => Expr::Unary {
                        op,
                        argument: Box::new(argument),
                    },
                    Prefix::Update(op) => Expr::Update {
                        op,
                        prefix: true,
                        argument: Box::new(argument),
                    },
                })
            })
            .boxed();

        // `a ** b ** c` groups as `a ** (b ** c)`
        let exponent = unary
            .clone()
            .then(
                just(Token::StarStar)
                    .ignore_then(unary)
                    .repeated()
                    .collect::<Vec<_>>(),
            )
            .map(|(first, rest)| {
                let mut rest = rest.into_iter().rev();
                match rest.next() {
                    Some(last) => {
                        let right = rest.fold(last, |right, left| binary(BinaryOp::Exp, left, right));
                        binary(BinaryOp::Exp, first, right)
                    }
                    None => first,
                }
            })
            .boxed();

        // Binary operators, tightest first
        let multiplicative = binary_level(
            exponent,
            select! {
                Token::Star => BinaryOp::Mul,
                Token::Slash => BinaryOp::Div,
                Token::Percent => BinaryOp::Rem,
            },
        );
        let additive = binary_level(
            multiplicative,
            select! {
                Token::Plus => BinaryOp::Add,
                Token::Minus => BinaryOp::Sub,
            },
        );
        let shift = binary_level(
            additive,
            select! {
                Token::ShiftLeft => BinaryOp::Shl,
                Token::ShiftRight => BinaryOp::Shr,
                Token::UnsignedShiftRight => BinaryOp::UShr,
            },
        );
        let relational = binary_level(
            shift,
            select! {
                Token::Less => BinaryOp::Lt,
                Token::Greater => BinaryOp::Gt,
                Token::LessOrEqual => BinaryOp::Le,
                Token::GreaterOrEqual => BinaryOp::Ge,
                Token::In => BinaryOp::In,
                Token::Instanceof => BinaryOp::Instanceof,
            },
        );
        let equality = binary_level(
            relational,
            select! {
                Token::StrictEq => BinaryOp::StrictEq,
                Token::StrictNe => BinaryOp::StrictNe,
                Token::LooseEq => BinaryOp::Eq,
                Token::LooseNe => BinaryOp::Ne,
            },
        );
        let bit_and = binary_level(
            equality,
            select! {
                Token::Amp => BinaryOp::BitAnd,
            },
        );
        let bit_xor = binary_level(
            bit_and,
            select! {
                Token::Caret => BinaryOp::BitXor,
            },
        );
        let bit_or = binary_level(
            bit_xor,
            select! {
                Token::Pipe => BinaryOp::BitOr,
            },
        );
        let logical_and = binary_level(
            bit_or,
            select! {
                Token::AndAnd => BinaryOp::And,
            },
        );
        let logical_or = binary_level(
            logical_and,
            select! {
                Token::OrOr => BinaryOp::Or,
                Token::Nullish => BinaryOp::Nullish,
            },
        );

        let conditional = logical_or
            .then(
                just(Token::Question)
                    .ignore_then(expr.clone())
                    .then_ignore(just(Token::Colon))
                    .then(expr.clone())
                    .or_not(),
            )
            .map(|(test, branches)| match branches {
                Some((consequent, alternate)) => Expr::Conditional {
                    test: Box::new(test),
                    consequent: Box::new(consequent),
                    alternate: Box::new(alternate),
                },
                None => test,
            });

        let assign_op = select! {
            Token::Equals => AssignOp::Assign,
            Token::PlusEquals => AssignOp::AddAssign,
            Token::MinusEquals => AssignOp::SubAssign,
            Token::StarEquals => AssignOp::MulAssign,
            Token::SlashEquals => AssignOp::DivAssign,
            Token::PercentEquals => AssignOp::RemAssign,
            Token::StarStarEquals => AssignOp::ExpAssign,
            Token::ShiftLeftEquals => AssignOp::ShlAssign,
            Token::ShiftRightEquals => AssignOp::ShrAssign,
            Token::UnsignedShiftRightEquals => AssignOp::UShrAssign,
            Token::AmpEquals => AssignOp::BitAndAssign,
            Token::PipeEquals => AssignOp::BitOrAssign,
            Token::CaretEquals => AssignOp::BitXorAssign,
            Token::AndAndEquals => AssignOp::AndAssign,
            Token::OrOrEquals => AssignOp::OrAssign,
            Token::NullishEquals => AssignOp::NullishAssign,
        };

        // Assignment is right associative: the value is a full expression
        let assignment = conditional
            .then(assign_op.then(expr).or_not())
            .map(|(target, assigned)| match assigned {
                Some((op, value)) => Expr::Assign {
                    op,
                    target: Box::new(target),
                    value: Box::new(value),
                },
                None => target,
            });

        // Arrow functions first: `(a, b) => ...` would otherwise start a parenthesized expression
        choice((arrow, assignment))
    })
    .boxed()
}

fn statement_parser<'a, I>(lines: LineStarts) -> Boxed<'a, 'a, I, Stmt, ParserError<'a>>
where
    I: ValueInput<'a, Token = Token, Span = SimpleSpan>,
{
    recursive(|stmt| {
        let expr = expression_parser(stmt.clone().boxed(), lines.clone());
        let pattern = pattern_parser(expr.clone());
        let params = params_parser(pattern.clone(), expr.clone());
        let ident = identifier();

        let semi = terminator(lines.clone());

        // Comma expressions, where the grammar allows them
        let expressions = expr
            .clone()
            .separated_by(just(Token::Comma))
            .at_least(1)
            .collect::<Vec<_>>()
            .map(sequence)
            .boxed();

        let condition = expressions
            .clone()
            .delimited_by(just(Token::ParenOpen), just(Token::ParenClose));

        let string = select! {
            Token::String(s) => s,
        };

        let block = stmt
            .clone()
            .repeated()
            .collect::<Vec<_>>()
            .delimited_by(just(Token::BraceOpen), just(Token::BraceClose));

        let var_kind = select! {
            Token::Var => VarKind::Var,
            Token::Let => VarKind::Let,
            Token::Const => VarKind::Const,
        };

        let declarator = pattern
            .clone()
            .then(just(Token::Equals).ignore_then(expr.clone()).or_not())
            .map(|(id, init)| Declarator { id, init });

        let declarations = var_kind
            .clone()
            .then(
                declarator
                    .separated_by(just(Token::Comma))
                    .at_least(1)
                    .collect::<Vec<_>>(),
            )
            .map(|(kind, declarations)| VarDecl { kind, declarations });

        let var_decl = declarations
            .clone()
            .then_ignore(semi.clone())
            .map(Stmt::Var);

        let function_decl = just(Token::Function)
            .ignore_then(ident.clone())
            .then(params)
            .then(block.clone())
            .map(|((id, params), body)| {
                Stmt::Function(Function {
                    id: Some(id),
                    params,
                    body,
                })
            });

        // `return\nx` returns nothing: the argument must start on the same line
        let return_stmt = just(Token::Return)
            .ignore_then(
                same_line(lines.clone())
                    .ignore_then(expressions.clone())
                    .or_not(),
            )
            .then_ignore(semi.clone())
            .map(Stmt::Return);

        let if_stmt = just(Token::If)
            .ignore_then(condition.clone())
            .then(stmt.clone())
            .then(just(Token::Else).ignore_then(stmt.clone()).or_not())
            .map(|((test, consequent), alternate)| Stmt::If {
                test,
                consequent: Box::new(consequent),
                alternate: alternate.map(Box::new),
            });

        let while_stmt = just(Token::While)
            .ignore_then(condition.clone())
            .then(stmt.clone())
            .map(|(test, body)| Stmt::While {
                test,
                body: Box::new(body),
            });

        let do_while = just(Token::Do)
            .ignore_then(stmt.clone())
            .then_ignore(just(Token::While))
            .then(condition.clone())
            .then_ignore(just(Token::Semicolon).or_not())
            .map(|(body, test)| Stmt::DoWhile {
                body: Box::new(body),
                test,
            });

        // Assignment target of `for (target in ...)`: a name with member accesses
        let target = choice((ident.clone().map(Expr::Ident), just(Token::This).to(Expr::This)))
            .then(
                choice((
                    just(Token::Dot)
                        .ignore_then(property_name())
                        .map(Postfix::Property),
                    expr.clone()
                        .delimited_by(just(Token::BracketOpen), just(Token::BracketClose))
                        .map(Postfix::Index),
                ))
                .repeated()
                .collect::<Vec<_>>(),
            )
            .map(|(base, suffixes)| apply_postfix(base, suffixes));

        let each_kind = choice((
            just(Token::In).to(ForEachKind::In),
            contextual("of").to(ForEachKind::Of),
        ));

        let each_left = choice((
            var_kind.then(pattern.clone()).map(|(kind, id)| {
                ForHead::Var(VarDecl {
                    kind,
                    declarations: vec![Declarator { id, init: None }],
                })
            }),
            target.map(ForHead::Expr),
        ));

        let for_each = just(Token::For)
            .ignore_then(
                each_left
                    .then(each_kind)
                    .then(expr.clone())
                    .delimited_by(just(Token::ParenOpen), just(Token::ParenClose)),
            )
            .then(stmt.clone())
            .map(|(((left, kind), right), body)| Stmt::ForEach {
                kind,
                left,
                right,
                body: Box::new(body),
            });

        let for_init = choice((
            declarations.map(ForHead::Var),
            expressions.clone().map(ForHead::Expr),
        ));

        let for_stmt = just(Token::For)
            .ignore_then(
                for_init
                    .or_not()
                    .then_ignore(just(Token::Semicolon))
                    .then(expressions.clone().or_not())
                    .then_ignore(just(Token::Semicolon))
                    .then(expressions.clone().or_not())
                    .delimited_by(just(Token::ParenOpen), just(Token::ParenClose)),
            )
            .then(stmt.clone())
            .map(|(((init, test), update), body)| Stmt::For {
                init,
                test,
                update,
                body: Box::new(body),
            });

        let label = same_line(lines.clone()).ignore_then(ident.clone()).or_not();

        let break_stmt = just(Token::Break)
            .ignore_then(label.clone())
            .then_ignore(semi.clone())
            .map(Stmt::Break);

        let continue_stmt = just(Token::Continue)
            .ignore_then(label)
            .then_ignore(semi.clone())
            .map(Stmt::Continue);

        let case = choice((
            just(Token::Case).ignore_then(expressions.clone()).map(Some),
            just(Token::Default).to(None),
        ))
        .then_ignore(just(Token::Colon))
        .then(stmt.clone().repeated().collect::<Vec<_>>())
        .map(|(test, consequent)| SwitchCase { test, consequent });

        let switch_stmt = just(Token::Switch)
            .ignore_then(condition)
            .then(
                case.repeated()
                    .collect::<Vec<_>>()
                    .delimited_by(just(Token::BraceOpen), just(Token::BraceClose)),
            )
            .map(|(discriminant, cases)| Stmt::Switch {
                discriminant,
                cases,
            });

        let catch_clause = just(Token::Catch)
            .ignore_then(
                pattern
                    .delimited_by(just(Token::ParenOpen), just(Token::ParenClose))
                    .or_not(),
            )
            .then(block.clone())
            .map(|(param, body)| CatchClause { param, body });

        let try_stmt = just(Token::Try)
            .ignore_then(block.clone())
            .then(catch_clause.or_not())
            .then(just(Token::Finally).ignore_then(block.clone()).or_not())
            .try_map(|((block, handler), finalizer), span| {
                if handler.is_none() && finalizer.is_none() {
                    return Err(Rich::custom(span, "expected 'catch' or 'finally'"));
                }
                Ok(Stmt::Try {
                    block,
                    handler,
                    finalizer,
                })
            });

        let throw_stmt = just(Token::Throw)
            .ignore_then(expressions.clone())
            .then_ignore(semi.clone())
            .map(Stmt::Throw);

        // import a, { b, c as d } from 'x' | import * as ns from 'x' | import 'x'
        let named_imports = property_name()
            .then(contextual("as").ignore_then(ident.clone()).or_not())
            .map(|(imported, local)| {
                let local = local.unwrap_or_else(|| imported.clone());
                ImportSpecifier::Named { imported, local }
            })
            .separated_by(just(Token::Comma))
            .allow_trailing()
            .collect::<Vec<_>>()
            .delimited_by(just(Token::BraceOpen), just(Token::BraceClose));

        let namespace_import = just(Token::Star)
            .ignore_then(contextual("as"))
            .ignore_then(ident.clone())
            .map(|local| vec![ImportSpecifier::Namespace(local)]);

        let non_default_imports = choice((named_imports, namespace_import));

        let specifiers = choice((
            ident
                .clone()
                .then(
                    just(Token::Comma)
                        .ignore_then(non_default_imports.clone())
                        .or_not(),
                )
                .map(|(default, rest)| {
                    let mut specifiers = vec![ImportSpecifier::Default(default)];
                    specifiers.extend(rest.unwrap_or_default());
                    specifiers
                }),
            non_default_imports,
        ));

        let import_stmt = just(Token::Import)
            .ignore_then(choice((
                specifiers
                    .then_ignore(contextual("from"))
                    .then(string.clone())
                    .map(|(specifiers, source)| ImportDecl { specifiers, source }),
                string.map(|source| ImportDecl {
                    specifiers: Vec::new(),
                    source,
                }),
            )))
            .then_ignore(semi.clone())
            .map(Stmt::Import);

        let export_stmt = just(Token::Export)
            .ignore_then(choice((
                just(Token::Default)
                    .ignore_then(expr.clone())
                    .then_ignore(semi.clone())
                    .map(Export::Default),
                choice((function_decl.clone(), var_decl.clone()))
                    .map(|decl| Export::Decl(Box::new(decl))),
            )))
            .map(Stmt::Export);

        let labeled = ident
            .then_ignore(just(Token::Colon))
            .then(stmt.clone())
            .map(|(label, body)| Stmt::Labeled {
                label,
                body: Box::new(body),
            });

        // Note: Order matters!
        // - block before expression statements (`{` starts a block in statement position)
        // - function_decl before expression statements (named functions are declarations)
        // - labeled before expression statements (both start with an identifier)
        // - for-in/for-of before the three-part for (both start with `for (`)
        choice((
            block.map(Stmt::Block),
            var_decl,
            function_decl,
            return_stmt,
            if_stmt,
            while_stmt,
            do_while,
            for_each,
            for_stmt,
            break_stmt,
            continue_stmt,
            switch_stmt,
            try_stmt,
            throw_stmt,
            import_stmt,
            export_stmt,
            just(Token::Semicolon).to(Stmt::Empty),
            labeled,
            expressions.then_ignore(semi).map(Stmt::Expr),
        ))
        .boxed()
    })
    .boxed()
}

fn program_parser<'a, I>(lines: LineStarts) -> impl Parser<'a, I, Program, ParserError<'a>> + Clone
where
    I: ValueInput<'a, Token = Token, Span = SimpleSpan>,
{
    statement_parser(lines)
        .repeated()
        .collect()
        .then_ignore(end())
        .map(|body| Program { body })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn single_statement(input: &str) -> Stmt {
        let program = parse(input).expect("Should parse");
        assert_eq!(program.body.len(), 1, "Expected one statement in {:?}", input);
        program.body.into_iter().next().expect("Should have a statement")
    }

    #[test]
    fn test_parse_const_declaration() {
        match single_statement("const a = 'test';") {
            Stmt::Var(decl) => {
                assert_eq!(decl.kind, VarKind::Const);
                assert_eq!(decl.declarations.len(), 1);
                assert_eq!(decl.declarations[0].id, Pat::Ident(Ident::new("a")));
                assert_eq!(decl.declarations[0].init, Some(Expr::string("test")));
            }
            other => panic!("Expected declaration, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_declaration_without_init() {
        match single_statement("let data;") {
            Stmt::Var(decl) => {
                assert_eq!(decl.kind, VarKind::Let);
                assert!(decl.declarations[0].init.is_none());
            }
            other => panic!("Expected declaration, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_function_declaration() {
        match single_statement("function foo(a, b) { return a; }") {
            Stmt::Function(f) => {
                assert_eq!(f.id, Some(Ident::new("foo")));
                assert_eq!(f.params.len(), 2);
                assert_eq!(f.body, vec![Stmt::Return(Some(Expr::ident("a")))]);
            }
            other => panic!("Expected function, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_identifier_spans() {
        match single_statement("const abc = 1;") {
            Stmt::Var(decl) => match &decl.declarations[0].id {
                Pat::Ident(id) => assert_eq!(id.span, Some(6..9)),
                other => panic!("Expected identifier, got {:?}", other),
            },
            other => panic!("Expected declaration, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_object_members() {
        match single_statement("x = { a, b: 1, 'c': 2, [d]: 3, delete: 4, m() {}, ...rest };") {
            Stmt::Expr(Expr::Assign { value, .. }) => match *value {
                Expr::Object(members) => {
                    assert_eq!(members.len(), 7);
                    assert!(matches!(&members[0], ObjectMember::Prop(p) if p.shorthand));
                    assert!(matches!(&members[2], ObjectMember::Prop(Prop { key: PropKey::Str(s), .. }) if s == "c"));
                    assert!(matches!(&members[3], ObjectMember::Prop(Prop { key: PropKey::Computed(_), .. })));
                    assert!(matches!(&members[4], ObjectMember::Prop(Prop { key: PropKey::Ident(k), .. }) if k.as_str() == "delete"));
                    assert!(matches!(&members[5], ObjectMember::Prop(p) if p.method));
                    assert!(matches!(&members[6], ObjectMember::Spread(_)));
                }
                other => panic!("Expected object, got {:?}", other),
            },
            other => panic!("Expected assignment, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_object_pattern_parameter() {
        match single_statement("function val({ a, b: c, d = 1 }) {}") {
            Stmt::Function(f) => match &f.params[0] {
                Pat::Object(members) => {
                    assert_eq!(members.len(), 3);
                    assert!(matches!(&members[0], PatMember::Prop(p) if p.shorthand));
                    assert!(matches!(&members[1], PatMember::Prop(PatProp { value: Pat::Ident(v), .. }) if v.as_str() == "c"));
                    assert!(matches!(&members[2], PatMember::Prop(PatProp { value: Pat::Assign { .. }, .. })));
                }
                other => panic!("Expected object pattern, got {:?}", other),
            },
            other => panic!("Expected function, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_block_with_label() {
        match single_statement("{ plop: value }") {
            Stmt::Block(body) => {
                assert!(matches!(&body[0], Stmt::Labeled { label, .. } if label.as_str() == "plop"));
            }
            other => panic!("Expected block, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_binary_precedence() {
        match single_statement("a + b * c;") {
            Stmt::Expr(Expr::Binary { op, right, .. }) => {
                assert_eq!(op, BinaryOp::Add);
                assert!(matches!(*right, Expr::Binary { op: BinaryOp::Mul, .. }));
            }
            other => panic!("Expected binary expression, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_left_associative_concatenation() {
        match single_statement("a + '?' + b;") {
            Stmt::Expr(Expr::Binary { left, right, .. }) => {
                assert!(matches!(*left, Expr::Binary { .. }));
                assert_eq!(*right, Expr::ident("b"));
            }
            other => panic!("Expected binary expression, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_member_call_chain() {
        match single_statement("angular.module('app').service('API', apiService);") {
            Stmt::Expr(Expr::Call { callee, arguments }) => {
                assert_eq!(arguments.len(), 2);
                assert!(matches!(*callee, Expr::Member { .. }));
            }
            other => panic!("Expected call, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_computed_member_assignment() {
        match single_statement("headers['Content-Type'] = 'application/json';") {
            Stmt::Expr(Expr::Assign { target, .. }) => {
                assert!(matches!(
                    *target,
                    Expr::Member {
                        property: MemberProp::Computed(_),
                        ..
                    }
                ));
            }
            other => panic!("Expected assignment, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_arrow_functions() {
        match single_statement("const f = (a, b) => a + b;") {
            Stmt::Var(decl) => match &decl.declarations[0].init {
                Some(Expr::Arrow(arrow)) => {
                    assert_eq!(arrow.params.len(), 2);
                    assert!(matches!(arrow.body, ArrowBody::Expr(_)));
                }
                other => panic!("Expected arrow, got {:?}", other),
            },
            other => panic!("Expected declaration, got {:?}", other),
        }

        match single_statement("items.map(item => { return item; });") {
            Stmt::Expr(Expr::Call { arguments, .. }) => {
                assert!(matches!(&arguments[0], Expr::Arrow(a) if matches!(a.body, ArrowBody::Block(_))));
            }
            other => panic!("Expected call, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_parenthesized_expression_is_not_arrow() {
        match single_statement("x = (a + b) * c;") {
            Stmt::Expr(Expr::Assign { value, .. }) => {
                assert!(matches!(*value, Expr::Binary { op: BinaryOp::Mul, .. }));
            }
            other => panic!("Expected assignment, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_if_else() {
        match single_statement("if (a) { b(); } else if (c) d(); else { e(); }") {
            Stmt::If { alternate, .. } => {
                assert!(matches!(alternate.as_deref(), Some(Stmt::If { .. })));
            }
            other => panic!("Expected if statement, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_imports() {
        let program = parse(
            "import qs from 'qs';\nimport a, { b, c as d } from 'x';\nimport * as ns from 'y';\nimport 'z';",
        )
        .expect("Should parse");
        assert_eq!(program.body.len(), 4);
        match &program.body[1] {
            Stmt::Import(decl) => {
                assert_eq!(decl.source, "x");
                assert_eq!(decl.specifiers.len(), 3);
                assert!(matches!(
                    &decl.specifiers[2],
                    ImportSpecifier::Named { imported, local }
                        if imported.as_str() == "c" && local.as_str() == "d"
                ));
            }
            other => panic!("Expected import, got {:?}", other),
        }
        assert!(matches!(&program.body[3], Stmt::Import(d) if d.specifiers.is_empty()));
    }

    #[test]
    fn test_parse_exports() {
        let program = parse("export default foo;\nexport function bar() {}\nexport const baz = 1;")
            .expect("Should parse");
        assert!(matches!(&program.body[0], Stmt::Export(Export::Default(_))));
        assert!(matches!(&program.body[1], Stmt::Export(Export::Decl(_))));
        assert!(matches!(&program.body[2], Stmt::Export(Export::Decl(_))));
    }

    #[test]
    fn test_parse_optional_semicolons() {
        let program = parse("a()\nb()\nconst c = 1").expect("Should parse");
        assert_eq!(program.body.len(), 3);
    }

    #[test]
    fn test_parse_new_and_unary() {
        match single_statement("x = !new Foo.Bar(1) && typeof y === 'string';") {
            Stmt::Expr(Expr::Assign { value, .. }) => match *value {
                Expr::Binary { op: BinaryOp::And, left, .. } => {
                    assert!(matches!(*left, Expr::Unary { op: UnaryOp::Not, .. }));
                }
                other => panic!("Expected logical and, got {:?}", other),
            },
            other => panic!("Expected assignment, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_directive_identifiers() {
        match single_statement("const 𐅙variable𐅙testProp = 'test';") {
            Stmt::Var(decl) => {
                assert_eq!(
                    decl.declarations[0].id,
                    Pat::Ident(Ident::new("𐅙variable𐅙testProp"))
                );
            }
            other => panic!("Expected declaration, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_for_statements() {
        match single_statement("for (let i = 0, n = a.length; i < n; i++) {}") {
            Stmt::For {
                init: Some(ForHead::Var(decl)),
                test: Some(_),
                update: Some(Expr::Update { op: UpdateOp::Increment, prefix: false, .. }),
                ..
            } => assert_eq!(decl.declarations.len(), 2),
            other => panic!("Expected for statement, got {:?}", other),
        }
        assert!(matches!(
            single_statement("for (;;) {}"),
            Stmt::For { init: None, test: None, update: None, .. }
        ));
        assert!(matches!(
            single_statement("for (const key in obj) {}"),
            Stmt::ForEach { kind: ForEachKind::In, left: ForHead::Var(_), .. }
        ));
        assert!(matches!(
            single_statement("for (this.item of items) break;"),
            Stmt::ForEach { kind: ForEachKind::Of, left: ForHead::Expr(Expr::Member { .. }), .. }
        ));
    }

    #[test]
    fn test_parse_jumps_and_loops() {
        let program = parse("outer: while (a) { do { continue outer; } while (b) break; }")
            .expect("Should parse");
        match &program.body[0] {
            Stmt::Labeled { body, .. } => match body.as_ref() {
                Stmt::While { body, .. } => match body.as_ref() {
                    Stmt::Block(stmts) => {
                        assert!(matches!(&stmts[0], Stmt::DoWhile { .. }));
                        assert!(matches!(&stmts[1], Stmt::Break(None)));
                    }
                    other => panic!("Expected block, got {:?}", other),
                },
                other => panic!("Expected while, got {:?}", other),
            },
            other => panic!("Expected labeled statement, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_switch_and_try() {
        match single_statement("switch (kind) { case 'a': case 'b': run(); break; default: stop(); }") {
            Stmt::Switch { cases, .. } => {
                assert_eq!(cases.len(), 3);
                assert!(cases[0].consequent.is_empty());
                assert_eq!(cases[1].consequent.len(), 2);
                assert!(cases[2].test.is_none());
            }
            other => panic!("Expected switch, got {:?}", other),
        }
        assert!(matches!(
            single_statement("try { a(); } catch (e) { b(e); } finally { c(); }"),
            Stmt::Try { handler: Some(CatchClause { param: Some(_), .. }), finalizer: Some(_), .. }
        ));
        assert!(matches!(
            single_statement("try {} catch {}"),
            Stmt::Try { handler: Some(CatchClause { param: None, .. }), finalizer: None, .. }
        ));
        assert!(parse("try {}").is_err());
    }

    #[test]
    fn test_parse_bitwise_operators() {
        // `^` binds tighter than `|` and looser than `&`
        match single_statement("x = a | b ^ c & ~d;") {
            Stmt::Expr(Expr::Assign { value, .. }) => match *value {
                Expr::Binary { op: BinaryOp::BitOr, right, .. } => match *right {
                    Expr::Binary { op: BinaryOp::BitXor, right, .. } => {
                        assert!(matches!(*right, Expr::Binary { op: BinaryOp::BitAnd, .. }));
                    }
                    other => panic!("Expected xor, got {:?}", other),
                },
                other => panic!("Expected or, got {:?}", other),
            },
            other => panic!("Expected assignment, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_exponent_is_right_associative() {
        match single_statement("a ** b ** c;") {
            Stmt::Expr(Expr::Binary { op: BinaryOp::Exp, left, right }) => {
                assert!(matches!(*left, Expr::Ident(_)));
                assert!(matches!(*right, Expr::Binary { op: BinaryOp::Exp, .. }));
            }
            other => panic!("Expected exponent, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_sequence_expressions() {
        assert!(matches!(
            single_statement("a = 1, b = 2;"),
            Stmt::Expr(Expr::Sequence(items)) if items.len() == 2
        ));
        match single_statement("x = (a, b);") {
            Stmt::Expr(Expr::Assign { value, .. }) => {
                assert!(matches!(*value, Expr::Sequence(_)));
            }
            other => panic!("Expected assignment, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_line_break_rules() {
        // A postfix operator on the next line belongs to the following statement
        let program = parse("a\n++b").expect("Should parse");
        assert_eq!(program.body.len(), 2);
        assert!(matches!(
            &program.body[1],
            Stmt::Expr(Expr::Update { prefix: true, .. })
        ));

        // `return` followed by a line break returns nothing
        let program = parse("function f() { return\n1 }").expect("Should parse");
        match &program.body[0] {
            Stmt::Function(function) => {
                assert_eq!(function.body.len(), 2);
                assert!(matches!(&function.body[0], Stmt::Return(None)));
            }
            other => panic!("Expected function, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_missing_separator_error() {
        assert!(parse("a b").is_err());
        assert!(parse("x = a\nb").is_ok());
    }

    #[test]
    fn test_parse_unknown_character_error() {
        let errors = parse("x = `a`;").expect_err("Should fail");
        assert_eq!(errors[0].span(), &(4..5));
    }

    #[test]
    fn test_parse_error() {
        let result = parse("const = ;");
        assert!(result.is_err());
    }

    #[test]
    fn test_parse_unclosed_block_error() {
        let errors = parse("function a() {").expect_err("Should fail");
        assert!(!errors.is_empty());
    }
}
