//! Lexer for the template host language (a JavaScript subset) using logos

use std::rc::Rc;

use logos::Logos;

use crate::error::ParseError;

/// Byte range in source text
pub type Span = std::ops::Range<usize>;

#[derive(Logos, Debug, Clone, PartialEq)]
#[logos(skip r"[ \t\n\r\f]+")]
pub enum Token {
    // Declaration keywords
    #[token("var")]
    Var,
    #[token("let")]
    Let,
    #[token("const")]
    Const,
    #[token("function")]
    Function,

    // Statement keywords
    #[token("return")]
    Return,
    #[token("if")]
    If,
    #[token("else")]
    Else,
    #[token("while")]
    While,
    #[token("do")]
    Do,
    #[token("for")]
    For,
    #[token("break")]
    Break,
    #[token("continue")]
    Continue,
    #[token("switch")]
    Switch,
    #[token("case")]
    Case,
    #[token("try")]
    Try,
    #[token("catch")]
    Catch,
    #[token("finally")]
    Finally,
    #[token("throw")]
    Throw,
    #[token("import")]
    Import,
    #[token("export")]
    Export,
    #[token("default")]
    Default,

    // Expression keywords
    #[token("new")]
    New,
    #[token("typeof")]
    Typeof,
    #[token("void")]
    Void,
    #[token("delete")]
    Delete,
    #[token("instanceof")]
    Instanceof,
    #[token("in")]
    In,
    #[token("this")]
    This,
    #[token("true")]
    True,
    #[token("false")]
    False,
    #[token("null")]
    Null,

    // Delimiters
    #[token("{")]
    BraceOpen,
    #[token("}")]
    BraceClose,
    #[token("[")]
    BracketOpen,
    #[token("]")]
    BracketClose,
    #[token("(")]
    ParenOpen,
    #[token(")")]
    ParenClose,
    #[token(",")]
    Comma,
    #[token(";")]
    Semicolon,
    #[token(":")]
    Colon,
    #[token("?")]
    Question,
    #[token("...")]
    Ellipsis,
    #[token(".")]
    Dot,
    #[token("=>")]
    FatArrow,

    // Equality and comparison
    #[token("===")]
    StrictEq,
    #[token("!==")]
    StrictNe,
    #[token("==")]
    LooseEq,
    #[token("!=")]
    LooseNe,
    #[token("<=")]
    LessOrEqual,
    #[token(">=")]
    GreaterOrEqual,
    #[token("<")]
    Less,
    #[token(">")]
    Greater,

    // Assignment
    #[token("=")]
    Equals,
    #[token("+=")]
    PlusEquals,
    #[token("-=")]
    MinusEquals,
    #[token("*=")]
    StarEquals,
    #[token("/=")]
    SlashEquals,
    #[token("%=")]
    PercentEquals,
    #[token("**=")]
    StarStarEquals,
    #[token("<<=")]
    ShiftLeftEquals,
    #[token(">>=")]
    ShiftRightEquals,
    #[token(">>>=")]
    UnsignedShiftRightEquals,
    #[token("&=")]
    AmpEquals,
    #[token("|=")]
    PipeEquals,
    #[token("^=")]
    CaretEquals,
    #[token("&&=")]
    AndAndEquals,
    #[token("||=")]
    OrOrEquals,
    #[token("??=")]
    NullishEquals,

    // Arithmetic, bitwise and logic
    #[token("++")]
    PlusPlus,
    #[token("--")]
    MinusMinus,
    #[token("+")]
    Plus,
    #[token("-")]
    Minus,
    #[token("*")]
    Star,
    #[token("**")]
    StarStar,
    #[token("/")]
    Slash,
    #[token("%")]
    Percent,
    #[token("<<")]
    ShiftLeft,
    #[token(">>")]
    ShiftRight,
    #[token(">>>")]
    UnsignedShiftRight,
    #[token("&")]
    Amp,
    #[token("|")]
    Pipe,
    #[token("^")]
    Caret,
    #[token("~")]
    Tilde,
    #[token("&&")]
    AndAnd,
    #[token("||")]
    OrOr,
    #[token("??")]
    Nullish,
    #[token("!")]
    Bang,

    // Literals - identifiers must come after keywords. Letter numbers (\p{Nl})
    // are legal identifier characters, which is what directive markers use.
    #[regex(r"[\p{L}\p{Nl}_$][\p{L}\p{Nl}\p{Mn}\p{Mc}\p{Nd}\p{Pc}_$]*", |lex| lex.slice().to_string(), priority = 1)]
    Ident(String),

    #[regex(r#""([^"\\\n]|\\.)*""#, |lex| unescape(lex.slice()))]
    #[regex(r#"'([^'\\\n]|\\.)*'"#, |lex| unescape(lex.slice()))]
    String(String),

    #[regex(r"[0-9]+(\.[0-9]*)?([eE][+-]?[0-9]+)?", |lex| lex.slice().parse::<f64>().ok())]
    #[regex(r"\.[0-9]+([eE][+-]?[0-9]+)?", |lex| lex.slice().parse::<f64>().ok())]
    #[regex(r"0[xX][0-9a-fA-F]+", |lex| radix(lex.slice(), 16))]
    #[regex(r"0[oO][0-7]+", |lex| radix(lex.slice(), 8))]
    #[regex(r"0[bB][01]+", |lex| radix(lex.slice(), 2))]
    Number(f64),

    // Comments (skip)
    #[regex(r"//[^\n]*", logos::skip)]
    LineComment,

    #[regex(r"/\*([^*]|\*+[^*/])*\*+/", logos::skip)]
    BlockComment,
}

impl Token {
    /// Source text of a reserved word, for positions where keywords are plain names
    /// (property keys, member properties).
    pub fn keyword(&self) -> Option<&'static str> {
        let word = match self {
            Token::Var => "var",
            Token::Let => "let",
            Token::Const => "const",
            Token::Function => "function",
            Token::Return => "return",
            Token::If => "if",
            Token::Else => "else",
            Token::While => "while",
            Token::Do => "do",
            Token::For => "for",
            Token::Break => "break",
            Token::Continue => "continue",
            Token::Switch => "switch",
            Token::Case => "case",
            Token::Try => "try",
            Token::Catch => "catch",
            Token::Finally => "finally",
            Token::Throw => "throw",
            Token::Import => "import",
            Token::Export => "export",
            Token::Default => "default",
            Token::New => "new",
            Token::Typeof => "typeof",
            Token::Void => "void",
            Token::Delete => "delete",
            Token::Instanceof => "instanceof",
            Token::In => "in",
            Token::This => "this",
            Token::True => "true",
            Token::False => "false",
            Token::Null => "null",
            _ => return None,
        };
        Some(word)
    }
}

/// Strip the quotes of a string literal and resolve its escape sequences
fn unescape(quoted: &str) -> Option<String> {
    let inner = &quoted[1..quoted.len() - 1];
    let mut out = String::with_capacity(inner.len());
    let mut chars = inner.chars();

    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next()? {
            'n' => out.push('\n'),
            'r' => out.push('\r'),
            't' => out.push('\t'),
            'b' => out.push('\u{8}'),
            'f' => out.push('\u{c}'),
            'v' => out.push('\u{b}'),
            '0' => out.push('\0'),
            'u' => {
                let code: String = chars.by_ref().take(4).collect();
                let value = u32::from_str_radix(&code, 16).ok()?;
                out.push(char::from_u32(value)?);
            }
            other => out.push(other),
        }
    }

    Some(out)
}

/// `0x..`, `0o..` and `0b..` integer literals
fn radix(literal: &str, radix: u32) -> Option<f64> {
    u64::from_str_radix(&literal[2..], radix)
        .ok()
        .map(|value| value as f64)
}

/// Token stream of one source text
#[derive(Debug, Clone)]
pub struct Lexed {
    pub tokens: Vec<(Token, Span)>,
    pub line_starts: LineStarts,
}

/// Start offsets of the tokens that follow a line terminator
///
/// Automatic semicolon insertion and the no-line-break rules (`return`,
/// postfix `++`) read these; the token stream itself carries no newlines.
#[derive(Debug, Clone)]
pub struct LineStarts(Rc<[usize]>);

impl LineStarts {
    /// Whether the token starting at `offset` is the first on its line
    pub fn contains(&self, offset: usize) -> bool {
        self.0.binary_search(&offset).is_ok()
    }
}

/// Lex input string into tokens with spans
///
/// Characters outside the supported language fail the whole input, as does
/// a number running straight into a name (`1.toFixed`, `10n`).
pub fn lex(input: &str) -> Result<Lexed, Vec<ParseError>> {
    let mut tokens: Vec<(Token, Span)> = Vec::new();
    let mut line_starts = Vec::new();
    let mut errors = Vec::new();
    let mut previous_end = 0;

    for (token, span) in Token::lexer(input).spanned() {
        let token = match token {
            Ok(token) => token,
            Err(()) => {
                errors.push(unexpected(input, span, "Unexpected character"));
                continue;
            }
        };

        if let Some((Token::Number(_), previous)) = tokens.last() {
            if previous.end == span.start && matches!(token, Token::Ident(_) | Token::Number(_)) {
                errors.push(unexpected(
                    input,
                    previous.start..span.end,
                    "Identifier starts immediately after numeric literal",
                ));
            }
        }

        let gap = &input[previous_end..span.start];
        if gap.contains(|c: char| matches!(c, '\n' | '\r' | '\u{2028}' | '\u{2029}')) {
            line_starts.push(span.start);
        }
        previous_end = span.end;
        tokens.push((token, span));
    }

    if errors.is_empty() {
        Ok(Lexed {
            tokens,
            line_starts: LineStarts(line_starts.into()),
        })
    } else {
        Err(errors)
    }
}

fn unexpected(input: &str, span: Span, message: &str) -> ParseError {
    ParseError::Syntax {
        message: format!("{} '{}'", message, &input[span.clone()]),
        span,
        expected: Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tokens(input: &str) -> Vec<Token> {
        lex(input)
            .expect("Should lex")
            .tokens
            .into_iter()
            .map(|(t, _)| t)
            .collect()
    }

    #[test]
    fn test_declaration_keywords() {
        assert_eq!(
            tokens("var let const function"),
            vec![Token::Var, Token::Let, Token::Const, Token::Function]
        );
    }

    #[test]
    fn test_keywords_inside_identifiers() {
        assert_eq!(
            tokens("iffy constant newValue"),
            vec![
                Token::Ident("iffy".to_string()),
                Token::Ident("constant".to_string()),
                Token::Ident("newValue".to_string()),
            ]
        );
    }

    #[test]
    fn test_dollar_identifiers() {
        assert_eq!(
            tokens("$http $inject _private"),
            vec![
                Token::Ident("$http".to_string()),
                Token::Ident("$inject".to_string()),
                Token::Ident("_private".to_string()),
            ]
        );
    }

    #[test]
    fn test_directive_markers_are_identifier_characters() {
        assert_eq!(
            tokens("𐅙variable𐅙testProp𐅞sub𐅂firstToUpper"),
            vec![Token::Ident(
                "𐅙variable𐅙testProp𐅞sub𐅂firstToUpper".to_string()
            )]
        );
    }

    #[test]
    fn test_strings() {
        assert_eq!(
            tokens(r#"'single' "double" 'it\'s' "a\nb""#),
            vec![
                Token::String("single".to_string()),
                Token::String("double".to_string()),
                Token::String("it's".to_string()),
                Token::String("a\nb".to_string()),
            ]
        );
    }

    #[test]
    fn test_unicode_escape() {
        assert_eq!(tokens(r"'\u0041b'"), vec![Token::String("Ab".to_string())]);
    }

    #[test]
    fn test_numbers() {
        assert_eq!(
            tokens("42 3.14 1e3"),
            vec![
                Token::Number(42.0),
                Token::Number(3.14),
                Token::Number(1000.0)
            ]
        );
    }

    #[test]
    fn test_operators_longest_match() {
        assert_eq!(
            tokens("=== !== == != = => <= >= && || ?? ... ."),
            vec![
                Token::StrictEq,
                Token::StrictNe,
                Token::LooseEq,
                Token::LooseNe,
                Token::Equals,
                Token::FatArrow,
                Token::LessOrEqual,
                Token::GreaterOrEqual,
                Token::AndAnd,
                Token::OrOr,
                Token::Nullish,
                Token::Ellipsis,
                Token::Dot,
            ]
        );
    }

    #[test]
    fn test_comments_skipped() {
        assert_eq!(
            tokens("a // comment\nb /* block ** comment */ c"),
            vec![
                Token::Ident("a".to_string()),
                Token::Ident("b".to_string()),
                Token::Ident("c".to_string()),
            ]
        );
    }

    #[test]
    fn test_member_access() {
        assert_eq!(
            tokens("apiService.$inject = ['ENV'];"),
            vec![
                Token::Ident("apiService".to_string()),
                Token::Dot,
                Token::Ident("$inject".to_string()),
                Token::Equals,
                Token::BracketOpen,
                Token::String("ENV".to_string()),
                Token::BracketClose,
                Token::Semicolon,
            ]
        );
    }

    #[test]
    fn test_keyword_names() {
        assert_eq!(Token::Delete.keyword(), Some("delete"));
        assert_eq!(Token::Default.keyword(), Some("default"));
        assert_eq!(Token::Comma.keyword(), None);
    }

    #[test]
    fn test_numeric_forms() {
        assert_eq!(
            tokens("0x1F 0o17 0b101 .5 1."),
            vec![
                Token::Number(31.0),
                Token::Number(15.0),
                Token::Number(5.0),
                Token::Number(0.5),
                Token::Number(1.0),
            ]
        );
    }

    #[test]
    fn test_bitwise_and_update_operators() {
        assert_eq!(
            tokens("~ & | ^ << >> >>> ** ++ -- >>>= ??= &&="),
            vec![
                Token::Tilde,
                Token::Amp,
                Token::Pipe,
                Token::Caret,
                Token::ShiftLeft,
                Token::ShiftRight,
                Token::UnsignedShiftRight,
                Token::StarStar,
                Token::PlusPlus,
                Token::MinusMinus,
                Token::UnsignedShiftRightEquals,
                Token::NullishEquals,
                Token::AndAndEquals,
            ]
        );
    }

    #[test]
    fn test_unknown_character_is_an_error() {
        let errors = lex("x = `a`;").expect_err("Should fail");
        assert_eq!(errors.len(), 2);
        assert_eq!(errors[0].span(), &(4..5));
        assert!(errors[0].to_string().contains("Unexpected character '`'"));

        let errors = lex("@decorator\nclass A {}").expect_err("Should fail");
        assert_eq!(errors[0].span(), &(0..1));
    }

    #[test]
    fn test_number_followed_by_name_is_an_error() {
        let errors = lex("x = 10n;").expect_err("Should fail");
        assert_eq!(errors[0].span(), &(4..7));
        assert!(lex("x = 1.toFixed(2);").is_err());
        assert!(lex("x = 1..toFixed(2);").is_ok());
    }

    #[test]
    fn test_unterminated_string_is_an_error() {
        assert!(lex("x = 'abc;").is_err());
    }

    #[test]
    fn test_line_starts() {
        let lexed = lex("a\nb /* c\n */ d // e\nf").expect("Should lex");
        let starts: Vec<usize> = lexed.tokens.iter().map(|(_, span)| span.start).collect();
        assert_eq!(starts, vec![0, 2, 13, 20]);
        assert!(!lexed.line_starts.contains(0));
        assert!(lexed.line_starts.contains(2));
        assert!(!lexed.line_starts.contains(4));
        assert!(lexed.line_starts.contains(13));
        assert!(lexed.line_starts.contains(20));
    }
}
