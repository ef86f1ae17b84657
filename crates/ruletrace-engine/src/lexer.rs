//! Lexical analysis for expression source using logos.
//!
//! Word operators (`and`, `or`, `not`) lex to the same tokens as their
//! symbolic forms, so the parser never sees the difference and the canonical
//! formatter always emits the symbolic spelling.

use std::fmt;
use std::ops::Range;

use logos::Logos;
use ruletrace_core::CompileError;

/// Expression token.
#[derive(Logos, Debug, Clone, PartialEq)]
#[logos(skip r"[ \t\r\n\f]+")]
pub enum Token {
    // === Keywords ===
    #[token("nil")]
    #[token("null")]
    Nil,
    #[token("true")]
    True,
    #[token("false")]
    False,
    #[token("let")]
    Let,
    #[token("in")]
    In,
    #[token("matches")]
    Matches,
    #[token("contains")]
    Contains,
    #[token("startsWith")]
    StartsWith,
    #[token("endsWith")]
    EndsWith,

    // === Logical ===
    #[token("||")]
    #[token("or")]
    OrOr,
    #[token("&&")]
    #[token("and")]
    AndAnd,
    #[token("!")]
    #[token("not")]
    Bang,
    #[token("??")]
    QuestionQuestion,

    // === Comparison ===
    #[token("==")]
    EqEq,
    #[token("!=")]
    BangEq,
    #[token("<")]
    Lt,
    #[token("<=")]
    LtEq,
    #[token(">")]
    Gt,
    #[token(">=")]
    GtEq,

    // === Arithmetic ===
    #[token("+")]
    Plus,
    #[token("-")]
    Minus,
    #[token("*")]
    Star,
    #[token("/")]
    Slash,
    #[token("%")]
    Percent,
    #[token("**")]
    #[token("^")]
    StarStar,
    #[token("..")]
    DotDot,

    // === Punctuation ===
    #[token("?.")]
    QuestionDot,
    #[token("?")]
    Question,
    #[token(":")]
    Colon,
    #[token(".")]
    Dot,
    #[token(",")]
    Comma,
    #[token(";")]
    Semicolon,
    #[token("=")]
    Assign,
    #[token("#")]
    Hash,
    #[token("(")]
    LParen,
    #[token(")")]
    RParen,
    #[token("[")]
    LBracket,
    #[token("]")]
    RBracket,
    #[token("{")]
    LBrace,
    #[token("}")]
    RBrace,

    // === Literals ===
    #[regex(r"[0-9]+", |lex| lex.slice().parse::<i64>().ok())]
    Int(i64),

    #[regex(r"[0-9]+\.[0-9]+([eE][+-]?[0-9]+)?", parse_float)]
    #[regex(r"[0-9]+[eE][+-]?[0-9]+", parse_float)]
    Float(f64),

    #[regex(r#""([^"\\]|\\.)*""#, |lex| unquote(lex.slice()))]
    #[regex(r"'([^'\\]|\\.)*'", |lex| unquote(lex.slice()))]
    Str(String),

    #[regex(r#"b"([^"\\]|\\.)*""#, |lex| unquote_bytes(lex.slice()))]
    Bytes(Vec<u8>),

    #[regex(r"[A-Za-z_$][A-Za-z0-9_$]*", |lex| lex.slice().to_string())]
    Ident(String),
}

impl Token {
    /// The keyword spelling of a word token, if it is one. Used where a
    /// keyword is accepted as a member or map key name (`user.in`).
    pub fn keyword(&self) -> Option<&'static str> {
        match self {
            Token::Nil => Some("nil"),
            Token::True => Some("true"),
            Token::False => Some("false"),
            Token::Let => Some("let"),
            Token::In => Some("in"),
            Token::Matches => Some("matches"),
            Token::Contains => Some("contains"),
            Token::StartsWith => Some("startsWith"),
            Token::EndsWith => Some("endsWith"),
            _ => None,
        }
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Token::Int(i) => return write!(f, "integer {}", i),
            Token::Float(x) => return write!(f, "float {}", x),
            Token::Str(s) => return write!(f, "string {:?}", s),
            Token::Bytes(_) => "byte string",
            Token::Ident(name) => return write!(f, "identifier {}", name),
            Token::Nil => "nil",
            Token::True => "true",
            Token::False => "false",
            Token::Let => "let",
            Token::In => "in",
            Token::Matches => "matches",
            Token::Contains => "contains",
            Token::StartsWith => "startsWith",
            Token::EndsWith => "endsWith",
            Token::OrOr => "||",
            Token::AndAnd => "&&",
            Token::Bang => "!",
            Token::QuestionQuestion => "??",
            Token::EqEq => "==",
            Token::BangEq => "!=",
            Token::Lt => "<",
            Token::LtEq => "<=",
            Token::Gt => ">",
            Token::GtEq => ">=",
            Token::Plus => "+",
            Token::Minus => "-",
            Token::Star => "*",
            Token::Slash => "/",
            Token::Percent => "%",
            Token::StarStar => "**",
            Token::DotDot => "..",
            Token::QuestionDot => "?.",
            Token::Question => "?",
            Token::Colon => ":",
            Token::Dot => ".",
            Token::Comma => ",",
            Token::Semicolon => ";",
            Token::Assign => "=",
            Token::Hash => "#",
            Token::LParen => "(",
            Token::RParen => ")",
            Token::LBracket => "[",
            Token::RBracket => "]",
            Token::LBrace => "{",
            Token::RBrace => "}",
        };
        write!(f, "'{}'", text)
    }
}

/// Tokenizes `source` into tokens with byte spans.
pub fn tokenize(source: &str) -> Result<Vec<(Token, Range<usize>)>, CompileError> {
    let mut lexer = Token::lexer(source);
    let mut out = Vec::new();
    while let Some(result) = lexer.next() {
        let span = lexer.span();
        match result {
            Ok(token) => out.push((token, span)),
            Err(()) => {
                let found = source[span.clone()].to_string();
                let offset = span.start;
                return Err(if found.starts_with(|c: char| c.is_ascii_digit()) {
                    CompileError::NumberOutOfRange { literal: found, offset }
                } else {
                    CompileError::UnexpectedCharacter { found, offset }
                });
            }
        }
    }
    Ok(out)
}

/// Float literals must stay finite: `1e999` has no literal form to
/// format back to.
fn parse_float(lex: &mut logos::Lexer<Token>) -> Option<f64> {
    lex.slice().parse::<f64>().ok().filter(|x| x.is_finite())
}

/// Strips the surrounding quotes from a string literal and resolves escapes.
fn unquote(slice: &str) -> Option<String> {
    let content = &slice[1..slice.len() - 1];
    let bytes = unescape(content)?;
    String::from_utf8(bytes).ok()
}

fn unquote_bytes(slice: &str) -> Option<Vec<u8>> {
    // Skip the `b` prefix and both quotes.
    unescape(&slice[2..slice.len() - 1])
}

/// Resolves `\\ \" \' \n \t \r \0 \xNN` escapes.
fn unescape(content: &str) -> Option<Vec<u8>> {
    let mut out = Vec::with_capacity(content.len());
    let mut chars = content.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            let mut buf = [0u8; 4];
            out.extend_from_slice(c.encode_utf8(&mut buf).as_bytes());
            continue;
        }
        match chars.next()? {
            'n' => out.push(b'\n'),
            't' => out.push(b'\t'),
            'r' => out.push(b'\r'),
            '0' => out.push(0),
            '\\' => out.push(b'\\'),
            '"' => out.push(b'"'),
            '\'' => out.push(b'\''),
            'x' => {
                let hi = chars.next()?.to_digit(16)?;
                let lo = chars.next()?.to_digit(16)?;
                out.push((hi * 16 + lo) as u8);
            }
            _ => return None,
        }
    }
    Some(out)
}
