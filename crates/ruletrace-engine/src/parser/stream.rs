//! Token stream wrapper for the hand-written parser.

use std::mem;
use std::ops::Range;

use ruletrace_core::CompileError;

use crate::lexer::Token;

/// Token stream with lookahead and byte-offset tracking.
pub struct TokenStream {
    tokens: Vec<(Token, Range<usize>)>,
    pos: usize,
}

impl TokenStream {
    pub fn new(tokens: Vec<(Token, Range<usize>)>) -> Self {
        TokenStream { tokens, pos: 0 }
    }

    /// Peek at the current token without consuming it.
    pub fn peek(&self) -> Option<&Token> {
        self.peek_nth(0)
    }

    /// Peek at the nth token ahead without consuming.
    pub fn peek_nth(&self, n: usize) -> Option<&Token> {
        self.tokens.get(self.pos + n).map(|(tok, _)| tok)
    }

    /// Consume the current token and return it.
    pub fn advance(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).map(|(tok, _)| tok.clone());
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    /// True if the current token has the same variant as `expected`.
    pub fn check(&self, expected: &Token) -> bool {
        matches!(self.peek(), Some(t) if mem::discriminant(t) == mem::discriminant(expected))
    }

    /// Consume `expected` if it is next.
    pub fn eat(&mut self, expected: &Token) -> bool {
        if self.check(expected) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    /// Consume `expected` or fail with a positioned error.
    pub fn expect(&mut self, expected: Token) -> Result<(), CompileError> {
        if self.eat(&expected) {
            Ok(())
        } else {
            Err(self.unexpected(&expected.to_string()))
        }
    }

    pub fn at_end(&self) -> bool {
        self.pos >= self.tokens.len()
    }

    /// True if the token at `pos + n` starts exactly where the previous one
    /// ends (no whitespace between them). `adjacent(0)` compares the current
    /// token with the one just consumed.
    pub fn adjacent(&self, n: usize) -> bool {
        let Some(prev_index) = (self.pos + n).checked_sub(1) else {
            return false;
        };
        let (Some(prev), Some(next)) = (
            self.tokens.get(prev_index),
            self.tokens.get(self.pos + n),
        ) else {
            return false;
        };
        prev.1.end == next.1.start
    }

    /// Builds an error describing the current token (or end of input).
    pub fn unexpected(&self, expected: &str) -> CompileError {
        match self.tokens.get(self.pos) {
            Some((token, span)) => CompileError::UnexpectedToken {
                found: token.to_string(),
                expected: expected.to_string(),
                offset: span.start,
            },
            None => CompileError::UnexpectedEnd {
                expected: expected.to_string(),
            },
        }
    }
}
