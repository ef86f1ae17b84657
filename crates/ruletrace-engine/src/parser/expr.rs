//! Expression grammar: sequences, conditionals, Pratt binary operators,
//! prefix operators, postfix chains and primaries.

use smallvec::SmallVec;

use ruletrace_core::ops::CONDITIONAL_PRECEDENCE;
use ruletrace_core::{BinaryOp, CompileError, Node, NodeId, UnaryOp};

use super::Parser;
use crate::builtins;
use crate::lexer::Token;

/// Binary operator for a token in infix position, with its precedence.
fn binary_op_info(token: &Token) -> Option<BinaryOp> {
    let op = match token {
        Token::OrOr => BinaryOp::Or,
        Token::AndAnd => BinaryOp::And,
        Token::EqEq => BinaryOp::Eq,
        Token::BangEq => BinaryOp::Ne,
        Token::Lt => BinaryOp::Lt,
        Token::LtEq => BinaryOp::Le,
        Token::Gt => BinaryOp::Gt,
        Token::GtEq => BinaryOp::Ge,
        Token::In => BinaryOp::In,
        Token::Matches => BinaryOp::Matches,
        Token::Contains => BinaryOp::Contains,
        Token::StartsWith => BinaryOp::StartsWith,
        Token::EndsWith => BinaryOp::EndsWith,
        Token::DotDot => BinaryOp::Range,
        Token::Plus => BinaryOp::Add,
        Token::Minus => BinaryOp::Sub,
        Token::Star => BinaryOp::Mul,
        Token::Slash => BinaryOp::Div,
        Token::Percent => BinaryOp::Mod,
        Token::StarStar => BinaryOp::Pow,
        Token::QuestionQuestion => BinaryOp::Coalesce,
        _ => return None,
    };
    Some(op)
}

fn starts_primary(token: &Token) -> bool {
    matches!(
        token,
        Token::Nil
            | Token::True
            | Token::False
            | Token::Int(_)
            | Token::Float(_)
            | Token::Str(_)
            | Token::Bytes(_)
            | Token::Ident(_)
            | Token::Hash
            | Token::LParen
            | Token::LBracket
            | Token::LBrace
    )
}

impl Parser {
    /// `item (; item)*` where a `let` item binds the rest of the sequence.
    pub(super) fn parse_sequence(&mut self) -> Result<NodeId, CompileError> {
        let mut items = Vec::new();
        loop {
            if self.stream.check(&Token::Let) {
                items.push(self.parse_let()?);
                break;
            }
            items.push(self.parse_conditional()?);
            if !self.stream.eat(&Token::Semicolon) {
                break;
            }
        }
        if items.len() == 1 {
            Ok(items[0])
        } else {
            Ok(self.push(Node::Sequence(items)))
        }
    }

    fn parse_let(&mut self) -> Result<NodeId, CompileError> {
        self.stream.expect(Token::Let)?;
        let name = match self.stream.peek() {
            Some(Token::Ident(name)) => name.clone(),
            _ => return Err(self.stream.unexpected("variable name")),
        };
        self.stream.advance();
        self.stream.expect(Token::Assign)?;
        let value = self.parse_conditional()?;
        self.stream.expect(Token::Semicolon)?;
        let body = self.parse_sequence()?;
        Ok(self.push(Node::Let { name, value, body }))
    }

    /// `binary (? conditional : conditional)?`
    pub(super) fn parse_conditional(&mut self) -> Result<NodeId, CompileError> {
        let cond = self.parse_binary(CONDITIONAL_PRECEDENCE + 1)?;
        if !self.stream.eat(&Token::Question) {
            return Ok(cond);
        }
        let then = self.parse_conditional()?;
        self.stream.expect(Token::Colon)?;
        let otherwise = self.parse_conditional()?;
        Ok(self.push(Node::Conditional {
            cond,
            then,
            otherwise,
        }))
    }

    /// Pratt loop over binary operators with precedence >= `min_prec`.
    fn parse_binary(&mut self, min_prec: u8) -> Result<NodeId, CompileError> {
        let mut left = self.parse_prefix()?;

        loop {
            // `a not in b` and friends: negated predicate operators.
            let negated = self.stream.check(&Token::Bang)
                && matches!(
                    self.stream.peek_nth(1).and_then(binary_op_info),
                    Some(op) if op.is_predicate()
                );
            let lookahead = if negated {
                self.stream.peek_nth(1)
            } else {
                self.stream.peek()
            };
            let Some(op) = lookahead.and_then(binary_op_info) else {
                break;
            };
            let prec = op.precedence();
            if prec < min_prec {
                break;
            }
            if negated {
                self.stream.advance();
            }
            self.stream.advance();

            let next_prec = if op.is_right_assoc() { prec } else { prec + 1 };
            let right = self.parse_binary(next_prec)?;
            left = self.push(Node::Binary { op, left, right });
            if negated {
                left = self.push(Node::Unary {
                    op: UnaryOp::Not,
                    operand: left,
                });
            }
        }

        Ok(left)
    }

    fn parse_prefix(&mut self) -> Result<NodeId, CompileError> {
        let op = match self.stream.peek() {
            Some(Token::Bang) => UnaryOp::Not,
            Some(Token::Minus) => UnaryOp::Neg,
            Some(Token::Plus) => UnaryOp::Plus,
            _ => return self.parse_postfix(),
        };
        self.stream.advance();
        let operand = self.parse_prefix()?;
        Ok(self.push(Node::Unary { op, operand }))
    }

    /// Member access, indexing and slicing after a primary. A chain that
    /// uses `?.` anywhere is wrapped in a [`Node::Chain`].
    fn parse_postfix(&mut self) -> Result<NodeId, CompileError> {
        let mut expr = self.parse_primary()?;
        let mut optional_chain = false;

        loop {
            match self.stream.peek() {
                Some(Token::Dot) => {
                    self.stream.advance();
                    let property = self.parse_member_name()?;
                    expr = self.push(Node::Member {
                        base: expr,
                        property,
                        optional: false,
                    });
                }
                Some(Token::QuestionDot) => {
                    self.stream.advance();
                    optional_chain = true;
                    let property = if self.stream.eat(&Token::LBracket) {
                        let index = self.parse_conditional()?;
                        self.stream.expect(Token::RBracket)?;
                        index
                    } else {
                        self.parse_member_name()?
                    };
                    expr = self.push(Node::Member {
                        base: expr,
                        property,
                        optional: true,
                    });
                }
                Some(Token::LBracket) => {
                    self.stream.advance();
                    expr = self.parse_index_or_slice(expr)?;
                }
                _ => break,
            }
        }

        if optional_chain {
            expr = self.push(Node::Chain(expr));
        }
        Ok(expr)
    }

    /// Name after `.` or `?.`; keywords are accepted as plain names.
    fn parse_member_name(&mut self) -> Result<NodeId, CompileError> {
        let name = match self.stream.peek() {
            Some(Token::Ident(name)) => name.clone(),
            Some(token) => match token.keyword() {
                Some(word) => word.to_string(),
                None => return Err(self.stream.unexpected("member name")),
            },
            None => return Err(self.stream.unexpected("member name")),
        };
        self.stream.advance();
        Ok(self.push(Node::String(name)))
    }

    /// After `[`: `index]`, `from:to]`, `:to]`, `from:]` or `:]`.
    fn parse_index_or_slice(&mut self, base: NodeId) -> Result<NodeId, CompileError> {
        let from = if self.stream.check(&Token::Colon) {
            None
        } else {
            Some(self.parse_conditional()?)
        };

        if !self.stream.eat(&Token::Colon) {
            self.stream.expect(Token::RBracket)?;
            let property = from.ok_or_else(|| self.stream.unexpected("index"))?;
            return Ok(self.push(Node::Member {
                base,
                property,
                optional: false,
            }));
        }

        let to = if self.stream.check(&Token::RBracket) {
            None
        } else {
            Some(self.parse_conditional()?)
        };
        self.stream.expect(Token::RBracket)?;
        Ok(self.push(Node::Slice { base, from, to }))
    }

    fn parse_primary(&mut self) -> Result<NodeId, CompileError> {
        if !self.stream.peek().is_some_and(starts_primary) {
            return Err(self.stream.unexpected("expression"));
        }
        let Some(token) = self.stream.advance() else {
            return Err(self.stream.unexpected("expression"));
        };
        let node = match token {
            Token::Nil => Node::Nil,
            Token::True => Node::Bool(true),
            Token::False => Node::Bool(false),
            Token::Int(i) => Node::Integer(i),
            Token::Float(x) => Node::Float(x),
            Token::Str(s) => Node::String(s),
            Token::Bytes(b) => Node::Bytes(b),
            Token::Ident(name) => {
                if self.stream.check(&Token::LParen) {
                    return self.parse_call(name);
                }
                Node::Identifier(name)
            }
            Token::Hash => {
                let name = match self.stream.peek() {
                    Some(Token::Ident(name)) if self.stream.adjacent(0) => name.clone(),
                    _ => String::new(),
                };
                if !name.is_empty() {
                    self.stream.advance();
                }
                Node::Pointer(name)
            }
            Token::LParen => {
                let inner = self.parse_sequence()?;
                self.stream.expect(Token::RParen)?;
                return Ok(inner);
            }
            Token::LBracket => {
                let items = self.parse_list(Token::RBracket, Self::parse_conditional)?;
                Node::Array(items)
            }
            Token::LBrace => {
                let pairs = self.parse_list(Token::RBrace, Self::parse_pair)?;
                Node::Map(pairs)
            }
            _ => unreachable!("rejected by starts_primary"),
        };
        Ok(self.push(node))
    }

    /// Comma separated items up to `close`, allowing a trailing comma.
    fn parse_list(
        &mut self,
        close: Token,
        mut item: impl FnMut(&mut Self) -> Result<NodeId, CompileError>,
    ) -> Result<Vec<NodeId>, CompileError> {
        let mut items = Vec::new();
        while !self.stream.check(&close) {
            items.push(item(self)?);
            if !self.stream.eat(&Token::Comma) {
                break;
            }
        }
        self.stream.expect(close)?;
        Ok(items)
    }

    /// `key: value` where key is an identifier, keyword or string.
    fn parse_pair(&mut self) -> Result<NodeId, CompileError> {
        let key = match self.stream.peek() {
            Some(Token::Str(s)) => {
                let s = s.clone();
                self.stream.advance();
                self.push(Node::String(s))
            }
            _ => self.parse_member_name()?,
        };
        self.stream.expect(Token::Colon)?;
        let value = self.parse_conditional()?;
        Ok(self.push(Node::Pair { key, value }))
    }

    /// `name(args)`: a builtin if `name` is one, otherwise a call of a
    /// registered function.
    fn parse_call(&mut self, name: String) -> Result<NodeId, CompileError> {
        self.stream.expect(Token::LParen)?;
        let predicate_at = builtins::lookup(&name).and_then(|b| b.predicate);

        let mut args: SmallVec<[NodeId; 4]> = SmallVec::new();
        while !self.stream.check(&Token::RParen) {
            let arg = if predicate_at == Some(args.len()) {
                self.parse_predicate()?
            } else {
                self.parse_conditional()?
            };
            args.push(arg);
            if !self.stream.eat(&Token::Comma) {
                break;
            }
        }
        self.stream.expect(Token::RParen)?;

        if builtins::lookup(&name).is_some() {
            return Ok(self.push(Node::Builtin { name, args }));
        }
        let callee = self.push(Node::Identifier(name));
        Ok(self.push(Node::Call { callee, args }))
    }

    /// `{ body }` or a bare expression, in predicate position.
    fn parse_predicate(&mut self) -> Result<NodeId, CompileError> {
        let body = if self.stream.eat(&Token::LBrace) {
            let body = self.parse_sequence()?;
            self.stream.expect(Token::RBrace)?;
            body
        } else {
            self.parse_conditional()?
        };
        Ok(self.push(Node::Predicate(body)))
    }
}
