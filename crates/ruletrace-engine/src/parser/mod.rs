//! Hand-written recursive descent parser producing an arena [`Ast`].
//!
//! ## Architecture
//!
//! - `stream`: [`TokenStream`] wrapper with lookahead
//! - `expr`: sequence / conditional / Pratt binary / prefix / postfix /
//!   primary parsing
//!
//! Parentheses do not produce nodes; grouping is encoded by tree shape
//! alone, and the canonical formatter re-derives the parentheses it needs
//! from operator precedence.

mod expr;
mod stream;

pub use stream::TokenStream;

use ruletrace_core::{Ast, CompileError, Node, NodeId};

use crate::lexer::tokenize;

/// Parses `source` into a syntax tree.
pub fn parse(source: &str) -> Result<Ast, CompileError> {
    let tokens = tokenize(source)?;
    let mut parser = Parser::new(TokenStream::new(tokens));
    let root = parser.parse_sequence()?;
    if !parser.stream.at_end() {
        return Err(parser.stream.unexpected("end of input"));
    }
    parser.ast.set_root(root);
    Ok(parser.ast)
}

/// Parser state: the token stream and the arena being filled.
pub(crate) struct Parser {
    stream: TokenStream,
    ast: Ast,
}

impl Parser {
    fn new(stream: TokenStream) -> Self {
        Parser {
            stream,
            ast: Ast::builder(),
        }
    }

    fn push(&mut self, node: Node) -> NodeId {
        self.ast.push(node)
    }
}
