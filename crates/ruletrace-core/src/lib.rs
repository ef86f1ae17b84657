pub mod ast;
pub mod engine;
pub mod error;
pub mod id;
pub mod node;
pub mod ops;
pub mod value;

// Re-export commonly used types
pub use ast::Ast;
pub use engine::{CompileOptions, ExpressionEngine, NativeFn};
pub use error::{CompileError, EvalError};
pub use id::NodeId;
pub use node::{ConstSet, Node};
pub use ops::{BinaryOp, UnaryOp};
pub use value::{Env, Value};
