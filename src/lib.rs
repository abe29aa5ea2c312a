pub mod ast;
pub mod cli;
pub mod diagnostic;
pub mod interpreter;
pub mod lexer;
pub mod token;
pub mod types;
pub mod value;

pub use ast::{Expr, ExprKind, Stmt};
pub use interpreter::{Interpreter, Outcome, Session};
pub use token::Token;
pub use value::Value;
