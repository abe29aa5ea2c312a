pub mod builtins;
pub mod control_flow;
pub mod environment;
pub mod error;
pub mod evaluator;
pub mod imports;
pub mod parser;
pub mod session;

pub use control_flow::Signal;
pub use environment::Environment;
pub use error::{ErrorKind, ExceptionValue, Outcome};
pub use evaluator::Interpreter;
pub use parser::{parse_source, ParseError, TokenParser};
pub use session::Session;
