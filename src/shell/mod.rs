pub mod ast;
pub mod executor;

pub use ast::{CommandNode, OpenMode, Redirection, SimpleCommand, Word, WordPart};
pub use executor::{ExecContext, ExecutionResult, Executor};
