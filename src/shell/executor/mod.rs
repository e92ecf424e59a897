mod builtin;
mod context;
#[allow(clippy::module_inception)]
mod executor;
mod process;
pub mod redirect;
mod status;
mod variable;

pub use builtin::Builtin;
pub use context::ExecContext;
pub use executor::Executor;
pub use process::{exec_in_place, launch, spawn_branch, wait_child, Pipe, Wiring};
pub use status::{
    ChildExit, ExecutionResult, COMMAND_NOT_FOUND_STATUS, FATAL_STATUS, SHELL_EXIT_STATUS,
};
pub use variable::{EnvExpander, WordExpander};
