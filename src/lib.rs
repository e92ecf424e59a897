//! 雑魚（ざこ）Shell 的求值后端。
//!
//! 输入是解析器产出的 [`CommandNode`] 树，按运算符把它映射成 fork / pipe /
//! dup2 / exec / wait，最后给出一个退出码。
//!
//! ```no_run
//! use zako_eval::{CommandNode, Executor, OpenMode, SimpleCommand};
//! use zako_eval::utils::config::Config;
//!
//! let config = Config::new();
//! zako_eval::utils::log::init_logger(&config).ok();
//!
//! let tree = CommandNode::pipe(
//!     SimpleCommand::new("echo").arg("hello").into(),
//!     SimpleCommand::new("cat").stdout("out.txt", OpenMode::Truncate).into(),
//! );
//! let status = Executor::new(&config).run(&tree);
//! std::process::exit(status);
//! ```

pub mod shell;
pub mod utils;

pub use shell::ast::{CommandNode, OpenMode, Redirection, SimpleCommand, Word, WordPart};
pub use shell::executor::{
    EnvExpander, ExecContext, ExecutionResult, Executor, WordExpander, COMMAND_NOT_FOUND_STATUS,
    FATAL_STATUS, SHELL_EXIT_STATUS,
};
