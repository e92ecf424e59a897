use std::io::{self, Write};
use std::path::Path;
use std::process;

use log::{debug, warn};

use crate::shell::ast::SimpleCommand;

use super::context::ExecContext;
use super::redirect::{apply_redirections, StdioGuard};
use super::status::{ExecutionResult, SHELL_EXIT_STATUS};

/// 在 shell 进程内部执行、不 fork 的命令
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Builtin {
    Cd,
    Exit,
    True,
    False,
    Assign,
}

impl Builtin {
    /// 按 cd、exit/quit、true、false、赋值 的顺序匹配，第一个命中的生效
    pub fn detect(command: &SimpleCommand, ctx: &ExecContext) -> Option<Builtin> {
        match ctx.expand(&command.verb).as_str() {
            "cd" => Some(Builtin::Cd),
            "exit" | "quit" => Some(Builtin::Exit),
            "true" => Some(Builtin::True),
            "false" => Some(Builtin::False),
            _ => command.assignment().map(|_| Builtin::Assign),
        }
    }

    pub fn run(self, command: &SimpleCommand, ctx: &mut ExecContext) -> io::Result<ExecutionResult> {
        debug!("执行内建命令: {}", command);

        if self == Builtin::Exit {
            builtin_exit();
        }

        // 内建命令没有输出，重定向只为了创建/截断文件，装上后立刻还原
        if command.has_redirections() {
            let base = ctx.current_dir()?;
            let _stdio = StdioGuard::save()?;
            apply_redirections(command, &base, ctx.expander())?;
        }

        let result = match self {
            Builtin::Cd => builtin_cd(command, ctx),
            Builtin::True => ExecutionResult::SUCCESS,
            Builtin::False => ExecutionResult::FAILURE,
            Builtin::Assign => builtin_assign(command, ctx),
            Builtin::Exit => builtin_exit(),
        };
        Ok(result)
    }
}

fn builtin_cd(command: &SimpleCommand, ctx: &mut ExecContext) -> ExecutionResult {
    let [dir] = command.params.as_slice() else {
        warn!("cd 需要恰好一个参数，实际为 {} 个", command.params.len());
        let _ = writeln!(io::stderr(), "{}: cd: expected exactly one argument", ctx.name());
        return ExecutionResult::FAILURE;
    };

    let dir = ctx.expand(dir);
    let dir = shellexpand::tilde(&dir);
    match ctx.change_dir(Path::new(dir.as_ref())) {
        Ok(()) => ExecutionResult::SUCCESS,
        Err(e) => {
            warn!("cd 失败: {}: {}", dir, e);
            let _ = writeln!(io::stderr(), "{}: cd: {}: {}", ctx.name(), dir, e);
            ExecutionResult::FAILURE
        }
    }
}

fn builtin_assign(command: &SimpleCommand, ctx: &mut ExecContext) -> ExecutionResult {
    match command.assignment() {
        Some((name, value)) => {
            let value = ctx.expand(&value);
            ctx.assign(&name, &value);
            ExecutionResult::SUCCESS
        }
        None => ExecutionResult::FAILURE,
    }
}

fn builtin_exit() -> ! {
    let _ = io::stdout().flush();
    process::exit(SHELL_EXIT_STATUS);
}
