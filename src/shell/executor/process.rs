use std::ffi::CString;
use std::io::{self, Write};
use std::os::fd::{AsRawFd, OwnedFd, RawFd};
use std::path::PathBuf;
use std::process;

use libc::{STDIN_FILENO, STDOUT_FILENO};
use log::{debug, warn};
use nix::errno::Errno;
use nix::sys::wait::waitpid;
use nix::unistd::{close, dup2, execvp, fork, ForkResult, Pid};

use crate::shell::ast::SimpleCommand;

use super::context::ExecContext;
use super::redirect::{apply_redirections, StdioGuard};
use super::status::{
    ChildExit, ExecutionResult, COMMAND_NOT_FOUND_STATUS, FATAL_STATUS,
};

/// 匿名管道的两端，父进程持有，两个子进程各取所需
pub struct Pipe {
    read: OwnedFd,
    write: OwnedFd,
}

impl Pipe {
    pub fn new() -> io::Result<Self> {
        let (read, write) = nix::unistd::pipe()?;
        Ok(Self { read, write })
    }

    /// 子进程不会走到 drop，两端要手动关掉，否则读端永远等不到 EOF
    fn close_in_child(&self) {
        let _ = close(self.read.as_raw_fd());
        let _ = close(self.write.as_raw_fd());
    }
}

/// 新分支进程里标准描述符的接法
pub enum Wiring<'a> {
    Inherit,
    StdoutTo(&'a Pipe),
    StdinFrom(&'a Pipe),
}

impl Wiring<'_> {
    fn apply(&self) -> io::Result<()> {
        match self {
            Wiring::Inherit => Ok(()),
            Wiring::StdoutTo(pipe) => Self::plug(pipe, pipe.write.as_raw_fd(), STDOUT_FILENO),
            Wiring::StdinFrom(pipe) => Self::plug(pipe, pipe.read.as_raw_fd(), STDIN_FILENO),
        }
    }

    fn plug(pipe: &Pipe, end: RawFd, slot: RawFd) -> io::Result<()> {
        dup2(end, slot)?;
        pipe.close_in_child();
        Ok(())
    }
}

/// 在新进程里跑一个子树。
///
/// 子进程按 `wiring` 接好描述符后调用 `branch`，并以它的返回值退出；
/// 父进程拿到子进程 pid 立即返回。fork 失败时返回 `Err`。
pub fn spawn_branch<F>(wiring: Wiring<'_>, branch: F) -> io::Result<Pid>
where
    F: FnOnce() -> i32,
{
    let _ = io::stdout().flush();

    // SAFETY: 子进程只做描述符操作、递归求值然后退出，不会回到调用方
    match unsafe { fork() }? {
        ForkResult::Parent { child } => {
            debug!("fork 分支进程: {}", child);
            Ok(child)
        }
        ForkResult::Child => {
            if let Err(e) = wiring.apply() {
                let _ = writeln!(io::stderr(), "zako: pipe: {}", e);
                process::exit(FATAL_STATUS);
            }
            let status = branch();
            let _ = io::stdout().flush();
            process::exit(status);
        }
    }
}

/// 阻塞等待某个子进程终止
pub fn wait_child(pid: Pid) -> io::Result<ChildExit> {
    loop {
        match waitpid(pid, None) {
            Ok(status) => {
                if let Some(exit) = ChildExit::from_wait_status(status) {
                    debug!("子进程 {} 结束: {:?}", pid, exit);
                    return Ok(exit);
                }
            }
            Err(Errno::EINTR) => continue,
            Err(e) => return Err(e.into()),
        }
    }
}

/// fork 一个子进程执行外部程序并等待它结束
pub fn launch(command: &SimpleCommand, ctx: &ExecContext) -> ExecutionResult {
    let Some(argv) = exec_args(command, ctx) else {
        return ExecutionResult::from_status(COMMAND_NOT_FOUND_STATUS);
    };

    let _ = io::stdout().flush();

    // SAFETY: 子进程只做重定向然后 exec，失败时直接 _exit
    match unsafe { fork() } {
        Err(e) => {
            warn!("fork 失败: {}", e);
            ExecutionResult::FAILURE
        }
        Ok(ForkResult::Child) => exec_in_child(command, &argv, ctx),
        Ok(ForkResult::Parent { child }) => match wait_child(child) {
            Ok(exit) => exit.into(),
            Err(e) => {
                warn!("等待子进程 {} 失败: {}", child, e);
                ExecutionResult::FAILURE
            }
        },
    }
}

/// 已经在分支进程里时直接 exec，不再多 fork 一层。
///
/// 分支进程要是留下来等孙进程，它手里的管道端会一直开着。
pub fn exec_in_place(command: &SimpleCommand, ctx: &ExecContext) -> ! {
    match exec_args(command, ctx) {
        Some(argv) => exec_in_child(command, &argv, ctx),
        None => {
            let _ = io::stdout().flush();
            process::exit(COMMAND_NOT_FOUND_STATUS);
        }
    }
}

/// 在 fork 之前准备好 exec 的参数
fn exec_args(command: &SimpleCommand, ctx: &ExecContext) -> Option<Vec<CString>> {
    let argv = ctx.expander().argv(command);
    debug!("执行外部命令: {}", shell_words::join(&argv));

    match argv.into_iter().map(CString::new).collect() {
        Ok(argv) => Some(argv),
        Err(e) => {
            warn!("参数中含有 NUL 字节: {}", e);
            let _ = writeln!(io::stderr(), "{}: {}: invalid argument", ctx.name(), command.verb);
            None
        }
    }
}

fn exec_in_child(command: &SimpleCommand, argv: &[CString], ctx: &ExecContext) -> ! {
    let stdio = match StdioGuard::save() {
        Ok(stdio) => stdio,
        Err(e) => {
            let _ = writeln!(io::stderr(), "{}: {}", ctx.name(), e);
            process::exit(FATAL_STATUS);
        }
    };

    let base = ctx.current_dir().unwrap_or_else(|_| PathBuf::from("."));
    if let Err(e) = apply_redirections(command, &base, ctx.expander()) {
        // 先还原，错误信息才能落到原来的 stderr 上
        drop(stdio);
        let _ = writeln!(io::stderr(), "{}: {}", ctx.name(), e);
        process::exit(FATAL_STATUS);
    }

    if let Some(program) = argv.first() {
        let e = match execvp(program, argv) {
            Ok(never) => match never {},
            Err(e) => e,
        };
        let _ = writeln!(
            io::stderr(),
            "{}: {}: command not found ({})",
            ctx.name(),
            program.to_string_lossy(),
            e
        );
    }

    // 不还原描述符也不做清理，直接退出
    unsafe { libc::_exit(COMMAND_NOT_FOUND_STATUS) }
}
