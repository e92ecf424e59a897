use log::{debug, error, trace, warn};
use std::io::{self, Write};
use std::process;

use crate::shell::ast::CommandNode;
use crate::utils::config::Config;

use super::builtin::Builtin;
use super::context::ExecContext;
use super::process::{exec_in_place, launch, spawn_branch, wait_child, Pipe, Wiring};
use super::redirect::StdioGuard;
use super::status::{ChildExit, ExecutionResult, FATAL_STATUS};

/// 递归求值命令树。树本身只读，进程状态（cwd、环境变量、描述符）会被改动。
pub struct Executor {
    context: ExecContext,
}

impl Executor {
    pub fn new(config: &Config) -> Self {
        Self {
            context: ExecContext::new(config),
        }
    }

    pub fn with_context(context: ExecContext) -> Self {
        Self { context }
    }

    pub fn context(&self) -> &ExecContext {
        &self.context
    }

    /// 求值整棵树。`Err` 表示重定向之类的硬错误，求值已经中止。
    pub fn execute(&mut self, node: &CommandNode) -> io::Result<ExecutionResult> {
        debug!("执行命令树: {}", node);
        self.evaluate(node, 0, None)
    }

    /// 作为进程主体使用：返回退出码，硬错误直接结束整个程序
    pub fn run(&mut self, node: &CommandNode) -> i32 {
        match self.execute(node) {
            Ok(result) => result.status(),
            Err(e) => {
                error!("命令执行中止: {}: {}", node, e);
                let _ = writeln!(io::stderr(), "{}: {}", self.context.name(), e);
                let _ = io::stdout().flush();
                process::exit(FATAL_STATUS);
            }
        }
    }

    fn evaluate(
        &mut self,
        node: &CommandNode,
        level: usize,
        father: Option<&CommandNode>,
    ) -> io::Result<ExecutionResult> {
        trace!(
            "[level {}] 求值 {} (父节点: {})",
            level,
            node,
            father.and_then(CommandNode::operator).unwrap_or("-")
        );

        match node {
            CommandNode::Leaf(command) => {
                match Builtin::detect(command, &self.context) {
                    Some(builtin) => builtin.run(command, &mut self.context),
                    None => Ok(launch(command, &self.context)),
                }
            }
            CommandNode::Sequential(left, right) => {
                self.evaluate(left, level + 1, Some(node))?;
                self.evaluate(right, level + 1, Some(node))
            }
            CommandNode::AndThen(left, right) => {
                let result = self.evaluate(left, level + 1, Some(node))?;
                if result.success() {
                    self.evaluate(right, level + 1, Some(node))
                } else {
                    Ok(result)
                }
            }
            CommandNode::OrElse(left, right) => {
                let result = self.evaluate(left, level + 1, Some(node))?;
                if result.success() {
                    Ok(result)
                } else {
                    self.evaluate(right, level + 1, Some(node))
                }
            }
            CommandNode::Parallel(left, right) => Ok(self.run_in_parallel(left, right, level, node)),
            CommandNode::Pipe(left, right) => self.run_on_pipe(left, right, level, node),
        }
    }

    /// 分支进程的主体：求值子树，把结果变成退出码
    fn branch_status(&mut self, node: &CommandNode, level: usize, father: &CommandNode) -> i32 {
        match self.evaluate(node, level + 1, Some(father)) {
            Ok(result) => result.status(),
            Err(e) => {
                let _ = writeln!(io::stderr(), "{}: {}", self.context.name(), e);
                FATAL_STATUS
            }
        }
    }

    /// 管道两侧的分支进程。外部命令直接在分支进程里 exec，
    /// 这样管道端只留在真正读写它的程序手里。
    fn pipe_branch_status(&mut self, node: &CommandNode, level: usize, father: &CommandNode) -> i32 {
        if let CommandNode::Leaf(command) = node {
            if Builtin::detect(command, &self.context).is_none() {
                trace!("[level {}] 管道分支直接 exec: {}", level + 1, command);
                exec_in_place(command, &self.context);
            }
        }
        self.branch_status(node, level, father)
    }

    /// 两个子进程同时执行；两边都正常退出（不论退出码）才算成功
    fn run_in_parallel(
        &mut self,
        left: &CommandNode,
        right: &CommandNode,
        level: usize,
        father: &CommandNode,
    ) -> ExecutionResult {
        let left_pid = match spawn_branch(Wiring::Inherit, || {
            self.branch_status(left, level, father)
        }) {
            Ok(pid) => pid,
            Err(e) => {
                warn!("并行分支 fork 失败: {}", e);
                return ExecutionResult::FAILURE;
            }
        };
        let right_pid = spawn_branch(Wiring::Inherit, || self.branch_status(right, level, father))
            .map_err(|e| warn!("并行分支 fork 失败: {}", e))
            .ok();

        let left_exit = wait_branch(left_pid);
        let right_exit = right_pid.and_then(wait_branch);

        let both_exited = matches!(
            (left_exit, right_exit),
            (Some(l), Some(r)) if l.is_exited() && r.is_exited()
        );
        ExecutionResult::from_bool(both_exited)
    }

    /// 左侧 stdout 接管道写端，右侧 stdin 接读端；结果取右侧
    fn run_on_pipe(
        &mut self,
        left: &CommandNode,
        right: &CommandNode,
        level: usize,
        father: &CommandNode,
    ) -> io::Result<ExecutionResult> {
        // 父进程本身不动标准描述符；备份带 FD_CLOEXEC，分支 exec 时自动关闭
        let _stdio = StdioGuard::save()?;

        let pipe = match Pipe::new() {
            Ok(pipe) => pipe,
            Err(e) => {
                warn!("创建管道失败: {}", e);
                return Ok(ExecutionResult::FAILURE);
            }
        };

        let left_pid = match spawn_branch(Wiring::StdoutTo(&pipe), || {
            self.pipe_branch_status(left, level, father)
        }) {
            Ok(pid) => pid,
            Err(e) => {
                warn!("管道左侧 fork 失败: {}", e);
                return Ok(ExecutionResult::FAILURE);
            }
        };
        let right_pid = spawn_branch(Wiring::StdinFrom(&pipe), || {
            self.pipe_branch_status(right, level, father)
        });

        // 父进程的两端必须马上关掉，读端才能看到 EOF
        drop(pipe);

        let right_pid = match right_pid {
            Ok(pid) => pid,
            Err(e) => {
                warn!("管道右侧 fork 失败: {}", e);
                let _ = wait_branch(left_pid);
                return Ok(ExecutionResult::FAILURE);
            }
        };

        let _ = wait_branch(left_pid);
        Ok(wait_branch(right_pid)
            .map(ExecutionResult::from)
            .unwrap_or(ExecutionResult::FAILURE))
    }
}

fn wait_branch(pid: nix::unistd::Pid) -> Option<ChildExit> {
    wait_child(pid)
        .map_err(|e| warn!("等待分支进程 {} 失败: {}", pid, e))
        .ok()
}
