use std::fmt;

use nix::sys::wait::WaitStatus as WS;

/// `exit` / `quit` 使用的退出码。
///
/// 取 0：`exit` 结束的进程和正常跑完的进程退出码相同，嵌入方
/// 不能靠非零退出码把两者区分开。
pub const SHELL_EXIT_STATUS: i32 = 0;
/// exec 失败时子进程的退出码
pub const COMMAND_NOT_FOUND_STATUS: i32 = 127;
/// 重定向等硬错误终止分支时的退出码
pub const FATAL_STATUS: i32 = 1;

/// 一次节点求值的结果。0 为成功，其他都是失败。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ExecutionResult {
    status: i32,
}

impl ExecutionResult {
    pub const SUCCESS: ExecutionResult = ExecutionResult { status: 0 };
    pub const FAILURE: ExecutionResult = ExecutionResult { status: 1 };

    pub fn from_status(status: i32) -> Self {
        Self { status }
    }

    pub fn from_bool(success: bool) -> Self {
        if success {
            Self::SUCCESS
        } else {
            Self::FAILURE
        }
    }

    pub fn success(&self) -> bool {
        self.status == 0
    }

    pub fn status(&self) -> i32 {
        self.status
    }
}

impl fmt::Display for ExecutionResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.success() {
            write!(f, "success")
        } else {
            write!(f, "failure ({})", self.status)
        }
    }
}

/// 父进程观察到的子进程终止方式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChildExit {
    Exited(i32),
    Signaled(i32),
}

impl ChildExit {
    /// 只关心终止类的状态，stop/continue 由调用方继续等待
    pub fn from_wait_status(status: WS) -> Option<Self> {
        match status {
            WS::Exited(_, code) => Some(ChildExit::Exited(code)),
            WS::Signaled(_, sig, _core_dumped) => Some(ChildExit::Signaled(sig as i32)),
            _ => None,
        }
    }

    pub fn is_exited(&self) -> bool {
        matches!(self, ChildExit::Exited(_))
    }

    /// 被信号杀死时按惯例返回 128 + 信号值
    pub fn get_status(&self) -> i32 {
        match *self {
            ChildExit::Exited(code) => code,
            ChildExit::Signaled(sig) => 128 + sig,
        }
    }
}

impl From<ChildExit> for ExecutionResult {
    fn from(exit: ChildExit) -> Self {
        ExecutionResult::from_status(exit.get_status())
    }
}
