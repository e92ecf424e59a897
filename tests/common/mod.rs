#![allow(dead_code, clippy::unwrap_used, clippy::expect_used)]

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use tempfile::TempDir;
use zako_eval::{CommandNode, ExecContext, ExecutionResult, Executor, SimpleCommand};

// fork 和 cwd 都是进程级的，同一个测试二进制里的用例必须串行
static LOCK: Mutex<()> = Mutex::new(());

pub struct Sandbox {
    _lock: MutexGuard<'static, ()>,
    dir: TempDir,
    old_cwd: PathBuf,
}

impl Sandbox {
    pub fn new(prefix: &str) -> Self {
        let lock = LOCK.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        let dir = tempfile::Builder::new().prefix(prefix).tempdir().unwrap();
        let old_cwd = std::env::current_dir().unwrap();
        Self {
            _lock: lock,
            dir,
            old_cwd,
        }
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// 沙盒目录里的文件路径（字符串形式，方便放进命令里）
    pub fn file(&self, name: &str) -> String {
        self.dir.path().join(name).to_string_lossy().into_owned()
    }

    pub fn read(&self, name: &str) -> String {
        fs::read_to_string(self.dir.path().join(name)).unwrap()
    }

    pub fn exists(&self, name: &str) -> bool {
        self.dir.path().join(name).exists()
    }

    pub fn write(&self, name: &str, content: &str) {
        fs::write(self.dir.path().join(name), content).unwrap();
    }
}

impl Drop for Sandbox {
    fn drop(&mut self) {
        let _ = std::env::set_current_dir(&self.old_cwd);
    }
}

pub fn leaf(command: SimpleCommand) -> CommandNode {
    CommandNode::leaf(command)
}

pub fn cmd(verb: &str) -> SimpleCommand {
    SimpleCommand::new(verb)
}

pub fn execute(tree: &CommandNode) -> ExecutionResult {
    Executor::with_context(ExecContext::default())
        .execute(tree)
        .unwrap()
}
