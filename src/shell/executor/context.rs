use std::io;
use std::path::{Path, PathBuf};

use log::debug;

use crate::shell::ast::Word;
use crate::utils::config::Config;
use crate::utils::path;

use super::variable::{EnvExpander, WordExpander};

/// 求值期间的进程级状态：工作目录和环境变量。
///
/// 只有拿到 `&mut ExecContext` 的代码才能修改它们。fork 出去的分支拿到的是
/// 这份状态的副本，分支里的 `cd` 或赋值不会回到父进程。
pub struct ExecContext {
    name: String,
    expander: Box<dyn WordExpander>,
}

impl ExecContext {
    pub fn new(config: &Config) -> Self {
        Self::with_expander(config, Box::new(EnvExpander))
    }

    pub fn with_expander(config: &Config, expander: Box<dyn WordExpander>) -> Self {
        Self {
            name: config.name.clone(),
            expander,
        }
    }

    /// 诊断信息前缀
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn expander(&self) -> &dyn WordExpander {
        self.expander.as_ref()
    }

    pub fn expand(&self, word: &Word) -> String {
        self.expander.word(word)
    }

    pub fn current_dir(&self) -> io::Result<PathBuf> {
        path::current_dir()
    }

    pub fn change_dir(&mut self, dir: &Path) -> io::Result<()> {
        debug!("切换工作目录: {}", dir.display());
        std::env::set_current_dir(dir)
    }

    pub fn assign(&mut self, name: &str, value: &str) {
        debug!("设置环境变量: {}={}", name, value);
        std::env::set_var(name, value);
    }
}

impl Default for ExecContext {
    fn default() -> Self {
        Self::new(&Config::default())
    }
}
