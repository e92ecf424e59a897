use std::env;
use std::io;
use std::path::{Path, PathBuf};

use log::error;

/// 把重定向目标拼接到基准目录上，绝对路径原样返回
pub fn resolve_against(base: &Path, target: &str) -> PathBuf {
    let target = Path::new(target);
    if target.is_absolute() {
        target.to_path_buf()
    } else {
        base.join(target)
    }
}

pub fn current_dir() -> io::Result<PathBuf> {
    env::current_dir().map_err(|e| {
        error!("zako: env current_dir error: {}", e);
        e
    })
}
