use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::os::fd::{AsRawFd, FromRawFd, IntoRawFd, OwnedFd, RawFd};
use std::os::unix::fs::OpenOptionsExt;
use std::path::{Path, PathBuf};

use libc::{STDERR_FILENO, STDIN_FILENO, STDOUT_FILENO};
use log::warn;
use nix::errno::Errno;
use nix::fcntl::{fcntl, FcntlArg};
use nix::unistd::{close, dup2};

use crate::shell::ast::{OpenMode, SimpleCommand, Word};
use crate::utils::path::resolve_against;

use super::variable::WordExpander;

const STD_SLOTS: [RawFd; 3] = [STDIN_FILENO, STDOUT_FILENO, STDERR_FILENO];
const FILE_MODE: u32 = 0o644;
/// 备份描述符从这里往上分配，避开 0-2
const SAVED_FD_MIN: RawFd = 10;

/// 创建时复制 stdin/stdout/stderr，drop 时装回去。
///
/// 任何临时改动三个标准描述符的地方都先拿一个 guard，这样提前返回或者
/// 出错时也一定会还原。
pub struct StdioGuard {
    saved: Vec<(RawFd, Option<OwnedFd>)>,
}

impl StdioGuard {
    pub fn save() -> io::Result<Self> {
        // 避免缓冲区里的内容跟着描述符一起被换走
        let _ = io::stdout().flush();

        let mut saved = Vec::with_capacity(STD_SLOTS.len());
        for slot in STD_SLOTS {
            // 备份带 FD_CLOEXEC，exec 出去的程序拿不到，管道写端也就不会被多持有一份
            let copy = match fcntl(slot, FcntlArg::F_DUPFD_CLOEXEC(SAVED_FD_MIN)) {
                // SAFETY: 新描述符只归这里所有
                Ok(fd) => Some(unsafe { OwnedFd::from_raw_fd(fd) }),
                // 原本就没打开，还原时关掉即可
                Err(Errno::EBADF) => None,
                Err(e) => return Err(e.into()),
            };
            saved.push((slot, copy));
        }
        Ok(Self { saved })
    }
}

impl Drop for StdioGuard {
    fn drop(&mut self) {
        let _ = io::stdout().flush();
        let _ = io::stderr().flush();

        for (slot, copy) in &self.saved {
            let restored = match copy {
                Some(copy) => dup2(copy.as_raw_fd(), *slot).map(|_| ()),
                None => close(*slot).or_else(|e| match e {
                    Errno::EBADF => Ok(()),
                    e => Err(e),
                }),
            };
            if let Err(e) = restored {
                warn!("还原标准描述符 {} 失败: {}", slot, e);
            }
        }
        // 复制出来的描述符随 OwnedFd 一起关闭
    }
}

/// 按 输入 -> 合并输出 -> 各自输出 的顺序安装命令声明的重定向。
///
/// 相对路径拼接到 `base` 上。打不开目标文件是硬错误，直接返回 `Err`。
pub fn apply_redirections(
    command: &SimpleCommand,
    base: &Path,
    expander: &dyn WordExpander,
) -> io::Result<()> {
    if let Some(input) = &command.stdin {
        let path = target_path(base, &input.target, expander);
        match input.mode {
            OpenMode::Truncate => install(open_read(&path)?, STDIN_FILENO)?,
            // 追加类标志落在输入上时，以追加写打开并装到 stderr
            OpenMode::Append => install(open_write(&path, OpenMode::Append)?, STDERR_FILENO)?,
        }
    }

    match (&command.stdout, &command.stderr) {
        (Some(out), Some(err)) if command.combined_output() => {
            // stdout 固定追加，stderr 固定截断；即使路径相同也分别打开
            let out_file = open_write(
                &target_path(base, &out.target, expander),
                OpenMode::Append,
            )?;
            let err_file = open_write(
                &target_path(base, &err.target, expander),
                OpenMode::Truncate,
            )?;
            install(out_file, STDOUT_FILENO)?;
            install(err_file, STDERR_FILENO)?;
        }
        (out, err) => {
            if let Some(out) = out {
                let path = target_path(base, &out.target, expander);
                install(open_write(&path, out.mode)?, STDOUT_FILENO)?;
            }
            if let Some(err) = err {
                let path = target_path(base, &err.target, expander);
                install(open_write(&path, err.mode)?, STDERR_FILENO)?;
            }
        }
    }

    Ok(())
}

fn target_path(base: &Path, target: &Word, expander: &dyn WordExpander) -> PathBuf {
    resolve_against(base, &expander.word(target))
}

fn open_read(path: &Path) -> io::Result<File> {
    File::open(path).map_err(|e| with_path(path, e))
}

fn open_write(path: &Path, mode: OpenMode) -> io::Result<File> {
    let mut options = OpenOptions::new();
    options.write(true).create(true).mode(FILE_MODE);
    match mode {
        OpenMode::Truncate => options.truncate(true),
        OpenMode::Append => options.append(true),
    };
    options.open(path).map_err(|e| with_path(path, e))
}

fn with_path(path: &Path, e: io::Error) -> io::Error {
    io::Error::new(e.kind(), format!("{}: {}", path.display(), e))
}

/// 把文件装到标准描述符上，随后关闭中间描述符
fn install(file: File, slot: RawFd) -> io::Result<()> {
    if file.as_raw_fd() == slot {
        // 槽位原本是空的，open 直接拿到了它，不能再关
        let _ = file.into_raw_fd();
        return Ok(());
    }
    dup2(file.as_raw_fd(), slot)?;
    Ok(())
}
