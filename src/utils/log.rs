use crate::utils::config::Config;
use chrono::Local;
use env_logger::{Builder, Target};
use log::LevelFilter;
use once_cell::sync::OnceCell;
use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::process;

static LOGGER: OnceCell<()> = OnceCell::new();

/// 安装全局日志。重复调用只有第一次生效。
pub fn init_logger(config: &Config) -> io::Result<()> {
    LOGGER.get_or_try_init(|| install(config)).map(|_| ())
}

fn install(config: &Config) -> io::Result<()> {
    let level = config.get_level_filter();

    let mut writers: Vec<Box<dyn Write + Send + Sync>> = Vec::new();
    if config.log_to_stderr {
        writers.push(Box::new(io::stderr()));
    }
    if let Some(dir) = &config.logger_dir {
        // 创建日志目录
        fs::create_dir_all(dir)?;
        let date = Local::now().format("%Y-%m-%d");
        let log_file = dir.join(format!("{}_{}.log", config.name, date));
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(log_file)?;
        writers.push(Box::new(file));
    }

    // fork 出来的分支也会写日志，所以带上 PID
    let result = Builder::new()
        .format(|buf, record| {
            writeln!(
                buf,
                "[PID:{}][{}] {} - {}",
                process::id(),
                record.level(),
                Local::now().format("%Y-%m-%d %H:%M:%S"),
                record.args()
            )
        })
        .target(Target::Pipe(Box::new(MultiWriter { writers })))
        .filter(Some(env!("CARGO_CRATE_NAME")), level)
        .filter(None, LevelFilter::Warn)
        .try_init();

    if let Err(e) = result {
        // 宿主程序已经装了别的 logger，沿用它
        eprintln!("{}: logger already initialized: {}", config.name, e);
    }

    log::debug!("日志级别设置为: {}", level);
    Ok(())
}

struct MultiWriter {
    writers: Vec<Box<dyn Write + Send + Sync>>,
}

impl Write for MultiWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        for writer in &mut self.writers {
            writer.write_all(buf)?;
        }
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        for writer in &mut self.writers {
            writer.flush()?;
        }
        Ok(())
    }
}
