use dotenv::dotenv;
use log::LevelFilter;
use std::env;
use std::path::PathBuf;

pub struct Config {
    pub name: String,
    pub logger_level: String,
    pub logger_dir: Option<PathBuf>,
    pub log_to_stderr: bool,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            name: String::from("zako"),
            logger_level: String::from("warn"),
            logger_dir: None,
            log_to_stderr: true,
        }
    }
}

impl Config {
    pub fn new() -> Self {
        // 优先加载环境变量
        if cfg!(debug_assertions) {
            dotenv::from_filename(".env.development").ok();
        } else {
            dotenv().ok();
        }

        let mut config = Config::default();

        // 从环境变量加载配置
        if let Ok(name) = env::var("ZAKO_NAME") {
            if !name.trim().is_empty() {
                config.name = name;
            }
        }

        if let Ok(level) = env::var("ZAKO_LOG_LEVEL") {
            config.logger_level = level;
        }

        if let Ok(dir) = env::var("ZAKO_LOG_DIR") {
            if !dir.trim().is_empty() {
                config.logger_dir = Some(PathBuf::from(dir));
            }
        }

        if let Ok(flag) = env::var("ZAKO_LOG_STDERR") {
            config.log_to_stderr = !matches!(flag.trim(), "0" | "false" | "no" | "off");
        }

        config
    }

    pub fn get_level_filter(&self) -> LevelFilter {
        match &self.logger_level {
            level if level.eq_ignore_ascii_case("off") => LevelFilter::Off,
            level if level.eq_ignore_ascii_case("error") => LevelFilter::Error,
            level if level.eq_ignore_ascii_case("warn") => LevelFilter::Warn,
            level if level.eq_ignore_ascii_case("info") => LevelFilter::Info,
            level if level.eq_ignore_ascii_case("debug") => LevelFilter::Debug,
            level if level.eq_ignore_ascii_case("trace") => LevelFilter::Trace,
            _ => LevelFilter::Warn,
        }
    }
}
