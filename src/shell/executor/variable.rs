use std::env;

use crate::shell::ast::{SimpleCommand, Word, WordPart};

/// 单词展开。解析器一侧的协作者，执行器只依赖这个接口。
pub trait WordExpander {
    fn word(&self, word: &Word) -> String;

    /// verb 加上全部参数，已展开
    fn argv(&self, command: &SimpleCommand) -> Vec<String> {
        std::iter::once(&command.verb)
            .chain(command.params.iter())
            .map(|word| self.word(word))
            .collect()
    }
}

/// 从进程环境变量中取值，未设置的变量展开为空串
#[derive(Debug, Clone, Copy, Default)]
pub struct EnvExpander;

impl EnvExpander {
    pub fn get(&self, name: &str) -> String {
        env::var(name).unwrap_or_default()
    }
}

impl WordExpander for EnvExpander {
    fn word(&self, word: &Word) -> String {
        let mut result = String::new();
        for part in &word.parts {
            match part {
                WordPart::Literal(text) => result.push_str(text),
                WordPart::Variable(name) => result.push_str(&self.get(name)),
            }
        }
        result
    }
}
