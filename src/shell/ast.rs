use std::fmt;

/// 单词的组成部分。变量部分由展开器在执行前替换。
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WordPart {
    Literal(String),
    Variable(String),
}

/// 解析器产出的未展开单词
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Word {
    pub parts: Vec<WordPart>,
}

impl Word {
    pub fn literal(text: impl Into<String>) -> Self {
        Self {
            parts: vec![WordPart::Literal(text.into())],
        }
    }

    pub fn variable(name: impl Into<String>) -> Self {
        Self {
            parts: vec![WordPart::Variable(name.into())],
        }
    }

    /// 追加一个变量后缀，例如 `out_$SUFFIX`
    pub fn with_variable(mut self, name: impl Into<String>) -> Self {
        self.parts.push(WordPart::Variable(name.into()));
        self
    }

    pub fn with_literal(mut self, text: impl Into<String>) -> Self {
        self.parts.push(WordPart::Literal(text.into()));
        self
    }

    /// 不做展开时的文本，仅用于比较和日志
    pub fn raw(&self) -> String {
        self.parts
            .iter()
            .map(|part| match part {
                WordPart::Literal(text) => text.clone(),
                WordPart::Variable(name) => format!("${}", name),
            })
            .collect()
    }
}

impl From<&str> for Word {
    fn from(text: &str) -> Self {
        Word::literal(text)
    }
}

impl From<String> for Word {
    fn from(text: String) -> Self {
        Word::literal(text)
    }
}

impl fmt::Display for Word {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.raw())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OpenMode {
    #[default]
    Truncate,
    Append,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Redirection {
    pub target: Word,
    pub mode: OpenMode,
}

impl Redirection {
    pub fn new(target: impl Into<Word>, mode: OpenMode) -> Self {
        Self {
            target: target.into(),
            mode,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SimpleCommand {
    pub verb: Word,
    pub params: Vec<Word>,
    pub stdin: Option<Redirection>,
    pub stdout: Option<Redirection>,
    pub stderr: Option<Redirection>,
}

impl SimpleCommand {
    pub fn new(verb: impl Into<Word>) -> Self {
        Self {
            verb: verb.into(),
            ..Default::default()
        }
    }

    pub fn arg(mut self, param: impl Into<Word>) -> Self {
        self.params.push(param.into());
        self
    }

    pub fn args<I, W>(mut self, params: I) -> Self
    where
        I: IntoIterator<Item = W>,
        W: Into<Word>,
    {
        self.params.extend(params.into_iter().map(Into::into));
        self
    }

    /// `mode` 为 `Append` 时沿用源 shell 的标志复用：以追加写方式打开并装到 stderr
    pub fn stdin(mut self, target: impl Into<Word>, mode: OpenMode) -> Self {
        self.stdin = Some(Redirection::new(target, mode));
        self
    }

    pub fn stdout(mut self, target: impl Into<Word>, mode: OpenMode) -> Self {
        self.stdout = Some(Redirection::new(target, mode));
        self
    }

    pub fn stderr(mut self, target: impl Into<Word>, mode: OpenMode) -> Self {
        self.stderr = Some(Redirection::new(target, mode));
        self
    }

    pub fn has_redirections(&self) -> bool {
        self.stdin.is_some() || self.stdout.is_some() || self.stderr.is_some()
    }

    /// stdout 与 stderr 同时被重定向
    pub fn combined_output(&self) -> bool {
        self.stdout.is_some() && self.stderr.is_some()
    }

    /// 识别 `NAME=VALUE` 形式的赋值，返回变量名以及值所在的单词
    pub fn assignment(&self) -> Option<(String, Word)> {
        let (first, rest) = self.verb.parts.split_first()?;
        let WordPart::Literal(text) = first else {
            return None;
        };
        let (name, value) = text.split_once('=')?;
        if !is_valid_name(name) {
            return None;
        }

        let mut parts = Vec::with_capacity(self.verb.parts.len());
        if !value.is_empty() {
            parts.push(WordPart::Literal(value.to_string()));
        }
        parts.extend(rest.iter().cloned());
        Some((name.to_string(), Word { parts }))
    }
}

fn is_valid_name(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

impl fmt::Display for SimpleCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let words: Vec<String> = std::iter::once(&self.verb)
            .chain(self.params.iter())
            .map(Word::raw)
            .collect();
        write!(f, "{}", shell_words::join(&words))?;

        if let Some(input) = &self.stdin {
            write!(f, " < {}", input.target)?;
        }
        let arrow = |mode: OpenMode| match mode {
            OpenMode::Truncate => ">",
            OpenMode::Append => ">>",
        };
        if let Some(out) = &self.stdout {
            write!(f, " {} {}", arrow(out.mode), out.target)?;
        }
        if let Some(err) = &self.stderr {
            write!(f, " 2{} {}", arrow(err.mode), err.target)?;
        }
        Ok(())
    }
}

/// 命令树。非叶子节点恰好有两个子节点，父节点独占子节点。
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandNode {
    Leaf(SimpleCommand),
    Sequential(Box<CommandNode>, Box<CommandNode>),
    Parallel(Box<CommandNode>, Box<CommandNode>),
    /// 左侧失败时才执行右侧 (`||`)
    OrElse(Box<CommandNode>, Box<CommandNode>),
    /// 左侧成功时才执行右侧 (`&&`)
    AndThen(Box<CommandNode>, Box<CommandNode>),
    Pipe(Box<CommandNode>, Box<CommandNode>),
}

impl CommandNode {
    pub fn leaf(command: SimpleCommand) -> Self {
        CommandNode::Leaf(command)
    }

    pub fn sequential(left: CommandNode, right: CommandNode) -> Self {
        CommandNode::Sequential(Box::new(left), Box::new(right))
    }

    pub fn parallel(left: CommandNode, right: CommandNode) -> Self {
        CommandNode::Parallel(Box::new(left), Box::new(right))
    }

    pub fn or_else(left: CommandNode, right: CommandNode) -> Self {
        CommandNode::OrElse(Box::new(left), Box::new(right))
    }

    pub fn and_then(left: CommandNode, right: CommandNode) -> Self {
        CommandNode::AndThen(Box::new(left), Box::new(right))
    }

    pub fn pipe(left: CommandNode, right: CommandNode) -> Self {
        CommandNode::Pipe(Box::new(left), Box::new(right))
    }

    /// 运算符的 shell 写法，叶子节点返回 `None`
    pub fn operator(&self) -> Option<&'static str> {
        match self {
            CommandNode::Leaf(_) => None,
            CommandNode::Sequential(..) => Some(";"),
            CommandNode::Parallel(..) => Some("&"),
            CommandNode::OrElse(..) => Some("||"),
            CommandNode::AndThen(..) => Some("&&"),
            CommandNode::Pipe(..) => Some("|"),
        }
    }
}

impl From<SimpleCommand> for CommandNode {
    fn from(command: SimpleCommand) -> Self {
        CommandNode::Leaf(command)
    }
}

impl fmt::Display for CommandNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CommandNode::Leaf(command) => write!(f, "{}", command),
            CommandNode::Sequential(left, right)
            | CommandNode::Parallel(left, right)
            | CommandNode::OrElse(left, right)
            | CommandNode::AndThen(left, right)
            | CommandNode::Pipe(left, right) => {
                let op = self.operator().unwrap_or_default();
                let side = |node: &CommandNode| match node {
                    CommandNode::Leaf(_) => node.to_string(),
                    _ => format!("({})", node),
                };
                write!(f, "{} {} {}", side(left), op, side(right))
            }
        }
    }
}
