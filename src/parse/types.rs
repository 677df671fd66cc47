//! Types produced by the line parser and consumed by the execution layer.

/// One word of a parsed command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Argument {
    pub text: String,
    /// True when a single-quoted span contributed to this word. `echo`
    /// skips escape decoding for such words.
    pub single_quoted: bool,
}

impl Argument {
    pub fn plain(text: impl Into<String>) -> Self {
        Argument {
            text: text.into(),
            single_quoted: false,
        }
    }

    pub fn quoted(text: impl Into<String>) -> Self {
        Argument {
            text: text.into(),
            single_quoted: true,
        }
    }
}

/// Where a redirected stream lands.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Redirect {
    pub path: String,
    /// True for the doubled operator (`>>`); opens the target in append
    /// mode instead of truncating.
    pub append: bool,
}

/// A single pipeline stage after tokenization.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ParsedCommand {
    pub argv: Vec<Argument>,
    pub stdout_to: Option<Redirect>,
    pub stderr_to: Option<Redirect>,
}

impl ParsedCommand {
    /// The command name, when the stage has one.
    pub fn name(&self) -> Option<&str> {
        self.argv.first().map(|a| a.text.as_str())
    }

    /// Argument texts after the command name.
    pub fn arg_texts(&self) -> Vec<&str> {
        self.argv.iter().skip(1).map(|a| a.text.as_str()).collect()
    }
}
