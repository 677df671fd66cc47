use std::collections::BTreeMap;
use std::io::Write;

mod cd;
mod echo;
mod exit;
mod history;
mod pwd;
mod type_cmd;

pub use cd::CdCommand;
pub use echo::EchoCommand;
pub use exit::ExitCommand;
pub use history::HistoryCommand;
pub use pwd::PwdCommand;
pub use type_cmd::TypeCommand;

use crate::core::state::ShellState;
use crate::parse::ParsedCommand;

/// Names the shell implements internally.
pub const BUILTIN_NAMES: [&str; 6] = ["cd", "echo", "exit", "history", "pwd", "type"];

pub fn is_builtin(name: &str) -> bool {
    BUILTIN_NAMES.contains(&name)
}

#[derive(Debug)]
pub enum CommandError {
    Io(std::io::Error),
}

impl std::fmt::Display for CommandError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CommandError::Io(err) => write!(f, "IO error: {}", err),
        }
    }
}

impl From<std::io::Error> for CommandError {
    fn from(err: std::io::Error) -> Self {
        CommandError::Io(err)
    }
}

impl std::error::Error for CommandError {}

/// One shell builtin. User-facing messages go to `out`/`err` so
/// redirects capture them; the returned value is the exit status.
pub trait Builtin {
    fn run(
        &self,
        cmd: &ParsedCommand,
        state: &mut ShellState,
        out: &mut dyn Write,
        err: &mut dyn Write,
    ) -> Result<i32, CommandError>;
}

enum BuiltinKind {
    Cd(CdCommand),
    Echo(EchoCommand),
    Exit(ExitCommand),
    History(HistoryCommand),
    Pwd(PwdCommand),
    Type(TypeCommand),
}

impl Builtin for BuiltinKind {
    fn run(
        &self,
        cmd: &ParsedCommand,
        state: &mut ShellState,
        out: &mut dyn Write,
        err: &mut dyn Write,
    ) -> Result<i32, CommandError> {
        match self {
            BuiltinKind::Cd(builtin) => builtin.run(cmd, state, out, err),
            BuiltinKind::Echo(builtin) => builtin.run(cmd, state, out, err),
            BuiltinKind::Exit(builtin) => builtin.run(cmd, state, out, err),
            BuiltinKind::History(builtin) => builtin.run(cmd, state, out, err),
            BuiltinKind::Pwd(builtin) => builtin.run(cmd, state, out, err),
            BuiltinKind::Type(builtin) => builtin.run(cmd, state, out, err),
        }
    }
}

/// Registry dispatching builtin names to their implementations.
pub struct BuiltinSet {
    commands: BTreeMap<&'static str, BuiltinKind>,
}

impl Default for BuiltinSet {
    fn default() -> Self {
        Self::new()
    }
}

impl BuiltinSet {
    pub fn new() -> Self {
        let mut commands = BTreeMap::new();
        commands.insert("cd", BuiltinKind::Cd(CdCommand));
        commands.insert("echo", BuiltinKind::Echo(EchoCommand));
        commands.insert("exit", BuiltinKind::Exit(ExitCommand));
        commands.insert("history", BuiltinKind::History(HistoryCommand));
        commands.insert("pwd", BuiltinKind::Pwd(PwdCommand));
        commands.insert("type", BuiltinKind::Type(TypeCommand));
        BuiltinSet { commands }
    }

    /// Dispatches `name`; `None` when it is not a builtin.
    pub fn run(
        &self,
        name: &str,
        cmd: &ParsedCommand,
        state: &mut ShellState,
        out: &mut dyn Write,
        err: &mut dyn Write,
    ) -> Option<Result<i32, CommandError>> {
        self.commands
            .get(name)
            .map(|builtin| builtin.run(cmd, state, out, err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse::tokenize;

    #[test]
    fn test_builtin_name_detection() {
        for name in BUILTIN_NAMES {
            assert!(is_builtin(name), "{}", name);
        }
        assert!(!is_builtin("ls"));
        assert!(!is_builtin(""));
    }

    #[test]
    fn test_dispatch_unknown_name() {
        let set = BuiltinSet::new();
        let mut state = ShellState::new();
        let cmd = tokenize("nope").expect("parse");
        let (mut out, mut err) = (Vec::new(), Vec::new());
        assert!(set
            .run("nope", &cmd, &mut state, &mut out, &mut err)
            .is_none());
    }

    #[test]
    fn test_dispatch_echo() {
        let set = BuiltinSet::new();
        let mut state = ShellState::new();
        let cmd = tokenize("echo hi there").expect("parse");
        let (mut out, mut err) = (Vec::new(), Vec::new());
        let status = set
            .run("echo", &cmd, &mut state, &mut out, &mut err)
            .expect("echo is a builtin")
            .expect("echo succeeds");
        assert_eq!(status, 0);
        assert_eq!(String::from_utf8(out).expect("utf8"), "hi there\n");
        assert!(err.is_empty());
    }
}
