use std::path::PathBuf;

use crate::input::History;

/// Mutable shell-session state, owned by the main loop and passed by
/// reference into the builtins that need it. Never ambient.
pub struct ShellState {
    pub history: History,
    /// Target of the exit-time history flush, from `$HISTFILE`.
    pub history_file: Option<PathBuf>,
    /// Exit status of the last pipeline's final stage.
    pub last_status: i32,
    /// Set by the `exit` builtin; the main loop stops when present.
    pub exit: Option<i32>,
}

impl Default for ShellState {
    fn default() -> Self {
        Self::new()
    }
}

impl ShellState {
    pub fn new() -> Self {
        ShellState {
            history: History::new(),
            history_file: None,
            last_status: 0,
            exit: None,
        }
    }
}
