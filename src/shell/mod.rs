use std::env;
use std::path::PathBuf;

use crate::core::commands::BuiltinSet;
use crate::core::state::ShellState;
use crate::error::ShellError;
use crate::flags::Flags;
use crate::highlight::Styler;
use crate::input::{LineEditor, ShellCompleter};
use crate::parse;
use crate::process::PipelineExecutor;

const PROMPT: &str = "$ ";

pub struct Shell {
    state: ShellState,
    completer: ShellCompleter,
    executor: PipelineExecutor,
    styler: Styler,
    builtins: BuiltinSet,
    flags: Flags,
}

impl Shell {
    pub fn new(flags: Flags) -> Result<Self, ShellError> {
        let mut state = ShellState::new();

        // Preload history when a history file is configured.
        let history_file = env::var_os("HISTFILE").map(PathBuf::from);
        if let Some(path) = &history_file {
            if let Err(e) = state.history.preload(path) {
                if !flags.is_set("quiet") {
                    eprintln!("Warning: couldn't load history: {}", e);
                }
            }
        }
        state.history_file = history_file;

        // Keep the shell alive; the foreground child owns the interrupt.
        ctrlc::set_handler(|| {})?;

        Ok(Shell {
            state,
            completer: ShellCompleter::new(),
            executor: PipelineExecutor::new(&flags),
            styler: Styler::new(),
            builtins: BuiltinSet::new(),
            flags,
        })
    }

    /// The read-parse-execute loop. Returns the shell's exit code once
    /// `exit` runs or input ends.
    pub fn run(&mut self) -> Result<i32, ShellError> {
        loop {
            let prompt = self.styler.prompt(PROMPT);
            let editor = LineEditor::new(&self.completer, self.state.history.entries());
            let line = match editor.read_line(&prompt) {
                Ok(Some(line)) => line,
                Ok(None) => break,
                Err(e) => {
                    // Losing the input stream ends the loop like `exit`.
                    if !self.flags.is_set("quiet") {
                        eprintln!("{}", self.styler.error(&e.to_string()));
                    }
                    break;
                }
            };

            if line.trim().is_empty() {
                continue;
            }
            self.state.history.push(&line);

            if let Err(e) = self.execute_line(&line) {
                if !self.flags.is_set("quiet") {
                    eprintln!("{}", self.styler.error(&e.to_string()));
                }
            }

            if self.state.exit.is_some() {
                break;
            }
        }

        self.flush_history();
        Ok(self.state.exit.unwrap_or(0))
    }

    fn execute_line(&mut self, line: &str) -> Result<(), ShellError> {
        let stages = parse::split_stages(line)?;
        let mut commands = Vec::with_capacity(stages.len());
        for stage in &stages {
            commands.push(parse::tokenize(stage)?);
        }
        self.executor
            .run(&commands, &self.builtins, &mut self.state)?;
        Ok(())
    }

    /// Appends the not-yet-flushed entries to the configured history
    /// file. Runs on every loop exit path.
    fn flush_history(&mut self) {
        if let Some(path) = self.state.history_file.clone() {
            if let Err(e) = self.state.history.append_to(&path) {
                if !self.flags.is_set("quiet") {
                    eprintln!("Warning: couldn't save history: {}", e);
                }
            }
        }
    }
}
