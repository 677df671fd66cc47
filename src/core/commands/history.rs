use std::io::Write;
use std::path::Path;

use super::{Builtin, CommandError};
use crate::core::state::ShellState;
use crate::input::History;
use crate::parse::ParsedCommand;

pub struct HistoryCommand;

impl Builtin for HistoryCommand {
    fn run(
        &self,
        cmd: &ParsedCommand,
        state: &mut ShellState,
        out: &mut dyn Write,
        err: &mut dyn Write,
    ) -> Result<i32, CommandError> {
        let args = cmd.arg_texts();
        match args.as_slice() {
            [] => {
                let count = state.history.len();
                list_entries(&state.history, count, out)?;
                Ok(0)
            }
            ["-r", file] => {
                if let Err(e) = state.history.load_from(Path::new(file)) {
                    writeln!(err, "history: {}: {}", file, e)?;
                    return Ok(1);
                }
                Ok(0)
            }
            ["-w", file] => {
                if let Err(e) = state.history.write_to(Path::new(file)) {
                    writeln!(err, "history: {}: {}", file, e)?;
                    return Ok(1);
                }
                Ok(0)
            }
            ["-a", file] => {
                if let Err(e) = state.history.append_to(Path::new(file)) {
                    writeln!(err, "history: {}: {}", file, e)?;
                    return Ok(1);
                }
                Ok(0)
            }
            ["-r"] | ["-w"] | ["-a"] => {
                writeln!(err, "history: {}: missing file argument", args[0])?;
                Ok(1)
            }
            [count] => match count.parse::<usize>() {
                Ok(n) if n > 0 => {
                    let n = n.min(state.history.len());
                    list_entries(&state.history, n, out)?;
                    Ok(0)
                }
                _ => {
                    writeln!(err, "history: {}: numeric argument required", count)?;
                    Ok(1)
                }
            },
            _ => {
                writeln!(err, "history: too many arguments")?;
                Ok(1)
            }
        }
    }
}

/// Prints the last `count` entries with their 1-based indices.
fn list_entries(history: &History, count: usize, out: &mut dyn Write) -> Result<(), CommandError> {
    let entries = history.entries();
    let start = entries.len() - count;
    for (offset, entry) in entries[start..].iter().enumerate() {
        writeln!(out, "{:5}  {}", start + offset + 1, entry)?;
    }
    Ok(())
}
