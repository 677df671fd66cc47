use std::env;
use std::io::{ErrorKind, Write};
use std::path::PathBuf;

use super::{Builtin, CommandError};
use crate::core::state::ShellState;
use crate::parse::ParsedCommand;

pub struct CdCommand;

impl Builtin for CdCommand {
    fn run(
        &self,
        cmd: &ParsedCommand,
        _state: &mut ShellState,
        _out: &mut dyn Write,
        err: &mut dyn Write,
    ) -> Result<i32, CommandError> {
        let target = cmd.argv.get(1).map(|a| a.text.as_str()).unwrap_or("~");
        let path: PathBuf = if target == "~" {
            match dirs::home_dir() {
                Some(home) => home,
                None => {
                    writeln!(err, "cd: home directory not set")?;
                    return Ok(1);
                }
            }
        } else {
            PathBuf::from(target)
        };

        if let Err(e) = env::set_current_dir(&path) {
            writeln!(err, "cd: {}: {}", target, describe(&e))?;
            return Ok(1);
        }
        Ok(0)
    }
}

fn describe(e: &std::io::Error) -> &'static str {
    match e.kind() {
        ErrorKind::NotFound => "No such file or directory",
        ErrorKind::PermissionDenied => "Permission denied",
        _ => "Not a directory",
    }
}
