use std::env;
use std::io::Write;

use super::{Builtin, CommandError};
use crate::core::state::ShellState;
use crate::parse::ParsedCommand;

pub struct PwdCommand;

impl Builtin for PwdCommand {
    fn run(
        &self,
        _cmd: &ParsedCommand,
        _state: &mut ShellState,
        out: &mut dyn Write,
        _err: &mut dyn Write,
    ) -> Result<i32, CommandError> {
        let dir = env::current_dir()?;
        writeln!(out, "{}", dir.display())?;
        Ok(0)
    }
}
