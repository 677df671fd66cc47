use std::io::Write;

use super::{Builtin, CommandError};
use crate::core::resolver::{self, Resolution};
use crate::core::state::ShellState;
use crate::parse::ParsedCommand;

pub struct TypeCommand;

impl Builtin for TypeCommand {
    fn run(
        &self,
        cmd: &ParsedCommand,
        _state: &mut ShellState,
        out: &mut dyn Write,
        err: &mut dyn Write,
    ) -> Result<i32, CommandError> {
        let Some(name) = cmd.argv.get(1).map(|a| a.text.as_str()) else {
            writeln!(err, "type: missing operand")?;
            return Ok(1);
        };

        match resolver::resolve(name) {
            Resolution::Builtin => {
                writeln!(out, "{} is a shell builtin", name)?;
                Ok(0)
            }
            Resolution::External(path) => {
                writeln!(out, "{} is {}", name, path.display())?;
                Ok(0)
            }
            Resolution::NotFound => {
                writeln!(out, "{}: not found", name)?;
                Ok(1)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse::tokenize;

    fn run_type(line: &str) -> (i32, String) {
        let cmd = tokenize(line).expect("parse");
        let mut state = ShellState::new();
        let (mut out, mut err) = (Vec::new(), Vec::new());
        let status = TypeCommand
            .run(&cmd, &mut state, &mut out, &mut err)
            .expect("type runs");
        (status, String::from_utf8(out).expect("utf8"))
    }

    #[test]
    fn test_every_builtin_is_reported_as_builtin() {
        for name in crate::core::commands::BUILTIN_NAMES {
            let (status, output) = run_type(&format!("type {}", name));
            assert_eq!(status, 0);
            assert_eq!(output, format!("{} is a shell builtin\n", name));
        }
    }

    #[test]
    fn test_unknown_name_is_not_found() {
        let (status, output) = run_type("type vena-no-such-command");
        assert_eq!(status, 1);
        assert_eq!(output, "vena-no-such-command: not found\n");
    }
}
