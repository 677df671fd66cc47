use std::io::Write;

use super::{Builtin, CommandError};
use crate::core::state::ShellState;
use crate::parse::ParsedCommand;

pub struct ExitCommand;

impl Builtin for ExitCommand {
    fn run(
        &self,
        cmd: &ParsedCommand,
        state: &mut ShellState,
        _out: &mut dyn Write,
        err: &mut dyn Write,
    ) -> Result<i32, CommandError> {
        let code = match cmd.argv.get(1) {
            None => 0,
            Some(arg) => match arg.text.parse::<i32>() {
                Ok(n) => n,
                Err(_) => {
                    writeln!(err, "exit: {}: numeric argument required", arg.text)?;
                    state.exit = Some(2);
                    return Ok(2);
                }
            },
        };
        state.exit = Some(code);
        Ok(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse::tokenize;

    fn run_exit(line: &str) -> (ShellState, i32) {
        let cmd = tokenize(line).expect("parse");
        let mut state = ShellState::new();
        let (mut out, mut err) = (Vec::new(), Vec::new());
        let status = ExitCommand
            .run(&cmd, &mut state, &mut out, &mut err)
            .expect("exit runs");
        (state, status)
    }

    #[test]
    fn test_exit_requests_loop_termination() {
        let (state, status) = run_exit("exit");
        assert_eq!(status, 0);
        assert_eq!(state.exit, Some(0));
    }

    #[test]
    fn test_exit_with_code() {
        let (state, _) = run_exit("exit 3");
        assert_eq!(state.exit, Some(3));
    }

    #[test]
    fn test_exit_with_garbage_code() {
        let (state, status) = run_exit("exit lots");
        assert_eq!(status, 2);
        assert_eq!(state.exit, Some(2));
    }
}
