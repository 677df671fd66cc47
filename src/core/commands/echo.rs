use std::io::Write;

use super::{Builtin, CommandError};
use crate::core::state::ShellState;
use crate::parse::ParsedCommand;

pub struct EchoCommand;

impl Builtin for EchoCommand {
    fn run(
        &self,
        cmd: &ParsedCommand,
        _state: &mut ShellState,
        out: &mut dyn Write,
        _err: &mut dyn Write,
    ) -> Result<i32, CommandError> {
        let words: Vec<String> = cmd
            .argv
            .iter()
            .skip(1)
            .map(|arg| {
                if arg.single_quoted {
                    arg.text.clone()
                } else {
                    decode_escapes(&arg.text)
                }
            })
            .collect();
        writeln!(out, "{}", words.join(" "))?;
        Ok(0)
    }
}

/// Decodes `\n`, `\t`, `\r`, `\\` and `\"`; any other backslash
/// sequence keeps its backslash.
fn decode_escapes(text: &str) -> String {
    let mut decoded = String::with_capacity(text.len());
    let mut chars = text.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            decoded.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => decoded.push('\n'),
            Some('t') => decoded.push('\t'),
            Some('r') => decoded.push('\r'),
            Some('\\') => decoded.push('\\'),
            Some('"') => decoded.push('"'),
            Some(other) => {
                decoded.push('\\');
                decoded.push(other);
            }
            None => decoded.push('\\'),
        }
    }
    decoded
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse::Argument;

    fn run_echo(argv: Vec<Argument>) -> String {
        let cmd = ParsedCommand {
            argv,
            ..Default::default()
        };
        let mut state = ShellState::new();
        let (mut out, mut err) = (Vec::new(), Vec::new());
        let status = EchoCommand
            .run(&cmd, &mut state, &mut out, &mut err)
            .expect("echo succeeds");
        assert_eq!(status, 0);
        String::from_utf8(out).expect("utf8")
    }

    #[test]
    fn test_decode_set() {
        assert_eq!(decode_escapes(r"a\nb"), "a\nb");
        assert_eq!(decode_escapes(r"a\tb"), "a\tb");
        assert_eq!(decode_escapes(r"a\rb"), "a\rb");
        assert_eq!(decode_escapes(r"a\\b"), r"a\b");
        assert_eq!(decode_escapes(r#"a\"b"#), "a\"b");
    }

    #[test]
    fn test_unknown_escapes_keep_backslash() {
        assert_eq!(decode_escapes(r"a\qb"), r"a\qb");
        assert_eq!(decode_escapes(r"end\"), r"end\");
    }

    #[test]
    fn test_single_quoted_words_are_verbatim() {
        let output = run_echo(vec![
            Argument::plain("echo"),
            Argument::quoted(r"a\nb"),
        ]);
        assert_eq!(output, "a\\nb\n");
    }

    #[test]
    fn test_plain_words_decode_and_join() {
        let output = run_echo(vec![
            Argument::plain("echo"),
            Argument::plain(r"a\nb"),
            Argument::plain(r"c\qd"),
        ]);
        assert_eq!(output, "a\nb c\\qd\n");
    }

    #[test]
    fn test_no_arguments_prints_bare_newline() {
        let output = run_echo(vec![Argument::plain("echo")]);
        assert_eq!(output, "\n");
    }
}
