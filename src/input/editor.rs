//! Raw-mode line editor: keystroke handling, history recall and tab
//! completion. Produces the raw line consumed by the pipeline splitter.

use std::io::{self, Read, Write};

use nix::sys::termios::{self, LocalFlags, SetArg, Termios};

use crate::error::ShellError;
use crate::input::{common_prefix, ShellCompleter};

const BELL: &[u8] = b"\x07";
const CTRL_D: u8 = 0x04;
const BACKSPACE: u8 = 0x7f;
const CTRL_H: u8 = 0x08;
const ESC: u8 = 0x1b;

/// Restores the saved terminal settings when dropped, so every exit
/// path out of `read_line` leaves the terminal usable.
struct RawModeGuard {
    saved: Termios,
}

impl RawModeGuard {
    fn enter() -> Result<Self, ShellError> {
        let saved = termios::tcgetattr(libc::STDIN_FILENO)?;
        let mut raw = saved.clone();
        raw.local_flags
            .remove(LocalFlags::ICANON | LocalFlags::ECHO);
        termios::tcsetattr(libc::STDIN_FILENO, SetArg::TCSANOW, &raw)?;
        Ok(RawModeGuard { saved })
    }
}

impl Drop for RawModeGuard {
    fn drop(&mut self) {
        let _ = termios::tcsetattr(libc::STDIN_FILENO, SetArg::TCSANOW, &self.saved);
    }
}

/// Scanner state for the two-byte suffix of arrow-key sequences.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum KeyState {
    Normal,
    Escape1,
    Escape2,
}

/// Transient per-line state, dropped when the line is submitted.
struct EditState {
    buffer: String,
    /// History browsing position; `history.len()` means past the end.
    cursor: usize,
    /// In-progress line stashed when browsing begins.
    stash: Option<String>,
    /// Buffer content at the previous tab press; a repeat on unchanged
    /// content lists all candidates.
    tab_anchor: Option<String>,
}

pub struct LineEditor<'a> {
    completer: &'a ShellCompleter,
    history: &'a [String],
}

impl<'a> LineEditor<'a> {
    pub fn new(completer: &'a ShellCompleter, history: &'a [String]) -> Self {
        LineEditor { completer, history }
    }

    /// Collects one line in raw mode. `Ok(None)` means end of input:
    /// ctrl-D on an empty buffer, or stdin closed.
    pub fn read_line(&self, prompt: &str) -> Result<Option<String>, ShellError> {
        let _guard = RawModeGuard::enter()?;

        let mut stdout = io::stdout();
        write!(stdout, "{}", prompt)?;
        stdout.flush()?;

        let mut state = EditState {
            buffer: String::new(),
            cursor: self.history.len(),
            stash: None,
            tab_anchor: None,
        };
        let mut keystate = KeyState::Normal;
        let mut stdin = io::stdin();
        let mut byte = [0u8; 1];

        loop {
            let n = match stdin.read(&mut byte) {
                Ok(n) => n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e.into()),
            };
            if n == 0 {
                write!(stdout, "\r\n")?;
                stdout.flush()?;
                return Ok(None);
            }

            let b = byte[0];
            match keystate {
                KeyState::Escape1 => {
                    keystate = if b == b'[' {
                        KeyState::Escape2
                    } else {
                        KeyState::Normal
                    };
                }
                KeyState::Escape2 => {
                    match b {
                        b'A' => self.history_back(&mut state, prompt, &mut stdout)?,
                        b'B' => self.history_forward(&mut state, prompt, &mut stdout)?,
                        _ => {}
                    }
                    keystate = KeyState::Normal;
                }
                KeyState::Normal => match b {
                    b'\r' | b'\n' => {
                        write!(stdout, "\r\n")?;
                        stdout.flush()?;
                        return Ok(Some(state.buffer));
                    }
                    CTRL_D if state.buffer.is_empty() => {
                        write!(stdout, "\r\n")?;
                        stdout.flush()?;
                        return Ok(None);
                    }
                    BACKSPACE | CTRL_H => {
                        if state.buffer.pop().is_some() {
                            stdout.write_all(b"\x08 \x08")?;
                        }
                    }
                    ESC => keystate = KeyState::Escape1,
                    b'\t' => self.complete(&mut state, prompt, &mut stdout)?,
                    0x20..=0x7e => {
                        state.buffer.push(b as char);
                        stdout.write_all(&byte)?;
                    }
                    _ => {}
                },
            }
            stdout.flush()?;
        }
    }

    fn history_back(
        &self,
        state: &mut EditState,
        prompt: &str,
        out: &mut impl Write,
    ) -> io::Result<()> {
        if state.cursor == 0 {
            return Ok(());
        }
        if state.cursor == self.history.len() {
            state.stash = Some(state.buffer.clone());
        }
        state.cursor -= 1;
        state.buffer = self.history[state.cursor].clone();
        redraw(out, prompt, &state.buffer)
    }

    fn history_forward(
        &self,
        state: &mut EditState,
        prompt: &str,
        out: &mut impl Write,
    ) -> io::Result<()> {
        if state.cursor >= self.history.len() {
            return Ok(());
        }
        state.cursor += 1;
        state.buffer = if state.cursor == self.history.len() {
            state.stash.take().unwrap_or_default()
        } else {
            self.history[state.cursor].clone()
        };
        redraw(out, prompt, &state.buffer)
    }

    fn complete(
        &self,
        state: &mut EditState,
        prompt: &str,
        out: &mut impl Write,
    ) -> io::Result<()> {
        let candidates = self.completer.candidates(&state.buffer);
        match candidates.as_slice() {
            [] => out.write_all(BELL),
            [only] => {
                state.buffer = format!("{} ", only);
                redraw(out, prompt, &state.buffer)
            }
            _ => {
                let prefix = common_prefix(&candidates);
                if prefix.len() > state.buffer.len() {
                    state.buffer = prefix;
                    return redraw(out, prompt, &state.buffer);
                }
                if state.tab_anchor.as_deref() == Some(state.buffer.as_str()) {
                    write!(out, "\r\n{}\r\n", candidates.join("  "))?;
                    state.tab_anchor = None;
                    return redraw(out, prompt, &state.buffer);
                }
                state.tab_anchor = Some(state.buffer.clone());
                out.write_all(BELL)
            }
        }
    }
}

/// Repaints the prompt and buffer on the current line.
fn redraw(out: &mut impl Write, prompt: &str, buffer: &str) -> io::Result<()> {
    write!(out, "\r\x1b[K{}{}", prompt, buffer)
}
