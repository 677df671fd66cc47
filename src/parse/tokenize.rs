use super::types::{Argument, ParsedCommand, Redirect};
use super::ParseError;

/// Quote context while scanning a stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum QuoteState {
    Unquoted,
    Single,
    Double,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Direction {
    Stdout,
    Stderr,
}

impl Direction {
    fn label(self) -> &'static str {
        match self {
            Direction::Stdout => "output",
            Direction::Stderr => "error",
        }
    }
}

/// Turns one pipeline-stage string into a [`ParsedCommand`].
///
/// The scan is a single pass over the characters with an explicit quote
/// state. Redirect operators are matched longest-first so `1>>` is never
/// read as `1>` followed by `>`. The word after an operator becomes the
/// target path, with the full quote and escape rules applied to it.
pub fn tokenize(line: &str) -> Result<ParsedCommand, ParseError> {
    Tokenizer::new(line).run()
}

struct Tokenizer {
    chars: Vec<char>,
    pos: usize,
    state: QuoteState,
    word: String,
    /// Set once the current word exists, even when empty (`''`).
    word_started: bool,
    word_single_quoted: bool,
    /// Operator seen, target word not yet collected.
    pending_redirect: Option<(Direction, bool)>,
    cmd: ParsedCommand,
}

impl Tokenizer {
    fn new(line: &str) -> Self {
        Tokenizer {
            chars: line.chars().collect(),
            pos: 0,
            state: QuoteState::Unquoted,
            word: String::new(),
            word_started: false,
            word_single_quoted: false,
            pending_redirect: None,
            cmd: ParsedCommand::default(),
        }
    }

    fn run(mut self) -> Result<ParsedCommand, ParseError> {
        while self.pos < self.chars.len() {
            let c = self.chars[self.pos];
            match self.state {
                QuoteState::Single => self.scan_single(c),
                QuoteState::Double => self.scan_double(c),
                QuoteState::Unquoted => self.scan_unquoted(c)?,
            }
        }

        // An unterminated quote is closed implicitly; its content was
        // already collected literally.
        self.flush_word();
        if self.pending_redirect.is_some() {
            return Err(ParseError::MissingRedirectTarget);
        }
        Ok(self.cmd)
    }

    fn scan_single(&mut self, c: char) {
        if c == '\'' {
            self.state = QuoteState::Unquoted;
        } else {
            self.word.push(c);
        }
        self.pos += 1;
    }

    fn scan_double(&mut self, c: char) {
        match c {
            '"' => {
                self.state = QuoteState::Unquoted;
                self.pos += 1;
            }
            '\\' => match self.chars.get(self.pos + 1) {
                Some(&next) if matches!(next, '"' | '\\' | '$' | '`') => {
                    self.word.push(next);
                    self.pos += 2;
                }
                Some(&next) => {
                    self.word.push('\\');
                    self.word.push(next);
                    self.pos += 2;
                }
                None => {
                    self.word.push('\\');
                    self.pos += 1;
                }
            },
            _ => {
                self.word.push(c);
                self.pos += 1;
            }
        }
    }

    fn scan_unquoted(&mut self, c: char) -> Result<(), ParseError> {
        if c == ' ' || c == '\t' {
            self.flush_word();
            self.pos += 1;
            return Ok(());
        }

        if let Some((direction, append, len)) = self.match_redirect() {
            return self.begin_redirect(direction, append, len);
        }

        match c {
            '\\' => match self.chars.get(self.pos + 1) {
                Some(&next) => {
                    self.word.push(next);
                    self.word_started = true;
                    self.pos += 2;
                }
                None => {
                    self.word.push('\\');
                    self.word_started = true;
                    self.pos += 1;
                }
            },
            '\'' => {
                self.state = QuoteState::Single;
                self.word_started = true;
                self.word_single_quoted = true;
                self.pos += 1;
            }
            '"' => {
                self.state = QuoteState::Double;
                self.word_started = true;
                self.pos += 1;
            }
            _ => {
                self.word.push(c);
                self.word_started = true;
                self.pos += 1;
            }
        }
        Ok(())
    }

    fn begin_redirect(
        &mut self,
        direction: Direction,
        append: bool,
        len: usize,
    ) -> Result<(), ParseError> {
        // A word in progress may itself be a pending redirect target
        // (`> f>g`), so it is flushed before the operator checks run.
        self.flush_word();
        if self.pending_redirect.is_some() {
            return Err(ParseError::MissingRedirectTarget);
        }
        let already_set = match direction {
            Direction::Stdout => self.cmd.stdout_to.is_some(),
            Direction::Stderr => self.cmd.stderr_to.is_some(),
        };
        if already_set {
            return Err(ParseError::DuplicateRedirect(direction.label()));
        }

        self.pending_redirect = Some((direction, append));
        self.pos += len;
        Ok(())
    }

    /// Longest-match redirect operator lookahead at the current position.
    fn match_redirect(&self) -> Option<(Direction, bool, usize)> {
        if self.lookahead("1>>") {
            Some((Direction::Stdout, true, 3))
        } else if self.lookahead("2>>") {
            Some((Direction::Stderr, true, 3))
        } else if self.lookahead("1>") {
            Some((Direction::Stdout, false, 2))
        } else if self.lookahead("2>") {
            Some((Direction::Stderr, false, 2))
        } else if self.lookahead(">>") {
            Some((Direction::Stdout, true, 2))
        } else if self.lookahead(">") {
            Some((Direction::Stdout, false, 1))
        } else {
            None
        }
    }

    fn lookahead(&self, pattern: &str) -> bool {
        let mut i = self.pos;
        for pc in pattern.chars() {
            if self.chars.get(i) != Some(&pc) {
                return false;
            }
            i += 1;
        }
        true
    }

    /// Ends the current word: redirect target when an operator is
    /// pending, argv entry otherwise.
    fn flush_word(&mut self) {
        if !self.word_started {
            return;
        }
        let text = std::mem::take(&mut self.word);
        if let Some((direction, append)) = self.pending_redirect.take() {
            let redirect = Redirect {
                path: text,
                append,
            };
            match direction {
                Direction::Stdout => self.cmd.stdout_to = Some(redirect),
                Direction::Stderr => self.cmd.stderr_to = Some(redirect),
            }
        } else {
            self.cmd.argv.push(Argument {
                text,
                single_quoted: self.word_single_quoted,
            });
        }
        self.word_started = false;
        self.word_single_quoted = false;
    }
}
