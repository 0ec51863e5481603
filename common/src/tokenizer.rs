//! Streaming word splitter.
//!
//! Input is consumed line by line. The line terminator (`\n`, optionally
//! preceded by `\r`) ends a line and is never part of a token. Inside a line,
//! words are separated by the single character `' '` only, so `"x  y"` yields
//! `"x"`, `""`, `"y"` and an empty line yields one empty token. Whether empty
//! tokens reach the caller is governed by [`EmptyTokens`].

use std::io::{self, BufRead};

/// What to do with the empty tokens produced by adjacent, leading or
/// trailing spaces and by empty lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EmptyTokens {
    /// Emit `""` like any other word.
    #[default]
    Keep,
    /// Drop empty tokens before they are counted.
    Skip,
}

/// Lazy, non-restartable token sequence over a reader.
///
/// An I/O error (invalid UTF-8 included) is yielded once, after which the
/// iterator is exhausted.
pub struct Tokens<R> {
    reader: R,
    line: String,
    cursor: Option<usize>,
    policy: EmptyTokens,
    lines: u64,
    done: bool,
}

impl<R: BufRead> Tokens<R> {
    pub fn new(reader: R, policy: EmptyTokens) -> Self {
        Self {
            reader,
            line: String::new(),
            cursor: None,
            policy,
            lines: 0,
            done: false,
        }
    }

    /// Number of lines consumed so far.
    pub fn lines_read(&self) -> u64 {
        self.lines
    }

    fn next_line(&mut self) -> io::Result<bool> {
        self.line.clear();
        if self.reader.read_line(&mut self.line)? == 0 {
            return Ok(false);
        }
        if self.line.ends_with('\n') {
            self.line.pop();
            if self.line.ends_with('\r') {
                self.line.pop();
            }
        }
        self.lines += 1;
        Ok(true)
    }
}

impl<R: BufRead> Iterator for Tokens<R> {
    type Item = io::Result<String>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if self.done {
                return None;
            }
            let Some(start) = self.cursor else {
                match self.next_line() {
                    Ok(true) => self.cursor = Some(0),
                    Ok(false) => {
                        self.done = true;
                        return None;
                    }
                    Err(e) => {
                        self.done = true;
                        return Some(Err(e));
                    }
                }
                continue;
            };

            let rest = &self.line[start..];
            let token = match rest.find(' ') {
                Some(end) => {
                    self.cursor = Some(start + end + 1);
                    &rest[..end]
                }
                None => {
                    self.cursor = None;
                    rest
                }
            };
            if token.is_empty() && self.policy == EmptyTokens::Skip {
                continue;
            }
            return Some(Ok(token.to_owned()));
        }
    }
}

/// Tokenizes an in-memory string with the same rules as [`Tokens`].
pub fn tokenize_str(text: &str, policy: EmptyTokens) -> Vec<String> {
    Tokens::new(text.as_bytes(), policy)
        .collect::<io::Result<_>>()
        .unwrap_or_default()
}
