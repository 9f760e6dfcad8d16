//! Character cursor over source text.

use std::iter::Peekable;
use std::str::Chars;

/// A peekable character cursor.
///
/// All parsing is expressed in terms of [`read`](Reader::read) and
/// [`peek`](Reader::peek), with the cursor passed explicitly through
/// every parser function.
#[derive(Debug, Clone)]
pub struct Reader<'a> {
    chars: Peekable<Chars<'a>>,
    /// Current byte position in the input string.
    position: usize,
}

impl<'a> Reader<'a> {
    /// Creates a new reader over the given source.
    pub fn new(source: &'a str) -> Self {
        Self {
            chars: source.chars().peekable(),
            position: 0,
        }
    }

    /// Peeks at the next character without consuming it.
    pub fn peek(&mut self) -> Option<char> {
        self.chars.peek().copied()
    }

    /// Consumes and returns the next character, updating position.
    pub fn read(&mut self) -> Option<char> {
        let c = self.chars.next();
        if let Some(ch) = c {
            self.position += ch.len_utf8();
        }
        c
    }

    /// Consumes characters through the end of the current line.
    pub fn skip_line(&mut self) {
        while let Some(c) = self.read() {
            if c == '\n' {
                break;
            }
        }
    }

    /// Returns the byte offset of the next character.
    pub fn position(&self) -> usize {
        self.position
    }
}
