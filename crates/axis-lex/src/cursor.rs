//! Character cursor for traversing source text.
//!
//! Tracks byte position plus 1-based line/column so every emitted token can
//! be stamped with a `(line, col)` without a second scan of the source.

pub struct Cursor<'a> {
    source: &'a str,
    position: usize,
    line: u32,
    column: u32,
}

impl<'a> Cursor<'a> {
    pub fn new(source: &'a str) -> Self {
        Cursor { source, position: 0, line: 1, column: 1 }
    }

    pub fn position(&self) -> usize {
        self.position
    }

    pub fn line(&self) -> u32 {
        self.line
    }

    pub fn column(&self) -> u32 {
        self.column
    }

    pub fn is_eof(&self) -> bool {
        self.position >= self.source.len()
    }

    /// Current character, or `'\0'` at end of input.
    pub fn current(&self) -> char {
        self.peek_at(0)
    }

    pub fn peek(&self) -> char {
        self.peek_at(1)
    }

    fn peek_at(&self, chars_ahead: usize) -> char {
        self.source[self.position..].chars().nth(chars_ahead).unwrap_or('\0')
    }

    /// Advances past the current character, updating line/column. A `\n`
    /// resets the column; a `\r` immediately followed by `\n` is swallowed
    /// here so callers never see CRLF as two line terminators.
    pub fn advance(&mut self) -> char {
        let c = self.current();
        if c == '\0' {
            return c;
        }
        self.position += c.len_utf8();
        if c == '\n' {
            self.line += 1;
            self.column = 1;
        } else if c == '\r' {
            if self.current() == '\n' {
                self.position += 1;
            }
            self.line += 1;
            self.column = 1;
            return '\n';
        } else {
            self.column += 1;
        }
        c
    }

    pub fn bump_if(&mut self, expected: char) -> bool {
        if self.current() == expected {
            self.advance();
            true
        } else {
            false
        }
    }

    pub fn slice(&self, start: usize, end: usize) -> &'a str {
        &self.source[start..end]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tracks_line_and_column() {
        let mut c = Cursor::new("ab\ncd");
        assert_eq!((c.line(), c.column()), (1, 1));
        c.advance();
        c.advance();
        assert_eq!((c.line(), c.column()), (1, 3));
        c.advance();
        assert_eq!((c.line(), c.column()), (2, 1));
    }

    #[test]
    fn normalizes_crlf_to_a_single_newline() {
        let mut c = Cursor::new("a\r\nb");
        c.advance();
        let nl = c.advance();
        assert_eq!(nl, '\n');
        assert_eq!(c.current(), 'b');
        assert_eq!(c.line(), 2);
    }
}
