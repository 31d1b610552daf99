//! The tokenizer proper.
//!
//! Indentation handling is the one part of this module that earns the long
//! comment: everything else is a fairly mechanical recursive-descent scan.
//!
//! # Indentation algorithm
//!
//! A stack of column widths starts as `[0]`. At the start of every
//! non-blank, non-comment-only line we measure the line's leading
//! whitespace (tabs count as 8 columns) and compare it to the stack top:
//!
//! - equal: no token.
//! - greater: push the new width, emit one `Indent`.
//! - less: pop widths greater than the new one, emitting one `Dedent` per
//!   pop. If the new width doesn't land exactly on a remaining stack entry,
//!   that's an `IndentationError` - there is no silent snapping to the
//!   nearest level.
//!
//! At end of file we emit one `Dedent` per entry still on the stack above
//! the base `0`, so every `Indent` is guaranteed a matching `Dedent`.

use std::collections::VecDeque;

use axis_util::{Diagnostic, DiagnosticKind, FileId, Handler, Location, Span, Symbol};

use crate::cursor::Cursor;
use crate::token::{Keyword, Op, Punct, Radix, Token, TokenKind};

const TAB_WIDTH: u32 = 8;

pub struct Lexer<'a> {
    cursor: Cursor<'a>,
    handler: &'a mut Handler,
    file: FileId,
    file_name: String,
    indent_stack: Vec<u32>,
    /// Tokens produced by line-start bookkeeping (possibly several `Dedent`s
    /// at once) that have not yet been handed to the caller.
    pending: VecDeque<Token>,
    at_line_start: bool,
    paren_depth: u32,
    eof_emitted: bool,
}

impl<'a> Lexer<'a> {
    pub fn new(source: &'a str, file: FileId, file_name: impl Into<String>, handler: &'a mut Handler) -> Self {
        Lexer {
            cursor: Cursor::new(source),
            handler,
            file,
            file_name: file_name.into(),
            indent_stack: vec![0],
            pending: VecDeque::new(),
            at_line_start: true,
            paren_depth: 0,
            eof_emitted: false,
        }
    }

    /// Lexes the whole source into a vector, for callers (the parser, tests)
    /// that don't want to drive the iterator themselves.
    pub fn tokenize(mut self) -> Vec<Token> {
        let mut out = Vec::new();
        loop {
            let tok = self.next_token();
            let is_eof = matches!(tok.kind, TokenKind::Eof);
            out.push(tok);
            if is_eof {
                return out;
            }
        }
    }

    pub fn next_token(&mut self) -> Token {
        if let Some(tok) = self.pending.pop_front() {
            return tok;
        }

        if self.at_line_start {
            self.handle_line_start();
            if let Some(tok) = self.pending.pop_front() {
                return tok;
            }
        }

        self.skip_intra_line_whitespace_and_comments();

        if self.cursor.is_eof() {
            return self.handle_eof();
        }

        let start = self.cursor.position();
        let (line, col) = (self.cursor.line(), self.cursor.column());
        let c = self.cursor.current();

        if c == '\n' {
            self.cursor.advance();
            self.at_line_start = true;
            if self.paren_depth > 0 {
                return self.next_token();
            }
            return Token::new(TokenKind::Newline, self.span_from(start, line, col));
        }

        if is_ident_start(c) {
            return self.lex_ident_or_keyword(start, line, col);
        }

        if c.is_ascii_digit() {
            return self.lex_number(start, line, col);
        }

        if c == '"' {
            return self.lex_string(start, line, col);
        }

        self.lex_operator_or_punct(start, line, col)
    }

    fn span_from(&self, start: usize, line: u32, col: u32) -> Span {
        Span::new(self.file, start as u32, self.cursor.position() as u32, line, col)
    }

    fn error(&mut self, kind: DiagnosticKind, line: u32, col: u32, message: impl Into<String>) {
        self.handler.emit(Diagnostic::error(
            kind,
            Location::Source { file: self.file, file_name: self.file_name.clone(), line, col },
            message,
        ));
    }

    // ---- line-start bookkeeping ------------------------------------------------

    fn handle_line_start(&mut self) {
        loop {
            let line_start_pos = self.cursor.position();
            let (line, _) = (self.cursor.line(), self.cursor.column());
            let width = self.measure_indent();

            if self.cursor.is_eof() {
                self.at_line_start = false;
                return;
            }
            if self.is_blank_or_comment_only_line() {
                self.skip_to_next_line();
                continue;
            }

            self.at_line_start = false;
            self.apply_indent(width, line, line_start_pos);
            return;
        }
    }

    /// Counts leading whitespace columns (tabs expand to 8) without
    /// consuming a trailing newline.
    fn measure_indent(&mut self) -> u32 {
        let mut width = 0u32;
        loop {
            match self.cursor.current() {
                ' ' => {
                    width += 1;
                    self.cursor.advance();
                }
                '\t' => {
                    width += TAB_WIDTH - (width % TAB_WIDTH);
                    self.cursor.advance();
                }
                _ => break,
            }
        }
        width
    }

    fn is_blank_or_comment_only_line(&self) -> bool {
        matches!(self.cursor.current(), '\n' | '\r' | '\0')
            || (self.cursor.current() == '/' && self.cursor.peek() == '/')
            || self.cursor.current() == '#'
    }

    fn skip_to_next_line(&mut self) {
        while !self.cursor.is_eof() && self.cursor.current() != '\n' {
            self.cursor.advance();
        }
        if self.cursor.current() == '\n' {
            self.cursor.advance();
        }
    }

    fn apply_indent(&mut self, width: u32, line: u32, pos: usize) {
        let top = *self.indent_stack.last().expect("indent stack never empty");
        if width == top {
            return;
        }
        if width > top {
            self.indent_stack.push(width);
            self.pending.push_back(Token::new(TokenKind::Indent, Span::point(self.file, line, 1)));
            return;
        }
        while *self.indent_stack.last().unwrap() > width {
            self.indent_stack.pop();
            self.pending.push_back(Token::new(TokenKind::Dedent, Span::point(self.file, line, 1)));
        }
        if *self.indent_stack.last().unwrap() != width {
            self.error(
                DiagnosticKind::IndentationError,
                line,
                1,
                format!("unindent does not match any outer indentation level (column {})", width + 1),
            );
            // Recover by treating this as the current level so lexing can continue.
            self.indent_stack.push(width);
        }
        let _ = pos;
    }

    fn handle_eof(&mut self) -> Token {
        if !self.eof_emitted {
            while self.indent_stack.len() > 1 {
                self.indent_stack.pop();
                self.pending.push_back(Token::new(
                    TokenKind::Dedent,
                    Span::point(self.file, self.cursor.line(), self.cursor.column()),
                ));
            }
            self.eof_emitted = true;
            self.pending.push_back(Token::new(
                TokenKind::Eof,
                Span::point(self.file, self.cursor.line(), self.cursor.column()),
            ));
        }
        self.pending.pop_front().unwrap_or_else(|| {
            Token::new(TokenKind::Eof, Span::point(self.file, self.cursor.line(), self.cursor.column()))
        })
    }

    // ---- intra-line scanning ----------------------------------------------------

    fn skip_intra_line_whitespace_and_comments(&mut self) {
        loop {
            match self.cursor.current() {
                ' ' | '\t' => {
                    self.cursor.advance();
                }
                '/' if self.cursor.peek() == '/' => self.skip_line_comment(),
                '#' => self.skip_line_comment(),
                _ => return,
            }
        }
    }

    fn skip_line_comment(&mut self) {
        while !self.cursor.is_eof() && self.cursor.current() != '\n' {
            self.cursor.advance();
        }
    }

    fn lex_ident_or_keyword(&mut self, start: usize, line: u32, col: u32) -> Token {
        while is_ident_continue(self.cursor.current()) {
            self.cursor.advance();
        }
        let text = self.cursor.slice(start, self.cursor.position());
        let kind = match Keyword::from_str(text) {
            Some(kw) => TokenKind::Keyword(kw),
            None => TokenKind::Ident(Symbol::intern(text)),
        };
        Token::new(kind, self.span_from(start, line, col))
    }

    fn lex_number(&mut self, start: usize, line: u32, col: u32) -> Token {
        let radix = if self.cursor.current() == '0' && (self.cursor.peek() == 'x' || self.cursor.peek() == 'X') {
            self.cursor.advance();
            self.cursor.advance();
            Radix::Hex
        } else if self.cursor.current() == '0' && (self.cursor.peek() == 'b' || self.cursor.peek() == 'B') {
            self.cursor.advance();
            self.cursor.advance();
            Radix::Bin
        } else {
            Radix::Dec
        };

        let digits_start = self.cursor.position();
        let valid_digit: fn(char) -> bool = match radix {
            Radix::Dec => |c| c.is_ascii_digit(),
            Radix::Hex => |c| c.is_ascii_hexdigit(),
            Radix::Bin => |c| c == '0' || c == '1',
        };
        while valid_digit(self.cursor.current()) {
            self.cursor.advance();
        }
        let digits = self.cursor.slice(digits_start, self.cursor.position());

        if digits.is_empty() {
            self.error(DiagnosticKind::LexError, line, col, "numeric literal has no digits");
            return Token::new(TokenKind::Int { value: 0, radix }, self.span_from(start, line, col));
        }

        let parsed = match radix {
            Radix::Dec => u64::from_str_radix(digits, 10),
            Radix::Hex => u64::from_str_radix(digits, 16),
            Radix::Bin => u64::from_str_radix(digits, 2),
        };
        let value = match parsed {
            Ok(v) => v,
            Err(_) => {
                self.error(DiagnosticKind::LexError, line, col, format!("integer literal `{digits}` overflows 64 bits"));
                0
            }
        };
        Token::new(TokenKind::Int { value, radix }, self.span_from(start, line, col))
    }

    fn lex_string(&mut self, start: usize, line: u32, col: u32) -> Token {
        self.cursor.advance(); // opening quote
        let mut decoded = String::new();
        loop {
            match self.cursor.current() {
                '"' => {
                    self.cursor.advance();
                    break;
                }
                '\0' | '\n' => {
                    self.error(DiagnosticKind::LexError, line, col, "unterminated string literal");
                    break;
                }
                '\\' => {
                    self.cursor.advance();
                    let esc = self.cursor.current();
                    self.cursor.advance();
                    match esc {
                        'n' => decoded.push('\n'),
                        't' => decoded.push('\t'),
                        'r' => decoded.push('\r'),
                        '0' => decoded.push('\0'),
                        '\\' => decoded.push('\\'),
                        '"' => decoded.push('"'),
                        other => {
                            self.error(
                                DiagnosticKind::LexError,
                                line,
                                col,
                                format!("unknown escape sequence `\\{other}`"),
                            );
                        }
                    }
                }
                c => {
                    decoded.push(c);
                    self.cursor.advance();
                }
            }
        }
        Token::new(TokenKind::Str(Symbol::intern(&decoded)), self.span_from(start, line, col))
    }

    fn lex_operator_or_punct(&mut self, start: usize, line: u32, col: u32) -> Token {
        let c = self.cursor.advance();
        let kind = match c {
            '(' => {
                self.paren_depth += 1;
                TokenKind::Punct(Punct::LParen)
            }
            ')' => {
                self.paren_depth = self.paren_depth.saturating_sub(1);
                TokenKind::Punct(Punct::RParen)
            }
            ',' => TokenKind::Punct(Punct::Comma),
            ':' => TokenKind::Punct(Punct::Colon),
            '+' => TokenKind::Op(Op::Plus),
            '*' => TokenKind::Op(Op::Star),
            '/' => TokenKind::Op(Op::Slash),
            '%' => TokenKind::Op(Op::Percent),
            '&' => TokenKind::Op(Op::Amp),
            '|' => TokenKind::Op(Op::Pipe),
            '^' => TokenKind::Op(Op::Caret),
            '-' => {
                if self.cursor.bump_if('>') {
                    TokenKind::Op(Op::Arrow)
                } else {
                    TokenKind::Op(Op::Minus)
                }
            }
            '<' => {
                if self.cursor.bump_if('<') {
                    TokenKind::Op(Op::Shl)
                } else if self.cursor.bump_if('=') {
                    TokenKind::Op(Op::Le)
                } else {
                    TokenKind::Op(Op::Lt)
                }
            }
            '>' => {
                if self.cursor.bump_if('>') {
                    TokenKind::Op(Op::Shr)
                } else if self.cursor.bump_if('=') {
                    TokenKind::Op(Op::Ge)
                } else {
                    TokenKind::Op(Op::Gt)
                }
            }
            '=' => {
                if self.cursor.bump_if('=') {
                    TokenKind::Op(Op::EqEq)
                } else {
                    TokenKind::Op(Op::Eq)
                }
            }
            '!' => {
                if self.cursor.bump_if('=') {
                    TokenKind::Op(Op::Ne)
                } else {
                    TokenKind::Op(Op::Bang)
                }
            }
            other => {
                self.error(DiagnosticKind::LexError, line, col, format!("unexpected character `{other}`"));
                TokenKind::Eof
            }
        };
        Token::new(kind, self.span_from(start, line, col))
    }
}

fn is_ident_start(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_'
}

fn is_ident_continue(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

#[cfg(test)]
mod tests {
    use super::*;
    use axis_util::FileId;

    fn lex(src: &str) -> Vec<TokenKind> {
        let mut handler = Handler::new();
        let lexer = Lexer::new(src, FileId(0), "test.ax", &mut handler);
        lexer.tokenize().into_iter().map(|t| t.kind).collect()
    }

    #[test]
    fn simple_function_produces_indent_dedent_pair() {
        let kinds = lex("func main() -> i32:\n    give 42\n");
        assert!(matches!(kinds[0], TokenKind::Keyword(Keyword::Func)));
        assert!(kinds.contains(&TokenKind::Indent));
        assert!(kinds.contains(&TokenKind::Dedent));
        assert_eq!(*kinds.last().unwrap(), TokenKind::Eof);
    }

    #[test]
    fn blank_and_comment_only_lines_emit_no_indentation_tokens() {
        let kinds = lex("func f() -> i32:\n    // comment\n\n    give 1\n");
        let indents = kinds.iter().filter(|k| matches!(k, TokenKind::Indent)).count();
        assert_eq!(indents, 1);
    }

    #[test]
    fn nested_blocks_dedent_in_order() {
        let kinds = lex("func f() -> i32:\n    while True:\n        give 1\n    give 0\n");
        let dedents = kinds.iter().filter(|k| matches!(k, TokenKind::Dedent)).count();
        assert_eq!(dedents, 2);
    }

    #[test]
    fn mismatched_dedent_reports_indentation_error() {
        let mut handler = Handler::new();
        let src = "func f() -> i32:\n    when True:\n        give 1\n      give 2\n";
        let lexer = Lexer::new(src, FileId(0), "test.ax", &mut handler);
        let _ = lexer.tokenize();
        assert!(handler.has_errors());
    }

    #[test]
    fn hex_and_binary_literals_parse_to_correct_value() {
        let kinds = lex("0x2A 0b101010\n");
        assert_eq!(kinds[0], TokenKind::Int { value: 42, radix: Radix::Hex });
        assert_eq!(kinds[1], TokenKind::Int { value: 42, radix: Radix::Bin });
    }

    #[test]
    fn string_escapes_decode_correctly() {
        let kinds = lex("\"a\\nb\"\n");
        match &kinds[0] {
            TokenKind::Str(sym) => assert_eq!(sym.as_str(), "a\nb"),
            other => panic!("expected Str, got {other:?}"),
        }
    }

    #[test]
    fn newline_suppressed_inside_parens() {
        let kinds = lex("(1\n)\n");
        let newlines = kinds.iter().filter(|k| matches!(k, TokenKind::Newline)).count();
        assert_eq!(newlines, 1);
    }

    #[test]
    fn shift_operators_and_arrow_are_distinguished_from_comparisons() {
        let kinds = lex("a << b >> c -> d <= e >= f\n");
        assert!(kinds.contains(&TokenKind::Op(Op::Shl)));
        assert!(kinds.contains(&TokenKind::Op(Op::Shr)));
        assert!(kinds.contains(&TokenKind::Op(Op::Arrow)));
        assert!(kinds.contains(&TokenKind::Op(Op::Le)));
        assert!(kinds.contains(&TokenKind::Op(Op::Ge)));
    }

    proptest::proptest! {
        #[test]
        fn lexer_never_panics_on_arbitrary_ascii(s in "[ -~\n]{0,200}") {
            let mut handler = Handler::new();
            let lexer = Lexer::new(&s, FileId(0), "fuzz.ax", &mut handler);
            let _ = lexer.tokenize();
        }
    }
}
