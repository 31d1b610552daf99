//! Token vocabulary (§6.1 of the language contract: stable names the parser
//! matches on).

use axis_util::{Span, Symbol};

/// A reserved word. Type names (`i32`, `bool`, ...) are deliberately absent -
/// they are not reserved, and are recognized contextually by the parser.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Keyword {
    Func,
    Give,
    When,
    Else,
    While,
    Loop,
    Repeat,
    Break,
    Continue,
    True,
    False,
    Mode,
}

impl Keyword {
    /// Matches an identifier spelling against the keyword table, including
    /// the `stop`/`skip` synonyms for `break`/`continue`.
    pub fn from_str(s: &str) -> Option<Keyword> {
        Some(match s {
            "func" => Keyword::Func,
            "give" => Keyword::Give,
            "when" => Keyword::When,
            "else" => Keyword::Else,
            "while" => Keyword::While,
            "loop" => Keyword::Loop,
            "repeat" => Keyword::Repeat,
            "break" | "stop" => Keyword::Break,
            "continue" | "skip" => Keyword::Continue,
            "True" => Keyword::True,
            "False" => Keyword::False,
            "mode" => Keyword::Mode,
            _ => return None,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Radix {
    Dec,
    Hex,
    Bin,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Op {
    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    Amp,
    Pipe,
    Caret,
    Shl,
    Shr,
    EqEq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    Bang,
    Eq,
    Arrow,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Punct {
    LParen,
    RParen,
    Comma,
    Colon,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenKind {
    Keyword(Keyword),
    Ident(Symbol),
    /// `value` is the literal's numeric value; overflow of the inferred
    /// target width is a semantic-analysis concern, not a lexical one - the
    /// lexer only rejects a literal that overflows `u64` itself.
    Int { value: u64, radix: Radix },
    /// The decoded (escapes resolved) string contents, interned.
    Str(Symbol),
    Op(Op),
    Punct(Punct),
    Newline,
    Indent,
    Dedent,
    Eof,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    pub span: Span,
}

impl Token {
    pub fn new(kind: TokenKind, span: Span) -> Self {
        Token { kind, span }
    }
}
