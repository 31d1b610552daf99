//! axis-lex - indentation-sensitive tokenizer.
//!
//! Turns source bytes into a flat [`Token`] stream terminated by `Eof`.
//! Indentation is resolved here, once, by synthesizing `Indent`/`Dedent`
//! tokens from a stack of column widths - the parser never looks at
//! whitespace itself.

mod cursor;
mod lexer;
mod token;

pub use lexer::Lexer;
pub use token::{Keyword, Op, Punct, Radix, Token, TokenKind};
