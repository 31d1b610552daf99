//! axis-par - recursive-descent parser.
//!
//! Consumes the token stream produced by `axis-lex` and produces a
//! [`ast::Program`] with source positions attached to every node.

pub mod ast;
mod parser;

pub use parser::Parser;
