//! axis-util - Core Utilities and Foundation Types
//!
//! Shared infrastructure used by every stage of the AXIS compiler: interned
//! identifiers ([`Symbol`]), source locations ([`Span`], [`SourceMap`]), and
//! diagnostic reporting ([`Diagnostic`], [`Handler`]).
//!
//! None of these types encode language semantics - they are the plumbing the
//! lexer, parser, semantic analyzer, and code generator all build on top of.

mod diagnostic;
mod span;
mod symbol;

pub use diagnostic::{Diagnostic, DiagnosticKind, Handler, Level};
pub use span::{FileId, SourceFile, SourceMap, Span};
pub use symbol::Symbol;

pub use rustc_hash::{FxHashMap, FxHashSet};
