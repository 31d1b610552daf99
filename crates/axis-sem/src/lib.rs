//! axis-sem - the semantic analyzer.
//!
//! One AST walk turns the parser's [`axis_par::ast`] tree into the
//! annotated [`hir`] tree the code generator consumes: every identifier
//! resolved to a frame offset, every expression's type attached, and every
//! function's final stack frame size computed (§4.3).

pub mod analyzer;
pub mod frame;
pub mod hir;
pub mod scope;
pub mod types;

pub use analyzer::Analyzer;
pub use types::Type;
