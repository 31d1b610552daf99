//! Diagnostic reporting.
//!
//! Every stage of the pipeline reports failures through [`Diagnostic`]; the
//! driver (`axis-drv`) is the only thing that ever prints one. The wire
//! format is fixed by the language contract:
//!
//! ```text
//! axis: <kind> at <file>:<line>:<col>: <message>
//! ```
//!
//! [`DiagnosticKind::InternalAssemblerError`] is the one exception: it has no
//! source position (the bug is in the compiler, not the input), so it prints
//! `<function>:<label-or-offset>` in place of `<line>:<col>`.

use crate::span::{FileId, Span};
use std::fmt;

/// The fixed set of diagnostic kinds the compiler can raise.
///
/// This mirrors the error taxonomy of the language contract one-for-one;
/// adding a new kind here is a breaking change to the CLI's observable
/// output, not an internal refactor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiagnosticKind {
    LexError,
    IndentationError,
    ParseError,
    NameError,
    TypeError,
    RangeError,
    ArityError,
    /// A bug in the code generator or assembler itself - the abstract
    /// instruction stream violated an invariant the encoder relies on.
    InternalAssemblerError,
}

impl fmt::Display for DiagnosticKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            DiagnosticKind::LexError => "LexError",
            DiagnosticKind::IndentationError => "IndentationError",
            DiagnosticKind::ParseError => "ParseError",
            DiagnosticKind::NameError => "NameError",
            DiagnosticKind::TypeError => "TypeError",
            DiagnosticKind::RangeError => "RangeError",
            DiagnosticKind::ArityError => "ArityError",
            DiagnosticKind::InternalAssemblerError => "InternalAssemblerError",
        };
        f.write_str(s)
    }
}

/// Severity is always effectively "fatal" per the language contract (§7):
/// the compiler reports one diagnostic and exits non-zero. `Level` still
/// exists so a future `-W` flag can downgrade lint-style notes without
/// touching the reporting plumbing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    Error,
    Note,
}

/// Where a diagnostic points: either a source position, or - for assembler
/// bugs - the function and label/offset that tripped the invariant.
#[derive(Debug, Clone)]
pub enum Location {
    Source { file: FileId, file_name: String, line: u32, col: u32 },
    Assembler { function: String, label_or_offset: String },
}

impl Location {
    pub fn from_span(file_name: impl Into<String>, span: Span) -> Self {
        Location::Source { file: span.file, file_name: file_name.into(), line: span.line, col: span.col }
    }
}

#[derive(Debug, Clone)]
pub struct Diagnostic {
    pub level: Level,
    pub kind: DiagnosticKind,
    pub message: String,
    pub location: Location,
}

impl Diagnostic {
    pub fn error(kind: DiagnosticKind, location: Location, message: impl Into<String>) -> Self {
        Diagnostic { level: Level::Error, kind, message: message.into(), location }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.location {
            Location::Source { file_name, line, col, .. } => {
                write!(f, "axis: {} at {}:{}:{}: {}", self.kind, file_name, line, col, self.message)
            }
            Location::Assembler { function, label_or_offset } => {
                write!(f, "axis: {} at {}:{}: {}", self.kind, function, label_or_offset, self.message)
            }
        }
    }
}

/// Accumulates diagnostics for the current compilation.
///
/// The language contract only promises "at least one reported, none
/// hidden" (§7) - it does not require stopping at the first error. `Handler`
/// therefore collects every diagnostic a stage raises so the driver can
/// print them all, but each pipeline stage still checks
/// [`Handler::has_errors`] before handing its output to the next stage, so a
/// malformed AST never reaches the type checker and a rejected program never
/// reaches the assembler.
#[derive(Default)]
pub struct Handler {
    diagnostics: Vec<Diagnostic>,
}

impl Handler {
    pub fn new() -> Self {
        Handler { diagnostics: Vec::new() }
    }

    pub fn emit(&mut self, diagnostic: Diagnostic) {
        self.diagnostics.push(diagnostic);
    }

    pub fn has_errors(&self) -> bool {
        self.diagnostics.iter().any(|d| d.level == Level::Error)
    }

    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    pub fn into_diagnostics(self) -> Vec<Diagnostic> {
        self.diagnostics
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::span::FileId;

    #[test]
    fn formats_source_diagnostic_per_contract() {
        let d = Diagnostic::error(
            DiagnosticKind::TypeError,
            Location::Source { file: FileId(0), file_name: "main.ax".into(), line: 3, col: 5 },
            "expected i32, found bool",
        );
        assert_eq!(d.to_string(), "axis: TypeError at main.ax:3:5: expected i32, found bool");
    }

    #[test]
    fn formats_assembler_diagnostic_with_function_and_label() {
        let d = Diagnostic::error(
            DiagnosticKind::InternalAssemblerError,
            Location::Assembler { function: "fact".into(), label_or_offset: ".L.fact_2".into() },
            "jump target never defined",
        );
        assert_eq!(
            d.to_string(),
            "axis: InternalAssemblerError at fact:.L.fact_2: jump target never defined"
        );
    }

    #[test]
    fn handler_tracks_error_state() {
        let mut handler = Handler::new();
        assert!(!handler.has_errors());
        handler.emit(Diagnostic::error(
            DiagnosticKind::NameError,
            Location::Source { file: FileId(0), file_name: "a.ax".into(), line: 1, col: 1 },
            "undefined identifier `x`",
        ));
        assert!(handler.has_errors());
        assert_eq!(handler.diagnostics().len(), 1);
    }
}
