//! Source locations: file identifiers, line/column positions, and the
//! [`SourceMap`] that owns the loaded file text.
//!
//! AXIS diagnostics are always reported as `(line, col)` pairs (see the
//! lexer, parser, and semantic analyzer), so [`Span`] keeps both the raw byte
//! offsets (useful for slicing the source for a future `-v` listing) and the
//! precomputed line/column pair the diagnostic formatter actually prints.

use std::sync::Arc;

/// Identifies one source file loaded into a [`SourceMap`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FileId(pub u32);

impl FileId {
    pub const DUMMY: FileId = FileId(u32::MAX);
}

/// A half-open byte range `[start, end)` in one source file, with the
/// 1-based line/column of `start` precomputed for diagnostics.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Span {
    pub file: FileId,
    pub start: u32,
    pub end: u32,
    pub line: u32,
    pub col: u32,
}

impl Span {
    pub fn new(file: FileId, start: u32, end: u32, line: u32, col: u32) -> Self {
        Span { file, start, end, line, col }
    }

    /// A zero-width span at a given line/column, used for synthetic tokens
    /// (e.g. the `DEDENT`s emitted at end of file) that have no source text.
    pub fn point(file: FileId, line: u32, col: u32) -> Self {
        Span { file, start: 0, end: 0, line, col }
    }

    pub const DUMMY: Span = Span { file: FileId::DUMMY, start: 0, end: 0, line: 0, col: 0 };
}

/// One loaded source file plus a precomputed table of line-start offsets,
/// used to turn a byte offset back into a `(line, col)` pair without
/// rescanning the file.
#[derive(Clone)]
pub struct SourceFile {
    id: FileId,
    name: String,
    content: Arc<str>,
    line_starts: Arc<[usize]>,
}

impl SourceFile {
    fn new(id: FileId, name: String, content: String) -> Self {
        let content: Arc<str> = content.into();
        let mut line_starts = vec![0usize];
        for (offset, ch) in content.char_indices() {
            if ch == '\n' {
                line_starts.push(offset + 1);
            }
        }
        SourceFile { id, name, content, line_starts: line_starts.into() }
    }

    pub fn id(&self) -> FileId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    /// Translate a byte offset into a 1-based `(line, col)` pair.
    pub fn line_col(&self, offset: usize) -> (u32, u32) {
        let line_idx = match self.line_starts.binary_search(&offset) {
            Ok(i) => i,
            Err(i) => i.saturating_sub(1),
        };
        let line_start = self.line_starts[line_idx];
        let col = self.content[line_start..offset].chars().count() + 1;
        (line_idx as u32 + 1, col as u32)
    }
}

/// Owns every source file loaded during one compiler invocation.
///
/// The core compiles exactly one file per run (§6.5), but `SourceMap` keeps
/// the door open for a future driver to batch multiple files through a
/// shared diagnostic formatter without changing this type.
#[derive(Default)]
pub struct SourceMap {
    files: Vec<SourceFile>,
}

impl SourceMap {
    pub fn new() -> Self {
        SourceMap { files: Vec::new() }
    }

    pub fn add_file(&mut self, name: impl Into<String>, content: impl Into<String>) -> FileId {
        let id = FileId(self.files.len() as u32);
        self.files.push(SourceFile::new(id, name.into(), content.into()));
        id
    }

    pub fn get(&self, id: FileId) -> Option<&SourceFile> {
        self.files.get(id.0 as usize)
    }
}
