//! Resolved entity store
//!
//! One append-only arena per entity kind, indexed densely by id with holes
//! for ids the input never defined. All cross references are typed ids into
//! the sibling arenas; the store owns every entity and every string, so the
//! reference graph is cycle free by construction. The `*_by_*` vectors are
//! the sorted secondary indices built by the resolver.

use crate::core::types::{
    FileId, LibraryId, LineId, LineType, ModuleId, ScopeId, ScopeType, SegmentId, SpanId, SymbolId,
    SymbolType,
};

#[derive(Debug)]
pub(crate) struct File {
    pub id: FileId,
    pub name: String,
    pub size: u64,
    pub mtime: u64,
    /// Modules this file is used in, sorted by module name
    pub modules_by_name: Vec<ModuleId>,
    /// Line records located in this file, sorted by line number
    pub lines_by_line: Vec<LineId>,
}

#[derive(Debug)]
pub(crate) struct Library {
    pub id: LibraryId,
    pub name: String,
}

#[derive(Debug)]
pub(crate) struct Line {
    pub id: LineId,
    pub file: Option<FileId>,
    pub line: u32,
    pub line_type: LineType,
    pub count: u32,
    pub spans: Vec<SpanId>,
}

#[derive(Debug)]
pub(crate) struct Module {
    pub id: ModuleId,
    pub name: String,
    pub file: Option<FileId>,
    pub library: Option<LibraryId>,
    /// The unique scope of this module that has no parent
    pub main_scope: Option<ScopeId>,
    /// Files referenced by this module, sorted by name
    pub files_by_name: Vec<FileId>,
    /// Scopes defined in this module, sorted by name
    pub scopes_by_name: Vec<ScopeId>,
}

#[derive(Debug)]
pub(crate) struct Scope {
    pub id: ScopeId,
    pub name: String,
    pub scope_type: ScopeType,
    pub size: u64,
    pub module: Option<ModuleId>,
    pub parent: Option<ScopeId>,
    pub label: Option<SymbolId>,
    pub spans: Vec<SpanId>,
}

#[derive(Debug)]
pub(crate) struct Segment {
    pub id: SegmentId,
    pub name: String,
    pub start: u32,
    pub size: u32,
    pub output_name: Option<String>,
    pub output_offs: u64,
}

#[derive(Debug)]
pub(crate) struct Span {
    pub id: SpanId,
    pub segment: Option<SegmentId>,
    /// Absolute start address, inclusive
    pub start: u32,
    /// Absolute end address, inclusive
    pub end: u32,
    /// Scopes referencing this span
    pub scopes: Vec<ScopeId>,
    /// Line records referencing this span
    pub lines: Vec<LineId>,
}

#[derive(Debug)]
pub(crate) struct Symbol {
    pub id: SymbolId,
    pub name: String,
    pub symbol_type: SymbolType,
    pub value: i64,
    pub size: u64,
    pub segment: Option<SegmentId>,
    /// Effective scope, possibly inherited from the parent symbol
    pub scope: Option<ScopeId>,
    pub parent: Option<SymbolId>,
}

/// The fully resolved debug info store
#[derive(Debug, Default)]
pub(crate) struct DebugStore {
    pub files: Vec<Option<File>>,
    pub libraries: Vec<Option<Library>>,
    pub lines: Vec<Option<Line>>,
    pub modules: Vec<Option<Module>>,
    pub scopes: Vec<Option<Scope>>,
    pub segments: Vec<Option<Segment>>,
    pub spans: Vec<Option<Span>>,
    pub symbols: Vec<Option<Symbol>>,

    /// Files sorted by (name, mtime, size)
    pub files_by_name: Vec<FileId>,
    /// Modules sorted by name
    pub modules_by_name: Vec<ModuleId>,
    /// Segments sorted by name
    pub segments_by_name: Vec<SegmentId>,
    /// Symbols sorted by (name, id)
    pub symbols_by_name: Vec<SymbolId>,
    /// Symbols sorted by (value, name)
    pub symbols_by_value: Vec<SymbolId>,
}

impl DebugStore {
    pub(crate) fn file(&self, id: FileId) -> Option<&File> {
        self.files.get(id.0 as usize)?.as_ref()
    }

    pub(crate) fn library(&self, id: LibraryId) -> Option<&Library> {
        self.libraries.get(id.0 as usize)?.as_ref()
    }

    pub(crate) fn line(&self, id: LineId) -> Option<&Line> {
        self.lines.get(id.0 as usize)?.as_ref()
    }

    pub(crate) fn module(&self, id: ModuleId) -> Option<&Module> {
        self.modules.get(id.0 as usize)?.as_ref()
    }

    pub(crate) fn scope(&self, id: ScopeId) -> Option<&Scope> {
        self.scopes.get(id.0 as usize)?.as_ref()
    }

    pub(crate) fn segment(&self, id: SegmentId) -> Option<&Segment> {
        self.segments.get(id.0 as usize)?.as_ref()
    }

    pub(crate) fn span(&self, id: SpanId) -> Option<&Span> {
        self.spans.get(id.0 as usize)?.as_ref()
    }

    pub(crate) fn symbol(&self, id: SymbolId) -> Option<&Symbol> {
        self.symbols.get(id.0 as usize)?.as_ref()
    }
}
