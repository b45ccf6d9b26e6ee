//! Core data types of the debug info model
//!
//! Ids are small integers assigned by the producing toolchain, unique and
//! dense within their entity kind. The typed wrappers below are weak handles
//! into the loaded database; they never own anything.

/// Id of a source file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FileId(pub u32);

/// Id of a library
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LibraryId(pub u32);

/// Id of a source line record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LineId(pub u32);

/// Id of a module (translation unit)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ModuleId(pub u32);

/// Id of a lexical scope
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ScopeId(pub u32);

/// Id of an output segment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SegmentId(pub u32);

/// Id of a code span
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SpanId(pub u32);

/// Id of a symbol
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SymbolId(pub u32);

/// Type of a lexical scope
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScopeType {
    Global,
    Module,
    Scope,
    Struct,
    Enum,
}

/// Type of a symbol
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SymbolType {
    /// Compile-time constant, not tied to a segment location
    Equate,
    /// Target address within a segment
    Label,
}

/// Type of a source line record
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineType {
    Asm,
    C,
    Macro,
}

impl LineType {
    /// Map the integer tag used in the input file. Unknown tags fall back
    /// to assembler lines so newer producers don't break the load.
    pub(crate) fn from_tag(tag: u64) -> Self {
        match tag {
            1 => LineType::C,
            2 => LineType::Macro,
            _ => LineType::Asm,
        }
    }
}

/// Data of one source file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceData {
    pub id: FileId,
    pub name: String,
    pub size: u64,
    pub mtime: u64,
}

/// Data of one library
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LibraryData {
    pub id: LibraryId,
    pub name: String,
}

/// Data of one module
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleData {
    pub id: ModuleId,
    pub name: String,
    /// Main source file of the module
    pub source: FileId,
    pub library: Option<LibraryId>,
    /// Top-level scope of the module
    pub main_scope: ScopeId,
}

/// Data of one source line record
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineData {
    pub id: LineId,
    pub source: FileId,
    /// 1-based line number
    pub line: u32,
    pub line_type: LineType,
    /// Macro nesting depth, 0 for plain source lines
    pub count: u32,
    /// Spans holding the code generated for this line
    pub spans: Vec<SpanId>,
}

/// Data of one lexical scope
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScopeData {
    pub id: ScopeId,
    pub name: String,
    pub scope_type: ScopeType,
    pub size: u64,
    pub module: ModuleId,
    /// Absent for a module's main scope
    pub parent: Option<ScopeId>,
    /// Symbol labelling the scope, if any
    pub label: Option<SymbolId>,
    /// Spans holding the code generated for this scope
    pub spans: Vec<SpanId>,
}

/// Data of one output segment
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SegmentData {
    pub id: SegmentId,
    pub name: String,
    pub start: u32,
    pub size: u32,
    /// Output file this segment was written to, together with
    /// `output_offs`; either both are present or neither.
    pub output_name: Option<String>,
    pub output_offs: u64,
}

/// Data of one code span. Addresses are absolute and inclusive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpanData {
    pub id: SpanId,
    pub segment: SegmentId,
    pub start: u32,
    pub end: u32,
}

/// Data of one symbol
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SymbolData {
    pub id: SymbolId,
    pub name: String,
    pub symbol_type: SymbolType,
    pub value: i64,
    pub size: u64,
    pub segment: Option<SegmentId>,
    /// Effective scope; inherited from the parent symbol when the input
    /// record carried a parent instead of a scope
    pub scope: ScopeId,
    pub parent: Option<SymbolId>,
}
