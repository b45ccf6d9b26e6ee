//! Raw directive records as collected during parsing
//!
//! Cross references are still plain integer ids at this stage; the resolver
//! turns them into typed handles once the whole file has been read. Each
//! kind is stored densely by id, with holes for ids the input never
//! defined.

use crate::core::types::{LineType, ScopeType, SymbolType};

/// Sentinel id meaning "no reference" in optional id fields
pub(crate) const NO_ID: u32 = u32::MAX;

/// Upper bound on accepted id values. Ids index dense per-kind stores, so
/// an absurd id would otherwise force an equally absurd allocation.
pub(crate) const MAX_ID: u32 = 1 << 24;

#[derive(Debug)]
pub(crate) struct RawFile {
    pub id: u32,
    pub name: String,
    pub size: u64,
    pub mtime: u64,
    /// Modules this file is used in
    pub modules: Vec<u32>,
}

#[derive(Debug)]
pub(crate) struct RawLibrary {
    pub id: u32,
    pub name: String,
}

#[derive(Debug)]
pub(crate) struct RawLine {
    pub id: u32,
    pub file: u32,
    pub line: u32,
    pub line_type: LineType,
    pub count: u32,
    pub spans: Vec<u32>,
}

#[derive(Debug)]
pub(crate) struct RawModule {
    pub id: u32,
    pub name: String,
    pub file: u32,
    pub library: u32,
}

#[derive(Debug)]
pub(crate) struct RawScope {
    pub id: u32,
    pub name: String,
    pub scope_type: ScopeType,
    pub size: u64,
    pub module: u32,
    pub parent: u32,
    pub label: u32,
    pub spans: Vec<u32>,
}

#[derive(Debug)]
pub(crate) struct RawSegment {
    pub id: u32,
    pub name: String,
    pub start: u32,
    pub size: u32,
    pub output_name: Option<String>,
    pub output_offs: u64,
}

#[derive(Debug)]
pub(crate) struct RawSpan {
    pub id: u32,
    pub segment: u32,
    pub start: u32,
    pub size: u32,
}

#[derive(Debug)]
pub(crate) struct RawSymbol {
    pub id: u32,
    pub name: String,
    pub symbol_type: SymbolType,
    pub value: i64,
    pub size: u64,
    pub segment: u32,
    pub scope: u32,
    pub parent: u32,
}

/// All raw records of one input file, each kind dense by id
#[derive(Debug, Default)]
pub(crate) struct RawStore {
    pub files: Vec<Option<RawFile>>,
    pub libraries: Vec<Option<RawLibrary>>,
    pub lines: Vec<Option<RawLine>>,
    pub modules: Vec<Option<RawModule>>,
    pub scopes: Vec<Option<RawScope>>,
    pub segments: Vec<Option<RawSegment>>,
    pub spans: Vec<Option<RawSpan>>,
    pub symbols: Vec<Option<RawSymbol>>,
}

/// Store `value` at `id`, growing the arena as needed. Returns true if an
/// earlier record with the same id was overwritten.
pub(crate) fn put<T>(arena: &mut Vec<Option<T>>, id: u32, value: T) -> bool {
    let idx = id as usize;
    if idx >= arena.len() {
        arena.resize_with(idx + 1, || None);
    }
    let replaced = arena[idx].is_some();
    arena[idx] = Some(value);
    replaced
}

/// Pre-reserve capacity from an `info` directive count hint
pub(crate) fn reserve<T>(arena: &mut Vec<Option<T>>, count: u64) {
    let count = count.min(u64::from(MAX_ID)) as usize;
    if count > arena.len() {
        arena.reserve(count - arena.len());
    }
}
