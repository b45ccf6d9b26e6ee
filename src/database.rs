//! Main debug info database - unified entry point for all queries
//!
//! [`DebugDatabase::load`] reads a debug info file produced by the
//! assembler/linker, resolves all cross references and builds the lookup
//! indices. The loaded database is immutable; every query works on `&self`
//! and returns flat data copies with ids in place of references, so results
//! stay valid independently of the database they came from.

use crate::core::types::{
    FileId, LibraryData, LibraryId, LineData, LineId, ModuleData, ModuleId, ScopeData, ScopeId,
    SegmentData, SegmentId, SourceData, SpanData, SpanId, SymbolData, SymbolId, SymbolType,
};
use crate::core::{DbgError, Diagnostic, Reporter, Result};
use crate::data::store::{File, Library, Line, Module, Scope, Segment, Span, Symbol};
use crate::data::{resolve, DebugStore, SpanAddrIndex};
use crate::parser::{DirectiveParser, Scanner};
use std::io::BufReader;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Entity counts of a loaded database
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DbgStats {
    pub sources: usize,
    pub libraries: usize,
    pub modules: usize,
    pub scopes: usize,
    pub segments: usize,
    pub spans: usize,
    pub lines: usize,
    pub symbols: usize,
    /// Distinct byte addresses covered by at least one span
    pub covered_addresses: usize,
}

/// A loaded, immutable debug info database
#[derive(Debug)]
pub struct DebugDatabase {
    store: DebugStore,
    span_index: SpanAddrIndex,
    version: (u32, u32),
    stats: DbgStats,
}

impl DebugDatabase {
    /// Read a debug info file. Diagnostics stream through `sink` in input
    /// order while the file is parsed; warnings are informational, any
    /// error makes the whole load fail and no partial database is returned.
    pub fn load<P, F>(path: P, mut sink: F) -> Result<Self>
    where
        P: AsRef<Path>,
        F: FnMut(&Diagnostic),
    {
        let path = path.as_ref();
        let name = path.display().to_string();
        let mut reporter = Reporter::new(&name, &mut sink);

        let file = match std::fs::File::open(path) {
            Ok(file) => file,
            Err(err) => {
                reporter.error(0, 0, format!("Cannot open input file \"{name}\": {err}"));
                return Err(DbgError::Io(err).into());
            }
        };

        debug!("loading debug info from {name}");
        let scanner = Scanner::new(BufReader::new(file));
        let parser = DirectiveParser::new(scanner, &mut reporter);
        let (raw, version) = parser.parse()?;

        // A file with parse errors is rejected as a whole
        if reporter.errors() > 0 {
            return Err(Self::invalid(path, &reporter).into());
        }

        let store = resolve(raw, &mut reporter);
        if reporter.errors() > 0 {
            return Err(Self::invalid(path, &reporter).into());
        }

        let span_index = SpanAddrIndex::build(&store);
        let stats = DbgStats {
            sources: store.files.iter().flatten().count(),
            libraries: store.libraries.iter().flatten().count(),
            modules: store.modules.iter().flatten().count(),
            scopes: store.scopes.iter().flatten().count(),
            segments: store.segments.iter().flatten().count(),
            spans: store.spans.iter().flatten().count(),
            lines: store.lines.iter().flatten().count(),
            symbols: store.symbols.iter().flatten().count(),
            covered_addresses: span_index.len(),
        };
        debug!(
            "loaded {} - {} modules, {} sources, {} segments, {} spans, {} lines, {} symbols",
            name, stats.modules, stats.sources, stats.segments, stats.spans, stats.lines,
            stats.symbols
        );

        Ok(Self {
            store,
            span_index,
            version,
            stats,
        })
    }

    fn invalid(path: &Path, reporter: &Reporter<'_>) -> DbgError {
        DbgError::InvalidDebugFile {
            path: PathBuf::from(path),
            errors: reporter.errors(),
        }
    }

    /// Format version of the loaded file
    pub fn version(&self) -> (u32, u32) {
        self.version
    }

    /// Entity counts of this database
    pub fn stats(&self) -> DbgStats {
        self.stats
    }

    /// All libraries, in id order
    pub fn libraries(&self) -> Vec<LibraryData> {
        self.store
            .libraries
            .iter()
            .flatten()
            .map(Self::library_data)
            .collect()
    }

    /// Library with the given id
    pub fn library_by_id(&self, id: LibraryId) -> Option<LibraryData> {
        self.store.library(id).map(Self::library_data)
    }

    /// All modules, in id order
    pub fn modules(&self) -> Vec<ModuleData> {
        self.store
            .modules
            .iter()
            .flatten()
            .filter_map(Self::module_data)
            .collect()
    }

    /// Module with the given id
    pub fn module_by_id(&self, id: ModuleId) -> Option<ModuleData> {
        Self::module_data(self.store.module(id)?)
    }

    /// All modules with the given name
    pub fn modules_by_name(&self, name: &str) -> Vec<ModuleData> {
        let idx = &self.store.modules_by_name;
        let lo = idx.partition_point(|&id| {
            self.store
                .module(id)
                .map(|m| m.name.as_str() < name)
                .unwrap_or(false)
        });
        let mut out = Vec::new();
        for &id in &idx[lo..] {
            let Some(module) = self.store.module(id) else { break };
            if module.name != name {
                break;
            }
            if let Some(data) = Self::module_data(module) {
                out.push(data);
            }
        }
        out
    }

    /// Modules the given source file is used in, sorted by module name.
    /// `None` if the file id is unknown.
    pub fn modules_by_source(&self, id: FileId) -> Option<Vec<ModuleData>> {
        let file = self.store.file(id)?;
        Some(
            file.modules_by_name
                .iter()
                .filter_map(|&mid| self.store.module(mid))
                .filter_map(Self::module_data)
                .collect(),
        )
    }

    /// All source files, in id order
    pub fn sources(&self) -> Vec<SourceData> {
        self.store
            .files
            .iter()
            .flatten()
            .map(Self::source_data)
            .collect()
    }

    /// Source file with the given id
    pub fn source_by_id(&self, id: FileId) -> Option<SourceData> {
        self.store.file(id).map(Self::source_data)
    }

    /// All source files with the given name. Several files may share a
    /// name; identical files group together in the result.
    pub fn sources_by_name(&self, name: &str) -> Vec<SourceData> {
        let idx = &self.store.files_by_name;
        let lo = idx.partition_point(|&id| {
            self.store
                .file(id)
                .map(|f| f.name.as_str() < name)
                .unwrap_or(false)
        });
        let mut out = Vec::new();
        for &id in &idx[lo..] {
            let Some(file) = self.store.file(id) else { break };
            if file.name != name {
                break;
            }
            out.push(Self::source_data(file));
        }
        out
    }

    /// Source files used to build the given module, sorted by name.
    /// `None` if the module id is unknown.
    pub fn sources_by_module(&self, id: ModuleId) -> Option<Vec<SourceData>> {
        let module = self.store.module(id)?;
        Some(
            module
                .files_by_name
                .iter()
                .filter_map(|&fid| self.store.file(fid))
                .map(Self::source_data)
                .collect(),
        )
    }

    /// All segments, sorted by name
    pub fn segments(&self) -> Vec<SegmentData> {
        self.store
            .segments_by_name
            .iter()
            .filter_map(|&id| self.store.segment(id))
            .map(Self::segment_data)
            .collect()
    }

    /// Segment with the given id
    pub fn segment_by_id(&self, id: SegmentId) -> Option<SegmentData> {
        self.store.segment(id).map(Self::segment_data)
    }

    /// All spans, in id order
    pub fn spans(&self) -> Vec<SpanData> {
        self.store
            .spans
            .iter()
            .flatten()
            .filter_map(Self::span_data)
            .collect()
    }

    /// Span with the given id
    pub fn span_by_id(&self, id: SpanId) -> Option<SpanData> {
        Self::span_data(self.store.span(id)?)
    }

    /// All spans covering the given address, shorter spans first within a
    /// shared start address
    pub fn spans_by_address(&self, addr: u32) -> Vec<SpanData> {
        self.span_index
            .lookup(addr)
            .iter()
            .filter_map(|&id| self.store.span(id))
            .filter_map(Self::span_data)
            .collect()
    }

    /// Scopes whose code lives in the given span, in the order the scopes
    /// were resolved. `None` if the span id is unknown.
    pub fn scopes_by_span(&self, id: SpanId) -> Option<Vec<ScopeData>> {
        let span = self.store.span(id)?;
        Some(
            span.scopes
                .iter()
                .filter_map(|&sid| self.store.scope(sid))
                .filter_map(Self::scope_data)
                .collect(),
        )
    }

    /// Line records whose code lives in the given span. `None` if the span
    /// id is unknown.
    pub fn lines_by_span(&self, id: SpanId) -> Option<Vec<LineData>> {
        let span = self.store.span(id)?;
        Some(
            span.lines
                .iter()
                .filter_map(|&lid| self.store.line(lid))
                .filter_map(Self::line_data)
                .collect(),
        )
    }

    /// Scope with the given id
    pub fn scope_by_id(&self, id: ScopeId) -> Option<ScopeData> {
        Self::scope_data(self.store.scope(id)?)
    }

    /// Scopes of the given module, sorted by name. `None` if the module id
    /// is unknown.
    pub fn scopes_by_module(&self, id: ModuleId) -> Option<Vec<ScopeData>> {
        let module = self.store.module(id)?;
        Some(
            module
                .scopes_by_name
                .iter()
                .filter_map(|&sid| self.store.scope(sid))
                .filter_map(Self::scope_data)
                .collect(),
        )
    }

    /// Line record with the given id
    pub fn line_by_id(&self, id: LineId) -> Option<LineData> {
        Self::line_data(self.store.line(id)?)
    }

    /// Line record for a source file / line number combination
    pub fn line_by_source_and_line(&self, source: FileId, line: u32) -> Option<LineData> {
        let file = self.store.file(source)?;
        let ids = &file.lines_by_line;
        let i = ids
            .binary_search_by_key(&line, |&id| {
                self.store.line(id).map(|l| l.line).unwrap_or(0)
            })
            .ok()?;
        Self::line_data(self.store.line(ids[i])?)
    }

    /// Symbol with the given id
    pub fn symbol_by_id(&self, id: SymbolId) -> Option<SymbolData> {
        Self::symbol_data(self.store.symbol(id)?)
    }

    /// All symbols with the given name, in id order
    pub fn symbols_by_name(&self, name: &str) -> Vec<SymbolData> {
        let idx = &self.store.symbols_by_name;
        let lo = idx.partition_point(|&id| {
            self.store
                .symbol(id)
                .map(|s| s.name.as_str() < name)
                .unwrap_or(false)
        });
        let mut out = Vec::new();
        for &id in &idx[lo..] {
            let Some(sym) = self.store.symbol(id) else { break };
            if sym.name != name {
                break;
            }
            if let Some(data) = Self::symbol_data(sym) {
                out.push(data);
            }
        }
        out
    }

    /// All label symbols whose value lies in `[start, end]`, in value
    /// order. Non-label symbols are ignored.
    pub fn symbols_in_range(&self, start: u32, end: u32) -> Vec<SymbolData> {
        let idx = &self.store.symbols_by_value;
        let lo = idx.partition_point(|&id| {
            self.store
                .symbol(id)
                .map(|s| s.value < i64::from(start))
                .unwrap_or(false)
        });
        let mut out = Vec::new();
        for &id in &idx[lo..] {
            let Some(sym) = self.store.symbol(id) else { break };
            if sym.value > i64::from(end) {
                break;
            }
            if sym.symbol_type != SymbolType::Label {
                continue;
            }
            if let Some(data) = Self::symbol_data(sym) {
                out.push(data);
            }
        }
        out
    }

    fn source_data(f: &File) -> SourceData {
        SourceData {
            id: f.id,
            name: f.name.clone(),
            size: f.size,
            mtime: f.mtime,
        }
    }

    fn library_data(l: &Library) -> LibraryData {
        LibraryData {
            id: l.id,
            name: l.name.clone(),
        }
    }

    fn module_data(m: &Module) -> Option<ModuleData> {
        Some(ModuleData {
            id: m.id,
            name: m.name.clone(),
            source: m.file?,
            library: m.library,
            main_scope: m.main_scope?,
        })
    }

    fn line_data(l: &Line) -> Option<LineData> {
        Some(LineData {
            id: l.id,
            source: l.file?,
            line: l.line,
            line_type: l.line_type,
            count: l.count,
            spans: l.spans.clone(),
        })
    }

    fn scope_data(s: &Scope) -> Option<ScopeData> {
        Some(ScopeData {
            id: s.id,
            name: s.name.clone(),
            scope_type: s.scope_type,
            size: s.size,
            module: s.module?,
            parent: s.parent,
            label: s.label,
            spans: s.spans.clone(),
        })
    }

    fn segment_data(s: &Segment) -> SegmentData {
        SegmentData {
            id: s.id,
            name: s.name.clone(),
            start: s.start,
            size: s.size,
            output_name: s.output_name.clone(),
            output_offs: s.output_offs,
        }
    }

    fn span_data(s: &Span) -> Option<SpanData> {
        Some(SpanData {
            id: s.id,
            segment: s.segment?,
            start: s.start,
            end: s.end,
        })
    }

    fn symbol_data(s: &Symbol) -> Option<SymbolData> {
        Some(SymbolData {
            id: s.id,
            name: s.name.clone(),
            symbol_type: s.symbol_type,
            value: s.value,
            size: s.size,
            segment: s.segment,
            scope: s.scope?,
            parent: s.parent,
        })
    }
}
