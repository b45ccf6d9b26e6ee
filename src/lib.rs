//! Debug info library for 6502-family toolchains
//!
//! Reads the textual debug info file emitted by the assembler/linker and
//! exposes an immutable, queryable model of the program's symbolic
//! structure: source files, modules, libraries, segments, code spans,
//! lexical scopes, symbols and source line records, with all cross
//! references resolved and reverse address lookup built in.
//!
//! ```no_run
//! use dbginfo65::DebugDatabase;
//!
//! let db = DebugDatabase::load("program.dbg", |diag| {
//!     eprintln!("{}:{}: {}", diag.file, diag.line, diag.message);
//! })?;
//! for span in db.spans_by_address(0x1000) {
//!     println!("span {} [{:#x}, {:#x}]", span.id.0, span.start, span.end);
//! }
//! # Ok::<(), anyhow::Error>(())
//! ```

// Core modules
pub mod core;

// Internal implementation modules
pub(crate) mod data;
pub(crate) mod parser;

// Main entry point
pub mod database;

// Re-export main public API
pub use database::{DbgStats, DebugDatabase};

// Re-export essential core types
pub use crate::core::{
    DbgError, Diagnostic, FileId, LibraryData, LibraryId, LineData, LineId, LineType, ModuleData,
    ModuleId, Result, ScopeData, ScopeId, ScopeType, SegmentData, SegmentId, Severity, SourceData,
    SpanData, SpanId, SymbolData, SymbolId, SymbolType,
};
