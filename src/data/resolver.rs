//! Second pass: id resolution, back references, validation, index sorting
//!
//! Consumes the raw records collected by the parser and produces the fully
//! linked [`DebugStore`]. Every integer cross reference becomes a typed id
//! that is checked against the target arena; dangling references are
//! reported and nulled, which makes the surrounding load fail once the pass
//! completes. Back references and the sorted secondary indices are built
//! here as well.

use crate::core::types::{FileId, LibraryId, LineId, ModuleId, ScopeId, SegmentId, SpanId, SymbolId};
use crate::core::Reporter;
use crate::data::store::{
    DebugStore, File, Library, Line, Module, Scope, Segment, Span, Symbol,
};
use crate::parser::{RawStore, NO_ID};
use tracing::debug;

/// Resolve the raw records into a linked store. Errors are counted on the
/// reporter; the caller fails the load if any were reported.
pub(crate) fn resolve(raw: RawStore, reporter: &mut Reporter<'_>) -> DebugStore {
    let mut store = DebugStore::default();

    materialize(raw, &mut store, reporter);
    link_files(&mut store, reporter);
    link_lines(&mut store, reporter);
    link_modules(&mut store, reporter);
    link_scopes(&mut store, reporter);
    link_symbols(&mut store, reporter);
    sort_indices(&mut store);

    debug!(
        files = store.files.iter().flatten().count(),
        modules = store.modules.iter().flatten().count(),
        scopes = store.scopes.iter().flatten().count(),
        segments = store.segments.iter().flatten().count(),
        spans = store.spans.iter().flatten().count(),
        lines = store.lines.iter().flatten().count(),
        symbols = store.symbols.iter().flatten().count(),
        errors = reporter.errors(),
        "resolved debug info store"
    );
    store
}

fn opt<T>(id: u32, wrap: fn(u32) -> T) -> Option<T> {
    if id == NO_ID {
        None
    } else {
        Some(wrap(id))
    }
}

/// Move the raw records into resolved entities. Reference fields become
/// typed ids here but are not checked yet; required references keep the
/// raw value (including the invalid sentinel) so the link passes can
/// report them as dangling. Spans are the exception: they only reference
/// segments, so they are validated and relocated to absolute addresses
/// right away.
fn materialize(raw: RawStore, store: &mut DebugStore, reporter: &mut Reporter<'_>) {
    store.libraries = raw
        .libraries
        .into_iter()
        .map(|slot| {
            slot.map(|l| Library {
                id: LibraryId(l.id),
                name: l.name,
            })
        })
        .collect();

    store.segments = raw
        .segments
        .into_iter()
        .map(|slot| {
            slot.map(|s| Segment {
                id: SegmentId(s.id),
                name: s.name,
                start: s.start,
                size: s.size,
                output_name: s.output_name,
                output_offs: s.output_offs,
            })
        })
        .collect();

    // Spans: resolve the segment, relocate to absolute addresses and check
    // the bounds in one go
    let mut spans: Vec<Option<Span>> = Vec::with_capacity(raw.spans.len());
    for slot in raw.spans {
        let Some(s) = slot else {
            spans.push(None);
            continue;
        };
        let mut span = Span {
            id: SpanId(s.id),
            segment: None,
            start: s.start,
            end: s.start.wrapping_add(s.size).wrapping_sub(1),
            scopes: Vec::new(),
            lines: Vec::new(),
        };
        match store.segments.get(s.segment as usize).and_then(Option::as_ref) {
            None => {
                reporter.error(
                    0,
                    0,
                    format!("Invalid segment id {} for span with id {}", s.segment, s.id),
                );
            }
            Some(_) if s.size == 0 => {
                reporter.error(0, 0, format!("Span with id {} has zero size", s.id));
            }
            Some(seg) => {
                let abs_start = u64::from(s.start) + u64::from(seg.start);
                let abs_end = abs_start + u64::from(s.size) - 1;
                // End of the segment's nominal range, exclusive
                let seg_end = u64::from(seg.start) + u64::from(seg.size);
                if abs_end >= seg_end || abs_end > u64::from(u32::MAX) {
                    reporter.error(
                        0,
                        0,
                        format!(
                            "Span with id {} lies outside segment \"{}\"",
                            s.id, seg.name
                        ),
                    );
                } else {
                    span.segment = Some(SegmentId(s.segment));
                    span.start = abs_start as u32;
                    span.end = abs_end as u32;
                }
            }
        }
        spans.push(Some(span));
    }
    store.spans = spans;

    store.files = raw
        .files
        .into_iter()
        .map(|slot| {
            slot.map(|f| File {
                id: FileId(f.id),
                name: f.name,
                size: f.size,
                mtime: f.mtime,
                modules_by_name: f.modules.into_iter().map(ModuleId).collect(),
                lines_by_line: Vec::new(),
            })
        })
        .collect();

    store.modules = raw
        .modules
        .into_iter()
        .map(|slot| {
            slot.map(|m| Module {
                id: ModuleId(m.id),
                name: m.name,
                file: Some(FileId(m.file)),
                library: opt(m.library, LibraryId),
                main_scope: None,
                files_by_name: Vec::new(),
                scopes_by_name: Vec::new(),
            })
        })
        .collect();

    store.scopes = raw
        .scopes
        .into_iter()
        .map(|slot| {
            slot.map(|s| Scope {
                id: ScopeId(s.id),
                name: s.name,
                scope_type: s.scope_type,
                size: s.size,
                module: Some(ModuleId(s.module)),
                parent: opt(s.parent, ScopeId),
                label: opt(s.label, SymbolId),
                spans: s.spans.into_iter().map(SpanId).collect(),
            })
        })
        .collect();

    store.lines = raw
        .lines
        .into_iter()
        .map(|slot| {
            slot.map(|l| Line {
                id: LineId(l.id),
                file: Some(FileId(l.file)),
                line: l.line,
                line_type: l.line_type,
                count: l.count,
                spans: l.spans.into_iter().map(SpanId).collect(),
            })
        })
        .collect();

    store.symbols = raw
        .symbols
        .into_iter()
        .map(|slot| {
            slot.map(|s| Symbol {
                id: SymbolId(s.id),
                name: s.name,
                symbol_type: s.symbol_type,
                value: s.value,
                size: s.size,
                segment: opt(s.segment, SegmentId),
                scope: opt(s.scope, ScopeId),
                parent: opt(s.parent, SymbolId),
            })
        })
        .collect();
}

/// Resolve the module lists of all files and insert the file back
/// references into the modules
fn link_files(store: &mut DebugStore, reporter: &mut Reporter<'_>) {
    for i in 0..store.files.len() {
        let Some(mod_ids) = store.files[i]
            .as_mut()
            .map(|f| std::mem::take(&mut f.modules_by_name))
        else {
            continue;
        };
        let fid = FileId(i as u32);
        let mut kept = Vec::with_capacity(mod_ids.len());
        for mid in mod_ids {
            if store.module(mid).is_some() {
                kept.push(mid);
                if let Some(m) = store.modules[mid.0 as usize].as_mut() {
                    m.files_by_name.push(fid);
                }
            } else {
                reporter.error(
                    0,
                    0,
                    format!("Invalid module id {} for file with id {}", mid.0, i),
                );
            }
        }
        if let Some(f) = store.files[i].as_mut() {
            f.modules_by_name = kept;
        }
    }
}

/// Resolve file and span references of all line records and build the
/// back references on files and spans
fn link_lines(store: &mut DebugStore, reporter: &mut Reporter<'_>) {
    for i in 0..store.lines.len() {
        let Some((file, span_ids)) = store.lines[i]
            .as_mut()
            .map(|l| (l.file, std::mem::take(&mut l.spans)))
        else {
            continue;
        };
        let lid = LineId(i as u32);

        match file.filter(|&f| store.file(f).is_some()) {
            Some(fid) => {
                if let Some(f) = store.files[fid.0 as usize].as_mut() {
                    f.lines_by_line.push(lid);
                }
            }
            None => {
                reporter.error(
                    0,
                    0,
                    format!(
                        "Invalid file id {} for line with id {}",
                        file.map(|f| f.0).unwrap_or(NO_ID),
                        i
                    ),
                );
                if let Some(l) = store.lines[i].as_mut() {
                    l.file = None;
                }
            }
        }

        let mut kept = Vec::with_capacity(span_ids.len());
        for sid in span_ids {
            if store.span(sid).is_some() {
                kept.push(sid);
                if let Some(sp) = store.spans[sid.0 as usize].as_mut() {
                    sp.lines.push(lid);
                }
            } else {
                reporter.error(
                    0,
                    0,
                    format!("Invalid span id {} for line with id {}", sid.0, i),
                );
            }
        }
        if let Some(l) = store.lines[i].as_mut() {
            l.spans = kept;
        }
    }
}

/// Resolve the file and library references of all modules
fn link_modules(store: &mut DebugStore, reporter: &mut Reporter<'_>) {
    for i in 0..store.modules.len() {
        let Some((file, library)) = store.modules[i].as_ref().map(|m| (m.file, m.library)) else {
            continue;
        };

        if file.filter(|&f| store.file(f).is_some()).is_none() {
            reporter.error(
                0,
                0,
                format!(
                    "Invalid file id {} for module with id {}",
                    file.map(|f| f.0).unwrap_or(NO_ID),
                    i
                ),
            );
            if let Some(m) = store.modules[i].as_mut() {
                m.file = None;
            }
        }

        if let Some(lib) = library {
            if store.library(lib).is_none() {
                reporter.error(
                    0,
                    0,
                    format!("Invalid library id {} for module with id {}", lib.0, i),
                );
                if let Some(m) = store.modules[i].as_mut() {
                    m.library = None;
                }
            }
        }
    }
}

/// Resolve all scope references, register scopes with their modules,
/// determine the main scope of every module and build the span back
/// references
fn link_scopes(store: &mut DebugStore, reporter: &mut Reporter<'_>) {
    for i in 0..store.scopes.len() {
        let Some((module, parent, label, span_ids)) = store.scopes[i]
            .as_mut()
            .map(|s| (s.module, s.parent, s.label, std::mem::take(&mut s.spans)))
        else {
            continue;
        };
        let sid = ScopeId(i as u32);

        match module.filter(|&m| store.module(m).is_some()) {
            Some(mid) => {
                if let Some(m) = store.modules[mid.0 as usize].as_mut() {
                    m.scopes_by_name.push(sid);
                    // No parent means this is the module's main scope
                    if parent.is_none() {
                        m.main_scope = Some(sid);
                    }
                }
            }
            None => {
                reporter.error(
                    0,
                    0,
                    format!(
                        "Invalid module id {} for scope with id {}",
                        module.map(|m| m.0).unwrap_or(NO_ID),
                        i
                    ),
                );
                if let Some(s) = store.scopes[i].as_mut() {
                    s.module = None;
                }
            }
        }

        if let Some(pid) = parent {
            if store.scope(pid).is_none() {
                reporter.error(
                    0,
                    0,
                    format!("Invalid parent scope id {} for scope with id {}", pid.0, i),
                );
                if let Some(s) = store.scopes[i].as_mut() {
                    s.parent = None;
                }
            }
        }

        if let Some(lid) = label {
            if store.symbol(lid).is_none() {
                reporter.error(
                    0,
                    0,
                    format!("Invalid label id {} for scope with id {}", lid.0, i),
                );
                if let Some(s) = store.scopes[i].as_mut() {
                    s.label = None;
                }
            }
        }

        let mut kept = Vec::with_capacity(span_ids.len());
        for span_id in span_ids {
            if store.span(span_id).is_some() {
                kept.push(span_id);
                if let Some(sp) = store.spans[span_id.0 as usize].as_mut() {
                    sp.scopes.push(sid);
                }
            } else {
                reporter.error(
                    0,
                    0,
                    format!("Invalid span id {} for scope with id {}", span_id.0, i),
                );
            }
        }
        if let Some(s) = store.scopes[i].as_mut() {
            s.spans = kept;
        }
    }

    // Every module must have ended up with a main scope
    for slot in store.modules.iter().flatten() {
        if slot.main_scope.is_none() {
            reporter.error(
                0,
                0,
                format!("Module with id {} has no main scope", slot.id.0),
            );
        }
    }
}

/// Resolve symbol references, then inherit missing scopes along the parent
/// chain in a second pass
fn link_symbols(store: &mut DebugStore, reporter: &mut Reporter<'_>) {
    for i in 0..store.symbols.len() {
        let Some((segment, scope, parent)) = store.symbols[i]
            .as_ref()
            .map(|s| (s.segment, s.scope, s.parent))
        else {
            continue;
        };

        if let Some(seg) = segment {
            if store.segment(seg).is_none() {
                reporter.error(
                    0,
                    0,
                    format!("Invalid segment id {} for symbol with id {}", seg.0, i),
                );
                if let Some(s) = store.symbols[i].as_mut() {
                    s.segment = None;
                }
            }
        }

        if let Some(sc) = scope {
            if store.scope(sc).is_none() {
                reporter.error(
                    0,
                    0,
                    format!("Invalid scope id {} for symbol with id {}", sc.0, i),
                );
                if let Some(s) = store.symbols[i].as_mut() {
                    s.scope = None;
                }
            }
        }

        if let Some(p) = parent {
            if store.symbol(p).is_none() {
                reporter.error(
                    0,
                    0,
                    format!("Invalid parent id {} for symbol with id {}", p.0, i),
                );
                if let Some(s) = store.symbols[i].as_mut() {
                    s.parent = None;
                }
            }
        }
    }

    // Second run: symbols without a scope of their own inherit it from the
    // parent chain
    for i in 0..store.symbols.len() {
        let Some((scope, parent)) = store.symbols[i].as_ref().map(|s| (s.scope, s.parent)) else {
            continue;
        };
        if scope.is_some() {
            continue;
        }

        if parent.is_none() {
            reporter.error(
                0,
                0,
                format!("Symbol with id {} has no parent and no scope", i),
            );
            continue;
        }

        let mut inherited = None;
        let mut cur = parent;
        let mut steps = 0usize;
        while let Some(pid) = cur {
            // A parent cycle would otherwise loop forever
            if steps > store.symbols.len() {
                break;
            }
            steps += 1;
            match store.symbol(pid) {
                Some(p) => {
                    if p.scope.is_some() {
                        inherited = p.scope;
                        break;
                    }
                    cur = p.parent;
                }
                None => break,
            }
        }

        match inherited {
            Some(_) => {
                if let Some(s) = store.symbols[i].as_mut() {
                    s.scope = inherited;
                }
            }
            None => {
                reporter.error(
                    0,
                    0,
                    format!(
                        "Symbol with id {} has parent {} without a scope",
                        i,
                        parent.map(|p| p.0).unwrap_or(NO_ID)
                    ),
                );
            }
        }
    }
}

/// Build and sort every secondary index. Tie break rules keep the
/// orderings deterministic when keys collide.
fn sort_indices(store: &mut DebugStore) {
    let file_key = |store: &DebugStore, id: FileId| -> (String, u64, u64) {
        store
            .file(id)
            .map(|f| (f.name.clone(), f.mtime, f.size))
            .unwrap_or_default()
    };

    let mut files: Vec<FileId> = store.files.iter().flatten().map(|f| f.id).collect();
    files.sort_by_key(|&id| file_key(store, id));
    store.files_by_name = files;

    let mut modules: Vec<ModuleId> = store.modules.iter().flatten().map(|m| m.id).collect();
    modules.sort_by_key(|&id| {
        store
            .module(id)
            .map(|m| m.name.clone())
            .unwrap_or_default()
    });
    store.modules_by_name = modules;

    let mut segments: Vec<SegmentId> = store.segments.iter().flatten().map(|s| s.id).collect();
    segments.sort_by_key(|&id| {
        store
            .segment(id)
            .map(|s| s.name.clone())
            .unwrap_or_default()
    });
    store.segments_by_name = segments;

    let mut by_name: Vec<SymbolId> = store.symbols.iter().flatten().map(|s| s.id).collect();
    by_name.sort_by_key(|&id| {
        (
            store
                .symbol(id)
                .map(|s| s.name.clone())
                .unwrap_or_default(),
            id,
        )
    });
    store.symbols_by_name = by_name;

    let mut by_value: Vec<SymbolId> = store.symbols.iter().flatten().map(|s| s.id).collect();
    by_value.sort_by_key(|&id| {
        store
            .symbol(id)
            .map(|s| (s.value, s.name.clone()))
            .unwrap_or_default()
    });
    store.symbols_by_value = by_value;

    // Per-file indices
    for i in 0..store.files.len() {
        let Some(mut mods) = store.files[i]
            .as_mut()
            .map(|f| std::mem::take(&mut f.modules_by_name))
        else {
            continue;
        };
        mods.sort_by_key(|&id| {
            store
                .module(id)
                .map(|m| m.name.clone())
                .unwrap_or_default()
        });
        let mut lines = store.files[i]
            .as_mut()
            .map(|f| std::mem::take(&mut f.lines_by_line))
            .unwrap_or_default();
        lines.sort_by_key(|&id| store.line(id).map(|l| l.line).unwrap_or_default());
        if let Some(f) = store.files[i].as_mut() {
            f.modules_by_name = mods;
            f.lines_by_line = lines;
        }
    }

    // Per-module indices
    for i in 0..store.modules.len() {
        let Some(mut files) = store.modules[i]
            .as_mut()
            .map(|m| std::mem::take(&mut m.files_by_name))
        else {
            continue;
        };
        files.sort_by_key(|&id| file_key(store, id));
        let mut scopes = store.modules[i]
            .as_mut()
            .map(|m| std::mem::take(&mut m.scopes_by_name))
            .unwrap_or_default();
        scopes.sort_by_key(|&id| store.scope(id).map(|s| s.name.clone()).unwrap_or_default());
        if let Some(m) = store.modules[i].as_mut() {
            m.files_by_name = files;
            m.scopes_by_name = scopes;
        }
    }
}
