//! End-to-end tests for loading debug info files and querying the database

use dbginfo65::{
    DbgError, DebugDatabase, Diagnostic, FileId, LibraryId, LineType, ModuleId, ScopeId,
    ScopeType, SegmentId, Severity, SpanId, SymbolId, SymbolType,
};
use std::io::Write;

/// Write `content` to a temp file and load it, collecting all diagnostics
fn load(content: &str) -> (anyhow::Result<DebugDatabase>, Vec<Diagnostic>) {
    let mut file = tempfile::NamedTempFile::new().expect("create temp file");
    file.write_all(content.as_bytes()).expect("write debug file");
    let mut diags = Vec::new();
    let result = DebugDatabase::load(file.path(), |d| diags.push(d.clone()));
    (result, diags)
}

fn load_ok(content: &str) -> DebugDatabase {
    let (result, diags) = load(content);
    match result {
        Ok(db) => db,
        Err(err) => panic!("load failed: {err}; diagnostics: {diags:#?}"),
    }
}

const MINIMAL: &str = "\
version major=2,minor=0
info file=0,line=0,mod=0,scope=0,seg=0,span=0,sym=0,lib=0
";

#[test]
fn minimal_file_loads_empty_database() {
    let db = load_ok(MINIMAL);
    assert_eq!(db.version(), (2, 0));
    assert!(db.sources().is_empty());
    assert!(db.libraries().is_empty());
    assert!(db.modules().is_empty());
    assert!(db.segments().is_empty());
    assert!(db.spans().is_empty());
    assert_eq!(db.stats(), Default::default());
}

#[test]
fn missing_file_reports_io_error() {
    let mut diags = Vec::new();
    let result = DebugDatabase::load("/nonexistent/prog.dbg", |d| diags.push(d.clone()));
    assert!(result.is_err());
    assert_eq!(diags.len(), 1);
    assert_eq!(diags[0].severity, Severity::Error);
    assert!(diags[0].message.contains("Cannot open input file"));
}

#[test]
fn segment_and_span_address_lookup() {
    let db = load_ok(
        "version major=2,minor=0\n\
         info seg=1,span=1\n\
         seg id=0,name=\"CODE\",start=0x1000,size=0x100,addrsize=abs,type=rw\n\
         span id=0,seg=0,start=0,size=16\n",
    );

    let spans = db.spans_by_address(0x1000);
    assert_eq!(spans.len(), 1);
    assert_eq!(spans[0].id, SpanId(0));
    assert_eq!(spans[0].segment, SegmentId(0));
    assert_eq!(spans[0].start, 0x1000);
    assert_eq!(spans[0].end, 0x100f);

    assert!(db.spans_by_address(0x0fff).is_empty());
    assert_eq!(db.spans_by_address(0x100f).len(), 1);
    assert!(db.spans_by_address(0x1010).is_empty());
}

#[test]
fn overlapping_spans_are_returned_in_start_order() {
    let db = load_ok(
        "version major=2,minor=0\n\
         seg id=0,name=\"CODE\",start=0x2000,size=0x100,addrsize=abs,type=rw\n\
         span id=0,seg=0,start=0,size=16\n\
         span id=1,seg=0,start=8,size=16\n",
    );

    let both = db.spans_by_address(0x2008);
    assert_eq!(
        both.iter().map(|s| s.id).collect::<Vec<_>>(),
        vec![SpanId(0), SpanId(1)]
    );
    assert_eq!(both[0].start, 0x2000);
    assert_eq!(both[0].end, 0x200f);
    assert_eq!(both[1].start, 0x2008);
    assert_eq!(both[1].end, 0x2017);

    let second_only = db.spans_by_address(0x2010);
    assert_eq!(
        second_only.iter().map(|s| s.id).collect::<Vec<_>>(),
        vec![SpanId(1)]
    );
}

/// A small but complete program image used by several tests below
const PROGRAM: &str = "\
version major=2,minor=0
info file=2,lib=1,line=3,mod=2,scope=3,seg=2,span=3,sym=3
file id=0,name=\"main.s\",size=220,mtime=0x62e61ec4,mod=0
file id=1,name=\"vec.s\",size=80,mtime=0x62e61ec4,mod=0+1
lib id=0,name=\"rt.lib\"
mod id=0,name=\"main\",file=0
mod id=1,name=\"vec\",file=1,lib=0
seg id=0,name=\"CODE\",start=0x0800,size=0x200,addrsize=abs,type=ro,oname=\"prog.bin\",ooffs=0
seg id=1,name=\"BSS\",start=0x2000,size=0x100,addrsize=abs,type=rw
span id=0,seg=0,start=0,size=32
span id=1,seg=0,start=32,size=16
span id=2,seg=1,start=0,size=8
scope id=0,name=\"\",mod=0,type=file,size=48,span=0+1
scope id=1,name=\"outer\",mod=0,type=scope,parent=0,sym=0,span=1
scope id=2,name=\"\",mod=1,type=file
line id=0,file=0,line=12,span=0
line id=1,file=0,line=20,span=1,count=1,type=1
line id=2,file=1,line=4,span=2
sym id=0,name=\"entry\",addrsize=abs,type=lab,val=0x0800,seg=0,scope=0,size=32
sym id=1,name=\"foo\",addrsize=abs,type=lab,val=0x0820,seg=0,scope=1
sym id=2,name=\"foo\",addrsize=zp,type=equ,val=0x20,parent=1
";

#[test]
fn listings_and_by_id_agree() {
    let db = load_ok(PROGRAM);

    let stats = db.stats();
    assert_eq!(stats.sources, 2);
    assert_eq!(stats.libraries, 1);
    assert_eq!(stats.modules, 2);
    assert_eq!(stats.scopes, 3);
    assert_eq!(stats.segments, 2);
    assert_eq!(stats.spans, 3);
    assert_eq!(stats.lines, 3);
    assert_eq!(stats.symbols, 3);
    assert_eq!(stats.covered_addresses, 32 + 16 + 8);

    for source in db.sources() {
        assert_eq!(db.source_by_id(source.id), Some(source));
    }
    for library in db.libraries() {
        assert_eq!(db.library_by_id(library.id), Some(library));
    }
    for module in db.modules() {
        assert_eq!(db.module_by_id(module.id), Some(module));
    }
    for segment in db.segments() {
        assert_eq!(db.segment_by_id(segment.id), Some(segment));
    }
    for span in db.spans() {
        assert_eq!(db.span_by_id(span.id), Some(span));
    }

    assert_eq!(db.source_by_id(FileId(7)), None);
    assert_eq!(db.module_by_id(ModuleId(7)), None);
    assert_eq!(db.scope_by_id(ScopeId(7)), None);
    assert_eq!(db.symbol_by_id(SymbolId(7)), None);
}

#[test]
fn module_relations() {
    let db = load_ok(PROGRAM);

    let main = db.module_by_id(ModuleId(0)).unwrap();
    assert_eq!(main.name, "main");
    assert_eq!(main.source, FileId(0));
    assert_eq!(main.library, None);
    assert_eq!(main.main_scope, ScopeId(0));

    let vec = db.module_by_id(ModuleId(1)).unwrap();
    assert_eq!(vec.library, Some(LibraryId(0)));
    assert_eq!(vec.main_scope, ScopeId(2));

    // vec.s is used by both modules
    let main_sources = db.sources_by_module(ModuleId(0)).unwrap();
    assert_eq!(
        main_sources.iter().map(|s| s.id).collect::<Vec<_>>(),
        vec![FileId(0), FileId(1)]
    );
    let vec_sources = db.sources_by_module(ModuleId(1)).unwrap();
    assert_eq!(
        vec_sources.iter().map(|s| s.id).collect::<Vec<_>>(),
        vec![FileId(1)]
    );
    assert_eq!(db.sources_by_module(ModuleId(9)), None);
}

#[test]
fn lookups_by_name() {
    let db = load_ok(PROGRAM);

    let vecs = db.sources_by_name("vec.s");
    assert_eq!(vecs.len(), 1);
    assert_eq!(vecs[0].id, FileId(1));
    assert!(db.sources_by_name("other.s").is_empty());

    let mods = db.modules_by_name("main");
    assert_eq!(mods.len(), 1);
    assert_eq!(mods[0].id, ModuleId(0));
    assert!(db.modules_by_name("nope").is_empty());

    // vec.s is pulled into both modules, sorted by module name
    let users = db.modules_by_source(FileId(1)).unwrap();
    assert_eq!(
        users.iter().map(|m| m.id).collect::<Vec<_>>(),
        vec![ModuleId(0), ModuleId(1)]
    );
    assert_eq!(db.modules_by_source(FileId(9)), None);
}

#[test]
fn scopes_by_module_sorted_by_name() {
    let db = load_ok(PROGRAM);

    let scopes = db.scopes_by_module(ModuleId(0)).unwrap();
    assert_eq!(scopes.len(), 2);
    // "" sorts before "outer"
    assert_eq!(scopes[0].id, ScopeId(0));
    assert_eq!(scopes[0].scope_type, ScopeType::Module);
    assert_eq!(scopes[0].parent, None);
    assert_eq!(scopes[0].spans, vec![SpanId(0), SpanId(1)]);
    assert_eq!(scopes[1].name, "outer");
    assert_eq!(scopes[1].parent, Some(ScopeId(0)));
    assert_eq!(scopes[1].label, Some(SymbolId(0)));
    assert_eq!(db.scopes_by_module(ModuleId(9)), None);
}

#[test]
fn segments_listed_by_name() {
    let db = load_ok(PROGRAM);

    let segments = db.segments();
    assert_eq!(
        segments.iter().map(|s| s.name.as_str()).collect::<Vec<_>>(),
        vec!["BSS", "CODE"]
    );
    let code = &segments[1];
    assert_eq!(code.start, 0x0800);
    assert_eq!(code.size, 0x200);
    assert_eq!(code.output_name.as_deref(), Some("prog.bin"));
    assert_eq!(code.output_offs, 0);
    let bss = &segments[0];
    assert_eq!(bss.output_name, None);
}

#[test]
fn line_lookup_by_source_and_line() {
    let db = load_ok(PROGRAM);

    let line = db.line_by_source_and_line(FileId(0), 12).unwrap();
    assert_eq!(line.line_type, LineType::Asm);
    assert_eq!(line.count, 0);
    assert_eq!(line.spans, vec![SpanId(0)]);

    let c_line = db.line_by_source_and_line(FileId(0), 20).unwrap();
    assert_eq!(c_line.line_type, LineType::C);
    assert_eq!(c_line.count, 1);

    assert!(db.line_by_source_and_line(FileId(0), 13).is_none());
    assert!(db.line_by_source_and_line(FileId(1), 4).is_some());
    assert!(db.line_by_source_and_line(FileId(9), 4).is_none());
}

#[test]
fn symbols_by_name_in_id_order() {
    let db = load_ok(PROGRAM);

    let foos = db.symbols_by_name("foo");
    assert_eq!(
        foos.iter().map(|s| s.id).collect::<Vec<_>>(),
        vec![SymbolId(1), SymbolId(2)]
    );
    assert_eq!(foos[0].symbol_type, SymbolType::Label);
    assert_eq!(foos[1].symbol_type, SymbolType::Equate);
    assert_eq!(foos[1].parent, Some(SymbolId(1)));
    assert!(db.symbols_by_name("bar").is_empty());
}

#[test]
fn symbols_in_range_returns_labels_only() {
    let db = load_ok(PROGRAM);

    // The equate at 0x20 must not show up
    let in_range = db.symbols_in_range(0x0000, 0x0900);
    assert_eq!(
        in_range.iter().map(|s| s.id).collect::<Vec<_>>(),
        vec![SymbolId(0), SymbolId(1)]
    );
    assert!(db.symbols_in_range(0x0801, 0x081f).is_empty());
    assert_eq!(db.symbols_in_range(0x0820, 0x0820).len(), 1);
}

#[test]
fn span_back_references() {
    let db = load_ok(PROGRAM);

    // span 1 carries code of both scopes and of line 20
    let scopes = db.scopes_by_span(SpanId(1)).unwrap();
    assert_eq!(
        scopes.iter().map(|s| s.id).collect::<Vec<_>>(),
        vec![ScopeId(0), ScopeId(1)]
    );
    let lines = db.lines_by_span(SpanId(1)).unwrap();
    assert_eq!(lines.iter().map(|l| l.id).collect::<Vec<_>>(), vec![dbginfo65::LineId(1)]);

    // span 2 belongs to module 1 only
    assert!(db.scopes_by_span(SpanId(2)).unwrap().is_empty());
    assert_eq!(db.scopes_by_span(SpanId(9)), None);
}

#[test]
fn symbol_scope_is_inherited_from_parent() {
    let db = load_ok(PROGRAM);

    // sym 2 has parent=1 and no scope of its own; sym 1 lives in scope 1
    let sym = db.symbol_by_id(SymbolId(2)).unwrap();
    assert_eq!(sym.scope, ScopeId(1));
}

#[test]
fn scope_inheritance_walks_parent_chain() {
    let db = load_ok(
        "version major=2,minor=0\n\
         file id=0,name=\"a.s\",size=1,mtime=0,mod=0\n\
         mod id=0,name=\"a\",file=0\n\
         scope id=0,name=\"\",mod=0\n\
         sym id=0,name=\"root\",addrsize=abs,type=lab,val=1,scope=0\n\
         sym id=1,name=\"mid\",addrsize=abs,type=lab,val=2,parent=0\n\
         sym id=2,name=\"leaf\",addrsize=abs,type=lab,val=3,parent=1\n",
    );
    assert_eq!(db.symbol_by_id(SymbolId(2)).unwrap().scope, ScopeId(0));
}

#[test]
fn obsolete_version_is_rejected() {
    let (result, diags) = load("version major=1,minor=0\n");
    let err = result.expect_err("load must fail");
    match err.downcast_ref::<DbgError>() {
        Some(DbgError::UnsupportedVersion { major: 1, minor: 0 }) => {}
        other => panic!("unexpected error: {other:?}"),
    }
    assert_eq!(diags.len(), 1);
    assert_eq!(diags[0].severity, Severity::Error);
    assert_eq!(diags[0].line, 1);
}

#[test]
fn newer_minor_version_fails_after_full_parse() {
    let (result, diags) = load("version major=2,minor=9\n");
    assert!(result.is_err());
    assert!(diags
        .iter()
        .any(|d| d.severity == Severity::Error && d.message.contains("slightly newer")));
}

#[test]
fn newer_major_version_is_warning_only() {
    let (result, diags) = load("version major=3,minor=0\n");
    assert!(result.is_ok());
    assert_eq!(diags.len(), 1);
    assert_eq!(diags[0].severity, Severity::Warning);
}

#[test]
fn unknown_directives_and_attributes_do_not_fail_the_load() {
    let content = "version major=2,minor=0\n\
                   hints cache=4096\n\
                   lib id=0,name=\"c.lib\",flavor=\"static\"\n";
    let (result, diags) = load(content);
    let db = result.expect("load must succeed");
    assert_eq!(db.libraries().len(), 1);
    let warnings: Vec<_> = diags
        .iter()
        .filter(|d| d.severity == Severity::Warning)
        .collect();
    assert_eq!(warnings.len(), 2);
    assert!(warnings.iter().all(|d| d.message.contains("Unknown keyword")));
}

#[test]
fn dangling_reference_fails_the_load() {
    let (result, diags) = load(
        "version major=2,minor=0\n\
         seg id=0,name=\"CODE\",start=0,size=16,addrsize=abs,type=rw\n\
         span id=0,seg=5,start=0,size=4\n",
    );
    assert!(result.is_err());
    assert!(diags
        .iter()
        .any(|d| d.severity == Severity::Error && d.message.contains("Invalid segment id")));
}

#[test]
fn module_without_main_scope_fails_the_load() {
    let (result, diags) = load(
        "version major=2,minor=0\n\
         file id=0,name=\"a.s\",size=1,mtime=0,mod=0\n\
         mod id=0,name=\"a\",file=0\n\
         scope id=0,name=\"s\",mod=0,parent=0\n",
    );
    assert!(result.is_err());
    assert!(diags
        .iter()
        .any(|d| d.message.contains("has no main scope")));
}

#[test]
fn span_outside_its_segment_fails_the_load() {
    let (result, diags) = load(
        "version major=2,minor=0\n\
         seg id=0,name=\"CODE\",start=0x100,size=0x10,addrsize=abs,type=rw\n\
         span id=0,seg=0,start=8,size=16\n",
    );
    assert!(result.is_err());
    assert!(diags
        .iter()
        .any(|d| d.message.contains("outside segment")));
}

#[test]
fn duplicate_id_keeps_later_record_with_warning() {
    let content = "version major=2,minor=0\n\
                   lib id=0,name=\"first.lib\"\n\
                   lib id=0,name=\"second.lib\"\n";
    let (result, diags) = load(content);
    let db = result.expect("load must succeed");
    let libs = db.libraries();
    assert_eq!(libs.len(), 1);
    assert_eq!(libs[0].name, "second.lib");
    assert!(diags
        .iter()
        .any(|d| d.severity == Severity::Warning && d.message.contains("Duplicate id")));
}

#[test]
fn loading_twice_yields_identical_results() {
    let a = load_ok(PROGRAM);
    let b = load_ok(PROGRAM);

    assert_eq!(a.version(), b.version());
    assert_eq!(a.stats(), b.stats());
    assert_eq!(a.sources(), b.sources());
    assert_eq!(a.libraries(), b.libraries());
    assert_eq!(a.modules(), b.modules());
    assert_eq!(a.segments(), b.segments());
    assert_eq!(a.spans(), b.spans());
    assert_eq!(a.symbols_by_name("foo"), b.symbols_by_name("foo"));
    assert_eq!(
        a.symbols_in_range(0, 0xffff),
        b.symbols_in_range(0, 0xffff)
    );
    for addr in 0x0800..0x0830u32 {
        assert_eq!(a.spans_by_address(addr), b.spans_by_address(addr));
    }
    assert_eq!(
        a.scopes_by_module(ModuleId(0)),
        b.scopes_by_module(ModuleId(0))
    );
    assert_eq!(
        a.line_by_source_and_line(FileId(0), 12),
        b.line_by_source_and_line(FileId(0), 12)
    );
}

#[test]
fn every_span_covers_exactly_its_addresses() {
    let db = load_ok(PROGRAM);

    for span in db.spans() {
        for addr in span.start..=span.end {
            let covering = db.spans_by_address(addr);
            assert!(
                covering.iter().any(|s| s.id == span.id),
                "span {:?} missing at {addr:#x}",
                span.id
            );
        }
        if span.start > 0 {
            let before = db.spans_by_address(span.start - 1);
            assert!(before.iter().all(|s| s.id != span.id));
        }
        let after = db.spans_by_address(span.end + 1);
        assert!(after.iter().all(|s| s.id != span.id));
    }
}

#[test]
fn diagnostics_carry_positions() {
    let content = "version major=2,minor=0\n\
                   lib id=0,name=\"a.lib\"\n\
                   lib id=zero,name=\"b.lib\"\n";
    let (result, diags) = load(content);
    assert!(result.is_err());
    let err = diags
        .iter()
        .find(|d| d.severity == Severity::Error)
        .expect("an error diagnostic");
    assert_eq!(err.line, 3);
    assert!(err.message.contains("Integer constant expected"));
}
