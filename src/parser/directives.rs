//! Directive-level parser for the debug info format
//!
//! Recursive descent over one directive per line. Every directive is a
//! keyword followed by `attr=value` pairs in free order; each reader
//! tracks the attributes it has seen in a bitmask and checks the required
//! set once the line ends. Errors are recovered at the next end of line so
//! a single bad directive never takes the rest of the file with it; the
//! record of the offending line is dropped and the error counted.

use crate::core::types::{LineType, ScopeType, SymbolType};
use crate::core::{DbgError, Reporter};
use crate::parser::records::{
    self, RawFile, RawLibrary, RawLine, RawModule, RawScope, RawSegment, RawSpan, RawStore,
    RawSymbol, MAX_ID, NO_ID,
};
use crate::parser::scanner::{Keyword, Scanner, Token};
use std::io::Read;
use tracing::debug;

/// Format version this parser understands
pub(crate) const SUPPORTED_MAJOR: u32 = 2;
pub(crate) const SUPPORTED_MINOR: u32 = 0;

pub(crate) struct DirectiveParser<'r, 's, R> {
    scanner: Scanner<R>,
    tok: Token,
    store: RawStore,
    reporter: &'r mut Reporter<'s>,
    major: u32,
    minor: u32,
}

impl<'r, 's, R: Read> DirectiveParser<'r, 's, R> {
    pub(crate) fn new(scanner: Scanner<R>, reporter: &'r mut Reporter<'s>) -> Self {
        Self {
            scanner,
            tok: Token::Eof,
            store: RawStore::default(),
            reporter,
            major: 0,
            minor: 0,
        }
    }

    /// Parse the whole input. Returns the raw records and the file format
    /// version; a format too old to read aborts with an error. Parse errors
    /// are counted on the reporter, the caller decides the overall outcome.
    pub(crate) fn parse(mut self) -> Result<(RawStore, (u32, u32)), DbgError> {
        self.advance();

        // Blank lines may precede the version directive
        while self.tok == Token::Eol {
            self.advance();
        }

        // The first directive must announce the format version
        if self.tok != Token::Kw(Keyword::Version) {
            self.error_here(
                "\"version\" keyword missing in first line - this is not a valid \
                 debug info file"
                    .into(),
            );
            return Ok((self.store, (self.major, self.minor)));
        }
        self.parse_version();

        if self.major < SUPPORTED_MAJOR {
            self.error_here(format!(
                "This is an old version of the debug info format that is no longer \
                 supported. Version found = {}.{}, version supported = {}.{}",
                self.major, self.minor, SUPPORTED_MAJOR, SUPPORTED_MINOR
            ));
            return Err(DbgError::UnsupportedVersion {
                major: self.major,
                minor: self.minor,
            });
        } else if self.major == SUPPORTED_MAJOR && self.minor > SUPPORTED_MINOR {
            self.error_here(format!(
                "This is a slightly newer version of the debug info format. It might \
                 work, but you may get errors about unknown keywords and similar. \
                 Version found = {}.{}, version supported = {}.{}",
                self.major, self.minor, SUPPORTED_MAJOR, SUPPORTED_MINOR
            ));
        } else if self.major > SUPPORTED_MAJOR {
            self.warning_here(format!(
                "The format of this debug info file is newer than what we know. Will \
                 proceed but probably fail. Version found = {}.{}, version supported \
                 = {}.{}",
                self.major, self.minor, SUPPORTED_MAJOR, SUPPORTED_MINOR
            ));
        }
        self.consume_eol();

        while self.tok != Token::Eof {
            match &self.tok {
                Token::Kw(Keyword::File) => self.parse_file(),
                Token::Kw(Keyword::Info) => self.parse_info(),
                Token::Kw(Keyword::Library) => self.parse_library(),
                Token::Kw(Keyword::Line) => self.parse_line(),
                Token::Kw(Keyword::Module) => self.parse_module(),
                Token::Kw(Keyword::Scope) => self.parse_scope(),
                Token::Kw(Keyword::Segment) => self.parse_segment(),
                Token::Kw(Keyword::Span) => self.parse_span(),
                Token::Kw(Keyword::Sym) => self.parse_sym(),
                Token::Ident(name) => {
                    // Possibly a directive added by a later format version
                    let name = name.clone();
                    self.warning_here(format!("Unknown keyword \"{name}\" - skipping"));
                    self.skip_line();
                }
                // Blank line between directives
                Token::Eol => {}
                _ => self.unexpected_token(),
            }
            self.consume_eol();
        }

        debug!(
            errors = self.reporter.errors(),
            warnings = self.reporter.warnings(),
            "finished parsing debug info"
        );
        Ok((self.store, (self.major, self.minor)))
    }

    fn advance(&mut self) {
        self.tok = self.scanner.next_token(self.reporter);
    }

    fn error_here(&mut self, message: String) {
        self.reporter
            .error(self.scanner.token_line(), self.scanner.token_col(), message);
    }

    fn warning_here(&mut self, message: String) {
        self.reporter
            .warning(self.scanner.token_line(), self.scanner.token_col(), message);
    }

    /// Skip tokens until end of line or end of file
    fn skip_line(&mut self) {
        while !matches!(self.tok, Token::Eol | Token::Eof) {
            self.advance();
        }
    }

    fn unexpected_token(&mut self) {
        self.error_here(format!("Unexpected input token {}", self.tok));
        self.skip_line();
    }

    /// Consume the end-of-line terminating a directive
    fn consume_eol(&mut self) {
        if self.tok != Token::Eof {
            if self.tok != Token::Eol {
                self.error_here("Extra tokens in line".into());
                self.skip_line();
            }
            self.advance();
        }
    }

    /// Consume an equal sign
    fn consume_equal(&mut self) -> bool {
        if self.tok == Token::Equal {
            self.advance();
            true
        } else {
            self.error_here("'=' expected".into());
            self.skip_line();
            false
        }
    }

    /// Expect and consume an integer constant
    fn expect_int(&mut self) -> Option<u64> {
        match self.tok {
            Token::Int(v) => {
                self.advance();
                Some(v)
            }
            _ => {
                self.error_here("Integer constant expected".into());
                self.skip_line();
                None
            }
        }
    }

    /// Expect and consume a string constant
    fn expect_str(&mut self) -> Option<String> {
        match &self.tok {
            Token::Str(s) => {
                let s = s.clone();
                self.advance();
                Some(s)
            }
            _ => {
                self.error_here("String literal expected".into());
                self.skip_line();
                None
            }
        }
    }

    /// Expect an id defining a record. The invalid-id sentinel is not a
    /// legal record id, and ids are bounded to keep the dense stores sane.
    fn expect_own_id(&mut self) -> Option<u32> {
        let v = self.expect_int()?;
        if v > u64::from(MAX_ID) {
            self.error_here(format!("Id {v} out of range"));
            self.skip_line();
            return None;
        }
        Some(v as u32)
    }

    /// Expect an id referencing another record; the invalid-id sentinel is
    /// allowed here and resolves to "no reference" later.
    fn expect_ref_id(&mut self) -> Option<u32> {
        let v = self.expect_int()?;
        if v == u64::from(NO_ID) {
            return Some(NO_ID);
        }
        if v > u64::from(MAX_ID) {
            self.error_here(format!("Id {v} out of range"));
            self.skip_line();
            return None;
        }
        Some(v as u32)
    }

    /// Expect a `+`-separated list of reference ids
    fn expect_id_list(&mut self) -> Option<Vec<u32>> {
        let mut ids = Vec::new();
        loop {
            ids.push(self.expect_ref_id()?);
            if self.tok != Token::Plus {
                break;
            }
            self.advance();
        }
        Some(ids)
    }

    /// Skip an unknown attribute that a later format version may have
    /// added. Consumes `=value` if present, and a trailing comma so the
    /// attribute loop can continue with the next pair.
    fn unknown_attribute(&mut self) {
        let name = match &self.tok {
            Token::Kw(kw) => kw.as_str().to_string(),
            Token::Ident(s) => s.clone(),
            _ => String::new(),
        };
        self.warning_here(format!("Unknown keyword \"{name}\" - skipping"));
        self.advance();
        if self.tok == Token::Equal {
            self.advance();
            while !matches!(self.tok, Token::Comma | Token::Eol | Token::Eof) {
                self.advance();
            }
        } else if !matches!(self.tok, Token::Comma | Token::Eol | Token::Eof) {
            self.skip_line();
        }
        if self.tok == Token::Comma {
            self.advance();
        }
    }

    /// Check that the line ended and all required attributes were seen.
    /// Returns false if the record must be dropped.
    fn finish_directive(&mut self, seen: u32, required: u32) -> bool {
        if !matches!(self.tok, Token::Eol | Token::Eof) {
            self.unexpected_token();
            return false;
        }
        if seen & required != required {
            self.error_here("Required attributes missing".into());
            return false;
        }
        true
    }

    /// Parse a `version` directive
    fn parse_version(&mut self) {
        const A_MAJOR: u32 = 0x01;
        const A_MINOR: u32 = 0x02;
        const REQUIRED: u32 = A_MAJOR | A_MINOR;
        let mut seen = 0u32;

        self.advance();
        while !matches!(self.tok, Token::Eol | Token::Eof) {
            match &self.tok {
                Token::Kw(Keyword::Major) => {
                    self.advance();
                    if !self.consume_equal() {
                        return;
                    }
                    let Some(v) = self.expect_int() else { return };
                    self.major = v as u32;
                    seen |= A_MAJOR;
                }
                Token::Kw(Keyword::Minor) => {
                    self.advance();
                    if !self.consume_equal() {
                        return;
                    }
                    let Some(v) = self.expect_int() else { return };
                    self.minor = v as u32;
                    seen |= A_MINOR;
                }
                Token::Ident(_) => {
                    self.unknown_attribute();
                    continue;
                }
                _ => {
                    self.unexpected_token();
                    return;
                }
            }

            match self.tok {
                Token::Comma => self.advance(),
                Token::Eol | Token::Eof => break,
                _ => {
                    self.unexpected_token();
                    return;
                }
            }
        }

        if seen & REQUIRED != REQUIRED {
            self.error_here("Required attributes missing".into());
        }
    }

    /// Parse an `info` directive. The counts are capacity hints only.
    fn parse_info(&mut self) {
        self.advance();
        loop {
            let kw = match &self.tok {
                Token::Kw(
                    kw @ (Keyword::File
                    | Keyword::Library
                    | Keyword::Line
                    | Keyword::Module
                    | Keyword::Scope
                    | Keyword::Segment
                    | Keyword::Span
                    | Keyword::Sym),
                ) => *kw,
                Token::Kw(_) | Token::Ident(_) => {
                    self.unknown_attribute();
                    continue;
                }
                _ => break,
            };
            self.advance();
            if !self.consume_equal() {
                return;
            }
            let Some(count) = self.expect_int() else { return };

            match kw {
                Keyword::File => records::reserve(&mut self.store.files, count),
                Keyword::Library => records::reserve(&mut self.store.libraries, count),
                Keyword::Line => records::reserve(&mut self.store.lines, count),
                Keyword::Module => records::reserve(&mut self.store.modules, count),
                Keyword::Scope => records::reserve(&mut self.store.scopes, count),
                Keyword::Segment => records::reserve(&mut self.store.segments, count),
                Keyword::Span => records::reserve(&mut self.store.spans, count),
                Keyword::Sym => records::reserve(&mut self.store.symbols, count),
                _ => {}
            }

            if self.tok != Token::Comma {
                break;
            }
            self.advance();
        }

        if !matches!(self.tok, Token::Eol | Token::Eof) {
            self.unexpected_token();
        }
    }

    /// Parse a `file` directive
    fn parse_file(&mut self) {
        const A_ID: u32 = 0x01;
        const A_NAME: u32 = 0x02;
        const A_SIZE: u32 = 0x04;
        const A_MTIME: u32 = 0x08;
        const A_MOD: u32 = 0x10;
        const REQUIRED: u32 = A_ID | A_NAME | A_SIZE | A_MTIME | A_MOD;

        let mut seen = 0u32;
        let mut f = RawFile {
            id: 0,
            name: String::new(),
            size: 0,
            mtime: 0,
            modules: Vec::new(),
        };

        self.advance();
        loop {
            let kw = match &self.tok {
                Token::Kw(
                    kw @ (Keyword::Id
                    | Keyword::Module
                    | Keyword::MTime
                    | Keyword::Name
                    | Keyword::Size),
                ) => *kw,
                Token::Kw(_) | Token::Ident(_) => {
                    self.unknown_attribute();
                    continue;
                }
                _ => break,
            };
            self.advance();
            if !self.consume_equal() {
                return;
            }

            match kw {
                Keyword::Id => {
                    let Some(v) = self.expect_own_id() else { return };
                    f.id = v;
                    seen |= A_ID;
                }
                Keyword::Module => {
                    let Some(v) = self.expect_id_list() else { return };
                    f.modules = v;
                    seen |= A_MOD;
                }
                Keyword::MTime => {
                    let Some(v) = self.expect_int() else { return };
                    f.mtime = v;
                    seen |= A_MTIME;
                }
                Keyword::Name => {
                    let Some(v) = self.expect_str() else { return };
                    f.name = v;
                    seen |= A_NAME;
                }
                Keyword::Size => {
                    let Some(v) = self.expect_int() else { return };
                    f.size = v;
                    seen |= A_SIZE;
                }
                _ => {}
            }

            if self.tok != Token::Comma {
                break;
            }
            self.advance();
        }

        if !self.finish_directive(seen, REQUIRED) {
            return;
        }
        let id = f.id;
        if records::put(&mut self.store.files, id, f) {
            self.warning_here(format!("Duplicate id {id} for \"file\" - overwriting"));
        }
    }

    /// Parse a `lib` directive
    fn parse_library(&mut self) {
        const A_ID: u32 = 0x01;
        const A_NAME: u32 = 0x02;
        const REQUIRED: u32 = A_ID | A_NAME;

        let mut seen = 0u32;
        let mut l = RawLibrary {
            id: 0,
            name: String::new(),
        };

        self.advance();
        loop {
            let kw = match &self.tok {
                Token::Kw(kw @ (Keyword::Id | Keyword::Name)) => *kw,
                Token::Kw(_) | Token::Ident(_) => {
                    self.unknown_attribute();
                    continue;
                }
                _ => break,
            };
            self.advance();
            if !self.consume_equal() {
                return;
            }

            match kw {
                Keyword::Id => {
                    let Some(v) = self.expect_own_id() else { return };
                    l.id = v;
                    seen |= A_ID;
                }
                Keyword::Name => {
                    let Some(v) = self.expect_str() else { return };
                    l.name = v;
                    seen |= A_NAME;
                }
                _ => {}
            }

            if self.tok != Token::Comma {
                break;
            }
            self.advance();
        }

        if !self.finish_directive(seen, REQUIRED) {
            return;
        }
        let id = l.id;
        if records::put(&mut self.store.libraries, id, l) {
            self.warning_here(format!("Duplicate id {id} for \"lib\" - overwriting"));
        }
    }

    /// Parse a `line` directive
    fn parse_line(&mut self) {
        const A_COUNT: u32 = 0x01;
        const A_FILE: u32 = 0x02;
        const A_ID: u32 = 0x04;
        const A_LINE: u32 = 0x08;
        const A_SPAN: u32 = 0x10;
        const A_TYPE: u32 = 0x20;
        const REQUIRED: u32 = A_FILE | A_ID | A_LINE;

        let mut seen = 0u32;
        let mut l = RawLine {
            id: 0,
            file: NO_ID,
            line: 0,
            line_type: LineType::Asm,
            count: 0,
            spans: Vec::new(),
        };

        self.advance();
        loop {
            let kw = match &self.tok {
                Token::Kw(
                    kw @ (Keyword::Count
                    | Keyword::File
                    | Keyword::Id
                    | Keyword::Line
                    | Keyword::Span
                    | Keyword::Type),
                ) => *kw,
                Token::Kw(_) | Token::Ident(_) => {
                    self.unknown_attribute();
                    continue;
                }
                _ => break,
            };
            self.advance();
            if !self.consume_equal() {
                return;
            }

            match kw {
                Keyword::Count => {
                    let Some(v) = self.expect_int() else { return };
                    l.count = v as u32;
                    seen |= A_COUNT;
                }
                Keyword::File => {
                    let Some(v) = self.expect_ref_id() else { return };
                    l.file = v;
                    seen |= A_FILE;
                }
                Keyword::Id => {
                    let Some(v) = self.expect_own_id() else { return };
                    l.id = v;
                    seen |= A_ID;
                }
                Keyword::Line => {
                    let Some(v) = self.expect_int() else { return };
                    l.line = v as u32;
                    seen |= A_LINE;
                }
                Keyword::Span => {
                    let Some(v) = self.expect_id_list() else { return };
                    l.spans = v;
                    seen |= A_SPAN;
                }
                Keyword::Type => {
                    let Some(v) = self.expect_int() else { return };
                    l.line_type = LineType::from_tag(v);
                    seen |= A_TYPE;
                }
                _ => {}
            }

            if self.tok != Token::Comma {
                break;
            }
            self.advance();
        }

        if !self.finish_directive(seen, REQUIRED) {
            return;
        }
        let id = l.id;
        if records::put(&mut self.store.lines, id, l) {
            self.warning_here(format!("Duplicate id {id} for \"line\" - overwriting"));
        }
    }

    /// Parse a `mod` directive
    fn parse_module(&mut self) {
        const A_FILE: u32 = 0x01;
        const A_ID: u32 = 0x02;
        const A_NAME: u32 = 0x04;
        const A_LIB: u32 = 0x08;
        const REQUIRED: u32 = A_ID | A_NAME | A_FILE;

        let mut seen = 0u32;
        let mut m = RawModule {
            id: 0,
            name: String::new(),
            file: NO_ID,
            library: NO_ID,
        };

        self.advance();
        loop {
            let kw = match &self.tok {
                Token::Kw(
                    kw @ (Keyword::File | Keyword::Id | Keyword::Name | Keyword::Library),
                ) => *kw,
                Token::Kw(_) | Token::Ident(_) => {
                    self.unknown_attribute();
                    continue;
                }
                _ => break,
            };
            self.advance();
            if !self.consume_equal() {
                return;
            }

            match kw {
                Keyword::File => {
                    let Some(v) = self.expect_ref_id() else { return };
                    m.file = v;
                    seen |= A_FILE;
                }
                Keyword::Id => {
                    let Some(v) = self.expect_own_id() else { return };
                    m.id = v;
                    seen |= A_ID;
                }
                Keyword::Name => {
                    let Some(v) = self.expect_str() else { return };
                    m.name = v;
                    seen |= A_NAME;
                }
                Keyword::Library => {
                    let Some(v) = self.expect_ref_id() else { return };
                    m.library = v;
                    seen |= A_LIB;
                }
                _ => {}
            }

            if self.tok != Token::Comma {
                break;
            }
            self.advance();
        }

        if !self.finish_directive(seen, REQUIRED) {
            return;
        }
        let id = m.id;
        if records::put(&mut self.store.modules, id, m) {
            self.warning_here(format!("Duplicate id {id} for \"mod\" - overwriting"));
        }
    }

    /// Parse a `scope` directive
    fn parse_scope(&mut self) {
        const A_ID: u32 = 0x01;
        const A_MOD: u32 = 0x02;
        const A_NAME: u32 = 0x04;
        const A_PARENT: u32 = 0x08;
        const A_SIZE: u32 = 0x10;
        const A_SPAN: u32 = 0x20;
        const A_SYM: u32 = 0x40;
        const A_TYPE: u32 = 0x80;
        const REQUIRED: u32 = A_ID | A_MOD | A_NAME;

        let mut seen = 0u32;
        let mut s = RawScope {
            id: 0,
            name: String::new(),
            scope_type: ScopeType::Module,
            size: 0,
            module: NO_ID,
            parent: NO_ID,
            label: NO_ID,
            spans: Vec::new(),
        };

        self.advance();
        loop {
            let kw = match &self.tok {
                Token::Kw(
                    kw @ (Keyword::Id
                    | Keyword::Module
                    | Keyword::Name
                    | Keyword::Parent
                    | Keyword::Size
                    | Keyword::Span
                    | Keyword::Sym
                    | Keyword::Type),
                ) => *kw,
                Token::Kw(_) | Token::Ident(_) => {
                    self.unknown_attribute();
                    continue;
                }
                _ => break,
            };
            self.advance();
            if !self.consume_equal() {
                return;
            }

            match kw {
                Keyword::Id => {
                    let Some(v) = self.expect_own_id() else { return };
                    s.id = v;
                    seen |= A_ID;
                }
                Keyword::Module => {
                    let Some(v) = self.expect_ref_id() else { return };
                    s.module = v;
                    seen |= A_MOD;
                }
                Keyword::Name => {
                    let Some(v) = self.expect_str() else { return };
                    s.name = v;
                    seen |= A_NAME;
                }
                Keyword::Parent => {
                    let Some(v) = self.expect_ref_id() else { return };
                    s.parent = v;
                    seen |= A_PARENT;
                }
                Keyword::Size => {
                    let Some(v) = self.expect_int() else { return };
                    s.size = v;
                    seen |= A_SIZE;
                }
                Keyword::Span => {
                    let Some(v) = self.expect_id_list() else { return };
                    s.spans = v;
                    seen |= A_SPAN;
                }
                Keyword::Sym => {
                    let Some(v) = self.expect_ref_id() else { return };
                    s.label = v;
                    seen |= A_SYM;
                }
                Keyword::Type => {
                    s.scope_type = match &self.tok {
                        Token::Kw(Keyword::Global) => ScopeType::Global,
                        Token::Kw(Keyword::File) => ScopeType::Module,
                        Token::Kw(Keyword::Scope) => ScopeType::Scope,
                        Token::Kw(Keyword::Struct) => ScopeType::Struct,
                        Token::Kw(Keyword::Enum) => ScopeType::Enum,
                        _ => {
                            self.error_here("Unknown value for attribute \"type\"".into());
                            self.skip_line();
                            return;
                        }
                    };
                    self.advance();
                    seen |= A_TYPE;
                }
                _ => {}
            }

            if self.tok != Token::Comma {
                break;
            }
            self.advance();
        }

        if !self.finish_directive(seen, REQUIRED) {
            return;
        }
        let id = s.id;
        if records::put(&mut self.store.scopes, id, s) {
            self.warning_here(format!("Duplicate id {id} for \"scope\" - overwriting"));
        }
    }

    /// Parse a `seg` directive
    fn parse_segment(&mut self) {
        const A_ADDRSIZE: u32 = 0x01;
        const A_ID: u32 = 0x02;
        const A_ONAME: u32 = 0x04;
        const A_OOFFS: u32 = 0x08;
        const A_NAME: u32 = 0x10;
        const A_SIZE: u32 = 0x20;
        const A_START: u32 = 0x40;
        const A_TYPE: u32 = 0x80;
        const REQUIRED: u32 = A_ID | A_NAME | A_START | A_SIZE | A_ADDRSIZE | A_TYPE;

        let mut seen = 0u32;
        let mut s = RawSegment {
            id: 0,
            name: String::new(),
            start: 0,
            size: 0,
            output_name: None,
            output_offs: 0,
        };

        self.advance();
        loop {
            let kw = match &self.tok {
                Token::Kw(
                    kw @ (Keyword::AddrSize
                    | Keyword::Id
                    | Keyword::Name
                    | Keyword::OutputName
                    | Keyword::OutputOffs
                    | Keyword::Size
                    | Keyword::Start
                    | Keyword::Type),
                ) => *kw,
                Token::Kw(_) | Token::Ident(_) => {
                    self.unknown_attribute();
                    continue;
                }
                _ => break,
            };
            self.advance();
            if !self.consume_equal() {
                return;
            }

            match kw {
                // The address size and segment type are recorded only for
                // the required-attribute check; their values are not
                // interpreted here
                Keyword::AddrSize | Keyword::Type => {
                    if matches!(self.tok, Token::Eol | Token::Eof) {
                        self.unexpected_token();
                        return;
                    }
                    self.advance();
                    seen |= if kw == Keyword::AddrSize {
                        A_ADDRSIZE
                    } else {
                        A_TYPE
                    };
                }
                Keyword::Id => {
                    let Some(v) = self.expect_own_id() else { return };
                    s.id = v;
                    seen |= A_ID;
                }
                Keyword::Name => {
                    let Some(v) = self.expect_str() else { return };
                    s.name = v;
                    seen |= A_NAME;
                }
                Keyword::OutputName => {
                    let Some(v) = self.expect_str() else { return };
                    s.output_name = Some(v);
                    seen |= A_ONAME;
                }
                Keyword::OutputOffs => {
                    let Some(v) = self.expect_int() else { return };
                    s.output_offs = v;
                    seen |= A_OOFFS;
                }
                Keyword::Size => {
                    let Some(v) = self.expect_int() else { return };
                    s.size = v as u32;
                    seen |= A_SIZE;
                }
                Keyword::Start => {
                    let Some(v) = self.expect_int() else { return };
                    s.start = v as u32;
                    seen |= A_START;
                }
                _ => {}
            }

            if self.tok != Token::Comma {
                break;
            }
            self.advance();
        }

        if !self.finish_directive(seen, REQUIRED) {
            return;
        }

        // The output name and offset come in pairs
        let pair = seen & (A_ONAME | A_OOFFS);
        if pair != 0 && pair != (A_ONAME | A_OOFFS) {
            self.error_here("Attributes \"oname\" and \"ooffs\" must be paired".into());
            return;
        }
        if pair == 0 {
            s.output_offs = 0;
        }

        let id = s.id;
        if records::put(&mut self.store.segments, id, s) {
            self.warning_here(format!("Duplicate id {id} for \"seg\" - overwriting"));
        }
    }

    /// Parse a `span` directive
    fn parse_span(&mut self) {
        const A_ID: u32 = 0x01;
        const A_SEG: u32 = 0x02;
        const A_SIZE: u32 = 0x04;
        const A_START: u32 = 0x08;
        const REQUIRED: u32 = A_ID | A_SEG | A_SIZE | A_START;

        let mut seen = 0u32;
        let mut s = RawSpan {
            id: 0,
            segment: NO_ID,
            start: 0,
            size: 0,
        };

        self.advance();
        loop {
            let kw = match &self.tok {
                Token::Kw(
                    kw @ (Keyword::Id | Keyword::Segment | Keyword::Size | Keyword::Start),
                ) => *kw,
                Token::Kw(_) | Token::Ident(_) => {
                    self.unknown_attribute();
                    continue;
                }
                _ => break,
            };
            self.advance();
            if !self.consume_equal() {
                return;
            }

            match kw {
                Keyword::Id => {
                    let Some(v) = self.expect_own_id() else { return };
                    s.id = v;
                    seen |= A_ID;
                }
                Keyword::Segment => {
                    let Some(v) = self.expect_ref_id() else { return };
                    s.segment = v;
                    seen |= A_SEG;
                }
                Keyword::Size => {
                    let Some(v) = self.expect_int() else { return };
                    s.size = v as u32;
                    seen |= A_SIZE;
                }
                Keyword::Start => {
                    let Some(v) = self.expect_int() else { return };
                    s.start = v as u32;
                    seen |= A_START;
                }
                _ => {}
            }

            if self.tok != Token::Comma {
                break;
            }
            self.advance();
        }

        if !self.finish_directive(seen, REQUIRED) {
            return;
        }
        let id = s.id;
        if records::put(&mut self.store.spans, id, s) {
            self.warning_here(format!("Duplicate id {id} for \"span\" - overwriting"));
        }
    }

    /// Parse a `sym` directive
    fn parse_sym(&mut self) {
        const A_ADDRSIZE: u32 = 0x001;
        const A_FILE: u32 = 0x002;
        const A_ID: u32 = 0x004;
        const A_PARENT: u32 = 0x008;
        const A_SCOPE: u32 = 0x010;
        const A_SEG: u32 = 0x020;
        const A_SIZE: u32 = 0x040;
        const A_NAME: u32 = 0x080;
        const A_TYPE: u32 = 0x100;
        const A_VALUE: u32 = 0x200;
        const REQUIRED: u32 = A_ADDRSIZE | A_ID | A_NAME | A_TYPE | A_VALUE;

        let mut seen = 0u32;
        let mut s = RawSymbol {
            id: 0,
            name: String::new(),
            symbol_type: SymbolType::Equate,
            value: 0,
            size: 0,
            segment: NO_ID,
            scope: NO_ID,
            parent: NO_ID,
        };

        self.advance();
        loop {
            let kw = match &self.tok {
                Token::Kw(
                    kw @ (Keyword::AddrSize
                    | Keyword::File
                    | Keyword::Id
                    | Keyword::Name
                    | Keyword::Parent
                    | Keyword::Scope
                    | Keyword::Segment
                    | Keyword::Size
                    | Keyword::Type
                    | Keyword::Value),
                ) => *kw,
                Token::Kw(_) | Token::Ident(_) => {
                    self.unknown_attribute();
                    continue;
                }
                _ => break,
            };
            self.advance();
            if !self.consume_equal() {
                return;
            }

            match kw {
                Keyword::AddrSize => {
                    if matches!(self.tok, Token::Eol | Token::Eof) {
                        self.unexpected_token();
                        return;
                    }
                    self.advance();
                    seen |= A_ADDRSIZE;
                }
                // The defining file is accepted for compatibility but not
                // part of the symbol model
                Keyword::File => {
                    let Some(_) = self.expect_ref_id() else { return };
                    seen |= A_FILE;
                }
                Keyword::Id => {
                    let Some(v) = self.expect_own_id() else { return };
                    s.id = v;
                    seen |= A_ID;
                }
                Keyword::Name => {
                    let Some(v) = self.expect_str() else { return };
                    s.name = v;
                    seen |= A_NAME;
                }
                Keyword::Parent => {
                    let Some(v) = self.expect_ref_id() else { return };
                    s.parent = v;
                    seen |= A_PARENT;
                }
                Keyword::Scope => {
                    let Some(v) = self.expect_ref_id() else { return };
                    s.scope = v;
                    seen |= A_SCOPE;
                }
                Keyword::Segment => {
                    let Some(v) = self.expect_ref_id() else { return };
                    s.segment = v;
                    seen |= A_SEG;
                }
                Keyword::Size => {
                    let Some(v) = self.expect_int() else { return };
                    s.size = v;
                    seen |= A_SIZE;
                }
                Keyword::Type => {
                    s.symbol_type = match &self.tok {
                        Token::Kw(Keyword::Equate) => SymbolType::Equate,
                        Token::Kw(Keyword::Label) => SymbolType::Label,
                        _ => {
                            self.error_here("Unknown value for attribute \"type\"".into());
                            self.skip_line();
                            return;
                        }
                    };
                    self.advance();
                    seen |= A_TYPE;
                }
                Keyword::Value => {
                    let Some(v) = self.expect_int() else { return };
                    s.value = v as i64;
                    seen |= A_VALUE;
                }
                _ => {}
            }

            if self.tok != Token::Comma {
                break;
            }
            self.advance();
        }

        if !self.finish_directive(seen, REQUIRED) {
            return;
        }
        let given = seen & (A_SCOPE | A_PARENT);
        if given == 0 || given == (A_SCOPE | A_PARENT) {
            self.error_here("Only one of \"parent\", \"scope\" must be specified".into());
            return;
        }

        let id = s.id;
        if records::put(&mut self.store.symbols, id, s) {
            self.warning_here(format!("Duplicate id {id} for \"sym\" - overwriting"));
        }
    }
}
