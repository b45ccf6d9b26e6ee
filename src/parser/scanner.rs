//! Character-level scanner for the textual debug info format
//!
//! Reads the input one byte at a time, tracking line and column, and turns
//! it into the small token vocabulary of the format: punctuation, integer
//! constants (decimal, octal with a `0` prefix, hex with `0x`), double
//! quoted strings without escapes, and identifiers that are matched against
//! the keyword table. The starting position of each token is retained for
//! diagnostics.

use crate::core::Reporter;
use std::fmt;
use std::io::Read;

/// Keywords of the debug info format. The scanner classifies every
/// identifier against this set; everything else stays a plain identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Keyword {
    Abs,
    AddrSize,
    Count,
    Enum,
    Equate,
    File,
    Global,
    Id,
    Info,
    Label,
    Library,
    Line,
    Long,
    Major,
    Minor,
    Module,
    MTime,
    Name,
    OutputName,
    OutputOffs,
    Parent,
    Ro,
    Rw,
    Scope,
    Segment,
    Size,
    Span,
    Start,
    Struct,
    Sym,
    Type,
    Value,
    Version,
    ZeroPage,
}

/// Keyword spellings, sorted for binary search.
static KEYWORDS: &[(&str, Keyword)] = &[
    ("abs", Keyword::Abs),
    ("addrsize", Keyword::AddrSize),
    ("count", Keyword::Count),
    ("enum", Keyword::Enum),
    ("equ", Keyword::Equate),
    ("file", Keyword::File),
    ("global", Keyword::Global),
    ("id", Keyword::Id),
    ("info", Keyword::Info),
    ("lab", Keyword::Label),
    ("lib", Keyword::Library),
    ("line", Keyword::Line),
    ("long", Keyword::Long),
    ("major", Keyword::Major),
    ("minor", Keyword::Minor),
    ("mod", Keyword::Module),
    ("mtime", Keyword::MTime),
    ("name", Keyword::Name),
    ("oname", Keyword::OutputName),
    ("ooffs", Keyword::OutputOffs),
    ("parent", Keyword::Parent),
    ("ro", Keyword::Ro),
    ("rw", Keyword::Rw),
    ("scope", Keyword::Scope),
    ("seg", Keyword::Segment),
    ("size", Keyword::Size),
    ("span", Keyword::Span),
    ("start", Keyword::Start),
    ("struct", Keyword::Struct),
    ("sym", Keyword::Sym),
    ("type", Keyword::Type),
    ("val", Keyword::Value),
    ("version", Keyword::Version),
    ("zp", Keyword::ZeroPage),
];

impl Keyword {
    pub(crate) fn as_str(self) -> &'static str {
        // The table is tiny, a linear scan is fine here
        KEYWORDS
            .iter()
            .find(|&&(_, kw)| kw == self)
            .map(|&(s, _)| s)
            .unwrap_or("")
    }
}

/// One token of the input stream
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Token {
    Eof,
    Eol,
    Comma,
    Equal,
    Plus,
    Minus,
    Int(u64),
    Str(String),
    Ident(String),
    Kw(Keyword),
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::Eof => write!(f, "end of file"),
            Token::Eol => write!(f, "end of line"),
            Token::Comma => write!(f, "','"),
            Token::Equal => write!(f, "'='"),
            Token::Plus => write!(f, "'+'"),
            Token::Minus => write!(f, "'-'"),
            Token::Int(v) => write!(f, "integer constant {v}"),
            Token::Str(s) => write!(f, "string \"{s}\""),
            Token::Ident(s) => write!(f, "identifier \"{s}\""),
            Token::Kw(kw) => write!(f, "keyword \"{}\"", kw.as_str()),
        }
    }
}

fn digit_val(c: u8) -> Option<u64> {
    match c {
        b'0'..=b'9' => Some(u64::from(c - b'0')),
        b'a'..=b'f' => Some(u64::from(c - b'a') + 10),
        b'A'..=b'F' => Some(u64::from(c - b'A') + 10),
        _ => None,
    }
}

/// Byte-at-a-time scanner over a buffered reader
pub(crate) struct Scanner<R> {
    input: R,
    /// Current character, `None` at end of file
    cur: Option<u8>,
    line: u32,
    col: u32,
    /// Position of the start of the most recent token
    tok_line: u32,
    tok_col: u32,
}

impl<R: Read> Scanner<R> {
    /// Create a scanner. `input` should be buffered; the scanner issues
    /// single-byte reads.
    pub(crate) fn new(input: R) -> Self {
        Self {
            input,
            // Primed with a space so the first advance fetches the first
            // real input character
            cur: Some(b' '),
            line: 1,
            col: 0,
            tok_line: 1,
            tok_col: 0,
        }
    }

    /// Line of the start of the last token returned
    pub(crate) fn token_line(&self) -> u32 {
        self.tok_line
    }

    /// Column of the start of the last token returned
    pub(crate) fn token_col(&self) -> u32 {
        self.tok_col
    }

    /// Read the next character, counting lines and columns. A read error
    /// is treated like end of file.
    fn next_char(&mut self) {
        if self.cur.is_none() {
            return;
        }
        if self.cur == Some(b'\n') {
            self.line += 1;
            self.col = 0;
        }
        let mut buf = [0u8; 1];
        self.cur = match self.input.read(&mut buf) {
            Ok(1) => Some(buf[0]),
            _ => None,
        };
        self.col += 1;
    }

    /// Read the next token from the input stream
    pub(crate) fn next_token(&mut self, reporter: &mut Reporter<'_>) -> Token {
        loop {
            // Skip whitespace; newline is a token of its own
            while matches!(self.cur, Some(b' ') | Some(b'\t') | Some(b'\r')) {
                self.next_char();
            }

            // Remember the current position as start of the next token
            self.tok_line = self.line;
            self.tok_col = self.col;

            let c = match self.cur {
                None => return Token::Eof,
                Some(c) => c,
            };

            // Identifier or keyword?
            if c == b'_' || c.is_ascii_alphabetic() {
                let mut ident = String::new();
                while let Some(c) = self.cur {
                    if c != b'_' && !c.is_ascii_alphanumeric() {
                        break;
                    }
                    ident.push(c as char);
                    self.next_char();
                }
                return match KEYWORDS.binary_search_by_key(&ident.as_str(), |&(s, _)| s) {
                    Ok(idx) => Token::Kw(KEYWORDS[idx].1),
                    Err(_) => Token::Ident(ident),
                };
            }

            // Number?
            if c.is_ascii_digit() {
                let mut base = 10;
                if c == b'0' {
                    self.next_char();
                    if matches!(self.cur, Some(b'x') | Some(b'X')) {
                        self.next_char();
                        base = 16;
                    } else {
                        base = 8;
                    }
                }
                let mut val: u64 = 0;
                while let Some(v) = self.cur.and_then(digit_val) {
                    if v >= base {
                        break;
                    }
                    val = val.wrapping_mul(base).wrapping_add(v);
                    self.next_char();
                }
                return Token::Int(val);
            }

            match c {
                b'-' => {
                    self.next_char();
                    return Token::Minus;
                }
                b'+' => {
                    self.next_char();
                    return Token::Plus;
                }
                b',' => {
                    self.next_char();
                    return Token::Comma;
                }
                b'=' => {
                    self.next_char();
                    return Token::Equal;
                }
                b'"' => {
                    let mut s = String::new();
                    self.next_char();
                    loop {
                        match self.cur {
                            Some(b'\n') | None => {
                                reporter.error(
                                    self.tok_line,
                                    self.tok_col,
                                    "Unterminated string constant".into(),
                                );
                                break;
                            }
                            Some(b'"') => {
                                self.next_char();
                                break;
                            }
                            Some(c) => {
                                s.push(c as char);
                                self.next_char();
                            }
                        }
                    }
                    return Token::Str(s);
                }
                b'\n' => {
                    self.next_char();
                    return Token::Eol;
                }
                _ => {
                    reporter.error(
                        self.tok_line,
                        self.tok_col,
                        format!("Invalid input character `{}'", c as char),
                    );
                    self.next_char();
                    // Resume scanning with the next character
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Diagnostic;
    use std::io::Cursor;

    fn scan(input: &str) -> (Vec<Token>, Vec<Diagnostic>) {
        let mut diags = Vec::new();
        let mut sink = |d: &Diagnostic| diags.push(d.clone());
        let mut reporter = Reporter::new("test", &mut sink);
        let mut scanner = Scanner::new(Cursor::new(input.as_bytes().to_vec()));
        let mut tokens = Vec::new();
        loop {
            let tok = scanner.next_token(&mut reporter);
            let done = tok == Token::Eof;
            tokens.push(tok);
            if done {
                break;
            }
        }
        (tokens, diags)
    }

    #[test]
    fn punctuation_and_newline() {
        let (tokens, diags) = scan(",=+-\n");
        assert_eq!(
            tokens,
            vec![
                Token::Comma,
                Token::Equal,
                Token::Plus,
                Token::Minus,
                Token::Eol,
                Token::Eof
            ]
        );
        assert!(diags.is_empty());
    }

    #[test]
    fn integer_bases() {
        let (tokens, _) = scan("42 0x2a 0X2A 052 0");
        assert_eq!(
            tokens,
            vec![
                Token::Int(42),
                Token::Int(42),
                Token::Int(42),
                Token::Int(42),
                Token::Int(0),
                Token::Eof
            ]
        );
    }

    #[test]
    fn string_constant() {
        let (tokens, diags) = scan("\"hello.s\"");
        assert_eq!(tokens, vec![Token::Str("hello.s".into()), Token::Eof]);
        assert!(diags.is_empty());
    }

    #[test]
    fn unterminated_string_stops_at_newline() {
        let (tokens, diags) = scan("\"oops\nid");
        assert_eq!(tokens[0], Token::Str("oops".into()));
        assert_eq!(tokens[1], Token::Eol);
        assert_eq!(tokens[2], Token::Kw(Keyword::Id));
        assert_eq!(diags.len(), 1);
        assert!(diags[0].message.contains("Unterminated"));
    }

    #[test]
    fn keywords_and_identifiers() {
        let (tokens, _) = scan("version mtime wibble _x9");
        assert_eq!(
            tokens,
            vec![
                Token::Kw(Keyword::Version),
                Token::Kw(Keyword::MTime),
                Token::Ident("wibble".into()),
                Token::Ident("_x9".into()),
                Token::Eof
            ]
        );
    }

    #[test]
    fn invalid_character_is_reported_and_skipped() {
        let (tokens, diags) = scan("id;name");
        assert_eq!(
            tokens,
            vec![Token::Kw(Keyword::Id), Token::Kw(Keyword::Name), Token::Eof]
        );
        assert_eq!(diags.len(), 1);
        assert!(diags[0].message.contains("Invalid input character"));
    }

    #[test]
    fn token_positions() {
        let mut diags = Vec::new();
        let mut sink = |d: &Diagnostic| diags.push(d.clone());
        let mut reporter = Reporter::new("test", &mut sink);
        let mut scanner = Scanner::new(Cursor::new(b"line\nid=7".to_vec()));

        assert_eq!(scanner.next_token(&mut reporter), Token::Kw(Keyword::Line));
        assert_eq!(scanner.token_line(), 1);
        assert_eq!(scanner.next_token(&mut reporter), Token::Eol);
        assert_eq!(scanner.next_token(&mut reporter), Token::Kw(Keyword::Id));
        assert_eq!(scanner.token_line(), 2);
        assert_eq!(scanner.next_token(&mut reporter), Token::Equal);
        assert_eq!(scanner.next_token(&mut reporter), Token::Int(7));
        assert_eq!(scanner.token_line(), 2);
    }

    #[test]
    fn keyword_table_is_sorted() {
        for pair in KEYWORDS.windows(2) {
            assert!(pair[0].0 < pair[1].0, "{} >= {}", pair[0].0, pair[1].0);
        }
    }
}
