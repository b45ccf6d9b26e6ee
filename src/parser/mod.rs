//! Scanner and directive parser for the textual debug info format

pub(crate) mod directives;
pub(crate) mod records;
pub(crate) mod scanner;

pub(crate) use directives::DirectiveParser;
pub(crate) use records::{RawStore, NO_ID};
pub(crate) use scanner::Scanner;
