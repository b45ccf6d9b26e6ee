//! Core types and utilities for dbginfo65

pub mod diagnostics;
pub mod errors;
pub mod types;

pub use diagnostics::{Diagnostic, Severity};
pub(crate) use diagnostics::Reporter;
pub use errors::*;
pub use types::*;
