//! Core static analysis for q/kdb+ source.
//!
//! The pipeline is:
//!
//!   source .q
//!     -> lexer     (lossless tokens, driven by the grammar table)
//!     -> parser    (concrete syntax tree)
//!     -> analyzer  (scopes, identifier roles, assignment positions)
//!     -> lint      (rule catalog -> diagnostics)
//!
//! Front-end failures are [`CoreError`]s; the analyzer and the rules are
//! total. Tools such as the CLI should go through [`check_source`] or
//! [`check_file`] rather than wiring the stages themselves.

// ---------------------------------------------------------------------
// Positions, errors and findings
// ---------------------------------------------------------------------

pub mod span;
pub mod error;
pub mod diagnostic;

// ---------------------------------------------------------------------
// Front-end: lexing and parsing
// ---------------------------------------------------------------------

pub mod grammar;
pub mod lexer;
pub mod cst;
pub mod parser;

// ---------------------------------------------------------------------
// Semantic analysis and rules
// ---------------------------------------------------------------------

pub mod analyzer;
pub mod lint;
pub mod pipeline;


// ---------------------------------------------------------------------
// Public API re-exports
// ---------------------------------------------------------------------

pub use analyzer::{Analysis, AnnotatedToken, analyze};
pub use diagnostic::{Diagnostic, Severity};
pub use error::CoreError;
pub use lexer::{Token, tokenize};
pub use lint::{LintConfig, lint, lint_with, rule_names};
pub use parser::{parse, parse_source};
pub use pipeline::{check_file, check_source};
