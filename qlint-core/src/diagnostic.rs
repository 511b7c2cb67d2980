//! Positioned lint findings.

use std::fmt;

use serde::Serialize;

use crate::analyzer::AnnotatedToken;
use crate::span::{Position, Span};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
    Info,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Severity::Error => "error",
            Severity::Warning => "warning",
            Severity::Info => "info",
        };
        f.write_str(label)
    }
}

/// Inclusive range of token indices a diagnostic points at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenRange {
    pub start_index: usize,
    pub end_index: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Diagnostic {
    pub rule_name: &'static str,
    pub severity: Severity,
    pub message: &'static str,
    pub range: TokenRange,
    /// Byte span of the flagged token(s).
    pub span: Span,
    /// Line/column where the flagged range starts.
    pub position: Position,
}

impl Diagnostic {
    pub fn for_token(
        rule_name: &'static str,
        severity: Severity,
        message: &'static str,
        token: &AnnotatedToken,
    ) -> Self {
        Diagnostic {
            rule_name,
            severity,
            message,
            range: TokenRange {
                start_index: token.index(),
                end_index: token.index(),
            },
            span: token.token.span,
            position: token.token.position,
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{}: {}[{}]: {}",
            self.position.line + 1,
            self.position.column + 1,
            self.severity,
            self.rule_name,
            self.message
        )
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;
    use crate::lint::LintConfig;
    use crate::pipeline::check_source;

    #[test]
    fn diagnostics_can_be_deduplicated() {
        let diagnostics = check_source("a:1\n", &LintConfig::default()).expect("check");
        let doubled: HashSet<Diagnostic> = diagnostics.iter().chain(&diagnostics).cloned().collect();
        assert_eq!(doubled.len(), diagnostics.len());
        assert_eq!(diagnostics[0].position, Position { line: 0, column: 0 });
    }

    #[test]
    fn severity_renders_lowercase() {
        assert_eq!(Severity::Error.to_string(), "error");
        assert_eq!(Severity::Info.to_string(), "info");
    }
}
