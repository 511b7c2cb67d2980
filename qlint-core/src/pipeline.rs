use std::path::Path;

use tracing::debug;

use crate::analyzer::analyze;
use crate::diagnostic::Diagnostic;
use crate::error::CoreError;
use crate::lint::{LintConfig, lint_with};
use crate::parser::parse_source;

/// Tokenize, parse, analyze and lint one compilation unit.
pub fn check_source(source: &str, config: &LintConfig) -> Result<Vec<Diagnostic>, CoreError> {
    let cst = parse_source(source)?;
    let analysis = analyze(&cst);
    Ok(lint_with(&analysis.tokens, config))
}

/// [`check_source`] on the contents of a file.
pub fn check_file(path: impl AsRef<Path>, config: &LintConfig) -> Result<Vec<Diagnostic>, CoreError> {
    let path = path.as_ref();
    let source = std::fs::read_to_string(path)?;
    debug!(path = %path.display(), bytes = source.len(), "checking file");
    check_source(&source, config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn checks_source_end_to_end() {
        let diagnostics = check_source("f:{[a] 1}; f[]", &LintConfig::default()).expect("check");
        let names: Vec<_> = diagnostics.iter().map(|d| d.rule_name).collect();
        assert_eq!(names, vec!["UNUSED_PARAM"]);
    }

    #[test]
    fn propagates_front_end_errors() {
        let config = LintConfig::default();
        assert!(matches!(
            check_source("\"open", &config),
            Err(CoreError::LexError { position: 0, .. })
        ));
        assert!(matches!(
            check_source("f[1", &config),
            Err(CoreError::ParseError { index: 1, .. })
        ));
    }

    #[test]
    fn reads_files() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("a.q");
        fs::write(&path, "2000.01.01T00:00\n").expect("write");
        let diagnostics = check_file(&path, &LintConfig::default()).expect("check");
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].rule_name, "DEPRECATED_DATETIME");

        let missing = check_file(dir.path().join("missing.q"), &LintConfig::default());
        assert!(matches!(missing, Err(CoreError::SourceIo(_))));
    }
}
