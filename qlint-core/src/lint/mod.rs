//! Lint rules over analyzed tokens.
//!
//! Every rule is a pure function from the annotated token sequence to the
//! tokens it objects to. [`lint`] runs the whole catalog and turns each
//! match into a [`Diagnostic`] carrying the rule's fixed name, severity and
//! message. Rules never see each other's output, so the catalog can run in
//! any order.
//!
//! # Adding a New Rule
//!
//! 1. Implement [`LintRule`] on a unit struct in the file for its family
//!    (`lexical`, `limits` or `usage`).
//! 2. Register it in [`all_rules`] (keep alphabetical).

mod lexical;
mod limits;
mod usage;

use tracing::debug;

use crate::analyzer::AnnotatedToken;
use crate::diagnostic::{Diagnostic, Severity};

/// Thresholds used by the rules that count things.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LintConfig {
    /// Longest allowed line, in characters, excluding the terminator.
    pub max_line_length: usize,
    /// Distinct literal constants per lambda.
    pub max_constants: usize,
    /// Distinct globals referenced per lambda.
    pub max_globals: usize,
    /// Distinct locals per lambda.
    pub max_locals: usize,
    /// Declared parameters per lambda.
    pub max_params: usize,
}

impl Default for LintConfig {
    fn default() -> Self {
        LintConfig {
            max_line_length: 200,
            max_constants: 96,
            max_globals: 32,
            max_locals: 110,
            max_params: 8,
        }
    }
}

/// A single lint rule.
pub(crate) trait LintRule {
    fn name(&self) -> &'static str;
    fn severity(&self) -> Severity;
    fn message(&self) -> &'static str;
    fn check<'a>(&self, tokens: &'a [AnnotatedToken], config: &LintConfig)
    -> Vec<&'a AnnotatedToken>;
}

/// The full catalog, alphabetical by rule name.
pub(crate) fn all_rules() -> Vec<Box<dyn LintRule>> {
    vec![
        Box::new(lexical::AssignReservedWord),
        Box::new(usage::DeclaredAfterUse),
        Box::new(lexical::DeprecatedDatetime),
        Box::new(lexical::FixedSeed),
        Box::new(lexical::InvalidAssign),
        Box::new(lexical::InvalidEscape),
        Box::new(lexical::LineLength),
        Box::new(limits::TooManyArguments),
        Box::new(limits::TooManyConstants),
        Box::new(limits::TooManyGlobals),
        Box::new(limits::TooManyLocals),
        Box::new(usage::UnusedParam),
        Box::new(usage::UnusedVar),
    ]
}

/// Names of every rule in the catalog.
pub fn rule_names() -> Vec<&'static str> {
    all_rules().iter().map(|rule| rule.name()).collect()
}

/// Run the catalog with default thresholds.
pub fn lint(tokens: &[AnnotatedToken]) -> Vec<Diagnostic> {
    lint_with(tokens, &LintConfig::default())
}

/// Run the catalog and return diagnostics ordered by token, then rule.
pub fn lint_with(tokens: &[AnnotatedToken], config: &LintConfig) -> Vec<Diagnostic> {
    let mut diagnostics = run_rules(&all_rules(), tokens, config);
    diagnostics.sort_by(|a, b| (a.range, a.rule_name).cmp(&(b.range, b.rule_name)));
    debug!(diagnostics = diagnostics.len(), "linted tokens");
    diagnostics
}

fn run_rules(
    rules: &[Box<dyn LintRule>],
    tokens: &[AnnotatedToken],
    config: &LintConfig,
) -> Vec<Diagnostic> {
    let mut diagnostics = Vec::new();
    for rule in rules {
        for token in rule.check(tokens, config) {
            diagnostics.push(Diagnostic::for_token(
                rule.name(),
                rule.severity(),
                rule.message(),
                token,
            ));
        }
    }
    diagnostics
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyzer::analyze;
    use crate::parser::parse_source;

    fn lint_source(source: &str) -> Vec<Diagnostic> {
        let cst = parse_source(source).expect("parse");
        lint(&analyze(&cst).tokens)
    }

    fn rules_for(source: &str) -> Vec<&'static str> {
        lint_source(source)
            .iter()
            .map(|diagnostic| diagnostic.rule_name)
            .collect()
    }

    #[test]
    fn assign_reserved_word() {
        assert_eq!(rules_for("til:1"), vec!["ASSIGN_RESERVED_WORD"]);
    }

    #[test]
    fn invalid_assign() {
        assert_eq!(rules_for("123:1"), vec!["INVALID_ASSIGN"]);
    }

    #[test]
    fn declared_after_use_stays_quiet_at_top_level() {
        assert!(rules_for("a;a:1;").is_empty());
    }

    #[test]
    fn unused_param() {
        assert_eq!(rules_for("{[a]}"), vec!["UNUSED_PARAM"]);
    }

    #[test]
    fn unused_var() {
        assert_eq!(rules_for("a:1"), vec!["UNUSED_VAR"]);
    }

    #[test]
    fn line_length() {
        let long = format!("{}\n", "1234567890".repeat(20) + "1");
        assert_eq!(rules_for(&long), vec!["LINE_LENGTH"]);

        let fits = format!("{}\n", "1234567890".repeat(20));
        assert!(rules_for(&fits).is_empty());
    }

    #[test]
    fn too_many_constants() {
        let body: String = (1..=255).map(|i| format!("{i} ")).collect();
        assert_eq!(rules_for(&format!("{{{body}}}")), vec!["TOO_MANY_CONSTANTS"]);
    }

    #[test]
    fn deprecated_datetime() {
        assert_eq!(rules_for("2000.01.01T12:00:00.000"), vec!["DEPRECATED_DATETIME"]);
    }

    #[test]
    fn diagnostics_point_at_the_flagged_token() {
        let diagnostics = lint_source("x:1;\nf:{[a;b] b}\nf[x;2]");
        assert_eq!(diagnostics.len(), 1);
        let diagnostic = &diagnostics[0];
        assert_eq!(diagnostic.rule_name, "UNUSED_PARAM");
        assert_eq!(diagnostic.severity, Severity::Warning);
        assert_eq!(diagnostic.range.start_index, diagnostic.range.end_index);
        assert_eq!(diagnostic.position.line, 1);
        assert_eq!(diagnostic.position.column, 4);
        assert_eq!(diagnostic.to_string(), "2:5: warning[UNUSED_PARAM]: Unused parameter");
    }

    #[test]
    fn honours_configured_thresholds() {
        let cst = parse_source("abcdef\n").expect("parse");
        let tokens = analyze(&cst).tokens;
        let config = LintConfig {
            max_line_length: 5,
            ..LintConfig::default()
        };
        let names: Vec<_> = lint_with(&tokens, &config)
            .iter()
            .map(|diagnostic| diagnostic.rule_name)
            .collect();
        assert_eq!(names, vec!["LINE_LENGTH"]);
    }

    #[test]
    fn catalog_is_deterministic_and_order_independent() {
        let source = "f:{[a;b;c] d:1; e::\"\\q\"; a+5?0w}\ng:2000.01.01T00:00\n";
        let cst = parse_source(source).expect("parse");
        let tokens = analyze(&cst).tokens;
        let config = LintConfig::default();

        let first = lint(&tokens);
        assert_eq!(first, lint(&tokens));

        let mut forward = run_rules(&all_rules(), &tokens, &config);
        let mut reversed_rules = all_rules();
        reversed_rules.reverse();
        let mut backward = run_rules(&reversed_rules, &tokens, &config);
        let key = |d: &Diagnostic| (d.range, d.rule_name);
        forward.sort_by_key(key);
        backward.sort_by_key(key);
        assert_eq!(forward, backward);
        assert!(!forward.is_empty());
    }

    #[test]
    fn rule_names_are_unique() {
        let mut names = rule_names();
        let count = names.len();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), count);
    }
}
