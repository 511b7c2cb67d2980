//! Rules about how names are written and read.

use crate::analyzer::{AnnotatedToken, IdentifierRole};
use crate::diagnostic::Severity;
use crate::lint::{LintConfig, LintRule};

/// Another occurrence of the same name resolving to the same binding.
fn same_binding(a: &AnnotatedToken, b: &AnnotatedToken) -> bool {
    a.index() != b.index() && b.is_identifier() && a.text() == b.text() && a.binding == b.binding
}

pub(crate) struct UnusedParam;

impl LintRule for UnusedParam {
    fn name(&self) -> &'static str {
        "UNUSED_PARAM"
    }

    fn severity(&self) -> Severity {
        Severity::Warning
    }

    fn message(&self) -> &'static str {
        "Unused parameter"
    }

    fn check<'a>(&self, tokens: &'a [AnnotatedToken], _: &LintConfig) -> Vec<&'a AnnotatedToken> {
        tokens
            .iter()
            .filter(|param| param.is_param_declaration())
            .filter(|param| {
                !tokens
                    .iter()
                    .any(|other| same_binding(param, other) && other.is_reference())
            })
            .collect()
    }
}

/// Assigned names that are never read. Locals must be read through the
/// same binding; globals may be read from anywhere they are not shadowed.
pub(crate) struct UnusedVar;

impl LintRule for UnusedVar {
    fn name(&self) -> &'static str {
        "UNUSED_VAR"
    }

    fn severity(&self) -> Severity {
        Severity::Warning
    }

    fn message(&self) -> &'static str {
        "Unused variable"
    }

    fn check<'a>(&self, tokens: &'a [AnnotatedToken], _: &LintConfig) -> Vec<&'a AnnotatedToken> {
        tokens
            .iter()
            .filter(|target| target.is_identifier() && target.is_assignment())
            .filter(|target| {
                // `a+:1` reads `a` before writing it
                let reads = |other: &AnnotatedToken| other.is_reference() || other.reversed;
                let read = |other: &AnnotatedToken| match target.role {
                    Some(IdentifierRole::Local) => same_binding(target, other) && reads(other),
                    Some(IdentifierRole::Global) => {
                        other.index() != target.index()
                            && other.role == Some(IdentifierRole::Global)
                            && other.text() == target.text()
                            && reads(other)
                    }
                    _ => true,
                };
                !tokens.iter().any(read)
            })
            .collect()
    }
}

/// A local read in its own lambda before the lambda first assigns it.
///
/// Only lambda locals are checked. Top-level names and `::` targets are
/// globals whose definition may live in another file or run before the
/// reading line executes, so `a; a:1` never fires. Compound assignments
/// read their target and are not declarations.
pub(crate) struct DeclaredAfterUse;

impl LintRule for DeclaredAfterUse {
    fn name(&self) -> &'static str {
        "DECLARED_AFTER_USE"
    }

    fn severity(&self) -> Severity {
        Severity::Error
    }

    fn message(&self) -> &'static str {
        "Variable used before it is declared"
    }

    fn check<'a>(&self, tokens: &'a [AnnotatedToken], _: &LintConfig) -> Vec<&'a AnnotatedToken> {
        tokens
            .iter()
            .filter(|target| {
                target.is_identifier()
                    && target.is_assignment()
                    && !target.reversed
                    && target.role == Some(IdentifierRole::Local)
            })
            .filter(|target| {
                let first = tokens[..target.index()].iter().find(|other| {
                    same_binding(target, other)
                        && other.scope == target.scope
                        && other.position.is_some()
                });
                first.is_some_and(|first| first.is_reference())
            })
            .filter(|target| {
                // one report per name: only the first plain assignment
                !tokens[..target.index()].iter().any(|other| {
                    same_binding(target, other)
                        && other.scope == target.scope
                        && other.is_assignment()
                        && !other.reversed
                })
            })
            .collect()
    }
}
