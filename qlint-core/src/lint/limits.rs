//! Per-lambda size limits.
//!
//! Each rule counts distinct items owned by one lambda and flags the first
//! item that takes the count past its threshold, so an oversized lambda
//! produces exactly one diagnostic per rule.

use std::collections::{HashMap, HashSet};

use crate::analyzer::{AnnotatedToken, IdentifierRole, ScopeId};
use crate::diagnostic::Severity;
use crate::grammar::TokenKind;
use crate::lint::{LintConfig, LintRule};

/// Walk `items` in token order and return the item that pushes its
/// scope's distinct count past `limit`, once per scope.
fn first_over_limit<'a>(
    items: impl IntoIterator<Item = (ScopeId, String, &'a AnnotatedToken)>,
    limit: usize,
) -> Vec<&'a AnnotatedToken> {
    let mut seen: HashMap<ScopeId, HashSet<String>> = HashMap::new();
    let mut flagged = Vec::new();
    for (scope, key, token) in items {
        let keys = seen.entry(scope).or_default();
        if keys.len() > limit {
            continue;
        }
        if keys.insert(key) && keys.len() > limit {
            flagged.push(token);
        }
    }
    flagged
}

pub(crate) struct TooManyArguments;

impl LintRule for TooManyArguments {
    fn name(&self) -> &'static str {
        "TOO_MANY_ARGUMENTS"
    }

    fn severity(&self) -> Severity {
        Severity::Error
    }

    fn message(&self) -> &'static str {
        "Too many parameters"
    }

    fn check<'a>(
        &self,
        tokens: &'a [AnnotatedToken],
        config: &LintConfig,
    ) -> Vec<&'a AnnotatedToken> {
        let params = tokens.iter().filter_map(|token| {
            let scope = token.scope.filter(|_| token.is_param_declaration())?;
            // position keeps repeated names distinct
            Some((scope, token.index().to_string(), token))
        });
        first_over_limit(params, config.max_params)
    }
}

pub(crate) struct TooManyConstants;

impl LintRule for TooManyConstants {
    fn name(&self) -> &'static str {
        "TOO_MANY_CONSTANTS"
    }

    fn severity(&self) -> Severity {
        Severity::Error
    }

    fn message(&self) -> &'static str {
        "Too many constants"
    }

    fn check<'a>(
        &self,
        tokens: &'a [AnnotatedToken],
        config: &LintConfig,
    ) -> Vec<&'a AnnotatedToken> {
        first_over_limit(constants(tokens), config.max_constants)
    }
}

/// Literal values inside lambdas. A char literal counts once, keyed by its
/// full text and reported at its opening quote.
fn constants(tokens: &[AnnotatedToken]) -> Vec<(ScopeId, String, &AnnotatedToken)> {
    let mut out = Vec::new();
    let mut open: Option<(&AnnotatedToken, String)> = None;
    for token in tokens {
        match token.kind() {
            TokenKind::StringBegin => open = Some((token, String::from("\""))),
            TokenKind::StringText | TokenKind::StringEscape => {
                if let Some((_, text)) = open.as_mut() {
                    text.push_str(token.text());
                }
            }
            TokenKind::StringEnd => {
                if let Some((begin, text)) = open.take() {
                    if let Some(scope) = begin.scope {
                        out.push((scope, text, begin));
                    }
                }
            }
            kind if kind.is_literal() && !token.is_assignment() => {
                if let Some(scope) = token.scope {
                    out.push((scope, token.text().to_string(), token));
                }
            }
            _ => {}
        }
    }
    out
}

pub(crate) struct TooManyGlobals;

impl LintRule for TooManyGlobals {
    fn name(&self) -> &'static str {
        "TOO_MANY_GLOBALS"
    }

    fn severity(&self) -> Severity {
        Severity::Error
    }

    fn message(&self) -> &'static str {
        "Too many globals"
    }

    fn check<'a>(
        &self,
        tokens: &'a [AnnotatedToken],
        config: &LintConfig,
    ) -> Vec<&'a AnnotatedToken> {
        let globals = tokens.iter().filter_map(|token| {
            if token.role != Some(IdentifierRole::Global) {
                return None;
            }
            Some((token.scope?, token.text().to_string(), token))
        });
        first_over_limit(globals, config.max_globals)
    }
}

pub(crate) struct TooManyLocals;

impl LintRule for TooManyLocals {
    fn name(&self) -> &'static str {
        "TOO_MANY_LOCALS"
    }

    fn severity(&self) -> Severity {
        Severity::Error
    }

    fn message(&self) -> &'static str {
        "Too many locals"
    }

    fn check<'a>(
        &self,
        tokens: &'a [AnnotatedToken],
        config: &LintConfig,
    ) -> Vec<&'a AnnotatedToken> {
        let locals = tokens.iter().filter_map(|token| {
            if token.role != Some(IdentifierRole::Local) || !token.is_assignment() {
                return None;
            }
            Some((token.binding?, token.text().to_string(), token))
        });
        first_over_limit(locals, config.max_locals)
    }
}
