//! Scope and role resolution over a [`Cst`].
//!
//! The analyzer never touches the tree or the tokens it was given. It
//! builds a fresh, index-aligned vector of [`AnnotatedToken`]s that pairs
//! every token with the facts the lint rules query:
//!
//! - `scope`: the innermost lambda containing the token (`None` at top level)
//! - `role`: how an identifier resolves (parameter, local, global, built-in)
//! - `position`: whether an occurrence is written or read
//! - `reversed`: compound assignments (`a+:1`) that read their target first
//! - `binding`: the scope owning the parameter/local an identifier resolves to
//!
//! Locals are discovered positionally: any plain `name:` directly inside a
//! lambda makes `name` local to that lambda for the whole body. `name::`,
//! dotted names and anything at top level are global. A lambda without a
//! parameter list has the implicit parameters `x`, `y` and `z`.

use std::collections::{BTreeSet, HashMap, HashSet};

use serde::Serialize;
use tracing::debug;

use crate::cst::{Bracket, Cst, Group, Lambda, Node};
use crate::grammar::{TokenKind, is_system_name};
use crate::lexer::Token;

const IMPLICIT_PARAMS: [&str; 3] = ["x", "y", "z"];

/// q-sql templates whose `name:` clauses name result columns.
const QUERY_KEYWORDS: [&str; 4] = ["select", "exec", "update", "delete"];

/// Identity of a lambda scope within one analysis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct ScopeId(pub usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum IdentifierRole {
    Parameter,
    Local,
    Global,
    BuiltIn,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum PositionRole {
    Assignment,
    Reference,
}

/// The region introduced by one lambda.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Scope {
    pub id: ScopeId,
    pub parent: Option<ScopeId>,
    /// Token indices of the braces.
    pub open: usize,
    pub close: usize,
    /// Declared parameter names in order, with their token index.
    pub params: Vec<(String, usize)>,
    /// Whether the lambda has an explicit `[...]` parameter list.
    pub explicit_params: bool,
    pub locals: BTreeSet<String>,
}

impl Scope {
    fn has_param(&self, name: &str) -> bool {
        if self.explicit_params {
            self.params.iter().any(|(param, _)| param == name)
        } else {
            IMPLICIT_PARAMS.contains(&name)
        }
    }
}

/// A token together with its semantic annotations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AnnotatedToken {
    pub token: Token,
    pub scope: Option<ScopeId>,
    pub role: Option<IdentifierRole>,
    pub position: Option<PositionRole>,
    pub reversed: bool,
    pub binding: Option<ScopeId>,
}

impl AnnotatedToken {
    pub fn index(&self) -> usize {
        self.token.index
    }

    pub fn kind(&self) -> TokenKind {
        self.token.kind
    }

    pub fn text(&self) -> &str {
        &self.token.text
    }

    pub fn is_identifier(&self) -> bool {
        self.token.kind == TokenKind::Identifier
    }

    pub fn is_assignment(&self) -> bool {
        self.position == Some(PositionRole::Assignment)
    }

    pub fn is_reference(&self) -> bool {
        self.position == Some(PositionRole::Reference)
    }

    /// A parameter name as written in a lambda's `[...]` list.
    pub fn is_param_declaration(&self) -> bool {
        self.role == Some(IdentifierRole::Parameter) && self.position.is_none()
    }
}

/// Result of one analyzer pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Analysis {
    pub tokens: Vec<AnnotatedToken>,
    pub scopes: Vec<Scope>,
}

/// How an assignment target was written.
#[derive(Debug, Clone, Copy)]
struct Target {
    global: bool,
    compound: bool,
}

#[derive(Default)]
struct Collector {
    scopes: Vec<Scope>,
    token_scope: Vec<Option<ScopeId>>,
    targets: HashMap<usize, Target>,
    /// Identifiers naming q-sql result columns or table columns.
    columns: HashSet<usize>,
    declarations: HashSet<usize>,
}

/// Annotate every token of `cst`.
///
/// Total over any tree the parser produces. Running it again on the same
/// tree yields an identical result.
pub fn analyze(cst: &Cst) -> Analysis {
    let mut collector = Collector {
        token_scope: vec![None; cst.tokens.len()],
        ..Collector::default()
    };
    collector.sequence(cst, &cst.script, None, false, true);
    collector.collect_locals(&cst.tokens);

    let tokens = cst
        .tokens
        .iter()
        .map(|token| collector.annotate(token))
        .collect();

    debug!(
        tokens = cst.tokens.len(),
        scopes = collector.scopes.len(),
        assignments = collector.targets.len(),
        "analyzed script"
    );
    Analysis {
        tokens,
        scopes: collector.scopes,
    }
}

impl Collector {
    /// `lines` is set for the script itself, where a line break followed
    /// by a non-blank line starts a new statement.
    fn sequence(
        &mut self,
        cst: &Cst,
        nodes: &[Node],
        scope: Option<ScopeId>,
        query: bool,
        lines: bool,
    ) {
        let mut in_query = query;
        for (at, node) in nodes.iter().enumerate() {
            match node {
                Node::Assignment(assignment) => {
                    let target = nodes[..at].iter().rev().find(|node| !node.is_space());
                    if let Some(Node::Identifier(index) | Node::Keyword(index) | Node::Literal(index)) =
                        target
                    {
                        if in_query && cst.tokens[*index].kind == TokenKind::Identifier {
                            self.columns.insert(*index);
                        } else {
                            self.targets.insert(
                                *index,
                                Target {
                                    global: assignment.global,
                                    compound: assignment.operator.is_some(),
                                },
                            );
                        }
                    }
                }
                Node::Keyword(index) => {
                    let word = cst.tokens[*index].text.as_str();
                    if QUERY_KEYWORDS.contains(&word) {
                        in_query = true;
                    } else if word == "from" {
                        in_query = false;
                    }
                }
                Node::SemiColon(_) => in_query = query,
                Node::EndOfLine(_) if lines && !nodes.get(at + 1).is_some_and(Node::is_space) => {
                    in_query = query;
                }
                Node::Lambda(lambda) => self.lambda(cst, lambda, scope),
                Node::Bracket(Bracket { items, .. }) => self.sequence(cst, items, scope, in_query, false),
                Node::Group(group) => self.group(cst, group, scope, in_query),
                _ => {}
            }
        }
    }

    /// `([] a:1 2; b:3 4)` and `([k:1 2] v:3 4)` define table columns.
    fn group(&mut self, cst: &Cst, group: &Group, scope: Option<ScopeId>, query: bool) {
        let leading = group.items.iter().position(|node| !node.is_space());
        if let Some(Node::Bracket(keys)) = leading.map(|at| &group.items[at]) {
            self.sequence(cst, &keys.items, scope, true, false);
            let columns = &group.items[leading.map_or(0, |at| at + 1)..];
            self.sequence(cst, columns, scope, true, false);
        } else {
            self.sequence(cst, &group.items, scope, query, false);
        }
    }

    fn lambda(&mut self, cst: &Cst, lambda: &Lambda, parent: Option<ScopeId>) {
        let id = ScopeId(self.scopes.len());
        for slot in &mut self.token_scope[lambda.open..=lambda.close] {
            *slot = Some(id);
        }

        let mut params = Vec::new();
        if let Some(bracket) = &lambda.params {
            for node in &bracket.items {
                if let Node::Identifier(index) = node {
                    params.push((cst.tokens[*index].text.clone(), *index));
                    self.declarations.insert(*index);
                }
            }
        }

        self.scopes.push(Scope {
            id,
            parent,
            open: lambda.open,
            close: lambda.close,
            params,
            explicit_params: lambda.params.is_some(),
            locals: BTreeSet::new(),
        });
        self.sequence(cst, &lambda.body, Some(id), false, false);
    }

    fn collect_locals(&mut self, tokens: &[Token]) {
        for (&index, target) in &self.targets {
            let token = &tokens[index];
            if target.global || token.kind != TokenKind::Identifier || token.text.contains('.') {
                continue;
            }
            if let Some(scope) = self.token_scope[index] {
                self.scopes[scope.0].locals.insert(token.text.clone());
            }
        }
    }

    /// Walk outwards from `scope` looking for a parameter or local `name`.
    fn resolve(&self, name: &str, scope: Option<ScopeId>) -> (IdentifierRole, Option<ScopeId>) {
        let mut current = scope;
        while let Some(id) = current {
            let scope = &self.scopes[id.0];
            if scope.has_param(name) {
                return (IdentifierRole::Parameter, Some(id));
            }
            if scope.locals.contains(name) {
                return (IdentifierRole::Local, Some(id));
            }
            current = scope.parent;
        }
        (global_role(name), None)
    }

    fn annotate(&self, token: &Token) -> AnnotatedToken {
        let scope = self.token_scope[token.index];
        let mut annotated = AnnotatedToken {
            token: token.clone(),
            scope,
            role: None,
            position: None,
            reversed: false,
            binding: None,
        };
        let target = self.targets.get(&token.index);

        match token.kind {
            TokenKind::Identifier if self.declarations.contains(&token.index) => {
                annotated.role = Some(IdentifierRole::Parameter);
                annotated.binding = scope;
            }
            TokenKind::Identifier if self.columns.contains(&token.index) => {}
            TokenKind::Identifier => {
                let (role, binding) = match target {
                    Some(target) if target.global => (global_role(&token.text), None),
                    _ => self.resolve(&token.text, scope),
                };
                annotated.role = Some(role);
                annotated.binding = binding;
                annotated.position = Some(position_of(target));
                annotated.reversed = target.is_some_and(|target| target.compound);
            }
            TokenKind::Keyword => {
                annotated.role = Some(IdentifierRole::BuiltIn);
                annotated.position = Some(position_of(target));
            }
            kind if kind.is_literal() && target.is_some() => {
                annotated.position = Some(PositionRole::Assignment);
            }
            _ => {}
        }
        annotated
    }
}

fn global_role(name: &str) -> IdentifierRole {
    if is_system_name(name) {
        IdentifierRole::BuiltIn
    } else {
        IdentifierRole::Global
    }
}

fn position_of(target: Option<&Target>) -> PositionRole {
    match target {
        Some(_) => PositionRole::Assignment,
        None => PositionRole::Reference,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::{parse, parse_source};

    fn analyze_source(source: &str) -> Analysis {
        analyze(&parse_source(source).expect("parse"))
    }

    fn find<'a>(analysis: &'a Analysis, text: &str, nth: usize) -> &'a AnnotatedToken {
        analysis
            .tokens
            .iter()
            .filter(|token| token.text() == text)
            .nth(nth)
            .expect("token present")
    }

    #[test]
    fn top_level_assignment_is_global() {
        let analysis = analyze_source("a:1");
        let a = find(&analysis, "a", 0);
        assert_eq!(a.role, Some(IdentifierRole::Global));
        assert_eq!(a.position, Some(PositionRole::Assignment));
        assert_eq!(a.scope, None);
        assert!(!a.reversed);
    }

    #[test]
    fn lambda_assignment_is_local() {
        let analysis = analyze_source("f:{b:1; b+x}");
        let decl = find(&analysis, "b", 0);
        let read = find(&analysis, "b", 1);
        assert_eq!(decl.role, Some(IdentifierRole::Local));
        assert_eq!(decl.position, Some(PositionRole::Assignment));
        assert_eq!(read.role, Some(IdentifierRole::Local));
        assert_eq!(read.position, Some(PositionRole::Reference));
        assert_eq!(decl.binding, Some(ScopeId(0)));
        assert_eq!(read.binding, Some(ScopeId(0)));

        let x = find(&analysis, "x", 0);
        assert_eq!(x.role, Some(IdentifierRole::Parameter));
        assert_eq!(analysis.scopes[0].locals, BTreeSet::from(["b".to_string()]));
    }

    #[test]
    fn double_colon_escalates_to_global() {
        let analysis = analyze_source("{g::1}");
        let g = find(&analysis, "g", 0);
        assert_eq!(g.role, Some(IdentifierRole::Global));
        assert_eq!(g.scope, Some(ScopeId(0)));
        assert!(analysis.scopes[0].locals.is_empty());
    }

    #[test]
    fn params_are_visible_in_nested_lambdas() {
        let analysis = analyze_source("{[a] {a}}");
        let decl = find(&analysis, "a", 0);
        let nested = find(&analysis, "a", 1);
        assert!(decl.is_param_declaration());
        assert_eq!(decl.binding, Some(ScopeId(0)));
        assert_eq!(nested.scope, Some(ScopeId(1)));
        assert_eq!(nested.role, Some(IdentifierRole::Parameter));
        assert_eq!(nested.binding, Some(ScopeId(0)));
        assert_eq!(analysis.scopes[1].parent, Some(ScopeId(0)));
    }

    #[test]
    fn explicit_params_replace_implicit_ones() {
        let analysis = analyze_source("{[a] x}");
        assert_eq!(find(&analysis, "x", 0).role, Some(IdentifierRole::Global));
    }

    #[test]
    fn compound_assignment_is_reversed() {
        let analysis = analyze_source("a+:1");
        let a = find(&analysis, "a", 0);
        assert!(a.reversed);
        assert!(a.is_assignment());
    }

    #[test]
    fn marks_literal_and_keyword_targets() {
        let analysis = analyze_source("til:1;123:1");
        let til = find(&analysis, "til", 0);
        assert_eq!(til.role, Some(IdentifierRole::BuiltIn));
        assert!(til.is_assignment());
        assert!(find(&analysis, "123", 0).is_assignment());
        assert!(!find(&analysis, "1", 0).is_assignment());
    }

    #[test]
    fn system_namespaces_are_builtin() {
        let analysis = analyze_source(".z.ts:{x}");
        assert_eq!(find(&analysis, ".z.ts", 0).role, Some(IdentifierRole::BuiltIn));
    }

    #[test]
    fn query_and_table_columns_are_not_variables() {
        let analysis = analyze_source("t:([] a:1 2); r:select s:sum a from t");
        assert_eq!(find(&analysis, "a", 0).position, None);
        assert_eq!(find(&analysis, "s", 0).position, None);
        assert!(find(&analysis, "r", 0).is_assignment());
        assert!(find(&analysis, "t", 0).is_assignment());
    }

    #[test]
    fn queries_continue_across_indented_lines() {
        let analysis = analyze_source("f:{select\n  s:sum x\n  from t}; f 1");
        assert_eq!(find(&analysis, "s", 0).position, None);

        let analysis = analyze_source("r:select a,\n  s:sum b from t");
        assert_eq!(find(&analysis, "s", 0).position, None);
    }

    #[test]
    fn new_statement_line_ends_a_query() {
        let analysis = analyze_source("select a\nb:1");
        assert!(find(&analysis, "b", 0).is_assignment());
    }

    #[test]
    fn analysis_is_repeatable() {
        let cst = parse_source("f:{[a;b] c:a; {c+b}}; f[1;2]").expect("parse");
        let first = analyze(&cst);
        assert_eq!(first, analyze(&cst));

        // feeding the annotated tokens back through the front end changes nothing
        let tokens = first.tokens.iter().map(|token| token.token.clone()).collect();
        let again = analyze(&parse(tokens).expect("reparse"));
        assert_eq!(first, again);
    }
}
