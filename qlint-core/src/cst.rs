//! Concrete syntax tree.
//!
//! Nodes refer to tokens by their index in [`Cst::tokens`]; the tree only
//! records nesting and never copies token text.

use crate::lexer::Token;

/// A parsed compilation unit: the tokens plus the tree over them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cst {
    pub tokens: Vec<Token>,
    pub script: Vec<Node>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    Iterator(usize),
    Assignment(Assignment),
    Lambda(Lambda),
    Bracket(Bracket),
    Group(Group),
    Literal(usize),
    CharLiteral(CharLiteral),
    Keyword(usize),
    Identifier(usize),
    Command(usize),
    EndOfLine(usize),
    /// Whitespace or a comment.
    Space(usize),
    Operator(usize),
    SemiColon(usize),
}

/// `:` or `::`, optionally preceded by an operator (`+:`, `,:`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Assignment {
    pub operator: Option<usize>,
    pub colon: usize,
    /// Written with `::`.
    pub global: bool,
}

/// `{[params] body}`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Lambda {
    pub open: usize,
    pub params: Option<Bracket>,
    pub body: Vec<Node>,
    pub close: usize,
}

/// `[items]`, used for indexing, application and parameter lists.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bracket {
    pub open: usize,
    pub items: Vec<Node>,
    pub close: usize,
}

/// `(items)`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Group {
    pub open: usize,
    pub items: Vec<Node>,
    pub close: usize,
}

/// `"..."`; the content tokens lie strictly between `begin` and `end`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CharLiteral {
    pub begin: usize,
    pub end: usize,
}

impl Node {
    pub fn is_space(&self) -> bool {
        matches!(self, Node::Space(_))
    }
}
