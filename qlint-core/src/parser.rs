//! Recursive-descent parser producing a [`Cst`].
//!
//! The parser only recognises structure: lambdas, brackets, groups and
//! assignment operators. Scope and role questions are left to the
//! analyzer. An unbalanced delimiter is a hard error naming the token
//! index of the delimiter that was left open (or of the stray closer).

use tracing::trace;

use crate::cst::{Assignment, Bracket, CharLiteral, Cst, Group, Lambda, Node};
use crate::error::CoreError;
use crate::grammar::TokenKind;
use crate::lexer::{Token, tokenize};

/// Deepest allowed nesting of `{`, `[` and `(`. The parser and the
/// analyzer both recurse once per level.
pub const MAX_NESTING_DEPTH: usize = 128;

/// Parse a token sequence into a CST. Takes ownership of the tokens, which
/// the tree then carries.
pub fn parse(tokens: Vec<Token>) -> Result<Cst, CoreError> {
    let mut parser = Parser {
        tokens: &tokens,
        position: 0,
        depth: 0,
    };
    let script = parser.sequence(None)?;
    trace!(nodes = script.len(), "parsed script");
    Ok(Cst { tokens, script })
}

/// Tokenize and parse in one step.
pub fn parse_source(source: &str) -> Result<Cst, CoreError> {
    parse(tokenize(source)?)
}

struct Parser<'t> {
    tokens: &'t [Token],
    position: usize,
    depth: usize,
}

impl Parser<'_> {
    fn kind_at(&self, index: usize) -> Option<TokenKind> {
        self.tokens.get(index).map(|token| token.kind)
    }

    fn error(&self, index: usize, message: String) -> CoreError {
        CoreError::ParseError { index, message }
    }

    /// Parse expressions until `close` (the closer kind and its opener's
    /// index) or, at top level, until the end of input.
    fn sequence(&mut self, close: Option<(TokenKind, usize)>) -> Result<Vec<Node>, CoreError> {
        let mut nodes = Vec::new();
        loop {
            let Some(kind) = self.kind_at(self.position) else {
                return match close {
                    None => Ok(nodes),
                    Some((_, open)) => Err(self.unclosed(open)),
                };
            };
            match (kind, close) {
                (kind, Some((closer, _))) if kind == closer => return Ok(nodes),
                (TokenKind::RParen | TokenKind::RBracket | TokenKind::RCurly, Some((_, open))) => {
                    return Err(self.unclosed(open));
                }
                (TokenKind::RParen | TokenKind::RBracket | TokenKind::RCurly, None) => {
                    let text = &self.tokens[self.position].text;
                    return Err(self.error(self.position, format!("unmatched `{text}`")));
                }
                _ => nodes.push(self.expression()?),
            }
        }
    }

    /// Step over an opener, failing at it when it nests too deeply. Pair
    /// with [`Parser::leave`]; an error abandons the whole parse.
    fn enter(&mut self) -> Result<usize, CoreError> {
        let open = self.position;
        if self.depth >= MAX_NESTING_DEPTH {
            return Err(self.error(
                open,
                format!("nesting is too deep (maximum {MAX_NESTING_DEPTH} levels)"),
            ));
        }
        self.depth += 1;
        self.position += 1;
        Ok(open)
    }

    /// Step over the closer the current sequence stopped at.
    fn leave(&mut self) -> usize {
        self.depth -= 1;
        let close = self.position;
        self.position += 1;
        close
    }

    fn unclosed(&self, open: usize) -> CoreError {
        let text = &self.tokens[open].text;
        self.error(open, format!("unmatched `{text}`"))
    }

    fn expression(&mut self) -> Result<Node, CoreError> {
        let index = self.position;
        let kind = self.tokens[index].kind;

        if let Some(assignment) = self.assignment() {
            return Ok(Node::Assignment(assignment));
        }

        let node = match kind {
            TokenKind::Iterator => Node::Iterator(index),
            TokenKind::LCurly => return self.lambda().map(Node::Lambda),
            TokenKind::LBracket => return self.bracket().map(Node::Bracket),
            TokenKind::LParen => return self.group().map(Node::Group),
            TokenKind::StringBegin => return self.char_literal().map(Node::CharLiteral),
            TokenKind::Keyword => Node::Keyword(index),
            TokenKind::Identifier => Node::Identifier(index),
            TokenKind::Command => Node::Command(index),
            TokenKind::EndOfLine => Node::EndOfLine(index),
            TokenKind::Operator => Node::Operator(index),
            TokenKind::SemiColon => Node::SemiColon(index),
            kind if kind.is_trivia() => Node::Space(index),
            kind if kind.is_literal() => Node::Literal(index),
            _ => {
                let text = &self.tokens[index].text;
                return Err(self.error(index, format!("unexpected `{text}`")));
            }
        };
        self.position += 1;
        Ok(node)
    }

    /// `:` / `::`, or an operator followed (at most one whitespace token
    /// later) by one of them.
    fn assignment(&mut self) -> Option<Assignment> {
        let start = self.position;
        let is_colon = |kind: Option<TokenKind>| {
            matches!(kind, Some(TokenKind::Colon | TokenKind::DoubleColon))
        };

        let (operator, colon) = match self.kind_at(start) {
            Some(TokenKind::Colon | TokenKind::DoubleColon) => (None, start),
            Some(TokenKind::Operator) if is_colon(self.kind_at(start + 1)) => {
                (Some(start), start + 1)
            }
            Some(TokenKind::Operator)
                if self.kind_at(start + 1) == Some(TokenKind::Whitespace)
                    && is_colon(self.kind_at(start + 2)) =>
            {
                (Some(start), start + 2)
            }
            _ => return None,
        };

        self.position = colon + 1;
        Some(Assignment {
            operator,
            colon,
            global: self.tokens[colon].kind == TokenKind::DoubleColon,
        })
    }

    fn lambda(&mut self) -> Result<Lambda, CoreError> {
        let open = self.enter()?;

        let mut params = None;
        let mut lookahead = self.position;
        while self.kind_at(lookahead) == Some(TokenKind::Whitespace) {
            lookahead += 1;
        }
        if self.kind_at(lookahead) == Some(TokenKind::LBracket) {
            self.position = lookahead;
            params = Some(self.bracket()?);
        }

        let body = self.sequence(Some((TokenKind::RCurly, open)))?;
        let close = self.leave();
        Ok(Lambda {
            open,
            params,
            body,
            close,
        })
    }

    fn bracket(&mut self) -> Result<Bracket, CoreError> {
        let open = self.enter()?;
        let items = self.sequence(Some((TokenKind::RBracket, open)))?;
        let close = self.leave();
        Ok(Bracket { open, items, close })
    }

    fn group(&mut self) -> Result<Group, CoreError> {
        let open = self.enter()?;
        let items = self.sequence(Some((TokenKind::RParen, open)))?;
        let close = self.leave();
        Ok(Group { open, items, close })
    }

    fn char_literal(&mut self) -> Result<CharLiteral, CoreError> {
        let begin = self.position;
        let mut at = begin + 1;
        while let Some(kind) = self.kind_at(at) {
            match kind {
                TokenKind::StringEnd => {
                    self.position = at + 1;
                    return Ok(CharLiteral { begin, end: at });
                }
                TokenKind::StringText | TokenKind::StringEscape => at += 1,
                _ => break,
            }
        }
        Err(self.unclosed(begin))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_assignment() {
        let cst = parse_source("a:1").expect("parse");
        assert_eq!(
            cst.script,
            vec![
                Node::Identifier(0),
                Node::Assignment(Assignment {
                    operator: None,
                    colon: 1,
                    global: false
                }),
                Node::Literal(2),
            ]
        );
    }

    #[test]
    fn parses_compound_and_global_assignment() {
        let cst = parse_source("a+:1;b::2").expect("parse");
        assert_eq!(
            cst.script[1],
            Node::Assignment(Assignment {
                operator: Some(1),
                colon: 2,
                global: false
            })
        );
        assert_eq!(
            cst.script[5],
            Node::Assignment(Assignment {
                operator: None,
                colon: 6,
                global: true
            })
        );
    }

    #[test]
    fn operator_without_colon_is_plain() {
        let cst = parse_source("a+b").expect("parse");
        assert_eq!(cst.script[1], Node::Operator(1));
    }

    #[test]
    fn parses_lambda_with_params() {
        let cst = parse_source("{ [a;b] a}").expect("parse");
        let Node::Lambda(lambda) = &cst.script[0] else {
            panic!("expected lambda");
        };
        assert_eq!(lambda.open, 0);
        let params = lambda.params.as_ref().expect("params");
        assert_eq!((params.open, params.close), (2, 6));
        assert_eq!(
            params.items,
            vec![Node::Identifier(3), Node::SemiColon(4), Node::Identifier(5)]
        );
        assert_eq!(lambda.body, vec![Node::Space(7), Node::Identifier(8)]);
        assert_eq!(lambda.close, 9);
    }

    #[test]
    fn bracket_after_body_is_not_params() {
        let cst = parse_source("{x[0]}").expect("parse");
        let Node::Lambda(lambda) = &cst.script[0] else {
            panic!("expected lambda");
        };
        assert!(lambda.params.is_none());
        assert!(matches!(lambda.body[1], Node::Bracket(_)));
    }

    #[test]
    fn nests_lambdas_inside_groups() {
        let cst = parse_source("{(g;{y})}").expect("parse");
        let Node::Lambda(outer) = &cst.script[0] else {
            panic!("expected lambda");
        };
        let Node::Group(group) = &outer.body[0] else {
            panic!("expected group");
        };
        assert!(matches!(&group.items[2], Node::Lambda(inner) if inner.open == 4));
    }

    #[test]
    fn accepts_nesting_up_to_the_limit() {
        let depth = MAX_NESTING_DEPTH;
        let source = "(".repeat(depth) + "1" + &")".repeat(depth);
        assert!(parse_source(&source).is_ok());
    }

    #[test]
    fn rejects_deep_nesting_at_the_offending_opener() {
        let source = "(".repeat(50_000) + "1" + &")".repeat(50_000);
        let err = parse_source(&source).unwrap_err();
        assert_eq!(err.token_index(), Some(MAX_NESTING_DEPTH));
        assert!(err.to_string().contains("nesting is too deep"));

        let mixed = "{[".repeat(MAX_NESTING_DEPTH) + &"]}".repeat(MAX_NESTING_DEPTH);
        assert!(matches!(
            parse_source(&mixed),
            Err(CoreError::ParseError { index, .. }) if index == MAX_NESTING_DEPTH
        ));
    }

    #[test]
    fn reports_unmatched_openers() {
        for (source, index) in [("{[a] a", 0), ("f[1;2", 1), ("(1 2", 0), ("{a:(1}", 3)] {
            let err = parse_source(source).unwrap_err();
            assert_eq!(err.token_index(), Some(index), "source {source:?}");
        }
    }

    #[test]
    fn reports_stray_closer() {
        let err = parse_source("a:1)").unwrap_err();
        assert_eq!(err.token_index(), Some(3));
    }

    #[test]
    fn parses_char_literal_as_one_node() {
        let cst = parse_source("\"a\\nb\"").expect("parse");
        assert_eq!(cst.script, vec![Node::CharLiteral(CharLiteral { begin: 0, end: 4 })]);
    }
}
