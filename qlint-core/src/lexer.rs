//! Tokenizer for q source text.
//!
//! Every byte of the input ends up in exactly one token: whitespace,
//! newlines and comments are kept, so concatenating the token texts in
//! order gives back the source. Lexing is all-or-nothing: the first
//! position no grammar category matches aborts with
//! [`CoreError::LexError`].

use serde::Serialize;
use tracing::trace;

use crate::error::CoreError;
use crate::grammar::{Cursor, GRAMMAR, Matcher, STRING_GRAMMAR, TokenKind};
use crate::span::{LineIndex, Position, Span};

/// A single classified piece of source text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Token {
    /// Position in the token sequence, assigned once.
    pub index: usize,
    pub kind: TokenKind,
    /// Byte offsets into the source.
    pub span: Span,
    /// Line and column of the first character.
    pub position: Position,
    pub text: String,
}

/// Which grammar table the lexer is matching against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    Code,
    String,
}

/// Lex a source string into tokens.
pub fn tokenize(source: &str) -> Result<Vec<Token>, CoreError> {
    let mut lexer = Lexer {
        source,
        index: 0,
        line: 0,
        column: 0,
        mode: Mode::Code,
        tokens: Vec::new(),
    };
    lexer.run()?;
    trace!(tokens = lexer.tokens.len(), bytes = source.len(), "tokenized source");
    Ok(lexer.tokens)
}

struct Lexer<'src> {
    source: &'src str,
    index: usize,
    line: u32,
    column: u32,
    mode: Mode,
    tokens: Vec<Token>,
}

impl<'src> Lexer<'src> {
    fn run(&mut self) -> Result<(), CoreError> {
        let mut string_start = 0;

        while self.index < self.source.len() {
            let table: &[(TokenKind, Matcher)] = match self.mode {
                Mode::Code => GRAMMAR,
                Mode::String => STRING_GRAMMAR,
            };
            let cursor = Cursor::new(self.source, self.index);
            let matched = table
                .iter()
                .find_map(|(kind, matcher)| matcher(&cursor).map(|len| (*kind, len)));

            let Some((kind, len)) = matched.filter(|(_, len)| *len > 0) else {
                return Err(match self.mode {
                    Mode::String => self.error(string_start, "unterminated char literal"),
                    Mode::Code => self.error(self.index, "unexpected character"),
                });
            };

            match kind {
                TokenKind::StringBegin => {
                    string_start = self.index;
                    self.mode = Mode::String;
                }
                TokenKind::StringEnd => self.mode = Mode::Code,
                _ => {}
            }
            self.push(kind, len);
        }

        if self.mode == Mode::String {
            return Err(self.error(string_start, "unterminated char literal"));
        }
        Ok(())
    }

    fn push(&mut self, kind: TokenKind, len: usize) {
        let start = self.index;
        let end = start + len;
        let text = &self.source[start..end];
        let position = Position {
            line: self.line,
            column: self.column,
        };

        for ch in text.chars() {
            if ch == '\n' {
                self.line += 1;
                self.column = 0;
            } else {
                self.column += 1;
            }
        }

        self.tokens.push(Token {
            index: self.tokens.len(),
            kind,
            span: Span::new(start as u32, end as u32),
            position,
            text: text.to_string(),
        });
        self.index = end;
    }

    fn error(&self, position: usize, message: &str) -> CoreError {
        let Position { line, column } = if position == self.index {
            Position {
                line: self.line,
                column: self.column,
            }
        } else {
            LineIndex::new(self.source).position(self.source, position as u32)
        };
        CoreError::LexError {
            position,
            line,
            column,
            message: message.to_string(),
        }
    }
}
