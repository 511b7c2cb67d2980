use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("failed to read source: {0}")]
    SourceIo(#[from] std::io::Error),
    #[error("lex error at {line}:{column} (byte {position}): {message}")]
    LexError {
        position: usize,
        line: u32,
        column: u32,
        message: String,
    },
    #[error("parse error at token {index}: {message}")]
    ParseError { index: usize, message: String },
}

impl CoreError {
    /// Token index named by a parse error, if this is one.
    pub fn token_index(&self) -> Option<usize> {
        match self {
            CoreError::ParseError { index, .. } => Some(*index),
            _ => None,
        }
    }
}
