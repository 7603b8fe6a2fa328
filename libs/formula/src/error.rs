//! Error types for the formula engine

use crate::diagnostics::Validation;
use thiserror::Error;

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

/// Formula engine errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    #[error("formula is {len} bytes, limit is {limit}")]
    FormulaTooLong { len: usize, limit: usize },

    #[error("lex error at offset {position}: {message}")]
    Lex { message: String, position: usize },

    #[error("expected {expected}, got {found} at offset {position}")]
    UnexpectedToken {
        expected: String,
        found: String,
        position: usize,
    },

    #[error("expected {expected}, but reached end of input")]
    UnexpectedEof { expected: String },

    #[error("empty list at offset {position}")]
    EmptyList { position: usize },

    #[error("unknown function: {name}")]
    UnknownFunction { name: String, position: usize },

    #[error("unknown identifier: {name}")]
    UnknownIdentifier { name: String, position: usize },

    #[error("unknown property: {name}")]
    UnknownProperty { name: String, position: usize },

    #[error("expression too deeply nested (max depth: {max})")]
    TooDeep { max: usize },

    #[error("formula rejected: {0}")]
    Rejected(Validation),

    #[error("type mismatch: {0}")]
    TypeMismatch(String),

    #[error("unknown planet reached the evaluator: {0}")]
    UnknownPlanet(String),

    #[error("unknown sign reached the evaluator: {0}")]
    UnknownSign(String),

    #[error("outermost formula does not reduce to a boolean")]
    NotABoolean,

    #[error("internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Whether this error originates in lexing or parsing (as opposed to
    /// validation or evaluation). Drives the CLI exit-code mapping.
    pub fn is_syntax_error(&self) -> bool {
        matches!(
            self,
            Error::FormulaTooLong { .. }
                | Error::Lex { .. }
                | Error::UnexpectedToken { .. }
                | Error::UnexpectedEof { .. }
                | Error::EmptyList { .. }
                | Error::UnknownFunction { .. }
                | Error::UnknownIdentifier { .. }
                | Error::UnknownProperty { .. }
                | Error::TooDeep { .. }
        )
    }
}
