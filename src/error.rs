//! Error types raised by parsing and evaluation.
//!
//! Two kinds: a [`FormatError`] for grammar or shape problems and a
//! [`RollerError`] for the pluggable randomness source.

use crate::grammar::Rule;

/// Result type used throughout the crate.
pub type Result<T> = std::result::Result<T, RollError>;

/// Parse-time or eval-time shape problem: unknown tokens, missing mandatory
/// operands, invalid counting-operator suffixes, or out-of-range dice
/// counts/sides.
#[derive(Debug, thiserror::Error)]
#[error("{message} (in `{expression}`)")]
pub struct FormatError {
    pub message: String,
    pub expression: String,
    pub position: Option<usize>,
}

impl FormatError {
    pub fn new(message: impl Into<String>, expression: impl Into<String>) -> Self {
        FormatError {
            message: message.into(),
            expression: expression.into(),
            position: None,
        }
    }

    pub fn at(message: impl Into<String>, expression: impl Into<String>, position: usize) -> Self {
        FormatError {
            message: message.into(),
            expression: expression.into(),
            position: Some(position),
        }
    }
}

/// Errors surfaced by a [`crate::roller::Roller`] implementation.
#[derive(Debug, thiserror::Error)]
pub enum RollerError {
    /// A `PreRolled` roller ran out of queued values.
    #[error("pre-rolled queue exhausted")]
    Exhausted,
    /// A supplied value fell outside the requested interval or value set.
    #[error("value {value} out of range for request {requested}")]
    OutOfRange { value: i64, requested: String },
}

/// Either a grammar/shape [`FormatError`] or a [`RollerError`] from the
/// pluggable randomness source.
#[derive(Debug, thiserror::Error)]
pub enum RollError {
    #[error(transparent)]
    Format(#[from] FormatError),
    #[error(transparent)]
    Roller(#[from] RollerError),
}

impl From<pest::error::Error<Rule>> for RollError {
    fn from(e: pest::error::Error<Rule>) -> Self {
        let position = match e.location {
            pest::error::InputLocation::Pos(p) => Some(p),
            pest::error::InputLocation::Span((s, _)) => Some(s),
        };
        RollError::Format(FormatError {
            message: format!("{e}"),
            expression: String::new(),
            position,
        })
    }
}

impl From<&str> for RollError {
    fn from(e: &str) -> Self {
        RollError::Format(FormatError::new(e, ""))
    }
}

impl From<String> for RollError {
    fn from(e: String) -> Self {
        RollError::Format(FormatError::new(e, ""))
    }
}
