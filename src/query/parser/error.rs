// Specification Parse Errors
//
// Every parse error carries the offending key, line, token or fragment so a
// bad specification can be fixed without re-running.

use thiserror::Error;

/// Errors raised while turning specification text into a `Specification`
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ParseError {
    /// The text cannot be tokenized into `key: value` lines or values
    #[error("Malformed input on line {line}: {reason}")]
    MalformedInput { line: usize, reason: String },

    /// A key outside `S, n, V, F, sig, G`
    #[error("Unknown key: {0}")]
    UnknownKey(String),

    /// A scan predicate fragment that cannot be compiled
    #[error("Invalid predicate '{fragment}': {reason}")]
    PredicateError { fragment: String, reason: String },

    /// An aggregate token in `F` that does not name a valid aggregate
    #[error("Invalid aggregate '{token}': {reason}")]
    InvalidAggregate { token: String, reason: String },

    /// A required key never appeared
    #[error("Missing required key: {0}")]
    MissingKey(&'static str),
}

impl ParseError {
    pub(crate) fn malformed(line: usize, reason: impl Into<String>) -> Self {
        ParseError::MalformedInput {
            line,
            reason: reason.into(),
        }
    }

    pub(crate) fn predicate(fragment: &str, reason: impl Into<String>) -> Self {
        ParseError::PredicateError {
            fragment: fragment.to_string(),
            reason: reason.into(),
        }
    }

    pub(crate) fn aggregate(token: &str, reason: impl Into<String>) -> Self {
        ParseError::InvalidAggregate {
            token: token.to_string(),
            reason: reason.into(),
        }
    }
}

/// Result type for parsing operations
pub type ParseResult<T> = Result<T, ParseError>;
