//! Error types for cvstruct.

use thiserror::Error;

/// Result type for cvstruct operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for cvstruct operations.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum Error {
    /// Invalid input provided.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Classification oracle failed.
    #[error("Oracle failure: {0}")]
    Oracle(String),

    /// Configuration error (bad threshold value or key).
    #[error("Configuration error: {0}")]
    Config(String),

    /// Serialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl Error {
    /// Create an invalid input error.
    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Error::InvalidInput(msg.into())
    }

    /// Create an oracle failure error.
    pub fn oracle(msg: impl Into<String>) -> Self {
        Error::Oracle(msg.into())
    }

    /// Create a configuration error.
    pub fn config(msg: impl Into<String>) -> Self {
        Error::Config(msg.into())
    }
}

/// Explicit fallback outcome for heuristics that can degrade or reject.
///
/// The extraction pipeline never raises for well-formed input; instead,
/// every fallback path is visible in the return type. `Degraded` carries a
/// usable value plus the reason quality was reduced; `Rejected` carries
/// only the reason.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome<T> {
    /// Full-quality result.
    Ok(T),
    /// Usable result produced through a fallback path.
    Degraded(T, String),
    /// No usable result; evidence was treated as "not this type".
    Rejected(String),
}

impl<T> Outcome<T> {
    /// The carried value, if any.
    pub fn value(self) -> Option<T> {
        match self {
            Outcome::Ok(v) | Outcome::Degraded(v, _) => Some(v),
            Outcome::Rejected(_) => None,
        }
    }

    /// Borrow the carried value, if any.
    pub fn value_ref(&self) -> Option<&T> {
        match self {
            Outcome::Ok(v) | Outcome::Degraded(v, _) => Some(v),
            Outcome::Rejected(_) => None,
        }
    }

    /// True when the outcome went through a fallback path.
    #[must_use]
    pub fn is_degraded(&self) -> bool {
        matches!(self, Outcome::Degraded(..))
    }

    /// True when no usable value was produced.
    #[must_use]
    pub fn is_rejected(&self) -> bool {
        matches!(self, Outcome::Rejected(_))
    }

    /// The degradation/rejection reason, if any.
    pub fn reason(&self) -> Option<&str> {
        match self {
            Outcome::Ok(_) => None,
            Outcome::Degraded(_, r) | Outcome::Rejected(r) => Some(r),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn outcome_value_extraction() {
        assert_eq!(Outcome::Ok(3).value(), Some(3));
        assert_eq!(Outcome::Degraded(5, "fallback".into()).value(), Some(5));
        assert_eq!(Outcome::<i32>::Rejected("no".into()).value(), None);
    }

    #[test]
    fn outcome_flags() {
        let d = Outcome::Degraded((), "mock oracle".into());
        assert!(d.is_degraded());
        assert!(!d.is_rejected());
        assert_eq!(d.reason(), Some("mock oracle"));
    }
}
