//! Error taxonomy for a single run.
//!
//! Every component returns [`RunError`] and nothing retries locally: the
//! scheduler that invokes the binary owns retry decisions, so errors are
//! propagated to `main` untouched.

use thiserror::Error;

/// Result type used throughout the crate.
pub type Result<T> = std::result::Result<T, RunError>;

/// Errors a run can end with.
#[derive(Debug, Error)]
pub enum RunError {
    /// Every candidate in the checked window was already visited.
    #[error("no unvisited item among the first {checked} candidates")]
    NotFound { checked: usize },

    /// Fetched markup could not be turned into article text.
    #[error("parse error: {0}")]
    Parse(String),

    /// A network call failed, returned a non-success status, or returned a
    /// body that did not match the service contract.
    #[error("fetch error: {0}")]
    Fetch(String),

    /// A tool received input that violates its contract.
    #[error("validation error: {0}")]
    Validation(String),

    /// Missing credentials or an unreadable configuration file.
    #[error("configuration error: {0}")]
    Config(String),
}

impl RunError {
    /// Whether the run ended normally with nothing to do.
    pub fn is_not_found(&self) -> bool {
        matches!(self, RunError::NotFound { .. })
    }
}

impl From<reqwest::Error> for RunError {
    fn from(e: reqwest::Error) -> Self {
        match e.url() {
            Some(url) => RunError::Fetch(format!("{url}: {e}")),
            None => RunError::Fetch(e.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_message_includes_window() {
        let err = RunError::NotFound { checked: 100 };
        assert_eq!(
            err.to_string(),
            "no unvisited item among the first 100 candidates"
        );
        assert!(err.is_not_found());
    }

    #[test]
    fn test_other_variants_are_not_not_found() {
        assert!(!RunError::Parse("empty".into()).is_not_found());
        assert!(!RunError::Validation("too long".into()).is_not_found());
    }
}
