//! Unified error type for hub planning
//!
//! [`HubGridError`] covers the failures that can surface while building the
//! inputs of a run: malformed demand profiles, invalid configuration and
//! parse problems. Solver-side failures have their own type in `hubgrid-algo`.

use thiserror::Error;

/// Unified error type for all hubgrid input handling.
#[derive(Error, Debug)]
pub enum HubGridError {
    /// I/O errors (file access)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Parsing/deserialization errors
    #[error("Parse error: {0}")]
    Parse(String),

    /// Demand profile violates ordering, step or sign invariants
    #[error("Invalid demand profile: {0}")]
    Profile(String),

    /// Missing or inconsistent configuration (empty catalog, bad SOC bounds, ...)
    #[error("Configuration error: {0}")]
    Config(String),

    /// Generic errors (for wrapping external errors)
    #[error("{0}")]
    Other(String),
}

/// Convenience type alias for Results using HubGridError.
pub type HubGridResult<T> = Result<T, HubGridError>;

impl From<anyhow::Error> for HubGridError {
    fn from(err: anyhow::Error) -> Self {
        HubGridError::Other(err.to_string())
    }
}

impl From<String> for HubGridError {
    fn from(s: String) -> Self {
        HubGridError::Other(s)
    }
}

impl From<&str> for HubGridError {
    fn from(s: &str) -> Self {
        HubGridError::Other(s.to_string())
    }
}

impl From<serde_json::Error> for HubGridError {
    fn from(err: serde_json::Error) -> Self {
        HubGridError::Parse(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = HubGridError::Config("transformer catalog is empty".into());
        assert!(err.to_string().contains("Configuration error"));
        assert!(err.to_string().contains("transformer catalog"));
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "profile.csv");
        let err: HubGridError = io_err.into();
        assert!(matches!(err, HubGridError::Io(_)));
    }

    #[test]
    fn test_question_mark_operator() {
        fn inner() -> HubGridResult<()> {
            Err(HubGridError::Profile("offsets not increasing".into()))
        }

        fn outer() -> HubGridResult<()> {
            inner()?;
            Ok(())
        }

        assert!(matches!(outer(), Err(HubGridError::Profile(_))));
    }
}
