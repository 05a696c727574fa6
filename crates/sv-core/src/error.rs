//! Error types for SurvStat

use thiserror::Error;

/// SurvStat error type
#[derive(Error, Debug)]
pub enum Error {
    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Invalid input (bad column name, wrong length, non-nested models, ...)
    #[error("Validation error: {0}")]
    Validation(String),

    /// Numerical failure (singular or ill-conditioned design, sampler breakdown)
    #[error("Computation error: {0}")]
    Computation(String),
}

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_prefixes() {
        let e = Error::Validation("column 'x' not found".into());
        assert_eq!(e.to_string(), "Validation error: column 'x' not found");
        let e = Error::Computation("singular".into());
        assert!(e.to_string().starts_with("Computation error"));
    }

    #[test]
    fn test_io_from() {
        fn open() -> Result<()> {
            std::fs::read("/definitely/not/here/survstat")?;
            Ok(())
        }
        assert!(matches!(open(), Err(Error::Io(_))));
    }
}
