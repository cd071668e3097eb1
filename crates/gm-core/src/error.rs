//! Error types for gwmarg

use thiserror::Error;

/// gwmarg error type
#[derive(Error, Debug)]
pub enum Error {
    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON parsing error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Validation error (malformed input shapes or values)
    #[error("Validation error: {0}")]
    Validation(String),

    /// Computation error (non-finite intermediate values)
    #[error("Computation error: {0}")]
    Computation(String),

    /// Waveform model rejected a non-physical parameter assignment
    #[error("Physical parameter error: {0}")]
    PhysicalParameter(String),

    /// Construction-time invariant violation
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// A required parameter was not supplied
    #[error("Missing parameter: {0}")]
    MissingParameter(String),

    /// A parameter that the model does not recognize was supplied
    #[error("Unknown parameter: {0}")]
    UnknownParameter(String),

    /// The likelihood is zero (log = -inf) everywhere on a marginalization grid
    #[error("Degenerate likelihood: {0}")]
    DegenerateLikelihood(String),
}

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_names_parameter() {
        let e = Error::MissingParameter("s1z".to_string());
        assert_eq!(e.to_string(), "Missing parameter: s1z");
    }

    #[test]
    fn test_io_conversion() {
        fn read() -> Result<String> {
            Ok(std::fs::read_to_string("/definitely/not/a/real/path.json")?)
        }
        assert!(matches!(read(), Err(Error::Io(_))));
    }
}
