use thiserror::Error;

/// Error types for the engine core and its protocol session
#[derive(Debug, Clone, Error, PartialEq)]
pub enum EngineError {
    /// Unknown command token or wrong argument shape
    #[error("Invalid command: {0}")]
    InvalidCommand(String),
    /// Move token that cannot be parsed into a square pair
    #[error("Invalid move: {0}")]
    InvalidMove(String),
    /// Well-formed move that the rules collaborator refused to apply
    #[error("Illegal move: {0}")]
    IllegalMove(String),
    /// Malformed FEN string
    #[error("Invalid FEN '{fen}': {reason}")]
    InvalidFen { fen: String, reason: String },
    /// Board that is not exactly 8x8 or contains unknown piece codes
    #[error("Invalid board shape: {0}")]
    InvalidBoardShape(String),
    /// setoption for an option the session does not know
    #[error("Unknown option: {0}")]
    UnknownOption(String),
    /// setoption value that does not fit the option's type or range
    #[error("Invalid value '{value}' for option {name}: expected {expected}")]
    InvalidOptionValue {
        name: String,
        value: String,
        expected: String,
    },
    /// Search could not be started or failed while running
    #[error("Search error: {0}")]
    SearchError(String),
    /// Configuration error
    #[error("Configuration error: {0}")]
    ConfigurationError(String),
    /// File I/O operation failed
    #[error("I/O error: {0}")]
    IoError(String),
    /// Serialization or deserialization failed
    #[error("Serialization error: {0}")]
    SerializationError(String),
}

// Convenience type alias
pub type Result<T> = std::result::Result<T, EngineError>;

impl EngineError {
    pub fn invalid_fen(fen: &str, reason: impl Into<String>) -> Self {
        EngineError::InvalidFen {
            fen: fen.to_string(),
            reason: reason.into(),
        }
    }
}

impl From<std::io::Error> for EngineError {
    fn from(error: std::io::Error) -> Self {
        EngineError::IoError(error.to_string())
    }
}

impl From<serde_json::Error> for EngineError {
    fn from(error: serde_json::Error) -> Self {
        EngineError::SerializationError(format!("JSON: {error}"))
    }
}

impl From<bincode::Error> for EngineError {
    fn from(error: bincode::Error) -> Self {
        EngineError::SerializationError(format!("binary: {error}"))
    }
}

impl From<std::num::ParseIntError> for EngineError {
    fn from(error: std::num::ParseIntError) -> Self {
        EngineError::InvalidCommand(format!("expected an integer: {error}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let error = EngineError::invalid_fen("xyz", "expected 8 ranks");
        assert_eq!(error.to_string(), "Invalid FEN 'xyz': expected 8 ranks");

        let error = EngineError::InvalidOptionValue {
            name: "Hash".to_string(),
            value: "abc".to_string(),
            expected: "integer in 1..=1024".to_string(),
        };
        assert!(error.to_string().contains("Hash"));
        assert!(error.to_string().contains("1..=1024"));
    }

    #[test]
    fn test_parse_int_conversion() {
        let parsed: Result<u32> = "12a".parse::<u32>().map_err(EngineError::from);
        assert!(matches!(parsed, Err(EngineError::InvalidCommand(_))));
    }
}
