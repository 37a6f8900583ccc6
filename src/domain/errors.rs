//! Domain error types
//!
//! This module defines the error hierarchy for pg-obfuscator.
//! All errors are domain-specific and don't expose third-party types.

use thiserror::Error;

/// Main pg-obfuscator error type
///
/// This is the primary error type used throughout the application.
/// Per-table pipeline failures are classified by variant so the coordinator
/// can decide what is retryable and what is reported.
#[derive(Debug, Error)]
pub enum ObfuscatorError {
    /// Configuration-related errors (unreadable or malformed settings)
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// The obfuscation config still has columns waiting for a manual fix
    #[error("Configuration is not ready:\n{0}")]
    ConfigurationInvalid(String),

    /// Database-related errors
    #[error("Database error: {0}")]
    Database(String),

    /// The anonymization delegate failed or produced malformed output
    #[error("Anonymization delegate failed for table '{table}': {message}")]
    Delegate { table: String, message: String },

    /// Obfuscated and preserved streams do not have the same number of rows
    #[error(
        "Stream alignment failure for table '{table}': obfuscated stream has {obfuscated_rows} rows, preserved stream has {preserved_rows} rows"
    )]
    StreamAlignment {
        table: String,
        obfuscated_rows: usize,
        preserved_rows: usize,
    },

    /// A `method` fake-data override names a generator that does not exist
    #[error("Unknown fake data generator: {0}")]
    UnknownFakeGenerator(String),

    /// Fake-data substitution failed (e.g. unresolved pattern placeholder)
    #[error("Fake data error: {0}")]
    FakeData(String),

    /// Retryable I/O failure (bulk copy, process spawn)
    #[error("Transient I/O error: {0}")]
    TransientIo(String),

    /// Operation exceeded its configured timeout
    #[error("Timeout: {0}")]
    Timeout(String),

    /// Serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(String),

    /// Generic errors with context
    #[error("{0}")]
    Other(String),
}

impl ObfuscatorError {
    /// Whether the error may go away on a retry
    ///
    /// Only transport-level failures qualify. Data-correctness failures
    /// (alignment, delegate output, configuration) are never retried.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::TransientIo(_) | Self::Timeout(_))
    }

    /// Short label used in summaries and structured logs
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Configuration(_) => "configuration",
            Self::ConfigurationInvalid(_) => "configuration_invalid",
            Self::Database(_) => "database",
            Self::Delegate { .. } => "delegate",
            Self::StreamAlignment { .. } => "stream_alignment",
            Self::UnknownFakeGenerator(_) => "unknown_fake_generator",
            Self::FakeData(_) => "fake_data",
            Self::TransientIo(_) => "transient_io",
            Self::Timeout(_) => "timeout",
            Self::Serialization(_) => "serialization",
            Self::Io(_) => "io",
            Self::Other(_) => "other",
        }
    }
}

// Conversion from std::io::Error
impl From<std::io::Error> for ObfuscatorError {
    fn from(err: std::io::Error) -> Self {
        ObfuscatorError::Io(err.to_string())
    }
}

// Conversion from serde_json::Error
impl From<serde_json::Error> for ObfuscatorError {
    fn from(err: serde_json::Error) -> Self {
        ObfuscatorError::Serialization(err.to_string())
    }
}

// Conversion from toml parse errors
impl From<toml::de::Error> for ObfuscatorError {
    fn from(err: toml::de::Error) -> Self {
        ObfuscatorError::Configuration(format!("TOML parse error: {err}"))
    }
}

impl From<toml::ser::Error> for ObfuscatorError {
    fn from(err: toml::ser::Error) -> Self {
        ObfuscatorError::Serialization(format!("TOML serialization error: {err}"))
    }
}

impl From<csv::Error> for ObfuscatorError {
    fn from(err: csv::Error) -> Self {
        ObfuscatorError::Io(format!("CSV error: {err}"))
    }
}

impl From<tokio_postgres::Error> for ObfuscatorError {
    fn from(err: tokio_postgres::Error) -> Self {
        // Closed connections surface as transport errors worth another attempt
        if err.is_closed() {
            ObfuscatorError::TransientIo(format!("Connection closed: {err}"))
        } else {
            ObfuscatorError::Database(err.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = ObfuscatorError::Configuration("Invalid config".to_string());
        assert_eq!(err.to_string(), "Configuration error: Invalid config");
    }

    #[test]
    fn test_stream_alignment_display() {
        let err = ObfuscatorError::StreamAlignment {
            table: "users".to_string(),
            obfuscated_rows: 3,
            preserved_rows: 4,
        };
        let message = err.to_string();
        assert!(message.contains("users"));
        assert!(message.contains("3 rows"));
        assert!(message.contains("4 rows"));
    }

    #[test]
    fn test_transient_classification() {
        assert!(ObfuscatorError::TransientIo("spawn".to_string()).is_transient());
        assert!(ObfuscatorError::Timeout("copy".to_string()).is_transient());
        assert!(!ObfuscatorError::Delegate {
            table: "t".to_string(),
            message: "exit 1".to_string()
        }
        .is_transient());
        assert!(!ObfuscatorError::StreamAlignment {
            table: "t".to_string(),
            obfuscated_rows: 1,
            preserved_rows: 2
        }
        .is_transient());
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "File not found");
        let err: ObfuscatorError = io_err.into();
        assert!(matches!(err, ObfuscatorError::Io(_)));
    }

    #[test]
    fn test_serde_json_error_conversion() {
        let json_err = serde_json::from_str::<serde_json::Value>("invalid json").unwrap_err();
        let err: ObfuscatorError = json_err.into();
        assert!(matches!(err, ObfuscatorError::Serialization(_)));
    }

    #[test]
    fn test_toml_error_conversion() {
        let toml_err = toml::from_str::<toml::Value>("invalid = toml = syntax").unwrap_err();
        let err: ObfuscatorError = toml_err.into();
        assert!(matches!(err, ObfuscatorError::Configuration(_)));
        assert!(err.to_string().contains("TOML parse error"));
    }

    #[test]
    fn test_error_kind_labels() {
        assert_eq!(
            ObfuscatorError::UnknownFakeGenerator("x".to_string()).kind(),
            "unknown_fake_generator"
        );
        assert_eq!(
            ObfuscatorError::ConfigurationInvalid(String::new()).kind(),
            "configuration_invalid"
        );
    }
}
