//! Error types for reclaimx-core

use thiserror::Error;

/// Main error type for the reclaimx-core library
#[derive(Error, Debug)]
pub enum Error {
    /// Backing storage unreachable or unwritable
    #[error("storage unavailable: {0}")]
    Io(#[from] std::io::Error),

    /// CSV codec failure that is not attributable to a single row
    #[error("storage format error: {0}")]
    Csv(#[from] csv::Error),

    /// Table header does not match the record's column list
    #[error("schema mismatch in {table}: expected v{version} columns [{expected}], found [{found}]")]
    Schema {
        table: &'static str,
        version: u32,
        expected: String,
        found: String,
    },

    /// Registration with a phone number that already exists
    #[error("phone number already registered: {0}")]
    DuplicatePhone(String),

    /// Authentication failure. Deliberately does not say which field was wrong.
    #[error("invalid phone number or password")]
    InvalidCredentials,

    /// Status update on an unknown report id
    #[error("report not found: {0}")]
    NotFound(u64),

    /// Corrupt row encountered while loading a table
    #[error("malformed record at line {line}: {reason}")]
    MalformedRecord { line: u64, reason: String },

    /// Caller supplied an empty or unrecognized value
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Password hashing backend failure
    #[error("credential hashing failed: {0}")]
    Credential(String),

    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),
}

/// Result type alias for reclaimx-core
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages_are_distinct() {
        let messages = [
            Error::DuplicatePhone("111".to_string()).to_string(),
            Error::InvalidCredentials.to_string(),
            Error::NotFound(42).to_string(),
            Error::Io(std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"))
                .to_string(),
        ];

        assert!(messages[0].contains("already registered"));
        assert!(messages[1].contains("invalid"));
        assert!(messages[2].contains("not found"));
        assert!(messages[3].contains("storage unavailable"));
    }

    #[test]
    fn test_invalid_credentials_does_not_leak_input() {
        let message = Error::InvalidCredentials.to_string();
        assert!(!message.contains("111"));
    }
}
