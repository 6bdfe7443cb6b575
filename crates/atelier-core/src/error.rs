//! Error types for Atelier.

use thiserror::Error;

/// Result type for Atelier operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in Atelier operations.
#[derive(Debug, Error)]
pub enum Error {
    /// Corrupt persisted state; fatal at startup
    #[error("Config error: {0}")]
    Config(String),

    /// Vote payload that does not parse into the expected shape
    #[error("Could not unmarshal votes message: {0}")]
    MalformedRequest(String),

    /// User already voted in the current iteration
    #[error("User {user:?} has already voted in this iteration")]
    DuplicateVote {
        /// The offending user address
        user: String,
    },

    /// Iteration file write failure; logged, never fatal
    #[error("Persistence error: {0}")]
    Persistence(#[source] std::io::Error),

    /// Image directory operation failure; logged, never fatal
    #[error("Filesystem error: {0}")]
    FileSystem(#[source] std::io::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duplicate_vote_names_the_user() {
        let err = Error::DuplicateVote {
            user: "u1".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "User \"u1\" has already voted in this iteration"
        );
    }
}
