//! Error types for the private agent

use thiserror::Error;

/// Result type alias using our custom Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Broad classification used by callers to tell bad input from a failing service
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The request itself was rejected; nothing was changed
    Validation,
    /// A backing capability (embedding, store, generation) failed
    Capability,
}

/// Core error types for the private agent pipeline
#[derive(Error, Debug)]
pub enum Error {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Unsupported file format: {0}")]
    UnsupportedFormat(String),

    #[error("Agent {0} already exists")]
    AgentExists(String),

    #[error("Agent {0} not found")]
    AgentNotFound(String),

    #[error("Memory {0} not found")]
    MemoryNotFound(String),

    #[error("Embedding error: {0}")]
    Embedding(String),

    #[error("Vector store error: {0}")]
    VectorStore(String),

    #[error("Embedding dimension mismatch: collection holds {expected}-dimensional vectors, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("LLM provider error: {0}")]
    LLMProvider(String),

    #[error("Timeout error: {0}")]
    Timeout(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Other error: {0}")]
    Other(String),
}

impl Error {
    /// Classify this error as a rejected request or a capability failure
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::InvalidInput(_)
            | Error::UnsupportedFormat(_)
            | Error::AgentExists(_)
            | Error::AgentNotFound(_)
            | Error::MemoryNotFound(_) => ErrorKind::Validation,
            _ => ErrorKind::Capability,
        }
    }

    /// Shorthand for `kind() == ErrorKind::Validation`
    pub fn is_validation(&self) -> bool {
        self.kind() == ErrorKind::Validation
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Serialization(err.to_string())
    }
}

impl From<anyhow::Error> for Error {
    fn from(err: anyhow::Error) -> Self {
        Error::Other(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_kinds() {
        assert!(Error::InvalidInput("empty".into()).is_validation());
        assert!(Error::UnsupportedFormat(".xyz".into()).is_validation());
        assert!(Error::AgentExists("default".into()).is_validation());
        assert!(Error::AgentNotFound("nobody".into()).is_validation());
        assert!(Error::MemoryNotFound("abc".into()).is_validation());
    }

    #[test]
    fn test_capability_kinds() {
        assert_eq!(Error::Timeout("slow".into()).kind(), ErrorKind::Capability);
        assert_eq!(Error::VectorStore("down".into()).kind(), ErrorKind::Capability);
        assert_eq!(
            Error::DimensionMismatch { expected: 384, actual: 768 }.kind(),
            ErrorKind::Capability
        );
        let io = std::io::Error::new(std::io::ErrorKind::Other, "disk");
        assert_eq!(Error::from(io).kind(), ErrorKind::Capability);
    }

    #[test]
    fn test_messages() {
        assert_eq!(
            Error::AgentExists("default".into()).to_string(),
            "Agent default already exists"
        );
        assert_eq!(
            Error::DimensionMismatch { expected: 3, actual: 4 }.to_string(),
            "Embedding dimension mismatch: collection holds 3-dimensional vectors, got 4"
        );
    }
}
