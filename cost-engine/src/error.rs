//! Error types for cost reconciliation

use thiserror::Error;

/// Result type for cost engine operations
pub type Result<T> = std::result::Result<T, Error>;

/// Cost engine errors
#[derive(Error, Debug)]
pub enum Error {
    /// Category could not be resolved to a code
    #[error("Invalid classification: {0}")]
    InvalidClassification(String),

    /// Pricing function failed or was unreachable
    #[error("Pricing failure: {0}")]
    PricingFailure(String),

    /// Schedule write failed
    #[error("Persistence failure: {0}")]
    PersistenceFailure(String),

    /// Lookup table read failed
    #[error("Lookup error: {0}")]
    Lookup(String),

    /// Current schedule could not be loaded
    #[error("Store error: {0}")]
    Store(String),

    /// Editor input out of range or referencing an unknown line
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

