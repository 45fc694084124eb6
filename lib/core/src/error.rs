use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Insufficient data in '{label}': expected at least 2 numeric values, got {found}")]
    InsufficientData { label: String, found: usize },

    #[error("Insufficient items: distance matrix needs at least 2, got {found}")]
    InsufficientItems { found: usize },

    #[error("Degenerate item '{label}': content compresses to zero bytes")]
    DegenerateItem { label: String },

    #[error("Compression failure: {0}")]
    CompressionFailure(String),

    #[error("Direction count mismatch: expected {expected}, got {actual}")]
    DirectionMismatch { expected: usize, actual: usize },

    #[error("Ragged objective matrix: row {row} has {actual} values, expected {expected}")]
    RaggedObjectives { row: usize, expected: usize, actual: usize },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}
