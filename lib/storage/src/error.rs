use thiserror::Error;

pub type Result<T> = std::result::Result<T, StorageError>;

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Table has no header row")]
    EmptyTable,

    #[error("Column not found: {0}")]
    MissingColumn(String),

    #[error("Non-numeric objective value in column '{column}', row {row}: '{value}'")]
    NonNumericObjective {
        column: String,
        row: usize,
        value: String,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Core(#[from] ncdx_core::Error),
}
