pub mod error;
pub mod export;
pub mod snapshot;
pub mod table;

pub use error::{Result, StorageError};
pub use export::{export_matrix_csv, export_ranked_table, ranked_file_name};
pub use snapshot::{MatrixSnapshot, SnapshotDescription, SnapshotManager};
pub use table::{Table, DEFAULT_DELIMITER};
