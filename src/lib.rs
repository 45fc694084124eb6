//! # ncdx
//!
//! Compression-distance matrices and Pareto dominance ranking for tabular
//! datasets.
//!
//! ncdx measures how much two data columns have in common by asking a
//! general-purpose compressor: the Normalized Compression Distance of `x` and
//! `y` is small when compressing them together costs little more than
//! compressing either alone. Separately, it ranks records by Pareto
//! dominance over a set of numeric objectives.
//!
//! ## Quick Start
//!
//! ### As a CLI
//!
//! ```bash
//! ncdx ncd --input data.csv --output ncd.csv
//! ncdx pareto --input data.csv --objective cost:min --objective score:max --output-dir out/
//! ```
//!
//! ### As a Library
//!
//! ```rust
//! use ncdx::prelude::*;
//!
//! let table = Table::parse("a;b;c\n1;1;9\n2;2;4\n3;3;7\n", ';').unwrap();
//! let items = ncdx::serializer::serialize_columns(table.columns(), true, Aggregation::First).unwrap();
//!
//! let cache = CacheConfig::default().build().unwrap();
//! let matrix = NcdEngine::new(EngineConfig::default()).unwrap().compute(&items, &cache).unwrap();
//! println!("{}", Dendrogram::average_linkage(&matrix).unwrap().render_ascii());
//!
//! let objectives = table.objectives(&["a", "c"]).unwrap();
//! let ranks = ncdx::pareto::rank(&objectives, &[Direction::Minimize, Direction::Maximize]).unwrap();
//! assert_eq!(ranks.len(), 3);
//! ```
//!
//! ## Crate Structure
//!
//! - `ncdx-core` - serializer, compressor cache, distance engine, Pareto ranking
//! - `ncdx-graph` - similarity graph and dendrogram adapters
//! - `ncdx-storage` - table loading, CSV exports, matrix snapshots

// Re-export core types
pub use ncdx_core::{
    Aggregation, AnalysisOptions, CacheConfig, CacheStats, CellValue, Column, CompressionCache,
    Compressor, CompressorKind, ComputeStats, Direction, DistanceMatrix, EngineConfig, Error,
    FlateCompressor, Item, NcdConfig, NcdEngine, ObjectiveMatrix, ParetoAnalysis, Result,
};
pub use ncdx_core::{pareto, serializer};

// Re-export adapters
pub use ncdx_graph::{Dendrogram, EdgePolicy, GraphMetrics, SimilarityGraph};

// Re-export storage
pub use ncdx_storage::{SnapshotManager, StorageError, Table};

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::{
        Aggregation, AnalysisOptions, CacheConfig, Column, CompressionCache, CompressorKind,
        Dendrogram, Direction, DistanceMatrix, EdgePolicy, EngineConfig, Error, Item, NcdEngine,
        ObjectiveMatrix, ParetoAnalysis, Result, SimilarityGraph, SnapshotManager, Table,
    };
}
