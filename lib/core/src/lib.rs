//! # ncdx Core
//!
//! Core library for ncdx.
//!
//! This crate provides the two computations everything else feeds on:
//!
//! - [`NcdEngine`] - N×N Normalized Compression Distance matrix, computed in
//!   row-band chunks on a worker pool
//! - [`CompressionCache`] - concurrent, optionally bounded cache of compressed sizes
//! - [`pareto::rank`] - fast non-dominated sort over an [`ObjectiveMatrix`]
//! - [`ParetoAnalysis`] - first-front normalization and hypervolume
//!
//! ## Example
//!
//! ```rust
//! use ncdx_core::{serializer, Aggregation, CacheConfig, Column, NcdEngine};
//!
//! let columns = vec![
//!     Column::from_raw("a", &["1", "2", "3", "4"]),
//!     Column::from_raw("b", &["1", "2", "3", "4"]),
//!     Column::from_raw("c", &["9", "[7, 1]", "x", "5"]),
//! ];
//! let items = serializer::serialize_columns(&columns, true, Aggregation::First).unwrap();
//!
//! let cache = CacheConfig::default().build().unwrap();
//! let engine = NcdEngine::default();
//! let matrix = engine.compute(&items, &cache).unwrap();
//!
//! assert_eq!(matrix.len(), 3);
//! assert_eq!(matrix.get(0, 1), matrix.get(1, 0));
//! ```

pub mod analysis;
pub mod cache;
pub mod compressor;
pub mod config;
pub mod engine;
pub mod error;
pub mod item;
pub mod matrix;
pub mod pareto;
pub mod serializer;

pub use analysis::{hypervolume, normalize_columns, AnalysisOptions, ParetoAnalysis};
pub use cache::{CacheStats, CompressionCache};
pub use compressor::{Compressor, CompressorKind, FlateCompressor};
pub use config::{CacheConfig, EngineConfig, NcdConfig};
pub use engine::{Chunk, ComputeStats, NcdEngine};
pub use error::{Error, Result};
pub use item::{Aggregation, CellValue, Item};
pub use matrix::DistanceMatrix;
pub use pareto::{Direction, ObjectiveMatrix};
pub use serializer::Column;
