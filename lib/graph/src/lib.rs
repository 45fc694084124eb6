//! # ncdx Graph
//!
//! Adapters that turn a [`DistanceMatrix`](ncdx_core::DistanceMatrix) into
//! the structures downstream analyses consume:
//!
//! - [`SimilarityGraph`] - weighted undirected graph (`1 - d` edge weights)
//!   for community detection, with density and clustering metrics
//! - [`Dendrogram`] - average-linkage merge tree with an ASCII renderer
//!
//! ## Flow
//!
//! ```text
//! ┌─────────────┐     ┌──────────────────┐
//! │  Distance   │────>│ SimilarityGraph  │──> community detection
//! │   Matrix    │     └──────────────────┘
//! │             │     ┌──────────────────┐
//! │             │────>│    Dendrogram    │──> render_ascii()
//! └─────────────┘     └──────────────────┘
//! ```

pub mod dendrogram;
pub mod similarity;

pub use dendrogram::{Dendrogram, Merge};
pub use similarity::{Edge, EdgePolicy, GraphMetrics, Node, NodeId, SimilarityGraph};
