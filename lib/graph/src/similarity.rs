// Weighted similarity graph built from a distance matrix
use ahash::AHashSet;
use ncdx_core::{DistanceMatrix, Error, Result};
use serde::{Deserialize, Serialize};

pub type NodeId = usize;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub id: NodeId,
    pub label: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Edge {
    pub from: NodeId,
    pub to: NodeId,
    pub weight: f64,
}

impl Node {
    #[inline]
    #[must_use]
    pub fn new(id: NodeId, label: String) -> Self {
        Self { id, label }
    }
}

impl Edge {
    #[inline]
    #[must_use]
    pub fn new(from: NodeId, to: NodeId, weight: f64) -> Self {
        Self { from, to, weight }
    }
}

/// Which pairs of the matrix become edges. Every edge weighs `1 - d`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum EdgePolicy {
    /// Keep pairs with `d < threshold`.
    Threshold(f64),
    /// Keep every pair with a positive distance. Weights go negative when `d > 1`.
    Complement,
}

impl EdgePolicy {
    fn keeps(&self, distance: f64) -> bool {
        match *self {
            EdgePolicy::Threshold(t) => distance < t,
            EdgePolicy::Complement => distance > 0.0,
        }
    }
}

/// Summary numbers for a [`SimilarityGraph`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GraphMetrics {
    pub nodes: usize,
    pub edges: usize,
    pub density: f64,
    pub average_clustering: f64,
    pub total_weight: f64,
}

/// Undirected weighted graph over the items of a distance matrix, ready to
/// hand to a community-detection routine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimilarityGraph {
    nodes: Vec<Node>,
    edges: Vec<Edge>,
    adjacency: Vec<Vec<(NodeId, f64)>>,
}

impl SimilarityGraph {
    pub fn from_matrix(matrix: &DistanceMatrix, policy: EdgePolicy) -> Result<Self> {
        if let EdgePolicy::Threshold(t) = policy {
            if !t.is_finite() {
                return Err(Error::InvalidConfig(format!("edge threshold must be finite, got {}", t)));
            }
        }

        let n = matrix.len();
        let nodes = matrix
            .labels()
            .iter()
            .enumerate()
            .map(|(id, label)| Node::new(id, label.clone()))
            .collect();

        let mut edges = Vec::new();
        let mut adjacency = vec![Vec::new(); n];
        for i in 0..n {
            for j in (i + 1)..n {
                let d = matrix.get(i, j);
                if policy.keeps(d) {
                    let weight = 1.0 - d;
                    edges.push(Edge::new(i, j, weight));
                    adjacency[i].push((j, weight));
                    adjacency[j].push((i, weight));
                }
            }
        }

        Ok(Self {
            nodes,
            edges,
            adjacency,
        })
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    pub fn neighbors(&self, id: NodeId) -> &[(NodeId, f64)] {
        &self.adjacency[id]
    }

    pub fn degree(&self, id: NodeId) -> usize {
        self.adjacency[id].len()
    }

    /// Edges over possible edges.
    pub fn density(&self) -> f64 {
        let n = self.node_count();
        if n < 2 {
            return 0.0;
        }
        2.0 * self.edge_count() as f64 / (n * (n - 1)) as f64
    }

    /// Unweighted local clustering coefficient of one node.
    pub fn clustering(&self, id: NodeId) -> f64 {
        let neighbors: Vec<NodeId> = self.adjacency[id].iter().map(|&(v, _)| v).collect();
        let k = neighbors.len();
        if k < 2 {
            return 0.0;
        }
        let set: AHashSet<NodeId> = neighbors.iter().copied().collect();
        let links: usize = neighbors
            .iter()
            .map(|&v| {
                self.adjacency[v]
                    .iter()
                    .filter(|(w, _)| set.contains(w))
                    .count()
            })
            .sum();
        // each triangle edge was seen from both ends
        links as f64 / (k * (k - 1)) as f64
    }

    /// Mean clustering coefficient over all nodes.
    pub fn average_clustering(&self) -> f64 {
        let n = self.node_count();
        if n == 0 {
            return 0.0;
        }
        (0..n).map(|id| self.clustering(id)).sum::<f64>() / n as f64
    }

    pub fn total_weight(&self) -> f64 {
        self.edges.iter().map(|e| e.weight).sum()
    }

    pub fn metrics(&self) -> GraphMetrics {
        GraphMetrics {
            nodes: self.node_count(),
            edges: self.edge_count(),
            density: self.density(),
            average_clustering: self.average_clustering(),
            total_weight: self.total_weight(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn matrix() -> DistanceMatrix {
        DistanceMatrix::from_rows(
            vec!["a".into(), "b".into(), "c".into(), "d".into()],
            vec![
                vec![0.0, 0.1, 0.2, 0.9],
                vec![0.1, 0.0, 0.3, 0.95],
                vec![0.2, 0.3, 0.0, 0.8],
                vec![0.9, 0.95, 0.8, 0.0],
            ],
        )
        .unwrap()
    }

    #[test]
    fn test_threshold_edges() {
        let g = SimilarityGraph::from_matrix(&matrix(), EdgePolicy::Threshold(0.5)).unwrap();
        assert_eq!(g.edge_count(), 3);
        assert_eq!(g.degree(3), 0);
        assert!((g.edges()[0].weight - 0.9).abs() < 1e-12);
        assert!((g.density() - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_complement_keeps_all_positive_pairs() {
        let g = SimilarityGraph::from_matrix(&matrix(), EdgePolicy::Complement).unwrap();
        assert_eq!(g.edge_count(), 6);
        assert!((g.density() - 1.0).abs() < 1e-12);
        assert!((g.average_clustering() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_clustering_of_triangle_plus_isolated() {
        let g = SimilarityGraph::from_matrix(&matrix(), EdgePolicy::Threshold(0.5)).unwrap();
        assert!((g.clustering(0) - 1.0).abs() < 1e-12);
        assert_eq!(g.clustering(3), 0.0);
        let metrics = g.metrics();
        assert!((metrics.average_clustering - 0.75).abs() < 1e-12);
        assert!((metrics.total_weight - (0.9 + 0.8 + 0.7)).abs() < 1e-12);
    }

    #[test]
    fn test_rejects_nan_threshold() {
        assert!(SimilarityGraph::from_matrix(&matrix(), EdgePolicy::Threshold(f64::NAN)).is_err());
    }
}
