//! Average-linkage (UPGMA) agglomeration over a distance matrix.
//!
//! Clusters are numbered like a linkage matrix: leaves are `0..n`, the
//! cluster created by the k-th merge is `n + k`.

use ncdx_core::{DistanceMatrix, Error, Result};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// One agglomeration step.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Merge {
    pub left: usize,
    pub right: usize,
    pub height: f64,
    pub size: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dendrogram {
    labels: Vec<String>,
    merges: Vec<Merge>,
}

impl Dendrogram {
    /// Agglomerate with average linkage.
    ///
    /// The closest pair of active clusters is merged first; ties go to the
    /// pair with the lowest slot indices. The merged cluster takes the slot
    /// of its left member.
    pub fn average_linkage(matrix: &DistanceMatrix) -> Result<Self> {
        let n = matrix.len();
        if n == 0 {
            return Err(Error::InsufficientItems { found: 0 });
        }

        let mut dist: Vec<Vec<f64>> = matrix.rows().map(<[f64]>::to_vec).collect();
        // (cluster id, size) per slot; None once absorbed
        let mut slots: Vec<Option<(usize, usize)>> = (0..n).map(|i| Some((i, 1))).collect();
        let mut merges = Vec::with_capacity(n.saturating_sub(1));

        for step in 0..n.saturating_sub(1) {
            let mut best: Option<(usize, usize, f64)> = None;
            for a in 0..n {
                if slots[a].is_none() {
                    continue;
                }
                for b in (a + 1)..n {
                    if slots[b].is_none() {
                        continue;
                    }
                    let d = dist[a][b];
                    if best.map_or(true, |(_, _, bd)| d < bd) {
                        best = Some((a, b, d));
                    }
                }
            }
            let Some((a, b, height)) = best else { break };
            let (id_a, size_a) = slots[a].take().unwrap_or_default();
            let (id_b, size_b) = slots[b].take().unwrap_or_default();
            let size = size_a + size_b;

            for c in 0..n {
                if c == a || slots[c].is_none() {
                    continue;
                }
                let merged = (size_a as f64 * dist[a][c] + size_b as f64 * dist[b][c]) / size as f64;
                dist[a][c] = merged;
                dist[c][a] = merged;
            }
            slots[a] = Some((n + step, size));

            merges.push(Merge {
                left: id_a,
                right: id_b,
                height,
                size,
            });
        }

        debug!("Average linkage over {} items: {} merges", n, merges.len());
        Ok(Self {
            labels: matrix.labels().to_vec(),
            merges,
        })
    }

    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    pub fn merges(&self) -> &[Merge] {
        &self.merges
    }

    /// Cluster id of the root.
    pub fn root(&self) -> usize {
        match self.merges.len() {
            0 => 0,
            k => self.labels.len() + k - 1,
        }
    }

    /// Leaf labels in drawing order.
    pub fn leaf_order(&self) -> Vec<&str> {
        let mut out = Vec::with_capacity(self.labels.len());
        let mut stack = vec![self.root()];
        while let Some(id) = stack.pop() {
            match self.merge_of(id) {
                Some(m) => {
                    stack.push(m.right);
                    stack.push(m.left);
                }
                None => out.push(self.labels[id].as_str()),
            }
        }
        out
    }

    /// Text drawing of the tree: leaves by label, merges as `+ [height]`.
    pub fn render_ascii(&self) -> String {
        let mut lines = Vec::new();
        self.draw(self.root(), "", true, &mut lines);
        lines.join("\n")
    }

    fn merge_of(&self, id: usize) -> Option<&Merge> {
        id.checked_sub(self.labels.len()).and_then(|k| self.merges.get(k))
    }

    fn draw(&self, id: usize, prefix: &str, is_last: bool, lines: &mut Vec<String>) {
        let branch = if is_last { "└─" } else { "├─" };
        match self.merge_of(id) {
            None => lines.push(format!("{}{}{}", prefix, branch, self.labels[id])),
            Some(m) => {
                lines.push(format!("{}{}+ [{:.2}]", prefix, branch, m.height));
                let child_prefix = format!("{}{}", prefix, if is_last { "   " } else { "│  " });
                self.draw(m.left, &child_prefix, false, lines);
                self.draw(m.right, &child_prefix, true, lines);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn matrix() -> DistanceMatrix {
        DistanceMatrix::from_rows(
            vec!["a".into(), "b".into(), "c".into()],
            vec![
                vec![0.0, 0.1, 0.9],
                vec![0.1, 0.0, 0.8],
                vec![0.9, 0.8, 0.0],
            ],
        )
        .unwrap()
    }

    #[test]
    fn test_average_linkage_merges() {
        let d = Dendrogram::average_linkage(&matrix()).unwrap();
        let merges = d.merges();
        assert_eq!(merges.len(), 2);
        assert_eq!((merges[0].left, merges[0].right, merges[0].size), (0, 1, 2));
        assert!((merges[0].height - 0.1).abs() < 1e-12);
        assert_eq!((merges[1].left, merges[1].right, merges[1].size), (3, 2, 3));
        assert!((merges[1].height - 0.85).abs() < 1e-12);
        assert_eq!(d.root(), 4);
        assert_eq!(d.leaf_order(), vec!["a", "b", "c"]);
    }

    #[test]
    fn test_render_ascii() {
        let d = Dendrogram::average_linkage(&matrix()).unwrap();
        let expected = "└─+ [0.85]\n   ├─+ [0.10]\n   │  ├─a\n   │  └─b\n   └─c";
        assert_eq!(d.render_ascii(), expected);
    }

    #[test]
    fn test_single_leaf() {
        let m = DistanceMatrix::zeros(vec!["only".into()]);
        let d = Dendrogram::average_linkage(&m).unwrap();
        assert!(d.merges().is_empty());
        assert_eq!(d.render_ascii(), "└─only");
    }

    #[test]
    fn test_heights_never_decrease() {
        let n = 7;
        let labels = (0..n).map(|i| format!("x{}", i)).collect();
        let rows = (0..n)
            .map(|i| {
                (0..n)
                    .map(|j| if i == j { 0.0 } else { ((i * 7 + j * 7) % 11) as f64 / 10.0 + 0.05 })
                    .collect()
            })
            .collect();
        let m = DistanceMatrix::from_rows(labels, rows).unwrap();
        let d = Dendrogram::average_linkage(&m).unwrap();
        assert_eq!(d.merges().len(), n - 1);
        for pair in d.merges().windows(2) {
            assert!(pair[1].height >= pair[0].height - 1e-12);
        }
        assert_eq!(d.merges().last().unwrap().size, n);
    }
}
