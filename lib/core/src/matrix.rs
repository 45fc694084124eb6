use serde::{Deserialize, Serialize};

/// Dense, symmetric N×N distance matrix with a zero diagonal.
///
/// Stored row-major alongside the labels of the items it compares.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DistanceMatrix {
    labels: Vec<String>,
    data: Vec<f64>,
}

impl DistanceMatrix {
    /// All-zero matrix for the given labels.
    pub fn zeros(labels: Vec<String>) -> Self {
        let n = labels.len();
        Self {
            labels,
            data: vec![0.0; n * n],
        }
    }

    /// Build from full rows. Returns `None` unless the rows form a square
    /// matrix matching the label count.
    pub fn from_rows(labels: Vec<String>, rows: Vec<Vec<f64>>) -> Option<Self> {
        let n = labels.len();
        if rows.len() != n || rows.iter().any(|r| r.len() != n) {
            return None;
        }
        Some(Self {
            labels,
            data: rows.into_iter().flatten().collect(),
        })
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.labels.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    #[inline]
    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    #[inline]
    pub fn get(&self, i: usize, j: usize) -> f64 {
        self.data[i * self.len() + j]
    }

    #[inline]
    pub(crate) fn set(&mut self, i: usize, j: usize, value: f64) {
        let n = self.len();
        self.data[i * n + j] = value;
    }

    #[inline]
    pub fn row(&self, i: usize) -> &[f64] {
        let n = self.len();
        &self.data[i * n..(i + 1) * n]
    }

    pub fn rows(&self) -> impl Iterator<Item = &[f64]> {
        self.data.chunks(self.len().max(1))
    }

    /// Copy the upper triangle onto the lower one.
    pub(crate) fn mirror_upper(&mut self) {
        let n = self.len();
        for i in 0..n {
            for j in (i + 1)..n {
                self.data[j * n + i] = self.data[i * n + j];
            }
        }
    }

    /// Upper triangle (excluding the diagonal) in row-major order, i.e. the
    /// condensed layout hierarchical clustering routines consume.
    pub fn condensed(&self) -> Vec<f64> {
        let n = self.len();
        let mut out = Vec::with_capacity(n * n.saturating_sub(1) / 2);
        for i in 0..n {
            out.extend_from_slice(&self.row(i)[i + 1..]);
        }
        out
    }

    /// Copy with every entry clamped to `[0, 1]`.
    #[must_use]
    pub fn clamped(&self) -> Self {
        Self {
            labels: self.labels.clone(),
            data: self.data.iter().map(|d| d.clamp(0.0, 1.0)).collect(),
        }
    }

    /// Largest entry, 0 for an empty matrix.
    pub fn max_value(&self) -> f64 {
        self.data.iter().copied().fold(0.0, f64::max)
    }

    /// Check symmetry and the zero diagonal.
    pub fn is_symmetric(&self) -> bool {
        let n = self.len();
        (0..n).all(|i| self.get(i, i) == 0.0 && ((i + 1)..n).all(|j| self.get(i, j) == self.get(j, i)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> DistanceMatrix {
        DistanceMatrix::from_rows(
            vec!["a".into(), "b".into(), "c".into()],
            vec![
                vec![0.0, 0.2, 0.9],
                vec![0.2, 0.0, 1.05],
                vec![0.9, 1.05, 0.0],
            ],
        )
        .unwrap()
    }

    #[test]
    fn test_condensed_layout() {
        assert_eq!(sample().condensed(), vec![0.2, 0.9, 1.05]);
    }

    #[test]
    fn test_clamped_and_max() {
        let m = sample();
        assert_eq!(m.max_value(), 1.05);
        assert_eq!(m.clamped().get(1, 2), 1.0);
        assert!(m.is_symmetric());
    }

    #[test]
    fn test_from_rows_rejects_ragged() {
        assert!(DistanceMatrix::from_rows(vec!["a".into()], vec![vec![0.0, 1.0]]).is_none());
    }

    #[test]
    fn test_mirror_upper() {
        let mut m = DistanceMatrix::zeros(vec!["a".into(), "b".into()]);
        m.set(0, 1, 0.4);
        assert!(!m.is_symmetric());
        m.mirror_upper();
        assert_eq!(m.get(1, 0), 0.4);
        assert!(m.is_symmetric());
    }
}
