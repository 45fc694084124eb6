//! Pareto front analysis: normalization and hypervolume.
//!
//! All values here are in minimization form (see
//! [`ObjectiveMatrix::minimization_view`]).

use crate::pareto::{self, Direction, ObjectiveMatrix};
use crate::{Error, Result};
use ordered_float::OrderedFloat;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Reference coordinate used for normalized fronts.
pub const NORMALIZED_REFERENCE: f64 = 1.1;

/// Min-max scale every column to `[0, 1]`. A constant column maps to 0.5.
pub fn normalize_columns(rows: &[Vec<f64>]) -> Vec<Vec<f64>> {
    let columns = rows.first().map_or(0, Vec::len);
    let bounds: Vec<(f64, f64)> = (0..columns)
        .map(|k| {
            rows.iter().fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), r| {
                (lo.min(r[k]), hi.max(r[k]))
            })
        })
        .collect();

    rows.iter()
        .map(|row| {
            row.iter()
                .zip(&bounds)
                .map(|(&v, &(lo, hi))| if hi > lo { (v - lo) / (hi - lo) } else { 0.5 })
                .collect()
        })
        .collect()
}

/// Exact volume dominated by `points` and bounded by `reference`
/// (minimization). Points that are not strictly better than the reference on
/// every objective contribute nothing.
pub fn hypervolume(points: &[Vec<f64>], reference: &[f64]) -> Result<f64> {
    if let Some(p) = points.iter().find(|p| p.len() != reference.len()) {
        return Err(Error::InvalidConfig(format!(
            "reference point has {} objectives, point has {}",
            reference.len(),
            p.len()
        )));
    }
    if reference.is_empty() {
        return Ok(0.0);
    }

    let inside: Vec<&[f64]> = points
        .iter()
        .filter(|p| p.iter().zip(reference).all(|(v, r)| v < r))
        .map(Vec::as_slice)
        .collect();

    Ok(slice_volume(&inside, reference, reference.len()))
}

/// Volume over the first `dims` coordinates, slicing along the last one.
fn slice_volume(points: &[&[f64]], reference: &[f64], dims: usize) -> f64 {
    if points.is_empty() {
        return 0.0;
    }
    if dims == 1 {
        let best = points.iter().map(|p| p[0]).fold(f64::INFINITY, f64::min);
        return reference[0] - best;
    }

    let axis = dims - 1;
    let mut sorted = points.to_vec();
    sorted.sort_by_key(|p| OrderedFloat(p[axis]));

    let mut volume = 0.0;
    for i in 0..sorted.len() {
        let upper = sorted.get(i + 1).map_or(reference[axis], |p| p[axis]);
        let height = upper - sorted[i][axis];
        if height > 0.0 {
            volume += slice_volume(&sorted[..=i], reference, axis) * height;
        }
    }
    volume
}

/// What [`ParetoAnalysis::run`] should compute besides the ranking.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisOptions {
    pub normalize: bool,
    pub hypervolume: bool,
    /// Reference point in minimization form; derived when absent.
    pub reference: Option<Vec<f64>>,
}

impl Default for AnalysisOptions {
    fn default() -> Self {
        Self {
            normalize: true,
            hypervolume: true,
            reference: None,
        }
    }
}

/// Ranking plus a description of the first front.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParetoAnalysis {
    pub ranks: Vec<usize>,
    pub front: Vec<usize>,
    /// Objective values of the front rows, minimization form, optionally
    /// normalized.
    pub front_values: Vec<Vec<f64>>,
    pub directions: Vec<Direction>,
    pub normalized: bool,
    pub hypervolume: Option<f64>,
    pub reference: Option<Vec<f64>>,
}

impl ParetoAnalysis {
    pub fn run(
        objectives: &ObjectiveMatrix,
        directions: &[Direction],
        options: &AnalysisOptions,
    ) -> Result<Self> {
        let ranks = pareto::rank(objectives, directions)?;
        let directions = if directions.is_empty() {
            vec![Direction::Minimize; objectives.columns()]
        } else {
            directions.to_vec()
        };

        let view = objectives.minimization_view(&directions)?;
        let front: Vec<usize> = (0..ranks.len()).filter(|&i| ranks[i] == 1).collect();
        let mut front_values: Vec<Vec<f64>> = front.iter().map(|&i| view[i].clone()).collect();
        if options.normalize {
            front_values = normalize_columns(&front_values);
        }

        let (hypervolume, reference) = if options.hypervolume && !front_values.is_empty() {
            let reference = options
                .reference
                .clone()
                .unwrap_or_else(|| default_reference(&front_values, options.normalize));
            (Some(self::hypervolume(&front_values, &reference)?), Some(reference))
        } else {
            (None, None)
        };

        debug!(
            "Pareto analysis: {} rows, front of {}, hypervolume {:?}",
            ranks.len(),
            front.len(),
            hypervolume
        );

        Ok(Self {
            ranks,
            front,
            front_values,
            directions,
            normalized: options.normalize,
            hypervolume,
            reference,
        })
    }

    /// Number of fronts found.
    pub fn front_count(&self) -> usize {
        self.ranks.iter().copied().max().unwrap_or(0)
    }
}

/// 1.1 everywhere for normalized fronts, otherwise each column's worst value
/// plus 10% of its range (of 1.0 when the column is constant).
fn default_reference(values: &[Vec<f64>], normalized: bool) -> Vec<f64> {
    let columns = values.first().map_or(0, Vec::len);
    if normalized {
        return vec![NORMALIZED_REFERENCE; columns];
    }
    (0..columns)
        .map(|k| {
            let (lo, hi) = values.iter().fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), r| {
                (lo.min(r[k]), hi.max(r[k]))
            });
            let range = hi - lo;
            hi + 0.1 * if range > 0.0 { range } else { 1.0 }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_columns() {
        let rows = vec![vec![0.0, 5.0], vec![10.0, 5.0], vec![5.0, 5.0]];
        let n = normalize_columns(&rows);
        assert_eq!(n[0], vec![0.0, 0.5]);
        assert_eq!(n[1], vec![1.0, 0.5]);
        assert_eq!(n[2], vec![0.5, 0.5]);
    }

    #[test]
    fn test_hypervolume_2d_staircase() {
        let points = vec![vec![1.0, 3.0], vec![2.0, 2.0], vec![3.0, 1.0]];
        let hv = hypervolume(&points, &[4.0, 4.0]).unwrap();
        assert!((hv - 6.0).abs() < 1e-12);
    }

    #[test]
    fn test_hypervolume_3d_overlap() {
        let points = vec![vec![0.0, 0.0, 1.0], vec![1.0, 1.0, 0.0]];
        let hv = hypervolume(&points, &[2.0, 2.0, 2.0]).unwrap();
        assert!((hv - 5.0).abs() < 1e-12);
    }

    #[test]
    fn test_hypervolume_ignores_points_outside_reference() {
        let points = vec![vec![0.0, 0.0], vec![5.0, 0.0]];
        let hv = hypervolume(&points, &[1.0, 1.0]).unwrap();
        assert!((hv - 1.0).abs() < 1e-12);
        assert!(hypervolume(&points, &[1.0]).is_err());
    }

    #[test]
    fn test_analysis_run() {
        let m = ObjectiveMatrix::new(vec![
            vec![1.0, 5.0],
            vec![2.0, 4.0],
            vec![3.0, 3.0],
            vec![10.0, 10.0],
        ])
        .unwrap();
        let analysis = ParetoAnalysis::run(&m, &[], &AnalysisOptions::default()).unwrap();
        assert_eq!(analysis.front, vec![0, 1, 2]);
        assert_eq!(analysis.front_count(), 2);
        assert_eq!(analysis.front_values[0], vec![0.0, 1.0]);
        assert_eq!(analysis.reference, Some(vec![1.1, 1.1]));

        // staircase (0,1) (0.5,0.5) (1,0) against (1.1, 1.1)
        let expected = 0.1 * 0.5 + 0.6 * 0.5 + 1.1 * 0.1;
        let hv = analysis.hypervolume.unwrap();
        assert!((hv - expected).abs() < 1e-9, "hv = {}", hv);
    }

    #[test]
    fn test_analysis_without_extras() {
        let m = ObjectiveMatrix::new(vec![vec![1.0], vec![2.0]]).unwrap();
        let options = AnalysisOptions {
            normalize: false,
            hypervolume: false,
            reference: None,
        };
        let analysis = ParetoAnalysis::run(&m, &[Direction::Maximize], &options).unwrap();
        assert_eq!(analysis.front, vec![1]);
        assert_eq!(analysis.front_values, vec![vec![-2.0]]);
        assert!(analysis.hypervolume.is_none());
    }
}
