//! Pareto dominance ranking (fast non-dominated sort).
//!
//! Every record gets the 1-based index of the front it belongs to: front 1
//! holds the non-dominated records, front 2 those non-dominated once front 1
//! is removed, and so on.

use crate::{Error, Result};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

/// Optimization direction of one objective column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    #[default]
    Minimize,
    Maximize,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Minimize => f.write_str("min"),
            Direction::Maximize => f.write_str("max"),
        }
    }
}

impl FromStr for Direction {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "min" | "minimize" => Ok(Direction::Minimize),
            "max" | "maximize" => Ok(Direction::Maximize),
            other => Err(Error::InvalidConfig(format!("unknown direction: {}", other))),
        }
    }
}

/// N records × M objectives.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ObjectiveMatrix {
    rows: Vec<Vec<f64>>,
    columns: usize,
}

impl ObjectiveMatrix {
    /// Build from rows, rejecting ragged input.
    pub fn new(rows: Vec<Vec<f64>>) -> Result<Self> {
        let columns = rows.first().map_or(0, Vec::len);
        if let Some((row, r)) = rows.iter().enumerate().find(|(_, r)| r.len() != columns) {
            return Err(Error::RaggedObjectives {
                row,
                expected: columns,
                actual: r.len(),
            });
        }
        Ok(Self { rows, columns })
    }

    /// Build from equally long objective columns.
    pub fn from_columns(columns: &[Vec<f64>]) -> Result<Self> {
        let n = columns.first().map_or(0, Vec::len);
        if let Some(bad) = columns.iter().find(|c| c.len() != n) {
            return Err(Error::RaggedObjectives {
                row: bad.len().min(n),
                expected: n,
                actual: bad.len(),
            });
        }
        let rows = (0..n)
            .map(|i| columns.iter().map(|c| c[i]).collect())
            .collect();
        Ok(Self {
            rows,
            columns: columns.len(),
        })
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    #[inline]
    pub fn columns(&self) -> usize {
        self.columns
    }

    #[inline]
    pub fn rows(&self) -> &[Vec<f64>] {
        &self.rows
    }

    #[inline]
    pub fn row(&self, i: usize) -> &[f64] {
        &self.rows[i]
    }

    /// Rows rewritten so that smaller is better on every column.
    pub fn minimization_view(&self, directions: &[Direction]) -> Result<Vec<Vec<f64>>> {
        let directions = self.resolve_directions(directions)?;
        Ok(self
            .rows
            .iter()
            .map(|row| {
                row.iter()
                    .zip(&directions)
                    .map(|(&v, d)| match d {
                        Direction::Minimize => v,
                        Direction::Maximize => -v,
                    })
                    .collect()
            })
            .collect())
    }

    /// An empty slice means "minimize everything".
    fn resolve_directions(&self, directions: &[Direction]) -> Result<Vec<Direction>> {
        if directions.is_empty() {
            return Ok(vec![Direction::Minimize; self.columns]);
        }
        if directions.len() != self.columns {
            return Err(Error::DirectionMismatch {
                expected: self.columns,
                actual: directions.len(),
            });
        }
        Ok(directions.to_vec())
    }
}

/// `p` dominates `q` when it is no worse everywhere and better somewhere
/// (both already in minimization form).
#[inline]
pub fn dominates(p: &[f64], q: &[f64]) -> bool {
    let mut strictly_better = false;
    for (a, b) in p.iter().zip(q) {
        match a.partial_cmp(b) {
            Some(Ordering::Less) => strictly_better = true,
            Some(Ordering::Equal) => {}
            // worse, or NaN on either side
            _ => return false,
        }
    }
    strictly_better
}

/// Partition all rows into fronts, best first. Rows inside a front are in
/// ascending row order.
pub fn fronts(objectives: &ObjectiveMatrix, directions: &[Direction]) -> Result<Vec<Vec<usize>>> {
    if objectives.is_empty() || objectives.columns() == 0 {
        return Ok(Vec::new());
    }
    let values = objectives.minimization_view(directions)?;
    let n = values.len();

    let dominated: Vec<Vec<usize>> = (0..n)
        .into_par_iter()
        .map(|p| {
            (0..n)
                .filter(|&q| dominates(&values[p], &values[q]))
                .collect()
        })
        .collect();

    let mut counts = vec![0usize; n];
    for set in &dominated {
        for &q in set {
            counts[q] += 1;
        }
    }

    let mut result = Vec::new();
    let mut current: Vec<usize> = (0..n).filter(|&i| counts[i] == 0).collect();
    while !current.is_empty() {
        let mut next = Vec::new();
        for &p in &current {
            for &q in &dominated[p] {
                counts[q] -= 1;
                if counts[q] == 0 {
                    next.push(q);
                }
            }
        }
        next.sort_unstable();
        result.push(current);
        current = next;
    }

    Ok(result)
}

/// Dominance rank (1 = Pareto-optimal) of every row.
pub fn rank(objectives: &ObjectiveMatrix, directions: &[Direction]) -> Result<Vec<usize>> {
    if objectives.columns() == 0 {
        return Ok(Vec::new());
    }
    let mut ranks = vec![0usize; objectives.len()];
    for (front, members) in fronts(objectives, directions)?.into_iter().enumerate() {
        for row in members {
            ranks[row] = front + 1;
        }
    }
    Ok(ranks)
}

/// Rows on the first front.
pub fn pareto_front(objectives: &ObjectiveMatrix, directions: &[Direction]) -> Result<Vec<usize>> {
    Ok(fronts(objectives, directions)?.into_iter().next().unwrap_or_default())
}
