// Delimited-text table loading
use crate::error::{Result, StorageError};
use ncdx_core::{Aggregation, CellValue, Column, ObjectiveMatrix};
use std::fs;
use std::path::Path;
use tracing::debug;

/// Default field separator of input tables.
pub const DEFAULT_DELIMITER: char = ';';

/// A loaded table: header, raw records, and resolved columns.
///
/// Columns whose cells are all empty are dropped at load time. Quoted fields
/// may contain the delimiter and doubled quotes, but not line breaks.
#[derive(Debug, Clone)]
pub struct Table {
    headers: Vec<String>,
    records: Vec<Vec<String>>,
    columns: Vec<Column>,
    aggregation: Aggregation,
}

impl Table {
    pub fn from_path<P: AsRef<Path>>(path: P, delimiter: char) -> Result<Self> {
        let text = fs::read_to_string(path.as_ref())?;
        let table = Self::parse(&text, delimiter)?;
        debug!(
            "Loaded {:?}: {} rows, {} columns",
            path.as_ref(),
            table.len(),
            table.headers.len()
        );
        Ok(table)
    }

    pub fn parse(text: &str, delimiter: char) -> Result<Self> {
        let mut lines = text
            .lines()
            .map(|l| l.trim_end_matches('\r'))
            .filter(|l| !l.trim().is_empty());

        let header_line = lines.next().ok_or(StorageError::EmptyTable)?;
        let headers: Vec<String> = split_record(header_line, delimiter)
            .into_iter()
            .map(|h| h.trim().trim_start_matches('\u{feff}').to_string())
            .collect();
        let width = headers.len();

        let rows: Vec<Vec<String>> = lines
            .map(|line| {
                let mut fields = split_record(line, delimiter);
                fields.resize(width, String::new());
                fields
            })
            .collect();

        Ok(Self::from_records(headers, rows, Aggregation::default()))
    }

    fn from_records(
        headers: Vec<String>,
        rows: Vec<Vec<String>>,
        aggregation: Aggregation,
    ) -> Self {
        let width = headers.len();
        let keep: Vec<usize> = (0..width)
            .filter(|&k| rows.iter().any(|r| !r[k].trim().is_empty()))
            .collect();

        let headers: Vec<String> = keep.iter().map(|&k| headers[k].clone()).collect();
        let records: Vec<Vec<String>> = rows
            .into_iter()
            .map(|r| keep.iter().map(|&k| r[k].clone()).collect())
            .collect();
        let columns = keep
            .iter()
            .enumerate()
            .map(|(pos, _)| {
                Column::new(
                    headers[pos].clone(),
                    records.iter().map(|r| CellValue::parse(&r[pos])).collect(),
                )
            })
            .collect();

        Self {
            headers,
            records,
            columns,
            aggregation,
        }
    }

    /// Reduce composite cells with `aggregation` when reading numbers.
    #[must_use]
    pub fn with_aggregation(mut self, aggregation: Aggregation) -> Self {
        self.aggregation = aggregation;
        self
    }

    pub fn aggregation(&self) -> Aggregation {
        self.aggregation
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    pub fn records(&self) -> &[Vec<String>] {
        &self.records
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn column(&self, name: &str) -> Result<&Column> {
        self.columns
            .iter()
            .find(|c| c.name == name)
            .ok_or_else(|| StorageError::MissingColumn(name.to_string()))
    }

    /// Every cell of `name` as a number, composite cells reduced by the
    /// table's aggregation; any non-numeric cell is an error.
    pub fn numeric_column(&self, name: &str) -> Result<Vec<f64>> {
        let column = self.column(name)?;
        column
            .cells
            .iter()
            .enumerate()
            .map(|(row, cell)| {
                cell.aggregate(self.aggregation).ok_or_else(|| StorageError::NonNumericObjective {
                    column: name.to_string(),
                    row,
                    value: cell.raw_text(),
                })
            })
            .collect()
    }

    /// Objective matrix built from the named columns, in the given order.
    pub fn objectives<S: AsRef<str>>(&self, names: &[S]) -> Result<ObjectiveMatrix> {
        let columns = names
            .iter()
            .map(|name| self.numeric_column(name.as_ref()))
            .collect::<Result<Vec<_>>>()?;
        Ok(ObjectiveMatrix::from_columns(&columns)?)
    }

    /// One sub-table per distinct non-empty value of `column`, in order of
    /// first appearance. Slices drop the split column itself and any column
    /// left all-empty, and keep this table's aggregation.
    pub fn split_by(&self, column: &str) -> Result<Vec<(String, Table)>> {
        let key = self
            .headers
            .iter()
            .position(|h| h == column)
            .ok_or_else(|| StorageError::MissingColumn(column.to_string()))?;

        let mut groups: Vec<(String, Vec<Vec<String>>)> = Vec::new();
        for record in &self.records {
            let value = record[key].trim();
            if value.is_empty() {
                continue;
            }
            let rest: Vec<String> = record
                .iter()
                .enumerate()
                .filter(|&(k, _)| k != key)
                .map(|(_, field)| field.clone())
                .collect();
            match groups.iter_mut().find(|(v, _)| v == value) {
                Some((_, rows)) => rows.push(rest),
                None => groups.push((value.to_string(), vec![rest])),
            }
        }

        let headers: Vec<String> = self
            .headers
            .iter()
            .enumerate()
            .filter(|&(k, _)| k != key)
            .map(|(_, h)| h.clone())
            .collect();
        debug!("Split on '{}' into {} slices", column, groups.len());

        Ok(groups
            .into_iter()
            .map(|(value, rows)| {
                let slice = Self::from_records(headers.clone(), rows, self.aggregation);
                (value, slice)
            })
            .collect())
    }
}

/// Split one line on `delimiter`, honouring double-quoted fields.
pub(crate) fn split_record(line: &str, delimiter: char) -> Vec<String> {
    let mut fields = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut chars = line.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '"' if in_quotes && chars.peek() == Some(&'"') => {
                current.push('"');
                chars.next();
            }
            '"' => in_quotes = !in_quotes,
            c if c == delimiter && !in_quotes => fields.push(std::mem::take(&mut current)),
            c => current.push(c),
        }
    }
    fields.push(current);
    fields
}
