//! Column and record serialization
//!
//! Reduces table data to the canonical strings the distance engine compresses.

use crate::item::{Aggregation, CellValue, Item};
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Separator placed between values of one serialized item.
pub const VALUE_DELIMITER: char = ',';

/// A named column of resolved cells.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Column {
    pub name: String,
    pub cells: Vec<CellValue>,
}

impl Column {
    pub fn new(name: impl Into<String>, cells: Vec<CellValue>) -> Self {
        Self {
            name: name.into(),
            cells,
        }
    }

    /// Build a column from raw text cells.
    pub fn from_raw<S: AsRef<str>>(name: impl Into<String>, raw: &[S]) -> Self {
        Self::new(name, raw.iter().map(|s| CellValue::parse(s.as_ref())).collect())
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.iter().all(CellValue::is_empty)
    }
}

/// Numeric values of a column in row order, composite cells reduced by
/// `aggregation` and non-numeric cells dropped.
pub fn numeric_values(cells: &[CellValue], aggregation: Aggregation) -> Vec<f64> {
    cells.iter().filter_map(|cell| cell.aggregate(aggregation)).collect()
}

/// Serialize one column into an item.
///
/// Fails with [`Error::InsufficientData`] when fewer than two numeric values
/// survive filtering.
pub fn serialize_column(
    index: usize,
    label: &str,
    cells: &[CellValue],
    aggregation: Aggregation,
) -> Result<Item> {
    let values = numeric_values(cells, aggregation);
    if values.len() < 2 {
        return Err(Error::InsufficientData {
            label: label.to_string(),
            found: values.len(),
        });
    }

    let mut content = String::with_capacity(values.len() * 8);
    for (i, value) in values.iter().enumerate() {
        if i > 0 {
            content.push(VALUE_DELIMITER);
        }
        content.push_str(&value.to_string());
    }

    Ok(Item::new(index, label, content))
}

/// Serialize every column of a table.
///
/// All-empty columns are skipped. With `tolerant` set, columns without
/// enough numeric data are dropped (and logged) instead of failing the whole
/// batch; surviving items are indexed densely in column order.
pub fn serialize_columns(
    columns: &[Column],
    tolerant: bool,
    aggregation: Aggregation,
) -> Result<Vec<Item>> {
    let mut items = Vec::with_capacity(columns.len());

    for column in columns {
        if column.is_empty() {
            debug!("Skipping empty column '{}'", column.name);
            continue;
        }
        match serialize_column(items.len(), &column.name, &column.cells, aggregation) {
            Ok(item) => items.push(item),
            Err(Error::InsufficientData { label, found }) if tolerant => {
                warn!("Dropping column '{}': only {} numeric values", label, found);
            }
            Err(e) => return Err(e),
        }
    }

    debug!("Serialized {} of {} columns", items.len(), columns.len());
    Ok(items)
}

/// Serialize each record of a table into an item labelled by its 1-based row
/// number. Cells are joined as text without numeric filtering.
pub fn serialize_rows(columns: &[Column]) -> Vec<Item> {
    let rows = columns.iter().map(Column::len).max().unwrap_or(0);

    (0..rows)
        .map(|row| {
            let content = columns
                .iter()
                .map(|c| c.cells.get(row).map(CellValue::raw_text).unwrap_or_default())
                .collect::<Vec<_>>()
                .join(",");
            Item::new(row, (row + 1).to_string(), content)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn column(name: &str, raw: &[&str]) -> Column {
        Column::from_raw(name, raw)
    }

    #[test]
    fn test_serialize_column_filters_and_joins() {
        let col = column("a", &["1", "x", "2.5", "", "[3, 9]", "{\"k\": 4}"]);
        let item = serialize_column(0, &col.name, &col.cells, Aggregation::First).unwrap();
        assert_eq!(item.content(), "1,2.5,3,4");
        assert_eq!(item.label(), "a");
    }

    #[test]
    fn test_serialize_column_aggregates_composites() {
        let col = column("a", &["1", "[2, 4]", "{5, 7, 9}", "{'k': 3, 'j': 1}"]);
        let item = serialize_column(0, &col.name, &col.cells, Aggregation::Mean).unwrap();
        assert_eq!(item.content(), "1,3,7,2");
        let item = serialize_column(0, &col.name, &col.cells, Aggregation::Sum).unwrap();
        assert_eq!(item.content(), "1,6,21,4");
    }

    #[test]
    fn test_serialize_column_insufficient() {
        let col = column("b", &["7", "seven", ""]);
        match serialize_column(0, &col.name, &col.cells, Aggregation::First) {
            Err(Error::InsufficientData { label, found }) => {
                assert_eq!(label, "b");
                assert_eq!(found, 1);
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn test_serialize_columns_tolerant_reindexes() {
        let columns = vec![
            column("a", &["1", "2"]),
            column("bad", &["x", "y"]),
            column("empty", &["", ""]),
            column("c", &["3", "4"]),
        ];
        let items = serialize_columns(&columns, true, Aggregation::First).unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(items[1].label(), "c");
        assert_eq!(items[1].index(), 1);
    }

    #[test]
    fn test_serialize_columns_strict_propagates() {
        let columns = vec![column("a", &["1", "2"]), column("bad", &["x", "y"])];
        assert!(matches!(
            serialize_columns(&columns, false, Aggregation::First),
            Err(Error::InsufficientData { .. })
        ));
    }

    #[test]
    fn test_serialize_rows() {
        let columns = vec![column("a", &["1", "2"]), column("b", &["x", "y"])];
        let items = serialize_rows(&columns);
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].content(), "1,x");
        assert_eq!(items[1].label(), "2");
    }
}
