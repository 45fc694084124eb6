//! File exports for distance matrices and ranked tables.

use crate::table::Table;
use anyhow::{anyhow, Context, Result};
use chrono::{DateTime, Local};
use ncdx_core::DistanceMatrix;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::info;

/// Separator used for matrix exports.
pub const MATRIX_DELIMITER: char = ';';

/// Name of the column prepended to ranked tables.
pub const RANK_COLUMN: &str = "pareto_rank";

const MAX_OBJECTIVE_CHARS: usize = 50;

/// Write `matrix` as `;`-separated text: a header of labels, then one row per
/// item prefixed with its label, values with 6 decimals.
pub fn export_matrix_csv<P: AsRef<Path>>(matrix: &DistanceMatrix, path: P) -> Result<()> {
    let path = path.as_ref();
    let file = File::create(path).with_context(|| format!("failed to create {}", path.display()))?;
    let mut writer = BufWriter::new(file);

    let separator = MATRIX_DELIMITER.to_string();
    let header: Vec<String> = matrix
        .labels()
        .iter()
        .map(|l| quote_field(l, MATRIX_DELIMITER))
        .collect();
    writeln!(writer, "{}{}", separator, header.join(separator.as_str()))?;

    for (label, row) in matrix.labels().iter().zip(matrix.rows()) {
        let values: Vec<String> = row.iter().map(|v| format!("{:.6}", v)).collect();
        writeln!(
            writer,
            "{}{}{}",
            quote_field(label, MATRIX_DELIMITER),
            separator,
            values.join(separator.as_str())
        )?;
    }
    writer.flush()?;

    info!("Distance matrix written to {}", path.display());
    Ok(())
}

/// `<prefix>_<objectives>_<YYYYmmdd_HHMMSS>.csv`, objectives joined by `_`
/// and cut to 50 characters.
pub fn ranked_file_name<S: AsRef<str>>(prefix: &str, objectives: &[S], at: DateTime<Local>) -> String {
    let joined = objectives
        .iter()
        .map(AsRef::as_ref)
        .collect::<Vec<_>>()
        .join("_");
    let objectives: String = joined.chars().take(MAX_OBJECTIVE_CHARS).collect();
    format!("{}_{}_{}.csv", prefix, objectives, at.format("%Y%m%d_%H%M%S"))
}

/// Write `table` with its Pareto rank as the first column into `dir`.
/// Returns the path of the new file.
pub fn export_ranked_table<S: AsRef<str>>(
    table: &Table,
    ranks: &[usize],
    dir: &Path,
    prefix: &str,
    objectives: &[S],
) -> Result<PathBuf> {
    if ranks.len() != table.len() {
        return Err(anyhow!(
            "rank vector has {} entries but the table has {} rows",
            ranks.len(),
            table.len()
        ));
    }
    fs::create_dir_all(dir).with_context(|| format!("failed to create {}", dir.display()))?;

    let path = dir.join(ranked_file_name(prefix, objectives, Local::now()));
    write_ranked(table, ranks, &path)?;

    info!("Ranked table written to {}", path.display());
    Ok(path)
}

fn write_ranked(table: &Table, ranks: &[usize], path: &Path) -> Result<()> {
    let file = File::create(path).with_context(|| format!("failed to create {}", path.display()))?;
    let mut writer = BufWriter::new(file);

    let mut header = vec![RANK_COLUMN.to_string()];
    header.extend(table.headers().iter().map(|h| quote_field(h, ',')));
    writeln!(writer, "{}", header.join(","))?;

    for (rank, record) in ranks.iter().zip(table.records()) {
        let mut fields = vec![rank.to_string()];
        fields.extend(record.iter().map(|f| quote_field(f, ',')));
        writeln!(writer, "{}", fields.join(","))?;
    }
    writer.flush()?;
    Ok(())
}

fn quote_field(field: &str, delimiter: char) -> String {
    if field.contains(delimiter) || field.contains('"') || field.contains('\n') {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_export_matrix_csv() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ncd.csv");
        let matrix = DistanceMatrix::from_rows(
            vec!["a".into(), "b;c".into()],
            vec![vec![0.0, 0.5], vec![0.5, 0.0]],
        )
        .unwrap();

        export_matrix_csv(&matrix, &path).unwrap();
        let text = fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], ";a;\"b;c\"");
        assert_eq!(lines[1], "a;0.000000;0.500000");
        assert_eq!(lines[2], "\"b;c\";0.500000;0.000000");
    }

    #[test]
    fn test_ranked_file_name() {
        let at = Local.with_ymd_and_hms(2024, 3, 9, 14, 5, 7).unwrap();
        assert_eq!(
            ranked_file_name("pareto", &["cost", "score"], at),
            "pareto_cost_score_20240309_140507.csv"
        );
        let long = ["x".repeat(40), "y".repeat(40)];
        let name = ranked_file_name("p", &long, at);
        assert_eq!(name.len(), "p_".len() + 50 + "_20240309_140507.csv".len());
    }

    #[test]
    fn test_export_ranked_table() {
        let dir = tempfile::tempdir().unwrap();
        let table = Table::parse("name;cost\nx,y;3\nz;1\n", ';').unwrap();
        let path = export_ranked_table(&table, &[2, 1], dir.path(), "pareto", &["cost"]).unwrap();

        let text = fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines, vec!["pareto_rank,name,cost", "2,\"x,y\",3", "1,z,1"]);
        assert!(export_ranked_table(&table, &[1], dir.path(), "pareto", &["cost"]).is_err());
    }
}
