use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;

/// A table cell resolved once at ingestion into one of four shapes.
///
/// Text that looks like a serialized list or object (`[...]`, `{...}`) is
/// parsed up front, so later stages never have to guess a cell's type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum CellValue {
    Scalar(String),
    Sequence(Vec<CellValue>),
    Mapping(Vec<(String, CellValue)>),
    /// Text that could not be resolved into anything more specific.
    RawText(String),
}

impl CellValue {
    /// Resolve a raw text cell.
    pub fn parse(raw: &str) -> Self {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return CellValue::RawText(String::new());
        }
        if trimmed.starts_with('[') || trimmed.starts_with('{') {
            return parse_literal(trimmed).unwrap_or_else(|| CellValue::RawText(trimmed.to_string()));
        }
        CellValue::Scalar(trimmed.to_string())
    }

    /// The single text value standing in for this cell.
    ///
    /// Sequences reduce to their first element and mappings to their first
    /// value. Reduction goes one level deep: a nested container yields `None`.
    pub fn representative(&self) -> Option<&str> {
        match self {
            CellValue::Scalar(s) | CellValue::RawText(s) => Some(s.as_str()),
            CellValue::Sequence(values) => values.first().and_then(CellValue::as_text),
            CellValue::Mapping(entries) => entries.first().and_then(|(_, v)| v.as_text()),
        }
    }

    /// Numeric value of the representative, if it parses as a float.
    /// NaN counts as missing.
    pub fn as_f64(&self) -> Option<f64> {
        let value = self.representative()?.trim().parse::<f64>().ok()?;
        if value.is_nan() {
            None
        } else {
            Some(value)
        }
    }

    /// The cell's text as it appeared in the source, for row-wise serialization.
    pub fn raw_text(&self) -> String {
        match self {
            CellValue::Scalar(s) | CellValue::RawText(s) => s.clone(),
            CellValue::Sequence(_) | CellValue::Mapping(_) => self.to_json().to_string(),
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, CellValue::RawText(s) if s.is_empty())
    }

    /// Numeric value of this cell under `aggregation`.
    ///
    /// Scalars parse directly. Sequences and mappings reduce their numeric
    /// elements (non-numeric and nested elements are skipped) and yield `None`
    /// when none remain. [`Aggregation::First`] is the same as [`Self::as_f64`].
    pub fn aggregate(&self, aggregation: Aggregation) -> Option<f64> {
        let elements: Vec<&CellValue> = match self {
            CellValue::Scalar(_) | CellValue::RawText(_) => return self.as_f64(),
            _ if aggregation == Aggregation::First => return self.as_f64(),
            CellValue::Sequence(values) => values.iter().collect(),
            CellValue::Mapping(entries) => entries.iter().map(|(_, v)| v).collect(),
        };
        let mut values: Vec<f64> = elements
            .into_iter()
            .filter(|v| v.as_text().is_some())
            .filter_map(CellValue::as_f64)
            .collect();
        if values.is_empty() {
            return None;
        }

        let n = values.len() as f64;
        Some(match aggregation {
            Aggregation::First => values[0],
            Aggregation::Sum => values.iter().sum(),
            Aggregation::Mean => values.iter().sum::<f64>() / n,
            Aggregation::Median => {
                values.sort_by(f64::total_cmp);
                let mid = values.len() / 2;
                if values.len() % 2 == 0 {
                    (values[mid - 1] + values[mid]) / 2.0
                } else {
                    values[mid]
                }
            }
            Aggregation::Mode => mode(&values),
        })
    }

    fn as_text(&self) -> Option<&str> {
        match self {
            CellValue::Scalar(s) | CellValue::RawText(s) => Some(s.as_str()),
            _ => None,
        }
    }

    fn to_json(&self) -> Value {
        match self {
            CellValue::Scalar(s) | CellValue::RawText(s) => Value::String(s.clone()),
            CellValue::Sequence(values) => Value::Array(values.iter().map(CellValue::to_json).collect()),
            CellValue::Mapping(entries) => Value::Object(
                entries
                    .iter()
                    .map(|(k, v)| (k.clone(), v.to_json()))
                    .collect(),
            ),
        }
    }

    fn from_json(value: Value) -> Self {
        match value {
            Value::Null => CellValue::RawText(String::new()),
            Value::Bool(b) => CellValue::Scalar(b.to_string()),
            Value::Number(n) => CellValue::Scalar(n.to_string()),
            Value::String(s) => CellValue::Scalar(s),
            Value::Array(values) => {
                CellValue::Sequence(values.into_iter().map(CellValue::from_json).collect())
            }
            Value::Object(map) => CellValue::Mapping(
                map.into_iter()
                    .map(|(k, v)| (k, CellValue::from_json(v)))
                    .collect(),
            ),
        }
    }
}

/// Most frequent value; ties go to the value seen first.
fn mode(values: &[f64]) -> f64 {
    let mut counts: Vec<(f64, usize)> = Vec::new();
    for &value in values {
        match counts.iter_mut().find(|(v, _)| *v == value) {
            Some((_, count)) => *count += 1,
            None => counts.push((value, 1)),
        }
    }
    let mut best = counts[0];
    for &(value, count) in &counts[1..] {
        if count > best.1 {
            best = (value, count);
        }
    }
    best.0
}

/// How a composite cell (sequence or mapping) is reduced to one number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Aggregation {
    /// First element, one level deep.
    #[default]
    First,
    Mean,
    Median,
    Mode,
    Sum,
}

impl Aggregation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Aggregation::First => "first",
            Aggregation::Mean => "mean",
            Aggregation::Median => "median",
            Aggregation::Mode => "mode",
            Aggregation::Sum => "sum",
        }
    }
}

impl fmt::Display for Aggregation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Aggregation {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "first" => Ok(Aggregation::First),
            "mean" | "avg" => Ok(Aggregation::Mean),
            "median" => Ok(Aggregation::Median),
            "mode" => Ok(Aggregation::Mode),
            "sum" => Ok(Aggregation::Sum),
            other => Err(Error::InvalidConfig(format!("unknown aggregation: {}", other))),
        }
    }
}

/// Parse a JSON literal, falling back to Python-style literal text:
/// single quotes, `True`/`False`/`None`, and `{a, b}` sets (kept in source
/// order).
fn parse_literal(text: &str) -> Option<CellValue> {
    if let Ok(value) = serde_json::from_str::<Value>(text) {
        return Some(CellValue::from_json(value));
    }
    let (normalized, has_colon) = normalize_python_literal(text);
    let candidate = if normalized.starts_with('{') && normalized.ends_with('}') && !has_colon {
        format!("[{}]", &normalized[1..normalized.len() - 1])
    } else {
        normalized
    };
    serde_json::from_str::<Value>(&candidate)
        .ok()
        .map(CellValue::from_json)
}

/// Rewrite Python literal syntax into JSON. Also reports whether a `:` occurs
/// outside string literals.
fn normalize_python_literal(text: &str) -> (String, bool) {
    let mut out = String::with_capacity(text.len());
    let mut word = String::new();
    let mut quote: Option<char> = None;
    let mut has_colon = false;
    let mut chars = text.chars();

    while let Some(c) = chars.next() {
        if let Some(q) = quote {
            match c {
                '\\' => match chars.next() {
                    Some('\'') => out.push('\''),
                    Some(next) => {
                        out.push(c);
                        out.push(next);
                    }
                    None => out.push(c),
                },
                c if c == q => {
                    out.push('"');
                    quote = None;
                }
                '"' => out.push_str("\\\""),
                c => out.push(c),
            }
            continue;
        }

        if c.is_ascii_alphanumeric() || c == '_' {
            word.push(c);
            continue;
        }
        flush_word(&mut word, &mut out);
        match c {
            '\'' | '"' => {
                quote = Some(c);
                out.push('"');
            }
            ':' => {
                has_colon = true;
                out.push(c);
            }
            c => out.push(c),
        }
    }
    flush_word(&mut word, &mut out);
    (out, has_colon)
}

fn flush_word(word: &mut String, out: &mut String) {
    match word.as_str() {
        "True" => out.push_str("true"),
        "False" => out.push_str("false"),
        "None" => out.push_str("null"),
        other => out.push_str(other),
    }
    word.clear();
}

/// One unit of distance comparison: a column (or record) reduced to a single
/// canonical string.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Item {
    index: usize,
    label: String,
    content: String,
}

impl Item {
    #[inline]
    #[must_use]
    pub fn new(index: usize, label: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            index,
            label: label.into(),
            content: content.into(),
        }
    }

    #[inline]
    pub fn index(&self) -> usize {
        self.index
    }

    #[inline]
    pub fn label(&self) -> &str {
        &self.label
    }

    #[inline]
    pub fn content(&self) -> &str {
        &self.content
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_scalar_and_empty() {
        assert_eq!(CellValue::parse(" 3.5 "), CellValue::Scalar("3.5".to_string()));
        assert!(CellValue::parse("   ").is_empty());
    }

    #[test]
    fn test_parse_sequence_literal() {
        let cell = CellValue::parse("[4, 5, 6]");
        assert!(matches!(cell, CellValue::Sequence(ref v) if v.len() == 3));
        assert_eq!(cell.as_f64(), Some(4.0));
    }

    #[test]
    fn test_parse_python_style_mapping_keeps_order() {
        let cell = CellValue::parse("{'b': 2, 'a': 1}");
        assert_eq!(cell.representative(), Some("2"));
        assert_eq!(cell.as_f64(), Some(2.0));
    }

    #[test]
    fn test_unparseable_literal_is_raw_text() {
        let cell = CellValue::parse("[1, 2");
        assert_eq!(cell, CellValue::RawText("[1, 2".to_string()));
        assert_eq!(cell.as_f64(), None);
    }

    #[test]
    fn test_nested_container_has_no_representative() {
        let cell = CellValue::parse("[[1, 2], 3]");
        assert_eq!(cell.representative(), None);
    }

    #[test]
    fn test_python_set_literal() {
        let cell = CellValue::parse("{3, 9}");
        assert!(matches!(cell, CellValue::Sequence(ref v) if v.len() == 2));
        assert_eq!(cell.as_f64(), Some(3.0));

        let cell = CellValue::parse("{'x', 'y'}");
        assert_eq!(cell.representative(), Some("x"));
    }

    #[test]
    fn test_python_constants_in_literal() {
        let cell = CellValue::parse("[1, True]");
        assert_eq!(cell.as_f64(), Some(1.0));

        let cell = CellValue::parse("{'ok': False, 'n': None}");
        assert_eq!(cell.representative(), Some("false"));

        let cell = CellValue::parse("['it\\'s', 2]");
        assert_eq!(cell.representative(), Some("it's"));
    }

    #[test]
    fn test_aggregate_sequence() {
        let cell = CellValue::parse("[4, 1, 4, 7, 'x']");
        assert_eq!(cell.aggregate(Aggregation::First), Some(4.0));
        assert_eq!(cell.aggregate(Aggregation::Sum), Some(16.0));
        assert_eq!(cell.aggregate(Aggregation::Mean), Some(4.0));
        assert_eq!(cell.aggregate(Aggregation::Median), Some(4.0));
        assert_eq!(cell.aggregate(Aggregation::Mode), Some(4.0));

        let even = CellValue::parse("{2, 8, 4, 6}");
        assert_eq!(even.aggregate(Aggregation::Median), Some(5.0));
        assert_eq!(even.aggregate(Aggregation::Mode), Some(2.0));
    }

    #[test]
    fn test_aggregate_mapping_and_scalars() {
        let cell = CellValue::parse("{'a': 1, 'b': [9], 'c': 3}");
        assert_eq!(cell.aggregate(Aggregation::Mean), Some(2.0));
        assert_eq!(CellValue::parse("2.5").aggregate(Aggregation::Sum), Some(2.5));
        assert_eq!(CellValue::parse("['a', 'b']").aggregate(Aggregation::Mean), None);
        assert_eq!(CellValue::parse("[[1, 2]]").aggregate(Aggregation::Sum), None);
    }

    #[test]
    fn test_aggregation_from_str() {
        assert_eq!("Median".parse::<Aggregation>().unwrap(), Aggregation::Median);
        assert_eq!(Aggregation::default().to_string(), "first");
        assert!(matches!("max".parse::<Aggregation>(), Err(Error::InvalidConfig(_))));
    }

    #[test]
    fn test_nan_is_missing() {
        assert_eq!(CellValue::parse("NaN").as_f64(), None);
        assert_eq!(CellValue::parse("abc").as_f64(), None);
        assert_eq!(CellValue::parse("-2e3").as_f64(), Some(-2000.0));
    }
}
