//! A small row-oriented table used to carry populations through the engine.
//!
//! Row positions are meaningful: the donor row position is the join key
//! between the neighbor search and the enrichment step, so nothing in the
//! engine reorders or filters rows of a table once it has been handed in.

use std::fmt;

use crate::error::EnrichError;

/// A single cell.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Missing,
    Int(i64),
    Float(f64),
    Text(String),
}

impl Value {
    /// Infer a cell from raw CSV text: empty, integer, float, then text.
    pub fn parse(raw: &str) -> Self {
        let raw = raw.trim();
        if raw.is_empty() {
            return Value::Missing;
        }
        if let Ok(v) = raw.parse::<i64>() {
            return Value::Int(v);
        }
        if let Ok(v) = raw.parse::<f64>() {
            return Value::Float(v);
        }
        Value::Text(raw.to_string())
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Int(v) => Some(*v as f64),
            Value::Float(v) if v.is_finite() => Some(*v),
            _ => None,
        }
    }

    pub fn is_missing(&self) -> bool {
        matches!(self, Value::Missing)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Missing => Ok(()),
            Value::Int(v) => write!(f, "{v}"),
            Value::Float(v) => write!(f, "{v}"),
            Value::Text(v) => write!(f, "{v}"),
        }
    }
}

/// Named columns plus rows of equal width.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Table {
    columns: Vec<String>,
    rows: Vec<Vec<Value>>,
}

impl Table {
    pub fn new(columns: Vec<String>) -> Self {
        Self {
            columns,
            rows: Vec::new(),
        }
    }

    /// Build a table, rejecting rows whose width differs from the header.
    pub fn from_rows(columns: Vec<String>, rows: Vec<Vec<Value>>) -> Result<Self, EnrichError> {
        let mut table = Self::new(columns);
        for row in rows {
            table.push_row(row)?;
        }
        Ok(table)
    }

    pub fn push_row(&mut self, row: Vec<Value>) -> Result<(), EnrichError> {
        if row.len() != self.columns.len() {
            return Err(EnrichError::Config(format!(
                "row {} has {} cells, expected {}",
                self.rows.len(),
                row.len(),
                self.columns.len()
            )));
        }
        self.rows.push(row);
        Ok(())
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Vec<Value>] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.column_index(name).is_some()
    }

    /// Like `column_index`, but a missing column is a configuration error.
    pub fn require_column(&self, name: &str, table_label: &str) -> Result<usize, EnrichError> {
        self.column_index(name).ok_or_else(|| {
            EnrichError::Config(format!("{table_label} table is missing column '{name}'"))
        })
    }

    pub fn value(&self, row: usize, col: usize) -> Option<&Value> {
        self.rows.get(row).and_then(|r| r.get(col))
    }

    /// Extract a column as finite `f64`s; any missing or non-numeric cell is an error.
    pub fn numeric_column(&self, name: &str, table_label: &str) -> Result<Vec<f64>, EnrichError> {
        let col = self.require_column(name, table_label)?;
        self.rows
            .iter()
            .enumerate()
            .map(|(i, row)| {
                row[col].as_f64().ok_or_else(|| {
                    EnrichError::Config(format!(
                        "{table_label} column '{name}' row {i} is not numeric: '{}'",
                        row[col]
                    ))
                })
            })
            .collect()
    }

    /// Copy the given rows (in the given order) into a new table with the same header.
    pub fn select_rows(&self, positions: &[usize]) -> Table {
        Table {
            columns: self.columns.clone(),
            rows: positions
                .iter()
                .filter_map(|&i| self.rows.get(i).cloned())
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cols(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn parse_infers_cell_kinds() {
        assert_eq!(Value::parse(""), Value::Missing);
        assert_eq!(Value::parse(" 42 "), Value::Int(42));
        assert_eq!(Value::parse("1.5"), Value::Float(1.5));
        assert_eq!(Value::parse("E06000001"), Value::Text("E06000001".into()));
    }

    #[test]
    fn push_row_rejects_ragged_rows() {
        let mut t = Table::new(cols(&["a", "b"]));
        assert!(t.push_row(vec![Value::Int(1)]).is_err());
        assert!(t.push_row(vec![Value::Int(1), Value::Int(2)]).is_ok());
        assert_eq!(t.len(), 1);
    }

    #[test]
    fn numeric_column_reports_offending_row() {
        let t = Table::from_rows(
            cols(&["x"]),
            vec![vec![Value::Int(1)], vec![Value::Text("n/a".into())]],
        )
        .unwrap();
        let err = t.numeric_column("x", "base").unwrap_err();
        assert!(matches!(err, EnrichError::Config(ref m) if m.contains("row 1")));
        assert!(t.numeric_column("y", "base").is_err());
    }
}
