//! CSV ingest.
//!
//! Inputs are population tables that upstream preparation has already
//! recoded: one header row, then one record per household. Cells are inferred
//! as integer, float or text; an empty cell is `Missing`. Row order is
//! preserved exactly, since it defines each record's position.

use std::fs::File;
use std::io::Read;
use std::path::Path;

use crate::domain::{Table, Value};
use crate::error::AppError;

/// Load a CSV file into a `Table`.
pub fn read_table(path: &Path) -> Result<Table, AppError> {
    let file = File::open(path)
        .map_err(|e| AppError::new(2, format!("Failed to open CSV '{}': {e}", path.display())))?;
    read_table_from(file, &path.display().to_string())
}

/// Load CSV from any reader; `label` names the source in error messages.
pub fn read_table_from<R: Read>(reader: R, label: &str) -> Result<Table, AppError> {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(reader);

    let headers: Vec<String> = reader
        .headers()
        .map_err(|e| AppError::new(2, format!("Failed to read CSV headers from '{label}': {e}")))?
        .iter()
        .map(str::to_string)
        .collect();

    if let Some(dup) = first_duplicate(&headers) {
        return Err(AppError::new(2, format!("Duplicate column '{dup}' in '{label}'.")));
    }

    let mut table = Table::new(headers);
    for (idx, result) in reader.records().enumerate() {
        // +2: header is line 1, records are 1-based.
        let line = idx + 2;
        let record = result
            .map_err(|e| AppError::new(2, format!("CSV parse error in '{label}' line {line}: {e}")))?;
        let row = record.iter().map(Value::parse).collect();
        table
            .push_row(row)
            .map_err(|e| AppError::new(2, format!("'{label}' line {line}: {e}")))?;
    }

    Ok(table)
}

fn first_duplicate(headers: &[String]) -> Option<&str> {
    headers
        .iter()
        .enumerate()
        .find(|(i, h)| headers[..*i].contains(*h))
        .map(|(_, h)| h.as_str())
}
