//! Output writers: enriched CSVs, the failed-partition log, and the JSON run report.

use std::fs::{File, create_dir_all};
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::domain::Table;
use crate::error::AppError;
use crate::report::RunReport;

/// Write a table as CSV with a header row. Missing cells are written empty.
pub fn write_table_csv(path: &Path, table: &Table) -> Result<(), AppError> {
    let file = File::create(path)
        .map_err(|e| AppError::new(2, format!("Failed to create CSV '{}': {e}", path.display())))?;
    write_table_to(file, table)
        .map_err(|e| AppError::new(2, format!("Failed to write CSV '{}': {e}", path.display())))
}

/// Write a table as CSV to any writer.
pub fn write_table_to<W: Write>(writer: W, table: &Table) -> Result<(), csv::Error> {
    let mut out = csv::Writer::from_writer(writer);
    out.write_record(table.columns())?;
    for row in table.rows() {
        out.write_record(row.iter().map(|v| v.to_string()))?;
    }
    out.flush()?;
    Ok(())
}

/// Output file name for an enriched partition.
pub fn partition_file_name(partition: &str) -> String {
    format!("{partition}_SHAPE.csv")
}

/// Create the output directory if needed.
pub fn ensure_out_dir(dir: &Path) -> Result<(), AppError> {
    create_dir_all(dir)
        .map_err(|e| AppError::new(2, format!("Failed to create output dir '{}': {e}", dir.display())))
}

/// Write failed partition ids, one per line.
pub fn write_error_log(dir: &Path, failed: &[&str]) -> Result<PathBuf, AppError> {
    let path = dir.join("error_log.txt");
    let mut file = File::create(&path)
        .map_err(|e| AppError::new(2, format!("Failed to create '{}': {e}", path.display())))?;
    for id in failed {
        writeln!(file, "{id}")
            .map_err(|e| AppError::new(2, format!("Failed to write '{}': {e}", path.display())))?;
    }
    Ok(path)
}

/// Write the run report as pretty JSON.
pub fn write_run_report(dir: &Path, report: &RunReport) -> Result<PathBuf, AppError> {
    let path = dir.join("run_report.json");
    let file = File::create(&path)
        .map_err(|e| AppError::new(2, format!("Failed to create '{}': {e}", path.display())))?;
    serde_json::to_writer_pretty(file, report)
        .map_err(|e| AppError::new(2, format!("Failed to write run report JSON: {e}")))?;
    Ok(path)
}
