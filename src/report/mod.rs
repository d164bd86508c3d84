//! Run reports: the JSON-serialisable summary and terminal formatting.

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};

use crate::app::pipeline::{PartitionOutcome, RunOutput};
use crate::domain::{MatchConfig, MatchDiagnostics};

pub mod format;

pub use format::*;

/// Per-partition entry of the run report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PartitionSummary {
    pub partition: String,
    pub base_rows: usize,
    pub donor_rows: usize,
    pub seed: u64,
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_kind: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub diagnostics: Option<MatchDiagnostics>,
}

/// Whole-run report written to `run_report.json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunReport {
    pub tool: String,
    pub generated: DateTime<Local>,
    pub seed: u64,
    pub partition_column: String,
    pub config: MatchConfig,
    pub enriched: usize,
    pub failed: usize,
    pub donor_only: Vec<String>,
    pub partitions: Vec<PartitionSummary>,
}

impl RunReport {
    pub fn from_output(
        output: &RunOutput,
        config: &MatchConfig,
        partition_column: &str,
        seed: u64,
    ) -> Self {
        let partitions: Vec<PartitionSummary> = output
            .partitions
            .iter()
            .map(|p| {
                let (status, error_kind, error, diagnostics) = match &p.outcome {
                    PartitionOutcome::Enriched(e) => {
                        ("enriched", None, None, Some(e.diagnostics.clone()))
                    }
                    PartitionOutcome::Failed(err) => (
                        "failed",
                        Some(err.kind().to_string()),
                        Some(err.to_string()),
                        None,
                    ),
                };
                PartitionSummary {
                    partition: p.partition.clone(),
                    base_rows: p.base_rows,
                    donor_rows: p.donor_rows,
                    seed: p.seed,
                    status: status.to_string(),
                    error_kind,
                    error,
                    diagnostics,
                }
            })
            .collect();

        Self {
            tool: "shape".to_string(),
            generated: Local::now(),
            seed,
            partition_column: partition_column.to_string(),
            config: config.clone(),
            enriched: output.enriched_count(),
            failed: output.failed_ids().len(),
            donor_only: output.donor_only.clone(),
            partitions,
        }
    }
}
