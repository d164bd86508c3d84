//! Multi-partition driver shared by the `run` and `match` commands.
//!
//! Both tables are split by the partition column (one local authority each),
//! then every partition present in the base table is enriched independently:
//! its own seeded RNG, no shared mutable state, and a `Result` captured per
//! partition so one failure never stops the rest. Partitions run in parallel
//! on the rayon pool; output order follows the sorted partition ids.

use std::collections::BTreeMap;
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use rand::SeedableRng;
use rand::rngs::StdRng;
use rayon::prelude::*;
use tracing::{debug, info, warn};

use crate::domain::{MatchConfig, Table};
use crate::error::{AppError, EnrichError};
use crate::psm::{EnrichedPartition, enrich_partition};

/// What happened to one partition.
#[derive(Debug, Clone, PartialEq)]
pub enum PartitionOutcome {
    Enriched(EnrichedPartition),
    Failed(EnrichError),
}

#[derive(Debug, Clone, PartialEq)]
pub struct PartitionRun {
    pub partition: String,
    pub base_rows: usize,
    pub donor_rows: usize,
    pub seed: u64,
    pub outcome: PartitionOutcome,
}

impl PartitionRun {
    pub fn enriched(&self) -> Option<&EnrichedPartition> {
        match &self.outcome {
            PartitionOutcome::Enriched(e) => Some(e),
            PartitionOutcome::Failed(_) => None,
        }
    }

    pub fn error(&self) -> Option<&EnrichError> {
        match &self.outcome {
            PartitionOutcome::Enriched(_) => None,
            PartitionOutcome::Failed(e) => Some(e),
        }
    }
}

/// All partition outcomes of a run, sorted by partition id.
#[derive(Debug, Clone, PartialEq)]
pub struct RunOutput {
    pub partitions: Vec<PartitionRun>,
    /// Partitions that only exist in the donor table (nothing to enrich).
    pub donor_only: Vec<String>,
}

impl RunOutput {
    pub fn failed_ids(&self) -> Vec<&str> {
        self.partitions
            .iter()
            .filter(|p| p.error().is_some())
            .map(|p| p.partition.as_str())
            .collect()
    }

    pub fn enriched_count(&self) -> usize {
        self.partitions.iter().filter(|p| p.enriched().is_some()).count()
    }
}

/// Group rows by the text of `column`, keeping original row order within each group.
pub fn split_by_partition(
    table: &Table,
    column: &str,
    label: &str,
) -> Result<BTreeMap<String, Table>, AppError> {
    let col = table
        .require_column(column, label)
        .map_err(AppError::from)?;

    let mut positions: BTreeMap<String, Vec<usize>> = BTreeMap::new();
    for (i, row) in table.rows().iter().enumerate() {
        if row[col].is_missing() {
            return Err(AppError::new(
                2,
                format!("{label} row {i} has no value in partition column '{column}'"),
            ));
        }
        positions.entry(row[col].to_string()).or_default().push(i);
    }

    Ok(positions
        .into_iter()
        .map(|(id, rows)| (id, table.select_rows(&rows)))
        .collect())
}

/// Derive a partition's RNG seed from the run seed and its id.
///
/// Seeds depend only on `(run_seed, partition)`, so results are the same
/// whatever order the pool schedules partitions in.
pub fn partition_seed(run_seed: u64, partition: &str) -> u64 {
    let mut hasher = DefaultHasher::new();
    run_seed.hash(&mut hasher);
    partition.hash(&mut hasher);
    hasher.finish()
}

/// Enrich one already-isolated partition.
pub fn run_partition(
    partition: &str,
    base: &Table,
    donor: &Table,
    run_seed: u64,
    config: &MatchConfig,
) -> PartitionRun {
    let seed = partition_seed(run_seed, partition);
    let mut rng = StdRng::seed_from_u64(seed);

    debug!(partition, base_rows = base.len(), donor_rows = donor.len(), "matching partition");
    let outcome = match enrich_partition(base, donor, config, &mut rng) {
        Ok(enriched) => {
            debug!(
                partition,
                distinct_donors = enriched.diagnostics.distinct_donors,
                max_reuse = enriched.diagnostics.max_donor_reuse,
                "partition enriched"
            );
            PartitionOutcome::Enriched(enriched)
        }
        Err(err) => {
            warn!(partition, kind = err.kind(), "partition excluded: {err}");
            PartitionOutcome::Failed(err)
        }
    };

    PartitionRun {
        partition: partition.to_string(),
        base_rows: base.len(),
        donor_rows: donor.len(),
        seed,
        outcome,
    }
}

/// Split both populations and enrich every base partition.
///
/// `only`, when non-empty, restricts the run to the listed partition ids.
pub fn run_partitions(
    base: &Table,
    donor: &Table,
    partition_column: &str,
    run_seed: u64,
    config: &MatchConfig,
    only: &[String],
) -> Result<RunOutput, AppError> {
    let base_parts = split_by_partition(base, partition_column, "base")?;
    let mut donor_parts = split_by_partition(donor, partition_column, "donor")?;

    let donor_only: Vec<String> = donor_parts
        .keys()
        .filter(|id| !base_parts.contains_key(*id))
        .cloned()
        .collect();
    for id in &donor_only {
        debug!(partition = %id, "donor-only partition skipped");
    }

    let jobs: Vec<(String, Table, Table)> = base_parts
        .into_iter()
        .filter(|(id, _)| only.is_empty() || only.contains(id))
        .map(|(id, base_part)| {
            // A partition missing from the donor table fails in `validate`.
            let donor_part = donor_parts
                .remove(&id)
                .unwrap_or_else(|| Table::new(donor.columns().to_vec()));
            (id, base_part, donor_part)
        })
        .collect();

    info!(partitions = jobs.len(), seed = run_seed, "starting partition runs");

    let partitions: Vec<PartitionRun> = jobs
        .par_iter()
        .map(|(id, base_part, donor_part)| run_partition(id, base_part, donor_part, run_seed, config))
        .collect();

    let output = RunOutput {
        partitions,
        donor_only,
    };
    info!(
        enriched = output.enriched_count(),
        failed = output.failed_ids().len(),
        "partition runs finished"
    );
    Ok(output)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Value;

    fn households(lads: &[(&str, usize)], donor: bool) -> Table {
        let mut columns = vec!["LADCD".to_string(), "rooms".to_string(), "accom".to_string()];
        if donor {
            columns.push("FLOOR_AREA".to_string());
        }
        let mut table = Table::new(columns);
        for (lad, n) in lads {
            for i in 0..*n as i64 {
                let mut row = vec![
                    Value::Text(lad.to_string()),
                    Value::Int(1 + (i * if donor { 5 } else { 3 }) % 6),
                    Value::Int(1 + i % 4),
                ];
                if donor {
                    row.push(Value::Int(30 + i));
                }
                table.push_row(row).unwrap();
            }
        }
        table
    }

    fn config() -> MatchConfig {
        MatchConfig {
            n_neighbors: 3,
            overlap_columns: vec!["rooms".into(), "accom".into()],
            transfer_columns: vec!["FLOOR_AREA".into()],
            drop_columns: vec![],
            area_column: None,
        }
    }

    #[test]
    fn split_keeps_row_order_within_partition() {
        let t = households(&[("E2", 2), ("E1", 3), ("E2", 1)], false);
        let parts = split_by_partition(&t, "LADCD", "base").unwrap();
        assert_eq!(parts.keys().collect::<Vec<_>>(), vec!["E1", "E2"]);
        assert_eq!(parts["E2"].len(), 3);
        assert_eq!(parts["E1"].rows()[2][1], t.rows()[4][1]);
    }

    #[test]
    fn failed_partition_does_not_stop_others() {
        let base = households(&[("E1", 40), ("E2", 30), ("E3", 20)], false);
        // E2 has too few donors for k = 3; E4 exists only in donors.
        let donor = households(&[("E1", 15), ("E2", 2), ("E3", 12), ("E4", 5)], true);

        let out = run_partitions(&base, &donor, "LADCD", 9, &config(), &[]).unwrap();
        assert_eq!(out.partitions.len(), 3);
        assert_eq!(out.failed_ids(), vec!["E2"]);
        assert_eq!(out.donor_only, vec!["E4".to_string()]);
        assert!(matches!(out.partitions[1].error(), Some(EnrichError::Config(_))));

        for p in out.partitions.iter().filter_map(|p| p.enriched().map(|e| (p, e))) {
            assert_eq!(p.1.table.len(), p.0.base_rows);
        }
    }

    #[test]
    fn runs_are_reproducible_for_a_seed() {
        let base = households(&[("E1", 40), ("E3", 20)], false);
        let donor = households(&[("E1", 15), ("E3", 12)], true);
        let a = run_partitions(&base, &donor, "LADCD", 77, &config(), &[]).unwrap();
        let b = run_partitions(&base, &donor, "LADCD", 77, &config(), &[]).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn only_filter_restricts_partitions() {
        let base = households(&[("E1", 40), ("E3", 20)], false);
        let donor = households(&[("E1", 15), ("E3", 12)], true);
        let out = run_partitions(&base, &donor, "LADCD", 1, &config(), &["E3".to_string()]).unwrap();
        assert_eq!(out.partitions.len(), 1);
        assert_eq!(out.partitions[0].partition, "E3");
    }

    #[test]
    fn partition_seeds_differ_by_partition() {
        assert_eq!(partition_seed(1, "E1"), partition_seed(1, "E1"));
        assert_ne!(partition_seed(1, "E1"), partition_seed(1, "E2"));
        assert_ne!(partition_seed(1, "E1"), partition_seed(2, "E1"));
    }

    #[test]
    fn missing_partition_column_is_usage_error() {
        let t = households(&[("E1", 2)], false);
        let err = split_by_partition(&t, "LAD", "base").unwrap_err();
        assert_eq!(err.exit_code(), 2);
    }
}
