//! Formatted terminal output.
//!
//! Kept apart from the pipeline so matching code never prints.

use crate::report::RunReport;

/// Format the run summary: settings, totals, then one line per partition.
pub fn format_run_summary(report: &RunReport) -> String {
    let mut out = String::new();

    out.push_str("=== shape - population enrichment (PSM) ===\n");
    out.push_str(&format!(
        "Seed: {} | k={} | partition column: {}\n",
        report.seed, report.config.n_neighbors, report.partition_column
    ));
    out.push_str(&format!(
        "Overlap: {}\n",
        report.config.overlap_columns.join(", ")
    ));
    out.push_str(&format!(
        "Transfer: {}\n",
        report.config.transfer_columns.join(", ")
    ));
    out.push_str(&format!(
        "Partitions: {} enriched, {} failed",
        report.enriched, report.failed
    ));
    if !report.donor_only.is_empty() {
        out.push_str(&format!(", {} donor-only skipped", report.donor_only.len()));
    }
    out.push('\n');

    if report.partitions.is_empty() {
        return out;
    }

    out.push_str(&format!(
        "\n{:<12} {:>8} {:>8} {:>9} {:>9} {:>10} {:>8}\n",
        "partition", "base", "donor", "donors", "max_reuse", "mean_dist", "perfect"
    ));
    for p in &report.partitions {
        match &p.diagnostics {
            Some(d) => out.push_str(&format!(
                "{:<12} {:>8} {:>8} {:>9} {:>9} {:>10.2e} {:>7.1}%\n",
                p.partition,
                p.base_rows,
                p.donor_rows,
                d.distinct_donors,
                d.max_donor_reuse,
                d.mean_chosen_distance,
                d.perfect_match_share * 100.0
            )),
            None => out.push_str(&format!(
                "{:<12} {:>8} {:>8}  FAILED ({})\n",
                p.partition,
                p.base_rows,
                p.donor_rows,
                p.error_kind.as_deref().unwrap_or("unknown")
            )),
        }
    }

    out
}

/// Format partition ids with their base/donor row counts.
pub fn format_partition_counts(rows: &[(String, usize, usize)]) -> String {
    let mut out = format!("{:<12} {:>8} {:>8}\n", "partition", "base", "donor");
    for (id, base, donor) in rows {
        out.push_str(&format!("{id:<12} {base:>8} {donor:>8}\n"));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{MatchConfig, MatchDiagnostics};
    use crate::report::PartitionSummary;
    use chrono::Local;

    #[test]
    fn summary_lists_enriched_and_failed_partitions() {
        let report = RunReport {
            tool: "shape".into(),
            generated: Local::now(),
            seed: 42,
            partition_column: "LADCD".into(),
            config: MatchConfig {
                overlap_columns: vec!["rooms".into()],
                transfer_columns: vec!["GAS".into()],
                ..MatchConfig::default()
            },
            enriched: 1,
            failed: 1,
            donor_only: vec![],
            partitions: vec![
                PartitionSummary {
                    partition: "E06000001".into(),
                    base_rows: 100,
                    donor_rows: 20,
                    seed: 1,
                    status: "enriched".into(),
                    error_kind: None,
                    error: None,
                    diagnostics: Some(MatchDiagnostics {
                        distinct_donors: 18,
                        max_donor_reuse: 9,
                        mean_chosen_distance: 0.001,
                        perfect_match_share: 0.25,
                    }),
                },
                PartitionSummary {
                    partition: "E06000002".into(),
                    base_rows: 50,
                    donor_rows: 1,
                    seed: 2,
                    status: "failed".into(),
                    error_kind: Some("config".into()),
                    error: Some("configuration error".into()),
                    diagnostics: None,
                },
            ],
        };

        let s = format_run_summary(&report);
        assert!(s.contains("1 enriched, 1 failed"));
        assert!(s.contains("E06000001"));
        assert!(s.contains("25.0%"));
        assert!(s.contains("FAILED (config)"));
    }

    #[test]
    fn partition_counts_table_has_one_line_per_partition() {
        let s = format_partition_counts(&[("E1".into(), 10, 3), ("E2".into(), 4, 0)]);
        assert_eq!(s.lines().count(), 3);
    }
}
