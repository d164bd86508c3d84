//! Top-level application orchestration.
//!
//! `src/main.rs` is intentionally tiny; this module is the "real main" that:
//! - parses CLI arguments
//! - resolves settings into an explicit `RunConfig`
//! - loads both populations
//! - runs the per-partition matching pipeline
//! - writes enriched CSVs, the error log and the run report

use clap::Parser;
use tracing::info;

use crate::cli::{Command, CommonArgs, MatchArgs, PartitionsArgs, RunArgs};
use crate::domain::RunConfig;
use crate::error::AppError;
use crate::io::{Settings, load_settings, resolve_settings_path};
use crate::report::RunReport;

pub mod pipeline;

/// Entry point for the `shape` binary.
pub fn run() -> Result<(), AppError> {
    run_with_args(std::env::args_os())
}

/// Parse `argv` (including the program name) and dispatch.
pub fn run_with_args<I, T>(argv: I) -> Result<(), AppError>
where
    I: IntoIterator<Item = T>,
    T: Into<std::ffi::OsString> + Clone,
{
    let cli = crate::cli::Cli::try_parse_from(argv).map_err(|e| {
        // Help and version requests are not failures.
        let code = if e.use_stderr() { 2 } else { 0 };
        AppError::new(code, e.to_string())
    })?;

    match cli.command {
        Command::Run(args) => handle_run(args),
        Command::Match(args) => handle_match(args),
        Command::Partitions(args) => handle_partitions(args),
    }
}

fn handle_run(args: RunArgs) -> Result<(), AppError> {
    let settings = load_settings(&resolve_settings_path(args.common.config.as_deref()))?;
    let config = run_config_from_args(&args.common, args.partition_column.as_deref(), &args.only, &settings);

    let base = crate::io::read_table(&config.base_path)?;
    let donor = crate::io::read_table(&config.donor_path)?;
    info!(base_rows = base.len(), donor_rows = donor.len(), "populations loaded");

    let output = pipeline::run_partitions(
        &base,
        &donor,
        &config.partition_column,
        config.seed,
        &config.matching,
        &config.only,
    )?;

    crate::io::ensure_out_dir(&args.out)?;
    for part in &output.partitions {
        if let Some(enriched) = part.enriched() {
            let path = args.out.join(crate::io::partition_file_name(&part.partition));
            crate::io::write_table_csv(&path, &enriched.table)?;
        }
    }
    let failed = output.failed_ids();
    let log_path = crate::io::write_error_log(&args.out, &failed)?;

    let report = RunReport::from_output(&output, &config.matching, &config.partition_column, config.seed);
    let report_path = crate::io::write_run_report(&args.out, &report)?;
    info!(error_log = %log_path.display(), report = %report_path.display(), "outputs written");

    println!("{}", crate::report::format_run_summary(&report));

    if output.enriched_count() == 0 && !output.partitions.is_empty() {
        return Err(AppError::new(3, "No partition could be enriched."));
    }
    Ok(())
}

fn handle_match(args: MatchArgs) -> Result<(), AppError> {
    let settings = load_settings(&resolve_settings_path(args.common.config.as_deref()))?;
    let config = run_config_from_args(&args.common, None, &[], &settings);

    let base = crate::io::read_table(&config.base_path)?;
    let donor = crate::io::read_table(&config.donor_path)?;

    let part = pipeline::run_partition("single", &base, &donor, config.seed, &config.matching);
    let enriched = match part.outcome {
        pipeline::PartitionOutcome::Enriched(e) => e,
        pipeline::PartitionOutcome::Failed(err) => return Err(err.into()),
    };

    crate::io::write_table_csv(&args.out, &enriched.table)?;
    info!(
        rows = enriched.table.len(),
        distinct_donors = enriched.diagnostics.distinct_donors,
        out = %args.out.display(),
        "enriched population written"
    );
    Ok(())
}

fn handle_partitions(args: PartitionsArgs) -> Result<(), AppError> {
    let base = crate::io::read_table(&args.base)?;
    let donor = crate::io::read_table(&args.donor)?;
    let base_parts = pipeline::split_by_partition(&base, &args.partition_column, "base")?;
    let donor_parts = pipeline::split_by_partition(&donor, &args.partition_column, "donor")?;

    let mut ids: Vec<&String> = base_parts.keys().chain(donor_parts.keys()).collect();
    ids.sort();
    ids.dedup();

    let rows: Vec<(String, usize, usize)> = ids
        .into_iter()
        .map(|id| {
            (
                id.clone(),
                base_parts.get(id).map_or(0, |t| t.len()),
                donor_parts.get(id).map_or(0, |t| t.len()),
            )
        })
        .collect();
    print!("{}", crate::report::format_partition_counts(&rows));
    Ok(())
}

/// Merge settings with CLI overrides into an explicit run configuration.
///
/// When neither the CLI nor the settings file gives a seed, one is drawn from
/// the thread RNG; it is recorded in the run report so the run can be repeated.
pub fn run_config_from_args(
    args: &CommonArgs,
    partition_column: Option<&str>,
    only: &[String],
    settings: &Settings,
) -> RunConfig {
    let mut matching = settings.match_config();
    if let Some(k) = args.n_neighbors {
        matching.n_neighbors = k;
    }

    RunConfig {
        base_path: args.base.clone(),
        donor_path: args.donor.clone(),
        partition_column: partition_column
            .map(str::to_string)
            .unwrap_or_else(|| settings.partition_column.clone()),
        seed: args.seed.or(settings.seed).unwrap_or_else(rand::random),
        only: only.to_vec(),
        matching,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn settings() -> Settings {
        crate::io::parse_settings(
            r#"
            n_neighbors = 5
            overlap_columns = ["rooms"]
            transfer_columns = ["GAS"]
            seed = 11
            "#,
        )
        .unwrap()
    }

    fn common(n_neighbors: Option<usize>, seed: Option<u64>) -> CommonArgs {
        CommonArgs {
            base: PathBuf::from("b.csv"),
            donor: PathBuf::from("d.csv"),
            config: None,
            n_neighbors,
            seed,
        }
    }

    #[test]
    fn cli_flags_override_settings() {
        let cfg = run_config_from_args(&common(Some(2), Some(99)), Some("LAD"), &[], &settings());
        assert_eq!(cfg.matching.n_neighbors, 2);
        assert_eq!(cfg.seed, 99);
        assert_eq!(cfg.partition_column, "LAD");
    }

    #[test]
    fn settings_fill_unset_flags() {
        let cfg = run_config_from_args(&common(None, None), None, &[], &settings());
        assert_eq!(cfg.matching.n_neighbors, 5);
        assert_eq!(cfg.seed, 11);
        assert_eq!(cfg.partition_column, "LADCD");
        assert_eq!(cfg.matching.drop_columns, vec!["tenure"]);
    }
}
