//! Command-line parsing for the population enrichment tool.
//!
//! Argument parsing and command dispatch stay separate from the matching
//! engine; everything here ends up as a `RunConfig`.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

/// Top-level CLI.
#[derive(Debug, Parser)]
#[command(
    name = "shape",
    version,
    about = "Enrich a synthetic population with donor attributes via propensity score matching"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

/// CLI subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Split both populations by partition and enrich every base partition.
    Run(RunArgs),
    /// Enrich a single, already-partitioned base/donor pair.
    Match(MatchArgs),
    /// List partitions with their base and donor row counts.
    Partitions(PartitionsArgs),
}

/// Inputs and overrides shared by every command.
#[derive(Debug, Args, Clone)]
pub struct CommonArgs {
    /// Base population CSV (one row per household to enrich).
    #[arg(long, value_name = "CSV")]
    pub base: PathBuf,

    /// Donor population CSV (supplies the transfer columns).
    #[arg(long, value_name = "CSV")]
    pub donor: PathBuf,

    /// Settings file (TOML). Defaults to $SHAPE_CONFIG, then config/shape.toml.
    #[arg(long, value_name = "TOML")]
    pub config: Option<PathBuf>,

    /// Override `n_neighbors` from the settings file.
    #[arg(short = 'k', long)]
    pub n_neighbors: Option<usize>,

    /// Override the settings seed. Without either, a random seed is drawn and reported.
    #[arg(long)]
    pub seed: Option<u64>,
}

#[derive(Debug, Args, Clone)]
pub struct RunArgs {
    #[command(flatten)]
    pub common: CommonArgs,

    /// Column identifying the partition (local authority).
    #[arg(long)]
    pub partition_column: Option<String>,

    /// Restrict the run to these partition ids (repeatable).
    #[arg(long = "only", value_name = "ID")]
    pub only: Vec<String>,

    /// Output directory for enriched CSVs, error log and run report.
    #[arg(long, default_value = "data/output")]
    pub out: PathBuf,
}

#[derive(Debug, Args, Clone)]
pub struct MatchArgs {
    #[command(flatten)]
    pub common: CommonArgs,

    /// Output CSV for the enriched population.
    #[arg(long, value_name = "CSV")]
    pub out: PathBuf,
}

#[derive(Debug, Args, Clone)]
pub struct PartitionsArgs {
    /// Base population CSV.
    #[arg(long, value_name = "CSV")]
    pub base: PathBuf,

    /// Donor population CSV.
    #[arg(long, value_name = "CSV")]
    pub donor: PathBuf,

    /// Column identifying the partition.
    #[arg(long, default_value = "LADCD")]
    pub partition_column: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn run_parses_overrides_and_repeated_only() {
        let cli = Cli::try_parse_from([
            "shape", "run", "--base", "b.csv", "--donor", "d.csv", "-k", "7", "--seed", "3",
            "--only", "E1", "--only", "E2",
        ])
        .unwrap();
        let Command::Run(args) = cli.command else {
            panic!("expected run");
        };
        assert_eq!(args.common.n_neighbors, Some(7));
        assert_eq!(args.common.seed, Some(3));
        assert_eq!(args.only, vec!["E1", "E2"]);
        assert_eq!(args.out, PathBuf::from("data/output"));
    }

    #[test]
    fn match_requires_output_path() {
        assert!(Cli::try_parse_from(["shape", "match", "--base", "b.csv", "--donor", "d.csv"]).is_err());
    }
}
