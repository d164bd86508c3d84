//! Shared domain types.
//!
//! These describe one partition's matching run: the explicit configuration
//! handed to every component, the intermediate shortlist, and the pairs and
//! diagnostics that come out the other end.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Name of the synthetic covariate built by factorising `area_column`.
pub const AREA_FACTOR_COLUMN: &str = "area_factor";

/// Scaffolding columns that never survive into an enriched table.
pub const SCAFFOLD_COLUMNS: [&str; 3] = ["propensity_score", "treatment", AREA_FACTOR_COLUMN];

/// Matching configuration for a single partition.
///
/// Built once from the settings file plus CLI overrides and passed by
/// reference into each step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchConfig {
    /// Shortlist length `k`.
    pub n_neighbors: usize,
    /// Covariates present in both populations, used for scoring.
    pub overlap_columns: Vec<String>,
    /// Donor columns copied onto each matched base record.
    pub transfer_columns: Vec<String>,
    /// Base helper columns removed from the enriched output (e.g. `tenure`).
    pub drop_columns: Vec<String>,
    /// Optional geography column factorised into the `area_factor` covariate.
    pub area_column: Option<String>,
}

impl Default for MatchConfig {
    fn default() -> Self {
        Self {
            n_neighbors: 5,
            overlap_columns: Vec::new(),
            transfer_columns: Vec::new(),
            drop_columns: vec!["tenure".to_string()],
            area_column: None,
        }
    }
}

/// One donor on a base record's shortlist.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NeighborCandidate {
    /// Row position in the donor table.
    pub donor: usize,
    /// Absolute propensity difference (always >= 0).
    pub distance: f64,
}

/// The `k`-nearest shortlists for every base record, row-aligned to the base table.
#[derive(Debug, Clone, PartialEq)]
pub struct Shortlists {
    pub k: usize,
    /// Donor population size the indices refer to.
    pub donor_rows: usize,
    /// One shortlist per base record, ascending by distance.
    pub lists: Vec<Vec<NeighborCandidate>>,
}

/// `(base, donor)` row positions. Exactly one per base record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchedPair {
    pub base: usize,
    pub donor: usize,
}

/// Summary statistics describing how a partition was matched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchDiagnostics {
    pub distinct_donors: usize,
    pub max_donor_reuse: usize,
    pub mean_chosen_distance: f64,
    /// Share of base records with at least one zero-distance candidate.
    pub perfect_match_share: f64,
}

/// A full run's configuration as understood by the driver.
///
/// Derived from the settings file plus CLI flags.
#[derive(Debug, Clone, PartialEq)]
pub struct RunConfig {
    pub base_path: PathBuf,
    pub donor_path: PathBuf,
    pub partition_column: String,
    pub seed: u64,
    /// Partition ids to restrict the run to (empty means all).
    pub only: Vec<String>,
    pub matching: MatchConfig,
}
