//! Propensity score matching for one partition.
//!
//! Data flows strictly left to right:
//!
//! 1. `propensity`: fit a separability model on base ∪ donor, score every row
//! 2. `neighbors`: per base record, the `k` donors with the closest score
//! 3. `matcher`: resolve each shortlist to one donor by weighted draw
//! 4. `enrich`: join the chosen donor's transfer columns onto the base record
//!
//! The base and donor tables are borrowed immutably for the whole call, so the
//! donor row positions produced in step 2 are the ones joined in step 4.

use std::collections::HashMap;

use rand::Rng;

use crate::domain::{AREA_FACTOR_COLUMN, MatchConfig, MatchDiagnostics, MatchedPair, Shortlists, Table};
use crate::error::EnrichError;

pub mod enrich;
pub mod matcher;
pub mod neighbors;
pub mod propensity;

pub use enrich::*;
pub use matcher::*;
pub use neighbors::*;
pub use propensity::*;

/// Output of a successful partition run.
#[derive(Debug, Clone, PartialEq)]
pub struct EnrichedPartition {
    pub table: Table,
    pub pairs: Vec<MatchedPair>,
    pub diagnostics: MatchDiagnostics,
}

/// Enrich one partition using logistic propensity scores.
pub fn enrich_partition<R: Rng + ?Sized>(
    base: &Table,
    donor: &Table,
    config: &MatchConfig,
    rng: &mut R,
) -> Result<EnrichedPartition, EnrichError> {
    enrich_partition_with(&LogisticPropensity, base, donor, config, rng)
}

/// Enrich one partition with a caller-supplied propensity model.
pub fn enrich_partition_with<M, R>(
    model: &M,
    base: &Table,
    donor: &Table,
    config: &MatchConfig,
    rng: &mut R,
) -> Result<EnrichedPartition, EnrichError>
where
    M: PropensityModel + ?Sized,
    R: Rng + ?Sized,
{
    validate(base, donor, config)?;

    let union = LabeledUnion::build(base, donor, config)?;
    let scores = estimate_scores(model, &union)?;
    drop(union);

    let shortlists = find_neighbors(&scores.base, &scores.donor, config.n_neighbors)?;
    let matches = match_shortlists(&shortlists, rng)?;
    let table = enrich(&matches, base, donor, config)?;
    let diagnostics = diagnose(&shortlists, &matches.pairs);

    Ok(EnrichedPartition {
        table,
        pairs: matches.pairs,
        diagnostics,
    })
}

/// Check configuration against both tables before any computation.
pub fn validate(base: &Table, donor: &Table, config: &MatchConfig) -> Result<(), EnrichError> {
    if config.n_neighbors == 0 {
        return Err(EnrichError::Config("n_neighbors must be > 0".into()));
    }
    if base.is_empty() {
        return Err(EnrichError::Config("base population is empty".into()));
    }
    if donor.len() < config.n_neighbors {
        return Err(EnrichError::Config(format!(
            "donor population has {} rows, fewer than n_neighbors={}",
            donor.len(),
            config.n_neighbors
        )));
    }
    if config.overlap_columns.is_empty() {
        return Err(EnrichError::Config("overlap_columns is empty".into()));
    }
    if config.transfer_columns.is_empty() {
        return Err(EnrichError::Config("transfer_columns is empty".into()));
    }

    for name in &config.overlap_columns {
        if name == AREA_FACTOR_COLUMN && config.area_column.is_some() {
            continue;
        }
        base.require_column(name, "base")?;
        donor.require_column(name, "donor")?;
    }
    for name in &config.transfer_columns {
        donor.require_column(name, "donor")?;
    }
    if let Some(area) = &config.area_column {
        base.require_column(area, "base")?;
        donor.require_column(area, "donor")?;
    }
    Ok(())
}

/// Summarise donor reuse and match quality for one partition.
pub fn diagnose(shortlists: &Shortlists, pairs: &[MatchedPair]) -> MatchDiagnostics {
    let mut reuse: HashMap<usize, usize> = HashMap::new();
    let mut distance_total = 0.0;

    for pair in pairs {
        *reuse.entry(pair.donor).or_default() += 1;
        if let Some(c) = shortlists
            .lists
            .get(pair.base)
            .and_then(|l| l.iter().find(|c| c.donor == pair.donor))
        {
            distance_total += c.distance;
        }
    }

    let with_perfect = shortlists
        .lists
        .iter()
        .filter(|l| l.first().is_some_and(|c| c.distance == 0.0))
        .count();
    let n = pairs.len().max(1) as f64;

    MatchDiagnostics {
        distinct_donors: reuse.len(),
        max_donor_reuse: reuse.values().copied().max().unwrap_or(0),
        mean_chosen_distance: distance_total / n,
        perfect_match_share: with_perfect as f64 / shortlists.lists.len().max(1) as f64,
    }
}
