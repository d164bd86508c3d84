//! Attach each matched donor's transfer columns to its base record.
//!
//! The output keeps every base column except scaffolding (`treatment`,
//! `propensity_score`, `area_factor`), the configured helper columns
//! (`drop_columns`, e.g. `tenure`), and any base copy of a transfer column.
//! The donor's transfer values are then appended in `transfer_columns` order.

use crate::domain::{MatchConfig, SCAFFOLD_COLUMNS, Table, Value};
use crate::error::EnrichError;
use crate::psm::matcher::Matches;

/// Build the enriched table: one row per base record, in base order.
pub fn enrich(
    matches: &Matches,
    base: &Table,
    donor: &Table,
    config: &MatchConfig,
) -> Result<Table, EnrichError> {
    if matches.donor_rows != donor.len() {
        return Err(EnrichError::JoinIntegrity(format!(
            "pairs index a donor table of {} rows but {} rows were supplied",
            matches.donor_rows,
            donor.len()
        )));
    }
    if matches.pairs.len() != base.len() {
        return Err(EnrichError::JoinIntegrity(format!(
            "{} pairs for {} base records",
            matches.pairs.len(),
            base.len()
        )));
    }

    let transfer_idx: Vec<usize> = config
        .transfer_columns
        .iter()
        .map(|c| donor.require_column(c, "donor"))
        .collect::<Result<_, _>>()?;

    let is_dropped = |name: &str| {
        SCAFFOLD_COLUMNS.contains(&name)
            || config.drop_columns.iter().any(|c| c == name)
            || config.transfer_columns.iter().any(|c| c == name)
    };
    let kept: Vec<usize> = base
        .columns()
        .iter()
        .enumerate()
        .filter(|(_, name)| !is_dropped(name.as_str()))
        .map(|(i, _)| i)
        .collect();

    let mut columns: Vec<String> = kept.iter().map(|&i| base.columns()[i].clone()).collect();
    columns.extend(config.transfer_columns.iter().cloned());
    let mut out = Table::new(columns);

    for (position, pair) in matches.pairs.iter().enumerate() {
        if pair.base != position {
            return Err(EnrichError::JoinIntegrity(format!(
                "pair {position} refers to base record {}",
                pair.base
            )));
        }
        let donor_row = donor.rows().get(pair.donor).ok_or_else(|| {
            EnrichError::JoinIntegrity(format!(
                "base record {} matched donor {} which has no row",
                pair.base, pair.donor
            ))
        })?;
        let base_row = &base.rows()[pair.base];

        let mut row: Vec<Value> = kept.iter().map(|&i| base_row[i].clone()).collect();
        for (&col, name) in transfer_idx.iter().zip(&config.transfer_columns) {
            let value = &donor_row[col];
            if value.is_missing() {
                return Err(EnrichError::JoinIntegrity(format!(
                    "donor {} has no value for transfer column '{name}'",
                    pair.donor
                )));
            }
            row.push(value.clone());
        }
        out.push_row(row)?;
    }

    Ok(out)
}
