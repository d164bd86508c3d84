//! Resolve each shortlist to a single donor with a distance-weighted draw.
//!
//! Weights follow a linear step from 100 (nearest) down to 5 (worst):
//!
//! ```text
//! w_j = 100 - (d_j / d_{k-1}) * 95
//! ```
//!
//! so the best candidate is at most 20x likelier than the worst, and no
//! candidate is ever excluded. When every candidate sits at distance 0 the
//! distances carry no information and the draw is uniform.
//!
//! Matching is with replacement: a donor may be chosen by many base records.

use rand::Rng;
use rand::distributions::{Distribution, WeightedIndex};

use crate::domain::{MatchedPair, NeighborCandidate, Shortlists};
use crate::error::EnrichError;

/// Weight given to a candidate at distance 0.
pub const WEIGHT_CEILING: f64 = 100.0;

/// Drop from the ceiling to the weight of the worst candidate (which gets 5).
pub const WEIGHT_SPAN: f64 = 95.0;

/// Matched pairs plus the donor population size their indices refer to.
#[derive(Debug, Clone, PartialEq)]
pub struct Matches {
    pub donor_rows: usize,
    pub pairs: Vec<MatchedPair>,
}

/// Linear step weights for a shortlist sorted ascending by distance.
///
/// The last distance is the normaliser. Callers must only use this when that
/// distance is > 0; an all-zero shortlist is drawn uniformly instead.
pub fn step_weights(distances: &[f64]) -> Vec<f64> {
    let Some(&worst) = distances.last() else {
        return Vec::new();
    };
    distances
        .iter()
        .map(|&d| WEIGHT_CEILING - (d / worst) * WEIGHT_SPAN)
        .collect()
}

/// Draw one donor row position from a single shortlist.
pub fn resolve_shortlist<R: Rng + ?Sized>(
    base: usize,
    list: &[NeighborCandidate],
    rng: &mut R,
) -> Result<usize, EnrichError> {
    let k = list.len();
    if k == 0 {
        return Err(EnrichError::DegenerateWeights {
            base,
            reason: "empty shortlist".into(),
        });
    }

    let perfect = list.iter().filter(|c| c.distance == 0.0).count();
    if perfect == k {
        return Ok(list[rng.gen_range(0..k)].donor);
    }

    let distances: Vec<f64> = list.iter().map(|c| c.distance).collect();
    let weights = step_weights(&distances);
    let total: f64 = weights.iter().sum();
    if !(total.is_finite() && total > 0.0) {
        return Err(EnrichError::DegenerateWeights {
            base,
            reason: format!("weights sum to {total}"),
        });
    }

    let dist = WeightedIndex::new(&weights).map_err(|e| EnrichError::DegenerateWeights {
        base,
        reason: e.to_string(),
    })?;
    Ok(list[dist.sample(rng)].donor)
}

/// Resolve every shortlist, producing exactly one pair per base record in base order.
pub fn match_shortlists<R: Rng + ?Sized>(
    shortlists: &Shortlists,
    rng: &mut R,
) -> Result<Matches, EnrichError> {
    let mut pairs = Vec::with_capacity(shortlists.lists.len());
    for (base, list) in shortlists.lists.iter().enumerate() {
        if list.len() != shortlists.k {
            return Err(EnrichError::DegenerateWeights {
                base,
                reason: format!("shortlist has {} candidates, expected {}", list.len(), shortlists.k),
            });
        }
        let donor = resolve_shortlist(base, list, rng)?;
        pairs.push(MatchedPair { base, donor });
    }
    Ok(Matches {
        donor_rows: shortlists.donor_rows,
        pairs,
    })
}
