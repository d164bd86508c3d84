//! One-dimensional nearest-neighbour search on propensity scores.
//!
//! Donor scores are sorted once; each base score is located by binary search
//! and the `k` nearest donors are collected by walking outward from that point,
//! always taking the closer side. Both walks are monotone, so each shortlist
//! comes out ascending by distance without a per-record sort.
//!
//! Equal distances keep a stable order: the lower-scored side is taken first,
//! and equal scores are ordered by donor row position.

use crate::domain::{NeighborCandidate, Shortlists};
use crate::error::EnrichError;

/// For every base score, find the `k` donors with the closest score.
///
/// Returned shortlists are row-aligned to `base_scores` and hold donor row
/// positions into `donor_scores`.
pub fn find_neighbors(
    base_scores: &[f64],
    donor_scores: &[f64],
    k: usize,
) -> Result<Shortlists, EnrichError> {
    if k == 0 {
        return Err(EnrichError::Config("n_neighbors must be > 0".into()));
    }
    if k > donor_scores.len() {
        return Err(EnrichError::Config(format!(
            "n_neighbors={k} exceeds donor population size {}",
            donor_scores.len()
        )));
    }
    if let Some(i) = base_scores.iter().position(|s| !s.is_finite()) {
        return Err(EnrichError::Estimation(format!("non-finite base propensity score at row {i}")));
    }
    if let Some(i) = donor_scores.iter().position(|s| !s.is_finite()) {
        return Err(EnrichError::Estimation(format!("non-finite donor propensity score at row {i}")));
    }

    let mut sorted: Vec<(f64, usize)> = donor_scores.iter().copied().zip(0..).collect();
    sorted.sort_by(|a, b| a.0.total_cmp(&b.0).then(a.1.cmp(&b.1)));

    let lists = base_scores
        .iter()
        .map(|&score| nearest_k(&sorted, score, k))
        .collect();

    Ok(Shortlists {
        k,
        donor_rows: donor_scores.len(),
        lists,
    })
}

fn nearest_k(sorted: &[(f64, usize)], score: f64, k: usize) -> Vec<NeighborCandidate> {
    let split = sorted.partition_point(|&(s, _)| s < score);
    // `left` counts candidates still available below `split`.
    let mut left = split;
    let mut right = split;
    let mut out = Vec::with_capacity(k);

    while out.len() < k {
        let below = (left > 0).then(|| score - sorted[left - 1].0);
        let above = (right < sorted.len()).then(|| sorted[right].0 - score);

        let take_below = match (below, above) {
            (Some(b), Some(a)) => b <= a,
            (Some(_), None) => true,
            (None, Some(_)) => false,
            (None, None) => break,
        };

        if take_below {
            left -= 1;
            out.push(NeighborCandidate {
                donor: sorted[left].1,
                distance: (score - sorted[left].0).abs(),
            });
        } else {
            out.push(NeighborCandidate {
                donor: sorted[right].1,
                distance: (sorted[right].0 - score).abs(),
            });
            right += 1;
        }
    }

    out
}
