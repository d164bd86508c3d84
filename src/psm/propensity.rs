//! Propensity scores from the shared covariates.
//!
//! Both populations are stacked (base rows first, then donor rows) and
//! labelled with a `treatment` flag: 0 for base, 1 for donor. A binary model
//! learns what separates the two populations, and its fitted `P(treatment = 1)`
//! becomes a one-dimensional similarity coordinate for matching. The label is
//! a similarity device only; nothing here is a causal estimate.

use std::collections::HashMap;

use nalgebra::{DMatrix, DVector};

use crate::domain::{AREA_FACTOR_COLUMN, MatchConfig, Table};
use crate::error::EnrichError;
use crate::math::fit_logit;

/// Covariates for base and donor rows stacked into one matrix.
#[derive(Debug, Clone)]
pub struct LabeledUnion {
    pub covariate_names: Vec<String>,
    /// `(base_rows + donor_rows) x covariates`, base rows first.
    pub covariates: DMatrix<f64>,
    /// 0.0 for base rows, 1.0 for donor rows.
    pub treatment: Vec<f64>,
    pub base_rows: usize,
}

impl LabeledUnion {
    /// Stack the overlap columns of both tables, preserving row order.
    ///
    /// `area_factor` in `overlap_columns` is computed here from `area_column`.
    pub fn build(base: &Table, donor: &Table, config: &MatchConfig) -> Result<Self, EnrichError> {
        if config.overlap_columns.is_empty() {
            return Err(EnrichError::Config("overlap_columns is empty".into()));
        }

        let n_base = base.len();
        let n = n_base + donor.len();
        let mut columns: Vec<Vec<f64>> = Vec::with_capacity(config.overlap_columns.len());

        for name in &config.overlap_columns {
            if name == AREA_FACTOR_COLUMN {
                let area = config.area_column.as_deref().ok_or_else(|| {
                    EnrichError::Config(format!(
                        "overlap column '{AREA_FACTOR_COLUMN}' requires area_column to be set"
                    ))
                })?;
                columns.push(area_factor(base, donor, area)?);
            } else {
                let mut values = base.numeric_column(name, "base")?;
                values.extend(donor.numeric_column(name, "donor")?);
                columns.push(values);
            }
        }

        let covariates = DMatrix::from_fn(n, columns.len(), |i, j| columns[j][i]);
        let treatment = (0..n).map(|i| if i < n_base { 0.0 } else { 1.0 }).collect();

        Ok(Self {
            covariate_names: config.overlap_columns.clone(),
            covariates,
            treatment,
            base_rows: n_base,
        })
    }

    pub fn len(&self) -> usize {
        self.treatment.len()
    }

    pub fn is_empty(&self) -> bool {
        self.treatment.is_empty()
    }
}

/// Integer codes for `area_column`, assigned in first-appearance order over base then donor rows.
pub fn area_factor(base: &Table, donor: &Table, area_column: &str) -> Result<Vec<f64>, EnrichError> {
    let base_col = base.require_column(area_column, "base")?;
    let donor_col = donor.require_column(area_column, "donor")?;

    let mut codes: HashMap<String, usize> = HashMap::new();
    let keys = base
        .rows()
        .iter()
        .map(|r| &r[base_col])
        .chain(donor.rows().iter().map(|r| &r[donor_col]));

    let mut out = Vec::with_capacity(base.len() + donor.len());
    for (i, value) in keys.enumerate() {
        if value.is_missing() {
            return Err(EnrichError::Config(format!(
                "area column '{area_column}' is empty at union row {i}"
            )));
        }
        let next = codes.len();
        let code = *codes.entry(value.to_string()).or_insert(next);
        out.push(code as f64);
    }
    Ok(out)
}

/// Scores split back into the two populations, each in its original row order.
#[derive(Debug, Clone, PartialEq)]
pub struct PropensityScores {
    pub base: Vec<f64>,
    pub donor: Vec<f64>,
}

/// A model that turns a labelled union into one score per row.
pub trait PropensityModel {
    /// Return `P(treatment = 1)` for every row of `union`, in row order.
    fn estimate(&self, union: &LabeledUnion) -> Result<Vec<f64>, EnrichError>;
}

/// Logistic regression on an intercept plus all overlap columns (linear terms).
///
/// Covariates are standardised before fitting. This changes the coefficients
/// but not the fitted probabilities, and keeps Newton steps well scaled for
/// integer-coded census categories.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogisticPropensity;

impl PropensityModel for LogisticPropensity {
    fn estimate(&self, union: &LabeledUnion) -> Result<Vec<f64>, EnrichError> {
        let (n, p) = union.covariates.shape();
        let mut x = DMatrix::<f64>::from_element(n, p + 1, 1.0);

        for (j, name) in union.covariate_names.iter().enumerate() {
            let col = union.covariates.column(j);
            let mean = col.mean();
            let var = col.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n as f64;
            let sd = var.sqrt();
            if !(sd.is_finite() && sd > 1e-12) {
                return Err(EnrichError::Estimation(format!(
                    "covariate '{name}' is constant across both populations"
                )));
            }
            for i in 0..n {
                x[(i, j + 1)] = (col[i] - mean) / sd;
            }
        }

        let y = DVector::from_column_slice(&union.treatment);
        let fit = fit_logit(&x, &y).map_err(|e| EnrichError::Estimation(e.to_string()))?;

        // A linear predictor that strictly splits the two labels means the
        // likelihood has no maximum; any "converged" fit is spurious.
        let (base_eta, donor_eta) = fit.linear_predictor.split_at(union.base_rows);
        let base_max = base_eta.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        let donor_min = donor_eta.iter().copied().fold(f64::INFINITY, f64::min);
        if base_max < donor_min {
            return Err(EnrichError::Estimation(
                "base and donor populations are completely separated by the covariates".into(),
            ));
        }

        Ok(fit.fitted)
    }
}

/// Estimate scores on the union and split them back per population.
pub fn estimate_scores<M: PropensityModel + ?Sized>(
    model: &M,
    union: &LabeledUnion,
) -> Result<PropensityScores, EnrichError> {
    let scores = model.estimate(union)?;
    if scores.len() != union.len() {
        return Err(EnrichError::Estimation(format!(
            "model returned {} scores for {} rows",
            scores.len(),
            union.len()
        )));
    }
    if let Some(i) = scores.iter().position(|s| !s.is_finite()) {
        return Err(EnrichError::Estimation(format!("non-finite propensity score at union row {i}")));
    }

    let donor = scores[union.base_rows..].to_vec();
    let mut base = scores;
    base.truncate(union.base_rows);
    Ok(PropensityScores { base, donor })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Value;
    use rand::SeedableRng;
    use rand::rngs::StdRng;
    use rand_distr::{Distribution, Normal};

    fn table(columns: &[&str], rows: Vec<Vec<Value>>) -> Table {
        Table::from_rows(columns.iter().map(|s| s.to_string()).collect(), rows).unwrap()
    }

    fn config(overlap: &[&str]) -> MatchConfig {
        MatchConfig {
            overlap_columns: overlap.iter().map(|s| s.to_string()).collect(),
            ..MatchConfig::default()
        }
    }

    /// Donors shifted upward on `x`; `z` is shared noise.
    fn shifted_populations(n_base: usize, n_donor: usize, shift: f64) -> (Table, Table) {
        let mut rng = StdRng::seed_from_u64(21);
        let normal = Normal::new(0.0, 1.0).unwrap();
        let mut make = |n: usize, offset: f64| {
            let rows = (0..n)
                .map(|_| {
                    vec![
                        Value::Float(normal.sample(&mut rng) + offset),
                        Value::Float(normal.sample(&mut rng)),
                    ]
                })
                .collect();
            table(&["x", "z"], rows)
        };
        let base = make(n_base, 0.0);
        let donor = make(n_donor, shift);
        (base, donor)
    }

    #[test]
    fn union_stacks_base_then_donor() {
        let base = table(&["x"], vec![vec![Value::Int(1)], vec![Value::Int(2)]]);
        let donor = table(&["x"], vec![vec![Value::Int(3)]]);
        let u = LabeledUnion::build(&base, &donor, &config(&["x"])).unwrap();
        assert_eq!(u.len(), 3);
        assert_eq!(u.base_rows, 2);
        assert_eq!(u.treatment, vec![0.0, 0.0, 1.0]);
        assert_eq!(u.covariates[(2, 0)], 3.0);
    }

    #[test]
    fn area_factor_codes_in_first_appearance_order() {
        let base = table(
            &["OA"],
            vec![
                vec![Value::Text("E001".into())],
                vec![Value::Text("E002".into())],
                vec![Value::Text("E001".into())],
            ],
        );
        let donor = table(&["OA"], vec![vec![Value::Text("E003".into())], vec![Value::Text("E002".into())]]);
        assert_eq!(area_factor(&base, &donor, "OA").unwrap(), vec![0.0, 1.0, 0.0, 2.0, 1.0]);
    }

    #[test]
    fn area_factor_without_area_column_is_config_error() {
        let base = table(&["x"], vec![vec![Value::Int(1)]]);
        let err = LabeledUnion::build(&base, &base, &config(&["area_factor"])).unwrap_err();
        assert!(matches!(err, EnrichError::Config(_)));
    }

    #[test]
    fn donor_like_records_score_higher() {
        let (base, donor) = shifted_populations(300, 120, 1.0);
        let union = LabeledUnion::build(&base, &donor, &config(&["x", "z"])).unwrap();
        let scores = estimate_scores(&LogisticPropensity, &union).unwrap();

        assert_eq!(scores.base.len(), 300);
        assert_eq!(scores.donor.len(), 120);
        assert!(scores.base.iter().chain(&scores.donor).all(|&s| s > 0.0 && s < 1.0));

        let mean = |v: &[f64]| v.iter().sum::<f64>() / v.len() as f64;
        assert!(mean(&scores.donor) > mean(&scores.base));
    }

    #[test]
    fn scores_are_monotone_in_single_covariate() {
        let (base, donor) = shifted_populations(200, 80, 0.5);
        let union = LabeledUnion::build(&base, &donor, &config(&["x"])).unwrap();
        let scores = estimate_scores(&LogisticPropensity, &union).unwrap();
        let xs = base.numeric_column("x", "base").unwrap();

        let mut pairs: Vec<(f64, f64)> = xs.into_iter().zip(scores.base).collect();
        pairs.sort_by(|a, b| a.0.total_cmp(&b.0));
        assert!(pairs.windows(2).all(|w| w[0].1 <= w[1].1));
    }

    #[test]
    fn constant_covariate_is_estimation_failure() {
        let base = table(&["x", "c"], vec![vec![Value::Int(1), Value::Int(7)], vec![Value::Int(2), Value::Int(7)]]);
        let donor = table(&["x", "c"], vec![vec![Value::Int(2), Value::Int(7)], vec![Value::Int(1), Value::Int(7)]]);
        let union = LabeledUnion::build(&base, &donor, &config(&["x", "c"])).unwrap();
        let err = estimate_scores(&LogisticPropensity, &union).unwrap_err();
        assert!(matches!(err, EnrichError::Estimation(ref m) if m.contains("'c'")));
    }

    #[test]
    fn duplicated_covariate_is_estimation_failure() {
        let (base, donor) = shifted_populations(50, 20, 0.5);
        let union = LabeledUnion::build(&base, &donor, &config(&["x", "x"])).unwrap();
        assert!(matches!(
            estimate_scores(&LogisticPropensity, &union),
            Err(EnrichError::Estimation(_))
        ));
    }

    #[test]
    fn separated_populations_are_estimation_failure() {
        let base = table(&["x"], (0..6).map(|i| vec![Value::Int(i)]).collect());
        let donor = table(&["x"], (10..14).map(|i| vec![Value::Int(i)]).collect());
        let union = LabeledUnion::build(&base, &donor, &config(&["x"])).unwrap();
        assert!(matches!(
            estimate_scores(&LogisticPropensity, &union),
            Err(EnrichError::Estimation(_))
        ));
    }
}
