//! Binary logistic regression fitted by Newton–Raphson (IRLS).
//!
//! We maximise
//!
//! ```text
//! ℓ(β) = Σ y_i ln σ(x_iᵀβ) + (1 - y_i) ln(1 - σ(x_iᵀβ))
//! ```
//!
//! with full Newton steps `Δβ = (Xᵀ W X)⁻¹ Xᵀ (y - μ)`, `W = diag(μ(1-μ))`,
//! halving the step whenever it would decrease the likelihood.
//!
//! Numerical notes:
//! - The log-likelihood is evaluated through `softplus` so it stays finite
//!   for large linear predictors (no clamping of μ, which would hide
//!   divergence behind a flat objective).
//! - The design matrix is checked up front via its SVD condition number;
//!   a rank-deficient design is an error rather than a silently regularised fit.

use nalgebra::{DMatrix, DVector};
use thiserror::Error;

/// Newton iterations before giving up.
const MAX_ITERS: usize = 100;

/// Convergence threshold on the largest absolute coefficient update.
const STEP_TOL: f64 = 1e-8;

/// Designs with a larger `σ_max / σ_min` are treated as rank-deficient.
const CONDITION_LIMIT: f64 = 1e10;

const MAX_HALVINGS: usize = 30;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum LogitError {
    #[error("design matrix has {rows} rows for {cols} parameters")]
    Underdetermined { rows: usize, cols: usize },
    #[error("design matrix is rank-deficient (condition number {condition:.3e})")]
    RankDeficient { condition: f64 },
    #[error("information matrix became singular at iteration {iteration}")]
    SingularHessian { iteration: usize },
    #[error("no convergence after {iterations} iterations")]
    NonConvergence { iterations: usize },
    #[error("non-finite coefficients at iteration {iteration}")]
    NonFinite { iteration: usize },
}

/// A converged logistic fit.
#[derive(Debug, Clone)]
pub struct LogitFit {
    pub coefficients: DVector<f64>,
    /// Linear predictor `x_iᵀβ` per row.
    pub linear_predictor: Vec<f64>,
    /// Fitted `P(y = 1)` per row.
    pub fitted: Vec<f64>,
    pub log_likelihood: f64,
    pub iterations: usize,
}

/// Logistic function, evaluated without overflow on either tail.
pub fn sigmoid(z: f64) -> f64 {
    if z >= 0.0 {
        1.0 / (1.0 + (-z).exp())
    } else {
        let e = z.exp();
        e / (1.0 + e)
    }
}

fn softplus(z: f64) -> f64 {
    z.max(0.0) + (-z.abs()).exp().ln_1p()
}

fn log_likelihood(x: &DMatrix<f64>, y: &DVector<f64>, beta: &DVector<f64>) -> f64 {
    let eta = x * beta;
    eta.iter()
        .zip(y.iter())
        .map(|(&e, &yi)| -yi * softplus(-e) - (1.0 - yi) * softplus(e))
        .sum()
}

/// Ratio of largest to smallest singular value (`∞` when singular).
pub fn condition_number(x: &DMatrix<f64>) -> f64 {
    let sv = x.clone().svd(false, false).singular_values;
    let max = sv.iter().copied().fold(0.0_f64, f64::max);
    let min = sv.iter().copied().fold(f64::INFINITY, f64::min);
    if min <= 0.0 || !min.is_finite() {
        f64::INFINITY
    } else {
        max / min
    }
}

/// Fit `P(y=1 | x) = σ(xᵀβ)`.
///
/// `x` must already contain an intercept column if one is wanted; `y` holds 0/1.
pub fn fit_logit(x: &DMatrix<f64>, y: &DVector<f64>) -> Result<LogitFit, LogitError> {
    let (n, p) = x.shape();
    if n <= p {
        return Err(LogitError::Underdetermined { rows: n, cols: p });
    }
    let condition = condition_number(x);
    if condition > CONDITION_LIMIT {
        return Err(LogitError::RankDeficient { condition });
    }

    let mut beta = DVector::<f64>::zeros(p);
    let mut ll = log_likelihood(x, y, &beta);

    for iteration in 1..=MAX_ITERS {
        let eta = x * &beta;
        let mu = eta.map(sigmoid);
        let w = mu.map(|m| m * (1.0 - m));

        let grad = x.transpose() * (y - &mu);
        let xw = DMatrix::from_fn(n, p, |i, j| x[(i, j)] * w[i]);
        let info = x.transpose() * xw;

        let chol = info
            .cholesky()
            .ok_or(LogitError::SingularHessian { iteration })?;
        let step = chol.solve(&grad);
        if !step.iter().all(|v| v.is_finite()) {
            return Err(LogitError::NonFinite { iteration });
        }

        // Backtrack until the likelihood does not decrease.
        let mut scale = 1.0;
        let mut accepted = None;
        for _ in 0..=MAX_HALVINGS {
            let candidate = &beta + &step * scale;
            let candidate_ll = log_likelihood(x, y, &candidate);
            if candidate_ll.is_finite() && candidate_ll >= ll - 1e-12 * ll.abs().max(1.0) {
                accepted = Some((candidate, candidate_ll));
                break;
            }
            scale *= 0.5;
        }
        let Some((next, next_ll)) = accepted else {
            return Err(LogitError::NonConvergence { iterations: iteration });
        };

        let moved = (&next - &beta).amax();
        beta = next;
        ll = next_ll;

        if moved < STEP_TOL {
            let eta = x * &beta;
            return Ok(LogitFit {
                fitted: eta.iter().map(|&e| sigmoid(e)).collect(),
                linear_predictor: eta.iter().copied().collect(),
                coefficients: beta,
                log_likelihood: ll,
                iterations: iteration,
            });
        }
    }

    Err(LogitError::NonConvergence { iterations: MAX_ITERS })
}
