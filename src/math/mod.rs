//! Mathematical utilities: logistic regression on dense matrices.

pub mod logit;

pub use logit::*;
