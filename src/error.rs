use thiserror::Error;

/// Partition-scoped failures raised by the matching engine.
///
/// Every variant is fatal for the partition that raised it. The
/// multi-partition driver records the failure and moves on.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EnrichError {
    /// Invalid `n_neighbors`, missing columns or non-numeric covariates.
    #[error("configuration error: {0}")]
    Config(String),

    /// The propensity model could not be fitted.
    #[error("estimation failure: {0}")]
    Estimation(String),

    /// A shortlist produced weights that cannot be sampled from.
    #[error("degenerate weights for base record {base}: {reason}")]
    DegenerateWeights { base: usize, reason: String },

    /// A matched donor index has no row in the donor table.
    #[error("join integrity error: {0}")]
    JoinIntegrity(String),
}

impl EnrichError {
    /// Short machine-friendly tag used in run reports.
    pub fn kind(&self) -> &'static str {
        match self {
            EnrichError::Config(_) => "config",
            EnrichError::Estimation(_) => "estimation",
            EnrichError::DegenerateWeights { .. } => "degenerate_weights",
            EnrichError::JoinIntegrity(_) => "join_integrity",
        }
    }
}

#[derive(Clone)]
pub struct AppError {
    exit_code: u8,
    message: String,
}

impl AppError {
    pub fn new(exit_code: u8, message: impl Into<String>) -> Self {
        Self {
            exit_code,
            message: message.into(),
        }
    }

    pub fn exit_code(&self) -> u8 {
        self.exit_code
    }
}

impl From<EnrichError> for AppError {
    fn from(err: EnrichError) -> Self {
        let exit_code = match err {
            EnrichError::Config(_) => 2,
            _ => 4,
        };
        AppError::new(exit_code, err.to_string())
    }
}

impl std::fmt::Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::fmt::Debug for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppError")
            .field("exit_code", &self.exit_code)
            .field("message", &self.message)
            .finish()
    }
}

impl std::error::Error for AppError {}
