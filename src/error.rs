//! Error types.
//!
//! Only invalid arguments are errors. Numerical degeneracy (too few
//! observations, zero variance, unsupported approximation ranges) is
//! reported as `f64::NAN` in the affected field instead.

use thiserror::Error;

/// Largest magnitude accepted when building a frequency table.
pub const MAX_FREQUENCY_MAGNITUDE: f64 = 1e13;

/// Invalid-argument errors raised by the statistics entry points.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum StatsError {
    /// Weights were supplied but their length differs from the values.
    #[error("weights length {weights} does not match values length {values}")]
    LengthMismatch {
        /// Number of observations.
        values: usize,
        /// Number of weights.
        weights: usize,
    },

    /// A percentile outside `[0, 100]` was requested.
    #[error("percentile {0} is outside [0, 100]")]
    PercentileOutOfRange(f64),

    /// Unrecognized percentile interpolation policy name.
    #[error("unknown percentile method `{0}`")]
    UnknownPercentileMethod(String),

    /// Unrecognized M-estimator name.
    #[error("unknown M-estimator `{0}`")]
    UnknownEstimator(String),

    /// Unrecognized Levene centering policy name.
    #[error("unknown centering policy `{0}`")]
    UnknownCenter(String),

    /// An observation exceeds the magnitude a frequency table can key on.
    #[error("value {value} exceeds the frequency table limit of {limit:e}")]
    ValueTooLarge {
        /// The offending observation.
        value: f64,
        /// The magnitude limit.
        limit: f64,
    },

    /// Levene's test needs at least two groups.
    #[error("at least 2 groups are required, got {0}")]
    TooFewGroups(usize),

    /// Trim percentage outside `[0, 50)`.
    #[error("trim percentage {0} is outside [0, 50)")]
    InvalidTrim(f64),

    /// Confidence level outside the open interval `(0, 100)`.
    #[error("confidence level {0} is outside (0, 100)")]
    InvalidConfidenceLevel(f64),

    /// M-estimator tuning constants violate their constraints.
    #[error("invalid M-estimator tuning: {0}")]
    InvalidTuning(String),
}

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, StatsError>;
