//! DESCRIPTIVES: moments-based summary of one column.

use serde::Serialize;

use crate::moments::{accumulate, Moments};
use crate::sample::Sample;

/// Summary statistics of one column.
///
/// Every field that is undefined for the input (too few observations, zero
/// variance) is `NaN`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Descriptives {
    /// Effective (weighted) sample size.
    pub n: f64,
    /// Weighted sum.
    pub sum: f64,
    /// Weighted mean.
    pub mean: f64,
    /// Sample variance.
    pub variance: f64,
    /// Sample standard deviation.
    pub std_dev: f64,
    /// Standard error of the mean.
    pub std_error: f64,
    /// Smallest valid observation.
    pub min: f64,
    /// Largest valid observation.
    pub max: f64,
    /// `max − min`.
    pub range: f64,
    /// Bias-corrected skewness.
    pub skewness: f64,
    /// Standard error of skewness.
    pub skewness_std_error: f64,
    /// Bias-corrected excess kurtosis.
    pub kurtosis: f64,
    /// Standard error of kurtosis.
    pub kurtosis_std_error: f64,
    /// Standardized values, one per input entry (NaN for excluded entries).
    pub z_scores: Vec<f64>,
}

/// Computes the DESCRIPTIVES battery for `sample`.
///
/// # Examples
/// ```
/// use u_examine::descriptives::descriptives;
/// use u_examine::sample::Sample;
///
/// let d = descriptives(&Sample::unweighted(&[1.0, 1.0, 1.0, 2.0, 2.0, 3.0]));
/// assert!((d.mean - 5.0 / 3.0).abs() < 1e-12);
/// assert_eq!((d.min, d.max), (1.0, 3.0));
/// assert_eq!(d.z_scores.len(), 6);
/// ```
pub fn descriptives(sample: &Sample<'_>) -> Descriptives {
    let moments = accumulate(sample);
    let (min, max) = min_max(sample);
    Descriptives {
        n: moments.n,
        sum: moments.sum,
        mean: moments.mean,
        variance: moments.variance(),
        std_dev: moments.std_dev(),
        std_error: moments.std_error(),
        min,
        max,
        range: max - min,
        skewness: moments.skewness(),
        skewness_std_error: moments.skewness_std_error(),
        kurtosis: moments.kurtosis(),
        kurtosis_std_error: moments.kurtosis_std_error(),
        z_scores: z_scores(sample, &moments),
    }
}

/// Smallest and largest valid observation; `(NaN, NaN)` when there are none.
pub fn min_max(sample: &Sample<'_>) -> (f64, f64) {
    sample
        .valid()
        .fold(None, |acc: Option<(f64, f64)>, o| match acc {
            None => Some((o.value, o.value)),
            Some((lo, hi)) => Some((lo.min(o.value), hi.max(o.value))),
        })
        .unwrap_or((f64::NAN, f64::NAN))
}

/// `(x − mean) / sd` for every input entry, aligned with the input.
///
/// Excluded entries get NaN; all entries are NaN when the standard
/// deviation is zero or undefined.
pub fn z_scores(sample: &Sample<'_>, moments: &Moments) -> Vec<f64> {
    let sd = moments.std_dev();
    let mut out = vec![f64::NAN; sample.len()];
    if !(sd.is_finite() && sd > 0.0) {
        return out;
    }
    for obs in sample.valid() {
        out[obs.index] = (obs.value - moments.mean) / sd;
    }
    out
}
