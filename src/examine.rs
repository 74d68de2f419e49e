//! EXAMINE: the full exploratory battery for one column.
//!
//! [`examine`] composes moments, percentiles, hinges, robust location,
//! normality tests and the boxplot into one [`ExamineResult`]. It keeps no
//! state between calls, so independent columns can be examined in
//! parallel with [`examine_columns`].

#[cfg(feature = "parallel")]
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::boxplot::{summarize, BoxplotSummary};
use crate::descriptives::min_max;
use crate::error::{Result, StatsError};
use crate::moments::accumulate;
use crate::normality::{lilliefors, shapiro_wilk, NormalityResult};
use crate::percentile::{check_percentile, OrderStatistics, PercentileMethod, PercentileResult, TukeyHinges};
use crate::robust::{m_estimates, trimmed_mean, MEstimates, MEstimatorTuning};
use crate::sample::Sample;
use crate::special::t_quantile;

/// Default percentiles reported by EXAMINE.
pub const DEFAULT_PERCENTILES: [f64; 7] = [5.0, 10.0, 25.0, 50.0, 75.0, 90.0, 95.0];

/// Options for [`examine`]. Missing fields take their defaults when
/// deserialized.
///
/// # Examples
/// ```
/// use u_examine::examine::ExamineOptions;
/// use u_examine::percentile::PercentileMethod;
///
/// let opts: ExamineOptions = serde_json::from_str(r#"{"percentile_method": "WAVERAGE"}"#).unwrap();
/// assert_eq!(opts.percentile_method, PercentileMethod::Waverage);
/// assert_eq!(opts.confidence_level, 95.0);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExamineOptions {
    /// Confidence level of the mean's interval, in percent.
    pub confidence_level: f64,
    /// Interpolation policy for percentiles and the interquartile range.
    pub percentile_method: PercentileMethod,
    /// Percentiles to report.
    pub percentiles: Vec<f64>,
    /// Percentage trimmed from each tail for the trimmed mean.
    pub trim_percent: f64,
    /// M-estimator tuning constants.
    pub tuning: MEstimatorTuning,
}

impl Default for ExamineOptions {
    fn default() -> Self {
        Self {
            confidence_level: 95.0,
            percentile_method: PercentileMethod::default(),
            percentiles: DEFAULT_PERCENTILES.to_vec(),
            trim_percent: 5.0,
            tuning: MEstimatorTuning::default(),
        }
    }
}

impl ExamineOptions {
    /// Checks every option.
    ///
    /// # Errors
    /// - [`StatsError::InvalidConfidenceLevel`] unless `0 < level < 100`.
    /// - [`StatsError::PercentileOutOfRange`] for a requested percentile.
    /// - [`StatsError::InvalidTrim`] unless `0 ≤ trim < 50`.
    /// - [`StatsError::InvalidTuning`] from the M-estimator constants.
    pub fn validate(&self) -> Result<()> {
        let level = self.confidence_level;
        if !(level > 0.0 && level < 100.0) {
            return Err(StatsError::InvalidConfidenceLevel(level));
        }
        for &p in &self.percentiles {
            check_percentile(p)?;
        }
        if !(0.0..50.0).contains(&self.trim_percent) {
            return Err(StatsError::InvalidTrim(self.trim_percent));
        }
        self.tuning.validate()
    }
}

/// Two-sided confidence interval for the mean.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ConfidenceInterval {
    /// Confidence level in percent.
    pub level: f64,
    /// Lower bound.
    pub lower: f64,
    /// Upper bound.
    pub upper: f64,
}

/// The EXAMINE result for one column.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExamineResult {
    /// Effective (weighted) sample size.
    pub n: f64,
    /// Weighted sum.
    pub sum: f64,
    /// Weighted mean.
    pub mean: f64,
    /// Interval `mean ± t·SE`.
    pub confidence_interval: ConfidenceInterval,
    /// 50th percentile under the chosen method.
    pub median: f64,
    /// Sample variance.
    pub variance: f64,
    /// Sample standard deviation.
    pub std_dev: f64,
    /// Standard error of the mean.
    pub std_error: f64,
    /// Smallest valid value.
    pub min: f64,
    /// Largest valid value.
    pub max: f64,
    /// `max − min`.
    pub range: f64,
    /// 75th minus 25th percentile under the chosen method.
    pub interquartile_range: f64,
    /// Bias-corrected skewness.
    pub skewness: f64,
    /// Standard error of skewness.
    pub skewness_std_error: f64,
    /// Bias-corrected excess kurtosis.
    pub kurtosis: f64,
    /// Standard error of kurtosis.
    pub kurtosis_std_error: f64,
    /// Trimmed mean at the configured percentage.
    pub trimmed_mean: f64,
    /// Policy used for `percentiles`, `median` and `interquartile_range`.
    pub percentile_method: PercentileMethod,
    /// Requested percentiles.
    pub percentiles: Vec<PercentileResult>,
    /// Tukey hinges.
    pub hinges: TukeyHinges,
    /// Huber, Hampel, Andrew and Tukey M-estimates.
    pub m_estimators: MEstimates,
    /// Shapiro–Wilk test.
    pub shapiro_wilk: NormalityResult,
    /// Lilliefors test.
    pub lilliefors: NormalityResult,
    /// Boxplot summary.
    pub boxplot: BoxplotSummary,
}

/// Runs the full EXAMINE battery on `sample`.
///
/// # Errors
/// Any error from [`ExamineOptions::validate`].
///
/// # Examples
/// ```
/// use u_examine::examine::{examine, ExamineOptions};
/// use u_examine::sample::Sample;
///
/// let r = examine(&Sample::unweighted(&[1.0, 1.0, 1.0, 2.0, 2.0, 3.0]), &ExamineOptions::default()).unwrap();
/// assert!((r.mean - 5.0 / 3.0).abs() < 1e-12);
/// assert_eq!(r.median, 1.5);
/// ```
pub fn examine(sample: &Sample<'_>, options: &ExamineOptions) -> Result<ExamineResult> {
    options.validate()?;
    let method = options.percentile_method;

    let moments = accumulate(sample);
    let (min, max) = min_max(sample);
    let order = OrderStatistics::from_sample(sample);

    let percentiles = order.percentiles(&options.percentiles, method)?;
    let median = order.percentile(50.0, method)?;
    let interquartile_range = order.percentile(75.0, method)? - order.percentile(25.0, method)?;
    let boxplot = summarize(sample, &order);

    let result = ExamineResult {
        n: moments.n,
        sum: moments.sum,
        mean: moments.mean,
        confidence_interval: mean_interval(moments.mean, moments.std_error(), moments.n, options.confidence_level),
        median,
        variance: moments.variance(),
        std_dev: moments.std_dev(),
        std_error: moments.std_error(),
        min,
        max,
        range: max - min,
        interquartile_range,
        skewness: moments.skewness(),
        skewness_std_error: moments.skewness_std_error(),
        kurtosis: moments.kurtosis(),
        kurtosis_std_error: moments.kurtosis_std_error(),
        trimmed_mean: trimmed_mean(sample, options.trim_percent)?,
        percentile_method: method,
        percentiles,
        hinges: boxplot.hinges,
        m_estimators: m_estimates(sample, &options.tuning)?,
        shapiro_wilk: shapiro_wilk(sample),
        lilliefors: lilliefors(sample),
        boxplot,
    };
    debug!(
        n = result.n,
        mean = result.mean,
        flagged = result.boxplot.points.len(),
        "examined column"
    );
    Ok(result)
}

/// `mean ± t_{1−α/2, n−1} · SE`; NaN bounds when `n ≤ 1`.
fn mean_interval(mean: f64, std_error: f64, n: f64, level: f64) -> ConfidenceInterval {
    let half_width = if n > 1.0 && std_error.is_finite() {
        let alpha = 1.0 - level / 100.0;
        t_quantile(1.0 - alpha / 2.0, n - 1.0) * std_error
    } else {
        f64::NAN
    };
    ConfidenceInterval {
        level,
        lower: mean - half_width,
        upper: mean + half_width,
    }
}

/// Examines independent columns with shared options, in input order.
///
/// With the `parallel` feature each column runs on the rayon pool; the
/// results are identical to the sequential path.
///
/// # Errors
/// Any error from [`ExamineOptions::validate`].
pub fn examine_columns(columns: &[Sample<'_>], options: &ExamineOptions) -> Result<Vec<ExamineResult>> {
    options.validate()?;

    #[cfg(feature = "parallel")]
    let results = columns.par_iter().map(|column| examine(column, options)).collect();

    #[cfg(not(feature = "parallel"))]
    let results = columns.iter().map(|column| examine(column, options)).collect();

    results
}


#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(100))]

        #[test]
        fn interval_contains_mean(data in proptest::collection::vec(-1e3_f64..1e3, 2..50)) {
            let r = examine(&Sample::unweighted(&data), &ExamineOptions::default()).unwrap();
            prop_assert!(r.confidence_interval.lower <= r.mean);
            prop_assert!(r.mean <= r.confidence_interval.upper);
        }

        #[test]
        fn summary_is_ordered(data in proptest::collection::vec(-1e3_f64..1e3, 1..50)) {
            let r = examine(&Sample::unweighted(&data), &ExamineOptions::default()).unwrap();
            prop_assert!(r.min <= r.median && r.median <= r.max);
            prop_assert!(r.interquartile_range >= 0.0);
            prop_assert!(r.trimmed_mean >= r.min - 1e-9 && r.trimmed_mean <= r.max + 1e-9);
        }
    }
}
