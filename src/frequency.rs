//! FREQUENCIES: distinct-value tables and grouped statistics.
//!
//! A [`FrequencyTable`] is an ascending array of distinct values with their
//! weighted frequency, raw count and missing flag. Percent uses the total
//! weight (missing included); valid percent and the cumulative columns use
//! only non-missing entries.

use serde::{Deserialize, Serialize};

use crate::descriptives::min_max;
use crate::error::{Result, StatsError, MAX_FREQUENCY_MAGNITUDE};
use crate::moments::accumulate;
use crate::percentile::{check_percentile, PercentileResult};
use crate::sample::Sample;

/// One distinct value of the column.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FrequencyEntry {
    /// The distinct value.
    pub value: f64,
    /// Sum of case weights.
    pub frequency: f64,
    /// Number of raw occurrences.
    pub count: usize,
    /// Declared user-missing.
    pub is_missing: bool,
}

/// A [`FrequencyEntry`] with its derived percentages.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct FrequencyRow {
    /// The distinct value.
    pub value: f64,
    /// Sum of case weights.
    pub frequency: f64,
    /// Number of raw occurrences.
    pub count: usize,
    /// Declared user-missing.
    pub is_missing: bool,
    /// `frequency / total_weight × 100`.
    pub percent: f64,
    /// `frequency / valid_weight × 100`; `None` for missing rows.
    pub valid_percent: Option<f64>,
    /// Running frequency over non-missing rows; `None` for missing rows.
    pub cumulative_frequency: Option<f64>,
    /// Running valid percent; `None` for missing rows.
    pub cumulative_percent: Option<f64>,
}

/// Ascending distinct values with weighted and raw counts.
///
/// # Examples
/// ```
/// use u_examine::frequency::FrequencyTable;
/// use u_examine::sample::Sample;
///
/// let table = FrequencyTable::build(&Sample::unweighted(&[2.0, 1.0, 1.0, 3.0, 1.0, 2.0])).unwrap();
/// let values: Vec<f64> = table.entries().iter().map(|e| e.value).collect();
/// assert_eq!(values, vec![1.0, 2.0, 3.0]);
/// assert_eq!(table.mode(), 1.0);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct FrequencyTable {
    entries: Vec<FrequencyEntry>,
    total_weight: f64,
    valid_weight: f64,
}

impl FrequencyTable {
    /// Tallies every usable observation (missing ones included, flagged).
    ///
    /// # Errors
    /// [`StatsError::ValueTooLarge`] on the first observation with
    /// `|x| > 1e13`.
    pub fn build(sample: &Sample<'_>) -> Result<Self> {
        let mut tally: Vec<(f64, f64, bool)> = Vec::with_capacity(sample.len());
        for obs in sample.observations() {
            if obs.value.abs() > MAX_FREQUENCY_MAGNITUDE {
                return Err(StatsError::ValueTooLarge {
                    value: obs.value,
                    limit: MAX_FREQUENCY_MAGNITUDE,
                });
            }
            // fold -0.0 into 0.0 so both land in one entry
            tally.push((obs.value + 0.0, obs.weight, obs.is_missing));
        }
        tally.sort_by(|a, b| a.0.total_cmp(&b.0));

        let mut entries: Vec<FrequencyEntry> = Vec::new();
        let mut total_weight = 0.0;
        let mut valid_weight = 0.0;
        for (value, weight, is_missing) in tally {
            total_weight += weight;
            if !is_missing {
                valid_weight += weight;
            }
            match entries.last_mut() {
                Some(last) if last.value == value => {
                    last.frequency += weight;
                    last.count += 1;
                }
                _ => entries.push(FrequencyEntry {
                    value,
                    frequency: weight,
                    count: 1,
                    is_missing,
                }),
            }
        }

        Ok(Self {
            entries,
            total_weight,
            valid_weight,
        })
    }

    /// Distinct values in ascending order.
    pub fn entries(&self) -> &[FrequencyEntry] {
        &self.entries
    }

    /// Total weight, missing included.
    pub fn total_weight(&self) -> f64 {
        self.total_weight
    }

    /// Total weight of non-missing entries.
    pub fn valid_weight(&self) -> f64 {
        self.valid_weight
    }

    /// Weight of user-missing entries.
    pub fn missing_weight(&self) -> f64 {
        self.total_weight - self.valid_weight
    }

    /// Entries with percent, valid percent and cumulative columns.
    pub fn rows(&self) -> Vec<FrequencyRow> {
        let mut cumulative = 0.0;
        self.entries
            .iter()
            .map(|e| {
                let percent = e.frequency / self.total_weight * 100.0;
                let (valid_percent, cumulative_frequency, cumulative_percent) = if e.is_missing {
                    (None, None, None)
                } else {
                    cumulative += e.frequency;
                    (
                        Some(e.frequency / self.valid_weight * 100.0),
                        Some(cumulative),
                        Some(cumulative / self.valid_weight * 100.0),
                    )
                };
                FrequencyRow {
                    value: e.value,
                    frequency: e.frequency,
                    count: e.count,
                    is_missing: e.is_missing,
                    percent,
                    valid_percent,
                    cumulative_frequency,
                    cumulative_percent,
                }
            })
            .collect()
    }

    /// Percentile by linear interpolation over cumulative valid frequency.
    ///
    /// The target `tp = p/100 × valid_weight` is located at the first
    /// non-missing entry whose cumulative frequency exceeds it; the result
    /// interpolates between that entry and its predecessor, clamped to the
    /// first and last valid values. NaN when no valid entry exists.
    ///
    /// # Errors
    /// [`StatsError::PercentileOutOfRange`] if `p ∉ [0, 100]`.
    pub fn percentile(&self, p: f64) -> Result<f64> {
        check_percentile(p)?;
        let valid: Vec<&FrequencyEntry> = self.entries.iter().filter(|e| !e.is_missing).collect();
        let (Some(first), Some(last)) = (valid.first(), valid.last()) else {
            return Ok(f64::NAN);
        };
        let tp = p / 100.0 * self.valid_weight;

        let mut prev_cum = 0.0;
        let mut prev_value = first.value;
        for (i, e) in valid.iter().enumerate() {
            let cum = prev_cum + e.frequency;
            if cum > tp {
                if i == 0 {
                    return Ok(e.value);
                }
                let frac = (tp - prev_cum) / (cum - prev_cum);
                return Ok(prev_value + frac * (e.value - prev_value));
            }
            prev_cum = cum;
            prev_value = e.value;
        }
        Ok(last.value)
    }

    /// `percentile(50)`.
    pub fn median(&self) -> f64 {
        self.percentile(50.0).unwrap_or(f64::NAN)
    }

    /// Non-missing value with the largest weighted frequency, the smallest
    /// such value on ties. NaN when no valid entry exists.
    pub fn mode(&self) -> f64 {
        self.entries
            .iter()
            .filter(|e| !e.is_missing)
            .fold(None::<&FrequencyEntry>, |best, e| match best {
                Some(b) if b.frequency >= e.frequency => Some(b),
                _ => Some(e),
            })
            .map_or(f64::NAN, |e| e.value)
    }
}

/// Options for [`frequencies_stats`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FrequenciesOptions {
    /// Percentiles to report, each in `[0, 100]`.
    pub percentiles: Vec<f64>,
}

impl Default for FrequenciesOptions {
    fn default() -> Self {
        Self {
            percentiles: vec![25.0, 50.0, 75.0],
        }
    }
}

/// The FREQUENCIES result for one column.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FrequenciesStats {
    /// Frequency table rows in ascending value order.
    pub frequencies: Vec<FrequencyRow>,
    /// Total weight, missing included.
    pub n: f64,
    /// Weight of non-missing observations.
    pub n_valid: f64,
    /// Weight of user-missing observations.
    pub n_missing: f64,
    /// Smallest valid value.
    pub min: f64,
    /// Largest valid value.
    pub max: f64,
    /// `max − min`.
    pub range: f64,
    /// Most frequent valid value.
    pub mode: f64,
    /// Grouped median.
    pub median: f64,
    /// Requested grouped percentiles.
    pub percentiles: Vec<PercentileResult>,
    /// Weighted sum of valid values.
    pub sum: f64,
    /// Weighted mean.
    pub mean: f64,
    /// Sample variance.
    pub variance: f64,
    /// Sample standard deviation.
    pub std_dev: f64,
    /// Standard error of the mean.
    pub std_error: f64,
    /// Bias-corrected skewness.
    pub skewness: f64,
    /// Standard error of skewness.
    pub skewness_std_error: f64,
    /// Bias-corrected excess kurtosis.
    pub kurtosis: f64,
    /// Standard error of kurtosis.
    pub kurtosis_std_error: f64,
}

/// Builds the frequency table and its companion statistics.
///
/// # Errors
/// [`StatsError::ValueTooLarge`] from table building, or
/// [`StatsError::PercentileOutOfRange`] for a bad requested percentile.
///
/// # Examples
/// ```
/// use u_examine::frequency::{frequencies_stats, FrequenciesOptions};
/// use u_examine::sample::Sample;
///
/// let r = frequencies_stats(&Sample::unweighted(&[1.0, 1.0, 1.0, 2.0, 2.0, 3.0]), &FrequenciesOptions::default()).unwrap();
/// assert_eq!(r.mode, 1.0);
/// assert_eq!(r.frequencies[0].percent, 50.0);
/// ```
pub fn frequencies_stats(sample: &Sample<'_>, options: &FrequenciesOptions) -> Result<FrequenciesStats> {
    let table = FrequencyTable::build(sample)?;
    let percentiles = options
        .percentiles
        .iter()
        .map(|&p| {
            Ok(PercentileResult {
                percentile: p,
                value: table.percentile(p)?,
            })
        })
        .collect::<Result<Vec<_>>>()?;

    let moments = accumulate(sample);
    let (min, max) = min_max(sample);

    Ok(FrequenciesStats {
        frequencies: table.rows(),
        n: table.total_weight(),
        n_valid: table.valid_weight(),
        n_missing: table.missing_weight(),
        min,
        max,
        range: max - min,
        mode: table.mode(),
        median: table.median(),
        percentiles,
        sum: moments.sum,
        mean: moments.mean,
        variance: moments.variance(),
        std_dev: moments.std_dev(),
        std_error: moments.std_error(),
        skewness: moments.skewness(),
        skewness_std_error: moments.skewness_std_error(),
        kurtosis: moments.kurtosis(),
        kurtosis_std_error: moments.kurtosis_std_error(),
    })
}


#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(300))]

        #[test]
        fn percents_sum_to_100(
            data in proptest::collection::vec(0_i32..20, 1..100),
            missing_code in 0_i32..20,
        ) {
            let values: Vec<f64> = data.iter().map(|&v| f64::from(v)).collect();
            let spec = crate::sample::MissingSpec::values([f64::from(missing_code)]);
            let t = FrequencyTable::build(&Sample::unweighted(&values).with_missing(&spec)).unwrap();
            let rows = t.rows();
            let total: f64 = rows.iter().map(|r| r.percent).sum();
            prop_assert!((total - 100.0).abs() < 1e-9);
            if t.valid_weight() > 0.0 {
                let valid: f64 = rows.iter().filter_map(|r| r.valid_percent).sum();
                prop_assert!((valid - 100.0).abs() < 1e-9);
            }
        }

        #[test]
        fn cumulative_percent_non_decreasing_to_100(
            data in proptest::collection::vec(-50_i32..50, 1..100),
            weights in proptest::collection::vec(0.1_f64..5.0, 100),
        ) {
            let values: Vec<f64> = data.iter().map(|&v| f64::from(v)).collect();
            let w = &weights[..values.len()];
            let t = FrequencyTable::build(&Sample::weighted(&values, w).unwrap()).unwrap();
            let cum: Vec<f64> = t.rows().iter().filter_map(|r| r.cumulative_percent).collect();
            for pair in cum.windows(2) {
                prop_assert!(pair[0] <= pair[1]);
            }
            prop_assert!((cum[cum.len() - 1] - 100.0).abs() < 1e-9);
        }

        #[test]
        fn median_is_percentile_50(data in proptest::collection::vec(-1e3_f64..1e3, 1..60)) {
            let t = FrequencyTable::build(&Sample::unweighted(&data)).unwrap();
            prop_assert_eq!(t.median(), t.percentile(50.0).unwrap());
        }
    }
}
