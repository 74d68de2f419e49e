//! Weighted order statistics and the five percentile definitions.
//!
//! # Definitions
//! Let `x₁ ≤ … ≤ xₘ` be the valid observations with weights `c₁ … cₘ`,
//! cumulative weights `ccᵢ` and total `W`. For a percentile `p` the target
//! position is `tc = W·p/100` (`(W+1)·p/100` for HAVERAGE). With
//! `ccᵢ ≤ tc < ccᵢ₊₁` the gap is `g* = tc − ccᵢ` and `g = g*/cᵢ₊₁`:
//!
//! | Method | Result |
//! |---|---|
//! | WAVERAGE, HAVERAGE | `xᵢ₊₁` if `g* ≥ 1`, else `(1−g*)xᵢ + g*xᵢ₊₁` (`g` when `cᵢ₊₁ < 1`) |
//! | ROUND | `xᵢ` if the gap is `< 0.5`, else `xᵢ₊₁` |
//! | EMPIRICAL | `xᵢ` if `g* = 0`, else `xᵢ₊₁` |
//! | AEMPIRICAL | `(xᵢ + xᵢ₊₁)/2` if `g* = 0`, else `xᵢ₊₁` |
//!
//! A target below the first cumulative weight returns `x₁`; a target at or
//! beyond `W` returns `xₘ`, for every method.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{Result, StatsError};
use crate::sample::Sample;

/// Relative tolerance for deciding that a target sits exactly on a
/// cumulative weight.
const POSITION_EPS: f64 = 1e-9;

/// Percentile interpolation policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum PercentileMethod {
    /// Weighted average at `W·p`.
    Waverage,
    /// Observation closest to `W·p`.
    Round,
    /// Empirical distribution function.
    Empirical,
    /// Weighted average at `(W+1)·p`.
    #[default]
    Haverage,
    /// Empirical distribution function with averaging.
    Aempirical,
}

impl PercentileMethod {
    /// Canonical upper-case name.
    pub fn name(self) -> &'static str {
        match self {
            Self::Waverage => "WAVERAGE",
            Self::Round => "ROUND",
            Self::Empirical => "EMPIRICAL",
            Self::Haverage => "HAVERAGE",
            Self::Aempirical => "AEMPIRICAL",
        }
    }
}

impl fmt::Display for PercentileMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for PercentileMethod {
    type Err = StatsError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_uppercase().as_str() {
            "WAVERAGE" => Ok(Self::Waverage),
            "ROUND" => Ok(Self::Round),
            "EMPIRICAL" => Ok(Self::Empirical),
            "HAVERAGE" => Ok(Self::Haverage),
            "AEMPIRICAL" => Ok(Self::Aempirical),
            _ => Err(StatsError::UnknownPercentileMethod(s.to_string())),
        }
    }
}

/// A requested percentile and its value.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PercentileResult {
    /// Requested percentile in `[0, 100]`.
    pub percentile: f64,
    /// Estimated value (NaN for an empty sample).
    pub value: f64,
}

/// Tukey's hinges and the median.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TukeyHinges {
    /// Lower hinge.
    pub lower: f64,
    /// Median.
    pub median: f64,
    /// Upper hinge.
    pub upper: f64,
}

/// Returns `Err` unless `p ∈ [0, 100]`.
pub(crate) fn check_percentile(p: f64) -> Result<()> {
    if (0.0..=100.0).contains(&p) {
        Ok(())
    } else {
        Err(StatsError::PercentileOutOfRange(p))
    }
}

/// Sorted valid observations with cumulative weights.
///
/// # Examples
/// ```
/// use u_examine::percentile::{OrderStatistics, PercentileMethod};
/// use u_examine::sample::Sample;
///
/// let stats = OrderStatistics::from_sample(&Sample::unweighted(&[3.0, 1.0, 2.0, 1.0, 1.0, 2.0]));
/// let median = stats.percentile(50.0, PercentileMethod::Haverage).unwrap();
/// assert_eq!(median, 1.5);
/// ```
#[derive(Debug, Clone, Default)]
pub struct OrderStatistics {
    values: Vec<f64>,
    weights: Vec<f64>,
    cumulative: Vec<f64>,
}

impl OrderStatistics {
    /// Sorts the valid observations of `sample`.
    pub fn from_sample(sample: &Sample<'_>) -> Self {
        Self::from_sorted_pairs(sample.sorted_valid())
    }

    /// Builds from `(value, weight)` pairs already sorted by value.
    pub(crate) fn from_sorted_pairs(pairs: Vec<(f64, f64)>) -> Self {
        let mut values = Vec::with_capacity(pairs.len());
        let mut weights = Vec::with_capacity(pairs.len());
        let mut cumulative = Vec::with_capacity(pairs.len());
        let mut acc = 0.0;
        for (x, w) in pairs {
            acc += w;
            values.push(x);
            weights.push(w);
            cumulative.push(acc);
        }
        Self {
            values,
            weights,
            cumulative,
        }
    }

    /// Sorted values.
    pub fn values(&self) -> &[f64] {
        &self.values
    }

    /// Total weight `W`.
    pub fn total_weight(&self) -> f64 {
        self.cumulative.last().copied().unwrap_or(0.0)
    }

    /// Returns `true` if there are no valid observations.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// The `p`-th percentile under `method`.
    ///
    /// # Errors
    /// [`StatsError::PercentileOutOfRange`] if `p ∉ [0, 100]`.
    pub fn percentile(&self, p: f64, method: PercentileMethod) -> Result<f64> {
        check_percentile(p)?;
        if self.is_empty() {
            return Ok(f64::NAN);
        }
        let w = self.total_weight();
        let tc = match method {
            PercentileMethod::Haverage => (w + 1.0) * p / 100.0,
            _ => w * p / 100.0,
        };
        Ok(self.at_position(tc, method))
    }

    /// Percentiles for every entry of `ps`, in order.
    pub fn percentiles(&self, ps: &[f64], method: PercentileMethod) -> Result<Vec<PercentileResult>> {
        ps.iter()
            .map(|&p| {
                Ok(PercentileResult {
                    percentile: p,
                    value: self.percentile(p, method)?,
                })
            })
            .collect()
    }

    /// Tukey's hinges and the HAVERAGE median.
    ///
    /// When `⌊W⌋` is odd the hinges are the HAVERAGE 25th and 75th
    /// percentiles. Otherwise they sit at depth `h = ⌊(⌊W⌋ + 3)/2⌋ / 2`
    /// from each end (cumulative positions `h` and `W + 1 − h`),
    /// interpolated as in HAVERAGE.
    pub fn tukey_hinges(&self) -> TukeyHinges {
        if self.is_empty() {
            return TukeyHinges {
                lower: f64::NAN,
                median: f64::NAN,
                upper: f64::NAN,
            };
        }
        let w = self.total_weight();
        let (lower_pos, upper_pos) = if w.floor() % 2.0 == 1.0 {
            ((w + 1.0) * 0.25, (w + 1.0) * 0.75)
        } else {
            let h = ((w.floor() + 3.0) / 2.0).floor() / 2.0;
            (h, w + 1.0 - h)
        };
        TukeyHinges {
            lower: self.at_position(lower_pos, PercentileMethod::Haverage),
            median: self.at_position((w + 1.0) * 0.5, PercentileMethod::Haverage),
            upper: self.at_position(upper_pos, PercentileMethod::Haverage),
        }
    }

    /// Value at cumulative-weight position `tc`.
    fn at_position(&self, tc: f64, method: PercentileMethod) -> f64 {
        let m = self.values.len();
        let total = self.total_weight();
        let eps = POSITION_EPS * total.max(1.0);

        // i = number of cumulative weights ≤ tc (with tolerance)
        let i = self.cumulative.partition_point(|&cc| cc <= tc + eps);
        if i == 0 {
            return self.values[0];
        }
        if i >= m {
            return self.values[m - 1];
        }

        let cc_i = self.cumulative[i - 1];
        let lower = self.values[i - 1];
        let upper = self.values[i];
        let c_next = self.weights[i];
        let g_star = (tc - cc_i).max(0.0);
        let on_boundary = g_star <= eps;
        let frac = if c_next >= 1.0 { g_star } else { g_star / c_next };

        match method {
            PercentileMethod::Waverage | PercentileMethod::Haverage => {
                if g_star >= 1.0 || frac >= 1.0 {
                    upper
                } else if on_boundary {
                    lower
                } else {
                    (1.0 - frac) * lower + frac * upper
                }
            }
            PercentileMethod::Round => {
                if frac < 0.5 {
                    lower
                } else {
                    upper
                }
            }
            PercentileMethod::Empirical => {
                if on_boundary {
                    lower
                } else {
                    upper
                }
            }
            PercentileMethod::Aempirical => {
                if on_boundary {
                    (lower + upper) / 2.0
                } else {
                    upper
                }
            }
        }
    }
}

/// Weighted median (HAVERAGE) of the valid observations.
pub fn median(sample: &Sample<'_>) -> f64 {
    OrderStatistics::from_sample(sample)
        .percentile(50.0, PercentileMethod::Haverage)
        .unwrap_or(f64::NAN)
}
