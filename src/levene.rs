//! Levene's test for homogeneity of variance across groups.
//!
//! # Algorithm
//!
//! 1. Transform every valid observation (natural log by default).
//! 2. Center each group (mean, median or 5% trimmed mean).
//! 3. Form `z = |t − center|`.
//! 4. Run a weighted one-way ANOVA on `z`:
//!    `W = (SS_between/(k−1)) / (SS_within/(N−k))`.
//!
//! A Satterthwaite degrees of freedom
//! `v = (Σ uᵢ)² / Σ uᵢ²/(Wᵢ − 1)`, with `uᵢ` the within-group sum of
//! squares of group `i`, gives the robust significance `P(F(k−1, v) > W)`.
//!
//! # References
//!
//! - Levene (1960). "Robust tests for equality of variances".
//! - Brown & Forsythe (1974). "Robust tests for the equality of variances".
//!   JASA, 69(346), 364–367.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Result, StatsError};
use crate::moments::accumulate;
use crate::percentile::median;
use crate::robust::trimmed_mean;
use crate::sample::Sample;
use crate::special::{FCdf, IncompleteBetaF};

/// Trim percentage of the `Trimmed` centering policy.
pub const LEVENE_TRIM_PERCENT: f64 = 5.0;

/// Per-group center subtracted before taking absolute deviations.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum LeveneCenter {
    /// Weighted mean (classic Levene).
    Mean,
    /// Weighted median (Brown–Forsythe).
    #[default]
    Median,
    /// 5% trimmed mean.
    Trimmed,
}

impl LeveneCenter {
    /// Uppercase name.
    pub fn name(self) -> &'static str {
        match self {
            Self::Mean => "MEAN",
            Self::Median => "MEDIAN",
            Self::Trimmed => "TRIMMED",
        }
    }

    fn of(self, sample: &Sample<'_>) -> Result<f64> {
        match self {
            Self::Mean => Ok(accumulate(sample).mean),
            Self::Median => Ok(median(sample)),
            Self::Trimmed => trimmed_mean(sample, LEVENE_TRIM_PERCENT),
        }
    }
}

impl fmt::Display for LeveneCenter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for LeveneCenter {
    type Err = StatsError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_uppercase().as_str() {
            "MEAN" => Ok(Self::Mean),
            "MEDIAN" => Ok(Self::Median),
            "TRIMMED" => Ok(Self::Trimmed),
            _ => Err(StatsError::UnknownCenter(s.to_string())),
        }
    }
}

/// Spread-versus-level transform applied before centering.
///
/// Inputs outside the transform's domain become NaN and drop out of the
/// test: `x ≤ 0` for the log, for negative powers and for fractional powers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub enum PowerTransform {
    /// Natural logarithm.
    #[default]
    Log,
    /// `x^p`; `Power(0.0)` means [`PowerTransform::Log`].
    Power(f64),
}

impl PowerTransform {
    /// Transform for exponent `p`, mapping 0 to the log.
    pub fn from_exponent(p: f64) -> Self {
        if p == 0.0 {
            Self::Log
        } else {
            Self::Power(p)
        }
    }

    /// Transforms one value; NaN outside the domain.
    ///
    /// # Examples
    /// ```
    /// use u_examine::levene::PowerTransform;
    /// assert_eq!(PowerTransform::Power(2.0).apply(-3.0), 9.0);
    /// assert!(PowerTransform::Power(0.5).apply(-4.0).is_nan());
    /// assert!(PowerTransform::Log.apply(0.0).is_nan());
    /// ```
    pub fn apply(self, x: f64) -> f64 {
        match self {
            Self::Power(p) if p != 0.0 => {
                if x <= 0.0 && (p < 0.0 || p.fract() != 0.0) {
                    f64::NAN
                } else {
                    x.powf(p)
                }
            }
            _ => {
                if x > 0.0 {
                    x.ln()
                } else {
                    f64::NAN
                }
            }
        }
    }
}

/// Outcome of Levene's test.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LeveneResult {
    /// Levene statistic.
    pub w: f64,
    /// `P(F(df_between, df_within) > w)`.
    pub significance: f64,
    /// `P(F(df_between, v) > w)`.
    pub robust_significance: f64,
    /// `k − 1`.
    pub df_between: f64,
    /// `N − k`.
    pub df_within: f64,
    /// Satterthwaite degrees of freedom.
    pub v: f64,
}

impl LeveneResult {
    fn undefined() -> Self {
        Self {
            w: f64::NAN,
            significance: f64::NAN,
            robust_significance: f64::NAN,
            df_between: f64::NAN,
            df_within: f64::NAN,
            v: f64::NAN,
        }
    }
}

/// Weighted sums of one group's absolute deviations.
struct GroupSpread {
    weight: f64,
    mean: f64,
    ss: f64,
}

/// Levene's test with the built-in F distribution.
///
/// # Errors
/// - [`StatsError::TooFewGroups`] if fewer than two groups are given.
/// - [`StatsError::LengthMismatch`] if `group_weights` does not align with
///   `groups`, either in group count or within a group.
///
/// # Examples
/// ```
/// use u_examine::levene::{levene_test, LeveneCenter, PowerTransform};
///
/// let g1 = [4.9, 5.0, 5.0, 5.1, 5.0];
/// let g2 = [0.0, 3.0, 5.0, 7.0, 10.0];
/// let r = levene_test(&[&g1, &g2], None, LeveneCenter::Median, PowerTransform::Power(1.0)).unwrap();
/// assert!(r.significance < 0.05);
/// ```
pub fn levene_test(
    groups: &[&[f64]],
    group_weights: Option<&[&[f64]]>,
    center: LeveneCenter,
    transform: PowerTransform,
) -> Result<LeveneResult> {
    levene_test_with(groups, group_weights, center, transform, &IncompleteBetaF)
}

/// Levene's test with a caller-supplied F distribution.
///
/// # Errors
/// As [`levene_test`].
pub fn levene_test_with<F: FCdf + ?Sized>(
    groups: &[&[f64]],
    group_weights: Option<&[&[f64]]>,
    center: LeveneCenter,
    transform: PowerTransform,
    f_dist: &F,
) -> Result<LeveneResult> {
    if groups.len() < 2 {
        return Err(StatsError::TooFewGroups(groups.len()));
    }
    if let Some(gw) = group_weights {
        if gw.len() != groups.len() {
            return Err(StatsError::LengthMismatch {
                values: groups.len(),
                weights: gw.len(),
            });
        }
    }

    let mut spreads = Vec::with_capacity(groups.len());
    for (i, values) in groups.iter().enumerate() {
        let sample = Sample::new(values, group_weights.map(|gw| gw[i]))?;
        if let Some(spread) = group_spread(&sample, center, transform)? {
            spreads.push(spread);
        }
    }
    if spreads.len() < 2 {
        debug!(groups = spreads.len(), "too few non-empty groups for Levene's test");
        return Ok(LeveneResult::undefined());
    }

    let k = spreads.len() as f64;
    let total: f64 = spreads.iter().map(|g| g.weight).sum();
    let grand = spreads.iter().map(|g| g.weight * g.mean).sum::<f64>() / total;
    let ss_between: f64 = spreads.iter().map(|g| g.weight * (g.mean - grand).powi(2)).sum();
    let ss_within: f64 = spreads.iter().map(|g| g.ss).sum();

    let df_between = k - 1.0;
    let df_within = total - k;

    let w = if df_within <= 0.0 {
        f64::NAN
    } else if ss_within > 0.0 {
        (ss_between / df_between) / (ss_within / df_within)
    } else if ss_between > 0.0 {
        f64::INFINITY
    } else {
        f64::NAN
    };

    let satterthwaite_denom: f64 = spreads
        .iter()
        .filter(|g| g.weight > 1.0)
        .map(|g| g.ss * g.ss / (g.weight - 1.0))
        .sum();
    let v = if satterthwaite_denom > 0.0 {
        ss_within * ss_within / satterthwaite_denom
    } else {
        f64::NAN
    };

    let result = LeveneResult {
        w,
        significance: upper_tail(f_dist, w, df_between, df_within),
        robust_significance: upper_tail(f_dist, w, df_between, v),
        df_between,
        df_within,
        v,
    };
    debug!(w, df_between, df_within, v, %center, "Levene's test");
    Ok(result)
}

fn upper_tail<F: FCdf + ?Sized>(f_dist: &F, w: f64, df1: f64, df2: f64) -> f64 {
    if w.is_nan() || df2.is_nan() || df2 <= 0.0 {
        f64::NAN
    } else if w.is_infinite() {
        0.0
    } else {
        f_dist.f_sf(w, df1, df2)
    }
}

/// Transformed, centered spread of one group; `None` if nothing survives.
fn group_spread(sample: &Sample<'_>, center: LeveneCenter, transform: PowerTransform) -> Result<Option<GroupSpread>> {
    let (values, weights): (Vec<f64>, Vec<f64>) = sample
        .valid()
        .map(|o| (transform.apply(o.value), o.weight))
        .filter(|(t, _)| t.is_finite())
        .unzip();
    if values.is_empty() {
        return Ok(None);
    }

    let transformed = Sample::weighted(&values, &weights)?;
    let c = center.of(&transformed)?;

    let weight: f64 = weights.iter().sum();
    let z: Vec<f64> = values.iter().map(|t| (t - c).abs()).collect();
    let mean = z.iter().zip(&weights).map(|(z, w)| z * w).sum::<f64>() / weight;
    let ss = z.iter().zip(&weights).map(|(z, w)| w * (z - mean).powi(2)).sum::<f64>();
    Ok(Some(GroupSpread { weight, mean, ss }))
}
