//! Robust location: M-estimators, weighted median/MAD, trimmed mean.
//!
//! # M-estimation
//!
//! Starting from the weighted median `T₀` with scale `s = MAD / 0.6745`,
//! each round standardizes `u = (x − T)/s` and recomputes
//!
//! ```text
//! T ← Σ x·w·ψ(u)/u  /  Σ w·ψ(u)/u
//! ```
//!
//! until `|ΔT| ≤ 1e-6 · max(1, |T|)` or 30 rounds have run. `ψ(u)/u` is
//! taken as 1 at `u = 0`.
//!
//! # References
//!
//! - Huber (1964). "Robust estimation of a location parameter".
//! - Hampel, Ronchetti, Rousseeuw, Stahel (1986). *Robust Statistics*.
//! - Andrews et al. (1972). *Robust Estimates of Location*.

use std::f64::consts::PI;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::{trace, warn};

use crate::error::{Result, StatsError};
use crate::percentile::{OrderStatistics, PercentileMethod};
use crate::sample::Sample;

/// Maximum reweighting rounds.
pub const MAX_ITERATIONS: usize = 30;

/// Relative convergence tolerance.
pub const TOLERANCE: f64 = 1e-6;

/// `Φ⁻¹(0.75)`: rescales the MAD to a normal-consistent scale.
pub const MAD_NORMAL_CONSISTENCY: f64 = 0.6745;

/// Default Huber threshold.
pub const DEFAULT_HUBER_K: f64 = 1.339;
/// Default Hampel thresholds `(a, b, c)`.
pub const DEFAULT_HAMPEL: (f64, f64, f64) = (1.7, 3.4, 8.5);
/// Default Andrew wave constant; the cutoff is `a·π`.
pub const DEFAULT_ANDREW_A: f64 = 1.339;
/// Default Tukey biweight threshold.
pub const DEFAULT_TUKEY_C: f64 = 4.685;

/// The ψ-function family of an M-estimator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum MEstimatorKind {
    /// Huber's monotone ψ.
    Huber,
    /// Hampel's three-part redescending ψ.
    Hampel,
    /// Andrew's sine wave.
    Andrew,
    /// Tukey's biweight.
    Tukey,
}

impl MEstimatorKind {
    /// All kinds in report order.
    pub const ALL: [MEstimatorKind; 4] = [Self::Huber, Self::Hampel, Self::Andrew, Self::Tukey];

    /// Uppercase name.
    pub fn name(self) -> &'static str {
        match self {
            Self::Huber => "HUBER",
            Self::Hampel => "HAMPEL",
            Self::Andrew => "ANDREW",
            Self::Tukey => "TUKEY",
        }
    }
}

impl fmt::Display for MEstimatorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for MEstimatorKind {
    type Err = StatsError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_uppercase().as_str() {
            "HUBER" => Ok(Self::Huber),
            "HAMPEL" => Ok(Self::Hampel),
            "ANDREW" | "ANDREWS" => Ok(Self::Andrew),
            "TUKEY" | "BIWEIGHT" => Ok(Self::Tukey),
            _ => Err(StatsError::UnknownEstimator(s.to_string())),
        }
    }
}

/// Tuning constants for the four ψ-functions.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MEstimatorTuning {
    /// Huber threshold `k`.
    pub huber_k: f64,
    /// Hampel end of the linear part.
    pub hampel_a: f64,
    /// Hampel end of the constant part.
    pub hampel_b: f64,
    /// Hampel end of the taper.
    pub hampel_c: f64,
    /// Andrew wave constant `a`.
    pub andrew_a: f64,
    /// Tukey biweight threshold `c`.
    pub tukey_c: f64,
}

impl Default for MEstimatorTuning {
    fn default() -> Self {
        Self {
            huber_k: DEFAULT_HUBER_K,
            hampel_a: DEFAULT_HAMPEL.0,
            hampel_b: DEFAULT_HAMPEL.1,
            hampel_c: DEFAULT_HAMPEL.2,
            andrew_a: DEFAULT_ANDREW_A,
            tukey_c: DEFAULT_TUKEY_C,
        }
    }
}

impl MEstimatorTuning {
    /// Checks that every constant is positive and `0 < a < b < c` for Hampel.
    ///
    /// # Errors
    /// [`StatsError::InvalidTuning`] naming the first violated constraint.
    pub fn validate(&self) -> Result<()> {
        let positive = [
            ("huber_k", self.huber_k),
            ("andrew_a", self.andrew_a),
            ("tukey_c", self.tukey_c),
            ("hampel_a", self.hampel_a),
        ];
        for (name, v) in positive {
            if !(v.is_finite() && v > 0.0) {
                return Err(StatsError::InvalidTuning(format!("{name} must be positive, got {v}")));
            }
        }
        if !(self.hampel_a < self.hampel_b && self.hampel_b < self.hampel_c && self.hampel_c.is_finite()) {
            return Err(StatsError::InvalidTuning(format!(
                "hampel thresholds must increase, got {}/{}/{}",
                self.hampel_a, self.hampel_b, self.hampel_c
            )));
        }
        Ok(())
    }

    /// `ψ(u)/u` for `kind`, 1 at `u = 0`.
    fn psi_weight(&self, kind: MEstimatorKind, u: f64) -> f64 {
        let au = u.abs();
        if au == 0.0 {
            return 1.0;
        }
        match kind {
            MEstimatorKind::Huber => {
                if au <= self.huber_k {
                    1.0
                } else {
                    self.huber_k / au
                }
            }
            MEstimatorKind::Hampel => {
                let (a, b, c) = (self.hampel_a, self.hampel_b, self.hampel_c);
                if au <= a {
                    1.0
                } else if au <= b {
                    a / au
                } else if au <= c {
                    a * (c - au) / ((c - b) * au)
                } else {
                    0.0
                }
            }
            MEstimatorKind::Andrew => {
                let a = self.andrew_a;
                if au <= a * PI {
                    a * (u / a).sin() / u
                } else {
                    0.0
                }
            }
            MEstimatorKind::Tukey => {
                let c = self.tukey_c;
                if au <= c {
                    let r = u / c;
                    (1.0 - r * r).powi(2)
                } else {
                    0.0
                }
            }
        }
    }
}

/// The four M-estimates of one column.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MEstimates {
    /// Huber's M-estimate.
    pub huber: f64,
    /// Hampel's M-estimate.
    pub hampel: f64,
    /// Andrew's wave estimate.
    pub andrew: f64,
    /// Tukey's biweight estimate.
    pub tukey: f64,
}

/// Weighted median (HAVERAGE) of the valid observations; NaN if empty.
pub fn weighted_median(sample: &Sample<'_>) -> f64 {
    crate::percentile::median(sample)
}

/// Weighted median of `|x − center|`; NaN if empty.
pub fn median_absolute_deviation(sample: &Sample<'_>, center: f64) -> f64 {
    mad_of(&sample.sorted_valid(), center)
}

fn median_of_sorted(pairs: Vec<(f64, f64)>) -> f64 {
    OrderStatistics::from_sorted_pairs(pairs)
        .percentile(50.0, PercentileMethod::Haverage)
        .unwrap_or(f64::NAN)
}

fn mad_of(pairs: &[(f64, f64)], center: f64) -> f64 {
    let mut dev: Vec<(f64, f64)> = pairs.iter().map(|&(x, w)| ((x - center).abs(), w)).collect();
    dev.sort_by(|a, b| a.0.total_cmp(&b.0));
    median_of_sorted(dev)
}

/// Sorted observations with their robust seed and scale.
struct Seed {
    pairs: Vec<(f64, f64)>,
    center: f64,
    scale: f64,
}

impl Seed {
    fn new(sample: &Sample<'_>) -> Self {
        let pairs = sample.sorted_valid();
        let center = median_of_sorted(pairs.clone());
        let scale = mad_of(&pairs, center) / MAD_NORMAL_CONSISTENCY;
        Self { pairs, center, scale }
    }

    fn estimate(&self, kind: MEstimatorKind, tuning: &MEstimatorTuning) -> f64 {
        if self.pairs.is_empty() {
            return f64::NAN;
        }
        if self.scale.is_nan() || self.scale <= 0.0 {
            return self.center;
        }

        let mut t = self.center;
        for round in 0..MAX_ITERATIONS {
            let (mut num, mut den) = (0.0, 0.0);
            for &(x, w) in &self.pairs {
                let pw = tuning.psi_weight(kind, (x - t) / self.scale);
                num += x * w * pw;
                den += w * pw;
            }
            if den <= 0.0 {
                return t;
            }
            let next = num / den;
            trace!(%kind, round, estimate = next);
            let converged = (next - t).abs() <= TOLERANCE * next.abs().max(1.0);
            t = next;
            if converged {
                return t;
            }
            if round + 1 == MAX_ITERATIONS {
                warn!(%kind, estimate = t, "M-estimator stopped at the iteration cap");
            }
        }
        t
    }
}

/// One M-estimate of location.
///
/// Returns NaN for an empty sample and the weighted median when the MAD
/// is zero.
///
/// # Errors
/// [`StatsError::InvalidTuning`] if `tuning` fails [`MEstimatorTuning::validate`].
///
/// # Examples
/// ```
/// use u_examine::robust::{m_estimate, MEstimatorKind, MEstimatorTuning};
/// use u_examine::sample::Sample;
///
/// let data = [1.0, 2.0, 3.0, 4.0, 5.0, 1000.0];
/// let t = m_estimate(&Sample::unweighted(&data), MEstimatorKind::Tukey, &MEstimatorTuning::default()).unwrap();
/// assert!((t - 3.0).abs() < 1e-3);
/// ```
pub fn m_estimate(sample: &Sample<'_>, kind: MEstimatorKind, tuning: &MEstimatorTuning) -> Result<f64> {
    tuning.validate()?;
    Ok(Seed::new(sample).estimate(kind, tuning))
}

/// All four M-estimates, sharing one median/MAD seed.
///
/// # Errors
/// [`StatsError::InvalidTuning`] if `tuning` fails [`MEstimatorTuning::validate`].
pub fn m_estimates(sample: &Sample<'_>, tuning: &MEstimatorTuning) -> Result<MEstimates> {
    tuning.validate()?;
    let seed = Seed::new(sample);
    Ok(MEstimates {
        huber: seed.estimate(MEstimatorKind::Huber, tuning),
        hampel: seed.estimate(MEstimatorKind::Hampel, tuning),
        andrew: seed.estimate(MEstimatorKind::Andrew, tuning),
        tukey: seed.estimate(MEstimatorKind::Tukey, tuning),
    })
}

/// Mean after trimming `percent`% of the total weight from each tail.
///
/// Observations straddling a trim boundary contribute the untrimmed part
/// of their weight. NaN if nothing remains.
///
/// # Errors
/// [`StatsError::InvalidTrim`] unless `0 ≤ percent < 50`.
///
/// # Examples
/// ```
/// use u_examine::robust::trimmed_mean;
/// use u_examine::sample::Sample;
///
/// let data = [1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0, 9.0, 100.0];
/// assert!((trimmed_mean(&Sample::unweighted(&data), 10.0).unwrap() - 5.5).abs() < 1e-12);
/// ```
pub fn trimmed_mean(sample: &Sample<'_>, percent: f64) -> Result<f64> {
    if !(0.0..50.0).contains(&percent) {
        return Err(StatsError::InvalidTrim(percent));
    }
    let pairs = sample.sorted_valid();
    let total: f64 = pairs.iter().map(|&(_, w)| w).sum();
    let cut = percent / 100.0 * total;
    let keep_to = total - cut;

    let (mut num, mut den) = (0.0, 0.0);
    let mut prev = 0.0;
    for (x, w) in pairs {
        let cum = prev + w;
        let portion = (cum.min(keep_to) - prev.max(cut)).max(0.0);
        num += portion * x;
        den += portion;
        prev = cum;
    }
    Ok(if den > 0.0 { num / den } else { f64::NAN })
}


#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(300))]

        #[test]
        fn estimates_within_data_range(data in proptest::collection::vec(-1e3_f64..1e3, 1..60)) {
            let m = m_estimates(&Sample::unweighted(&data), &MEstimatorTuning::default()).unwrap();
            let lo = data.iter().copied().fold(f64::INFINITY, f64::min);
            let hi = data.iter().copied().fold(f64::NEG_INFINITY, f64::max);
            for v in [m.huber, m.hampel, m.andrew, m.tukey] {
                prop_assert!(v >= lo - 1e-9 && v <= hi + 1e-9, "{} not in [{}, {}]", v, lo, hi);
            }
        }

        #[test]
        fn trimmed_mean_within_data_range(
            data in proptest::collection::vec(-1e3_f64..1e3, 1..60),
            pct in 0.0_f64..49.9,
        ) {
            let t = trimmed_mean(&Sample::unweighted(&data), pct).unwrap();
            let lo = data.iter().copied().fold(f64::INFINITY, f64::min);
            let hi = data.iter().copied().fold(f64::NEG_INFINITY, f64::max);
            prop_assert!(t >= lo - 1e-9 && t <= hi + 1e-9);
        }

        #[test]
        fn m_estimates_shift_equivariant(
            data in proptest::collection::vec(-100.0_f64..100.0, 3..40),
            shift in -50.0_f64..50.0,
        ) {
            let shifted: Vec<f64> = data.iter().map(|x| x + shift).collect();
            let a = m_estimate(&Sample::unweighted(&data), MEstimatorKind::Huber, &MEstimatorTuning::default()).unwrap();
            let b = m_estimate(&Sample::unweighted(&shifted), MEstimatorKind::Huber, &MEstimatorTuning::default()).unwrap();
            prop_assert!((a + shift - b).abs() < 1e-3 * (1.0 + a.abs()));
        }
    }
}
