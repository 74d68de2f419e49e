//! Input columns: observations, optional case weights, and user-missing values.
//!
//! A [`Sample`] borrows the caller's arrays and never copies or reorders
//! them. Observations that cannot contribute (non-finite value, weight that
//! is non-finite or ≤ 0) are skipped while iterating, but keep their index
//! so per-case outputs line up with the input.

use serde::{Deserialize, Serialize};

use crate::error::{Result, StatsError};

/// User-defined missing values: discrete codes plus an optional inclusive range.
///
/// Missing observations count toward total weight and percent in a
/// frequency table but are excluded from valid percent, cumulative
/// statistics and every other statistic.
///
/// # Examples
/// ```
/// use u_examine::sample::MissingSpec;
/// let spec = MissingSpec::values([-9.0, -8.0]).with_range(900.0, 999.0);
/// assert!(spec.is_missing(-9.0));
/// assert!(spec.is_missing(950.0));
/// assert!(!spec.is_missing(0.0));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MissingSpec {
    /// Discrete values treated as missing.
    pub values: Vec<f64>,
    /// Inclusive `(low, high)` range treated as missing.
    pub range: Option<(f64, f64)>,
}

impl MissingSpec {
    /// Missing spec made of discrete codes only.
    pub fn values(values: impl IntoIterator<Item = f64>) -> Self {
        Self {
            values: values.into_iter().collect(),
            range: None,
        }
    }

    /// Adds an inclusive missing range.
    pub fn with_range(mut self, low: f64, high: f64) -> Self {
        self.range = Some((low, high));
        self
    }

    /// Returns `true` if `x` is declared missing.
    pub fn is_missing(&self, x: f64) -> bool {
        if self.values.iter().any(|&m| m == x) {
            return true;
        }
        matches!(self.range, Some((lo, hi)) if lo <= x && x <= hi)
    }

    /// Returns `true` if no value is declared missing.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty() && self.range.is_none()
    }
}

/// One usable observation yielded by [`Sample::observations`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Observation {
    /// Position in the caller's arrays.
    pub index: usize,
    /// Observed value (finite).
    pub value: f64,
    /// Case weight (finite, > 0).
    pub weight: f64,
    /// Declared missing by the [`MissingSpec`].
    pub is_missing: bool,
}

/// A numeric column with optional case weights and missing-value codes.
///
/// # Examples
/// ```
/// use u_examine::sample::Sample;
/// let values = [1.0, f64::NAN, 3.0, 4.0];
/// let weights = [1.0, 1.0, 0.0, 2.0];
/// let s = Sample::weighted(&values, &weights).unwrap();
/// // NaN value and zero weight are both skipped
/// let kept: Vec<usize> = s.valid().map(|o| o.index).collect();
/// assert_eq!(kept, vec![0, 3]);
/// assert_eq!(s.valid_weight(), 3.0);
/// ```
#[derive(Debug, Clone, Copy)]
pub struct Sample<'a> {
    values: &'a [f64],
    weights: Option<&'a [f64]>,
    missing: Option<&'a MissingSpec>,
}

impl<'a> Sample<'a> {
    /// Builds a sample, checking that `weights` (if any) align with `values`.
    ///
    /// # Errors
    /// [`StatsError::LengthMismatch`] if the lengths differ.
    pub fn new(values: &'a [f64], weights: Option<&'a [f64]>) -> Result<Self> {
        if let Some(w) = weights {
            if w.len() != values.len() {
                return Err(StatsError::LengthMismatch {
                    values: values.len(),
                    weights: w.len(),
                });
            }
        }
        Ok(Self {
            values,
            weights,
            missing: None,
        })
    }

    /// Unweighted sample; every observation has implicit weight 1.
    pub fn unweighted(values: &'a [f64]) -> Self {
        Self {
            values,
            weights: None,
            missing: None,
        }
    }

    /// Weighted sample.
    ///
    /// # Errors
    /// [`StatsError::LengthMismatch`] if the lengths differ.
    pub fn weighted(values: &'a [f64], weights: &'a [f64]) -> Result<Self> {
        Self::new(values, Some(weights))
    }

    /// Attaches user-missing value codes.
    pub fn with_missing(mut self, missing: &'a MissingSpec) -> Self {
        self.missing = Some(missing);
        self
    }

    /// The raw values, including excluded ones.
    pub fn values(&self) -> &'a [f64] {
        self.values
    }

    /// Number of raw entries (valid or not).
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Returns `true` if the column has no entries at all.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Weight of entry `i` (1 when unweighted).
    fn weight_at(&self, i: usize) -> f64 {
        self.weights.map_or(1.0, |w| w[i])
    }

    /// Usable observations in input order, including user-missing ones.
    pub fn observations(&self) -> impl Iterator<Item = Observation> + 'a {
        let values = self.values;
        let weights = self.weights;
        let missing = self.missing;
        values.iter().enumerate().filter_map(move |(index, &value)| {
            let weight = weights.map_or(1.0, |w| w[index]);
            if !is_usable(value, weight) {
                return None;
            }
            Some(Observation {
                index,
                value,
                weight,
                is_missing: missing.is_some_and(|m| m.is_missing(value)),
            })
        })
    }

    /// Usable, non-missing observations in input order.
    pub fn valid(&self) -> impl Iterator<Item = Observation> + 'a {
        self.observations().filter(|o| !o.is_missing)
    }

    /// Valid `(value, weight)` pairs sorted ascending by value.
    ///
    /// Ties keep input order, so the result is deterministic.
    pub fn sorted_valid(&self) -> Vec<(f64, f64)> {
        let mut pairs: Vec<(f64, f64)> = self.valid().map(|o| (o.value, o.weight)).collect();
        pairs.sort_by(|a, b| a.0.total_cmp(&b.0));
        pairs
    }

    /// Total weight of valid observations.
    pub fn valid_weight(&self) -> f64 {
        self.valid().map(|o| o.weight).sum()
    }

    /// Returns `true` if any valid observation carries a fractional weight.
    pub fn has_fractional_weights(&self) -> bool {
        self.weights.is_some() && self.valid().any(|o| o.weight.fract() != 0.0)
    }
}

/// An observation contributes only with a finite value and a finite, positive weight.
pub(crate) fn is_usable(value: f64, weight: f64) -> bool {
    value.is_finite() && weight.is_finite() && weight > 0.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_length_mismatch() {
        let err = Sample::weighted(&[1.0, 2.0], &[1.0]).unwrap_err();
        assert_eq!(
            err,
            StatsError::LengthMismatch {
                values: 2,
                weights: 1
            }
        );
    }

    #[test]
    fn test_filter_preserves_indices() {
        let values = [1.0, f64::INFINITY, 2.0, 3.0, 4.0];
        let weights = [1.0, 1.0, -1.0, f64::NAN, 0.5];
        let s = Sample::weighted(&values, &weights).unwrap();
        let idx: Vec<usize> = s.observations().map(|o| o.index).collect();
        assert_eq!(idx, vec![0, 4]);
        assert_eq!(s.valid_weight(), 1.5);
        assert_eq!(s.len(), 5);
    }

    #[test]
    fn test_missing_flags_but_keeps_in_observations() {
        let values = [1.0, -9.0, 2.0];
        let spec = MissingSpec::values([-9.0]);
        let s = Sample::unweighted(&values).with_missing(&spec);
        assert_eq!(s.observations().count(), 3);
        assert_eq!(s.valid().count(), 2);
        assert!(s.observations().any(|o| o.is_missing && o.value == -9.0));
    }

    #[test]
    fn test_missing_range_is_inclusive() {
        let spec = MissingSpec::default().with_range(97.0, 99.0);
        assert!(spec.is_missing(97.0));
        assert!(spec.is_missing(99.0));
        assert!(!spec.is_missing(99.5));
        assert!(!spec.is_empty());
        assert!(MissingSpec::default().is_empty());
    }

    #[test]
    fn test_sorted_valid() {
        let values = [3.0, 1.0, 2.0, f64::NAN];
        let s = Sample::unweighted(&values);
        assert_eq!(s.sorted_valid(), vec![(1.0, 1.0), (2.0, 1.0), (3.0, 1.0)]);
    }

    #[test]
    fn test_fractional_weights() {
        let values = [1.0, 2.0, 99.0];
        assert!(!Sample::unweighted(&values).has_fractional_weights());
        assert!(!Sample::weighted(&values, &[1.0, 3.0, 1.0])
            .unwrap()
            .has_fractional_weights());
        assert!(Sample::weighted(&values, &[1.0, 2.5, 1.0])
            .unwrap()
            .has_fractional_weights());

        let missing = MissingSpec::values([99.0]);
        assert!(!Sample::weighted(&values, &[1.0, 2.0, 0.5])
            .unwrap()
            .with_missing(&missing)
            .has_fractional_weights());
    }
}
