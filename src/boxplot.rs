//! Boxplot summary: Tukey hinges, fences, whiskers and flagged points.

use serde::{Deserialize, Serialize};

use crate::percentile::{OrderStatistics, TukeyHinges};
use crate::sample::Sample;

/// Inner fences sit this many IQRs beyond the hinges.
pub const INNER_FENCE_FACTOR: f64 = 1.5;
/// Outer fences sit this many IQRs beyond the hinges.
pub const OUTER_FENCE_FACTOR: f64 = 3.0;

/// Classification of an observation beyond the inner fences.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PointClass {
    /// Beyond an inner fence, within the outer fences.
    Outlier,
    /// Beyond an outer fence.
    Extreme,
}

/// A flagged observation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoxplotPoint {
    /// Position in the input column.
    pub index: usize,
    /// Observed value.
    pub value: f64,
    /// Outlier or extreme.
    pub class: PointClass,
}

/// A pair of fences.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Fences {
    /// Lower fence.
    pub lower: f64,
    /// Upper fence.
    pub upper: f64,
}

impl Fences {
    fn around(hinges: &TukeyHinges, iqr: f64, factor: f64) -> Self {
        Self {
            lower: hinges.lower - factor * iqr,
            upper: hinges.upper + factor * iqr,
        }
    }

    fn excludes(&self, x: f64) -> bool {
        x < self.lower || x > self.upper
    }
}

/// Everything needed to draw a boxplot of one column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoxplotSummary {
    /// Tukey hinges and median.
    pub hinges: TukeyHinges,
    /// `upper hinge − lower hinge`.
    pub iqr: f64,
    /// Hinges ∓ 1.5·IQR.
    pub inner_fences: Fences,
    /// Hinges ∓ 3·IQR.
    pub outer_fences: Fences,
    /// Smallest observed value inside the inner fences, never above the
    /// lower hinge.
    pub lower_whisker: f64,
    /// Largest observed value inside the inner fences, never below the
    /// upper hinge.
    pub upper_whisker: f64,
    /// Outliers and extremes in input order.
    pub points: Vec<BoxplotPoint>,
}

/// Boxplot summary of the valid observations of `sample`.
///
/// # Examples
/// ```
/// use u_examine::boxplot::{boxplot, PointClass};
/// use u_examine::sample::Sample;
///
/// let b = boxplot(&Sample::unweighted(&[10.0, 12.0, 12.0, 13.0, 12.0, 28.0]));
/// assert_eq!(b.iqr, 1.0);
/// assert_eq!(b.upper_whisker, 13.0);
/// assert_eq!(b.points.last().map(|p| p.class), Some(PointClass::Extreme));
/// ```
pub fn boxplot(sample: &Sample<'_>) -> BoxplotSummary {
    summarize(sample, &OrderStatistics::from_sample(sample))
}

/// Boxplot from an already sorted view of the same sample.
pub(crate) fn summarize(sample: &Sample<'_>, order: &OrderStatistics) -> BoxplotSummary {
    let hinges = order.tukey_hinges();
    let iqr = hinges.upper - hinges.lower;
    let inner = Fences::around(&hinges, iqr, INNER_FENCE_FACTOR);
    let outer = Fences::around(&hinges, iqr, OUTER_FENCE_FACTOR);

    // fractional weights can interpolate a hinge past every observation
    // inside its fence; the whisker then stops at the hinge
    let mut inside = order.values().iter().copied().filter(|&x| !inner.excludes(x));
    let first = inside.next();
    let last = inside.last().or(first);
    let lower_whisker = first.map_or(hinges.lower, |x| x.min(hinges.lower));
    let upper_whisker = last.map_or(hinges.upper, |x| x.max(hinges.upper));

    let points = sample
        .valid()
        .filter(|o| inner.excludes(o.value))
        .map(|o| BoxplotPoint {
            index: o.index,
            value: o.value,
            class: if outer.excludes(o.value) {
                PointClass::Extreme
            } else {
                PointClass::Outlier
            },
        })
        .collect();

    BoxplotSummary {
        hinges,
        iqr,
        inner_fences: inner,
        outer_fences: outer,
        lower_whisker,
        upper_whisker,
        points,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scenario_hinges_and_fences() {
        let b = boxplot(&Sample::unweighted(&[10.0, 12.0, 12.0, 13.0, 12.0, 28.0]));
        assert_eq!(b.hinges.lower, 12.0);
        assert_eq!(b.hinges.median, 12.0);
        assert_eq!(b.hinges.upper, 13.0);
        assert_eq!(b.iqr, 1.0);
        assert_eq!(b.inner_fences, Fences { lower: 10.5, upper: 14.5 });
        assert_eq!(b.outer_fences, Fences { lower: 9.0, upper: 16.0 });
        assert_eq!(b.lower_whisker, 12.0);
        assert_eq!(b.upper_whisker, 13.0);
        assert_eq!(
            b.points,
            vec![
                BoxplotPoint {
                    index: 0,
                    value: 10.0,
                    class: PointClass::Outlier
                },
                BoxplotPoint {
                    index: 5,
                    value: 28.0,
                    class: PointClass::Extreme
                },
            ]
        );
    }

    #[test]
    fn test_value_on_fence_is_not_flagged() {
        // hinges 2 and 4, IQR 2: inner fences −1 and 7
        let b = boxplot(&Sample::unweighted(&[-1.0, 2.0, 3.0, 3.0, 4.0, 7.0]));
        assert_eq!((b.hinges.lower, b.hinges.upper), (2.0, 4.0));
        assert!(b.points.is_empty());
        assert_eq!((b.lower_whisker, b.upper_whisker), (-1.0, 7.0));
    }

    #[test]
    fn test_no_outliers() {
        let data: Vec<f64> = (1..=9).map(f64::from).collect();
        let b = boxplot(&Sample::unweighted(&data));
        assert!(b.points.is_empty());
        assert_eq!((b.lower_whisker, b.upper_whisker), (1.0, 9.0));
    }

    #[test]
    fn test_zero_iqr_flags_everything_else_extreme() {
        let b = boxplot(&Sample::unweighted(&[5.0, 5.0, 5.0, 5.0, 5.0, 6.0]));
        assert_eq!(b.iqr, 0.0);
        assert_eq!(b.points.len(), 1);
        assert_eq!(b.points[0].class, PointClass::Extreme);
        assert_eq!((b.lower_whisker, b.upper_whisker), (5.0, 5.0));
    }

    #[test]
    fn test_fractional_weights_keep_whisker_at_hinge() {
        // W = 0.6: the lower hinge interpolates to about 7.25, beyond 5's fence
        let values = [8.0, 5.0];
        let weights = [0.4, 0.2];
        let b = boxplot(&Sample::weighted(&values, &weights).unwrap());
        assert!((b.hinges.lower - 7.25).abs() < 1e-9);
        assert_eq!(b.hinges.upper, 8.0);
        assert_eq!(b.points.len(), 1);
        assert_eq!(b.points[0].index, 1);
        assert_eq!(b.lower_whisker, b.hinges.lower);
        assert_eq!(b.upper_whisker, 8.0);
    }

    #[test]
    fn test_missing_and_invalid_skipped() {
        let values = [1.0, 2.0, f64::NAN, 3.0, 4.0, 999.0];
        let spec = crate::sample::MissingSpec::values([999.0]);
        let b = boxplot(&Sample::unweighted(&values).with_missing(&spec));
        assert!(b.points.is_empty());
        assert_eq!(b.upper_whisker, 4.0);
    }

    #[test]
    fn test_empty() {
        let b = boxplot(&Sample::unweighted(&[]));
        assert!(b.hinges.median.is_nan());
        assert!(b.iqr.is_nan());
        assert!(b.lower_whisker.is_nan() && b.upper_whisker.is_nan());
        assert!(b.points.is_empty());
    }
}
