//! Weighted single-pass moments.
//!
//! [`MomentsAccumulator`] keeps the total weight, weighted sum, running mean
//! and the central sums M₂, M₃, M₄ using a provisional-means recurrence.
//! [`Moments`] is the frozen result and derives variance, standard error,
//! skewness and kurtosis from it.
//!
//! # Algorithm
//! For an observation `x` with weight `w`, total weight before `W₀` and
//! after `W = W₀ + w`:
//!
//! ```text
//! δ    = x − mean
//! δN   = δ·w / W
//! r    = δ / W
//! t    = δ·δN·W₀
//! M₄  += t·r²·(W² − 3Ww + 3w²) + 6δN²·M₂ − 4δN·M₃
//! M₃  += t·r·(W − 2w) − 3δN·M₂
//! M₂  += t
//! mean += δN
//! ```
//!
//! M₄ is updated before M₃ before M₂ because each uses the *previous* lower
//! moments. With `w = 1` this is exactly the unweighted Welford/Terriberry
//! update.
//!
//! References:
//! - Welford (1962), *Technometrics* 4(3), pp. 419–420.
//! - Pébay (2008), "Formulas for Robust, One-Pass Parallel Computation of
//!   Covariances and Arbitrary-Order Statistical Moments", SAND2008-6212.

use serde::{Deserialize, Serialize};

use crate::sample::{is_usable, Sample};

/// Streaming accumulator for weighted moments up to the fourth order.
///
/// # Examples
/// ```
/// use u_examine::moments::MomentsAccumulator;
/// let mut acc = MomentsAccumulator::new();
/// for &x in &[2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0] {
///     acc.update(x, 1.0);
/// }
/// let m = acc.finish();
/// assert!((m.mean - 5.0).abs() < 1e-14);
/// assert!((m.variance() - 4.571428571428571).abs() < 1e-12);
/// ```
#[derive(Debug, Clone, Default)]
pub struct MomentsAccumulator {
    weight: f64,
    sum: f64,
    mean: f64,
    m2: f64,
    m3: f64,
    m4: f64,
}

impl MomentsAccumulator {
    /// Creates an empty accumulator.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `x` with weight `w`. Ignored unless `x` is finite and `w` is
    /// finite and positive.
    pub fn update(&mut self, x: f64, w: f64) {
        if !is_usable(x, w) {
            return;
        }
        let w_prev = self.weight;
        self.weight += w;
        self.sum += x * w;

        if w_prev == 0.0 {
            self.mean = x;
            return;
        }

        let big_w = self.weight;
        let delta = x - self.mean;
        let delta_n = delta * w / big_w;
        let r = delta / big_w;
        let term1 = delta * delta_n * w_prev;

        self.m4 += term1 * r * r * (big_w * big_w - 3.0 * big_w * w + 3.0 * w * w)
            + 6.0 * delta_n * delta_n * self.m2
            - 4.0 * delta_n * self.m3;
        self.m3 += term1 * r * (big_w - 2.0 * w) - 3.0 * delta_n * self.m2;
        self.m2 += term1;
        self.mean += delta_n;
    }

    /// Folds another accumulator into this one.
    ///
    /// Uses the pairwise combination of Chan, Golub & LeVeque (1979)
    /// extended to M₃/M₄ by Pébay (2008), with weights in place of counts.
    pub fn merge(&mut self, other: &MomentsAccumulator) {
        if other.weight == 0.0 {
            return;
        }
        if self.weight == 0.0 {
            *self = other.clone();
            return;
        }
        let wa = self.weight;
        let wb = other.weight;
        let w = wa + wb;
        let d = other.mean - self.mean;
        let d2 = d * d;

        let m2 = self.m2 + other.m2 + d2 * wa * wb / w;
        let m3 = self.m3
            + other.m3
            + d2 * d * wa * wb * (wa - wb) / (w * w)
            + 3.0 * d * (wa * other.m2 - wb * self.m2) / w;
        let m4 = self.m4
            + other.m4
            + d2 * d2 * wa * wb * (wa * wa - wa * wb + wb * wb) / (w * w * w)
            + 6.0 * d2 * (wa * wa * other.m2 + wb * wb * self.m2) / (w * w)
            + 4.0 * d * (wa * other.m3 - wb * self.m3) / w;

        self.mean += d * wb / w;
        self.weight = w;
        self.sum += other.sum;
        self.m2 = m2;
        self.m3 = m3;
        self.m4 = m4;
    }

    /// Total weight accumulated so far.
    pub fn weight(&self) -> f64 {
        self.weight
    }

    /// Freezes the current state.
    pub fn finish(&self) -> Moments {
        Moments {
            n: self.weight,
            sum: self.sum,
            mean: if self.weight > 0.0 { self.mean } else { f64::NAN },
            m2: self.m2,
            m3: self.m3,
            m4: self.m4,
        }
    }
}

/// Accumulates the valid observations of `sample` in input order.
pub fn accumulate(sample: &Sample<'_>) -> Moments {
    let mut acc = MomentsAccumulator::new();
    for obs in sample.valid() {
        acc.update(obs.value, obs.weight);
    }
    acc.finish()
}

/// Weighted count, sum, mean and central sums of powers 2–4.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Moments {
    /// Effective (weighted) sample size.
    pub n: f64,
    /// Weighted sum Σ w·x.
    pub sum: f64,
    /// Weighted mean; NaN when `n = 0`.
    pub mean: f64,
    /// Σ w·(x − mean)².
    pub m2: f64,
    /// Σ w·(x − mean)³.
    pub m3: f64,
    /// Σ w·(x − mean)⁴.
    pub m4: f64,
}

impl Moments {
    /// Sample variance `m2 / (n − 1)`; NaN unless `n > 1`.
    pub fn variance(&self) -> f64 {
        if self.n > 1.0 {
            self.m2 / (self.n - 1.0)
        } else {
            f64::NAN
        }
    }

    /// Sample standard deviation.
    pub fn std_dev(&self) -> f64 {
        self.variance().sqrt()
    }

    /// Standard error of the mean `s / √n`.
    pub fn std_error(&self) -> f64 {
        self.std_dev() / self.n.sqrt()
    }

    /// Bias-corrected skewness (G₁); NaN unless `n > 2` and `m2 ≠ 0`.
    ///
    /// ```text
    /// G₁ = n·√(n−1)·M₃ / (M₂^{3/2}·(n−2))
    /// ```
    pub fn skewness(&self) -> f64 {
        let n = self.n;
        if n <= 2.0 || self.m2 == 0.0 {
            return f64::NAN;
        }
        n * (n - 1.0).sqrt() * self.m3 / (self.m2.powf(1.5) * (n - 2.0))
    }

    /// Standard error of skewness `√(6n(n−1) / ((n−2)(n+1)(n+3)))`.
    pub fn skewness_std_error(&self) -> f64 {
        let n = self.n;
        if n <= 2.0 || self.m2 == 0.0 {
            return f64::NAN;
        }
        (6.0 * n * (n - 1.0) / ((n - 2.0) * (n + 1.0) * (n + 3.0))).sqrt()
    }

    /// Bias-corrected excess kurtosis (G₂); NaN unless `n > 3` and `m2 ≠ 0`.
    pub fn kurtosis(&self) -> f64 {
        let n = self.n;
        if n <= 3.0 || self.m2 == 0.0 {
            return f64::NAN;
        }
        let d = (n - 2.0) * (n - 3.0);
        n * (n + 1.0) * (n - 1.0) * self.m4 / (d * self.m2 * self.m2)
            - 3.0 * (n - 1.0) * (n - 1.0) / d
    }

    /// Standard error of kurtosis `√(4(n²−1)·SE_skew² / ((n−3)(n+5)))`.
    pub fn kurtosis_std_error(&self) -> f64 {
        let n = self.n;
        if n <= 3.0 || self.m2 == 0.0 {
            return f64::NAN;
        }
        let se_skew = self.skewness_std_error();
        (4.0 * (n * n - 1.0) * se_skew * se_skew / ((n - 3.0) * (n + 5.0))).sqrt()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unweighted(data: &[f64]) -> Moments {
        accumulate(&Sample::unweighted(data))
    }

    /// Two-pass textbook formulas used as the reference.
    fn reference(data: &[f64]) -> (f64, f64, f64, f64) {
        let n = data.len() as f64;
        let mean = data.iter().sum::<f64>() / n;
        let (mut s2, mut s3, mut s4) = (0.0, 0.0, 0.0);
        for &x in data {
            let d = x - mean;
            s2 += d * d;
            s3 += d * d * d;
            s4 += d * d * d * d;
        }
        let var = s2 / (n - 1.0);
        let skew = n * (n - 1.0).sqrt() * s3 / (s2.powf(1.5) * (n - 2.0));
        let kurt = n * (n + 1.0) * (n - 1.0) * s4 / ((n - 2.0) * (n - 3.0) * s2 * s2)
            - 3.0 * (n - 1.0).powi(2) / ((n - 2.0) * (n - 3.0));
        (mean, var, skew, kurt)
    }

    fn rel_close(a: f64, b: f64, tol: f64) -> bool {
        (a - b).abs() <= tol * b.abs().max(1.0)
    }

    #[test]
    fn test_matches_reference() {
        let data = [1.0, 2.0, 3.0, 4.0, 8.0, 13.0, 21.0];
        let m = unweighted(&data);
        let (mean, var, skew, kurt) = reference(&data);
        assert!(rel_close(m.mean, mean, 1e-12));
        assert!(rel_close(m.variance(), var, 1e-12));
        assert!(rel_close(m.skewness(), skew, 1e-12));
        assert!(rel_close(m.kurtosis(), kurt, 1e-12));
        assert_eq!(m.n, 7.0);
        assert_eq!(m.sum, 52.0);
    }

    #[test]
    fn test_known_skewness() {
        // Excel SKEW(1,2,3,4,8) ≈ 1.3388
        let m = unweighted(&[1.0, 2.0, 3.0, 4.0, 8.0]);
        assert!((m.skewness() - 1.338_8).abs() < 1e-3, "{}", m.skewness());
    }

    #[test]
    fn test_integer_weights_equal_replication() {
        let values = [1.0, 5.0, 2.0, 9.0];
        let weights = [2.0, 1.0, 3.0, 1.0];
        let weighted = accumulate(&Sample::weighted(&values, &weights).unwrap());
        let replicated = unweighted(&[1.0, 1.0, 5.0, 2.0, 2.0, 2.0, 9.0]);
        assert!(rel_close(weighted.mean, replicated.mean, 1e-12));
        assert!(rel_close(weighted.m2, replicated.m2, 1e-12));
        assert!(rel_close(weighted.m3, replicated.m3, 1e-12));
        assert!(rel_close(weighted.m4, replicated.m4, 1e-12));
        assert_eq!(weighted.n, 7.0);
    }

    #[test]
    fn test_invalid_observations_ignored() {
        let values = [1.0, f64::NAN, 2.0, 3.0, 100.0];
        let weights = [1.0, 1.0, 1.0, 1.0, 0.0];
        let m = accumulate(&Sample::weighted(&values, &weights).unwrap());
        assert_eq!(m.n, 3.0);
        assert_eq!(m.mean, 2.0);
    }

    #[test]
    fn test_empty_is_nan() {
        let m = unweighted(&[]);
        assert_eq!(m.n, 0.0);
        assert!(m.mean.is_nan());
        assert!(m.variance().is_nan());
        assert!(m.std_error().is_nan());
    }

    #[test]
    fn test_domains() {
        let m = unweighted(&[1.0]);
        assert_eq!(m.mean, 1.0);
        assert!(m.variance().is_nan());

        let m = unweighted(&[1.0, 2.0]);
        assert!((m.variance() - 0.5).abs() < 1e-15);
        assert!(m.skewness().is_nan());

        let m = unweighted(&[1.0, 2.0, 4.0]);
        assert!(m.skewness().is_finite());
        assert!(m.kurtosis().is_nan());
        assert!(m.kurtosis_std_error().is_nan());

        let m = unweighted(&[5.0, 5.0, 5.0, 5.0]);
        assert_eq!(m.variance(), 0.0);
        assert!(m.skewness().is_nan());
        assert!(m.kurtosis().is_nan());
    }

    #[test]
    fn test_standard_errors() {
        // n = 10: SE_skew = sqrt(540/(8·11·13)) = 0.687043..., SE_kurt = 1.334249...
        let data: Vec<f64> = (1..=10).map(f64::from).collect();
        let m = unweighted(&data);
        assert!((m.skewness_std_error() - 0.687_043).abs() < 1e-6);
        assert!((m.kurtosis_std_error() - 1.334_249).abs() < 1e-6);
    }

    #[test]
    fn test_large_offset_is_stable() {
        let data: Vec<f64> = (1..=5).map(|i| 1e9 + i as f64).collect();
        let m = unweighted(&data);
        assert!((m.variance() - 2.5).abs() < 1e-6, "{}", m.variance());
    }

    #[test]
    fn test_merge_matches_sequential() {
        let a = [1.0, 3.0, 5.0, 7.0];
        let b = [2.0, 50.0, 4.0];
        let wa = [1.0, 0.5, 2.0, 1.5];
        let wb = [3.0, 1.0, 0.25];

        let mut acc_a = MomentsAccumulator::new();
        let mut seq = MomentsAccumulator::new();
        for (&x, &w) in a.iter().zip(&wa) {
            acc_a.update(x, w);
            seq.update(x, w);
        }
        let mut acc_b = MomentsAccumulator::new();
        for (&x, &w) in b.iter().zip(&wb) {
            acc_b.update(x, w);
            seq.update(x, w);
        }
        acc_a.merge(&acc_b);

        let (m, s) = (acc_a.finish(), seq.finish());
        assert!(rel_close(m.mean, s.mean, 1e-12));
        assert!(rel_close(m.m2, s.m2, 1e-10));
        assert!(rel_close(m.m3, s.m3, 1e-10));
        assert!(rel_close(m.m4, s.m4, 1e-10));
        assert!(rel_close(m.sum, s.sum, 1e-12));
    }

    #[test]
    fn test_merge_with_empty() {
        let mut acc = MomentsAccumulator::new();
        let mut other = MomentsAccumulator::new();
        other.update(4.0, 2.0);
        acc.merge(&other);
        assert_eq!(acc.finish().mean, 4.0);
        acc.merge(&MomentsAccumulator::new());
        assert_eq!(acc.weight(), 2.0);
    }
}

#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(300))]

        #[test]
        fn unit_weights_match_two_pass(data in proptest::collection::vec(-1e4_f64..1e4, 4..80)) {
            let ones = vec![1.0; data.len()];
            let m = accumulate(&Sample::weighted(&data, &ones).unwrap());
            let n = data.len() as f64;
            let mean = data.iter().sum::<f64>() / n;
            let s2: f64 = data.iter().map(|x| (x - mean).powi(2)).sum();
            prop_assert!((m.mean - mean).abs() <= 1e-9 * mean.abs().max(1.0));
            prop_assert!((m.m2 - s2).abs() <= 1e-9 * s2.max(1.0));
        }

        #[test]
        fn variance_non_negative(
            data in proptest::collection::vec(-1e6_f64..1e6, 2..60),
            w in proptest::collection::vec(0.01_f64..10.0, 60),
        ) {
            let w = &w[..data.len()];
            let m = accumulate(&Sample::weighted(&data, w).unwrap());
            prop_assert!(m.m2 >= 0.0);
        }

        #[test]
        fn weight_scaling_preserves_mean(
            data in proptest::collection::vec(-1e3_f64..1e3, 1..50),
            scale in 0.1_f64..10.0,
        ) {
            let ones = vec![1.0; data.len()];
            let scaled = vec![scale; data.len()];
            let a = accumulate(&Sample::weighted(&data, &ones).unwrap());
            let b = accumulate(&Sample::weighted(&data, &scaled).unwrap());
            prop_assert!((a.mean - b.mean).abs() <= 1e-9 * a.mean.abs().max(1.0));
        }
    }
}
