//! Normality tests: Shapiro–Wilk and Lilliefors (Kolmogorov–Smirnov).
//!
//! Both return a [`NormalityResult`]. Inputs outside an approximation's
//! supported range give NaN in the affected fields rather than an error.
//!
//! # References
//!
//! - Shapiro & Wilk (1965). "An analysis of variance test for normality".
//!   Biometrika, 52(3–4), 591–611.
//! - Royston (1992). "Approximating the Shapiro-Wilk W-test for
//!   non-normality". Statistics and Computing, 2, 117–119.
//! - Lilliefors (1967). "On the Kolmogorov-Smirnov test for normality with
//!   mean and variance unknown". JASA, 62, 399–402.
//! - Dallal & Wilkinson (1986). "An analytic approximation to the
//!   distribution of Lilliefors's test statistic for normality".
//!   The American Statistician, 40(4), 294–296.

use std::f64::consts::FRAC_1_SQRT_2;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::moments::accumulate;
use crate::sample::Sample;
use crate::special::{inverse_normal_cdf, standard_normal_cdf};

/// Outcome of a normality test.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NormalityResult {
    /// Test statistic (`W` or `D`).
    pub statistic: f64,
    /// Sample size the statistic refers to.
    pub df: f64,
    /// Approximate p-value.
    pub significance: f64,
}

impl NormalityResult {
    fn undefined(df: f64) -> Self {
        Self {
            statistic: f64::NAN,
            df,
            significance: f64::NAN,
        }
    }
}

// ---------------------------------------------------------------------------
// Shapiro–Wilk
// ---------------------------------------------------------------------------

/// Smallest sample the Shapiro–Wilk approximation supports.
pub const SHAPIRO_WILK_MIN_N: usize = 3;
/// Largest sample the Shapiro–Wilk approximation supports.
pub const SHAPIRO_WILK_MAX_N: usize = 5000;
/// Smallest sample for which a significance is reported.
pub const SHAPIRO_WILK_MIN_N_FOR_P: usize = 12;
/// Reported significances are clamped into this interval.
pub const SHAPIRO_WILK_P_BOUNDS: (f64, f64) = (0.01, 0.99);

// Royston (1992) polynomial corrections for the two outermost coefficients,
// in powers of 1/√n. One set covers the whole range 3..=5000; there is no
// separate small-sample table below n = 50.
const SW_A1: [f64; 6] = [0.0, 0.221157, -0.147981, -2.07119, 4.434685, -2.706056];
const SW_A2: [f64; 6] = [0.0, 0.042981, -0.293762, -1.752461, 5.682633, -3.582633];
// Mean and log-sd of ln(1 − W) in powers of ln n. This single large-sample
// fit is used for every n ≥ 12, above and below 50 alike.
const SW_MU: [f64; 4] = [-1.5861, -0.31082, -0.083751, 0.0038915];
const SW_LN_SIGMA: [f64; 3] = [-0.4803, -0.082676, 0.0030302];

/// `c[0] + c[1]·x + c[2]·x² + …` by Horner's rule.
fn poly(c: &[f64], x: f64) -> f64 {
    c.iter().rev().fold(0.0, |acc, &ci| acc * x + ci)
}

/// Shapiro–Wilk test of normality.
///
/// Weights are rounded to the nearest integer and the sample is expanded
/// by replication; a warning is logged when any weight is fractional.
/// The expanded size must lie in `[3, 5000]`, otherwise statistic and
/// significance are NaN. The significance is NaN below n = 12 and is
/// clamped to `[0.01, 0.99]` otherwise.
///
/// # Examples
/// ```
/// use u_examine::normality::shapiro_wilk;
/// use u_examine::sample::Sample;
///
/// let data: Vec<f64> = (1..=20).map(f64::from).collect();
/// let r = shapiro_wilk(&Sample::unweighted(&data));
/// assert!((r.statistic - 0.9604).abs() < 1e-3);
/// assert!(r.significance > 0.05);
/// ```
pub fn shapiro_wilk(sample: &Sample<'_>) -> NormalityResult {
    if sample.has_fractional_weights() {
        warn!("Shapiro-Wilk rounds fractional case weights to integers");
    }
    let pairs = sample.sorted_valid();
    let total: f64 = pairs.iter().map(|&(_, w)| w.round()).sum();
    if !(SHAPIRO_WILK_MIN_N as f64..=SHAPIRO_WILK_MAX_N as f64).contains(&total) {
        return NormalityResult::undefined(total);
    }

    let mut x = Vec::with_capacity(total as usize);
    for (v, w) in pairs {
        x.extend(std::iter::repeat(v).take(w.round() as usize));
    }
    let n = x.len();
    let df = n as f64;

    if x[n - 1] - x[0] == 0.0 {
        return NormalityResult::undefined(df);
    }
    let Some(a) = shapiro_wilk_coefficients(n) else {
        return NormalityResult::undefined(df);
    };

    let sa: f64 = a.iter().enumerate().map(|(i, ai)| ai * (x[n - 1 - i] - x[i])).sum();
    let mean = x.iter().sum::<f64>() / df;
    let ss: f64 = x.iter().map(|v| (v - mean).powi(2)).sum();
    let w = (sa * sa / ss).min(1.0);

    NormalityResult {
        statistic: w,
        df,
        significance: shapiro_wilk_significance(w, n),
    }
}

/// The `⌊n/2⌋` antisymmetric coefficients `a₁ ≥ a₂ ≥ …`, unit norm overall.
fn shapiro_wilk_coefficients(n: usize) -> Option<Vec<f64>> {
    if n == 3 {
        return Some(vec![FRAC_1_SQRT_2]);
    }
    let half = n / 2;
    let nf = n as f64;

    // Blom scores; negative in the lower half
    let m: Vec<f64> = (0..half)
        .map(|i| inverse_normal_cdf((i as f64 + 1.0 - 0.375) / (nf + 0.25)))
        .collect();
    let summ2 = 2.0 * m.iter().map(|v| v * v).sum::<f64>();
    let ssumm2 = summ2.sqrt();
    let rsn = 1.0 / nf.sqrt();

    let corrected = if n <= 5 { 1 } else { 2 };
    let mut a = vec![0.0; half];
    a[0] = poly(&SW_A1, rsn) - m[0] / ssumm2;
    if corrected == 2 {
        a[1] = poly(&SW_A2, rsn) - m[1] / ssumm2;
    }

    let fixed_m: f64 = m[..corrected].iter().map(|v| v * v).sum::<f64>();
    let fixed_a: f64 = a[..corrected].iter().map(|v| v * v).sum::<f64>();
    let fac_sq = (summ2 - 2.0 * fixed_m) / (1.0 - 2.0 * fixed_a);
    if !(fac_sq > 0.0 && fac_sq.is_finite()) {
        return None;
    }
    let fac = fac_sq.sqrt();
    for (ai, mi) in a.iter_mut().zip(&m).skip(corrected) {
        *ai = -mi / fac;
    }
    Some(a)
}

/// Royston's log-normal approximation of `P(W ≤ w)` upper tail.
fn shapiro_wilk_significance(w: f64, n: usize) -> f64 {
    if n < SHAPIRO_WILK_MIN_N_FOR_P {
        return f64::NAN;
    }
    let (lo, hi) = SHAPIRO_WILK_P_BOUNDS;
    let w1 = 1.0 - w;
    if w1 <= 0.0 {
        return hi;
    }
    let ln_n = (n as f64).ln();
    let mu = poly(&SW_MU, ln_n);
    let sigma = poly(&SW_LN_SIGMA, ln_n).exp();
    let z = (w1.ln() - mu) / sigma;
    (1.0 - standard_normal_cdf(z)).clamp(lo, hi)
}

// ---------------------------------------------------------------------------
// Lilliefors
// ---------------------------------------------------------------------------

/// Smallest sample for which a Lilliefors significance is reported.
pub const LILLIEFORS_MIN_N: f64 = 5.0;

// Dallal–Wilkinson exponential approximation, valid where it gives p ≤ 0.1.
const DW_SHIFT: f64 = 2.78019;
const DW_EXP: [f64; 5] = [-7.01256, 2.99587, -0.122119, 0.974598, 1.67997];
// Above n = 100, D is rescaled by (n/100)^0.49 and evaluated at n = 100.
const DW_LARGE_N: f64 = 100.0;
const DW_LARGE_N_POWER: f64 = 0.49;

// Piecewise quartics in the modified statistic for p > 0.1: (upper bound, coefficients).
const DW_TAIL: [(f64, [f64; 5]); 3] = [
    (0.5, [2.76773, -19.828315, 80.709644, -138.55152, 81.218052]),
    (0.9, [-4.901232, 40.662806, -97.490286, 94.029866, -32.355711]),
    (1.31, [6.198765, -19.558097, 23.186922, -12.234627, 2.423045]),
];
const DW_TAIL_FLOOR: f64 = 0.302;

/// Lilliefors test: Kolmogorov–Smirnov against a normal with the sample's
/// own weighted mean and standard deviation.
///
/// `D = max(D⁺, D⁻)` over the weighted empirical CDF. The significance
/// follows Dallal & Wilkinson and is NaN when the total weight is below 5.
/// Statistic and significance are NaN when the standard deviation is zero
/// or undefined.
///
/// # Examples
/// ```
/// use u_examine::normality::lilliefors;
/// use u_examine::sample::Sample;
///
/// let r = lilliefors(&Sample::unweighted(&[1.0, 2.0, 3.0, 4.0, 5.0]));
/// assert!((r.statistic - 0.13646).abs() < 1e-4);
/// ```
pub fn lilliefors(sample: &Sample<'_>) -> NormalityResult {
    let moments = accumulate(sample);
    let n = moments.n;
    let sd = moments.std_dev();
    if !(sd.is_finite() && sd > 0.0) {
        return NormalityResult::undefined(n);
    }

    let mut cum = 0.0;
    let mut d = 0.0_f64;
    for (x, w) in sample.sorted_valid() {
        let phi = standard_normal_cdf((x - moments.mean) / sd);
        let before = cum / n;
        cum += w;
        let after = cum / n;
        d = d.max(after - phi).max(phi - before);
    }

    NormalityResult {
        statistic: d,
        df: n,
        significance: lilliefors_significance(d, n),
    }
}

fn lilliefors_significance(d: f64, n: f64) -> f64 {
    if n < LILLIEFORS_MIN_N {
        return f64::NAN;
    }
    let (kd, nd) = if n > DW_LARGE_N {
        (d * (n / DW_LARGE_N).powf(DW_LARGE_N_POWER), DW_LARGE_N)
    } else {
        (d, n)
    };
    let shifted = nd + DW_SHIFT;
    let p = (DW_EXP[0] * kd * kd * shifted
        + DW_EXP[1] * kd * shifted.sqrt()
        + DW_EXP[2]
        + DW_EXP[3] / nd.sqrt()
        + DW_EXP[4] / nd)
        .exp();
    if p <= 0.1 {
        return p;
    }

    let sqrt_n = n.sqrt();
    let kk = (sqrt_n - 0.01 + 0.85 / sqrt_n) * d;
    if kk <= DW_TAIL_FLOOR {
        return 1.0;
    }
    DW_TAIL
        .iter()
        .find(|(upper, _)| kk <= *upper)
        .map_or(0.0, |(_, c)| poly(c, kk).clamp(0.0, 1.0))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    fn normal_scores(n: usize) -> Vec<f64> {
        (1..=n)
            .map(|i| inverse_normal_cdf((i as f64 - 0.5) / n as f64))
            .collect()
    }

    fn exponential_scores(n: usize) -> Vec<f64> {
        (1..=n).map(|i| -(1.0 - (i as f64 - 0.5) / n as f64).ln()).collect()
    }

    #[test]
    fn test_poly_horner() {
        assert_eq!(poly(&[1.0, 2.0, 3.0], 2.0), 17.0);
        assert_eq!(poly(&[], 5.0), 0.0);
    }

    #[test]
    fn test_sw_n3_closed_form() {
        let r = shapiro_wilk(&Sample::unweighted(&[1.0, 2.0, 4.0]));
        // W = 0.5·3² / (42/9)
        assert!((r.statistic - 4.5 / (42.0 / 9.0)).abs() < 1e-12);
        assert_eq!(r.df, 3.0);
        assert!(r.significance.is_nan());
    }

    #[test]
    fn test_sw_coefficients_n7() {
        let a = shapiro_wilk_coefficients(7).unwrap();
        assert!((a[0] - 0.6233).abs() < 1e-3);
        assert!((a[1] - 0.3031).abs() < 1e-3);
        assert!((a[2] - 0.1401).abs() < 2e-3);
        // antisymmetric unit norm
        let norm: f64 = 2.0 * a.iter().map(|v| v * v).sum::<f64>();
        assert!((norm - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_sw_uniform_1_to_20() {
        let data: Vec<f64> = (1..=20).map(f64::from).collect();
        let r = shapiro_wilk(&Sample::unweighted(&data));
        assert!((r.statistic - 0.96038).abs() < 1e-4);
        assert!((r.significance - 0.55).abs() < 0.02);
    }

    #[test]
    fn test_sw_normal_scores_not_rejected() {
        let r = shapiro_wilk(&Sample::unweighted(&normal_scores(50)));
        assert!(r.statistic > 0.99);
        assert_eq!(r.significance, 0.99);
    }

    #[test]
    fn test_sw_skewed_rejected() {
        let r = shapiro_wilk(&Sample::unweighted(&exponential_scores(50)));
        assert!(r.statistic < 0.9);
        assert_eq!(r.significance, 0.01);
    }

    #[test]
    fn test_sw_small_n_has_no_significance() {
        let data: Vec<f64> = (1..=11).map(|i| f64::from(i * i)).collect();
        let r = shapiro_wilk(&Sample::unweighted(&data));
        assert!(r.statistic > 0.0 && r.statistic < 1.0);
        assert!(r.significance.is_nan());
    }

    #[test]
    fn test_sw_out_of_range_sizes() {
        let r = shapiro_wilk(&Sample::unweighted(&[1.0, 2.0]));
        assert!(r.statistic.is_nan() && r.significance.is_nan());

        let r = shapiro_wilk(&Sample::weighted(&[1.0, 2.0, 3.0], &[2000.0, 2000.0, 1001.0]).unwrap());
        assert_eq!(r.df, 5001.0);
        assert!(r.statistic.is_nan() && r.significance.is_nan());
    }

    #[test]
    fn test_sw_zero_range() {
        let r = shapiro_wilk(&Sample::unweighted(&[4.0; 20]));
        assert!(r.statistic.is_nan() && r.significance.is_nan());
        assert_eq!(r.df, 20.0);
    }

    #[test]
    fn test_sw_weights_replicate() {
        let values = [1.0, 2.0, 3.0, 7.0];
        let weighted = shapiro_wilk(&Sample::weighted(&values, &[2.0, 1.0, 1.4, 1.0]).unwrap());
        let replicated = shapiro_wilk(&Sample::unweighted(&[1.0, 1.0, 2.0, 3.0, 7.0]));
        assert_eq!(weighted.statistic, replicated.statistic);
        assert_eq!(weighted.df, 5.0);
        assert!(weighted.significance.is_nan());
    }

    #[test]
    fn test_statistics_are_affine_invariant() {
        let mut rng = StdRng::seed_from_u64(7);
        let data: Vec<f64> = (0..40).map(|_| rng.random::<f64>()).collect();
        let scaled: Vec<f64> = data.iter().map(|x| 3.0 * x - 11.0).collect();

        let a = shapiro_wilk(&Sample::unweighted(&data));
        let b = shapiro_wilk(&Sample::unweighted(&scaled));
        assert!((a.statistic - b.statistic).abs() < 1e-10);

        let a = lilliefors(&Sample::unweighted(&data));
        let b = lilliefors(&Sample::unweighted(&scaled));
        assert!((a.statistic - b.statistic).abs() < 1e-10);
    }

    #[test]
    fn test_lilliefors_small_example() {
        let r = lilliefors(&Sample::unweighted(&[1.0, 2.0, 3.0, 4.0, 5.0]));
        assert!((r.statistic - 0.136455).abs() < 1e-5);
        assert_eq!(r.df, 5.0);
        assert!((r.significance - 0.9912).abs() < 1e-3);
    }

    #[test]
    fn test_lilliefors_below_five_has_no_significance() {
        let r = lilliefors(&Sample::unweighted(&[1.0, 2.0, 4.0, 8.0]));
        assert!(r.statistic > 0.0);
        assert!(r.significance.is_nan());
    }

    #[test]
    fn test_lilliefors_zero_variance() {
        let r = lilliefors(&Sample::unweighted(&[2.0; 10]));
        assert!(r.statistic.is_nan() && r.significance.is_nan());
    }

    #[test]
    fn test_lilliefors_normal_vs_skewed() {
        let normal = lilliefors(&Sample::unweighted(&normal_scores(200)));
        let skewed = lilliefors(&Sample::unweighted(&exponential_scores(200)));
        assert!(normal.statistic < 0.02);
        assert!(normal.significance > 0.1);
        assert!(skewed.statistic > 0.1);
        assert!(skewed.significance < 0.01);
    }

    #[test]
    fn test_lilliefors_weights_match_replication() {
        let weighted = lilliefors(&Sample::weighted(&[1.0, 2.0, 5.0, 6.0], &[3.0, 1.0, 2.0, 1.0]).unwrap());
        let replicated = lilliefors(&Sample::unweighted(&[1.0, 1.0, 1.0, 2.0, 5.0, 5.0, 6.0]));
        assert!((weighted.statistic - replicated.statistic).abs() < 1e-12);
        assert!((weighted.significance - replicated.significance).abs() < 1e-9);
    }

    #[test]
    fn test_lilliefors_significance_regimes() {
        // large D with small n: exponential form
        assert!(lilliefors_significance(0.5, 30.0) < 0.001);
        // tiny D: polynomial floor
        assert_eq!(lilliefors_significance(0.01, 30.0), 1.0);
        // n > 100 rescales toward smaller p
        assert!(lilliefors_significance(0.08, 400.0) < lilliefors_significance(0.08, 100.0));
    }
}
