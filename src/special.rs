//! Special functions and reference distributions.
//!
//! Only what the exploratory procedures need: the standard normal CDF and
//! quantile (normality tests), Student's t (confidence intervals) and the
//! F-distribution (Levene's test).
//!
//! The F CDF is reached through the [`FCdf`] trait so the incomplete-beta
//! backend can be replaced without touching the callers.

use std::f64::consts::{FRAC_1_SQRT_2, PI};

// ============================================================================
// Normal distribution
// ============================================================================

/// Complementary error function erfc(x) = 1 − erf(x).
///
/// # Algorithm
/// Chebyshev-fitted rational approximation on `t = 1/(1 + z/2)`,
/// fractional error < 1.2 × 10⁻⁷ everywhere, including the far tails.
///
/// Reference: Press et al. (1992), *Numerical Recipes in C*, 2nd ed., §6.2.
pub fn erfc(x: f64) -> f64 {
    if x.is_nan() {
        return f64::NAN;
    }
    const C: [f64; 10] = [
        -1.265_512_23,
        1.000_023_68,
        0.374_091_96,
        0.096_784_18,
        -0.186_288_06,
        0.278_868_07,
        -1.135_203_98,
        1.488_515_87,
        -0.822_152_23,
        0.170_872_77,
    ];
    let z = x.abs();
    let t = 1.0 / (1.0 + 0.5 * z);
    let poly = C.iter().rev().fold(0.0, |acc, &c| acc * t + c);
    let r = t * (-z * z + poly).exp();
    if x >= 0.0 {
        r
    } else {
        2.0 - r
    }
}

/// Standard normal CDF Φ(x) = P(Z ≤ x).
///
/// Computed as `erfc(−x/√2) / 2`, which keeps relative accuracy in the
/// lower tail where normality p-values live.
///
/// # Examples
/// ```
/// use u_examine::special::standard_normal_cdf;
/// assert!((standard_normal_cdf(0.0) - 0.5).abs() < 1e-7);
/// assert!((standard_normal_cdf(1.96) - 0.975).abs() < 1e-4);
/// ```
pub fn standard_normal_cdf(x: f64) -> f64 {
    if x.is_nan() {
        return f64::NAN;
    }
    if x == f64::INFINITY {
        return 1.0;
    }
    if x == f64::NEG_INFINITY {
        return 0.0;
    }
    0.5 * erfc(-x * FRAC_1_SQRT_2)
}

/// Inverse standard normal CDF (quantile function) Φ⁻¹(p).
///
/// # Algorithm
/// Acklam's rational approximation: a central rational function on
/// `[0.02425, 0.97575]` and tail rational functions in `√(−2 ln q)`.
/// Relative error < 1.15 × 10⁻⁹.
///
/// # Returns
/// - `f64::NAN` if `p` is NaN or outside `[0, 1]`.
/// - `±∞` at `p = 1` / `p = 0`.
///
/// # Examples
/// ```
/// use u_examine::special::inverse_normal_cdf;
/// assert!(inverse_normal_cdf(0.5).abs() < 1e-9);
/// assert!((inverse_normal_cdf(0.975) - 1.959964).abs() < 1e-6);
/// ```
pub fn inverse_normal_cdf(p: f64) -> f64 {
    if p.is_nan() || !(0.0..=1.0).contains(&p) {
        return f64::NAN;
    }
    if p == 0.0 {
        return f64::NEG_INFINITY;
    }
    if p == 1.0 {
        return f64::INFINITY;
    }

    const A: [f64; 6] = [
        -3.969_683_028_665_376e1,
        2.209_460_984_245_205e2,
        -2.759_285_104_469_687e2,
        1.383_577_518_672_690e2,
        -3.066_479_806_614_716e1,
        2.506_628_277_459_239,
    ];
    const B: [f64; 5] = [
        -5.447_609_879_822_406e1,
        1.615_858_368_580_409e2,
        -1.556_989_798_598_866e2,
        6.680_131_188_771_972e1,
        -1.328_068_155_288_572e1,
    ];
    const C: [f64; 6] = [
        -7.784_894_002_430_293e-3,
        -3.223_964_580_411_365e-1,
        -2.400_758_277_161_838,
        -2.549_732_539_343_734,
        4.374_664_141_464_968,
        2.938_163_982_698_783,
    ];
    const D: [f64; 4] = [
        7.784_695_709_041_462e-3,
        3.224_671_290_700_398e-1,
        2.445_134_137_142_996,
        3.754_408_661_907_416,
    ];
    const P_LOW: f64 = 0.024_25;

    let tail = |q: f64| {
        let t = (-2.0 * q.ln()).sqrt();
        (((((C[0] * t + C[1]) * t + C[2]) * t + C[3]) * t + C[4]) * t + C[5])
            / ((((D[0] * t + D[1]) * t + D[2]) * t + D[3]) * t + 1.0)
    };

    if p < P_LOW {
        tail(p)
    } else if p > 1.0 - P_LOW {
        -tail(1.0 - p)
    } else {
        let q = p - 0.5;
        let r = q * q;
        (((((A[0] * r + A[1]) * r + A[2]) * r + A[3]) * r + A[4]) * r + A[5]) * q
            / (((((B[0] * r + B[1]) * r + B[2]) * r + B[3]) * r + B[4]) * r + 1.0)
    }
}

// ============================================================================
// Gamma and Beta
// ============================================================================

/// Lanczos approximation of ln Γ(x) (g = 7, 9 terms).
///
/// Reference: Lanczos (1964), *SIAM Journal on Numerical Analysis* 1(1).
///
/// # Accuracy
/// Relative error < 2 × 10⁻¹⁰ for x > 0.
pub fn ln_gamma(x: f64) -> f64 {
    #[allow(clippy::excessive_precision)]
    const LANCZOS: [f64; 9] = [
        0.99999999999980993,
        676.5203681218851,
        -1259.1392167224028,
        771.32342877765313,
        -176.61502916214059,
        12.507343278686905,
        -0.13857109526572012,
        9.9843695780195716e-6,
        1.5056327351493116e-7,
    ];
    const G: f64 = 7.0;

    if x < 0.5 {
        // Reflection: Γ(x)Γ(1−x) = π / sin(πx)
        return (PI / (PI * x).sin()).ln() - ln_gamma(1.0 - x);
    }

    let z = x - 1.0;
    let series = LANCZOS[1..]
        .iter()
        .enumerate()
        .fold(LANCZOS[0], |acc, (i, &c)| acc + c / (z + i as f64 + 1.0));
    let t = z + G + 0.5;
    0.5 * (2.0 * PI).ln() + (z + 0.5) * t.ln() - t + series.ln()
}

/// ln B(a, b) = ln Γ(a) + ln Γ(b) − ln Γ(a + b).
pub fn ln_beta(a: f64, b: f64) -> f64 {
    ln_gamma(a) + ln_gamma(b) - ln_gamma(a + b)
}

/// Regularized incomplete beta function I_x(a, b).
///
/// # Algorithm
/// Continued fraction evaluated with the modified Lentz method, using
/// `I_x(a,b) = 1 − I_{1−x}(b,a)` to stay on the fast-converging side.
///
/// Reference: Press et al. (2007), *Numerical Recipes*, 3rd ed., §6.4.
///
/// # Examples
/// ```
/// use u_examine::special::regularized_incomplete_beta;
/// assert_eq!(regularized_incomplete_beta(0.0, 2.0, 3.0), 0.0);
/// assert!((regularized_incomplete_beta(0.5, 1.0, 1.0) - 0.5).abs() < 1e-10);
/// ```
pub fn regularized_incomplete_beta(x: f64, a: f64, b: f64) -> f64 {
    if x.is_nan() || a.is_nan() || b.is_nan() || a <= 0.0 || b <= 0.0 {
        return f64::NAN;
    }
    if x <= 0.0 {
        return 0.0;
    }
    if x >= 1.0 {
        return 1.0;
    }
    if x > (a + 1.0) / (a + b + 2.0) {
        return 1.0 - regularized_incomplete_beta(1.0 - x, b, a);
    }
    let front = (a * x.ln() + b * (1.0 - x).ln() - ln_beta(a, b)).exp() / a;
    (front * beta_continued_fraction(x, a, b)).clamp(0.0, 1.0)
}

fn beta_continued_fraction(x: f64, a: f64, b: f64) -> f64 {
    const MAX_ITER: usize = 300;
    const EPS: f64 = 1e-14;
    const TINY: f64 = 1e-300;

    let guard = |v: f64| if v.abs() < TINY { TINY } else { v };

    let mut c = 1.0;
    let mut d = 1.0 / guard(1.0 - (a + b) * x / (a + 1.0));
    let mut h = d;

    for m in 1..=MAX_ITER {
        let m = m as f64;
        let m2 = 2.0 * m;

        let even = m * (b - m) * x / ((a + m2 - 1.0) * (a + m2));
        d = 1.0 / guard(1.0 + even * d);
        c = guard(1.0 + even / c);
        h *= d * c;

        let odd = -(a + m) * (a + b + m) * x / ((a + m2) * (a + m2 + 1.0));
        d = 1.0 / guard(1.0 + odd * d);
        c = guard(1.0 + odd / c);
        let delta = d * c;
        h *= delta;

        if (delta - 1.0).abs() < EPS {
            break;
        }
    }
    h
}

// ============================================================================
// Student's t
// ============================================================================

/// CDF of Student's t-distribution with `df` degrees of freedom.
///
/// # Returns
/// `f64::NAN` if `df ≤ 0` or an input is NaN.
pub fn t_cdf(t: f64, df: f64) -> f64 {
    if t.is_nan() || df.is_nan() || df <= 0.0 {
        return f64::NAN;
    }
    if t.is_infinite() {
        return if t > 0.0 { 1.0 } else { 0.0 };
    }
    let tail = 0.5 * regularized_incomplete_beta(df / (df + t * t), df / 2.0, 0.5);
    if t >= 0.0 {
        1.0 - tail
    } else {
        tail
    }
}

fn t_pdf(t: f64, df: f64) -> f64 {
    let half = df / 2.0;
    (ln_gamma(half + 0.5)
        - 0.5 * (df * PI).ln()
        - ln_gamma(half)
        - (half + 0.5) * (1.0 + t * t / df).ln())
    .exp()
}

/// Quantile of Student's t-distribution.
///
/// Newton–Raphson from the normal quantile, falling back to bisection
/// steps whenever Newton would leave the bracketing interval.
///
/// # Returns
/// `f64::NAN` if `p ∉ (0, 1)` or `df ≤ 0`.
///
/// # Examples
/// ```
/// use u_examine::special::t_quantile;
/// // two-sided 95% critical value with 10 df
/// assert!((t_quantile(0.975, 10.0) - 2.228139).abs() < 1e-5);
/// ```
pub fn t_quantile(p: f64, df: f64) -> f64 {
    if p.is_nan() || df.is_nan() || df <= 0.0 || p <= 0.0 || p >= 1.0 {
        return f64::NAN;
    }
    if p == 0.5 {
        return 0.0;
    }
    // Solve in the upper half and mirror.
    let (target, sign) = if p > 0.5 { (p, 1.0) } else { (1.0 - p, -1.0) };

    let mut lo = 0.0_f64;
    let mut hi = 1.0_f64;
    while t_cdf(hi, df) < target {
        hi *= 2.0;
        if hi > 1e12 {
            return sign * hi;
        }
    }

    let mut t = inverse_normal_cdf(target).clamp(lo, hi);
    for _ in 0..100 {
        let f = t_cdf(t, df) - target;
        if f < 0.0 {
            lo = t;
        } else {
            hi = t;
        }
        let pdf = t_pdf(t, df);
        let mut next = if pdf > 0.0 { t - f / pdf } else { f64::NAN };
        if !(next > lo && next < hi) {
            next = 0.5 * (lo + hi);
        }
        if (next - t).abs() <= 1e-13 * next.abs().max(1.0) {
            t = next;
            break;
        }
        t = next;
    }
    sign * t
}

// ============================================================================
// F-distribution
// ============================================================================

/// Source of F-distribution probabilities.
///
/// Levene's test asks for the F CDF through this trait, so a more exact
/// special-function library can be dropped in without changing the test.
pub trait FCdf {
    /// P(F ≤ x) for an F-distribution with (`df1`, `df2`) degrees of freedom.
    fn f_cdf(&self, x: f64, df1: f64, df2: f64) -> f64;

    /// Upper-tail probability P(F > x).
    fn f_sf(&self, x: f64, df1: f64, df2: f64) -> f64 {
        1.0 - self.f_cdf(x, df1, df2)
    }
}

/// F CDF via the regularized incomplete beta function with a Lanczos
/// ln Γ. Accurate for the moderate degrees of freedom seen in practice;
/// non-integer `df2` (Satterthwaite) is supported.
#[derive(Debug, Clone, Copy, Default)]
pub struct IncompleteBetaF;

impl FCdf for IncompleteBetaF {
    fn f_cdf(&self, x: f64, df1: f64, df2: f64) -> f64 {
        f_cdf(x, df1, df2)
    }

    fn f_sf(&self, x: f64, df1: f64, df2: f64) -> f64 {
        if x.is_nan() || df1.is_nan() || df2.is_nan() || df1 <= 0.0 || df2 <= 0.0 {
            return f64::NAN;
        }
        if x <= 0.0 {
            return 1.0;
        }
        if x.is_infinite() {
            return 0.0;
        }
        // Complement computed directly for precision in the upper tail.
        regularized_incomplete_beta(df2 / (df2 + df1 * x), df2 / 2.0, df1 / 2.0)
    }
}

/// CDF of the F-distribution: `I_y(df1/2, df2/2)` with `y = df1·x / (df1·x + df2)`.
///
/// # Examples
/// ```
/// use u_examine::special::f_cdf;
/// assert_eq!(f_cdf(0.0, 2.0, 10.0), 0.0);
/// // F(2, d2) has a closed form: 1 − (1 + 2x/d2)^(−d2/2)
/// let exact = 1.0 - (1.0_f64 + 2.0 * 3.0 / 10.0).powf(-5.0);
/// assert!((f_cdf(3.0, 2.0, 10.0) - exact).abs() < 1e-10);
/// ```
pub fn f_cdf(x: f64, df1: f64, df2: f64) -> f64 {
    if x.is_nan() || df1.is_nan() || df2.is_nan() || df1 <= 0.0 || df2 <= 0.0 {
        return f64::NAN;
    }
    if x <= 0.0 {
        return 0.0;
    }
    if x.is_infinite() {
        return 1.0;
    }
    regularized_incomplete_beta(df1 * x / (df1 * x + df2), df1 / 2.0, df2 / 2.0)
}
