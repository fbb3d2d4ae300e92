//! Descriptive statistics and the two hypothesis tests the engine needs:
//! the slope of an ordinary least-squares fit and Pearson correlation.
//!
//! Both p-values come from the Student t distribution, evaluated through
//! the regularized incomplete beta function.

/// Arithmetic mean. `None` for an empty slice.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}

/// Sample standard deviation (n − 1 denominator). `None` below two values.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn sample_std_dev(values: &[f64]) -> Option<f64> {
    if values.len() < 2 {
        return None;
    }
    let m = mean(values)?;
    let ss: f64 = values.iter().map(|v| (v - m).powi(2)).sum();
    Some((ss / (values.len() - 1) as f64).sqrt())
}

/// Rounds to `decimals` places, half away from zero.
#[must_use]
pub fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10_f64.powi(decimals);
    (value * factor).round() / factor
}

/// Result of a simple linear regression.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LinearFit {
    pub slope: f64,
    pub intercept: f64,
    /// Two-sided p-value for the null hypothesis `slope == 0`.
    pub p_value: f64,
}

/// Ordinary least-squares fit of `y` on `x`.
///
/// A series with no variance in `y` has slope 0 and p-value 1; a perfect
/// non-flat fit has p-value 0. Returns `None` with fewer than three points,
/// mismatched lengths, or no variance in `x`.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn linear_regression(x: &[f64], y: &[f64]) -> Option<LinearFit> {
    let n = x.len();
    if n < 3 || n != y.len() {
        return None;
    }

    let mx = mean(x)?;
    let my = mean(y)?;
    let sxx: f64 = x.iter().map(|v| (v - mx).powi(2)).sum();
    let syy: f64 = y.iter().map(|v| (v - my).powi(2)).sum();
    let sxy: f64 = x.iter().zip(y).map(|(a, b)| (a - mx) * (b - my)).sum();

    if !varies(x) {
        return None;
    }

    let slope = sxy / sxx;
    let intercept = my - slope * mx;

    if !varies(y) {
        return Some(LinearFit {
            slope: 0.0,
            intercept,
            p_value: 1.0,
        });
    }

    let df = (n - 2) as f64;
    let sse = (syy - slope * sxy).max(0.0);
    let p_value = if sse <= f64::EPSILON * syy {
        0.0
    } else {
        let se = (sse / df / sxx).sqrt();
        two_sided_t_p_value(slope / se, df)
    };

    Some(LinearFit {
        slope,
        intercept,
        p_value,
    })
}

/// Pearson correlation and its two-sided p-value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Correlation {
    pub r: f64,
    pub p_value: f64,
}

/// Pearson correlation between `x` and `y`.
///
/// Returns `None` with fewer than three points, mismatched lengths, or
/// when either side has no variance.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn pearson(x: &[f64], y: &[f64]) -> Option<Correlation> {
    let n = x.len();
    if n < 3 || n != y.len() {
        return None;
    }

    let mx = mean(x)?;
    let my = mean(y)?;
    let sxx: f64 = x.iter().map(|v| (v - mx).powi(2)).sum();
    let syy: f64 = y.iter().map(|v| (v - my).powi(2)).sum();
    if !varies(x) || !varies(y) {
        return None;
    }

    let sxy: f64 = x.iter().zip(y).map(|(a, b)| (a - mx) * (b - my)).sum();
    let r = (sxy / (sxx * syy).sqrt()).clamp(-1.0, 1.0);

    let df = (n - 2) as f64;
    let one_minus_r2 = r.mul_add(-r, 1.0);
    let p_value = if one_minus_r2 <= 0.0 {
        0.0
    } else {
        regularized_incomplete_beta(df / 2.0, 0.5, one_minus_r2)
    };

    Some(Correlation { r, p_value })
}

/// Returns `true` if not every value is identical.
fn varies(values: &[f64]) -> bool {
    values.first().is_some_and(|first| values.iter().any(|v| (v - first).abs() > 0.0))
}

/// Two-sided tail probability `P(|T| >= |t|)` for Student's t with `df`
/// degrees of freedom.
#[must_use]
pub fn two_sided_t_p_value(t: f64, df: f64) -> f64 {
    if !t.is_finite() {
        return 0.0;
    }
    let x = df / t.mul_add(t, df);
    regularized_incomplete_beta(df / 2.0, 0.5, x).clamp(0.0, 1.0)
}

/// Cumulative distribution function of Student's t.
#[must_use]
pub fn student_t_cdf(t: f64, df: f64) -> f64 {
    let tail = two_sided_t_p_value(t, df) / 2.0;
    if t >= 0.0 { 1.0 - tail } else { tail }
}

/// Regularized incomplete beta function `I_x(a, b)`.
#[must_use]
pub fn regularized_incomplete_beta(a: f64, b: f64, x: f64) -> f64 {
    if x <= 0.0 {
        return 0.0;
    }
    if x >= 1.0 {
        return 1.0;
    }

    let ln_front = ln_gamma(a + b) - ln_gamma(a) - ln_gamma(b)
        + a.mul_add(x.ln(), b * (1.0 - x).ln());
    let front = ln_front.exp();

    if x < (a + 1.0) / (a + b + 2.0) {
        front * beta_continued_fraction(a, b, x) / a
    } else {
        1.0 - front * beta_continued_fraction(b, a, 1.0 - x) / b
    }
}

/// Lentz evaluation of the continued fraction for the incomplete beta.
fn beta_continued_fraction(a: f64, b: f64, x: f64) -> f64 {
    const MAX_ITERATIONS: u32 = 300;
    const EPSILON: f64 = 3e-14;
    const TINY: f64 = 1e-300;

    let guard = |v: f64| if v.abs() < TINY { TINY } else { v };

    let qab = a + b;
    let qap = a + 1.0;
    let qam = a - 1.0;

    let mut c = 1.0;
    let mut d = 1.0 / guard(1.0 - qab * x / qap);
    let mut h = d;

    for m in 1..=MAX_ITERATIONS {
        let m = f64::from(m);
        let m2 = 2.0 * m;

        let aa = m * (b - m) * x / ((qam + m2) * (a + m2));
        d = 1.0 / guard(aa.mul_add(d, 1.0));
        c = guard(1.0 + aa / c);
        h *= d * c;

        let aa = -(a + m) * (qab + m) * x / ((a + m2) * (qap + m2));
        d = 1.0 / guard(aa.mul_add(d, 1.0));
        c = guard(1.0 + aa / c);
        let delta = d * c;
        h *= delta;

        if (delta - 1.0).abs() < EPSILON {
            break;
        }
    }

    h
}

/// Natural log of the gamma function (Lanczos, g = 7).
fn ln_gamma(x: f64) -> f64 {
    const COEFFICIENTS: [f64; 9] = [
        0.999_999_999_999_809_9,
        676.520_368_121_885_1,
        -1_259.139_216_722_402_8,
        771.323_428_777_653_1,
        -176.615_029_162_140_6,
        12.507_343_278_686_905,
        -0.138_571_095_265_720_12,
        9.984_369_578_019_572e-6,
        1.505_632_735_149_311_6e-7,
    ];

    if x < 0.5 {
        let pi = std::f64::consts::PI;
        return (pi / (pi * x).sin()).ln() - ln_gamma(1.0 - x);
    }

    let x = x - 1.0;
    let mut sum = COEFFICIENTS[0];
    let mut k = 1.0;
    for c in &COEFFICIENTS[1..] {
        sum += c / (x + k);
        k += 1.0;
    }
    let t = x + 7.5;

    0.5f64.mul_add(
        (2.0 * std::f64::consts::PI).ln(),
        (x + 0.5).mul_add(t.ln(), -t),
    ) + sum.ln()
}
