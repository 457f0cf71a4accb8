//! Exact small-sample tests used by the change estimator.
//!
//! Everything here works in log space through [`ln_gamma`], which is accurate to roughly
//! 1e-15 relative error.  That is far below the `1 + 1e-7` relative tolerance the exact
//! tests use to decide which outcomes count as "at least as extreme".

use std::f64::consts::PI;

/// Relative tolerance when comparing outcome probabilities against the observed one.
///
/// Outcomes whose probability ties the observed probability up to rounding error are
/// counted as "at least as extreme".
const EXTREME_RTOL: f64 = 1.0 + 1e-7;

/// Natural log of the gamma function (Lanczos, g = 7, n = 9).
pub fn ln_gamma(x: f64) -> f64 {
    if x <= 0.0 {
        return 0.0;
    }
    #[allow(clippy::excessive_precision)]
    const COEFFS: [f64; 9] = [
        0.999_999_999_999_809_93,
        676.520_368_121_885_1,
        -1_259.139_216_722_402_9,
        771.323_428_777_653_1,
        -176.615_029_162_140_6,
        12.507_343_278_686_905,
        -0.138_571_095_265_720_12,
        9.984_369_578_019_571_6e-6,
        1.505_632_735_149_311_6e-7,
    ];
    if x < 0.5 {
        // Reflection.
        return PI.ln() - (PI * x).sin().ln() - ln_gamma(1.0 - x);
    }
    let x = x - 1.0;
    let mut base = COEFFS[0];
    for (i, &c) in COEFFS.iter().enumerate().skip(1) {
        base += c / (x + i as f64);
    }
    let t = x + 7.5;
    0.5 * (2.0 * PI).ln() + (x + 0.5) * t.ln() - t + base.ln()
}

/// `ln(n choose k)`; `-inf` when `k > n`.
pub fn ln_choose(n: u64, k: u64) -> f64 {
    if k > n {
        return f64::NEG_INFINITY;
    }
    if k == 0 || k == n {
        return 0.0;
    }
    ln_gamma(n as f64 + 1.0) - ln_gamma(k as f64 + 1.0) - ln_gamma((n - k) as f64 + 1.0)
}

/// `P(X = k)` for `X ~ Binomial(n, p)`.
pub fn binomial_pmf(k: u64, n: u64, p: f64) -> f64 {
    if k > n {
        return 0.0;
    }
    if p <= 0.0 {
        return if k == 0 { 1.0 } else { 0.0 };
    }
    if p >= 1.0 {
        return if k == n { 1.0 } else { 0.0 };
    }
    let ln_p = ln_choose(n, k) + k as f64 * p.ln() + (n - k) as f64 * (-p).ln_1p();
    ln_p.exp()
}

/// Two-sided exact binomial test of `k` successes in `n` trials against rate `p`.
///
/// The p-value is the total probability of every outcome no more likely than the observed
/// one.  Returns 1 when `n == 0`, when `k` equals the expectation `n * p` exactly, or when
/// no outcome is strictly more likely than `k`.
pub fn binomial_test_two_sided(k: u64, n: u64, p: f64) -> f64 {
    if n == 0 || k as f64 == n as f64 * p {
        return 1.0;
    }
    let threshold = binomial_pmf(k, n, p) * EXTREME_RTOL;
    extreme_tail((0..=n).map(|i| binomial_pmf(i, n, p)), threshold)
}

/// Sum of the probabilities at or below `threshold`; exactly 1 when none exceed it.
fn extreme_tail(probs: impl Iterator<Item = f64>, threshold: f64) -> f64 {
    let mut tail = 0.0;
    let mut more_likely = false;
    for q in probs {
        if q <= threshold {
            tail += q;
        } else {
            more_likely = true;
        }
    }
    if more_likely {
        tail.min(1.0)
    } else {
        1.0
    }
}

/// Fisher's method for two p-values.
///
/// `-2 (ln a + ln b)` is chi-squared with 4 degrees of freedom under the null; its survival
/// function has the closed form `x (1 - ln x)` with `x = a * b`.
///
/// The inputs are assumed independent.  The change estimator feeds it two tests that share
/// an estimated rate, so the result there is a ranking score, not a calibrated p-value.
pub fn fisher_combine(a: f64, b: f64) -> f64 {
    let x = a * b;
    if x <= 0.0 {
        return 0.0;
    }
    (x * (1.0 - x.ln())).clamp(0.0, 1.0)
}

/// Two-sided Fisher exact test on the 2x2 table `[[a, b], [c, d]]`.
///
/// Returns 1 when any margin is empty (the table carries no evidence).
pub fn fisher_exact_two_sided(a: u64, b: u64, c: u64, d: u64) -> f64 {
    let row1 = a + b;
    let row2 = c + d;
    let col1 = a + c;
    let n = row1 + row2;
    if row1 == 0 || row2 == 0 || col1 == 0 || col1 == n {
        return 1.0;
    }
    let ln_denom = ln_choose(n, col1);
    let pmf = |x: u64| (ln_choose(row1, x) + ln_choose(row2, col1 - x) - ln_denom).exp();

    let lo = col1.saturating_sub(row2);
    let hi = row1.min(col1);
    let threshold = pmf(a) * EXTREME_RTOL;
    extreme_tail((lo..=hi).map(pmf), threshold)
}
