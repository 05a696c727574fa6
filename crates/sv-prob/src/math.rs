//! Small descriptive-statistics helpers used across the workspace.
//!
//! Everything here works on plain slices. Callers validate emptiness where it
//! matters; functions return `NaN` for undefined moments rather than erroring.

/// Arithmetic mean. `NaN` for an empty slice.
#[inline]
pub fn mean(xs: &[f64]) -> f64 {
    if xs.is_empty() {
        return f64::NAN;
    }
    xs.iter().sum::<f64>() / xs.len() as f64
}

/// Sample variance with `n - 1` denominator. `NaN` when `n < 2`.
pub fn variance(xs: &[f64]) -> f64 {
    let n = xs.len();
    if n < 2 {
        return f64::NAN;
    }
    let m = mean(xs);
    xs.iter().map(|&x| (x - m) * (x - m)).sum::<f64>() / (n - 1) as f64
}

/// Sample standard deviation (`n - 1` denominator).
#[inline]
pub fn std_dev(xs: &[f64]) -> f64 {
    variance(xs).sqrt()
}

/// Sample skewness `g1 = m3 / m2^1.5` (moment estimator, no bias correction).
///
/// `NaN` for fewer than 3 values or zero spread.
pub fn skewness(xs: &[f64]) -> f64 {
    let n = xs.len();
    if n < 3 {
        return f64::NAN;
    }
    let m = mean(xs);
    let nf = n as f64;
    let (m2, m3) = xs.iter().fold((0.0, 0.0), |(a2, a3), &x| {
        let d = x - m;
        (a2 + d * d, a3 + d * d * d)
    });
    let m2 = m2 / nf;
    let m3 = m3 / nf;
    if m2 <= 0.0 {
        return f64::NAN;
    }
    m3 / m2.powf(1.5)
}

/// Quantile of already-sorted data by linear interpolation between order
/// statistics (Hyndman–Fan type 7).
pub fn quantile_sorted(sorted: &[f64], p: f64) -> f64 {
    let n = sorted.len();
    if n == 0 || !p.is_finite() {
        return f64::NAN;
    }
    if n == 1 {
        return sorted[0];
    }
    let p = p.clamp(0.0, 1.0);
    let h = (n - 1) as f64 * p;
    let lo = h.floor() as usize;
    let hi = h.ceil() as usize;
    sorted[lo] + (h - lo as f64) * (sorted[hi] - sorted[lo])
}

/// Sorted copy of `xs` (total order on `f64`).
pub fn sorted(xs: &[f64]) -> Vec<f64> {
    let mut v = xs.to_vec();
    v.sort_by(f64::total_cmp);
    v
}

/// Quantile of unsorted data (sorts a copy).
pub fn quantile(xs: &[f64], p: f64) -> f64 {
    quantile_sorted(&sorted(xs), p)
}

/// Pearson correlation. `NaN` if either series has zero variance or the
/// lengths differ.
pub fn pearson(xs: &[f64], ys: &[f64]) -> f64 {
    if xs.len() != ys.len() || xs.len() < 2 {
        return f64::NAN;
    }
    let mx = mean(xs);
    let my = mean(ys);
    let mut sxy = 0.0;
    let mut sxx = 0.0;
    let mut syy = 0.0;
    for (&x, &y) in xs.iter().zip(ys) {
        let dx = x - mx;
        let dy = y - my;
        sxy += dx * dy;
        sxx += dx * dx;
        syy += dy * dy;
    }
    if sxx <= 0.0 || syy <= 0.0 {
        return f64::NAN;
    }
    sxy / (sxx * syy).sqrt()
}

/// Centered sum of squares `sum (x - mean)^2`.
pub fn centered_ss(xs: &[f64]) -> f64 {
    let m = mean(xs);
    xs.iter().map(|&x| (x - m) * (x - m)).sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_mean_variance() {
        let xs = [2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0];
        assert_relative_eq!(mean(&xs), 5.0);
        assert_relative_eq!(variance(&xs), 32.0 / 7.0, epsilon = 1e-12);
        assert!(variance(&[1.0]).is_nan());
        assert!(mean(&[]).is_nan());
    }

    #[test]
    fn test_quantile_type7() {
        let xs = [1.0, 2.0, 3.0, 4.0];
        assert_relative_eq!(quantile(&xs, 0.0), 1.0);
        assert_relative_eq!(quantile(&xs, 0.25), 1.75);
        assert_relative_eq!(quantile(&xs, 0.5), 2.5);
        assert_relative_eq!(quantile(&xs, 1.0), 4.0);
        assert_relative_eq!(quantile(&[3.0], 0.9), 3.0);
    }

    #[test]
    fn test_skewness_sign() {
        let right = [1.0, 1.0, 1.0, 2.0, 2.0, 3.0, 10.0];
        assert!(skewness(&right) > 1.0);
        let sym = [1.0, 2.0, 3.0, 4.0, 5.0];
        assert_relative_eq!(skewness(&sym), 0.0, epsilon = 1e-12);
        assert!(skewness(&[1.0, 1.0, 1.0]).is_nan());
    }

    #[test]
    fn test_pearson() {
        let x = [1.0, 2.0, 3.0, 4.0];
        let y = [2.0, 4.0, 6.0, 8.0];
        assert_relative_eq!(pearson(&x, &y), 1.0, epsilon = 1e-12);
        let z = [8.0, 6.0, 4.0, 2.0];
        assert_relative_eq!(pearson(&x, &z), -1.0, epsilon = 1e-12);
        assert!(pearson(&x, &[1.0, 1.0, 1.0, 1.0]).is_nan());
    }
}
