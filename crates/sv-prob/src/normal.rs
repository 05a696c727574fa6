//! Standard normal quantiles for QQ plots.

use statrs::distribution::{ContinuousCDF, Normal};
use sv_core::{Error, Result};

/// Standard normal quantile `Φ⁻¹(p)` for `p ∈ (0, 1)`.
pub fn std_quantile(p: f64) -> Result<f64> {
    if !(p > 0.0 && p < 1.0) {
        return Err(Error::Validation(format!("probability must be in (0, 1), got {}", p)));
    }
    let n = Normal::new(0.0, 1.0).map_err(|e| Error::Computation(e.to_string()))?;
    Ok(n.inverse_cdf(p))
}

/// Blom plotting positions `(i - 3/8) / (n + 1/4)` mapped through `Φ⁻¹`,
/// for `i = 1..=n`. These are the theoretical quantiles of a normal QQ plot.
pub fn blom_scores(n: usize) -> Result<Vec<f64>> {
    let nf = n as f64;
    (1..=n).map(|i| std_quantile((i as f64 - 0.375) / (nf + 0.25))).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_quantile_known_values() {
        assert_relative_eq!(std_quantile(0.5).unwrap(), 0.0, epsilon = 1e-9);
        assert_relative_eq!(std_quantile(0.975).unwrap(), 1.959_963_984_540_054, epsilon = 1e-6);
        assert!(std_quantile(0.0).is_err());
        assert!(std_quantile(1.0).is_err());
    }

    #[test]
    fn test_blom_scores_symmetric() {
        let s = blom_scores(5).unwrap();
        assert_eq!(s.len(), 5);
        assert_relative_eq!(s[2], 0.0, epsilon = 1e-9);
        assert_relative_eq!(s[0], -s[4], epsilon = 1e-9);
        assert!(s.windows(2).all(|w| w[0] < w[1]));
    }
}
