//! Student-t reference distribution for coefficient tests and intervals.

use statrs::distribution::{ContinuousCDF, StudentsT};
use sv_core::{Error, Result};

fn t_dist(df: f64) -> Result<StudentsT> {
    if !df.is_finite() || df <= 0.0 {
        return Err(Error::Validation(format!("degrees of freedom must be finite and > 0, got {}", df)));
    }
    StudentsT::new(0.0, 1.0, df).map_err(|e| Error::Computation(format!("t distribution: {}", e)))
}

/// Two-sided p-value `P(|T| >= |t|)` for `T ~ t(df)`.
pub fn two_sided_p(t: f64, df: f64) -> Result<f64> {
    let dist = t_dist(df)?;
    if t.is_nan() {
        return Ok(f64::NAN);
    }
    Ok((2.0 * dist.sf(t.abs())).min(1.0))
}

/// Critical value `t*` such that `P(|T| <= t*) = level`.
pub fn critical_value(level: f64, df: f64) -> Result<f64> {
    if !(level > 0.0 && level < 1.0) {
        return Err(Error::Validation(format!("confidence level must be in (0, 1), got {}", level)));
    }
    let dist = t_dist(df)?;
    Ok(dist.inverse_cdf(0.5 + 0.5 * level))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_critical_value_large_df_approaches_normal() {
        let t = critical_value(0.95, 1e6).unwrap();
        assert_relative_eq!(t, 1.959_964, epsilon = 1e-3);
    }

    #[test]
    fn test_critical_value_small_df() {
        // qt(0.975, 10) = 2.228139
        let t = critical_value(0.95, 10.0).unwrap();
        assert_relative_eq!(t, 2.228_139, epsilon = 1e-4);
    }

    #[test]
    fn test_two_sided_p() {
        assert_relative_eq!(two_sided_p(0.0, 5.0).unwrap(), 1.0, epsilon = 1e-12);
        // 2 * pt(-2.228139, 10) = 0.05
        assert_relative_eq!(two_sided_p(2.228_139, 10.0).unwrap(), 0.05, epsilon = 1e-4);
        assert_relative_eq!(
            two_sided_p(-1.5, 20.0).unwrap(),
            two_sided_p(1.5, 20.0).unwrap(),
            epsilon = 1e-12
        );
    }

    #[test]
    fn test_invalid_params() {
        assert!(two_sided_p(1.0, 0.0).is_err());
        assert!(critical_value(1.5, 10.0).is_err());
    }
}
