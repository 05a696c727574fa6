//! Fisher–Snedecor F distribution for overall-model and nested-model tests.

use statrs::distribution::{ContinuousCDF, FisherSnedecor};
use sv_core::{Error, Result};

/// Upper-tail probability `P(F >= f)` for `F ~ F(d1, d2)`.
pub fn sf(f: f64, d1: f64, d2: f64) -> Result<f64> {
    if !(d1.is_finite() && d1 > 0.0 && d2.is_finite() && d2 > 0.0) {
        return Err(Error::Validation(format!(
            "F degrees of freedom must be finite and > 0, got ({}, {})",
            d1, d2
        )));
    }
    if f.is_nan() {
        return Ok(f64::NAN);
    }
    if f <= 0.0 {
        return Ok(1.0);
    }
    let dist = FisherSnedecor::new(d1, d2).map_err(|e| Error::Computation(format!("F distribution: {}", e)))?;
    Ok(dist.sf(f))
}
