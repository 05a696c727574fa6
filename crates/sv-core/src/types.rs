//! Common data types for SurvStat

use serde::{Deserialize, Serialize};

/// Two-sided interval with its nominal coverage level.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Interval {
    /// Lower bound.
    pub lower: f64,
    /// Upper bound.
    pub upper: f64,
    /// Nominal coverage, e.g. `0.95`.
    pub level: f64,
}

impl Interval {
    /// Create a new interval. Bounds are stored as given.
    pub fn new(lower: f64, upper: f64, level: f64) -> Self {
        Self { lower, upper, level }
    }

    /// Whether `x` lies in `[lower, upper]`.
    pub fn contains(&self, x: f64) -> bool {
        x >= self.lower && x <= self.upper
    }

    /// Whether the interval excludes zero (both bounds on the same side).
    pub fn excludes_zero(&self) -> bool {
        self.lower > 0.0 || self.upper < 0.0
    }

    /// Interval width.
    pub fn width(&self) -> f64 {
        self.upper - self.lower
    }
}

/// One row of a coefficient table: point estimate, spread and interval.
///
/// `spread` is the standard error for least-squares fits and the posterior
/// standard deviation for sampled fits.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Estimate {
    /// Design-column label, e.g. `"clean"` or `"promo[yes]"`.
    pub name: String,
    /// Point estimate.
    pub estimate: f64,
    /// Standard error or posterior standard deviation.
    pub spread: f64,
    /// Confidence or credible interval.
    pub interval: Interval,
}

impl Estimate {
    /// Create a new estimate row.
    pub fn new(name: impl Into<String>, estimate: f64, spread: f64, interval: Interval) -> Self {
        Self { name: name.into(), estimate, spread, interval }
    }
}
