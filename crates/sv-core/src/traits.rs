//! Core traits for SurvStat
//!
//! Least-squares and posterior-sampled fits both expose their coefficients
//! through [`CoefficientTable`], so comparison and reporting code does not
//! depend on how the estimates were produced.

use crate::types::{Estimate, Interval};

/// A fitted linear model viewed as a table of named coefficients.
pub trait CoefficientTable {
    /// Design-column labels, in coefficient order.
    fn coefficient_names(&self) -> Vec<String>;

    /// Point estimates (OLS estimate or posterior mean).
    fn point_estimates(&self) -> Vec<f64>;

    /// Standard errors or posterior standard deviations.
    fn spreads(&self) -> Vec<f64>;

    /// Confidence or credible intervals at the model's default level.
    fn intervals(&self) -> Vec<Interval>;

    /// Number of coefficients.
    fn n_coefficients(&self) -> usize {
        self.coefficient_names().len()
    }

    /// Index of a coefficient by label.
    fn coefficient_index(&self, name: &str) -> Option<usize> {
        self.coefficient_names().iter().position(|n| n == name)
    }

    /// Zip everything into [`Estimate`] rows.
    fn estimates(&self) -> Vec<Estimate> {
        self.coefficient_names()
            .into_iter()
            .zip(self.point_estimates())
            .zip(self.spreads())
            .zip(self.intervals())
            .map(|(((name, est), spread), interval)| Estimate::new(name, est, spread, interval))
            .collect()
    }
}
