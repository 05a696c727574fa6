//! # sv-core
//!
//! Core types shared by every SurvStat crate: the error type, coefficient
//! estimate records, and the [`traits::CoefficientTable`] seam that lets the
//! frequentist and Bayesian fits be reported side by side.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod error;
pub mod traits;
pub mod types;

pub use error::{Error, Result};
pub use types::{Estimate, Interval};

/// Crate version, reported by the CLI and stamped into artifacts.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
