//! # sv-viz
//!
//! Visualization data artifacts for SurvStat.
//!
//! This crate does not render anything. It emits plot-friendly JSON
//! structures (arrays instead of nested objects) that any plotting front-end
//! can consume.

#![warn(missing_docs)]
#![warn(clippy::all)]

/// Correlation-matrix heatmap artifact.
pub mod corr;
/// Histogram artifact for one column.
pub mod histogram;
/// Shared artifact metadata.
pub mod meta;
/// Residual diagnostics artifacts (residuals vs fitted, QQ, leverage).
pub mod residuals;

pub use corr::{CorrArtifact, corr_artifact};
pub use histogram::{HistogramArtifact, histogram_artifact};
pub use meta::ArtifactMeta;
pub use residuals::{
    LeverageArtifact, QqArtifact, ResidualsArtifact, leverage_artifact, qq_artifact,
    residuals_vs_fitted_artifact,
};
