//! # sv-inference
//!
//! Model fitting for SurvStat.
//!
//! This crate provides:
//! - Design-matrix construction with dummy and interaction expansion
//! - Ordinary least squares with the usual inferential summaries
//! - Residual diagnostics (leverage, Cook's distance, QQ pairs, VIF)
//! - Nested-model comparison (R², adjusted R², ANOVA F-test, selection)
//! - Gibbs-sampled Bayesian linear regression with MCMC diagnostics

#![warn(missing_docs)]
#![warn(clippy::all)]

/// Bayesian regression entry point and OLS cross-check.
pub mod bayes;
/// Chain storage and multi-chain parallel runner.
pub mod chain;
/// Model comparison: R², adjusted R², nested F-test, selection policy.
pub mod compare;
/// Model formulas and design-matrix builder.
pub mod design;
/// MCMC diagnostics: split R-hat, bulk ESS, quality gates.
pub mod diagnostics;
/// Conjugate Gibbs sampler for the normal linear model.
pub mod gibbs;
/// Residual diagnostics and variance inflation factors.
pub mod influence;
/// Ordinary least squares via Householder QR.
pub mod ols;
/// Posterior summaries built from sampler output.
pub mod posterior;

pub use bayes::{BayesFit, OlsBayesRow, compare_with_ols, fit_bayes};
pub use chain::{Chain, SamplerResult, sample_gibbs_multichain};
pub use compare::{
    AnovaResult, Choice, FitSummary, ModelComparison, Selection, SelectionReason, anova,
    anova_sequence, compare, is_nested, select,
};
pub use design::{DesignMatrix, ModelSpec, Term};
pub use diagnostics::{DiagnosticsResult, QualityGates, QualityStatus, QualitySummary};
pub use gibbs::{GibbsConfig, RegressionPrior};
pub use influence::{Influence, QqPoint, influence, vif};
pub use ols::{OlsFit, fit_ols};
pub use posterior::{ParameterSummary, PosteriorSummary};
