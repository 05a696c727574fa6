//! Posterior summaries of a Gibbs run.

use serde::Serialize;
use sv_core::traits::CoefficientTable;
use sv_core::{Error, Interval, Result};
use sv_prob::math;

use crate::chain::{SIGMA2, SamplerResult};
use crate::diagnostics::{
    QualityGates, QualityStatus, QualitySummary, compute_diagnostics, quality_summary,
};

/// Fixed posterior quantiles.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Quantiles {
    /// 2.5%.
    pub q025: f64,
    /// 25%.
    pub q25: f64,
    /// Median.
    pub q50: f64,
    /// 75%.
    pub q75: f64,
    /// 97.5%.
    pub q975: f64,
}

/// Marginal summary of one sampled parameter.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ParameterSummary {
    /// Parameter name.
    pub name: String,
    /// Posterior mean.
    pub mean: f64,
    /// Posterior standard deviation.
    pub sd: f64,
    /// `sd / sqrt(total draws)`, ignoring autocorrelation.
    pub naive_se: f64,
    /// `sd / sqrt(ESS)`.
    pub time_series_se: f64,
    /// Posterior quantiles.
    pub quantiles: Quantiles,
    /// Equal-tailed credible interval.
    pub interval: Interval,
    /// Bulk effective sample size.
    pub ess: f64,
    /// Split R-hat (multi-chain runs only).
    pub r_hat: Option<f64>,
}

impl ParameterSummary {
    fn from_draws(
        name: &str,
        draws: &[f64],
        level: f64,
        ess: f64,
        r_hat: Option<f64>,
    ) -> Result<Self> {
        if draws.is_empty() {
            return Err(Error::Validation(format!("no draws for parameter '{}'", name)));
        }
        let sorted = math::sorted(draws);
        let q = |p: f64| math::quantile_sorted(&sorted, p);
        let sd = math::std_dev(draws);
        let tail = (1.0 - level) / 2.0;
        Ok(Self {
            name: name.to_string(),
            mean: math::mean(draws),
            sd,
            naive_se: sd / (draws.len() as f64).sqrt(),
            time_series_se: if ess > 0.0 { sd / ess.sqrt() } else { f64::NAN },
            quantiles: Quantiles {
                q025: q(0.025),
                q25: q(0.25),
                q50: q(0.5),
                q75: q(0.75),
                q975: q(0.975),
            },
            interval: Interval::new(q(tail), q(1.0 - tail), level),
            ess,
            r_hat,
        })
    }

    /// Whether the credible interval excludes zero.
    pub fn credible(&self) -> bool {
        self.interval.excludes_zero()
    }
}

/// Posterior summary for every coefficient and σ².
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PosteriorSummary {
    /// Formula the posterior was sampled for.
    pub formula: String,
    /// Regression coefficients in design order.
    pub coefficients: Vec<ParameterSummary>,
    /// Residual variance.
    pub sigma2: ParameterSummary,
    /// Number of chains.
    pub n_chains: usize,
    /// Kept draws per chain.
    pub n_samples: usize,
    /// Credible-interval level.
    pub credible_level: f64,
    /// Sampling quality gates.
    pub quality: QualitySummary,
}

impl PosteriorSummary {
    /// Summarize `result` at credible level `level`.
    pub fn from_result(result: &SamplerResult, formula: &str, level: f64) -> Result<Self> {
        let sigma_idx = result.param_index(SIGMA2).ok_or_else(|| {
            Error::Validation(format!("sampler output has no '{}' parameter", SIGMA2))
        })?;

        let diag = compute_diagnostics(result);
        let quality =
            quality_summary(&diag, result.chains.len(), result.n_samples, &QualityGates::default());
        if quality.status != QualityStatus::Ok {
            log::warn!(
                "{}: sampling quality {} (warnings: {:?}, failures: {:?})",
                formula,
                quality.status,
                quality.warnings,
                quality.failures
            );
        }

        let summarize = |k: usize| {
            let r_hat = diag.r_hat.as_ref().map(|r| r[k]);
            ParameterSummary::from_draws(
                &result.param_names[k],
                &result.pooled_draws(k),
                level,
                diag.ess_bulk[k],
                r_hat,
            )
        };

        let coefficients = (0..sigma_idx).map(&summarize).collect::<Result<Vec<_>>>()?;
        let sigma2 = summarize(sigma_idx)?;

        Ok(Self {
            formula: formula.to_string(),
            coefficients,
            sigma2,
            n_chains: result.chains.len(),
            n_samples: result.n_samples,
            credible_level: level,
            quality,
        })
    }

    /// Summary of one coefficient by design label.
    pub fn coefficient(&self, name: &str) -> Option<&ParameterSummary> {
        self.coefficients.iter().find(|c| c.name == name)
    }

    /// Labels of coefficients whose credible interval excludes zero.
    pub fn credible_terms(&self) -> Vec<String> {
        self.coefficients.iter().filter(|c| c.credible()).map(|c| c.name.clone()).collect()
    }
}

impl CoefficientTable for PosteriorSummary {
    fn coefficient_names(&self) -> Vec<String> {
        self.coefficients.iter().map(|c| c.name.clone()).collect()
    }

    fn point_estimates(&self) -> Vec<f64> {
        self.coefficients.iter().map(|c| c.mean).collect()
    }

    fn spreads(&self) -> Vec<f64> {
        self.coefficients.iter().map(|c| c.sd).collect()
    }

    fn intervals(&self) -> Vec<Interval> {
        self.coefficients.iter().map(|c| c.interval).collect()
    }
}
