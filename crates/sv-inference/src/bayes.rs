//! Bayesian linear regression: sample, summarize, cross-check against OLS.

use serde::Serialize;
use sv_core::{Error, Interval, Result};
use sv_data::DataFrame;

use crate::chain::{SamplerResult, sample_gibbs_multichain};
use crate::design::{DesignMatrix, ModelSpec};
use crate::gibbs::GibbsConfig;
use crate::ols::OlsFit;
use crate::posterior::PosteriorSummary;

/// Output of [`fit_bayes`].
#[derive(Debug, Clone, Serialize)]
pub struct BayesFit {
    /// Marginal summaries and quality gates.
    pub posterior: PosteriorSummary,
    /// Least-squares fit the chains started from.
    pub ols: OlsFit,
    /// Raw chains.
    #[serde(skip)]
    pub samples: SamplerResult,
}

/// Sample the posterior of `spec` on `frame`.
///
/// The least-squares fit of the same design provides the starting point of
/// every chain and is returned alongside the posterior.
pub fn fit_bayes(frame: &DataFrame, spec: &ModelSpec, config: &GibbsConfig) -> Result<BayesFit> {
    let design = DesignMatrix::build(frame, spec)?;
    let ols = OlsFit::from_design(&design)?;
    log::debug!(
        "gibbs: {} chains x ({} burn-in + {} x {} thin) for '{}'",
        config.n_chains,
        config.burn_in,
        config.n_samples,
        config.thin,
        ols.formula
    );
    let samples = sample_gibbs_multichain(&design, &ols, config)?;
    let posterior = PosteriorSummary::from_result(&samples, &ols.formula, config.credible_level)?;
    Ok(BayesFit { posterior, ols, samples })
}

/// One coefficient seen by both estimators.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OlsBayesRow {
    /// Design label.
    pub name: String,
    /// Least-squares estimate.
    pub ols_estimate: f64,
    /// Least-squares confidence interval.
    pub ols_interval: Interval,
    /// Posterior mean.
    pub posterior_mean: f64,
    /// Posterior credible interval.
    pub credible_interval: Interval,
    /// Whether the posterior mean falls inside the OLS interval.
    pub within_ols_interval: bool,
}

/// Pair OLS and posterior estimates by design label.
pub fn compare_with_ols(posterior: &PosteriorSummary, ols: &OlsFit) -> Result<Vec<OlsBayesRow>> {
    posterior
        .coefficients
        .iter()
        .map(|c| {
            let j = ols.labels.iter().position(|l| *l == c.name).ok_or_else(|| {
                Error::Validation(format!("'{}' is not a coefficient of '{}'", c.name, ols.formula))
            })?;
            let ols_interval = ols.conf_intervals[j];
            Ok(OlsBayesRow {
                name: c.name.clone(),
                ols_estimate: ols.coefficients[j],
                ols_interval,
                posterior_mean: c.mean,
                credible_interval: c.interval,
                within_ols_interval: ols_interval.contains(c.mean),
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use sv_data::Column;

    fn frame() -> DataFrame {
        let x: Vec<f64> = (0..60).map(|i| i as f64 / 10.0).collect();
        let y: Vec<f64> =
            x.iter().enumerate().map(|(i, v)| 2.0 + 0.8 * v + ((i * 7) % 5) as f64 * 0.3).collect();
        DataFrame::new()
            .with_column("y", Column::numeric(y))
            .unwrap()
            .with_column("x", Column::numeric(x))
            .unwrap()
    }

    #[test]
    fn test_flat_prior_posterior_agrees_with_ols() {
        let cfg = GibbsConfig { burn_in: 200, n_samples: 2000, n_chains: 2, ..GibbsConfig::default() };
        let fit = fit_bayes(&frame(), &"y ~ x".parse().unwrap(), &cfg).unwrap();
        assert_eq!(fit.samples.total_draws(), 4000);
        let rows = compare_with_ols(&fit.posterior, &fit.ols).unwrap();
        assert_eq!(rows.len(), 2);
        for row in &rows {
            assert!(row.within_ols_interval, "{:?}", row);
            assert!((row.posterior_mean - row.ols_estimate).abs() < 0.05, "{:?}", row);
        }
        assert!(fit.posterior.coefficient("x").unwrap().credible());
        assert!(fit.posterior.sigma2.mean > 0.0);
    }

    #[test]
    fn test_same_seed_same_posterior() {
        let cfg = GibbsConfig { burn_in: 50, n_samples: 200, ..GibbsConfig::default() };
        let spec: ModelSpec = "y ~ x".parse().unwrap();
        let a = fit_bayes(&frame(), &spec, &cfg).unwrap();
        let b = fit_bayes(&frame(), &spec, &cfg).unwrap();
        assert_eq!(a.posterior, b.posterior);
    }

    #[test]
    fn test_compare_with_mismatched_fit() {
        let cfg = GibbsConfig { burn_in: 10, n_samples: 50, ..GibbsConfig::default() };
        let fit = fit_bayes(&frame(), &"y ~ x".parse().unwrap(), &cfg).unwrap();
        let other = crate::ols::fit_ols(&frame(), &"y ~ 0 + x".parse().unwrap()).unwrap();
        assert!(compare_with_ols(&fit.posterior, &other).is_err());
    }
}
