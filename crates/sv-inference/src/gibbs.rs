//! Conjugate Gibbs sampler for the normal linear model.
//!
//! Model:
//! y ~ N(Xβ, σ²I)
//! β ~ N(b0·1, B0⁻¹I)        (B0 = 0 gives a flat prior)
//! σ² ~ InvGamma(c0/2, d0/2)
//!
//! Full conditionals:
//! 1. β | σ², y ~ N(V(B0 b0 + Xᵀy/σ²), V), V = (B0 I + XᵀX/σ²)⁻¹
//! 2. σ² | β, y ~ InvGamma((c0 + n)/2, (d0 + ‖y − Xβ‖²)/2)

use nalgebra::{Cholesky, DMatrix, DVector};
use rand::{Rng, SeedableRng};
use rand_distr::{Distribution, Gamma, StandardNormal};
use rand_xoshiro::Xoshiro256PlusPlus;
use serde::{Deserialize, Serialize};
use sv_core::{Error, Result};

/// Conjugate prior hyperparameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RegressionPrior {
    /// Prior mean `b0`, shared by every coefficient.
    pub mean: f64,
    /// Prior precision `B0`, shared by every coefficient; 0 is flat.
    pub precision: f64,
    /// Inverse-gamma shape hyperparameter `c0` (shape is `c0 / 2`).
    pub c0: f64,
    /// Inverse-gamma scale hyperparameter `d0` (scale is `d0 / 2`).
    pub d0: f64,
}

impl Default for RegressionPrior {
    fn default() -> Self {
        Self { mean: 0.0, precision: 0.0, c0: 0.001, d0: 0.001 }
    }
}

/// Sampler configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GibbsConfig {
    /// Iterations discarded at the start of each chain.
    pub burn_in: usize,
    /// Kept draws per chain.
    pub n_samples: usize,
    /// Keep every `thin`-th iteration after burn-in.
    pub thin: usize,
    /// Number of independent chains.
    pub n_chains: usize,
    /// Base seed; chain `k` uses `seed + k`.
    pub seed: u64,
    /// Credible-interval level for summaries.
    pub credible_level: f64,
    /// Prior hyperparameters.
    pub prior: RegressionPrior,
}

impl Default for GibbsConfig {
    fn default() -> Self {
        Self {
            burn_in: 1000,
            n_samples: 10_000,
            thin: 1,
            n_chains: 1,
            seed: 555,
            credible_level: 0.95,
            prior: RegressionPrior::default(),
        }
    }
}

impl GibbsConfig {
    /// Check ranges.
    pub fn validate(&self) -> Result<()> {
        if self.n_samples < 4 {
            return Err(Error::Validation(format!(
                "n_samples must be at least 4, got {}",
                self.n_samples
            )));
        }
        if self.thin == 0 {
            return Err(Error::Validation("thin must be >= 1".to_string()));
        }
        if self.n_chains == 0 {
            return Err(Error::Validation("n_chains must be >= 1".to_string()));
        }
        if !(self.credible_level > 0.0 && self.credible_level < 1.0) {
            return Err(Error::Validation(format!(
                "credible_level must be in (0, 1), got {}",
                self.credible_level
            )));
        }
        let p = &self.prior;
        if !p.mean.is_finite() || !(p.precision >= 0.0) || !p.precision.is_finite() {
            return Err(Error::Validation(format!(
                "prior mean must be finite and precision finite and >= 0, got ({}, {})",
                p.mean, p.precision
            )));
        }
        if !(p.c0 >= 0.0) || !(p.d0 >= 0.0) || !p.c0.is_finite() || !p.d0.is_finite() {
            return Err(Error::Validation(format!(
                "c0 and d0 must be finite and >= 0, got ({}, {})",
                p.c0, p.d0
            )));
        }
        Ok(())
    }
}

/// One Gibbs chain over a fixed design.
pub(crate) struct GibbsSampler<'a> {
    x: &'a DMatrix<f64>,
    y: &'a DVector<f64>,
    xtx: DMatrix<f64>,
    xty: DVector<f64>,
    prior: RegressionPrior,
    rng: Xoshiro256PlusPlus,
}

impl<'a> GibbsSampler<'a> {
    pub(crate) fn new(
        x: &'a DMatrix<f64>,
        y: &'a DVector<f64>,
        prior: &RegressionPrior,
        seed: u64,
    ) -> Self {
        let xt = x.transpose();
        Self {
            x,
            y,
            xtx: &xt * x,
            xty: &xt * y,
            prior: prior.clone(),
            rng: Xoshiro256PlusPlus::seed_from_u64(seed),
        }
    }

    /// Draw β | σ².
    fn draw_beta(&mut self, sigma2: f64) -> Result<DVector<f64>> {
        let p = self.xtx.nrows();
        let b0 = self.prior.precision;

        let mut q = &self.xtx / sigma2;
        for j in 0..p {
            q[(j, j)] += b0;
        }
        let rhs = &self.xty / sigma2 + DVector::from_element(p, b0 * self.prior.mean);

        let chol = Cholesky::new(q).ok_or_else(|| {
            Error::Computation("posterior precision of β is not positive definite".to_string())
        })?;
        let mu = chol.solve(&rhs);

        // β = μ + L⁻ᵀ z has covariance (L Lᵀ)⁻¹ = V.
        let rng = &mut self.rng;
        let z = DVector::from_fn(p, |_, _| rng.sample::<f64, _>(StandardNormal));
        let offset = chol
            .l()
            .transpose()
            .solve_upper_triangular(&z)
            .ok_or_else(|| Error::Computation("triangular solve failed".to_string()))?;
        Ok(mu + offset)
    }

    /// Draw σ² | β via its reciprocal, which is Gamma(shape, rate).
    fn draw_sigma2(&mut self, beta: &DVector<f64>) -> Result<f64> {
        let n = self.y.len() as f64;
        let resid = self.y - self.x * beta;
        let rss = resid.norm_squared();

        let shape = (self.prior.c0 + n) / 2.0;
        let rate = (self.prior.d0 + rss) / 2.0;
        if !(rate > 0.0) {
            return Err(Error::Computation(format!(
                "inverse-gamma rate must be positive, got {}",
                rate
            )));
        }
        // rand_distr uses shape-scale, so scale = 1/rate
        let gamma = Gamma::new(shape, 1.0 / rate)
            .map_err(|e| Error::Computation(format!("invalid gamma parameters: {}", e)))?;
        let precision: f64 = gamma.sample(&mut self.rng);
        Ok(1.0 / precision)
    }

    /// Run burn-in plus `n_samples * thin` iterations from `start_beta`.
    ///
    /// Each iteration draws σ² given the current β, then β given that σ².
    /// Each kept draw is `[β..., σ²]`.
    pub(crate) fn run(
        &mut self,
        start_beta: &[f64],
        config: &GibbsConfig,
    ) -> Result<Vec<Vec<f64>>> {
        if start_beta.len() != self.xtx.nrows() {
            return Err(Error::Validation(format!(
                "start has {} coefficients, design has {}",
                start_beta.len(),
                self.xtx.nrows()
            )));
        }
        if start_beta.iter().any(|b| !b.is_finite()) {
            return Err(Error::Validation("starting coefficients must be finite".to_string()));
        }

        let mut beta = DVector::from_column_slice(start_beta);
        let total = config.burn_in + config.n_samples * config.thin;
        let mut draws = Vec::with_capacity(config.n_samples);

        for iter in 0..total {
            let sigma2 = self.draw_sigma2(&beta)?;
            beta = self.draw_beta(sigma2)?;

            if iter >= config.burn_in && (iter - config.burn_in) % config.thin == 0 {
                let mut row: Vec<f64> = beta.iter().copied().collect();
                row.push(sigma2);
                draws.push(row);
            }
        }
        Ok(draws)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use rand_distr::Normal;

    fn toy(n: usize) -> (DMatrix<f64>, DVector<f64>) {
        let mut rng = Xoshiro256PlusPlus::seed_from_u64(7);
        let noise = Normal::new(0.0, 0.5).unwrap();
        let x = DMatrix::from_fn(n, 2, |i, j| if j == 0 { 1.0 } else { i as f64 / n as f64 });
        let y = DVector::from_fn(n, |i, _| 1.0 + 3.0 * x[(i, 1)] + noise.sample(&mut rng));
        (x, y)
    }

    #[test]
    fn test_flat_prior_recovers_truth() {
        let (x, y) = toy(200);
        let cfg = GibbsConfig { burn_in: 200, n_samples: 2000, ..GibbsConfig::default() };
        let mut s = GibbsSampler::new(&x, &y, &cfg.prior, 11);
        let draws = s.run(&[0.0, 0.0], &cfg).unwrap();
        assert_eq!(draws.len(), 2000);
        assert_eq!(draws[0].len(), 3);

        let mean = |k: usize| draws.iter().map(|d| d[k]).sum::<f64>() / draws.len() as f64;
        assert!((mean(0) - 1.0).abs() < 0.3, "intercept {}", mean(0));
        assert!((mean(1) - 3.0).abs() < 0.5, "slope {}", mean(1));
        assert!((mean(2) - 0.25).abs() < 0.08, "sigma2 {}", mean(2));
        assert!(draws.iter().all(|d| d[2] > 0.0));
    }

    #[test]
    fn test_strong_prior_shrinks() {
        let (x, y) = toy(50);
        let mut cfg = GibbsConfig { burn_in: 100, n_samples: 500, ..GibbsConfig::default() };
        cfg.prior.precision = 1e6;
        let mut s = GibbsSampler::new(&x, &y, &cfg.prior, 3);
        let draws = s.run(&[1.0, 3.0], &cfg).unwrap();
        let slope = draws.iter().map(|d| d[1]).sum::<f64>() / draws.len() as f64;
        assert_relative_eq!(slope, 0.0, epsilon = 0.05);
    }

    #[test]
    fn test_thinning_and_determinism() {
        let (x, y) = toy(40);
        let cfg = GibbsConfig { burn_in: 10, n_samples: 30, thin: 3, ..GibbsConfig::default() };
        let a = GibbsSampler::new(&x, &y, &cfg.prior, 5).run(&[1.0, 3.0], &cfg).unwrap();
        let b = GibbsSampler::new(&x, &y, &cfg.prior, 5).run(&[1.0, 3.0], &cfg).unwrap();
        let c = GibbsSampler::new(&x, &y, &cfg.prior, 6).run(&[1.0, 3.0], &cfg).unwrap();
        assert_eq!(a.len(), 30);
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn test_first_draw_depends_on_start() {
        let (x, y) = toy(40);
        let cfg = GibbsConfig { burn_in: 0, n_samples: 4, ..GibbsConfig::default() };
        let near = GibbsSampler::new(&x, &y, &cfg.prior, 9).run(&[1.0, 3.0], &cfg).unwrap();
        let far = GibbsSampler::new(&x, &y, &cfg.prior, 9).run(&[100.0, -100.0], &cfg).unwrap();
        // A start far from the data inflates the first residual variance.
        assert!(near[0][2] < 2.0, "near start sigma2 {}", near[0][2]);
        assert!(far[0][2] > 100.0 * near[0][2], "far start sigma2 {}", far[0][2]);

        let err = GibbsSampler::new(&x, &y, &cfg.prior, 9).run(&[1.0], &cfg);
        assert!(err.is_err());
        let err = GibbsSampler::new(&x, &y, &cfg.prior, 9).run(&[f64::NAN, 3.0], &cfg);
        assert!(err.is_err());
    }

    #[test]
    fn test_validate() {
        assert!(GibbsConfig::default().validate().is_ok());
        assert!(GibbsConfig { thin: 0, ..GibbsConfig::default() }.validate().is_err());
        assert!(GibbsConfig { n_chains: 0, ..GibbsConfig::default() }.validate().is_err());
        assert!(GibbsConfig { credible_level: 1.0, ..GibbsConfig::default() }.validate().is_err());
        let mut cfg = GibbsConfig::default();
        cfg.prior.precision = -1.0;
        assert!(cfg.validate().is_err());
    }
}
