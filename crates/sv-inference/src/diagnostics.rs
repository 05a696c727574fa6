//! MCMC diagnostics: split R-hat, bulk ESS and quality gates.
//!
//! This module implements:
//! - Split R-hat (Gelman et al.), reported only for two or more chains
//! - Bulk ESS from variogram autocorrelations with Geyer's initial monotone
//!   sequence (Vehtari et al. 2021)

use std::fmt;

use serde::Serialize;

use crate::chain::SamplerResult;

/// Diagnostics for a multi-chain Gibbs run.
#[derive(Debug, Clone, Serialize)]
pub struct DiagnosticsResult {
    /// Split R-hat per parameter; `None` for single-chain runs.
    pub r_hat: Option<Vec<f64>>,
    /// Bulk ESS per parameter.
    pub ess_bulk: Vec<f64>,
}

/// High-level sampling quality status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum QualityStatus {
    /// All gates passed.
    Ok,
    /// Some gates emitted warnings.
    Warn,
    /// One or more gates failed.
    Fail,
}

impl fmt::Display for QualityStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QualityStatus::Ok => write!(f, "ok"),
            QualityStatus::Warn => write!(f, "warn"),
            QualityStatus::Fail => write!(f, "fail"),
        }
    }
}

/// Thresholds for sampling quality gates.
#[derive(Debug, Clone)]
pub struct QualityGates {
    /// Require at least this many kept draws per chain before enabling ESS gates.
    pub min_draws_per_chain: usize,

    /// Warn if max split R-hat exceeds this threshold.
    pub max_rhat_warn: f64,
    /// Fail if max split R-hat exceeds this threshold.
    pub max_rhat_fail: f64,

    /// Minimum bulk ESS as a fraction of total draws (n_chains * n_samples).
    pub min_ess_bulk_frac_warn: f64,
    /// Fail if bulk ESS falls below this fraction of total draws.
    pub min_ess_bulk_frac_fail: f64,
}

impl Default for QualityGates {
    fn default() -> Self {
        Self {
            min_draws_per_chain: 50,
            max_rhat_warn: 1.05,
            max_rhat_fail: 1.10,
            min_ess_bulk_frac_warn: 0.05,
            min_ess_bulk_frac_fail: 0.01,
        }
    }
}

/// Summary of sampling run quality.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QualitySummary {
    /// Aggregated status for the run.
    pub status: QualityStatus,
    /// Non-fatal issues (suggests a longer burn-in or more draws).
    pub warnings: Vec<String>,
    /// Hard failures (likely unusable sampling run).
    pub failures: Vec<String>,
    /// Whether the ESS gates were enabled for this run.
    pub enabled: bool,
    /// Total kept draws used for diagnostics.
    pub total_draws: usize,
    /// Max split R-hat across parameters (multi-chain runs only).
    pub max_r_hat: Option<f64>,
    /// Min bulk ESS across parameters.
    pub min_ess_bulk: f64,
}

/// Apply `gates` to a diagnostics result.
pub fn quality_summary(
    diag: &DiagnosticsResult,
    n_chains: usize,
    n_samples: usize,
    gates: &QualityGates,
) -> QualitySummary {
    let total_draws = n_chains.saturating_mul(n_samples);
    let enabled = n_samples >= gates.min_draws_per_chain;

    let max_r_hat =
        diag.r_hat.as_ref().map(|r| r.iter().copied().fold(f64::NEG_INFINITY, f64::max));
    let min_ess_bulk = diag.ess_bulk.iter().copied().fold(f64::INFINITY, f64::min);

    let mut warnings = Vec::new();
    let mut failures = Vec::new();

    if let Some(r) = max_r_hat {
        if !r.is_finite() {
            failures.push("r_hat_not_finite".to_string());
        } else if r > gates.max_rhat_fail {
            failures.push("r_hat_high".to_string());
        } else if r > gates.max_rhat_warn {
            warnings.push("r_hat_high".to_string());
        }
    }
    if !min_ess_bulk.is_finite() {
        failures.push("ess_bulk_not_finite".to_string());
    }

    if !enabled {
        warnings.push("gates_disabled_short_run".to_string());
    } else if total_draws > 0 {
        let warn_thr = gates.min_ess_bulk_frac_warn * (total_draws as f64);
        let fail_thr = gates.min_ess_bulk_frac_fail * (total_draws as f64);
        if min_ess_bulk < fail_thr {
            failures.push("ess_bulk_low".to_string());
        } else if min_ess_bulk < warn_thr {
            warnings.push("ess_bulk_low".to_string());
        }
    }

    let status = if !failures.is_empty() {
        QualityStatus::Fail
    } else if !warnings.is_empty() {
        QualityStatus::Warn
    } else {
        QualityStatus::Ok
    };

    QualitySummary { status, warnings, failures, enabled, total_draws, max_r_hat, min_ess_bulk }
}

/// Between- and within-chain variance of a set of equal-length half-chains.
struct Variances {
    /// Draws per half-chain.
    n: f64,
    /// Between-chain variance `B`.
    between: f64,
    /// Mean within-chain variance `W`.
    within: f64,
}

impl Variances {
    fn of(halves: &[&[f64]]) -> Self {
        let m = halves.len() as f64;
        let n = halves[0].len() as f64;
        let stats: Vec<(f64, f64)> = halves.iter().map(|c| mean_and_var(c)).collect();
        let grand = stats.iter().map(|s| s.0).sum::<f64>() / m;
        let spread = stats.iter().map(|s| (s.0 - grand).powi(2)).sum::<f64>();
        Self {
            n,
            between: n * spread / (m - 1.0),
            within: stats.iter().map(|s| s.1).sum::<f64>() / m,
        }
    }

    /// Pooled posterior variance estimate `((n-1)/n) W + B/n`.
    fn pooled(&self) -> f64 {
        (self.n - 1.0) / self.n * self.within + self.between / self.n
    }
}

/// Split R-hat of one parameter: `sqrt(pooled / W)` over the half-chains.
///
/// NaN when the chains are too short or have no within-chain variance.
pub fn r_hat(chains: &[&[f64]]) -> f64 {
    let Some(halves) = split_chains(chains, 2) else {
        return f64::NAN;
    };
    let v = Variances::of(&halves);
    if v.within < 1e-30 {
        return f64::NAN;
    }
    (v.pooled() / v.within).sqrt()
}

/// Split every chain in half and truncate to a common length of at least
/// `min_len`.
fn split_chains<'a>(chains: &[&'a [f64]], min_len: usize) -> Option<Vec<&'a [f64]>> {
    if chains.is_empty() || chains.iter().any(|c| c.len() < 4) {
        return None;
    }
    let halves: Vec<&[f64]> = chains
        .iter()
        .flat_map(|c| {
            let (a, b) = c.split_at(c.len() / 2);
            [a, b]
        })
        .collect();
    let common = halves.iter().map(|c| c.len()).min()?;
    (common >= min_len).then(|| halves.into_iter().map(|c| &c[..common]).collect())
}

fn mean_and_var(chain: &[f64]) -> (f64, f64) {
    let n = chain.len() as f64;
    let mean = chain.iter().sum::<f64>() / n;
    let var = chain.iter().map(|&x| (x - mean).powi(2)).sum::<f64>() / (n.max(2.0) - 1.0);
    (mean, var)
}

/// Mean squared difference between draws `lag` apart, over all half-chains.
fn variogram(halves: &[&[f64]], lag: usize) -> f64 {
    let (sum, count) = halves
        .iter()
        .flat_map(|c| c.windows(lag + 1).map(|w| (w[0] - w[lag]).powi(2)))
        .fold((0.0, 0usize), |(s, k), d| (s + d, k + 1));
    sum / count as f64
}

/// Bulk effective sample size over all chains.
///
/// Autocorrelations come from the variogram, `rho_t = 1 - V_t / (2 pooled)`,
/// and are truncated with Geyer's initial monotone sequence on pair sums.
pub fn ess_bulk(chains: &[&[f64]]) -> f64 {
    let Some(halves) = split_chains(chains, 4) else {
        return 0.0;
    };
    let n = halves[0].len();
    let total = (halves.len() * n) as f64;

    let pooled = Variances::of(&halves).pooled();
    if !pooled.is_finite() || pooled < 1e-30 {
        return total;
    }
    let rho = |lag: usize| (1.0 - variogram(&halves, lag) / (2.0 * pooled)).clamp(-1.0, 1.0);

    // Pair sums Γ_k = ρ_{2k+1} + ρ_{2k+2}, kept while positive and non-increasing.
    let mut sum_gamma = 0.0;
    let mut prev = f64::INFINITY;
    let mut lag = 1;
    while lag + 1 < n {
        let gamma = rho(lag) + rho(lag + 1);
        if gamma < 0.0 {
            break;
        }
        prev = gamma.min(prev);
        sum_gamma += prev;
        lag += 2;
    }

    let tau = 1.0 + 2.0 * sum_gamma;
    if !tau.is_finite() || tau <= 0.0 {
        return total;
    }
    (total / tau).clamp(1.0, total)
}

/// Compute diagnostics for every parameter of a sampler run.
pub fn compute_diagnostics(result: &SamplerResult) -> DiagnosticsResult {
    let n_params = result.param_names.len();
    let multi = result.chains.len() >= 2;

    let mut r_hat_vals = Vec::with_capacity(n_params);
    let mut ess_bulk_vals = Vec::with_capacity(n_params);
    for p in 0..n_params {
        let chain_draws = result.param_draws(p);
        let refs: Vec<&[f64]> = chain_draws.iter().map(|c| c.as_slice()).collect();
        if multi {
            r_hat_vals.push(r_hat(&refs));
        }
        ess_bulk_vals.push(ess_bulk(&refs));
    }

    DiagnosticsResult { r_hat: multi.then_some(r_hat_vals), ess_bulk: ess_bulk_vals }
}
