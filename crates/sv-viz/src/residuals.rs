//! Residual diagnostics artifacts for a least-squares fit.

use serde::Serialize;
use sv_core::{Error, Result};
use sv_inference::{Influence, OlsFit};

use crate::meta::ArtifactMeta;

/// Residuals against fitted values.
#[derive(Debug, Clone, Serialize)]
pub struct ResidualsArtifact {
    /// Artifact schema identifier.
    pub schema_version: String,
    /// Provenance.
    pub meta: ArtifactMeta,
    /// Model formula.
    pub formula: String,
    /// Fitted values (x axis).
    pub fitted: Vec<f64>,
    /// Raw residuals (y axis).
    pub residuals: Vec<f64>,
    /// Residual standard error, for ±2σ guide lines.
    pub sigma: f64,
}

/// Normal QQ plot of studentized residuals.
#[derive(Debug, Clone, Serialize)]
pub struct QqArtifact {
    /// Artifact schema identifier.
    pub schema_version: String,
    /// Provenance.
    pub meta: ArtifactMeta,
    /// Model formula.
    pub formula: String,
    /// Theoretical quantiles (x axis).
    pub theoretical: Vec<f64>,
    /// Sorted studentized residuals (y axis).
    pub sample: Vec<f64>,
}

/// Leverage against studentized residuals, with Cook's distance.
#[derive(Debug, Clone, Serialize)]
pub struct LeverageArtifact {
    /// Artifact schema identifier.
    pub schema_version: String,
    /// Provenance.
    pub meta: ArtifactMeta,
    /// Model formula.
    pub formula: String,
    /// Hat values (x axis).
    pub leverage: Vec<f64>,
    /// Studentized residuals (y axis); `null` where undefined.
    pub studentized: Vec<Option<f64>>,
    /// Cook's distance per row; `null` where undefined.
    pub cooks_distance: Vec<Option<f64>>,
    /// Cook's distance cutoff.
    pub cooks_threshold: f64,
    /// Rows above the cutoff.
    pub high_influence: Vec<usize>,
}

fn finite_or_null(xs: &[f64]) -> Vec<Option<f64>> {
    xs.iter().map(|&v| v.is_finite().then_some(v)).collect()
}

fn check_rows(fit: &OlsFit, influence: &Influence) -> Result<()> {
    if influence.leverage.len() != fit.n_obs {
        return Err(Error::Validation(format!(
            "influence has {} rows, fit '{}' has {}",
            influence.leverage.len(),
            fit.formula,
            fit.n_obs
        )));
    }
    Ok(())
}

/// Residuals-vs-fitted artifact.
pub fn residuals_vs_fitted_artifact(fit: &OlsFit) -> Result<ResidualsArtifact> {
    Ok(ResidualsArtifact {
        schema_version: "survstat_residuals_v1".to_string(),
        meta: ArtifactMeta::now()?,
        formula: fit.formula.clone(),
        fitted: fit.fitted.clone(),
        residuals: fit.residuals.clone(),
        sigma: fit.sigma,
    })
}

/// QQ artifact from precomputed influence measures.
pub fn qq_artifact(fit: &OlsFit, influence: &Influence) -> Result<QqArtifact> {
    check_rows(fit, influence)?;
    Ok(QqArtifact {
        schema_version: "survstat_qq_v1".to_string(),
        meta: ArtifactMeta::now()?,
        formula: fit.formula.clone(),
        theoretical: influence.qq.iter().map(|p| p.theoretical).collect(),
        sample: influence.qq.iter().map(|p| p.sample).collect(),
    })
}

/// Leverage artifact from precomputed influence measures.
pub fn leverage_artifact(fit: &OlsFit, influence: &Influence) -> Result<LeverageArtifact> {
    check_rows(fit, influence)?;
    Ok(LeverageArtifact {
        schema_version: "survstat_leverage_v1".to_string(),
        meta: ArtifactMeta::now()?,
        formula: fit.formula.clone(),
        leverage: influence.leverage.clone(),
        studentized: finite_or_null(&influence.studentized),
        cooks_distance: finite_or_null(&influence.cooks_distance),
        cooks_threshold: influence.cooks_threshold,
        high_influence: influence.high_influence.clone(),
    })
}
