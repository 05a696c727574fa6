//! Model comparison: fit statistics, nested F-tests and the selection policy.

use serde::Serialize;
use sv_core::{Error, Result};
use sv_prob::fisher;

use crate::ols::OlsFit;

/// Significance level used by [`select`] when none is configured.
pub const DEFAULT_ALPHA: f64 = 0.05;

/// Headline statistics of one fit.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FitSummary {
    /// Formula.
    pub formula: String,
    /// Number of coefficients.
    pub n_params: usize,
    /// R².
    pub r_squared: f64,
    /// Adjusted R².
    pub adj_r_squared: f64,
    /// AIC.
    pub aic: f64,
    /// BIC.
    pub bic: f64,
}

impl From<&OlsFit> for FitSummary {
    fn from(fit: &OlsFit) -> Self {
        Self {
            formula: fit.formula.clone(),
            n_params: fit.n_params,
            r_squared: fit.r_squared,
            adj_r_squared: fit.adj_r_squared,
            aic: fit.aic,
            bic: fit.bic,
        }
    }
}

/// Side-by-side fit statistics of two models.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ModelComparison {
    /// First model.
    pub first: FitSummary,
    /// Second model.
    pub second: FitSummary,
    /// `R²(second) - R²(first)`.
    pub delta_r_squared: f64,
    /// `adjR²(second) - adjR²(first)`.
    pub delta_adj_r_squared: f64,
}

/// Compare R² and adjusted R² of two fits.
pub fn compare(first: &OlsFit, second: &OlsFit) -> ModelComparison {
    ModelComparison {
        first: first.into(),
        second: second.into(),
        delta_r_squared: second.r_squared - first.r_squared,
        delta_adj_r_squared: second.adj_r_squared - first.adj_r_squared,
    }
}

/// Whether `small` is nested in `large`: same outcome values, and small's
/// design columns a strict subset of large's with identical values.
///
/// Fits of the same formula on rescaled or different data are not nested.
pub fn is_nested(small: &OlsFit, large: &OlsFit) -> bool {
    small.spec.outcome == large.spec.outcome
        && small.n_obs == large.n_obs
        && small.n_params < large.n_params
        && small.columns_within(large)
}

/// Nested-model F-test.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnovaResult {
    /// Smaller model.
    pub small_formula: String,
    /// Larger model.
    pub large_formula: String,
    /// RSS of the smaller model.
    pub rss_small: f64,
    /// RSS of the larger model.
    pub rss_large: f64,
    /// Residual df of the smaller model.
    pub df_small: usize,
    /// Residual df of the larger model.
    pub df_large: usize,
    /// Numerator degrees of freedom `df_small - df_large`.
    pub df_diff: usize,
    /// Reduction in RSS.
    pub sum_of_squares: f64,
    /// F statistic.
    pub f_statistic: f64,
    /// Upper-tail p-value from `F(df_diff, df_large)`.
    pub p_value: f64,
}

/// `F = ((RSS_s - RSS_l) / (df_s - df_l)) / (RSS_l / df_l)`.
///
/// Fails with a validation error unless `small` is nested in `large`.
pub fn anova(small: &OlsFit, large: &OlsFit) -> Result<AnovaResult> {
    if !is_nested(small, large) {
        return Err(Error::Validation(format!(
            "'{}' is not nested in '{}'",
            small.formula, large.formula
        )));
    }
    let df_diff = small.df_residual - large.df_residual;
    let ss = (small.rss - large.rss).max(0.0);
    let denom = large.rss / large.df_residual as f64;
    let f_statistic = if denom > 0.0 { (ss / df_diff as f64) / denom } else { f64::INFINITY };
    let p_value = if f_statistic.is_finite() {
        fisher::sf(f_statistic, df_diff as f64, large.df_residual as f64)?
    } else {
        0.0
    };
    Ok(AnovaResult {
        small_formula: small.formula.clone(),
        large_formula: large.formula.clone(),
        rss_small: small.rss,
        rss_large: large.rss,
        df_small: small.df_residual,
        df_large: large.df_residual,
        df_diff,
        sum_of_squares: ss,
        f_statistic,
        p_value,
    })
}

/// F-tests between consecutive models of an increasing nested sequence.
pub fn anova_sequence(models: &[&OlsFit]) -> Result<Vec<AnovaResult>> {
    if models.len() < 2 {
        return Err(Error::Validation("anova_sequence needs at least two models".to_string()));
    }
    models.windows(2).map(|w| anova(w[0], w[1])).collect()
}

/// Which of the two candidates [`select`] kept.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Choice {
    /// The first argument.
    First,
    /// The second argument.
    Second,
}

/// Why [`select`] made its choice.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "rule", rename_all = "snake_case")]
pub enum SelectionReason {
    /// Nested pair: the larger model is kept only when the F-test rejects.
    NestedFTest {
        /// F-test p-value.
        p_value: f64,
        /// Significance level.
        alpha: f64,
    },
    /// Non-nested pair: higher adjusted R² wins, ties go to fewer coefficients.
    AdjustedRSquared,
}

/// Outcome of [`select`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Selection {
    /// Chosen candidate.
    pub choice: Choice,
    /// Formula of the chosen candidate.
    pub formula: String,
    /// Rule that decided.
    pub reason: SelectionReason,
    /// The F-test, for nested pairs.
    pub anova: Option<AnovaResult>,
}

/// Prefer the model with fewer predictors unless the nested F-test rejects
/// at `alpha`. Non-nested pairs fall back to adjusted R².
pub fn select(a: &OlsFit, b: &OlsFit, alpha: f64) -> Result<Selection> {
    if !(alpha > 0.0 && alpha < 1.0) {
        return Err(Error::Validation(format!("alpha must be in (0, 1), got {}", alpha)));
    }

    let nested = if is_nested(a, b) {
        Some((Choice::First, Choice::Second, anova(a, b)?))
    } else if is_nested(b, a) {
        Some((Choice::Second, Choice::First, anova(b, a)?))
    } else {
        None
    };

    let (choice, reason, anova) = match nested {
        Some((small, large, test)) => {
            let choice = if test.p_value < alpha { large } else { small };
            (choice, SelectionReason::NestedFTest { p_value: test.p_value, alpha }, Some(test))
        }
        None => {
            let choice = if a.adj_r_squared > b.adj_r_squared {
                Choice::First
            } else if b.adj_r_squared > a.adj_r_squared {
                Choice::Second
            } else if b.n_params < a.n_params {
                Choice::Second
            } else {
                Choice::First
            };
            (choice, SelectionReason::AdjustedRSquared, None)
        }
    };

    let formula = match choice {
        Choice::First => a.formula.clone(),
        Choice::Second => b.formula.clone(),
    };
    Ok(Selection { choice, formula, reason, anova })
}
