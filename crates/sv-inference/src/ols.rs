//! Ordinary least squares.
//!
//! Solves via a Householder QR of the design (never the normal equations), so
//! the conditioning of `X` rather than `XᵀX` governs accuracy. Rank deficiency
//! and extreme ill-conditioning are errors; moderate ill-conditioning is a
//! warning.

use nalgebra::{DMatrix, DVector};
use serde::Serialize;
use sv_core::traits::CoefficientTable;
use sv_core::{Error, Interval, Result};
use sv_data::DataFrame;
use sv_prob::{fisher, math, student_t};

use crate::design::{DesignMatrix, ModelSpec, build_predictors};

/// Relative threshold on `|R_jj|` below which a column counts as dependent.
const RANK_TOL: f64 = 1e-10;
/// Condition number above which a warning is logged.
const COND_WARN: f64 = 1e8;
/// Condition number above which the fit is refused.
const COND_FAIL: f64 = 1e12;

/// Raw least-squares solution shared by [`OlsFit`] and the VIF regressions.
pub(crate) struct LeastSquares {
    pub(crate) beta: DVector<f64>,
    pub(crate) fitted: DVector<f64>,
    pub(crate) residuals: DVector<f64>,
    pub(crate) rss: f64,
    /// `R⁻¹`, so that `(XᵀX)⁻¹ = R⁻¹ R⁻ᵀ`.
    pub(crate) r_inv: DMatrix<f64>,
    /// Diagonal of the hat matrix.
    pub(crate) leverage: Vec<f64>,
    pub(crate) condition_number: f64,
}

pub(crate) fn least_squares(
    x: &DMatrix<f64>,
    y: &DVector<f64>,
    labels: &[String],
) -> Result<LeastSquares> {
    let (n, p) = x.shape();
    if y.len() != n {
        return Err(Error::Validation(format!("y has {} rows, X has {}", y.len(), n)));
    }
    if n <= p {
        return Err(Error::Validation(format!(
            "least squares needs more rows than columns: n={}, p={}",
            n, p
        )));
    }

    let qr = x.clone().qr();
    let r = qr.r();
    let q = qr.q();

    let max_diag = r.diagonal().iter().fold(0.0_f64, |m, v| m.max(v.abs()));
    for j in 0..p {
        if max_diag == 0.0 || r[(j, j)].abs() <= RANK_TOL * max_diag {
            let name = labels.get(j).map(String::as_str).unwrap_or("?");
            return Err(Error::Computation(format!(
                "design is rank deficient: column '{}' is a linear combination of earlier columns",
                name
            )));
        }
    }

    let sv = x.clone().svd(false, false).singular_values;
    let s_max = sv.iter().fold(0.0_f64, |m, v| m.max(*v));
    let s_min = sv.iter().fold(f64::INFINITY, |m, v| m.min(*v));
    let condition_number = if s_min > 0.0 { s_max / s_min } else { f64::INFINITY };
    if condition_number > COND_FAIL {
        return Err(Error::Computation(format!(
            "design is ill-conditioned: condition number {:.3e}",
            condition_number
        )));
    }
    if condition_number > COND_WARN {
        log::warn!(
            "design condition number {:.3e} is large; estimates may be unstable",
            condition_number
        );
    }

    let qty = q.transpose() * y;
    let beta = r
        .solve_upper_triangular(&qty)
        .ok_or_else(|| Error::Computation("triangular solve failed".to_string()))?;
    let r_inv = r
        .solve_upper_triangular(&DMatrix::identity(p, p))
        .ok_or_else(|| Error::Computation("triangular inverse failed".to_string()))?;

    let fitted = x * &beta;
    let residuals = y - &fitted;
    let rss = residuals.norm_squared();
    let leverage = (0..n).map(|i| q.row(i).norm_squared()).collect();

    Ok(LeastSquares { beta, fitted, residuals, rss, r_inv, leverage, condition_number })
}

/// A fitted linear model with its inferential summaries.
#[derive(Debug, Clone, Serialize)]
pub struct OlsFit {
    /// Formula as written, e.g. `overall ~ clean + aroma`.
    pub formula: String,
    /// Parsed formula.
    pub spec: ModelSpec,
    /// Design-column labels in coefficient order.
    pub labels: Vec<String>,
    /// Coefficient estimates.
    pub coefficients: Vec<f64>,
    /// Standard errors.
    pub std_errors: Vec<f64>,
    /// t statistics.
    pub t_values: Vec<f64>,
    /// Two-sided p-values from Student-t with `df_residual` degrees of freedom.
    pub p_values: Vec<f64>,
    /// 95% confidence intervals.
    pub conf_intervals: Vec<Interval>,
    /// Fitted values.
    pub fitted: Vec<f64>,
    /// Raw residuals.
    pub residuals: Vec<f64>,
    /// Hat-matrix diagonal.
    pub leverage: Vec<f64>,
    /// Number of observations.
    pub n_obs: usize,
    /// Number of coefficients, intercept included.
    pub n_params: usize,
    /// Residual degrees of freedom `n - p`.
    pub df_residual: usize,
    /// Residual sum of squares.
    pub rss: f64,
    /// Total sum of squares (centered with an intercept, raw without).
    pub tss: f64,
    /// Coefficient of determination.
    pub r_squared: f64,
    /// R² penalized for the number of coefficients.
    pub adj_r_squared: f64,
    /// Residual standard error `sqrt(RSS / (n - p))`.
    pub sigma: f64,
    /// Overall F statistic against the intercept-only model (NaN if no slopes).
    pub f_statistic: f64,
    /// p-value of the overall F test.
    pub f_p_value: f64,
    /// Gaussian log-likelihood at the MLE of σ.
    pub log_likelihood: f64,
    /// Akaike information criterion (σ counted as a parameter).
    pub aic: f64,
    /// Bayesian information criterion.
    pub bic: f64,
    /// Ratio of extreme singular values of the design.
    pub condition_number: f64,
    #[serde(skip)]
    cov_unscaled: DMatrix<f64>,
    #[serde(skip)]
    response: Vec<f64>,
    #[serde(skip)]
    design: DMatrix<f64>,
}

/// Build the design for `spec` and fit it.
pub fn fit_ols(frame: &DataFrame, spec: &ModelSpec) -> Result<OlsFit> {
    let design = DesignMatrix::build(frame, spec)?;
    OlsFit::from_design(&design)
}

impl OlsFit {
    /// Fit a prebuilt design.
    pub fn from_design(design: &DesignMatrix) -> Result<Self> {
        let ls = least_squares(design.x(), design.y(), design.labels())?;
        let n = design.n_rows();
        let p = design.n_cols();
        let df_residual = n - p;
        let df = df_residual as f64;

        let y: Vec<f64> = design.y().iter().copied().collect();
        let intercept = design.has_intercept();
        let tss = if intercept { math::centered_ss(&y) } else { y.iter().map(|v| v * v).sum() };
        let rss = ls.rss;
        let sigma2 = rss / df;

        let cov_unscaled = &ls.r_inv * ls.r_inv.transpose();
        let coefficients: Vec<f64> = ls.beta.iter().copied().collect();
        let std_errors: Vec<f64> =
            (0..p).map(|j| (sigma2 * cov_unscaled[(j, j)]).sqrt()).collect();
        let t_values: Vec<f64> =
            coefficients.iter().zip(&std_errors).map(|(b, se)| b / se).collect();
        let p_values =
            t_values.iter().map(|&t| student_t::two_sided_p(t, df)).collect::<Result<Vec<_>>>()?;

        let r_squared = if tss > 0.0 { 1.0 - rss / tss } else { f64::NAN };
        let n_f = n as f64;
        let adj_r_squared = if intercept {
            1.0 - (1.0 - r_squared) * (n_f - 1.0) / df
        } else {
            1.0 - (1.0 - r_squared) * n_f / df
        };

        let df_model = p - usize::from(intercept);
        let (f_statistic, f_p_value) = if df_model == 0 || sigma2 <= 0.0 {
            (f64::NAN, f64::NAN)
        } else {
            let f = ((tss - rss) / df_model as f64) / sigma2;
            (f, fisher::sf(f, df_model as f64, df)?)
        };

        let log_likelihood =
            -0.5 * n_f * ((2.0 * std::f64::consts::PI).ln() + (rss / n_f).ln() + 1.0);
        let k = (p + 1) as f64;
        let aic = -2.0 * log_likelihood + 2.0 * k;
        let bic = -2.0 * log_likelihood + n_f.ln() * k;

        let mut fit = Self {
            formula: design.spec().to_string(),
            spec: design.spec().clone(),
            labels: design.labels().to_vec(),
            coefficients,
            std_errors,
            t_values,
            p_values,
            conf_intervals: Vec::new(),
            fitted: ls.fitted.iter().copied().collect(),
            residuals: ls.residuals.iter().copied().collect(),
            leverage: ls.leverage,
            n_obs: n,
            n_params: p,
            df_residual,
            rss,
            tss,
            r_squared,
            adj_r_squared,
            sigma: sigma2.sqrt(),
            f_statistic,
            f_p_value,
            log_likelihood,
            aic,
            bic,
            condition_number: ls.condition_number,
            cov_unscaled,
            response: y,
            design: design.x().clone(),
        };
        fit.conf_intervals = fit.confint(0.95)?;
        Ok(fit)
    }

    /// Confidence intervals `β̂ ± t_{(1+level)/2, n-p} · se` at `level`.
    pub fn confint(&self, level: f64) -> Result<Vec<Interval>> {
        let crit = student_t::critical_value(level, self.df_residual as f64)?;
        Ok(self
            .coefficients
            .iter()
            .zip(&self.std_errors)
            .map(|(b, se)| Interval::new(b - crit * se, b + crit * se, level))
            .collect())
    }

    /// Estimated coefficient covariance `σ̂² (XᵀX)⁻¹`.
    pub fn covariance(&self) -> DMatrix<f64> {
        &self.cov_unscaled * (self.sigma * self.sigma)
    }

    /// Coefficient by design-column label.
    pub fn coefficient(&self, label: &str) -> Option<f64> {
        self.labels.iter().position(|l| l == label).map(|j| self.coefficients[j])
    }

    /// Fitted means for the rows of another frame with the same columns.
    ///
    /// The new frame must expand to exactly the same design columns (same
    /// categorical levels) as the frame the model was fitted on.
    pub fn predict(&self, frame: &DataFrame) -> Result<Vec<f64>> {
        let pred = build_predictors(frame, &self.spec)?;
        if pred.labels != self.labels {
            return Err(Error::Validation(format!(
                "new data expands to columns {:?}, model has {:?}",
                pred.labels, self.labels
            )));
        }
        let beta = DVector::from_column_slice(&self.coefficients);
        Ok((pred.x * beta).iter().copied().collect())
    }

    /// Whether both fits used the same outcome values and every design
    /// column of `self` appears, with identical values, in `other`.
    pub(crate) fn columns_within(&self, other: &OlsFit) -> bool {
        if self.response != other.response || self.design.nrows() != other.design.nrows() {
            return false;
        }
        self.labels.iter().enumerate().all(|(j, label)| {
            other
                .labels
                .iter()
                .position(|l| l == label)
                .is_some_and(|k| self.design.column(j) == other.design.column(k))
        })
    }

    /// Number of non-intercept coefficients.
    pub fn n_predictors(&self) -> usize {
        self.n_params - usize::from(self.spec.intercept)
    }
}

impl CoefficientTable for OlsFit {
    fn coefficient_names(&self) -> Vec<String> {
        self.labels.clone()
    }

    fn point_estimates(&self) -> Vec<f64> {
        self.coefficients.clone()
    }

    fn spreads(&self) -> Vec<f64> {
        self.std_errors.clone()
    }

    fn intervals(&self) -> Vec<Interval> {
        self.conf_intervals.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use sv_data::Column;

    fn frame() -> DataFrame {
        DataFrame::new()
            .with_column("y", Column::numeric(vec![3.0, 5.0, 4.0, 8.0, 9.0, 7.0]))
            .unwrap()
            .with_column("x", Column::integer(vec![1, 2, 3, 4, 5, 6]))
            .unwrap()
    }

    #[test]
    fn test_simple_regression_matches_closed_form() {
        let fit = fit_ols(&frame(), &"y ~ x".parse().unwrap()).unwrap();
        assert_eq!(fit.labels, vec!["(Intercept)", "x"]);
        assert_relative_eq!(fit.coefficients[0], 2.4, epsilon = 1e-10);
        assert_relative_eq!(fit.coefficients[1], 1.0285714285714285, epsilon = 1e-10);
        assert_relative_eq!(fit.std_errors[0], 1.4336101615286128, epsilon = 1e-9);
        assert_relative_eq!(fit.std_errors[1], 0.3681171064778607, epsilon = 1e-9);
        assert_relative_eq!(fit.rss, 9.485714285714288, epsilon = 1e-9);
        assert_relative_eq!(fit.tss, 28.0, epsilon = 1e-12);
        assert_relative_eq!(fit.r_squared, 0.6612244897959183, epsilon = 1e-10);
        assert_relative_eq!(fit.adj_r_squared, 0.5765306122448979, epsilon = 1e-10);
        assert_relative_eq!(fit.f_statistic, 7.807228915662648, epsilon = 1e-8);
        assert_relative_eq!(fit.log_likelihood, -9.887713513825096, epsilon = 1e-9);
        assert_relative_eq!(fit.aic, 25.775427027650192, epsilon = 1e-8);
        assert_relative_eq!(fit.bic, 25.15070543533436, epsilon = 1e-8);
        assert_eq!(fit.df_residual, 4);
        assert_eq!(fit.n_predictors(), 1);
    }

    #[test]
    fn test_slope_p_value_matches_model_f() {
        let fit = fit_ols(&frame(), &"y ~ x".parse().unwrap()).unwrap();
        assert_relative_eq!(fit.p_values[1], fit.f_p_value, epsilon = 1e-10);
        assert!((fit.p_values[1] - 0.0491).abs() < 5e-4, "p = {}", fit.p_values[1]);
        assert!(fit.conf_intervals[1].excludes_zero());
    }

    #[test]
    fn test_leverage_sums_to_p() {
        let fit = fit_ols(&frame(), &"y ~ x".parse().unwrap()).unwrap();
        assert_relative_eq!(fit.leverage.iter().sum::<f64>(), 2.0, epsilon = 1e-10);
        assert_relative_eq!(fit.leverage[0], 0.5238095238095238, epsilon = 1e-10);
    }

    #[test]
    fn test_confint_levels_nest() {
        let fit = fit_ols(&frame(), &"y ~ x".parse().unwrap()).unwrap();
        let ci90 = fit.confint(0.90).unwrap();
        let ci99 = fit.confint(0.99).unwrap();
        for j in 0..2 {
            assert!(ci90[j].width() < fit.conf_intervals[j].width());
            assert!(fit.conf_intervals[j].width() < ci99[j].width());
        }
        let cov = fit.covariance();
        assert_relative_eq!(cov[(1, 1)].sqrt(), fit.std_errors[1], epsilon = 1e-12);
    }

    #[test]
    fn test_predict_reproduces_fitted() {
        let df = frame();
        let fit = fit_ols(&df, &"y ~ x".parse().unwrap()).unwrap();
        let pred = fit.predict(&df).unwrap();
        for (a, b) in pred.iter().zip(&fit.fitted) {
            assert_relative_eq!(a, b, epsilon = 1e-10);
        }
        let new = DataFrame::new().with_column("x", Column::integer(vec![10])).unwrap();
        let p = fit.predict(&new).unwrap();
        assert_relative_eq!(p[0], 2.4 + 10.0 * 1.0285714285714285, epsilon = 1e-9);
    }

    #[test]
    fn test_no_intercept_uses_raw_tss() {
        let fit = fit_ols(&frame(), &"y ~ 0 + x".parse().unwrap()).unwrap();
        let ys = [3.0, 5.0, 4.0, 8.0, 9.0, 7.0_f64];
        assert_relative_eq!(fit.tss, ys.iter().map(|v| v * v).sum::<f64>(), epsilon = 1e-12);
        assert_eq!(fit.n_params, 1);
        assert_eq!(fit.df_residual, 5);
        assert!(fit.f_statistic.is_finite());
    }

    #[test]
    fn test_rank_deficient_design_names_column() {
        let df = frame().with_column("x2", Column::integer(vec![2, 4, 6, 8, 10, 12])).unwrap();
        let err = fit_ols(&df, &"y ~ x + x2".parse().unwrap()).unwrap_err();
        assert!(matches!(err, Error::Computation(_)));
        assert!(err.to_string().contains("x2"), "{}", err);
    }

    #[test]
    fn test_needs_more_rows_than_columns() {
        let df = DataFrame::new()
            .with_column("y", Column::numeric(vec![1.0, 2.0]))
            .unwrap()
            .with_column("x", Column::numeric(vec![0.5, 0.7]))
            .unwrap();
        let err = fit_ols(&df, &"y ~ x".parse().unwrap()).unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
    }

    #[test]
    fn test_json_omits_internal_matrices() {
        let fit = fit_ols(&frame(), &"y ~ 1".parse().unwrap()).unwrap();
        let json = serde_json::to_value(&fit).unwrap();
        let obj = json.as_object().unwrap();
        assert_eq!(json["labels"], serde_json::json!(["(Intercept)"]));
        assert_eq!(json["n_params"], 1);
        // No slopes, so no overall F; NaN is written as null.
        assert!(json["f_statistic"].is_null());
        for key in ["cov_unscaled", "response", "design"] {
            assert!(!obj.contains_key(key), "{key} leaked into JSON");
        }
        assert_eq!(json["conf_intervals"].as_array().unwrap().len(), 1);
    }

    #[test]
    fn test_coefficient_table() {
        let fit = fit_ols(&frame(), &"y ~ x".parse().unwrap()).unwrap();
        assert_eq!(fit.coefficient_index("x"), Some(1));
        let rows = fit.estimates();
        assert_eq!(rows.len(), 2);
        assert_relative_eq!(rows[1].spread, fit.std_errors[1]);
        assert_eq!(fit.coefficient("x"), Some(fit.coefficients[1]));
    }
}
