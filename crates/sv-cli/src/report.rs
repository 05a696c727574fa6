//! Plain-text tables printed to stdout.

use std::fmt::{Result, Write};
use sv_data::{ColumnSummary, InspectionReport};
use sv_inference::{
    AnovaResult, ModelComparison, OlsBayesRow, OlsFit, PosteriorSummary, Selection,
    SelectionReason,
};

use crate::pipeline::PipelineReport;

fn stars(p: f64) -> &'static str {
    match p {
        p if p < 0.001 => "***",
        p if p < 0.01 => "**",
        p if p < 0.05 => "*",
        p if p < 0.1 => ".",
        _ => "",
    }
}

fn width(names: impl IntoIterator<Item = usize>) -> usize {
    names.into_iter().max().unwrap_or(0).max(11)
}

/// Coefficient table and fit statistics of a least-squares fit.
pub fn ols_table(out: &mut String, fit: &OlsFit) -> Result {
    let w = width(fit.labels.iter().map(String::len));
    writeln!(out, "{}", fit.formula)?;
    writeln!(
        out,
        "{:<w$} {:>10} {:>10} {:>8} {:>10} {:>10} {:>10}",
        "", "Estimate", "Std.Err", "t", "Pr(>|t|)", "2.5%", "97.5%"
    )?;
    for j in 0..fit.n_params {
        let ci = &fit.conf_intervals[j];
        writeln!(
            out,
            "{:<w$} {:>10.4} {:>10.4} {:>8.3} {:>10.3e} {:>10.4} {:>10.4} {}",
            fit.labels[j],
            fit.coefficients[j],
            fit.std_errors[j],
            fit.t_values[j],
            fit.p_values[j],
            ci.lower,
            ci.upper,
            stars(fit.p_values[j])
        )?;
    }
    writeln!(
        out,
        "Residual standard error: {:.4} on {} degrees of freedom",
        fit.sigma, fit.df_residual
    )?;
    writeln!(
        out,
        "R-squared: {:.4}, Adjusted R-squared: {:.4}",
        fit.r_squared, fit.adj_r_squared
    )?;
    if fit.f_statistic.is_finite() {
        writeln!(
            out,
            "F-statistic: {:.3} on {} and {} DF, p-value: {:.3e}",
            fit.f_statistic,
            fit.n_predictors(),
            fit.df_residual,
            fit.f_p_value
        )?;
    }
    writeln!(out, "AIC: {:.2}, BIC: {:.2}", fit.aic, fit.bic)
}

/// Side-by-side R² comparison.
pub fn comparison_line(out: &mut String, c: &ModelComparison) -> Result {
    writeln!(
        out,
        "{}  ->  {}: R2 {:.4} -> {:.4} ({:+.4}), adj R2 {:.4} -> {:.4} ({:+.4})",
        c.first.formula,
        c.second.formula,
        c.first.r_squared,
        c.second.r_squared,
        c.delta_r_squared,
        c.first.adj_r_squared,
        c.second.adj_r_squared,
        c.delta_adj_r_squared
    )
}

/// Nested F-test table.
pub fn anova_table(out: &mut String, a: &AnovaResult) -> Result {
    writeln!(out, "Model 1: {}", a.small_formula)?;
    writeln!(out, "Model 2: {}", a.large_formula)?;
    writeln!(out, "  Res.Df        RSS  Df  Sum of Sq        F    Pr(>F)")?;
    writeln!(out, "1 {:>6} {:>10.2}", a.df_small, a.rss_small)?;
    writeln!(
        out,
        "2 {:>6} {:>10.2} {:>3} {:>10.2} {:>8.3} {:>9.3e} {}",
        a.df_large,
        a.rss_large,
        a.df_diff,
        a.sum_of_squares,
        a.f_statistic,
        a.p_value,
        stars(a.p_value)
    )
}

/// One selection decision.
pub fn selection_line(out: &mut String, s: &Selection) -> Result {
    match &s.reason {
        SelectionReason::NestedFTest { p_value, alpha } => writeln!(
            out,
            "kept {} (nested F-test p = {:.3e}, alpha = {})",
            s.formula, p_value, alpha
        ),
        SelectionReason::AdjustedRSquared => {
            writeln!(out, "kept {} (higher adjusted R-squared)", s.formula)
        }
    }
}

/// Posterior summary table.
pub fn posterior_table(out: &mut String, p: &PosteriorSummary) -> Result {
    let w = width(p.coefficients.iter().map(|c| c.name.len()));
    writeln!(
        out,
        "{} ({} chain(s) x {} draws, quality {})",
        p.formula, p.n_chains, p.n_samples, p.quality.status
    )?;
    writeln!(
        out,
        "{:<w$} {:>10} {:>9} {:>9} {:>9} {:>10} {:>10} {:>8}",
        "", "Mean", "SD", "Naive SE", "TS SE", "2.5%", "97.5%", "ESS"
    )?;
    for c in p.coefficients.iter().chain(std::iter::once(&p.sigma2)) {
        writeln!(
            out,
            "{:<w$} {:>10.4} {:>9.4} {:>9.5} {:>9.5} {:>10.4} {:>10.4} {:>8.0}{}",
            c.name,
            c.mean,
            c.sd,
            c.naive_se,
            c.time_series_se,
            c.interval.lower,
            c.interval.upper,
            c.ess,
            c.r_hat.map(|r| format!("  R-hat {:.3}", r)).unwrap_or_default()
        )?;
    }
    writeln!(out, "credible (interval excludes 0): {}", p.credible_terms().join(", "))
}

/// OLS vs posterior, row by row.
pub fn ols_vs_bayes_table(out: &mut String, rows: &[OlsBayesRow]) -> Result {
    let w = width(rows.iter().map(|r| r.name.len()));
    writeln!(out, "{:<w$} {:>10} {:>23} {:>10} {:>7}", "", "OLS", "95% CI", "Posterior", "inside")?;
    for r in rows {
        writeln!(
            out,
            "{:<w$} {:>10.4} [{:>10.4}, {:>10.4}] {:>10.4} {:>7}",
            r.name,
            r.ols_estimate,
            r.ols_interval.lower,
            r.ols_interval.upper,
            r.posterior_mean,
            if r.within_ols_interval { "yes" } else { "no" }
        )?;
    }
    Ok(())
}

/// Column summaries, skew flags and collinear pairs.
pub fn inspection_text(out: &mut String, r: &InspectionReport) -> Result {
    writeln!(
        out,
        "{:<12} {:>6} {:>9} {:>9} {:>9} {:>9} {:>9} {:>9} {:>9}",
        "column", "n", "min", "q1", "median", "mean", "q3", "max", "skew"
    )?;
    for s in &r.summaries {
        match s {
            ColumnSummary::Numeric(n) => writeln!(
                out,
                "{:<12} {:>6} {:>9.2} {:>9.2} {:>9.2} {:>9.2} {:>9.2} {:>9.2} {:>9.3}",
                n.name, n.count, n.min, n.q1, n.median, n.mean, n.q3, n.max, n.skewness
            )?,
            ColumnSummary::Levels(l) => {
                let counts: Vec<String> =
                    l.counts.iter().map(|(level, k)| format!("{level}: {k}")).collect();
                writeln!(out, "{:<12} {}", l.name, counts.join(", "))?
            }
        }
    }
    for f in &r.skewed {
        writeln!(out, "skewed: {} ({:.3})", f.column, f.skewness)?;
    }
    if !r.added_columns.is_empty() {
        writeln!(out, "added: {}", r.added_columns.join(", "))?;
    }
    for p in &r.collinear {
        writeln!(out, "collinear: {} ~ {} (r = {:.3})", p.a, p.b, p.r)?;
    }
    writeln!(out)?;
    let names = &r.correlation.names;
    let w = width(names.iter().map(String::len));
    write!(out, "{:<w$}", "")?;
    for n in names {
        write!(out, " {:>8.8}", n)?;
    }
    writeln!(out)?;
    for (name, row) in names.iter().zip(&r.correlation.values) {
        write!(out, "{:<w$}", name)?;
        for v in row {
            write!(out, " {:>8.3}", v)?;
        }
        writeln!(out)?;
    }
    Ok(())
}

/// Full `survstat run` report.
pub fn pipeline_text(out: &mut String, r: &PipelineReport) -> Result {
    writeln!(out, "== Survey: seed {}, {} respondents ==", r.seed, r.n_respondents)?;
    inspection_text(out, &r.inspection)?;

    writeln!(out, "\n== Models ==")?;
    for m in &r.models {
        writeln!(out, "-- {} --", m.name)?;
        ols_table(out, &m.fit)?;
        writeln!(out)?;
    }

    writeln!(out, "== Comparison ==")?;
    for c in &r.comparisons {
        comparison_line(out, c)?;
    }
    writeln!(out)?;
    for a in &r.anova {
        anova_table(out, a)?;
        writeln!(out)?;
    }
    for s in &r.selections {
        selection_line(out, s)?;
    }
    writeln!(out, "chosen: {}", r.chosen)?;

    writeln!(out, "\n== Standardized predictors ==")?;
    ols_table(out, &r.standardized)?;

    writeln!(out, "\n== Diagnostics ==")?;
    for (label, v) in &r.vif {
        writeln!(out, "VIF {:<24} {:>8.3}", label, v)?;
    }
    writeln!(
        out,
        "{} row(s) with Cook's distance above {:.4}",
        r.influence.high_influence.len(),
        r.influence.cooks_threshold
    )?;

    writeln!(out, "\n== Bayesian regression ==")?;
    posterior_table(out, &r.posterior)?;
    writeln!(out)?;
    ols_vs_bayes_table(out, &r.ols_vs_bayes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use sv_data::{Column, DataFrame};
    use sv_inference::fit_ols;

    fn fit_formula(formula: &str) -> OlsFit {
        let df = DataFrame::new()
            .with_column("y", Column::numeric(vec![3.0, 5.0, 4.0, 8.0, 9.0, 7.0]))
            .unwrap()
            .with_column("x", Column::integer(vec![1, 2, 3, 4, 5, 6]))
            .unwrap();
        fit_ols(&df, &formula.parse().unwrap()).unwrap()
    }

    fn fit() -> OlsFit {
        fit_formula("y ~ x")
    }

    #[test]
    fn test_stars() {
        assert_eq!(stars(0.0001), "***");
        assert_eq!(stars(0.049), "*");
        assert_eq!(stars(0.07), ".");
        assert_eq!(stars(0.5), "");
    }

    #[test]
    fn test_ols_table_rows() {
        let mut s = String::new();
        ols_table(&mut s, &fit()).unwrap();
        assert!(s.starts_with("y ~ x\n"));
        assert!(s.contains("(Intercept)"));
        assert!(s.contains("R-squared: 0.6612, Adjusted R-squared: 0.5765"));
        assert!(s.contains("on 1 and 4 DF"));
        let x_row = s.lines().find(|l| l.starts_with("x ")).unwrap();
        assert!(x_row.contains("1.0286"));
        assert!(x_row.trim_end().ends_with('*'));
    }

    #[test]
    fn test_ols_table_without_intercept_counts_every_predictor() {
        let mut s = String::new();
        ols_table(&mut s, &fit_formula("y ~ 0 + x")).unwrap();
        assert!(!s.contains("(Intercept)"));
        assert!(s.contains("on 1 and 5 DF"), "{s}");
    }
}
