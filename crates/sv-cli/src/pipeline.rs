//! `survstat run`: generate, inspect, fit, compare, then sample the chosen model.

use anyhow::{Context, Result};
use serde::Serialize;
use std::path::Path;
use sv_data::{
    ColumnKind, DataFrame, InspectionReport, generate, inspect, recode_factor, recode_threshold,
    standardized,
};
use sv_inference::{
    AnovaResult, BayesFit, Choice, DesignMatrix, Influence, ModelComparison, ModelSpec,
    OlsBayesRow, OlsFit, PosteriorSummary, Selection, Term, anova_sequence, compare,
    compare_with_ols, fit_bayes, fit_ols, influence, select, vif,
};

use crate::config::PipelineConfig;

/// Outcome column of every pipeline model.
pub const OUTCOME: &str = "overall";
/// Factor recoding of `num_child`.
pub const CHILD_FACTOR: &str = "num_child_factor";
/// Collapsed recoding of `num_child`.
pub const CHILD_FLAG: &str = "more_than_2child";

/// One named model of the refinement sequence.
#[derive(Debug, Clone, Serialize)]
pub struct NamedFit {
    /// `m1` through `m6`.
    pub name: String,
    /// Least-squares fit of the model.
    pub fit: OlsFit,
}

/// Everything `survstat run` computed.
#[derive(Debug, Clone, Serialize)]
pub struct PipelineReport {
    /// Generator seed.
    pub seed: u64,
    /// Rows in the simulated table.
    pub n_respondents: usize,
    /// Summaries, skew flags and collinearity of the raw table.
    pub inspection: InspectionReport,
    /// Correlation cutoff the inspector used.
    pub collinearity_threshold: f64,
    /// Columns appended after inspection.
    pub recoded_columns: Vec<String>,
    /// Refinement sequence m1..m6.
    pub models: Vec<NamedFit>,
    /// Consecutive pairs of `models`.
    pub comparisons: Vec<ModelComparison>,
    /// F-tests along the nested prefix of `models`.
    pub anova: Vec<AnovaResult>,
    /// Selection decisions, in the order they were made.
    pub selections: Vec<Selection>,
    /// Name of the model that survived selection.
    pub chosen: String,
    /// Chosen model refit on z-scored numeric predictors.
    pub standardized: OlsFit,
    /// Leverage, studentized residuals and Cook's distance of the chosen fit.
    pub influence: Influence,
    /// Variance inflation factor per non-intercept column.
    pub vif: Vec<(String, f64)>,
    /// Gibbs posterior of the chosen model.
    pub posterior: PosteriorSummary,
    /// OLS estimates against posterior means.
    pub ols_vs_bayes: Vec<OlsBayesRow>,
    /// Recoded table the models were fit on.
    #[serde(skip)]
    pub frame: DataFrame,
}

impl PipelineReport {
    /// The selected least-squares fit.
    pub fn chosen_fit(&self) -> Option<&OlsFit> {
        self.models.iter().find(|m| m.name == self.chosen).map(|m| &m.fit)
    }
}

/// Refinement sequence: each model is derived from the previous one.
pub fn model_sequence(log_distance: &str) -> Result<Vec<(String, ModelSpec)>> {
    let m1 = ModelSpec::main_effects(OUTCOME, &["clean"]);
    let m2 = ModelSpec::main_effects(OUTCOME, &["clean", "aroma", "value", "color"]);
    let m3 = m2
        .with_term(Term::column(log_distance))
        .with_term(Term::column("num_child"))
        .with_term(Term::column("promo"));
    let m4 = m3.replace_term("num_child", Term::column(CHILD_FACTOR))?;
    let m5 = m4.replace_term(CHILD_FACTOR, Term::column(CHILD_FLAG))?;
    let m6 = m5.with_term(Term::interaction("value", CHILD_FLAG));
    Ok([m1, m2, m3, m4, m5, m6]
        .into_iter()
        .enumerate()
        .map(|(i, s)| (format!("m{}", i + 1), s))
        .collect())
}

/// Generate, inspect and recode: the table every model is fit on.
pub fn prepare_frame(config: &PipelineConfig) -> Result<(DataFrame, InspectionReport)> {
    let gen_cfg = &config.generator;
    let raw = generate(gen_cfg).context("generating respondents")?;
    tracing::info!(seed = gen_cfg.seed, rows = raw.n_rows(), "generated survey table");

    let (mut frame, inspection) = inspect(&raw, &config.inspect).context("inspecting table")?;
    tracing::info!(
        skewed = inspection.skewed.len(),
        collinear = inspection.collinear.len(),
        added = ?inspection.added_columns,
        "inspection complete"
    );

    recode_factor(&mut frame, "num_child", CHILD_FACTOR)?;
    let threshold = gen_cfg.overall.child_threshold as f64;
    recode_threshold(&mut frame, "num_child", CHILD_FLAG, threshold)?;
    Ok((frame, inspection))
}

/// Run every stage on the configured dataset.
pub fn run_pipeline(config: &PipelineConfig) -> Result<PipelineReport> {
    let gen_cfg = &config.generator;
    let (frame, inspection) = prepare_frame(config)?;
    let recoded_columns = vec![CHILD_FACTOR.to_string(), CHILD_FLAG.to_string()];

    let log_distance = log_column_for(&config.inspect, &inspection, "distance");
    let models = model_sequence(&log_distance)?
        .into_iter()
        .map(|(name, spec)| {
            let fit = fit_ols(&frame, &spec).with_context(|| format!("fitting {name}: {spec}"))?;
            tracing::info!(model = %name, r2 = fit.r_squared, adj_r2 = fit.adj_r_squared, "fit");
            Ok(NamedFit { name, fit })
        })
        .collect::<Result<Vec<_>>>()?;

    let comparisons = models.windows(2).map(|w| compare(&w[0].fit, &w[1].fit)).collect();
    let nested: Vec<&OlsFit> = models.iter().take(3).map(|m| &m.fit).collect();
    let anova = anova_sequence(&nested)?;

    // Each candidate challenges the current pick.
    let mut selections = Vec::with_capacity(models.len() - 1);
    let mut best = 0;
    for k in 1..models.len() {
        let sel = select(&models[best].fit, &models[k].fit, config.alpha)?;
        if sel.choice == Choice::Second {
            best = k;
        }
        selections.push(sel);
    }
    let chosen = &models[best];
    tracing::info!(model = %chosen.name, formula = %chosen.fit.formula, "selected model");

    let standardized = fit_standardized(&frame, &chosen.fit.spec)?;
    let influence = influence(&chosen.fit)?;
    let vif = vif(&DesignMatrix::build(&frame, &chosen.fit.spec)?)?;

    let BayesFit { posterior, ols, .. } = fit_bayes(&frame, &chosen.fit.spec, &config.bayes)
        .with_context(|| format!("sampling posterior of {}", chosen.fit.formula))?;
    let ols_vs_bayes = compare_with_ols(&posterior, &ols)?;
    let chosen = chosen.name.clone();
    tracing::info!(
        chains = posterior.n_chains,
        draws = posterior.n_samples,
        quality = %posterior.quality.status,
        "posterior sampled"
    );

    Ok(PipelineReport {
        seed: gen_cfg.seed,
        n_respondents: gen_cfg.n_respondents,
        inspection,
        collinearity_threshold: config.inspect.collinearity_threshold,
        recoded_columns,
        chosen,
        models,
        comparisons,
        anova,
        selections,
        standardized,
        influence,
        vif,
        posterior,
        ols_vs_bayes,
        frame,
    })
}

/// Name of the log column the inspector appended for `source`, or `source`
/// itself when it was not transformed.
fn log_column_for(
    config: &sv_data::InspectConfig,
    report: &InspectionReport,
    source: &str,
) -> String {
    let target =
        config.log_names.get(source).cloned().unwrap_or_else(|| format!("log_{source}"));
    if report.added_columns.contains(&target) { target } else { source.to_string() }
}

/// Refit `spec` with every numeric or integer predictor z-scored.
pub fn fit_standardized(frame: &DataFrame, spec: &ModelSpec) -> Result<OlsFit> {
    let referenced = spec.referenced_columns();
    let mut columns = Vec::new();
    for name in referenced.iter().skip(1) {
        let kind = frame.column(name)?.kind();
        if matches!(kind, ColumnKind::Numeric | ColumnKind::Integer) {
            columns.push(name.as_str());
        }
    }
    let z = standardized(frame, &columns)?;
    Ok(fit_ols(&z, spec)?)
}

/// Write plot artifacts for a finished run into `dir`.
pub fn write_artifacts(report: &PipelineReport, dir: &Path) -> Result<Vec<String>> {
    std::fs::create_dir_all(dir).with_context(|| format!("creating {}", dir.display()))?;
    let fit = report
        .chosen_fit()
        .ok_or_else(|| anyhow::anyhow!("chosen model '{}' is missing", report.chosen))?;

    let mut written = Vec::new();
    let mut put = |name: String, value: serde_json::Value| -> Result<()> {
        let path = dir.join(&name);
        std::fs::write(&path, serde_json::to_string_pretty(&value)?)
            .with_context(|| format!("writing {}", path.display()))?;
        written.push(name);
        Ok(())
    };

    for column in ["distance", "overall"]
        .into_iter()
        .chain(report.inspection.added_columns.iter().map(String::as_str))
    {
        let art = sv_viz::histogram_artifact(&report.frame, column, None)?;
        put(format!("histogram_{column}.json"), serde_json::to_value(art)?)?;
    }

    let corr = sv_viz::corr_artifact(
        &report.inspection.correlation,
        &report.inspection.collinear,
        report.collinearity_threshold,
    )?;
    put("corr.json".to_string(), serde_json::to_value(corr)?)?;

    let resid = sv_viz::residuals_vs_fitted_artifact(fit)?;
    put("residuals_vs_fitted.json".to_string(), serde_json::to_value(resid)?)?;
    let qq = sv_viz::qq_artifact(fit, &report.influence)?;
    put("qq.json".to_string(), serde_json::to_value(qq)?)?;
    let lev = sv_viz::leverage_artifact(fit, &report.influence)?;
    put("leverage.json".to_string(), serde_json::to_value(lev)?)?;

    tracing::info!(dir = %dir.display(), files = written.len(), "artifacts written");
    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;
    use sv_inference::GibbsConfig;

    fn quick_config() -> PipelineConfig {
        let mut cfg = PipelineConfig::default();
        cfg.bayes = GibbsConfig { burn_in: 100, n_samples: 400, ..GibbsConfig::default() };
        cfg
    }

    #[test]
    fn test_model_sequence_refines_step_by_step() {
        let seq = model_sequence("logdist").unwrap();
        let formulas: Vec<String> = seq.iter().map(|(_, s)| s.to_string()).collect();
        assert_eq!(seq[0].0, "m1");
        assert_eq!(formulas[0], "overall ~ clean");
        assert_eq!(
            formulas[2],
            "overall ~ clean + aroma + value + color + logdist + num_child + promo"
        );
        assert!(formulas[3].contains("num_child_factor"));
        assert!(!formulas[4].contains("num_child_factor"));
        assert!(formulas[5].ends_with("value:more_than_2child"));
    }

    #[test]
    fn test_run_pipeline_reference_dataset() {
        let report = run_pipeline(&quick_config()).unwrap();
        assert_eq!(report.models.len(), 6);
        assert_eq!(report.selections.len(), 5);
        assert_eq!(report.anova.len(), 2);
        assert!(report.anova.iter().all(|a| a.p_value < 0.05));
        assert!(report.inspection.added_columns.contains(&"logdist".to_string()));

        let chosen = report.chosen_fit().unwrap();
        assert_eq!(chosen.formula, report.posterior.formula);
        assert!((chosen.r_squared - report.standardized.r_squared).abs() < 1e-10);
        assert_eq!(report.ols_vs_bayes.len(), chosen.n_params);
        assert_eq!(report.vif.len(), chosen.n_params - 1);
    }

    #[test]
    fn test_artifacts_written() {
        let report = run_pipeline(&quick_config()).unwrap();
        let dir = std::env::temp_dir().join(format!("survstat_artifacts_{}", std::process::id()));
        let files = write_artifacts(&report, &dir).unwrap();
        for f in ["corr.json", "qq.json", "leverage.json", "residuals_vs_fitted.json"] {
            assert!(files.contains(&f.to_string()), "{f} missing from {files:?}");
            assert!(dir.join(f).exists());
        }
        assert!(files.contains(&"histogram_logdist.json".to_string()));
        let _ = std::fs::remove_dir_all(&dir);
    }
}
