//! Descriptive inspection of a respondent table.
//!
//! The inspector reports; it never halts the pipeline. High pairwise
//! correlation is logged as a warning and returned for a human to judge.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use sv_core::{Error, Result};
use sv_prob::math::{mean, pearson, quantile_sorted, skewness, sorted, std_dev};

use crate::frame::{Column, ColumnKind, DataFrame};
use crate::transform::add_log_column;

/// Five-number summary plus moments of a numeric-like column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NumericSummary {
    /// Column name.
    pub name: String,
    /// Row count.
    pub count: usize,
    /// Minimum.
    pub min: f64,
    /// First quartile.
    pub q1: f64,
    /// Median.
    pub median: f64,
    /// Mean.
    pub mean: f64,
    /// Third quartile.
    pub q3: f64,
    /// Maximum.
    pub max: f64,
    /// Sample standard deviation.
    pub sd: f64,
    /// Moment skewness.
    pub skewness: f64,
}

/// Level counts of a boolean or categorical column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LevelSummary {
    /// Column name.
    pub name: String,
    /// `(level, count)` in level order.
    pub counts: Vec<(String, usize)>,
}

/// Summary of one column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ColumnSummary {
    /// Numeric or integer column.
    Numeric(NumericSummary),
    /// Boolean or categorical column.
    Levels(LevelSummary),
}

impl ColumnSummary {
    /// Column name.
    pub fn name(&self) -> &str {
        match self {
            ColumnSummary::Numeric(s) => &s.name,
            ColumnSummary::Levels(s) => &s.name,
        }
    }
}

fn numeric_summary(name: &str, xs: &[f64]) -> NumericSummary {
    let s = sorted(xs);
    NumericSummary {
        name: name.to_string(),
        count: xs.len(),
        min: s.first().copied().unwrap_or(f64::NAN),
        q1: quantile_sorted(&s, 0.25),
        median: quantile_sorted(&s, 0.5),
        mean: mean(xs),
        q3: quantile_sorted(&s, 0.75),
        max: s.last().copied().unwrap_or(f64::NAN),
        sd: std_dev(xs),
        skewness: skewness(xs),
    }
}

/// Summarize every column in insertion order.
pub fn summarize(frame: &DataFrame) -> Vec<ColumnSummary> {
    frame
        .iter()
        .map(|(name, col)| match col.kind() {
            ColumnKind::Numeric | ColumnKind::Integer => {
                let xs = col.as_f64().unwrap_or_default();
                ColumnSummary::Numeric(numeric_summary(name, &xs))
            }
            ColumnKind::Boolean | ColumnKind::Categorical => ColumnSummary::Levels(LevelSummary {
                name: name.to_string(),
                counts: col.level_counts().unwrap_or_default(),
            }),
        })
        .collect()
}

/// Symmetric Pearson correlation matrix.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CorrelationMatrix {
    /// Column names, row/column order of `values`.
    pub names: Vec<String>,
    /// `values[i][j] = corr(names[i], names[j])`.
    pub values: Vec<Vec<f64>>,
}

impl CorrelationMatrix {
    /// Correlation between two named columns.
    pub fn get(&self, a: &str, b: &str) -> Option<f64> {
        let i = self.names.iter().position(|n| n == a)?;
        let j = self.names.iter().position(|n| n == b)?;
        Some(self.values[i][j])
    }
}

/// Pearson correlations over the given columns, or over every numeric-like
/// column when `columns` is `None`.
pub fn correlation_matrix(frame: &DataFrame, columns: Option<&[&str]>) -> Result<CorrelationMatrix> {
    let names: Vec<String> = match columns {
        Some(cols) => cols.iter().map(|s| s.to_string()).collect(),
        None => frame
            .iter()
            .filter(|(_, c)| c.kind() != ColumnKind::Categorical)
            .map(|(n, _)| n.to_string())
            .collect(),
    };
    if names.is_empty() {
        return Err(Error::Validation("correlation matrix needs at least one column".into()));
    }
    let data = names.iter().map(|n| frame.numeric(n)).collect::<Result<Vec<_>>>()?;
    let k = names.len();
    let mut values = vec![vec![1.0; k]; k];
    for i in 0..k {
        for j in (i + 1)..k {
            let r = pearson(&data[i], &data[j]);
            values[i][j] = r;
            values[j][i] = r;
        }
    }
    Ok(CorrelationMatrix { names, values })
}

/// A column whose absolute skewness exceeded the threshold.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkewFlag {
    /// Column name.
    pub column: String,
    /// Sample skewness.
    pub skewness: f64,
}

/// Flag numeric and integer columns with `|skewness| > threshold`.
pub fn skew_check(frame: &DataFrame, threshold: f64) -> Vec<SkewFlag> {
    frame
        .iter()
        .filter(|(_, c)| matches!(c.kind(), ColumnKind::Numeric | ColumnKind::Integer))
        .filter_map(|(name, col)| {
            let g = skewness(&col.as_f64()?);
            (g.abs() > threshold).then(|| SkewFlag { column: name.to_string(), skewness: g })
        })
        .collect()
}

/// A pair of columns with `|r|` above the collinearity threshold.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CollinearPair {
    /// First column.
    pub a: String,
    /// Second column.
    pub b: String,
    /// Pearson correlation.
    pub r: f64,
}

/// List pairs with `|r| > threshold` (upper triangle only). Each pair is also
/// logged at warn level.
pub fn collinearity_report(corr: &CorrelationMatrix, threshold: f64) -> Vec<CollinearPair> {
    let mut out = Vec::new();
    let k = corr.names.len();
    for i in 0..k {
        for j in (i + 1)..k {
            let r = corr.values[i][j];
            if r.abs() > threshold {
                log::warn!(
                    "high correlation between '{}' and '{}': r = {:.3} (threshold {})",
                    corr.names[i],
                    corr.names[j],
                    r,
                    threshold
                );
                out.push(CollinearPair { a: corr.names[i].clone(), b: corr.names[j].clone(), r });
            }
        }
    }
    out
}

/// Inspector policy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InspectConfig {
    /// Absolute skewness above which a column is flagged.
    pub skew_threshold: f64,
    /// Absolute correlation above which a pair is reported.
    pub collinearity_threshold: f64,
    /// Log-transform flagged columns (strictly positive ones only).
    pub log_transform: bool,
    /// Output names for log columns; unlisted sources get `log_{source}`.
    pub log_names: BTreeMap<String, String>,
}

impl Default for InspectConfig {
    fn default() -> Self {
        let mut log_names = BTreeMap::new();
        log_names.insert("distance".to_string(), "logdist".to_string());
        Self { skew_threshold: 1.0, collinearity_threshold: 0.8, log_transform: true, log_names }
    }
}

/// Everything the inspector found.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InspectionReport {
    /// Per-column summaries of the input table.
    pub summaries: Vec<ColumnSummary>,
    /// Correlations over the numeric-like columns of the output table.
    pub correlation: CorrelationMatrix,
    /// Columns flagged as skewed.
    pub skewed: Vec<SkewFlag>,
    /// Highly correlated pairs.
    pub collinear: Vec<CollinearPair>,
    /// Columns appended by the inspector, in order.
    pub added_columns: Vec<String>,
}

/// Run the inspector: summarize, flag skew, append log columns, then correlate.
///
/// Returns the extended table and the report. The input table is not modified.
pub fn inspect(frame: &DataFrame, config: &InspectConfig) -> Result<(DataFrame, InspectionReport)> {
    let summaries = summarize(frame);
    let skewed = skew_check(frame, config.skew_threshold);

    let mut out = frame.clone();
    let mut added_columns = Vec::new();
    if config.log_transform {
        for flag in &skewed {
            let target = config
                .log_names
                .get(&flag.column)
                .cloned()
                .unwrap_or_else(|| format!("log_{}", flag.column));
            if out.contains(&target) {
                continue;
            }
            match add_log_column(&mut out, &flag.column, &target) {
                Ok(()) => {
                    log::info!(
                        "'{}' is skewed ({:.2}); added '{}'",
                        flag.column,
                        flag.skewness,
                        target
                    );
                    added_columns.push(target);
                }
                Err(e) => log::warn!("skipping log transform of '{}': {}", flag.column, e),
            }
        }
    }

    let correlation = correlation_matrix(&out, None)?;
    let collinear = collinearity_report(&correlation, config.collinearity_threshold);

    Ok((out, InspectionReport { summaries, correlation, skewed, collinear, added_columns }))
}

/// Numeric summary for one column, looked up by name.
pub fn describe(frame: &DataFrame, name: &str) -> Result<NumericSummary> {
    let col = frame.column(name)?;
    match col {
        Column::Categorical { .. } => {
            Err(Error::Validation(format!("column '{}' is categorical", name)))
        }
        _ => Ok(numeric_summary(name, &frame.numeric(name)?)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generator::{GeneratorConfig, generate};
    use approx::assert_relative_eq;

    #[test]
    fn test_summarize_kinds() {
        let df = generate(&GeneratorConfig::with_seed(1, 100)).unwrap();
        let s = summarize(&df);
        assert_eq!(s.len(), df.n_cols());
        match &s[0] {
            ColumnSummary::Levels(l) => {
                assert_eq!(l.name, "promo");
                assert_eq!(l.counts.iter().map(|(_, c)| c).sum::<usize>(), 100);
            }
            other => panic!("promo should summarize as levels: {:?}", other),
        }
        match &s[2] {
            ColumnSummary::Numeric(n) => {
                assert_eq!(n.name, "distance");
                assert!(n.min <= n.q1 && n.q1 <= n.median && n.median <= n.q3 && n.q3 <= n.max);
            }
            other => panic!("distance should summarize as numeric: {:?}", other),
        }
    }

    #[test]
    fn test_correlation_matrix_symmetric_unit_diagonal() {
        let df = generate(&GeneratorConfig::with_seed(2, 200)).unwrap();
        let c = correlation_matrix(&df, None).unwrap();
        assert!(!c.names.contains(&"promo".to_string()));
        for i in 0..c.names.len() {
            assert_relative_eq!(c.values[i][i], 1.0);
            for j in 0..c.names.len() {
                assert_relative_eq!(c.values[i][j], c.values[j][i]);
            }
        }
        assert!(correlation_matrix(&df, Some(&["promo"])).is_err());
    }

    #[test]
    fn test_inspect_adds_logdist() {
        let df = generate(&GeneratorConfig::with_seed(555, 500)).unwrap();
        let (out, report) = inspect(&df, &InspectConfig::default()).unwrap();
        assert!(report.skewed.iter().any(|f| f.column == "distance"));
        assert_eq!(report.added_columns, vec!["logdist".to_string()]);
        assert!(out.contains("logdist"));
        assert!(!df.contains("logdist"));
        let logdist = describe(&out, "logdist").unwrap();
        assert!(logdist.skewness.abs() < 1.0);
        assert!(report.correlation.get("logdist", "overall").is_some());
    }

    #[test]
    fn test_collinearity_threshold() {
        let corr = CorrelationMatrix {
            names: vec!["a".into(), "b".into(), "c".into()],
            values: vec![vec![1.0, 0.9, 0.1], vec![0.9, 1.0, -0.85], vec![0.1, -0.85, 1.0]],
        };
        let pairs = collinearity_report(&corr, 0.8);
        assert_eq!(pairs.len(), 2);
        assert_eq!((pairs[1].a.as_str(), pairs[1].b.as_str()), ("b", "c"));
        assert!(collinearity_report(&corr, 0.95).is_empty());
    }
}
