//! Derived-column helpers: log transform, standardization and recoding.
//!
//! All helpers either append a new column or return a new frame; none of
//! them mutate an existing column.

use std::collections::BTreeSet;

use sv_core::{Error, Result};
use sv_prob::math::{mean, std_dev};

use crate::frame::{Column, DataFrame};

/// Append `target = ln(source)`.
///
/// Fails if any source value is not strictly positive.
pub fn add_log_column(frame: &mut DataFrame, source: &str, target: &str) -> Result<()> {
    let xs = frame.numeric(source)?;
    if let Some((row, v)) = xs.iter().enumerate().find(|(_, v)| !(**v > 0.0)) {
        return Err(Error::Validation(format!(
            "cannot log-transform '{}': row {} has non-positive value {}",
            source, row, v
        )));
    }
    frame.add_column(target, Column::numeric(xs.iter().map(|x| x.ln()).collect()))
}

/// New frame in which each listed column is replaced by its z-score
/// `(x - mean) / sd`. The input frame is not modified.
pub fn standardized(frame: &DataFrame, columns: &[&str]) -> Result<DataFrame> {
    let mut replacements = Vec::with_capacity(columns.len());
    for &name in columns {
        let xs = frame.numeric(name)?;
        let m = mean(&xs);
        let sd = std_dev(&xs);
        if !sd.is_finite() || sd <= 0.0 {
            return Err(Error::Validation(format!(
                "cannot standardize '{}': standard deviation is {}",
                name, sd
            )));
        }
        replacements.push((name.to_string(), xs.iter().map(|x| (x - m) / sd).collect()));
    }
    frame.rebuilt_with(&replacements)
}

/// Append a categorical recoding of an integer column. Levels are the sorted
/// distinct values; the smallest is the reference level.
pub fn recode_factor(frame: &mut DataFrame, source: &str, target: &str) -> Result<()> {
    let values = match frame.column(source)? {
        Column::Integer { values } => values.clone(),
        other => {
            return Err(Error::Validation(format!(
                "recode_factor needs an integer column, '{}' is {:?}",
                source,
                other.kind()
            )));
        }
    };
    let distinct: Vec<i64> = values.iter().copied().collect::<BTreeSet<_>>().into_iter().collect();
    let codes = values
        .iter()
        .map(|v| distinct.binary_search(v).map_err(|_| Error::Computation("level lookup failed".into())))
        .collect::<Result<Vec<_>>>()?;
    let levels = distinct.iter().map(|v| v.to_string()).collect();
    frame.add_column(target, Column::categorical(levels, codes)?)
}

/// Append a boolean column `source > threshold`.
pub fn recode_threshold(frame: &mut DataFrame, source: &str, target: &str, threshold: f64) -> Result<()> {
    let xs = frame.numeric(source)?;
    frame.add_column(target, Column::boolean(xs.iter().map(|&x| x > threshold).collect()))
}

/// Append one boolean indicator per non-reference level of a categorical
/// column, named `{prefix}{level}`. Returns the names added.
///
/// This is the hand-built counterpart of the builder's automatic dummy
/// expansion; both parameterize the same column space.
pub fn add_indicator_columns(frame: &mut DataFrame, source: &str, prefix: &str) -> Result<Vec<String>> {
    let (levels, codes) = match frame.column(source)? {
        Column::Categorical { levels, codes } => (levels.clone(), codes.clone()),
        other => {
            return Err(Error::Validation(format!(
                "add_indicator_columns needs a categorical column, '{}' is {:?}",
                source,
                other.kind()
            )));
        }
    };
    let mut added = Vec::with_capacity(levels.len().saturating_sub(1));
    for (k, level) in levels.iter().enumerate().skip(1) {
        let name = format!("{}{}", prefix, level);
        frame.add_column(name.clone(), Column::boolean(codes.iter().map(|&c| c == k).collect()))?;
        added.push(name);
    }
    Ok(added)
}
