//! Histogram artifact for one numeric column.

use serde::Serialize;
use sv_core::{Error, Result};
use sv_data::DataFrame;
use sv_prob::math;

use crate::meta::ArtifactMeta;

/// Equal-width histogram.
#[derive(Debug, Clone, Serialize)]
pub struct HistogramArtifact {
    /// Artifact schema identifier.
    pub schema_version: String,
    /// Provenance.
    pub meta: ArtifactMeta,
    /// Column name.
    pub column: String,
    /// Number of values.
    pub n: usize,
    /// `counts.len() + 1` ascending edges; the last bin is closed.
    pub bin_edges: Vec<f64>,
    /// Count per bin.
    pub counts: Vec<usize>,
    /// Sample mean.
    pub mean: f64,
    /// Sample median.
    pub median: f64,
    /// Sample skewness.
    pub skewness: f64,
}

/// Sturges' rule: `ceil(log2 n) + 1`.
fn sturges(n: usize) -> usize {
    ((n as f64).log2().ceil() as usize + 1).max(1)
}

/// Histogram of `column`. `bins` defaults to Sturges' rule.
pub fn histogram_artifact(
    frame: &DataFrame,
    column: &str,
    bins: Option<usize>,
) -> Result<HistogramArtifact> {
    let xs = frame.numeric(column)?;
    if xs.is_empty() {
        return Err(Error::Validation(format!("column '{}' is empty", column)));
    }
    if xs.iter().any(|v| !v.is_finite()) {
        return Err(Error::Validation(format!("column '{}' has non-finite values", column)));
    }
    let k = bins.unwrap_or_else(|| sturges(xs.len()));
    if k == 0 {
        return Err(Error::Validation("histogram needs at least one bin".to_string()));
    }

    let lo = xs.iter().copied().fold(f64::INFINITY, f64::min);
    let hi = xs.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let (lo, hi) = if hi > lo { (lo, hi) } else { (lo - 0.5, hi + 0.5) };
    let width = (hi - lo) / k as f64;

    let bin_edges: Vec<f64> = (0..=k).map(|i| lo + width * i as f64).collect();
    let mut counts = vec![0usize; k];
    for &x in &xs {
        let b = (((x - lo) / width) as usize).min(k - 1);
        counts[b] += 1;
    }

    Ok(HistogramArtifact {
        schema_version: "survstat_histogram_v1".to_string(),
        meta: ArtifactMeta::now()?,
        column: column.to_string(),
        n: xs.len(),
        bin_edges,
        counts,
        mean: math::mean(&xs),
        median: math::quantile(&xs, 0.5),
        skewness: math::skewness(&xs),
    })
}
