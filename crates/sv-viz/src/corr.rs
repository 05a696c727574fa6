//! Correlation heatmap artifact (numbers-first).

use serde::Serialize;
use sv_core::{Error, Result};
use sv_data::{CollinearPair, CorrelationMatrix};

use crate::meta::ArtifactMeta;

/// Square correlation matrix plus the pairs flagged as collinear.
#[derive(Debug, Clone, Serialize)]
pub struct CorrArtifact {
    /// Artifact schema identifier.
    pub schema_version: String,
    /// Provenance.
    pub meta: ArtifactMeta,
    /// Row/column labels.
    pub names: Vec<String>,
    /// `corr[i][j]`, NaN rendered as `null`.
    pub corr: Vec<Vec<Option<f64>>>,
    /// Threshold used to flag pairs.
    pub threshold: f64,
    /// Flagged pairs as `[row, col]` indices into `names`.
    pub flagged: Vec<[usize; 2]>,
}

/// Build a heatmap artifact from an inspector correlation matrix.
pub fn corr_artifact(
    corr: &CorrelationMatrix,
    collinear: &[CollinearPair],
    threshold: f64,
) -> Result<CorrArtifact> {
    let n = corr.names.len();
    if corr.values.len() != n || corr.values.iter().any(|row| row.len() != n) {
        return Err(Error::Validation(format!(
            "correlation matrix is not {}x{} as its labels imply",
            n, n
        )));
    }

    let index = |name: &str| {
        corr.names.iter().position(|c| c == name).ok_or_else(|| {
            Error::Validation(format!("collinear pair names unknown column '{}'", name))
        })
    };
    let flagged = collinear
        .iter()
        .map(|p| Ok([index(&p.a)?, index(&p.b)?]))
        .collect::<Result<Vec<_>>>()?;

    let values = corr
        .values
        .iter()
        .map(|row| row.iter().map(|&v| v.is_finite().then_some(v)).collect())
        .collect();

    Ok(CorrArtifact {
        schema_version: "survstat_corr_v1".to_string(),
        meta: ArtifactMeta::now()?,
        names: corr.names.clone(),
        corr: values,
        threshold,
        flagged,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn matrix() -> CorrelationMatrix {
        CorrelationMatrix {
            names: vec!["clean".into(), "color".into(), "flat".into()],
            values: vec![
                vec![1.0, 0.85, f64::NAN],
                vec![0.85, 1.0, f64::NAN],
                vec![f64::NAN, f64::NAN, f64::NAN],
            ],
        }
    }

    #[test]
    fn test_flags_and_nan() {
        let pairs = vec![CollinearPair { a: "clean".into(), b: "color".into(), r: 0.85 }];
        let art = corr_artifact(&matrix(), &pairs, 0.8).unwrap();
        assert_eq!(art.flagged, vec![[0, 1]]);
        assert_eq!(art.corr[0][1], Some(0.85));
        assert_eq!(art.corr[2][0], None);
        assert_eq!(art.meta.tool, "survstat");
    }

    #[test]
    fn test_unknown_pair_rejected() {
        let pairs = vec![CollinearPair { a: "clean".into(), b: "aroma".into(), r: 0.9 }];
        assert!(corr_artifact(&matrix(), &pairs, 0.8).is_err());
    }
}
