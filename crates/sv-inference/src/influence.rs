//! Residual diagnostics for a least-squares fit.

use nalgebra::{DMatrix, DVector};
use serde::Serialize;
use sv_core::{Error, Result};
use sv_prob::{math, normal};

use crate::design::DesignMatrix;
use crate::ols::{OlsFit, least_squares};

/// One point of a normal QQ plot.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct QqPoint {
    /// Standard normal quantile at the Blom plotting position.
    pub theoretical: f64,
    /// Sorted standardized residual.
    pub sample: f64,
}

/// Per-row influence measures.
#[derive(Debug, Clone, Serialize)]
pub struct Influence {
    /// Hat-matrix diagonal.
    pub leverage: Vec<f64>,
    /// Internally studentized residuals `e_i / (σ̂ sqrt(1 - h_i))`.
    pub studentized: Vec<f64>,
    /// Cook's distance.
    pub cooks_distance: Vec<f64>,
    /// Normal QQ pairs of the studentized residuals.
    pub qq: Vec<QqPoint>,
    /// Cook's distance cutoff `4 / n`.
    pub cooks_threshold: f64,
    /// Rows whose Cook's distance exceeds the cutoff.
    pub high_influence: Vec<usize>,
}

/// Leverage, studentized residuals, Cook's distance and QQ pairs for `fit`.
///
/// Rows with leverage 1 get NaN residual measures and are left out of the
/// QQ pairs.
pub fn influence(fit: &OlsFit) -> Result<Influence> {
    let n = fit.n_obs;
    let p = fit.n_params as f64;
    let sigma = fit.sigma;
    if !(sigma > 0.0) {
        return Err(Error::Computation("residual standard error is zero".to_string()));
    }

    let mut studentized = Vec::with_capacity(n);
    let mut cooks_distance = Vec::with_capacity(n);
    for (&e, &h) in fit.residuals.iter().zip(&fit.leverage) {
        let one_minus_h = 1.0 - h;
        if one_minus_h <= 1e-12 {
            studentized.push(f64::NAN);
            cooks_distance.push(f64::NAN);
            continue;
        }
        let r = e / (sigma * one_minus_h.sqrt());
        studentized.push(r);
        cooks_distance.push(r * r / p * h / one_minus_h);
    }

    let finite: Vec<f64> = studentized.iter().copied().filter(|v| v.is_finite()).collect();
    let sample = math::sorted(&finite);
    let theoretical = normal::blom_scores(sample.len())?;
    let qq = theoretical
        .into_iter()
        .zip(sample)
        .map(|(theoretical, sample)| QqPoint { theoretical, sample })
        .collect();

    let cooks_threshold = 4.0 / n as f64;
    let high_influence: Vec<usize> = cooks_distance
        .iter()
        .enumerate()
        .filter(|(_, d)| **d > cooks_threshold)
        .map(|(i, _)| i)
        .collect();
    if !high_influence.is_empty() {
        log::info!(
            "{}: {} rows with Cook's distance above {:.4}",
            fit.formula,
            high_influence.len(),
            cooks_threshold
        );
    }

    Ok(Influence {
        leverage: fit.leverage.clone(),
        studentized,
        cooks_distance,
        qq,
        cooks_threshold,
        high_influence,
    })
}

/// Variance inflation factor of every non-intercept design column.
///
/// `VIF_j = 1 / (1 - R²_j)` where `R²_j` comes from regressing column `j` on
/// all other columns (intercept included when the design has one).
pub fn vif(design: &DesignMatrix) -> Result<Vec<(String, f64)>> {
    let x = design.x();
    let (n, p) = x.shape();
    let first = usize::from(design.has_intercept());
    let mut out = Vec::with_capacity(p - first);

    for j in first..p {
        let label = design.labels()[j].clone();
        let others: Vec<usize> = (0..p).filter(|&k| k != j).collect();
        if others.is_empty() {
            out.push((label, 1.0));
            continue;
        }
        let target: DVector<f64> = x.column(j).into_owned();
        let sub = DMatrix::from_fn(n, others.len(), |i, k| x[(i, others[k])]);
        let sub_labels: Vec<String> = others.iter().map(|&k| design.labels()[k].clone()).collect();
        let ls = least_squares(&sub, &target, &sub_labels)?;

        let t: Vec<f64> = target.iter().copied().collect();
        let tss = if design.has_intercept() {
            math::centered_ss(&t)
        } else {
            t.iter().map(|v| v * v).sum()
        };
        let r2 = if tss > 0.0 { 1.0 - ls.rss / tss } else { 1.0 };
        let v = if r2 < 1.0 { 1.0 / (1.0 - r2) } else { f64::INFINITY };
        out.push((label, v));
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ols::fit_ols;
    use approx::assert_relative_eq;
    use sv_data::{Column, DataFrame};

    fn frame() -> DataFrame {
        DataFrame::new()
            .with_column("y", Column::numeric(vec![3.0, 5.0, 4.0, 8.0, 9.0, 7.0]))
            .unwrap()
            .with_column("x", Column::integer(vec![1, 2, 3, 4, 5, 6]))
            .unwrap()
    }

    #[test]
    fn test_cooks_distance_closed_form() {
        let fit = fit_ols(&frame(), &"y ~ x".parse().unwrap()).unwrap();
        let inf = influence(&fit).unwrap();
        let expected = [
            0.0894578313253013,
            0.03693334330748849,
            0.12553838936057915,
            0.12553838936057915,
            0.26610422698830377,
            1.2027108433734937,
        ];
        for (a, b) in inf.cooks_distance.iter().zip(expected) {
            assert_relative_eq!(*a, b, epsilon = 1e-9);
        }
        assert_relative_eq!(inf.cooks_threshold, 4.0 / 6.0);
        assert_eq!(inf.high_influence, vec![5]);
    }

    #[test]
    fn test_qq_pairs_sorted() {
        let fit = fit_ols(&frame(), &"y ~ x".parse().unwrap()).unwrap();
        let inf = influence(&fit).unwrap();
        assert_eq!(inf.qq.len(), 6);
        for w in inf.qq.windows(2) {
            assert!(w[0].theoretical < w[1].theoretical);
            assert!(w[0].sample <= w[1].sample);
        }
        assert_relative_eq!(inf.qq[0].theoretical, -inf.qq[5].theoretical, epsilon = 1e-12);
    }

    #[test]
    fn test_vif_orthogonal_and_correlated() {
        let df = DataFrame::new()
            .with_column("y", Column::numeric(vec![1.0, 3.0, 2.0, 5.0, 4.0, 6.0, 8.0, 7.0]))
            .unwrap()
            .with_column("a", Column::numeric(vec![1.0, -1.0, 1.0, -1.0, 1.0, -1.0, 1.0, -1.0]))
            .unwrap()
            .with_column("b", Column::numeric(vec![1.0, 1.0, -1.0, -1.0, 1.0, 1.0, -1.0, -1.0]))
            .unwrap()
            .with_column("c", Column::numeric(vec![1.1, 0.9, -0.8, -1.2, 1.0, 1.05, -0.9, -1.1]))
            .unwrap();
        let d = DesignMatrix::build(&df, &"y ~ a + b".parse().unwrap()).unwrap();
        let v = vif(&d).unwrap();
        assert_eq!(v.len(), 2);
        assert_relative_eq!(v[0].1, 1.0, epsilon = 1e-10);
        assert_relative_eq!(v[1].1, 1.0, epsilon = 1e-10);

        let d = DesignMatrix::build(&df, &"y ~ a + b + c".parse().unwrap()).unwrap();
        let v = vif(&d).unwrap();
        assert_eq!(v[2].0, "c");
        assert!(v[1].1 > 10.0 && v[2].1 > 10.0, "{:?}", v);
    }
}
