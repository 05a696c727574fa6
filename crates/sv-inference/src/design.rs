//! Model formulas and the design-matrix builder.
//!
//! A [`ModelSpec`] only lists terms. All expansion (dummy coding of
//! categorical columns, boolean indicators, interaction products) happens in
//! [`DesignMatrix::build`], driven by the kind of each referenced column.

use std::fmt;
use std::str::FromStr;

use nalgebra::{DMatrix, DVector};
use serde::{Deserialize, Serialize};
use sv_core::{Error, Result};
use sv_data::{Column, DataFrame};

/// Label of the intercept column.
pub const INTERCEPT: &str = "(Intercept)";

/// One right-hand-side term of a model formula.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Term {
    /// A single column, expanded according to its kind.
    Column(String),
    /// Product of two columns' expansions.
    Interaction(String, String),
}

impl Term {
    /// Single-column term.
    pub fn column(name: impl Into<String>) -> Self {
        Term::Column(name.into())
    }

    /// Two-way interaction term.
    pub fn interaction(a: impl Into<String>, b: impl Into<String>) -> Self {
        Term::Interaction(a.into(), b.into())
    }

    /// Formula label: `name` or `a:b`.
    pub fn label(&self) -> String {
        match self {
            Term::Column(name) => name.clone(),
            Term::Interaction(a, b) => format!("{}:{}", a, b),
        }
    }
}

impl fmt::Display for Term {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.label())
    }
}

/// Outcome, ordered term list and intercept flag.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelSpec {
    /// Outcome column.
    pub outcome: String,
    /// Right-hand-side terms in design order.
    pub terms: Vec<Term>,
    /// Whether to prepend an intercept column.
    pub intercept: bool,
}

impl ModelSpec {
    /// Model with an intercept and the given terms.
    pub fn new(outcome: impl Into<String>, terms: Vec<Term>) -> Self {
        Self { outcome: outcome.into(), terms, intercept: true }
    }

    /// Shorthand for a main-effects model over plain columns.
    pub fn main_effects(outcome: impl Into<String>, columns: &[&str]) -> Self {
        Self::new(outcome, columns.iter().map(|c| Term::column(*c)).collect())
    }

    /// Drop the intercept.
    pub fn without_intercept(mut self) -> Self {
        self.intercept = false;
        self
    }

    /// Copy with `term` appended (no-op if already present).
    pub fn with_term(&self, term: Term) -> Self {
        let mut out = self.clone();
        if !out.terms.contains(&term) {
            out.terms.push(term);
        }
        out
    }

    /// Copy without the term whose label is `label`.
    pub fn without_term(&self, label: &str) -> Result<Self> {
        let idx = self.term_position(label)?;
        let mut out = self.clone();
        out.terms.remove(idx);
        Ok(out)
    }

    /// Copy with the term labelled `label` replaced in place by `term`.
    pub fn replace_term(&self, label: &str, term: Term) -> Result<Self> {
        let idx = self.term_position(label)?;
        let mut out = self.clone();
        out.terms[idx] = term;
        Ok(out)
    }

    /// Column names referenced by the formula, outcome first, without
    /// duplicates.
    pub fn referenced_columns(&self) -> Vec<String> {
        let mut out = vec![self.outcome.clone()];
        let mut push = |name: &String| {
            if !out.contains(name) {
                out.push(name.clone());
            }
        };
        for term in &self.terms {
            match term {
                Term::Column(name) => push(name),
                Term::Interaction(a, b) => {
                    push(a);
                    push(b);
                }
            }
        }
        out
    }

    fn term_position(&self, label: &str) -> Result<usize> {
        self.terms.iter().position(|t| t.label() == label).ok_or_else(|| {
            Error::Validation(format!("term '{}' is not in model '{}'", label, self))
        })
    }
}

impl fmt::Display for ModelSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ~ ", self.outcome)?;
        let mut parts: Vec<String> = Vec::with_capacity(self.terms.len() + 1);
        if !self.intercept {
            parts.push("0".to_string());
        } else if self.terms.is_empty() {
            parts.push("1".to_string());
        }
        parts.extend(self.terms.iter().map(Term::label));
        f.write_str(&parts.join(" + "))
    }
}

fn check_name(name: &str, formula: &str) -> Result<String> {
    let name = name.trim();
    let valid = !name.is_empty()
        && name.chars().all(|c| c.is_alphanumeric() || c == '_' || c == '.');
    if !valid {
        return Err(Error::Validation(format!(
            "invalid column name '{}' in formula '{}'",
            name, formula
        )));
    }
    Ok(name.to_string())
}

impl FromStr for ModelSpec {
    type Err = Error;

    /// Parse `"y ~ a + b + a:b"`. `a*b` is shorthand for `a + b + a:b`;
    /// a `0` term drops the intercept, a `1` term keeps it.
    fn from_str(s: &str) -> Result<Self> {
        let (lhs, rhs) = s
            .split_once('~')
            .ok_or_else(|| Error::Validation(format!("formula '{}' has no '~'", s)))?;
        let mut spec = ModelSpec::new(check_name(lhs, s)?, Vec::new());
        for piece in rhs.split('+') {
            let piece = piece.trim();
            match piece {
                "1" => spec.intercept = true,
                "0" | "-1" => spec.intercept = false,
                _ if piece.contains('*') => {
                    let (a, b) = split_pair(piece, '*', s)?;
                    spec = spec
                        .with_term(Term::Column(a.clone()))
                        .with_term(Term::Column(b.clone()))
                        .with_term(Term::Interaction(a, b));
                }
                _ if piece.contains(':') => {
                    let (a, b) = split_pair(piece, ':', s)?;
                    spec = spec.with_term(Term::Interaction(a, b));
                }
                _ => spec = spec.with_term(Term::Column(check_name(piece, s)?)),
            }
        }
        Ok(spec)
    }
}

fn split_pair(piece: &str, sep: char, formula: &str) -> Result<(String, String)> {
    let parts: Vec<&str> = piece.split(sep).collect();
    if parts.len() != 2 {
        return Err(Error::Validation(format!(
            "only two-way interactions are supported, got '{}' in '{}'",
            piece, formula
        )));
    }
    Ok((check_name(parts[0], formula)?, check_name(parts[1], formula)?))
}

/// Expanded columns of one column reference: `(label, values)` pairs.
fn expand_column(frame: &DataFrame, name: &str) -> Result<Vec<(String, Vec<f64>)>> {
    let expanded = match frame.column(name)? {
        Column::Numeric { values } => {
            if let Some(row) = values.iter().position(|v| !v.is_finite()) {
                return Err(Error::Validation(format!(
                    "column '{}' has a non-finite value at row {}",
                    name, row
                )));
            }
            vec![(name.to_string(), values.clone())]
        }
        Column::Integer { values } => {
            vec![(name.to_string(), values.iter().map(|&v| v as f64).collect())]
        }
        Column::Boolean { values } => vec![(
            format!("{}[true]", name),
            values.iter().map(|&v| if v { 1.0 } else { 0.0 }).collect(),
        )],
        Column::Categorical { levels, codes } => {
            if levels.len() < 2 {
                return Err(Error::Validation(format!(
                    "categorical column '{}' needs at least two levels, has {}",
                    name,
                    levels.len()
                )));
            }
            levels
                .iter()
                .enumerate()
                .skip(1)
                .map(|(k, level)| {
                    let ind = codes.iter().map(|&c| if c == k { 1.0 } else { 0.0 }).collect();
                    (format!("{}[{}]", name, level), ind)
                })
                .collect()
        }
    };
    Ok(expanded)
}

fn expand_term(frame: &DataFrame, term: &Term) -> Result<Vec<(String, Vec<f64>)>> {
    match term {
        Term::Column(name) => expand_column(frame, name),
        Term::Interaction(a, b) => {
            if a == b {
                return Err(Error::Validation(format!("interaction '{}' repeats a column", term)));
            }
            let left = expand_column(frame, a)?;
            let right = expand_column(frame, b)?;
            let mut out = Vec::with_capacity(left.len() * right.len());
            for (la, va) in &left {
                for (lb, vb) in &right {
                    let prod = va.iter().zip(vb).map(|(x, y)| x * y).collect();
                    out.push((format!("{}:{}", la, lb), prod));
                }
            }
            Ok(out)
        }
    }
}

/// Predictor block of a design: matrix, column labels and the term index
/// each column came from (`None` for the intercept).
pub(crate) struct Predictors {
    pub(crate) x: DMatrix<f64>,
    pub(crate) labels: Vec<String>,
    pub(crate) term_of: Vec<Option<usize>>,
}

pub(crate) fn build_predictors(frame: &DataFrame, spec: &ModelSpec) -> Result<Predictors> {
    let n = frame.n_rows();
    if n == 0 {
        return Err(Error::Validation("cannot build a design from an empty frame".into()));
    }

    let mut labels = Vec::new();
    let mut term_of = Vec::new();
    let mut columns: Vec<Vec<f64>> = Vec::new();
    if spec.intercept {
        labels.push(INTERCEPT.to_string());
        term_of.push(None);
        columns.push(vec![1.0; n]);
    }
    for (t, term) in spec.terms.iter().enumerate() {
        for (label, values) in expand_term(frame, term)? {
            if labels.contains(&label) {
                return Err(Error::Validation(format!(
                    "duplicate design column '{}' in '{}'",
                    label, spec
                )));
            }
            labels.push(label);
            term_of.push(Some(t));
            columns.push(values);
        }
    }
    if columns.is_empty() {
        return Err(Error::Validation(format!("model '{}' has no design columns", spec)));
    }

    let p = columns.len();
    let x = DMatrix::from_fn(n, p, |i, j| columns[j][i]);
    Ok(Predictors { x, labels, term_of })
}

/// Dense `n x p` design matrix plus outcome vector.
#[derive(Debug, Clone)]
pub struct DesignMatrix {
    x: DMatrix<f64>,
    y: DVector<f64>,
    labels: Vec<String>,
    term_of: Vec<Option<usize>>,
    spec: ModelSpec,
}

impl DesignMatrix {
    /// Build the design for `spec` from the columns of `frame`.
    ///
    /// Column order: intercept (if any), then each term's expansion in term
    /// order. Categorical columns with `k` levels contribute `k - 1`
    /// indicators against the first level; boolean columns one indicator;
    /// interactions the a-major products of both expansions.
    pub fn build(frame: &DataFrame, spec: &ModelSpec) -> Result<Self> {
        let y = frame.numeric(&spec.outcome)?;
        if let Some(row) = y.iter().position(|v| !v.is_finite()) {
            return Err(Error::Validation(format!(
                "outcome '{}' has a non-finite value at row {}",
                spec.outcome, row
            )));
        }
        let Predictors { x, labels, term_of } = build_predictors(frame, spec)?;
        Ok(Self { x, y: DVector::from_vec(y), labels, term_of, spec: spec.clone() })
    }

    /// Predictor matrix.
    pub fn x(&self) -> &DMatrix<f64> {
        &self.x
    }

    /// Outcome vector.
    pub fn y(&self) -> &DVector<f64> {
        &self.y
    }

    /// Column labels, e.g. `(Intercept)`, `clean`, `promo[yes]`.
    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    /// Formula this design was built from.
    pub fn spec(&self) -> &ModelSpec {
        &self.spec
    }

    /// Number of rows.
    pub fn n_rows(&self) -> usize {
        self.x.nrows()
    }

    /// Number of columns.
    pub fn n_cols(&self) -> usize {
        self.x.ncols()
    }

    /// Whether the first column is the intercept.
    pub fn has_intercept(&self) -> bool {
        self.spec.intercept
    }

    /// Formula term that produced column `j`.
    pub fn term_label(&self, j: usize) -> String {
        match self.term_of.get(j).copied().flatten() {
            Some(t) => self.spec.terms[t].label(),
            None => INTERCEPT.to_string(),
        }
    }

    /// Index of a column by label.
    pub fn column_index(&self, label: &str) -> Option<usize> {
        self.labels.iter().position(|l| l == label)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame() -> DataFrame {
        DataFrame::new()
            .with_column("y", Column::numeric(vec![3.0, 5.0, 4.0, 8.0, 9.0, 7.0]))
            .unwrap()
            .with_column("x", Column::integer(vec![1, 2, 3, 4, 5, 6]))
            .unwrap()
            .with_column("b", Column::boolean(vec![false, true, false, true, true, false]))
            .unwrap()
            .with_column(
                "g",
                Column::categorical_from_labels(&["lo", "mid", "hi"], &[
                    "lo", "mid", "hi", "hi", "mid", "lo",
                ])
                .unwrap(),
            )
            .unwrap()
    }

    #[test]
    fn test_parse_and_display() {
        let spec: ModelSpec = "overall ~ clean + aroma + value:more_than_2child".parse().unwrap();
        assert_eq!(spec.outcome, "overall");
        assert!(spec.intercept);
        assert_eq!(spec.terms, vec![
            Term::column("clean"),
            Term::column("aroma"),
            Term::interaction("value", "more_than_2child"),
        ]);
        assert_eq!(spec.to_string(), "overall ~ clean + aroma + value:more_than_2child");
        let again: ModelSpec = spec.to_string().parse().unwrap();
        assert_eq!(again, spec);
    }

    #[test]
    fn test_parse_star_and_no_intercept() {
        let spec: ModelSpec = "y ~ 0 + a*b".parse().unwrap();
        assert!(!spec.intercept);
        assert_eq!(spec.terms, vec![
            Term::column("a"),
            Term::column("b"),
            Term::interaction("a", "b"),
        ]);
        assert_eq!(spec.to_string(), "y ~ 0 + a + b + a:b");
    }

    #[test]
    fn test_parse_errors() {
        assert!("y = x".parse::<ModelSpec>().is_err());
        assert!("y ~ x +".parse::<ModelSpec>().is_err());
        assert!("y ~ a:b:c".parse::<ModelSpec>().is_err());
        assert!(" ~ x".parse::<ModelSpec>().is_err());
    }

    #[test]
    fn test_refinement_helpers() {
        let base = ModelSpec::main_effects("y", &["x", "b"]);
        let grown = base.with_term(Term::column("g"));
        assert_eq!(grown.to_string(), "y ~ x + b + g");
        assert_eq!(base.to_string(), "y ~ x + b");
        assert_eq!(grown.with_term(Term::column("g")), grown);

        let swapped = grown.replace_term("x", Term::interaction("x", "b")).unwrap();
        assert_eq!(swapped.to_string(), "y ~ x:b + b + g");
        let dropped = swapped.without_term("b").unwrap();
        assert_eq!(dropped.to_string(), "y ~ x:b + g");
        assert!(dropped.without_term("b").is_err());
        assert_eq!(dropped.referenced_columns(), vec!["y", "x", "b", "g"]);
    }

    #[test]
    fn test_build_expands_kinds() {
        let spec: ModelSpec = "y ~ x + b + g + x:g".parse().unwrap();
        let d = DesignMatrix::build(&frame(), &spec).unwrap();
        assert_eq!(d.labels(), &[
            "(Intercept)",
            "x",
            "b[true]",
            "g[mid]",
            "g[hi]",
            "x:g[mid]",
            "x:g[hi]",
        ]);
        assert_eq!(d.n_rows(), 6);
        assert_eq!(d.n_cols(), 7);
        let x = d.x();
        assert_eq!(x[(1, 2)], 1.0);
        assert_eq!(x[(2, 4)], 1.0);
        assert_eq!(x[(2, 3)], 0.0);
        // row 4 is "mid" with x = 5
        assert_eq!(x[(4, 5)], 5.0);
        assert_eq!(x[(4, 6)], 0.0);
        assert_eq!(d.term_label(0), INTERCEPT);
        assert_eq!(d.term_label(6), "x:g");
        assert_eq!(d.y()[3], 8.0);
    }

    #[test]
    fn test_k_levels_give_k_minus_one_columns() {
        let spec = ModelSpec::main_effects("y", &["g"]);
        let d = DesignMatrix::build(&frame(), &spec).unwrap();
        assert_eq!(d.n_cols(), 1 + 2);
        let no_int = DesignMatrix::build(&frame(), &spec.clone().without_intercept()).unwrap();
        assert_eq!(no_int.n_cols(), 2);
    }

    #[test]
    fn test_build_rejects_bad_designs() {
        let df = frame();
        let dup = ModelSpec::new("y", vec![Term::column("x"), Term::column("x")]);
        let err = DesignMatrix::build(&df, &dup).unwrap_err();
        assert!(err.to_string().contains("duplicate"));
        assert!(DesignMatrix::build(&df, &ModelSpec::main_effects("y", &["missing"])).is_err());
        assert!(DesignMatrix::build(&df, &ModelSpec::main_effects("g", &["x"])).is_err());
        assert!(
            DesignMatrix::build(&df, &ModelSpec::new("y", vec![Term::interaction("x", "x")]))
                .is_err()
        );
        let empty = ModelSpec::new("y", vec![]).without_intercept();
        assert!(DesignMatrix::build(&df, &empty).is_err());
    }
}
