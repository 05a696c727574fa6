//! Column-major respondent table.
//!
//! A [`DataFrame`] only grows: columns can be appended but never replaced or
//! removed in place. Operations that rescale existing columns (see
//! [`crate::transform::standardized`]) build a new frame instead.

use serde::{Deserialize, Serialize};
use sv_core::{Error, Result};

/// Kind of a column, used for dispatch in the design-matrix builder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnKind {
    /// Real-valued.
    Numeric,
    /// Integer-valued (counts, floored scores).
    Integer,
    /// Two-valued flag.
    Boolean,
    /// Unordered factor with named levels.
    Categorical,
}

/// A single typed column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Column {
    /// Real-valued column.
    Numeric {
        /// Values, one per row.
        values: Vec<f64>,
    },
    /// Integer-valued column.
    Integer {
        /// Values, one per row.
        values: Vec<i64>,
    },
    /// Boolean column.
    Boolean {
        /// Values, one per row.
        values: Vec<bool>,
    },
    /// Categorical column. `codes[i]` indexes into `levels`; `levels[0]` is the
    /// reference level for dummy coding.
    Categorical {
        /// Level labels in coding order.
        levels: Vec<String>,
        /// Level index per row.
        codes: Vec<usize>,
    },
}

impl Column {
    /// Real-valued column.
    pub fn numeric(values: Vec<f64>) -> Self {
        Self::Numeric { values }
    }

    /// Integer-valued column.
    pub fn integer(values: Vec<i64>) -> Self {
        Self::Integer { values }
    }

    /// Boolean column.
    pub fn boolean(values: Vec<bool>) -> Self {
        Self::Boolean { values }
    }

    /// Categorical column from level labels and per-row codes.
    pub fn categorical(levels: Vec<String>, codes: Vec<usize>) -> Result<Self> {
        if levels.is_empty() {
            return Err(Error::Validation("categorical column needs at least one level".into()));
        }
        let mut seen = std::collections::HashSet::new();
        for l in &levels {
            if !seen.insert(l.as_str()) {
                return Err(Error::Validation(format!("duplicate categorical level '{}'", l)));
            }
        }
        if let Some(&bad) = codes.iter().find(|&&c| c >= levels.len()) {
            return Err(Error::Validation(format!(
                "categorical code {} out of range for {} levels",
                bad,
                levels.len()
            )));
        }
        Ok(Self::Categorical { levels, codes })
    }

    /// Categorical column from per-row labels, with levels in the given order.
    pub fn categorical_from_labels(levels: &[&str], labels: &[&str]) -> Result<Self> {
        let codes = labels
            .iter()
            .map(|lab| {
                levels.iter().position(|l| l == lab).ok_or_else(|| {
                    Error::Validation(format!("label '{}' is not one of {:?}", lab, levels))
                })
            })
            .collect::<Result<Vec<_>>>()?;
        Self::categorical(levels.iter().map(|s| s.to_string()).collect(), codes)
    }

    /// Number of rows.
    pub fn len(&self) -> usize {
        match self {
            Column::Numeric { values } => values.len(),
            Column::Integer { values } => values.len(),
            Column::Boolean { values } => values.len(),
            Column::Categorical { codes, .. } => codes.len(),
        }
    }

    /// Whether the column has no rows.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Column kind.
    pub fn kind(&self) -> ColumnKind {
        match self {
            Column::Numeric { .. } => ColumnKind::Numeric,
            Column::Integer { .. } => ColumnKind::Integer,
            Column::Boolean { .. } => ColumnKind::Boolean,
            Column::Categorical { .. } => ColumnKind::Categorical,
        }
    }

    /// Numeric view: numeric and integer columns as-is, booleans as 0/1.
    /// `None` for categorical columns.
    pub fn as_f64(&self) -> Option<Vec<f64>> {
        match self {
            Column::Numeric { values } => Some(values.clone()),
            Column::Integer { values } => Some(values.iter().map(|&v| v as f64).collect()),
            Column::Boolean { values } => {
                Some(values.iter().map(|&v| if v { 1.0 } else { 0.0 }).collect())
            }
            Column::Categorical { .. } => None,
        }
    }

    /// Per-level counts for boolean and categorical columns.
    pub fn level_counts(&self) -> Option<Vec<(String, usize)>> {
        match self {
            Column::Boolean { values } => {
                let t = values.iter().filter(|&&v| v).count();
                Some(vec![("false".to_string(), values.len() - t), ("true".to_string(), t)])
            }
            Column::Categorical { levels, codes } => {
                let mut counts = vec![0usize; levels.len()];
                for &c in codes {
                    counts[c] += 1;
                }
                Some(levels.iter().cloned().zip(counts).collect())
            }
            _ => None,
        }
    }
}

/// Append-only, column-major table with named columns of equal length.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DataFrame {
    names: Vec<String>,
    columns: Vec<Column>,
}

impl DataFrame {
    /// Empty frame.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of rows (0 for a frame with no columns).
    pub fn n_rows(&self) -> usize {
        self.columns.first().map(Column::len).unwrap_or(0)
    }

    /// Number of columns.
    pub fn n_cols(&self) -> usize {
        self.columns.len()
    }

    /// Column names in insertion order.
    pub fn names(&self) -> &[String] {
        &self.names
    }

    /// Whether a column exists.
    pub fn contains(&self, name: &str) -> bool {
        self.names.iter().any(|n| n == name)
    }

    /// Append a new column.
    ///
    /// Fails if the name is taken or the length does not match existing rows.
    pub fn add_column(&mut self, name: impl Into<String>, column: Column) -> Result<()> {
        let name = name.into();
        if name.is_empty() {
            return Err(Error::Validation("column name must be non-empty".into()));
        }
        if self.contains(&name) {
            return Err(Error::Validation(format!(
                "column '{}' already exists; columns are append-only",
                name
            )));
        }
        if !self.columns.is_empty() && column.len() != self.n_rows() {
            return Err(Error::Validation(format!(
                "column '{}' has {} rows, expected {}",
                name,
                column.len(),
                self.n_rows()
            )));
        }
        self.names.push(name);
        self.columns.push(column);
        Ok(())
    }

    /// Builder-style [`DataFrame::add_column`].
    pub fn with_column(mut self, name: impl Into<String>, column: Column) -> Result<Self> {
        self.add_column(name, column)?;
        Ok(self)
    }

    /// Look up a column by name.
    pub fn column(&self, name: &str) -> Result<&Column> {
        self.names
            .iter()
            .position(|n| n == name)
            .map(|i| &self.columns[i])
            .ok_or_else(|| Error::Validation(format!("column '{}' not found", name)))
    }

    /// Numeric view of a numeric, integer or boolean column.
    pub fn numeric(&self, name: &str) -> Result<Vec<f64>> {
        let col = self.column(name)?;
        col.as_f64().ok_or_else(|| {
            Error::Validation(format!("column '{}' is categorical, not numeric", name))
        })
    }

    /// Iterate `(name, column)` pairs in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Column)> {
        self.names.iter().map(String::as_str).zip(self.columns.iter())
    }

    /// Copy of this frame with the named numeric columns swapped for new
    /// values. Only [`crate::transform`] rescaling uses this; the receiver is
    /// left untouched.
    pub(crate) fn rebuilt_with(&self, replacements: &[(String, Vec<f64>)]) -> Result<Self> {
        let mut out = self.clone();
        for (name, values) in replacements {
            let idx = out
                .names
                .iter()
                .position(|n| n == name)
                .ok_or_else(|| Error::Validation(format!("column '{}' not found", name)))?;
            if values.len() != out.n_rows() {
                return Err(Error::Validation(format!(
                    "replacement for '{}' has {} rows, expected {}",
                    name,
                    values.len(),
                    out.n_rows()
                )));
            }
            out.columns[idx] = Column::numeric(values.clone());
        }
        Ok(out)
    }
}
