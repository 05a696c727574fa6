//! # sv-data
//!
//! The respondent table and everything that happens to it before modelling:
//! - [`frame`]: column-major, append-only [`DataFrame`]
//! - [`generator`]: seeded halo-effect survey simulation
//! - [`transform`]: log, standardization and recoding helpers
//! - [`inspect`]: summaries, correlations, skew and collinearity checks

#![warn(missing_docs)]
#![warn(clippy::all)]

/// Append-only column store.
pub mod frame;
/// Synthetic respondent generator.
pub mod generator;
/// Descriptive inspection of a table.
pub mod inspect;
/// Derived-column helpers.
pub mod transform;

pub use frame::{Column, ColumnKind, DataFrame};
pub use generator::{GeneratorConfig, ItemParams, OverallParams, generate};
pub use inspect::{
    CollinearPair, ColumnSummary, CorrelationMatrix, InspectConfig, InspectionReport, LevelSummary,
    NumericSummary, SkewFlag, collinearity_report, correlation_matrix, describe, inspect, skew_check,
    summarize,
};
pub use transform::{
    add_indicator_columns, add_log_column, recode_factor, recode_threshold, standardized,
};
