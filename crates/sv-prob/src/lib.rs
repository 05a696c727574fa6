//! Probability building blocks for SurvStat.
//!
//! This crate hosts reusable math used by the inspector and the fitting code:
//! - descriptive statistics (moments, quantiles, Pearson correlation)
//! - reference distributions for inference (Normal, Student-t, Fisher F)

pub mod fisher;
pub mod math;
pub mod normal;
pub mod student_t;
