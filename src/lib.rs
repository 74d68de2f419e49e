//! # u-examine
//!
//! Weighted descriptive and exploratory statistics for one numeric column.
//!
//! This crate computes the DESCRIPTIVES, FREQUENCIES and EXAMINE batteries
//! of classic statistics packages over columns with optional case weights
//! and user-missing codes. It accepts plain slices and returns plain
//! records; it knows nothing about datasets, files or presentation.
//!
//! ## Modules
//!
//! - [`sample`]: Observations, weights and missing-value rules
//! - [`moments`]: Single-pass weighted central moments
//! - [`descriptives`]: Moment-based summary and z-scores
//! - [`frequency`]: Frequency tables, grouped percentiles, mode
//! - [`percentile`]: Five percentile policies and Tukey hinges
//! - [`robust`]: M-estimators, weighted median/MAD, trimmed mean
//! - [`normality`]: Shapiro–Wilk and Lilliefors tests
//! - [`levene`]: Levene's homogeneity-of-variance test
//! - [`boxplot`]: Fences, whiskers, outliers and extremes
//! - [`examine`]: The full EXAMINE battery
//! - [`special`]: Normal, t and F distribution functions
//! - [`error`]: Error type
//!
//! ## Design Philosophy
//!
//! - **Numerical stability first**: provisional-means recurrences for the
//!   moments, a continued fraction for the incomplete beta
//! - **Degenerate input is not an error**: undefined statistics are `NaN`;
//!   only invalid arguments fail
//! - **Property-based testing**: Mathematical invariants verified via proptest
//!
//! ## Example
//!
//! ```
//! use u_examine::examine::{examine, ExamineOptions};
//! use u_examine::sample::Sample;
//!
//! let values = [10.0, 12.0, 12.0, 13.0, 12.0, 28.0];
//! let r = examine(&Sample::unweighted(&values), &ExamineOptions::default()).unwrap();
//! assert_eq!(r.hinges.upper, 13.0);
//! assert_eq!(r.boxplot.points.len(), 2);
//! ```

pub mod boxplot;
pub mod descriptives;
pub mod error;
pub mod examine;
pub mod frequency;
pub mod levene;
pub mod moments;
pub mod normality;
pub mod percentile;
pub mod robust;
pub mod sample;
pub mod special;

pub use error::{Result, StatsError};
pub use sample::{MissingSpec, Sample};
