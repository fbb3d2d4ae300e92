#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Statistical analysis of environmental violation data.
//!
//! Every analysis is a pure function from borrowed tables to a fresh
//! [`AnalysisResult`]. Missing inputs never panic or error: they produce
//! a result carrying only an `error` message, and missing columns simply
//! leave the corresponding facets out.
//!
//! [`AnalysisResult`]: climatebud_analytics_models::AnalysisResult

pub mod repeat;
pub mod spill;
pub mod stats;
pub mod summary;
pub mod weather;

pub use repeat::analyze_repeat_violators;
pub use spill::analyze_spill_patterns;
pub use summary::{summarize_datasets, weather_summary};
pub use weather::analyze_weather_correlation;
