#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Turns a free-text environmental question into a [`ParsedQuery`].
//!
//! The [`resolver`] pulls a state, county, and date window out of raw
//! text. The [`interpreter`] classifies the question (through a language
//! model when one is configured, keyword rules otherwise) and fills every
//! gap from the configured defaults, so interpretation never fails.
//!
//! [`ParsedQuery`]: climatebud_query_models::ParsedQuery

pub mod interpreter;
pub mod resolver;

pub use interpreter::{
    Classifier, ModelBackedClassifier, QueryInterpreter, RuleBasedClassifier, classify_query_type,
    suggested_queries,
};
pub use resolver::{
    LocationTimeResolver, extract_location, extract_time_range, normalize_state,
    parse_relative_time,
};
