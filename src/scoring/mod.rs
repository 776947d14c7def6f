//! Element scoring: exclusion rules, visibility penalties and the weighted
//! scorer that assigns elements to logical fields.

pub mod exclusion;
pub mod penalties;
pub mod scorer;

pub use scorer::{ElementScorer, ScoreDetails, EXCLUDED_SCORE};
