//! Descriptive statistics over a window of daily temperature readings.
//!
//! Pure and synchronous: no I/O, no ambient configuration. Callers pass a
//! [`StatsConfig`] and a chronologically ordered slice of [`Observation`]s
//! and get back an immutable [`Summary`].

pub mod analyzer;
pub mod types;

pub use analyzer::{analyze, mean, population_stddev, trend};
pub use types::*;
