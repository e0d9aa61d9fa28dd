//! Pinpoint - Spectrum-based fault localization
//!
//! This library turns a test run's pass/fail outcomes and per-test coverage
//! contexts into per-line suspiciousness scores (Tarantula, Ochiai, Op2,
//! Barinel, DStar), ranks lines within each file and derives EXAM scores.

pub mod aggregator;
pub mod cli;
pub mod config;
pub mod coverage_store;
pub mod csv_output;
pub mod engine;
pub mod formulas;
pub mod json_output;
pub mod outcomes;
pub mod ranking;
pub mod selection;
pub mod text_output;
