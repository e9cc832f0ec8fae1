//! Data layer for the campus energy pipeline.
//!
//! Responsible for discovering and parsing per-building meter CSV files,
//! aggregating consumption by day, week and building, deriving the headline
//! report and writing the exported files.

pub mod aggregator;
pub mod analysis;
pub mod reader;
pub mod report;

pub use energy_core as core;
