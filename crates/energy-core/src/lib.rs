//! Core types for the campus energy pipeline.
//!
//! Holds the reading/table data model, the error taxonomy, command-line
//! settings, timestamp and calendar-bucket helpers, and number formatting
//! shared by the data, UI and binary crates.

pub mod error;
pub mod formatting;
pub mod models;
pub mod settings;
pub mod time_utils;

pub use error::{EnergyError, Result};
