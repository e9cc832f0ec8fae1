//! Rendering layer for the campus energy pipeline.
//!
//! Draws the three-panel consumption dashboard with [`ratatui`] widgets into
//! an off-screen buffer and stores it as text.

pub mod dashboard;

pub use energy_core as core;
