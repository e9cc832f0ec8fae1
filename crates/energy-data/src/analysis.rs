//! Main analysis pipeline.
//!
//! Loads the meter exports, checks for the empty case, and computes the
//! daily, weekly and per-building aggregates consumed by the dashboard and
//! the exports.

use std::path::Path;
use std::time::Instant;

use chrono::Utc;
use energy_core::error::{EnergyError, Result};
use energy_core::models::{AggregatedPeriod, BuildingSummary, LoadStats, UnifiedTable};
use energy_core::settings::Settings;
use tracing::info;

use crate::aggregator::UsageAggregator;
use crate::reader::load_all_data;
use crate::report::{export_and_summary, Report};

// ── Public types ──────────────────────────────────────────────────────────────

/// Metadata produced alongside the analysis result.
#[derive(Debug, Clone, serde::Serialize)]
pub struct AnalysisMetadata {
    /// ISO-8601 timestamp when this result was generated.
    pub generated_at: String,
    /// Ingestion bookkeeping.
    pub load: LoadStats,
    /// Number of distinct buildings.
    pub buildings: usize,
    /// Number of daily buckets, gaps included.
    pub days: usize,
    /// Number of weekly buckets, gaps included.
    pub weeks: usize,
    /// Wall-clock seconds spent loading the CSV files.
    pub load_time_seconds: f64,
    /// Wall-clock seconds spent aggregating.
    pub aggregate_time_seconds: f64,
}

/// Everything computed from one non-empty table.
#[derive(Debug, Clone)]
pub struct AnalysisResult {
    pub table: UnifiedTable,
    pub daily: Vec<AggregatedPeriod>,
    pub weekly: Vec<AggregatedPeriod>,
    pub summary: BuildingSummary,
    pub metadata: AnalysisMetadata,
}

impl AnalysisResult {
    /// Write the cleaned table, building summary and text summary.
    pub fn export(&self, output_dir: &Path) -> Result<Report> {
        export_and_summary(&self.table, &self.summary, output_dir)
    }
}

/// Result of [`analyze_energy`].
#[derive(Debug, Clone)]
pub enum AnalysisOutcome {
    /// No reading survived ingestion; nothing should be written.
    NoData(LoadStats),
    /// Aggregates are ready for rendering and export.
    Ready(Box<AnalysisResult>),
}

// ── Public function ───────────────────────────────────────────────────────────

/// Run loading and aggregation.
///
/// 1. Load every CSV under `settings.data_dir`.
/// 2. Fail with [`EnergyError::MissingColumn`] when the loaded files lack
///    `kwh` or `timestamp`, or carry no numeric `kwh` value at all.
/// 3. Stop with [`AnalysisOutcome::NoData`] when nothing was loaded.
/// 4. Compute daily totals, weekly totals and the building summary.
pub fn analyze_energy(settings: &Settings) -> Result<AnalysisOutcome> {
    // ── Step 1: Load ──────────────────────────────────────────────────────────
    let load_start = Instant::now();
    let table = load_all_data(settings)?;
    let load_time = load_start.elapsed().as_secs_f64();

    // ── Step 2: Required columns ──────────────────────────────────────────────
    if let Some(column) = table.stats().missing_required_column() {
        return Err(EnergyError::MissingColumn(column.to_string()));
    }

    // ── Step 3: Empty check ───────────────────────────────────────────────────
    if table.is_empty() {
        info!("No readings loaded from {}", settings.data_dir.display());
        return Ok(AnalysisOutcome::NoData(table.stats().clone()));
    }

    analyze_table(table, load_time).map(|r| AnalysisOutcome::Ready(Box::new(r)))
}

/// Aggregate an already loaded, non-empty table.
pub fn analyze_table(table: UnifiedTable, load_time_seconds: f64) -> Result<AnalysisResult> {
    // ── Step 4: Aggregate ─────────────────────────────────────────────────────
    let aggregate_start = Instant::now();
    let daily = UsageAggregator::calculate_daily_totals(&table)?;
    let weekly = UsageAggregator::calculate_weekly_aggregates(&table)?;
    let summary = UsageAggregator::building_wise_summary(&table)?;
    let aggregate_time = aggregate_start.elapsed().as_secs_f64();

    let metadata = AnalysisMetadata {
        generated_at: Utc::now().to_rfc3339(),
        load: table.stats().clone(),
        buildings: summary.len(),
        days: daily.len(),
        weeks: weekly.len(),
        load_time_seconds,
        aggregate_time_seconds: aggregate_time,
    };

    info!(
        "Aggregated {} readings: {} buildings, {} days, {} weeks",
        table.len(),
        metadata.buildings,
        metadata.days,
        metadata.weeks
    );

    Ok(AnalysisResult {
        table,
        daily,
        weekly,
        summary,
        metadata,
    })
}

// ── Tests ─────────────────────────────────────────────────────────────────────
