//! Consumption aggregation over days, weeks and buildings.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use energy_core::error::Result;
use energy_core::models::{
    AggregatedPeriod, BuildingManager, BuildingSummary, ConsumptionStats, UnifiedTable,
    KWH_COLUMN, TIMESTAMP_COLUMN,
};
use energy_core::time_utils::{bucket_starts, BucketKind};

/// Stateless helper that groups readings by time period or building.
pub struct UsageAggregator;

impl UsageAggregator {
    /// Sum kWh per calendar day across all buildings.
    ///
    /// Days between the first and last reading that have no readings are
    /// carried with zero. Returns periods in ascending order.
    pub fn calculate_daily_totals(table: &UnifiedTable) -> Result<Vec<AggregatedPeriod>> {
        Self::resample(table, BucketKind::Daily)
    }

    /// Sum kWh per ISO week (Monday to Sunday), each week keyed by its Sunday.
    ///
    /// Empty weeks within the observed span are carried with zero.
    pub fn calculate_weekly_aggregates(table: &UnifiedTable) -> Result<Vec<AggregatedPeriod>> {
        Self::resample(table, BucketKind::Weekly)
    }

    /// Mean, min, max and sum of kWh per building, ordered by building name.
    pub fn building_wise_summary(table: &UnifiedTable) -> Result<BuildingSummary> {
        Self::require_columns(table)?;

        let mut manager = BuildingManager::new();
        for reading in table.readings() {
            manager.add_entry(&reading.building, reading.timestamp, reading.kwh);
        }
        Ok(manager.summary())
    }

    /// Fold the stats of all periods into a single [`ConsumptionStats`].
    pub fn calculate_totals(periods: &[AggregatedPeriod]) -> ConsumptionStats {
        let mut totals = ConsumptionStats::default();
        for period in periods {
            totals.merge(&period.stats);
        }
        totals
    }

    // ── Private ───────────────────────────────────────────────────────────────

    fn require_columns(table: &UnifiedTable) -> Result<()> {
        table.require_column(TIMESTAMP_COLUMN)?;
        table.require_column(KWH_COLUMN)
    }

    /// Generic resampling driver.
    fn resample(table: &UnifiedTable, kind: BucketKind) -> Result<Vec<AggregatedPeriod>> {
        Self::require_columns(table)?;

        let Some((first, last)) = table.date_span() else {
            return Ok(Vec::new());
        };

        // Pre-seed every bucket in the span so gaps come out as zero.
        let mut buckets: BTreeMap<NaiveDate, AggregatedPeriod> = bucket_starts(kind, first, last)
            .into_iter()
            .map(|start| {
                let period = AggregatedPeriod::new(kind.label(start), start, kind.bucket_end(start));
                (start, period)
            })
            .collect();

        for reading in table.readings() {
            let start = kind.bucket_start(reading.timestamp.date());
            if let Some(period) = buckets.get_mut(&start) {
                period.stats.add(reading.kwh);
            }
        }

        Ok(buckets.into_values().collect())
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
