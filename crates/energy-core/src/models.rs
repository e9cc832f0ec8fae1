use chrono::{NaiveDate, NaiveDateTime};
use serde::Serialize;
use std::collections::BTreeMap;

use crate::error::{EnergyError, Result};

/// Name of the timestamp column every meter export must carry.
pub const TIMESTAMP_COLUMN: &str = "timestamp";
/// Name of the consumption column (kilowatt-hours).
pub const KWH_COLUMN: &str = "kwh";
/// Column added by the loader, holding the source file's stem.
pub const BUILDING_COLUMN: &str = "building";

/// A single meter observation read from one building's CSV export.
#[derive(Debug, Clone, PartialEq)]
pub struct Reading {
    /// Wall-clock time of the observation, as written in the export.
    pub timestamp: NaiveDateTime,
    /// Consumption in kilowatt-hours. Always finite.
    pub kwh: f64,
    /// Building identifier derived from the source file name.
    pub building: String,
    /// Every other column of the source row, verbatim.
    pub extra: BTreeMap<String, String>,
}

impl Reading {
    pub fn new(timestamp: NaiveDateTime, kwh: f64, building: impl Into<String>) -> Self {
        Self {
            timestamp,
            kwh,
            building: building.into(),
            extra: BTreeMap::new(),
        }
    }

    /// Value of `column` rendered the way it is exported.
    pub fn field(&self, column: &str) -> String {
        match column {
            TIMESTAMP_COLUMN => self.timestamp.to_string(),
            KWH_COLUMN => self.kwh.to_string(),
            BUILDING_COLUMN => self.building.clone(),
            other => self.extra.get(other).cloned().unwrap_or_default(),
        }
    }
}

// ── LoadStats ─────────────────────────────────────────────────────────────────

/// Bookkeeping about one ingestion run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct LoadStats {
    pub files_found: usize,
    pub files_loaded: usize,
    pub files_missing: usize,
    pub files_corrupt: usize,
    pub rows_read: u64,
    pub rows_dropped: u64,
    /// Loaded files whose header carries `timestamp`.
    pub files_with_timestamp: usize,
    /// Loaded files whose header carries `kwh`.
    pub files_with_kwh: usize,
    /// Non-blank `kwh` cells seen.
    pub kwh_values: u64,
    /// Non-blank `kwh` cells that parsed to a finite number.
    pub kwh_numeric: u64,
}

impl LoadStats {
    /// Required column that is absent from every loaded file, or whose
    /// values are all non-numeric. `None` when no file was loaded.
    pub fn missing_required_column(&self) -> Option<&'static str> {
        if self.files_loaded == 0 {
            return None;
        }
        if self.files_with_kwh == 0 || (self.kwh_values > 0 && self.kwh_numeric == 0) {
            return Some(KWH_COLUMN);
        }
        if self.files_with_timestamp == 0 {
            return Some(TIMESTAMP_COLUMN);
        }
        None
    }
}

// ── UnifiedTable ──────────────────────────────────────────────────────────────

/// All readings from every discovered file, concatenated in discovery order.
#[derive(Debug, Clone, Default)]
pub struct UnifiedTable {
    columns: Vec<String>,
    readings: Vec<Reading>,
    stats: LoadStats,
}

impl UnifiedTable {
    pub fn new(columns: Vec<String>, readings: Vec<Reading>, stats: LoadStats) -> Self {
        Self {
            columns,
            readings,
            stats,
        }
    }

    /// Build a table with the three core columns only. Mostly for tests.
    pub fn from_readings(readings: Vec<Reading>) -> Self {
        let columns = [TIMESTAMP_COLUMN, KWH_COLUMN, BUILDING_COLUMN]
            .iter()
            .map(|c| c.to_string())
            .collect();
        Self::new(columns, readings, LoadStats::default())
    }

    /// Append `columns` to the union, keeping first-seen order.
    pub fn merge_columns<'a>(&mut self, columns: impl IntoIterator<Item = &'a str>) {
        for column in columns {
            if !self.has_column(column) {
                self.columns.push(column.to_string());
            }
        }
    }

    pub fn push(&mut self, reading: Reading) {
        self.readings.push(reading);
    }

    pub fn extend(&mut self, readings: impl IntoIterator<Item = Reading>) {
        self.readings.extend(readings);
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn readings(&self) -> &[Reading] {
        &self.readings
    }

    pub fn stats(&self) -> &LoadStats {
        &self.stats
    }

    pub fn stats_mut(&mut self) -> &mut LoadStats {
        &mut self.stats
    }

    pub fn len(&self) -> usize {
        self.readings.len()
    }

    /// `true` when no reading survived ingestion.
    pub fn is_empty(&self) -> bool {
        self.readings.is_empty()
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.columns.iter().any(|c| c == name)
    }

    /// Fail with [`EnergyError::MissingColumn`] unless `name` is present.
    pub fn require_column(&self, name: &str) -> Result<()> {
        if self.has_column(name) {
            Ok(())
        } else {
            Err(EnergyError::MissingColumn(name.to_string()))
        }
    }

    /// Sum of `kwh` over every reading.
    pub fn total_kwh(&self) -> f64 {
        self.readings.iter().map(|r| r.kwh).sum()
    }

    /// Earliest and latest reading dates, or `None` for an empty table.
    pub fn date_span(&self) -> Option<(NaiveDate, NaiveDate)> {
        let first = self.readings.iter().map(|r| r.timestamp.date()).min()?;
        let last = self.readings.iter().map(|r| r.timestamp.date()).max()?;
        Some((first, last))
    }
}

// ── ConsumptionStats ──────────────────────────────────────────────────────────

/// Running count, sum, min and max of kWh values.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConsumptionStats {
    pub count: u32,
    pub sum: f64,
    pub min: Option<f64>,
    pub max: Option<f64>,
}

impl ConsumptionStats {
    /// Fold one value into the running totals.
    pub fn add(&mut self, kwh: f64) {
        self.count += 1;
        self.sum += kwh;
        self.min = Some(self.min.map_or(kwh, |m| m.min(kwh)));
        self.max = Some(self.max.map_or(kwh, |m| m.max(kwh)));
    }

    /// Fold another set of totals into this one.
    pub fn merge(&mut self, other: &ConsumptionStats) {
        self.count += other.count;
        self.sum += other.sum;
        for value in [other.min, other.max].into_iter().flatten() {
            self.min = Some(self.min.map_or(value, |m| m.min(value)));
            self.max = Some(self.max.map_or(value, |m| m.max(value)));
        }
    }

    /// Arithmetic mean, `None` when nothing was added.
    pub fn mean(&self) -> Option<f64> {
        if self.count == 0 {
            None
        } else {
            Some(self.sum / f64::from(self.count))
        }
    }
}

// ── AggregatedPeriod ──────────────────────────────────────────────────────────

/// Consumption within one day or one week, across all buildings.
#[derive(Debug, Clone, PartialEq)]
pub struct AggregatedPeriod {
    /// Label date formatted as `%Y-%m-%d`: the day, or the week's Sunday.
    pub period_key: String,
    /// First day of the bucket.
    pub start: NaiveDate,
    /// Last day of the bucket (inclusive).
    pub end: NaiveDate,
    pub stats: ConsumptionStats,
}

impl AggregatedPeriod {
    pub fn new(label: NaiveDate, start: NaiveDate, end: NaiveDate) -> Self {
        Self {
            period_key: label.format("%Y-%m-%d").to_string(),
            start,
            end,
            stats: ConsumptionStats::default(),
        }
    }

    /// Summed kWh of the bucket; zero for empty buckets.
    pub fn total_kwh(&self) -> f64 {
        self.stats.sum
    }
}

// ── BuildingSummary ───────────────────────────────────────────────────────────

/// One exported row of `building_summary.csv`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BuildingSummaryRow {
    pub building: String,
    pub mean: f64,
    pub min: f64,
    pub max: f64,
    pub sum: f64,
}

/// Per-building statistics, ordered lexicographically by building identifier.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BuildingSummary {
    entries: BTreeMap<String, ConsumptionStats>,
}

impl BuildingSummary {
    pub fn insert(&mut self, building: impl Into<String>, stats: ConsumptionStats) {
        self.entries.insert(building.into(), stats);
    }

    pub fn get(&self, building: &str) -> Option<&ConsumptionStats> {
        self.entries.get(building)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries in lexicographic building order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &ConsumptionStats)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Sum of every building's `sum`.
    pub fn total_kwh(&self) -> f64 {
        self.entries.values().map(|s| s.sum).sum()
    }

    /// Building with the largest `sum`; the first in order wins ties.
    pub fn highest_consumer(&self) -> Option<&str> {
        let mut best: Option<(&str, f64)> = None;
        for (building, stats) in self.iter() {
            match best {
                Some((_, sum)) if stats.sum <= sum => {}
                _ => best = Some((building, stats.sum)),
            }
        }
        best.map(|(building, _)| building)
    }

    /// Rows for export. Buildings with no readings are skipped.
    pub fn rows(&self) -> Vec<BuildingSummaryRow> {
        self.iter()
            .filter_map(|(building, stats)| {
                Some(BuildingSummaryRow {
                    building: building.to_string(),
                    mean: stats.mean()?,
                    min: stats.min?,
                    max: stats.max?,
                    sum: stats.sum,
                })
            })
            .collect()
    }
}

// ── Building model ────────────────────────────────────────────────────────────

/// One reading held by a [`Building`].
#[derive(Debug, Clone, PartialEq)]
pub struct MeterReading {
    pub timestamp: NaiveDateTime,
    pub kwh: f64,
}

/// Append-only reading log of one building with O(1) running totals.
#[derive(Debug, Clone)]
pub struct Building {
    pub name: String,
    meter_readings: Vec<MeterReading>,
    stats: ConsumptionStats,
}

impl Building {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            meter_readings: Vec::new(),
            stats: ConsumptionStats::default(),
        }
    }

    pub fn add_reading(&mut self, timestamp: NaiveDateTime, kwh: f64) {
        self.meter_readings.push(MeterReading { timestamp, kwh });
        self.stats.add(kwh);
    }

    pub fn calculate_total_consumption(&self) -> f64 {
        self.stats.sum
    }

    pub fn meter_readings(&self) -> &[MeterReading] {
        &self.meter_readings
    }

    pub fn stats(&self) -> &ConsumptionStats {
        &self.stats
    }
}

/// Registry of buildings keyed by identifier.
#[derive(Debug, Clone, Default)]
pub struct BuildingManager {
    buildings: BTreeMap<String, Building>,
}

impl BuildingManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a reading, creating the building on first sight.
    pub fn add_entry(&mut self, building: &str, timestamp: NaiveDateTime, kwh: f64) {
        self.buildings
            .entry(building.to_string())
            .or_insert_with(|| Building::new(building))
            .add_reading(timestamp, kwh);
    }

    pub fn get(&self, building: &str) -> Option<&Building> {
        self.buildings.get(building)
    }

    pub fn buildings(&self) -> impl Iterator<Item = &Building> {
        self.buildings.values()
    }

    pub fn len(&self) -> usize {
        self.buildings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buildings.is_empty()
    }

    /// Snapshot every building's running totals.
    pub fn summary(&self) -> BuildingSummary {
        let mut summary = BuildingSummary::default();
        for building in self.buildings() {
            summary.insert(building.name.clone(), building.stats().clone());
        }
        summary
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn ts(s: &str) -> NaiveDateTime {
        NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S").unwrap()
    }

    // ── Reading ───────────────────────────────────────────────────────────────

    #[test]
    fn test_reading_field_rendering() {
        let mut reading = Reading::new(ts("2024-01-02 00:00:00"), 20.5, "B");
        reading
            .extra
            .insert("meter_id".to_string(), "M-7".to_string());

        assert_eq!(reading.field("timestamp"), "2024-01-02 00:00:00");
        assert_eq!(reading.field("kwh"), "20.5");
        assert_eq!(reading.field("building"), "B");
        assert_eq!(reading.field("meter_id"), "M-7");
        assert_eq!(reading.field("absent"), "");
    }

    // ── LoadStats ─────────────────────────────────────────────────────────────

    #[test]
    fn test_missing_required_column_needs_a_loaded_file() {
        assert_eq!(LoadStats::default().missing_required_column(), None);
    }

    #[test]
    fn test_missing_required_column_detects_absent_and_non_numeric_kwh() {
        let no_kwh = LoadStats {
            files_loaded: 1,
            files_with_timestamp: 1,
            ..LoadStats::default()
        };
        assert_eq!(no_kwh.missing_required_column(), Some("kwh"));

        let all_text = LoadStats {
            files_with_kwh: 1,
            kwh_values: 2,
            ..no_kwh.clone()
        };
        assert_eq!(all_text.missing_required_column(), Some("kwh"));

        let header_only = LoadStats {
            kwh_values: 0,
            ..all_text.clone()
        };
        assert_eq!(header_only.missing_required_column(), None);

        let some_numeric = LoadStats {
            kwh_numeric: 1,
            ..all_text
        };
        assert_eq!(some_numeric.missing_required_column(), None);
    }

    #[test]
    fn test_missing_required_column_detects_absent_timestamp() {
        let stats = LoadStats {
            files_loaded: 2,
            files_with_kwh: 2,
            kwh_values: 3,
            kwh_numeric: 3,
            ..LoadStats::default()
        };
        assert_eq!(stats.missing_required_column(), Some("timestamp"));
    }

    // ── UnifiedTable ──────────────────────────────────────────────────────────

    #[test]
    fn test_table_column_union_keeps_first_seen_order() {
        let mut table = UnifiedTable::default();
        table.merge_columns(["timestamp", "kwh", "building"]);
        table.merge_columns(["timestamp", "kwh", "meter_id", "building"]);
        assert_eq!(
            table.columns(),
            &["timestamp", "kwh", "building", "meter_id"]
        );
    }

    #[test]
    fn test_table_require_column() {
        let table = UnifiedTable::from_readings(vec![]);
        assert!(table.require_column("kwh").is_ok());
        let err = table.require_column("voltage").unwrap_err();
        assert!(matches!(err, EnergyError::MissingColumn(ref c) if c == "voltage"));
    }

    #[test]
    fn test_table_empty_and_span() {
        let empty = UnifiedTable::default();
        assert!(empty.is_empty());
        assert!(empty.date_span().is_none());

        let table = UnifiedTable::from_readings(vec![
            Reading::new(ts("2024-01-03 10:00:00"), 1.0, "A"),
            Reading::new(ts("2024-01-01 23:00:00"), 2.0, "A"),
        ]);
        let (first, last) = table.date_span().unwrap();
        assert_eq!(first.to_string(), "2024-01-01");
        assert_eq!(last.to_string(), "2024-01-03");
        assert!((table.total_kwh() - 3.0).abs() < 1e-9);
    }

    // ── ConsumptionStats ──────────────────────────────────────────────────────

    #[test]
    fn test_stats_running_totals() {
        let mut stats = ConsumptionStats::default();
        assert!(stats.mean().is_none());
        for v in [4.0, 1.0, 7.0] {
            stats.add(v);
        }
        assert_eq!(stats.count, 3);
        assert_eq!(stats.min, Some(1.0));
        assert_eq!(stats.max, Some(7.0));
        assert!((stats.sum - 12.0).abs() < 1e-9);
        assert!((stats.mean().unwrap() - 4.0).abs() < 1e-9);
    }

    #[test]
    fn test_stats_merge_with_empty() {
        let mut a = ConsumptionStats::default();
        a.add(3.0);
        let empty = ConsumptionStats::default();
        a.merge(&empty);
        assert_eq!(a.count, 1);
        assert_eq!(a.min, Some(3.0));

        let mut b = ConsumptionStats::default();
        b.add(-1.0);
        b.add(9.0);
        a.merge(&b);
        assert_eq!(a.count, 3);
        assert_eq!(a.min, Some(-1.0));
        assert_eq!(a.max, Some(9.0));
    }

    // ── BuildingSummary ───────────────────────────────────────────────────────

    #[test]
    fn test_highest_consumer_tie_breaks_lexicographically() {
        let mut summary = BuildingSummary::default();
        let mut ten = ConsumptionStats::default();
        ten.add(10.0);
        summary.insert("Zeta", ten.clone());
        summary.insert("Alpha", ten);
        assert_eq!(summary.highest_consumer(), Some("Alpha"));
    }

    #[test]
    fn test_highest_consumer_empty() {
        assert!(BuildingSummary::default().highest_consumer().is_none());
    }

    #[test]
    fn test_summary_rows_in_order() {
        let mut manager = BuildingManager::new();
        manager.add_entry("Library", ts("2024-01-01 00:00:00"), 5.0);
        manager.add_entry("Gym", ts("2024-01-01 00:00:00"), 3.0);
        manager.add_entry("Gym", ts("2024-01-01 01:00:00"), 1.0);

        let rows = manager.summary().rows();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].building, "Gym");
        assert!((rows[0].mean - 2.0).abs() < 1e-9);
        assert_eq!(rows[0].min, 1.0);
        assert_eq!(rows[0].max, 3.0);
        assert_eq!(rows[1].building, "Library");
    }

    // ── Building / BuildingManager ────────────────────────────────────────────

    #[test]
    fn test_building_total_consumption() {
        let mut building = Building::new("Library");
        assert_eq!(building.calculate_total_consumption(), 0.0);
        building.add_reading(ts("2024-01-01 00:00:00"), 2.5);
        building.add_reading(ts("2024-01-01 01:00:00"), 4.0);
        assert!((building.calculate_total_consumption() - 6.5).abs() < 1e-9);
        assert_eq!(building.meter_readings().len(), 2);
    }

    #[test]
    fn test_manager_creates_buildings_on_first_entry() {
        let mut manager = BuildingManager::new();
        assert!(manager.is_empty());
        manager.add_entry("A", ts("2024-01-01 00:00:00"), 1.0);
        manager.add_entry("A", ts("2024-01-01 00:30:00"), 1.0);
        manager.add_entry("B", ts("2024-01-01 00:00:00"), 1.0);
        assert_eq!(manager.len(), 2);
        assert_eq!(manager.get("A").unwrap().meter_readings().len(), 2);
    }
}
