//! Headline figures and file exports.
//!
//! Derives total consumption, the top-consuming building and the peak-load
//! timestamp, and writes the cleaned table, the building summary and the
//! plain-text summary.

use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::NaiveDateTime;
use energy_core::error::{EnergyError, Result};
use energy_core::models::{BuildingSummary, UnifiedTable};
use tracing::info;

/// File name of the cleaned, concatenated readings.
pub const CLEANED_DATA_FILE: &str = "cleaned_energy_data.csv";
/// File name of the per-building statistics table.
pub const BUILDING_SUMMARY_FILE: &str = "building_summary.csv";
/// File name of the three-line text summary.
pub const SUMMARY_TEXT_FILE: &str = "summary.txt";

/// Headline figures of one run.
#[derive(Debug, Clone, PartialEq)]
pub struct Report {
    /// Sum of kWh over every reading.
    pub total_energy: f64,
    /// Building with the largest summed kWh.
    pub highest_building: String,
    /// Timestamp of the first reading carrying the largest kWh value.
    pub peak_time: NaiveDateTime,
}

impl Report {
    /// Compute the headline figures.
    ///
    /// Fails with [`EnergyError::EmptyInput`] on an empty table; callers are
    /// expected to have checked for that already.
    pub fn derive(table: &UnifiedTable, summary: &BuildingSummary) -> Result<Self> {
        let mut peak: Option<(f64, NaiveDateTime)> = None;
        for reading in table.readings() {
            match peak {
                Some((kwh, _)) if reading.kwh <= kwh => {}
                _ => peak = Some((reading.kwh, reading.timestamp)),
            }
        }
        let Some((_, peak_time)) = peak else {
            return Err(EnergyError::EmptyInput);
        };

        let highest_building = summary
            .highest_consumer()
            .ok_or_else(|| {
                EnergyError::Logic("building summary is empty for a non-empty table".to_string())
            })?
            .to_string();

        Ok(Self {
            total_energy: table.total_kwh(),
            highest_building,
            peak_time,
        })
    }

    /// The three lines written to `summary.txt`.
    pub fn to_summary_text(&self) -> String {
        format!(
            "Total Campus Consumption: {}\nHighest Consuming Building: {}\nPeak Load Time: {}\n",
            self.total_energy, self.highest_building, self.peak_time
        )
    }
}

// ── Exports ───────────────────────────────────────────────────────────────────

/// Write all three outputs into `output_dir` and return the derived report.
pub fn export_and_summary(
    table: &UnifiedTable,
    summary: &BuildingSummary,
    output_dir: &Path,
) -> Result<Report> {
    let report = Report::derive(table, summary)?;

    write_cleaned_data(table, &output_dir.join(CLEANED_DATA_FILE))?;
    write_building_summary(summary, &output_dir.join(BUILDING_SUMMARY_FILE))?;
    write_summary_text(&report, &output_dir.join(SUMMARY_TEXT_FILE))?;

    info!(
        "Exported {} readings and {} buildings to {}",
        table.len(),
        summary.len(),
        output_dir.display()
    );
    Ok(report)
}

/// Write every reading with all columns of the table. No index column.
pub fn write_cleaned_data(table: &UnifiedTable, path: &Path) -> Result<()> {
    let mut writer = csv::Writer::from_writer(create(path)?);
    writer.write_record(table.columns()).map_err(|e| csv_write(path, e))?;
    for reading in table.readings() {
        let row = table.columns().iter().map(|c| reading.field(c));
        writer.write_record(row).map_err(|e| csv_write(path, e))?;
    }
    writer.flush().map_err(|e| write_failed(path, e))?;
    Ok(())
}

/// Write `building,mean,min,max,sum`, one row per building.
pub fn write_building_summary(summary: &BuildingSummary, path: &Path) -> Result<()> {
    let mut writer = csv::Writer::from_writer(create(path)?);
    for row in summary.rows() {
        writer.serialize(row).map_err(|e| csv_write(path, e))?;
    }
    if summary.is_empty() {
        writer
            .write_record(["building", "mean", "min", "max", "sum"])
            .map_err(|e| csv_write(path, e))?;
    }
    writer.flush().map_err(|e| write_failed(path, e))?;
    Ok(())
}

/// Write the three-line summary.
pub fn write_summary_text(report: &Report, path: &Path) -> Result<()> {
    let mut file = create(path)?;
    file.write_all(report.to_summary_text().as_bytes())
        .map_err(|e| write_failed(path, e))?;
    Ok(())
}

// ── Internal helpers ──────────────────────────────────────────────────────────

fn create(path: &Path) -> Result<File> {
    File::create(path).map_err(|e| write_failed(path, e))
}

fn write_failed(path: &Path, source: std::io::Error) -> EnergyError {
    EnergyError::FileWrite {
        path: PathBuf::from(path),
        source,
    }
}

fn csv_write(path: &Path, err: csv::Error) -> EnergyError {
    if err.is_io_error() {
        write_failed(path, std::io::Error::from(err))
    } else {
        EnergyError::Csv(err)
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregator::UsageAggregator;
    use energy_core::models::Reading;
    use tempfile::TempDir;

    fn reading(ts: &str, kwh: f64, building: &str) -> Reading {
        let timestamp = NaiveDateTime::parse_from_str(ts, "%Y-%m-%dT%H:%M").unwrap();
        Reading::new(timestamp, kwh, building)
    }

    fn two_building_table() -> UnifiedTable {
        UnifiedTable::from_readings(vec![
            reading("2024-01-01T00:00", 10.0, "A"),
            reading("2024-01-02T00:00", 20.0, "B"),
        ])
    }

    // ── Report::derive ────────────────────────────────────────────────────────

    #[test]
    fn test_derive_two_building_scenario() {
        let table = two_building_table();
        let summary = UsageAggregator::building_wise_summary(&table).unwrap();
        let report = Report::derive(&table, &summary).unwrap();

        assert!((report.total_energy - 30.0).abs() < 1e-9);
        assert_eq!(report.highest_building, "B");
        assert_eq!(report.peak_time.to_string(), "2024-01-02 00:00:00");
    }

    #[test]
    fn test_derive_peak_tie_takes_first_row() {
        let table = UnifiedTable::from_readings(vec![
            reading("2024-01-03T00:00", 5.0, "B"),
            reading("2024-01-01T00:00", 5.0, "A"),
        ]);
        let summary = UsageAggregator::building_wise_summary(&table).unwrap();
        let report = Report::derive(&table, &summary).unwrap();

        assert_eq!(report.peak_time.to_string(), "2024-01-03 00:00:00");
        // Equal sums: lexicographic order decides.
        assert_eq!(report.highest_building, "A");
    }

    #[test]
    fn test_derive_empty_table_is_empty_input() {
        let table = UnifiedTable::from_readings(vec![]);
        let err = Report::derive(&table, &BuildingSummary::default()).unwrap_err();
        assert!(matches!(err, EnergyError::EmptyInput));
    }

    #[test]
    fn test_derive_empty_summary_is_logic_error() {
        let table = two_building_table();
        let err = Report::derive(&table, &BuildingSummary::default()).unwrap_err();
        assert!(matches!(err, EnergyError::Logic(_)));
    }

    #[test]
    fn test_summary_text_lines() {
        let table = two_building_table();
        let summary = UsageAggregator::building_wise_summary(&table).unwrap();
        let text = Report::derive(&table, &summary).unwrap().to_summary_text();

        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(
            lines,
            vec![
                "Total Campus Consumption: 30",
                "Highest Consuming Building: B",
                "Peak Load Time: 2024-01-02 00:00:00",
            ]
        );
    }

    // ── export_and_summary ────────────────────────────────────────────────────

    #[test]
    fn test_export_writes_three_files() {
        let dir = TempDir::new().unwrap();
        let table = two_building_table();
        let summary = UsageAggregator::building_wise_summary(&table).unwrap();

        export_and_summary(&table, &summary, dir.path()).unwrap();

        let cleaned = std::fs::read_to_string(dir.path().join(CLEANED_DATA_FILE)).unwrap();
        assert_eq!(
            cleaned,
            "timestamp,kwh,building\n2024-01-01 00:00:00,10,A\n2024-01-02 00:00:00,20,B\n"
        );

        let building = std::fs::read_to_string(dir.path().join(BUILDING_SUMMARY_FILE)).unwrap();
        assert_eq!(building, "building,mean,min,max,sum\nA,10.0,10.0,10.0,10.0\nB,20.0,20.0,20.0,20.0\n");

        let text = std::fs::read_to_string(dir.path().join(SUMMARY_TEXT_FILE)).unwrap();
        assert_eq!(text.lines().count(), 3);
    }

    #[test]
    fn test_export_extra_columns_blank_when_absent() {
        let dir = TempDir::new().unwrap();
        let mut with_meter = reading("2024-01-01T00:00", 1.5, "A");
        with_meter
            .extra
            .insert("meter_id".to_string(), "M-1".to_string());
        let mut table = UnifiedTable::default();
        table.merge_columns(["timestamp", "kwh", "building", "meter_id"]);
        table.push(with_meter);
        table.push(reading("2024-01-01T01:00", 2.0, "B"));

        let path = dir.path().join(CLEANED_DATA_FILE);
        write_cleaned_data(&table, &path).unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines[1], "2024-01-01 00:00:00,1.5,A,M-1");
        assert_eq!(lines[2], "2024-01-01 01:00:00,2,B,");
    }

    #[test]
    fn test_export_to_missing_directory_fails() {
        let dir = TempDir::new().unwrap();
        let missing = dir.path().join("no").join("such").join("dir");
        let table = two_building_table();
        let summary = UsageAggregator::building_wise_summary(&table).unwrap();

        let err = export_and_summary(&table, &summary, &missing).unwrap_err();
        match err {
            EnergyError::FileWrite { path, .. } => {
                assert!(path.ends_with(CLEANED_DATA_FILE));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_export_is_idempotent() {
        let dir = TempDir::new().unwrap();
        let table = two_building_table();
        let summary = UsageAggregator::building_wise_summary(&table).unwrap();

        export_and_summary(&table, &summary, dir.path()).unwrap();
        let first_cleaned = std::fs::read(dir.path().join(CLEANED_DATA_FILE)).unwrap();
        let first_summary = std::fs::read(dir.path().join(BUILDING_SUMMARY_FILE)).unwrap();

        export_and_summary(&table, &summary, dir.path()).unwrap();
        assert_eq!(std::fs::read(dir.path().join(CLEANED_DATA_FILE)).unwrap(), first_cleaned);
        assert_eq!(std::fs::read(dir.path().join(BUILDING_SUMMARY_FILE)).unwrap(), first_summary);
    }
}
