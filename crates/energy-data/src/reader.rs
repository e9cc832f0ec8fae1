//! CSV file discovery and loading.
//!
//! Reads per-building meter exports from a flat directory and concatenates
//! them into one [`UnifiedTable`], tagging each row with its building.

use std::fs::File;
use std::path::{Path, PathBuf};

use csv::StringRecord;
use energy_core::error::{EnergyError, Result};
use energy_core::models::{
    LoadStats, Reading, UnifiedTable, BUILDING_COLUMN, KWH_COLUMN, TIMESTAMP_COLUMN,
};
use energy_core::settings::Settings;
use energy_core::time_utils::TimestampParser;
use regex::Regex;
use tracing::{debug, warn};

// ── Public API ────────────────────────────────────────────────────────────────

/// Find files directly inside `data_path` whose name matches `pattern`,
/// sorted by path.
pub fn find_csv_files(data_path: &Path, pattern: &Regex) -> Vec<PathBuf> {
    if !data_path.is_dir() {
        warn!("Data path does not exist: {}", data_path.display());
        return Vec::new();
    }

    let mut files: Vec<PathBuf> = walkdir::WalkDir::new(data_path)
        .min_depth(1)
        .max_depth(1)
        .follow_links(true)
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter(|entry| {
            entry.file_type().is_file()
                && entry
                    .file_name()
                    .to_str()
                    .map(|name| pattern.is_match(name))
                    .unwrap_or(false)
        })
        .map(|entry| entry.into_path())
        .collect();

    files.sort();
    files
}

/// Load every matching file under the configured data directory.
pub fn load_all_data(settings: &Settings) -> Result<UnifiedTable> {
    let pattern = settings.file_pattern()?;
    load_from_dir(&settings.data_dir, &pattern, settings.strict_timestamps)
}

/// Load and concatenate every file in `data_path` matching `pattern`.
///
/// Missing and corrupt files are logged and skipped. Bad rows are dropped.
/// With `strict_timestamps`, the first non-blank timestamp that cannot be
/// parsed aborts the whole load with [`EnergyError::TimestampParse`].
pub fn load_from_dir(
    data_path: &Path,
    pattern: &Regex,
    strict_timestamps: bool,
) -> Result<UnifiedTable> {
    let files = find_csv_files(data_path, pattern);
    let mut table = UnifiedTable::default();
    table.stats_mut().files_found = files.len();

    if files.is_empty() {
        warn!("No CSV files found in {}", data_path.display());
        return Ok(table);
    }

    for file_path in &files {
        let building = building_name(file_path);
        match process_single_file(file_path, BuildingTag::FileStem(building), strict_timestamps) {
            Ok(parsed) => append_file(&mut table, parsed),
            Err(e) if e.is_recoverable() => {
                warn!("{}", e);
                let stats = table.stats_mut();
                match e {
                    EnergyError::MissingFile(_) => stats.files_missing += 1,
                    _ => stats.files_corrupt += 1,
                }
            }
            Err(e) => return Err(e),
        }
    }

    let stats = table.stats();
    debug!(
        "Loaded {} readings from {}/{} files ({} missing, {} corrupt, {} rows dropped)",
        table.len(),
        stats.files_loaded,
        stats.files_found,
        stats.files_missing,
        stats.files_corrupt,
        stats.rows_dropped,
    );

    Ok(table)
}

/// Read a `cleaned_energy_data.csv` export back into a table.
///
/// Unlike [`load_from_dir`], the building of each row comes from the
/// `building` column, so a re-loaded export matches the table it was
/// written from.
pub fn load_cleaned_export(path: &Path) -> Result<UnifiedTable> {
    let parsed = process_single_file(path, BuildingTag::Column, false)?;
    let mut table = UnifiedTable::new(Vec::new(), Vec::new(), LoadStats::default());
    table.stats_mut().files_found = 1;
    append_file(&mut table, parsed);
    Ok(table)
}

// ── Internal helpers ──────────────────────────────────────────────────────────

/// Where the building identifier of a row comes from.
enum BuildingTag {
    /// Every row gets the file's stem.
    FileStem(String),
    /// Each row carries its own `building` cell.
    Column,
}

/// Rows and header of one successfully opened file.
struct ParsedFile {
    columns: Vec<String>,
    readings: Vec<Reading>,
    rows_read: u64,
    rows_dropped: u64,
    has_timestamp: bool,
    has_kwh: bool,
    kwh_values: u64,
    kwh_numeric: u64,
}

/// Header positions of the columns the loader interprets.
struct ColumnIndex {
    timestamp: Option<usize>,
    kwh: Option<usize>,
    building: Option<usize>,
}

impl ColumnIndex {
    fn from_headers(headers: &StringRecord) -> Self {
        let find = |name: &str| headers.iter().position(|h| h == name);
        Self {
            timestamp: find(TIMESTAMP_COLUMN),
            kwh: find(KWH_COLUMN),
            building: find(BUILDING_COLUMN),
        }
    }

    fn is_core(&self, idx: usize) -> bool {
        [self.timestamp, self.kwh, self.building].contains(&Some(idx))
    }
}

fn building_name(path: &Path) -> String {
    path.file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_default()
}

fn append_file(table: &mut UnifiedTable, parsed: ParsedFile) {
    table.merge_columns(parsed.columns.iter().map(String::as_str));
    table.extend(parsed.readings);
    let stats = table.stats_mut();
    stats.files_loaded += 1;
    stats.rows_read += parsed.rows_read;
    stats.rows_dropped += parsed.rows_dropped;
    stats.files_with_timestamp += usize::from(parsed.has_timestamp);
    stats.files_with_kwh += usize::from(parsed.has_kwh);
    stats.kwh_values += parsed.kwh_values;
    stats.kwh_numeric += parsed.kwh_numeric;
}

fn corrupt(path: &Path, reason: impl ToString) -> EnergyError {
    EnergyError::CorruptFile {
        path: path.to_path_buf(),
        reason: reason.to_string(),
    }
}

/// Parse one CSV file with per-row recovery.
fn process_single_file(path: &Path, tag: BuildingTag, strict_timestamps: bool) -> Result<ParsedFile> {
    let file = match File::open(path) {
        Ok(f) => f,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(EnergyError::MissingFile(path.to_path_buf()));
        }
        Err(e) => return Err(corrupt(path, e)),
    };

    let mut rdr = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::Headers)
        .from_reader(file);

    let headers = rdr.headers().map_err(|e| corrupt(path, e))?.clone();
    if headers.iter().all(|h| h.is_empty()) {
        return Err(corrupt(path, "no header row"));
    }

    let index = ColumnIndex::from_headers(&headers);
    for (name, idx) in [(TIMESTAMP_COLUMN, index.timestamp), (KWH_COLUMN, index.kwh)] {
        if idx.is_none() {
            warn!(
                "{} has no '{}' column; its rows will be skipped",
                path.display(),
                name
            );
        }
    }

    // An existing `building` column keeps its place; otherwise it goes last.
    let mut columns: Vec<String> = headers.iter().map(str::to_string).collect();
    if matches!(tag, BuildingTag::FileStem(_)) && index.building.is_none() {
        columns.push(BUILDING_COLUMN.to_string());
    }

    let mut parsed = ParsedFile {
        columns,
        readings: Vec::new(),
        rows_read: 0,
        rows_dropped: 0,
        has_timestamp: index.timestamp.is_some(),
        has_kwh: index.kwh.is_some(),
        kwh_values: 0,
        kwh_numeric: 0,
    };

    for result in rdr.records() {
        parsed.rows_read += 1;
        let record = match result {
            Ok(r) => r,
            Err(e) if matches!(e.kind(), csv::ErrorKind::Io(_)) => {
                return Err(corrupt(path, e));
            }
            Err(e) => {
                debug!("Skipping unreadable row in {}: {}", path.display(), e);
                parsed.rows_dropped += 1;
                continue;
            }
        };

        let line = record
            .position()
            .map(|p| p.line())
            .unwrap_or(parsed.rows_read + 1);

        if let Some(raw) = index.kwh.and_then(|i| record.get(i)).map(str::trim) {
            if !raw.is_empty() {
                parsed.kwh_values += 1;
                parsed.kwh_numeric += u64::from(parse_kwh(raw).is_some());
            }
        }

        if record.len() > headers.len() {
            debug!(
                "Skipping row {} in {}: {} fields, header has {}",
                line,
                path.display(),
                record.len(),
                headers.len()
            );
            parsed.rows_dropped += 1;
            continue;
        }

        match map_to_reading(&record, &headers, &index, &tag) {
            Ok(reading) => parsed.readings.push(reading),
            Err(RowIssue::BadTimestamp(value)) if strict_timestamps => {
                return Err(EnergyError::TimestampParse {
                    path: path.to_path_buf(),
                    row: line,
                    value,
                });
            }
            Err(issue) => {
                debug!("Skipping row {} in {}: {}", line, path.display(), issue);
                parsed.rows_dropped += 1;
            }
        }
    }

    debug!(
        "File {}: {} rows read, {} kept, {} dropped",
        path.display(),
        parsed.rows_read,
        parsed.readings.len(),
        parsed.rows_dropped,
    );

    Ok(parsed)
}

/// Why a single row was rejected.
#[derive(Debug)]
enum RowIssue {
    MissingValue(&'static str),
    BadTimestamp(String),
    BadKwh(String),
}

impl std::fmt::Display for RowIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RowIssue::MissingValue(column) => write!(f, "no value for '{}'", column),
            RowIssue::BadTimestamp(value) => write!(f, "invalid timestamp {:?}", value),
            RowIssue::BadKwh(value) => write!(f, "invalid kwh {:?}", value),
        }
    }
}

/// Finite kWh value of a trimmed cell.
fn parse_kwh(raw: &str) -> Option<f64> {
    raw.parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Map one CSV record to a [`Reading`].
fn map_to_reading(
    record: &StringRecord,
    headers: &StringRecord,
    index: &ColumnIndex,
    tag: &BuildingTag,
) -> std::result::Result<Reading, RowIssue> {
    let cell = |idx: Option<usize>, column: &'static str| {
        idx.and_then(|i| record.get(i))
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .ok_or(RowIssue::MissingValue(column))
    };

    let ts_raw = cell(index.timestamp, TIMESTAMP_COLUMN)?;
    let timestamp =
        TimestampParser::parse(ts_raw).ok_or_else(|| RowIssue::BadTimestamp(ts_raw.to_string()))?;

    let kwh_raw = cell(index.kwh, KWH_COLUMN)?;
    let kwh = parse_kwh(kwh_raw).ok_or_else(|| RowIssue::BadKwh(kwh_raw.to_string()))?;

    let building = match tag {
        BuildingTag::FileStem(stem) => stem.clone(),
        BuildingTag::Column => cell(index.building, BUILDING_COLUMN)?.to_string(),
    };

    let mut reading = Reading::new(timestamp, kwh, building);
    for (idx, name) in headers.iter().enumerate() {
        if index.is_core(idx) {
            continue;
        }
        if let Some(value) = record.get(idx).filter(|v| !v.is_empty()) {
            reading.extra.insert(name.to_string(), value.to_string());
        }
    }

    Ok(reading)
}

// ── Tests ─────────────────────────────────────────────────────────────────────
