use std::path::PathBuf;
use thiserror::Error;

/// All errors produced by the campus energy pipeline.
#[derive(Error, Debug)]
pub enum EnergyError {
    /// A discovered file vanished before it could be opened.
    #[error("Missing file: {0}")]
    MissingFile(PathBuf),

    /// A file could not be parsed as tabular data at all.
    #[error("Corrupt file skipped: {path}: {reason}")]
    CorruptFile { path: PathBuf, reason: String },

    /// A timestamp cell did not match any recognised format.
    #[error("Invalid timestamp {value:?} in {path} (row {row})")]
    TimestampParse {
        path: PathBuf,
        row: u64,
        value: String,
    },

    /// A column required by aggregation is absent from the table.
    #[error("Missing required column: {0}")]
    MissingColumn(String),

    /// No readings were loaded.
    #[error("No data found")]
    EmptyInput,

    /// An output file could not be written.
    #[error("Failed to write {path}: {source}")]
    FileWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// An internal invariant did not hold.
    #[error("Logic error: {0}")]
    Logic(String),

    /// A configuration value is missing or invalid.
    #[error("Configuration error: {0}")]
    Config(String),

    /// A CSV reader or writer failed outside of row-level recovery.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// Pass-through for any raw I/O error that does not carry a path.
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// Catch-all for errors from third-party crates via `anyhow`.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl EnergyError {
    /// Whether the loader may skip the offending file and carry on.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            EnergyError::MissingFile(_) | EnergyError::CorruptFile { .. }
        )
    }
}

/// Convenience alias used throughout the energy crates.
pub type Result<T> = std::result::Result<T, EnergyError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_missing_file() {
        let err = EnergyError::MissingFile(PathBuf::from("data/Library.csv"));
        assert_eq!(err.to_string(), "Missing file: data/Library.csv");
    }

    #[test]
    fn test_error_display_corrupt_file() {
        let err = EnergyError::CorruptFile {
            path: PathBuf::from("data/Gym.csv"),
            reason: "empty header".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.starts_with("Corrupt file skipped: data/Gym.csv"));
        assert!(msg.contains("empty header"));
    }

    #[test]
    fn test_error_display_timestamp_parse() {
        let err = EnergyError::TimestampParse {
            path: PathBuf::from("data/A.csv"),
            row: 3,
            value: "yesterday".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Invalid timestamp \"yesterday\" in data/A.csv (row 3)"
        );
    }

    #[test]
    fn test_error_display_missing_column() {
        let err = EnergyError::MissingColumn("kwh".to_string());
        assert_eq!(err.to_string(), "Missing required column: kwh");
    }

    #[test]
    fn test_error_display_file_write() {
        let io_err = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        let err = EnergyError::FileWrite {
            path: PathBuf::from("/readonly/summary.txt"),
            source: io_err,
        };
        let msg = err.to_string();
        assert!(msg.contains("Failed to write"));
        assert!(msg.contains("/readonly/summary.txt"));
        assert!(msg.contains("denied"));
    }

    #[test]
    fn test_error_display_config() {
        let err = EnergyError::Config("dashboard width must be positive".to_string());
        assert_eq!(
            err.to_string(),
            "Configuration error: dashboard width must be positive"
        );
    }

    #[test]
    fn test_error_from_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        let err: EnergyError = io_err.into();
        assert!(err.to_string().contains("denied"));
    }

    #[test]
    fn test_recoverable_classification() {
        assert!(EnergyError::MissingFile(PathBuf::from("x.csv")).is_recoverable());
        assert!(EnergyError::CorruptFile {
            path: PathBuf::from("x.csv"),
            reason: String::new(),
        }
        .is_recoverable());
        assert!(!EnergyError::MissingColumn("kwh".to_string()).is_recoverable());
        assert!(!EnergyError::EmptyInput.is_recoverable());
    }
}
