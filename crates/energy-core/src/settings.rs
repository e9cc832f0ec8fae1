use clap::Parser;
use regex::Regex;
use std::path::PathBuf;

use crate::error::{EnergyError, Result};

/// File-name pattern equivalent to the glob `*.csv`.
pub const DEFAULT_FILE_PATTERN: &str = r"^[^.].*\.csv$";

// ── Settings (CLI) ─────────────────────────────────────────────────────────────

/// Campus energy-use dashboard and summary export
#[derive(Parser, Debug, Clone)]
#[command(
    name = "campus-energy",
    about = "Aggregate per-building meter CSV exports into a dashboard and summary",
    version
)]
pub struct Settings {
    /// Directory scanned (non-recursively) for meter CSV files
    #[arg(long, env = "ENERGY_DATA_DIR", default_value = "data")]
    pub data_dir: PathBuf,

    /// Directory receiving the exported files
    #[arg(long, env = "ENERGY_OUTPUT_DIR", default_value = ".")]
    pub output_dir: PathBuf,

    /// Regular expression a file name must match to be loaded
    #[arg(long, env = "ENERGY_FILE_PATTERN", default_value = DEFAULT_FILE_PATTERN)]
    pub pattern: String,

    /// Abort on the first unparseable timestamp instead of dropping the row
    #[arg(long)]
    pub strict_timestamps: bool,

    /// Skip rendering the dashboard
    #[arg(long)]
    pub no_dashboard: bool,

    /// Dashboard width in character cells
    #[arg(long, default_value = "150", value_parser = clap::value_parser!(u16).range(30..=1000))]
    pub dashboard_width: u16,

    /// Dashboard height in character cells
    #[arg(long, default_value = "40", value_parser = clap::value_parser!(u16).range(10..=500))]
    pub dashboard_height: u16,

    /// Logging level
    #[arg(long, env = "ENERGY_LOG_LEVEL", default_value = "INFO", value_parser = ["DEBUG", "INFO", "WARNING", "ERROR", "CRITICAL"])]
    pub log_level: String,

    /// Enable debug logging
    #[arg(long)]
    pub debug: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Settings::parse_from(["campus-energy"])
    }
}

impl Settings {
    /// Parse the process arguments and apply the `--debug` override.
    pub fn load() -> Self {
        Self::load_from_args(std::env::args_os())
    }

    /// Same as [`Settings::load`] but with an explicit argument list.
    pub fn load_from_args<I, T>(args: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<std::ffi::OsString> + Clone,
    {
        let mut settings = Settings::parse_from(args);
        if settings.debug {
            settings.log_level = "DEBUG".to_string();
        }
        settings
    }

    /// Compile the file-name pattern.
    pub fn file_pattern(&self) -> Result<Regex> {
        Regex::new(&self.pattern)
            .map_err(|e| EnergyError::Config(format!("invalid file pattern {:?}: {}", self.pattern, e)))
    }

    /// Check values clap cannot validate on its own.
    pub fn validate(&self) -> Result<()> {
        self.file_pattern()?;
        if self.data_dir.as_os_str().is_empty() {
            return Err(EnergyError::Config("data directory must not be empty".to_string()));
        }
        if self.output_dir.as_os_str().is_empty() {
            return Err(EnergyError::Config("output directory must not be empty".to_string()));
        }
        Ok(())
    }
}

// ── Tests ──────────────────────────────────────────────────────────────────────
