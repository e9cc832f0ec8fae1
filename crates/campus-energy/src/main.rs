mod bootstrap;

use anyhow::{Context, Result};
use energy_core::formatting::format_kwh;
use energy_core::settings::Settings;
use energy_data::analysis::{analyze_energy, AnalysisOutcome, AnalysisResult};
use energy_data::report::Report;
use energy_ui::dashboard::{write_dashboard, DashboardData, DASHBOARD_FILE};

/// What one run produced.
#[derive(Debug)]
enum RunStatus {
    /// Nothing was loaded; no file was written.
    NoData,
    /// The exports were written.
    Generated(Report),
}

fn main() -> Result<()> {
    let settings = Settings::load();
    settings.validate()?;

    bootstrap::setup_logging(&settings.log_level)?;

    tracing::info!("Campus Energy v{} starting", env!("CARGO_PKG_VERSION"));
    tracing::info!(
        "Data: {}, Output: {}, Pattern: {}",
        settings.data_dir.display(),
        settings.output_dir.display(),
        settings.pattern
    );

    match run(&settings)? {
        RunStatus::NoData => println!("No data found."),
        RunStatus::Generated(_) => {
            println!("Dashboard, cleaned CSV, summary CSV, and summary.txt generated!")
        }
    }
    Ok(())
}

/// Load, aggregate, export, then draw the dashboard.
fn run(settings: &Settings) -> Result<RunStatus> {
    let result = match analyze_energy(settings)? {
        AnalysisOutcome::NoData(stats) => {
            tracing::info!(
                "{} file(s) found, {} missing, {} corrupt",
                stats.files_found,
                stats.files_missing,
                stats.files_corrupt
            );
            return Ok(RunStatus::NoData);
        }
        AnalysisOutcome::Ready(result) => result,
    };

    bootstrap::ensure_output_dir(&settings.output_dir).with_context(|| {
        format!(
            "cannot create output directory {}",
            settings.output_dir.display()
        )
    })?;

    let report = result.export(&settings.output_dir)?;

    if settings.no_dashboard {
        tracing::info!("Dashboard disabled");
    } else {
        render_dashboard(settings, &result);
    }

    tracing::info!(
        "Total {}, highest {}, peak at {}",
        format_kwh(report.total_energy),
        report.highest_building,
        report.peak_time
    );
    tracing::debug!(
        "Load {:.3}s, aggregate {:.3}s",
        result.metadata.load_time_seconds,
        result.metadata.aggregate_time_seconds
    );

    Ok(RunStatus::Generated(report))
}

/// Write `dashboard.txt`; a failure is logged and does not fail the run.
fn render_dashboard(settings: &Settings, result: &AnalysisResult) {
    let data = DashboardData::build(&result.daily, &result.summary, &result.table);
    let path = settings.output_dir.join(DASHBOARD_FILE);
    if let Err(e) = write_dashboard(
        &path,
        &data,
        settings.dashboard_width,
        settings.dashboard_height,
    ) {
        tracing::warn!("Dashboard not written: {}", e);
    }
}

// ── Tests ──────────────────────────────────────────────────────────────────────
