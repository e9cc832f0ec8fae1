//! Three-panel consumption dashboard.
//!
//! Draws a daily-total line chart, a per-building average bar chart and a
//! scatter of every reading side by side into an off-screen [`Buffer`], and
//! stores the result as plain text.

use std::path::Path;

use chrono::NaiveDateTime;
use ratatui::{
    buffer::Buffer,
    layout::{Constraint, Layout, Rect},
    style::{Color, Style},
    symbols::Marker,
    widgets::{Axis, BarChart, Block, Chart, Dataset, GraphType, Widget},
};
use tracing::debug;

use energy_core::error::{EnergyError, Result};
use energy_core::formatting::format_compact;
use energy_core::models::{AggregatedPeriod, BuildingSummary, UnifiedTable};

/// File name of the rendered dashboard.
pub const DASHBOARD_FILE: &str = "dashboard.txt";

const DAILY_TITLE: &str = "Daily Consumption";
const AVERAGE_TITLE: &str = "Avg Weekly Usage per Building";
const SCATTER_TITLE: &str = "Peak Hours Scatter";

/// Plot-ready series for the three panels.
#[derive(Debug, Clone, Default)]
pub struct DashboardData {
    /// `(day index, kWh)` per daily bucket.
    pub daily_points: Vec<(f64, f64)>,
    /// First and last daily period keys, used as x-axis labels.
    pub daily_span: Option<(String, String)>,
    /// `(building, mean kWh)` in summary order.
    pub building_averages: Vec<(String, f64)>,
    /// `(hours since first reading, kWh)` for every reading.
    pub scatter_points: Vec<(f64, f64)>,
    /// Earliest and latest reading timestamps.
    pub scatter_span: Option<(NaiveDateTime, NaiveDateTime)>,
}

impl DashboardData {
    /// Collect the series from the aggregator outputs and the raw table.
    pub fn build(
        daily: &[AggregatedPeriod],
        summary: &BuildingSummary,
        table: &UnifiedTable,
    ) -> Self {
        let daily_points = daily
            .iter()
            .enumerate()
            .map(|(i, p)| (i as f64, p.total_kwh()))
            .collect();
        let daily_span = match (daily.first(), daily.last()) {
            (Some(first), Some(last)) => Some((first.period_key.clone(), last.period_key.clone())),
            _ => None,
        };

        let building_averages = summary
            .iter()
            .filter_map(|(building, stats)| Some((building.to_string(), stats.mean()?)))
            .collect();

        let first = table.readings().iter().map(|r| r.timestamp).min();
        let last = table.readings().iter().map(|r| r.timestamp).max();
        let scatter_span = first.zip(last);
        let scatter_points = match first {
            Some(origin) => table
                .readings()
                .iter()
                .map(|r| {
                    let hours = (r.timestamp - origin).num_seconds() as f64 / 3600.0;
                    (hours, r.kwh)
                })
                .collect(),
            None => Vec::new(),
        };

        Self {
            daily_points,
            daily_span,
            building_averages,
            scatter_points,
            scatter_span,
        }
    }
}

// ── Rendering ─────────────────────────────────────────────────────────────────

/// Render the three panels side by side into `area` of `buf`.
pub fn render_dashboard(data: &DashboardData, area: Rect, buf: &mut Buffer) {
    let [daily_area, average_area, scatter_area] =
        Layout::horizontal([Constraint::Ratio(1, 3); 3]).areas(area);

    render_daily(data, daily_area, buf);
    render_averages(data, average_area, buf);
    render_scatter(data, scatter_area, buf);
}

/// Render the dashboard into a `width` x `height` grid of characters.
pub fn render_to_string(data: &DashboardData, width: u16, height: u16) -> String {
    let area = Rect::new(0, 0, width, height);
    let mut buf = Buffer::empty(area);
    render_dashboard(data, area, &mut buf);
    buffer_to_string(&buf)
}

/// Render the dashboard and write it to `path`.
pub fn write_dashboard(path: &Path, data: &DashboardData, width: u16, height: u16) -> Result<()> {
    let text = render_to_string(data, width, height);
    std::fs::write(path, text).map_err(|source| EnergyError::FileWrite {
        path: path.to_path_buf(),
        source,
    })?;
    debug!("Dashboard ({}x{}) written to {}", width, height, path.display());
    Ok(())
}

fn render_daily(data: &DashboardData, area: Rect, buf: &mut Buffer) {
    let x_bounds = value_bounds(data.daily_points.iter().map(|p| p.0));
    let y_bounds = value_bounds(data.daily_points.iter().map(|p| p.1));
    let x_labels = match &data.daily_span {
        Some((first, last)) => vec![first.clone(), last.clone()],
        None => Vec::new(),
    };

    let dataset = Dataset::default()
        .marker(Marker::Braille)
        .graph_type(GraphType::Line)
        .style(Style::default().fg(Color::Cyan))
        .data(&data.daily_points);

    Chart::new(vec![dataset])
        .block(Block::bordered().title(DAILY_TITLE))
        .x_axis(Axis::default().bounds(x_bounds).labels(x_labels))
        .y_axis(
            Axis::default()
                .title("kWh")
                .bounds(y_bounds)
                .labels(axis_labels(y_bounds)),
        )
        .render(area, buf);
}

fn render_averages(data: &DashboardData, area: Rect, buf: &mut Buffer) {
    let bars: Vec<(&str, u64)> = data
        .building_averages
        .iter()
        .map(|(building, mean)| (building.as_str(), mean.max(0.0).round() as u64))
        .collect();

    // Spread the bars over the inner width, one cell of gap between them.
    let inner = area.width.saturating_sub(2);
    let slots = u16::try_from(bars.len().max(1)).unwrap_or(u16::MAX);
    let bar_width = (inner / slots).saturating_sub(1).clamp(1, 9);

    BarChart::default()
        .block(Block::bordered().title(AVERAGE_TITLE))
        .bar_width(bar_width)
        .bar_gap(1)
        .bar_style(Style::default().fg(Color::Yellow))
        .data(bars.as_slice())
        .render(area, buf);
}

fn render_scatter(data: &DashboardData, area: Rect, buf: &mut Buffer) {
    let x_bounds = value_bounds(data.scatter_points.iter().map(|p| p.0));
    let y_bounds = value_bounds(data.scatter_points.iter().map(|p| p.1));
    let x_labels = match &data.scatter_span {
        Some((first, last)) => vec![
            first.format("%m-%d %H:%M").to_string(),
            last.format("%m-%d %H:%M").to_string(),
        ],
        None => Vec::new(),
    };

    let dataset = Dataset::default()
        .marker(Marker::Dot)
        .graph_type(GraphType::Scatter)
        .style(Style::default().fg(Color::Magenta))
        .data(&data.scatter_points);

    Chart::new(vec![dataset])
        .block(Block::bordered().title(SCATTER_TITLE))
        .x_axis(Axis::default().bounds(x_bounds).labels(x_labels))
        .y_axis(
            Axis::default()
                .title("kWh")
                .bounds(y_bounds)
                .labels(axis_labels(y_bounds)),
        )
        .render(area, buf);
}

// ── Internal helpers ──────────────────────────────────────────────────────────

/// Axis bounds covering zero and every value; never a zero-width range.
fn value_bounds(values: impl Iterator<Item = f64>) -> [f64; 2] {
    let (lo, hi) = values.fold((0.0_f64, 0.0_f64), |(lo, hi), v| (lo.min(v), hi.max(v)));
    if hi - lo < f64::EPSILON {
        [lo, lo + 1.0]
    } else {
        [lo, hi]
    }
}

fn axis_labels(bounds: [f64; 2]) -> Vec<String> {
    vec![
        format_compact(bounds[0]),
        format_compact((bounds[0] + bounds[1]) / 2.0),
        format_compact(bounds[1]),
    ]
}

/// Flatten a buffer into text, one line per row, trailing blanks trimmed.
fn buffer_to_string(buf: &Buffer) -> String {
    let area = buf.area;
    let mut out = String::new();
    for y in area.top()..area.bottom() {
        let mut line = String::new();
        for x in area.left()..area.right() {
            line.push_str(buf[(x, y)].symbol());
        }
        out.push_str(line.trim_end());
        out.push('\n');
    }
    out
}

// ── Tests ──────────────────────────────────────────────────────────────────────
