//! Per-calendar time report.
//!
//! Renders one line per calendar with the total hours spent and the share
//! of a reference total:
//!
//! ```text
//! Time per calendar for the last 7 days
//!   Work           :	 2.25 h /  1.4 %
//! ```

use std::borrow::Cow;
use std::io::{self, Write};

use serde::{Deserialize, Serialize};

/// Default reference total in hours used for the percentage column.
pub const DEFAULT_REFERENCE_HOURS: f64 = 156.0;

/// Default report window in days.
pub const DEFAULT_WINDOW_DAYS: u32 = 7;

/// Longest accepted report window in days.
pub const MAX_WINDOW_DAYS: u32 = 36_500;

/// Width of the calendar name column.
pub const NAME_WIDTH: usize = 15;

/// Settings for building and rendering a report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportSettings {
    /// Hours that represent 100 %.
    pub reference_hours: f64,
    /// Length of the trailing window in days.
    pub window_days: u32,
}

impl Default for ReportSettings {
    fn default() -> Self {
        Self {
            reference_hours: DEFAULT_REFERENCE_HOURS,
            window_days: DEFAULT_WINDOW_DAYS,
        }
    }
}

impl ReportSettings {
    /// Validates the settings.
    pub fn validate(&self) -> Result<(), String> {
        if !self.reference_hours.is_finite() || self.reference_hours <= 0.0 {
            return Err(format!(
                "reference_hours must be a positive number, got {}",
                self.reference_hours
            ));
        }
        if self.window_days == 0 {
            return Err("window_days must be at least 1".to_string());
        }
        if self.window_days > MAX_WINDOW_DAYS {
            return Err(format!(
                "window_days must be at most {}, got {}",
                MAX_WINDOW_DAYS, self.window_days
            ));
        }
        Ok(())
    }
}

/// Total time spent in one calendar.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalendarTotal {
    /// Calendar display name.
    pub name: String,
    /// Total hours.
    pub hours: f64,
}

impl CalendarTotal {
    /// Creates a new total.
    pub fn new(name: impl Into<String>, hours: f64) -> Self {
        Self {
            name: name.into(),
            hours,
        }
    }

    /// Share of `reference_hours`, in percent.
    pub fn percent_of(&self, reference_hours: f64) -> f64 {
        self.hours / reference_hours * 100.0
    }
}

/// A complete report, ready to print.
#[derive(Debug, Clone)]
pub struct Report {
    settings: ReportSettings,
    totals: Vec<CalendarTotal>,
}

impl Report {
    /// Creates a report. Lines keep the order of `totals`.
    pub fn new(settings: ReportSettings, totals: Vec<CalendarTotal>) -> Self {
        Self { settings, totals }
    }

    /// Returns the per-calendar totals.
    pub fn totals(&self) -> &[CalendarTotal] {
        &self.totals
    }

    /// Returns the header line.
    pub fn header(&self) -> String {
        format!(
            "Time per calendar for the last {} days",
            self.settings.window_days
        )
    }

    /// Formats a single calendar line.
    pub fn format_line(&self, total: &CalendarTotal) -> String {
        format!(
            "  {:width$}:\t{:5.2} h / {:4.1} %",
            truncate_name(&total.name, NAME_WIDTH),
            total.hours,
            total.percent_of(self.settings.reference_hours),
            width = NAME_WIDTH,
        )
    }

    /// Returns every output line, header first.
    pub fn lines(&self) -> Vec<String> {
        std::iter::once(self.header())
            .chain(self.totals.iter().map(|t| self.format_line(t)))
            .collect()
    }

    /// Writes the report to `out`.
    pub fn write_to<W: Write>(&self, out: &mut W) -> io::Result<()> {
        for line in self.lines() {
            writeln!(out, "{}", line)?;
        }
        Ok(())
    }
}

/// Keeps at most `max_chars` characters of `name`.
pub fn truncate_name(name: &str, max_chars: usize) -> Cow<'_, str> {
    match name.char_indices().nth(max_chars) {
        Some((byte_idx, _)) => Cow::Borrowed(&name[..byte_idx]),
        None => Cow::Borrowed(name),
    }
}
