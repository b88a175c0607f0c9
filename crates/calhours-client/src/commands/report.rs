//! The report command: hours per calendar over a trailing window.

use std::io::{self, Write};

use calhours_core::{sum_durations, CalendarTotal, Report, TimeWindow};
use calhours_providers::{list_calendars, list_events, CalendarApi};
use chrono::{DateTime, Utc};
use tracing::{debug, info};

use crate::config::ReportOptions;
use crate::error::{ClientError, ClientResult};

/// Fetches every matching calendar's events and sums them.
///
/// Calendars are fetched one after the other. Nothing is returned unless
/// every calendar was fetched and summed.
pub async fn build_report<A>(
    api: &A,
    options: &ReportOptions,
    now: DateTime<Utc>,
) -> ClientResult<Report>
where
    A: CalendarApi + ?Sized,
{
    let days = options.settings.window_days;
    let window = TimeWindow::trailing(now, days).ok_or_else(|| {
        ClientError::Config(format!(
            "a {} day window starts before the earliest supported date",
            days
        ))
    })?;
    info!(
        start = %window.start,
        end = %window.end,
        backend = api.name(),
        "building report"
    );

    let calendars = list_calendars(api, &options.filter).await?;

    let mut totals = Vec::with_capacity(calendars.len());
    for (name, calendar) in &calendars {
        let events = list_events(api, &calendar.id, window).await?;
        let hours = sum_durations(&events, options.all_day_policy)?;
        debug!(%name, events = events.len(), hours, "calendar summed");
        totals.push(CalendarTotal::new(name.as_str(), hours));
    }

    Ok(Report::new(options.settings.clone(), totals))
}

/// Builds the report and prints it.
pub async fn run<A, W>(api: &A, options: &ReportOptions, out: &mut W) -> ClientResult<()>
where
    A: CalendarApi + ?Sized,
    W: Write,
{
    let report = build_report(api, options, Utc::now()).await?;
    report.write_to(out)?;
    out.flush()?;
    Ok(())
}

/// Prints the report on stdout.
pub async fn print<A>(api: &A, options: &ReportOptions) -> ClientResult<()>
where
    A: CalendarApi + ?Sized,
{
    let stdout = io::stdout();
    let mut out = stdout.lock();
    run(api, options, &mut out).await
}
