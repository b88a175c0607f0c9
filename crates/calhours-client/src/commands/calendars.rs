//! The calendars command: list every calendar so names can be picked.

use std::io::{self, Write};

use calhours_core::CalendarDescriptor;
use calhours_providers::{list_all_calendars, CalendarApi};

use crate::error::ClientResult;

/// Formats one listing line: selection mark, name, flags and ID.
pub fn format_calendar(calendar: &CalendarDescriptor) -> String {
    let mark = if calendar.selected { '*' } else { ' ' };
    let mut flags = Vec::new();
    if calendar.primary {
        flags.push("primary");
    }
    if calendar.deleted {
        flags.push("deleted");
    }

    let mut line = format!("{} {}", mark, calendar.name);
    if !flags.is_empty() {
        line.push_str(&format!(" [{}]", flags.join(", ")));
    }
    line.push_str(&format!("  ({})", calendar.id));
    line
}

/// Lists every calendar, in listing order, to `out`.
pub async fn run<A, W>(api: &A, out: &mut W) -> ClientResult<()>
where
    A: CalendarApi + ?Sized,
    W: Write,
{
    let calendars = list_all_calendars(api).await?;
    for calendar in &calendars {
        writeln!(out, "{}", format_calendar(calendar))?;
    }
    writeln!(out)?;
    writeln!(out, "* selected (reported when no calendar_names are given)")?;
    out.flush()?;
    Ok(())
}

/// Lists every calendar on stdout.
pub async fn print<A>(api: &A) -> ClientResult<()>
where
    A: CalendarApi + ?Sized,
{
    let stdout = io::stdout();
    let mut out = stdout.lock();
    run(api, &mut out).await
}
