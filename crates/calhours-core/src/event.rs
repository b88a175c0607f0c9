//! Calendar and event snapshots.
//!
//! - [`CalendarDescriptor`]: one entry of the user's calendar list
//! - [`EventRecord`]: a single (already expanded) event instance

use serde::{Deserialize, Serialize};

use crate::time::EventTime;

/// A calendar from the user's calendar list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CalendarDescriptor {
    /// Unique identifier for the calendar.
    pub id: String,
    /// Display name (the calendar's summary).
    pub name: String,
    /// Whether this is the account's primary calendar.
    pub primary: bool,
    /// Whether the owner marked the calendar visible in their list.
    pub selected: bool,
    /// Description of the calendar, if any.
    pub description: Option<String>,
    /// Whether the calendar entry was deleted.
    pub deleted: bool,
    /// The calendar timezone (IANA identifier).
    pub time_zone: Option<String>,
}

impl CalendarDescriptor {
    /// Creates a descriptor with the given ID and display name.
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            primary: false,
            selected: false,
            description: None,
            deleted: false,
            time_zone: None,
        }
    }

    /// Builder method to mark as primary.
    pub fn with_primary(mut self, primary: bool) -> Self {
        self.primary = primary;
        self
    }

    /// Builder method to set the selected flag.
    pub fn with_selected(mut self, selected: bool) -> Self {
        self.selected = selected;
        self
    }

    /// Builder method to set the description.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

/// A single event instance inside a calendar.
///
/// Recurring series arrive expanded, so several records may share a
/// series; nothing downstream assumes one record per logical event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventRecord {
    /// Event identifier within the calendar.
    pub id: String,
    /// When the event starts.
    pub start: EventTime,
    /// When the event ends.
    pub end: EventTime,
    /// The calendar this event belongs to.
    pub calendar_id: String,
    /// Event title, if present.
    pub summary: Option<String>,
}

impl EventRecord {
    /// Creates a new event record.
    pub fn new(
        id: impl Into<String>,
        start: EventTime,
        end: EventTime,
        calendar_id: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            start,
            end,
            calendar_id: calendar_id.into(),
            summary: None,
        }
    }

    /// Builder method to set the title.
    pub fn with_summary(mut self, summary: impl Into<String>) -> Self {
        self.summary = Some(summary.into());
        self
    }

    /// Returns true if either boundary is date-only.
    pub fn is_all_day(&self) -> bool {
        self.start.is_all_day() || self.end.is_all_day()
    }
}
