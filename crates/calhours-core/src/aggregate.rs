//! Duration aggregation over event records.

use std::fmt;
use std::str::FromStr;

use chrono::Duration;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, trace};

use crate::event::EventRecord;
use crate::time::EventTime;

/// How all-day (date-only) events count towards a total.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AllDayPolicy {
    /// All-day events contribute nothing.
    #[default]
    Exclude,
    /// Each covered day counts as 24 hours.
    FullDay,
}

impl AllDayPolicy {
    /// Returns the configuration name of this policy.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Exclude => "exclude",
            Self::FullDay => "full-day",
        }
    }
}

impl fmt::Display for AllDayPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AllDayPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "exclude" => Ok(Self::Exclude),
            "full-day" => Ok(Self::FullDay),
            other => Err(format!(
                "unknown all-day policy '{}' (expected 'exclude' or 'full-day')",
                other
            )),
        }
    }
}

/// Errors raised while summing event durations.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum AggregateError {
    /// One boundary is a datetime and the other a date.
    #[error("event {event_id} mixes a timed boundary with a date-only boundary")]
    MixedBoundaries {
        /// The offending event.
        event_id: String,
    },

    /// The event ends before it starts.
    #[error("event {event_id} ends before it starts")]
    NegativeDuration {
        /// The offending event.
        event_id: String,
    },
}

/// Sums `end - start` over all events and returns the total in hours.
///
/// # Errors
///
/// Returns an [`AggregateError`] for an event whose end precedes its start
/// or whose boundaries mix datetime and date values.
pub fn sum_durations(events: &[EventRecord], policy: AllDayPolicy) -> Result<f64, AggregateError> {
    let mut total = Duration::zero();
    for event in events {
        if let Some(duration) = event_duration(event, policy)? {
            total += duration;
        }
    }

    trace!(events = events.len(), seconds = total.num_seconds(), "summed durations");
    Ok(total.num_milliseconds() as f64 / 1000.0 / 3600.0)
}

/// Duration of a single event, or `None` if the policy skips it.
fn event_duration(
    event: &EventRecord,
    policy: AllDayPolicy,
) -> Result<Option<Duration>, AggregateError> {
    let duration = match (&event.start, &event.end) {
        (EventTime::DateTime(start), EventTime::DateTime(end)) => *end - *start,
        (EventTime::AllDay(start), EventTime::AllDay(end)) => match policy {
            AllDayPolicy::Exclude => {
                debug!(event_id = %event.id, "skipping all-day event");
                return Ok(None);
            }
            AllDayPolicy::FullDay => Duration::days((*end - *start).num_days()),
        },
        _ => {
            return Err(AggregateError::MixedBoundaries {
                event_id: event.id.clone(),
            });
        }
    };

    if duration < Duration::zero() {
        return Err(AggregateError::NegativeDuration {
            event_id: event.id.clone(),
        });
    }
    Ok(Some(duration))
}
