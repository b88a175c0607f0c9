//! Core types: time windows, events, duration aggregation, report formatting

pub mod aggregate;
pub mod event;
pub mod report;
pub mod time;
pub mod tracing;

pub use aggregate::{sum_durations, AggregateError, AllDayPolicy};
pub use event::{CalendarDescriptor, EventRecord};
pub use report::{truncate_name, CalendarTotal, Report, ReportSettings, DEFAULT_REFERENCE_HOURS};
pub use time::{EventTime, TimeWindow};
pub use tracing::{init_tracing, TracingConfig, TracingError, TracingOutputFormat};
