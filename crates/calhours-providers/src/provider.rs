//! The calendar API seam.
//!
//! [`CalendarApi`] exposes the two paginated list operations the report
//! needs. The Google client implements it over HTTP; tests implement it
//! with canned pages.

use std::future::Future;
use std::pin::Pin;

use calhours_core::{CalendarDescriptor, EventRecord, TimeWindow};

use crate::error::ProviderResult;
use crate::pagination::Page;

/// A boxed future for object-safe async trait methods.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Page-level access to a calendar backend.
///
/// Each call fetches exactly one page. `page_token` is `None` for the first
/// page and the previous page's continuation token afterwards.
pub trait CalendarApi: Send + Sync {
    /// Returns the name of this backend (e.g. "google").
    fn name(&self) -> &str;

    /// Fetches one page of the user's calendar list.
    fn calendar_list_page(
        &self,
        page_token: Option<String>,
    ) -> BoxFuture<'_, ProviderResult<Page<CalendarDescriptor>>>;

    /// Fetches one page of a calendar's events inside `window`.
    ///
    /// Implementations must expand recurring events into single instances
    /// and order results by start time.
    fn events_page<'a>(
        &'a self,
        calendar_id: &'a str,
        window: TimeWindow,
        page_token: Option<String>,
    ) -> BoxFuture<'a, ProviderResult<Page<EventRecord>>>;
}
