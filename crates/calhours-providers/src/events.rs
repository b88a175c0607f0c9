//! Event listing for a single calendar.

use futures_util::TryStreamExt;
use tracing::debug;

use calhours_core::{EventRecord, TimeWindow};

use crate::error::ProviderResult;
use crate::pagination::paginate;
use crate::provider::CalendarApi;

/// Lists every event of `calendar_id` inside `window`, following pages.
///
/// Items keep the backend's start-time order and are concatenated as
/// received: no deduplication across pages.
pub async fn list_events<A>(
    api: &A,
    calendar_id: &str,
    window: TimeWindow,
) -> ProviderResult<Vec<EventRecord>>
where
    A: CalendarApi + ?Sized,
{
    let events: Vec<EventRecord> = paginate(|token| api.events_page(calendar_id, window, token))
        .try_collect()
        .await?;

    debug!(calendar_id, count = events.len(), "fetched events");
    Ok(events)
}
