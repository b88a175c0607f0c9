//! Calendar enumeration.

use std::collections::{BTreeMap, BTreeSet};
use std::pin::pin;

use futures_util::TryStreamExt;
use tracing::{debug, warn};

use calhours_core::CalendarDescriptor;

use crate::error::ProviderResult;
use crate::pagination::paginate;
use crate::provider::CalendarApi;

/// Which calendars a report covers.
///
/// Without names, the calendars the owner marked as selected are used.
/// With names, exactly the calendars whose display name is listed are
/// used, whatever their selected flag.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CalendarFilter {
    names: Option<BTreeSet<String>>,
}

impl CalendarFilter {
    /// Selects the calendars flagged as selected.
    pub fn selected() -> Self {
        Self::default()
    }

    /// Selects calendars by display name.
    pub fn named<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            names: Some(names.into_iter().map(Into::into).collect()),
        }
    }

    /// Builds a filter from an optional name list; `None` means selected.
    pub fn from_names(names: Option<Vec<String>>) -> Self {
        match names {
            Some(names) => Self::named(names),
            None => Self::selected(),
        }
    }

    /// Returns the configured names, if any.
    pub fn names(&self) -> Option<&BTreeSet<String>> {
        self.names.as_ref()
    }

    /// Returns true if `calendar` passes the filter.
    pub fn matches(&self, calendar: &CalendarDescriptor) -> bool {
        match &self.names {
            None => calendar.selected,
            Some(names) => names.contains(&calendar.name),
        }
    }
}

/// Lists the calendars passing `filter`, keyed by display name.
///
/// A later calendar with the same display name replaces an earlier one.
pub async fn list_calendars<A>(
    api: &A,
    filter: &CalendarFilter,
) -> ProviderResult<BTreeMap<String, CalendarDescriptor>>
where
    A: CalendarApi + ?Sized,
{
    let mut calendars = BTreeMap::new();
    let mut stream = pin!(paginate(|token| api.calendar_list_page(token)));

    while let Some(calendar) = stream.try_next().await? {
        if !filter.matches(&calendar) {
            continue;
        }
        if let Some(previous) = calendars.insert(calendar.name.clone(), calendar) {
            debug!(name = %previous.name, id = %previous.id, "duplicate calendar name replaced");
        }
    }

    if let Some(names) = filter.names() {
        for name in names.iter().filter(|n| !calendars.contains_key(*n)) {
            warn!(%name, "no calendar with this name");
        }
    }

    debug!(count = calendars.len(), "calendars matched");
    Ok(calendars)
}

/// Lists every calendar in listing order, unfiltered.
pub async fn list_all_calendars<A>(api: &A) -> ProviderResult<Vec<CalendarDescriptor>>
where
    A: CalendarApi + ?Sized,
{
    paginate(|token| api.calendar_list_page(token))
        .try_collect()
        .await
}
