//! Google Calendar API client.
//!
//! Low-level HTTP access to `calendarList.list` and `events.list`, one page
//! per call. Pagination itself lives in [`crate::pagination`].

use std::time::Duration;

use calhours_core::{CalendarDescriptor, EventRecord, EventTime, TimeWindow};
use chrono::{DateTime, NaiveDate};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::error::{ProviderError, ProviderResult};
use crate::pagination::Page;
use crate::provider::{BoxFuture, CalendarApi};

use super::config::GoogleConfig;

/// Google Calendar API client.
#[derive(Debug)]
pub struct GoogleCalendarClient {
    http_client: reqwest::Client,
    access_token: String,
    base_url: String,
}

impl GoogleCalendarClient {
    /// Creates a new client authenticating with `access_token`.
    pub fn new(access_token: impl Into<String>, timeout: Duration) -> ProviderResult<Self> {
        Self::build(access_token.into(), timeout, None)
    }

    /// Creates a client from a provider configuration.
    pub fn from_config(
        access_token: impl Into<String>,
        config: &GoogleConfig,
    ) -> ProviderResult<Self> {
        Ok(
            Self::build(access_token.into(), config.timeout, Some(&config.user_agent))?
                .with_base_url(&config.api_base_url),
        )
    }

    fn build(
        access_token: String,
        timeout: Duration,
        user_agent: Option<&str>,
    ) -> ProviderResult<Self> {
        let mut builder = reqwest::Client::builder().timeout(timeout);
        if let Some(agent) = user_agent {
            builder = builder.user_agent(agent);
        }
        let http_client = builder.build().map_err(|e| {
            ProviderError::internal("failed to create HTTP client").with_source(e)
        })?;

        Ok(Self {
            http_client,
            access_token,
            base_url: GoogleConfig::DEFAULT_API_BASE_URL.to_string(),
        })
    }

    /// Points the client at another API root.
    pub fn with_base_url(mut self, base_url: impl AsRef<str>) -> Self {
        self.base_url = base_url.as_ref().trim_end_matches('/').to_string();
        self
    }

    /// Fetches one page of the calendar list.
    pub async fn fetch_calendar_list_page(
        &self,
        page_token: Option<&str>,
    ) -> ProviderResult<Page<CalendarDescriptor>> {
        let url = format!("{}/users/me/calendarList", self.base_url);
        let mut query: Vec<(&str, String)> = Vec::new();
        if let Some(token) = page_token {
            query.push(("pageToken", token.to_string()));
        }

        let response: CalendarListResponse = self.get_json(&url, &query).await?;
        debug!(
            count = response.items.len(),
            more = response.next_page_token.is_some(),
            "fetched calendar list page"
        );

        let items = response
            .items
            .into_iter()
            .map(CalendarListEntry::into_descriptor)
            .collect();
        Ok(Page {
            items,
            next_page_token: response.next_page_token,
        })
    }

    /// Fetches one page of a calendar's events inside `window`.
    ///
    /// Recurring events are expanded server side and ordered by start time.
    pub async fn fetch_events_page(
        &self,
        calendar_id: &str,
        window: TimeWindow,
        page_token: Option<&str>,
    ) -> ProviderResult<Page<EventRecord>> {
        let url = format!(
            "{}/calendars/{}/events",
            self.base_url,
            urlencoding::encode(calendar_id)
        );

        let mut query = vec![
            ("timeMin", window.time_min_param()),
            ("timeMax", window.time_max_param()),
            ("singleEvents", "true".to_string()),
            ("orderBy", "startTime".to_string()),
        ];
        if let Some(token) = page_token {
            query.push(("pageToken", token.to_string()));
        }

        let response: EventListResponse = self.get_json(&url, &query).await?;
        debug!(
            calendar_id,
            count = response.items.len(),
            more = response.next_page_token.is_some(),
            "fetched events page"
        );

        let items = response
            .items
            .into_iter()
            .map(|event| event.into_record(calendar_id))
            .collect::<ProviderResult<Vec<_>>>()?;
        Ok(Page {
            items,
            next_page_token: response.next_page_token,
        })
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        url: &str,
        query: &[(&str, String)],
    ) -> ProviderResult<T> {
        let response = self
            .http_client
            .get(url)
            .bearer_auth(&self.access_token)
            .query(query)
            .send()
            .await
            .map_err(|e| {
                let message = if e.is_timeout() {
                    "request timeout".to_string()
                } else if e.is_connect() {
                    format!("connection failed: {}", e)
                } else {
                    format!("request failed: {}", e)
                };
                ProviderError::network(message).with_source(e)
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            debug!(%status, url, "API request failed");
            return Err(ProviderError::from_http_status(status.as_u16(), &body));
        }

        let body = response
            .text()
            .await
            .map_err(|e| ProviderError::network("failed to read response").with_source(e))?;

        serde_json::from_str(&body).map_err(|e| {
            ProviderError::invalid_response(format!("failed to parse response: {}", e))
        })
    }
}

impl CalendarApi for GoogleCalendarClient {
    fn name(&self) -> &str {
        "google"
    }

    fn calendar_list_page(
        &self,
        page_token: Option<String>,
    ) -> BoxFuture<'_, ProviderResult<Page<CalendarDescriptor>>> {
        Box::pin(async move {
            self.fetch_calendar_list_page(page_token.as_deref())
                .await
                .map_err(|e| e.with_provider("google"))
        })
    }

    fn events_page<'a>(
        &'a self,
        calendar_id: &'a str,
        window: TimeWindow,
        page_token: Option<String>,
    ) -> BoxFuture<'a, ProviderResult<Page<EventRecord>>> {
        Box::pin(async move {
            self.fetch_events_page(calendar_id, window, page_token.as_deref())
                .await
                .map_err(|e| e.with_provider("google"))
        })
    }
}

/// Response from the calendarList endpoint.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CalendarListResponse {
    #[serde(default)]
    items: Vec<CalendarListEntry>,
    next_page_token: Option<String>,
}

/// A calendar from the calendar list.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CalendarListEntry {
    id: String,
    summary: String,
    description: Option<String>,
    #[serde(default)]
    primary: bool,
    #[serde(default)]
    selected: bool,
    #[serde(default)]
    deleted: bool,
    time_zone: Option<String>,
}

impl CalendarListEntry {
    fn into_descriptor(self) -> CalendarDescriptor {
        CalendarDescriptor {
            id: self.id,
            name: self.summary,
            primary: self.primary,
            selected: self.selected,
            description: self.description,
            deleted: self.deleted,
            time_zone: self.time_zone,
        }
    }
}

/// Response from the events.list endpoint.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct EventListResponse {
    #[serde(default)]
    items: Vec<ApiEvent>,
    next_page_token: Option<String>,
}

/// A single event from the Google Calendar API.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApiEvent {
    id: String,
    summary: Option<String>,
    start: Option<ApiEventTime>,
    end: Option<ApiEventTime>,
}

impl ApiEvent {
    fn into_record(self, calendar_id: &str) -> ProviderResult<EventRecord> {
        let start = parse_boundary(&self.id, "start", self.start.as_ref())?;
        let end = parse_boundary(&self.id, "end", self.end.as_ref())?;
        let mut record = EventRecord::new(self.id, start, end, calendar_id);
        record.summary = self.summary;
        Ok(record)
    }
}

/// Event time from the API.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApiEventTime {
    date: Option<String>,
    date_time: Option<String>,
}

/// Parses a start or end boundary. Missing or malformed values are fatal.
fn parse_boundary(
    event_id: &str,
    which: &str,
    time: Option<&ApiEventTime>,
) -> ProviderResult<EventTime> {
    let invalid = |detail: String| {
        ProviderError::invalid_response(format!("event {} has {} {}", event_id, detail, which))
    };

    match time {
        Some(ApiEventTime {
            date_time: Some(dt),
            ..
        }) => DateTime::parse_from_rfc3339(dt)
            .map(EventTime::from_local)
            .map_err(|e| invalid(format!("a malformed ({}: {:?})", e, dt))),
        Some(ApiEventTime {
            date: Some(date), ..
        }) => NaiveDate::parse_from_str(date, "%Y-%m-%d")
            .map(EventTime::from_date)
            .map_err(|e| invalid(format!("a malformed ({}: {:?})", e, date))),
        _ => Err(invalid("no".to_string())),
    }
}
