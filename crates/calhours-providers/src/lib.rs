//! Calendar API access for calhours.
//!
//! - [`CalendarApi`] - The seam between listing logic and a concrete backend
//! - [`paginate`] - Lazy item stream over continuation-token pages
//! - [`list_calendars`] - Calendar enumeration with name/selected filtering
//! - [`list_events`] - Event listing for one calendar inside a time window
//! - [`google`] - Google Calendar v3 backend with OAuth credential handling
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────┐      ┌─────────────────────┐
//! │ CredentialProvider│────▶│ GoogleCalendarClient │
//! └──────────────────┘      └──────────┬──────────┘
//!                                      │ CalendarApi
//!                         ┌────────────┴────────────┐
//!                         ▼                         ▼
//!                  list_calendars()           list_events()
//!                         │      paginate()         │
//!                         ▼                         ▼
//!              CalendarDescriptor             EventRecord
//! ```

pub mod calendars;
pub mod error;
pub mod events;
pub mod google;
pub mod pagination;
pub mod provider;

pub use calendars::{list_all_calendars, list_calendars, CalendarFilter};
pub use error::{ProviderError, ProviderErrorCode, ProviderResult};
pub use events::list_events;
pub use pagination::{paginate, pages, Page};
pub use provider::{BoxFuture, CalendarApi};
