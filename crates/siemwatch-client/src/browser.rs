//! Paginated, filtered event list.

use std::collections::{BTreeSet, HashSet};
use std::sync::{Mutex, MutexGuard, PoisonError};

use serde::Serialize;
use tokio::io::AsyncWrite;
use tracing::{debug, info, warn};
use url::Url;

use crate::client::{ApiClient, EVENTS_PATH, Freshness};
use crate::error::{ApiError, Result};
use crate::model::{Event, EventPage, Severity};
use crate::pagination::{PageControl, ShowingRange, page_controls};
use crate::query::{EXPORT_PATH, EventQuery, ExportFormat, ExportQuery, FilterField, QueryFilters};
use crate::sequence::{RequestSequence, ResponseOrdering};
use crate::time::format_timestamp;

/// Placeholder shown instead of the table when nothing matches.
pub const NO_RESULTS: &str = "No events found";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BrowserState {
    Idle,
    Loading,
    Rendered,
    Empty,
    Errored,
    /// The backend rejected the session and the navigator was sent to login.
    AwaitingLogin,
}

#[derive(Debug)]
enum Phase {
    Idle,
    Loading,
    Rendered(EventPage),
    Empty(EventPage),
    Errored(String),
    AwaitingLogin,
}

impl Phase {
    fn state(&self) -> BrowserState {
        match self {
            Self::Idle => BrowserState::Idle,
            Self::Loading => BrowserState::Loading,
            Self::Rendered(_) => BrowserState::Rendered,
            Self::Empty(_) => BrowserState::Empty,
            Self::Errored(_) => BrowserState::Errored,
            Self::AwaitingLogin => BrowserState::AwaitingLogin,
        }
    }
}

#[derive(Debug)]
struct Inner {
    filters: QueryFilters,
    page: u32,
    total_pages: u32,
    phase: Phase,
    type_options: Vec<String>,
    expanded: HashSet<String>,
    sequence: RequestSequence,
}

/// One table row of the event list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EventRow {
    pub id: String,
    pub time: String,
    pub event_type: String,
    pub severity: Severity,
    pub hostname: String,
    pub user: String,
    pub process: String,
    pub expanded: bool,
    /// Pretty-printed raw event, present while the row is expanded.
    pub details: Option<String>,
}

impl EventRow {
    fn new(event: &Event, expanded: bool) -> Self {
        Self {
            id: event.id.clone(),
            time: format_timestamp(&event.timestamp),
            event_type: event.display_type().to_string(),
            severity: event.display_severity(),
            hostname: event.display_hostname().to_string(),
            user: event.display_user().to_string(),
            process: event.display_process().to_string(),
            expanded,
            details: expanded.then(|| event.details()),
        }
    }
}

/// Everything needed to draw the event list at one point in time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BrowserSnapshot {
    pub state: BrowserState,
    pub page: u32,
    pub message: Option<String>,
    pub rows: Vec<EventRow>,
    pub controls: Vec<PageControl>,
    pub showing: Option<ShowingRange>,
    pub type_options: Vec<String>,
    pub filters: QueryFilters,
}

/// Event list over `/api/events` with a fixed page size of 50 and a 24 hour
/// window.
///
/// Loads are not cancelled by newer ones. Which response ends up on screen
/// when they overlap is decided by the [`ResponseOrdering`].
pub struct EventBrowser {
    client: ApiClient,
    ordering: ResponseOrdering,
    inner: Mutex<Inner>,
}

impl EventBrowser {
    pub fn new(client: ApiClient) -> Self {
        Self::with_ordering(client, ResponseOrdering::default())
    }

    pub fn with_ordering(client: ApiClient, ordering: ResponseOrdering) -> Self {
        Self {
            client,
            ordering,
            inner: Mutex::new(Inner {
                filters: QueryFilters::default(),
                page: 1,
                total_pages: 1,
                phase: Phase::Idle,
                type_options: Vec::new(),
                expanded: HashSet::new(),
                sequence: RequestSequence::default(),
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn state(&self) -> BrowserState {
        self.lock().phase.state()
    }

    pub fn current_page(&self) -> u32 {
        self.lock().page
    }

    pub fn filters(&self) -> QueryFilters {
        self.lock().filters.clone()
    }

    pub fn set_filter(&self, field: FilterField, value: impl Into<String>) {
        self.lock().filters.set(field, value);
    }

    pub fn set_filters(&self, filters: QueryFilters) {
        self.lock().filters = filters;
    }

    /// Change one filter and reload from the first page.
    pub async fn apply_filter(&self, field: FilterField, value: impl Into<String>) -> BrowserState {
        self.lock().filters.set(field, value);
        self.load_events(1).await
    }

    /// Reload the page currently shown.
    pub async fn refresh(&self) -> BrowserState {
        let page = self.current_page();
        self.load_events(page).await
    }

    /// `page` limited to the page range of the last response.
    pub fn clamp_page(&self, page: u32) -> u32 {
        let pages = self.lock().total_pages.max(1);
        page.clamp(1, pages)
    }

    /// Request exactly `page`. The caller is responsible for keeping it in range.
    pub async fn load_events(&self, page: u32) -> BrowserState {
        let (seq, params) = {
            let mut inner = self.lock();
            inner.page = page;
            inner.phase = Phase::Loading;
            (inner.sequence.issue(), EventQuery::browse(page, &inner.filters).pairs())
        };
        debug!(seq, page, "Loading events");

        let result = self
            .client
            .get_json::<EventPage>(EVENTS_PATH, &params, Freshness::Cached)
            .await;

        let mut inner = self.lock();
        if !inner.sequence.accept(seq, self.ordering) {
            debug!(seq, applied = inner.sequence.applied(), "Discarding stale event page");
            return inner.phase.state();
        }

        inner.phase = match result {
            Err(ApiError::AuthRequired) => Phase::AwaitingLogin,
            Err(e) => {
                warn!(page, error = %e, "Failed to load events");
                Phase::Errored(e.to_string())
            }
            Ok(data) => {
                inner.total_pages = data.total_pages();
                // Detail rows only survive for events still on screen.
                inner
                    .expanded
                    .retain(|id| data.events.iter().any(|event| &event.id == id));
                if data.events.is_empty() {
                    info!(page, total = data.total, "No events matched");
                    Phase::Empty(data)
                } else {
                    inner.type_options = observed_types(&data.events);
                    info!(page = data.page, pages = data.pages, total = data.total, "Events loaded");
                    Phase::Rendered(data)
                }
            }
        };
        inner.phase.state()
    }

    /// Event types seen on the current page, sorted. The list is not a global
    /// index: types absent from this page are not offered.
    pub fn type_options(&self) -> Vec<String> {
        self.lock().type_options.clone()
    }

    /// Flip the detail row of `id` and return whether it is now expanded.
    pub fn toggle_details(&self, id: &str) -> bool {
        let mut inner = self.lock();
        if inner.expanded.remove(id) {
            false
        } else {
            inner.expanded.insert(id.to_string());
            true
        }
    }

    /// Expand the detail row of `id` without toggling. Expansions are dropped
    /// by the next load that does not contain the event.
    pub fn show_details(&self, id: &str) {
        self.lock().expanded.insert(id.to_string());
    }

    pub fn is_expanded(&self, id: &str) -> bool {
        self.lock().expanded.contains(id)
    }

    pub fn snapshot(&self) -> BrowserSnapshot {
        let inner = self.lock();
        let mut snapshot = BrowserSnapshot {
            state: inner.phase.state(),
            page: inner.page,
            message: None,
            rows: Vec::new(),
            controls: Vec::new(),
            showing: None,
            type_options: inner.type_options.clone(),
            filters: inner.filters.clone(),
        };

        match &inner.phase {
            Phase::Idle | Phase::Loading | Phase::AwaitingLogin => {}
            Phase::Errored(message) => snapshot.message = Some(message.clone()),
            Phase::Empty(data) => {
                snapshot.page = data.page;
                snapshot.message = Some(NO_RESULTS.to_string());
                snapshot.showing = Some(ShowingRange::new(data.page, data.per_page, data.total));
            }
            Phase::Rendered(data) => {
                snapshot.page = data.page;
                snapshot.rows = data
                    .events
                    .iter()
                    .map(|event| EventRow::new(event, inner.expanded.contains(&event.id)))
                    .collect();
                snapshot.controls = page_controls(data.page, data.pages);
                snapshot.showing = Some(ShowingRange::new(data.page, data.per_page, data.total));
            }
        }
        snapshot
    }

    pub fn export_query(&self, format: ExportFormat) -> ExportQuery {
        ExportQuery::new(format, &self.lock().filters)
    }

    /// Download URL of the export for the current filters.
    pub fn export_url(&self, format: ExportFormat) -> Result<Url> {
        let params = self.export_query(format).pairs();
        self.client.endpoint(EXPORT_PATH, &params, Freshness::Cached)
    }

    /// Download the export for the current filters into `writer`.
    pub async fn export_events<W>(&self, format: ExportFormat, writer: &mut W) -> Result<u64>
    where
        W: AsyncWrite + Unpin,
    {
        let params = self.export_query(format).pairs();
        let bytes = self.client.download(EXPORT_PATH, &params, writer).await?;
        info!(%format, bytes, "Events exported");
        Ok(bytes)
    }
}

fn observed_types(events: &[Event]) -> Vec<String> {
    events
        .iter()
        .filter_map(|event| event.event_type.clone())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}
