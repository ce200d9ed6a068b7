//! Query parameters for the event list and the export endpoint.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Fixed page size of the event browser.
pub const EVENTS_PAGE_SIZE: u32 = 50;
/// Fixed time window of the event browser and the export, in hours.
pub const EVENTS_WINDOW_HOURS: u32 = 24;

pub const EXPORT_PATH: &str = "/api/export/events";

/// A user-editable filter of the event list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FilterField {
    Search,
    EventType,
    Severity,
    Hostname,
    User,
}

impl FilterField {
    /// Canonical order in which filters are serialized.
    pub const ALL: [FilterField; 5] = [
        FilterField::Search,
        FilterField::EventType,
        FilterField::Severity,
        FilterField::Hostname,
        FilterField::User,
    ];

    pub fn param(self) -> &'static str {
        match self {
            Self::Search => "search",
            Self::EventType => "event_type",
            Self::Severity => "severity",
            Self::Hostname => "hostname",
            Self::User => "user",
        }
    }

    /// Free-text fields are trimmed; select-style fields are sent as chosen.
    fn trims(self) -> bool {
        matches!(self, Self::Search | Self::Hostname | Self::User)
    }
}

/// Current filter values. Empty values mean "no filter".
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryFilters {
    #[serde(default)]
    pub search: String,
    #[serde(default)]
    pub event_type: String,
    #[serde(default)]
    pub severity: String,
    #[serde(default)]
    pub hostname: String,
    #[serde(default)]
    pub user: String,
}

impl QueryFilters {
    pub fn get(&self, field: FilterField) -> &str {
        match field {
            FilterField::Search => &self.search,
            FilterField::EventType => &self.event_type,
            FilterField::Severity => &self.severity,
            FilterField::Hostname => &self.hostname,
            FilterField::User => &self.user,
        }
    }

    pub fn set(&mut self, field: FilterField, value: impl Into<String>) {
        let slot = match field {
            FilterField::Search => &mut self.search,
            FilterField::EventType => &mut self.event_type,
            FilterField::Severity => &mut self.severity,
            FilterField::Hostname => &mut self.hostname,
            FilterField::User => &mut self.user,
        };
        *slot = value.into();
    }

    pub fn with(mut self, field: FilterField, value: impl Into<String>) -> Self {
        self.set(field, value);
        self
    }

    /// Active filters as query pairs, in canonical order.
    pub fn pairs(&self) -> Vec<(&'static str, String)> {
        FilterField::ALL
            .iter()
            .filter_map(|&field| {
                let raw = self.get(field);
                let value = if field.trims() { raw.trim() } else { raw };
                (!value.is_empty()).then(|| (field.param(), value.to_string()))
            })
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs().is_empty()
    }
}

/// Paginated, filtered request for `/api/events`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventQuery {
    pub page: u32,
    pub per_page: u32,
    pub hours: u32,
    pub filters: QueryFilters,
}

impl EventQuery {
    /// Query with the browser's fixed page size and window.
    pub fn browse(page: u32, filters: &QueryFilters) -> Self {
        Self {
            page,
            per_page: EVENTS_PAGE_SIZE,
            hours: EVENTS_WINDOW_HOURS,
            filters: filters.clone(),
        }
    }

    pub fn pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = vec![
            ("page", self.page.to_string()),
            ("per_page", self.per_page.to_string()),
            ("hours", self.hours.to_string()),
        ];
        pairs.extend(self.filters.pairs());
        pairs
    }

    pub fn to_query_string(&self) -> String {
        encode(&self.pairs())
    }
}

/// Download format of the export endpoint.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    Csv,
    #[default]
    Json,
}

impl ExportFormat {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Csv => "csv",
            Self::Json => "json",
        }
    }

    /// Name the backend suggests for the attachment.
    pub fn file_name(self) -> String {
        format!("events.{}", self.as_str())
    }
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ExportFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "csv" => Ok(Self::Csv),
            "json" => Ok(Self::Json),
            other => Err(format!("Unsupported export format: {other}")),
        }
    }
}

/// Request for `/api/export/events` carrying the current filters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportQuery {
    pub format: ExportFormat,
    pub hours: u32,
    pub filters: QueryFilters,
}

impl ExportQuery {
    pub fn new(format: ExportFormat, filters: &QueryFilters) -> Self {
        Self {
            format,
            hours: EVENTS_WINDOW_HOURS,
            filters: filters.clone(),
        }
    }

    pub fn pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = vec![
            ("format", self.format.as_str().to_string()),
            ("hours", self.hours.to_string()),
        ];
        pairs.extend(self.filters.pairs());
        pairs
    }

    pub fn to_query_string(&self) -> String {
        encode(&self.pairs())
    }
}

fn encode(pairs: &[(&str, String)]) -> String {
    url::form_urlencoded::Serializer::new(String::new())
        .extend_pairs(pairs)
        .finish()
}
