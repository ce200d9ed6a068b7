//! Structured view model handed to renderers.
//!
//! Values reach the renderer as typed cells, never pre-formatted markup, so a
//! hostile hostname or user name stays plain text.

use serde::Serialize;
use time::OffsetDateTime;

use crate::model::Severity;

/// Table and card panels of the dashboard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PanelId {
    ActiveAgents,
    RecentLogins,
    Hosts,
    TopUsers,
    TopProcesses,
}

impl PanelId {
    pub const ALL: [PanelId; 5] = [
        PanelId::ActiveAgents,
        PanelId::RecentLogins,
        PanelId::Hosts,
        PanelId::TopUsers,
        PanelId::TopProcesses,
    ];

    pub fn title(self) -> &'static str {
        match self {
            Self::ActiveAgents => "Active agents",
            Self::RecentLogins => "Recent logins",
            Self::Hosts => "Hosts",
            Self::TopUsers => "Top users",
            Self::TopProcesses => "Top processes",
        }
    }
}

/// Chart views of the dashboard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ChartId {
    EventsByType,
    EventsBySeverity,
    EventsTimeline,
}

impl ChartId {
    pub const ALL: [ChartId; 3] = [
        ChartId::EventsByType,
        ChartId::EventsBySeverity,
        ChartId::EventsTimeline,
    ];

    pub fn title(self) -> &'static str {
        match self {
            Self::EventsByType => "Events by type",
            Self::EventsBySeverity => "Events by severity",
            Self::EventsTimeline => "Events timeline",
        }
    }
}

/// Aggregate counters at the top of the dashboard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CounterId {
    TotalEvents,
    HighSeverity,
    ActiveHosts,
    ActiveUsers,
}

impl CounterId {
    pub const ALL: [CounterId; 4] = [
        CounterId::TotalEvents,
        CounterId::HighSeverity,
        CounterId::ActiveHosts,
        CounterId::ActiveUsers,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Self::TotalEvents => "Total events",
            Self::HighSeverity => "High severity",
            Self::ActiveHosts => "Active hosts",
            Self::ActiveUsers => "Active users",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum Cell {
    Text(String),
    Badge(String),
    Severity(Severity),
    LoginStatus(bool),
}

impl Cell {
    pub fn text(value: impl Into<String>) -> Self {
        Self::Text(value.into())
    }

    pub fn badge(value: impl ToString) -> Self {
        Self::Badge(value.to_string())
    }

    /// Plain text of the cell, as a renderer without styling would show it.
    pub fn plain(&self) -> String {
        match self {
            Self::Text(s) | Self::Badge(s) => s.clone(),
            Self::Severity(severity) => severity.to_string(),
            Self::LoginStatus(true) => "Success".to_string(),
            Self::LoginStatus(false) => "Failure".to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Table {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<Cell>>,
}

impl Table {
    pub fn new<I, S>(headers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            headers: headers.into_iter().map(Into::into).collect(),
            rows: Vec::new(),
        }
    }

    pub fn push_row(&mut self, row: Vec<Cell>) {
        self.rows.push(row);
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Card {
    pub title: String,
    pub badge: String,
}

/// What a panel currently shows.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum PanelContent {
    Table(Table),
    Cards(Vec<Card>),
    Empty(String),
    Error(String),
}

impl PanelContent {
    pub fn is_error(&self) -> bool {
        matches!(self, Self::Error(_))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ChartKind {
    Pie,
    Bar,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChartPoint {
    pub label: String,
    pub count: u64,
    pub color: String,
}

/// Everything a chart backend needs to draw one chart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChartSpec {
    pub kind: ChartKind,
    pub dataset_label: Option<String>,
    pub points: Vec<ChartPoint>,
}

/// A drawn chart. It must be disposed before a replacement is drawn.
pub trait Chart: Send {
    fn dispose(&mut self);
}

/// Opaque charting facility.
pub trait ChartBackend: Send + Sync {
    fn create(&self, id: ChartId, spec: &ChartSpec) -> Box<dyn Chart>;
}

/// Receiver of dashboard updates. Each call targets exactly one view.
pub trait DashboardSink: Send + Sync {
    fn panel(&self, id: PanelId, content: PanelContent);

    fn counter(&self, id: CounterId, value: u64);

    /// A refresh round started.
    fn refreshed(&self, round: u64, at: OffsetDateTime);
}
