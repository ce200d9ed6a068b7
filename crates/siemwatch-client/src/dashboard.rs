//! Periodic refresh of the dashboard views.
//!
//! Every round fetches eight views and four aggregate counters. Each fetch is
//! independent: it runs in its own task, renders only into its own view and a
//! failure never reaches its siblings. Rounds are not joined, so a slow
//! backend leads to overlapping rounds; per-view sequence numbers keep a late
//! response from replacing a newer one.

use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use serde::de::DeserializeOwned;
use time::OffsetDateTime;
use tokio::time::{MissedTickBehavior, interval};
use tokio_util::sync::CancellationToken;
use tracing::{Instrument, Span, debug, error, info, info_span, warn};

use crate::client::{ApiClient, EVENTS_PATH, Freshness};
use crate::error::ApiError;
use crate::model::{
    ActiveAgent, EventPage, HostSummary, ProcessCount, RecentLogin, Severity, SeverityCount,
    TimelineBucket, TypeCount, UserCount,
};
use crate::sequence::{RequestSequence, ResponseOrdering};
use crate::time::format_timestamp;
use crate::view::{
    Card, Cell, Chart, ChartBackend, ChartId, ChartKind, ChartPoint, ChartSpec, CounterId,
    DashboardSink, PanelContent, PanelId, Table,
};

pub const DEFAULT_REFRESH_INTERVAL: Duration = Duration::from_secs(5);
/// Window of the per-panel queries.
pub const PANEL_WINDOW_HOURS: u32 = 24;
/// Window of the aggregate counters, a week against the panels' day.
pub const STATS_WINDOW_HOURS: u32 = 168;
pub const LIST_LIMIT: u32 = 10;
pub const STATS_USER_LIMIT: u32 = 100;

const TYPE_PALETTE: [&str; 8] = [
    "#FF6384", "#36A2EB", "#FFCE56", "#4BC0C0", "#9966FF", "#FF9F40", "#FF6384", "#C9CBCF",
];
const TIMELINE_COLOR: &str = "#007bff";
const EVENTS_DATASET: &str = "Events";

mod paths {
    pub const ACTIVE_AGENTS: &str = "/api/dashboard/active-agents";
    pub const RECENT_LOGINS: &str = "/api/dashboard/recent-logins";
    pub const HOSTS: &str = "/api/dashboard/hosts";
    pub const EVENTS_BY_TYPE: &str = "/api/dashboard/events-by-type";
    pub const EVENTS_BY_SEVERITY: &str = "/api/dashboard/events-by-severity";
    pub const TOP_USERS: &str = "/api/dashboard/top-users";
    pub const TOP_PROCESSES: &str = "/api/dashboard/top-processes";
    pub const EVENTS_TIMELINE: &str = "/api/dashboard/events-timeline";
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DashboardConfig {
    pub refresh_interval: Duration,
    pub panel_hours: u32,
    pub stats_hours: u32,
    pub list_limit: u32,
    pub stats_user_limit: u32,
    pub ordering: ResponseOrdering,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            refresh_interval: DEFAULT_REFRESH_INTERVAL,
            panel_hours: PANEL_WINDOW_HOURS,
            stats_hours: STATS_WINDOW_HOURS,
            list_limit: LIST_LIMIT,
            stats_user_limit: STATS_USER_LIMIT,
            ordering: ResponseOrdering::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum ViewKey {
    Panel(PanelId),
    Chart(ChartId),
    Counter(CounterId),
}

#[derive(Default)]
struct ViewState {
    sequence: RequestSequence,
    chart: Option<Box<dyn Chart>>,
}

#[derive(Default)]
struct Views {
    slots: Mutex<HashMap<ViewKey, ViewState>>,
}

impl Views {
    fn lock(&self) -> MutexGuard<'_, HashMap<ViewKey, ViewState>> {
        self.slots.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn issue(&self, key: ViewKey) -> u64 {
        self.lock().entry(key).or_default().sequence.issue()
    }

    /// Run `render` on the view if response `seq` may still be applied.
    fn apply<F>(&self, key: ViewKey, seq: u64, ordering: ResponseOrdering, render: F) -> bool
    where
        F: FnOnce(&mut ViewState),
    {
        let mut slots = self.lock();
        let state = slots.entry(key).or_default();
        if !state.sequence.accept(seq, ordering) {
            debug!(?key, seq, applied = state.sequence.applied(), "Discarding stale response");
            return false;
        }
        render(state);
        true
    }
}

/// Drives the dashboard views.
pub struct DashboardPoller {
    client: ApiClient,
    sink: Arc<dyn DashboardSink>,
    charts: Arc<dyn ChartBackend>,
    config: DashboardConfig,
    views: Views,
    rounds: AtomicU64,
}

impl DashboardPoller {
    pub fn new(
        client: ApiClient,
        sink: Arc<dyn DashboardSink>,
        charts: Arc<dyn ChartBackend>,
        config: DashboardConfig,
    ) -> Self {
        Self {
            client,
            sink,
            charts,
            config,
            views: Views::default(),
            rounds: AtomicU64::new(0),
        }
    }

    pub fn config(&self) -> &DashboardConfig {
        &self.config
    }

    /// Refresh immediately and then on every interval until `shutdown` fires.
    pub async fn run(self: Arc<Self>, shutdown: CancellationToken) {
        let mut ticker = interval(self.config.refresh_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        info!(
            interval_ms = self.config.refresh_interval.as_millis() as u64,
            "Dashboard poller started"
        );

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => break,
                _ = ticker.tick() => {
                    self.refresh_all();
                }
            }
        }

        info!(rounds = self.rounds.load(Ordering::Relaxed), "Dashboard poller stopped");
    }

    /// Start a round: spawn every fetch and return without waiting for them.
    pub fn refresh_all(self: &Arc<Self>) -> u64 {
        let round = self.start_round();
        let span = info_span!("dashboard_round", round);

        self.spawn_view(&span, |p| async move { p.load_active_agents().await });
        self.spawn_view(&span, |p| async move { p.load_recent_logins().await });
        self.spawn_view(&span, |p| async move { p.load_hosts().await });
        self.spawn_view(&span, |p| async move { p.load_events_by_type().await });
        self.spawn_view(&span, |p| async move { p.load_events_by_severity().await });
        self.spawn_view(&span, |p| async move { p.load_top_users().await });
        self.spawn_view(&span, |p| async move { p.load_top_processes().await });
        self.spawn_view(&span, |p| async move { p.load_events_timeline().await });
        self.spawn_view(&span, |p| async move { p.load_total_events().await });
        self.spawn_view(&span, |p| async move { p.load_high_severity().await });
        self.spawn_view(&span, |p| async move { p.load_active_hosts().await });
        self.spawn_view(&span, |p| async move { p.load_active_users().await });

        round
    }

    /// Run one round to completion. Used for one-shot rendering.
    pub async fn refresh_once(&self) -> u64 {
        let round = self.start_round();
        let span = info_span!("dashboard_round", round);

        async {
            tokio::join!(
                self.load_active_agents(),
                self.load_recent_logins(),
                self.load_hosts(),
                self.load_events_by_type(),
                self.load_events_by_severity(),
                self.load_top_users(),
                self.load_top_processes(),
                self.load_events_timeline(),
                self.load_statistics(),
            );
        }
        .instrument(span)
        .await;

        round
    }

    fn start_round(&self) -> u64 {
        let round = self.rounds.fetch_add(1, Ordering::Relaxed) + 1;
        self.sink.refreshed(round, OffsetDateTime::now_utc());
        round
    }

    fn spawn_view<F, Fut>(self: &Arc<Self>, span: &Span, fetch: F)
    where
        F: FnOnce(Arc<Self>) -> Fut,
        Fut: Future<Output = ()> + Send + 'static,
    {
        tokio::spawn(fetch(Arc::clone(self)).instrument(span.clone()));
    }

    fn hours(&self) -> (&'static str, String) {
        ("hours", self.config.panel_hours.to_string())
    }

    fn limit(&self) -> (&'static str, String) {
        ("limit", self.config.list_limit.to_string())
    }

    pub async fn load_active_agents(&self) {
        let hours = self.config.panel_hours;
        self.load_panel(
            PanelId::ActiveAgents,
            paths::ACTIVE_AGENTS,
            vec![self.hours()],
            "No active agents",
            |rows: Vec<ActiveAgent>| agents_table(&rows, hours),
        )
        .await;
    }

    pub async fn load_recent_logins(&self) {
        self.load_panel(
            PanelId::RecentLogins,
            paths::RECENT_LOGINS,
            vec![self.limit()],
            "No login data",
            |rows: Vec<RecentLogin>| logins_table(&rows),
        )
        .await;
    }

    pub async fn load_hosts(&self) {
        self.load_panel(
            PanelId::Hosts,
            paths::HOSTS,
            vec![self.hours()],
            "No host data",
            |rows: Vec<HostSummary>| host_cards(&rows),
        )
        .await;
    }

    pub async fn load_top_users(&self) {
        self.load_panel(
            PanelId::TopUsers,
            paths::TOP_USERS,
            vec![self.hours(), self.limit()],
            "No data",
            |rows: Vec<UserCount>| {
                count_table("User", rows.iter().map(|r| (r.user.as_str(), r.count)))
            },
        )
        .await;
    }

    pub async fn load_top_processes(&self) {
        self.load_panel(
            PanelId::TopProcesses,
            paths::TOP_PROCESSES,
            vec![self.hours(), self.limit()],
            "No data",
            |rows: Vec<ProcessCount>| {
                count_table("Process", rows.iter().map(|r| (r.process.as_str(), r.count)))
            },
        )
        .await;
    }

    pub async fn load_events_by_type(&self) {
        self.load_chart(
            ChartId::EventsByType,
            paths::EVENTS_BY_TYPE,
            vec![self.hours()],
            |rows: Vec<TypeCount>| type_chart(&rows),
        )
        .await;
    }

    pub async fn load_events_by_severity(&self) {
        self.load_chart(
            ChartId::EventsBySeverity,
            paths::EVENTS_BY_SEVERITY,
            vec![self.hours()],
            |rows: Vec<SeverityCount>| severity_chart(&rows),
        )
        .await;
    }

    pub async fn load_events_timeline(&self) {
        self.load_chart(
            ChartId::EventsTimeline,
            paths::EVENTS_TIMELINE,
            vec![self.hours()],
            |rows: Vec<TimelineBucket>| timeline_chart(&rows),
        )
        .await;
    }

    /// The four aggregate counters, over the longer statistics window.
    pub async fn load_statistics(&self) {
        tokio::join!(
            self.load_total_events(),
            self.load_high_severity(),
            self.load_active_hosts(),
            self.load_active_users(),
        );
    }

    fn stats_hours(&self) -> (&'static str, String) {
        ("hours", self.config.stats_hours.to_string())
    }

    async fn load_total_events(&self) {
        self.load_counter(
            CounterId::TotalEvents,
            EVENTS_PATH,
            vec![("per_page", "1".to_string()), self.stats_hours()],
            |page: EventPage| page.total,
        )
        .await;
    }

    async fn load_high_severity(&self) {
        self.load_counter(
            CounterId::HighSeverity,
            paths::EVENTS_BY_SEVERITY,
            vec![self.stats_hours()],
            |rows: Vec<SeverityCount>| {
                rows.iter()
                    .find(|r| r.severity == Severity::High)
                    .map_or(0, |r| r.count)
            },
        )
        .await;
    }

    async fn load_active_hosts(&self) {
        self.load_counter(
            CounterId::ActiveHosts,
            paths::HOSTS,
            vec![self.stats_hours()],
            |rows: Vec<HostSummary>| rows.len() as u64,
        )
        .await;
    }

    async fn load_active_users(&self) {
        self.load_counter(
            CounterId::ActiveUsers,
            paths::TOP_USERS,
            vec![
                self.stats_hours(),
                ("limit", self.config.stats_user_limit.to_string()),
            ],
            |rows: Vec<UserCount>| rows.len() as u64,
        )
        .await;
    }

    async fn load_panel<T, F>(
        &self,
        panel: PanelId,
        path: &str,
        params: Vec<(&'static str, String)>,
        empty_message: &str,
        build: F,
    ) where
        T: DeserializeOwned,
        F: FnOnce(Vec<T>) -> PanelContent,
    {
        let key = ViewKey::Panel(panel);
        let seq = self.views.issue(key);

        let content = match self
            .client
            .get_json::<Vec<T>>(path, &params, Freshness::Realtime)
            .await
        {
            Err(ApiError::AuthRequired) => return,
            Err(e) => {
                warn!(?panel, error = %e, "Panel refresh failed");
                PanelContent::Error(e.to_string())
            }
            Ok(rows) if rows.is_empty() => PanelContent::Empty(empty_message.to_string()),
            Ok(rows) => build(rows),
        };

        self.views.apply(key, seq, self.config.ordering, |_| {
            self.sink.panel(panel, content);
        });
    }

    /// Charts keep their previous rendering when a refresh fails.
    async fn load_chart<T, F>(
        &self,
        chart: ChartId,
        path: &str,
        params: Vec<(&'static str, String)>,
        build: F,
    ) where
        T: DeserializeOwned,
        F: FnOnce(Vec<T>) -> ChartSpec,
    {
        let key = ViewKey::Chart(chart);
        let seq = self.views.issue(key);

        let rows = match self
            .client
            .get_json::<Vec<T>>(path, &params, Freshness::Realtime)
            .await
        {
            Ok(rows) => rows,
            Err(ApiError::AuthRequired) => return,
            Err(e) => {
                warn!(?chart, error = %e, "Chart refresh failed, keeping previous chart");
                return;
            }
        };
        let spec = build(rows);

        self.views.apply(key, seq, self.config.ordering, |state| {
            if let Some(mut previous) = state.chart.take() {
                previous.dispose();
            }
            state.chart = Some(self.charts.create(chart, &spec));
        });
    }

    /// Counters fall back to zero on any failure.
    async fn load_counter<T, F>(
        &self,
        counter: CounterId,
        path: &str,
        params: Vec<(&'static str, String)>,
        extract: F,
    ) where
        T: DeserializeOwned,
        F: FnOnce(T) -> u64,
    {
        let key = ViewKey::Counter(counter);
        let seq = self.views.issue(key);

        let value = match self
            .client
            .get_json::<T>(path, &params, Freshness::Realtime)
            .await
        {
            Ok(data) => extract(data),
            Err(ApiError::AuthRequired) => 0,
            Err(e) => {
                error!(?counter, error = %e, "Failed to load statistic");
                0
            }
        };

        self.views.apply(key, seq, self.config.ordering, |_| {
            self.sink.counter(counter, value);
        });
    }
}

impl Drop for DashboardPoller {
    fn drop(&mut self) {
        for state in self.views.lock().values_mut() {
            if let Some(mut chart) = state.chart.take() {
                chart.dispose();
            }
        }
    }
}

fn agents_table(rows: &[ActiveAgent], hours: u32) -> PanelContent {
    let events_header = format!("Events ({hours}h)");
    let mut table = Table::new(["Host".to_string(), "Last activity".to_string(), events_header]);
    for agent in rows {
        table.push_row(vec![
            Cell::text(&agent.hostname),
            Cell::text(format_timestamp(&agent.last_activity)),
            Cell::badge(agent.event_count),
        ]);
    }
    PanelContent::Table(table)
}

fn logins_table(rows: &[RecentLogin]) -> PanelContent {
    let mut table = Table::new(["Time", "User", "Host", "Status", "Type"]);
    for login in rows {
        table.push_row(vec![
            Cell::text(format_timestamp(&login.timestamp)),
            Cell::text(login.user.as_deref().unwrap_or(crate::model::UNKNOWN)),
            Cell::text(&login.hostname),
            Cell::LoginStatus(login.is_success()),
            Cell::badge(&login.event_type),
        ]);
    }
    PanelContent::Table(table)
}

fn host_cards(rows: &[HostSummary]) -> PanelContent {
    PanelContent::Cards(
        rows.iter()
            .map(|host| Card {
                title: host.hostname.clone(),
                badge: format!("{} events", host.event_count),
            })
            .collect(),
    )
}

fn count_table<'a>(label: &str, rows: impl Iterator<Item = (&'a str, u64)>) -> PanelContent {
    let mut table = Table::new([label, "Events"]);
    for (name, count) in rows {
        table.push_row(vec![Cell::text(name), Cell::badge(count)]);
    }
    PanelContent::Table(table)
}

fn type_chart(rows: &[TypeCount]) -> ChartSpec {
    ChartSpec {
        kind: ChartKind::Pie,
        dataset_label: None,
        points: rows
            .iter()
            .zip(TYPE_PALETTE.iter().cycle())
            .map(|(row, color)| ChartPoint {
                label: row.event_type.clone(),
                count: row.count,
                color: (*color).to_string(),
            })
            .collect(),
    }
}

fn severity_chart(rows: &[SeverityCount]) -> ChartSpec {
    ChartSpec {
        kind: ChartKind::Bar,
        dataset_label: Some(EVENTS_DATASET.to_string()),
        points: rows
            .iter()
            .map(|row| ChartPoint {
                label: row.severity.to_string(),
                count: row.count,
                color: row.severity.color().to_string(),
            })
            .collect(),
    }
}

fn timeline_chart(rows: &[TimelineBucket]) -> ChartSpec {
    ChartSpec {
        kind: ChartKind::Bar,
        dataset_label: Some(EVENTS_DATASET.to_string()),
        points: rows
            .iter()
            .map(|row| ChartPoint {
                label: row.hour.clone(),
                count: row.count,
                color: TIMELINE_COLOR.to_string(),
            })
            .collect(),
    }
}
