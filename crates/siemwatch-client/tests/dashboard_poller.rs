use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use serde_json::json;
use siemwatch_client::client::ApiClient;
use siemwatch_client::dashboard::{DashboardConfig, DashboardPoller};
use siemwatch_client::sequence::ResponseOrdering;
use siemwatch_client::view::{
    Chart, ChartBackend, ChartId, ChartKind, ChartSpec, CounterId, DashboardSink, PanelContent, PanelId,
};
use time::OffsetDateTime;
use tokio_util::sync::CancellationToken;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[derive(Default)]
struct RecordingSink {
    panels: Mutex<HashMap<PanelId, PanelContent>>,
    counters: Mutex<HashMap<CounterId, u64>>,
    rounds: Mutex<Vec<u64>>,
}

impl DashboardSink for RecordingSink {
    fn panel(&self, id: PanelId, content: PanelContent) {
        self.panels.lock().unwrap().insert(id, content);
    }

    fn counter(&self, id: CounterId, value: u64) {
        self.counters.lock().unwrap().insert(id, value);
    }

    fn refreshed(&self, round: u64, _at: OffsetDateTime) {
        self.rounds.lock().unwrap().push(round);
    }
}

#[derive(Default)]
struct ChartLog {
    created: Mutex<Vec<(ChartId, ChartSpec)>>,
    live: AtomicUsize,
    disposed: AtomicUsize,
}

struct CountingBackend(Arc<ChartLog>);

struct CountingChart(Arc<ChartLog>);

impl Chart for CountingChart {
    fn dispose(&mut self) {
        self.0.live.fetch_sub(1, Ordering::SeqCst);
        self.0.disposed.fetch_add(1, Ordering::SeqCst);
    }
}

impl ChartBackend for CountingBackend {
    fn create(&self, id: ChartId, spec: &ChartSpec) -> Box<dyn Chart> {
        let live = self.0.live.fetch_add(1, Ordering::SeqCst);
        assert!(live < ChartId::ALL.len(), "chart created before its predecessor was disposed");
        self.0.created.lock().unwrap().push((id, spec.clone()));
        Box::new(CountingChart(Arc::clone(&self.0)))
    }
}

async fn mount_backend(server: &MockServer) {
    let responses = [
        (
            "/api/dashboard/active-agents",
            json!([{ "hostname": "web01", "last_activity": "2024-03-01T08:00:00Z", "event_count": 42 }]),
        ),
        (
            "/api/dashboard/recent-logins",
            json!([{ "timestamp": "2024-03-01T08:00:00Z", "user": "alice", "hostname": "web01", "status": "success", "event_type": "user_login" }]),
        ),
        (
            "/api/dashboard/events-by-type",
            json!([{ "type": "user_login", "count": 5 }, { "type": "file_access", "count": 3 }]),
        ),
        (
            "/api/dashboard/top-processes",
            json!([{ "process": "/usr/bin/ssh", "count": 9 }]),
        ),
        (
            "/api/dashboard/events-timeline",
            json!([{ "hour": "2024-03-01 08:00", "count": 7 }]),
        ),
    ];
    for (route, body) in responses {
        Mock::given(method("GET"))
            .and(path(route))
            .respond_with(ResponseTemplate::new(200).set_body_json(body))
            .mount(server)
            .await;
    }

    Mock::given(method("GET"))
        .and(path("/api/dashboard/hosts"))
        .and(query_param("hours", "24"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{ "hostname": "web01", "event_count": 42 }])))
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/dashboard/hosts"))
        .and(query_param("hours", "168"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            { "hostname": "web01", "event_count": 42 },
            { "hostname": "db01", "event_count": 7 }
        ])))
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/dashboard/top-users"))
        .and(query_param("limit", "10"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{ "user": "alice", "count": 30 }])))
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/dashboard/top-users"))
        .and(query_param("limit", "100"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            { "user": "alice", "count": 30 },
            { "user": "bob", "count": 4 },
            { "user": "carol", "count": 1 }
        ])))
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/dashboard/events-by-severity"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            { "severity": "high", "count": 11 },
            { "severity": "low", "count": 20 }
        ])))
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/events"))
        .and(query_param("per_page", "1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "events": [{ "_id": "e1" }], "total": 1234, "page": 1, "pages": 1234, "per_page": 1
        })))
        .mount(server)
        .await;
}

fn poller(server: &MockServer) -> (Arc<DashboardPoller>, Arc<RecordingSink>, Arc<ChartLog>) {
    poller_with(server, DashboardConfig::default())
}

fn poller_with(
    server: &MockServer,
    config: DashboardConfig,
) -> (Arc<DashboardPoller>, Arc<RecordingSink>, Arc<ChartLog>) {
    let sink = Arc::new(RecordingSink::default());
    let log = Arc::new(ChartLog::default());
    let poller = DashboardPoller::new(
        ApiClient::new(&server.uri()).unwrap(),
        sink.clone(),
        Arc::new(CountingBackend(log.clone())),
        config,
    );
    (Arc::new(poller), sink, log)
}

#[tokio::test]
async fn one_round_fills_every_view() {
    let server = MockServer::start().await;
    mount_backend(&server).await;
    let (poller, sink, log) = poller(&server);

    assert_eq!(poller.refresh_once().await, 1);

    let panels = sink.panels.lock().unwrap();
    for id in PanelId::ALL {
        assert!(
            matches!(panels.get(&id), Some(PanelContent::Table(_) | PanelContent::Cards(_))),
            "{id:?}: {:?}",
            panels.get(&id)
        );
    }
    let Some(PanelContent::Cards(cards)) = panels.get(&PanelId::Hosts) else {
        panic!("hosts panel should be cards");
    };
    assert_eq!(cards[0].badge, "42 events");

    let counters = sink.counters.lock().unwrap();
    assert_eq!(counters[&CounterId::TotalEvents], 1234);
    assert_eq!(counters[&CounterId::HighSeverity], 11);
    assert_eq!(counters[&CounterId::ActiveHosts], 2);
    assert_eq!(counters[&CounterId::ActiveUsers], 3);

    let created = log.created.lock().unwrap();
    assert_eq!(created.len(), 3);
    let (_, by_type) = created.iter().find(|(id, _)| *id == ChartId::EventsByType).unwrap();
    assert_eq!(by_type.kind, ChartKind::Pie);
    assert_eq!(by_type.points[0].label, "user_login");
    assert_eq!(*sink.rounds.lock().unwrap(), vec![1]);
}

#[tokio::test]
async fn every_request_asks_for_fresh_data() {
    let server = MockServer::start().await;
    mount_backend(&server).await;
    let (poller, _, _) = poller(&server);

    poller.refresh_once().await;

    let requests = server.received_requests().await.unwrap();
    assert_eq!(requests.len(), 12);
    for request in &requests {
        assert!(
            request.url.query().unwrap_or_default().ends_with("realtime=true"),
            "{}",
            request.url
        );
    }
    let stats: Vec<_> = requests
        .iter()
        .filter_map(|r| r.url.query())
        .filter(|q| q.contains("hours=168"))
        .collect();
    assert_eq!(stats.len(), 4);
}

#[tokio::test]
async fn failing_panel_does_not_affect_siblings() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/dashboard/recent-logins"))
        .respond_with(ResponseTemplate::new(500).set_body_json(json!({ "error": "auth log unavailable" })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/dashboard/top-processes"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&server)
        .await;
    mount_backend(&server).await;
    let (poller, sink, _) = poller(&server);

    poller.refresh_once().await;

    let panels = sink.panels.lock().unwrap();
    assert_eq!(
        panels[&PanelId::RecentLogins],
        PanelContent::Error("auth log unavailable".to_string())
    );
    assert_eq!(panels[&PanelId::TopProcesses], PanelContent::Empty("No data".to_string()));
    assert!(matches!(panels[&PanelId::ActiveAgents], PanelContent::Table(_)));
    assert!(matches!(panels[&PanelId::Hosts], PanelContent::Cards(_)));
}

#[tokio::test]
async fn failing_statistics_fall_back_to_zero() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/events"))
        .respond_with(ResponseTemplate::new(503).set_body_string("unavailable"))
        .mount(&server)
        .await;
    mount_backend(&server).await;
    let (poller, sink, _) = poller(&server);

    poller.load_statistics().await;

    let counters = sink.counters.lock().unwrap();
    assert_eq!(counters[&CounterId::TotalEvents], 0);
    assert_eq!(counters[&CounterId::ActiveHosts], 2);
}

#[tokio::test]
async fn rejected_session_leaves_views_untouched() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;
    let (poller, sink, log) = poller(&server);

    poller.refresh_once().await;

    assert!(sink.panels.lock().unwrap().is_empty());
    assert!(log.created.lock().unwrap().is_empty());
}

#[tokio::test]
async fn chart_is_disposed_before_replacement() {
    let server = MockServer::start().await;
    mount_backend(&server).await;
    let (poller, _, log) = poller(&server);

    poller.load_events_timeline().await;
    poller.load_events_timeline().await;
    poller.load_events_timeline().await;

    assert_eq!(log.created.lock().unwrap().len(), 3);
    assert_eq!(log.disposed.load(Ordering::SeqCst), 2);
    assert_eq!(log.live.load(Ordering::SeqCst), 1);

    drop(poller);
    assert_eq!(log.disposed.load(Ordering::SeqCst), 3);
    assert_eq!(log.live.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn failed_chart_refresh_keeps_previous_chart() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/dashboard/events-by-severity"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{ "severity": "medium", "count": 2 }])))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/dashboard/events-by-severity"))
        .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
        .mount(&server)
        .await;
    let (poller, _, log) = poller(&server);

    poller.load_events_by_severity().await;
    poller.load_events_by_severity().await;

    assert_eq!(log.created.lock().unwrap().len(), 1);
    assert_eq!(log.disposed.load(Ordering::SeqCst), 0);
    assert_eq!(log.live.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn run_refreshes_until_cancelled() {
    let server = MockServer::start().await;
    mount_backend(&server).await;
    let config = DashboardConfig {
        refresh_interval: Duration::from_millis(50),
        ..DashboardConfig::default()
    };
    let (poller, sink, _) = poller_with(&server, config);

    let shutdown = CancellationToken::new();
    let task = tokio::spawn(Arc::clone(&poller).run(shutdown.clone()));
    tokio::time::sleep(Duration::from_millis(180)).await;
    shutdown.cancel();
    task.await.unwrap();

    let rounds = sink.rounds.lock().unwrap().clone();
    assert!(rounds.len() >= 2, "{rounds:?}");
    assert_eq!(rounds[0], 1);
}

#[tokio::test]
async fn null_labelled_rows_still_render() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/dashboard/events-by-severity"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            { "severity": "high", "count": 4 },
            { "severity": null, "count": 2 }
        ])))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/dashboard/events-by-type"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            { "type": "user_login", "count": 5 },
            { "type": null, "count": 1 }
        ])))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/dashboard/active-agents"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            { "hostname": null, "last_activity": "2024-03-01T08:00:00Z", "event_count": 3 }
        ])))
        .mount(&server)
        .await;
    let (poller, sink, log) = poller(&server);

    tokio::join!(
        poller.load_statistics(),
        poller.load_events_by_type(),
        poller.load_active_agents(),
    );

    assert_eq!(sink.counters.lock().unwrap()[&CounterId::HighSeverity], 4);

    let created = log.created.lock().unwrap();
    let (_, by_type) = created.iter().find(|(id, _)| *id == ChartId::EventsByType).unwrap();
    let labels: Vec<_> = by_type.points.iter().map(|p| p.label.as_str()).collect();
    assert_eq!(labels, vec!["user_login", "unknown"]);

    let panels = sink.panels.lock().unwrap();
    let Some(PanelContent::Table(table)) = panels.get(&PanelId::ActiveAgents) else {
        panic!("agents panel should be a table: {:?}", panels.get(&PanelId::ActiveAgents));
    };
    assert_eq!(table.rows[0][0].plain(), "unknown");
}

/// Two overlapping refreshes of the hosts panel and the type chart. The first
/// request is answered late, after the second one has been applied.
async fn overlapping_refreshes(ordering: ResponseOrdering) -> (Vec<String>, Vec<String>) {
    let server = MockServer::start().await;
    let slow = Duration::from_millis(300);
    Mock::given(method("GET"))
        .and(path("/api/dashboard/hosts"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!([{ "hostname": "old01", "event_count": 1 }]))
                .set_delay(slow),
        )
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/dashboard/hosts"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{ "hostname": "new01", "event_count": 2 }])))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/dashboard/events-by-type"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!([{ "type": "old_type", "count": 1 }]))
                .set_delay(slow),
        )
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/dashboard/events-by-type"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{ "type": "new_type", "count": 2 }])))
        .mount(&server)
        .await;

    let config = DashboardConfig {
        ordering,
        ..DashboardConfig::default()
    };
    let (poller, sink, log) = poller_with(&server, config);

    let first = tokio::spawn({
        let poller = Arc::clone(&poller);
        async move { tokio::join!(poller.load_hosts(), poller.load_events_by_type()) }
    });
    tokio::time::sleep(Duration::from_millis(50)).await;
    let second = tokio::spawn({
        let poller = Arc::clone(&poller);
        async move { tokio::join!(poller.load_hosts(), poller.load_events_by_type()) }
    });
    second.await.unwrap();
    first.await.unwrap();

    let hosts: Vec<String> = match sink.panels.lock().unwrap().get(&PanelId::Hosts) {
        Some(PanelContent::Cards(cards)) => cards.iter().map(|c| c.title.clone()).collect(),
        other => panic!("hosts panel should be cards: {other:?}"),
    };
    assert_eq!(log.live.load(Ordering::SeqCst), 1);
    let charts: Vec<String> = log
        .created
        .lock()
        .unwrap()
        .iter()
        .map(|(_, spec)| spec.points[0].label.clone())
        .collect();
    (hosts, charts)
}

#[tokio::test]
async fn late_round_does_not_replace_newer_views() {
    let (hosts, charts) = overlapping_refreshes(ResponseOrdering::LatestRequest).await;
    assert_eq!(hosts, vec!["new01"]);
    assert_eq!(charts, vec!["new_type"]);
}

#[tokio::test]
async fn last_resolved_ordering_lets_late_round_win() {
    let (hosts, charts) = overlapping_refreshes(ResponseOrdering::LastResolved).await;
    assert_eq!(hosts, vec!["old01"]);
    assert_eq!(charts, vec!["new_type", "old_type"]);
}
