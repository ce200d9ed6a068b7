//! Terminal surface for the dashboard poller.
//!
//! The poller pushes into [`DashboardScreen`] from many tasks at once; the
//! screen only records the latest content per view and a redraw loop turns it
//! into text.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use colored::{ColoredString, Colorize};
use serde::{Serialize, Serializer};
use siemwatch_client::view::{
    Chart, ChartBackend, ChartId, ChartSpec, CounterId, DashboardSink, PanelContent, PanelId,
};
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;
use time::macros::format_description;

use crate::output::render_panel;

const BAR_WIDTH: u64 = 30;

#[derive(Debug, Default, Clone, Serialize)]
pub struct ScreenState {
    pub round: u64,
    #[serde(serialize_with = "rfc3339")]
    pub refreshed_at: Option<OffsetDateTime>,
    pub counters: BTreeMap<CounterId, u64>,
    pub panels: BTreeMap<PanelId, PanelContent>,
    pub charts: BTreeMap<ChartId, ChartSpec>,
}

fn rfc3339<S: Serializer>(at: &Option<OffsetDateTime>, serializer: S) -> Result<S::Ok, S::Error> {
    at.and_then(|at| at.format(&Rfc3339).ok()).serialize(serializer)
}

#[derive(Default)]
pub struct DashboardScreen {
    state: Mutex<ScreenState>,
    dirty: AtomicBool,
}

impl DashboardScreen {
    fn lock(&self) -> MutexGuard<'_, ScreenState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn update(&self, f: impl FnOnce(&mut ScreenState)) {
        f(&mut self.lock());
        self.dirty.store(true, Ordering::Release);
    }

    /// Whether anything changed since the last call.
    pub fn take_dirty(&self) -> bool {
        self.dirty.swap(false, Ordering::AcqRel)
    }

    pub fn state(&self) -> ScreenState {
        self.lock().clone()
    }

    pub fn render(&self) -> String {
        render_state(&self.lock())
    }
}

impl DashboardSink for DashboardScreen {
    fn panel(&self, id: PanelId, content: PanelContent) {
        self.update(|state| {
            state.panels.insert(id, content);
        });
    }

    fn counter(&self, id: CounterId, value: u64) {
        self.update(|state| {
            state.counters.insert(id, value);
        });
    }

    fn refreshed(&self, round: u64, at: OffsetDateTime) {
        self.update(|state| {
            state.round = round;
            state.refreshed_at = Some(at);
        });
    }
}

/// Chart backend drawing into the screen's chart slots.
pub struct TerminalCharts {
    screen: Arc<DashboardScreen>,
}

impl TerminalCharts {
    pub fn new(screen: Arc<DashboardScreen>) -> Self {
        Self { screen }
    }
}

struct TerminalChart {
    id: ChartId,
    screen: Arc<DashboardScreen>,
}

impl Chart for TerminalChart {
    fn dispose(&mut self) {
        self.screen.update(|state| {
            state.charts.remove(&self.id);
        });
    }
}

impl ChartBackend for TerminalCharts {
    fn create(&self, id: ChartId, spec: &ChartSpec) -> Box<dyn Chart> {
        self.screen.update(|state| {
            state.charts.insert(id, spec.clone());
        });
        Box::new(TerminalChart {
            id,
            screen: Arc::clone(&self.screen),
        })
    }
}

fn render_state(state: &ScreenState) -> String {
    let mut out = Vec::new();

    let at = state
        .refreshed_at
        .and_then(|at| at.format(format_description!("[hour]:[minute]:[second]")).ok())
        .unwrap_or_else(|| "-".to_string());
    out.push(format!(
        "{} round {} at {} UTC",
        "SiemWatch".bold(),
        state.round,
        at
    ));

    let counters = CounterId::ALL
        .iter()
        .map(|id| {
            let value = state.counters.get(id).copied().unwrap_or_default();
            format!("{}: {}", id.label().cyan(), value.to_string().bold())
        })
        .collect::<Vec<_>>()
        .join("   ");
    out.push(counters);

    for id in PanelId::ALL {
        out.push(String::new());
        out.push(id.title().cyan().bold().to_string());
        match state.panels.get(&id) {
            Some(content) => out.push(render_panel(content)),
            None => out.push(format!("  {}", "Loading...".dimmed())),
        }
    }

    for id in ChartId::ALL {
        out.push(String::new());
        out.push(id.title().cyan().bold().to_string());
        match state.charts.get(&id) {
            Some(spec) => out.extend(chart_lines(spec)),
            None => out.push(format!("  {}", "No chart".dimmed())),
        }
    }

    out.join("\n")
}

/// Horizontal bars scaled to the largest count.
fn chart_lines(spec: &ChartSpec) -> Vec<String> {
    let max = spec.points.iter().map(|p| p.count).max().unwrap_or(0).max(1);
    let label_width = spec.points.iter().map(|p| p.label.chars().count()).max().unwrap_or(0);
    spec.points
        .iter()
        .map(|point| {
            let len = (point.count * BAR_WIDTH).div_ceil(max) as usize;
            format!(
                "  {:<label_width$} {} {}",
                point.label,
                paint(&"█".repeat(len), &point.color),
                point.count
            )
        })
        .collect()
}

fn paint(text: &str, hex: &str) -> ColoredString {
    match parse_hex(hex) {
        Some((r, g, b)) => text.truecolor(r, g, b),
        None => text.normal(),
    }
}

fn parse_hex(hex: &str) -> Option<(u8, u8, u8)> {
    let hex = hex.strip_prefix('#')?;
    if hex.len() != 6 {
        return None;
    }
    let channel = |i: usize| u8::from_str_radix(hex.get(i..i + 2)?, 16).ok();
    Some((channel(0)?, channel(2)?, channel(4)?))
}
