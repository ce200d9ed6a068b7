use anyhow::Result;
use colored::{ColoredString, Colorize};
use serde::Serialize;
use siemwatch_client::browser::{BrowserSnapshot, BrowserState, EventRow};
use siemwatch_client::model::Severity;
use siemwatch_client::pagination::{PageControl, ShowingRange};
use siemwatch_client::view::{Cell, PanelContent, Table};
use tabled::builder::Builder;
use tabled::settings::Style;

pub fn print_success(msg: &str) {
    println!("{} {}", "✓".green(), msg);
}

pub fn print_error(msg: &str) {
    eprintln!("{} {}", "✗".red(), msg);
}

pub fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

pub fn severity(severity: &Severity) -> ColoredString {
    let label = severity.as_str();
    match severity {
        Severity::High => label.red().bold(),
        Severity::Medium => label.yellow(),
        Severity::Low => label.green(),
        Severity::Other(_) => label.dimmed(),
    }
}

fn render_cell(cell: &Cell) -> String {
    match cell {
        Cell::Text(text) => text.clone(),
        Cell::Badge(text) => text.bold().to_string(),
        Cell::Severity(s) => severity(s).to_string(),
        Cell::LoginStatus(true) => cell.plain().green().to_string(),
        Cell::LoginStatus(false) => cell.plain().red().to_string(),
    }
}

pub fn render_table(table: &Table) -> String {
    let mut builder = Builder::default();
    builder.push_record(table.headers.iter().cloned());
    for row in &table.rows {
        builder.push_record(row.iter().map(render_cell));
    }
    builder.build().with(Style::rounded()).to_string()
}

pub fn render_panel(content: &PanelContent) -> String {
    match content {
        PanelContent::Table(table) => render_table(table),
        PanelContent::Cards(cards) => cards
            .iter()
            .map(|card| format!("  {}  {}", card.title.bold(), card.badge.dimmed()))
            .collect::<Vec<_>>()
            .join("\n"),
        PanelContent::Empty(message) => format!("  {}", message.dimmed()),
        PanelContent::Error(message) => format!("  {} {}", "✗".red(), message.red()),
    }
}

/// Page links on one line, e.g. `‹ 1 … 3 4 [5] 6 7 … 10 ›`. Disabled
/// previous/next links are left out.
pub fn render_controls(controls: &[PageControl]) -> String {
    controls
        .iter()
        .filter_map(|control| match control {
            PageControl::Previous { enabled: true, .. } => Some("‹".to_string()),
            PageControl::Next { enabled: true, .. } => Some("›".to_string()),
            PageControl::Previous { .. } | PageControl::Next { .. } => None,
            PageControl::Ellipsis => Some("…".to_string()),
            PageControl::Page { number, current: true } => Some(format!("[{number}]")),
            PageControl::Page { number, .. } => Some(number.to_string()),
        })
        .collect::<Vec<_>>()
        .join(" ")
}

pub fn render_showing(showing: &ShowingRange) -> String {
    format!(
        "Showing {} to {} of {} events",
        showing.from, showing.to, showing.total
    )
}

fn events_table(rows: &[EventRow]) -> String {
    let mut builder = Builder::default();
    builder.push_record(["Time", "Type", "Severity", "Host", "User", "Process", "ID"]);
    for row in rows {
        builder.push_record([
            row.time.clone(),
            row.event_type.clone(),
            severity(&row.severity).to_string(),
            row.hostname.clone(),
            row.user.clone(),
            row.process.clone(),
            row.id.dimmed().to_string(),
        ]);
    }
    builder.build().with(Style::rounded()).to_string()
}

/// Text rendering of the event list. Nothing is drawn while a login is
/// pending.
pub fn render_snapshot(snapshot: &BrowserSnapshot) -> String {
    let mut lines = Vec::new();
    match snapshot.state {
        BrowserState::AwaitingLogin => return String::new(),
        BrowserState::Idle | BrowserState::Loading => lines.push("Loading events...".dimmed().to_string()),
        BrowserState::Errored => {
            let message = snapshot.message.as_deref().unwrap_or_default();
            lines.push(format!("{} {}", "✗".red(), message.red()));
        }
        BrowserState::Empty => {
            lines.push(snapshot.message.clone().unwrap_or_default());
        }
        BrowserState::Rendered => {
            lines.push(events_table(&snapshot.rows));
            for row in snapshot.rows.iter().filter(|row| row.expanded) {
                if let Some(details) = &row.details {
                    lines.push(format!("{} {}", "Details".cyan(), row.id));
                    lines.push(details.clone());
                }
            }
        }
    }

    if let Some(showing) = &snapshot.showing {
        lines.push(render_showing(showing));
    }
    if !snapshot.controls.is_empty() {
        lines.push(render_controls(&snapshot.controls));
    }
    if !snapshot.type_options.is_empty() {
        lines.push(format!(
            "{}: {}",
            "Types on this page".cyan(),
            snapshot.type_options.join(", ")
        ));
    }
    lines.join("\n")
}
