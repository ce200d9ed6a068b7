use std::io::Write;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use siemwatch_client::client::ApiClient;
use siemwatch_client::dashboard::{DashboardConfig, DashboardPoller};
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::cli::{DashboardArgs, OutputFormat};
use crate::output::print_json;
use crate::screen::{DashboardScreen, TerminalCharts};

const REDRAW_INTERVAL: Duration = Duration::from_millis(250);
const CLEAR_SCREEN: &str = "\x1b[2J\x1b[H";

pub async fn run(
    client: ApiClient,
    args: &DashboardArgs,
    refresh_interval: Duration,
    format: OutputFormat,
) -> Result<()> {
    let screen = Arc::new(DashboardScreen::default());
    let config = DashboardConfig {
        refresh_interval,
        ..DashboardConfig::default()
    };
    let poller = Arc::new(DashboardPoller::new(
        client,
        screen.clone(),
        Arc::new(TerminalCharts::new(screen.clone())),
        config,
    ));

    if args.once {
        poller.refresh_once().await;
        return draw(&screen, format, false);
    }

    let shutdown = CancellationToken::new();
    let polling = tokio::spawn(Arc::clone(&poller).run(shutdown.clone()));

    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);
    let mut redraw = tokio::time::interval(REDRAW_INTERVAL);

    loop {
        tokio::select! {
            _ = &mut ctrl_c => {
                shutdown.cancel();
                break;
            }
            _ = redraw.tick() => {
                if screen.take_dirty() {
                    draw(&screen, format, true)?;
                }
            }
        }
    }

    polling.await?;
    info!("Dashboard closed");
    Ok(())
}

/// Table output repaints the terminal; JSON output emits one document per
/// change, one per line when streaming.
fn draw(screen: &DashboardScreen, format: OutputFormat, live: bool) -> Result<()> {
    match (format, live) {
        (OutputFormat::Json, false) => print_json(&screen.state())?,
        (OutputFormat::Json, true) => println!("{}", serde_json::to_string(&screen.state())?),
        (OutputFormat::Table, false) => println!("{}", screen.render()),
        (OutputFormat::Table, true) => {
            let mut stdout = std::io::stdout().lock();
            writeln!(stdout, "{CLEAR_SCREEN}{}", screen.render())?;
            stdout.flush()?;
        }
    }
    Ok(())
}
