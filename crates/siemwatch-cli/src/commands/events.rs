use anyhow::Result;
use colored::Colorize;
use siemwatch_client::browser::{BrowserState, EventBrowser};
use siemwatch_client::client::ApiClient;
use siemwatch_client::error::ApiError;
use siemwatch_client::time::format_timestamp;
use tracing::warn;

use crate::cli::{EventsArgs, OutputFormat};
use crate::output::{print_json, render_snapshot, severity};

pub async fn list(client: ApiClient, args: &EventsArgs, format: OutputFormat) -> Result<()> {
    let browser = EventBrowser::new(client);
    browser.set_filters(args.filters.to_filters());
    for id in &args.expand {
        browser.show_details(id);
    }

    let page = args.page.max(1);
    let state = browser.load_events(page).await;
    let snapshot = browser.snapshot();

    match state {
        // The login hint has already been printed.
        BrowserState::AwaitingLogin => return Ok(()),
        BrowserState::Errored => {
            anyhow::bail!(
                "Failed to load events: {}",
                snapshot.message.unwrap_or_default()
            )
        }
        _ => {}
    }

    let last = browser.clamp_page(page);
    if last < page {
        warn!(page, last, "Requested page is past the last page");
    }

    match format {
        OutputFormat::Json => print_json(&snapshot)?,
        OutputFormat::Table => println!("{}", render_snapshot(&snapshot)),
    }
    Ok(())
}

pub async fn show(client: &ApiClient, id: &str, format: OutputFormat) -> Result<()> {
    let event = match client.get_event(id).await {
        Ok(event) => event,
        Err(ApiError::AuthRequired) => return Ok(()),
        Err(e) => return Err(e.into()),
    };

    match format {
        OutputFormat::Json => print_json(&event)?,
        OutputFormat::Table => {
            println!("{}: {}", "Event".cyan(), event.id);
            println!("{}: {}", "Time".cyan(), format_timestamp(&event.timestamp));
            println!("{}: {}", "Type".cyan(), event.display_type());
            println!("{}: {}", "Severity".cyan(), severity(&event.display_severity()));
            println!("{}: {}", "Host".cyan(), event.display_hostname());
            println!("{}: {}", "User".cyan(), event.display_user());
            println!("{}: {}", "Process".cyan(), event.display_process());
            println!("{}", event.details());
        }
    }
    Ok(())
}
