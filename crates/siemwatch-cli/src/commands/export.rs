use std::path::PathBuf;

use anyhow::{Context, Result};
use colored::Colorize;
use siemwatch_client::browser::EventBrowser;
use siemwatch_client::client::ApiClient;
use tracing::info;

use crate::cli::ExportArgs;
use crate::output::print_success;

pub async fn export(client: ApiClient, args: &ExportArgs) -> Result<()> {
    let browser = EventBrowser::new(client);
    browser.set_filters(args.filters.to_filters());

    let format = args.export_format;
    let path = args
        .output
        .clone()
        .unwrap_or_else(|| PathBuf::from(format.file_name()));
    let url = browser.export_url(format)?;
    info!(%url, path = %path.display(), "Exporting events");

    let mut file = tokio::fs::File::create(&path)
        .await
        .with_context(|| format!("Cannot create {}", path.display()))?;
    let written = browser.export_events(format, &mut file).await;
    drop(file);

    match written {
        Ok(bytes) => {
            print_success(&format!(
                "Exported {bytes} bytes of {format} to {}",
                path.display().to_string().cyan()
            ));
            Ok(())
        }
        Err(e) => {
            let _ = tokio::fs::remove_file(&path).await;
            Err(e).context("Export failed")
        }
    }
}
