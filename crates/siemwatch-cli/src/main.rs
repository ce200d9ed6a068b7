mod auth;
mod cli;
mod commands;
mod config;
mod observability;
mod output;
mod screen;

use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use colored::Colorize;
use siemwatch_client::client::ApiClient;
use siemwatch_client::dashboard::DEFAULT_REFRESH_INTERVAL;

use auth::LoginRedirect;
use cli::{Cli, Commands, ConfigCommands, EventCommands};
use config::{ConfigStore, ProfileConfig};
use output::print_error;

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        print_error(&format!("{e:#}"));
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    let cli = Cli::parse();
    observability::init_tracing(cli.verbose);

    let store = ConfigStore::from_home()?;
    let profile = &cli.profile;
    let profile_cfg = store.load_profile(profile)?;
    let format = cli.format.or(profile_cfg.format).unwrap_or_default();
    let server = cli.server.as_deref();

    match &cli.command {
        Commands::Login(args) => {
            let server = store.resolve_server(server, profile)?;
            commands::auth::login(&store, &server, args, profile)?;
        }
        Commands::Logout => {
            commands::auth::logout(&store, profile)?;
        }
        Commands::Whoami => {
            commands::auth::whoami(&store, profile)?;
        }
        Commands::Config(args) => match &args.command {
            ConfigCommands::Show => show_config(&store, profile, &profile_cfg),
            ConfigCommands::Set(set_args) => {
                let mut cfg = profile_cfg.clone();
                cfg.set(&set_args.key, &set_args.value)?;
                store.save_profile(profile, &cfg)?;
                output::print_success(&format!("Set {} = {}", set_args.key, set_args.value));
            }
        },
        Commands::Dashboard(args) => {
            let client = make_client(&store, server, profile)?;
            let refresh = args
                .interval
                .map(std::time::Duration::from_secs)
                .or(profile_cfg.refresh_interval())
                .unwrap_or(DEFAULT_REFRESH_INTERVAL);
            commands::dashboard::run(client, args, refresh, format).await?;
        }
        Commands::Events(args) => {
            let client = make_client(&store, server, profile)?;
            commands::events::list(client, args, format).await?;
        }
        Commands::Event(args) => match &args.command {
            EventCommands::Show(show_args) => {
                let client = make_client(&store, server, profile)?;
                commands::events::show(&client, &show_args.id, format).await?;
            }
        },
        Commands::Export(args) => {
            let client = make_client(&store, server, profile)?;
            commands::export::export(client, args).await?;
        }
    }

    Ok(())
}

fn show_config(store: &ConfigStore, profile: &str, cfg: &ProfileConfig) {
    println!("{}: {}", "Profile".cyan(), profile);
    println!(
        "{}: {}",
        "Server".cyan(),
        cfg.server.as_deref().unwrap_or("(not set)")
    );
    println!(
        "{}: {}",
        "Format".cyan(),
        match cfg.format.unwrap_or_default() {
            cli::OutputFormat::Table => "table",
            cli::OutputFormat::Json => "json",
        }
    );
    println!(
        "{}: {}s",
        "Refresh".cyan(),
        cfg.refresh_interval()
            .unwrap_or(DEFAULT_REFRESH_INTERVAL)
            .as_secs()
    );
    println!("{}: {}", "Config dir".cyan(), store.dir().display());
}

fn make_client(store: &ConfigStore, server: Option<&str>, profile: &str) -> Result<ApiClient> {
    let server = store.resolve_server(server, profile)?;
    let mut client = ApiClient::new(&server)?.with_navigator(Arc::new(LoginRedirect::new(profile)));
    if let Some(creds) = auth::load_credentials(store, profile)? {
        client = client.with_basic_auth(creds.username, creds.password);
    }
    Ok(client)
}
