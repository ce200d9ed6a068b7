use anyhow::{Context, Result};
use colored::Colorize;

use crate::auth::{self, StoredCredentials};
use crate::cli::LoginArgs;
use crate::config::ConfigStore;
use crate::output::{print_error, print_success};

pub fn login(store: &ConfigStore, server: &str, args: &LoginArgs, profile: &str) -> Result<()> {
    let username = args
        .username
        .as_deref()
        .context("--username is required")?;
    let password = args
        .password
        .as_deref()
        .context("--password is required")?;

    let creds = StoredCredentials {
        server: server.to_string(),
        username: username.to_string(),
        password: password.to_string(),
    };
    auth::save_credentials(store, profile, &creds)?;
    print_success(&format!(
        "Saved Basic Auth credentials for {} (user: {})",
        server.cyan(),
        username.cyan()
    ));
    Ok(())
}

pub fn logout(store: &ConfigStore, profile: &str) -> Result<()> {
    if auth::remove_credentials(store, profile)? {
        print_success("Logged out (credentials removed)");
    } else {
        println!("No credentials found for profile \"{profile}\"");
    }
    Ok(())
}

pub fn whoami(store: &ConfigStore, profile: &str) -> Result<()> {
    match auth::load_credentials(store, profile)? {
        Some(creds) => {
            println!("{}: {}", "Profile".cyan(), profile);
            println!("{}: {}", "Server".cyan(), creds.server.cyan());
            println!("{}: Basic (user: {})", "Auth".cyan(), creds.username);
        }
        None => {
            print_error(&format!("Not logged in (profile: \"{profile}\")"));
        }
    }
    Ok(())
}
