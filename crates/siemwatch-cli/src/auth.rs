use std::fs;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};

use anyhow::{Context, Result};
use colored::Colorize;
use serde::{Deserialize, Serialize};
use siemwatch_client::client::Navigator;
use url::Url;

use crate::config::ConfigStore;

/// Basic credentials for one profile. The backend answers them with a
/// session cookie, which the client then reuses for the rest of the run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredCredentials {
    pub server: String,
    pub username: String,
    pub password: String,
}

fn creds_path(store: &ConfigStore, profile: &str) -> PathBuf {
    store.dir().join(format!("credentials.{profile}.json"))
}

pub fn load_credentials(store: &ConfigStore, profile: &str) -> Result<Option<StoredCredentials>> {
    let path = creds_path(store, profile);
    if !path.exists() {
        return Ok(None);
    }
    let content = fs::read_to_string(&path)?;
    let creds: StoredCredentials = serde_json::from_str(&content)
        .with_context(|| format!("Invalid credentials file {}", path.display()))?;
    Ok(Some(creds))
}

pub fn save_credentials(store: &ConfigStore, profile: &str, creds: &StoredCredentials) -> Result<()> {
    store.ensure_dir()?;
    let content = serde_json::to_string_pretty(creds)?;
    fs::write(creds_path(store, profile), content)?;
    Ok(())
}

pub fn remove_credentials(store: &ConfigStore, profile: &str) -> Result<bool> {
    let path = creds_path(store, profile);
    if path.exists() {
        fs::remove_file(path)?;
        Ok(true)
    } else {
        Ok(false)
    }
}

/// Reacts to a rejected session by pointing the user at the login entry
/// point. A terminal has no page to navigate, so the location is printed
/// once together with the command that stores credentials.
pub struct LoginRedirect {
    profile: String,
    shown: AtomicBool,
}

impl LoginRedirect {
    pub fn new(profile: impl Into<String>) -> Self {
        Self {
            profile: profile.into(),
            shown: AtomicBool::new(false),
        }
    }
}

impl Navigator for LoginRedirect {
    fn navigate(&self, location: &Url) {
        tracing::warn!(%location, profile = %self.profile, "Session rejected by backend");
        if self.shown.swap(true, Ordering::Relaxed) {
            return;
        }
        eprintln!(
            "{} Login required at {}. Run: siemwatch login --profile {} --username <user> --password <pass>",
            "→".yellow(),
            location.as_str().cyan(),
            self.profile
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn credentials_round_trip_per_profile() {
        let dir = tempfile::tempdir().unwrap();
        let store = ConfigStore::new(dir.path());
        let creds = StoredCredentials {
            server: "http://siem.local:5001".to_string(),
            username: "analyst".to_string(),
            password: "s3cret".to_string(),
        };

        assert_eq!(load_credentials(&store, "default").unwrap(), None);
        save_credentials(&store, "default", &creds).unwrap();
        assert_eq!(load_credentials(&store, "default").unwrap(), Some(creds));
        assert_eq!(load_credentials(&store, "other").unwrap(), None);

        assert!(remove_credentials(&store, "default").unwrap());
        assert!(!remove_credentials(&store, "default").unwrap());
    }

    #[test]
    fn corrupt_credentials_are_reported() {
        let dir = tempfile::tempdir().unwrap();
        let store = ConfigStore::new(dir.path());
        fs::write(dir.path().join("credentials.default.json"), "{not json").unwrap();
        let err = load_credentials(&store, "default").unwrap_err();
        assert!(err.to_string().starts_with("Invalid credentials file"));
    }
}
