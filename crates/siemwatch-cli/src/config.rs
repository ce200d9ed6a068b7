use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::auth;
use crate::cli::OutputFormat;

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct ProfileConfig {
    pub server: Option<String>,
    pub format: Option<OutputFormat>,
    /// Seconds between dashboard refresh rounds.
    pub refresh_secs: Option<u64>,
}

impl ProfileConfig {
    pub const KEYS: [&'static str; 3] = ["server", "format", "refresh_secs"];

    pub fn set(&mut self, key: &str, value: &str) -> Result<()> {
        match key {
            "server" => {
                url::Url::parse(value).with_context(|| format!("Invalid server URL: {value}"))?;
                self.server = Some(value.to_string());
            }
            "format" => {
                let format = <OutputFormat as clap::ValueEnum>::from_str(value, true)
                    .map_err(|e| anyhow::anyhow!("Invalid format: {e}"))?;
                self.format = Some(format);
            }
            "refresh_secs" => {
                let secs: u64 = value
                    .parse()
                    .with_context(|| format!("refresh_secs must be a number of seconds, got {value}"))?;
                anyhow::ensure!(secs > 0, "refresh_secs must be at least 1");
                self.refresh_secs = Some(secs);
            }
            other => anyhow::bail!(
                "Unknown config key: {other}. Valid keys: {}",
                Self::KEYS.join(", ")
            ),
        }
        Ok(())
    }

    pub fn refresh_interval(&self) -> Option<Duration> {
        self.refresh_secs.map(Duration::from_secs)
    }
}

pub type ConfigFile = HashMap<String, ProfileConfig>;

/// Directory holding `config.toml` and the per-profile credential files.
#[derive(Debug, Clone)]
pub struct ConfigStore {
    dir: PathBuf,
}

impl ConfigStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// `~/.siemwatch`
    pub fn from_home() -> Result<Self> {
        let dir = dirs::home_dir()
            .context("Cannot determine home directory")?
            .join(".siemwatch");
        Ok(Self::new(dir))
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub(crate) fn ensure_dir(&self) -> Result<&Path> {
        fs::create_dir_all(&self.dir)
            .with_context(|| format!("Cannot create {}", self.dir.display()))?;
        Ok(&self.dir)
    }

    fn config_path(&self) -> PathBuf {
        self.dir.join("config.toml")
    }

    pub fn load_all(&self) -> Result<ConfigFile> {
        let path = self.config_path();
        if !path.exists() {
            return Ok(ConfigFile::new());
        }
        let content = fs::read_to_string(&path)
            .with_context(|| format!("Cannot read {}", path.display()))?;
        let cfg: ConfigFile =
            toml::from_str(&content).with_context(|| format!("Invalid config file {}", path.display()))?;
        Ok(cfg)
    }

    pub fn load_profile(&self, profile: &str) -> Result<ProfileConfig> {
        Ok(self.load_all()?.remove(profile).unwrap_or_default())
    }

    pub fn save_profile(&self, profile: &str, config: &ProfileConfig) -> Result<()> {
        let mut all = self.load_all()?;
        all.insert(profile.to_string(), config.clone());
        let content = toml::to_string_pretty(&all)?;
        self.ensure_dir()?;
        fs::write(self.config_path(), content)?;
        Ok(())
    }

    pub fn resolve_server(&self, cli_server: Option<&str>, profile: &str) -> Result<String> {
        // 1. --server flag / SIEMWATCH_URL env
        if let Some(s) = cli_server {
            return Ok(s.to_string());
        }
        // 2. config.toml profile
        if let Some(s) = self.load_profile(profile)?.server {
            return Ok(s);
        }
        // 3. Stored credentials for this profile
        if let Ok(Some(creds)) = auth::load_credentials(self, profile) {
            return Ok(creds.server);
        }
        anyhow::bail!(
            "No server URL configured. Use --server, set SIEMWATCH_URL env var, or run: siemwatch login --server <url>"
        )
    }
}
