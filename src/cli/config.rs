use anyhow::{Result, anyhow};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;
use std::time::Duration;
use directories::ProjectDirs;
use soar_sync::ClientSettings;

use crate::cli::commands::Args;

const DEFAULT_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Serialize, Deserialize, Default, PartialEq)]
pub struct Config {
    pub main_host: Option<String>,
    pub api_key: Option<String>,
    pub auth_id: Option<String>,
    #[serde(default)]
    pub insecure: bool,
    pub timeout_secs: Option<u64>,
}

impl Config {
    pub fn load() -> Result<Self> {
        let path = Config::get_path()?;
        if path.exists() {
            let content = fs::read_to_string(path)?;
            let config: Config = toml::from_str(&content)?;
            Ok(config)
        } else {
            Ok(Config::default())
        }
    }

    pub fn save(&self) -> Result<()> {
        let path = Config::get_path()?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let content = toml::to_string(self)?;
        fs::write(path, content)?;
        Ok(())
    }

    pub fn get_path() -> Result<PathBuf> {
        let proj_dirs = ProjectDirs::from("com", "soar-sync", "cli")
            .ok_or_else(|| anyhow!("Could not determine config directory"))?;
        Ok(proj_dirs.config_dir().join("config.toml"))
    }

    /// Flags and environment win over the file.
    pub fn overlay(mut self, args: &Args) -> Self {
        if args.base_url.is_some() {
            self.main_host = args.base_url.clone();
        }
        if args.api_key.is_some() {
            self.api_key = args.api_key.clone();
        }
        if args.auth_id.is_some() {
            self.auth_id = args.auth_id.clone();
        }
        self.insecure |= args.insecure;
        self
    }

    pub fn client_settings(&self) -> ClientSettings {
        ClientSettings {
            base_url: self.main_host.clone(),
            api_key: self.api_key.clone(),
            auth_id: self.auth_id.clone(),
            insecure: self.insecure,
            timeout: Duration::from_secs(self.timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS)),
        }
    }
}
