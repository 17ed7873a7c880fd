use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use anyhow::{Context, Result, anyhow};

use crate::reply::DEFAULT_ENDPOINT;

pub const ENDPOINT_ENV: &str = "CHATBOT_ENDPOINT";

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct Config {
    pub endpoint: Option<String>,
    /// `tracing_subscriber::EnvFilter` directive, e.g. `chatbot=debug`
    pub log_filter: Option<String>,
}

impl Config {
    /// Load from the default location, or `path` when given.
    ///
    /// A missing file is not an error and yields the defaults.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let config_path = match path {
            Some(p) => p.to_path_buf(),
            None => Self::default_path()?,
        };

        if !config_path.exists() {
            return Ok(Self::default());
        }

        let config_content = fs::read_to_string(&config_path)
            .with_context(|| format!("Failed to read config file {:?}", config_path))?;
        let config: Config = serde_json::from_str(&config_content)
            .with_context(|| format!("Invalid config file {:?}", config_path))?;
        Ok(config)
    }

    /// Pick the endpoint: CLI flag, then environment, then config file
    pub fn resolve_endpoint(&self, cli: Option<&str>, env: Option<&str>) -> String {
        cli.or(env)
            .or(self.endpoint.as_deref())
            .filter(|e| !e.trim().is_empty())
            .unwrap_or(DEFAULT_ENDPOINT)
            .to_string()
    }

    pub fn default_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow!("Could not determine config directory"))?;

        Ok(config_dir.join("chatbot").join("config.json"))
    }
}
