//! Application configuration management.
//!
//! Configuration is read from a JSON file, either the path given as the
//! first CLI argument or `~/.config/alexa-bridge/config.json`. A missing
//! file yields the defaults, so the bridge runs with zero setup.
//!
//! Field names in the file are camelCase (`httpPort`, `proxyOwnIp`, ...).

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Application name used for config/state directory paths
const APP_NAME: &str = "alexa-bridge";

/// Config file name
const CONFIG_FILE: &str = "config.json";

/// Default port the REST facade listens on
const DEFAULT_HTTP_PORT: u16 = 3000;

/// Default port of the external login helper
const DEFAULT_PROXY_PORT: u16 = 3001;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Config {
    /// Port the REST facade listens on
    pub http_port: u16,
    /// Host where the external login helper runs
    pub proxy_own_ip: String,
    /// Port of the external login helper
    pub proxy_port: u16,
    /// Alexa API host
    pub alexa_service_host: String,
    /// Locale sent with commands and as Accept-Language
    pub locale: String,
    /// Overrides the directory holding the session files
    pub state_dir: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            http_port: DEFAULT_HTTP_PORT,
            proxy_own_ip: "localhost".to_string(),
            proxy_port: DEFAULT_PROXY_PORT,
            alexa_service_host: "alexa.amazon.com".to_string(),
            locale: "en-US".to_string(),
            state_dir: None,
        }
    }
}

impl Config {
    /// Load configuration from an explicit path, or the default location.
    /// A missing file yields the defaults.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path = match path {
            Some(p) => p.to_path_buf(),
            None => Self::config_path()?,
        };
        if path.exists() {
            let contents = std::fs::read_to_string(&path)
                .with_context(|| format!("Failed to read config file {}", path.display()))?;
            serde_json::from_str(&contents)
                .with_context(|| format!("Failed to parse config file {}", path.display()))
        } else {
            Ok(Self::default())
        }
    }

    fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find config directory"))?;
        Ok(config_dir.join(APP_NAME).join(CONFIG_FILE))
    }

    /// Directory the session files live in
    pub fn state_dir(&self) -> Result<PathBuf> {
        if let Some(ref dir) = self.state_dir {
            return Ok(dir.clone());
        }
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find config directory"))?;
        Ok(config_dir.join(APP_NAME))
    }

    /// Base URL of the Alexa API
    pub fn alexa_base_url(&self) -> String {
        format!("https://{}", self.alexa_service_host)
    }

    /// URL of the external login helper that performs the browser sign-in
    pub fn login_helper_url(&self) -> String {
        format!("http://{}:{}/", self.proxy_own_ip, self.proxy_port)
    }
}
