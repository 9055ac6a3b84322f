use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use tracing::debug;

use wm_services::{DEFAULT_BASE_URL, DEFAULT_LATENCY};

/// Which backend answers chat messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    /// Offline canned replies
    Simulated,
    /// WorkMate REST server at `base_url`
    Http,
}

impl std::fmt::Display for BackendKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BackendKind::Simulated => write!(f, "simulated"),
            BackendKind::Http => write!(f, "http"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    pub backend: BackendKind,

    /// Root of the REST API, e.g. `http://localhost:8000/api`
    pub base_url: String,

    /// Reply delay of the simulated backend
    pub latency_ms: u64,

    pub request_timeout_secs: u64,

    /// Show the workspace sidebar on startup
    pub show_sidebar: bool,

    /// Open with the example roadmap exchange
    pub seed_demo: bool,

    /// Persist composer history between sessions
    pub history: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            backend: BackendKind::Simulated,
            base_url: DEFAULT_BASE_URL.to_string(),
            latency_ms: DEFAULT_LATENCY.as_millis() as u64,
            request_timeout_secs: 60,
            show_sidebar: true,
            seed_demo: true,
            history: true,
        }
    }
}

/// Command-line values that take precedence over every other layer.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Overrides {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub backend: Option<BackendKind>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latency_ms: Option<u64>,
}

impl Config {
    /// Load defaults, then the config file, then `WORKMATE_*` variables,
    /// then `overrides`. A missing file or config directory is not an error.
    pub fn load(overrides: &Overrides) -> Result<Self> {
        let path = match Self::config_path() {
            Ok(path) => Some(path),
            Err(e) => {
                debug!(error = %e, "Skipping config file");
                None
            }
        };
        Self::load_from(path.as_deref(), overrides)
    }

    pub fn load_from(path: Option<&Path>, overrides: &Overrides) -> Result<Self> {
        Self::figment(path, overrides).extract().with_context(|| match path {
            Some(path) => format!("Invalid configuration in {}", path.display()),
            None => "Invalid configuration".to_string(),
        })
    }

    pub fn figment(path: Option<&Path>, overrides: &Overrides) -> Figment {
        let mut figment = Figment::from(Serialized::defaults(Config::default()));
        if let Some(path) = path {
            figment = figment.merge(Toml::file(path));
        }
        figment
            .merge(Env::prefixed("WORKMATE_"))
            .merge(Serialized::defaults(overrides))
    }

    pub fn latency(&self) -> Duration {
        Duration::from_millis(self.latency_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn config_path() -> Result<PathBuf> {
        Ok(Self::config_dir()?.join("config.toml"))
    }

    pub fn config_dir() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not determine config directory"))?;
        Ok(config_dir.join("workmate"))
    }

    pub fn history_path() -> Result<PathBuf> {
        Ok(Self::config_dir()?.join("input_history.json"))
    }
}
