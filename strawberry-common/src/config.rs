//! Configuration loading and config file resolution
//!
//! Configuration is a single TOML file. The file is located in priority order:
//! 1. Explicit path (command-line argument)
//! 2. `STRAWBERRY_CONFIG` environment variable
//! 3. User config directory (`~/.config/strawberry/config.toml`)
//! 4. System config (`/etc/strawberry/config.toml`)
//!
//! The client secret may be overridden by `STRAWBERRY_CLIENT_SECRET` so it
//! does not have to live in the file.

use crate::{Error, Result};
use serde::Deserialize;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Environment variable naming the config file
pub const CONFIG_ENV: &str = "STRAWBERRY_CONFIG";

/// Environment variable overriding the client secret
pub const SECRET_ENV: &str = "STRAWBERRY_CLIENT_SECRET";

/// One generation backend
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ServiceConfig {
    /// Name used to route generate calls (e.g. `text_gen`)
    pub name: String,
    /// Scheme and host, e.g. `http://text_gen`
    pub url: String,
    pub port: u16,
}

impl ServiceConfig {
    /// Base URL requests are built on
    pub fn base_url(&self) -> String {
        format!("{}:{}", self.url.trim_end_matches('/'), self.port)
    }
}

/// Per-call timeouts for backend requests
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct TimeoutConfig {
    pub ingest_secs: u64,
    pub status_secs: u64,
    pub generate_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            ingest_secs: 15,
            status_secs: 2,
            generate_secs: 90,
        }
    }
}

impl TimeoutConfig {
    pub fn ingest(&self) -> Duration {
        Duration::from_secs(self.ingest_secs)
    }

    pub fn status(&self) -> Duration {
        Duration::from_secs(self.status_secs)
    }

    pub fn generate(&self) -> Duration {
        Duration::from_secs(self.generate_secs)
    }
}

/// Complete service configuration
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// Shared secret used to sign launch parameters
    #[serde(default)]
    pub client_secret: String,

    #[serde(default = "default_database_path")]
    pub database_path: PathBuf,

    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,

    /// Seconds between reconciliation ticks
    #[serde(default = "default_reconcile_interval")]
    pub reconcile_interval_secs: u64,

    /// Allowed CORS origins; `"*"` allows any
    #[serde(default = "default_cors_origins")]
    pub cors_origins: Vec<String>,

    #[serde(default)]
    pub timeouts: TimeoutConfig,

    #[serde(default)]
    pub services: Vec<ServiceConfig>,
}

fn default_database_path() -> PathBuf {
    dirs::data_local_dir()
        .map(|d| d.join("strawberry").join("strawberry.db"))
        .unwrap_or_else(|| PathBuf::from("/var/lib/strawberry/strawberry.db"))
}

fn default_bind_addr() -> String {
    "0.0.0.0:8000".to_string()
}

fn default_reconcile_interval() -> u64 {
    60
}

fn default_cors_origins() -> Vec<String> {
    vec!["*".to_string()]
}

impl AppConfig {
    /// Parse and validate configuration text (no environment overrides)
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: AppConfig = toml::from_str(content)
            .map_err(|e| Error::Config(format!("Invalid config file: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Load a config file, apply environment overrides, then validate
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::Config(format!("Cannot read config file {}: {}", path.display(), e))
        })?;

        let mut config: AppConfig = toml::from_str(&content)
            .map_err(|e| Error::Config(format!("Invalid config file {}: {}", path.display(), e)))?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Apply environment variable overrides
    pub fn apply_env_overrides(&mut self) {
        if let Ok(secret) = std::env::var(SECRET_ENV) {
            if !secret.is_empty() {
                self.client_secret = secret;
            }
        }
    }

    /// Check invariants the service relies on
    pub fn validate(&self) -> Result<()> {
        if self.client_secret.is_empty() {
            return Err(Error::Config(format!(
                "client_secret is empty (set it in the config file or {})",
                SECRET_ENV
            )));
        }

        if self.services.is_empty() {
            return Err(Error::Config("At least one service must be configured".to_string()));
        }

        let mut seen = HashSet::new();
        for service in &self.services {
            if service.name.is_empty() {
                return Err(Error::Config("Service name must not be empty".to_string()));
            }
            if !seen.insert(service.name.as_str()) {
                return Err(Error::Config(format!("Duplicate service name: {}", service.name)));
            }
        }

        if self.reconcile_interval_secs == 0 {
            return Err(Error::Config("reconcile_interval_secs must be positive".to_string()));
        }

        let t = &self.timeouts;
        if t.ingest_secs == 0 || t.status_secs == 0 || t.generate_secs == 0 {
            return Err(Error::Config("Timeouts must be positive".to_string()));
        }

        Ok(())
    }

    pub fn reconcile_interval(&self) -> Duration {
        Duration::from_secs(self.reconcile_interval_secs)
    }
}

/// Locate the config file following the priority order above
pub fn resolve_config_path(cli_arg: Option<&Path>) -> Result<PathBuf> {
    // Priority 1: Command-line argument
    if let Some(path) = cli_arg {
        return Ok(path.to_path_buf());
    }

    // Priority 2: Environment variable
    if let Ok(path) = std::env::var(CONFIG_ENV) {
        if !path.is_empty() {
            return Ok(PathBuf::from(path));
        }
    }

    // Priority 3: User config directory
    if let Some(path) = dirs::config_dir().map(|d| d.join("strawberry").join("config.toml")) {
        if path.exists() {
            return Ok(path);
        }
    }

    // Priority 4: System config
    let system_config = PathBuf::from("/etc/strawberry/config.toml");
    if system_config.exists() {
        return Ok(system_config);
    }

    Err(Error::Config(format!(
        "No config file found (pass --config or set {})",
        CONFIG_ENV
    )))
}
