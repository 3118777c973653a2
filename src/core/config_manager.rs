// src/core/config_manager.rs
//! Unified configuration: `config.yaml` sections per environment, with
//! secrets and the port overridable from the process environment at load.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

const DEFAULT_CONFIG_PATH: &str = "config.yaml";
const DEFAULT_VENDOR_URL: &str = "https://api.vapi.ai";

#[derive(Debug, Clone)]
pub struct ConfigManager {
    pub environment_name: String,
    pub environment: EnvironmentConfig,
    pub server: ServerConfig,
    pub vendor: VendorConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EnvironmentConfig {
    pub database_path: PathBuf,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_address")]
    pub address: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

/// Voice-AI vendor settings passed explicitly into the boundary adapters
#[derive(Debug, Clone, Deserialize)]
pub struct VendorConfig {
    #[serde(default = "default_vendor_url")]
    pub api_url: String,
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default)]
    pub webhook_secret: Option<String>,
    #[serde(default = "default_timeout")]
    pub timeout_seconds: u64,
}

#[derive(Debug, Clone, Deserialize)]
struct EnvironmentSection {
    #[serde(flatten)]
    environment: EnvironmentConfig,
    #[serde(default)]
    server: ServerConfig,
    #[serde(default)]
    vendor: VendorConfig,
}

#[derive(Debug, Deserialize)]
struct ConfigFile {
    local: EnvironmentSection,
    production: EnvironmentSection,
}

fn default_address() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8000
}

fn default_vendor_url() -> String {
    DEFAULT_VENDOR_URL.to_string()
}

fn default_timeout() -> u64 {
    30
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            address: default_address(),
            port: default_port(),
        }
    }
}

impl Default for VendorConfig {
    fn default() -> Self {
        Self {
            api_url: default_vendor_url(),
            api_key: None,
            webhook_secret: None,
            timeout_seconds: default_timeout(),
        }
    }
}

impl ConfigManager {
    /// Load configuration for the current environment
    pub fn load() -> Result<Self> {
        let environment_name = Self::environment_name(|key| std::env::var(key).ok());
        info!("Loading configuration for environment: {}", environment_name);

        let config_path = std::env::var("CONFIG_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(DEFAULT_CONFIG_PATH));

        let config = if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)
                .with_context(|| format!("Failed to read {}", config_path.display()))?;
            Self::from_yaml(&content, &environment_name)?
        } else {
            warn!(
                "{} not found, using defaults for environment: {}",
                config_path.display(),
                environment_name
            );
            Self::defaults(&environment_name)?
        };

        let config = config
            .with_overrides(|key| std::env::var(key).ok())?
            .with_absolute_paths()?;

        if config.vendor.webhook_secret.is_none() {
            warn!("No webhook secret configured, vendor webhooks will not be authenticated");
        }

        Ok(config)
    }

    fn environment_name(lookup: impl Fn(&str) -> Option<String>) -> String {
        lookup("INTERVIEW_ENV")
            .or_else(|| lookup("ENVIRONMENT"))
            .unwrap_or_else(|| "local".to_string())
    }

    /// Parse a `config.yaml` document and select one environment section
    pub fn from_yaml(content: &str, environment_name: &str) -> Result<Self> {
        let file: ConfigFile =
            serde_yaml::from_str(content).context("Failed to parse configuration file")?;

        let section = match environment_name {
            "production" => file.production,
            _ => file.local,
        };

        Ok(Self {
            environment_name: environment_name.to_string(),
            environment: section.environment,
            server: section.server,
            vendor: section.vendor,
        })
    }

    fn defaults(environment_name: &str) -> Result<Self> {
        let base_dir = if environment_name == "production" {
            PathBuf::from("/app")
        } else {
            std::env::current_dir().context("Failed to get current directory")?
        };

        Ok(Self {
            environment_name: environment_name.to_string(),
            environment: EnvironmentConfig {
                database_path: base_dir.join("data").join("interviews.db"),
            },
            server: ServerConfig::default(),
            vendor: VendorConfig::default(),
        })
    }

    /// Apply secrets and port from the environment
    pub fn with_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        if let Some(path) = lookup("DATABASE_PATH") {
            self.environment.database_path = PathBuf::from(path);
        }
        if let Some(port) = lookup("ROCKET_PORT") {
            self.server.port = port
                .parse::<u16>()
                .map_err(|_| anyhow::anyhow!("ROCKET_PORT must be a valid port number"))?;
        }
        if let Some(url) = lookup("VAPI_API_URL") {
            self.vendor.api_url = url;
        }
        if let Some(key) = lookup("VAPI_API_KEY").filter(|k| !k.is_empty()) {
            self.vendor.api_key = Some(key);
        }
        if let Some(secret) = lookup("VAPI_WEBHOOK_SECRET").filter(|s| !s.is_empty()) {
            self.vendor.webhook_secret = Some(secret);
        }
        Ok(self)
    }

    fn with_absolute_paths(mut self) -> Result<Self> {
        self.environment.database_path = Self::resolve_path(&self.environment.database_path)?;
        Ok(self)
    }

    fn resolve_path(path: &Path) -> Result<PathBuf> {
        if path.is_absolute() {
            Ok(path.to_path_buf())
        } else {
            let current_dir = std::env::current_dir().context("Failed to get current directory")?;
            Ok(current_dir.join(path))
        }
    }
}
