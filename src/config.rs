//! User configuration management
//!
//! This module handles reading and writing depmon configuration files.
//! Configuration is stored in TOML format at `~/.depmon/config.toml`.
//!
//! # Examples
//!
//! ```no_run
//! use depmon::Config;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = Config::load()?;
//!
//! for registry in &config.registries {
//!     println!("{}: {}", registry.name, registry.url);
//! }
//! # Ok(())
//! # }
//! ```

use crate::session::SessionOptions;
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;
use std::time::Duration;

/// User configuration file (`~/.depmon/config.toml`)
///
/// Contains the ordered registry source list and resolver settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Registry sources, in priority order
    #[serde(default = "default_registries", rename = "registry")]
    pub registries: Vec<RegistrySource>,

    /// Resolver settings
    #[serde(default)]
    pub resolver: ResolverConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegistrySource {
    pub name: String,

    /// Registry base URL
    pub url: String,

    /// API token for authenticated registries
    pub token: Option<String>,
}

fn default_registries() -> Vec<RegistrySource> {
    vec![RegistrySource {
        name: "default".to_string(),
        url: "http://localhost:3000".to_string(),
        token: None,
    }]
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResolverConfig {
    /// Package ids resolved by the toolchain rather than a registry;
    /// never queried and never shown in dependency graphs
    #[serde(default)]
    pub ignored_packages: Vec<String>,

    /// HTTP request timeout in seconds
    #[serde(default = "default_request_timeout")]
    pub request_timeout_seconds: u64,
}

fn default_request_timeout() -> u64 {
    30
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            ignored_packages: Vec::new(),
            request_timeout_seconds: default_request_timeout(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            registries: default_registries(),
            resolver: ResolverConfig::default(),
        }
    }
}

impl Config {
    /// Get the default config file path
    ///
    /// Uses DEPMON_CONFIG_DIR if set, otherwise ~/.depmon/config.toml
    pub fn default_path() -> Result<PathBuf> {
        // Custom config directory (useful for testing)
        if let Ok(config_dir) = std::env::var("DEPMON_CONFIG_DIR") {
            return Ok(PathBuf::from(config_dir).join("config.toml"));
        }

        let home = dirs::home_dir()
            .ok_or_else(|| Error::Other("Could not find home directory".to_string()))?;

        Ok(home.join(".depmon").join("config.toml"))
    }

    /// Load config from file, or create default if it doesn't exist
    ///
    /// Environment variable overrides:
    /// - `DEPMON_TOKEN`: Overrides the token of every registry source
    /// - `DEPMON_CONFIG_DIR`: Overrides the config directory location
    pub fn load() -> Result<Self> {
        let path = Self::default_path()?;

        let mut config = if !path.exists() {
            Self::default()
        } else {
            let content = fs::read_to_string(&path)?;
            toml::from_str(&content)?
        };

        if let Ok(token) = std::env::var("DEPMON_TOKEN") {
            if !token.is_empty() {
                for registry in &mut config.registries {
                    registry.token = Some(token.clone());
                }
            }
        }

        Ok(config)
    }

    /// Save config to file
    pub fn save(&self) -> Result<()> {
        let path = Self::default_path()?;

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self)?;
        fs::write(&path, content)?;
        Ok(())
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.resolver.request_timeout_seconds)
    }

    /// Session options derived from this config.
    pub fn session_options(&self) -> SessionOptions {
        SessionOptions {
            ignored_ids: self
                .resolver
                .ignored_packages
                .iter()
                .map(|id| id.as_str().into())
                .collect(),
            ..SessionOptions::default()
        }
    }
}
