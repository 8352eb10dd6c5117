//! Configuration management with layered hierarchy

use miette::Diagnostic;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::core::connector::Connector;
use crate::core::placeholder::DEFAULT_SYSTEM_PLACEHOLDER;

/// Default expanded output directory, relative to the connector directory
pub const DEFAULT_EXPANDED_DIR: &str = ".expanded";

const CONFIG_FILE: &str = "config.yaml";

/// Tool configuration with layered hierarchy
#[derive(Debug, Default, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct Config {
    /// String standing in for the system id in expanded output
    pub system_placeholder: Option<String>,

    /// Where `expand` writes its output
    pub expanded_dir: Option<PathBuf>,
}

#[derive(Debug, Error, Diagnostic)]
pub enum ConfigError {
    #[error("the system placeholder must not be empty")]
    #[diagnostic(
        code(connector::config::empty_placeholder),
        help("pass a non-empty value with --system-placeholder")
    )]
    EmptyPlaceholder,
}

impl Config {
    /// Load configuration from all sources, merging in priority order
    pub fn load(connector: &Connector) -> Self {
        let mut config = Config::default();

        // 1. Built-in defaults (applied by the accessors)

        // 2. Global user config (~/.config/connector/config.yaml)
        if let Some(global) = Self::global_config_path().and_then(|p| Self::read_layer(&p)) {
            config.merge(global);
        }

        // 3. Connector config (.connector/config.yaml)
        if let Some(local) = Self::read_layer(&connector.config_dir().join(CONFIG_FILE)) {
            config.merge(local);
        }

        // 4. Environment variables
        config.merge(Self::from_env());

        config
    }

    /// Get the path to the global config file
    fn global_config_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("", "", "connector")
            .map(|dirs| dirs.config_dir().join(CONFIG_FILE))
    }

    /// Read one YAML layer; unreadable or invalid files are ignored
    fn read_layer(path: &Path) -> Option<Config> {
        if !path.exists() {
            return None;
        }
        let contents = std::fs::read_to_string(path).ok()?;
        match serde_yml::from_str::<Config>(&contents) {
            Ok(config) => Some(config),
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "ignoring invalid config file");
                None
            }
        }
    }

    fn from_env() -> Config {
        Config {
            system_placeholder: std::env::var("CONNECTOR_SYSTEM_PLACEHOLDER").ok(),
            expanded_dir: std::env::var_os("CONNECTOR_EXPANDED_DIR").map(PathBuf::from),
        }
    }

    /// Merge another config into this one (other takes precedence)
    pub fn merge(&mut self, other: Config) {
        if other.system_placeholder.is_some() {
            self.system_placeholder = other.system_placeholder;
        }
        if other.expanded_dir.is_some() {
            self.expanded_dir = other.expanded_dir;
        }
    }

    /// Apply command-line values, the highest priority layer
    pub fn with_overrides(
        mut self,
        system_placeholder: Option<String>,
        expanded_dir: Option<PathBuf>,
    ) -> Self {
        self.merge(Config {
            system_placeholder,
            expanded_dir,
        });
        self
    }

    /// Get the system placeholder, falling back to the default
    pub fn system_placeholder(&self) -> Result<String, ConfigError> {
        let placeholder = self
            .system_placeholder
            .clone()
            .unwrap_or_else(|| DEFAULT_SYSTEM_PLACEHOLDER.to_string());
        if placeholder.is_empty() {
            return Err(ConfigError::EmptyPlaceholder);
        }
        Ok(placeholder)
    }

    /// Get the expanded directory, falling back to the default
    pub fn expanded_dir(&self) -> PathBuf {
        self.expanded_dir
            .clone()
            .unwrap_or_else(|| PathBuf::from(DEFAULT_EXPANDED_DIR))
    }
}
