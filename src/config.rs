//! Configuration management for jaltol-chat.
//!
//! Configuration is loaded from `~/.config/jaltol-chat/config.toml`.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Main configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Chat endpoint configuration.
    #[serde(default)]
    pub server: ServerConfig,
    /// Screen preferences.
    #[serde(default)]
    pub ui: UiConfig,
}

/// Where chat submissions are sent.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Endpoint receiving `POST {"user": ...}` (default: http://127.0.0.1:8000/jaltol/).
    #[serde(default = "default_endpoint")]
    pub endpoint: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
        }
    }
}

fn default_endpoint() -> String {
    "http://127.0.0.1:8000/jaltol/".to_string()
}

/// Text shown by the chat screen.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UiConfig {
    /// Title of the transcript pane.
    #[serde(default = "default_title")]
    pub title: String,
    /// Status text while a request is in flight.
    #[serde(default = "default_processing_marker")]
    pub processing_marker: String,
    /// Status text once a request has settled.
    #[serde(default = "default_idle_marker")]
    pub idle_marker: String,
}

impl Default for UiConfig {
    fn default() -> Self {
        Self {
            title: default_title(),
            processing_marker: default_processing_marker(),
            idle_marker: default_idle_marker(),
        }
    }
}

fn default_title() -> String {
    "JaltolAI".to_string()
}

fn default_processing_marker() -> String {
    "Processing...".to_string()
}

fn default_idle_marker() -> String {
    ".".to_string()
}

impl Config {
    /// Get the config directory path.
    pub fn config_dir() -> Result<PathBuf> {
        dirs::config_dir()
            .map(|p| p.join("jaltol-chat"))
            .context("Could not determine config directory")
    }

    /// Get the config file path.
    pub fn config_path() -> Result<PathBuf> {
        Ok(Self::config_dir()?.join("config.toml"))
    }

    /// Get the log file used while the chat screen owns the terminal.
    pub fn log_path() -> Result<PathBuf> {
        Ok(Self::config_dir()?.join("jaltol-chat.log"))
    }

    /// Load configuration from file, using defaults if not found.
    pub fn load() -> Result<Self> {
        let path = Self::config_path()?;
        if path.exists() {
            let contents = std::fs::read_to_string(&path)
                .with_context(|| format!("Failed to read config file: {}", path.display()))?;
            Self::parse(&contents)
                .with_context(|| format!("Failed to parse config file: {}", path.display()))
        } else {
            Ok(Self::default())
        }
    }

    /// Parse configuration from TOML text.
    pub fn parse(contents: &str) -> Result<Self> {
        Ok(toml::from_str(contents)?)
    }

    /// Save configuration to file.
    pub fn save(&self) -> Result<()> {
        let path = Self::config_path()?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create config directory: {}", parent.display()))?;
        }
        std::fs::write(&path, self.to_toml()?)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;
        Ok(())
    }

    /// Render the configuration as TOML.
    pub fn to_toml(&self) -> Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Replace the endpoint when one was given on the command line.
    pub fn with_endpoint(mut self, endpoint: Option<String>) -> Self {
        if let Some(endpoint) = endpoint {
            self.server.endpoint = endpoint;
        }
        self
    }
}
