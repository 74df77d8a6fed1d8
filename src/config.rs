// SPDX-License-Identifier: MIT

//! Application configuration
//!
//! Loaded from an optional YAML file, then overridden by environment
//! variables (a `.env` file is honoured by the binary):
//! - `CHECKLIST_CONTENT` - checklist JSON document
//! - `CHECKLIST_PROGRESS` - progress file
//! - `CHECKLIST_CACHE_CAPACITY` - compiled condition cache bound (0 = unbounded)
//! - `CHECKLIST_PORT` - HTTP port for `serve`

use crate::error::GateError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const DEFAULT_TITLE: &str = "Stellar Blade Checklist";
pub const DEFAULT_PROGRESS_KEY: &str = "stellar-blade-checklist";

/// Condition gate settings
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct GateConfig {
    /// Maximum number of compiled text conditions kept; unbounded when absent
    #[serde(default)]
    pub cache_capacity: Option<usize>,
    /// Treat the clause `any` as matching every value
    #[serde(default = "default_true")]
    pub any_wildcard: bool,
}

impl Default for GateConfig {
    fn default() -> Self {
        Self {
            cache_capacity: None,
            any_wildcard: true,
        }
    }
}

/// HTTP server settings
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

/// Top-level configuration
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct AppConfig {
    /// Title used in Markdown exports
    #[serde(default = "default_title")]
    pub title: String,
    /// Namespace for stored progress and the key stamped on JSON exports
    #[serde(default = "default_progress_key")]
    pub progress_key: String,
    /// Checklist content document
    #[serde(default)]
    pub content: Option<PathBuf>,
    /// Progress file
    #[serde(default)]
    pub progress: Option<PathBuf>,
    #[serde(default)]
    pub gate: GateConfig,
    #[serde(default)]
    pub server: ServerConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            title: default_title(),
            progress_key: default_progress_key(),
            content: None,
            progress: None,
            gate: GateConfig::default(),
            server: ServerConfig::default(),
        }
    }
}

impl AppConfig {
    /// Parse configuration from a YAML string
    pub fn parse_yaml(content: &str) -> Result<Self, GateError> {
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml::from_str(content)?)
    }

    /// Load configuration from a YAML file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, GateError> {
        let content = std::fs::read_to_string(path)?;
        Self::parse_yaml(&content)
    }

    /// Load `path` when given, otherwise defaults; then apply the environment
    pub fn resolve(path: Option<&Path>) -> Result<Self, GateError> {
        let mut config = match path {
            Some(path) => Self::load(path)?,
            None => Self::default(),
        };
        config.apply_env(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    /// Apply overrides from a variable lookup
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<(), GateError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(content) = lookup("CHECKLIST_CONTENT") {
            self.content = Some(PathBuf::from(content));
        }
        if let Some(progress) = lookup("CHECKLIST_PROGRESS") {
            self.progress = Some(PathBuf::from(progress));
        }
        if let Some(capacity) = lookup("CHECKLIST_CACHE_CAPACITY") {
            let capacity: usize = capacity.trim().parse().map_err(|_| {
                GateError::config(format!("CHECKLIST_CACHE_CAPACITY is not a number: {}", capacity))
            })?;
            self.gate.cache_capacity = (capacity > 0).then_some(capacity);
        }
        if let Some(port) = lookup("CHECKLIST_PORT") {
            self.server.port = port
                .trim()
                .parse()
                .map_err(|_| GateError::config(format!("CHECKLIST_PORT is not a port: {}", port)))?;
        }
        Ok(())
    }
}

fn default_true() -> bool {
    true
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    3000
}

fn default_title() -> String {
    DEFAULT_TITLE.to_string()
}

fn default_progress_key() -> String {
    DEFAULT_PROGRESS_KEY.to_string()
}
