//! Gateway settings.
//!
//! Loaded from an optional TOML file and `DEALFORM_`-prefixed environment variables, in that
//! order of precedence (environment wins). Everything except the token has a default.

use crate::error::ConfigError;
use crate::gateway::OptionsStrategy;
use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

pub const DEFAULT_BASE_URL: &str = "https://api.hubapi.com";
pub const DEFAULT_OBJECT_TYPE: &str = "deals";
pub const DEFAULT_FILE_ACCESS: &str = "PUBLIC_NOT_INDEXABLE";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GatewayConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// The CRM object type the form edits.
    #[serde(default = "default_object_type")]
    pub object_type: String,
    /// Bearer credential sent on every call.
    #[serde(default, skip_serializing)]
    pub token: Option<String>,
    #[serde(default)]
    pub options_strategy: OptionsStrategy,
    /// Access level requested for uploaded files.
    #[serde(default = "default_file_access")]
    pub file_access: String,
    /// Per-request timeout. Unset means calls may hang indefinitely.
    #[serde(default)]
    pub timeout_secs: Option<u64>,
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

fn default_object_type() -> String {
    DEFAULT_OBJECT_TYPE.to_string()
}

fn default_file_access() -> String {
    DEFAULT_FILE_ACCESS.to_string()
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            object_type: default_object_type(),
            token: None,
            options_strategy: OptionsStrategy::default(),
            file_access: default_file_access(),
            timeout_secs: None,
        }
    }
}

impl GatewayConfig {
    /// Loads settings from `path` (when given) and the environment.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut builder = Config::builder()
            .set_default("base_url", DEFAULT_BASE_URL)?
            .set_default("object_type", DEFAULT_OBJECT_TYPE)?
            .set_default("file_access", DEFAULT_FILE_ACCESS)?;

        if let Some(path) = path {
            builder = builder.add_source(File::from(path.to_path_buf()).required(true));
        }

        let settings: GatewayConfig = builder
            .add_source(Environment::with_prefix("DEALFORM").try_parsing(true))
            .build()?
            .try_deserialize()?;
        Ok(settings)
    }

    /// The bearer token, or an error when none was configured.
    pub fn token(&self) -> Result<&str, ConfigError> {
        self.token
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .ok_or(ConfigError::MissingToken)
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_secs.map(Duration::from_secs)
    }
}
