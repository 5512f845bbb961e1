//! Fleet configuration: which clusters to poll and how often.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

use crate::adapters::http::BUILD_LISTING_PATH;

pub const DEFAULT_POLL_INTERVAL_MS: u64 = 5_000;
pub const DEFAULT_REQUEST_TIMEOUT_MS: u64 = 5_000;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid JSON config: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid YAML config: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("no clusters configured")]
    NoClusters,

    #[error("cluster '{0}' has an empty api URL")]
    EmptyApi(String),

    #[error("{0} must be greater than zero")]
    ZeroDuration(&'static str),
}

/// Endpoints of one cluster. Only `api` is used for polling; other
/// entries (dashboards, consoles) are carried through untouched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClusterEndpoint {
    pub api: String,
    #[serde(flatten)]
    pub extra: BTreeMap<String, String>,
}

impl ClusterEndpoint {
    pub fn new(api: impl Into<String>) -> Self {
        Self {
            api: api.into(),
            extra: BTreeMap::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    pub clusters: IndexMap<String, ClusterEndpoint>,
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
    #[serde(default = "default_build_path")]
    pub build_path: String,
}

fn default_poll_interval_ms() -> u64 {
    DEFAULT_POLL_INTERVAL_MS
}

fn default_request_timeout_ms() -> u64 {
    DEFAULT_REQUEST_TIMEOUT_MS
}

fn default_build_path() -> String {
    BUILD_LISTING_PATH.to_string()
}

impl Config {
    pub fn new(clusters: IndexMap<String, ClusterEndpoint>) -> Self {
        Self {
            clusters,
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
            request_timeout_ms: DEFAULT_REQUEST_TIMEOUT_MS,
            build_path: default_build_path(),
        }
    }

    /// Load from a file. `.yaml`/`.yml` are read as YAML, anything else as JSON.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;

        let is_yaml = matches!(
            path.extension().and_then(|e| e.to_str()),
            Some("yaml") | Some("yml")
        );
        let config = if is_yaml {
            Self::from_yaml(&content)?
        } else {
            Self::from_json(&content)?
        };

        tracing::info!(
            path = %path.display(),
            clusters = config.clusters.len(),
            "Loaded fleet config"
        );
        Ok(config)
    }

    pub fn from_json(content: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_yaml(content: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_yaml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.clusters.is_empty() {
            return Err(ConfigError::NoClusters);
        }
        if let Some((name, _)) = self.clusters.iter().find(|(_, ep)| ep.api.trim().is_empty()) {
            return Err(ConfigError::EmptyApi(name.clone()));
        }
        if self.poll_interval_ms == 0 {
            return Err(ConfigError::ZeroDuration("pollIntervalMs"));
        }
        if self.request_timeout_ms == 0 {
            return Err(ConfigError::ZeroDuration("requestTimeoutMs"));
        }
        Ok(())
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}
