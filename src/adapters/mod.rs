//! Cluster adapters: the seam between the poller and a cluster API.
//!
//! A cluster answers `GET <api>gameserverbuilds` with a list of game
//! server build records. Adapters fetch and decode that list and hand
//! the result back; they never touch the fleet state themselves.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::config::ClusterEndpoint;

pub mod http;

// ── Core Types ──────────────────────────────────────────────────────

/// One game server build as reported by a cluster.
///
/// Records are replaced wholesale on the next successful poll of their
/// cluster and never edited in place.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameServerBuild {
    #[serde(default)]
    pub metadata: BuildMetadata,
    #[serde(default)]
    pub spec: BuildSpec,
    #[serde(default)]
    pub status: BuildStatus,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildMetadata {
    /// Unique within a cluster, not across the fleet.
    #[serde(default)]
    pub name: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildSpec {
    #[serde(rename = "titleID", default)]
    pub title_id: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BuildStatus {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub health: Option<String>,
    #[serde(default)]
    pub current_standing_by: u64,
    #[serde(default)]
    pub current_active: u64,
    #[serde(default)]
    pub current_pending: u64,
    #[serde(default)]
    pub current_initializing: u64,
}

impl GameServerBuild {
    /// Decode one entry of a cluster's `items` array.
    ///
    /// Never fails: the cluster's output is taken as-is, so odd items
    /// degrade to empty keys and zero counts instead of rejecting the list.
    pub fn from_item(item: &Value) -> Self {
        let status = &item["status"];
        Self {
            metadata: BuildMetadata {
                name: key_text(&item["metadata"]["name"]),
            },
            spec: BuildSpec {
                title_id: key_text(&item["spec"]["titleID"]),
            },
            status: BuildStatus {
                health: status["health"].as_str().map(str::to_string),
                current_standing_by: status["currentStandingBy"].as_u64().unwrap_or(0),
                current_active: status["currentActive"].as_u64().unwrap_or(0),
                current_pending: status["currentPending"].as_u64().unwrap_or(0),
                current_initializing: status["currentInitializing"].as_u64().unwrap_or(0),
            },
        }
    }
}

/// Mapping keys are used verbatim; non-strings keep their JSON text.
fn key_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

// ── Errors ──────────────────────────────────────────────────────────

/// A cluster could not be reached, or answered with something other
/// than a JSON document under HTTP 200.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("cluster '{cluster}' answered HTTP {status} at {url}")]
    Status {
        cluster: String,
        url: String,
        status: u16,
    },

    #[error("cluster '{cluster}' unreachable at {url}: {source}")]
    Transport {
        cluster: String,
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("cluster '{cluster}' sent an undecodable body at {url}: {source}")]
    Decode {
        cluster: String,
        url: String,
        #[source]
        source: reqwest::Error,
    },
}

impl FetchError {
    pub fn cluster(&self) -> &str {
        match self {
            Self::Status { cluster, .. }
            | Self::Transport { cluster, .. }
            | Self::Decode { cluster, .. } => cluster,
        }
    }

    pub fn url(&self) -> &str {
        match self {
            Self::Status { url, .. } | Self::Transport { url, .. } | Self::Decode { url, .. } => url,
        }
    }

    /// The alert shown to operators. Identical for every failure class
    /// so repeated failures of one endpoint collapse into one alert.
    pub fn alert_message(&self) -> String {
        unreachable_message(self.cluster(), self.url())
    }
}

pub fn unreachable_message(cluster: &str, url: &str) -> String {
    format!("Couldn't reach cluster '{}' at: {}", cluster, url)
}

// ── Adapter Trait ───────────────────────────────────────────────────

/// Fetches the build list of one cluster.
#[async_trait]
pub trait BuildSource: Send + Sync {
    /// `Ok(Some(_))` on a usable listing, `Ok(None)` when the cluster
    /// answered 200 without an `items` array, `Err(_)` when it is
    /// unreachable.
    async fn fetch_builds(
        &self,
        cluster: &str,
        endpoint: &ClusterEndpoint,
    ) -> Result<Option<Vec<GameServerBuild>>, FetchError>;
}
