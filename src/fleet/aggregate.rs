//! Aggregation reducer: folds the cluster store into the four views
//! the dashboard shows: fleet total, per cluster, per build, per title.
//!
//! Recomputed from scratch on every store change. The store is bounded
//! by fleet size, so there is no incremental path.
//!
//! Field coverage is deliberately uneven:
//! - total, per-cluster and per-build sum `standingBy` and `active` only;
//!   `pending`/`initializing` stay zero there.
//! - per-title sums `standingBy` but takes `active`, `pending`,
//!   `initializing` and health from the last record of that title in
//!   traversal order (clusters in store order, records in list order).

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use super::ClusterStore;
use crate::adapters::GameServerBuild;

// ── Types ───────────────────────────────────────────────────────────

/// Collapsed build health. Only exact `"Healthy"` and `"Unhealthy"`
/// survive; everything else, absence included, is `Unknown`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Health {
    Healthy,
    Unhealthy,
    #[default]
    Unknown,
}

impl Health {
    pub fn collapse(raw: Option<&str>) -> Self {
        match raw {
            Some("Healthy") => Health::Healthy,
            Some("Unhealthy") => Health::Unhealthy,
            _ => Health::Unknown,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SummaryCounters {
    pub standing_by: u64,
    pub active: u64,
    pub pending: u64,
    pub initializing: u64,
}

impl SummaryCounters {
    /// Adds the fields the fleet, cluster and build views track.
    fn add_running(&mut self, gsb: &GameServerBuild) {
        self.standing_by = self.standing_by.saturating_add(gsb.status.current_standing_by);
        self.active = self.active.saturating_add(gsb.status.current_active);
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TitleSummary {
    #[serde(flatten)]
    pub counters: SummaryCounters,
    pub status: Health,
}

impl TitleSummary {
    fn apply(&mut self, gsb: &GameServerBuild) {
        let status = &gsb.status;
        self.counters.standing_by = self
            .counters
            .standing_by
            .saturating_add(status.current_standing_by);
        self.counters.active = status.current_active;
        self.counters.pending = status.current_pending;
        self.counters.initializing = status.current_initializing;
        self.status = Health::collapse(status.health.as_deref());
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FleetSummary {
    pub total: SummaryCounters,
    pub per_cluster: IndexMap<String, SummaryCounters>,
    pub per_build: IndexMap<String, SummaryCounters>,
    pub per_title: IndexMap<String, TitleSummary>,
}

// ── Reducer ─────────────────────────────────────────────────────────

/// Pure and deterministic; never fails.
pub fn aggregate(store: &ClusterStore) -> FleetSummary {
    let mut summary = FleetSummary::default();

    for (cluster, builds) in store {
        // Every known cluster gets a row, even with no builds.
        let cluster_counters = summary.per_cluster.entry(cluster.clone()).or_default();

        for gsb in builds {
            cluster_counters.add_running(gsb);
            summary.total.add_running(gsb);
            summary
                .per_build
                .entry(gsb.metadata.name.clone())
                .or_default()
                .add_running(gsb);
            summary
                .per_title
                .entry(gsb.spec.title_id.clone())
                .or_default()
                .apply(gsb);
        }
    }

    summary
}
