//! Fleet state: the latest build lists per cluster plus the alert set.
//!
//! All writes go through [`FleetHandle::update`], which mutates under one
//! lock and publishes a freshly aggregated [`FleetSnapshot`] before the
//! lock is released. Readers only ever see whole snapshots.

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::Serialize;
use std::sync::{Arc, Mutex};
use tokio::sync::watch;

use crate::adapters::GameServerBuild;

pub mod aggregate;
pub mod availability;

use aggregate::FleetSummary;
use availability::AvailabilityTracker;

/// Cluster name → most recent build list, in order of first arrival.
pub type ClusterStore = IndexMap<String, Vec<GameServerBuild>>;

// ── State ───────────────────────────────────────────────────────────

#[derive(Debug, Default)]
pub struct FleetState {
    store: ClusterStore,
    availability: AvailabilityTracker,
}

impl FleetState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace a cluster's list wholesale.
    pub fn replace_builds(&mut self, cluster: &str, builds: Vec<GameServerBuild>) {
        match self.store.get_mut(cluster) {
            Some(existing) => *existing = builds,
            None => {
                self.store.insert(cluster.to_string(), builds);
            }
        }
    }

    /// The cluster reports zero builds until it answers again, and the
    /// alert is raised (once).
    pub fn mark_unreachable(&mut self, cluster: &str, message: String) -> bool {
        self.replace_builds(cluster, Vec::new());
        self.availability.record_failure(message)
    }

    /// Raise the alert (once) and leave the cluster's builds untouched.
    pub fn record_alert(&mut self, message: String) -> bool {
        self.availability.record_failure(message)
    }

    pub fn dismiss(&mut self, message: &str) -> bool {
        self.availability.dismiss(message)
    }

    pub fn store(&self) -> &ClusterStore {
        &self.store
    }

    pub fn availability(&self) -> &AvailabilityTracker {
        &self.availability
    }

    pub fn snapshot(&self) -> FleetSnapshot {
        FleetSnapshot {
            summary: aggregate::aggregate(&self.store),
            alerts: self.availability.list().map(str::to_string).collect(),
            updated_at: Utc::now(),
        }
    }
}

/// Everything the dashboard renders, computed in one pass.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FleetSnapshot {
    #[serde(flatten)]
    pub summary: FleetSummary,
    /// Sorted.
    pub alerts: Vec<String>,
    pub updated_at: DateTime<Utc>,
}

// ── Handle ──────────────────────────────────────────────────────────

/// Shared access to the fleet state. Cheap to clone.
#[derive(Clone)]
pub struct FleetHandle {
    state: Arc<Mutex<FleetState>>,
    snapshots: Arc<watch::Sender<Arc<FleetSnapshot>>>,
}

impl FleetHandle {
    pub fn new() -> Self {
        let state = FleetState::new();
        let (tx, _rx) = watch::channel(Arc::new(state.snapshot()));
        Self {
            state: Arc::new(Mutex::new(state)),
            snapshots: Arc::new(tx),
        }
    }

    /// Mutate the state and publish the recomputed snapshot atomically.
    pub fn update<R>(&self, f: impl FnOnce(&mut FleetState) -> R) -> R {
        // A panic mid-update leaves a consistent map; keep serving it.
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        let result = f(&mut state);
        self.snapshots.send_replace(Arc::new(state.snapshot()));
        result
    }

    pub fn snapshot(&self) -> Arc<FleetSnapshot> {
        self.snapshots.borrow().clone()
    }

    /// Notified after every state change.
    pub fn subscribe(&self) -> watch::Receiver<Arc<FleetSnapshot>> {
        self.snapshots.subscribe()
    }

    pub fn alerts(&self) -> Vec<String> {
        self.snapshot().alerts.clone()
    }

    /// Idempotent; dismissing an unknown message changes nothing.
    pub fn dismiss(&self, message: &str) -> bool {
        self.update(|state| state.dismiss(message))
    }
}

impl Default for FleetHandle {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::{BuildMetadata, BuildSpec, BuildStatus};

    fn gsb(name: &str, standing_by: u64, active: u64) -> GameServerBuild {
        GameServerBuild {
            metadata: BuildMetadata { name: name.into() },
            spec: BuildSpec { title_id: "t".into() },
            status: BuildStatus {
                health: Some("Healthy".into()),
                current_standing_by: standing_by,
                current_active: active,
                ..Default::default()
            },
        }
    }

    #[test]
    fn test_replace_keeps_first_arrival_order() {
        let mut state = FleetState::new();
        state.replace_builds("b", vec![gsb("x", 1, 1)]);
        state.replace_builds("a", vec![]);
        state.replace_builds("b", vec![gsb("y", 2, 2)]);
        let names: Vec<_> = state.store().keys().cloned().collect();
        assert_eq!(names, vec!["b", "a"]);
        assert_eq!(state.store()["b"][0].metadata.name, "y");
    }

    #[test]
    fn test_mark_unreachable_empties_cluster() {
        let mut state = FleetState::new();
        state.replace_builds("a", vec![gsb("x", 3, 4)]);
        assert!(state.mark_unreachable("a", "Couldn't reach cluster 'a' at: u".into()));
        assert!(state.store()["a"].is_empty());
        assert!(!state.mark_unreachable("a", "Couldn't reach cluster 'a' at: u".into()));
        assert_eq!(state.availability().len(), 1);
    }

    #[test]
    fn test_record_alert_leaves_store_alone() {
        let mut state = FleetState::new();
        state.replace_builds("a", vec![gsb("x", 3, 4)]);
        assert!(state.record_alert("Couldn't reach cluster 'a' at: u".into()));
        assert_eq!(state.store()["a"], vec![gsb("x", 3, 4)]);
        assert!(!state.record_alert("Couldn't reach cluster 'a' at: u".into()));

        assert!(state.record_alert("Couldn't reach cluster 'b' at: v".into()));
        assert!(!state.store().contains_key("b"));
        assert_eq!(state.availability().len(), 2);
    }

    #[test]
    fn test_handle_publishes_on_update() {
        let handle = FleetHandle::new();
        let mut rx = handle.subscribe();
        assert_eq!(handle.snapshot().summary.total.standing_by, 0);

        handle.update(|state| state.replace_builds("a", vec![gsb("x", 3, 4)]));
        assert!(rx.has_changed().unwrap());
        let snap = rx.borrow_and_update().clone();
        assert_eq!(snap.summary.total.standing_by, 3);
        assert_eq!(snap.summary.total.active, 4);
    }

    #[test]
    fn test_handle_dismiss() {
        let handle = FleetHandle::new();
        handle.update(|state| state.mark_unreachable("a", "m-a".into()));
        handle.update(|state| state.mark_unreachable("b", "m-b".into()));
        assert_eq!(handle.alerts(), vec!["m-a", "m-b"]);

        assert!(handle.dismiss("m-a"));
        assert_eq!(handle.alerts(), vec!["m-b"]);
        assert!(!handle.dismiss("m-a"));
        assert!(!handle.dismiss("never-seen"));
        assert_eq!(handle.alerts(), vec!["m-b"]);
    }

    #[test]
    fn test_snapshot_is_detached_from_state() {
        let handle = FleetHandle::new();
        handle.update(|state| state.replace_builds("a", vec![gsb("x", 1, 0)]));
        let before = handle.snapshot();
        handle.update(|state| state.replace_builds("a", vec![gsb("x", 9, 0)]));
        assert_eq!(before.summary.total.standing_by, 1);
        assert_eq!(handle.snapshot().summary.total.standing_by, 9);
    }
}
