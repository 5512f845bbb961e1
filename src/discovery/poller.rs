//! Cluster poller: fans out a build listing request to every cluster.
//!
//! Runs on activation and then every poll interval. Each cluster is
//! fetched by its own task, so one slow or dead cluster never holds up
//! another or the next tick. Finished fetches post a [`PollEvent`] to a
//! single applier task, which is the only writer of the fleet state.

use indexmap::IndexMap;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::{JoinHandle, JoinSet};
use tokio::time::{self, Duration, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::adapters::{BuildSource, FetchError, GameServerBuild};
use crate::config::{ClusterEndpoint, Config};
use crate::fleet::FleetHandle;

pub type Clusters = Arc<IndexMap<String, ClusterEndpoint>>;

/// Result of one cluster fetch, applied in completion order.
#[derive(Debug)]
pub struct PollEvent {
    pub cluster: String,
    pub outcome: Result<Option<Vec<GameServerBuild>>, FetchError>,
}

/// Apply one fetch result to the fleet state.
pub fn apply_event(fleet: &FleetHandle, event: PollEvent) {
    let PollEvent { cluster, outcome } = event;
    match outcome {
        Ok(Some(builds)) => {
            debug!(cluster = %cluster, builds = builds.len(), "Cluster polled");
            fleet.update(|state| state.replace_builds(&cluster, builds));
        }
        Ok(None) => {
            // 200 without `items`: keep whatever we had, raise nothing.
            debug!(cluster = %cluster, "Listing has no items array, keeping previous builds");
        }
        Err(err @ FetchError::Status { .. }) => {
            // The cluster answered, just not with 200: alert, keep its builds.
            let raised = fleet.update(|state| state.record_alert(err.alert_message()));
            warn!(
                cluster = %cluster,
                url = %err.url(),
                new_alert = raised,
                "Cluster rejected build listing: {}",
                err
            );
        }
        Err(err) => {
            let message = err.alert_message();
            let raised = fleet.update(|state| state.mark_unreachable(&cluster, message));
            warn!(
                cluster = %cluster,
                url = %err.url(),
                new_alert = raised,
                "Cluster unreachable: {}",
                err
            );
        }
    }
}

// ── Scheduler ───────────────────────────────────────────────────────

/// Periodic poller with an explicit lifecycle.
///
/// `activate` and `deactivate` must be called from within a tokio
/// runtime. Deactivation stops future ticks only; fetches already in
/// flight finish and still land in the fleet state.
pub struct PollScheduler {
    clusters: Clusters,
    interval: Duration,
    source: Arc<dyn BuildSource>,
    fleet: FleetHandle,
    ticker: Option<JoinHandle<()>>,
}

impl PollScheduler {
    pub fn new(config: &Config, source: Arc<dyn BuildSource>, fleet: FleetHandle) -> Self {
        Self {
            clusters: Arc::new(config.clusters.clone()),
            interval: config.poll_interval(),
            source,
            fleet,
            ticker: None,
        }
    }

    pub fn fleet(&self) -> &FleetHandle {
        &self.fleet
    }

    pub fn is_active(&self) -> bool {
        self.ticker.as_ref().is_some_and(|t| !t.is_finished())
    }

    /// Poll every cluster now, then once per interval. No-op when
    /// already active.
    pub fn activate(&mut self) {
        if self.is_active() {
            return;
        }

        info!(
            clusters = self.clusters.len(),
            interval = ?self.interval,
            "📡 Cluster poller starting"
        );

        let events = spawn_applier(self.fleet.clone());
        let clusters = Arc::clone(&self.clusters);
        let source = Arc::clone(&self.source);
        let interval = self.interval;

        self.ticker = Some(tokio::spawn(async move {
            let mut ticker = time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                // First tick completes immediately.
                ticker.tick().await;
                debug!("📡 Polling {} clusters", clusters.len());
                fan_out(&clusters, &source, &events);
            }
        }));
    }

    pub fn deactivate(&mut self) {
        if let Some(ticker) = self.ticker.take() {
            ticker.abort();
            info!("📡 Cluster poller stopped");
        }
    }
}

impl Drop for PollScheduler {
    fn drop(&mut self) {
        self.deactivate();
    }
}

/// The applier lives as long as any sender: the ticker and every
/// in-flight fetch hold one.
fn spawn_applier(fleet: FleetHandle) -> mpsc::UnboundedSender<PollEvent> {
    let (tx, mut rx) = mpsc::unbounded_channel::<PollEvent>();
    tokio::spawn(async move {
        while let Some(event) = rx.recv().await {
            apply_event(&fleet, event);
        }
    });
    tx
}

/// Fire-and-forget: one detached task per cluster.
fn fan_out(
    clusters: &Clusters,
    source: &Arc<dyn BuildSource>,
    events: &mpsc::UnboundedSender<PollEvent>,
) {
    for (name, endpoint) in clusters.iter() {
        let cluster = name.clone();
        let endpoint = endpoint.clone();
        let source = Arc::clone(source);
        let events = events.clone();
        tokio::spawn(async move {
            let outcome = source.fetch_builds(&cluster, &endpoint).await;
            let event = PollEvent { cluster, outcome };
            if let Err(mpsc::error::SendError(event)) = events.send(event) {
                warn!(cluster = %event.cluster, "Fleet applier stopped, dropping poll result");
            }
        });
    }
}

// ── One-shot scan ───────────────────────────────────────────────────

/// Counts from a single [`run_full_scan`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScanReport {
    pub polled: usize,
    pub unreachable: usize,
    pub malformed: usize,
}

/// Fetch every cluster once, concurrently, and wait for all of them.
/// Results are applied in completion order, same as the scheduler.
pub async fn run_full_scan(
    clusters: &IndexMap<String, ClusterEndpoint>,
    source: Arc<dyn BuildSource>,
    fleet: &FleetHandle,
) -> ScanReport {
    let mut tasks = JoinSet::new();
    for (name, endpoint) in clusters {
        let cluster = name.clone();
        let endpoint = endpoint.clone();
        let source = Arc::clone(&source);
        tasks.spawn(async move {
            let outcome = source.fetch_builds(&cluster, &endpoint).await;
            PollEvent { cluster, outcome }
        });
    }

    let mut report = ScanReport::default();
    while let Some(joined) = tasks.join_next().await {
        let event = match joined {
            Ok(event) => event,
            Err(e) => {
                warn!("Cluster fetch task failed: {}", e);
                continue;
            }
        };
        match &event.outcome {
            Ok(Some(_)) => report.polled += 1,
            Ok(None) => report.malformed += 1,
            Err(_) => report.unreachable += 1,
        }
        apply_event(fleet, event);
    }

    info!(
        polled = report.polled,
        unreachable = report.unreachable,
        malformed = report.malformed,
        "📡 Fleet scan complete"
    );
    report
}
