//! Snapshot ownership and the refresh cycle.
//!
//! A refresh pulls every record from the issue store, runs the whole
//! pipeline and swaps the published `Arc<LeaderboardSnapshot>` in one step.
//! Readers clone the `Arc` and never observe a half-built snapshot. Only one
//! refresh runs at a time; overlapping requests are coalesced into a no-op.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use chrono::{DateTime, Utc};
use tokio::sync::{oneshot, RwLock};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use crate::accumulate::accumulate;
use crate::config::EngineConfig;
use crate::errors::{EngineError, EngineResult};
use crate::models::{IssueRecord, LeaderboardSnapshot};
use crate::store::IssueStore;
use crate::{ranking, scoring, trends};

/// Runs accumulate → score → rank → trends/distribution over one pull.
pub fn compute_snapshot(records: &[IssueRecord], now: DateTime<Utc>) -> LeaderboardSnapshot {
    let acc = accumulate(records);
    if acc.skipped_anonymous > 0 {
        debug!(
            skipped = acc.skipped_anonymous,
            "records without a contributor id left out of contributor totals"
        );
    }
    let scored = acc
        .contributors
        .into_values()
        .map(|aggregate| scoring::score(aggregate, now))
        .collect();
    let ranked = ranking::rank(scored);

    LeaderboardSnapshot {
        summary: trends::summarize(&ranked, now),
        category_distribution: trends::build_category_distribution(&acc.categories),
        trends: trends::build_trends(records, now),
        contributors: ranked,
        generated_at: now,
        record_count: records.len(),
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RefreshOutcome {
    Published {
        generated_at: DateTime<Utc>,
        records: usize,
        contributors: usize,
    },
    /// Another refresh was already running.
    Coalesced,
}

/// Clears the in-flight flag however the refresh ends, including when the
/// refresh future is dropped by its caller.
struct InFlight<'a>(&'a AtomicBool);

impl<'a> InFlight<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| InFlight(flag))
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

pub struct LeaderboardEngine<S> {
    store: S,
    config: EngineConfig,
    current: RwLock<Arc<LeaderboardSnapshot>>,
    refreshing: AtomicBool,
    stale: AtomicBool,
}

impl<S: IssueStore> LeaderboardEngine<S> {
    pub fn new(store: S, config: EngineConfig) -> Self {
        Self {
            store,
            config,
            current: RwLock::new(Arc::new(LeaderboardSnapshot::empty(Utc::now()))),
            refreshing: AtomicBool::new(false),
            stale: AtomicBool::new(false),
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    #[cfg(test)]
    pub fn store(&self) -> &S {
        &self.store
    }

    /// The currently published snapshot.
    pub async fn snapshot(&self) -> Arc<LeaderboardSnapshot> {
        Arc::clone(&*self.current.read().await)
    }

    /// True when the latest refresh attempt failed or timed out.
    pub fn is_stale(&self) -> bool {
        self.stale.load(Ordering::Acquire)
    }

    #[cfg(test)]
    pub fn is_refreshing(&self) -> bool {
        self.refreshing.load(Ordering::Acquire)
    }

    pub async fn refresh(&self) -> EngineResult<RefreshOutcome> {
        let Some(_in_flight) = InFlight::acquire(&self.refreshing) else {
            debug!("refresh already in flight, coalescing request");
            return Ok(RefreshOutcome::Coalesced);
        };

        let started = Instant::now();
        let fetched =
            tokio::time::timeout(self.config.refresh_timeout, self.store.fetch(self.config.range))
                .await;

        let records = match fetched {
            Ok(Ok(records)) => records,
            Ok(Err(err)) => {
                self.stale.store(true, Ordering::Release);
                let serving = self.current.read().await.generated_at;
                warn!(
                    error = %err,
                    %serving,
                    "issue store fetch failed, keeping previous snapshot"
                );
                return Err(EngineError::Fetch {
                    serving,
                    source: err.into(),
                });
            }
            Err(_) => {
                self.stale.store(true, Ordering::Release);
                let serving = self.current.read().await.generated_at;
                let timeout_secs = self.config.refresh_timeout.as_secs();
                warn!(timeout_secs, %serving, "refresh timed out, keeping previous snapshot");
                return Err(EngineError::TimedOut {
                    serving,
                    timeout_secs,
                });
            }
        };

        let snapshot = Arc::new(compute_snapshot(&records, Utc::now()));
        let outcome = RefreshOutcome::Published {
            generated_at: snapshot.generated_at,
            records: snapshot.record_count,
            contributors: snapshot.contributors.len(),
        };
        info!(
            records = snapshot.record_count,
            contributors = snapshot.contributors.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "leaderboard snapshot published"
        );

        *self.current.write().await = snapshot;
        self.stale.store(false, Ordering::Release);
        Ok(outcome)
    }

    /// Refreshes on a fixed interval (first tick immediately) until the
    /// returned handle is stopped or dropped. Manual `refresh` calls share
    /// the same coalescing rule.
    pub fn spawn_refresher(self: &Arc<Self>) -> RefresherHandle {
        let (stop_tx, mut stop_rx) = oneshot::channel::<()>();
        let engine = Arc::clone(self);
        let period = self.config.refresh_interval;

        let task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            info!(interval_secs = period.as_secs(), "periodic refresher started");

            loop {
                tokio::select! {
                    _ = &mut stop_rx => break,
                    _ = ticker.tick() => {}
                }
                tokio::select! {
                    _ = &mut stop_rx => break,
                    result = engine.refresh() => {
                        if let Err(err) = result {
                            warn!(error = %err, "periodic refresh failed");
                        }
                    }
                }
            }

            info!("periodic refresher stopped");
        });

        RefresherHandle {
            stop: Some(stop_tx),
            task,
        }
    }
}

pub struct RefresherHandle {
    stop: Option<oneshot::Sender<()>>,
    task: JoinHandle<()>,
}

impl RefresherHandle {
    /// Signals the loop and waits for it to exit. A refresh in progress is
    /// abandoned without publishing.
    pub async fn stop(mut self) {
        if let Some(stop) = self.stop.take() {
            let _ = stop.send(());
        }
        if let Err(err) = (&mut self.task).await {
            warn!(error = %err, "refresher task ended abnormally");
        }
    }
}
