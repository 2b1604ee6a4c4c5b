//! Periodic sweep over every registered monitor.
//!
//! One timer drives sweeps; an atomic flag guarantees sweeps never overlap.
//! Within a sweep each monitor is probed on its own task, bounded by a
//! semaphore, and evaluated independently: probe, decide, persist, notify.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use sqlx::SqlitePool;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, error, info, warn};

use crate::db::models::Monitor;
use crate::db::services::monitor_service;
use crate::monitoring::state::{self, StateAction};
use crate::probes::{ProbeSpec, Prober};
use crate::transport::ChatTransport;

#[derive(Debug, thiserror::Error)]
pub enum SweepError {
    #[error("Database query error: {0}")]
    DatabaseError(#[from] sqlx::Error),
}

/// Counts reported when a sweep completes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SweepSummary {
    /// Monitors considered by this sweep, including skipped ones.
    pub checked: usize,
    /// Monitors with unusable records that were not probed.
    pub skipped: usize,
}

pub struct SweepService<P, T> {
    pool: SqlitePool,
    prober: Arc<P>,
    transport: Arc<T>,
    sweep_interval: Duration,
    max_concurrent_probes: usize,
    in_progress: AtomicBool,
}

impl<P, T> SweepService<P, T>
where
    P: Prober + 'static,
    T: ChatTransport + 'static,
{
    pub fn new(
        pool: SqlitePool,
        prober: Arc<P>,
        transport: Arc<T>,
        sweep_interval: Duration,
        max_concurrent_probes: usize,
    ) -> Self {
        Self {
            pool,
            prober,
            transport,
            sweep_interval,
            max_concurrent_probes: max_concurrent_probes.max(1),
            in_progress: AtomicBool::new(false),
        }
    }

    /// Runs sweeps forever at the configured interval. Ticks that land while
    /// a sweep is still running are dropped, not queued.
    pub async fn start_periodic_sweeps(self: Arc<Self>) {
        info!(
            interval_seconds = self.sweep_interval.as_secs(),
            "Monitor sweep service started."
        );
        let mut ticker = interval(self.sweep_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        loop {
            ticker.tick().await;
            self.sweep_once().await;
        }
    }

    /// Runs a single sweep unless one is already in progress; returns `None`
    /// when the tick was dropped or the sweep failed. The whole sweep is
    /// capped at the sweep interval so a wedged probe cannot hold the
    /// in-progress flag past the next tick.
    pub async fn sweep_once(&self) -> Option<SweepSummary> {
        if self
            .in_progress
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            debug!("Previous sweep still in progress, dropping tick.");
            return None;
        }

        let summary = match tokio::time::timeout(self.sweep_interval, self.run_sweep()).await {
            Ok(Ok(summary)) => {
                info!(
                    skipped = summary.skipped,
                    "checked {} monitors", summary.checked
                );
                Some(summary)
            }
            Ok(Err(e)) => {
                error!(error = %e, "Sweep aborted.");
                None
            }
            Err(_) => {
                warn!(
                    deadline_seconds = self.sweep_interval.as_secs(),
                    "Sweep exceeded its deadline, abandoning outstanding probes."
                );
                None
            }
        };
        self.in_progress.store(false, Ordering::Release);
        summary
    }

    async fn run_sweep(&self) -> Result<SweepSummary, SweepError> {
        let monitors = monitor_service::list_all_monitors(&self.pool).await?;
        let checked = monitors.len();
        let mut skipped = 0usize;

        let semaphore = Arc::new(Semaphore::new(self.max_concurrent_probes));
        let mut probes = JoinSet::new();

        for monitor in monitors {
            let Some(spec) = monitor.probe_spec() else {
                warn!(
                    monitor_id = monitor.id,
                    monitor_type = %monitor.monitor_type,
                    "Skipping monitor with unusable configuration."
                );
                skipped += 1;
                continue;
            };

            let pool = self.pool.clone();
            let prober = Arc::clone(&self.prober);
            let transport = Arc::clone(&self.transport);
            let semaphore = Arc::clone(&semaphore);
            probes.spawn(async move {
                let _permit = match semaphore.acquire().await {
                    Ok(permit) => permit,
                    Err(_) => return, // semaphore closed, sweep is shutting down
                };
                evaluate_monitor(&pool, prober.as_ref(), transport.as_ref(), monitor, spec).await;
            });
        }

        while probes.join_next().await.is_some() {}

        Ok(SweepSummary { checked, skipped })
    }
}

/// Strictly sequential per monitor: probe, decide, persist, notify.
/// Persisting and notifying are independent best-effort effects; a failed
/// write must not swallow the notification.
async fn evaluate_monitor<P, T>(
    pool: &SqlitePool,
    prober: &P,
    transport: &T,
    monitor: Monitor,
    spec: ProbeSpec,
) where
    P: Prober + ?Sized,
    T: ChatTransport + ?Sized,
{
    let outcome = prober.probe(&spec).await;
    let transition = state::decide(&monitor, &outcome);

    let failed = match transition.action {
        StateAction::None => return,
        StateAction::MarkFailed => true,
        StateAction::MarkRecovered => false,
    };

    if let Err(e) = monitor_service::set_last_state_failed(pool, monitor.id, failed).await {
        error!(monitor_id = monitor.id, error = %e, "Failed to persist monitor state.");
    }

    if let Some(notice) = transition.notice {
        if let Err(e) = transport.send_message(&notice.channel, &notice.text).await {
            error!(
                monitor_id = monitor.id,
                channel = %notice.channel,
                error = %e,
                "Failed to deliver notification."
            );
        }
    }
}
