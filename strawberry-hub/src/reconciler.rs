//! Reconciliation loop
//!
//! Background task that periodically re-derives every tracked group's
//! readiness from the backends and writes it back to the registry. Each tick
//! also sweeps expired credentials.
//!
//! A backend failure for one group skips that group and leaves its stored
//! status untouched. A store failure ends the tick early. Neither stops the
//! loop; only cancellation does.

use sqlx::SqlitePool;
use std::sync::Arc;
use std::time::Duration;
use strawberry_common::api::GroupStatus;
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::db::{credentials, groups};
use crate::error::Result;
use crate::fanout::FanoutClient;

/// Counters for one completed tick
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickSummary {
    /// Groups examined
    pub groups: usize,
    /// Groups whose stored status changed
    pub transitions: usize,
    /// Groups left unchanged because a backend failed
    pub skipped: usize,
    /// Expired credentials removed
    pub swept: u64,
}

pub struct Reconciler {
    db: SqlitePool,
    fanout: Arc<FanoutClient>,
    period: Duration,
}

impl Reconciler {
    pub fn new(db: SqlitePool, fanout: Arc<FanoutClient>, period: Duration) -> Self {
        Self { db, fanout, period }
    }

    /// Run one reconciliation pass
    ///
    /// Only store errors are returned; backend errors are counted as skips.
    pub async fn tick(&self) -> Result<TickSummary> {
        let mut summary = TickSummary {
            swept: credentials::sweep_expired(&self.db, credentials::token_retention()).await?,
            ..TickSummary::default()
        };

        let tracked = groups::list_all(&self.db).await?;
        summary.groups = tracked.len();

        for group in tracked {
            let ready = match self.fanout.check_status(group.group_id).await {
                Ok(ready) => ready,
                Err(e) => {
                    warn!("Skipping group {}: {}", group.group_id, e);
                    summary.skipped += 1;
                    continue;
                }
            };

            let status = GroupStatus::from_readiness(ready);
            if status == group.group_status {
                continue;
            }

            if groups::update_status(&self.db, group.group_id, status).await? {
                debug!(
                    "Group {}: {} -> {}",
                    group.group_id, group.group_status, status
                );
                summary.transitions += 1;
            }
        }

        Ok(summary)
    }

    /// Run ticks on a fixed period until `cancel` fires
    ///
    /// The first tick runs immediately. A tick that overruns the period
    /// delays the next one rather than stacking up missed ticks. Cancelling
    /// during a tick abandons it; statements already executed stay applied.
    pub fn spawn(self, cancel: CancellationToken) -> JoinHandle<()> {
        info!("Reconciler started (period {:?})", self.period);

        tokio::spawn(async move {
            let mut timer = interval(self.period);
            timer.set_missed_tick_behavior(MissedTickBehavior::Skip);

            loop {
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    _ = timer.tick() => {}
                }

                tokio::select! {
                    _ = cancel.cancelled() => {
                        info!("Reconciliation tick abandoned");
                        break;
                    }
                    _ = self.run_tick() => {}
                }
            }

            info!("Reconciler stopped");
        })
    }

    async fn run_tick(&self) {
        match self.tick().await {
            Ok(summary) => info!(
                "Reconciliation tick: {} groups, {} transitions, {} skipped, {} credentials swept",
                summary.groups, summary.transitions, summary.skipped, summary.swept
            ),
            Err(e) => error!("Reconciliation tick aborted: {}", e),
        }
    }
}
