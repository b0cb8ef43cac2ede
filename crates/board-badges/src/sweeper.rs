use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, warn};

use board_db::{Database, StoreResult, store};
use board_types::models::BadgeKind;

use crate::ledger::{AwardOutcome, BadgeLedger, LONGEVITY_DAYS};

/// 30 minutes between sweeps.
pub const DEFAULT_SWEEP_INTERVAL: Duration = Duration::from_secs(30 * 60);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SweepReport {
    /// A previous sweep was still running.
    Skipped,
    /// Candidates could not be listed; nothing was attempted.
    Aborted,
    Completed {
        candidates: usize,
        awarded: usize,
        failed: usize,
    },
}

/// Clock-driven re-evaluation of the age-based badge.
///
/// At most one sweep runs at a time: a tick that fires while the previous one
/// is still in flight is skipped, never queued.
#[derive(Clone)]
pub struct Sweeper {
    inner: Arc<SweeperInner>,
}

struct SweeperInner {
    db: Arc<Database>,
    ledger: BadgeLedger,
    in_flight: AtomicBool,
}

/// Held for the duration of one sweep; releases the slot on drop.
struct InFlight {
    inner: Arc<SweeperInner>,
}

impl Drop for InFlight {
    fn drop(&mut self) {
        self.inner.in_flight.store(false, Ordering::Release);
    }
}

impl Sweeper {
    pub fn new(db: Arc<Database>, ledger: BadgeLedger) -> Self {
        Self {
            inner: Arc::new(SweeperInner {
                db,
                ledger,
                in_flight: AtomicBool::new(false),
            }),
        }
    }

    /// Run forever, starting a sweep every `period`.
    pub async fn run(self, period: Duration) {
        let mut interval = tokio::time::interval(period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            interval.tick().await;

            let sweeper = self.clone();
            tokio::spawn(async move {
                sweeper.tick(Utc::now()).await;
            });
        }
    }

    /// One sweep as of `now`, or `Skipped` if another is in flight.
    pub async fn tick(&self, now: DateTime<Utc>) -> SweepReport {
        let Some(guard) = self.try_begin() else {
            debug!("Sweep: previous run still in progress, skipping tick");
            return SweepReport::Skipped;
        };

        let result = tokio::task::spawn_blocking(move || {
            let inner = &guard.inner;
            sweep_longevity(&inner.db, &inner.ledger, now)
        })
        .await;

        match result {
            Ok(Ok(report)) => report,
            Ok(Err(e)) => {
                warn!("Sweep: could not list longevity candidates: {}", e);
                SweepReport::Aborted
            }
            Err(e) => {
                error!("Sweep: task failed: {}", e);
                SweepReport::Aborted
            }
        }
    }

    fn try_begin(&self) -> Option<InFlight> {
        self.inner
            .in_flight
            .compare_exchange(false, true, Ordering::Acquire, Ordering::Relaxed)
            .ok()
            .map(|_| InFlight {
                inner: self.inner.clone(),
            })
    }
}

/// Award longevity to every group old enough and not yet holding it. A failure
/// on one group is logged and does not stop the rest.
fn sweep_longevity(db: &Database, ledger: &BadgeLedger, now: DateTime<Utc>) -> StoreResult<SweepReport> {
    let cutoff = now - TimeDelta::days(LONGEVITY_DAYS);
    let candidates = db.with_conn(|conn| store::groups_due_for_longevity(conn, cutoff))?;

    let mut awarded = 0;
    let mut failed = 0;
    for &group_id in &candidates {
        match ledger.award(db, group_id, BadgeKind::Longevity, true) {
            Ok(AwardOutcome::Awarded { .. }) => awarded += 1,
            Ok(_) => {}
            Err(e) => {
                warn!(group_id, "Sweep: longevity award failed: {}", e);
                failed += 1;
            }
        }
    }

    if awarded > 0 || failed > 0 {
        info!(
            "Sweep: {} candidates, {} awarded, {} failed",
            candidates.len(),
            awarded,
            failed
        );
    }

    Ok(SweepReport::Completed {
        candidates: candidates.len(),
        awarded,
        failed,
    })
}
