use chrono::{DateTime, TimeDelta, Utc};
use rusqlite::{Connection, Transaction};
use tracing::{debug, info};

use board_db::models::GroupRow;
use board_db::store::{self, CounterTarget};
use board_db::{Database, StoreError, StoreResult};
use board_types::events::{BadgeAwarded, CounterChanged};
use board_types::models::{BadgeKind, CounterField, EntityKind};

use crate::streak::StreakEvaluator;

pub const VOLUME_THRESHOLD: i64 = 20;
pub const POPULARITY_THRESHOLD: i64 = 10_000;
pub const LONGEVITY_DAYS: i64 = 365;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AwardOutcome {
    /// This call moved the flag to true; `badge_count` is the group's new total.
    Awarded { badge_count: i64 },
    /// The flag was already true, possibly set by a concurrent caller.
    AlreadyAwarded,
    NotEligible,
}

/// Sole writer of badge flags and of `groups.badge_count`.
#[derive(Debug, Clone, Copy, Default)]
pub struct BadgeLedger {
    streak: StreakEvaluator,
}

impl BadgeLedger {
    pub fn new(streak: StreakEvaluator) -> Self {
        Self { streak }
    }

    pub fn streak(&self) -> &StreakEvaluator {
        &self.streak
    }

    /// Award `badge` if `eligible` and not yet held.
    ///
    /// The flag is flipped with a compare-and-set and the group's
    /// `badge_count` is bumped inside the same transaction, so no reader sees
    /// one without the other. Losing the compare-and-set is not an error.
    pub fn award_if_eligible(
        &self,
        tx: &Transaction<'_>,
        group_id: i64,
        badge: BadgeKind,
        eligible: bool,
    ) -> StoreResult<AwardOutcome> {
        if !eligible {
            return Ok(AwardOutcome::NotEligible);
        }

        if !store::conditional_set(tx, group_id, badge, false, true)? {
            debug!(group_id, %badge, "badge already held");
            return Ok(AwardOutcome::AlreadyAwarded);
        }

        let badge_count = store::adjust_field(
            tx,
            CounterTarget::new(EntityKind::Group, group_id, CounterField::BadgeCount),
            1,
        )?;
        info!(group_id, %badge, badge_count, "badge awarded");
        Ok(AwardOutcome::Awarded { badge_count })
    }

    /// `award_if_eligible` in a transaction of its own.
    pub fn award(
        &self,
        db: &Database,
        group_id: i64,
        badge: BadgeKind,
        eligible: bool,
    ) -> StoreResult<AwardOutcome> {
        db.with_tx(|tx| self.award_if_eligible(tx, group_id, badge, eligible))
    }

    /// Re-check the badges that read the dimension in `change`.
    ///
    /// Decrements never revoke anything and are ignored. Badges the group
    /// already holds are skipped before their criterion is computed.
    pub fn on_counter_changed(
        &self,
        tx: &Transaction<'_>,
        change: &CounterChanged,
        now: DateTime<Utc>,
    ) -> StoreResult<Vec<BadgeAwarded>> {
        let relevant = change.dimension.relevant_badges();
        if change.delta <= 0 || relevant.is_empty() {
            return Ok(Vec::new());
        }

        let held = store::get_badges(tx, change.group_id)?
            .ok_or_else(|| StoreError::not_found(EntityKind::Badge, change.group_id))?;

        let mut awarded = Vec::new();
        for &badge in relevant {
            if held.has(badge) {
                continue;
            }
            let eligible = self.criterion_met(tx, change.group_id, badge, now)?;
            if let AwardOutcome::Awarded { badge_count } =
                self.award_if_eligible(tx, change.group_id, badge, eligible)?
            {
                awarded.push(BadgeAwarded {
                    group_id: change.group_id,
                    badge,
                    badge_count,
                    awarded_at: now,
                });
            }
        }
        Ok(awarded)
    }

    /// Evaluate one badge's criterion against current store state.
    pub fn criterion_met(
        &self,
        conn: &Connection,
        group_id: i64,
        badge: BadgeKind,
        now: DateTime<Utc>,
    ) -> StoreResult<bool> {
        match badge {
            BadgeKind::Streak => self.streak.has_seven_day_posting_streak(conn, group_id, now),
            BadgeKind::PostPopularity => {
                store::group_has_popular_post(conn, group_id, POPULARITY_THRESHOLD)
            }
            BadgeKind::Volume => Ok(load_group(conn, group_id)?.post_count >= VOLUME_THRESHOLD),
            BadgeKind::Longevity => {
                let age = now - load_group(conn, group_id)?.created_at;
                Ok(age >= TimeDelta::days(LONGEVITY_DAYS))
            }
            BadgeKind::GroupPopularity => {
                Ok(load_group(conn, group_id)?.like_count >= POPULARITY_THRESHOLD)
            }
        }
    }
}

fn load_group(conn: &Connection, group_id: i64) -> StoreResult<GroupRow> {
    store::get_group(conn, group_id)?.ok_or_else(|| StoreError::not_found(EntityKind::Group, group_id))
}

#[cfg(test)]
mod tests {
    use super::*;
    use board_db::models::NewGroup;
    use board_db::queries;
    use board_types::events::CounterDimension;
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 6, 1, 12, 0, 0).unwrap()
    }

    fn seed_group(db: &Database, created_at: DateTime<Utc>) -> i64 {
        db.with_tx(|tx| {
            queries::insert_group(
                tx,
                &NewGroup {
                    name: "g".into(),
                    password_hash: "h".into(),
                    image_url: None,
                    is_public: true,
                    introduction: None,
                },
                created_at,
            )
        })
        .unwrap()
    }

    fn set_group_column(db: &Database, id: i64, column: &str, value: i64) {
        db.with_conn(|c| {
            Ok(c.execute(&format!("UPDATE groups SET {column} = ?1 WHERE id = ?2"), [value, id])?)
        })
        .unwrap();
    }

    #[test]
    fn award_is_idempotent() {
        let db = Database::open_in_memory().unwrap();
        let ledger = BadgeLedger::default();
        let g = seed_group(&db, now());

        let first = ledger.award(&db, g, BadgeKind::Volume, true).unwrap();
        let second = ledger.award(&db, g, BadgeKind::Volume, true).unwrap();

        assert_eq!(first, AwardOutcome::Awarded { badge_count: 1 });
        assert_eq!(second, AwardOutcome::AlreadyAwarded);
        assert_eq!(db.get_group(g).unwrap().unwrap().badge_count, 1);
    }

    #[test]
    fn ineligible_award_writes_nothing() {
        let db = Database::open_in_memory().unwrap();
        let ledger = BadgeLedger::default();
        let g = seed_group(&db, now());

        let outcome = ledger.award(&db, g, BadgeKind::Longevity, false).unwrap();
        assert_eq!(outcome, AwardOutcome::NotEligible);
        assert!(!db.get_badges(g).unwrap().unwrap().longevity);
    }

    #[test]
    fn criteria_follow_thresholds() {
        let db = Database::open_in_memory().unwrap();
        let ledger = BadgeLedger::default();
        let young = seed_group(&db, now() - TimeDelta::days(364));
        let old = seed_group(&db, now() - TimeDelta::days(365));

        let met = |g, b| db.with_conn(|c| ledger.criterion_met(c, g, b, now())).unwrap();

        assert!(!met(young, BadgeKind::Longevity));
        assert!(met(old, BadgeKind::Longevity));

        set_group_column(&db, young, "post_count", 19);
        assert!(!met(young, BadgeKind::Volume));
        set_group_column(&db, young, "post_count", 20);
        assert!(met(young, BadgeKind::Volume));

        set_group_column(&db, old, "like_count", 9_999);
        assert!(!met(old, BadgeKind::GroupPopularity));
        set_group_column(&db, old, "like_count", 10_000);
        assert!(met(old, BadgeKind::GroupPopularity));
    }

    #[test]
    fn decrements_evaluate_nothing() {
        let db = Database::open_in_memory().unwrap();
        let ledger = BadgeLedger::default();
        let g = seed_group(&db, now());
        set_group_column(&db, g, "post_count", 25);

        let change = CounterChanged {
            group_id: g,
            entity: EntityKind::Group,
            entity_id: g,
            dimension: CounterDimension::PostCount,
            delta: -1,
            value: 24,
        };
        let awarded = db.with_tx(|tx| ledger.on_counter_changed(tx, &change, now())).unwrap();
        assert!(awarded.is_empty());
        assert_eq!(db.get_group(g).unwrap().unwrap().badge_count, 0);
    }

    #[test]
    fn post_count_change_checks_only_post_badges() {
        let db = Database::open_in_memory().unwrap();
        let ledger = BadgeLedger::default();
        let g = seed_group(&db, now() - TimeDelta::days(500));
        set_group_column(&db, g, "post_count", 20);
        set_group_column(&db, g, "like_count", 50_000);

        let change = CounterChanged {
            group_id: g,
            entity: EntityKind::Group,
            entity_id: g,
            dimension: CounterDimension::PostCount,
            delta: 1,
            value: 20,
        };
        let awarded = db.with_tx(|tx| ledger.on_counter_changed(tx, &change, now())).unwrap();

        let kinds: Vec<_> = awarded.iter().map(|a| a.badge).collect();
        assert_eq!(kinds, vec![BadgeKind::Volume]);
        let badges = db.get_badges(g).unwrap().unwrap();
        assert!(!badges.group_popularity);
        assert!(!badges.longevity);
    }
}
