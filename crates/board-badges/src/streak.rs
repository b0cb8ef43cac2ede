use chrono::{DateTime, FixedOffset, NaiveTime, Offset, TimeDelta, Utc};
use rusqlite::Connection;

use board_db::store::{self, TimeWindow};
use board_db::{StoreError, StoreResult};
use board_types::models::EntityKind;

pub const STREAK_DAYS: usize = 7;

/// Decides whether a group posted on each of the trailing seven calendar days.
///
/// Calendar days are cut at midnight in `offset`, so a board serving one
/// timezone sees days the way its users do.
#[derive(Debug, Clone, Copy)]
pub struct StreakEvaluator {
    offset: FixedOffset,
}

impl Default for StreakEvaluator {
    fn default() -> Self {
        Self::utc()
    }
}

impl StreakEvaluator {
    pub fn new(offset: FixedOffset) -> Self {
        Self { offset }
    }

    pub fn utc() -> Self {
        Self { offset: Utc.fix() }
    }

    /// Day windows ending at the day containing `as_of`; index 0 is that day,
    /// index 6 the oldest.
    pub fn day_windows(&self, as_of: DateTime<Utc>) -> [TimeWindow; STREAK_DAYS] {
        let today = as_of.with_timezone(&self.offset).date_naive();
        let shift = TimeDelta::seconds(i64::from(self.offset.local_minus_utc()));

        std::array::from_fn(|i| {
            let day = today - TimeDelta::days(i as i64);
            let start = (day.and_time(NaiveTime::MIN) - shift).and_utc();
            TimeWindow {
                start,
                end: start + TimeDelta::days(1),
            }
        })
    }

    /// True only if every one of the seven days holds at least one post.
    /// A group younger than seven full days cannot have a streak and yields
    /// `false` without scanning.
    pub fn has_seven_day_posting_streak(
        &self,
        conn: &Connection,
        group_id: i64,
        as_of: DateTime<Utc>,
    ) -> StoreResult<bool> {
        let group = store::get_group(conn, group_id)?
            .ok_or_else(|| StoreError::not_found(EntityKind::Group, group_id))?;

        if as_of - group.created_at < TimeDelta::days(STREAK_DAYS as i64) {
            return Ok(false);
        }

        for window in self.day_windows(as_of) {
            if store::count_posts_in_range(conn, group_id, window)? == 0 {
                return Ok(false);
            }
        }
        Ok(true)
    }
}
