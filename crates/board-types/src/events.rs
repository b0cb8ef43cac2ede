use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::{BadgeKind, CounterField, EntityKind};

/// Which aggregate moved. Selects the badges worth re-checking.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum CounterDimension {
    PostCount,
    LikeCount,
    CommentCount,
}

impl CounterDimension {
    /// Activity dimension for a counter field. `badge_count` is derived and has none.
    pub fn of(field: CounterField) -> Option<Self> {
        match field {
            CounterField::PostCount => Some(Self::PostCount),
            CounterField::LikeCount => Some(Self::LikeCount),
            CounterField::CommentCount => Some(Self::CommentCount),
            CounterField::BadgeCount => None,
        }
    }

    /// Badges whose criteria read this dimension.
    pub fn relevant_badges(self) -> &'static [BadgeKind] {
        match self {
            Self::PostCount => &[BadgeKind::Streak, BadgeKind::Volume],
            Self::LikeCount => &[BadgeKind::GroupPopularity, BadgeKind::PostPopularity],
            Self::CommentCount => &[],
        }
    }
}

/// Emitted by the counter mutator after a delta has been applied.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CounterChanged {
    /// Group owning the counter (the group itself, or the post's group).
    pub group_id: i64,
    pub entity: EntityKind,
    pub entity_id: i64,
    pub dimension: CounterDimension,
    pub delta: i64,
    /// Value after the delta.
    pub value: i64,
}

/// Emitted by the badge ledger when a flag transitions false to true.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BadgeAwarded {
    pub group_id: i64,
    pub badge: BadgeKind,
    pub badge_count: i64,
    pub awarded_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn like_changes_check_only_popularity() {
        let badges = CounterDimension::LikeCount.relevant_badges();
        assert_eq!(badges, &[BadgeKind::GroupPopularity, BadgeKind::PostPopularity]);
        assert!(CounterDimension::CommentCount.relevant_badges().is_empty());
    }

    #[test]
    fn badge_count_has_no_dimension() {
        assert_eq!(CounterDimension::of(CounterField::BadgeCount), None);
        assert_eq!(
            CounterDimension::of(CounterField::PostCount),
            Some(CounterDimension::PostCount)
        );
    }
}
