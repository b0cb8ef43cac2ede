use std::fmt;

use serde::{Deserialize, Serialize};

/// Record kinds addressed by the entity store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum EntityKind {
    Group,
    Post,
    Comment,
    Badge,
}

impl EntityKind {
    pub fn table(self) -> &'static str {
        match self {
            Self::Group => "groups",
            Self::Post => "posts",
            Self::Comment => "comments",
            Self::Badge => "badges",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Group => "group",
            Self::Post => "post",
            Self::Comment => "comment",
            Self::Badge => "badge record",
        };
        f.write_str(name)
    }
}

/// Aggregate counter columns. Only these may be moved by relative deltas.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum CounterField {
    LikeCount,
    PostCount,
    CommentCount,
    BadgeCount,
}

impl CounterField {
    pub fn column(self) -> &'static str {
        match self {
            Self::LikeCount => "like_count",
            Self::PostCount => "post_count",
            Self::CommentCount => "comment_count",
            Self::BadgeCount => "badge_count",
        }
    }

    /// Whether `kind` carries this counter at all.
    pub fn applies_to(self, kind: EntityKind) -> bool {
        matches!(
            (kind, self),
            (EntityKind::Group, Self::LikeCount | Self::PostCount | Self::BadgeCount)
                | (EntityKind::Post, Self::LikeCount | Self::CommentCount)
        )
    }
}

impl fmt::Display for CounterField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.column())
    }
}

/// The five milestone badges. Each is backed by one boolean column on the
/// group's badge record and only ever moves from false to true.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum BadgeKind {
    /// A post on each of the trailing seven calendar days.
    Streak,
    /// 20 or more posts.
    Volume,
    /// Group is at least a year old.
    Longevity,
    /// 10,000 likes on the group itself.
    GroupPopularity,
    /// Some post in the group reached 10,000 likes.
    PostPopularity,
}

impl BadgeKind {
    pub const ALL: [BadgeKind; 5] = [
        Self::Streak,
        Self::Volume,
        Self::Longevity,
        Self::GroupPopularity,
        Self::PostPopularity,
    ];

    pub fn column(self) -> &'static str {
        match self {
            Self::Streak => "streak",
            Self::Volume => "volume",
            Self::Longevity => "longevity",
            Self::GroupPopularity => "group_popularity",
            Self::PostPopularity => "post_popularity",
        }
    }
}

impl fmt::Display for BadgeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.column())
    }
}

/// Snapshot of one group's badge record.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BadgeSet {
    pub streak: bool,
    pub volume: bool,
    pub longevity: bool,
    pub group_popularity: bool,
    pub post_popularity: bool,
}

impl BadgeSet {
    pub fn has(&self, badge: BadgeKind) -> bool {
        match badge {
            BadgeKind::Streak => self.streak,
            BadgeKind::Volume => self.volume,
            BadgeKind::Longevity => self.longevity,
            BadgeKind::GroupPopularity => self.group_popularity,
            BadgeKind::PostPopularity => self.post_popularity,
        }
    }

    pub fn awarded(&self) -> Vec<BadgeKind> {
        BadgeKind::ALL.into_iter().filter(|b| self.has(*b)).collect()
    }

    pub fn count(&self) -> i64 {
        BadgeKind::ALL.into_iter().filter(|b| self.has(*b)).count() as i64
    }
}

/// Group listing order.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum GroupSort {
    #[default]
    Latest,
    MostPosted,
    MostLiked,
    MostBadge,
}

/// Post listing order within a group.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PostSort {
    #[default]
    Latest,
    MostCommented,
    MostLiked,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn badge_set_counts_true_flags() {
        let set = BadgeSet {
            volume: true,
            post_popularity: true,
            ..BadgeSet::default()
        };
        assert_eq!(set.count(), 2);
        assert_eq!(set.awarded(), vec![BadgeKind::Volume, BadgeKind::PostPopularity]);
    }

    #[test]
    fn badge_keys_serialize_camel_case() {
        let json = serde_json::to_string(&BadgeKind::GroupPopularity).unwrap();
        assert_eq!(json, "\"groupPopularity\"");
    }

    #[test]
    fn counters_only_apply_to_their_tables() {
        assert!(CounterField::PostCount.applies_to(EntityKind::Group));
        assert!(CounterField::CommentCount.applies_to(EntityKind::Post));
        assert!(!CounterField::CommentCount.applies_to(EntityKind::Group));
        assert!(!CounterField::BadgeCount.applies_to(EntityKind::Post));
        assert!(!CounterField::LikeCount.applies_to(EntityKind::Comment));
    }
}
