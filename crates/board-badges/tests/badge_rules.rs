//! Integration tests for the achievement engine against a real SQLite store.
//!
//! Scenarios that award badges finish by checking that `badge_count` agrees
//! with the flags on the group's badge record.

use std::sync::Arc;
use std::thread;

use chrono::{DateTime, TimeDelta, TimeZone, Utc};

use board_badges::sweeper::SweepReport;
use board_badges::{Activity, AwardOutcome, BadgeLedger, Delta, Sweeper, adjust_count};
use board_db::Database;
use board_db::models::{NewComment, NewGroup, NewPost};
use board_db::store::CounterTarget;
use board_types::models::{BadgeKind, CounterField, EntityKind};

fn as_of() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 6, 10, 18, 0, 0).unwrap()
}

/// Noon on the day `days_back` calendar days before `as_of`.
fn noon(days_back: i64) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 6, 10, 12, 0, 0).unwrap() - TimeDelta::days(days_back)
}

fn setup() -> Activity {
    let db = Arc::new(Database::open_in_memory().unwrap());
    Activity::new(db, BadgeLedger::default())
}

fn new_group(name: &str) -> NewGroup {
    NewGroup {
        name: name.into(),
        password_hash: "hash".into(),
        image_url: None,
        is_public: true,
        introduction: None,
    }
}

fn new_post(group_id: i64) -> NewPost {
    NewPost {
        group_id,
        nickname: "writer".into(),
        title: "a day out".into(),
        content: "we went hiking".into(),
        password_hash: "hash".into(),
        image_url: None,
        tags: vec!["hiking".into()],
        location: None,
        moment: None,
        is_public: true,
    }
}

fn new_comment(post_id: i64) -> NewComment {
    NewComment {
        post_id,
        nickname: "reader".into(),
        content: "nice".into(),
        password_hash: "hash".into(),
    }
}

fn assert_badge_invariant(activity: &Activity, group_id: i64) {
    let (group, badges) = activity.db().get_group_with_badges(group_id).unwrap().unwrap();
    assert_eq!(group.badge_count, badges.count(), "badge_count out of sync with flags");
}

fn set_column(activity: &Activity, table: &str, column: &str, id: i64, value: i64) {
    activity
        .db()
        .with_conn(|c| {
            Ok(c.execute(&format!("UPDATE {table} SET {column} = ?1 WHERE id = ?2"), [value, id])?)
        })
        .unwrap();
}

// -- Streak --

#[test]
fn seven_consecutive_days_is_a_streak() {
    let activity = setup();
    let g = activity.create_group(&new_group("daily"), noon(10)).unwrap().id;
    for day in (0..7).rev() {
        activity.create_post(&new_post(g), noon(day)).unwrap();
    }

    let streak = activity.ledger().streak();
    let has = activity
        .db()
        .with_conn(|c| streak.has_seven_day_posting_streak(c, g, as_of()))
        .unwrap();
    assert!(has);
}

#[test]
fn a_missing_day_breaks_the_streak() {
    let activity = setup();
    let g = activity.create_group(&new_group("gappy"), noon(10)).unwrap().id;
    for day in (0..7).rev().filter(|d| *d != 3) {
        activity.create_post(&new_post(g), noon(day)).unwrap();
    }

    let streak = activity.ledger().streak();
    let has = activity
        .db()
        .with_conn(|c| streak.has_seven_day_posting_streak(c, g, as_of()))
        .unwrap();
    assert!(!has);
    assert!(!activity.db().get_badges(g).unwrap().unwrap().streak);
}

#[test]
fn young_group_has_no_streak_yet() {
    let activity = setup();
    let created = as_of() - TimeDelta::days(3);
    let g = activity.create_group(&new_group("new"), created).unwrap().id;
    for day in (0..=3).rev() {
        activity.create_post(&new_post(g), noon(day).max(created)).unwrap();
    }

    let streak = activity.ledger().streak();
    let has = activity
        .db()
        .with_conn(|c| streak.has_seven_day_posting_streak(c, g, as_of()))
        .unwrap();
    assert!(!has);
}

/// Posts late on each of six evenings and just after the following midnight:
/// seven calendar days covered, the last post at 00:30 on the 10th.
fn post_across_seven_calendar_days(activity: &Activity, g: i64) -> Vec<BadgeKind> {
    for day in 4..=9 {
        let at = Utc.with_ymd_and_hms(2026, 6, day, 23, 30, 0).unwrap();
        activity.create_post(&new_post(g), at).unwrap();
    }
    let last = Utc.with_ymd_and_hms(2026, 6, 10, 0, 30, 0).unwrap();
    let created = activity.create_post(&new_post(g), last).unwrap();
    created.awarded.iter().map(|a| a.badge).collect()
}

#[test]
fn seven_calendar_days_inside_a_young_group_are_not_a_streak() {
    let activity = setup();
    // Five days and a couple of hours old at the last post
    let created = Utc.with_ymd_and_hms(2026, 6, 4, 23, 0, 0).unwrap();
    let g = activity.create_group(&new_group("eager"), created).unwrap().id;

    let awarded = post_across_seven_calendar_days(&activity, g);
    assert!(awarded.is_empty());

    let last = Utc.with_ymd_and_hms(2026, 6, 10, 0, 30, 0).unwrap();
    let streak = activity.ledger().streak();
    let has = activity
        .db()
        .with_conn(|c| streak.has_seven_day_posting_streak(c, g, last))
        .unwrap();
    assert!(!has);
    assert!(!activity.db().get_badges(g).unwrap().unwrap().streak);
    assert_badge_invariant(&activity, g);
}

#[test]
fn seven_day_old_group_can_earn_the_streak() {
    let activity = setup();
    let created = Utc.with_ymd_and_hms(2026, 6, 3, 0, 30, 0).unwrap();
    let g = activity.create_group(&new_group("steady"), created).unwrap().id;

    let awarded = post_across_seven_calendar_days(&activity, g);
    assert_eq!(awarded, vec![BadgeKind::Streak]);
    assert_badge_invariant(&activity, g);
}

#[test]
fn streak_badge_lands_on_the_seventh_day() {
    let activity = setup();
    let g = activity.create_group(&new_group("daily"), noon(10)).unwrap().id;

    for day in (1..7).rev() {
        let created = activity.create_post(&new_post(g), noon(day)).unwrap();
        assert!(created.awarded.is_empty());
    }
    let last = activity.create_post(&new_post(g), noon(0)).unwrap();

    let kinds: Vec<_> = last.awarded.iter().map(|a| a.badge).collect();
    assert_eq!(kinds, vec![BadgeKind::Streak]);
    assert_badge_invariant(&activity, g);
}

// -- Volume --

#[test]
fn twentieth_post_awards_volume() {
    let activity = setup();
    let g = activity.create_group(&new_group("busy"), noon(60)).unwrap().id;

    // One post every other day keeps the streak out of the picture
    for i in 0..19 {
        let created = activity.create_post(&new_post(g), noon(40 - 2 * i)).unwrap();
        assert!(created.awarded.is_empty());
    }
    let twentieth = activity.create_post(&new_post(g), noon(0)).unwrap();
    assert_eq!(twentieth.awarded.len(), 1);
    assert_eq!(twentieth.awarded[0].badge, BadgeKind::Volume);
    assert_eq!(twentieth.awarded[0].badge_count, 1);

    // Dropping below the threshold never revokes
    let post = twentieth.post.id;
    activity.delete_post(post, as_of()).unwrap();
    let (group, badges) = activity.db().get_group_with_badges(g).unwrap().unwrap();
    assert_eq!(group.post_count, 19);
    assert!(badges.volume);
    assert_badge_invariant(&activity, g);
}

// -- Popularity --

#[test]
fn post_popularity_lands_exactly_at_ten_thousand() {
    let activity = setup();
    let g = activity.create_group(&new_group("famous"), noon(5)).unwrap().id;
    let p = activity.create_post(&new_post(g), noon(1)).unwrap().post.id;
    set_column(&activity, "posts", "like_count", p, 9_998);

    let at_9999 = activity.like_post(p, as_of()).unwrap();
    assert_eq!(at_9999.like_count, 9_999);
    assert!(at_9999.awarded.is_empty());
    assert_eq!(activity.db().get_group(g).unwrap().unwrap().badge_count, 0);

    let at_10000 = activity.like_post(p, as_of()).unwrap();
    assert_eq!(at_10000.like_count, 10_000);
    assert_eq!(at_10000.awarded.len(), 1);
    assert_eq!(at_10000.awarded[0].badge, BadgeKind::PostPopularity);

    let again = activity.like_post(p, as_of()).unwrap();
    assert!(again.awarded.is_empty());
    assert_eq!(activity.db().get_group(g).unwrap().unwrap().badge_count, 1);
    assert_badge_invariant(&activity, g);
}

#[test]
fn concurrent_likes_crossing_threshold_award_once() {
    let activity = setup();
    let g = activity.create_group(&new_group("crowd"), noon(5)).unwrap().id;
    set_column(&activity, "groups", "like_count", g, 9_990);

    thread::scope(|s| {
        for _ in 0..20 {
            s.spawn(|| activity.like_group(g, as_of()).unwrap());
        }
    });

    let (group, badges) = activity.db().get_group_with_badges(g).unwrap().unwrap();
    assert_eq!(group.like_count, 10_010);
    assert!(badges.group_popularity);
    assert_eq!(group.badge_count, 1);
}

// -- Ledger --

#[test]
fn concurrent_awards_transition_once() {
    let activity = setup();
    let g = activity.create_group(&new_group("race"), noon(5)).unwrap().id;

    let outcomes: Vec<AwardOutcome> = thread::scope(|s| {
        let handles: Vec<_> = (0..16)
            .map(|_| {
                s.spawn(|| {
                    activity
                        .ledger()
                        .award(activity.db(), g, BadgeKind::PostPopularity, true)
                        .unwrap()
                })
            })
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });

    let winners = outcomes
        .iter()
        .filter(|o| matches!(o, AwardOutcome::Awarded { .. }))
        .count();
    assert_eq!(winners, 1);
    assert!(outcomes
        .iter()
        .all(|o| matches!(o, AwardOutcome::Awarded { .. } | AwardOutcome::AlreadyAwarded)));
    assert_eq!(activity.db().get_group(g).unwrap().unwrap().badge_count, 1);
    assert_badge_invariant(&activity, g);
}

#[test]
fn failed_badge_check_rolls_back_the_like() {
    let activity = setup();
    let g = activity.create_group(&new_group("broken"), noon(5)).unwrap().id;
    set_column(&activity, "groups", "like_count", g, 9_999);
    activity
        .db()
        .with_conn(|c| Ok(c.execute("DELETE FROM badges WHERE group_id = ?1", [g])?))
        .unwrap();

    let err = activity.like_group(g, as_of()).unwrap_err();
    assert!(err.is_not_found());
    assert_eq!(activity.db().get_group(g).unwrap().unwrap().like_count, 9_999);
}

// -- Counters --

#[test]
fn likes_on_missing_rows_are_not_found() {
    let activity = setup();
    assert!(activity.like_group(404, as_of()).unwrap_err().is_not_found());
    assert!(activity.like_post(404, as_of()).unwrap_err().is_not_found());
    assert!(activity.create_post(&new_post(404), as_of()).unwrap_err().is_not_found());
    assert!(activity.create_comment(&new_comment(404), as_of()).unwrap_err().is_not_found());
}

#[test]
fn concurrent_increments_and_decrements_conserve() {
    let activity = setup();
    let g = activity.create_group(&new_group("counter"), noon(5)).unwrap().id;
    let target = CounterTarget::new(EntityKind::Group, g, CounterField::LikeCount);
    set_column(&activity, "groups", "like_count", g, 7);

    for delta in [Delta::Increment, Delta::Decrement] {
        thread::scope(|s| {
            for _ in 0..32 {
                s.spawn(|| {
                    activity
                        .db()
                        .with_tx(|tx| adjust_count(tx, target, delta))
                        .unwrap()
                });
            }
        });
    }

    assert_eq!(activity.db().get_group(g).unwrap().unwrap().like_count, 7);
}

#[test]
fn comment_count_tracks_live_comments() {
    let activity = setup();
    let g = activity.create_group(&new_group("chatty"), noon(5)).unwrap().id;
    let p = activity.create_post(&new_post(g), noon(1)).unwrap().post.id;

    let ids: Vec<i64> = thread::scope(|s| {
        let handles: Vec<_> = (0..12)
            .map(|_| s.spawn(|| activity.create_comment(&new_comment(p), as_of()).unwrap().id))
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });
    assert_eq!(activity.db().get_post(p).unwrap().unwrap().comment_count, 12);

    thread::scope(|s| {
        for &id in &ids[..5] {
            let activity = &activity;
            s.spawn(move || activity.delete_comment(id, as_of()).unwrap());
        }
    });

    let post = activity.db().get_post(p).unwrap().unwrap();
    let (_, live) = activity
        .db()
        .list_comments(p, board_db::models::PageRequest { page: 1, page_size: 100 })
        .unwrap();
    assert_eq!(post.comment_count, 7);
    assert_eq!(live, 7);
}

// -- Sweeper --

#[tokio::test]
async fn sweep_awards_longevity_once() {
    let activity = setup();
    let now = as_of();
    let old = activity.create_group(&new_group("veteran"), now - TimeDelta::days(400)).unwrap().id;
    let young = activity.create_group(&new_group("rookie"), now - TimeDelta::days(30)).unwrap().id;

    let sweeper = Sweeper::new(activity.db().clone(), *activity.ledger());

    let first = sweeper.tick(now).await;
    assert_eq!(
        first,
        SweepReport::Completed { candidates: 1, awarded: 1, failed: 0 }
    );
    let (group, badges) = activity.db().get_group_with_badges(old).unwrap().unwrap();
    assert!(badges.longevity);
    assert_eq!(group.badge_count, 1);

    let second = sweeper.tick(now).await;
    assert_eq!(
        second,
        SweepReport::Completed { candidates: 0, awarded: 0, failed: 0 }
    );
    assert_eq!(activity.db().get_group(old).unwrap().unwrap().badge_count, 1);
    assert_eq!(activity.db().get_group(young).unwrap().unwrap().badge_count, 0);
}

#[tokio::test]
async fn sweep_isolates_per_group_failures() {
    let activity = setup();
    let now = as_of();
    let broken = activity.create_group(&new_group("no badges"), now - TimeDelta::days(500)).unwrap().id;
    let healthy = activity.create_group(&new_group("fine"), now - TimeDelta::days(450)).unwrap().id;
    activity
        .db()
        .with_conn(|c| Ok(c.execute("DELETE FROM badges WHERE group_id = ?1", [broken])?))
        .unwrap();

    let sweeper = Sweeper::new(activity.db().clone(), *activity.ledger());
    let report = sweeper.tick(now).await;

    assert_eq!(
        report,
        SweepReport::Completed { candidates: 2, awarded: 1, failed: 1 }
    );
    assert!(activity.db().get_badges(healthy).unwrap().unwrap().longevity);
    assert_eq!(activity.db().get_group(broken).unwrap().unwrap().badge_count, 0);
    assert_badge_invariant(&activity, healthy);
}
