use std::sync::Arc;

use chrono::{DateTime, Utc};
use rusqlite::Transaction;
use tracing::debug;

use board_db::models::{CommentRow, GroupRow, NewComment, NewGroup, NewPost, PostRow};
use board_db::store::{self, CounterTarget};
use board_db::{Database, StoreError, StoreResult, queries};
use board_types::events::{BadgeAwarded, CounterChanged};
use board_types::models::{CounterField, EntityKind};

use crate::counter::{Delta, adjust_count};
use crate::ledger::BadgeLedger;

#[derive(Debug, Clone)]
pub struct PostCreated {
    pub post: PostRow,
    pub awarded: Vec<BadgeAwarded>,
}

#[derive(Debug, Clone)]
pub struct LikeRecorded {
    pub like_count: i64,
    pub awarded: Vec<BadgeAwarded>,
}

/// Entry point for every counter-affecting event on the board.
///
/// Each method is one store transaction: the row change, the counter delta
/// and any badge it earns commit together or not at all. All methods block on
/// the store and belong on a blocking thread when called from async code.
#[derive(Clone)]
pub struct Activity {
    db: Arc<Database>,
    ledger: BadgeLedger,
}

impl Activity {
    pub fn new(db: Arc<Database>, ledger: BadgeLedger) -> Self {
        Self { db, ledger }
    }

    pub fn db(&self) -> &Arc<Database> {
        &self.db
    }

    pub fn ledger(&self) -> &BadgeLedger {
        &self.ledger
    }

    // -- Groups --

    /// Create a group and its badge record together.
    pub fn create_group(&self, new: &NewGroup, now: DateTime<Utc>) -> StoreResult<GroupRow> {
        self.db.with_tx(|tx| {
            let id = queries::insert_group(tx, new, now)?;
            store::get_group(tx, id)?.ok_or_else(|| StoreError::not_found(EntityKind::Group, id))
        })
    }

    /// Delete a group with its badge record, posts and comments.
    pub fn delete_group(&self, id: i64) -> StoreResult<()> {
        self.db.with_conn(|conn| queries::delete_group(conn, id))
    }

    // -- Posts --

    pub fn create_post(&self, new: &NewPost, now: DateTime<Utc>) -> StoreResult<PostCreated> {
        self.db.with_tx(|tx| {
            let change = adjust_count(
                tx,
                CounterTarget::new(EntityKind::Group, new.group_id, CounterField::PostCount),
                Delta::Increment,
            )?;
            let id = queries::insert_post(tx, new, now)?;
            let awarded = self.settle(tx, &change, now)?;

            let post = store::get_post(tx, id)?
                .ok_or_else(|| StoreError::not_found(EntityKind::Post, id))?;
            Ok(PostCreated { post, awarded })
        })
    }

    pub fn delete_post(&self, id: i64, now: DateTime<Utc>) -> StoreResult<()> {
        self.db.with_tx(|tx| {
            let post = store::get_post(tx, id)?
                .ok_or_else(|| StoreError::not_found(EntityKind::Post, id))?;
            queries::delete_post(tx, id)?;
            let change = adjust_count(
                tx,
                CounterTarget::new(EntityKind::Group, post.group_id, CounterField::PostCount),
                Delta::Decrement,
            )?;
            self.settle(tx, &change, now)?;
            Ok(())
        })
    }

    // -- Comments --

    pub fn create_comment(&self, new: &NewComment, now: DateTime<Utc>) -> StoreResult<CommentRow> {
        self.db.with_tx(|tx| {
            let change = adjust_count(
                tx,
                CounterTarget::new(EntityKind::Post, new.post_id, CounterField::CommentCount),
                Delta::Increment,
            )?;
            let id = queries::insert_comment(tx, new, now)?;
            self.settle(tx, &change, now)?;

            store::get_comment(tx, id)?.ok_or_else(|| StoreError::not_found(EntityKind::Comment, id))
        })
    }

    pub fn delete_comment(&self, id: i64, now: DateTime<Utc>) -> StoreResult<()> {
        self.db.with_tx(|tx| {
            let comment = store::get_comment(tx, id)?
                .ok_or_else(|| StoreError::not_found(EntityKind::Comment, id))?;
            queries::delete_comment(tx, id)?;
            let change = adjust_count(
                tx,
                CounterTarget::new(EntityKind::Post, comment.post_id, CounterField::CommentCount),
                Delta::Decrement,
            )?;
            self.settle(tx, &change, now)?;
            Ok(())
        })
    }

    // -- Likes --

    pub fn like_group(&self, id: i64, now: DateTime<Utc>) -> StoreResult<LikeRecorded> {
        self.like(CounterTarget::new(EntityKind::Group, id, CounterField::LikeCount), now)
    }

    pub fn like_post(&self, id: i64, now: DateTime<Utc>) -> StoreResult<LikeRecorded> {
        self.like(CounterTarget::new(EntityKind::Post, id, CounterField::LikeCount), now)
    }

    fn like(&self, target: CounterTarget, now: DateTime<Utc>) -> StoreResult<LikeRecorded> {
        self.db.with_tx(|tx| {
            let change = adjust_count(tx, target, Delta::Increment)?;
            let awarded = self.settle(tx, &change, now)?;
            Ok(LikeRecorded {
                like_count: change.value,
                awarded,
            })
        })
    }

    /// Hand a counter change to the ledger inside the same transaction.
    fn settle(
        &self,
        tx: &Transaction<'_>,
        change: &CounterChanged,
        now: DateTime<Utc>,
    ) -> StoreResult<Vec<BadgeAwarded>> {
        debug!(
            group_id = change.group_id,
            entity = %change.entity,
            entity_id = change.entity_id,
            delta = change.delta,
            value = change.value,
            "counter changed"
        );
        self.ledger.on_counter_changed(tx, change, now)
    }
}
