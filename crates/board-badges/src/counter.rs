use rusqlite::Connection;

use board_db::store::{self, CounterTarget};
use board_db::{StoreError, StoreResult};
use board_types::events::{CounterChanged, CounterDimension};
use board_types::models::EntityKind;

/// A unit step on an activity counter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delta {
    Increment,
    Decrement,
}

impl Delta {
    pub fn as_i64(self) -> i64 {
        match self {
            Self::Increment => 1,
            Self::Decrement => -1,
        }
    }
}

/// Apply `delta` to an activity counter in the store and describe the change.
///
/// The delta is a single relative update; the returned event carries the
/// post-update value and the group whose badges may be affected. `badge_count`
/// is not an activity counter and is rejected here.
pub fn adjust_count(conn: &Connection, target: CounterTarget, delta: Delta) -> StoreResult<CounterChanged> {
    let dimension = CounterDimension::of(target.field).ok_or(StoreError::InvalidField {
        kind: target.kind,
        field: target.field,
    })?;

    let value = store::adjust_field(conn, target, delta.as_i64())?;
    let group_id = owning_group(conn, target.kind, target.id)?;

    Ok(CounterChanged {
        group_id,
        entity: target.kind,
        entity_id: target.id,
        dimension,
        delta: delta.as_i64(),
        value,
    })
}

fn owning_group(conn: &Connection, kind: EntityKind, id: i64) -> StoreResult<i64> {
    match kind {
        EntityKind::Group => Ok(id),
        EntityKind::Post => store::get_post(conn, id)?
            .map(|post| post.group_id)
            .ok_or_else(|| StoreError::not_found(kind, id)),
        EntityKind::Comment | EntityKind::Badge => Err(StoreError::not_found(kind, id)),
    }
}
