//! Group registry
//!
//! One row per tracked group holding the owning user and the stored readiness
//! (READY or NOT_READY). Groups without a row are reported as UNKNOWN.

use sqlx::SqlitePool;
use strawberry_common::api::types::GroupAndStatus;
use strawberry_common::api::GroupStatus;

use crate::error::{Error, Result};

/// Start tracking a group as NOT_READY
///
/// Adding a group that is already tracked leaves its owner and status as
/// they are. Returns `true` when a new row was inserted.
pub async fn add_group(db: &SqlitePool, group_id: i64, owner_id: i64) -> Result<bool> {
    let inserted = sqlx::query(
        "INSERT OR IGNORE INTO tracked_groups (group_id, owner_id, status_id) VALUES (?, ?, ?)",
    )
    .bind(group_id)
    .bind(owner_id)
    .bind(GroupStatus::NotReady.code() as i64)
    .execute(db)
    .await?
    .rows_affected();

    Ok(inserted > 0)
}

/// Overwrite a group's stored status
///
/// Returns `false` (and changes nothing) when the group is not tracked.
pub async fn update_status(db: &SqlitePool, group_id: i64, status: GroupStatus) -> Result<bool> {
    if status == GroupStatus::Unknown {
        return Err(Error::Internal(format!(
            "refusing to store UNKNOWN status for group {}",
            group_id
        )));
    }

    let updated = sqlx::query("UPDATE tracked_groups SET status_id = ? WHERE group_id = ?")
        .bind(status.code() as i64)
        .bind(group_id)
        .execute(db)
        .await?
        .rows_affected();

    Ok(updated > 0)
}

/// Current status of a group, UNKNOWN when it is not tracked
pub async fn get_status(db: &SqlitePool, group_id: i64) -> Result<GroupStatus> {
    let status_id: Option<i64> =
        sqlx::query_scalar("SELECT status_id FROM tracked_groups WHERE group_id = ?")
            .bind(group_id)
            .fetch_optional(db)
            .await?;

    Ok(status_id
        .map(GroupStatus::from_stored)
        .unwrap_or(GroupStatus::Unknown))
}

/// Snapshot of every tracked group
pub async fn list_all(db: &SqlitePool) -> Result<Vec<GroupAndStatus>> {
    let rows: Vec<(i64, i64)> =
        sqlx::query_as("SELECT group_id, status_id FROM tracked_groups ORDER BY id")
            .fetch_all(db)
            .await?;

    Ok(rows.into_iter().map(to_entry).collect())
}

/// Groups owned by a user, in the order they were added
pub async fn list_owned_by(db: &SqlitePool, owner_id: i64) -> Result<Vec<GroupAndStatus>> {
    let rows: Vec<(i64, i64)> = sqlx::query_as(
        "SELECT group_id, status_id FROM tracked_groups WHERE owner_id = ? ORDER BY id",
    )
    .bind(owner_id)
    .fetch_all(db)
    .await?;

    Ok(rows.into_iter().map(to_entry).collect())
}

fn to_entry((group_id, status_id): (i64, i64)) -> GroupAndStatus {
    GroupAndStatus {
        group_id,
        group_status: GroupStatus::from_stored(status_id),
    }
}
