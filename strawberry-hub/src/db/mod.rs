//! Database access layer for strawberry-hub
//!
//! Schema creation lives in `strawberry_common::db`; this module holds the
//! queries the hub runs against it. SQLite gives per-statement atomicity, so
//! request handlers and the reconciler share one pool without extra locking.

pub mod credentials;
pub mod groups;

#[cfg(test)]
pub(crate) async fn test_pool() -> sqlx::SqlitePool {
    strawberry_common::db::init_memory_database()
        .await
        .expect("Should create in-memory database")
}
