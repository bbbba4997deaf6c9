//! Credential store
//!
//! Bearer tokens are kept only as SHA-256 digests together with the time they
//! were acquired. A token is valid while a matching row exists and is no older
//! than [`token_retention`]. Several valid tokens may coexist (one per device
//! or session), so inserts never check for duplicates.

use chrono::{DateTime, Duration, Utc};
use sqlx::SqlitePool;
use strawberry_common::api::hash_token;
use tracing::debug;

use crate::error::Result;

/// Hours a token stays valid after it was acquired
pub const TOKEN_RETENTION_HOURS: i64 = 24;

/// Retention window as a duration
pub fn token_retention() -> Duration {
    Duration::hours(TOKEN_RETENTION_HOURS)
}

/// Store a new token acquired now
pub async fn add_credential(db: &SqlitePool, token: &str) -> Result<()> {
    add_credential_at(db, token, Utc::now()).await
}

/// Store a token with an explicit acquisition time
pub async fn add_credential_at(
    db: &SqlitePool,
    token: &str,
    acquired_at: DateTime<Utc>,
) -> Result<()> {
    sqlx::query("INSERT INTO credentials (token_hash, acquired_at) VALUES (?, ?)")
        .bind(hash_token(token))
        .bind(acquired_at.timestamp_millis())
        .execute(db)
        .await?;

    Ok(())
}

/// Check whether a token is stored and younger than the retention window
///
/// An unknown token is `Ok(false)`, never an error. Store failures are
/// reported as errors so callers can tell them apart from a bad token.
pub async fn is_valid(db: &SqlitePool, token: &str) -> Result<bool> {
    let cutoff = (Utc::now() - token_retention()).timestamp_millis();

    let found: Option<i64> = sqlx::query_scalar(
        "SELECT id FROM credentials WHERE token_hash = ? AND acquired_at > ? LIMIT 1",
    )
    .bind(hash_token(token))
    .bind(cutoff)
    .fetch_optional(db)
    .await?;

    Ok(found.is_some())
}

/// Replace `old_token` with `new_token`
///
/// Does nothing when `old_token` is not stored; callers check [`is_valid`]
/// first and report the token error themselves. Removal and insertion happen
/// in one transaction.
pub async fn renew(db: &SqlitePool, old_token: &str, new_token: &str) -> Result<()> {
    let mut tx = db.begin().await?;

    let removed = sqlx::query("DELETE FROM credentials WHERE token_hash = ?")
        .bind(hash_token(old_token))
        .execute(&mut *tx)
        .await?
        .rows_affected();

    if removed == 0 {
        debug!("Renew skipped: old token not stored");
        tx.rollback().await?;
        return Ok(());
    }

    sqlx::query("INSERT INTO credentials (token_hash, acquired_at) VALUES (?, ?)")
        .bind(hash_token(new_token))
        .bind(Utc::now().timestamp_millis())
        .execute(&mut *tx)
        .await?;

    tx.commit().await?;
    Ok(())
}

/// Delete every credential acquired `max_age` ago or earlier
///
/// Returns the number of removed rows. Idempotent.
pub async fn sweep_expired(db: &SqlitePool, max_age: Duration) -> Result<u64> {
    let cutoff = (Utc::now() - max_age).timestamp_millis();

    let removed = sqlx::query("DELETE FROM credentials WHERE acquired_at <= ?")
        .bind(cutoff)
        .execute(db)
        .await?
        .rows_affected();

    Ok(removed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_pool;

    async fn row_count(db: &SqlitePool) -> i64 {
        sqlx::query_scalar("SELECT COUNT(*) FROM credentials")
            .fetch_one(db)
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_add_then_valid() {
        let db = test_pool().await;

        assert!(!is_valid(&db, "token-a").await.unwrap());
        add_credential(&db, "token-a").await.unwrap();
        assert!(is_valid(&db, "token-a").await.unwrap());
        assert!(!is_valid(&db, "token-b").await.unwrap());
    }

    #[tokio::test]
    async fn test_token_stored_hashed() {
        let db = test_pool().await;
        add_credential(&db, "plain-secret").await.unwrap();

        let stored: String = sqlx::query_scalar("SELECT token_hash FROM credentials")
            .fetch_one(&db)
            .await
            .unwrap();
        assert_ne!(stored, "plain-secret");
        assert_eq!(stored, hash_token("plain-secret"));
    }

    #[tokio::test]
    async fn test_sweep_zero_invalidates() {
        let db = test_pool().await;
        add_credential(&db, "token-a").await.unwrap();
        assert!(is_valid(&db, "token-a").await.unwrap());

        let removed = sweep_expired(&db, Duration::zero()).await.unwrap();
        assert_eq!(removed, 1);
        assert!(!is_valid(&db, "token-a").await.unwrap());

        // Idempotent
        assert_eq!(sweep_expired(&db, Duration::zero()).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_sweep_keeps_fresh_tokens() {
        let db = test_pool().await;
        add_credential_at(&db, "old", Utc::now() - Duration::hours(25)).await.unwrap();
        add_credential(&db, "fresh").await.unwrap();

        let removed = sweep_expired(&db, token_retention()).await.unwrap();
        assert_eq!(removed, 1);
        assert_eq!(row_count(&db).await, 1);
        assert!(is_valid(&db, "fresh").await.unwrap());
    }

    #[tokio::test]
    async fn test_expired_token_invalid_before_sweep() {
        let db = test_pool().await;
        add_credential_at(&db, "old", Utc::now() - Duration::hours(25)).await.unwrap();

        assert_eq!(row_count(&db).await, 1);
        assert!(!is_valid(&db, "old").await.unwrap());
    }

    #[tokio::test]
    async fn test_duplicate_tokens_allowed() {
        let db = test_pool().await;
        add_credential(&db, "token-a").await.unwrap();
        add_credential(&db, "token-a").await.unwrap();

        assert_eq!(row_count(&db).await, 2);
        assert!(is_valid(&db, "token-a").await.unwrap());
    }

    #[tokio::test]
    async fn test_renew_replaces_token() {
        let db = test_pool().await;
        add_credential(&db, "old").await.unwrap();
        add_credential(&db, "other-device").await.unwrap();

        renew(&db, "old", "new").await.unwrap();

        assert!(!is_valid(&db, "old").await.unwrap());
        assert!(is_valid(&db, "new").await.unwrap());
        assert!(is_valid(&db, "other-device").await.unwrap());
        assert_eq!(row_count(&db).await, 2);
    }

    #[tokio::test]
    async fn test_renew_unknown_old_token_is_noop() {
        let db = test_pool().await;

        renew(&db, "missing", "new").await.unwrap();

        assert!(!is_valid(&db, "new").await.unwrap());
        assert_eq!(row_count(&db).await, 0);
    }
}
