//! Repository for the `accelerator_locks` table.
//!
//! Every operation is a single statement, so atomicity comes from
//! PostgreSQL row locking rather than read-then-write in application code.

use std::time::Duration;

use sqlx::PgPool;

/// Provides the atomic lock primitives.
pub struct LockRepo;

impl LockRepo {
    /// Insert the lock, or take over a row whose TTL has elapsed.
    ///
    /// Returns `true` if `holder` now owns the lock.
    pub async fn set_if_absent(
        pool: &PgPool,
        key: &str,
        holder: &str,
        ttl: Duration,
    ) -> Result<bool, sqlx::Error> {
        let row = sqlx::query_scalar::<_, String>(
            "INSERT INTO accelerator_locks (key, holder, acquired_at, expires_at) \
             VALUES ($1, $2, NOW(), NOW() + make_interval(secs => $3)) \
             ON CONFLICT (key) DO UPDATE \
                 SET holder = EXCLUDED.holder, \
                     acquired_at = EXCLUDED.acquired_at, \
                     expires_at = EXCLUDED.expires_at \
                 WHERE accelerator_locks.expires_at <= NOW() \
             RETURNING holder",
        )
        .bind(key)
        .bind(holder)
        .bind(ttl.as_secs_f64())
        .fetch_optional(pool)
        .await?;
        Ok(row.is_some())
    }

    /// Delete the lock only if `holder` owns it and it has not expired.
    pub async fn compare_and_delete(
        pool: &PgPool,
        key: &str,
        holder: &str,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "DELETE FROM accelerator_locks \
             WHERE key = $1 AND holder = $2 AND expires_at > NOW()",
        )
        .bind(key)
        .bind(holder)
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Holder of the live lock, if any.
    pub async fn get(pool: &PgPool, key: &str) -> Result<Option<String>, sqlx::Error> {
        sqlx::query_scalar::<_, String>(
            "SELECT holder FROM accelerator_locks WHERE key = $1 AND expires_at > NOW()",
        )
        .bind(key)
        .fetch_optional(pool)
        .await
    }

    /// Unconditional delete. Returns `true` if a live lock was removed.
    pub async fn delete(pool: &PgPool, key: &str) -> Result<bool, sqlx::Error> {
        let removed = sqlx::query_scalar::<_, bool>(
            "DELETE FROM accelerator_locks WHERE key = $1 RETURNING expires_at > NOW()",
        )
        .bind(key)
        .fetch_optional(pool)
        .await?;
        Ok(removed.unwrap_or(false))
    }
}
