//! SQLite-backed directory implementation.
//!
//! Provides async SQLite access using SQLx for:
//! - Per-user ban flags and chat counters
//! - Mutual saved pairings (normalized, one row per pair)
//! - Session start/end bookkeeping
//!
//! The engine only sees this through the [`Directory`] trait; moderation
//! tooling can use the extra helpers (`ensure_user`, `set_banned`) directly.

use crate::directory::{Directory, DirectoryError};
use crate::state::UserId;
use async_trait::async_trait;
use sqlx::SqlitePool;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tracing::info;

static MEMDB_COUNTER: AtomicU64 = AtomicU64::new(0);

/// SQLite directory with connection pool.
#[derive(Clone)]
pub struct SqliteDirectory {
    pool: SqlitePool,
}

impl SqliteDirectory {
    /// Connection acquire timeout - prevents connection storms from blocking indefinitely.
    const ACQUIRE_TIMEOUT: Duration = Duration::from_secs(5);

    /// Maximum time a connection can remain idle before being closed.
    const IDLE_TIMEOUT: Duration = Duration::from_secs(60);

    /// Open the directory database, running migrations if needed.
    pub async fn new(path: &str) -> Result<Self, DirectoryError> {
        let pool = if path == ":memory:" {
            // Use a uniquely named shared-cache memory database per call.
            // `file::memory:` is global-ish and will collide across parallel tests.
            let id = MEMDB_COUNTER.fetch_add(1, Ordering::Relaxed);
            let memdb_uri = format!(
                "file:pairlink-memdb-{}-{}?mode=memory&cache=shared",
                std::process::id(),
                id
            );

            let options = SqliteConnectOptions::new()
                .filename(&memdb_uri)
                .shared_cache(true)
                .create_if_missing(true);

            SqlitePoolOptions::new()
                .max_connections(1)
                .acquire_timeout(Self::ACQUIRE_TIMEOUT)
                .idle_timeout(Some(Self::IDLE_TIMEOUT))
                .test_before_acquire(true)
                .connect_with(options)
                .await?
        } else {
            if let Some(parent) = Path::new(path).parent()
                && !parent.as_os_str().is_empty()
                && let Err(e) = std::fs::create_dir_all(parent)
            {
                tracing::warn!(path = %parent.display(), error = %e, "Failed to create database directory");
            }

            let options = SqliteConnectOptions::new()
                .filename(path)
                .create_if_missing(true);

            SqlitePoolOptions::new()
                .max_connections(5)
                .acquire_timeout(Self::ACQUIRE_TIMEOUT)
                .idle_timeout(Some(Self::IDLE_TIMEOUT))
                .test_before_acquire(true)
                .connect_with(options)
                .await?
        };

        info!(path = %path, "Directory database connected");

        Self::run_migrations(&pool).await?;

        // WAL mode allows reads to happen while writes are in progress
        sqlx::query("PRAGMA journal_mode=WAL")
            .execute(&pool)
            .await?;
        sqlx::query("PRAGMA synchronous=NORMAL")
            .execute(&pool)
            .await?;

        Ok(Self { pool })
    }

    /// Get reference to the underlying connection pool.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Run embedded migrations.
    async fn run_migrations(pool: &SqlitePool) -> Result<(), DirectoryError> {
        sqlx::migrate!("./migrations").run(pool).await?;
        info!("Directory migrations checked/applied");
        Ok(())
    }

    /// Ensure a user row exists (no-op if already present).
    pub async fn ensure_user(&self, user: UserId) -> Result<(), DirectoryError> {
        let now = chrono::Utc::now().timestamp();
        sqlx::query("INSERT OR IGNORE INTO users (user_id, created_at) VALUES (?, ?)")
            .bind(user)
            .bind(now)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// Set or clear a user's ban flag. Used by external moderation tooling.
    pub async fn set_banned(&self, user: UserId, banned: bool) -> Result<(), DirectoryError> {
        self.ensure_user(user).await?;
        sqlx::query("UPDATE users SET is_banned = ? WHERE user_id = ?")
            .bind(banned as i64)
            .bind(user)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// Total completed chats recorded for a user.
    pub async fn total_chats(&self, user: UserId) -> Result<u32, DirectoryError> {
        let count: Option<i64> =
            sqlx::query_scalar("SELECT total_chats FROM users WHERE user_id = ?")
                .bind(user)
                .fetch_optional(&self.pool)
                .await?;
        Ok(count.unwrap_or(0) as u32)
    }
}

/// Normalize a pair so (lo, hi) is order-independent.
fn ordered(a: UserId, b: UserId) -> (UserId, UserId) {
    if a <= b { (a, b) } else { (b, a) }
}

#[async_trait]
impl Directory for SqliteDirectory {
    async fn is_banned(&self, user: UserId) -> Result<bool, DirectoryError> {
        // Unknown users are not banned.
        let banned: Option<i64> =
            sqlx::query_scalar("SELECT is_banned FROM users WHERE user_id = ?")
                .bind(user)
                .fetch_optional(&self.pool)
                .await?;
        Ok(banned.unwrap_or(0) != 0)
    }

    async fn saved_pairing_count(&self, user: UserId) -> Result<u32, DirectoryError> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM saved_pairings WHERE user_lo = ? OR user_hi = ?",
        )
        .bind(user)
        .bind(user)
        .fetch_one(&self.pool)
        .await?;
        Ok(count as u32)
    }

    async fn has_mutual_save(&self, a: UserId, b: UserId) -> Result<bool, DirectoryError> {
        let (lo, hi) = ordered(a, b);
        let exists: i64 = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM saved_pairings WHERE user_lo = ? AND user_hi = ?)",
        )
        .bind(lo)
        .bind(hi)
        .fetch_one(&self.pool)
        .await?;
        Ok(exists != 0)
    }

    async fn create_saved_pairing(&self, a: UserId, b: UserId) -> Result<(), DirectoryError> {
        let (lo, hi) = ordered(a, b);
        let now = chrono::Utc::now().timestamp();
        // The primary key makes a duplicate save a no-op.
        sqlx::query(
            "INSERT OR IGNORE INTO saved_pairings (user_lo, user_hi, created_at) VALUES (?, ?, ?)",
        )
        .bind(lo)
        .bind(hi)
        .bind(now)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn delete_saved_pairing(&self, a: UserId, b: UserId) -> Result<bool, DirectoryError> {
        let (lo, hi) = ordered(a, b);
        let result = sqlx::query("DELETE FROM saved_pairings WHERE user_lo = ? AND user_hi = ?")
            .bind(lo)
            .bind(hi)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn record_session_start(&self, a: UserId, b: UserId) -> Result<(), DirectoryError> {
        let now = chrono::Utc::now().timestamp();

        // Transaction so the session row and both counters move together.
        let mut tx = self.pool.begin().await?;

        for user in [a, b] {
            sqlx::query("INSERT OR IGNORE INTO users (user_id, created_at) VALUES (?, ?)")
                .bind(user)
                .bind(now)
                .execute(&mut *tx)
                .await?;
            sqlx::query("UPDATE users SET total_chats = total_chats + 1 WHERE user_id = ?")
                .bind(user)
                .execute(&mut *tx)
                .await?;
        }

        sqlx::query(
            "INSERT INTO chat_sessions (user_a, user_b, started_at, is_active) VALUES (?, ?, ?, 1)",
        )
        .bind(a)
        .bind(b)
        .bind(now)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(())
    }

    async fn record_session_end(
        &self,
        a: UserId,
        b: UserId,
        ended_by: UserId,
    ) -> Result<(), DirectoryError> {
        let now = chrono::Utc::now().timestamp();
        sqlx::query(
            r#"
            UPDATE chat_sessions
            SET is_active = 0, ended_at = ?, ended_by = ?
            WHERE is_active = 1
              AND ((user_a = ? AND user_b = ?) OR (user_a = ? AND user_b = ?))
            "#,
        )
        .bind(now)
        .bind(ended_by)
        .bind(a)
        .bind(b)
        .bind(b)
        .bind(a)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn open() -> SqliteDirectory {
        SqliteDirectory::new(":memory:")
            .await
            .expect("in-memory directory should open")
    }

    #[tokio::test]
    async fn unknown_user_is_not_banned() {
        let dir = open().await;
        assert!(!dir.is_banned(42).await.unwrap());
    }

    #[tokio::test]
    async fn ban_flag_round_trip() {
        let dir = open().await;
        dir.set_banned(7, true).await.unwrap();
        assert!(dir.is_banned(7).await.unwrap());
        dir.set_banned(7, false).await.unwrap();
        assert!(!dir.is_banned(7).await.unwrap());
    }

    #[tokio::test]
    async fn saved_pairing_is_mutual_and_order_independent() {
        let dir = open().await;
        dir.create_saved_pairing(2, 1).await.unwrap();

        assert!(dir.has_mutual_save(1, 2).await.unwrap());
        assert!(dir.has_mutual_save(2, 1).await.unwrap());
        assert_eq!(dir.saved_pairing_count(1).await.unwrap(), 1);
        assert_eq!(dir.saved_pairing_count(2).await.unwrap(), 1);

        // Duplicate create is a no-op, not a second row.
        dir.create_saved_pairing(1, 2).await.unwrap();
        assert_eq!(dir.saved_pairing_count(1).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn delete_saved_pairing_reports_existence() {
        let dir = open().await;
        dir.create_saved_pairing(1, 2).await.unwrap();

        assert!(dir.delete_saved_pairing(2, 1).await.unwrap());
        assert!(!dir.delete_saved_pairing(1, 2).await.unwrap());
        assert!(!dir.has_mutual_save(1, 2).await.unwrap());
    }

    #[tokio::test]
    async fn file_backed_database_persists_across_reopen() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let path = tmp.path().join("pairlink.db");
        let path = path.to_str().expect("utf-8 path");

        {
            let dir = SqliteDirectory::new(path).await.expect("open");
            dir.set_banned(5, true).await.unwrap();
            dir.create_saved_pairing(1, 2).await.unwrap();
        }

        let dir = SqliteDirectory::new(path).await.expect("reopen");
        assert!(dir.is_banned(5).await.unwrap());
        assert!(dir.has_mutual_save(2, 1).await.unwrap());
    }

    #[tokio::test]
    async fn session_bookkeeping_counts_chats() {
        let dir = open().await;
        dir.record_session_start(10, 20).await.unwrap();
        dir.record_session_end(20, 10, 10).await.unwrap();
        dir.record_session_start(10, 30).await.unwrap();

        assert_eq!(dir.total_chats(10).await.unwrap(), 2);
        assert_eq!(dir.total_chats(20).await.unwrap(), 1);
        assert_eq!(dir.total_chats(30).await.unwrap(), 1);

        let active: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM chat_sessions WHERE is_active = 1")
                .fetch_one(dir.pool())
                .await
                .unwrap();
        assert_eq!(active, 1);
    }
}
