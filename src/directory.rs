//! Persistent directory seam.
//!
//! The engine treats durable data (ban flags, saved pairings, session
//! bookkeeping) as an external collaborator behind this narrow trait. The
//! in-memory pool and registry remain authoritative for pairing; the
//! directory is consulted for eligibility reads and best-effort bookkeeping
//! writes.

use crate::state::UserId;
use async_trait::async_trait;
use thiserror::Error;

/// Directory errors.
#[derive(Debug, Error)]
pub enum DirectoryError {
    #[error("database error: {0}")]
    Sqlx(#[from] sqlx::Error),
    #[error("migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),
    #[error("internal error: {0}")]
    Internal(String),
}

/// Durable user directory consumed by the engine.
///
/// Reads that gate a commit (ban status at selection time, the saved-pairing
/// cap and mutual-save existence at handshake accept) are awaited inside the
/// engine's critical section so they stay read-consistent with the commit.
/// The bookkeeping writes (`record_session_*`) are best-effort and called
/// outside it.
#[async_trait]
pub trait Directory: Send + Sync {
    /// Whether the user is banned from matching.
    async fn is_banned(&self, user: UserId) -> Result<bool, DirectoryError>;

    /// How many saved pairings the user currently has.
    async fn saved_pairing_count(&self, user: UserId) -> Result<u32, DirectoryError>;

    /// Whether a mutual saved pairing exists between the two users.
    async fn has_mutual_save(&self, a: UserId, b: UserId) -> Result<bool, DirectoryError>;

    /// Persist a mutual saved pairing. Idempotent.
    async fn create_saved_pairing(&self, a: UserId, b: UserId) -> Result<(), DirectoryError>;

    /// Remove a saved pairing. Returns whether one existed.
    async fn delete_saved_pairing(&self, a: UserId, b: UserId) -> Result<bool, DirectoryError>;

    /// Record that a session between the two users started.
    async fn record_session_start(&self, a: UserId, b: UserId) -> Result<(), DirectoryError>;

    /// Record that the active session between the two users ended.
    async fn record_session_end(
        &self,
        a: UserId,
        b: UserId,
        ended_by: UserId,
    ) -> Result<(), DirectoryError>;
}
