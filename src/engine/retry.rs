//! Per-user background retry task.
//!
//! Each waiting user gets one cancellable task that re-attempts pairing at a
//! fixed interval up to a bounded number of attempts. All the interesting
//! logic lives in [`MatchEngine::retry_tick`]; this module only owns the
//! sleep loop. The task never touches state directly: every tick goes
//! through the engine's guard and proves its ticket is still registered, so
//! a task that lost its slot simply exits.

use super::MatchEngine;
use crate::state::UserId;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::trace;

/// What a single retry tick decided.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum TickOutcome {
    /// Still waiting; keep ticking.
    Continue,
    /// Pairing succeeded on this tick.
    Matched { partner: UserId },
    /// Attempt budget spent; the user was removed from the pool.
    Exhausted,
    /// The ticket is no longer registered (search cancelled, user paired
    /// from the other side, or banned); exit without touching state.
    Cancelled,
}

/// Spawn the retry loop for a waiting user.
pub(crate) fn spawn(engine: Arc<MatchEngine>, user: UserId, ticket: u64) -> JoinHandle<()> {
    tokio::spawn(async move {
        let interval = engine.retry_interval();
        loop {
            tokio::time::sleep(interval).await;
            match engine.retry_tick(user, ticket).await {
                TickOutcome::Continue => {}
                outcome => {
                    trace!(user, ticket, ?outcome, "retry task finished");
                    break;
                }
            }
        }
    })
}
