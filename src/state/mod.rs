//! Core matchmaking state.
//!
//! All mutable matching state lives in [`CoreState`] and is protected by a
//! single exclusive critical section owned by the engine. Nothing in this
//! module performs I/O; every method is a pure state mutation so the guard
//! is never held across anything slow.

pub mod broker;
pub mod pool;
pub mod registry;

pub use broker::{PendingRequest, RequestBroker, Submission};
pub use pool::{WaitingEntry, WaitingPool};
pub use registry::SessionRegistry;

use std::collections::HashMap;
use tokio::task::JoinHandle;

/// Opaque stable user identifier from the external messaging platform.
pub type UserId = i64;

/// Handle to a user's background retry task.
///
/// The ticket is unique per spawn; a tick must observe its own ticket still
/// registered before mutating state, so a cancelled task that outlived its
/// removal can never act.
#[derive(Debug)]
pub struct RetryHandle {
    pub ticket: u64,
    pub task: JoinHandle<()>,
}

/// The single shared state domain: waiting pool, session registry, pending
/// handshake requests, and retry-task bookkeeping.
#[derive(Debug, Default)]
pub struct CoreState {
    pub pool: WaitingPool,
    pub sessions: SessionRegistry,
    pub save_requests: RequestBroker,
    pub reconnect_requests: RequestBroker,
    pub retries: HashMap<UserId, RetryHandle>,
}

impl CoreState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether the user is neither waiting nor paired.
    pub fn is_idle(&self, user: UserId) -> bool {
        !self.pool.contains(user) && !self.sessions.contains(user)
    }

    /// Cancel and forget the user's retry task, if one is registered.
    ///
    /// Must be called inside the same critical section as the pool removal
    /// that motivated it, so no later tick for this user can mutate state.
    pub fn cancel_retry(&mut self, user: UserId) -> bool {
        match self.retries.remove(&user) {
            Some(handle) => {
                handle.task.abort();
                true
            }
            None => false,
        }
    }

    /// Global invariant: no user is simultaneously waiting and paired, and
    /// the registry is symmetric. Checked by tests after every scenario.
    pub fn invariants_hold(&self) -> bool {
        self.sessions.is_symmetric()
            && self.pool.users().all(|user| !self.sessions.contains(user))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invariant_check_covers_every_waiting_user() {
        let mut state = CoreState::new();
        state.pool.enqueue(UserId::MIN);
        state.sessions.pair(UserId::MIN, 7).unwrap();
        assert!(!state.invariants_hold());
    }

    #[test]
    fn idle_means_neither_waiting_nor_paired() {
        let mut state = CoreState::new();
        assert!(state.is_idle(1));
        state.pool.enqueue(1);
        assert!(!state.is_idle(1));
        state.pool.remove(1);
        state.sessions.pair(1, 2).unwrap();
        assert!(!state.is_idle(1));
    }
}
