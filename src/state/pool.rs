//! The waiting pool: users currently seeking a partner.

use crate::state::UserId;
use std::collections::HashMap;
use std::time::Instant;

/// A user waiting to be paired.
#[derive(Debug, Clone)]
pub struct WaitingEntry {
    /// When the user entered the pool, for enqueue-order fairness queries.
    pub enqueued_at: Instant,
    /// How many retry passes have run for this user.
    pub attempts: u32,
}

/// Set of users currently seeking a partner.
///
/// Purely in-memory and mutation-only-under-the-guard; the pool itself does
/// no validation beyond membership. Session/ban checks belong to the engine,
/// which is the only component that mutates the pool and the session
/// registry together.
#[derive(Debug, Default)]
pub struct WaitingPool {
    entries: HashMap<UserId, WaitingEntry>,
}

impl WaitingPool {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a user into the pool. Returns false if already waiting.
    pub fn enqueue(&mut self, user: UserId) -> bool {
        if self.entries.contains_key(&user) {
            return false;
        }
        self.entries.insert(
            user,
            WaitingEntry {
                enqueued_at: Instant::now(),
                attempts: 0,
            },
        );
        true
    }

    /// Remove a user from the pool. Idempotent; returns whether present.
    pub fn remove(&mut self, user: UserId) -> bool {
        self.entries.remove(&user).is_some()
    }

    /// Whether the user is currently waiting.
    pub fn contains(&self, user: UserId) -> bool {
        self.entries.contains_key(&user)
    }

    /// Candidates for pairing, excluding the seeker, oldest enqueue first.
    ///
    /// Selection among these is the engine's job (uniform random); the
    /// enqueue ordering is exposed so fairness-sensitive callers can use it.
    pub fn candidates(&self, exclude: UserId) -> Vec<UserId> {
        let mut ids: Vec<(UserId, Instant)> = self
            .entries
            .iter()
            .filter(|(user, _)| **user != exclude)
            .map(|(user, entry)| (*user, entry.enqueued_at))
            .collect();
        ids.sort_by_key(|(_, at)| *at);
        ids.into_iter().map(|(user, _)| user).collect()
    }

    /// All waiting users, in no particular order.
    pub fn users(&self) -> impl Iterator<Item = UserId> + '_ {
        self.entries.keys().copied()
    }

    /// Bump and return the retry attempt counter for a waiting user.
    pub fn bump_attempts(&mut self, user: UserId) -> Option<u32> {
        let entry = self.entries.get_mut(&user)?;
        entry.attempts += 1;
        Some(entry.attempts)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
