//! Generic single-slot request/accept/decline/cancel protocol.
//!
//! One instance tracks "save this chat" requests, another "reconnect to a
//! saved partner" requests. The broker only owns the slot bookkeeping; the
//! kind-specific eligibility predicate and commit action live in the engine,
//! which re-validates eligibility at accept time.

use crate::error::{MatchError, MatchResult};
use crate::state::UserId;
use std::collections::HashMap;
use std::time::Instant;

/// A pending request against a target user.
#[derive(Debug, Clone)]
pub struct PendingRequest {
    pub requester: UserId,
    pub created_at: Instant,
}

/// Outcome of submitting a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Submission {
    /// A new request was stored; the target should be notified.
    Submitted,
    /// The same requester already had this request pending; treated as an
    /// idempotent re-send, no second notification.
    Resent,
}

/// Slot map enforcing at most one pending request per target.
#[derive(Debug, Default)]
pub struct RequestBroker {
    pending: HashMap<UserId, PendingRequest>,
}

impl RequestBroker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a request from `requester` against `target`.
    ///
    /// Fails with `RequestConflict` if a different requester already holds
    /// the slot; a duplicate from the same requester is a `Resent`.
    pub fn submit(&mut self, requester: UserId, target: UserId) -> MatchResult<Submission> {
        if let Some(existing) = self.pending.get(&target) {
            if existing.requester == requester {
                return Ok(Submission::Resent);
            }
            return Err(MatchError::RequestConflict);
        }
        self.pending.insert(
            target,
            PendingRequest {
                requester,
                created_at: Instant::now(),
            },
        );
        Ok(Submission::Submitted)
    }

    /// Remove and return the pending request against `target`, if any.
    ///
    /// A request is a single-use ticket: accept, decline, and accept-time
    /// eligibility failures all go through here so nothing is left stale.
    pub fn take(&mut self, target: UserId) -> Option<PendingRequest> {
        self.pending.remove(&target)
    }

    /// The pending request against `target`, without consuming it.
    pub fn peek(&self, target: UserId) -> Option<&PendingRequest> {
        self.pending.get(&target)
    }

    /// Cancel the request `requester` has outstanding; returns its target.
    pub fn cancel_by(&mut self, requester: UserId) -> Option<UserId> {
        let target = self
            .pending
            .iter()
            .find(|(_, req)| req.requester == requester)
            .map(|(target, _)| *target)?;
        self.pending.remove(&target);
        Some(target)
    }

    /// Drop every request naming `user` as target or requester.
    ///
    /// Returns the removed `(target, requester)` entries. Called when a
    /// user's session or eligibility state changes (partner left, ban).
    pub fn clear_involving(&mut self, user: UserId) -> Vec<(UserId, UserId)> {
        let doomed: Vec<UserId> = self
            .pending
            .iter()
            .filter(|(target, req)| **target == user || req.requester == user)
            .map(|(target, _)| *target)
            .collect();
        doomed
            .into_iter()
            .filter_map(|target| {
                self.pending
                    .remove(&target)
                    .map(|req| (target, req.requester))
            })
            .collect()
    }

    /// Drop a request between exactly these two users, in either role.
    pub fn clear_between(&mut self, a: UserId, b: UserId) -> bool {
        let hit = |target: UserId, requester: UserId| {
            (target == a && requester == b) || (target == b && requester == a)
        };
        let doomed: Option<UserId> = self
            .pending
            .iter()
            .find(|(target, req)| hit(**target, req.requester))
            .map(|(target, _)| *target);
        match doomed {
            Some(target) => self.pending.remove(&target).is_some(),
            None => false,
        }
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_slot_per_target() {
        let mut broker = RequestBroker::new();
        assert_eq!(broker.submit(1, 2).unwrap(), Submission::Submitted);
        assert!(matches!(
            broker.submit(3, 2),
            Err(MatchError::RequestConflict)
        ));
        // Different target is a different slot.
        assert_eq!(broker.submit(3, 4).unwrap(), Submission::Submitted);
    }

    #[test]
    fn resend_from_same_requester_is_idempotent() {
        let mut broker = RequestBroker::new();
        assert_eq!(broker.submit(1, 2).unwrap(), Submission::Submitted);
        assert_eq!(broker.submit(1, 2).unwrap(), Submission::Resent);
        assert_eq!(broker.len(), 1);
    }

    #[test]
    fn take_consumes_the_ticket() {
        let mut broker = RequestBroker::new();
        broker.submit(1, 2).unwrap();

        let req = broker.take(2).expect("request should be pending");
        assert_eq!(req.requester, 1);
        assert!(broker.take(2).is_none());
    }

    #[test]
    fn cancel_by_requester_finds_the_slot() {
        let mut broker = RequestBroker::new();
        broker.submit(1, 2).unwrap();

        assert_eq!(broker.cancel_by(1), Some(2));
        assert_eq!(broker.cancel_by(1), None);
        assert!(broker.is_empty());
    }

    #[test]
    fn clear_involving_hits_both_roles() {
        let mut broker = RequestBroker::new();
        broker.submit(1, 2).unwrap(); // 1 asks 2
        broker.submit(2, 3).unwrap(); // 2 asks 3
        broker.submit(4, 5).unwrap(); // unrelated

        let removed = broker.clear_involving(2);
        assert_eq!(removed.len(), 2);
        assert_eq!(broker.len(), 1);
        assert!(broker.peek(5).is_some());
    }

    #[test]
    fn clear_between_only_matches_that_pair() {
        let mut broker = RequestBroker::new();
        broker.submit(1, 2).unwrap();
        broker.submit(3, 4).unwrap();

        assert!(broker.clear_between(2, 1));
        assert!(!broker.clear_between(2, 1));
        assert_eq!(broker.len(), 1);
    }
}
