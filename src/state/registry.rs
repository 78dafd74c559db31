//! The session registry: who is paired with whom.

use crate::error::{MatchError, MatchResult};
use crate::state::UserId;
use std::collections::HashMap;

/// Bidirectional map of user to current partner.
///
/// Each session is stored as two symmetric entries so partner lookup is O(1)
/// from either side. The single source of truth for active pairings.
#[derive(Debug, Default)]
pub struct SessionRegistry {
    partners: HashMap<UserId, UserId>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pair two users, inserting both symmetric entries.
    ///
    /// Fails if either user is already paired or `a == b`. Unreachable while
    /// all callers mutate under the guard; a failure here is a logic bug.
    pub fn pair(&mut self, a: UserId, b: UserId) -> MatchResult<()> {
        if a == b {
            return Err(MatchError::InvalidPairing(format!(
                "cannot pair user {a} with themselves"
            )));
        }
        if self.partners.contains_key(&a) || self.partners.contains_key(&b) {
            return Err(MatchError::InvalidPairing(format!(
                "user {a} or {b} is already paired"
            )));
        }
        self.partners.insert(a, b);
        self.partners.insert(b, a);
        Ok(())
    }

    /// The user's current partner, if any.
    pub fn partner_of(&self, user: UserId) -> Option<UserId> {
        self.partners.get(&user).copied()
    }

    /// Whether the user has an active session.
    pub fn contains(&self, user: UserId) -> bool {
        self.partners.contains_key(&user)
    }

    /// Remove both symmetric entries. Idempotent; returns the former partner.
    pub fn unpair(&mut self, user: UserId) -> Option<UserId> {
        let partner = self.partners.remove(&user)?;
        self.partners.remove(&partner);
        Some(partner)
    }

    /// Number of active sessions.
    pub fn session_count(&self) -> usize {
        self.partners.len() / 2
    }

    /// Symmetry check: every entry's partner must map back.
    pub fn is_symmetric(&self) -> bool {
        self.partners
            .iter()
            .all(|(user, partner)| self.partners.get(partner) == Some(user))
    }
}
