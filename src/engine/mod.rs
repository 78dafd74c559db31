//! The match engine: matchmaking, session lifecycle, and consent handshakes.
//!
//! All shared state lives behind one exclusive critical section
//! ([`CoreState`] in a `tokio::sync::Mutex`). Every check-then-act sequence
//! happens inside a single lock acquisition, including the directory reads
//! whose results gate a commit (ban status at candidate selection, the
//! saved-pairing cap and mutual-save existence at handshake accept).
//! Notifications are always dispatched after the guard is released, using
//! values captured while it was held: a slow transport must never stall
//! matching for everyone else.

mod retry;

pub(crate) use retry::TickOutcome;

use crate::config::{Config, HandshakeConfig, MatchingConfig};
use crate::directory::Directory;
use crate::error::{IneligibleReason, MatchError, MatchResult};
use crate::notify::{Event, Notifier};
use crate::state::{CoreState, RetryHandle, Submission, UserId};
use futures_util::future::join_all;
use rand::seq::SliceRandom;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};

/// Result of a `find` (or `skip`) call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FindOutcome {
    /// A partner was available; the session is live.
    Matched { partner: UserId },
    /// No candidate yet; a retry task is searching in the background.
    Searching,
}

/// Result of a `stop` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopOutcome {
    /// The user was waiting; the search was cancelled.
    SearchCancelled,
    /// The user was paired; the session was ended.
    SessionEnded { partner: UserId },
}

/// Result of a `report` call. Filing the actual moderation record is the
/// caller's job; the engine only ends the session and names the partner.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReportOutcome {
    pub reported: UserId,
}

/// Result of evicting a banned user.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EvictOutcome {
    pub was_waiting: bool,
    pub former_partner: Option<UserId>,
}

/// Which handshake a request belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum HandshakeKind {
    Save,
    Reconnect,
}

/// How the target of a request is resolved, under the guard.
enum TargetSpec {
    /// The requester's current partner (save).
    CurrentPartner,
    /// An explicitly named user (reconnect).
    Explicit(UserId),
}

/// Matchmaking and session coordination engine.
///
/// Construct one per process and share it via `Arc`. The engine is the only
/// component that mutates the waiting pool and the session registry
/// together.
pub struct MatchEngine {
    state: Mutex<CoreState>,
    directory: Arc<dyn Directory>,
    notifier: Arc<dyn Notifier>,
    matching: MatchingConfig,
    handshake: HandshakeConfig,
    next_ticket: AtomicU64,
}

impl MatchEngine {
    /// Create a new engine with injected collaborators.
    pub fn new(
        config: &Config,
        directory: Arc<dyn Directory>,
        notifier: Arc<dyn Notifier>,
    ) -> Arc<Self> {
        Arc::new(Self {
            state: Mutex::new(CoreState::new()),
            directory,
            notifier,
            matching: config.matching.clone(),
            handshake: config.handshake.clone(),
            next_ticket: AtomicU64::new(1),
        })
    }

    // ========================================================================
    // Matchmaking command surface
    // ========================================================================

    /// Start searching for a partner.
    ///
    /// Validates the user is not banned and is idle, enqueues them, and runs
    /// an immediate pairing pass. If no candidate is available a background
    /// retry task keeps trying at a fixed interval.
    pub async fn find(self: &Arc<Self>, user: UserId) -> MatchResult<FindOutcome> {
        let outcome = {
            let mut state = self.state.lock().await;
            if state.sessions.contains(user) {
                return Err(MatchError::AlreadyPaired);
            }
            if state.pool.contains(user) {
                return Err(MatchError::AlreadyWaiting);
            }
            if self.directory.is_banned(user).await? {
                return Err(MatchError::Banned);
            }

            state.pool.enqueue(user);
            match self.pairing_pass(&mut state, user).await? {
                Some(partner) => FindOutcome::Matched { partner },
                None => {
                    self.spawn_retry(&mut state, user);
                    FindOutcome::Searching
                }
            }
        };

        match outcome {
            FindOutcome::Matched { partner } => self.announce_match(user, partner).await,
            FindOutcome::Searching => self.send(user, Event::Searching).await,
        }
        Ok(outcome)
    }

    /// Leave the current chat and immediately search for a new partner.
    ///
    /// Re-entry goes through the same ban check as `find`; a user banned
    /// mid-chat still ends the session but does not re-enter the pool.
    pub async fn skip(self: &Arc<Self>, user: UserId) -> MatchResult<FindOutcome> {
        let (partner, outcome) = {
            let mut state = self.state.lock().await;
            let Some(partner) = state.sessions.unpair(user) else {
                return Err(MatchError::NotInSession);
            };
            Self::clear_session_requests(&mut state, user, partner);

            let outcome = match self.directory.is_banned(user).await {
                Ok(true) => Err(MatchError::Banned),
                Err(e) => Err(e.into()),
                Ok(false) => {
                    state.pool.enqueue(user);
                    match self.pairing_pass(&mut state, user).await {
                        Ok(Some(next)) => Ok(FindOutcome::Matched { partner: next }),
                        Ok(None) => {
                            self.spawn_retry(&mut state, user);
                            Ok(FindOutcome::Searching)
                        }
                        Err(e) => Err(e),
                    }
                }
            };
            (partner, outcome)
        };

        // The session ended regardless of whether re-entry was allowed.
        self.send(partner, Event::PartnerLeft).await;
        self.record_end(user, partner, user).await;
        match &outcome {
            Ok(FindOutcome::Matched { partner: next }) => {
                self.send(user, Event::ChatSkipped).await;
                self.announce_match(user, *next).await;
            }
            Ok(FindOutcome::Searching) => {
                self.send(user, Event::ChatSkipped).await;
                self.send(user, Event::Searching).await;
            }
            Err(_) => {}
        }
        outcome
    }

    /// Stop searching, or end the current chat.
    pub async fn stop(&self, user: UserId) -> MatchResult<StopOutcome> {
        let outcome = {
            let mut state = self.state.lock().await;
            if state.pool.remove(user) {
                state.cancel_retry(user);
                StopOutcome::SearchCancelled
            } else if let Some(partner) = state.sessions.unpair(user) {
                Self::clear_session_requests(&mut state, user, partner);
                StopOutcome::SessionEnded { partner }
            } else {
                return Err(MatchError::NotInSession);
            }
        };

        match outcome {
            StopOutcome::SearchCancelled => self.send(user, Event::SearchStopped).await,
            StopOutcome::SessionEnded { partner } => {
                self.send_all(vec![(user, Event::SessionEnded), (partner, Event::PartnerLeft)])
                    .await;
                self.record_end(user, partner, user).await;
            }
        }
        Ok(outcome)
    }

    /// End the current chat and name the partner for moderation.
    ///
    /// Only available during an active session. The moderation record itself
    /// is owned by the caller.
    pub async fn report(&self, user: UserId) -> MatchResult<ReportOutcome> {
        let partner = {
            let mut state = self.state.lock().await;
            let Some(partner) = state.sessions.unpair(user) else {
                return Err(MatchError::NotInSession);
            };
            Self::clear_session_requests(&mut state, user, partner);
            partner
        };

        self.send_all(vec![(user, Event::ReportFiled), (partner, Event::PartnerLeft)])
            .await;
        self.record_end(user, partner, user).await;
        Ok(ReportOutcome { reported: partner })
    }

    /// Remove the user from the waiting pool and cancel their retry task.
    ///
    /// State-idempotent: a repeat call leaves everything untouched and
    /// reports `NotWaiting` so the caller can word the reply.
    pub async fn cancel_search(&self, user: UserId) -> MatchResult<()> {
        let removed = {
            let mut state = self.state.lock().await;
            let removed = state.pool.remove(user);
            state.cancel_retry(user);
            removed
        };
        if !removed {
            return Err(MatchError::NotWaiting);
        }
        self.send(user, Event::SearchStopped).await;
        Ok(())
    }

    /// Evict a user the caller has learned is banned: cancel any search, end
    /// any session, and drop every handshake request they appear in.
    pub async fn ban_cleanup(&self, user: UserId) -> EvictOutcome {
        let outcome = {
            let mut state = self.state.lock().await;
            let was_waiting = state.pool.remove(user);
            state.cancel_retry(user);
            let former_partner = state.sessions.unpair(user);
            state.save_requests.clear_involving(user);
            state.reconnect_requests.clear_involving(user);
            if let Some(partner) = former_partner {
                state.save_requests.clear_involving(partner);
                state.reconnect_requests.clear_involving(partner);
            }
            EvictOutcome {
                was_waiting,
                former_partner,
            }
        };

        if let Some(partner) = outcome.former_partner {
            self.send(partner, Event::PartnerLeft).await;
            self.record_end(user, partner, user).await;
        }
        info!(user, ?outcome, "evicted banned user");
        outcome
    }

    // ========================================================================
    // Save handshake
    // ========================================================================

    /// Ask the current partner to save this chat for later reconnects.
    pub async fn request_save(&self, user: UserId) -> MatchResult<Submission> {
        self.submit_request(HandshakeKind::Save, user, TargetSpec::CurrentPartner)
            .await
            .map(|(_, submission)| submission)
    }

    /// Accept a pending save request; commits the mutual saved pairing.
    pub async fn accept_save(&self, user: UserId) -> MatchResult<UserId> {
        self.accept_request(HandshakeKind::Save, user).await
    }

    /// Decline a pending save request.
    pub async fn decline_save(&self, user: UserId) -> MatchResult<UserId> {
        self.decline_request(HandshakeKind::Save, user).await
    }

    /// Withdraw one's own outstanding save request.
    pub async fn cancel_save(&self, user: UserId) -> MatchResult<UserId> {
        self.cancel_request(HandshakeKind::Save, user).await
    }

    // ========================================================================
    // Reconnect handshake
    // ========================================================================

    /// Ask a saved partner to start a new chat.
    pub async fn request_reconnect(
        &self,
        user: UserId,
        target: UserId,
    ) -> MatchResult<Submission> {
        self.submit_request(HandshakeKind::Reconnect, user, TargetSpec::Explicit(target))
            .await
            .map(|(_, submission)| submission)
    }

    /// Accept a pending reconnect request; commits a new session.
    pub async fn accept_reconnect(&self, user: UserId) -> MatchResult<UserId> {
        self.accept_request(HandshakeKind::Reconnect, user).await
    }

    /// Decline a pending reconnect request.
    pub async fn decline_reconnect(&self, user: UserId) -> MatchResult<UserId> {
        self.decline_request(HandshakeKind::Reconnect, user).await
    }

    /// Withdraw one's own outstanding reconnect request.
    pub async fn cancel_reconnect(&self, user: UserId) -> MatchResult<UserId> {
        self.cancel_request(HandshakeKind::Reconnect, user).await
    }

    /// Remove a saved pairing. Unlike creating one, this is unilateral.
    pub async fn forget(&self, user: UserId, target: UserId) -> MatchResult<()> {
        {
            let mut state = self.state.lock().await;
            // A pending reconnect between the two is now pointless.
            state.reconnect_requests.clear_between(user, target);
            if !self.directory.delete_saved_pairing(user, target).await? {
                return Err(MatchError::Ineligible(IneligibleReason::NoMutualSave));
            }
        }
        self.send(target, Event::SaveForgotten { by: user }).await;
        Ok(())
    }

    // ========================================================================
    // Introspection (UI state rendering; never gates race-sensitive logic)
    // ========================================================================

    /// The user's current partner, if any.
    pub async fn partner_of(&self, user: UserId) -> Option<UserId> {
        self.state.lock().await.sessions.partner_of(user)
    }

    /// Whether the user is currently in the waiting pool.
    pub async fn is_waiting(&self, user: UserId) -> bool {
        self.state.lock().await.pool.contains(user)
    }

    /// Number of active sessions.
    pub async fn session_count(&self) -> usize {
        self.state.lock().await.sessions.session_count()
    }

    /// Number of users waiting for a partner.
    pub async fn waiting_count(&self) -> usize {
        self.state.lock().await.pool.len()
    }

    /// Check the global invariants (mutual exclusivity + registry symmetry).
    pub async fn invariants_hold(&self) -> bool {
        self.state.lock().await.invariants_hold()
    }

    /// Notify a user that their command was rejected.
    pub async fn reject(&self, user: UserId, error: &MatchError) {
        self.send(
            user,
            Event::Rejected {
                code: error.error_code(),
                message: error.user_message(),
            },
        )
        .await;
    }

    // ========================================================================
    // Pairing internals
    // ========================================================================

    /// One pairing pass for `seeker`: pick a candidate uniformly at random,
    /// recheck their ban status, and commit the session atomically.
    ///
    /// Runs entirely under the guard. Selection is deliberately preference-
    /// free so no waiting user can be starved by scoring skew.
    async fn pairing_pass(
        &self,
        state: &mut CoreState,
        seeker: UserId,
    ) -> MatchResult<Option<UserId>> {
        let mut candidates = state.pool.candidates(seeker);
        candidates.shuffle(&mut rand::thread_rng());

        for candidate in candidates {
            // Ban status is rechecked at selection time, not enqueue time,
            // to close the ban race.
            match self.directory.is_banned(candidate).await {
                Ok(false) => {}
                Ok(true) => {
                    state.pool.remove(candidate);
                    state.cancel_retry(candidate);
                    info!(user = candidate, "dropped banned user from waiting pool");
                    continue;
                }
                Err(e) => {
                    warn!(user = candidate, error = %e, "ban lookup failed; skipping candidate");
                    continue;
                }
            }

            state.pool.remove(seeker);
            state.pool.remove(candidate);
            state.cancel_retry(seeker);
            state.cancel_retry(candidate);

            if let Err(e) = state.sessions.pair(seeker, candidate) {
                error!(seeker, candidate, error = %e, "pairing invariant breach; reconciling");
                state.sessions.unpair(seeker);
                state.sessions.unpair(candidate);
                return Err(e);
            }
            debug!(seeker, candidate, "paired");
            return Ok(Some(candidate));
        }
        Ok(None)
    }

    /// Register a fresh retry task for a waiting user. Guard must be held.
    fn spawn_retry(self: &Arc<Self>, state: &mut CoreState, user: UserId) {
        state.cancel_retry(user);
        let ticket = self.next_ticket.fetch_add(1, Ordering::Relaxed);
        let task = retry::spawn(Arc::clone(self), user, ticket);
        state.retries.insert(user, RetryHandle { ticket, task });
        debug!(user, ticket, "retry task started");
    }

    pub(crate) fn retry_interval(&self) -> Duration {
        self.matching.retry_interval()
    }

    /// One tick of a user's retry task.
    ///
    /// The tick proves it is still the registered task for this user (ticket
    /// match, under the guard) before touching anything, so a task that
    /// outlived its cancellation can never resurrect a paired or banned user.
    pub(crate) async fn retry_tick(&self, user: UserId, ticket: u64) -> TickOutcome {
        let mut notifications: Vec<(UserId, Event)> = Vec::new();
        let outcome = {
            let mut state = self.state.lock().await;
            // Take our own handle out first so the pairing pass's cancel
            // bookkeeping cannot abort the task that is running this tick.
            let own = match state.retries.remove(&user) {
                Some(handle) if handle.ticket == ticket => handle,
                Some(newer) => {
                    state.retries.insert(user, newer);
                    return TickOutcome::Cancelled;
                }
                None => return TickOutcome::Cancelled,
            };
            if !state.pool.contains(user) {
                // Pool removal should have cancelled us in the same critical
                // section; treat as cancelled either way.
                return TickOutcome::Cancelled;
            }

            // The seeker's own ban is rechecked each tick, same as `find`.
            match self.directory.is_banned(user).await {
                Ok(false) => {}
                Ok(true) => {
                    state.pool.remove(user);
                    info!(user, "dropped banned user from waiting pool");
                    return TickOutcome::Cancelled;
                }
                Err(e) => {
                    warn!(user, error = %e, "ban lookup failed during retry");
                    state.retries.insert(user, own);
                    return TickOutcome::Continue;
                }
            }

            match self.pairing_pass(&mut state, user).await {
                Ok(Some(partner)) => {
                    notifications.push((user, Event::MatchFound { partner }));
                    notifications.push((partner, Event::MatchFound { partner: user }));
                    TickOutcome::Matched { partner }
                }
                Ok(None) => {
                    let attempt = state.pool.bump_attempts(user).unwrap_or(0);
                    if attempt >= self.matching.max_retry_attempts {
                        state.pool.remove(user);
                        notifications.push((user, Event::SearchExhausted));
                        debug!(user, attempt, "search exhausted");
                        TickOutcome::Exhausted
                    } else {
                        let every = self.matching.searching_notice_every;
                        if every > 0 && attempt % every == 0 {
                            notifications.push((user, Event::StillSearching { attempt }));
                        }
                        state.retries.insert(user, own);
                        TickOutcome::Continue
                    }
                }
                Err(e) => {
                    error!(user, error = %e, "pairing pass failed during retry");
                    state.retries.insert(user, own);
                    TickOutcome::Continue
                }
            }
        };

        if let TickOutcome::Matched { partner } = outcome {
            self.record_start(user, partner).await;
        }
        self.send_all(notifications).await;
        outcome
    }

    // ========================================================================
    // Handshake internals
    // ========================================================================

    fn broker(state: &CoreState, kind: HandshakeKind) -> &crate::state::RequestBroker {
        match kind {
            HandshakeKind::Save => &state.save_requests,
            HandshakeKind::Reconnect => &state.reconnect_requests,
        }
    }

    fn broker_mut(state: &mut CoreState, kind: HandshakeKind) -> &mut crate::state::RequestBroker {
        match kind {
            HandshakeKind::Save => &mut state.save_requests,
            HandshakeKind::Reconnect => &mut state.reconnect_requests,
        }
    }

    /// Kind-specific eligibility predicate. Evaluated under the guard at
    /// both submit and accept time, with directory reads awaited inside the
    /// critical section so they stay consistent with the commit.
    async fn check_eligibility(
        &self,
        state: &CoreState,
        kind: HandshakeKind,
        requester: UserId,
        target: UserId,
    ) -> MatchResult<()> {
        match kind {
            HandshakeKind::Save => {
                if state.sessions.partner_of(requester) != Some(target) {
                    return Err(MatchError::Ineligible(IneligibleReason::NotPairedWithTarget));
                }
                if self.directory.has_mutual_save(requester, target).await? {
                    return Err(MatchError::Ineligible(IneligibleReason::AlreadySaved));
                }
                let cap = self.handshake.saved_pairing_cap;
                if self.directory.saved_pairing_count(requester).await? >= cap
                    || self.directory.saved_pairing_count(target).await? >= cap
                {
                    return Err(MatchError::Ineligible(IneligibleReason::SaveCapReached));
                }
            }
            HandshakeKind::Reconnect => {
                if !state.is_idle(requester) {
                    return Err(MatchError::Ineligible(IneligibleReason::RequesterBusy));
                }
                if !state.is_idle(target) {
                    return Err(MatchError::Ineligible(IneligibleReason::TargetBusy));
                }
                if self.directory.is_banned(requester).await? {
                    return Err(MatchError::Banned);
                }
                if self.directory.is_banned(target).await? {
                    return Err(MatchError::Ineligible(IneligibleReason::TargetBanned));
                }
                if !self.directory.has_mutual_save(requester, target).await? {
                    return Err(MatchError::Ineligible(IneligibleReason::NoMutualSave));
                }
            }
        }
        Ok(())
    }

    async fn submit_request(
        &self,
        kind: HandshakeKind,
        requester: UserId,
        target_spec: TargetSpec,
    ) -> MatchResult<(UserId, Submission)> {
        let (target, submission) = {
            let mut state = self.state.lock().await;
            let target = match target_spec {
                TargetSpec::CurrentPartner => state
                    .sessions
                    .partner_of(requester)
                    .ok_or(MatchError::NotInSession)?,
                TargetSpec::Explicit(target) => target,
            };

            let existing = Self::broker(&state, kind).peek(target).map(|r| r.requester);
            let submission = match existing {
                Some(holder) if holder == requester => Submission::Resent,
                Some(_) => return Err(MatchError::RequestConflict),
                None => {
                    self.check_eligibility(&state, kind, requester, target)
                        .await?;
                    Self::broker_mut(&mut state, kind).submit(requester, target)?
                }
            };
            (target, submission)
        };

        if submission == Submission::Submitted {
            let event = match kind {
                HandshakeKind::Save => Event::SaveRequested { from: requester },
                HandshakeKind::Reconnect => Event::ReconnectRequested { from: requester },
            };
            self.send(target, event).await;
        }
        Ok((target, submission))
    }

    async fn accept_request(&self, kind: HandshakeKind, target: UserId) -> MatchResult<UserId> {
        let (requester, verdict) = {
            let mut state = self.state.lock().await;
            // The request is a single-use ticket: consumed now, regardless
            // of whether the accept goes on to succeed.
            let Some(request) = Self::broker_mut(&mut state, kind).take(target) else {
                return Err(MatchError::NoPendingRequest);
            };
            let requester = request.requester;

            // Re-validate: the world may have changed since submission.
            let verdict = match self
                .check_eligibility(&state, kind, requester, target)
                .await
            {
                Ok(()) => match kind {
                    HandshakeKind::Save => self
                        .directory
                        .create_saved_pairing(requester, target)
                        .await
                        .map_err(MatchError::from),
                    HandshakeKind::Reconnect => state.sessions.pair(requester, target),
                },
                Err(e) => Err(e),
            };
            (requester, verdict)
        };

        match verdict {
            Ok(()) => {
                match kind {
                    HandshakeKind::Save => {
                        self.send_all(vec![
                            (requester, Event::SaveAccepted),
                            (target, Event::SaveAccepted),
                        ])
                        .await;
                    }
                    HandshakeKind::Reconnect => {
                        self.announce_reconnect(requester, target).await;
                    }
                }
                Ok(requester)
            }
            Err(e) => {
                debug!(requester, target, ?kind, code = e.error_code(), "handshake accept failed");
                let reason = e.user_message().to_string();
                let event = match kind {
                    HandshakeKind::Save => Event::SaveFailed { reason },
                    HandshakeKind::Reconnect => Event::ReconnectFailed { reason },
                };
                self.send(requester, event).await;
                Err(e)
            }
        }
    }

    async fn decline_request(&self, kind: HandshakeKind, target: UserId) -> MatchResult<UserId> {
        let requester = {
            let mut state = self.state.lock().await;
            Self::broker_mut(&mut state, kind)
                .take(target)
                .ok_or(MatchError::NoPendingRequest)?
                .requester
        };
        let event = match kind {
            HandshakeKind::Save => Event::SaveDeclined,
            HandshakeKind::Reconnect => Event::ReconnectDeclined,
        };
        self.send(requester, event).await;
        Ok(requester)
    }

    async fn cancel_request(&self, kind: HandshakeKind, requester: UserId) -> MatchResult<UserId> {
        let target = {
            let mut state = self.state.lock().await;
            Self::broker_mut(&mut state, kind)
                .cancel_by(requester)
                .ok_or(MatchError::NoPendingRequest)?
        };
        let event = match kind {
            HandshakeKind::Save => Event::SaveCancelled,
            HandshakeKind::Reconnect => Event::ReconnectCancelled,
        };
        self.send(target, event).await;
        Ok(target)
    }

    /// Drop every pending handshake request naming either participant of a
    /// session that just ended. Guard must be held.
    fn clear_session_requests(state: &mut CoreState, a: UserId, b: UserId) {
        for user in [a, b] {
            let saves = state.save_requests.clear_involving(user);
            let reconnects = state.reconnect_requests.clear_involving(user);
            if !saves.is_empty() || !reconnects.is_empty() {
                debug!(user, "cleared pending handshake requests");
            }
        }
    }

    // ========================================================================
    // Outbound plumbing (never under the guard)
    // ========================================================================

    async fn send(&self, user: UserId, event: Event) {
        if let Err(e) = self.notifier.notify(user, event).await {
            warn!(user, error = %e, "notification failed");
        }
    }

    async fn send_all(&self, batch: Vec<(UserId, Event)>) {
        join_all(
            batch
                .into_iter()
                .map(|(user, event)| self.send(user, event)),
        )
        .await;
    }

    async fn announce_match(&self, a: UserId, b: UserId) {
        self.send_all(vec![
            (a, Event::MatchFound { partner: b }),
            (b, Event::MatchFound { partner: a }),
        ])
        .await;
        self.record_start(a, b).await;
    }

    async fn announce_reconnect(&self, a: UserId, b: UserId) {
        self.send_all(vec![
            (a, Event::ReconnectAccepted { partner: b }),
            (b, Event::ReconnectAccepted { partner: a }),
        ])
        .await;
        self.record_start(a, b).await;
    }

    /// Best-effort bookkeeping; in-memory state stays authoritative.
    async fn record_start(&self, a: UserId, b: UserId) {
        if let Err(e) = self.directory.record_session_start(a, b).await {
            warn!(user_a = a, user_b = b, error = %e, "failed to record session start");
        }
    }

    async fn record_end(&self, a: UserId, b: UserId, ended_by: UserId) {
        if let Err(e) = self.directory.record_session_end(a, b, ended_by).await {
            warn!(user_a = a, user_b = b, error = %e, "failed to record session end");
        }
    }
}
