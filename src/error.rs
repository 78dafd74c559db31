//! Unified error handling for pairlink.
//!
//! Every rejected operation maps to a specific, distinguishable user-facing
//! message so the caller can tell the user whether to retry, wait, or take a
//! different action. Errors also carry a static code string for log labeling.

use crate::directory::DirectoryError;
use thiserror::Error;

/// Why a handshake (save or reconnect) is not eligible to proceed.
///
/// Eligibility is evaluated when a request is submitted and re-evaluated at
/// accept time, so any of these can surface at either point.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum IneligibleReason {
    #[error("you are not currently chatting with that partner")]
    NotPairedWithTarget,

    #[error("saved partner limit reached")]
    SaveCapReached,

    #[error("this partner is already saved")]
    AlreadySaved,

    #[error("no saved pairing exists with that partner")]
    NoMutualSave,

    #[error("you are busy (searching or chatting)")]
    RequesterBusy,

    #[error("that partner is busy (searching or chatting)")]
    TargetBusy,

    #[error("that partner is no longer available")]
    TargetBanned,

    #[error("your partner is no longer here")]
    PartnerGone,
}

/// Errors that can occur during matchmaking and handshake operations.
///
/// All variants are non-fatal and are returned to the immediate caller for
/// user-facing messaging. No operation retries or silently recovers.
#[derive(Debug, Error)]
pub enum MatchError {
    #[error("already in an active chat")]
    AlreadyPaired,

    #[error("already searching for a partner")]
    AlreadyWaiting,

    #[error("not in an active chat")]
    NotInSession,

    #[error("not currently searching")]
    NotWaiting,

    #[error("account is suspended")]
    Banned,

    #[error("target already has a pending request")]
    RequestConflict,

    #[error("no pending request")]
    NoPendingRequest,

    #[error("not eligible: {0}")]
    Ineligible(IneligibleReason),

    /// Invariant breach. Unreachable while all mutations go through the
    /// guard; if it fires it is a logic bug, logged at error severity, and
    /// the involved sessions are forcibly reconciled.
    #[error("invalid pairing: {0}")]
    InvalidPairing(String),

    #[error("persistence error: {0}")]
    Persistence(#[from] DirectoryError),
}

impl MatchError {
    /// Get a static error code string for log labeling.
    #[inline]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::AlreadyPaired => "already_paired",
            Self::AlreadyWaiting => "already_waiting",
            Self::NotInSession => "not_in_session",
            Self::NotWaiting => "not_waiting",
            Self::Banned => "banned",
            Self::RequestConflict => "request_conflict",
            Self::NoPendingRequest => "no_pending_request",
            Self::Ineligible(_) => "ineligible",
            Self::InvalidPairing(_) => "invalid_pairing",
            Self::Persistence(_) => "persistence_error",
        }
    }

    /// User-facing text for this rejection.
    ///
    /// Every variant produces a distinct message; internal failures get a
    /// generic one since their details belong in logs, not chat bubbles.
    pub fn user_message(&self) -> &'static str {
        match self {
            Self::AlreadyPaired => "You're already in a chat. Use skip or stop first.",
            Self::AlreadyWaiting => "Already searching for a partner...",
            Self::NotInSession => "You're not currently in a chat.",
            Self::NotWaiting => "You're not searching right now.",
            Self::Banned => "Your account is suspended.",
            Self::RequestConflict => "That partner already has a pending request.",
            Self::NoPendingRequest => "There's no pending request to act on.",
            Self::Ineligible(reason) => match reason {
                IneligibleReason::NotPairedWithTarget => {
                    "You can only do that during an active chat with that partner."
                }
                IneligibleReason::SaveCapReached => {
                    "Saved partner limit reached. Forget one to save another."
                }
                IneligibleReason::AlreadySaved => "You've already saved this partner.",
                IneligibleReason::NoMutualSave => "You don't have a saved pairing with that user.",
                IneligibleReason::RequesterBusy => {
                    "Finish your current search or chat before reconnecting."
                }
                IneligibleReason::TargetBusy => "That partner is busy right now. Try again later.",
                IneligibleReason::TargetBanned => "That partner is no longer available.",
                IneligibleReason::PartnerGone => "Your partner is no longer here.",
            },
            Self::InvalidPairing(_) | Self::Persistence(_) => {
                "Something went wrong. Please try again."
            }
        }
    }
}

/// Result type for matchmaking operations.
pub type MatchResult<T> = Result<T, MatchError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_codes_are_stable() {
        assert_eq!(MatchError::AlreadyPaired.error_code(), "already_paired");
        assert_eq!(MatchError::Banned.error_code(), "banned");
        assert_eq!(
            MatchError::Ineligible(IneligibleReason::SaveCapReached).error_code(),
            "ineligible"
        );
    }

    #[test]
    fn user_messages_are_distinct_per_rejection() {
        let msgs = [
            MatchError::AlreadyPaired.user_message(),
            MatchError::AlreadyWaiting.user_message(),
            MatchError::NotInSession.user_message(),
            MatchError::NotWaiting.user_message(),
            MatchError::Banned.user_message(),
            MatchError::RequestConflict.user_message(),
            MatchError::NoPendingRequest.user_message(),
            MatchError::Ineligible(IneligibleReason::SaveCapReached).user_message(),
            MatchError::Ineligible(IneligibleReason::TargetBusy).user_message(),
        ];
        let unique: std::collections::HashSet<_> = msgs.iter().collect();
        assert_eq!(unique.len(), msgs.len());
    }
}
