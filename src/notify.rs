//! Outbound notification seam.
//!
//! The engine never talks to a transport directly. Everything a user needs
//! to see is expressed as an [`Event`] and handed to the injected
//! [`Notifier`]. Delivery is fire-and-forget: failures are logged by the
//! engine and never affect core state. Notifications are always dispatched
//! after the state guard has been released.

use crate::state::UserId;
use async_trait::async_trait;
use thiserror::Error;

/// A notification delivery failure. Never fatal to core state.
#[derive(Debug, Error)]
#[error("notification failed: {0}")]
pub struct NotifyError(pub String);

/// Events the core emits toward users.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    /// A partner was found; the session is live.
    MatchFound { partner: UserId },
    /// Search started, no candidate available yet.
    Searching,
    /// Periodic progress notice while the retry task keeps looking.
    StillSearching { attempt: u32 },
    /// The retry task gave up; the user is no longer in the pool.
    SearchExhausted,
    /// The user cancelled their search.
    SearchStopped,
    /// The user ended their own session.
    SessionEnded,
    /// The user's partner left the session (skip, stop, report, or ban).
    PartnerLeft,
    /// The user skipped the current chat and is searching again.
    ChatSkipped,
    /// The user's report was recorded and the session ended.
    ReportFiled,

    /// The user's current partner asks to save this chat.
    SaveRequested { from: UserId },
    SaveAccepted,
    SaveDeclined,
    SaveCancelled,
    SaveFailed { reason: String },
    /// A saved partner removed the pairing.
    SaveForgotten { by: UserId },

    /// A saved partner asks to reconnect.
    ReconnectRequested { from: UserId },
    ReconnectAccepted { partner: UserId },
    ReconnectDeclined,
    ReconnectCancelled,
    ReconnectFailed { reason: String },

    /// A command was rejected; `message` is ready for display.
    Rejected {
        code: &'static str,
        message: &'static str,
    },
}

/// Transport-side message delivery.
///
/// Implementations forward events to the messaging platform (or buffer them
/// in tests). Best-effort: an `Err` is logged by the engine and otherwise
/// ignored.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, user: UserId, event: Event) -> Result<(), NotifyError>;
}
