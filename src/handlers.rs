//! Thin command dispatch.
//!
//! Transports parse whatever their platform gives them (slash commands,
//! callback buttons) into a [`Command`] and hand it here. Dispatch routes to
//! the engine and converts every rejection into an
//! [`Event::Rejected`](crate::notify::Event::Rejected) notification so the
//! user always sees a specific, actionable message.
//!
//! Callers that need an operation's result value (e.g. the reported partner
//! id for filing a moderation record after `Report`) should call the
//! corresponding engine method directly instead.

use crate::engine::MatchEngine;
use crate::error::{MatchError, MatchResult};
use crate::state::UserId;
use std::sync::Arc;
use tracing::{debug, error, info};

/// The command surface exposed to transports.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Find,
    Skip,
    Stop,
    Report,
    RequestSave,
    AcceptSave,
    DeclineSave,
    CancelSave,
    RequestReconnect { target: UserId },
    AcceptReconnect,
    DeclineReconnect,
    CancelReconnect,
    Forget { target: UserId },
}

impl Command {
    /// Command name for logging.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Find => "find",
            Self::Skip => "skip",
            Self::Stop => "stop",
            Self::Report => "report",
            Self::RequestSave => "request_save",
            Self::AcceptSave => "accept_save",
            Self::DeclineSave => "decline_save",
            Self::CancelSave => "cancel_save",
            Self::RequestReconnect { .. } => "request_reconnect",
            Self::AcceptReconnect => "accept_reconnect",
            Self::DeclineReconnect => "decline_reconnect",
            Self::CancelReconnect => "cancel_reconnect",
            Self::Forget { .. } => "forget",
        }
    }
}

/// Route a command to the engine, notifying the user on rejection.
pub async fn dispatch(
    engine: &Arc<MatchEngine>,
    user: UserId,
    command: Command,
) -> MatchResult<()> {
    let result = match command {
        Command::Find => engine.find(user).await.map(|_| ()),
        Command::Skip => engine.skip(user).await.map(|_| ()),
        Command::Stop => engine.stop(user).await.map(|_| ()),
        Command::Report => engine.report(user).await.map(|outcome| {
            info!(reporter = user, reported = outcome.reported, "report filed");
        }),
        Command::RequestSave => engine.request_save(user).await.map(|_| ()),
        Command::AcceptSave => engine.accept_save(user).await.map(|_| ()),
        Command::DeclineSave => engine.decline_save(user).await.map(|_| ()),
        Command::CancelSave => engine.cancel_save(user).await.map(|_| ()),
        Command::RequestReconnect { target } => {
            engine.request_reconnect(user, target).await.map(|_| ())
        }
        Command::AcceptReconnect => engine.accept_reconnect(user).await.map(|_| ()),
        Command::DeclineReconnect => engine.decline_reconnect(user).await.map(|_| ()),
        Command::CancelReconnect => engine.cancel_reconnect(user).await.map(|_| ()),
        Command::Forget { target } => engine.forget(user, target).await,
    };

    if let Err(e) = &result {
        match e {
            MatchError::Persistence(_) | MatchError::InvalidPairing(_) => {
                error!(user, command = command.name(), code = e.error_code(), error = %e, "command failed");
            }
            _ => {
                debug!(user, command = command.name(), code = e.error_code(), "command rejected");
            }
        }
        engine.reject(user, e).await;
    }
    result
}
