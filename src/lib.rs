//! pairlink - anonymous chat matchmaking and session coordination core.
//!
//! Pairs concurrent users for one-to-one relayed conversation and
//! coordinates the lifecycle of those pairings: a waiting pool, a random
//! pairing pass with bounded background retry, a symmetric session registry,
//! and a mutual-consent handshake used for "save this chat" and "reconnect
//! to a saved partner".
//!
//! The crate is transport-agnostic. It consumes two injected seams - a
//! [`Notifier`] that delivers events to users and a [`Directory`] that holds
//! durable data (ban flags, saved pairings, session bookkeeping) - and
//! exposes its operations to thin command handlers via [`MatchEngine`] and
//! [`handlers::dispatch`].
//!
//! ```no_run
//! use pairlink::{Config, MatchEngine, SqliteDirectory};
//! use std::sync::Arc;
//!
//! # async fn example(notifier: Arc<dyn pairlink::Notifier>) -> Result<(), Box<dyn std::error::Error>> {
//! let config = Config::default();
//! let directory = Arc::new(SqliteDirectory::new(":memory:").await?);
//! let engine = MatchEngine::new(&config, directory, notifier);
//!
//! match engine.find(1001).await? {
//!     pairlink::FindOutcome::Matched { partner } => println!("paired with {partner}"),
//!     pairlink::FindOutcome::Searching => println!("searching..."),
//! }
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod db;
pub mod directory;
pub mod engine;
pub mod error;
pub mod handlers;
pub mod notify;
pub mod state;

pub use config::{Config, ConfigError};
pub use db::SqliteDirectory;
pub use directory::{Directory, DirectoryError};
pub use engine::{EvictOutcome, FindOutcome, MatchEngine, ReportOutcome, StopOutcome};
pub use error::{IneligibleReason, MatchError, MatchResult};
pub use handlers::{Command, dispatch};
pub use notify::{Event, Notifier, NotifyError};
pub use state::{Submission, UserId};
