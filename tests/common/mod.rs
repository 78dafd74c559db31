//! Shared test doubles: an in-memory directory and a recording notifier.

// Each integration test binary compiles this module separately and uses a
// different subset of it.
#![allow(dead_code)]

use async_trait::async_trait;
use pairlink::{
    Config, Directory, DirectoryError, Event, MatchEngine, Notifier, NotifyError, UserId,
};
use std::collections::HashSet;
use std::sync::{Arc, Mutex, Once};
use tracing_subscriber::EnvFilter;

static TRACING: Once = Once::new();

/// Install a per-process tracing subscriber so `RUST_LOG` works in tests.
pub fn init_tracing() {
    TRACING.call_once(|| {
        tracing_subscriber::fmt()
            .with_env_filter(
                EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
            )
            .with_test_writer()
            .init();
    });
}

/// In-memory `Directory` with helpers for seeding bans and saved pairings.
#[derive(Default)]
pub struct MemoryDirectory {
    inner: Mutex<Inner>,
}

#[derive(Default)]
struct Inner {
    banned: HashSet<UserId>,
    /// Users whose ban lookups fail, to exercise degraded-directory paths.
    failing: HashSet<UserId>,
    saves: HashSet<(UserId, UserId)>,
    sessions_started: Vec<(UserId, UserId)>,
    sessions_ended: Vec<(UserId, UserId, UserId)>,
}

fn ordered(a: UserId, b: UserId) -> (UserId, UserId) {
    if a <= b { (a, b) } else { (b, a) }
}

impl MemoryDirectory {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn ban(&self, user: UserId) {
        self.inner.lock().unwrap().banned.insert(user);
    }

    pub fn seed_save(&self, a: UserId, b: UserId) {
        self.inner.lock().unwrap().saves.insert(ordered(a, b));
    }

    pub fn fail_ban_lookups_for(&self, user: UserId) {
        self.inner.lock().unwrap().failing.insert(user);
    }

    pub fn restore_ban_lookups_for(&self, user: UserId) {
        self.inner.lock().unwrap().failing.remove(&user);
    }

    pub fn sessions_started(&self) -> Vec<(UserId, UserId)> {
        self.inner.lock().unwrap().sessions_started.clone()
    }

    pub fn sessions_ended(&self) -> Vec<(UserId, UserId, UserId)> {
        self.inner.lock().unwrap().sessions_ended.clone()
    }
}

#[async_trait]
impl Directory for MemoryDirectory {
    async fn is_banned(&self, user: UserId) -> Result<bool, DirectoryError> {
        let inner = self.inner.lock().unwrap();
        if inner.failing.contains(&user) {
            return Err(DirectoryError::Internal("ban lookup unavailable".into()));
        }
        Ok(inner.banned.contains(&user))
    }

    async fn saved_pairing_count(&self, user: UserId) -> Result<u32, DirectoryError> {
        let inner = self.inner.lock().unwrap();
        Ok(inner
            .saves
            .iter()
            .filter(|(lo, hi)| *lo == user || *hi == user)
            .count() as u32)
    }

    async fn has_mutual_save(&self, a: UserId, b: UserId) -> Result<bool, DirectoryError> {
        Ok(self.inner.lock().unwrap().saves.contains(&ordered(a, b)))
    }

    async fn create_saved_pairing(&self, a: UserId, b: UserId) -> Result<(), DirectoryError> {
        self.inner.lock().unwrap().saves.insert(ordered(a, b));
        Ok(())
    }

    async fn delete_saved_pairing(&self, a: UserId, b: UserId) -> Result<bool, DirectoryError> {
        Ok(self.inner.lock().unwrap().saves.remove(&ordered(a, b)))
    }

    async fn record_session_start(&self, a: UserId, b: UserId) -> Result<(), DirectoryError> {
        self.inner.lock().unwrap().sessions_started.push((a, b));
        Ok(())
    }

    async fn record_session_end(
        &self,
        a: UserId,
        b: UserId,
        ended_by: UserId,
    ) -> Result<(), DirectoryError> {
        self.inner
            .lock()
            .unwrap()
            .sessions_ended
            .push((a, b, ended_by));
        Ok(())
    }
}

/// `Notifier` that records every event for assertions.
#[derive(Default)]
pub struct RecordingNotifier {
    events: Mutex<Vec<(UserId, Event)>>,
}

impl RecordingNotifier {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn events_for(&self, user: UserId) -> Vec<Event> {
        self.events
            .lock()
            .unwrap()
            .iter()
            .filter(|(u, _)| *u == user)
            .map(|(_, e)| e.clone())
            .collect()
    }

    pub fn received(&self, user: UserId, event: &Event) -> bool {
        self.events_for(user).contains(event)
    }

    pub fn count_for(&self, user: UserId, event: &Event) -> usize {
        self.events_for(user).iter().filter(|e| *e == event).count()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn notify(&self, user: UserId, event: Event) -> Result<(), NotifyError> {
        self.events.lock().unwrap().push((user, event));
        Ok(())
    }
}

/// Engine wired to the test doubles, with fast retry settings.
pub fn test_engine(
    directory: Arc<MemoryDirectory>,
    notifier: Arc<RecordingNotifier>,
) -> Arc<MatchEngine> {
    init_tracing();
    let mut config = Config::default();
    config.matching.retry_interval_secs = 1;
    config.matching.max_retry_attempts = 3;
    config.matching.searching_notice_every = 1;
    MatchEngine::new(&config, directory, notifier)
}
