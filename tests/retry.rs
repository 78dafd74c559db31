//! Background retry task tests, run against a paused clock.
//!
//! Test config: 1s interval, 3 attempts, progress notice every attempt.

mod common;

use common::{MemoryDirectory, RecordingNotifier, test_engine};
use pairlink::{Event, FindOutcome, MatchError, StopOutcome};
use std::sync::Arc;
use std::time::Duration;

const ALICE: i64 = 1001;
const BOB: i64 = 1002;

async fn advance(secs: u64) {
    // Sleep slightly past the requested boundary: a tick scheduled exactly at
    // `secs` shares its deadline with this sleep, and the runtime may poll the
    // test future before the retry task. The slack stays well under the next
    // 1s tick, so no extra ticks are observed.
    tokio::time::sleep(Duration::from_millis(secs * 1000 + 500)).await;
}

#[tokio::test(start_paused = true)]
async fn lone_seeker_exhausts_after_attempt_budget() {
    let dir = MemoryDirectory::new();
    let notif = RecordingNotifier::new();
    let engine = test_engine(dir, Arc::clone(&notif));

    assert_eq!(engine.find(ALICE).await.unwrap(), FindOutcome::Searching);
    advance(10).await;

    assert!(!engine.is_waiting(ALICE).await);
    assert_eq!(
        notif.events_for(ALICE),
        vec![
            Event::Searching,
            Event::StillSearching { attempt: 1 },
            Event::StillSearching { attempt: 2 },
            Event::SearchExhausted,
        ]
    );
}

#[tokio::test(start_paused = true)]
async fn stop_silences_the_retry_task() {
    let dir = MemoryDirectory::new();
    let notif = RecordingNotifier::new();
    let engine = test_engine(dir, Arc::clone(&notif));

    engine.find(ALICE).await.unwrap();
    assert_eq!(
        engine.stop(ALICE).await.unwrap(),
        StopOutcome::SearchCancelled
    );

    // No ticks ran before the stop; none may fire after it.
    advance(10).await;
    assert_eq!(
        notif.events_for(ALICE),
        vec![Event::Searching, Event::SearchStopped]
    );
}

#[tokio::test(start_paused = true)]
async fn matching_from_the_other_side_cancels_retry() {
    let dir = MemoryDirectory::new();
    let notif = RecordingNotifier::new();
    let engine = test_engine(dir, Arc::clone(&notif));

    engine.find(ALICE).await.unwrap();
    advance(1).await;
    assert!(notif.received(ALICE, &Event::StillSearching { attempt: 1 }));

    assert_eq!(
        engine.find(BOB).await.unwrap(),
        FindOutcome::Matched { partner: ALICE }
    );

    // Alice's task is gone: no further progress or exhaustion notices.
    advance(10).await;
    assert_eq!(
        notif.events_for(ALICE),
        vec![
            Event::Searching,
            Event::StillSearching { attempt: 1 },
            Event::MatchFound { partner: BOB },
        ]
    );
}

#[tokio::test(start_paused = true)]
async fn retry_tick_pairs_two_waiting_users() {
    let dir = MemoryDirectory::new();
    let notif = RecordingNotifier::new();
    let engine = test_engine(Arc::clone(&dir), Arc::clone(&notif));

    engine.find(ALICE).await.unwrap();

    // Bob's immediate pass skips Alice while her ban lookup is failing, so
    // both end up waiting at once.
    dir.fail_ban_lookups_for(ALICE);
    assert_eq!(engine.find(BOB).await.unwrap(), FindOutcome::Searching);
    dir.restore_ban_lookups_for(ALICE);

    advance(1).await;
    assert_eq!(engine.partner_of(ALICE).await, Some(BOB));
    assert!(notif.received(ALICE, &Event::MatchFound { partner: BOB }));
    assert!(notif.received(BOB, &Event::MatchFound { partner: ALICE }));
    assert_eq!(engine.session_count().await, 1);
    assert_eq!(engine.waiting_count().await, 0);
    assert!(engine.invariants_hold().await);
    assert_eq!(dir.sessions_started().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn cancel_search_is_idempotent_and_silences_retry() {
    let dir = MemoryDirectory::new();
    let notif = RecordingNotifier::new();
    let engine = test_engine(dir, Arc::clone(&notif));

    assert!(matches!(
        engine.cancel_search(ALICE).await,
        Err(MatchError::NotWaiting)
    ));

    engine.find(ALICE).await.unwrap();
    engine.cancel_search(ALICE).await.unwrap();
    assert!(matches!(
        engine.cancel_search(ALICE).await,
        Err(MatchError::NotWaiting)
    ));
    assert!(!engine.is_waiting(ALICE).await);

    advance(10).await;
    assert_eq!(
        notif.events_for(ALICE),
        vec![Event::Searching, Event::SearchStopped]
    );
}

#[tokio::test(start_paused = true)]
async fn banned_waiting_user_is_dropped_by_retry_tick() {
    let dir = MemoryDirectory::new();
    let notif = RecordingNotifier::new();
    let engine = test_engine(Arc::clone(&dir), Arc::clone(&notif));

    engine.find(ALICE).await.unwrap();
    dir.ban(ALICE);

    advance(1).await;
    assert!(!engine.is_waiting(ALICE).await);

    // Alice is out of the pool, so a new seeker finds nobody.
    assert_eq!(engine.find(BOB).await.unwrap(), FindOutcome::Searching);
    assert_eq!(notif.events_for(ALICE), vec![Event::Searching]);
}

#[tokio::test(start_paused = true)]
async fn exhausted_search_can_start_again() {
    let dir = MemoryDirectory::new();
    let notif = RecordingNotifier::new();
    let engine = test_engine(dir, Arc::clone(&notif));

    engine.find(ALICE).await.unwrap();
    advance(10).await;
    assert!(notif.received(ALICE, &Event::SearchExhausted));

    // A fresh find after exhaustion is a brand new search.
    assert_eq!(engine.find(ALICE).await.unwrap(), FindOutcome::Searching);
    assert!(engine.is_waiting(ALICE).await);
    assert_eq!(
        engine.find(BOB).await.unwrap(),
        FindOutcome::Matched { partner: ALICE }
    );
}
