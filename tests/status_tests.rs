//! Integration tests for the pause and current game mirrors

mod common;

use chrono::{Duration, Utc};
use common::{settle, wait_for, wait_until, PartyFixture, SETTLE_TIMEOUT};
use partysync::store::DocumentData;
use partysync::{
    AuthorizationError, CurrentGame, DocumentStore, GameTitle, PauseMirror, StatusMirror,
    StoreError, SyncError,
};
use std::time::Duration as StdDuration;

fn pause_mirror(fixture: &PartyFixture) -> PauseMirror {
    PauseMirror::new(fixture.store(), fixture.session.clone(), &fixture.config).unwrap()
}

fn status_mirror(fixture: &PartyFixture) -> StatusMirror {
    StatusMirror::new(fixture.store(), fixture.session.clone(), &fixture.config).unwrap()
}

#[tokio::test]
async fn test_null_pause_end_is_not_paused() {
    let fixture = PartyFixture::new();
    let status = fixture.config.party_status_path().unwrap();
    fixture
        .store
        .write_document(
            &status,
            DocumentData::new().with("pauseEnd", serde_json::Value::Null),
            false,
        )
        .await
        .unwrap();

    let mut pause = pause_mirror(&fixture);
    pause.subscribe().await.unwrap();
    let mut state = pause.watch();
    let current = wait_for(&mut state, |s| s.pause_end.is_none()).await;
    assert!(!current.is_paused);
}

#[tokio::test]
async fn test_pause_control_round_trip() {
    let fixture = PartyFixture::new();
    fixture.sign_in("root", true);

    let mut pause = pause_mirror(&fixture);
    pause.subscribe().await.unwrap();
    let mut state = pause.watch();
    assert!(!pause.state().is_paused);

    let end = Utc::now() + Duration::minutes(15);
    pause.set_pause_end(end).await.unwrap();
    let current = wait_for(&mut state, |s| s.is_paused).await;
    let remaining = current.remaining(Utc::now()).unwrap();
    assert!(remaining > Duration::minutes(14));
    assert!(fixture.store.contains("partyStatus/current"));

    pause.clear_pause().await.unwrap();
    wait_for(&mut state, |s| !s.is_paused).await;

    pause.unsubscribe();
    assert!(wait_until(|| fixture.store.subscriber_count("partyStatus/current") == 0).await);
}

#[tokio::test]
async fn test_pause_control_requires_admin() {
    let fixture = PartyFixture::new();
    fixture.sign_in("u1", false);

    let pause = pause_mirror(&fixture);
    assert_eq!(
        pause.set_pause_end(Utc::now()).await,
        Err(SyncError::Authorization(AuthorizationError::NotAdmin))
    );
    assert!(!fixture.store.contains("partyStatus/current"));
}

#[tokio::test]
async fn test_current_game_titles() {
    let fixture = PartyFixture::new();
    fixture.sign_in("root", true);
    fixture.seed_game("g1", "Doom").await;

    let mut status = status_mirror(&fixture);
    status.subscribe().await.unwrap();
    let mut current = status.watch();
    assert_eq!(status.current(), CurrentGame::default());

    status.set_current_game(Some("ghost")).await.unwrap();
    let state = wait_for(&mut current, |c| c.game_id.as_deref() == Some("ghost")).await;
    assert_eq!(state.title, GameTitle::Unknown);
    assert_eq!(state.title.to_string(), "(unknown)");

    status.set_current_game(Some("g1")).await.unwrap();
    let state = wait_for(&mut current, |c| c.game_id.as_deref() == Some("g1")).await;
    assert_eq!(state.title, GameTitle::Known("Doom".to_string()));

    status.set_current_game(None).await.unwrap();
    let state = wait_for(&mut current, |c| c.game_id.is_none()).await;
    assert_eq!(state.title.to_string(), "(none)");

    status.unsubscribe();
}

#[tokio::test]
async fn test_pause_and_status_share_the_document() {
    let fixture = PartyFixture::new();
    fixture.sign_in("root", true);
    fixture.seed_game("g1", "Doom").await;

    let mut pause = pause_mirror(&fixture);
    let mut status = status_mirror(&fixture);
    pause.subscribe().await.unwrap();
    status.subscribe().await.unwrap();

    status.set_current_game(Some("g1")).await.unwrap();
    pause.set_pause_end(Utc::now() + Duration::minutes(5)).await.unwrap();

    let mut paused = pause.watch();
    let mut current = status.watch();
    wait_for(&mut paused, |s| s.is_paused).await;
    let state = wait_for(&mut current, |c| c.title == GameTitle::Known("Doom".to_string())).await;
    assert_eq!(state.game_id.as_deref(), Some("g1"));
    assert_eq!(fixture.store.subscriber_count("partyStatus/current"), 2);

    drop(pause);
    drop(status);
    assert!(wait_until(|| fixture.store.subscriber_count("partyStatus/current") == 0).await);
}

#[tokio::test]
async fn test_pause_stream_failure_is_reported() {
    let fixture = PartyFixture::new();
    fixture.sign_in("root", true);

    let mut pause = pause_mirror(&fixture);
    let mut errors = pause.errors();
    pause.subscribe().await.unwrap();
    pause.set_pause_end(Utc::now() + Duration::minutes(5)).await.unwrap();
    let mut state = pause.watch();
    wait_for(&mut state, |s| s.is_paused).await;
    assert!(pause.is_subscribed());

    let failure = StoreError::PermissionDenied {
        path: "partyStatus/current".to_string(),
    };
    fixture
        .store
        .break_subscriptions("partyStatus/current", failure.clone());

    let reported = tokio::time::timeout(SETTLE_TIMEOUT, errors.recv())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(reported, SyncError::Store(failure));
    assert!(wait_until(|| !pause.is_subscribed()).await);

    // Resubscribing picks up writes made while the mirror was down
    pause.clear_pause().await.unwrap();
    pause.subscribe().await.unwrap();
    wait_for(&mut state, |s| !s.is_paused).await;
    assert!(pause.is_subscribed());
}

#[tokio::test]
async fn test_failed_title_read_is_reported_not_unknown() {
    let fixture = PartyFixture::new();
    fixture.sign_in("root", true);
    fixture.seed_game("g1", "Doom").await;
    fixture.store.fail_reads_at("games/g1");

    let mut status = status_mirror(&fixture);
    let mut errors = status.errors();
    status.subscribe().await.unwrap();
    status.set_current_game(Some("g1")).await.unwrap();

    let reported = tokio::time::timeout(SETTLE_TIMEOUT, errors.recv())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(
        reported,
        SyncError::Store(StoreError::PermissionDenied {
            path: "games/g1".to_string()
        })
    );
    assert_eq!(status.current(), CurrentGame::default());
    assert!(status.is_subscribed());

    fixture.store.clear_faults();
    status.set_current_game(None).await.unwrap();
    status.set_current_game(Some("g1")).await.unwrap();
    let mut current = status.watch();
    let state = wait_for(&mut current, |c| c.game_id.is_some()).await;
    assert_eq!(state.title, GameTitle::Known("Doom".to_string()));
}

#[tokio::test]
async fn test_status_stream_failure_is_reported() {
    let fixture = PartyFixture::new();

    let mut status = status_mirror(&fixture);
    let mut errors = status.errors();
    status.subscribe().await.unwrap();
    assert!(status.is_subscribed());

    let failure = StoreError::Unavailable("connection lost".to_string());
    fixture
        .store
        .break_subscriptions("partyStatus/current", failure.clone());

    let reported = tokio::time::timeout(SETTLE_TIMEOUT, errors.recv())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(reported, SyncError::Store(failure));
    assert!(wait_until(|| !status.is_subscribed()).await);
}

#[tokio::test]
async fn test_empty_current_game_id_means_none() {
    let fixture = PartyFixture::new();
    fixture.sign_in("root", true);
    fixture.seed_game("g1", "Doom").await;

    let mut status = status_mirror(&fixture);
    let mut errors = status.errors();
    status.subscribe().await.unwrap();
    let mut current = status.watch();

    status.set_current_game(Some("g1")).await.unwrap();
    wait_for(&mut current, |c| c.game_id.is_some()).await;

    status.set_current_game(Some("")).await.unwrap();
    let state = wait_for(&mut current, |c| c.game_id.is_none()).await;
    assert_eq!(state.title, GameTitle::None);
    assert_eq!(state.title.to_string(), "(none)");
    assert!(errors.try_recv().is_err());
}

#[tokio::test]
async fn test_dropped_status_mirror_discards_pending_title() {
    let fixture = PartyFixture::new();
    fixture.seed_game("g1", "Doom").await;
    fixture
        .store
        .write_document(
            &fixture.config.party_status_path().unwrap(),
            DocumentData::new().with("currentGameId", "g1"),
            false,
        )
        .await
        .unwrap();
    fixture
        .store
        .set_read_delay(Some(StdDuration::from_millis(300)));

    let mut status = status_mirror(&fixture);
    let current = status.watch();
    status.subscribe().await.unwrap();

    // The title read is now in flight
    settle().await;
    drop(status);

    tokio::time::sleep(StdDuration::from_millis(400)).await;
    assert_eq!(*current.borrow(), CurrentGame::default());
    assert!(!current.has_changed().unwrap_or(false));
}
