//! Status poller timing tests
//!
//! Time is paused, so sleeping two minutes completes instantly while the
//! poller's interval still sees the elapsed time.

mod common;

use std::time::Duration;

use cartpos_core::services::StatusPoller;
use cartpos_core::SessionState;

use common::*;

const PERIOD: Duration = Duration::from_secs(120);

async fn settle() {
    tokio::time::sleep(Duration::from_millis(10)).await;
}

#[tokio::test(start_paused = true)]
async fn test_no_checks_while_signed_out() {
    let h = Harness::new(Reply::User(asha()));
    let _poller = StatusPoller::new(h.manager.clone(), PERIOD).spawn();

    tokio::time::sleep(PERIOD * 5).await;

    assert_eq!(h.backend.verify_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_checks_once_per_interval_while_signed_in() {
    let h = Harness::new(Reply::User(asha()));
    let poller = StatusPoller::new(h.manager.clone(), PERIOD).spawn();

    h.sign_in().await.unwrap();
    settle().await;
    assert_eq!(h.backend.verify_count(), 1);

    tokio::time::sleep(PERIOD - Duration::from_secs(5)).await;
    assert_eq!(h.backend.verify_count(), 1);

    tokio::time::sleep(Duration::from_secs(10)).await;
    assert_eq!(h.backend.verify_count(), 2);

    tokio::time::sleep(PERIOD).await;
    assert_eq!(h.backend.verify_count(), 3);

    assert!(poller.is_running());
    poller.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn test_background_pauses_and_resume_checks_immediately() {
    let h = Harness::new(Reply::User(asha()));
    let poller = StatusPoller::new(h.manager.clone(), PERIOD).spawn();
    h.sign_in().await.unwrap();
    settle().await;

    poller.notify_background();
    tokio::time::sleep(PERIOD * 5).await;
    assert_eq!(h.backend.verify_count(), 1);

    poller.notify_foreground();
    settle().await;
    assert_eq!(h.backend.verify_count(), 2);

    // Timer restarts from the resume
    tokio::time::sleep(PERIOD - Duration::from_secs(5)).await;
    assert_eq!(h.backend.verify_count(), 2);
    tokio::time::sleep(Duration::from_secs(10)).await;
    assert_eq!(h.backend.verify_count(), 3);
}

#[tokio::test(start_paused = true)]
async fn test_resume_while_signed_out_does_nothing() {
    let h = Harness::new(Reply::User(asha()));
    let poller = StatusPoller::new(h.manager.clone(), PERIOD).spawn();

    poller.notify_background();
    settle().await;
    poller.notify_foreground();
    settle().await;

    assert_eq!(h.backend.verify_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_no_checks_after_logout() {
    let h = Harness::new(Reply::User(asha()));
    let _poller = StatusPoller::new(h.manager.clone(), PERIOD).spawn();
    h.sign_in().await.unwrap();
    settle().await;

    h.manager.logout().await;
    tokio::time::sleep(PERIOD * 5).await;

    assert_eq!(h.backend.verify_count(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_poll_detects_deactivation() {
    let h = Harness::new(Reply::User(asha()));
    let _poller = StatusPoller::new(h.manager.clone(), PERIOD).spawn();
    h.sign_in().await.unwrap();
    settle().await;

    h.backend.reply_with(Reply::Deny);
    tokio::time::sleep(PERIOD + Duration::from_secs(1)).await;

    assert_eq!(h.manager.state(), SessionState::Unauthenticated);
    let checks = h.backend.verify_count();

    // Signed out now, so polling stops
    tokio::time::sleep(PERIOD * 3).await;
    assert_eq!(h.backend.verify_count(), checks);
}

#[tokio::test(start_paused = true)]
async fn test_dropping_handle_stops_polling() {
    let h = Harness::new(Reply::User(asha()));
    let poller = StatusPoller::new(h.manager.clone(), PERIOD).spawn();
    h.sign_in().await.unwrap();
    settle().await;

    drop(poller);
    tokio::time::sleep(PERIOD * 3).await;

    assert_eq!(h.backend.verify_count(), 1);
}
