//! Cache integration tests over the HTTP API.
//!
//! Tests verify:
//! - Identical uploads hit the cache without re-running inference
//! - Different options separate cache entries
//! - TTL expiry triggers recomputation and artifact cleanup
//! - Two artifacts are persisted per restoration

use std::time::Duration;

use axum::http::StatusCode;
use tower::ServiceExt;

use super::test_utils::{gray_png, json_body, restore_request, TestApp};

// =============================================================================
// Cache Hits
// =============================================================================

#[tokio::test]
async fn test_identical_upload_is_cache_hit() {
    let app = TestApp::new();
    let data = gray_png(80, 80, 100);

    let response = app
        .router
        .clone()
        .oneshot(restore_request(&data, false, true, false))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let first = json_body(response).await;
    assert_eq!(first["cache_hit"], false);

    let response = app
        .router
        .clone()
        .oneshot(restore_request(&data, false, true, false))
        .await
        .unwrap();
    let second = json_body(response).await;
    assert_eq!(second["cache_hit"], true);

    // Same artifact bytes, one inference
    assert_eq!(first["restored_image"], second["restored_image"]);
    assert_eq!(app.model_invocations(), 1);
}

#[tokio::test]
async fn test_cache_hit_serves_requested_tier() {
    let app = TestApp::new();
    let data = gray_png(80, 80, 100);

    // Populate the cache with a free request
    let response = app
        .router
        .clone()
        .oneshot(restore_request(&data, false, true, false))
        .await
        .unwrap();
    let free = json_body(response).await;
    assert_eq!(free["tier"], "preview");

    // A paid request for the same input is a hit but serves the HD artifact
    let response = app
        .router
        .clone()
        .oneshot(restore_request(&data, false, true, true))
        .await
        .unwrap();
    let paid = json_body(response).await;
    assert_eq!(paid["cache_hit"], true);
    assert_eq!(paid["tier"], "hd");
    assert_ne!(free["restored_image"], paid["restored_image"]);
    assert_eq!(app.model_invocations(), 1);
}

#[tokio::test]
async fn test_different_options_are_separate_entries() {
    let app = TestApp::new();
    let data = gray_png(80, 80, 100);

    let response = app
        .router
        .clone()
        .oneshot(restore_request(&data, false, true, false))
        .await
        .unwrap();
    assert_eq!(json_body(response).await["cache_hit"], false);

    // Same bytes, different flags: a miss
    let response = app
        .router
        .clone()
        .oneshot(restore_request(&data, true, true, false))
        .await
        .unwrap();
    assert_eq!(json_body(response).await["cache_hit"], false);
}

#[tokio::test]
async fn test_different_bytes_are_separate_entries() {
    let app = TestApp::new();

    let response = app
        .router
        .clone()
        .oneshot(restore_request(&gray_png(80, 80, 100), false, true, false))
        .await
        .unwrap();
    assert_eq!(json_body(response).await["cache_hit"], false);

    let response = app
        .router
        .clone()
        .oneshot(restore_request(&gray_png(80, 80, 101), false, true, false))
        .await
        .unwrap();
    assert_eq!(json_body(response).await["cache_hit"], false);
    assert_eq!(app.model_invocations(), 2);
}

// =============================================================================
// TTL Expiry
// =============================================================================

#[tokio::test]
async fn test_expired_entry_recomputed() {
    let app = TestApp::builder().ttl(Duration::from_secs(3600)).build();
    let data = gray_png(80, 80, 100);

    let response = app
        .router
        .clone()
        .oneshot(restore_request(&data, false, true, false))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(app.model_invocations(), 1);

    app.clock.advance(Duration::from_secs(3601));

    let response = app
        .router
        .clone()
        .oneshot(restore_request(&data, false, true, false))
        .await
        .unwrap();
    let json = json_body(response).await;
    assert_eq!(json["cache_hit"], false);
    assert_eq!(app.model_invocations(), 2);
}

#[tokio::test]
async fn test_fresh_entry_survives_partial_ttl() {
    let app = TestApp::builder().ttl(Duration::from_secs(3600)).build();
    let data = gray_png(80, 80, 100);

    app.router
        .clone()
        .oneshot(restore_request(&data, false, true, false))
        .await
        .unwrap();

    app.clock.advance(Duration::from_secs(1800));

    let response = app
        .router
        .clone()
        .oneshot(restore_request(&data, false, true, false))
        .await
        .unwrap();
    assert_eq!(json_body(response).await["cache_hit"], true);
}

// =============================================================================
// Artifact Persistence
// =============================================================================

#[tokio::test]
async fn test_both_tiers_persisted() {
    let app = TestApp::new();

    app.router
        .clone()
        .oneshot(restore_request(&gray_png(80, 80, 100), false, true, false))
        .await
        .unwrap();

    // One preview and one HD artifact
    assert_eq!(app.store.len().await, 2);
}

#[tokio::test]
async fn test_sweep_removes_expired_artifacts() {
    let app = TestApp::builder().ttl(Duration::from_secs(100)).build();

    app.router
        .clone()
        .oneshot(restore_request(&gray_png(80, 80, 100), false, true, false))
        .await
        .unwrap();
    assert_eq!(app.store.len().await, 2);

    app.clock.advance(Duration::from_secs(101));
    let removed = app.service.sweep_expired().await;

    assert_eq!(removed, 1);
    assert!(app.store.is_empty().await);
}

#[tokio::test]
async fn test_request_triggers_expiry_sweep() {
    let app = TestApp::builder().ttl(Duration::from_secs(100)).build();

    app.router
        .clone()
        .oneshot(restore_request(&gray_png(80, 80, 100), false, true, false))
        .await
        .unwrap();
    assert_eq!(app.store.len().await, 2);

    app.clock.advance(Duration::from_secs(101));

    // An unrelated request sweeps the stale entry and its files
    app.router
        .clone()
        .oneshot(restore_request(&gray_png(30, 30, 50), false, true, false))
        .await
        .unwrap();

    // Only the fresh restoration's artifacts remain
    assert_eq!(app.store.len().await, 2);
    assert_eq!(app.service.cache_len().await, 1);
}
