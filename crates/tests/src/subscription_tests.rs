use identity::{ResolverConfig, SessionProvider};
use pretty_assertions::assert_eq;
use shared_types::{ResolutionErrorKind, ResolutionPhase};
use std::time::Duration;

use crate::common::{self, identity, linked_resident};

#[tokio::test]
async fn activate_registers_exactly_one_listener() {
    let (resolver, sessions, _store) = common::test_resolver(
        Some(identity("u1", None)),
        vec![linked_resident("p1", "u1", "A")],
        ResolverConfig::production(),
    );
    assert_eq!(sessions.listener_count(), 0);

    resolver.activate();
    resolver.activate();

    assert!(resolver.is_active());
    assert_eq!(sessions.listener_count(), 1);
}

#[tokio::test]
async fn deactivate_removes_listener() {
    let (resolver, sessions, _store) = common::test_resolver(
        Some(identity("u1", None)),
        vec![linked_resident("p1", "u1", "A")],
        ResolverConfig::production(),
    );

    resolver.activate();
    resolver.deactivate();
    resolver.deactivate();

    assert!(!resolver.is_active());
    assert_eq!(sessions.listener_count(), 0);
}

#[tokio::test]
async fn dropping_resolver_removes_listener() {
    let (resolver, sessions, _store) = common::test_resolver(
        Some(identity("u1", None)),
        vec![],
        ResolverConfig::production(),
    );
    resolver.activate();
    assert_eq!(sessions.listener_count(), 1);

    drop(resolver);

    assert_eq!(sessions.listener_count(), 0);
}

#[tokio::test]
async fn session_changes_after_deactivate_are_ignored() {
    let (resolver, sessions, store) = common::test_resolver(
        Some(identity("u1", None)),
        vec![
            linked_resident("p1", "u1", "A"),
            linked_resident("p2", "u2", "B"),
        ],
        ResolverConfig::production(),
    );
    let mut rx = resolver.subscribe();
    resolver.activate();
    let resolved = common::wait_for(&mut rx, |r| !r.is_loading).await;
    assert_eq!(resolved.profile_id.as_deref(), Some("p1"));
    let calls = store.primary_calls();

    resolver.deactivate();
    sessions.sign_in(identity("u2", None));
    tokio::time::sleep(Duration::from_millis(50)).await;

    assert_eq!(resolver.current(), resolved);
    assert_eq!(store.primary_calls(), calls);
}

#[tokio::test]
async fn reactivation_resolves_again() {
    let (resolver, sessions, _store) = common::test_resolver(
        Some(identity("u1", None)),
        vec![
            linked_resident("p1", "u1", "A"),
            linked_resident("p2", "u2", "B"),
        ],
        ResolverConfig::production(),
    );
    let mut rx = resolver.subscribe();
    resolver.activate();
    common::wait_for(&mut rx, |r| r.profile_id.as_deref() == Some("p1")).await;

    resolver.deactivate();
    sessions.sign_in(identity("u2", None));
    resolver.activate();

    assert_eq!(sessions.listener_count(), 1);
    let result = common::wait_for(&mut rx, |r| !r.is_loading).await;
    assert_eq!(result.profile_id.as_deref(), Some("p2"));
}

#[tokio::test]
async fn lifecycle_walks_idle_loading_resolved_error() {
    let (resolver, sessions, _store) = common::test_resolver(
        Some(identity("u1", None)),
        vec![linked_resident("p1", "u1", "A")],
        ResolverConfig::production(),
    );
    let mut rx = resolver.subscribe();
    assert_eq!(resolver.current().phase(), ResolutionPhase::Idle);

    resolver.activate();
    assert_eq!(resolver.current().phase(), ResolutionPhase::Loading);

    let resolved = common::wait_for(&mut rx, |r| !r.is_loading).await;
    assert_eq!(resolved.phase(), ResolutionPhase::Resolved);
    assert_eq!(resolved.profile_id.as_deref(), Some("p1"));

    // The old profile is cleared before the re-resolution runs.
    sessions.sign_out();
    let cleared = resolver.current();
    assert_eq!(cleared.phase(), ResolutionPhase::Loading);
    assert_eq!(cleared.profile_id, None);

    let signed_out = common::wait_for(&mut rx, |r| !r.is_loading).await;
    assert_eq!(signed_out.phase(), ResolutionPhase::Error);
    assert_eq!(
        signed_out.error_kind(),
        Some(ResolutionErrorKind::NotAuthenticated)
    );
}

#[tokio::test]
async fn sign_in_after_sign_out_resolves_new_profile() {
    let (resolver, sessions, _store) = common::test_resolver(
        None,
        vec![linked_resident("p2", "u2", "B")],
        ResolverConfig::production(),
    );
    let mut rx = resolver.subscribe();
    resolver.activate();
    let first = common::wait_for(&mut rx, |r| !r.is_loading).await;
    assert_eq!(first.error_kind(), Some(ResolutionErrorKind::NotAuthenticated));

    sessions.sign_in(identity("u2", None));

    let second = common::wait_for(&mut rx, |r| !r.is_loading).await;
    assert_eq!(second.profile_id.as_deref(), Some("p2"));
    assert_eq!(second.error, None);
}

#[tokio::test]
async fn token_refresh_keeps_current_result() {
    let (resolver, sessions, store) = common::test_resolver(
        Some(identity("u1", None)),
        vec![linked_resident("p1", "u1", "A")],
        ResolverConfig::production(),
    );
    let mut rx = resolver.subscribe();
    resolver.activate();
    let resolved = common::wait_for(&mut rx, |r| !r.is_loading).await;

    sessions.refresh_token();
    assert_eq!(resolver.current(), resolved);

    common::wait_for_primary_calls(&store, 2).await;
    tokio::time::sleep(Duration::from_millis(20)).await;
    assert_eq!(resolver.current(), resolved);
}

#[tokio::test]
async fn refresh_after_deactivate_publishes_new_session() {
    let (resolver, sessions, _store) = common::test_resolver(
        None,
        vec![
            linked_resident("p1", "u1", "A"),
            linked_resident("p2", "u2", "B"),
        ],
        ResolverConfig::production(),
    );
    let mut rx = resolver.subscribe();
    resolver.activate();
    sessions.sign_in(identity("u1", None));
    common::wait_for(&mut rx, |r| r.profile_id.as_deref() == Some("p1")).await;

    resolver.deactivate();
    sessions.sign_in(identity("u2", None));
    let returned = resolver.refresh().await;

    assert_eq!(returned.profile_id.as_deref(), Some("p2"));
    assert_eq!(resolver.current(), returned);
    assert_eq!(rx.borrow().profile_id.as_deref(), Some("p2"));
}

#[tokio::test]
async fn in_flight_attempt_never_publishes_after_deactivate() {
    let (resolver, _sessions, store) = common::test_resolver(
        Some(identity("u1", None)),
        vec![linked_resident("p1", "u1", "A")],
        ResolverConfig::production(),
    );
    store.delay_session("u1", Duration::from_millis(200));
    resolver.activate();
    common::wait_for_primary_calls(&store, 1).await;

    resolver.deactivate();
    tokio::time::sleep(Duration::from_millis(400)).await;

    assert_eq!(resolver.current().phase(), ResolutionPhase::Loading);
    assert_eq!(resolver.current().profile_id, None);
}
