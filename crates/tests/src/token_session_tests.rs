use identity::{IdentityResolver, MemoryProfileStore, ResolverConfig, SessionProvider, TokenSessionProvider};
use pretty_assertions::assert_eq;
use shared_types::{AppErrorKind, ResolutionErrorKind, SessionIdentity};
use std::sync::Arc;

use crate::common::{self, legacy_resident, linked_resident};

const SECRET: &str = "integration-test-secret";

fn token_resolver() -> (
    IdentityResolver<TokenSessionProvider, MemoryProfileStore>,
    Arc<TokenSessionProvider>,
) {
    let sessions = Arc::new(TokenSessionProvider::new(SECRET));
    let store = Arc::new(MemoryProfileStore::with_records([
        linked_resident("p1", "u1", "A"),
        legacy_resident("p2", "b@x.com", "B"),
    ]));
    let resolver = IdentityResolver::new(
        Arc::clone(&sessions),
        store,
        ResolverConfig::production(),
    );
    (resolver, sessions)
}

#[tokio::test]
async fn token_sign_in_resolves_linked_profile() {
    let (resolver, sessions) = token_resolver();
    let mut rx = resolver.subscribe();
    resolver.activate();
    let first = common::wait_for(&mut rx, |r| !r.is_loading).await;
    assert_eq!(first.error_kind(), Some(ResolutionErrorKind::NotAuthenticated));

    let token = sessions
        .issue_token(&SessionIdentity::new("u1", None), 15)
        .unwrap();
    sessions.sign_in_with_token(&token).unwrap();

    let result = common::wait_for(&mut rx, |r| !r.is_loading).await;
    assert_eq!(result.profile_id.as_deref(), Some("p1"));
}

#[tokio::test]
async fn token_email_claim_drives_legacy_fallback() {
    let (resolver, sessions) = token_resolver();
    let token = sessions
        .issue_token(
            &SessionIdentity::new("u2", Some("b@x.com".to_string())),
            15,
        )
        .unwrap();
    sessions.sign_in_with_token(&token).unwrap();

    let result = resolver.resolve().await;

    assert_eq!(result.profile_id.as_deref(), Some("p2"));
}

#[tokio::test]
async fn token_sign_out_reports_not_authenticated() {
    let (resolver, sessions) = token_resolver();
    let token = sessions
        .issue_token(&SessionIdentity::new("u1", None), 15)
        .unwrap();
    sessions.sign_in_with_token(&token).unwrap();
    let mut rx = resolver.subscribe();
    resolver.activate();
    common::wait_for(&mut rx, |r| r.profile_id.as_deref() == Some("p1")).await;

    sessions.sign_out();

    let result = common::wait_for(&mut rx, |r| !r.is_loading).await;
    assert_eq!(result.error_kind(), Some(ResolutionErrorKind::NotAuthenticated));
    assert_eq!(result.profile_id, None);
}

#[tokio::test]
async fn invalid_token_leaves_session_untouched() {
    let (resolver, sessions) = token_resolver();
    resolver.activate();

    let err = sessions.sign_in_with_token("not-a-token").unwrap_err();

    assert_eq!(err.kind, AppErrorKind::Unauthorized);
    assert_eq!(sessions.current_session().await.unwrap(), None);
    assert_eq!(sessions.listener_count(), 1);
}

#[tokio::test]
async fn token_refresh_for_same_subject_keeps_profile() {
    let (resolver, sessions) = token_resolver();
    let session = SessionIdentity::new("u1", None);
    sessions
        .sign_in_with_token(&sessions.issue_token(&session, 15).unwrap())
        .unwrap();
    let mut rx = resolver.subscribe();
    resolver.activate();
    let resolved = common::wait_for(&mut rx, |r| !r.is_loading).await;

    sessions
        .refresh_with_token(&sessions.issue_token(&session, 30).unwrap())
        .unwrap();

    assert_eq!(resolver.current(), resolved);
}

#[tokio::test]
async fn token_refresh_for_other_subject_is_rejected() {
    let (_resolver, sessions) = token_resolver();
    sessions
        .sign_in_with_token(
            &sessions
                .issue_token(&SessionIdentity::new("u1", None), 15)
                .unwrap(),
        )
        .unwrap();

    let other = sessions
        .issue_token(&SessionIdentity::new("u9", None), 15)
        .unwrap();
    let err = sessions.refresh_with_token(&other).unwrap_err();

    assert_eq!(err.kind, AppErrorKind::Unauthorized);
}
