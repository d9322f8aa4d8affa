//! Login and session lifecycle against stub implementations: malformed
//! credentials short-circuit before any identity call, verified logins mint
//! working sessions, and authorization is re-resolved on every request so a
//! membership change bites immediately.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;

use pantry::authz::{AuthorizationResolver, GroupMembership};
use pantry::error::{AppError, AppResult};
use pantry::identity::{CredentialBundle, CredentialVerifier, Principal, SessionManager};
use pantry::list::{ListService, RetryConfig};
use pantry::storage::InMemoryDocumentStore;

fn bundle(id: &str, secret: &str) -> CredentialBundle {
    CredentialBundle {
        access_key_id: id.into(),
        secret_access_key: secret.into(),
        session_token: None,
    }
}

/// Counts identity-service calls; accepts exactly one secret.
struct StubVerifier {
    calls: AtomicU32,
}

impl StubVerifier {
    fn new() -> Self {
        Self { calls: AtomicU32::new(0) }
    }
}

#[async_trait]
impl CredentialVerifier for StubVerifier {
    async fn verify(&self, creds: &CredentialBundle) -> AppResult<Principal> {
        creds.validate()?;
        // Everything below stands in for the outbound identity call.
        self.calls.fetch_add(1, Ordering::SeqCst);
        if creds.secret_access_key != "correct-secret" {
            return Err(AppError::invalid_credentials("invalid credentials"));
        }
        Principal::from_identity_arn("arn:aws:iam::123456789012:user/alice")
            .ok_or_else(|| AppError::invalid_credentials("invalid credentials"))
    }
}

#[tokio::test]
async fn malformed_credentials_never_reach_the_identity_service() {
    let verifier = StubVerifier::new();
    for bad in [bundle("", "secret"), bundle("AKIA", ""), bundle(" ", " ")] {
        let err = verifier.verify(&bad).await.unwrap_err();
        assert!(matches!(err, AppError::MalformedCredentials { .. }));
    }
    assert_eq!(verifier.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn wrong_secret_is_invalid_credentials_after_one_call() {
    let verifier = StubVerifier::new();
    let err = verifier.verify(&bundle("AKIA", "wrong")).await.unwrap_err();
    assert!(matches!(err, AppError::InvalidCredentials { .. }));
    assert_eq!(verifier.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn verified_login_mints_a_session_that_resolves_until_logout() {
    let verifier = StubVerifier::new();
    let sessions = SessionManager::with_ttl(Duration::from_secs(3600));

    let principal = verifier.verify(&bundle("AKIA", "correct-secret")).await.unwrap();
    assert_eq!(principal.as_str(), "alice");

    let session = sessions.issue(principal.clone());
    // Lookups never consult the verifier again.
    assert_eq!(sessions.lookup(&session.token), Some(principal));
    assert_eq!(verifier.calls.load(Ordering::SeqCst), 1);

    sessions.destroy(&session.token);
    assert_eq!(sessions.lookup(&session.token), None);
}

/// Resolver whose answer can be flipped between requests, standing in for
/// mutable group membership in the external directory.
struct MutableResolver {
    current: Mutex<GroupMembership>,
    calls: AtomicU32,
}

#[async_trait]
impl AuthorizationResolver for MutableResolver {
    async fn resolve(&self, _principal: &Principal) -> AppResult<GroupMembership> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.current.lock().clone())
    }
}

#[tokio::test]
async fn membership_changes_take_effect_on_the_very_next_request() {
    let resolver = MutableResolver {
        current: Mutex::new(GroupMembership::new(HashMap::from([(
            "is_shopper".to_string(),
            true,
        )]))),
        calls: AtomicU32::new(0),
    };
    let svc = ListService::new(Arc::new(InMemoryDocumentStore::new()), "grocery-list.json", "is_shopper")
        .with_retry(RetryConfig { max_attempts: 4, base_backoff: Duration::from_millis(1) });
    let alice = Principal::new("alice");

    // Request 1: resolve fresh, append allowed.
    let groups = resolver.resolve(&alice).await.unwrap();
    svc.append_item(&alice, &groups, "milk").await.unwrap();

    // Membership is revoked out-of-band.
    *resolver.current.lock() = GroupMembership::new(HashMap::from([(
        "is_shopper".to_string(),
        false,
    )]));

    // Request 2: resolve fresh again; the stale grant must not survive.
    let groups = resolver.resolve(&alice).await.unwrap();
    let err = svc.append_item(&alice, &groups, "eggs").await.unwrap_err();
    assert!(matches!(err, AppError::Forbidden { .. }));
    assert_eq!(resolver.calls.load(Ordering::SeqCst), 2);

    assert_eq!(svc.get_list().await.unwrap().len(), 1);
}

/// Resolver outage: the request gate must deny, never grant.
struct OutageResolver;

#[async_trait]
impl AuthorizationResolver for OutageResolver {
    async fn resolve(&self, _principal: &Principal) -> AppResult<GroupMembership> {
        Err(AppError::authz_unavailable("authorization service unavailable"))
    }
}

#[tokio::test]
async fn resolver_outage_fails_closed() {
    let err = OutageResolver.resolve(&Principal::new("alice")).await.unwrap_err();
    assert!(matches!(err, AppError::AuthzUnavailable { .. }));
    // The status it maps to still denies the request.
    assert_eq!(err.http_status(), 503);
}
