#![allow(clippy::unwrap_used, clippy::expect_used)]

use pathshala_sdk::{Credentials, PathshalaError, TenantSlug};
use std::sync::Arc;

use super::session_store::{SessionState, SessionStore};
use super::tenant_store::{TenantState, TenantStore};
use crate::storage::{ClientStorage, MemoryStorage, keys};
use crate::test_support::{FakeApi, Reply, login_response, tenant, user};

fn slug() -> TenantSlug {
    TenantSlug::new("vk-learnings")
}

fn storage() -> Arc<MemoryStorage> {
    Arc::new(MemoryStorage::new())
}

#[tokio::test]
async fn tenant_fetch_loads_and_persists_subdomain() {
    let api = FakeApi::new();
    api.tenant_replies(vec![Reply::Ok(Some(tenant("VK Learning Center")))]);
    let storage = storage();
    let store = TenantStore::new(api.clone(), storage.clone());

    assert_eq!(store.state(), TenantState::Idle);
    let state = store.fetch(&slug()).await;

    let TenantState::Loaded(loaded) = state else {
        panic!("expected loaded, got {state:?}");
    };
    assert_eq!(loaded.pathshala_name, "VK Learning Center");
    assert_eq!(store.tenant(), Some(loaded));
    assert_eq!(
        storage.get(keys::SUBDOMAIN).unwrap().as_deref(),
        Some("vk-learnings")
    );
    assert_eq!(store.cached_slug().unwrap(), Some(slug()));
}

#[tokio::test]
async fn tenant_fetch_failures_keep_message() {
    let api = FakeApi::new();
    api.tenant_replies(vec![
        Reply::Status(404, "Pathshala not found"),
        Reply::Rejected("Pathshala disabled"),
        Reply::Ok(None),
    ]);
    let storage = storage();
    let store = TenantStore::new(api.clone(), storage.clone());

    for expected in [
        "Pathshala not found",
        "Pathshala disabled",
        "Failed to load pathshala",
    ] {
        assert_eq!(
            store.fetch(&slug()).await,
            TenantState::Failed {
                message: expected.to_owned()
            }
        );
        assert!(store.tenant().is_none());
    }
    assert!(storage.get(keys::SUBDOMAIN).unwrap().is_none());
}

#[tokio::test]
async fn tenant_retry_reissues_last_slug() {
    let api = FakeApi::new();
    api.tenant_replies(vec![
        Reply::Status(503, "Service unavailable"),
        Reply::Ok(Some(tenant("VK Learning Center"))),
    ]);
    let store = TenantStore::new(api.clone(), storage());

    assert!(matches!(
        store.fetch(&slug()).await,
        TenantState::Failed { .. }
    ));
    assert!(matches!(store.retry().await, TenantState::Loaded(_)));
    assert_eq!(api.count("verify_tenant"), 2);
}

#[tokio::test]
async fn tenant_retry_without_slug_does_nothing() {
    let api = FakeApi::new();
    let store = TenantStore::new(api.clone(), storage());

    assert_eq!(store.retry().await, TenantState::Idle);
    assert!(api.calls().is_empty());
}

#[tokio::test]
async fn tenant_result_after_clear_is_dropped() {
    let api = FakeApi::new();
    api.tenant_replies(vec![Reply::Ok(Some(tenant("VK Learning Center")))]);
    let gate = api.hold_tenant();
    let store = TenantStore::new(api.clone(), storage());

    let interrupt = async {
        tokio::task::yield_now().await;
        assert_eq!(store.state(), TenantState::Loading);
        store.clear();
        gate.notify_one();
    };
    let tenant = slug();
    let (returned, ()) = tokio::join!(store.fetch(&tenant), interrupt);

    assert!(matches!(returned, TenantState::Loaded(_)));
    assert_eq!(store.state(), TenantState::Idle);
    assert!(store.slug().is_none());
}

#[tokio::test]
async fn session_fetch_guard_skips_cached_user() {
    let api = FakeApi::new();
    api.user_replies(vec![Reply::Ok(Some(user("asha", &["1"])))]);
    let store = SessionStore::new(api.clone(), storage());

    let first = store.fetch(&slug()).await;
    let second = store.fetch(&slug()).await;

    assert_eq!(first, second);
    assert_eq!(store.user().unwrap().user_name, "asha");
    assert_eq!(api.count("logged_in_user"), 1);
}

#[tokio::test]
async fn session_fetch_is_noop_while_loading() {
    let api = FakeApi::new();
    api.user_replies(vec![Reply::Ok(Some(user("asha", &["1"])))]);
    let gate = api.hold_user();
    let store = SessionStore::new(api.clone(), storage());

    let second = async {
        tokio::task::yield_now().await;
        let state = store.fetch(&slug()).await;
        gate.notify_one();
        state
    };
    let tenant = slug();
    let (first, second) = tokio::join!(store.fetch(&tenant), second);

    assert_eq!(second, SessionState::Loading);
    assert!(matches!(first, SessionState::Loaded(Some(_))));
    assert_eq!(api.count("logged_in_user"), 1);
}

#[tokio::test]
async fn session_cached_for_another_tenant_is_refetched() {
    let api = FakeApi::new();
    api.user_replies(vec![
        Reply::Ok(Some(user("alpha-admin", &["3"]))),
        Reply::Status(401, "Not a member of this pathshala"),
    ]);
    let store = SessionStore::new(api.clone(), storage());
    let alpha = TenantSlug::new("alpha");
    let beta = TenantSlug::new("beta");

    store.fetch(&alpha).await;
    assert_eq!(store.slug(), Some(alpha));

    let state = store.fetch(&beta).await;
    assert!(matches!(
        state,
        SessionState::Failed {
            unauthorized: true,
            ..
        }
    ));
    assert!(store.user().is_none());
    assert_eq!(store.slug(), Some(beta));
    assert_eq!(api.user_slugs(), vec!["alpha".to_owned(), "beta".to_owned()]);
}

#[tokio::test]
async fn session_fetch_without_user_can_refetch() {
    let api = FakeApi::new();
    api.user_replies(vec![Reply::Ok(None)]);
    let store = SessionStore::new(api.clone(), storage());

    assert_eq!(store.fetch(&slug()).await, SessionState::Loaded(None));
    store.fetch(&slug()).await;
    assert_eq!(api.count("logged_in_user"), 2);
}

#[tokio::test]
async fn session_failure_flags_authorization() {
    let api = FakeApi::new();
    api.user_replies(vec![
        Reply::Status(401, "Token expired"),
        Reply::Status(500, "Database down"),
    ]);
    let store = SessionStore::new(api.clone(), storage());

    assert_eq!(
        store.fetch(&slug()).await,
        SessionState::Failed {
            message: "Token expired".to_owned(),
            unauthorized: true,
        }
    );
    assert_eq!(
        store.fetch(&slug()).await,
        SessionState::Failed {
            message: "Database down".to_owned(),
            unauthorized: false,
        }
    );
}

#[tokio::test]
async fn login_validates_before_request() {
    let api = FakeApi::new();
    let store = SessionStore::new(api.clone(), storage());

    let err = store
        .login(&slug(), &Credentials::new(" ", ""))
        .await
        .unwrap_err();

    let PathshalaError::Validation(errors) = err else {
        panic!("expected validation error, got {err:?}");
    };
    let fields: Vec<_> = errors.iter().map(|e| e.field).collect();
    assert_eq!(fields, vec!["userName", "password"]);
    assert!(api.calls().is_empty());
}

#[tokio::test]
async fn login_stores_tokens_and_resets_attempt() {
    let api = FakeApi::new();
    api.user_replies(vec![
        Reply::Status(401, "Not logged in"),
        Reply::Ok(Some(user("asha", &["3"]))),
    ]);
    api.login_replies(vec![Reply::Ok(Some(login_response("asha")))]);
    let storage = storage();
    let store = SessionStore::new(api.clone(), storage.clone());

    assert!(matches!(
        store.fetch(&slug()).await,
        SessionState::Failed { .. }
    ));

    let name = store
        .login(&slug(), &Credentials::new("asha", "s3cret"))
        .await
        .unwrap();

    assert_eq!(name, "asha");
    assert_eq!(store.state(), SessionState::Idle);
    assert_eq!(
        storage.get(keys::ACCESS_TOKEN).unwrap().as_deref(),
        Some("access-1")
    );
    assert_eq!(
        storage.get(keys::REFRESH_TOKEN).unwrap().as_deref(),
        Some("refresh-1")
    );
    assert_eq!(storage.get(keys::USER_NAME).unwrap().as_deref(), Some("asha"));
    assert!(matches!(
        store.fetch(&slug()).await,
        SessionState::Loaded(Some(_))
    ));
    assert_eq!(api.calls()[1], "login:asha");
}

#[tokio::test]
async fn login_rejection_is_access_denied() {
    let api = FakeApi::new();
    api.login_replies(vec![Reply::Rejected("Invalid credentials")]);
    let storage = storage();
    let store = SessionStore::new(api.clone(), storage.clone());

    let err = store
        .login(&slug(), &Credentials::new("asha", "wrong"))
        .await
        .unwrap_err();

    assert!(matches!(err, PathshalaError::Rejected { .. }));
    assert!(err.message().starts_with("Access denied"));
    assert!(storage.get(keys::ACCESS_TOKEN).unwrap().is_none());
}

#[tokio::test]
async fn logout_clears_even_when_backend_fails() {
    let api = FakeApi::new();
    api.user_replies(vec![Reply::Ok(Some(user("asha", &[])))]);
    api.fail_logout(503);
    let storage = storage();
    storage.set(keys::ACCESS_TOKEN, "access-1").unwrap();
    storage.set(keys::REFRESH_TOKEN, "refresh-1").unwrap();
    storage.set(keys::USER_NAME, "asha").unwrap();
    storage.set(keys::SUBDOMAIN, "vk-learnings").unwrap();
    let store = SessionStore::new(api.clone(), storage.clone());
    store.fetch(&slug()).await;

    let err = store.logout().await.unwrap_err();

    assert_eq!(err.status(), Some(503));
    assert_eq!(store.state(), SessionState::Idle);
    for key in [keys::ACCESS_TOKEN, keys::REFRESH_TOKEN, keys::USER_NAME] {
        assert!(storage.get(key).unwrap().is_none(), "{key} kept");
    }
    assert_eq!(
        storage.get(keys::SUBDOMAIN).unwrap().as_deref(),
        Some("vk-learnings")
    );
}
