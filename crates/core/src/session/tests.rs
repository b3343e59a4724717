//! Session store, lock manager and endpoint tests.

use std::collections::HashSet;
use std::sync::Arc;

use chrono::{DateTime, Duration, TimeZone, Utc};

use super::memory::InMemorySessionRepository;
use super::*;
use crate::clock::ManualClock;
use crate::tenant::TenantContext;

struct Fixture {
    repo: Arc<InMemorySessionRepository>,
    clock: Arc<ManualClock>,
    store: Arc<SessionStore<InMemorySessionRepository>>,
}

fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 5, 4, 10, 0, 0).unwrap()
}

fn fixture() -> Fixture {
    let repo = Arc::new(InMemorySessionRepository::default());
    let clock = Arc::new(ManualClock::new(t0()));
    let store = Arc::new(SessionStore::new(repo.clone(), clock.clone()));
    Fixture { repo, clock, store }
}

fn input(tenant: &str, ttl: Option<u64>) -> CreateSessionInput {
    CreateSessionInput {
        tenant_id: tenant.to_string(),
        storage_name: "docs".to_string(),
        file_path: "reports/q1.docx".to_string(),
        permissions: vec!["view".to_string(), "edit".to_string()],
        account: "sales".to_string(),
        user: Some("Alice".to_string()),
        origin_connection_id: Some("conn-1".to_string()),
        origin_page_id: None,
        ttl_seconds: ttl,
    }
}

fn request(account: &str) -> CreateSessionRequest {
    CreateSessionRequest {
        storage_name: "docs".to_string(),
        file_path: "a.docx".to_string(),
        permissions: vec!["edit".to_string()],
        account: account.to_string(),
        user: None,
        origin_connection_id: None,
        origin_page_id: None,
        ttl_seconds: None,
    }
}

// ========================================================================
// Store
// ========================================================================

#[tokio::test]
async fn test_create_sets_timestamps_and_credentials() {
    let f = fixture();
    let session = f.store.create(input("default", Some(5))).await.unwrap();

    assert!(session.id.starts_with("sess_"));
    assert!(session.file_id.starts_with("file_"));
    assert_ne!(session.access_token, session.file_id);
    assert_eq!(session.created_at, t0());
    assert_eq!(session.last_accessed_at, t0());
    assert_eq!(session.expires_at, t0() + Duration::seconds(5));
    assert_eq!(session.permissions, vec![Permission::View, Permission::Edit]);
    assert_eq!(session.origin_connection_id.as_deref(), Some("conn-1"));
    assert!(session.lock_id.is_none());
}

#[tokio::test]
async fn test_create_default_ttl() {
    let f = fixture();
    let session = f.store.create(input("default", None)).await.unwrap();
    assert_eq!(
        session.expires_at,
        t0() + Duration::seconds(i64::try_from(DEFAULT_SESSION_TTL_SECS).unwrap())
    );
}

#[tokio::test]
async fn test_create_validation() {
    let f = fixture();

    let mut no_perms = input("default", None);
    no_perms.permissions.clear();
    assert!(matches!(
        f.store.create(no_perms).await,
        Err(SessionError::Validation(_))
    ));

    let mut no_account = input("default", None);
    no_account.account = "  ".to_string();
    assert!(matches!(
        f.store.create(no_account).await,
        Err(SessionError::Validation(_))
    ));

    assert!(matches!(
        f.store.create(input("default", Some(0))).await,
        Err(SessionError::Validation(_))
    ));
    assert_eq!(f.repo.len(), 0);
}

#[tokio::test]
async fn test_created_credentials_are_unique() {
    let f = fixture();
    let mut ids = HashSet::new();
    let mut file_ids = HashSet::new();
    let mut tokens = HashSet::new();

    for _ in 0..1_000 {
        let s = f.store.create(input("default", None)).await.unwrap();
        ids.insert(s.id);
        file_ids.insert(s.file_id);
        tokens.insert(s.access_token);
    }

    assert_eq!(ids.len(), 1_000);
    assert_eq!(file_ids.len(), 1_000);
    assert_eq!(tokens.len(), 1_000);
}

#[tokio::test]
async fn test_lookup_paths() {
    let f = fixture();
    let session = f.store.create(input("default", None)).await.unwrap();

    assert_eq!(f.store.get(&session.id).await.unwrap(), session);
    assert_eq!(
        f.store.get_by_token(&session.access_token).await.unwrap(),
        session
    );
    assert_eq!(f.store.get_by_file_id(&session.file_id).await.unwrap(), session);
    assert!(matches!(
        f.store.get("sess_missing").await,
        Err(SessionError::NotFound(_))
    ));
}

#[tokio::test]
async fn test_lookups_do_not_filter_expired() {
    let f = fixture();
    let session = f.store.create(input("default", Some(1))).await.unwrap();
    f.clock.advance(Duration::hours(2));

    assert!(f.store.get_by_file_id(&session.file_id).await.is_ok());
}

#[tokio::test]
async fn test_touch() {
    let f = fixture();
    let session = f.store.create(input("default", Some(60))).await.unwrap();
    f.clock.advance(Duration::seconds(30));

    f.store.touch(&session.id).await.unwrap();
    let touched = f.store.get(&session.id).await.unwrap();
    assert_eq!(touched.last_accessed_at, t0() + Duration::seconds(30));
    assert_eq!(touched.expires_at, session.expires_at);

    // Missing session is a no-op
    f.store.touch("sess_missing").await.unwrap();
}

#[tokio::test]
async fn test_expiry_boundary() {
    let f = fixture();
    let session = f.store.create(input("default", Some(10))).await.unwrap();

    f.clock.advance(Duration::seconds(9));
    assert!(!f.store.is_expired(&session.id).await.unwrap());

    f.clock.advance(Duration::seconds(1));
    assert!(f.store.is_expired(&session.id).await.unwrap());

    assert!(f.store.is_expired("sess_missing").await.unwrap());
}

#[tokio::test]
async fn test_list_active_filters_and_orders() {
    let f = fixture();
    let older = f.store.create(input("acme", Some(3600))).await.unwrap();
    f.clock.advance(Duration::seconds(1));
    let newer = f.store.create(input("acme", Some(3600))).await.unwrap();
    let other = f.store.create(input("globex", Some(3600))).await.unwrap();
    let _short = f.store.create(input("acme", Some(5))).await.unwrap();
    f.clock.advance(Duration::seconds(5));

    let acme: Vec<_> = f
        .store
        .list_active(Some("acme"))
        .await
        .unwrap()
        .into_iter()
        .map(|s| s.id)
        .collect();
    assert_eq!(acme, vec![newer.id.clone(), older.id.clone()]);

    let all = f.store.list_active(None).await.unwrap();
    assert_eq!(all.len(), 3);
    assert!(all.iter().any(|s| s.id == other.id));
}

#[tokio::test]
async fn test_cleanup_is_idempotent() {
    let f = fixture();
    f.store.create(input("default", Some(5))).await.unwrap();
    f.store.create(input("default", Some(5))).await.unwrap();
    let keep = f.store.create(input("default", Some(60))).await.unwrap();
    f.clock.advance(Duration::seconds(5));

    assert_eq!(f.store.count_expired().await.unwrap(), 2);
    assert_eq!(f.store.cleanup_expired().await.unwrap(), 2);
    assert_eq!(f.store.cleanup_expired().await.unwrap(), 0);
    assert_eq!(f.repo.len(), 1);
    assert!(f.store.get(&keep.id).await.is_ok());
}

#[tokio::test]
async fn test_remove() {
    let f = fixture();
    let session = f.store.create(input("default", None)).await.unwrap();

    assert!(f.store.remove(&session.id).await.unwrap());
    assert!(!f.store.remove(&session.id).await.unwrap());
}

// ========================================================================
// Lock manager
// ========================================================================

#[tokio::test]
async fn test_lock_mutual_exclusion() {
    let f = fixture();
    let s = f.store.create(input("default", None)).await.unwrap();

    assert!(f.store.set_lock(&s.id, "A", DEFAULT_LOCK_TTL_SECS).await.unwrap());
    assert!(!f.store.set_lock(&s.id, "B", DEFAULT_LOCK_TTL_SECS).await.unwrap());
    assert_eq!(f.store.get_lock(&s.id).await.unwrap().as_deref(), Some("A"));

    assert!(!f.store.release_lock(&s.id, "B").await.unwrap());
    assert_eq!(f.store.get_lock(&s.id).await.unwrap().as_deref(), Some("A"));

    assert!(f.store.release_lock(&s.id, "A").await.unwrap());
    assert_eq!(f.store.get_lock(&s.id).await.unwrap(), None);
}

#[tokio::test]
async fn test_lock_reentrant_refreshes_expiry() {
    let f = fixture();
    let s = f.store.create(input("default", None)).await.unwrap();

    assert!(f.store.set_lock(&s.id, "A", 60).await.unwrap());
    f.clock.advance(Duration::seconds(30));
    assert!(f.store.set_lock(&s.id, "A", 60).await.unwrap());

    let locked = f.store.get(&s.id).await.unwrap();
    assert_eq!(
        locked.lock_expires_at,
        Some(t0() + Duration::seconds(90))
    );
}

#[tokio::test]
async fn test_lock_expiry_lazy_clear() {
    let f = fixture();
    let s = f.store.create(input("default", None)).await.unwrap();

    assert!(f.store.set_lock(&s.id, "A", 60).await.unwrap());
    f.clock.advance(Duration::seconds(60));

    assert_eq!(f.store.get_lock(&s.id).await.unwrap(), None);
    let cleared = f.store.get(&s.id).await.unwrap();
    assert!(cleared.lock_id.is_none());
    assert!(cleared.lock_expires_at.is_none());

    assert!(f.store.set_lock(&s.id, "B", 60).await.unwrap());
    assert_eq!(f.store.get_lock(&s.id).await.unwrap().as_deref(), Some("B"));
}

#[tokio::test]
async fn test_stale_lock_taken_over_without_get() {
    let f = fixture();
    let s = f.store.create(input("default", None)).await.unwrap();

    assert!(f.store.set_lock(&s.id, "A", 60).await.unwrap());
    f.clock.advance(Duration::seconds(61));
    assert!(f.store.set_lock(&s.id, "B", 60).await.unwrap());
    assert_eq!(f.store.get_lock(&s.id).await.unwrap().as_deref(), Some("B"));
}

#[tokio::test]
async fn test_release_unlocked_is_noop_success() {
    let f = fixture();
    let s = f.store.create(input("default", None)).await.unwrap();

    assert!(f.store.release_lock(&s.id, "anything").await.unwrap());
}

#[tokio::test]
async fn test_lock_ops_on_missing_session() {
    let f = fixture();

    assert!(!f.store.set_lock("sess_missing", "A", 60).await.unwrap());
    assert!(!f.store.release_lock("sess_missing", "A").await.unwrap());
    assert!(!f.store.refresh_lock("sess_missing", "A", 60).await.unwrap());
    assert_eq!(f.store.get_lock("sess_missing").await.unwrap(), None);
}

#[tokio::test]
async fn test_refresh_lock() {
    let f = fixture();
    let s = f.store.create(input("default", None)).await.unwrap();

    assert!(!f.store.refresh_lock(&s.id, "A", 60).await.unwrap());
    assert!(f.store.set_lock(&s.id, "A", 60).await.unwrap());
    assert!(!f.store.refresh_lock(&s.id, "B", 60).await.unwrap());

    f.clock.advance(Duration::seconds(30));
    assert!(f.store.refresh_lock(&s.id, "A", 60).await.unwrap());

    f.clock.advance(Duration::seconds(90));
    assert!(!f.store.refresh_lock(&s.id, "A", 60).await.unwrap());
}

#[tokio::test]
async fn test_clear_expired_lock_keeps_fresh_relock() {
    let f = fixture();
    let s = f.store.create(input("default", None)).await.unwrap();
    assert!(f.store.set_lock(&s.id, "A", 60).await.unwrap());
    let stale_view = f.store.get(&s.id).await.unwrap();

    // Another editor takes over after expiry before the stale view is evaluated.
    f.clock.advance(Duration::seconds(61));
    assert!(f.store.set_lock(&s.id, "B", 60).await.unwrap());

    assert_eq!(f.store.current_lock(&stale_view).await.unwrap(), None);
    assert_eq!(f.store.get_lock(&s.id).await.unwrap().as_deref(), Some("B"));
}

#[tokio::test]
async fn test_zero_lock_ttl_rejected() {
    let f = fixture();
    let s = f.store.create(input("default", None)).await.unwrap();

    assert!(matches!(
        f.store.set_lock(&s.id, "A", 0).await,
        Err(SessionError::Validation(_))
    ));
}

// ========================================================================
// Endpoint
// ========================================================================

#[tokio::test]
async fn test_endpoint_create_uses_context_tenant_and_default_ttl() {
    let f = fixture();
    let endpoint = SessionEndpoint::new(f.store.clone(), 120);

    let session = endpoint
        .create(&TenantContext::tenant("acme"), request("crm"))
        .await
        .unwrap();

    assert_eq!(session.tenant_id, "acme");
    assert_eq!(session.expires_at, t0() + Duration::seconds(120));
    assert_eq!(session.permissions, vec![Permission::View, Permission::Edit]);
}

#[tokio::test]
async fn test_endpoint_create_requires_account() {
    let f = fixture();
    let endpoint = SessionEndpoint::new(f.store.clone(), 120);

    let result = endpoint
        .create(&TenantContext::admin("default"), request(""))
        .await;
    assert!(matches!(result, Err(SessionError::Validation(_))));
}

#[tokio::test]
async fn test_endpoint_create_without_permissions_is_rejected() {
    let f = fixture();
    let endpoint = SessionEndpoint::new(f.store.clone(), 120);

    let request: CreateSessionRequest = serde_json::from_value(serde_json::json!({
        "storage_name": "docs",
        "file_path": "/q1/report.docx",
        "account": "sales",
    }))
    .unwrap();
    assert!(request.permissions.is_empty());

    let result = endpoint
        .create(&TenantContext::tenant("acme"), request)
        .await;
    assert!(matches!(result, Err(SessionError::Validation(_))));
    assert!(
        f.store
            .list_active(Some("acme"))
            .await
            .unwrap()
            .is_empty()
    );
}

#[tokio::test]
async fn test_endpoint_tenant_isolation() {
    let f = fixture();
    let endpoint = SessionEndpoint::new(f.store.clone(), 3600);
    let acme = TenantContext::tenant("acme");
    let globex = TenantContext::tenant("globex");

    let session = endpoint.create(&acme, request("crm")).await.unwrap();
    endpoint.create(&globex, request("crm")).await.unwrap();

    assert!(endpoint.get(&acme, &session.id).await.is_ok());
    assert!(matches!(
        endpoint.get(&globex, &session.id).await,
        Err(SessionError::NotFound(_))
    ));

    // Tenant callers cannot widen the listing.
    let listed = endpoint.list(&globex, Some("acme")).await.unwrap();
    assert_eq!(listed.len(), 1);
    assert!(listed.iter().all(|s| s.tenant_id == "globex"));

    let admin = TenantContext::admin("default");
    assert_eq!(endpoint.list(&admin, None).await.unwrap().len(), 2);
    assert_eq!(endpoint.list(&admin, Some("acme")).await.unwrap().len(), 1);

    assert!(!endpoint.close(&globex, &session.id).await.unwrap());
    assert!(endpoint.close(&acme, &session.id).await.unwrap());
    assert!(!endpoint.close(&acme, &session.id).await.unwrap());
}

#[tokio::test]
async fn test_endpoint_cleanup_dry_run_parity() {
    let f = fixture();
    let endpoint = SessionEndpoint::new(f.store.clone(), 3600);
    let admin = TenantContext::admin("default");

    f.store.create(input("default", Some(5))).await.unwrap();
    f.store.create(input("default", Some(5))).await.unwrap();
    let active = f.store.create(input("default", Some(3600))).await.unwrap();
    f.clock.advance(Duration::seconds(10));

    let dry = endpoint.cleanup(&admin, true).await.unwrap();
    assert_eq!(
        dry,
        CleanupReport {
            deleted: 0,
            would_delete: Some(2)
        }
    );
    assert_eq!(f.repo.len(), 3);

    let wet = endpoint.cleanup(&admin, false).await.unwrap();
    assert_eq!(wet.deleted, 2);
    assert_eq!(wet.would_delete, None);

    let remaining = endpoint.list(&admin, None).await.unwrap();
    assert_eq!(remaining.len(), 1);
    assert_eq!(remaining[0].id, active.id);
}

#[tokio::test]
async fn test_endpoint_cleanup_requires_admin() {
    let f = fixture();
    let endpoint = SessionEndpoint::new(f.store.clone(), 3600);

    assert!(matches!(
        endpoint.cleanup(&TenantContext::tenant("acme"), true).await,
        Err(SessionError::Forbidden(_))
    ));
}
