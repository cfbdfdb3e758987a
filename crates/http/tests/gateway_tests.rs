//! Integration tests for the API gateway against a mock backend

use navaja_core::{
    AuthConfig, MemoryStorage, Role, Router, SessionStorage, SessionStore, User,
};
use navaja_http::{ApiClient, AuthEndpoints, ClientError, InvalidationReason, SessionEvent};
use serde_json::{Value, json};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast::error::TryRecvError;
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

struct Harness {
    server: MockServer,
    storage: Arc<MemoryStorage>,
    session: Arc<SessionStore>,
    client: ApiClient,
}

fn seed(storage: &MemoryStorage, access: &str, refresh: Option<&str>) {
    storage.set(AuthConfig::ACCESS_TOKEN_KEY, access).unwrap();
    if let Some(refresh) = refresh {
        storage.set(AuthConfig::REFRESH_TOKEN_KEY, refresh).unwrap();
    }
    let mut user = User::with_role(Role::Empleado);
    user.empleado_id = Some("E1".into());
    storage
        .set(AuthConfig::USER_KEY, &serde_json::to_string(&user).unwrap())
        .unwrap();
}

async fn harness(tokens: Option<(&str, Option<&str>)>) -> Harness {
    let server = MockServer::start().await;
    let storage = Arc::new(MemoryStorage::new());
    if let Some((access, refresh)) = tokens {
        seed(&storage, access, refresh);
    }

    let auth = AuthEndpoints::new(server.uri()).unwrap();
    let session = Arc::new(SessionStore::restore(storage.clone(), Arc::new(auth)));
    let client = ApiClient::builder()
        .base_url(server.uri())
        .session(session.clone())
        .build()
        .unwrap();

    Harness {
        server,
        storage,
        session,
        client,
    }
}

fn bearer(token: &str) -> String {
    format!("Bearer {token}")
}

#[tokio::test]
async fn test_builder_requires_base_url_and_session() {
    let session = Arc::new(SessionStore::restore(
        Arc::new(MemoryStorage::new()),
        Arc::new(AuthEndpoints::new("http://localhost:8000/api").unwrap()),
    ));

    let missing_url = ApiClient::builder().session(session.clone()).build();
    assert!(matches!(missing_url, Err(ClientError::Configuration(_))));

    let missing_session = ApiClient::builder().base_url("http://localhost:8000/api").build();
    assert!(matches!(missing_session, Err(ClientError::Configuration(_))));

    let client = ApiClient::builder()
        .base_url("http://localhost:8000/api/")
        .session(session)
        .build()
        .unwrap();
    assert_eq!(client.base_url(), "http://localhost:8000/api");
}

#[tokio::test]
async fn test_no_token_sends_no_authorization_header() {
    let h = harness(None).await;
    Mock::given(method("GET"))
        .and(path("/tools/status/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "ok": true })))
        .expect(1)
        .mount(&h.server)
        .await;

    let body: Value = h.client.get("/tools/status/").await.unwrap();
    assert_eq!(body["ok"], true);

    let requests = h.server.received_requests().await.unwrap();
    assert_eq!(requests.len(), 1);
    assert!(requests[0].headers.get("authorization").is_none());
}

#[tokio::test]
async fn test_stored_token_is_attached_as_bearer() {
    let h = harness(Some(("access-1", Some("refresh-1")))).await;
    Mock::given(method("GET"))
        .and(path("/users/me/"))
        .and(header("authorization", bearer("access-1").as_str()))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": 1,
            "empleado_id": "E1",
            "username": "ana",
            "full_name": "Ana Pérez",
            "role": "empleado"
        })))
        .expect(1)
        .mount(&h.server)
        .await;

    let me = h.client.me().await.unwrap();
    assert_eq!(me.role, Role::Empleado);
    assert_eq!(me.display_name(), "Ana Pérez");

    let requests = h.server.received_requests().await.unwrap();
    let values: Vec<_> = requests[0].headers.get_all("authorization").iter().collect();
    assert_eq!(values.len(), 1);
    assert_eq!(values[0], "Bearer access-1");
}

#[tokio::test]
async fn test_token_is_read_fresh_for_each_request() {
    let h = harness(Some(("access-1", Some("refresh-1")))).await;
    Mock::given(method("GET"))
        .and(path("/reports/"))
        .and(header("authorization", bearer("access-9").as_str()))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(1)
        .mount(&h.server)
        .await;

    h.storage
        .set(AuthConfig::ACCESS_TOKEN_KEY, "access-9")
        .unwrap();
    assert_eq!(h.session.snapshot().access_token.as_deref(), Some("access-1"));

    let reports: Vec<Value> = h.client.get("/reports/").await.unwrap();
    assert!(reports.is_empty());
}

#[tokio::test]
async fn test_expired_token_is_refreshed_and_request_replayed() {
    let h = harness(Some(("access-1", Some("refresh-1")))).await;
    let mut events = h.client.subscribe();

    Mock::given(method("GET"))
        .and(path("/reports/"))
        .and(header("authorization", bearer("access-1").as_str()))
        .respond_with(
            ResponseTemplate::new(401)
                .set_body_json(json!({ "detail": "Given token not valid for any token type" })),
        )
        .expect(1)
        .mount(&h.server)
        .await;
    Mock::given(method("POST"))
        .and(path("/auth/refresh/"))
        .and(body_json(json!({ "refresh": "refresh-1" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "access": "access-2" })))
        .expect(1)
        .mount(&h.server)
        .await;
    Mock::given(method("GET"))
        .and(path("/reports/"))
        .and(header("authorization", bearer("access-2").as_str()))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{ "id": 1 }])))
        .expect(1)
        .mount(&h.server)
        .await;

    let reports: Vec<Value> = h.client.get("/reports/").await.unwrap();

    assert_eq!(reports, vec![json!({ "id": 1 })]);
    assert_eq!(
        h.storage.get(AuthConfig::ACCESS_TOKEN_KEY).unwrap().as_deref(),
        Some("access-2")
    );
    assert_eq!(h.session.snapshot().access_token.as_deref(), Some("access-2"));
    assert!(h.session.is_authenticated());
    assert_eq!(events.try_recv(), Err(TryRecvError::Empty));
}

#[tokio::test]
async fn test_rejected_refresh_logs_out_and_forces_login() {
    let h = harness(Some(("access-1", Some("refresh-1")))).await;
    let router = Router::with_defaults(h.session.clone()).unwrap();
    router.push("/reports").unwrap();
    let mut events = h.client.subscribe();

    Mock::given(method("GET"))
        .and(path("/reports/"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({ "detail": "expired" })))
        .expect(1)
        .mount(&h.server)
        .await;
    Mock::given(method("POST"))
        .and(path("/auth/refresh/"))
        .respond_with(
            ResponseTemplate::new(401).set_body_json(json!({ "detail": "Token is blacklisted" })),
        )
        .expect(1)
        .mount(&h.server)
        .await;

    let result: Result<Value, _> = h.client.get("/reports/").await;

    match result {
        Err(ClientError::AuthenticationFailed { message, .. }) => assert_eq!(message, "expired"),
        other => panic!("expected the original 401, got {other:?}"),
    }
    assert!(!h.session.is_authenticated());
    for key in [
        AuthConfig::ACCESS_TOKEN_KEY,
        AuthConfig::REFRESH_TOKEN_KEY,
        AuthConfig::USER_KEY,
    ] {
        assert_eq!(h.storage.get(key).unwrap(), None);
    }

    let event = events.try_recv().unwrap();
    assert_eq!(
        event,
        SessionEvent::Invalidated {
            reason: InvalidationReason::RefreshRejected
        }
    );
    router.force_login().unwrap();
    assert_eq!(router.current().unwrap().name, "Login");
}

#[tokio::test]
async fn test_unreachable_refresh_endpoint_counts_as_rejection() {
    let h = harness(Some(("access-1", Some("refresh-1")))).await;
    let mut events = h.client.subscribe();

    Mock::given(method("GET"))
        .and(path("/reports/"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&h.server)
        .await;
    Mock::given(method("POST"))
        .and(path("/auth/refresh/"))
        .respond_with(ResponseTemplate::new(502).set_body_string("Bad Gateway"))
        .expect(1)
        .mount(&h.server)
        .await;

    let result: Result<Value, _> = h.client.get("/reports/").await;

    assert!(result.unwrap_err().is_auth_expired());
    assert!(!h.session.is_authenticated());
    assert_eq!(
        events.try_recv().unwrap(),
        SessionEvent::Invalidated {
            reason: InvalidationReason::RefreshRejected
        }
    );
}

#[tokio::test]
async fn test_missing_refresh_token_logs_out_without_refresh_call() {
    let h = harness(Some(("access-1", None))).await;
    let mut events = h.client.subscribe();

    Mock::given(method("GET"))
        .and(path("/reports/"))
        .respond_with(ResponseTemplate::new(401))
        .expect(1)
        .mount(&h.server)
        .await;
    Mock::given(method("POST"))
        .and(path("/auth/refresh/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "access": "never" })))
        .expect(0)
        .mount(&h.server)
        .await;

    let result: Result<Value, _> = h.client.get("/reports/").await;

    assert!(matches!(result, Err(ClientError::AuthenticationFailed { .. })));
    assert!(!h.session.is_authenticated());
    assert_eq!(
        events.try_recv().unwrap(),
        SessionEvent::Invalidated {
            reason: InvalidationReason::MissingRefreshToken
        }
    );
}

#[tokio::test]
async fn test_replay_is_attempted_at_most_once() {
    let h = harness(Some(("access-1", Some("refresh-1")))).await;
    let mut events = h.client.subscribe();

    Mock::given(method("GET"))
        .and(path("/reports/"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({ "detail": "nope" })))
        .expect(2)
        .mount(&h.server)
        .await;
    Mock::given(method("POST"))
        .and(path("/auth/refresh/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "access": "access-2" })))
        .expect(1)
        .mount(&h.server)
        .await;

    let result: Result<Value, _> = h.client.get("/reports/").await;

    assert!(result.unwrap_err().is_auth_expired());
    // The refresh itself worked, so the session is kept
    assert!(h.session.is_authenticated());
    assert_eq!(h.session.stored_access_token().as_deref(), Some("access-2"));
    assert_eq!(events.try_recv(), Err(TryRecvError::Empty));
}

#[tokio::test]
async fn test_other_errors_pass_through_unchanged() {
    let h = harness(Some(("access-1", Some("refresh-1")))).await;

    Mock::given(method("GET"))
        .and(path("/admin/users/"))
        .respond_with(
            ResponseTemplate::new(403)
                .set_body_json(json!({ "detail": "Acceso restringido a SuperAdmin." })),
        )
        .expect(1)
        .mount(&h.server)
        .await;
    Mock::given(method("POST"))
        .and(path("/auth/refresh/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "access": "x" })))
        .expect(0)
        .mount(&h.server)
        .await;

    let err = h.client.list_users().await.unwrap_err();

    match err {
        ClientError::Forbidden { message, .. } => {
            assert_eq!(message, "Acceso restringido a SuperAdmin.");
        }
        other => panic!("expected Forbidden, got {other:?}"),
    }
    assert!(h.session.is_authenticated());
}

#[tokio::test]
async fn test_concurrent_expiry_refreshes_once() {
    let h = harness(Some(("access-1", Some("refresh-1")))).await;

    Mock::given(method("GET"))
        .and(header("authorization", bearer("access-1").as_str()))
        .respond_with(ResponseTemplate::new(401))
        .expect(2)
        .mount(&h.server)
        .await;
    Mock::given(method("POST"))
        .and(path("/auth/refresh/"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({ "access": "access-2" }))
                .set_delay(Duration::from_millis(200)),
        )
        .expect(1)
        .mount(&h.server)
        .await;
    Mock::given(method("GET"))
        .and(header("authorization", bearer("access-2").as_str()))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "ok": true })))
        .expect(2)
        .mount(&h.server)
        .await;

    let (first, second) = tokio::join!(
        h.client.get::<Value>("/reports/"),
        h.client.get::<Value>("/klaes/orders/")
    );

    assert_eq!(first.unwrap()["ok"], true);
    assert_eq!(second.unwrap()["ok"], true);
}

#[tokio::test]
async fn test_concurrent_expiry_with_rejected_refresh_invalidates_once() {
    let h = harness(Some(("access-1", Some("refresh-1")))).await;
    let mut events = h.client.subscribe();

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(401))
        .expect(2)
        .mount(&h.server)
        .await;
    Mock::given(method("POST"))
        .and(path("/auth/refresh/"))
        .respond_with(
            ResponseTemplate::new(401)
                .set_body_json(json!({ "detail": "Token is blacklisted" }))
                .set_delay(Duration::from_millis(200)),
        )
        .expect(1)
        .mount(&h.server)
        .await;

    let (first, second) = tokio::join!(
        h.client.get::<Value>("/reports/"),
        h.client.get::<Value>("/klaes/orders/")
    );

    assert!(first.unwrap_err().is_auth_expired());
    assert!(second.unwrap_err().is_auth_expired());
    assert!(!h.session.is_authenticated());
    assert_eq!(
        events.try_recv().unwrap(),
        SessionEvent::Invalidated {
            reason: InvalidationReason::RefreshRejected
        }
    );
    assert!(matches!(events.try_recv(), Err(TryRecvError::Empty)));
}

#[tokio::test]
async fn test_post_sends_json_body_and_empty_response_decodes() {
    let h = harness(Some(("access-1", Some("refresh-1")))).await;

    Mock::given(method("POST"))
        .and(path("/tools/klaes/reprocess/"))
        .and(body_json(json!({ "order": "A-17" })))
        .respond_with(ResponseTemplate::new(202).set_body_json(json!({ "queued": true })))
        .expect(1)
        .mount(&h.server)
        .await;
    Mock::given(method("DELETE"))
        .and(path("/admin/users/3/"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&h.server)
        .await;

    let queued: Value = h
        .client
        .post("/tools/klaes/reprocess/", &json!({ "order": "A-17" }))
        .await
        .unwrap();
    assert_eq!(queued["queued"], true);

    h.client.delete::<()>("/admin/users/3/").await.unwrap();
}

#[tokio::test]
async fn test_login_through_auth_endpoints_persists_session() {
    let h = harness(None).await;

    Mock::given(method("POST"))
        .and(path("/auth/login/"))
        .and(body_json(json!({ "empleado_id": "E1", "password": "p" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access": "access-1",
            "refresh": "refresh-1",
            "user": { "id": 1, "empleado_id": "E1", "username": "ana", "role": "superadmin" }
        })))
        .expect(1)
        .mount(&h.server)
        .await;

    h.session.login("E1", "p").await.unwrap();

    assert!(h.session.is_authenticated());
    assert!(h.session.is_super_admin());
    assert_eq!(
        h.storage.get(AuthConfig::ACCESS_TOKEN_KEY).unwrap().as_deref(),
        Some("access-1")
    );
    assert_eq!(
        h.storage.get(AuthConfig::REFRESH_TOKEN_KEY).unwrap().as_deref(),
        Some("refresh-1")
    );
    let user: User =
        serde_json::from_str(&h.storage.get(AuthConfig::USER_KEY).unwrap().unwrap()).unwrap();
    assert_eq!(user.role, Role::SuperAdmin);
}

#[tokio::test]
async fn test_invalid_login_returns_server_detail() {
    let h = harness(None).await;

    Mock::given(method("POST"))
        .and(path("/auth/login/"))
        .respond_with(
            ResponseTemplate::new(400).set_body_json(json!({ "detail": "Invalid credentials" })),
        )
        .expect(1)
        .mount(&h.server)
        .await;

    let failure = h.session.login("E1", "wrong").await.unwrap_err();

    assert_eq!(failure.message, "Invalid credentials");
    assert!(!h.session.is_authenticated());
    assert_eq!(h.storage.get(AuthConfig::ACCESS_TOKEN_KEY).unwrap(), None);
    assert_eq!(h.storage.get(AuthConfig::USER_KEY).unwrap(), None);
}

#[tokio::test]
async fn test_login_against_unreachable_server_uses_generic_message() {
    let storage = Arc::new(MemoryStorage::new());
    // Nothing listens on the discard port
    let auth = AuthEndpoints::new("http://127.0.0.1:9").unwrap();
    let session = SessionStore::restore(storage, Arc::new(auth));

    let failure = session.login("E1", "p").await.unwrap_err();

    assert_eq!(failure.message, AuthConfig::GENERIC_LOGIN_ERROR);
}
