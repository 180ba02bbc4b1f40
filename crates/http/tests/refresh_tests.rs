//! Token refresh behaviour of the HTTP client against a mock backend

use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use serde_json::json;
use smm_core::{MemoryTokenStorage, SessionError, TokenStorage};
use smm_http::{ClientError, Identity, SmmClient};
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn client_with_user(server: &MockServer, storage: Arc<MemoryTokenStorage>) -> SmmClient {
    let client = SmmClient::builder()
        .base_url(server.uri())
        .token_storage(storage)
        .build()
        .unwrap();
    client.session(Identity::User).set_tokens("A1", "R1");
    client
}

async fn mount_transactions(server: &MockServer, token: &str, status: u16, expected: u64) {
    Mock::given(method("GET"))
        .and(path("/user/transactions"))
        .and(header("authorization", format!("Bearer {token}").as_str()))
        .respond_with(ResponseTemplate::new(status).set_body_json(json!([])))
        .expect(expected)
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_concurrent_401s_share_one_refresh() {
    let server = MockServer::start().await;
    mount_transactions(&server, "A1", 401, 3).await;
    mount_transactions(&server, "A2", 200, 3).await;
    Mock::given(method("POST"))
        .and(path("/auth/refresh"))
        .and(body_json(json!({"refreshToken": "R1"})))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"accessToken": "A2"}))
                .set_delay(Duration::from_millis(300)),
        )
        .expect(1)
        .mount(&server)
        .await;

    let storage = Arc::new(MemoryTokenStorage::new());
    let client = client_with_user(&server, storage.clone());

    let results = join_all((0..3).map(|_| client.user_deposits())).await;
    for result in results {
        assert!(result.unwrap().is_empty());
    }

    let session = client.session(Identity::User);
    assert_eq!(session.access_token().as_deref(), Some("A2"));
    assert_eq!(session.refresh_token().as_deref(), Some("R1"));
    assert_eq!(storage.get("accessToken").unwrap().as_deref(), Some("A2"));
    server.verify().await;
}

#[tokio::test]
async fn test_rejected_refresh_token_logs_out_every_waiter() {
    let server = MockServer::start().await;
    mount_transactions(&server, "A1", 401, 3).await;
    Mock::given(method("POST"))
        .and(path("/auth/refresh"))
        .respond_with(
            ResponseTemplate::new(401)
                .set_body_json(json!({"message": "Invalid refresh token"}))
                .set_delay(Duration::from_millis(300)),
        )
        .expect(1)
        .mount(&server)
        .await;

    let storage = Arc::new(MemoryTokenStorage::new());
    let client = client_with_user(&server, storage.clone());

    let results = join_all((0..3).map(|_| client.user_deposits())).await;
    for result in results {
        let error = result.unwrap_err();
        assert!(error.requires_login());
        assert!(matches!(
            error,
            ClientError::Refresh(SessionError::Rejected { status: 401, .. })
        ));
    }

    assert!(!client.session(Identity::User).is_authenticated());
    assert_eq!(storage.get("accessToken").unwrap(), None);
    assert_eq!(storage.get("refreshToken").unwrap(), None);
    server.verify().await;
}

#[tokio::test]
async fn test_request_is_replayed_only_once() {
    let server = MockServer::start().await;
    mount_transactions(&server, "A1", 401, 1).await;
    mount_transactions(&server, "A2", 401, 1).await;
    Mock::given(method("POST"))
        .and(path("/auth/refresh"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"accessToken": "A2"})))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_with_user(&server, Arc::new(MemoryTokenStorage::new()));

    let result = client.user_deposits().await;
    assert!(matches!(result, Err(ClientError::AuthenticationFailed(_))));
    // The refreshed token is kept even though the replay was refused
    assert_eq!(
        client.session(Identity::User).access_token().as_deref(),
        Some("A2")
    );
    server.verify().await;
}

#[tokio::test]
async fn test_refresh_without_token_in_body_logs_out() {
    let server = MockServer::start().await;
    mount_transactions(&server, "A1", 401, 1).await;
    Mock::given(method("POST"))
        .and(path("/auth/refresh"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_with_user(&server, Arc::new(MemoryTokenStorage::new()));

    let result = client.user_deposits().await;
    assert!(matches!(
        result,
        Err(ClientError::Refresh(SessionError::MissingAccessToken))
    ));
    assert!(!client.session(Identity::User).is_authenticated());
}

#[tokio::test]
async fn test_anonymous_401_needs_login() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/user/profile"))
        .respond_with(ResponseTemplate::new(401))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/auth/refresh"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let client = SmmClient::new(server.uri()).unwrap();
    let result = client.profile().await;
    assert!(matches!(
        result,
        Err(ClientError::Refresh(SessionError::Unauthenticated))
    ));
    server.verify().await;
}

#[tokio::test]
async fn test_failed_admin_refresh_leaves_user_session_alone() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/admin/analytics/overview"))
        .respond_with(ResponseTemplate::new(401))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/auth/refresh"))
        .and(body_json(json!({"refreshToken": "admin-R1"})))
        .respond_with(
            ResponseTemplate::new(403)
                .set_body_string("revoked")
                .set_delay(Duration::from_millis(200)),
        )
        .expect(1)
        .mount(&server)
        .await;
    mount_transactions(&server, "A1", 200, 1).await;

    let storage = Arc::new(MemoryTokenStorage::new());
    let client = client_with_user(&server, storage.clone());
    client
        .session(Identity::Admin)
        .set_tokens("admin-A1", "admin-R1");

    let (admin, user) = tokio::join!(client.analytics_overview(), client.user_deposits());

    assert!(matches!(
        admin,
        Err(ClientError::Refresh(SessionError::Rejected { status: 403, .. }))
    ));
    assert!(user.is_ok());
    assert!(!client.session(Identity::Admin).is_authenticated());
    assert_eq!(storage.get("admin_token").unwrap(), None);
    assert_eq!(
        client.session(Identity::User).access_token().as_deref(),
        Some("A1")
    );
    assert_eq!(storage.get("refreshToken").unwrap().as_deref(), Some("R1"));
    server.verify().await;
}

#[tokio::test]
async fn test_admin_and_user_refresh_independently() {
    let server = MockServer::start().await;
    mount_transactions(&server, "A1", 401, 1).await;
    mount_transactions(&server, "A2", 200, 1).await;
    Mock::given(method("GET"))
        .and(path("/admin/balance"))
        .and(header("authorization", "Bearer admin-A1"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/admin/balance"))
        .and(header("authorization", "Bearer admin-A2"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"balance": "41.20", "currency": "USD"})),
        )
        .mount(&server)
        .await;
    for (refresh, access) in [("R1", "A2"), ("admin-R1", "admin-A2")] {
        Mock::given(method("POST"))
            .and(path("/auth/refresh"))
            .and(body_json(json!({"refreshToken": refresh})))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({"accessToken": access}))
                    .set_delay(Duration::from_millis(200)),
            )
            .expect(1)
            .mount(&server)
            .await;
    }

    let client = client_with_user(&server, Arc::new(MemoryTokenStorage::new()));
    client
        .session(Identity::Admin)
        .set_tokens("admin-A1", "admin-R1");

    let (balance, deposits) = tokio::join!(client.provider_balance(), client.user_deposits());

    assert_eq!(balance.unwrap().balance.as_deref(), Some("41.20"));
    assert!(deposits.is_ok());
    assert_eq!(
        client.session(Identity::Admin).access_token().as_deref(),
        Some("admin-A2")
    );
    server.verify().await;
}

#[tokio::test]
async fn test_hung_refresh_times_out() {
    let server = MockServer::start().await;
    mount_transactions(&server, "A1", 401, 1).await;
    Mock::given(method("POST"))
        .and(path("/auth/refresh"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"accessToken": "A2"}))
                .set_delay(Duration::from_secs(5)),
        )
        .mount(&server)
        .await;

    let client = SmmClient::builder()
        .base_url(server.uri())
        .refresh_timeout(Duration::from_millis(100))
        .build()
        .unwrap();
    client.session(Identity::User).set_tokens("A1", "R1");

    let result = client.user_deposits().await;
    assert!(matches!(
        result,
        Err(ClientError::Refresh(SessionError::TimedOut(_)))
    ));
    assert!(!client.session(Identity::User).is_authenticated());
}

#[tokio::test]
async fn test_late_401_replays_with_already_refreshed_token() {
    let server = MockServer::start().await;
    for (token, status) in [("A1", 401), ("A2", 200)] {
        Mock::given(method("GET"))
            .and(path("/orders"))
            .and(header("authorization", format!("Bearer {token}").as_str()))
            .respond_with(ResponseTemplate::new(status).set_body_json(json!({"items": []})))
            .expect(1)
            .mount(&server)
            .await;
    }
    // Rejected only after the refresh triggered by the orders call is done
    Mock::given(method("GET"))
        .and(path("/user/transactions"))
        .and(header("authorization", "Bearer A1"))
        .respond_with(ResponseTemplate::new(401).set_delay(Duration::from_millis(400)))
        .expect(1)
        .mount(&server)
        .await;
    mount_transactions(&server, "A2", 200, 1).await;
    Mock::given(method("POST"))
        .and(path("/auth/refresh"))
        .and(body_json(json!({"refreshToken": "R1"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"accessToken": "A2"})))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_with_user(&server, Arc::new(MemoryTokenStorage::new()));

    let (orders, deposits) = tokio::join!(client.user_orders(None), client.user_deposits());

    assert!(orders.unwrap().items.is_empty());
    assert!(deposits.unwrap().is_empty());
    let session = client.session(Identity::User);
    assert!(session.is_authenticated());
    assert_eq!(session.access_token().as_deref(), Some("A2"));
    server.verify().await;
}
