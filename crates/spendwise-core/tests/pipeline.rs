mod common;

use std::sync::Arc;
use std::time::Duration;

use reqwest::StatusCode;
use serde_json::{json, Value};
use tokio::sync::broadcast::error::TryRecvError;

use common::{client_with_token, spawn_server, VALID_PASSWORD, VALID_TOKEN};
use spendwise_core::auth::ValidationError;
use spendwise_core::auth::MemoryTokenStore;
use spendwise_core::{ApiClient, ApiError, AuthState, AuthToken, SessionEvent, SessionManager, SignupOutcome, TokenStore};

#[tokio::test]
async fn test_bearer_header_attached_when_token_stored() {
    let (client, _store, server) = client_with_token(Some(VALID_TOKEN)).await;

    client.fetch_categories().await.unwrap();

    let request = server.last();
    assert_eq!(request.authorization.as_deref(), Some("Bearer valid-token"));
    assert_eq!(request.content_type.as_deref(), Some("application/json"));
}

#[tokio::test]
async fn test_no_authorization_header_without_token() {
    let (client, _store, server) = client_with_token(None).await;

    let _ = client.fetch_categories().await;

    let request = server.last();
    assert!(request.authorization.is_none());
    assert_eq!(request.content_type.as_deref(), Some("application/json"));
}

#[tokio::test]
async fn test_unauthorized_clears_store_and_publishes_event() {
    let (client, store, _server) = client_with_token(Some("expired-token")).await;
    let mut events = client.subscribe();

    let err = client.fetch_expenses(&Default::default()).await.unwrap_err();

    assert!(err.is_unauthorized());
    assert_eq!(err.to_string(), "Unauthorized: Invalid authentication credentials");
    assert!(store.get().is_none());
    assert_eq!(events.try_recv(), Ok(SessionEvent::Invalidated));
    assert_eq!(events.try_recv(), Err(TryRecvError::Empty));
}

#[tokio::test]
async fn test_unauthorized_keeps_cached_username() {
    let (client, store, _server) = client_with_token(Some("expired-token")).await;
    store.set_username("asha").unwrap();

    let _ = client.fetch_categories().await;

    assert!(store.get().is_none());
    assert_eq!(store.username().as_deref(), Some("asha"));
}

#[tokio::test]
async fn test_concurrent_unauthorized_requests_each_invalidate() {
    let (client, store, _server) = client_with_token(Some("expired-token")).await;
    let mut events = client.subscribe();

    let (a, b) = tokio::join!(client.fetch_categories(), client.fetch_monthly_summary(None));

    assert!(a.unwrap_err().is_unauthorized());
    assert!(b.unwrap_err().is_unauthorized());
    assert!(store.get().is_none());
    assert_eq!(events.try_recv(), Ok(SessionEvent::Invalidated));
    assert_eq!(events.try_recv(), Ok(SessionEvent::Invalidated));
}

#[tokio::test]
async fn test_session_manager_follows_invalidation() {
    let (client, store, _server) = client_with_token(Some("expired-token")).await;
    let session = SessionManager::start(store.clone());
    assert_eq!(session.state(), AuthState::Authenticated);

    let mut states = session.subscribe();
    let listener = session.listen(client.subscribe());

    let _ = client.fetch_categories().await;
    states.changed().await.unwrap();
    assert_eq!(*states.borrow(), AuthState::Unauthenticated);

    listener.abort();
}

#[tokio::test]
async fn test_request_error_carries_server_detail() {
    let (client, store, _server) = client_with_token(Some(VALID_TOKEN)).await;

    let err = client.delete_expense("42").await.unwrap_err();

    match err {
        ApiError::Request { status, ref message } => {
            assert_eq!(status, StatusCode::NOT_FOUND);
            assert_eq!(message, "Expense not found");
        }
        other => panic!("expected request error, got {other:?}"),
    }
    // Non-401 failures leave the token alone
    assert_eq!(store.get(), Some(AuthToken::new(VALID_TOKEN)));
}

#[tokio::test]
async fn test_non_json_error_body_uses_generic_message() {
    let (client, _store, _server) = client_with_token(None).await;

    let err = client.get::<Value>("/boom").await.unwrap_err();

    assert_eq!(err.status(), Some(StatusCode::INTERNAL_SERVER_ERROR));
    assert_eq!(err.to_string(), "Request failed");
}

#[tokio::test]
async fn test_undecodable_success_body_is_invalid_response() {
    let (client, _store, _server) = client_with_token(None).await;

    let err = client.get::<Value>("/broken").await.unwrap_err();

    assert!(matches!(err, ApiError::InvalidResponse(_)));
}

#[tokio::test]
async fn test_put_sends_json_body() {
    let (client, _store, server) = client_with_token(None).await;

    let echoed: Value = client.put("/echo", &json!({"note": "hello"})).await.unwrap();

    assert_eq!(echoed, json!({"note": "hello"}));
    assert_eq!(server.last().method, "PUT");
}

#[tokio::test]
async fn test_network_error_when_server_unreachable() {
    let store = Arc::new(MemoryTokenStore::with_token(VALID_TOKEN));
    // Nothing listens on the discard port locally
    let client = ApiClient::with_base_url(
        "http://127.0.0.1:9",
        std::time::Duration::from_secs(2),
        store.clone(),
    )
    .unwrap();

    let err = client.fetch_categories().await.unwrap_err();

    assert!(matches!(err, ApiError::Network(_)));
    assert!(store.has_token());
}

#[tokio::test]
async fn test_timeout_surfaces_as_network_error() {
    let (base_url, _server) = common::spawn_server().await;
    let store = Arc::new(MemoryTokenStore::new());
    let client = ApiClient::with_base_url(
        &base_url,
        std::time::Duration::from_millis(200),
        store,
    )
    .unwrap();

    let err = client.get::<Value>("/slow").await.unwrap_err();

    match err {
        ApiError::Network(e) => assert!(e.is_timeout()),
        other => panic!("expected network error, got {other:?}"),
    }
}

#[tokio::test]
async fn test_login_stores_token_and_username() {
    let (client, store, server) = client_with_token(None).await;

    let token = client.login("  asha ", VALID_PASSWORD).await.unwrap();

    assert_eq!(token, AuthToken::new(VALID_TOKEN));
    assert_eq!(store.get(), Some(AuthToken::new(VALID_TOKEN)));
    assert_eq!(store.username().as_deref(), Some("asha"));
    assert_eq!(
        server.last().body,
        Some(json!({"username": "asha", "password": VALID_PASSWORD}))
    );
}

#[tokio::test]
async fn test_login_then_session_manager_login_and_logout() {
    let (client, store, _server) = client_with_token(None).await;
    let session = SessionManager::start(store.clone());
    assert_eq!(session.state(), AuthState::Unauthenticated);

    client.login("asha", VALID_PASSWORD).await.unwrap();
    session.login();
    assert_eq!(session.state(), AuthState::Authenticated);

    session.logout().unwrap();
    assert_eq!(session.state(), AuthState::Unauthenticated);
    assert!(store.get().is_none());
    assert!(store.username().is_none());
}

/// Memory store whose username slot can't be written
#[derive(Default)]
struct UsernameWriteFails(MemoryTokenStore);

impl TokenStore for UsernameWriteFails {
    fn get(&self) -> Option<AuthToken> {
        self.0.get()
    }

    fn set(&self, token: &AuthToken) -> anyhow::Result<()> {
        self.0.set(token)
    }

    fn remove(&self) -> anyhow::Result<()> {
        self.0.remove()
    }

    fn username(&self) -> Option<String> {
        self.0.username()
    }

    fn set_username(&self, _username: &str) -> anyhow::Result<()> {
        anyhow::bail!("disk full")
    }

    fn clear(&self) -> anyhow::Result<()> {
        self.0.clear()
    }
}

#[tokio::test]
async fn test_login_rolls_back_token_when_username_write_fails() {
    let (base_url, _server) = spawn_server().await;
    let store: Arc<dyn TokenStore> = Arc::new(UsernameWriteFails::default());
    let client = ApiClient::with_base_url(&base_url, Duration::from_secs(2), store.clone()).unwrap();

    let err = client.login("asha", VALID_PASSWORD).await.unwrap_err();

    assert!(matches!(err, ApiError::Storage(_)));
    assert!(store.get().is_none());
    assert_eq!(SessionManager::start(store).state(), AuthState::Unauthenticated);
}

#[tokio::test]
async fn test_login_with_wrong_password() {
    let (client, store, _server) = client_with_token(None).await;

    let err = client.login("asha", "wrong-password").await.unwrap_err();

    assert_eq!(err.to_string(), "Unauthorized: Incorrect username or password");
    assert!(store.get().is_none());
}

#[tokio::test]
async fn test_login_validation_skips_network() {
    let (client, _store, server) = client_with_token(None).await;

    let err = client.login("", "whatever").await.unwrap_err();

    assert!(matches!(err, ApiError::Validation(ValidationError::MissingUsername)));
    assert!(server.requests().is_empty());
}

#[tokio::test]
async fn test_signup_without_token() {
    let (client, store, _server) = client_with_token(None).await;

    let outcome = client.signup("newuser", "new@example.com", "secret1").await.unwrap();

    assert_eq!(
        outcome,
        SignupOutcome::Created {
            message: Some("User created successfully".to_string())
        }
    );
    assert!(store.get().is_none());
}

#[tokio::test]
async fn test_signup_with_legacy_token_field() {
    let (client, store, _server) = client_with_token(None).await;

    let outcome = client.signup("legacy", "legacy@example.com", "secret1").await.unwrap();

    assert_eq!(outcome, SignupOutcome::LoggedIn(AuthToken::new("legacy-token")));
    assert_eq!(store.get(), Some(AuthToken::new("legacy-token")));
}

#[tokio::test]
async fn test_signup_rejections() {
    let (client, _store, server) = client_with_token(None).await;

    let err = client.signup("asha", "not-an-email", "secret1").await.unwrap_err();
    assert!(matches!(err, ApiError::Validation(ValidationError::InvalidEmail)));
    let err = client.signup("asha", "asha@example.com", "123").await.unwrap_err();
    assert!(matches!(err, ApiError::Validation(ValidationError::PasswordTooShort)));
    assert!(server.requests().is_empty());

    let err = client.signup("taken", "taken@example.com", "secret1").await.unwrap_err();
    assert_eq!(err.to_string(), "Username already registered");
}
