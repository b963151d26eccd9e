//! API client for communicating with the expense-tracker REST API.
//!
//! `ApiClient` is the request pipeline: it resolves paths against the base
//! URL, attaches the bearer token from the `TokenStore`, and turns responses
//! into typed results. The verb wrappers (`get`, `post`, `put`, `delete`,
//! `delete_item`) are the only way requests leave the client.

use std::sync::Arc;
use std::time::Duration;

use reqwest::{header, Client, Method, Response, StatusCode, Url};
use serde::{de::DeserializeOwned, Serialize};
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

use crate::auth::{validate_login, validate_signup, TokenStore};
use crate::config::Config;
use crate::models::{AuthResponse, AuthToken, LoginRequest, SignupRequest};

use super::ApiError;

// ============================================================================
// Constants
// ============================================================================

const LOGIN_PATH: &str = "/auth/login";
const SIGNUP_PATH: &str = "/auth/signup";

/// Buffered session events per subscriber before it starts lagging.
/// Only invalidations are sent, so a small buffer is plenty.
const EVENT_CHANNEL_CAPACITY: usize = 16;

/// Published by the pipeline when the server rejects the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEvent {
    /// A request got a 401; the stored token has already been removed.
    Invalidated,
}

/// Result of a successful signup
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SignupOutcome {
    /// The server issued a token; it is stored and the caller can mark the
    /// session authenticated.
    LoggedIn(AuthToken),
    /// Account created without a token; the user has to log in.
    Created { message: Option<String> },
}

/// API client for the expense tracker.
/// Clone is cheap - reqwest::Client uses Arc internally for connection pooling,
/// and clones share the token store and event channel.
#[derive(Clone)]
pub struct ApiClient {
    client: Client,
    base_url: String,
    store: Arc<dyn TokenStore>,
    events: broadcast::Sender<SessionEvent>,
}

impl ApiClient {
    /// Create a client from configuration
    pub fn new(config: &Config, store: Arc<dyn TokenStore>) -> Result<Self, ApiError> {
        Self::with_base_url(&config.api_base_url, config.request_timeout(), store)
    }

    pub fn with_base_url(
        base_url: &str,
        timeout: Duration,
        store: Arc<dyn TokenStore>,
    ) -> Result<Self, ApiError> {
        let base_url = base_url.trim().trim_end_matches('/').to_string();
        Url::parse(&base_url)?;

        let client = Client::builder().timeout(timeout).build()?;
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);

        Ok(Self {
            client,
            base_url,
            store,
            events,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn store(&self) -> &Arc<dyn TokenStore> {
        &self.store
    }

    /// Receive a `SessionEvent::Invalidated` for every 401. Handlers must
    /// tolerate repeats: concurrent requests can each trigger one.
    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }

    fn endpoint(&self, path: &str) -> Result<Url, ApiError> {
        Ok(Url::parse(&format!("{}{}", self.base_url, path))?)
    }

    /// `path` followed by `segment` as a single percent-encoded path segment
    fn endpoint_with_segment(&self, path: &str, segment: &str) -> Result<Url, ApiError> {
        let mut endpoint = self.endpoint(path)?;
        endpoint
            .path_segments_mut()
            .map_err(|_| ApiError::InvalidUrl(url::ParseError::RelativeUrlWithCannotBeABaseBase))?
            .pop_if_empty()
            .push(segment);
        Ok(endpoint)
    }

    fn headers(&self) -> Result<header::HeaderMap, ApiError> {
        let mut headers = header::HeaderMap::new();
        headers.insert(
            header::CONTENT_TYPE,
            header::HeaderValue::from_static("application/json"),
        );
        if let Some(token) = self.store.get() {
            let mut value = header::HeaderValue::from_str(&format!("Bearer {}", token.as_str()))
                .map_err(|_| ApiError::InvalidToken)?;
            value.set_sensitive(true);
            headers.insert(header::AUTHORIZATION, value);
        }
        Ok(headers)
    }

    /// Drop the rejected token and tell subscribers
    fn invalidate_session(&self) {
        warn!("Server rejected session token, invalidating session");
        if let Err(e) = self.store.remove() {
            warn!(error = %e, "Failed to remove rejected token");
        }
        // Having no subscribers is fine
        let _ = self.events.send(SessionEvent::Invalidated);
    }

    /// Check if response is successful, returning an error with the
    /// server's message if not. A 401 also invalidates the session.
    async fn check_response(&self, response: Response) -> Result<Response, ApiError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        if status == StatusCode::UNAUTHORIZED {
            self.invalidate_session();
        } else {
            debug!(status = status.as_u16(), body = %ApiError::truncate_body(&body), "Request failed");
        }
        Err(ApiError::from_status(status, &body))
    }

    async fn request<T, B>(&self, method: Method, url: Url, body: Option<&B>) -> Result<T, ApiError>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        let path = url.path().to_string();
        debug!(%method, path = %path, "API request");

        let mut builder = self.client.request(method, url).headers(self.headers()?);
        if let Some(body) = body {
            builder = builder.json(body);
        }

        let response = builder.send().await?;
        let response = self.check_response(response).await?;

        let text = response.text().await?;
        serde_json::from_str(&text).map_err(|e| {
            ApiError::InvalidResponse(format!("Failed to parse JSON response from {}: {}", path, e))
        })
    }

    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        self.request::<T, ()>(Method::GET, self.endpoint(path)?, None).await
    }

    pub async fn post<T: DeserializeOwned, B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, ApiError> {
        self.request(Method::POST, self.endpoint(path)?, Some(body)).await
    }

    pub async fn put<T: DeserializeOwned, B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, ApiError> {
        self.request(Method::PUT, self.endpoint(path)?, Some(body)).await
    }

    pub async fn delete<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        self.request::<T, ()>(Method::DELETE, self.endpoint(path)?, None).await
    }

    /// DELETE `path/<id>`, encoding `id` so it stays one path segment
    pub async fn delete_item<T: DeserializeOwned>(&self, path: &str, id: &str) -> Result<T, ApiError> {
        let url = self.endpoint_with_segment(path, id)?;
        self.request::<T, ()>(Method::DELETE, url, None).await
    }

    // ===== Authentication =====

    /// Log in and persist the issued token and username
    pub async fn login(&self, username: &str, password: &str) -> Result<AuthToken, ApiError> {
        validate_login(username, password)?;
        let username = username.trim();

        let response: AuthResponse = self
            .post(LOGIN_PATH, &LoginRequest { username, password })
            .await?;
        let token = response.issued_token().ok_or_else(|| {
            ApiError::InvalidResponse("Login response did not include a token".to_string())
        })?;

        self.persist_session(&token, username)?;
        info!(username, "Logged in");
        Ok(token)
    }

    /// Create an account. When the server also issues a token it is stored
    /// just like a login.
    pub async fn signup(
        &self,
        username: &str,
        email: &str,
        password: &str,
    ) -> Result<SignupOutcome, ApiError> {
        validate_signup(username, email, password)?;
        let username = username.trim();
        let email = email.trim();

        let response: AuthResponse = self
            .post(SIGNUP_PATH, &SignupRequest { username, email, password })
            .await?;

        match response.issued_token() {
            Some(token) => {
                self.persist_session(&token, username)?;
                info!(username, "Signed up and logged in");
                Ok(SignupOutcome::LoggedIn(token))
            }
            None => {
                info!(username, "Signed up");
                Ok(SignupOutcome::Created {
                    message: response.message,
                })
            }
        }
    }

    /// Store the token and username together. A failed username write
    /// rolls the token back so no half-written session survives.
    fn persist_session(&self, token: &AuthToken, username: &str) -> Result<(), ApiError> {
        self.store
            .set(token)
            .map_err(|e| ApiError::Storage(format!("{:#}", e)))?;
        if let Err(e) = self.store.set_username(username) {
            if let Err(rollback) = self.store.remove() {
                warn!(error = %rollback, "Failed to roll back token after username write failed");
            }
            return Err(ApiError::Storage(format!("{:#}", e)));
        }
        Ok(())
    }
}
