use std::fmt;
use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::TokenStore;
use crate::api::SessionEvent;

/// Observable login state.
///
/// `Initializing` means the token store has not been checked yet; callers
/// must not read it as "logged out".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthState {
    Initializing,
    Authenticated,
    Unauthenticated,
}

impl AuthState {
    pub fn is_loading(self) -> bool {
        self == AuthState::Initializing
    }

    /// `None` until initialization has completed
    pub fn is_logged_in(self) -> Option<bool> {
        match self {
            AuthState::Initializing => None,
            AuthState::Authenticated => Some(true),
            AuthState::Unauthenticated => Some(false),
        }
    }
}

impl fmt::Display for AuthState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AuthState::Initializing => write!(f, "Initializing"),
            AuthState::Authenticated => write!(f, "Logged in"),
            AuthState::Unauthenticated => write!(f, "Logged out"),
        }
    }
}

/// Owns the auth state derived from the token store.
/// Clone is cheap; clones share the same state channel.
#[derive(Clone)]
pub struct SessionManager {
    store: Arc<dyn TokenStore>,
    state: Arc<watch::Sender<AuthState>>,
}

impl SessionManager {
    /// Create a manager in the `Initializing` state
    pub fn new(store: Arc<dyn TokenStore>) -> Self {
        let (state, _) = watch::channel(AuthState::Initializing);
        Self {
            store,
            state: Arc::new(state),
        }
    }

    /// Create and immediately initialize
    pub fn start(store: Arc<dyn TokenStore>) -> Self {
        let manager = Self::new(store);
        manager.initialize();
        manager
    }

    /// Derive the state from token presence. Only the first call has any
    /// effect; later calls return the current state.
    pub fn initialize(&self) -> AuthState {
        let has_token = self.store.has_token();
        let changed = self.state.send_if_modified(|state| {
            if *state != AuthState::Initializing {
                return false;
            }
            *state = if has_token {
                AuthState::Authenticated
            } else {
                AuthState::Unauthenticated
            };
            true
        });
        let state = self.state();
        if changed {
            debug!(%state, "Session initialized");
        }
        state
    }

    /// Mark the session authenticated. The token must already be stored,
    /// which `ApiClient::login` does before returning.
    pub fn login(&self) {
        if !self.store.has_token() {
            warn!("login() called with no stored token");
        }
        self.state.send_replace(AuthState::Authenticated);
        info!("Logged in");
    }

    /// Clear the stored token and cached username, then mark the session
    /// logged out. The state changes even if clearing the store fails.
    pub fn logout(&self) -> Result<()> {
        let cleared = self.store.clear();
        self.state.send_replace(AuthState::Unauthenticated);
        info!("Logged out");
        cleared.context("Failed to clear stored session")
    }

    /// Apply a server-side rejection. The pipeline has already removed the
    /// token; this only moves the state. Returns whether the state changed.
    pub fn invalidate(&self) -> bool {
        self.state.send_if_modified(|state| {
            if *state == AuthState::Unauthenticated {
                return false;
            }
            *state = AuthState::Unauthenticated;
            true
        })
    }

    /// Apply every `SessionEvent::Invalidated` from `events` until the
    /// sending `ApiClient` (and all its clones) are dropped.
    pub fn listen(&self, mut events: broadcast::Receiver<SessionEvent>) -> JoinHandle<()> {
        let manager = self.clone();
        tokio::spawn(async move {
            loop {
                match events.recv().await {
                    Ok(SessionEvent::Invalidated) => {
                        if manager.invalidate() {
                            warn!("Session invalidated by server");
                        }
                    }
                    Err(broadcast::error::RecvError::Lagged(missed)) => {
                        // Only invalidations are ever sent
                        warn!(missed, "Session event listener lagged");
                        manager.invalidate();
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        })
    }

    pub fn state(&self) -> AuthState {
        *self.state.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<AuthState> {
        self.state.subscribe()
    }

    pub fn username(&self) -> Option<String> {
        self.store.username()
    }
}
