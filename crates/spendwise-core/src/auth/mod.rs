//! Authentication module for session state and token storage.
//!
//! This module provides:
//! - `TokenStore`: the persisted token slot, with memory, file and
//!   OS keychain backends
//! - `SessionManager`: the `Initializing → Authenticated | Unauthenticated`
//!   state derived from the store
//! - Client-side validation for login, signup and expense prompts
//!
//! Tokens never expire client-side; only a 401 from the server ends a session.

pub mod credentials;
pub mod session;
pub mod store;
pub mod validation;

pub use credentials::KeyringTokenStore;
pub use session::{AuthState, SessionManager};
pub use store::{FileTokenStore, MemoryTokenStore, StoredSession, TokenStore};
pub use validation::{validate_login, validate_prompt, validate_signup, ValidationError};
