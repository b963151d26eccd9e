use anyhow::{Context, Result};
use keyring::Entry;

use super::TokenStore;
use crate::models::AuthToken;

const SERVICE_NAME: &str = "spendwise";

/// Keychain account holding the session token
const TOKEN_ACCOUNT: &str = "session-token";

/// Keychain account holding the cached username
const USERNAME_ACCOUNT: &str = "username";

/// Token store backed by the OS keychain.
pub struct KeyringTokenStore;

impl KeyringTokenStore {
    fn entry(account: &str) -> Result<Entry> {
        Entry::new(SERVICE_NAME, account).context("Failed to create keyring entry")
    }

    fn read(account: &str) -> Option<String> {
        Self::entry(account).ok()?.get_password().ok()
    }

    fn write(account: &str, value: &str) -> Result<()> {
        Self::entry(account)?
            .set_password(value)
            .context("Failed to store value in keychain")
    }

    fn delete(account: &str) -> Result<()> {
        match Self::entry(account)?.delete_credential() {
            Ok(()) | Err(keyring::Error::NoEntry) => Ok(()),
            Err(e) => Err(e).context("Failed to delete credential from keychain"),
        }
    }
}

impl TokenStore for KeyringTokenStore {
    fn get(&self) -> Option<AuthToken> {
        Self::read(TOKEN_ACCOUNT).map(AuthToken::from)
    }

    fn set(&self, token: &AuthToken) -> Result<()> {
        Self::write(TOKEN_ACCOUNT, token.as_str())
    }

    fn remove(&self) -> Result<()> {
        Self::delete(TOKEN_ACCOUNT)
    }

    fn username(&self) -> Option<String> {
        Self::read(USERNAME_ACCOUNT)
    }

    fn set_username(&self, username: &str) -> Result<()> {
        Self::write(USERNAME_ACCOUNT, username)
    }

    fn clear(&self) -> Result<()> {
        let token = Self::delete(TOKEN_ACCOUNT);
        let username = Self::delete(USERNAME_ACCOUNT);
        token.and(username)
    }
}
