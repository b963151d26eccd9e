use std::path::{Path, PathBuf};
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::models::AuthToken;

/// Session file name in cache directory
const SESSION_FILE: &str = "session.json";

/// Process-wide slot for the session token and the cached username.
///
/// A stored token is treated as valid until the server rejects it; there is
/// no expiry or refresh on the client. Reads are snapshots and writes are
/// last-writer-wins.
pub trait TokenStore: Send + Sync {
    fn get(&self) -> Option<AuthToken>;

    fn set(&self, token: &AuthToken) -> Result<()>;

    /// Drop the token only. The cached username survives.
    fn remove(&self) -> Result<()>;

    fn username(&self) -> Option<String>;

    fn set_username(&self, username: &str) -> Result<()>;

    /// Drop the token and the cached username together.
    fn clear(&self) -> Result<()>;

    fn has_token(&self) -> bool {
        self.get().is_some()
    }
}

/// The two persisted values, as written to disk
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StoredSession {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<AuthToken>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
}

impl StoredSession {
    fn is_empty(&self) -> bool {
        self.token.is_none() && self.username.is_none()
    }
}

fn read_lock(lock: &RwLock<StoredSession>) -> RwLockReadGuard<'_, StoredSession> {
    lock.read().unwrap_or_else(PoisonError::into_inner)
}

fn write_lock(lock: &RwLock<StoredSession>) -> RwLockWriteGuard<'_, StoredSession> {
    lock.write().unwrap_or_else(PoisonError::into_inner)
}

/// In-process store; nothing outlives the process.
#[derive(Debug, Default)]
pub struct MemoryTokenStore {
    inner: RwLock<StoredSession>,
}

impl MemoryTokenStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_token(token: impl Into<AuthToken>) -> Self {
        Self {
            inner: RwLock::new(StoredSession {
                token: Some(token.into()),
                username: None,
            }),
        }
    }
}

impl TokenStore for MemoryTokenStore {
    fn get(&self) -> Option<AuthToken> {
        read_lock(&self.inner).token.clone()
    }

    fn set(&self, token: &AuthToken) -> Result<()> {
        write_lock(&self.inner).token = Some(token.clone());
        Ok(())
    }

    fn remove(&self) -> Result<()> {
        write_lock(&self.inner).token = None;
        Ok(())
    }

    fn username(&self) -> Option<String> {
        read_lock(&self.inner).username.clone()
    }

    fn set_username(&self, username: &str) -> Result<()> {
        write_lock(&self.inner).username = Some(username.to_string());
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        *write_lock(&self.inner) = StoredSession::default();
        Ok(())
    }
}

/// Store backed by `session.json` in the cache directory.
///
/// The file is read once when opened and rewritten on every change; an
/// emptied session deletes the file.
#[derive(Debug)]
pub struct FileTokenStore {
    path: PathBuf,
    inner: RwLock<StoredSession>,
}

impl FileTokenStore {
    /// Open the store in `cache_dir`, loading any existing session
    pub fn open(cache_dir: &Path) -> Result<Self> {
        let path = cache_dir.join(SESSION_FILE);
        let data = if path.exists() {
            let contents = std::fs::read_to_string(&path)
                .context("Failed to read session file")?;
            serde_json::from_str(&contents).context("Failed to parse session file")?
        } else {
            StoredSession::default()
        };
        debug!(path = %path.display(), has_token = data.token.is_some(), "Opened session file");
        Ok(Self {
            path,
            inner: RwLock::new(data),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn update(&self, apply: impl FnOnce(&mut StoredSession)) -> Result<()> {
        let mut data = write_lock(&self.inner);
        apply(&mut data);
        self.persist(&data)
    }

    fn persist(&self, data: &StoredSession) -> Result<()> {
        if data.is_empty() {
            if self.path.exists() {
                std::fs::remove_file(&self.path).context("Failed to remove session file")?;
            }
            return Ok(());
        }
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let contents = serde_json::to_string_pretty(data)?;
        std::fs::write(&self.path, contents).context("Failed to write session file")?;
        Ok(())
    }
}

impl TokenStore for FileTokenStore {
    fn get(&self) -> Option<AuthToken> {
        read_lock(&self.inner).token.clone()
    }

    fn set(&self, token: &AuthToken) -> Result<()> {
        self.update(|data| data.token = Some(token.clone()))
    }

    fn remove(&self) -> Result<()> {
        self.update(|data| data.token = None)
    }

    fn username(&self) -> Option<String> {
        read_lock(&self.inner).username.clone()
    }

    fn set_username(&self, username: &str) -> Result<()> {
        self.update(|data| data.username = Some(username.to_string()))
    }

    fn clear(&self) -> Result<()> {
        self.update(|data| *data = StoredSession::default())
    }
}
