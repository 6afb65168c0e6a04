//! Persistent token storage
//!
//! Three keys are persisted: the access token, the refresh token and the
//! serialized user profile. They are always cleared together on logout.
//! The only writers are the auth client's login/refresh/logout paths;
//! every other component reads identity through the session context, never
//! from storage directly.

use std::fs;
use std::path::PathBuf;
use std::sync::Mutex;

use crate::auth::types::User;
use crate::errors::AuthError;

const ACCESS_TOKEN_FILE: &str = "access_token";
const REFRESH_TOKEN_FILE: &str = "refresh_token";
const USER_FILE: &str = "user.json";

/// Key/value storage for session credentials. No logic beyond get/set/clear.
pub trait TokenStore: Send + Sync {
    fn access_token(&self) -> Result<Option<String>, AuthError>;
    fn refresh_token(&self) -> Result<Option<String>, AuthError>;
    fn user(&self) -> Result<Option<User>, AuthError>;

    /// Store both tokens and the profile, as returned by a successful login.
    fn set_session(&self, access: &str, refresh: &str, user: &User) -> Result<(), AuthError>;

    /// Replace only the access token (successful refresh).
    fn set_access_token(&self, access: &str) -> Result<(), AuthError>;

    /// Replace only the cached profile (profile re-fetch).
    fn set_user(&self, user: &User) -> Result<(), AuthError>;

    /// Remove all three keys. Idempotent.
    fn clear(&self) -> Result<(), AuthError>;
}

/// File-backed store under the per-user config directory
/// (`~/.config/threatdeck/` on Linux).
pub struct FileTokenStore {
    root: PathBuf,
}

impl FileTokenStore {
    /// Store rooted at the default config directory.
    pub fn new() -> Result<Self, AuthError> {
        let root = dirs::config_dir()
            .ok_or_else(|| AuthError::Storage("could not determine config directory".to_string()))?
            .join("threatdeck");
        Ok(Self { root })
    }

    /// Store rooted at an explicit directory.
    pub fn with_root(root: PathBuf) -> Self {
        Self { root }
    }

    fn read_key(&self, name: &str) -> Result<Option<String>, AuthError> {
        let path = self.root.join(name);
        match fs::read_to_string(&path) {
            Ok(value) => Ok(Some(value)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(AuthError::Storage(format!(
                "failed to read {}: {}",
                path.display(),
                e
            ))),
        }
    }

    fn write_key(&self, name: &str, value: &str) -> Result<(), AuthError> {
        fs::create_dir_all(&self.root)
            .map_err(|e| AuthError::Storage(format!("failed to create token dir: {}", e)))?;
        let path = self.root.join(name);
        fs::write(&path, value)
            .map_err(|e| AuthError::Storage(format!("failed to write {}: {}", path.display(), e)))
    }

    fn remove_key(&self, name: &str) -> Result<(), AuthError> {
        let path = self.root.join(name);
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(AuthError::Storage(format!(
                "failed to remove {}: {}",
                path.display(),
                e
            ))),
        }
    }
}

impl TokenStore for FileTokenStore {
    fn access_token(&self) -> Result<Option<String>, AuthError> {
        self.read_key(ACCESS_TOKEN_FILE)
    }

    fn refresh_token(&self) -> Result<Option<String>, AuthError> {
        self.read_key(REFRESH_TOKEN_FILE)
    }

    fn user(&self) -> Result<Option<User>, AuthError> {
        match self.read_key(USER_FILE)? {
            Some(json) => {
                // A corrupt profile is not fatal; treat as absent.
                match serde_json::from_str(&json) {
                    Ok(user) => Ok(Some(user)),
                    Err(e) => {
                        tracing::warn!("discarding unparseable cached profile: {}", e);
                        Ok(None)
                    }
                }
            }
            None => Ok(None),
        }
    }

    fn set_session(&self, access: &str, refresh: &str, user: &User) -> Result<(), AuthError> {
        self.write_key(ACCESS_TOKEN_FILE, access)?;
        self.write_key(REFRESH_TOKEN_FILE, refresh)?;
        self.set_user(user)
    }

    fn set_access_token(&self, access: &str) -> Result<(), AuthError> {
        self.write_key(ACCESS_TOKEN_FILE, access)
    }

    fn set_user(&self, user: &User) -> Result<(), AuthError> {
        let json = serde_json::to_string(user)
            .map_err(|e| AuthError::Storage(format!("failed to serialize profile: {}", e)))?;
        self.write_key(USER_FILE, &json)
    }

    fn clear(&self) -> Result<(), AuthError> {
        self.remove_key(ACCESS_TOKEN_FILE)?;
        self.remove_key(REFRESH_TOKEN_FILE)?;
        self.remove_key(USER_FILE)
    }
}

/// In-memory store used by tests.
#[derive(Default)]
pub struct MemoryTokenStore {
    inner: Mutex<MemoryInner>,
}

#[derive(Default)]
struct MemoryInner {
    access: Option<String>,
    refresh: Option<String>,
    user: Option<User>,
}

impl MemoryTokenStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl TokenStore for MemoryTokenStore {
    fn access_token(&self) -> Result<Option<String>, AuthError> {
        Ok(self.inner.lock().unwrap().access.clone())
    }

    fn refresh_token(&self) -> Result<Option<String>, AuthError> {
        Ok(self.inner.lock().unwrap().refresh.clone())
    }

    fn user(&self) -> Result<Option<User>, AuthError> {
        Ok(self.inner.lock().unwrap().user.clone())
    }

    fn set_session(&self, access: &str, refresh: &str, user: &User) -> Result<(), AuthError> {
        let mut inner = self.inner.lock().unwrap();
        inner.access = Some(access.to_string());
        inner.refresh = Some(refresh.to_string());
        inner.user = Some(user.clone());
        Ok(())
    }

    fn set_access_token(&self, access: &str) -> Result<(), AuthError> {
        self.inner.lock().unwrap().access = Some(access.to_string());
        Ok(())
    }

    fn set_user(&self, user: &User) -> Result<(), AuthError> {
        self.inner.lock().unwrap().user = Some(user.clone());
        Ok(())
    }

    fn clear(&self) -> Result<(), AuthError> {
        let mut inner = self.inner.lock().unwrap();
        inner.access = None;
        inner.refresh = None;
        inner.user = None;
        Ok(())
    }
}
