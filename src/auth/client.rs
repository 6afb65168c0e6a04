//! Client for the backend identity API
//!
//! Handles login, logout, token refresh and profile fetch against the
//! `/auth/*` endpoints. This client talks raw HTTP on purpose: keeping the
//! login/refresh calls off the authenticated transport is what prevents a
//! 401 on the refresh endpoint from triggering another refresh.
//!
//! Token refresh is serialized through a generation-counted gate so that
//! any number of concurrent 401s result in at most one refresh call on the
//! wire; the losers adopt the winner's token, or fail together.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use reqwest::StatusCode;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::auth::session::SessionContext;
use crate::auth::store::TokenStore;
use crate::auth::types::{
    LoginRequest, LoginResponse, TokenRefreshRequest, TokenRefreshResponse, User,
};
use crate::errors::AuthError;

const HTTP_TIMEOUT: Duration = Duration::from_secs(30);

/// Authentication client. Sole writer of the token store and the session
/// context.
pub struct AuthClient {
    http: reqwest::Client,
    base_url: String,
    store: Arc<dyn TokenStore>,
    session: Arc<SessionContext>,
    gate: RefreshGate,
}

/// Serializes refreshes. The generation counter increments every time the
/// stored access token is replaced; a caller that saw generation G and then
/// got a 401 only performs a network refresh if the generation is still G
/// when it acquires the lock.
struct RefreshGate {
    generation: AtomicU64,
    lock: Mutex<()>,
}

impl AuthClient {
    pub fn new(
        base_url: impl Into<String>,
        store: Arc<dyn TokenStore>,
        session: Arc<SessionContext>,
    ) -> Self {
        Self::with_timeout(base_url, store, session, HTTP_TIMEOUT)
    }

    pub fn with_timeout(
        base_url: impl Into<String>,
        store: Arc<dyn TokenStore>,
        session: Arc<SessionContext>,
        timeout: Duration,
    ) -> Self {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .expect("Failed to create HTTP client");

        Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            store,
            session,
            gate: RefreshGate {
                generation: AtomicU64::new(0),
                lock: Mutex::new(()),
            },
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Populate the session context from persisted state, as at app start.
    /// A cached profile without an access token is treated as anonymous.
    pub fn load_cached_session(&self) -> Result<(), AuthError> {
        if self.store.access_token()?.is_none() {
            self.session.publish(None);
            return Ok(());
        }
        self.session.publish(self.store.user()?);
        Ok(())
    }

    /// Synchronous read of the cached session. Never triggers network I/O.
    pub fn current_user(&self) -> Option<User> {
        self.session.current_user()
    }

    /// Authenticate with username/password. On success both tokens and the
    /// returned profile are persisted and the new session is published.
    pub async fn login(&self, username: &str, password: &str) -> Result<User, AuthError> {
        let resp = self
            .http
            .post(self.url("/auth/login/"))
            .json(&LoginRequest { username, password })
            .send()
            .await?;

        let status = resp.status();
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::BAD_REQUEST {
            return Err(AuthError::InvalidCredentials);
        }
        if !status.is_success() {
            let message = resp.text().await.unwrap_or_default();
            return Err(AuthError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let body: LoginResponse = resp
            .json()
            .await
            .map_err(|e| AuthError::Malformed(e.to_string()))?;

        self.store
            .set_session(&body.access, &body.refresh, &body.user)?;
        self.gate.generation.fetch_add(1, Ordering::AcqRel);
        self.session.publish(Some(body.user.clone()));
        info!(username = %body.user.username, role = %body.user.role, "login successful");
        Ok(body.user)
    }

    /// Log out. The server-side invalidation is best-effort; the local
    /// session is cleared no matter what the network does.
    pub async fn logout(&self) -> Result<(), AuthError> {
        let mut req = self.http.post(self.url("/auth/logout/"));
        if let Ok(Some(token)) = self.store.access_token() {
            req = req.bearer_auth(token);
        }
        if let Err(e) = req.send().await {
            debug!("server-side logout failed, clearing locally anyway: {}", e);
        }
        self.clear_local_session()
    }

    /// Clear persisted tokens and publish an anonymous session. Never
    /// touches the network.
    pub fn clear_local_session(&self) -> Result<(), AuthError> {
        self.store.clear()?;
        self.session.publish(None);
        Ok(())
    }

    /// Generation to capture before dispatching an authenticated request;
    /// pass it back to [`refresh_after`](Self::refresh_after) on a 401.
    pub fn refresh_generation(&self) -> u64 {
        self.gate.generation.load(Ordering::Acquire)
    }

    /// Exchange the refresh token for a new access token.
    pub async fn refresh(&self) -> Result<String, AuthError> {
        let seen = self.refresh_generation();
        self.refresh_after(seen).await
    }

    /// Refresh on behalf of a request that observed generation `seen` and
    /// then received a 401. If another caller already replaced the token,
    /// the stored token is returned without a network call.
    pub async fn refresh_after(&self, seen: u64) -> Result<String, AuthError> {
        let _guard = self.gate.lock.lock().await;

        if self.gate.generation.load(Ordering::Acquire) != seen {
            // A concurrent refresh (or login) already settled while we
            // queued; adopt its outcome.
            return match self.store.access_token()? {
                Some(token) => Ok(token),
                None => Err(AuthError::SessionExpired),
            };
        }

        let refresh_token = match self.store.refresh_token()? {
            Some(token) => token,
            None => {
                warn!("refresh requested with no refresh token stored");
                self.clear_local_session()?;
                self.gate.generation.fetch_add(1, Ordering::AcqRel);
                return Err(AuthError::NoRefreshToken);
            }
        };

        let resp = self
            .http
            .post(self.url("/auth/token/refresh/"))
            .json(&TokenRefreshRequest {
                refresh: &refresh_token,
            })
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            // Terminal for the session: full local logout before surfacing.
            warn!(status = status.as_u16(), "refresh token rejected, logging out");
            self.clear_local_session()?;
            self.gate.generation.fetch_add(1, Ordering::AcqRel);
            return Err(AuthError::RefreshRejected {
                status: status.as_u16(),
            });
        }

        let body: TokenRefreshResponse = resp
            .json()
            .await
            .map_err(|e| AuthError::Malformed(e.to_string()))?;

        self.store.set_access_token(&body.access)?;
        self.gate.generation.fetch_add(1, Ordering::AcqRel);
        debug!("access token refreshed");
        Ok(body.access)
    }

    /// Fetch the current profile from the backend and update the cached
    /// session. Retries once through the refresh gate on a 401.
    pub async fn fetch_current_user(&self) -> Result<User, AuthError> {
        let seen = self.refresh_generation();
        let token = self
            .store
            .access_token()?
            .ok_or(AuthError::SessionExpired)?;

        let resp = self
            .http
            .get(self.url("/auth/user/"))
            .bearer_auth(&token)
            .send()
            .await?;

        let resp = if resp.status() == StatusCode::UNAUTHORIZED {
            let new_token = self.refresh_after(seen).await?;
            self.http
                .get(self.url("/auth/user/"))
                .bearer_auth(&new_token)
                .send()
                .await?
        } else {
            resp
        };

        let status = resp.status();
        if !status.is_success() {
            let message = resp.text().await.unwrap_or_default();
            return Err(AuthError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let user: User = resp
            .json()
            .await
            .map_err(|e| AuthError::Malformed(e.to_string()))?;
        self.store.set_user(&user)?;
        self.session.publish(Some(user.clone()));
        Ok(user)
    }
}
