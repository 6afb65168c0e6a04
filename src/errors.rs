//! Error types for the console client
//!
//! Transport and credential failures are normalized into these enums at the
//! auth/API boundary; raw HTTP status codes never reach calling code.

use thiserror::Error;

/// Errors from the authentication layer
#[derive(Error, Debug)]
pub enum AuthError {
    /// Bad username/password. User-correctable; no session existed, none is touched.
    #[error("Invalid username or password")]
    InvalidCredentials,

    /// Transport-level failure (connection refused, DNS, timeout). Transient;
    /// the session is left untouched.
    #[error("Network error: {0}")]
    Network(String),

    /// A refresh was requested but no refresh token is stored. Terminal,
    /// no network call is attempted.
    #[error("No refresh token available")]
    NoRefreshToken,

    /// The backend rejected the refresh token. Terminal for the session:
    /// the local session has already been cleared when this surfaces.
    #[error("Refresh token rejected: HTTP {status}")]
    RefreshRejected { status: u16 },

    /// The session was invalidated while a request was waiting on a
    /// concurrent refresh that failed. Same remediation as RefreshRejected.
    #[error("Session expired")]
    SessionExpired,

    /// Token store read/write failure
    #[error("Token storage error: {0}")]
    Storage(String),

    /// Unexpected response shape from the identity API
    #[error("Malformed auth response: {0}")]
    Malformed(String),

    /// Any other non-2xx from the identity API
    #[error("Auth request failed: HTTP {status}: {message}")]
    Api { status: u16, message: String },
}

impl AuthError {
    /// True when the only sane reaction is a forced logout + login prompt.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            AuthError::NoRefreshToken
                | AuthError::RefreshRejected { .. }
                | AuthError::SessionExpired
        )
    }
}

impl From<reqwest::Error> for AuthError {
    fn from(err: reqwest::Error) -> Self {
        AuthError::Network(err.to_string())
    }
}

/// Errors from authenticated resource calls
#[derive(Error, Debug)]
pub enum ApiError {
    /// Session could not be maintained (refresh failed or was impossible).
    /// The local session has already been cleared.
    #[error(transparent)]
    Auth(#[from] AuthError),

    /// Transport-level failure
    #[error("Network error: {0}")]
    Network(String),

    /// Non-2xx response from the backend, already past the 401 handling
    #[error("HTTP {status}: {message}")]
    Status { status: u16, message: String },

    /// Response body did not match the expected shape
    #[error("Failed to parse response: {0}")]
    Decode(String),
}

impl ApiError {
    /// True when the caller should treat the user as logged out.
    pub fn is_session_expired(&self) -> bool {
        matches!(self, ApiError::Auth(e) if e.is_terminal())
    }
}

impl From<reqwest::Error> for ApiError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            ApiError::Decode(err.to_string())
        } else {
            ApiError::Network(err.to_string())
        }
    }
}

/// Result alias for authenticated API calls
pub type ApiResult<T> = Result<T, ApiError>;
