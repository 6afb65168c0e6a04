//! Authenticated REST transport and endpoint wrappers
//!
//! [`ApiClient`] is the one pipeline every resource call goes through. It
//! attaches the bearer token, dispatches, and on a 401 performs exactly one
//! refresh-and-retry before giving up. Auth endpoints never pass through
//! here; the auth client dispatches those itself, which is what keeps the
//! refresh endpoint from recursing into this pipeline.
//!
//! The transport returns typed errors and never navigates; reacting to a
//! lost session (telling the user to log in again) is shell policy.

pub mod analysis;
pub mod aws;
pub mod dashboard;
pub mod mitigations;
pub mod reports;
pub mod tasks;
pub mod users;

use std::sync::Arc;
use std::time::Duration;

use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::auth::client::AuthClient;
use crate::auth::store::TokenStore;
use crate::errors::{ApiError, ApiResult};

const HTTP_TIMEOUT: Duration = Duration::from_secs(30);

/// Paginated list envelope used by the backend's list endpoints.
#[derive(Debug, Deserialize)]
pub struct Page<T> {
    pub count: u64,
    #[serde(default)]
    pub next: Option<String>,
    #[serde(default)]
    pub previous: Option<String>,
    pub results: Vec<T>,
}

/// Authenticated HTTP client for resource endpoints.
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
    store: Arc<dyn TokenStore>,
    auth: Arc<AuthClient>,
}

impl ApiClient {
    pub fn new(
        base_url: impl Into<String>,
        store: Arc<dyn TokenStore>,
        auth: Arc<AuthClient>,
    ) -> Self {
        Self::with_timeout(base_url, store, auth, HTTP_TIMEOUT)
    }

    pub fn with_timeout(
        base_url: impl Into<String>,
        store: Arc<dyn TokenStore>,
        auth: Arc<AuthClient>,
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
            auth,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Dispatch with bearer attach and single refresh-and-retry on 401.
    /// The `prepare` closure rebuilds the request for the retry.
    async fn execute<F>(&self, prepare: F) -> ApiResult<reqwest::Response>
    where
        F: Fn() -> reqwest::RequestBuilder,
    {
        // Capture the token generation before reading the token, so a 401
        // can be attributed to the token we actually sent.
        let seen = self.auth.refresh_generation();
        let token = self.store.access_token().map_err(ApiError::Auth)?;

        let mut req = prepare();
        if let Some(token) = &token {
            req = req.bearer_auth(token);
        }
        let resp = req.send().await?;

        if resp.status() != StatusCode::UNAUTHORIZED {
            return Ok(resp);
        }

        debug!("401 received, attempting token refresh");
        let new_token = self.auth.refresh_after(seen).await.map_err(ApiError::Auth)?;

        // One retry, win or lose; its outcome goes back to the caller as-is.
        let resp = prepare().bearer_auth(new_token).send().await?;
        Ok(resp)
    }

    async fn decode<T: DeserializeOwned>(resp: reqwest::Response) -> ApiResult<T> {
        let status = resp.status();
        if !status.is_success() {
            let message = resp.text().await.unwrap_or_default();
            return Err(ApiError::Status {
                status: status.as_u16(),
                message,
            });
        }
        resp.json::<T>()
            .await
            .map_err(|e| ApiError::Decode(e.to_string()))
    }

    async fn expect_success(resp: reqwest::Response) -> ApiResult<()> {
        let status = resp.status();
        if !status.is_success() {
            let message = resp.text().await.unwrap_or_default();
            return Err(ApiError::Status {
                status: status.as_u16(),
                message,
            });
        }
        Ok(())
    }

    pub async fn get<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> ApiResult<T> {
        let url = self.url(path);
        let resp = self
            .execute(|| self.http.get(&url).query(query))
            .await?;
        Self::decode(resp).await
    }

    pub async fn post<T: DeserializeOwned, B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
    ) -> ApiResult<T> {
        let url = self.url(path);
        let resp = self.execute(|| self.http.post(&url).json(body)).await?;
        Self::decode(resp).await
    }

    pub async fn put<T: DeserializeOwned, B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
    ) -> ApiResult<T> {
        let url = self.url(path);
        let resp = self.execute(|| self.http.put(&url).json(body)).await?;
        Self::decode(resp).await
    }

    pub async fn patch<T: DeserializeOwned, B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
    ) -> ApiResult<T> {
        let url = self.url(path);
        let resp = self.execute(|| self.http.patch(&url).json(body)).await?;
        Self::decode(resp).await
    }

    pub async fn delete(&self, path: &str) -> ApiResult<()> {
        let url = self.url(path);
        let resp = self.execute(|| self.http.delete(&url)).await?;
        Self::expect_success(resp).await
    }

    /// Multipart upload, used for file analysis submissions. The form is
    /// rebuilt from owned bytes on retry.
    pub async fn post_multipart<T: DeserializeOwned>(
        &self,
        path: &str,
        file_name: String,
        file_bytes: Vec<u8>,
        fields: Vec<(String, String)>,
    ) -> ApiResult<T> {
        let url = self.url(path);
        let resp = self
            .execute(|| {
                let mut form = reqwest::multipart::Form::new().part(
                    "file",
                    reqwest::multipart::Part::bytes(file_bytes.clone())
                        .file_name(file_name.clone()),
                );
                for (key, value) in &fields {
                    form = form.text(key.clone(), value.clone());
                }
                self.http.post(&url).multipart(form)
            })
            .await?;
        Self::decode(resp).await
    }

}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::session::SessionContext;
    use crate::auth::store::MemoryTokenStore;
    use crate::auth::types::{Role, User};
    use crate::errors::AuthError;
    use mockito::Matcher;

    fn test_user() -> User {
        User {
            id: 9,
            username: "amal".to_string(),
            email: "amal@example.com".to_string(),
            role: Role::Analyst,
            first_name: None,
            last_name: None,
            is_active: Some(true),
            date_joined: None,
            last_login: None,
        }
    }

    fn harness(base_url: &str, with_session: bool) -> (ApiClient, Arc<dyn TokenStore>) {
        let store: Arc<dyn TokenStore> = Arc::new(MemoryTokenStore::new());
        if with_session {
            store
                .set_session("old-access", "old-refresh", &test_user())
                .unwrap();
        }
        let session = Arc::new(SessionContext::new());
        let auth = Arc::new(AuthClient::new(base_url, store.clone(), session));
        let api = ApiClient::new(base_url, store.clone(), auth);
        (api, store)
    }

    #[derive(Debug, Deserialize)]
    struct Probe {
        ok: bool,
    }

    #[tokio::test]
    async fn attaches_stored_bearer_token() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/probe/")
            .match_header("authorization", "Bearer old-access")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"ok": true}"#)
            .create_async()
            .await;

        let (api, _store) = harness(&server.url(), true);
        let probe: Probe = api.get("/probe/", &[]).await.unwrap();
        assert!(probe.ok);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn omits_header_when_no_token_is_stored() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/probe/")
            .match_header("authorization", Matcher::Missing)
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"ok": true}"#)
            .create_async()
            .await;

        let (api, _store) = harness(&server.url(), false);
        let probe: Probe = api.get("/probe/", &[]).await.unwrap();
        assert!(probe.ok);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn non_401_errors_pass_through_untouched() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/probe/")
            .with_status(403)
            .with_body("forbidden")
            .create_async()
            .await;
        let refresh = server
            .mock("POST", "/auth/token/refresh/")
            .expect(0)
            .create_async()
            .await;

        let (api, _store) = harness(&server.url(), true);
        let err = api.get::<Probe>("/probe/", &[]).await.unwrap_err();
        assert!(matches!(err, ApiError::Status { status: 403, .. }));
        refresh.assert_async().await;
    }

    #[tokio::test]
    async fn retries_exactly_once_with_the_refreshed_token() {
        let mut server = mockito::Server::new_async().await;
        let stale = server
            .mock("GET", "/probe/")
            .match_header("authorization", "Bearer old-access")
            .with_status(401)
            .expect(1)
            .create_async()
            .await;
        let refresh = server
            .mock("POST", "/auth/token/refresh/")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"access": "fresh-access"}"#)
            .expect(1)
            .create_async()
            .await;
        let fresh = server
            .mock("GET", "/probe/")
            .match_header("authorization", "Bearer fresh-access")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"ok": true}"#)
            .expect(1)
            .create_async()
            .await;

        let (api, store) = harness(&server.url(), true);
        let probe: Probe = api.get("/probe/", &[]).await.unwrap();

        assert!(probe.ok);
        assert_eq!(
            store.access_token().unwrap().as_deref(),
            Some("fresh-access")
        );
        stale.assert_async().await;
        refresh.assert_async().await;
        fresh.assert_async().await;
    }

    #[tokio::test]
    async fn retried_401_is_returned_without_a_second_refresh() {
        let mut server = mockito::Server::new_async().await;
        // The endpoint rejects even the fresh token.
        let _probe = server
            .mock("GET", "/probe/")
            .with_status(401)
            .expect(2)
            .create_async()
            .await;
        let refresh = server
            .mock("POST", "/auth/token/refresh/")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"access": "fresh-access"}"#)
            .expect(1)
            .create_async()
            .await;

        let (api, _store) = harness(&server.url(), true);
        let err = api.get::<Probe>("/probe/", &[]).await.unwrap_err();
        assert!(matches!(err, ApiError::Status { status: 401, .. }));
        refresh.assert_async().await;
    }

    #[tokio::test]
    async fn failed_refresh_clears_the_session_and_surfaces_it() {
        let mut server = mockito::Server::new_async().await;
        let _probe = server
            .mock("GET", "/probe/")
            .with_status(401)
            .create_async()
            .await;
        let _refresh = server
            .mock("POST", "/auth/token/refresh/")
            .with_status(401)
            .create_async()
            .await;

        let (api, store) = harness(&server.url(), true);
        let err = api.get::<Probe>("/probe/", &[]).await.unwrap_err();

        assert!(err.is_session_expired(), "unexpected error: {err}");
        assert!(matches!(
            err,
            ApiError::Auth(AuthError::RefreshRejected { status: 401 })
        ));
        assert!(store.access_token().unwrap().is_none());
        assert!(store.refresh_token().unwrap().is_none());
        assert!(store.user().unwrap().is_none());
    }

    #[tokio::test]
    async fn concurrent_401s_trigger_a_single_refresh() {
        let mut server = mockito::Server::new_async().await;
        // Requests carrying the stale token get 401; requests carrying the
        // fresh token succeed. This keeps the test deterministic no matter
        // how the five tasks interleave.
        let _stale = server
            .mock("GET", "/probe/")
            .match_header("authorization", "Bearer old-access")
            .with_status(401)
            .expect_at_least(1)
            .create_async()
            .await;
        let _fresh = server
            .mock("GET", "/probe/")
            .match_header("authorization", "Bearer fresh-access")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"ok": true}"#)
            .expect_at_least(1)
            .create_async()
            .await;
        let refresh = server
            .mock("POST", "/auth/token/refresh/")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"access": "fresh-access"}"#)
            .expect(1)
            .create_async()
            .await;

        let (api, _store) = harness(&server.url(), true);
        let api = Arc::new(api);

        let tasks: Vec<_> = (0..5)
            .map(|_| {
                let api = api.clone();
                tokio::spawn(async move { api.get::<Probe>("/probe/", &[]).await })
            })
            .collect();

        for task in tasks {
            let probe = task.await.unwrap().unwrap();
            assert!(probe.ok);
        }
        refresh.assert_async().await;
    }
}
