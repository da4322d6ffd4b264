//! REST client with identity headers.

use std::sync::Arc;

use reqwest::{Method, RequestBuilder, StatusCode};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, info, instrument, warn};

use super::{ApiError, error_message};
use crate::config::StorefrontConfig;
use crate::environment::Environment;
use crate::error::add_breadcrumb;
use crate::models::{AuthTokens, RefreshRequest};
use crate::storage::{LocalStore, StorageError, keys};

/// Header carrying the anonymous session identifier.
pub const SESSION_HEADER: &str = "X-Session-ID";

/// Endpoint exchanging a refresh token for a new token pair.
pub const REFRESH_PATH: &str = "/auth/refresh";

/// Client for the bakery REST API.
///
/// Cheap to clone; all clones share one connection pool.
#[derive(Clone)]
pub struct ApiClient {
    inner: Arc<ApiClientInner>,
}

struct ApiClientInner {
    client: reqwest::Client,
    base_url: String,
    store: Arc<dyn LocalStore>,
    environment: Environment,
    /// Held while a token refresh is in flight, so concurrent 401s refresh once.
    refresh_lock: tokio::sync::Mutex<()>,
}

impl std::fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiClient")
            .field("base_url", &self.inner.base_url)
            .field("environment", &self.inner.environment)
            .finish_non_exhaustive()
    }
}

impl ApiClient {
    /// Create a client for `config.api_url`.
    ///
    /// Identity values are read from `store` on every request, so a session
    /// id or token written after construction is picked up immediately.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Http` if the HTTP client cannot be built.
    pub fn new(config: &StorefrontConfig, store: Arc<dyn LocalStore>) -> Result<Self, ApiError> {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()?;

        Ok(Self {
            inner: Arc::new(ApiClientInner {
                client,
                base_url: config.api_url.clone(),
                store,
                environment: config.environment,
                refresh_lock: tokio::sync::Mutex::new(()),
            }),
        })
    }

    /// Base URL requests are resolved against.
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.inner.base_url
    }

    /// Execution environment the client was built for.
    #[must_use]
    pub fn environment(&self) -> Environment {
        self.inner.environment
    }

    // =========================================================================
    // Verbs
    // =========================================================================

    /// `GET path`.
    ///
    /// # Errors
    ///
    /// Returns `ApiError` on transport failure, non-success status, or an
    /// undecodable body.
    #[instrument(skip(self), fields(method = "GET"))]
    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        let body = self.send(Method::GET, path, |r| r).await?;
        decode(path, &body)
    }

    /// `GET path` with an explicit bearer token instead of the stored one.
    /// No refresh is attempted.
    ///
    /// # Errors
    ///
    /// Returns `ApiError` on transport failure, non-success status, or an
    /// undecodable body.
    #[instrument(skip(self, token), fields(method = "GET"))]
    pub async fn get_with_token<T: DeserializeOwned>(
        &self,
        path: &str,
        token: &str,
    ) -> Result<T, ApiError> {
        let response = self
            .inner
            .client
            .get(self.url(path))
            .bearer_auth(token)
            .send()
            .await?;
        let body = read(response, path).await?;
        decode(path, &body)
    }

    /// `GET path?query`.
    ///
    /// # Errors
    ///
    /// Returns `ApiError` on transport failure, non-success status, or an
    /// undecodable body.
    #[instrument(skip(self, query), fields(method = "GET"))]
    pub async fn get_with_query<T, Q>(&self, path: &str, query: &Q) -> Result<T, ApiError>
    where
        T: DeserializeOwned,
        Q: Serialize + ?Sized,
    {
        let body = self.send(Method::GET, path, |r| r.query(query)).await?;
        decode(path, &body)
    }

    /// `POST path` with a JSON body.
    ///
    /// # Errors
    ///
    /// Returns `ApiError` on transport failure, non-success status, or an
    /// undecodable body.
    #[instrument(skip(self, body), fields(method = "POST"))]
    pub async fn post<T, B>(&self, path: &str, body: &B) -> Result<T, ApiError>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        let text = self.send(Method::POST, path, |r| r.json(body)).await?;
        decode(path, &text)
    }

    /// `PUT path` with a JSON body.
    ///
    /// # Errors
    ///
    /// Returns `ApiError` on transport failure, non-success status, or an
    /// undecodable body.
    #[instrument(skip(self, body), fields(method = "PUT"))]
    pub async fn put<T, B>(&self, path: &str, body: &B) -> Result<T, ApiError>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        let text = self.send(Method::PUT, path, |r| r.json(body)).await?;
        decode(path, &text)
    }

    /// `DELETE path`, expecting a JSON body back.
    ///
    /// # Errors
    ///
    /// Returns `ApiError` on transport failure, non-success status, or an
    /// undecodable body.
    #[instrument(skip(self), fields(method = "DELETE"))]
    pub async fn delete<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        let body = self.send(Method::DELETE, path, |r| r).await?;
        decode(path, &body)
    }

    /// `DELETE path`, tolerating an empty answer.
    ///
    /// Returns `None` for `204 No Content`, an empty body, or a JSON `null`.
    ///
    /// # Errors
    ///
    /// Returns `ApiError` on transport failure, non-success status, or an
    /// undecodable non-empty body.
    #[instrument(skip(self), fields(method = "DELETE"))]
    pub async fn delete_optional<T: DeserializeOwned>(
        &self,
        path: &str,
    ) -> Result<Option<T>, ApiError> {
        let body = self.send(Method::DELETE, path, |r| r).await?;
        if body.trim().is_empty() {
            return Ok(None);
        }
        decode(path, &body)
    }

    // =========================================================================
    // Tokens
    // =========================================================================

    /// Whether an access token is stored and would be sent.
    #[must_use]
    pub fn has_access_token(&self) -> bool {
        self.inner.environment.attaches_identity() && self.stored(keys::ACCESS_TOKEN).is_some()
    }

    /// Persist a freshly issued token pair. Headless clients keep nothing.
    pub(crate) fn store_tokens(&self, tokens: &AuthTokens) -> Result<(), StorageError> {
        if !self.inner.environment.attaches_identity() {
            debug!("Headless client, not storing tokens");
            return Ok(());
        }
        self.inner.store.set(keys::ACCESS_TOKEN, &tokens.access_token)?;
        self.inner.store.set(keys::REFRESH_TOKEN, &tokens.refresh_token)
    }

    /// Forget both tokens.
    pub(crate) fn clear_tokens(&self) -> Result<(), StorageError> {
        self.inner.store.remove(keys::ACCESS_TOKEN)?;
        self.inner.store.remove(keys::REFRESH_TOKEN)
    }

    /// Exchange the stored refresh token for a new pair.
    ///
    /// `sent` is the access token the rejected request carried. If the stored
    /// token differs, another request already refreshed and this one only
    /// needs to retry. Returns whether a retry is worthwhile; on failure both
    /// tokens are cleared.
    async fn refresh_tokens(&self, sent: Option<&str>) -> bool {
        let _guard = self.inner.refresh_lock.lock().await;

        let current = self.stored(keys::ACCESS_TOKEN);
        if current.is_some() && current.as_deref() != sent {
            debug!("Access token already refreshed");
            return true;
        }

        let Some(refresh_token) = self.stored(keys::REFRESH_TOKEN) else {
            self.drop_tokens("no refresh token stored");
            return false;
        };

        let request = self
            .inner
            .client
            .post(self.url(REFRESH_PATH))
            .json(&RefreshRequest { refresh_token });
        let result = match request.send().await {
            Ok(response) => read(response, REFRESH_PATH)
                .await
                .and_then(|text| decode::<AuthTokens>(REFRESH_PATH, &text)),
            Err(e) => Err(e.into()),
        };

        match result {
            Ok(tokens) => match self.store_tokens(&tokens) {
                Ok(()) => {
                    info!("Access token refreshed");
                    true
                }
                Err(e) => {
                    warn!(error = %e, "Failed to store refreshed tokens");
                    false
                }
            },
            Err(e) => {
                self.drop_tokens(&e.to_string());
                false
            }
        }
    }

    fn drop_tokens(&self, reason: &str) {
        warn!(reason, "Signing out after rejected access token");
        add_breadcrumb("auth", "Tokens cleared", Some(&[("reason", reason)]));
        if let Err(e) = self.clear_tokens() {
            warn!(error = %e, "Failed to clear stored tokens");
        }
    }

    // =========================================================================
    // Plumbing
    // =========================================================================

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.inner.base_url, path.trim_start_matches('/'))
    }

    /// Start a request with the identity headers attached.
    #[cfg(test)]
    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        self.authorized(method, path).0
    }

    /// Start a request with the identity headers attached, returning the
    /// access token it carries.
    fn authorized(&self, method: Method, path: &str) -> (RequestBuilder, Option<String>) {
        let mut request = self.inner.client.request(method, self.url(path));

        if !self.inner.environment.attaches_identity() {
            return (request, None);
        }

        if let Some(session_id) = self.stored(keys::CART_SESSION_ID) {
            request = request.header(SESSION_HEADER, session_id);
        }
        let token = self.stored(keys::ACCESS_TOKEN);
        if let Some(token) = &token {
            request = request.bearer_auth(token);
        }
        (request, token)
    }

    /// Read a non-blank value from local storage. Unreadable storage sends
    /// the request without that header.
    fn stored(&self, key: &str) -> Option<String> {
        match self.inner.store.get(key) {
            Ok(value) => value.filter(|v| !v.trim().is_empty()),
            Err(e) => {
                warn!(key, error = %e, "Local storage unreadable, omitting header");
                None
            }
        }
    }

    /// Whether a 401 on `path` should go through the token refresh.
    fn refreshes_on(&self, path: &str) -> bool {
        self.inner.environment.attaches_identity()
            && path.trim_start_matches('/') != REFRESH_PATH.trim_start_matches('/')
    }

    /// Send a request and return the body of a successful response.
    ///
    /// A 401 triggers one token refresh and, if it succeeds, one retry with
    /// the new token. `prepare` adds the query or body to each attempt.
    async fn send<F>(&self, method: Method, path: &str, prepare: F) -> Result<String, ApiError>
    where
        F: Fn(RequestBuilder) -> RequestBuilder,
    {
        let (request, sent) = self.authorized(method.clone(), path);
        let response = prepare(request).send().await?;

        if response.status() != StatusCode::UNAUTHORIZED || !self.refreshes_on(path) {
            return read(response, path).await;
        }

        let rejected = read(response, path).await;
        if !self.refresh_tokens(sent.as_deref()).await {
            return rejected;
        }

        let (retry, _) = self.authorized(method, path);
        read(prepare(retry).send().await?, path).await
    }
}

/// Map a response to its body, or to the error its status stands for.
async fn read(response: reqwest::Response, path: &str) -> Result<String, ApiError> {
    let status = response.status();

    if status == StatusCode::TOO_MANY_REQUESTS {
        let retry_after = response
            .headers()
            .get(reqwest::header::RETRY_AFTER)
            .and_then(|v| v.to_str().ok())
            .and_then(|s| s.parse::<u64>().ok())
            .unwrap_or(1);
        return Err(ApiError::RateLimited(retry_after));
    }

    if status == StatusCode::NO_CONTENT {
        return Ok(String::new());
    }

    // Body as text first for better error diagnostics
    let body = response.text().await?;

    if status == StatusCode::NOT_FOUND {
        return Err(ApiError::NotFound(error_message(&body)));
    }

    if !status.is_success() {
        tracing::error!(
            status = %status,
            path,
            body = %body.chars().take(500).collect::<String>(),
            "Bakery API returned non-success status"
        );
        return Err(ApiError::Api {
            status: status.as_u16(),
            message: error_message(&body),
        });
    }

    Ok(body)
}

fn decode<T: DeserializeOwned>(path: &str, body: &str) -> Result<T, ApiError> {
    serde_json::from_str(body).map_err(|e| {
        tracing::error!(
            error = %e,
            path,
            body = %body.chars().take(500).collect::<String>(),
            "Failed to parse bakery API response"
        );
        ApiError::Parse(e)
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::storage::MemoryStore;

    fn client(environment: Environment, store: &MemoryStore) -> ApiClient {
        let config = StorefrontConfig::new("http://localhost:8000/api/v1")
            .unwrap()
            .with_environment(environment);
        ApiClient::new(&config, Arc::new(store.clone())).unwrap()
    }

    #[test]
    fn test_request_attaches_identity_headers() {
        let store = MemoryStore::new();
        store.set(keys::CART_SESSION_ID, "sess_abc").unwrap();
        store.set(keys::ACCESS_TOKEN, "tok_123").unwrap();

        let request = client(Environment::Interactive, &store)
            .request(Method::GET, "/cart")
            .build()
            .unwrap();

        assert_eq!(request.url().as_str(), "http://localhost:8000/api/v1/cart");
        assert_eq!(request.headers()[SESSION_HEADER], "sess_abc");
        assert_eq!(
            request.headers()[reqwest::header::AUTHORIZATION],
            "Bearer tok_123"
        );
    }

    #[test]
    fn test_request_reads_storage_each_time() {
        let store = MemoryStore::new();
        let api = client(Environment::Interactive, &store);

        let before = api.request(Method::GET, "/cart").build().unwrap();
        assert!(before.headers().get(SESSION_HEADER).is_none());
        assert!(before.headers().get(reqwest::header::AUTHORIZATION).is_none());

        store.set(keys::CART_SESSION_ID, "sess_late").unwrap();
        let after = api.request(Method::GET, "/cart").build().unwrap();
        assert_eq!(after.headers()[SESSION_HEADER], "sess_late");
    }

    #[test]
    fn test_headless_sends_no_identity() {
        let store = MemoryStore::new();
        store.set(keys::CART_SESSION_ID, "sess_abc").unwrap();
        store.set(keys::ACCESS_TOKEN, "tok_123").unwrap();

        let request = client(Environment::Headless, &store)
            .request(Method::POST, "cart/items")
            .build()
            .unwrap();

        assert!(request.headers().get(SESSION_HEADER).is_none());
        assert!(request.headers().get(reqwest::header::AUTHORIZATION).is_none());
    }

    #[test]
    fn test_blank_token_is_not_sent() {
        let store = MemoryStore::new();
        store.set(keys::ACCESS_TOKEN, "  ").unwrap();

        let request = client(Environment::Interactive, &store)
            .request(Method::GET, "/orders/my-orders")
            .build()
            .unwrap();

        assert!(request.headers().get(reqwest::header::AUTHORIZATION).is_none());
    }

    #[test]
    fn test_decode_reports_parse_errors() {
        let err = decode::<serde_json::Value>("/cart", "<html>").unwrap_err();
        assert!(matches!(err, ApiError::Parse(_)));
    }

    #[test]
    fn test_url_joins_paths() {
        let api = client(Environment::Interactive, &MemoryStore::new());
        assert_eq!(api.url("/orders"), "http://localhost:8000/api/v1/orders");
        assert_eq!(api.url("orders"), "http://localhost:8000/api/v1/orders");
    }

    #[test]
    fn test_store_and_clear_tokens() {
        let store = MemoryStore::new();
        let api = client(Environment::Interactive, &store);
        let tokens = AuthTokens {
            access_token: "acc-1".to_string(),
            refresh_token: "ref-1".to_string(),
            token_type: "bearer".to_string(),
        };

        api.store_tokens(&tokens).unwrap();
        assert_eq!(store.get(keys::REFRESH_TOKEN).unwrap().as_deref(), Some("ref-1"));
        assert!(api.has_access_token());

        api.clear_tokens().unwrap();
        assert!(store.is_empty());
        assert!(!api.has_access_token());
    }

    #[test]
    fn test_headless_keeps_no_tokens() {
        let store = MemoryStore::new();
        let api = client(Environment::Headless, &store);
        let tokens = AuthTokens {
            access_token: "acc-1".to_string(),
            refresh_token: "ref-1".to_string(),
            token_type: "bearer".to_string(),
        };

        api.store_tokens(&tokens).unwrap();
        assert!(store.is_empty());
        assert!(!api.refreshes_on("/orders/my-orders"));
    }

    #[test]
    fn test_refresh_endpoint_never_refreshes() {
        let api = client(Environment::Interactive, &MemoryStore::new());
        assert!(api.refreshes_on("/orders/my-orders"));
        assert!(!api.refreshes_on(REFRESH_PATH));
        assert!(!api.refreshes_on("auth/refresh"));
    }

    #[tokio::test]
    async fn test_refresh_skipped_when_token_already_replaced() {
        let store = MemoryStore::new();
        store.set(keys::ACCESS_TOKEN, "acc-2").unwrap();
        let api = client(Environment::Interactive, &store);

        // No server is listening; a real refresh would fail and clear tokens.
        assert!(api.refresh_tokens(Some("acc-1")).await);
        assert_eq!(store.get(keys::ACCESS_TOKEN).unwrap().as_deref(), Some("acc-2"));
    }

    #[tokio::test]
    async fn test_refresh_without_refresh_token_clears_access_token() {
        let store = MemoryStore::new();
        store.set(keys::ACCESS_TOKEN, "acc-1").unwrap();
        let api = client(Environment::Interactive, &store);

        assert!(!api.refresh_tokens(Some("acc-1")).await);
        assert!(store.is_empty());
    }
}
