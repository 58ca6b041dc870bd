//! Storefront API client
//!
//! One request pipeline serves every endpoint: attach the stored bearer
//! credential, send, and on a rejected access token refresh once through
//! the [`RefreshCoordinator`] before retrying the original call.

pub mod auth;
pub mod products;

use crate::error::ClientError;
use crate::refresh::{RefreshCoordinator, RefreshError, RefreshRole};
use reqwest::{Client, ClientBuilder, Method, header};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::sync::Arc;
use std::time::Duration;
use storefront_core::{
    KeyValueStorage, MemoryStorage, RefreshTokenRequest, TokenPair, TokenStore,
};
use tracing::{debug, warn};

/// Origin of the remote demo catalog API
pub const DEFAULT_BASE_URL: &str = "https://dummyjson.com";

/// Storefront API client
#[derive(Clone)]
pub struct StorefrontClient {
    client: Client,
    base_url: String,
    store: TokenStore,
    refresh: Arc<RefreshCoordinator>,
}

impl StorefrontClient {
    /// Create a client for the default remote API with in-memory storage
    pub fn new() -> Result<Self, ClientError> {
        Self::builder().build()
    }

    /// Create a new client builder
    pub fn builder() -> StorefrontClientBuilder {
        StorefrontClientBuilder::default()
    }

    /// Get the base URL
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// The token store holding this client's identity state
    pub fn token_store(&self) -> &TokenStore {
        &self.store
    }

    /// Issue one HTTP call and map the response
    async fn send_once<T, B>(
        &self,
        method: Method,
        path: &str,
        query: Option<&[(&str, &str)]>,
        body: Option<&B>,
        bearer: Option<&str>,
    ) -> Result<T, ClientError>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        let url = format!("{}{}", self.base_url, path);
        let mut request = self.client.request(method, url);

        if let Some(query) = query {
            request = request.query(query);
        }
        if let Some(body) = body {
            request = request.json(body);
        }
        if let Some(token) = bearer {
            request = request.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }

        let response = request.send().await?;
        let status = response.status();
        debug!(path, status = status.as_u16(), "request completed");

        if status.is_success() {
            Ok(response.json().await?)
        } else {
            let message = response.text().await.unwrap_or_else(|_| status.to_string());
            Err(ClientError::from_status(status, message))
        }
    }

    /// Execute a request through the full pipeline
    ///
    /// On a 401 for a request that carried an access token, refreshes the
    /// session (single-flight across concurrent callers) and retries the
    /// call exactly once with the freshly issued token. A retry that is
    /// rejected again fails without another refresh.
    pub(crate) async fn execute<T, B>(
        &self,
        method: Method,
        path: &str,
        query: Option<&[(&str, &str)]>,
        body: Option<&B>,
    ) -> Result<T, ClientError>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        let token = self.store.access_token();
        let first = self
            .send_once(method.clone(), path, query, body, token.as_deref())
            .await;

        let rejected = matches!(&first, Err(error) if error.is_auth_expired());
        if !(rejected && token.is_some()) {
            return first;
        }

        let Some(refresh_token) = self.store.refresh_token() else {
            self.store.clear();
            return Err(ClientError::SessionExpired);
        };

        match self.refresh.begin() {
            RefreshRole::Leader => {
                debug!(path, "access token rejected, refreshing session");
                let outcome = self.run_refresh(&refresh_token).await;
                self.refresh.finish(outcome.clone());
                if let Err(error) = outcome {
                    return Err(ClientError::RefreshFailed(error.0));
                }
            }
            RefreshRole::Follower(receiver) => {
                debug!(path, "refresh already in flight, waiting");
                match receiver.await {
                    Ok(Ok(())) => {}
                    Ok(Err(error)) => return Err(ClientError::RefreshFailed(error.0)),
                    Err(_) => {
                        return Err(ClientError::RefreshFailed(
                            "refresh was abandoned".to_string(),
                        ));
                    }
                }
            }
        }

        // Retry once, re-reading the store so the freshly issued token is
        // used rather than the stale one captured above.
        let fresh = self.store.access_token();
        self.send_once(method, path, query, body, fresh.as_deref())
            .await
    }

    /// Perform the outbound refresh call as the elected leader
    ///
    /// The refresh call itself carries no bearer credential and is never
    /// retried. Any failure, transport or status, clears the session.
    async fn run_refresh(&self, refresh_token: &str) -> Result<(), RefreshError> {
        let request = RefreshTokenRequest {
            refresh_token: refresh_token.to_string(),
        };
        let result: Result<TokenPair, ClientError> = self
            .send_once(Method::POST, "/auth/refresh", None, Some(&request), None)
            .await;

        match result {
            Ok(pair) => {
                self.store.set_tokens(&pair);
                debug!("session refreshed");
                Ok(())
            }
            Err(error) => {
                warn!(%error, "token refresh failed, clearing session");
                self.store.clear();
                Err(RefreshError(error.to_string()))
            }
        }
    }

    pub(crate) async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: Option<&[(&str, &str)]>,
    ) -> Result<T, ClientError> {
        self.execute(Method::GET, path, query, None::<&()>).await
    }

    pub(crate) async fn post_json<T, B>(&self, path: &str, body: &B) -> Result<T, ClientError>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        self.execute(Method::POST, path, None, Some(body)).await
    }
}

/// Builder for StorefrontClient
#[derive(Default)]
pub struct StorefrontClientBuilder {
    base_url: Option<String>,
    timeout: Option<Duration>,
    user_agent: Option<String>,
    storage: Option<Arc<dyn KeyValueStorage>>,
}

impl StorefrontClientBuilder {
    /// Set the base URL
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    /// Set the request timeout
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Set the user agent
    pub fn user_agent(mut self, agent: impl Into<String>) -> Self {
        self.user_agent = Some(agent.into());
        self
    }

    /// Set the storage backend holding tokens and the cached user record
    pub fn storage(mut self, storage: Arc<dyn KeyValueStorage>) -> Self {
        self.storage = Some(storage);
        self
    }

    /// Build the client
    pub fn build(self) -> Result<StorefrontClient, ClientError> {
        let base_url = self
            .base_url
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());

        // Ensure base_url ends without a trailing slash
        let base_url = base_url.trim_end_matches('/').to_string();
        if base_url.is_empty() {
            return Err(ClientError::Configuration("base_url is empty".into()));
        }

        let mut client_builder = ClientBuilder::new();

        #[cfg(not(target_arch = "wasm32"))]
        if let Some(timeout) = self.timeout {
            client_builder = client_builder.timeout(timeout);
        }
        #[cfg(target_arch = "wasm32")]
        let _ = self.timeout; // Timeouts not supported on WASM

        if let Some(user_agent) = self.user_agent {
            client_builder = client_builder.user_agent(user_agent);
        } else {
            client_builder = client_builder.user_agent("storefront-client/0.1.0");
        }

        let client = client_builder.build()?;
        let storage = self
            .storage
            .unwrap_or_else(|| Arc::new(MemoryStorage::new()));

        Ok(StorefrontClient {
            client,
            base_url,
            store: TokenStore::new(storage),
            refresh: Arc::new(RefreshCoordinator::new()),
        })
    }
}
