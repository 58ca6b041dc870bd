//! Authentication API client methods

use super::StorefrontClient;
use crate::error::ClientError;
use storefront_core::{LoginRequest, LoginResponse, TokenPair, User};

// The demo API does not issue a refresh token on login; a real backend
// would. The placeholder keeps the stored pair complete either way.
const FALLBACK_REFRESH_TOKEN: &str = "fake-refresh-token";

impl StorefrontClient {
    /// Log in and persist the issued tokens and user record
    pub async fn login(&self, credentials: &LoginRequest) -> Result<LoginResponse, ClientError> {
        let response: LoginResponse = self.post_json("/auth/login", credentials).await?;

        let refresh_token = response
            .refresh_token
            .clone()
            .unwrap_or_else(|| FALLBACK_REFRESH_TOKEN.to_string());
        self.token_store().set_tokens(&TokenPair {
            access_token: response.access_token.clone(),
            refresh_token,
        });
        self.token_store().set_user(&response.user);

        Ok(response)
    }

    /// Get the current user (requires authentication)
    pub async fn me(&self) -> Result<User, ClientError> {
        self.get_json("/auth/me", None).await
    }

    /// Exchange the stored refresh token for a new pair and persist it
    ///
    /// This is the manual counterpart of the automatic refresh the request
    /// pipeline performs on a 401.
    pub async fn refresh_session(&self) -> Result<TokenPair, ClientError> {
        let Some(refresh_token) = self.token_store().refresh_token() else {
            return Err(ClientError::SessionExpired);
        };
        let pair: TokenPair = self
            .post_json(
                "/auth/refresh",
                &storefront_core::RefreshTokenRequest { refresh_token },
            )
            .await?;
        self.token_store().set_tokens(&pair);
        Ok(pair)
    }

    /// Drop all stored identity state
    pub fn logout(&self) {
        self.token_store().clear();
    }
}
